use strum::{EnumIs, EnumTryAs};
use thiserror::Error;

use crate::{types::Typeref, values::Name};

/// A single parser diagnostic with byte offsets into the source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParseDiagnostic {
    pub message: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, PartialEq, Eq, Hash, EnumIs, EnumTryAs, Error)]
pub enum Error {
    /// A destination name collides with an earlier definition.
    #[error(
        "Multiple definitions share the same destination, violating SSA requirements. The name `{duplicate}` is defined more than once within the same region."
    )]
    DuplicateName { duplicate: Name },

    /// An operand refers to a name that is never defined.
    #[error(
        "An operand refers to an undefined name: `{undefined}`. This name is never defined within the region."
    )]
    UndefinedName { undefined: Name },

    /// An operand refers to a name whose definition appears later in the region.
    #[error(
        "The operand `{name}` of the operation at position {position} is only defined later in the region. Every value must be defined before its first use."
    )]
    UseBeforeDef { name: Name, position: usize },

    /// The number of operands does not satisfy the operation's schema.
    #[error("The operation `{op}` expects {expected} operand(s), but {found} were provided.")]
    OperandCountMismatch {
        op: &'static str,
        expected: String,
        found: usize,
    },

    /// An operand's bound type does not satisfy the schema constraint for its position.
    #[error(
        "The operand at position {position} of operation `{op}` is expected to be of {expected} type, but the value bound to it has type `{found}`."
    )]
    OperandTypeMismatch {
        op: &'static str,
        position: usize,
        expected: &'static str,
        found: String,
    },

    /// The type an operation declares for an operand disagrees with the type of the value bound to it.
    #[error(
        "The operation `{op}` declares type `{declared}` for its operand at position {position}, but the value bound to it has type `{found}`."
    )]
    TypeMismatch {
        op: &'static str,
        position: usize,
        declared: String,
        found: String,
    },

    /// The declared result type does not satisfy the schema constraint for the operation's result.
    #[error(
        "The operation `{op}` must produce a result of {expected} type, but its declared result type is `{found}`."
    )]
    ResultTypeMismatch {
        op: &'static str,
        expected: &'static str,
        found: String,
    },

    /// A `dim` queries a dimension position at or beyond the view's rank.
    #[error(
        "The dimension index is out of range: position {index} does not exist on a view of rank {rank}."
    )]
    DimIndexOutOfRange { index: u64, rank: usize },

    /// A `subview`'s index operands do not form one (min, max, step) triple per view dimension.
    #[error(
        "A subview over a rank-{rank} view requires {} index operands forming one (min, max, step) triple per dimension, but {operands} were provided.",
        .rank * 3
    )]
    SubViewRangeArity { operands: usize, rank: usize },

    /// A non-empty region does not end with a terminator.
    #[error("A non-empty region must end with a terminator operation such as `yield`.")]
    MissingTerminator,

    /// A terminator appears before the end of the region.
    #[error(
        "A terminator operation appears at position {position} but is not the last operation of the region."
    )]
    TerminatorNotLast { position: usize },

    /// The number of dynamic size operands passed to an allocation does not match its buffer type.
    #[error(
        "Allocating a buffer of type `{buffer}` takes exactly {expected} dynamic size operand(s), but {found} were provided."
    )]
    AllocSizeOperands {
        buffer: String,
        expected: usize,
        found: usize,
    },

    /// A required attribute was not supplied to the generic construction entry point.
    #[error("The operation `{op}` requires the attribute `{attr}`, which was not provided.")]
    MissingAttribute {
        op: &'static str,
        attr: &'static str,
    },

    /// An attribute was supplied with the wrong payload kind.
    #[error("The attribute `{attr}` of operation `{op}` must hold {expected} value.")]
    AttributeTypeMismatch {
        op: &'static str,
        attr: &'static str,
        expected: &'static str,
    },

    /// An operation references a typeref that the registry does not know.
    #[error(
        "The operation `{op}` references the type identifier {typeref:?}, which is not present in the type registry."
    )]
    UnresolvedTyperef { op: &'static str, typeref: Typeref },

    /// The textual form could not be parsed.
    #[error(
        "The source text could not be parsed; {} error(s) were reported.",
        .errors.len()
    )]
    ParserErrors { errors: Vec<ParseDiagnostic> },
}

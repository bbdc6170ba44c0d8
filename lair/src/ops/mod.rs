//! Operation IR modules
//!
//! This module groups the operation kinds exposed by the lair IR. Each
//! operation is represented as a small data structure with public fields,
//! making it easy to construct and inspect. Submodules contain families of
//! operations:
//!
//! - `buffer`: allocation, deallocation and size queries over flat storage
//! - `view`: dimension queries and rectangular slicing of views
//! - `control`: region terminators
//!
//! You typically manipulate operations via the [`LairOp`] enum which is a
//! tagged union of all concrete operation forms. The [`LairOpKind`]
//! discriminant drives the generic construction and verification paths
//! through [`LairOpKind::schema`].
use auto_enums::auto_enum;
use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumDiscriminants, EnumIs, EnumIter, EnumTryAs, IntoEnumIterator};

use crate::{
    types::{AnyType, TypeRegistry, Typeref},
    utils::Error,
    values::Name,
};

pub mod buffer;
pub mod control;
pub mod view;

bitflags! {
    /// Flags providing additional information about operations, such as
    /// whether an operation has observable side effects or terminates a
    /// region body.
    pub struct OpFlags: u32 {
        /// Operation has no observable side effects.
        ///
        /// A pure operation only reads its operands' types and geometry. It
        /// can be freely duplicated, reordered relative to other pure
        /// operations, and removed when its result is unused, without
        /// changing program semantics.
        ///
        /// 1. Storage operations that create or release buffers are *never*
        ///    pure, even though allocation is observable only through its
        ///    result.
        /// 2. Size and geometry queries are pure since they read metadata
        ///    without touching element storage.
        /// 3. Terminators are not pure; removing one changes the region's
        ///    structure.
        const PURE = 1 << 0;

        /// Operation terminates a region body.
        ///
        /// A terminator must be the last operation of any non-empty region
        /// and hands the listed values back to the enclosing operation.
        const TERMINATOR = 1 << 1;

        /// Operation creates, releases or measures buffer storage.
        const BUFFER = 1 << 4;

        /// Operation reads or reshapes view geometry.
        const VIEW = 1 << 5;
    }
}

/// Common interface implemented by every operation node.
///
/// This trait provides lightweight, zero-allocation iteration over an
/// operation's input operands and exposes its optional destination SSA name
/// when present.
pub trait Op {
    fn flags(&self) -> OpFlags;

    /// Returns true if this operation has no observable side effects, see
    /// [`OpFlags::PURE`].
    #[inline]
    fn is_pure(&self) -> bool {
        self.flags().contains(OpFlags::PURE)
    }

    /// Returns true if this operation terminates a region body.
    #[inline]
    fn is_terminator(&self) -> bool {
        self.flags().contains(OpFlags::TERMINATOR)
    }

    /// Iterate over all input operands for this operation.
    fn operands(&self) -> impl Iterator<Item = Name>;

    /// Return the destination SSA name if the operation produces a result.
    fn destination(&self) -> Option<Name> {
        None
    }

    /// Type of the produced result, if the operation produces one. The
    /// registry is needed because some results (sizes, dimensions) are of
    /// the interned `index` type rather than a type the operation stores.
    fn result_type(&self, _registry: &TypeRegistry) -> Option<Typeref> {
        None
    }

    /// Any types referenced by this operation.
    fn referenced_types(&self) -> impl Iterator<Item = Typeref>;

    /// Update the destination SSA name for this operation. No-op if the
    /// operation does not produce a result.
    fn set_destination(&mut self, _name: Name) {}

    /// Mutably iterate over all input operands for this operation.
    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Name>;

    /// Remap operands according to a mapping.
    fn remap_operands(&mut self, mapping: impl Fn(Name) -> Option<Name>) {
        for operand in self.operands_mut() {
            if let Some(new_name) = mapping(*operand) {
                *operand = new_name;
            }
        }
    }
}

/// Constraint an operand or result type must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeConstraint {
    /// The interned `index` type.
    Index,
    /// Any buffer type.
    Buffer,
    /// Any view type, regardless of rank.
    View,
    /// No constraint.
    Any,
}

impl TypeConstraint {
    /// Returns true when `ty` satisfies this constraint.
    pub fn admits(&self, ty: &AnyType) -> bool {
        match self {
            TypeConstraint::Index => ty.is_index(),
            TypeConstraint::Buffer => ty.is_buffer(),
            TypeConstraint::View => ty.is_view(),
            TypeConstraint::Any => true,
        }
    }

    /// Human-readable name used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            TypeConstraint::Index => "index",
            TypeConstraint::Buffer => "buffer",
            TypeConstraint::View => "view",
            TypeConstraint::Any => "any",
        }
    }
}

/// Payload kind of a declared attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    /// Unsigned integer constant.
    Int,
    /// Reference to a registered type.
    Ty,
}

impl AttrKind {
    /// Article-prefixed description used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            AttrKind::Int => "an integer",
            AttrKind::Ty => "a type",
        }
    }
}

/// Declaration of one attribute an operation kind requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttrSpec {
    pub name: &'static str,
    pub kind: AttrKind,
}

/// Declarative description of an operation kind's shape.
///
/// A schema lists the operand positions with their type constraints, the
/// result constraint when the operation produces a value, and the attributes
/// the operation carries. Generic verification checks every operation
/// against its schema before any operation-specific verifier runs, and the
/// kind-driven construction path decodes its inputs against the same
/// descriptor, so adding an operation kind means writing one schema rather
/// than extending several hand-maintained switches.
#[derive(Debug, Clone, Copy)]
pub struct OpSchema {
    /// Constraints for the leading fixed operand positions.
    pub fixed_operands: &'static [TypeConstraint],
    /// Constraint applied to every operand past the fixed positions, or
    /// `None` when the operand count is exactly the number of fixed
    /// positions.
    pub variadic_operands: Option<TypeConstraint>,
    /// Constraint on the produced result, or `None` for operations without
    /// results.
    pub result: Option<TypeConstraint>,
    /// Attributes the operation carries.
    pub attrs: &'static [AttrSpec],
}

impl OpSchema {
    /// Returns true when `count` operands satisfy this schema.
    pub fn admits_operand_count(&self, count: usize) -> bool {
        match self.variadic_operands {
            None => count == self.fixed_operands.len(),
            Some(_) => count >= self.fixed_operands.len(),
        }
    }

    /// Constraint for the operand at `position`, or `None` when the position
    /// is past the fixed operands of a fixed-arity schema.
    pub fn operand_constraint(&self, position: usize) -> Option<TypeConstraint> {
        self.fixed_operands
            .get(position)
            .copied()
            .or(self.variadic_operands)
    }

    /// Describe the accepted operand count for diagnostics.
    pub fn count_description(&self) -> String {
        match self.variadic_operands {
            None => format!("exactly {}", self.fixed_operands.len()),
            Some(_) => format!("at least {}", self.fixed_operands.len()),
        }
    }

    /// Returns true when operations of this kind produce a result.
    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }
}

/// Discriminated union covering all public operation kinds.
///
/// Use this enum to store heterogeneous operation streams and to
/// pattern-match on specific operations. The generated [`LairOpKind`]
/// discriminant (via `strum`) can be helpful for fast classification.
#[derive(Debug, Clone, Hash, PartialEq, Eq, EnumIs, EnumTryAs, EnumDiscriminants)]
#[strum_discriminants(name(LairOpKind), derive(EnumIter))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LairOp {
    // Buffer storage operations
    BufferAlloc(buffer::BufferAlloc),
    BufferDealloc(buffer::BufferDealloc),
    BufferSize(buffer::BufferSize),

    // View geometry operations
    Dim(view::Dim),
    SubView(view::SubView),

    // Terminators
    Yield(control::Yield),
}

impl LairOpKind {
    /// Flags shared by every operation of this kind.
    pub fn flags(&self) -> OpFlags {
        match self {
            LairOpKind::BufferAlloc | LairOpKind::BufferDealloc => OpFlags::BUFFER,
            LairOpKind::BufferSize => OpFlags::BUFFER | OpFlags::PURE,

            LairOpKind::Dim | LairOpKind::SubView => OpFlags::VIEW | OpFlags::PURE,

            LairOpKind::Yield => OpFlags::TERMINATOR,
        }
    }

    /// Return the canonical mnemonic used when printing this operation.
    pub fn opname(&self) -> &'static str {
        match self {
            LairOpKind::BufferAlloc => "alloc",
            LairOpKind::BufferDealloc => "dealloc",
            LairOpKind::BufferSize => "buffer_size",

            LairOpKind::Dim => "dim",
            LairOpKind::SubView => "subview",

            LairOpKind::Yield => "yield",
        }
    }

    /// Return the declarative schema for this operation kind.
    pub fn schema(&self) -> OpSchema {
        use TypeConstraint::{Any, Buffer, Index, View};

        match self {
            LairOpKind::BufferAlloc => OpSchema {
                fixed_operands: &[],
                variadic_operands: Some(Index),
                result: Some(Buffer),
                attrs: &[AttrSpec {
                    name: "type",
                    kind: AttrKind::Ty,
                }],
            },
            LairOpKind::BufferDealloc => OpSchema {
                fixed_operands: &[Buffer],
                variadic_operands: None,
                result: None,
                attrs: &[],
            },
            LairOpKind::BufferSize => OpSchema {
                fixed_operands: &[Buffer],
                variadic_operands: None,
                result: Some(Index),
                attrs: &[],
            },
            LairOpKind::Dim => OpSchema {
                fixed_operands: &[View],
                variadic_operands: None,
                result: Some(Index),
                attrs: &[AttrSpec {
                    name: "index",
                    kind: AttrKind::Int,
                }],
            },
            LairOpKind::SubView => OpSchema {
                fixed_operands: &[View],
                variadic_operands: Some(Index),
                result: Some(View),
                attrs: &[],
            },
            LairOpKind::Yield => OpSchema {
                fixed_operands: &[],
                variadic_operands: Some(Any),
                result: None,
                attrs: &[],
            },
        }
    }

    /// Parse a mnemonic into its corresponding discriminator.
    pub fn from_str(s: &str) -> Option<Self> {
        LairOpKind::iter().find(|op| op.opname() == s)
    }
}

impl LairOp {
    /// Return the discriminant for this operation value.
    pub fn kind(&self) -> LairOpKind {
        self.into()
    }

    /// Return the canonical mnemonic of this operation.
    pub fn opname(&self) -> &'static str {
        self.kind().opname()
    }

    /// Run the operation-specific checks that the generic schema layer
    /// cannot express. Most operations are fully specified by their flags
    /// and schema and have nothing to add here.
    pub fn verify(&self, registry: &TypeRegistry) -> Result<(), Error> {
        match self {
            LairOp::Dim(dim) => dim.verify(registry),
            LairOp::SubView(subview) => subview.verify(registry),
            _ => Ok(()),
        }
    }

    /// The type the operation itself declares for the operand at `position`,
    /// when it records one. Region verification cross-checks declared types
    /// against the types of the values actually bound to the operands.
    pub fn declared_operand_type(&self, position: usize) -> Option<Typeref> {
        match self {
            LairOp::BufferDealloc(dealloc) if position == 0 => Some(dealloc.ty),
            LairOp::BufferSize(size) if position == 0 => Some(size.ty),
            LairOp::Dim(dim) if position == 0 => Some(dim.ty),
            LairOp::SubView(subview) if position == 0 => Some(subview.ty),
            LairOp::Yield(yld) => yld.values.get(position).map(|(_, ty)| *ty),
            _ => None,
        }
    }
}

macro_rules! define_op_any_op {
    (
        $($variant:ident),* $(,)?
    ) => {
        impl Op for LairOp {
            fn flags(&self) -> OpFlags {
                match self {
                    $(
                        LairOp::$variant(op) => op.flags(),
                    )*
                }
            }

            #[auto_enum(Iterator)]
            fn operands(&self) -> impl Iterator<Item = Name> {
                match self {
                    $(
                        LairOp::$variant(op) => op.operands(),
                    )*
                }
            }

            fn destination(&self) -> Option<Name> {
                match self {
                    $(
                        LairOp::$variant(op) => op.destination(),
                    )*
                }
            }

            #[auto_enum(Iterator)]
            fn operands_mut(&mut self) -> impl Iterator<Item = &mut Name> {
                match self {
                    $(
                        LairOp::$variant(op) => op.operands_mut(),
                    )*
                }
            }

            fn set_destination(&mut self, name: Name) {
                match self {
                    $(
                        LairOp::$variant(op) => op.set_destination(name),
                    )*
                }
            }

            #[auto_enum(Iterator)]
            fn referenced_types(&self) -> impl Iterator<Item = crate::types::Typeref> {
                match self {
                    $(
                        LairOp::$variant(op) => op.referenced_types(),
                    )*
                }
            }

            fn result_type(&self, registry: &TypeRegistry) -> Option<Typeref> {
                match self {
                    $(
                        LairOp::$variant(op) => op.result_type(registry),
                    )*
                }
            }
        }
    };
}

define_op_any_op! {
    BufferAlloc,
    BufferDealloc,
    BufferSize,
    Dim,
    SubView,
    Yield,
}

macro_rules! define_lairop_from {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for LairOp {
            fn from(op: $typ) -> Self {
                LairOp::$variant(op)
            }
        }
    };
}

define_lairop_from!(buffer::BufferAlloc, BufferAlloc);
define_lairop_from!(buffer::BufferDealloc, BufferDealloc);
define_lairop_from!(buffer::BufferSize, BufferSize);

define_lairop_from!(view::Dim, Dim);
define_lairop_from!(view::SubView, SubView);

define_lairop_from!(control::Yield, Yield);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics_round_trip_through_the_catalog() {
        for kind in LairOpKind::iter() {
            assert_eq!(LairOpKind::from_str(kind.opname()), Some(kind));
        }
        assert_eq!(LairOpKind::from_str("matmul"), None);
    }

    #[test]
    fn schemas_fix_the_operand_counts() {
        assert!(LairOpKind::BufferDealloc.schema().admits_operand_count(1));
        assert!(!LairOpKind::BufferDealloc.schema().admits_operand_count(0));
        assert!(!LairOpKind::BufferDealloc.schema().admits_operand_count(2));

        assert!(LairOpKind::BufferSize.schema().admits_operand_count(1));
        assert!(!LairOpKind::BufferSize.schema().admits_operand_count(2));

        // Variadic tails admit any length past the fixed positions.
        assert!(LairOpKind::SubView.schema().admits_operand_count(1));
        assert!(LairOpKind::SubView.schema().admits_operand_count(7));
        assert!(!LairOpKind::SubView.schema().admits_operand_count(0));

        assert!(LairOpKind::BufferAlloc.schema().admits_operand_count(0));
        assert!(LairOpKind::Yield.schema().admits_operand_count(0));
    }

    #[test]
    fn flags_separate_pure_and_terminator_kinds() {
        assert!(LairOpKind::BufferSize.flags().contains(OpFlags::PURE));
        assert!(LairOpKind::Dim.flags().contains(OpFlags::PURE));
        assert!(LairOpKind::SubView.flags().contains(OpFlags::PURE));
        assert!(!LairOpKind::BufferAlloc.flags().contains(OpFlags::PURE));
        assert!(!LairOpKind::BufferDealloc.flags().contains(OpFlags::PURE));

        assert!(LairOpKind::Yield.flags().contains(OpFlags::TERMINATOR));
        assert!(!LairOpKind::Dim.flags().contains(OpFlags::TERMINATOR));
    }

    #[test]
    fn schema_constraints_describe_positions() {
        let schema = LairOpKind::SubView.schema();
        assert_eq!(schema.operand_constraint(0), Some(TypeConstraint::View));
        assert_eq!(schema.operand_constraint(5), Some(TypeConstraint::Index));
        assert!(schema.has_result());

        let schema = LairOpKind::Yield.schema();
        assert_eq!(schema.operand_constraint(3), Some(TypeConstraint::Any));
        assert!(!schema.has_result());

        let schema = LairOpKind::BufferDealloc.schema();
        assert_eq!(schema.operand_constraint(0), Some(TypeConstraint::Buffer));
        assert_eq!(schema.operand_constraint(1), None);
    }
}

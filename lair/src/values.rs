//! SSA values and operation attributes.
//!
//! Operations reference the values they consume through [`Name`] identifiers
//! and produce at most one result, also identified by a [`Name`]. Unlike a
//! full virtual-register model there are no immediates at this level; a
//! constant enters a region either as a parameter or through an operation
//! result. Compile-time constants attached to an operation (such as the
//! dimension position of a `dim`) travel as [`Attr`] values instead.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumTryAs};

use crate::types::Typeref;

/// SSA value identifier used to name the result of an operation or a region
/// parameter, and to reference that value from later operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Name(pub u32);

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Compile-time payload carried by an [`Attr`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AttrValue {
    /// Unsigned integer constant (e.g. the dimension position of a `dim`).
    Int(u64),
    /// Reference to a registered type (e.g. the buffer type of an `alloc`).
    Ty(Typeref),
}

/// A named compile-time attribute passed to the generic construction entry
/// point. Typed builder routines take these constants as plain arguments;
/// the kind-driven path receives them as a uniform attribute list instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Attr {
    pub name: &'static str,
    pub value: AttrValue,
}

impl Attr {
    /// Attribute holding an unsigned integer constant.
    pub fn int(name: &'static str, value: u64) -> Self {
        Self {
            name,
            value: AttrValue::Int(value),
        }
    }

    /// Attribute holding a type reference.
    pub fn ty(name: &'static str, value: Typeref) -> Self {
        Self {
            name,
            value: AttrValue::Ty(value),
        }
    }
}

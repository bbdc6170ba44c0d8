//! Region terminators.
//!
//! A region body ends with exactly one terminator, which hands the listed
//! values back to the enclosing operation. There is no control flow between
//! regions at this level; the terminator only delimits the body and names
//! its outputs.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    ops::{Op, OpFlags},
    types::Typeref,
    values::Name,
};

/// Terminate a region body, yielding zero or more values of any type to the
/// enclosing operation.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Yield {
    /// Yielded values with their declared types, in order.
    pub values: Vec<(Name, Typeref)>,
}

impl Yield {
    pub fn new(values: impl IntoIterator<Item = (Name, Typeref)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl Op for Yield {
    fn flags(&self) -> OpFlags {
        OpFlags::TERMINATOR
    }

    fn operands(&self) -> impl Iterator<Item = Name> {
        self.values.iter().map(|(name, _)| *name)
    }

    fn referenced_types(&self) -> impl Iterator<Item = Typeref> {
        self.values.iter().map(|(_, ty)| *ty)
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Name> {
        self.values.iter_mut().map(|(name, _)| name)
    }
}

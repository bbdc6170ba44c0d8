//! View geometry operations
//!
//! Dimension queries and rectangular slicing over n-dimensional views. Both
//! operations are pure: they read geometry without touching the underlying
//! buffer storage. Their operation-specific verifiers hold the two checks
//! the generic schema layer cannot express, the rank bound of a dimension
//! query and the triple-per-dimension arity of a slice.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
    geometry::{Range, flatten_ranges, group_ranges},
    ops::{Op, OpFlags},
    types::{TypeRegistry, Typeref, shaped::ViewType},
    utils::Error,
    values::Name,
};

/// Query the extent of one dimension of a view, producing an index value.
///
/// The queried position is a compile-time attribute, not an operand. An
/// out-of-range position is representable; it is rejected by verification,
/// not at construction time.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dim {
    pub dest: Name,

    /// The view whose dimension is queried.
    pub view: Name,

    /// Declared type of the view operand.
    pub ty: Typeref,

    /// Position of the queried dimension; must be below the view's rank.
    pub index: u64,
}

impl Dim {
    /// Resolve the declared view type against the registry.
    pub fn view_type(&self, registry: &TypeRegistry) -> Option<ViewType> {
        registry
            .get(self.ty)
            .and_then(|ty| ty.try_as_view_ref().cloned())
    }

    /// Check that the queried position exists on the declared view type.
    pub fn verify(&self, registry: &TypeRegistry) -> Result<(), Error> {
        let Some(ty) = registry.get(self.ty) else {
            return Err(Error::UnresolvedTyperef {
                op: "dim",
                typeref: self.ty,
            });
        };
        let Some(view) = ty.try_as_view_ref() else {
            return Err(Error::OperandTypeMismatch {
                op: "dim",
                position: 0,
                expected: "view",
                found: ty.to_string(),
            });
        };

        if self.index >= view.rank() as u64 {
            return Err(Error::DimIndexOutOfRange {
                index: self.index,
                rank: view.rank(),
            });
        }

        Ok(())
    }
}

impl Op for Dim {
    fn flags(&self) -> OpFlags {
        OpFlags::VIEW | OpFlags::PURE
    }

    fn operands(&self) -> impl Iterator<Item = Name> {
        std::iter::once(self.view)
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn result_type(&self, registry: &TypeRegistry) -> Option<Typeref> {
        Some(registry.index_type())
    }

    fn referenced_types(&self) -> impl Iterator<Item = Typeref> {
        std::iter::once(self.ty)
    }

    fn set_destination(&mut self, name: Name) {
        self.dest = name;
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Name> {
        std::iter::once(&mut self.view)
    }
}

/// Slice a view into a rectangular sub-region, one range per dimension.
///
/// The operand list starts with the sliced view, followed by the flattened
/// (min, max, step) triples in the fixed layout described in
/// [`crate::geometry`]: the triple for dimension `i` occupies operand
/// positions `1 + 3*i` through `3 + 3*i`. Slicing preserves the operand's
/// type, so the result is a view of the same rank and element type.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SubView {
    pub dest: Name,

    /// The view being sliced.
    pub view: Name,

    /// Declared type of the view operand; also the type of the result.
    pub ty: Typeref,

    /// Flattened range components, three per dimension.
    pub indices: SmallVec<[Name; 6]>,
}

impl SubView {
    /// Build a subview from per-dimension ranges.
    pub fn from_ranges(dest: Name, view: Name, ty: Typeref, ranges: &[Range]) -> Self {
        Self {
            dest,
            view,
            ty,
            indices: flatten_ranges(ranges),
        }
    }

    /// Resolve the declared view type against the registry.
    pub fn view_type(&self, registry: &TypeRegistry) -> Option<ViewType> {
        registry
            .get(self.ty)
            .and_then(|ty| ty.try_as_view_ref().cloned())
    }

    /// Number of complete (min, max, step) triples in the operand list.
    pub fn num_ranges(&self) -> usize {
        self.indices.len() / 3
    }

    /// Reconstruct the ordered per-dimension ranges. Returns `None` when the
    /// operand list does not decompose into whole triples.
    pub fn ranges(&self) -> Option<SmallVec<[Range; 4]>> {
        group_ranges(&self.indices)
    }

    /// Range for the dimension at `dim`, when present.
    pub fn range(&self, dim: usize) -> Option<Range> {
        let base = dim.checked_mul(3)?;
        let chunk = self.indices.get(base..base + 3)?;
        Some(Range::new(chunk[0], chunk[1], chunk[2]))
    }

    /// Check that the operand list carries exactly one range triple per
    /// dimension of the declared view type.
    pub fn verify(&self, registry: &TypeRegistry) -> Result<(), Error> {
        let Some(ty) = registry.get(self.ty) else {
            return Err(Error::UnresolvedTyperef {
                op: "subview",
                typeref: self.ty,
            });
        };
        let Some(view) = ty.try_as_view_ref() else {
            return Err(Error::ResultTypeMismatch {
                op: "subview",
                expected: "view",
                found: ty.to_string(),
            });
        };

        let total = self.indices.len();
        let num_ranges = total / 3;
        if total != num_ranges * 3 || num_ranges != view.rank() {
            return Err(Error::SubViewRangeArity {
                operands: total,
                rank: view.rank(),
            });
        }

        Ok(())
    }
}

impl Op for SubView {
    fn flags(&self) -> OpFlags {
        OpFlags::VIEW | OpFlags::PURE
    }

    fn operands(&self) -> impl Iterator<Item = Name> {
        std::iter::once(self.view).chain(self.indices.iter().copied())
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn result_type(&self, _registry: &TypeRegistry) -> Option<Typeref> {
        Some(self.ty)
    }

    fn referenced_types(&self) -> impl Iterator<Item = Typeref> {
        std::iter::once(self.ty)
    }

    fn set_destination(&mut self, name: Name) {
        self.dest = name;
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Name> {
        std::iter::once(&mut self.view).chain(self.indices.iter_mut())
    }
}

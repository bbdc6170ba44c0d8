//! Shaped storage types
//!
//! This file provides the two storage-carrying types of the dialect:
//! - [`BufferType`]: a flat, one-dimensional block of elements whose size is
//!   either a compile-time constant or determined at runtime.
//! - [`ViewType`]: an n-dimensional indexing structure over a buffer, with a
//!   per-dimension [`Extent`].
//!
//! Neither type references the registry; both embed their element type
//! directly, so they display without any resolution context.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::{EnumIs, EnumTryAs};

use crate::types::elem::ElemType;

/// Size of a single dimension, either fixed at compile time or only known at
/// runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs, EnumTryAs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Extent {
    /// Compile-time constant number of elements.
    Static(u64),

    /// Number of elements supplied at runtime (printed as `?`).
    Dynamic,
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Extent::Static(n) => write!(f, "{}", n),
            Extent::Dynamic => write!(f, "?"),
        }
    }
}

/// A flat, contiguous block of elements.
///
/// Buffers are one-dimensional and carry no layout information beyond their
/// element type and size. All multi-dimensional structure lives in views
/// layered on top of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BufferType {
    pub elem: ElemType,
    pub size: Extent,
}

impl BufferType {
    /// Buffer with a compile-time constant size.
    pub fn fixed(elem: impl Into<ElemType>, size: u64) -> Self {
        Self {
            elem: elem.into(),
            size: Extent::Static(size),
        }
    }

    /// Buffer whose size is supplied at allocation time.
    pub fn dynamic(elem: impl Into<ElemType>) -> Self {
        Self {
            elem: elem.into(),
            size: Extent::Dynamic,
        }
    }

    /// Number of elements when known at compile time.
    pub fn num_elements(&self) -> Option<u64> {
        match self.size {
            Extent::Static(n) => Some(n),
            Extent::Dynamic => None,
        }
    }
}

impl std::fmt::Display for BufferType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Buffer<{}x{}>", self.size, self.elem)
    }
}

/// An n-dimensional indexing structure over buffer storage.
///
/// A view carries one [`Extent`] per dimension; its rank is the number of
/// dimensions. A rank-0 view denotes a scalar access and prints without any
/// `x`-separated extents (e.g. `View<f32>`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ViewType {
    pub elem: ElemType,
    pub dims: SmallVec<[Extent; 4]>,
}

impl ViewType {
    /// View with the given per-dimension extents.
    pub fn new(elem: impl Into<ElemType>, dims: impl IntoIterator<Item = Extent>) -> Self {
        Self {
            elem: elem.into(),
            dims: dims.into_iter().collect(),
        }
    }

    /// View of the given rank with every dimension dynamic.
    pub fn fully_dynamic(elem: impl Into<ElemType>, rank: usize) -> Self {
        Self {
            elem: elem.into(),
            dims: std::iter::repeat_n(Extent::Dynamic, rank).collect(),
        }
    }

    /// Number of dimensions of this view.
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Extent of the dimension at `index`, or `None` when `index` is not
    /// below the rank.
    pub fn dim(&self, index: usize) -> Option<Extent> {
        self.dims.get(index).copied()
    }

    /// Returns `true` when every dimension has a compile-time extent.
    pub fn is_fully_static(&self) -> bool {
        self.dims.iter().all(|d| d.is_static())
    }

    /// Total number of elements addressed by the view when every dimension is
    /// static. A rank-0 view addresses exactly one element.
    pub fn num_elements(&self) -> Option<u64> {
        self.dims.iter().try_fold(1u64, |acc, dim| match dim {
            Extent::Static(n) => acc.checked_mul(*n),
            Extent::Dynamic => None,
        })
    }
}

impl std::fmt::Display for ViewType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "View<")?;
        for dim in &self.dims {
            write!(f, "{}x", dim)?;
        }
        write!(f, "{}>", self.elem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::elem::{FloatType, IntType};

    #[test]
    fn view_extents_and_rank() {
        let view = ViewType::new(
            FloatType::F32,
            [Extent::Static(2), Extent::Dynamic, Extent::Static(4)],
        );
        assert_eq!(view.rank(), 3);
        assert_eq!(view.dim(0), Some(Extent::Static(2)));
        assert_eq!(view.dim(1), Some(Extent::Dynamic));
        assert_eq!(view.dim(3), None);
        assert!(!view.is_fully_static());
        assert_eq!(view.num_elements(), None);

        let fixed = ViewType::new(IntType::I16, [Extent::Static(2), Extent::Static(4)]);
        assert!(fixed.is_fully_static());
        assert_eq!(fixed.num_elements(), Some(8));
    }

    #[test]
    fn rank_zero_views_are_scalars() {
        let scalar = ViewType::fully_dynamic(FloatType::F64, 0);
        assert_eq!(scalar.rank(), 0);
        assert!(scalar.is_fully_static());
        assert_eq!(scalar.num_elements(), Some(1));
        assert_eq!(scalar.to_string(), "View<f64>");
    }

    #[test]
    fn display_spells_extents_and_elements() {
        assert_eq!(
            ViewType::fully_dynamic(FloatType::F32, 2).to_string(),
            "View<?x?xf32>"
        );
        assert_eq!(
            BufferType::fixed(FloatType::F16, 10).to_string(),
            "Buffer<10xf16>"
        );
        assert_eq!(
            BufferType::dynamic(IntType::I8).to_string(),
            "Buffer<?xi8>"
        );
    }

    #[test]
    fn buffer_sizes() {
        assert_eq!(BufferType::fixed(IntType::I32, 5).num_elements(), Some(5));
        assert_eq!(BufferType::dynamic(IntType::I32).num_elements(), None);
    }
}

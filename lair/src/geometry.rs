//! Range geometry shared by view operations.
//!
//! A [`Range`] describes one dimension of a slice as a (min, max, step)
//! triple of index values. Operations that take per-dimension ranges encode
//! them in a flat operand list with a fixed 3-stride layout: the triple for
//! dimension `i` occupies flat positions `3*i`, `3*i + 1` and `3*i + 2`, in
//! (min, max, step) order. Both the flattening and grouping helpers below and
//! the per-dimension accessors on `subview` rely on that layout; changing the
//! stride or the component order is a breaking change to the encoding.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::values::Name;

/// A (min, max, step) triple describing one dimension's slice bounds.
///
/// Each component is an index value; the range covers `min` inclusive to
/// `max` exclusive, advancing by `step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Range {
    pub min: Name,
    pub max: Name,
    pub step: Name,
}

impl Range {
    pub fn new(min: Name, max: Name, step: Name) -> Self {
        Self { min, max, step }
    }
}

/// Flatten per-dimension ranges into a single operand list.
///
/// The output has length `3 * ranges.len()` and follows the fixed layout
/// described in the module documentation.
///
/// Example:
/// ```rust
/// # use lair::{geometry::{flatten_ranges, Range}, values::Name};
/// let ranges = [
///     Range::new(Name(0), Name(1), Name(2)),
///     Range::new(Name(3), Name(4), Name(5)),
/// ];
/// let flat = flatten_ranges(&ranges);
/// assert_eq!(flat.as_slice(), &[Name(0), Name(1), Name(2), Name(3), Name(4), Name(5)]);
/// ```
pub fn flatten_ranges(ranges: &[Range]) -> SmallVec<[Name; 6]> {
    let mut flat = SmallVec::with_capacity(ranges.len() * 3);
    for range in ranges {
        flat.push(range.min);
        flat.push(range.max);
        flat.push(range.step);
    }
    flat
}

/// Group a flat operand list back into per-dimension ranges.
///
/// Returns [`None`] when the list length is not a multiple of three, in which
/// case no consistent grouping exists.
///
/// Example:
/// ```rust
/// # use lair::{geometry::{group_ranges, Range}, values::Name};
/// let grouped = group_ranges(&[Name(0), Name(1), Name(2)]).unwrap();
/// assert_eq!(grouped.as_slice(), &[Range::new(Name(0), Name(1), Name(2))]);
/// assert!(group_ranges(&[Name(0), Name(1)]).is_none());
/// ```
pub fn group_ranges(flat: &[Name]) -> Option<SmallVec<[Range; 4]>> {
    if flat.len() % 3 != 0 {
        return None;
    }

    Some(
        flat.chunks_exact(3)
            .map(|chunk| Range::new(chunk[0], chunk[1], chunk[2]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_then_group_is_identity() {
        let ranges = [
            Range::new(Name(0), Name(1), Name(2)),
            Range::new(Name(5), Name(4), Name(3)),
            Range::new(Name(6), Name(8), Name(7)),
        ];
        let flat = flatten_ranges(&ranges);
        let expected: Vec<Name> = [0, 1, 2, 5, 4, 3, 6, 8, 7].map(Name).to_vec();
        assert_eq!(flat.as_slice(), expected.as_slice());

        let grouped = group_ranges(&flat).expect("whole triples group");
        assert_eq!(grouped.as_slice(), &ranges);
    }

    #[test]
    fn grouping_rejects_partial_triples() {
        for len in [1u32, 2, 4, 5, 7] {
            let flat: Vec<Name> = (0..len).map(Name).collect();
            assert!(group_ranges(&flat).is_none(), "{len} operands must not group");
        }
        assert_eq!(group_ranges(&[]).map(|ranges| ranges.len()), Some(0));
    }

    #[test]
    fn triple_layout_is_three_stride() {
        let ranges = [
            Range::new(Name(10), Name(11), Name(12)),
            Range::new(Name(20), Name(21), Name(22)),
        ];
        let flat = flatten_ranges(&ranges);
        for (i, range) in ranges.iter().enumerate() {
            assert_eq!(flat[3 * i], range.min);
            assert_eq!(flat[3 * i + 1], range.max);
            assert_eq!(flat[3 * i + 2], range.step);
        }
    }
}

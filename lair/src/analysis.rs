//! Buffer ownership analysis.
//!
//! Structural verification deliberately leaves buffer lifetimes unchecked: a
//! region where a buffer is released twice, used after release, or never
//! released at all still verifies. This module holds the separate dataflow
//! pass auditing those lifetimes.
//!
//! Findings are advisory. [`analyze_buffer_ownership`] never fails the
//! region; it reports every issue with the operation positions involved and
//! leaves the decision to warn or reject to the caller.
use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use strum::EnumIs;
use thiserror::Error;

use crate::{
    ops::{LairOp, Op},
    region::Region,
    values::Name,
};

/// A single finding of the buffer ownership analysis.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EnumIs, Error)]
pub enum OwnershipIssue {
    /// A buffer is released more than once.
    #[error(
        "The buffer `{buffer}` released at position {second} was already released at position {first}."
    )]
    DoubleFree {
        buffer: Name,
        first: usize,
        second: usize,
    },

    /// A buffer is used after it has been released.
    #[error(
        "The buffer `{buffer}` is used at position {position} after being released at position {released}."
    )]
    UseAfterFree {
        buffer: Name,
        released: usize,
        position: usize,
    },

    /// A buffer allocated within the region is neither released nor yielded.
    #[error(
        "The buffer `{buffer}` allocated at position {position} is never released and does not escape through the terminator."
    )]
    NeverReleased { buffer: Name, position: usize },
}

/// Audit the buffer lifetimes of a region.
///
/// The pass walks the body once in order and tracks, per buffer name, where
/// the buffer was allocated and where it was released:
///
/// 1. A `dealloc` of an already-released buffer is a
///    [`DoubleFree`](OwnershipIssue::DoubleFree).
/// 2. Any operand referencing a released buffer afterwards is a
///    [`UseAfterFree`](OwnershipIssue::UseAfterFree).
/// 3. A buffer allocated within the region that is neither released nor
///    listed by the terminator is a
///    [`NeverReleased`](OwnershipIssue::NeverReleased). Yielded buffers
///    escape to the enclosing operation, which takes over their release.
///
/// Buffers entering through region parameters are owned by the caller, so
/// they are exempt from the leak check; releasing one here is tracked like
/// any other release.
///
/// The analysis assumes the region already passed [`Region::verify`]; on an
/// unverified region the positions it reports may refer to operations whose
/// operands never resolve.
pub fn analyze_buffer_ownership(region: &Region) -> Vec<OwnershipIssue> {
    let mut allocated: BTreeMap<Name, usize> = BTreeMap::new();
    let mut released: BTreeMap<Name, usize> = BTreeMap::new();
    let mut issues = Vec::new();

    for (position, op) in region.ops.iter().enumerate() {
        match op {
            LairOp::BufferDealloc(dealloc) => {
                if let Some(&first) = released.get(&dealloc.buffer) {
                    issues.push(OwnershipIssue::DoubleFree {
                        buffer: dealloc.buffer,
                        first,
                        second: position,
                    });
                } else {
                    released.insert(dealloc.buffer, position);
                }
            }
            _ => {
                for operand in op.operands() {
                    if let Some(&released_at) = released.get(&operand) {
                        issues.push(OwnershipIssue::UseAfterFree {
                            buffer: operand,
                            released: released_at,
                            position,
                        });
                    }
                }

                if let LairOp::BufferAlloc(alloc) = op {
                    allocated.insert(alloc.dest, position);
                }
            }
        }
    }

    let escaped: BTreeSet<Name> = match region.ops.last() {
        Some(LairOp::Yield(yld)) => yld.values.iter().map(|(name, _)| *name).collect(),
        _ => BTreeSet::new(),
    };

    for (buffer, position) in allocated {
        if !released.contains_key(&buffer) && !escaped.contains(&buffer) {
            issues.push(OwnershipIssue::NeverReleased { buffer, position });
        }
    }

    debug!(
        "buffer ownership analysis reported {} issue(s) over {} operation(s)",
        issues.len(),
        region.ops.len()
    );
    issues
}

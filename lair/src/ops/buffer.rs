//! Buffer storage operations
//!
//! Allocation, deallocation and size queries over flat buffer storage. A
//! buffer is one-dimensional; views layered on top of it carry all
//! multi-dimensional structure, so the operations here never deal with
//! ranks or extents beyond the single buffer size.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
    ops::{Op, OpFlags},
    types::{TypeRegistry, Typeref, shaped::BufferType},
    values::Name,
};

/// Allocate a fresh buffer of the declared type.
///
/// A buffer type with a static size needs no operands; a buffer type with a
/// runtime-determined size takes exactly one index operand supplying the
/// element count. That correspondence is enforced when the operation is
/// built, not by the verifier, so the operation itself stays trait-only.
///
/// Allocation is not pure: every execution produces a distinct buffer, so
/// two allocations of the same type cannot be merged.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BufferAlloc {
    pub dest: Name,

    /// Type of the allocated buffer; also the type of the result.
    pub ty: Typeref,

    /// Dynamic size operands. One index value when the buffer type has a
    /// runtime-determined size, none otherwise.
    pub dynamic_sizes: SmallVec<[Name; 1]>,
}

impl BufferAlloc {
    /// Resolve the declared buffer type against the registry.
    pub fn buffer_type(&self, registry: &TypeRegistry) -> Option<BufferType> {
        registry
            .get(self.ty)
            .and_then(|ty| ty.try_as_buffer_ref().copied())
    }
}

impl Op for BufferAlloc {
    fn flags(&self) -> OpFlags {
        OpFlags::BUFFER
    }

    fn operands(&self) -> impl Iterator<Item = Name> {
        self.dynamic_sizes.iter().copied()
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
        self.dynamic_sizes.iter_mut()
    }
}

/// Release the storage of a buffer.
///
/// Releasing the same buffer twice, or touching a buffer after its release,
/// is a property of the whole region rather than of a single operation; the
/// structural verifier does not track it. The advisory pass in
/// [`crate::analysis`] reports such patterns separately.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BufferDealloc {
    /// The buffer whose storage is released.
    pub buffer: Name,

    /// Declared type of the buffer operand.
    pub ty: Typeref,
}

impl BufferDealloc {
    /// Resolve the declared buffer type against the registry.
    pub fn buffer_type(&self, registry: &TypeRegistry) -> Option<BufferType> {
        registry
            .get(self.ty)
            .and_then(|ty| ty.try_as_buffer_ref().copied())
    }
}

impl Op for BufferDealloc {
    fn flags(&self) -> OpFlags {
        OpFlags::BUFFER
    }

    fn operands(&self) -> impl Iterator<Item = Name> {
        std::iter::once(self.buffer)
    }

    fn referenced_types(&self) -> impl Iterator<Item = Typeref> {
        std::iter::once(self.ty)
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Name> {
        std::iter::once(&mut self.buffer)
    }
}

/// Query the element count of a buffer, producing an index value.
///
/// The query reads buffer metadata only, so it is pure even for buffers
/// whose size is determined at runtime.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BufferSize {
    pub dest: Name,

    /// The buffer whose element count is queried.
    pub buffer: Name,

    /// Declared type of the buffer operand.
    pub ty: Typeref,
}

impl BufferSize {
    /// Resolve the declared buffer type against the registry.
    pub fn buffer_type(&self, registry: &TypeRegistry) -> Option<BufferType> {
        registry
            .get(self.ty)
            .and_then(|ty| ty.try_as_buffer_ref().copied())
    }
}

impl Op for BufferSize {
    fn flags(&self) -> OpFlags {
        OpFlags::BUFFER | OpFlags::PURE
    }

    fn operands(&self) -> impl Iterator<Item = Name> {
        std::iter::once(self.buffer)
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
        std::iter::once(&mut self.buffer)
    }
}

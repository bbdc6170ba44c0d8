//! Types module
//!
//! This module contains the canonical representation of types used by the
//! `lair` crate. It exposes a small type system built on three layers:
//!
//! - Element types: scalar integer and floating-point types (see `elem.rs`).
//! - Shaped types: flat buffers and n-dimensional views (see `shaped.rs`).
//! - A registry-backed [`AnyType`] wrapper and [`TypeRegistry`] which
//!   deduplicates types and provides stable [`Typeref`] identifiers
//!   (UUID-based).
//!
//! Every type is self-contained (shaped types embed their element type
//! directly), so [`AnyType`] implements [`std::fmt::Display`] without needing
//! a resolution context. [`TypeRegistry::fmt`] renders a [`Typeref`] by
//! resolving it first.
use std::{
    collections::BTreeMap,
    hash::{DefaultHasher, Hash, Hasher},
};

use log::{debug, info};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use strum::{EnumIs, EnumTryAs};
use uuid::{Timestamp, Uuid};

use crate::types::{
    elem::ElemType,
    shaped::{BufferType, ViewType},
};
pub mod elem;
pub mod shaped;

/// A stable reference to a type stored inside a `TypeRegistry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Typeref(Uuid);

/// A sum-type representing any type that can be stored in the registry.
///
/// [`AnyType`] implements `Hash`/`Eq` so it can be deduplicated by the
/// [`TypeRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs, EnumTryAs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AnyType {
    /// Scalar element types (e.g. `i32`, `f32`).
    ///
    /// These describe what a buffer or view contains; element values do not
    /// themselves flow through operations in this dialect.
    Elem(ElemType),

    /// The platform-sized unsigned integer used for sizes, dimensions and
    /// range components.
    Index,

    /// A flat block of elements with a static or runtime-determined size.
    Buffer(BufferType),

    /// An n-dimensional indexing structure over buffer storage.
    View(ViewType),
}

impl<S: Into<ElemType>> From<S> for AnyType {
    fn from(value: S) -> Self {
        AnyType::Elem(value.into())
    }
}

impl From<BufferType> for AnyType {
    fn from(value: BufferType) -> Self {
        AnyType::Buffer(value)
    }
}

impl From<ViewType> for AnyType {
    fn from(value: ViewType) -> Self {
        AnyType::View(value)
    }
}

impl std::fmt::Display for AnyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnyType::Elem(elem) => write!(f, "{}", elem),
            AnyType::Index => write!(f, "index"),
            AnyType::Buffer(buffer) => write!(f, "{}", buffer),
            AnyType::View(view) => write!(f, "{}", view),
        }
    }
}

/// A central registry that stores and deduplicates `AnyType` values.
///
/// The registry provides fast lookup by `Typeref` and ensures identical type
/// descriptions map to the same stable identifier.
///
///
/// Example:
///
/// ```rust
/// # use lair::types::{TypeRegistry, elem::IntType};
///
/// let reg = TypeRegistry::new([0u8; 6]);
/// let typeref = reg.search_or_insert(IntType::I8.into());
/// assert_eq!(reg.search_or_insert(IntType::I8.into()), typeref);
/// assert_eq!(reg.get(typeref).as_deref(), Some(&IntType::I8.into()));
/// ```
pub struct TypeRegistry {
    array: RwLock<BTreeMap<Uuid, AnyType>>,
    inverse_lookup: RwLock<BTreeMap<u64, SmallVec<[Uuid; 1]>>>,
    context: uuid::timestamp::context::Context,
    node_id: [u8; 6],
}

impl TypeRegistry {
    fn hash_ty(ty: &AnyType) -> u64 {
        let mut hasher = DefaultHasher::new();
        ty.hash(&mut hasher);
        hasher.finish()
    }

    fn next_uuid(&self) -> Uuid {
        let ts = Timestamp::now(&self.context);
        Uuid::new_v6(ts, &self.node_id)
    }

    /// Create a new [`TypeRegistry`] instance.
    ///
    /// `node_id` is used when allocating UUIDs for newly inserted types.
    pub fn new(node_id: [u8; 6]) -> Self {
        Self {
            array: Default::default(),
            inverse_lookup: Default::default(), // INFO: Always lock array before inverse_lookup to avoid deadlock
            context: uuid::timestamp::context::Context::new(0),
            node_id,
        }
    }

    /// Retrieve a borrowed [`AnyType`] for the given `typeref`. Returns
    /// [`None`] if the given `typeref` is not present in the registry.
    ///
    /// # A note on concurrency
    /// This method internally acquires a read lock on the type storage. As a
    /// result,
    ///  1) Multiple concurrent readers are allowed.
    ///  2) You mustn't hold a read-guard while calling [`Self::search_or_insert`] as
    ///     it may attempt to upgrade to a write lock, leading to a deadlock.
    ///  3) The returned guard keeps the read lock held for the lifetime of the guard.
    ///
    /// Example:
    /// ```rust
    /// # use lair::types::{TypeRegistry, shaped::{BufferType, Extent}, elem::FloatType};
    /// let reg = TypeRegistry::new([0; 6]);
    /// let buffer = BufferType::dynamic(FloatType::F32);
    /// let typeref = reg.search_or_insert(buffer.into());
    /// let guard1 = reg.get(typeref).unwrap();
    /// let guard2 = reg.get(typeref).unwrap();
    /// assert_eq!(&*guard1, &buffer.into());
    /// assert_eq!(&*guard2, &buffer.into());
    /// ```
    pub fn get(&self, typeref: Typeref) -> Option<MappedRwLockReadGuard<'_, AnyType>> {
        let array_lock = self.array.read_recursive();

        // Acquire the typeref
        RwLockReadGuard::try_map(array_lock, |map| map.get(&typeref.0)).ok()
    }

    /// Insert `ty` into the registry if an equivalent type doesn't already
    /// exist and return the [`Typeref`] for it.
    ///
    /// If an identical type is already present, its existing [`Typeref`] is returned,
    /// otherwise if not, a new UUID is allocated and the type is inserted.
    ///
    /// # A note on concurrency
    /// This method internally acquires read locks on the type storage, and
    /// upgrades them to write locks if a new type must be inserted. As a result,
    ///  1) You **MUST NOT** hold a read-guard returned by [`Self::get`] while calling this method,
    ///     as it may attempt to upgrade to a write lock, leading to a deadlock.
    ///  2) Multiple concurrent readers are allowed, but writers are exclusive.
    ///  3) If you also hold a guard returned by [`Self::get`], release it before calling
    ///     this method.
    ///  4) The method uses an "upgradable read lock" pattern to minimize write lock
    ///     contention. We further assume that writes are rare compared to reads, motivating
    ///     this design.
    ///
    /// # About hash collisions
    /// The registry uses a hash-based inverse lookup to quickly find candidate
    /// types. Colliding hashes only degrade the lookup from O(log N) to
    /// O(N log N) in the worst case; correctness is preserved because every
    /// candidate is compared structurally before its identifier is reused.
    pub fn search_or_insert(&self, ty: AnyType) -> Typeref {
        let h = Self::hash_ty(&ty);

        // Lock, notice that the order is critical, always lock first database first
        let mut array_lock = self.array.upgradable_read();
        let mut inverse_lookup_lock = self.inverse_lookup.upgradable_read();

        // Check if it exists in the inverse_lookup
        let typerefs = inverse_lookup_lock.get(&h);
        if let Some(typerefs) = typerefs {
            for typeref in typerefs {
                // Verify if matching
                let elem = &array_lock[typeref];
                if elem == &ty {
                    return Typeref(*typeref);
                }
            }
        }

        // Otherwise if no matches, we inverse the next type
        // NOTE: Ordering of upgrade is paramount to avoid deadlock
        array_lock.with_upgraded(|array_lock| {
            inverse_lookup_lock.with_upgraded(|inverse_lookup_lock| {
                // Reserve a new typeref
                let new_typeref = self.next_uuid();

                // Insert in the inverse_lookup_lock
                if let Some(list) = inverse_lookup_lock.get_mut(&h) {
                    // Important: log collisions at info level with full context.
                    info!(
                        "Detected an hash collision on hash 0x{:016x}. The following types collided:\n{}",
                        h,
                        list.iter()
                            .map(|uuid| match array_lock.get(uuid) {
                                Some(existing) => format!(" - {} -> {}", uuid, existing),
                                None => format!(" - {} -> <missing>", uuid),
                            })
                            .collect::<Vec<_>>()
                            .join("\n"),
                    );

                    // Extra debug detail for the inverse lookup structure.
                    debug!(
                        "Inverse lookup updated for hash 0x{:016x}: {:?} (type {})",
                        h, list, ty
                    );
                    list.push(new_typeref);
                } else {
                    // Normal insertion is a debug-level event.
                    debug!(
                        "New type encountered {}. Registered with UUID {}.",
                        ty, new_typeref
                    );
                    inverse_lookup_lock.insert(h, smallvec![new_typeref]);
                }

                // Insert in array
                array_lock.insert(new_typeref, ty);
                Typeref(new_typeref)
            })
        })
    }

    /// Return the [`Typeref`] of the `index` type, inserting it on first use.
    ///
    /// Several operations produce `index` results (sizes and dimension
    /// queries), so this shorthand avoids spelling the insertion at every
    /// construction site.
    ///
    /// Example:
    /// ```rust
    /// # use lair::types::{AnyType, TypeRegistry};
    /// let reg = TypeRegistry::new([0; 6]);
    /// let typeref = reg.index_type();
    /// assert_eq!(reg.get(typeref).as_deref(), Some(&AnyType::Index));
    /// assert_eq!(reg.index_type(), typeref);
    /// ```
    pub fn index_type(&self) -> Typeref {
        self.search_or_insert(AnyType::Index)
    }

    /// Format a given `Typeref` using this registry.
    pub fn fmt(&self, typeref: Typeref) -> impl std::fmt::Display {
        struct Fmt<'a> {
            registry: &'a TypeRegistry,
            typeref: Typeref,
        }

        impl<'a> std::fmt::Display for Fmt<'a> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.registry.get(self.typeref) {
                    Some(ty_guard) => write!(f, "{}", &*ty_guard),
                    None => write!(f, "<unknown type {}>", self.typeref.0),
                }
            }
        }

        Fmt {
            registry: self,
            typeref,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        elem::{FloatType, IntType},
        shaped::{BufferType, Extent, ViewType},
    };

    #[test]
    fn identical_types_share_one_typeref() {
        let registry = TypeRegistry::new([1; 6]);
        let a = registry.search_or_insert(BufferType::fixed(FloatType::F32, 16).into());
        let b = registry.search_or_insert(BufferType::fixed(FloatType::F32, 16).into());
        let c = registry.search_or_insert(BufferType::fixed(FloatType::F64, 16).into());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn index_type_is_stable() {
        let registry = TypeRegistry::new([0; 6]);
        let first = registry.index_type();
        assert_eq!(registry.index_type(), first);
        assert_eq!(registry.get(first).as_deref(), Some(&AnyType::Index));
    }

    #[test]
    fn registry_fmt_resolves_through_the_guard() {
        let registry = TypeRegistry::new([0; 6]);
        let view = registry.search_or_insert(
            ViewType::new(IntType::I8, [Extent::Dynamic, Extent::Static(3)]).into(),
        );
        assert_eq!(registry.fmt(view).to_string(), "View<?x3xi8>");

        let buffer = registry.search_or_insert(BufferType::dynamic(FloatType::Bf16).into());
        assert_eq!(registry.fmt(buffer).to_string(), "Buffer<?xbf16>");
        assert_eq!(AnyType::Index.to_string(), "index");
    }

    #[test]
    fn foreign_typerefs_resolve_to_none() {
        let registry = TypeRegistry::new([0; 6]);
        let other = TypeRegistry::new([9; 6]);
        let foreign = other.search_or_insert(AnyType::Index);
        assert!(registry.get(foreign).is_none());
    }
}

//! lair: a small SSA dialect for linear-algebra memory management.
//!
//! The dialect models storage with two shaped types and six operations. A
//! [`types::shaped::BufferType`] is a flat, owning block of elements whose
//! size is static or runtime-determined; a [`types::shaped::ViewType`] is a
//! non-owning n-dimensional projection with a fixed rank. The operations
//! allocate, release and measure buffers (`alloc`, `dealloc`, `buffer_size`),
//! query and slice view geometry (`dim`, `subview`), and terminate a region
//! body (`yield`).
//!
//! Building blocks:
//! - [`types`]: element and shaped types plus the deduplicating
//!   [`types::TypeRegistry`] behind stable [`types::Typeref`] identifiers.
//! - [`ops`]: one struct per operation, the [`ops::LairOp`] tagged union, and
//!   the declarative [`ops::OpSchema`] each kind publishes for generic
//!   checking.
//! - [`region`]: the straight-line [`region::Region`] container and its
//!   structural verifier (SSA discipline, schema conformance, the
//!   operation-specific checks, terminator placement).
//! - [`builder`]: the [`builder::RegionBuilder`] construction service with a
//!   typed routine per operation and a kind-driven generic entry point.
//! - [`fmt`] and [`parser`]: the textual surface, one line per operation.
//! - [`analysis`]: an advisory buffer-ownership pass kept separate from
//!   structural verification.
//!
//! Example
//! ```
//! use lair::{
//!     builder::RegionBuilder,
//!     types::{TypeRegistry, elem::FloatType, shaped::BufferType},
//! };
//!
//! let registry = TypeRegistry::new([0; 6]);
//! let mut builder = RegionBuilder::new(&registry);
//!
//! // Allocate a 16-element buffer, measure it, release it, and hand the
//! // size back to the enclosing operation.
//! let buffer = builder.alloc(BufferType::fixed(FloatType::F32, 16), &[])?;
//! let size = builder.buffer_size(buffer)?;
//! builder.dealloc(buffer)?;
//! builder.yield_values(&[size])?;
//!
//! let region = builder.finish();
//! region.verify(&registry)?;
//! # Ok::<(), lair::utils::Error>(())
//! ```

pub mod analysis;
pub mod builder;
pub mod fmt;
pub mod geometry;
pub mod ops;
#[cfg(feature = "chumsky")]
pub mod parser;
pub mod region;
pub mod types;
pub mod utils;
pub mod values;

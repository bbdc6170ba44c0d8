//! Region construction service.
//!
//! [`RegionBuilder`] assembles a [`Region`] one operation at a time. Each
//! catalog entry has a typed routine taking exactly the inputs that
//! operation needs ([`alloc`](RegionBuilder::alloc),
//! [`dealloc`](RegionBuilder::dealloc),
//! [`buffer_size`](RegionBuilder::buffer_size), [`dim`](RegionBuilder::dim),
//! [`subview`](RegionBuilder::subview) /
//! [`subview_flat`](RegionBuilder::subview_flat),
//! [`yield_values`](RegionBuilder::yield_values)); the kind-driven
//! [`build`](RegionBuilder::build) entry point accepts a uniform
//! operand/attribute list instead and decodes it against the kind's
//! [`OpSchema`](crate::ops::OpSchema) before delegating to the typed routine.
//!
//! The builder hands out result names itself and tracks the type of every
//! value defined so far, so construction-level errors (an unknown operand, an
//! operand that is not the buffer or view the routine slices or releases, a
//! dynamic-size operand count that contradicts the buffer type) are reported
//! immediately against the routine that caused them. Checks that depend only
//! on the finished operation, the rank bound of `dim` and the triple arity of
//! `subview` among them, stay with [`Region::verify`]: the builder lets such
//! operations through, and verification rejects them later.
use std::collections::BTreeMap;

use log::debug;
use smallvec::SmallVec;

use crate::{
    geometry::Range,
    ops::{
        AttrKind, AttrSpec, LairOp, LairOpKind,
        buffer::{BufferAlloc, BufferDealloc, BufferSize},
        control::Yield,
        view::{Dim, SubView},
    },
    region::Region,
    types::{TypeRegistry, Typeref, shaped::{BufferType, Extent}},
    utils::Error,
    values::{Attr, Name},
};

/// Incremental builder for a single [`Region`].
///
/// The builder owns the region under construction and borrows the registry
/// for the types the operations mention. Names are allocated densely from
/// zero in definition order (parameters and results alike), so a freshly
/// built region is already in the form [`Region::normalize_names`] produces.
///
/// Example:
/// ```rust
/// # use lair::{builder::RegionBuilder, types::{TypeRegistry, elem::FloatType, shaped::BufferType}};
/// let registry = TypeRegistry::new([0; 6]);
/// let mut builder = RegionBuilder::new(&registry);
///
/// let size = builder.param(registry.index_type());
/// let buffer = builder.alloc(BufferType::dynamic(FloatType::F32), &[size])?;
/// builder.dealloc(buffer)?;
/// builder.yield_values(&[])?;
///
/// let region = builder.finish();
/// region.verify(&registry)?;
/// # Ok::<(), lair::utils::Error>(())
/// ```
pub struct RegionBuilder<'r> {
    registry: &'r TypeRegistry,
    region: Region,
    env: BTreeMap<Name, Typeref>,
    next_name: u32,
}

impl<'r> RegionBuilder<'r> {
    /// Start building an empty region against the given registry.
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            region: Region::default(),
            env: BTreeMap::new(),
            next_name: 0,
        }
    }

    fn fresh_name(&mut self) -> Name {
        let name = Name(self.next_name);
        self.next_name += 1;
        name
    }

    fn push_op(&mut self, op: LairOp) {
        debug!("emit {}", op.opname());
        self.region.ops.push(op);
    }

    /// Type of a value defined earlier in this builder.
    fn lookup(&self, name: Name) -> Result<Typeref, Error> {
        self.env
            .get(&name)
            .copied()
            .ok_or(Error::UndefinedName { undefined: name })
    }

    /// Look up `name` and insist that it holds a buffer.
    fn lookup_buffer(&self, op: &'static str, name: Name) -> Result<Typeref, Error> {
        let typeref = self.lookup(name)?;
        let Some(ty) = self.registry.get(typeref) else {
            return Err(Error::UnresolvedTyperef { op, typeref });
        };
        if !ty.is_buffer() {
            return Err(Error::OperandTypeMismatch {
                op,
                position: 0,
                expected: "buffer",
                found: ty.to_string(),
            });
        }
        Ok(typeref)
    }

    /// Look up `name` and insist that it holds a view.
    fn lookup_view(&self, op: &'static str, name: Name) -> Result<Typeref, Error> {
        let typeref = self.lookup(name)?;
        let Some(ty) = self.registry.get(typeref) else {
            return Err(Error::UnresolvedTyperef { op, typeref });
        };
        if !ty.is_view() {
            return Err(Error::OperandTypeMismatch {
                op,
                position: 0,
                expected: "view",
                found: ty.to_string(),
            });
        }
        Ok(typeref)
    }

    /// Append a region parameter of the given type and return its name.
    pub fn param(&mut self, ty: Typeref) -> Name {
        let name = self.fresh_name();
        self.region.params.push((name, ty));
        self.env.insert(name, ty);
        name
    }

    /// Allocate a buffer of type `ty`.
    ///
    /// A buffer type with a static size takes no dynamic-size operands and a
    /// buffer type with a runtime-determined size exactly one; any other
    /// count is rejected here, since the operation's own verification stays
    /// trait-only.
    pub fn alloc(&mut self, ty: BufferType, dynamic_sizes: &[Name]) -> Result<Name, Error> {
        let expected = match ty.size {
            Extent::Static(_) => 0,
            Extent::Dynamic => 1,
        };
        if dynamic_sizes.len() != expected {
            return Err(Error::AllocSizeOperands {
                buffer: ty.to_string(),
                expected,
                found: dynamic_sizes.len(),
            });
        }
        for &size in dynamic_sizes {
            self.lookup(size)?;
        }

        let typeref = self.registry.search_or_insert(ty.into());
        let dest = self.fresh_name();
        self.env.insert(dest, typeref);
        self.push_op(
            BufferAlloc {
                dest,
                ty: typeref,
                dynamic_sizes: SmallVec::from_slice(dynamic_sizes),
            }
            .into(),
        );
        Ok(dest)
    }

    /// Release the storage of `buffer`.
    pub fn dealloc(&mut self, buffer: Name) -> Result<(), Error> {
        let typeref = self.lookup_buffer("dealloc", buffer)?;
        self.push_op(BufferDealloc { buffer, ty: typeref }.into());
        Ok(())
    }

    /// Query the element count of `buffer`, producing an index value.
    pub fn buffer_size(&mut self, buffer: Name) -> Result<Name, Error> {
        let typeref = self.lookup_buffer("buffer_size", buffer)?;
        let result_ty = self.registry.index_type();
        let dest = self.fresh_name();
        self.env.insert(dest, result_ty);
        self.push_op(BufferSize { dest, buffer, ty: typeref }.into());
        Ok(dest)
    }

    /// Query dimension `index` of `view`, producing an index value.
    ///
    /// The position is recorded as given; whether it lies below the view's
    /// rank is established by [`Region::verify`], not here, so an
    /// out-of-range query can be built and is rejected at verification time.
    pub fn dim(&mut self, view: Name, index: u64) -> Result<Name, Error> {
        let typeref = self.lookup_view("dim", view)?;
        let result_ty = self.registry.index_type();
        let dest = self.fresh_name();
        self.env.insert(dest, result_ty);
        self.push_op(Dim { dest, view, ty: typeref, index }.into());
        Ok(dest)
    }

    /// Slice `view` with one [`Range`] per dimension.
    ///
    /// The ranges are flattened into the fixed per-dimension
    /// (min, max, step) operand layout described in [`crate::geometry`]. The
    /// result has the same type as `view`.
    pub fn subview(&mut self, view: Name, ranges: &[Range]) -> Result<Name, Error> {
        let typeref = self.lookup_view("subview", view)?;
        for range in ranges {
            self.lookup(range.min)?;
            self.lookup(range.max)?;
            self.lookup(range.step)?;
        }

        let dest = self.fresh_name();
        self.env.insert(dest, typeref);
        self.push_op(SubView::from_ranges(dest, view, typeref, ranges).into());
        Ok(dest)
    }

    /// Slice `view` with an operand list already flattened in the
    /// (min, max, step)-per-dimension layout.
    ///
    /// The list's triple arity against the view's rank is a verification
    /// concern, exactly as for [`dim`](Self::dim); this routine only checks
    /// that every operand is defined.
    pub fn subview_flat(&mut self, view: Name, indices: &[Name]) -> Result<Name, Error> {
        let typeref = self.lookup_view("subview", view)?;
        for &index in indices {
            self.lookup(index)?;
        }

        let dest = self.fresh_name();
        self.env.insert(dest, typeref);
        self.push_op(
            SubView {
                dest,
                view,
                ty: typeref,
                indices: SmallVec::from_slice(indices),
            }
            .into(),
        );
        Ok(dest)
    }

    /// Terminate the region, yielding `values` to the enclosing operation.
    pub fn yield_values(&mut self, values: &[Name]) -> Result<(), Error> {
        let mut typed = Vec::with_capacity(values.len());
        for &value in values {
            typed.push((value, self.lookup(value)?));
        }
        self.push_op(Yield { values: typed }.into());
        Ok(())
    }

    /// Construct an operation from its kind, a uniform operand list and an
    /// attribute list, returning the result name when the kind produces one.
    ///
    /// This is the schema-driven counterpart of the typed routines: the
    /// operand count is validated against the kind's
    /// [`OpSchema`](crate::ops::OpSchema) and the declared attributes are
    /// decoded before the typed routine runs, so a wrong-arity call for a
    /// fixed-arity kind (say, `dealloc` with zero or two operands) is
    /// rejected here as a schema mismatch. Attributes beyond the declared
    /// ones are ignored.
    ///
    /// Example:
    /// ```rust
    /// # use lair::{builder::RegionBuilder, ops::LairOpKind, types::{TypeRegistry, elem::FloatType, shaped::BufferType}, values::Attr};
    /// let registry = TypeRegistry::new([0; 6]);
    /// let buffer_ty = registry.search_or_insert(BufferType::fixed(FloatType::F32, 8).into());
    ///
    /// let mut builder = RegionBuilder::new(&registry);
    /// let buffer = builder
    ///     .build(LairOpKind::BufferAlloc, &[], &[Attr::ty("type", buffer_ty)])?
    ///     .expect("alloc produces a result");
    /// builder.build(LairOpKind::BufferDealloc, &[buffer], &[])?;
    /// # Ok::<(), lair::utils::Error>(())
    /// ```
    pub fn build(
        &mut self,
        kind: LairOpKind,
        operands: &[Name],
        attrs: &[Attr],
    ) -> Result<Option<Name>, Error> {
        let schema = kind.schema();
        let opname = kind.opname();

        if !schema.admits_operand_count(operands.len()) {
            return Err(Error::OperandCountMismatch {
                op: opname,
                expected: schema.count_description(),
                found: operands.len(),
            });
        }

        // The count check above guarantees the fixed operand positions the
        // arms below index into.
        match kind {
            LairOpKind::BufferAlloc => {
                let typeref = ty_attr(opname, attrs, schema.attrs[0])?;
                let buffer = self.resolve_buffer_type(opname, typeref)?;
                self.alloc(buffer, operands).map(Some)
            }
            LairOpKind::BufferDealloc => self.dealloc(operands[0]).map(|()| None),
            LairOpKind::BufferSize => self.buffer_size(operands[0]).map(Some),
            LairOpKind::Dim => {
                let index = int_attr(opname, attrs, schema.attrs[0])?;
                self.dim(operands[0], index).map(Some)
            }
            LairOpKind::SubView => self.subview_flat(operands[0], &operands[1..]).map(Some),
            LairOpKind::Yield => self.yield_values(operands).map(|()| None),
        }
    }

    /// Resolve the type attribute of an allocation down to its buffer type.
    fn resolve_buffer_type(&self, op: &'static str, typeref: Typeref) -> Result<BufferType, Error> {
        let Some(ty) = self.registry.get(typeref) else {
            return Err(Error::UnresolvedTyperef { op, typeref });
        };
        match ty.try_as_buffer_ref() {
            Some(buffer) => Ok(*buffer),
            None => Err(Error::ResultTypeMismatch {
                op,
                expected: "buffer",
                found: ty.to_string(),
            }),
        }
    }

    /// The region as built so far.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Finish construction and hand back the region.
    pub fn finish(self) -> Region {
        self.region
    }
}

fn int_attr(op: &'static str, attrs: &[Attr], spec: AttrSpec) -> Result<u64, Error> {
    let Some(attr) = attrs.iter().find(|attr| attr.name == spec.name) else {
        return Err(Error::MissingAttribute { op, attr: spec.name });
    };
    attr.value.try_as_int().ok_or(Error::AttributeTypeMismatch {
        op,
        attr: spec.name,
        expected: AttrKind::Int.describe(),
    })
}

fn ty_attr(op: &'static str, attrs: &[Attr], spec: AttrSpec) -> Result<Typeref, Error> {
    let Some(attr) = attrs.iter().find(|attr| attr.name == spec.name) else {
        return Err(Error::MissingAttribute { op, attr: spec.name });
    };
    attr.value.try_as_ty().ok_or(Error::AttributeTypeMismatch {
        op,
        attr: spec.name,
        expected: AttrKind::Ty.describe(),
    })
}

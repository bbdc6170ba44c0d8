//! Pretty-print helpers for lair operations and regions.
//!
//! The forms produced here are exactly the ones [`crate::parser`] accepts,
//! so printing a verified region and parsing the text back yields a region
//! equal to the original up to name normalization (see
//! [`Region::normalize_names`]).
use crate::{ops::LairOp, region::Region, types::TypeRegistry};

impl LairOp {
    /// Build a formatting helper that renders the operation using the given
    /// registry to resolve its type references.
    ///
    /// ```text
    /// %0 = alloc(%size) : Buffer<?xf32>
    /// dealloc %0 : Buffer<16xf32>
    /// %1 = buffer_size %0 : Buffer<?xf32>
    /// %1 = dim %0, 2 : View<?x?x?xf32>
    /// %7 = subview %0[%1, %2, %3, %4, %5, %6] : View<?x?xf32>
    /// yield %1, %2 : f32, f32
    /// ```
    pub fn fmt<'a>(&'a self, registry: &'a TypeRegistry) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            op: &'a LairOp,
            registry: &'a TypeRegistry,
        }

        impl<'a> std::fmt::Display for Fmt<'a> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.op {
                    LairOp::BufferAlloc(alloc) => {
                        write!(f, "{} = alloc(", alloc.dest)?;
                        let mut first = true;
                        for size in &alloc.dynamic_sizes {
                            if first {
                                first = false;
                            } else {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", size)?;
                        }
                        write!(f, ") : {}", self.registry.fmt(alloc.ty))
                    }
                    LairOp::BufferDealloc(dealloc) => {
                        write!(
                            f,
                            "dealloc {} : {}",
                            dealloc.buffer,
                            self.registry.fmt(dealloc.ty)
                        )
                    }
                    LairOp::BufferSize(size) => {
                        write!(
                            f,
                            "{} = buffer_size {} : {}",
                            size.dest,
                            size.buffer,
                            self.registry.fmt(size.ty)
                        )
                    }
                    LairOp::Dim(dim) => {
                        write!(
                            f,
                            "{} = dim {}, {} : {}",
                            dim.dest,
                            dim.view,
                            dim.index,
                            self.registry.fmt(dim.ty)
                        )
                    }
                    LairOp::SubView(subview) => {
                        write!(f, "{} = subview {}[", subview.dest, subview.view)?;
                        let mut first = true;
                        for index in &subview.indices {
                            if first {
                                first = false;
                            } else {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", index)?;
                        }
                        write!(f, "] : {}", self.registry.fmt(subview.ty))
                    }
                    LairOp::Yield(yld) => {
                        write!(f, "yield")?;
                        if yld.values.is_empty() {
                            return Ok(());
                        }

                        let mut first = true;
                        for (value, _) in &yld.values {
                            if first {
                                first = false;
                                write!(f, " {}", value)?;
                            } else {
                                write!(f, ", {}", value)?;
                            }
                        }

                        write!(f, " : ")?;
                        let mut first = true;
                        for (_, ty) in &yld.values {
                            if first {
                                first = false;
                            } else {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", self.registry.fmt(*ty))?;
                        }
                        Ok(())
                    }
                }
            }
        }

        Fmt { op: self, registry }
    }
}

impl Region {
    /// Build a formatting helper that renders the region in textual form.
    pub fn fmt<'a>(&'a self, registry: &'a TypeRegistry) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            region: &'a Region,
            registry: &'a TypeRegistry,
        }

        impl<'a> std::fmt::Display for Fmt<'a> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "region (")?;
                let mut first = true;
                for (param_name, param_type) in &self.region.params {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", param_name, self.registry.fmt(*param_type))?;
                }
                writeln!(f, ") {{")?;

                for op in &self.region.ops {
                    writeln!(f, "  {}", op.fmt(self.registry))?;
                }

                writeln!(f, "}}")?;
                Ok(())
            }
        }

        Fmt {
            region: self,
            registry,
        }
    }
}

//! Region container and structural verification.
//!
//! A [`Region`] is a straight-line body of operations with typed parameters.
//! Values flow in SSA form: each name is defined exactly once, either as a
//! parameter or as an operation result, and every use must follow its
//! definition. [`Region::verify`] checks the whole body in one pass, layering
//! the checks so that generic, schema-driven validation always precedes the
//! operation-specific verifiers:
//!
//! 1. name discipline (unique definitions, no forward or dangling uses),
//! 2. schema conformance (operand counts, operand/result type constraints,
//!    agreement between declared and bound types),
//! 3. operation-specific verifiers (rank bounds, range arity),
//! 4. terminator placement.
//!
//! The first violation is reported and checking stops, so diagnostics always
//! describe the earliest problem in body order.
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    ops::{LairOp, Op},
    types::{TypeRegistry, Typeref},
    utils::Error,
    values::Name,
};

/// A straight-line sequence of operations with typed parameters.
///
/// Parameters are represented as a list of `(Name, Typeref)` pairs and are
/// in scope from the first operation onward. A non-empty body must end with
/// exactly one terminator.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    pub params: Vec<(Name, Typeref)>,
    pub ops: Vec<LairOp>,
}

impl Region {
    /// Region with the given parameters and an empty body.
    pub fn new(params: Vec<(Name, Typeref)>) -> Self {
        Self {
            params,
            ops: Vec::new(),
        }
    }

    /// Find the next [`Name`] not used by any parameter, operand or
    /// destination in this region.
    pub fn next_available_name(&self) -> Name {
        let mut next = 0;
        for (name, _) in &self.params {
            next = next.max(name.0 + 1);
        }

        for op in &self.ops {
            for operand in op.operands() {
                next = next.max(operand.0 + 1);
            }
            if let Some(dest) = op.destination() {
                next = next.max(dest.0 + 1);
            }
        }

        Name(next)
    }

    /// Verify the structural validity of the region.
    ///
    /// Checks run in body order and stop at the first violation: SSA name
    /// discipline first, then for each operation its schema conformance
    /// followed by its operation-specific verifier, and finally terminator
    /// placement. An empty body is valid; a non-empty body must end with a
    /// terminator and contain no terminator anywhere else.
    pub fn verify(&self, registry: &TypeRegistry) -> Result<(), Error> {
        // Collect every defined name upfront to tell forward references
        // apart from names that are never defined at all.
        let mut all_defs = BTreeSet::new();
        for (name, _) in &self.params {
            if !all_defs.insert(*name) {
                return Err(Error::DuplicateName { duplicate: *name });
            }
        }
        for op in &self.ops {
            if let Some(dest) = op.destination() {
                if !all_defs.insert(dest) {
                    return Err(Error::DuplicateName { duplicate: dest });
                }
            }
        }

        // Intern the index type before the walk below takes any read guard;
        // result-type queries may otherwise upgrade the registry lock while
        // a guard is held.
        let _ = registry.index_type();

        let mut env: BTreeMap<Name, Typeref> = self.params.iter().copied().collect();
        for (position, op) in self.ops.iter().enumerate() {
            for operand in op.operands() {
                if !env.contains_key(&operand) {
                    return if all_defs.contains(&operand) {
                        Err(Error::UseBeforeDef {
                            name: operand,
                            position,
                        })
                    } else {
                        Err(Error::UndefinedName { undefined: operand })
                    };
                }
            }

            self.check_schema(op, &env, registry)?;
            op.verify(registry)?;

            if let Some(dest) = op.destination() {
                if let Some(ty) = op.result_type(registry) {
                    env.insert(dest, ty);
                }
            }
        }

        // A non-empty body ends with its only terminator.
        if let Some((last, rest)) = self.ops.split_last() {
            if !last.is_terminator() {
                return Err(Error::MissingTerminator);
            }
            for (position, op) in rest.iter().enumerate() {
                if op.is_terminator() {
                    return Err(Error::TerminatorNotLast { position });
                }
            }
        }

        Ok(())
    }

    /// Check one operation against the declarative schema of its kind.
    fn check_schema(
        &self,
        op: &LairOp,
        env: &BTreeMap<Name, Typeref>,
        registry: &TypeRegistry,
    ) -> Result<(), Error> {
        let kind = op.kind();
        let schema = kind.schema();
        let opname = kind.opname();

        let count = op.operands().count();
        if !schema.admits_operand_count(count) {
            return Err(Error::OperandCountMismatch {
                op: opname,
                expected: schema.count_description(),
                found: count,
            });
        }

        for (position, operand) in op.operands().enumerate() {
            // The caller has already established that every operand is bound.
            let Some(&bound) = env.get(&operand) else {
                return Err(Error::UndefinedName { undefined: operand });
            };

            let bound_ty = match registry.get(bound) {
                Some(guard) => guard.clone(),
                None => {
                    return Err(Error::UnresolvedTyperef {
                        op: opname,
                        typeref: bound,
                    });
                }
            };

            if let Some(constraint) = schema.operand_constraint(position) {
                if !constraint.admits(&bound_ty) {
                    return Err(Error::OperandTypeMismatch {
                        op: opname,
                        position,
                        expected: constraint.describe(),
                        found: bound_ty.to_string(),
                    });
                }
            }

            if let Some(declared) = op.declared_operand_type(position) {
                if declared != bound {
                    let declared_ty = registry
                        .get(declared)
                        .map(|guard| guard.to_string())
                        .unwrap_or_else(|| format!("{:?}", declared));
                    return Err(Error::TypeMismatch {
                        op: opname,
                        position,
                        declared: declared_ty,
                        found: bound_ty.to_string(),
                    });
                }
            }
        }

        if let Some(constraint) = schema.result {
            if let Some(result) = op.result_type(registry) {
                let Some(result_ty) = registry.get(result).map(|guard| guard.clone()) else {
                    return Err(Error::UnresolvedTyperef {
                        op: opname,
                        typeref: result,
                    });
                };
                if !constraint.admits(&result_ty) {
                    return Err(Error::ResultTypeMismatch {
                        op: opname,
                        expected: constraint.describe(),
                        found: result_ty.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Normalize the region by ensuring that all SSA names are sequentially
    /// numbered from zero upwards without gaps. Parameters come first,
    /// followed by operation destinations in body order.
    pub fn normalize_names(&mut self) {
        let mut name_mapping = BTreeMap::new();
        let mut next_name = 0u32;

        // Remap all names in parameters
        for (name, _) in self.params.iter_mut() {
            let _output = name_mapping.insert(*name, Name(next_name));
            debug_assert!(_output.is_none());
            *name = Name(next_name);
            next_name += 1;
        }

        // For each operation destination, allocate a new name
        for op in &self.ops {
            if let Some(dest) = op.destination() {
                let _output = name_mapping.insert(dest, Name(next_name));
                debug_assert!(_output.is_none());
                next_name += 1;
            }
        }

        // Now remap all operands and destinations according to the mapping
        for op in &mut self.ops {
            op.remap_operands(|name| name_mapping.get(&name).copied());
            if let Some(dest) = op.destination() {
                if let Some(new_dest) = name_mapping.get(&dest) {
                    op.set_destination(*new_dest);
                }
            }
        }
    }
}

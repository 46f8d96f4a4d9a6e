//! Variable typing accumulated along a clause.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::instance::Instance;
use crate::types::TypeId;
use crate::vocabulary::Vocabulary;

type Bindings = SmallVec<[Option<TypeId>; 8]>;

/// Why an atom cannot be typed in an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeConflict {
    pub variable: u32,
    pub bound: TypeId,
    pub required: TypeId,
}

/// Persistent mapping from variable index to the most specific type seen.
///
/// Extension never mutates a shared binding table: the table sits behind an
/// `Arc` and is copied only when an extended environment diverges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    bindings: Arc<Bindings>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_of(&self, var: u32) -> Option<TypeId> {
        self.bindings.get(var as usize).copied().flatten()
    }

    /// Number of variable slots, bound or not.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.iter().all(Option::is_none)
    }

    /// Whether every argument of `instance` is type-compatible with the
    /// current bindings (and with the other arguments on the same variable).
    pub fn is_valid_instance(&self, vocabulary: &Vocabulary, instance: &Instance) -> bool {
        self.refine(vocabulary, instance).is_ok()
    }

    /// Extend with the argument types of `instance`, keeping for each
    /// variable the deeper of the old and new types.
    pub fn add_instance(
        &self,
        vocabulary: &Vocabulary,
        instance: &Instance,
    ) -> Result<Environment, TypeConflict> {
        let updates = self.refine(vocabulary, instance)?;
        if updates.is_empty() {
            return Ok(self.clone());
        }
        let mut next = self.clone();
        let bindings = Arc::make_mut(&mut next.bindings);
        for (var, ty) in updates {
            let idx = var as usize;
            if bindings.len() <= idx {
                bindings.resize(idx + 1, None);
            }
            bindings[idx] = Some(ty);
        }
        Ok(next)
    }

    /// Compute the bindings that change when `instance` is added.
    fn refine(
        &self,
        vocabulary: &Vocabulary,
        instance: &Instance,
    ) -> Result<SmallVec<[(u32, TypeId); 4]>, TypeConflict> {
        let types = vocabulary.types();
        let arg_types = vocabulary.predicate(instance.predicate()).arg_types();
        let mut updates: SmallVec<[(u32, TypeId); 4]> = SmallVec::new();
        for (&var, &required) in instance.vars().iter().zip(arg_types) {
            let pending = updates.iter().position(|(v, _)| *v == var);
            let bound = match pending {
                Some(i) => Some(updates[i].1),
                None => self.type_of(var),
            };
            let refined = match bound {
                None => required,
                Some(bound) => types.most_specific(bound, required).ok_or(TypeConflict {
                    variable: var,
                    bound,
                    required,
                })?,
            };
            if Some(refined) == bound {
                continue;
            }
            match pending {
                Some(i) => updates[i].1 = refined,
                None => updates.push((var, refined)),
            }
        }
        Ok(updates)
    }
}

#[cfg(test)]
#[path = "tests/environment.rs"]
mod tests;

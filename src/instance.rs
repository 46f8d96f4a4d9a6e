use std::fmt;
use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use crate::vocabulary::{ArgumentOrder, PredicateId, Vocabulary};

/// Variable indices of an atom; most predicates are at most binary or ternary.
pub type Args = SmallVec<[u32; 4]>;

/// A predicate applied to variable indices.
///
/// Arguments of symmetric predicates are stored sorted, so two instances are
/// equal exactly when they denote the same atom.
#[derive(Debug, Clone)]
pub struct Instance {
    predicate: PredicateId,
    order: ArgumentOrder,
    vars: Args,
}

impl Instance {
    pub fn new(predicate: PredicateId, order: ArgumentOrder, vars: &[u32]) -> Self {
        let mut vars = Args::from_slice(vars);
        order.canonicalize(&mut vars);
        Self {
            predicate,
            order,
            vars,
        }
    }

    pub fn predicate(&self) -> PredicateId {
        self.predicate
    }

    pub fn order(&self) -> ArgumentOrder {
        self.order
    }

    pub fn vars(&self) -> &[u32] {
        &self.vars
    }

    pub fn arity(&self) -> usize {
        self.vars.len()
    }

    pub fn is_nullary(&self) -> bool {
        self.vars.is_empty()
    }

    /// Highest variable index referenced, None for nullary atoms.
    pub fn max(&self) -> Option<u32> {
        self.vars.iter().copied().max()
    }

    /// One past the highest variable index, 0 for nullary atoms.
    pub fn rank(&self) -> u32 {
        self.max().map_or(0, |m| m + 1)
    }

    pub fn references(&self, var: u32) -> bool {
        self.vars.contains(&var)
    }

    /// Number of distinct variables.
    pub fn distinct_vars(&self) -> usize {
        let mut seen: SmallVec<[u32; 4]> = SmallVec::new();
        for v in &self.vars {
            if !seen.contains(v) {
                seen.push(*v);
            }
        }
        seen.len()
    }

    /// Apply `renaming[old] = new` to every argument.
    ///
    /// Returns None if some variable has no image.
    pub fn renamed(&self, renaming: &[Option<u32>]) -> Option<Instance> {
        let vars = self
            .vars
            .iter()
            .map(|v| renaming.get(*v as usize).copied().flatten())
            .collect::<Option<Args>>()?;
        Some(Instance::new(self.predicate, self.order, &vars))
    }

    /// Argument arrangements that denote this same atom: all permutations for
    /// symmetric predicates, the stored order otherwise.
    pub fn arrangements(&self) -> Vec<Args> {
        if !self.order.is_symmetric() || self.vars.len() < 2 {
            return vec![self.vars.clone()];
        }
        let mut out: Vec<Args> = Vec::new();
        for perm in crate::clause::Permutations::new(self.vars.len()) {
            let arranged: Args = perm.iter().map(|&i| self.vars[i]).collect();
            if !out.contains(&arranged) {
                out.push(arranged);
            }
        }
        out
    }

    /// Render with vocabulary names, e.g. `parent(x0, x1)`.
    pub fn display<'a>(&'a self, vocabulary: &'a Vocabulary) -> InstanceDisplay<'a> {
        InstanceDisplay {
            instance: self,
            vocabulary,
        }
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.predicate == other.predicate && self.order.same_arguments(&self.vars, &other.vars)
    }
}

impl Eq for Instance {}

impl Hash for Instance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.predicate.hash(state);
        if self.order.is_symmetric() {
            let mut sorted = self.vars.clone();
            sorted.sort_unstable();
            sorted.hash(state);
        } else {
            self.vars.hash(state);
        }
    }
}

pub struct InstanceDisplay<'a> {
    instance: &'a Instance,
    vocabulary: &'a Vocabulary,
}

impl fmt::Display for InstanceDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(",
            self.vocabulary.predicate_name(self.instance.predicate)
        )?;
        for (i, v) in self.instance.vars.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "x{v}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
#[path = "tests/instance.rs"]
mod tests;

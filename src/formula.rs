//! Solver-facing rendering of a clause.
//!
//! A [`Formula`] is detached from the universe and from interned names so it
//! can be hashed as a cache key, shipped to a worker thread and serialized
//! for the oracle protocol.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clause::StatusClause;
use crate::universe::Role;
use crate::vocabulary::GENERIC_TYPE_NAME;

/// One atom over formula variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormulaAtom {
    pub predicate: String,
    pub args: Vec<u32>,
}

/// Universally closed `body => head` with typed variables.
///
/// The body is a conjunction, the head a disjunction. `variables[i]` is the
/// type name of `x{i}`. Distinct variables of compatible types are kept
/// apart by explicit `inequalities` (object identity semantics); pairs are
/// `(i, j)` with `i < j`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Formula {
    pub variables: Vec<String>,
    pub body: Vec<FormulaAtom>,
    pub head: Vec<FormulaAtom>,
    #[serde(default)]
    pub inequalities: Vec<(u32, u32)>,
}

impl Formula {
    pub fn from_clause(clause: &StatusClause) -> Self {
        let universe = clause.universe();
        let vocabulary = universe.vocabulary();
        let environment = clause.environment();

        let atom = |role: Role| -> Vec<FormulaAtom> {
            clause
                .atoms(role)
                .map(|inst| FormulaAtom {
                    predicate: vocabulary.predicate_name(inst.predicate()).to_string(),
                    args: inst.vars().to_vec(),
                })
                .collect()
        };

        let types: Vec<_> = (0..clause.rank()).map(|v| environment.type_of(v)).collect();
        let variables = types
            .iter()
            .map(|ty| match ty {
                Some(ty) => vocabulary.type_name(*ty).to_string(),
                None => GENERIC_TYPE_NAME.to_string(),
            })
            .collect();

        let hierarchy = vocabulary.types();
        let mut inequalities = Vec::new();
        for (i, a) in types.iter().enumerate() {
            for (j, b) in types.iter().enumerate().skip(i + 1) {
                let related = match (a, b) {
                    (Some(a), Some(b)) => hierarchy.compatible(*a, *b),
                    _ => true,
                };
                if related {
                    inequalities.push((i as u32, j as u32));
                }
            }
        }

        Formula {
            variables,
            body: atom(Role::Body),
            head: atom(Role::Head),
            inequalities,
        }
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Literal count, body plus head.
    pub fn len(&self) -> usize {
        self.body.len() + self.head.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty() && self.head.is_empty()
    }
}

impl fmt::Display for FormulaAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate)?;
        if self.args.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, v) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "x{v}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut premises: Vec<String> = self.body.iter().map(ToString::to_string).collect();
        premises.extend(
            self.inequalities
                .iter()
                .map(|(a, b)| format!("x{a} != x{b}")),
        );
        if premises.is_empty() {
            write!(f, "true")?;
        } else {
            write!(f, "{}", premises.join(" & "))?;
        }
        write!(f, " => ")?;
        if self.head.is_empty() {
            write!(f, "false")
        } else {
            let conclusions: Vec<String> = self.head.iter().map(ToString::to_string).collect();
            write!(f, "{}", conclusions.join(" | "))
        }
    }
}

#[cfg(test)]
#[path = "tests/formula.rs"]
mod tests;

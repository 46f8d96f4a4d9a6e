//! Declarative restrictions on which literals may extend a clause.
//!
//! A bias is consulted before the clause's own admission rules. Each policy
//! can positively enable a candidate or veto it; a candidate passes when
//! some policy enables it or no policy disables it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clause::StatusClause;
use crate::error::{Error, Result};
use crate::universe::{InstanceUniverse, Literal, Role};

pub trait Bias: Send + Sync {
    fn enables(&self, _current: &StatusClause, _test: Literal) -> bool {
        false
    }

    fn disables(&self, _current: &StatusClause, _test: Literal) -> bool {
        false
    }

    /// Whether `test` may be tried as an extension of `current`.
    fn admits(&self, current: &StatusClause, test: Literal) -> bool {
        self.enables(current, test) || !self.disables(current, test)
    }

    fn combine_with<B>(self, other: B) -> CombinedBias
    where
        Self: Sized + 'static,
        B: Bias + 'static,
    {
        CombinedBias::new(vec![Box::new(self), Box::new(other)])
    }

    /// Apply this bias only to candidates of `role`.
    fn restrict(self, role: Role) -> RestrictedBias
    where
        Self: Sized + 'static,
    {
        RestrictedBias {
            inner: Box::new(self),
            role,
        }
    }
}

impl Bias for Box<dyn Bias> {
    fn enables(&self, current: &StatusClause, test: Literal) -> bool {
        (**self).enables(current, test)
    }

    fn disables(&self, current: &StatusClause, test: Literal) -> bool {
        (**self).disables(current, test)
    }
}

/// Every new atom must share a variable with the clause.
///
/// Empty clauses and atoms without variables are exempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectivityBias;

impl Bias for ConnectivityBias {
    fn disables(&self, current: &StatusClause, test: Literal) -> bool {
        let rank = current.rank();
        if rank == 0 {
            return false;
        }
        match current.universe().get(test.position) {
            Some(inst) => !inst.is_nullary() && !inst.vars().iter().any(|&v| v < rank),
            None => true,
        }
    }
}

/// New variables must continue the clause's numbering without holes.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderingBias;

impl Bias for OrderingBias {
    fn disables(&self, current: &StatusClause, test: Literal) -> bool {
        let Some(inst) = current.universe().get(test.position) else {
            return true;
        };
        let rank = current.rank();
        let Some(max) = inst.max() else {
            return false;
        };
        if max < rank {
            return false;
        }
        let introduced = (rank..=max).all(|v| inst.references(v));
        !introduced
    }
}

/// Caps how far a single literal may raise the clause rank.
///
/// Body literals may reach one variable past the current rank, head literals
/// must stay within it. An optional `cap` lowers the ceiling below the
/// variable budget.
#[derive(Debug, Clone)]
pub struct RankMaskBias {
    universe: Arc<InstanceUniverse>,
    cap: Option<u32>,
}

impl RankMaskBias {
    pub fn new(universe: Arc<InstanceUniverse>, cap: Option<u32>) -> Self {
        Self { universe, cap }
    }

    fn ceiling(&self, current: &StatusClause, role: Role) -> u32 {
        let reach = match role {
            Role::Body => current.rank() + 1,
            Role::Head => current.rank(),
        };
        match self.cap {
            Some(cap) => reach.min(cap),
            None => reach,
        }
    }
}

impl Bias for RankMaskBias {
    fn disables(&self, current: &StatusClause, test: Literal) -> bool {
        let mask = self.universe.rank_mask(self.ceiling(current, test.role));
        !mask.contains(test.position as usize)
    }
}

/// Calculated predicates are derived data and never conclusions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculatedHeadBias;

impl Bias for CalculatedHeadBias {
    fn disables(&self, current: &StatusClause, test: Literal) -> bool {
        if test.role != Role::Head {
            return false;
        }
        let universe = current.universe();
        match universe.get(test.position) {
            Some(inst) => universe.vocabulary().predicate(inst.predicate()).is_calculated(),
            None => true,
        }
    }
}

/// Logical OR of its parts, separately for enabling and disabling.
#[derive(Default)]
pub struct CombinedBias {
    parts: Vec<Box<dyn Bias>>,
}

impl CombinedBias {
    pub fn new(parts: Vec<Box<dyn Bias>>) -> Self {
        Self { parts }
    }

    pub fn push(&mut self, bias: impl Bias + 'static) {
        self.parts.push(Box::new(bias));
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl Bias for CombinedBias {
    fn enables(&self, current: &StatusClause, test: Literal) -> bool {
        self.parts.iter().any(|b| b.enables(current, test))
    }

    fn disables(&self, current: &StatusClause, test: Literal) -> bool {
        self.parts.iter().any(|b| b.disables(current, test))
    }
}

/// Applies `inner` to candidates of one role and ignores the rest.
pub struct RestrictedBias {
    inner: Box<dyn Bias>,
    role: Role,
}

impl Bias for RestrictedBias {
    fn enables(&self, current: &StatusClause, test: Literal) -> bool {
        test.role == self.role && self.inner.enables(current, test)
    }

    fn disables(&self, current: &StatusClause, test: Literal) -> bool {
        test.role == self.role && self.inner.disables(current, test)
    }
}

/// Which policies make up the default bias stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasConfig {
    pub connectivity: bool,
    pub ordering: bool,
    pub rank_mask: bool,
    /// Highest rank the rank mask lets a literal reach.
    pub rank_cap: Option<u32>,
    pub calculated_heads: bool,
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            connectivity: true,
            ordering: true,
            rank_mask: false,
            rank_cap: None,
            calculated_heads: true,
        }
    }
}

impl BiasConfig {
    pub fn validate(&self, variable_budget: u32) -> Result<()> {
        if let Some(cap) = self.rank_cap {
            if !self.rank_mask {
                return Err(Error::Config("rank_cap requires rank_mask".into()));
            }
            if cap == 0 || cap > variable_budget {
                return Err(Error::Config(format!(
                    "rank_cap {cap} must lie in 1..={variable_budget}"
                )));
            }
        }
        Ok(())
    }

    pub fn build(&self, universe: &Arc<InstanceUniverse>) -> CombinedBias {
        let mut stack = CombinedBias::default();
        if self.connectivity {
            stack.push(ConnectivityBias);
        }
        if self.ordering {
            stack.push(OrderingBias);
        }
        if self.rank_mask {
            stack.push(RankMaskBias::new(Arc::clone(universe), self.rank_cap));
        }
        if self.calculated_heads {
            stack.push(CalculatedHeadBias);
        }
        stack
    }
}

#[cfg(test)]
#[path = "tests/bias.rs"]
mod tests;

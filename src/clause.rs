//! Partially built clauses and their admission rules.
//!
//! A [`StatusClause`] is an ordered trail of literal selections together with
//! the typing environment the trail induces. Clauses are values: extending
//! one returns a new clause and leaves the original untouched.
//!
//! Trail invariants maintained by [`StatusClause::add_if_valid`]:
//! 1. body literals precede head literals;
//! 2. once a variable is in scope, every new atom mentions one that is;
//! 3. new variables appear in increasing order, without gaps, and never in
//!    the head;
//! 4. no atom is selected twice, in either role;
//! 5. `rank` is one past the highest variable introduced.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashSet;
use smallvec::SmallVec;

use crate::bitset::LiteralSet;
use crate::environment::{Environment, TypeConflict};
use crate::error::{Error, Result};
use crate::formula::Formula;
use crate::instance::Instance;
use crate::universe::{InstanceUniverse, Literal, PositionedInstance, Role};

pub type Trail = SmallVec<[Literal; 8]>;

type Renaming = SmallVec<[Option<u32>; 8]>;

/// Why a literal may not extend a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The position lies outside the universe.
    UnknownPosition,
    /// A body literal after the head has started.
    RoleConflict,
    /// Not strictly after the last literal of the same role.
    OutOfOrder,
    /// The atom's argument types clash with the current bindings.
    Typing(TypeConflict),
    /// The atom is already selected.
    Duplicate,
    /// The atom shares no variable with the clause.
    Disconnected,
    /// The atom skips a variable index or introduces them out of order.
    VariableGap,
    /// A head atom would introduce a variable.
    HeadIntroducesVariable,
}

/// A clause under construction.
#[derive(Clone)]
pub struct StatusClause {
    universe: Arc<InstanceUniverse>,
    trail: Trail,
    selected: LiteralSet,
    environment: Environment,
    rank: u32,
}

impl StatusClause {
    /// The empty clause: no literals, rank 0, no bindings.
    pub fn empty(universe: Arc<InstanceUniverse>) -> Self {
        let capacity = universe.size();
        Self {
            universe,
            trail: SmallVec::new(),
            selected: LiteralSet::empty(capacity),
            environment: Environment::new(),
            rank: 0,
        }
    }

    /// Build a clause by adding `literals` in order; None if any is rejected.
    pub fn from_literals(
        universe: Arc<InstanceUniverse>,
        literals: impl IntoIterator<Item = Literal>,
    ) -> Option<Self> {
        literals
            .into_iter()
            .try_fold(Self::empty(universe), |clause, lit| clause.add_if_valid(lit))
    }

    pub fn universe(&self) -> &Arc<InstanceUniverse> {
        &self.universe
    }

    pub fn trail(&self) -> &[Literal] {
        &self.trail
    }

    pub fn selected(&self) -> &LiteralSet {
        &self.selected
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// One past the highest variable index introduced.
    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub fn len(&self) -> usize {
        self.trail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trail.is_empty()
    }

    /// `Body` until the first head literal is selected.
    pub fn role(&self) -> Role {
        if self.selected.is_in_body() {
            Role::Body
        } else {
            Role::Head
        }
    }

    pub fn is_in_body(&self) -> bool {
        self.selected.is_in_body()
    }

    /// Last selected position of `role`, if any.
    pub fn last_position(&self, role: Role) -> Option<u32> {
        self.selected.role(role).last_index().map(|p| p as u32)
    }

    /// The selected atoms with their roles, in trail order.
    pub fn positioned(&self) -> impl Iterator<Item = PositionedInstance<'_>> + '_ {
        self.trail
            .iter()
            .filter_map(move |lit| self.universe.positioned(*lit))
    }

    pub fn atoms(&self, role: Role) -> impl Iterator<Item = &Instance> + '_ {
        self.trail
            .iter()
            .filter(move |lit| lit.role == role)
            .map(move |lit| self.instance(*lit))
    }

    fn instance(&self, literal: Literal) -> &Instance {
        &self.universe.instances()[literal.position as usize]
    }

    /// Check whether `literal` may extend this clause.
    pub fn can_add(&self, literal: Literal) -> std::result::Result<(), Rejection> {
        self.admit(literal).map(|_| ())
    }

    /// Extend by `literal` if it passes [`can_add`](Self::can_add).
    pub fn add_if_valid(&self, literal: Literal) -> Option<StatusClause> {
        let environment = self.admit(literal).ok()?;
        let rank = self.rank.max(self.instance(literal).rank());
        let mut trail = self.trail.clone();
        trail.push(literal);
        Some(StatusClause {
            universe: Arc::clone(&self.universe),
            trail,
            selected: self.selected.with(literal),
            environment,
            rank,
        })
    }

    fn admit(&self, literal: Literal) -> std::result::Result<Environment, Rejection> {
        let inst = self
            .universe
            .get(literal.position)
            .ok_or(Rejection::UnknownPosition)?;

        if literal.role == Role::Body && !self.selected.is_in_body() {
            return Err(Rejection::RoleConflict);
        }
        if let Some(last) = self.last_position(literal.role) {
            if literal.position <= last {
                return Err(Rejection::OutOfOrder);
            }
        }

        let environment = self
            .environment
            .add_instance(self.universe.vocabulary(), inst)
            .map_err(Rejection::Typing)?;

        if self.selected.contains_position(literal.position as usize) {
            return Err(Rejection::Duplicate);
        }

        if self.rank > 0 && !inst.is_nullary() && !inst.vars().iter().any(|&v| v < self.rank) {
            return Err(Rejection::Disconnected);
        }

        if inst.rank() > self.rank {
            if literal.role == Role::Head {
                return Err(Rejection::HeadIntroducesVariable);
            }
            let mut next = self.rank;
            for &v in inst.vars() {
                if v == next {
                    next += 1;
                } else if v > next {
                    return Err(Rejection::VariableGap);
                }
            }
        }

        Ok(environment)
    }

    /// Whether this clause is the canonical member of its isomorphism class.
    ///
    /// Every permutation of the trail induces variable renamings: variables
    /// are renumbered in order of first occurrence, reading symmetric atoms
    /// under each of their argument arrangements. Each distinct renaming is
    /// applied, the renamed atoms are re-sorted and the clause is rebuilt
    /// through the admission rules. If any rebuilt clause has a trail that
    /// sorts strictly before this one, this clause is not representative.
    ///
    /// The enumeration is factorial in the trail length. Searches bound it
    /// through the maximum clause length.
    ///
    /// # Errors
    /// [`Error::InvariantViolation`] if a renamed atom is missing from the
    /// universe, which cannot happen for a clause built by `add_if_valid`.
    pub fn is_representative(&self) -> Result<bool> {
        let mut tried: HashSet<Renaming> = HashSet::new();
        for order in Permutations::new(self.trail.len()) {
            for renaming in self.first_occurrence_renamings(&order)? {
                if !tried.insert(renaming.clone()) {
                    continue;
                }
                if renaming
                    .iter()
                    .enumerate()
                    .all(|(old, new)| *new == Some(old as u32))
                {
                    continue;
                }
                if let Some(rebuilt) = self.rebuild(&renaming)? {
                    if rebuilt.trail < self.trail {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    fn first_occurrence_renamings(&self, order: &[usize]) -> Result<Vec<Renaming>> {
        let mut partial: Vec<(Renaming, u32)> =
            vec![(SmallVec::from_elem(None, self.rank as usize), 0)];
        for &i in order {
            let inst = self.instance(self.trail[i]);
            let arrangements = inst.arrangements();
            let mut extended: Vec<(Renaming, u32)> = Vec::with_capacity(partial.len());
            for (renaming, next) in &partial {
                for arranged in &arrangements {
                    let mut renaming = renaming.clone();
                    let mut next = *next;
                    for &v in arranged {
                        let slot = renaming.get_mut(v as usize).ok_or_else(|| {
                            Error::InvariantViolation(format!(
                                "variable x{v} lies beyond clause rank {}",
                                self.rank
                            ))
                        })?;
                        if slot.is_none() {
                            *slot = Some(next);
                            next += 1;
                        }
                    }
                    if !extended.iter().any(|(r, _)| *r == renaming) {
                        extended.push((renaming, next));
                    }
                }
            }
            partial = extended;
        }
        partial
            .into_iter()
            .map(|(renaming, next)| {
                if next == self.rank {
                    Ok(renaming)
                } else {
                    Err(Error::InvariantViolation(format!(
                        "clause of rank {} mentions only {next} variables",
                        self.rank
                    )))
                }
            })
            .collect()
    }

    /// Rename every atom, re-sort and re-admit; None if the renamed clause
    /// fails admission.
    fn rebuild(&self, renaming: &[Option<u32>]) -> Result<Option<StatusClause>> {
        let mut literals: Trail = SmallVec::with_capacity(self.trail.len());
        for lit in &self.trail {
            let inst = self.instance(*lit);
            let position = inst
                .renamed(renaming)
                .and_then(|renamed| self.universe.position_of(&renamed))
                .ok_or_else(|| {
                    Error::InvariantViolation(format!(
                        "renaming of {} is not in the universe",
                        inst.display(self.universe.vocabulary())
                    ))
                })?;
            literals.push(Literal::new(lit.role, position));
        }
        literals.sort_unstable();
        Ok(StatusClause::from_literals(Arc::clone(&self.universe), literals))
    }

    /// Whether some injective renaming maps every literal of this clause onto
    /// a distinct literal of `other` with the same role.
    ///
    /// This is syntactic subsumption under object identity: if an accepted
    /// clause is a subset of a candidate, the candidate is implied by it.
    pub fn is_subset_of(&self, other: &StatusClause) -> bool {
        if self.len() > other.len() || self.rank > other.rank {
            return false;
        }
        let mut matcher = SubsetMatcher {
            mapping: SmallVec::from_elem(None, self.rank as usize),
            used_vars: SmallVec::from_elem(false, other.rank as usize),
            used_literals: SmallVec::from_elem(false, other.len()),
        };
        matcher.extend(self, other, 0)
    }

    /// Whether the two clauses are the same up to a renaming of variables.
    ///
    /// With equal lengths and ranks, the injective renaming found by
    /// [`is_subset_of`](Self::is_subset_of) is a bijection on both literals
    /// and variables.
    pub fn symmetric_eq(&self, other: &StatusClause) -> bool {
        self.len() == other.len() && self.rank == other.rank && self.is_subset_of(other)
    }

    /// The formula submitted to the oracle for this clause.
    pub fn formula(&self) -> Formula {
        Formula::from_clause(self)
    }
}

impl PartialEq for StatusClause {
    fn eq(&self, other: &Self) -> bool {
        self.trail == other.trail
    }
}

impl Eq for StatusClause {}

impl std::hash::Hash for StatusClause {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.trail.hash(state);
    }
}

impl fmt::Debug for StatusClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusClause")
            .field("rank", &self.rank)
            .field("trail", &self.positioned().collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Display for StatusClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formula())
    }
}

struct SubsetMatcher {
    mapping: SmallVec<[Option<u32>; 8]>,
    used_vars: SmallVec<[bool; 8]>,
    used_literals: SmallVec<[bool; 8]>,
}

impl SubsetMatcher {
    fn extend(&mut self, this: &StatusClause, other: &StatusClause, idx: usize) -> bool {
        let Some(&lit) = this.trail.get(idx) else {
            return true;
        };
        let inst = this.instance(lit);
        for (j, &candidate) in other.trail.iter().enumerate() {
            if self.used_literals[j] || candidate.role != lit.role {
                continue;
            }
            let target = other.instance(candidate);
            if target.predicate() != inst.predicate() {
                continue;
            }
            for arranged in target.arrangements() {
                let mut bound: SmallVec<[u32; 4]> = SmallVec::new();
                if self.bind(inst.vars(), &arranged, &mut bound) {
                    self.used_literals[j] = true;
                    if self.extend(this, other, idx + 1) {
                        return true;
                    }
                    self.used_literals[j] = false;
                }
                self.unbind(&bound);
            }
        }
        false
    }

    /// Map `from[i]` to `to[i]` for all i, recording fresh bindings in `bound`.
    fn bind(&mut self, from: &[u32], to: &[u32], bound: &mut SmallVec<[u32; 4]>) -> bool {
        for (&a, &b) in from.iter().zip(to) {
            match self.mapping[a as usize] {
                Some(image) if image == b => {}
                Some(_) => return false,
                None => {
                    if self.used_vars[b as usize] {
                        return false;
                    }
                    self.mapping[a as usize] = Some(b);
                    self.used_vars[b as usize] = true;
                    bound.push(a);
                }
            }
        }
        true
    }

    fn unbind(&mut self, bound: &[u32]) {
        for &a in bound {
            if let Some(b) = self.mapping[a as usize].take() {
                self.used_vars[b as usize] = false;
            }
        }
    }
}

/// Iterative Heap's-algorithm enumeration of the permutations of `0..n`.
pub struct Permutations {
    items: SmallVec<[usize; 8]>,
    counters: SmallVec<[usize; 8]>,
    cursor: usize,
    started: bool,
}

impl Permutations {
    pub fn new(n: usize) -> Self {
        Self {
            items: (0..n).collect(),
            counters: SmallVec::from_elem(0, n),
            cursor: 0,
            started: false,
        }
    }
}

impl Iterator for Permutations {
    type Item = SmallVec<[usize; 8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            return Some(self.items.clone());
        }
        while self.cursor < self.items.len() {
            if self.counters[self.cursor] < self.cursor {
                if self.cursor % 2 == 0 {
                    self.items.swap(0, self.cursor);
                } else {
                    self.items.swap(self.counters[self.cursor], self.cursor);
                }
                self.counters[self.cursor] += 1;
                self.cursor = 0;
                return Some(self.items.clone());
            }
            self.counters[self.cursor] = 0;
            self.cursor += 1;
        }
        None
    }
}

#[cfg(test)]
#[path = "tests/clause.rs"]
mod tests;

//! Canonically ordered enumeration of every admissible atom.
//!
//! The universe is built once per run from a vocabulary and a variable
//! budget and never changes afterwards. Each atom's position in it is the
//! atom's identity for the whole search: clauses, bitsets and biases refer
//! to atoms by position only.

use std::cmp::Reverse;
use std::fmt;
use std::hash::BuildHasherDefault;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use rustc_hash::FxHasher;
use smallvec::SmallVec;

use crate::bitset::AtomSet;
use crate::environment::Environment;
use crate::instance::{Args, Instance};
use crate::trace::debug;
use crate::vocabulary::Vocabulary;

type FxBuild = BuildHasherDefault<FxHasher>;

/// Whether an atom is selected as a premise or as a conclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Body,
    Head,
}

/// An atom selection: universe position plus role.
///
/// Ordered body-before-head, then by position, which is the canonical order
/// of a clause's trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub role: Role,
    pub position: u32,
}

impl Literal {
    pub fn new(role: Role, position: u32) -> Self {
        Self { role, position }
    }

    pub fn body(position: u32) -> Self {
        Self::new(Role::Body, position)
    }

    pub fn head(position: u32) -> Self {
        Self::new(Role::Head, position)
    }
}

/// A literal viewed together with the universe it indexes.
///
/// Equality is by literal only; positions are injective within one universe.
#[derive(Clone, Copy)]
pub struct PositionedInstance<'u> {
    universe: &'u InstanceUniverse,
    literal: Literal,
}

impl<'u> PositionedInstance<'u> {
    pub fn literal(&self) -> Literal {
        self.literal
    }

    pub fn role(&self) -> Role {
        self.literal.role
    }

    pub fn position(&self) -> u32 {
        self.literal.position
    }

    pub fn in_body(&self) -> bool {
        self.literal.role == Role::Body
    }

    pub fn instance(&self) -> &'u Instance {
        &self.universe.instances[self.literal.position as usize]
    }

    pub fn universe(&self) -> &'u InstanceUniverse {
        self.universe
    }
}

impl PartialEq for PositionedInstance<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.literal == other.literal
    }
}

impl Eq for PositionedInstance<'_> {}

impl fmt::Debug for PositionedInstance<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}#{} {}",
            self.literal.role,
            self.literal.position,
            self.instance().display(&self.universe.vocabulary)
        )
    }
}

/// Every type-admissible atom over `budget` variables, in canonical order.
///
/// Canonical order sorts by rank (one past the highest variable), then by
/// number of distinct variables (more first), then by predicate, then by
/// argument list. Atoms that connect a new variable to older ones therefore
/// precede atoms mentioning only the new variable.
pub struct InstanceUniverse {
    vocabulary: Arc<Vocabulary>,
    budget: u32,
    instances: Vec<Instance>,
    positions: HashMap<Instance, u32, FxBuild>,
    rank_masks: Vec<AtomSet>,
}

impl InstanceUniverse {
    /// Enumerate the universe for `vocabulary` over variables `0..budget`.
    pub fn build(vocabulary: Arc<Vocabulary>, budget: u32) -> Self {
        let mut seen: HashSet<Instance, FxBuild> = HashSet::default();
        let mut instances = Vec::new();
        let empty = Environment::new();

        for (id, def) in vocabulary.predicates() {
            let arity = def.arity();
            let lowest = if arity == 0 { 0 } else { 1 };
            for rank in lowest..=arity {
                if rank as u32 > budget {
                    break;
                }
                let prototypes: Vec<Args> = prototypes(arity, rank)
                    .into_iter()
                    .filter(|proto| {
                        empty.is_valid_instance(&vocabulary, &Instance::new(id, def.order(), proto))
                    })
                    .collect();
                if prototypes.is_empty() {
                    continue;
                }
                for choice in ordered_choices(budget, rank) {
                    for proto in &prototypes {
                        let vars: Args = proto.iter().map(|&slot| choice[slot as usize]).collect();
                        let inst = Instance::new(id, def.order(), &vars);
                        if seen.insert(inst.clone()) {
                            instances.push(inst);
                        }
                    }
                }
            }
        }

        instances.sort_by(|a, b| canonical_key(a).cmp(&canonical_key(b)));

        let mut positions: HashMap<Instance, u32, FxBuild> = HashMap::default();
        positions.reserve(instances.len());
        for (i, inst) in instances.iter().enumerate() {
            positions.insert(inst.clone(), i as u32);
        }

        let rank_masks = (0..=budget)
            .map(|r| {
                let end = instances.partition_point(|inst| inst.rank() <= r);
                AtomSet::from_positions(instances.len(), 0..end)
            })
            .collect();

        debug!(
            atoms = instances.len(),
            budget,
            predicates = vocabulary.predicate_count(),
            "built instance universe"
        );

        Self {
            vocabulary,
            budget,
            instances,
            positions,
            rank_masks,
        }
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    pub fn variable_budget(&self) -> u32 {
        self.budget
    }

    /// Number of atoms.
    pub fn size(&self) -> usize {
        self.instances.len()
    }

    pub fn get(&self, position: u32) -> Option<&Instance> {
        self.instances.get(position as usize)
    }

    /// The atom at `position` in the given role.
    pub fn get_instance(&self, position: u32, role: Role) -> Option<PositionedInstance<'_>> {
        self.positioned(Literal::new(role, position))
    }

    pub fn positioned(&self, literal: Literal) -> Option<PositionedInstance<'_>> {
        ((literal.position as usize) < self.instances.len()).then_some(PositionedInstance {
            universe: self,
            literal,
        })
    }

    pub fn position_of(&self, instance: &Instance) -> Option<u32> {
        self.positions.get(instance).copied()
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Atoms whose variables all lie below `rank`; ranks past the budget
    /// clamp to the whole universe.
    pub fn rank_mask(&self, rank: u32) -> &AtomSet {
        let idx = (rank.min(self.budget)) as usize;
        &self.rank_masks[idx]
    }
}

impl fmt::Debug for InstanceUniverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceUniverse")
            .field("budget", &self.budget)
            .field("size", &self.instances.len())
            .finish()
    }
}

fn canonical_key(inst: &Instance) -> (u32, Reverse<usize>, u32, &[u32]) {
    (
        inst.rank(),
        Reverse(inst.distinct_vars()),
        inst.predicate().raw(),
        inst.vars(),
    )
}

/// Assignments of `rank` distinct variables to `arity` slots in
/// restricted-growth form: slot values are `0..rank`, each value first
/// appears after all smaller ones, and every value is used.
fn prototypes(arity: usize, rank: usize) -> Vec<Args> {
    fn grow(arity: usize, rank: usize, current: &mut Args, used: u32, out: &mut Vec<Args>) {
        if current.len() == arity {
            if used as usize == rank {
                out.push(current.clone());
            }
            return;
        }
        let remaining = arity - current.len();
        if (used as usize) + remaining < rank {
            return;
        }
        for v in 0..=used {
            if v as usize >= rank {
                break;
            }
            current.push(v);
            grow(arity, rank, current, used.max(v + 1), out);
            current.pop();
        }
    }

    let mut out = Vec::new();
    grow(arity, rank, &mut SmallVec::new(), 0, &mut out);
    out
}

/// Ordered selections of `count` distinct variables out of `0..budget`, in
/// lexicographic order.
fn ordered_choices(budget: u32, count: usize) -> Vec<Args> {
    fn pick(budget: u32, count: usize, current: &mut Args, out: &mut Vec<Args>) {
        if current.len() == count {
            out.push(current.clone());
            return;
        }
        for v in 0..budget {
            if !current.contains(&v) {
                current.push(v);
                pick(budget, count, current, out);
                current.pop();
            }
        }
    }

    let mut out = Vec::new();
    pick(budget, count, &mut SmallVec::new(), &mut out);
    out
}

#[cfg(test)]
#[path = "tests/universe.rs"]
mod tests;

//! Ordered subsets of the atom universe.
//!
//! An [`AtomSet`] is a frozen bitset indexed by universe position. Sets are
//! built through an [`AtomSetBuilder`] and only read afterwards; extending a
//! set produces a new one.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use crate::universe::{Literal, Role};

const WORD_BITS: usize = 64;

type Words = SmallVec<[u64; 4]>;

fn words_for(capacity: usize) -> usize {
    capacity.div_ceil(WORD_BITS)
}

/// Mutable construction stage of an [`AtomSet`].
#[derive(Debug, Clone)]
pub struct AtomSetBuilder {
    words: Words,
    capacity: usize,
    count: usize,
}

impl AtomSetBuilder {
    pub fn new(capacity: usize) -> Self {
        Self {
            words: SmallVec::from_elem(0, words_for(capacity)),
            capacity,
            count: 0,
        }
    }

    /// Set the bit for `position`; returns whether it was newly set.
    pub fn add(&mut self, position: usize) -> bool {
        let (word, bit) = (position / WORD_BITS, position % WORD_BITS);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.capacity = self.capacity.max(position + 1);
        let mask = 1u64 << bit;
        if self.words[word] & mask != 0 {
            return false;
        }
        self.words[word] |= mask;
        self.count += 1;
        true
    }

    pub fn build(self) -> AtomSet {
        AtomSet {
            words: self.words,
            capacity: self.capacity,
            count: self.count,
        }
    }
}

/// Immutable bitset over universe positions.
///
/// Sets are ordered by their lowest differing position: the set containing
/// that position is the smaller one. Equality and hashing look at the
/// selected positions only, not at the capacity.
#[derive(Debug, Clone)]
pub struct AtomSet {
    words: Words,
    capacity: usize,
    count: usize,
}

impl AtomSet {
    pub fn empty(capacity: usize) -> Self {
        AtomSetBuilder::new(capacity).build()
    }

    pub fn builder(capacity: usize) -> AtomSetBuilder {
        AtomSetBuilder::new(capacity)
    }

    pub fn from_positions(capacity: usize, positions: impl IntoIterator<Item = usize>) -> Self {
        let mut builder = AtomSetBuilder::new(capacity);
        for p in positions {
            builder.add(p);
        }
        builder.build()
    }

    /// A copy of this set with `position` added.
    pub fn with(&self, position: usize) -> AtomSet {
        let mut builder = AtomSetBuilder {
            words: self.words.clone(),
            capacity: self.capacity,
            count: self.count,
        };
        builder.add(position);
        builder.build()
    }

    pub fn contains(&self, position: usize) -> bool {
        self.words
            .get(position / WORD_BITS)
            .is_some_and(|w| w & (1u64 << (position % WORD_BITS)) != 0)
    }

    /// Number of positions in the set.
    pub fn size(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn first_index(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i * WORD_BITS + w.trailing_zeros() as usize)
    }

    pub fn last_index(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .rev()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i * WORD_BITS + (WORD_BITS - 1 - w.leading_zeros() as usize))
    }

    /// Positions in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(i * WORD_BITS + bit)
            })
        })
    }

    /// Whether every position of `self` is also in `other`.
    pub fn is_subset(&self, other: &AtomSet) -> bool {
        self.words.iter().enumerate().all(|(i, w)| {
            let o = other.words.get(i).copied().unwrap_or(0);
            w & !o == 0
        })
    }

    fn word(&self, i: usize) -> u64 {
        self.words.get(i).copied().unwrap_or(0)
    }
}

impl Ord for AtomSet {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.words.len().max(other.words.len());
        for i in 0..len {
            let diff = self.word(i) ^ other.word(i);
            if diff != 0 {
                let lowest = diff & diff.wrapping_neg();
                return if self.word(i) & lowest != 0 {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
            }
        }
        Ordering::Equal
    }
}

impl PartialEq for AtomSet {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AtomSet {}

impl Hash for AtomSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let used = self
            .words
            .iter()
            .rposition(|w| *w != 0)
            .map_or(0, |i| i + 1);
        self.words[..used].hash(state);
    }
}

impl PartialOrd for AtomSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Body and head selections of a clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LiteralSet {
    body: AtomSet,
    head: AtomSet,
}

impl LiteralSet {
    pub fn empty(capacity: usize) -> Self {
        Self {
            body: AtomSet::empty(capacity),
            head: AtomSet::empty(capacity),
        }
    }

    pub fn body(&self) -> &AtomSet {
        &self.body
    }

    pub fn head(&self) -> &AtomSet {
        &self.head
    }

    pub fn role(&self, role: Role) -> &AtomSet {
        match role {
            Role::Body => &self.body,
            Role::Head => &self.head,
        }
    }

    pub fn with(&self, literal: Literal) -> LiteralSet {
        let position = literal.position as usize;
        match literal.role {
            Role::Body => LiteralSet {
                body: self.body.with(position),
                head: self.head.clone(),
            },
            Role::Head => LiteralSet {
                body: self.body.clone(),
                head: self.head.with(position),
            },
        }
    }

    pub fn contains(&self, literal: Literal) -> bool {
        self.role(literal.role).contains(literal.position as usize)
    }

    /// Whether the atom at `position` is selected in either role.
    pub fn contains_position(&self, position: usize) -> bool {
        self.body.contains(position) || self.head.contains(position)
    }

    /// True while no head atom has been selected.
    pub fn is_in_body(&self) -> bool {
        self.head.is_empty()
    }

    pub fn len(&self) -> usize {
        self.body.size() + self.head.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Ord for LiteralSet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.body
            .cmp(&other.body)
            .then_with(|| self.head.cmp(&other.head))
    }
}

impl PartialOrd for LiteralSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
#[path = "tests/bitset.rs"]
mod tests;

//! Protocol between a generic traversal engine and a search problem.
//!
//! The engine owns the frontier and the visiting order. A problem plugs in
//! through three roles: an [`ExpansionOperator`] produces children, a
//! [`ResultPolicy`] judges nodes as candidate solutions, and a
//! [`SearchListener`] observes the traversal. The engine itself is outside
//! this crate.

use crate::error::Result;

/// A state in the traversal tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchNode<S> {
    pub state: S,
    pub depth: usize,
    pruned: bool,
}

impl<S> SearchNode<S> {
    pub fn root(state: S) -> Self {
        Self {
            state,
            depth: 0,
            pruned: false,
        }
    }

    /// A node one level below `self`.
    pub fn child(&self, state: S) -> Self {
        Self {
            state,
            depth: self.depth + 1,
            pruned: false,
        }
    }

    /// Mark the node so it is not expanded further.
    pub fn prune(&mut self) {
        self.pruned = true;
    }

    pub fn is_pruned(&self) -> bool {
        self.pruned
    }
}

pub trait ExpansionOperator<S> {
    /// Children of `node`; empty for pruned nodes.
    fn expand_node(&mut self, node: &SearchNode<S>) -> Result<Vec<S>>;
}

pub trait ResultPolicy<S> {
    /// Judge `node` as a solution.
    ///
    /// Returns whether the engine should keep expanding below it.
    fn process_solution(&mut self, node: &SearchNode<S>) -> Result<bool>;
}

/// Traversal callbacks. All default to doing nothing.
pub trait SearchListener<S> {
    fn initialise(&mut self, _roots: &[SearchNode<S>]) -> Result<()> {
        Ok(())
    }

    /// Whether a node taken from the frontier should be processed at all.
    fn node_selected(&mut self, _node: &SearchNode<S>) -> bool {
        true
    }

    fn node_expanded(&mut self, _node: &SearchNode<S>, _children: &[SearchNode<S>]) {}

    fn node_processed(&mut self, _node: &SearchNode<S>) {}

    fn search_complete(&mut self) -> Result<()> {
        Ok(())
    }
}

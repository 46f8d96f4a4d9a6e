//! Clause refinement driven by an external traversal engine.
//!
//! [`VariableRefinement`] grows clauses one literal at a time. Children are
//! filtered by the bias stack and the clause admission rules, and only the
//! canonical representative of each isomorphism class survives. Every child's
//! formula is handed to the validity calculator as soon as the child exists,
//! so answers are usually ready by the time the engine asks for them.
//!
//! A valid clause not entailed by the clauses accepted so far is accepted and
//! its subtree is cut. When the traversal ends, accepted clauses implied by
//! the others are pruned.

use std::sync::Arc;

use crate::bias::Bias;
use crate::calculator::{self, ValidityCalculator};
use crate::clause::StatusClause;
use crate::config::RefinementConfig;
use crate::error::{Error, Result};
use crate::formula::Formula;
use crate::metrics::SearchMetrics;
use crate::oracle::OracleClient;
use crate::search::{ExpansionOperator, ResultPolicy, SearchListener, SearchNode};
use crate::trace::{debug, debug_span, info, info_span, trace};
use crate::universe::{InstanceUniverse, Literal, Role};

/// An accepted clause together with the formula the oracle validated.
#[derive(Debug, Clone)]
pub struct Solution {
    pub clause: StatusClause,
    pub formula: Formula,
}

pub struct VariableRefinement {
    universe: Arc<InstanceUniverse>,
    bias: Box<dyn Bias>,
    calculator: Box<dyn ValidityCalculator>,
    solutions: Vec<Solution>,
    max_clause_length: usize,
    metrics: SearchMetrics,
}

impl VariableRefinement {
    /// Set up a run over `universe` as described by `config`.
    ///
    /// # Errors
    /// [`Error::Config`] for invalid settings or a universe built with a
    /// different variable budget; oracle errors if the worker pool cannot
    /// start.
    pub fn new(
        universe: Arc<InstanceUniverse>,
        config: &RefinementConfig,
        client: OracleClient,
    ) -> Result<Self> {
        config.validate()?;
        if universe.variable_budget() != config.variable_budget {
            return Err(Error::Config(format!(
                "universe was built for {} variables, configuration asks for {}",
                universe.variable_budget(),
                config.variable_budget
            )));
        }
        let bias = Box::new(config.bias.build(&universe));
        let calculator =
            calculator::build(&config.calculator, client, config.oracle_timeout())?;
        Ok(Self::with_parts(
            universe,
            bias,
            calculator,
            config.max_clause_length,
        ))
    }

    pub fn with_parts(
        universe: Arc<InstanceUniverse>,
        bias: Box<dyn Bias>,
        calculator: Box<dyn ValidityCalculator>,
        max_clause_length: usize,
    ) -> Self {
        Self {
            universe,
            bias,
            calculator,
            solutions: Vec::new(),
            max_clause_length,
            metrics: SearchMetrics::new(),
        }
    }

    /// The empty clause as a traversal root.
    pub fn root(&self) -> SearchNode<StatusClause> {
        SearchNode::root(StatusClause::empty(Arc::clone(&self.universe)))
    }

    pub fn universe(&self) -> &Arc<InstanceUniverse> {
        &self.universe
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    pub fn solution_formulas(&self) -> Vec<Formula> {
        self.solutions.iter().map(|s| s.formula.clone()).collect()
    }

    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }

    pub fn calculator(&self) -> &dyn ValidityCalculator {
        self.calculator.as_ref()
    }

    /// Literals that may follow `clause` in canonical trail order.
    fn candidates(&self, clause: &StatusClause) -> impl Iterator<Item = Literal> {
        let size = self.universe.size() as u32;
        let next = |role| clause.last_position(role).map_or(0, |p| p + 1);
        let body = if clause.is_in_body() {
            next(Role::Body)..size
        } else {
            size..size
        };
        let head = next(Role::Head)..size;
        body.map(Literal::body).chain(head.map(Literal::head))
    }

    fn process_if_representative(&self, child: StatusClause) -> Result<Option<StatusClause>> {
        if child.is_representative()? {
            Ok(Some(child))
        } else {
            self.metrics.record_non_representative();
            Ok(None)
        }
    }
}

impl ExpansionOperator<StatusClause> for VariableRefinement {
    fn expand_node(&mut self, node: &SearchNode<StatusClause>) -> Result<Vec<StatusClause>> {
        if node.is_pruned() {
            return Ok(Vec::new());
        }
        let clause = &node.state;
        let _span = debug_span!("expand", depth = node.depth, length = clause.len()).entered();
        self.metrics.record_depth(node.depth as u64);
        if clause.len() >= self.max_clause_length {
            return Ok(Vec::new());
        }

        let mut children = Vec::new();
        for literal in self.candidates(clause) {
            self.metrics.record_candidate();
            if !self.bias.admits(clause, literal) {
                self.metrics.record_bias_rejection();
                continue;
            }
            let Some(child) = clause.add_if_valid(literal) else {
                self.metrics.record_admission_rejection();
                continue;
            };
            if let Some(child) = self.process_if_representative(child)? {
                self.calculator.submit_formula(&child.formula());
                self.metrics.record_child();
                children.push(child);
            }
        }
        debug!(
            depth = node.depth,
            clause = %clause,
            children = children.len(),
            "expanded node"
        );
        Ok(children)
    }
}

impl ResultPolicy<StatusClause> for VariableRefinement {
    fn process_solution(&mut self, node: &SearchNode<StatusClause>) -> Result<bool> {
        let formula = node.state.formula();
        if !self.calculator.is_valid(&formula)? {
            self.metrics.record_invalid();
            return Ok(true);
        }
        let accepted = self.solution_formulas();
        if !accepted.is_empty() && self.calculator.entails(&accepted, &formula)? {
            self.metrics.record_entailed();
            debug!(formula = %formula, "valid clause already entailed");
            return Ok(false);
        }
        info!(formula = %formula, accepted = accepted.len() + 1, "accepted clause");
        self.metrics.record_accepted();
        self.solutions.push(Solution {
            clause: node.state.clone(),
            formula,
        });
        Ok(false)
    }
}

impl SearchListener<StatusClause> for VariableRefinement {
    fn initialise(&mut self, roots: &[SearchNode<StatusClause>]) -> Result<()> {
        for root in roots {
            self.calculator.submit_formula(&root.state.formula());
        }
        debug!(roots = roots.len(), atoms = self.universe.size(), "search started");
        Ok(())
    }

    /// Skip nodes that an accepted clause already covers.
    fn node_selected(&mut self, node: &SearchNode<StatusClause>) -> bool {
        let subsumed = self
            .solutions
            .iter()
            .any(|s| s.clause.is_subset_of(&node.state));
        if subsumed {
            self.metrics.record_subsumed();
        }
        !subsumed
    }

    fn node_expanded(
        &mut self,
        node: &SearchNode<StatusClause>,
        children: &[SearchNode<StatusClause>],
    ) {
        trace!(depth = node.depth, children = children.len(), "node expanded");
    }

    fn node_processed(&mut self, node: &SearchNode<StatusClause>) {
        trace!(depth = node.depth, pruned = node.is_pruned(), "node processed");
    }

    /// Remove accepted clauses entailed by the remaining ones, in a single
    /// pass over the accepted list.
    fn search_complete(&mut self) -> Result<()> {
        let _span = info_span!("prune", accepted = self.solutions.len()).entered();
        let mut i = 0;
        while i < self.solutions.len() {
            let others: Vec<Formula> = self
                .solutions
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, s)| s.formula.clone())
                .collect();
            if !others.is_empty() && self.calculator.entails(&others, &self.solutions[i].formula)? {
                let removed = self.solutions.remove(i);
                self.metrics.record_pruned();
                info!(formula = %removed.formula, "pruned redundant clause");
            } else {
                i += 1;
            }
        }
        info!(solutions = self.solutions.len(), "search complete");
        self.calculator.shutdown();
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/refinement.rs"]
mod tests;

//! Typed clause-space search for inductive discovery of first-order constraints.
//!
//! Given a vocabulary of typed predicates and a variable budget, the crate
//! enumerates every admissible atom once ([`universe`]), grows clauses one
//! atom at a time under typed admission rules ([`clause`]) and optional
//! pruning policies ([`bias`]), keeps one representative per isomorphism
//! class, and asks an external solver ([`oracle`]) through a caching,
//! concurrency-managing façade ([`calculator`]) which clauses hold on every
//! example and which are already implied by the accepted set
//! ([`refinement`]).

pub mod bias;
pub mod bitset;
pub mod calculator;
pub mod clause;
pub mod config;
pub mod environment;
pub mod error;
pub mod formula;
pub mod instance;
pub mod metrics;
pub mod oracle;
pub mod refinement;
pub mod search;
pub mod symbol;
pub mod trace;
pub mod types;
pub mod universe;
pub mod vocabulary;

pub use error::{Error, OracleError, Result};

#[cfg(test)]
pub(crate) mod test_utils;

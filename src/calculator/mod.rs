//! Asynchronous, deduplicating façade over the oracle.
//!
//! The refinement engine submits a formula as soon as a child clause is
//! created and asks for the answer only when the traversal reaches that
//! node. Calculators exploit the gap: the batch variant groups pending
//! formulas into one oracle round-trip, the parallel variant keeps a pool of
//! workers answering them in the background.
//!
//! Every calculator guarantees that a formula is sent to the oracle at most
//! once per run.

pub mod batch;
pub mod parallel;
pub mod pool;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::CalculatorKind;
use crate::error::Result;
use crate::formula::Formula;
use crate::oracle::OracleClient;

pub use batch::BatchValidityCalculator;
pub use parallel::ParallelValidityCalculator;
pub use pool::OraclePool;

/// Validity answers for submitted formulas plus on-demand entailment.
pub trait ValidityCalculator: Send {
    /// Queue `formula` for checking. Submitting the same formula again is a
    /// no-op.
    fn submit_formula(&self, formula: &Formula);

    /// Whether `formula` holds on every example, blocking until known.
    ///
    /// # Errors
    /// [`Error::UnsubmittedFormula`](crate::Error::UnsubmittedFormula) when
    /// the formula was never submitted, and oracle, timeout or cancellation
    /// errors otherwise.
    fn is_valid(&self, formula: &Formula) -> Result<bool>;

    /// Whether `premises` jointly entail `conclusion`.
    fn entails(&self, premises: &[Formula], conclusion: &Formula) -> Result<bool>;

    /// Stop dispatching. Outstanding queries fail with
    /// [`Error::Cancelled`](crate::Error::Cancelled).
    fn shutdown(&self);

    fn stats(&self) -> &CalculatorStats;
}

/// Build the calculator selected by `kind`.
pub fn build(
    kind: &CalculatorKind,
    client: OracleClient,
    timeout: Duration,
) -> Result<Box<dyn ValidityCalculator>> {
    Ok(match kind {
        CalculatorKind::Batch => Box::new(BatchValidityCalculator::new(client, timeout)?),
        CalculatorKind::Parallel { workers } => {
            Box::new(ParallelValidityCalculator::start(client, *workers, timeout)?)
        }
    })
}

/// Counters shared by all calculators.
#[derive(Debug, Default)]
pub struct CalculatorStats {
    pub submitted: AtomicU64,
    pub duplicates: AtomicU64,
    pub oracle_calls: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cancelled: AtomicU64,
}

impl CalculatorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_oracle_call(&self) {
        self.oracle_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            oracle_calls: self.oracle_calls.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub duplicates: u64,
    pub oracle_calls: u64,
    pub cache_hits: u64,
    pub cancelled: u64,
}

#[cfg(test)]
mod tests;

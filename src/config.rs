//! Run configuration for a refinement search.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use crate::bias::BiasConfig;

pub const DEFAULT_VARIABLE_BUDGET: u32 = 3;
pub const DEFAULT_MAX_CLAUSE_LENGTH: usize = 4;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 600;

/// Which validity calculator answers the search's oracle queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalculatorKind {
    /// Group pending formulas into one oracle request per cache miss.
    Batch,
    /// Answer formulas in the background on a worker pool.
    Parallel {
        #[serde(default = "default_workers")]
        workers: usize,
    },
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

impl Default for CalculatorKind {
    fn default() -> Self {
        CalculatorKind::Parallel {
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Knobs of one refinement run. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementConfig {
    /// Number of variables `x0..` available to clauses.
    pub variable_budget: u32,
    /// Longest clause, body plus head, the search builds.
    pub max_clause_length: usize,
    pub calculator: CalculatorKind,
    /// Longest wait for a single oracle answer.
    pub oracle_timeout_secs: u64,
    pub bias: BiasConfig,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            variable_budget: DEFAULT_VARIABLE_BUDGET,
            max_clause_length: DEFAULT_MAX_CLAUSE_LENGTH,
            calculator: CalculatorKind::default(),
            oracle_timeout_secs: DEFAULT_ORACLE_TIMEOUT_SECS,
            bias: BiasConfig::default(),
        }
    }
}

impl RefinementConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(input: &str) -> Result<Self> {
        let config: RefinementConfig = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.variable_budget == 0 {
            return Err(Error::Config("variable_budget must be at least 1".into()));
        }
        if self.max_clause_length == 0 {
            return Err(Error::Config("max_clause_length must be at least 1".into()));
        }
        if let CalculatorKind::Parallel { workers: 0 } = self.calculator {
            return Err(Error::Config("parallel calculator needs at least one worker".into()));
        }
        if self.oracle_timeout_secs == 0 {
            return Err(Error::Config("oracle_timeout_secs must be positive".into()));
        }
        self.bias.validate(self.variable_budget)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }
}

#[cfg(test)]
#[path = "tests/config.rs"]
mod tests;

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failures talking to the external validity/entailment solver.
#[derive(Error, Debug)]
pub enum OracleError {
    /// The solver process could not be started.
    #[error("failed to launch oracle `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    /// Reading or writing the solver's pipes failed.
    #[error("oracle I/O error: {0}")]
    Io(#[from] io::Error),
    /// A request could not be encoded or a response could not be decoded.
    #[error("malformed oracle message: {0}")]
    Protocol(#[from] serde_json::Error),
    /// The solver ran but reported a failure.
    #[error("oracle reported failure: {0}")]
    Solver(String),
    /// A validity answer did not have one entry per formula.
    #[error("oracle answered {got} results for {expected} formulas")]
    ResponseShape { expected: usize, got: usize },
    /// The solver answered a different kind of question than was asked.
    #[error("unexpected oracle response, expected a {expected} answer")]
    UnexpectedResponse { expected: &'static str },
}

/// Fatal errors of a search run.
///
/// Rejected candidates (typing conflicts, structural admission, biases) are
/// not errors; they are ordinary return values local to the component that
/// rejects them.
#[derive(Error, Debug)]
pub enum Error {
    /// The oracle failed; `context` names the formula(s) being answered.
    #[error("oracle failure while {context}: {source}")]
    Oracle {
        context: String,
        #[source]
        source: OracleError,
    },
    /// No answer arrived within the configured ceiling.
    #[error("oracle did not answer within {timeout:?} for `{formula}`")]
    OracleTimeout { formula: String, timeout: Duration },
    /// The query was dropped because the calculator was shut down.
    #[error("oracle query for `{formula}` was cancelled")]
    Cancelled { formula: String },
    /// A result was requested for a formula that was never submitted.
    #[error("formula `{formula}` was queried before it was submitted")]
    UnsubmittedFormula { formula: String },
    /// An internal invariant does not hold; indicates a logic bug.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    /// Inconsistent type or predicate declarations.
    #[error("vocabulary error: {0}")]
    Vocabulary(String),
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A configuration document could not be parsed.
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Result type alias for clausal.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn oracle(context: impl Into<String>, source: OracleError) -> Self {
        Error::Oracle {
            context: context.into(),
            source,
        }
    }

    /// Whether the error stems from the solver rather than from this crate.
    pub fn is_oracle_failure(&self) -> bool {
        matches!(
            self,
            Error::Oracle { .. } | Error::OracleTimeout { .. } | Error::Cancelled { .. }
        )
    }
}

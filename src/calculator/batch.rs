use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use hashbrown::{HashMap, HashSet};
use parking_lot::Mutex;

use crate::error::{Error, OracleError, Result};
use crate::formula::Formula;
use crate::oracle::OracleClient;
use crate::trace::{debug, warn};

use super::pool::{Job, OraclePool};
use super::{CalculatorStats, ValidityCalculator};

type BatchAnswer = std::result::Result<Vec<bool>, OracleError>;

/// Accumulates submissions and answers them in bulk.
///
/// The first query that misses the cache sends every pending formula to the
/// oracle in a single validity request, run on a one-worker [`OraclePool`]
/// so the wait is bounded by the configured timeout. The state lock is not
/// held while waiting.
pub struct BatchValidityCalculator {
    pool: OraclePool,
    state: Mutex<BatchState>,
    flushing: Mutex<()>,
    timeout: Duration,
    stats: Arc<CalculatorStats>,
}

/// A dispatched batch whose answer has not been collected yet.
struct InFlight {
    formulas: Vec<Formula>,
    answer: Receiver<BatchAnswer>,
}

#[derive(Default)]
struct BatchState {
    pending: Vec<Formula>,
    in_flight: Option<InFlight>,
    known: HashSet<Formula>,
    results: HashMap<Formula, bool>,
    shut_down: bool,
}

impl BatchValidityCalculator {
    /// # Errors
    /// Fails if the oracle worker thread cannot be spawned.
    pub fn new(client: OracleClient, timeout: Duration) -> Result<Self> {
        let stats = Arc::new(CalculatorStats::new());
        let pool = OraclePool::start(client, 1, Arc::clone(&stats))?;
        Ok(Self {
            pool,
            state: Mutex::new(BatchState::default()),
            flushing: Mutex::new(()),
            timeout,
            stats,
        })
    }

    /// Formulas submitted but not yet sent to the oracle.
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// The stored answer for `formula`, None while it is still unanswered.
    fn settled(&self, formula: &Formula) -> Result<Option<bool>> {
        let state = self.state.lock();
        if let Some(&answer) = state.results.get(formula) {
            return Ok(Some(answer));
        }
        if !state.known.contains(formula) {
            return Err(Error::UnsubmittedFormula {
                formula: formula.to_string(),
            });
        }
        if state.shut_down {
            self.stats.record_cancelled();
            return Err(Error::Cancelled {
                formula: formula.to_string(),
            });
        }
        Ok(None)
    }

    /// Collect the batch in flight, or dispatch the pending one.
    ///
    /// Returns false when there was nothing to wait for.
    fn flush(&self, queried: &Formula) -> Result<bool> {
        let in_flight = {
            let mut state = self.state.lock();
            let resumed = state.in_flight.take();
            match resumed {
                Some(in_flight) => in_flight,
                None => {
                    let formulas = std::mem::take(&mut state.pending);
                    if formulas.is_empty() {
                        return Ok(false);
                    }
                    debug!(formulas = formulas.len(), "flushing validity batch");
                    let (reply, answer) = crossbeam_channel::bounded(1);
                    let job = Job::ValidityBatch {
                        formulas: formulas.clone(),
                        reply,
                    };
                    if !self.pool.dispatch(job) {
                        self.stats.record_cancelled();
                        return Err(Error::Cancelled {
                            formula: queried.to_string(),
                        });
                    }
                    InFlight { formulas, answer }
                }
            }
        };

        match in_flight.answer.recv_timeout(self.timeout) {
            Ok(Ok(answers)) => {
                let mut state = self.state.lock();
                state
                    .results
                    .extend(in_flight.formulas.into_iter().zip(answers));
                Ok(true)
            }
            Ok(Err(source)) => {
                let context = format!("checking validity of {} formulas", in_flight.formulas.len());
                let mut state = self.state.lock();
                if !state.shut_down {
                    // requeue for a retry
                    state.pending.extend(in_flight.formulas);
                }
                Err(Error::oracle(context, source))
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    formulas = in_flight.formulas.len(),
                    timeout_secs = self.timeout.as_secs(),
                    "oracle did not answer the validity batch in time"
                );
                let mut state = self.state.lock();
                if !state.shut_down {
                    state.in_flight = Some(in_flight);
                }
                Err(Error::OracleTimeout {
                    formula: queried.to_string(),
                    timeout: self.timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.stats.record_cancelled();
                Err(Error::Cancelled {
                    formula: queried.to_string(),
                })
            }
        }
    }
}

impl ValidityCalculator for BatchValidityCalculator {
    fn submit_formula(&self, formula: &Formula) {
        let mut state = self.state.lock();
        if state.shut_down {
            return;
        }
        if !state.known.insert(formula.clone()) {
            self.stats.record_duplicate();
            return;
        }
        state.pending.push(formula.clone());
        self.stats.record_submitted();
    }

    fn is_valid(&self, formula: &Formula) -> Result<bool> {
        if let Some(answer) = self.settled(formula)? {
            self.stats.record_cache_hit();
            return Ok(answer);
        }
        let _flushing = self.flushing.lock();
        loop {
            if let Some(answer) = self.settled(formula)? {
                return Ok(answer);
            }
            if !self.flush(formula)? {
                return Err(Error::InvariantViolation(format!(
                    "submitted formula `{formula}` has no answer"
                )));
            }
        }
    }

    fn entails(&self, premises: &[Formula], conclusion: &Formula) -> Result<bool> {
        if self.state.lock().shut_down {
            self.stats.record_cancelled();
            return Err(Error::Cancelled {
                formula: conclusion.to_string(),
            });
        }
        self.pool.entails(premises, conclusion, self.timeout)
    }

    fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            state.shut_down = true;
            state.pending.clear();
            state.in_flight = None;
        }
        debug!("shutting down batch oracle worker");
        self.pool.shutdown();
    }

    fn stats(&self) -> &CalculatorStats {
        &self.stats
    }
}

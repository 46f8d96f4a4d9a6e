use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{Error, OracleError, Result};
use crate::formula::Formula;
use crate::oracle::OracleClient;
use crate::trace::{debug, warn};

use super::pool::{Job, OraclePool};
use super::{CalculatorStats, ValidityCalculator};

type Answer = std::result::Result<bool, OracleError>;

enum Slot {
    Pending(Receiver<Answer>),
    Ready(bool),
    Failed(String),
    Cancelled,
}

/// One oracle call per formula, answered in the background by an
/// [`OraclePool`].
///
/// Each submitted formula owns a one-shot reply channel. `is_valid` waits on
/// it for at most the configured timeout.
pub struct ParallelValidityCalculator {
    pool: OraclePool,
    slots: DashMap<Formula, Slot>,
    timeout: Duration,
    stats: Arc<CalculatorStats>,
}

impl ParallelValidityCalculator {
    pub fn start(client: OracleClient, workers: usize, timeout: Duration) -> Result<Self> {
        let stats = Arc::new(CalculatorStats::new());
        let pool = OraclePool::start(client, workers, Arc::clone(&stats))?;
        debug!(workers, timeout_secs = timeout.as_secs(), "started oracle pool");
        Ok(Self {
            pool,
            slots: DashMap::new(),
            timeout,
            stats,
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    /// The settled answer for `formula`, or its reply channel if still pending.
    fn lookup(&self, formula: &Formula) -> Result<std::result::Result<bool, Receiver<Answer>>> {
        let slot = self.slots.get(formula).ok_or_else(|| Error::UnsubmittedFormula {
            formula: formula.to_string(),
        })?;
        match &*slot {
            Slot::Ready(answer) => Ok(Ok(*answer)),
            Slot::Pending(rx) => Ok(Err(rx.clone())),
            Slot::Failed(message) => Err(Error::oracle(
                format!("checking validity of `{formula}`"),
                OracleError::Solver(message.clone()),
            )),
            Slot::Cancelled => Err(Error::Cancelled {
                formula: formula.to_string(),
            }),
        }
    }

    fn settle(&self, formula: &Formula, answer: Answer) -> Result<bool> {
        match answer {
            Ok(valid) => {
                self.slots.insert(formula.clone(), Slot::Ready(valid));
                Ok(valid)
            }
            Err(source) => {
                self.slots
                    .insert(formula.clone(), Slot::Failed(source.to_string()));
                Err(Error::oracle(format!("checking validity of `{formula}`"), source))
            }
        }
    }

    fn cancel(&self, formula: &Formula) -> Error {
        self.stats.record_cancelled();
        if let Some(mut slot) = self.slots.get_mut(formula) {
            if matches!(*slot, Slot::Pending(_)) {
                *slot = Slot::Cancelled;
            }
        }
        Error::Cancelled {
            formula: formula.to_string(),
        }
    }
}

impl ValidityCalculator for ParallelValidityCalculator {
    fn submit_formula(&self, formula: &Formula) {
        match self.slots.entry(formula.clone()) {
            Entry::Occupied(_) => self.stats.record_duplicate(),
            Entry::Vacant(vacant) => {
                let (reply, rx) = crossbeam_channel::bounded(1);
                let job = Job::Validity {
                    formula: formula.clone(),
                    reply,
                };
                if self.pool.dispatch(job) {
                    self.stats.record_submitted();
                    vacant.insert(Slot::Pending(rx));
                } else {
                    self.stats.record_cancelled();
                    vacant.insert(Slot::Cancelled);
                }
            }
        }
    }

    fn is_valid(&self, formula: &Formula) -> Result<bool> {
        let rx = match self.lookup(formula)? {
            Ok(answer) => {
                self.stats.record_cache_hit();
                return Ok(answer);
            }
            Err(rx) => rx,
        };

        if self.pool.is_shut_down() {
            return match rx.try_recv() {
                Ok(answer) => self.settle(formula, answer),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    Err(self.cancel(formula))
                }
            };
        }

        match rx.recv_timeout(self.timeout) {
            Ok(answer) => self.settle(formula, answer),
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    formula = %formula,
                    timeout_secs = self.timeout.as_secs(),
                    "oracle did not answer in time"
                );
                Err(Error::OracleTimeout {
                    formula: formula.to_string(),
                    timeout: self.timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                // Another waiter may have taken the answer first.
                match self.lookup(formula)? {
                    Ok(answer) => Ok(answer),
                    Err(_) => Err(self.cancel(formula)),
                }
            }
        }
    }

    fn entails(&self, premises: &[Formula], conclusion: &Formula) -> Result<bool> {
        self.pool.entails(premises, conclusion, self.timeout)
    }

    fn shutdown(&self) {
        debug!("shutting down oracle pool");
        self.pool.shutdown();
    }

    fn stats(&self) -> &CalculatorStats {
        &self.stats
    }
}

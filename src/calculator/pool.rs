use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::error::{Error, OracleError, Result};
use crate::formula::Formula;
use crate::oracle::OracleClient;
use crate::trace::{error, trace, warn};

use super::CalculatorStats;

pub type Reply = Sender<std::result::Result<bool, OracleError>>;
pub type BatchReply = Sender<std::result::Result<Vec<bool>, OracleError>>;

/// A unit of oracle work; the answer goes back on `reply`.
pub enum Job {
    Validity {
        formula: Formula,
        reply: Reply,
    },
    /// Several formulas answered by one oracle request.
    ValidityBatch {
        formulas: Vec<Formula>,
        reply: BatchReply,
    },
    Entailment {
        premises: Vec<Formula>,
        conclusion: Formula,
        reply: Reply,
    },
}

/// Fixed set of threads answering oracle jobs from a shared queue.
///
/// Workers are detached: after [`shutdown`](Self::shutdown) the queue closes,
/// queued jobs are dropped unanswered, and each worker exits once its
/// current oracle call returns.
pub struct OraclePool {
    sender: Mutex<Option<Sender<Job>>>,
    cancelled: Arc<AtomicBool>,
    workers: usize,
    stats: Arc<CalculatorStats>,
}

impl OraclePool {
    pub fn start(client: OracleClient, workers: usize, stats: Arc<CalculatorStats>) -> Result<Self> {
        if workers == 0 {
            return Err(Error::Config("oracle pool needs at least one worker".into()));
        }
        let (tx, rx) = crossbeam_channel::unbounded::<Job>();
        let cancelled = Arc::new(AtomicBool::new(false));

        for id in 0..workers {
            let rx = rx.clone();
            let client = client.clone();
            let cancelled = Arc::clone(&cancelled);
            let worker_stats = Arc::clone(&stats);
            thread::Builder::new()
                .name(format!("oracle-worker-{id}"))
                .spawn(move || run_worker(id, rx, client, cancelled, worker_stats))
                .map_err(|e| Error::oracle("starting oracle workers", OracleError::Io(e)))?;
        }

        Ok(Self {
            sender: Mutex::new(Some(tx)),
            cancelled,
            workers,
            stats,
        })
    }

    /// Queue `job`; false once the pool is shut down.
    pub fn dispatch(&self, job: Job) -> bool {
        match self.sender.lock().as_ref() {
            Some(tx) => tx.send(job).is_ok(),
            None => false,
        }
    }

    pub fn shutdown(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.sender.lock().take();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Ask whether `premises` entail `conclusion`, waiting at most `timeout`.
    pub fn entails(
        &self,
        premises: &[Formula],
        conclusion: &Formula,
        timeout: Duration,
    ) -> Result<bool> {
        let (reply, rx) = crossbeam_channel::bounded(1);
        let job = Job::Entailment {
            premises: premises.to_vec(),
            conclusion: conclusion.clone(),
            reply,
        };
        let cancelled = || {
            self.stats.record_cancelled();
            Error::Cancelled {
                formula: conclusion.to_string(),
            }
        };
        if !self.dispatch(job) {
            return Err(cancelled());
        }
        match rx.recv_timeout(timeout) {
            Ok(answer) => answer.map_err(|source| {
                Error::oracle(format!("checking entailment of `{conclusion}`"), source)
            }),
            Err(RecvTimeoutError::Timeout) => {
                warn!(conclusion = %conclusion, "entailment check timed out");
                Err(Error::OracleTimeout {
                    formula: conclusion.to_string(),
                    timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(cancelled()),
        }
    }
}

impl Drop for OraclePool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(
    id: usize,
    rx: Receiver<Job>,
    client: OracleClient,
    cancelled: Arc<AtomicBool>,
    stats: Arc<CalculatorStats>,
) {
    for job in rx.iter() {
        if cancelled.load(Ordering::Acquire) {
            continue;
        }
        stats.record_oracle_call();
        match job {
            Job::Validity { formula, reply } => {
                trace!(worker = id, formula = %formula, "validity job");
                let answer = client
                    .validity(std::slice::from_ref(&formula))
                    .and_then(|answers| {
                        answers.first().copied().ok_or(OracleError::ResponseShape {
                            expected: 1,
                            got: 0,
                        })
                    });
                report_failure(id, &answer);
                let _ = reply.send(answer);
            }
            Job::ValidityBatch { formulas, reply } => {
                trace!(worker = id, formulas = formulas.len(), "validity batch job");
                let answer = client.validity(&formulas);
                report_failure(id, &answer);
                let _ = reply.send(answer);
            }
            Job::Entailment {
                premises,
                conclusion,
                reply,
            } => {
                trace!(worker = id, premises = premises.len(), "entailment job");
                let answer = client.entails(&premises, &conclusion);
                report_failure(id, &answer);
                let _ = reply.send(answer);
            }
        }
    }
    trace!(worker = id, "oracle worker exiting");
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn report_failure<T>(worker: usize, answer: &std::result::Result<T, OracleError>) {
    if let Err(failure) = answer {
        error!(worker, error = %failure, "oracle call failed");
    }
}

//! Search counters for profiling a refinement run.
//!
//! With the `tracing` feature, [`SearchMetrics`] keeps relaxed atomic
//! counters that the refinement engine bumps as it tests candidates and
//! processes solutions. Without it every method is an empty inline function
//! and the report is all zeros.
//!
//! ```rust,ignore
//! let report = refinement.metrics().report();
//! println!("{report}");
//! ```

#[cfg(feature = "tracing")]
use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregate counters for one refinement run.
///
/// Relaxed ordering: values read mid-run may lag, the report taken after the
/// search completes is exact.
#[cfg(feature = "tracing")]
#[derive(Debug, Default)]
pub struct SearchMetrics {
    /// Candidate literals considered during expansion
    pub candidates_tested: AtomicU64,
    /// Candidates refused by the bias stack
    pub bias_rejections: AtomicU64,
    /// Candidates refused by clause admission (typing, order, connectivity)
    pub admission_rejections: AtomicU64,
    /// Admitted children dropped as non-canonical
    pub non_representative: AtomicU64,
    /// Children handed back to the traversal engine
    pub children_created: AtomicU64,
    /// Nodes skipped because an accepted clause subsumes them
    pub subsumed_nodes: AtomicU64,
    pub solutions_invalid: AtomicU64,
    pub solutions_entailed: AtomicU64,
    pub solutions_accepted: AtomicU64,
    /// Accepted clauses removed by the final redundancy pass
    pub solutions_pruned: AtomicU64,
    /// Deepest node expanded
    pub max_depth: AtomicU64,
}

#[cfg(feature = "tracing")]
impl SearchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_candidate(&self) {
        self.candidates_tested.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_bias_rejection(&self) {
        self.bias_rejections.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_admission_rejection(&self) {
        self.admission_rejections.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_non_representative(&self) {
        self.non_representative.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_child(&self) {
        self.children_created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_subsumed(&self) {
        self.subsumed_nodes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_invalid(&self) {
        self.solutions_invalid.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_entailed(&self) {
        self.solutions_entailed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_accepted(&self) {
        self.solutions_accepted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_pruned(&self) {
        self.solutions_pruned.fetch_add(1, Ordering::Relaxed);
    }

    /// Raise the recorded maximum depth to `depth` if it is higher.
    #[inline]
    pub fn record_depth(&self, depth: u64) {
        self.max_depth.fetch_max(depth, Ordering::Relaxed);
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            candidates_tested: self.candidates_tested.load(Ordering::Relaxed),
            bias_rejections: self.bias_rejections.load(Ordering::Relaxed),
            admission_rejections: self.admission_rejections.load(Ordering::Relaxed),
            non_representative: self.non_representative.load(Ordering::Relaxed),
            children_created: self.children_created.load(Ordering::Relaxed),
            subsumed_nodes: self.subsumed_nodes.load(Ordering::Relaxed),
            solutions_invalid: self.solutions_invalid.load(Ordering::Relaxed),
            solutions_entailed: self.solutions_entailed.load(Ordering::Relaxed),
            solutions_accepted: self.solutions_accepted.load(Ordering::Relaxed),
            solutions_pruned: self.solutions_pruned.load(Ordering::Relaxed),
            max_depth: self.max_depth.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.candidates_tested,
            &self.bias_rejections,
            &self.admission_rejections,
            &self.non_representative,
            &self.children_created,
            &self.subsumed_nodes,
            &self.solutions_invalid,
            &self.solutions_entailed,
            &self.solutions_accepted,
            &self.solutions_pruned,
            &self.max_depth,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Snapshot of [`SearchMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsReport {
    pub candidates_tested: u64,
    pub bias_rejections: u64,
    pub admission_rejections: u64,
    pub non_representative: u64,
    pub children_created: u64,
    pub subsumed_nodes: u64,
    pub solutions_invalid: u64,
    pub solutions_entailed: u64,
    pub solutions_accepted: u64,
    pub solutions_pruned: u64,
    pub max_depth: u64,
}

impl MetricsReport {
    /// Fraction of tested candidates that became children.
    pub fn yield_rate(&self) -> f64 {
        if self.candidates_tested == 0 {
            0.0
        } else {
            self.children_created as f64 / self.candidates_tested as f64
        }
    }

    /// Accepted clauses that survived redundancy pruning.
    pub fn solutions_kept(&self) -> u64 {
        self.solutions_accepted.saturating_sub(self.solutions_pruned)
    }
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Search Metrics ===")?;
        writeln!(
            f,
            "Candidates:         {} tested, {} bias, {} admission rejections",
            self.candidates_tested, self.bias_rejections, self.admission_rejections
        )?;
        writeln!(
            f,
            "Children:           {} created ({:.1}% yield), {} non-representative",
            self.children_created,
            self.yield_rate() * 100.0,
            self.non_representative
        )?;
        writeln!(f, "Subsumed nodes:     {}", self.subsumed_nodes)?;
        writeln!(
            f,
            "Solutions:          {} invalid, {} entailed, {} accepted",
            self.solutions_invalid, self.solutions_entailed, self.solutions_accepted
        )?;
        writeln!(
            f,
            "Pruned:             {} ({} kept)",
            self.solutions_pruned,
            self.solutions_kept()
        )?;
        writeln!(f, "Max depth:          {}", self.max_depth)?;
        Ok(())
    }
}

#[cfg(not(feature = "tracing"))]
#[derive(Debug, Default)]
pub struct SearchMetrics;

#[cfg(not(feature = "tracing"))]
impl SearchMetrics {
    #[inline]
    pub fn new() -> Self {
        SearchMetrics
    }
    #[inline]
    pub fn record_candidate(&self) {}
    #[inline]
    pub fn record_bias_rejection(&self) {}
    #[inline]
    pub fn record_admission_rejection(&self) {}
    #[inline]
    pub fn record_non_representative(&self) {}
    #[inline]
    pub fn record_child(&self) {}
    #[inline]
    pub fn record_subsumed(&self) {}
    #[inline]
    pub fn record_invalid(&self) {}
    #[inline]
    pub fn record_entailed(&self) {}
    #[inline]
    pub fn record_accepted(&self) {}
    #[inline]
    pub fn record_pruned(&self) {}
    #[inline]
    pub fn record_depth(&self, _depth: u64) {}
    #[inline]
    pub fn report(&self) -> MetricsReport {
        MetricsReport::default()
    }
    #[inline]
    pub fn reset(&self) {}
}

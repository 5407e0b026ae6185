//! Run results and diagnostics.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use kindle_foundation::{Error, Value};

use crate::rule::RuleId;

// =============================================================================
// Firing Record
// =============================================================================

/// What happened to one rule during a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FiringStatus {
    /// The rule wrote its output.
    Fired,
    /// The guard or producer failed; nothing was written.
    Failed(String),
    /// The rule did not compile and was excluded from the run.
    Rejected(String),
}

/// Record of a rule that fired, failed, or was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Firing {
    /// Which rule.
    pub rule: RuleId,
    /// The fact it writes.
    pub output: String,
    /// What happened.
    pub status: FiringStatus,
}

impl Firing {
    /// Returns true if the rule wrote its output.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.status == FiringStatus::Fired
    }
}

// =============================================================================
// Run Statistics
// =============================================================================

/// Counters for a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Rules handed to the worker pool.
    pub dispatched: usize,
    /// Dispatched rules that wrote their output.
    pub completed: usize,
    /// Rules whose guard or producer failed.
    pub failed: usize,
    /// Rules excluded because they did not compile.
    pub rejected: usize,
}

// =============================================================================
// Run Outcome
// =============================================================================

/// Everything a run produced.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    /// Final working memory, sorted by fact name.
    pub facts: BTreeMap<String, Value>,
    /// Value of the terminal fact, if it was derived or supplied.
    pub terminal: Option<Value>,
    /// Counters.
    pub stats: RunStats,
    /// One record per rule that fired, failed, or was rejected, in the order
    /// they happened.
    pub firings: Vec<Firing>,
}

impl RunOutcome {
    /// Looks up a fact in the final state.
    #[must_use]
    pub fn fact(&self, name: &str) -> Option<&Value> {
        self.facts.get(name)
    }

    /// Returns how many times `rule` fired (0 or 1).
    #[must_use]
    pub fn fire_count(&self, rule: RuleId) -> usize {
        self.firings
            .iter()
            .filter(|f| f.rule == rule && f.is_fired())
            .count()
    }

    /// Iterates the records of rules that failed or were rejected.
    pub fn failures(&self) -> impl Iterator<Item = &Firing> {
        self.firings.iter().filter(|f| !f.is_fired())
    }
}

// =============================================================================
// Recorder
// =============================================================================

/// Collects firings and counters from every worker.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    inner: Mutex<(RunStats, Vec<Firing>)>,
}

impl Recorder {
    pub(crate) fn dispatched(&self, n: usize) {
        self.inner.lock().0.dispatched += n;
    }

    pub(crate) fn fired(&self, rule: RuleId, output: &str) {
        let mut inner = self.inner.lock();
        inner.0.completed += 1;
        inner.1.push(Firing {
            rule,
            output: output.to_string(),
            status: FiringStatus::Fired,
        });
    }

    pub(crate) fn failed(&self, rule: RuleId, output: &str, error: &Error) {
        let mut inner = self.inner.lock();
        inner.0.failed += 1;
        inner.1.push(Firing {
            rule,
            output: output.to_string(),
            status: FiringStatus::Failed(describe(error)),
        });
    }

    pub(crate) fn rejected(&self, rule: RuleId, output: &str, error: &Error) {
        let mut inner = self.inner.lock();
        inner.0.rejected += 1;
        inner.1.push(Firing {
            rule,
            output: output.to_string(),
            status: FiringStatus::Rejected(describe(error)),
        });
    }

    pub(crate) fn finish(self) -> (RunStats, Vec<Firing>) {
        self.inner.into_inner()
    }
}

/// Error message with its context, for diagnostics.
pub(crate) fn describe(error: &Error) -> String {
    match &error.context {
        Some(context) => format!("{error} ({context})"),
        None => error.to_string(),
    }
}

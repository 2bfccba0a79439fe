//! In-process [`ObservabilitySink`]: a bounded console error ring plus retry
//! counters, owned by one page session or one daemon.

use crate::backend::ObservabilitySink;
use relink_common::failure::FailureKind;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

pub const DEFAULT_CONSOLE_CAPACITY: usize = 50;

#[derive(Debug, Default)]
struct Counters {
    attempts_by_kind: BTreeMap<FailureKind, u64>,
    succeeded: u64,
    failed: u64,
}

/// Aggregate view of every retry cycle recorded so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetryStatsReport {
    pub attempts_by_kind: BTreeMap<FailureKind, u64>,
    pub succeeded: u64,
    pub failed: u64,
}

impl RetryStatsReport {
    pub fn total_failures_classified(&self) -> u64 {
        self.attempts_by_kind.values().sum()
    }

    /// Share of retry cycles that ended in success, if any ran.
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.succeeded + self.failed;
        (total > 0).then(|| self.succeeded as f64 / total as f64)
    }
}

#[derive(Debug)]
pub struct InMemoryObservability {
    capacity: usize,
    console: Mutex<VecDeque<String>>,
    counters: Mutex<Counters>,
}

impl Default for InMemoryObservability {
    fn default() -> Self {
        Self::new(DEFAULT_CONSOLE_CAPACITY)
    }
}

impl InMemoryObservability {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            console: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Record a console error, evicting the oldest entry when full.
    pub fn push_console_error(&self, text: impl Into<String>) {
        let mut console = self.console.lock().unwrap_or_else(|e| e.into_inner());
        if console.len() == self.capacity {
            console.pop_front();
        }
        console.push_back(text.into());
    }

    pub fn clear_console(&self) {
        self.console
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn report(&self) -> RetryStatsReport {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        RetryStatsReport {
            attempts_by_kind: counters.attempts_by_kind.clone(),
            succeeded: counters.succeeded,
            failed: counters.failed,
        }
    }

    pub fn reset_stats(&self) {
        *self.counters.lock().unwrap_or_else(|e| e.into_inner()) = Counters::default();
    }
}

impl ObservabilitySink for InMemoryObservability {
    fn recent_console_errors(&self, limit: usize) -> Vec<String> {
        let console = self.console.lock().unwrap_or_else(|e| e.into_inner());
        let skip = console.len().saturating_sub(limit);
        console.iter().skip(skip).cloned().collect()
    }

    fn record_attempt(&self, kind: FailureKind) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        *counters.attempts_by_kind.entry(kind).or_insert(0) += 1;
    }

    fn record_outcome(&self, succeeded: bool) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        if succeeded {
            counters.succeeded += 1;
        } else {
            counters.failed += 1;
        }
    }
}

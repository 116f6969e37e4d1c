//! Wall-clock profiling of node evaluations.
//!
//! Nodes flagged with the `ProfileTime` descriptor record their
//! evaluation time here, keyed by a label (usually the dispatch key).
//! Entries accumulate across submissions until taken; the report
//! serialises to JSON for downstream tooling.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

/// One accumulated label in the report.
#[derive(Clone, Debug, Serialize)]
pub struct ProfileEntry {
    pub label: String,
    pub count: u64,
    pub total_nanos: u64,
}

/// Label → accumulated time map.
#[derive(Default)]
pub struct TimeProfiler {
    entries: Mutex<HashMap<String, (u64, u64)>>,
}

impl TimeProfiler {
    /// Record one measured duration under `label`.
    pub fn record(&self, label: &str, nanos: u64) {
        let mut entries = self.entries.lock().unwrap();
        let slot = entries.entry(label.to_string()).or_insert((0, 0));
        slot.0 += 1;
        slot.1 += nanos;
    }

    /// Start a measurement scope; the drop records it.
    pub fn scope<'a>(&'a self, label: &str) -> ProfileScope<'a> {
        ProfileScope { profiler: self, label: label.to_string(), start: Instant::now() }
    }

    /// Snapshot of all entries, sorted by label.
    pub fn report(&self) -> Vec<ProfileEntry> {
        let entries = self.entries.lock().unwrap();
        let mut report: Vec<ProfileEntry> = entries
            .iter()
            .map(|(label, (count, total_nanos))| ProfileEntry {
                label: label.clone(),
                count: *count,
                total_nanos: *total_nanos,
            })
            .collect();
        report.sort_by(|a, b| a.label.cmp(&b.label));
        report
    }

    /// JSON rendering of [`Self::report`].
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&self.report())?)
    }

    /// Drop all accumulated entries.
    pub fn reset(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// RAII measurement scope.
pub struct ProfileScope<'a> {
    profiler: &'a TimeProfiler,
    label: String,
    start: Instant,
}

impl Drop for ProfileScope<'_> {
    fn drop(&mut self) {
        let nanos = self.start.elapsed().as_nanos().min(u64::MAX as u128) as u64;
        self.profiler.record(&self.label, nanos);
    }
}

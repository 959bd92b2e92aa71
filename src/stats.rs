//! Per-task outcome statistics.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

/// Outcome counters for one task id.
///
/// `total_executions == success_count + error_count` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total_executions: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub last_execution: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl TaskStats {
    pub fn success_rate(&self) -> f64 {
        if self.total_executions == 0 {
            return 0.0;
        }
        self.success_count as f64 / self.total_executions as f64
    }
}

/// Stats keyed by task id behind a single reader/writer lock.
#[derive(Debug, Default)]
pub(crate) struct StatsTable {
    entries: RwLock<HashMap<String, TaskStats>>,
}

impl StatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: &str, error: Option<String>) {
        let mut entries = self.entries.write();
        let stats = entries.entry(id.to_string()).or_default();

        stats.total_executions += 1;
        stats.last_execution = Some(Utc::now());

        match error {
            None => stats.success_count += 1,
            Some(message) => {
                stats.error_count += 1;
                stats.last_error = Some(message);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<TaskStats> {
        self.entries.read().get(id).cloned()
    }

    pub fn snapshot(&self) -> HashMap<String, TaskStats> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}

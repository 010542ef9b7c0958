// Copyright 2026 Hypermesh Foundation. All rights reserved.
// VEC Simulation Suite - Metrics Accumulator

use serde::{Deserialize, Serialize};

use crate::types::{ProcessingSite, Task};

/// Append-only log of completed tasks plus the running energy total.
///
/// Written only by the environment. Insertion order is completion order:
/// local completions of a slot come first (vehicle order), followed by the
/// server completions of that slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    completed: Vec<Task>,
    total_energy_j: f64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_completion(&mut self, task: Task) {
        debug_assert!(task.is_completed(), "task {} recorded without completion time", task.id);
        self.completed.push(task);
    }

    pub(crate) fn add_energy(&mut self, joules: f64) {
        self.total_energy_j += joules;
    }

    pub fn completed_tasks(&self) -> &[Task] {
        &self.completed
    }

    pub fn total_energy_j(&self) -> f64 {
        self.total_energy_j
    }

    pub fn completions_at(&self, site: ProcessingSite) -> usize {
        self.completed.iter().filter(|t| t.site == Some(site)).count()
    }

    pub fn violation_count(&self, deadline_s: f64) -> usize {
        self.completed.iter().filter(|t| t.is_violation(deadline_s)).count()
    }

    /// Violation percentage over the last `window` completions. The count is
    /// divided by `window` even when fewer tasks have completed.
    pub fn recent_violation_rate(&self, window: usize, deadline_s: f64) -> f64 {
        if window == 0 {
            return 0.0;
        }
        let start = self.completed.len().saturating_sub(window);
        let violations = self.completed[start..]
            .iter()
            .filter(|t| t.is_violation(deadline_s))
            .count();
        violations as f64 / window as f64 * 100.0
    }

    pub fn summary(&self, deadline_s: f64) -> RunSummary {
        let n = self.completed.len();
        if n == 0 {
            return RunSummary {
                completed_tasks: 0,
                avg_latency_ms: 0.0,
                qos_violation_rate: 0.0,
                violation_count: 0,
                total_energy_j: self.total_energy_j,
            };
        }
        let latency_sum_ms: f64 = self.completed.iter()
            .filter_map(Task::latency)
            .map(|l| l * 1000.0)
            .sum();
        let violation_count = self.violation_count(deadline_s);
        RunSummary {
            completed_tasks: n,
            avg_latency_ms: latency_sum_ms / n as f64,
            qos_violation_rate: violation_count as f64 / n as f64 * 100.0,
            violation_count,
            total_energy_j: self.total_energy_j,
        }
    }
}

/// Per-run summary derived from the raw completion log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub completed_tasks: usize,
    pub avg_latency_ms: f64,
    /// Percentage of completed tasks that missed their deadline.
    pub qos_violation_rate: f64,
    pub violation_count: usize,
    pub total_energy_j: f64,
}

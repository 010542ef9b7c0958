// Per-Slot JSONL Time Series Recorder
// Outputs one JSON line per slot for independent analysis

use serde::Serialize;
use vec_engine::Environment;
use std::io::Write;

#[derive(Debug, Serialize)]
pub struct SlotSnapshot {
    pub slot: u64,
    pub tasks_generated: u64,
    pub completed_tasks: usize,
    pub queued_tasks: usize,
    pub total_energy_j: f64,
    pub avg_latency_ms: f64,
    pub qos_violation_rate: f64,
    pub recent_violation_rate: f64,
    pub server_share: Vec<f64>,
}

impl SlotSnapshot {
    pub fn from_env(env: &Environment) -> Self {
        let deadline = env.params().deadline_s();
        let stats = env.stats();
        Self {
            slot: stats.time_slot,
            tasks_generated: stats.tasks_generated,
            completed_tasks: stats.completed_tasks,
            queued_tasks: stats.queued_tasks,
            total_energy_j: stats.total_energy_j,
            avg_latency_ms: stats.avg_latency_ms,
            qos_violation_rate: stats.qos_violation_rate,
            recent_violation_rate: env.metrics().recent_violation_rate(10, deadline),
            server_share: env.effective_allocation().to_vec(),
        }
    }
}

/// Time series recorder that accumulates snapshots and writes JSONL
pub struct TimeSeriesRecorder {
    snapshots: Vec<SlotSnapshot>,
}

impl TimeSeriesRecorder {
    pub fn new() -> Self {
        Self { snapshots: Vec::new() }
    }

    pub fn record(&mut self, env: &Environment) {
        self.snapshots.push(SlotSnapshot::from_env(env));
    }

    /// Write all snapshots to a JSONL file
    pub fn write_jsonl(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        for snapshot in &self.snapshots {
            let line = serde_json::to_string(snapshot)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }
}

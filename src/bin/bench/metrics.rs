// Per-Slot Metric Trackers: peak windowed violation rate, server backlog

use vec_engine::Environment;

// ─── Peak Violation Tracker ─────────────────────────────────────────────────

/// Tracks the worst violation rate over the most recent completions.
/// The first `warmup_slots` slots are ignored so a handful of early tasks
/// cannot dominate the peak.
pub struct PeakViolationTracker {
    pub window: usize,
    pub warmup_slots: u64,
    pub peak_rate: f64,
}

impl PeakViolationTracker {
    pub fn new() -> Self {
        Self { window: 10, warmup_slots: 10, peak_rate: 0.0 }
    }

    pub fn record_slot(&mut self, env: &Environment) {
        // time_slot has already advanced past the slot just simulated
        let slot = env.time_slot().saturating_sub(1);
        if slot <= self.warmup_slots || env.metrics().completed_tasks().is_empty() {
            return;
        }
        let rate = env.metrics().recent_violation_rate(self.window, env.params().deadline_s());
        self.peak_rate = self.peak_rate.max(rate);
    }
}

// ─── Backlog Tracker ────────────────────────────────────────────────────────

/// Largest total server backlog observed at a slot boundary.
pub struct BacklogTracker {
    pub peak: usize,
    pub per_slot: Vec<usize>,
}

impl BacklogTracker {
    pub fn new() -> Self {
        Self { peak: 0, per_slot: Vec::new() }
    }

    pub fn record_slot(&mut self, env: &Environment) {
        let queued = env.queued_tasks();
        self.peak = self.peak.max(queued);
        self.per_slot.push(queued);
    }
}

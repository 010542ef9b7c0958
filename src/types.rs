// Copyright 2026 Hypermesh Foundation. All rights reserved.
// VEC Simulation Suite - Type Definitions

use serde::{Deserialize, Serialize};

// ─── Processing Site ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProcessingSite {
    Local = 0,
    Server = 1,
}

// ─── Task ────────────────────────────────────────────────────────────────────

/// A unit of computation generated by a vehicle.
///
/// Lifecycle: pending on its vehicle → processed locally or queued at the
/// server → completed. `completed_at` is set exactly once, by whichever
/// processing path claims the task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: u64,
    pub vehicle_id: u32,
    pub size_bytes: f64,
    /// Creation time in seconds (the slot index).
    pub created_at: f64,
    /// Absolute deadline in seconds.
    pub deadline: f64,
    pub completed_at: Option<f64>,
    pub site: Option<ProcessingSite>,
    /// Uplink energy spent when the task was offloaded.
    #[serde(default)]
    pub tx_energy_j: f64,
    /// Compute energy spent by whichever CPU processed the task.
    #[serde(default)]
    pub compute_energy_j: f64,
}

impl Task {
    pub fn new(id: u64, vehicle_id: u32, size_bytes: f64, slot: u64, deadline_s: f64) -> Self {
        let created_at = slot as f64;
        Self {
            id,
            vehicle_id,
            size_bytes,
            created_at,
            deadline: created_at + deadline_s,
            completed_at: None,
            site: None,
            tx_energy_j: 0.0,
            compute_energy_j: 0.0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// End-to-end latency in seconds, once completed.
    pub fn latency(&self) -> Option<f64> {
        self.completed_at.map(|t| t - self.created_at)
    }

    /// QoS violation: latency strictly exceeds the deadline budget.
    pub fn is_violation(&self, deadline_s: f64) -> bool {
        self.latency().is_some_and(|latency| latency > deadline_s)
    }

    pub fn total_energy_j(&self) -> f64 {
        self.tx_energy_j + self.compute_energy_j
    }
}

// ─── Vehicle ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: u32,
    pub speed_mps: f64,
    /// Position on the ring road in metres, always in `[0, road_length)`.
    pub position_m: f64,
    /// Tasks generated but not yet dispatched this slot.
    pub pending: Vec<Task>,
}

impl Vehicle {
    pub fn new(id: u32, speed_mps: f64, position_m: f64) -> Self {
        Self { id, speed_mps, position_m, pending: Vec::new() }
    }

    pub fn pending_load_bytes(&self) -> f64 {
        self.pending.iter().map(|t| t.size_bytes).sum()
    }

    /// Advance by one slot of movement, wrapping on a ring of `road_length_m`.
    pub fn advance(&mut self, road_length_m: f64) {
        self.position_m = wrap_position(self.position_m + self.speed_mps, road_length_m);
    }
}

/// Wrap a position onto `[0, road_length_m)`.
pub fn wrap_position(position_m: f64, road_length_m: f64) -> f64 {
    let wrapped = position_m.rem_euclid(road_length_m);
    // rem_euclid may round up to the modulus itself for tiny negative inputs
    if wrapped >= road_length_m { 0.0 } else { wrapped }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleState {
    pub id: u32,
    pub position_m: f64,
    pub speed_mps: f64,
    pub task_load_bytes: f64,
    pub channel_gain: f64,
}

/// Independent copy of the observable environment state at a slot boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub time_slot: u64,
    pub vehicles: Vec<VehicleState>,
    /// Server queue length per vehicle, indexed by vehicle id.
    pub server_queue_lengths: Vec<usize>,
}

impl Snapshot {
    pub fn num_vehicles(&self) -> usize {
        self.vehicles.len()
    }

    pub fn total_queued(&self) -> usize {
        self.server_queue_lengths.iter().sum()
    }
}

// ─── Forecast ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleForecast {
    pub id: u32,
    pub predicted_position_m: f64,
    pub predicted_task_load_bytes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastStep {
    pub time_slot: u64,
    pub vehicles: Vec<VehicleForecast>,
}

/// H projected states, ordered by `time_slot`.
pub type Forecast = Vec<ForecastStep>;

// ─── SimStats ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimStats {
    pub time_slot: u64,
    pub tasks_generated: u64,
    pub completed_tasks: usize,
    pub local_completions: usize,
    pub server_completions: usize,
    pub queued_tasks: usize,
    pub total_energy_j: f64,
    pub avg_latency_ms: f64,
    pub qos_violation_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_position_boundaries() {
        assert_eq!(wrap_position(2000.0, 2000.0), 0.0);
        assert_eq!(wrap_position(2010.5, 2000.0), 10.5);
        assert_eq!(wrap_position(0.0, 2000.0), 0.0);
        let w = wrap_position(-1e-18, 2000.0);
        assert!((0.0..2000.0).contains(&w));
    }

    #[test]
    fn test_task_violation_semantics() {
        let mut t = Task::new(0, 0, 1200.0, 3, 0.2);
        assert!((t.deadline - 3.2).abs() < 1e-12);
        assert!(!t.is_violation(0.2));
        assert_eq!(t.latency(), None);

        t.completed_at = Some(3.15);
        assert!(!t.is_violation(0.2));

        t.completed_at = Some(4.0);
        assert!(t.is_violation(0.2));
        assert!((t.latency().unwrap_or_default() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_vehicle_advance_wraps() {
        let mut v = Vehicle::new(0, 25.0, 1990.0);
        v.advance(2000.0);
        assert!((v.position_m - 15.0).abs() < 1e-9);
    }
}

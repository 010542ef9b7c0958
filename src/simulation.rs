// Copyright 2026 Hypermesh Foundation. All rights reserved.
// VEC Simulation Suite - Simulation Core

use std::collections::VecDeque;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::action::{normalize_allocation, Action, ActionError};
use crate::channel;
use crate::metrics::Metrics;
use crate::params::{kmh_to_mps, ConfigError, Params};
use crate::types::*;

/// Probability that a vehicle generates one task in a slot.
pub const TASK_GENERATION_PROBABILITY: f64 = 0.7;
/// Per-slot probability of resampling a vehicle's speed in dynamic mode.
pub const SPEED_CHANGE_PROBABILITY: f64 = 0.2;
/// Effective switched capacitance of a vehicle CPU.
pub const LOCAL_ENERGY_COEFFICIENT: f64 = 1e-26;
/// Effective switched capacitance of the edge server.
pub const SERVER_ENERGY_COEFFICIENT: f64 = 1e-24;

// ─── Environment ─────────────────────────────────────────────────────────────

/// Time-stepped vehicular edge network.
///
/// Owns every vehicle, one FIFO server queue per vehicle, the slot clock and
/// the metrics log. Each task lives in exactly one container at a time (a
/// vehicle's pending list, a server queue, or the completed log); moving it
/// between containers is what guarantees it is processed once.
#[derive(Debug, Clone)]
pub struct Environment {
    pub(crate) params: Params,
    pub(crate) vehicles: Vec<Vehicle>,
    pub(crate) server_queues: Vec<VecDeque<Task>>,
    pub(crate) time_slot: u64,
    pub(crate) task_id_counter: u64,
    pub(crate) metrics: Metrics,
    pub(crate) dynamic_speed: bool,
    /// Allocation vector actually applied by the last step.
    pub(crate) effective_allocation: Vec<f64>,
    rng: ChaCha8Rng,
}

/// Energy and routing tallies of one dispatch phase.
#[derive(Debug, Default)]
struct DispatchOutcome {
    energy_j: f64,
    local: usize,
    offloaded: usize,
}

impl Environment {
    /// Build a fleet of `num_vehicles` with speeds and positions drawn from
    /// `params`, using a generator seeded with `seed`.
    ///
    /// `params` is validated first; an unusable parameter set is rejected
    /// here rather than panicking inside the first step.
    pub fn new(params: Params, num_vehicles: usize, seed: u64) -> Result<Self, ConfigError> {
        params.validate()?;
        let fleet_size = u32::try_from(num_vehicles)
            .map_err(|_| ConfigError::FleetTooLarge(num_vehicles))?;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let road_length_m = params.road_length_m();
        let (speed_lo, speed_hi) = params.vehicle_speed_kmh;

        let vehicles = (0..fleet_size)
            .map(|id| {
                let speed_mps = kmh_to_mps(rng.gen_range(speed_lo..=speed_hi));
                let position_m = wrap_position(rng.gen_range(0.0..road_length_m), road_length_m);
                Vehicle::new(id, speed_mps, position_m)
            })
            .collect();

        Ok(Self {
            params,
            vehicles,
            server_queues: vec![VecDeque::new(); num_vehicles],
            time_slot: 0,
            task_id_counter: 0,
            metrics: Metrics::new(),
            dynamic_speed: false,
            effective_allocation: vec![0.0; num_vehicles],
            rng,
        })
    }

    pub fn set_dynamic_speed(&mut self, enabled: bool) { self.dynamic_speed = enabled; }

    pub fn params(&self) -> &Params { &self.params }
    pub fn num_vehicles(&self) -> usize { self.vehicles.len() }
    pub fn time_slot(&self) -> u64 { self.time_slot }
    pub fn metrics(&self) -> &Metrics { &self.metrics }
    pub fn vehicles(&self) -> &[Vehicle] { &self.vehicles }
    pub fn tasks_generated(&self) -> u64 { self.task_id_counter }
    pub fn effective_allocation(&self) -> &[f64] { &self.effective_allocation }

    pub fn server_queue(&self, vehicle_id: usize) -> Option<&VecDeque<Task>> {
        self.server_queues.get(vehicle_id)
    }

    pub fn queued_tasks(&self) -> usize {
        self.server_queues.iter().map(VecDeque::len).sum()
    }

    /// Uplink energy already charged for tasks still waiting at the server.
    pub fn outstanding_transmission_energy(&self) -> f64 {
        self.server_queues.iter().flatten().map(|t| t.tx_energy_j).sum()
    }

    pub fn channel_gain(&self, vehicle: &Vehicle) -> f64 {
        channel::channel_gain(vehicle.position_m, &self.params)
    }

    /// Deep copy of the observable state.
    pub fn get_state(&self) -> Snapshot {
        Snapshot {
            time_slot: self.time_slot,
            vehicles: self.vehicles.iter()
                .map(|v| VehicleState {
                    id: v.id,
                    position_m: v.position_m,
                    speed_mps: v.speed_mps,
                    task_load_bytes: v.pending_load_bytes(),
                    channel_gain: self.channel_gain(v),
                })
                .collect(),
            server_queue_lengths: self.server_queues.iter().map(VecDeque::len).collect(),
        }
    }

    /// Advance the network by one slot under `action`.
    ///
    /// The action is validated before any state is touched; an invalid
    /// action leaves the environment exactly as it was.
    pub fn step(&mut self, action: &Action) -> Result<Snapshot, ActionError> {
        action.validate(self.vehicles.len())?;

        self.update_mobility();
        let generated = self.generate_tasks();
        let dispatch = self.dispatch_pending(&action.w);

        self.effective_allocation = normalize_allocation(&action.a);
        let (server_energy_j, served) = self.process_server_queues();

        let slot_energy_j = dispatch.energy_j + server_energy_j;
        self.metrics.add_energy(slot_energy_j);

        debug!(
            slot = self.time_slot,
            generated,
            local = dispatch.local,
            offloaded = dispatch.offloaded,
            served,
            queued = self.queued_tasks(),
            energy_j = slot_energy_j,
            "slot complete"
        );

        self.time_slot += 1;
        Ok(self.get_state())
    }

    // ─── Sub-phases ─────────────────────────────────────────────────────

    fn update_mobility(&mut self) {
        let road_length_m = self.params.road_length_m();
        let (speed_lo, speed_hi) = self.params.vehicle_speed_kmh;
        for v in &mut self.vehicles {
            if self.dynamic_speed && self.rng.gen::<f64>() < SPEED_CHANGE_PROBABILITY {
                v.speed_mps = kmh_to_mps(self.rng.gen_range(speed_lo..=speed_hi));
            }
            v.advance(road_length_m);
        }
    }

    /// Returns the number of tasks generated this slot.
    fn generate_tasks(&mut self) -> usize {
        let (size_lo, size_hi) = self.params.task_size_bytes;
        let deadline_s = self.params.deadline_s();
        let mut generated = 0;
        for v in &mut self.vehicles {
            if self.rng.gen::<f64>() < TASK_GENERATION_PROBABILITY {
                let size_bytes = self.rng.gen_range(size_lo..=size_hi);
                v.pending.push(Task::new(
                    self.task_id_counter,
                    v.id,
                    size_bytes,
                    self.time_slot,
                    deadline_s,
                ));
                self.task_id_counter += 1;
                generated += 1;
            }
        }
        generated
    }

    /// Route every pending task either to the on-board CPU (completed
    /// immediately) or to the vehicle's server queue.
    ///
    /// Transmission delay is charged as energy only; an offloaded task joins
    /// the queue in the same slot it was sent.
    fn dispatch_pending(&mut self, w: &[f64]) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        let now = self.time_slot as f64;
        let local_hz = self.params.vehicle_cpu_hz();
        let tx_power_w = self.params.tx_power_watts();

        for (i, v) in self.vehicles.iter_mut().enumerate() {
            let pending = std::mem::take(&mut v.pending);
            for mut task in pending {
                let offload = self.rng.gen::<f64>() < w[i];
                if offload {
                    let gain = channel::channel_gain(v.position_m, &self.params);
                    let rate_bps = channel::uplink_rate_bps(gain, &self.params);
                    let tx_time_s = task.size_bytes * 8.0 / rate_bps;
                    let energy = tx_power_w * tx_time_s;
                    trace!(task = task.id, vehicle = v.id, tx_time_s, "offloaded");

                    task.tx_energy_j = energy;
                    outcome.energy_j += energy;
                    outcome.offloaded += 1;
                    self.server_queues[i].push_back(task);
                } else {
                    let proc_time_s = self.params.cycles_for(task.size_bytes) / local_hz;
                    let energy = LOCAL_ENERGY_COEFFICIENT * local_hz.powi(2) * proc_time_s;
                    trace!(task = task.id, vehicle = v.id, proc_time_s, "processed locally");

                    task.compute_energy_j = energy;
                    task.site = Some(ProcessingSite::Local);
                    task.completed_at = Some(now + proc_time_s);
                    outcome.energy_j += energy;
                    outcome.local += 1;
                    self.metrics.record_completion(task);
                }
            }
        }
        outcome
    }

    /// Drain at most one task per queue using the effective allocation.
    /// Returns `(energy, tasks served)`.
    fn process_server_queues(&mut self) -> (f64, usize) {
        let now = self.time_slot as f64;
        let server_hz = self.params.server_cpu_hz();
        let mut energy_j = 0.0;
        let mut served = 0;

        for (i, queue) in self.server_queues.iter_mut().enumerate() {
            let allocated_hz = self.effective_allocation[i] * server_hz;
            if allocated_hz <= 0.0 {
                continue;
            }
            let Some(mut task) = queue.pop_front() else {
                continue;
            };
            let proc_time_s = self.params.cycles_for(task.size_bytes) / allocated_hz;
            let energy = SERVER_ENERGY_COEFFICIENT * allocated_hz.powi(2) * proc_time_s;

            task.compute_energy_j = energy;
            task.site = Some(ProcessingSite::Server);
            task.completed_at = Some(now + proc_time_s);
            energy_j += energy;
            served += 1;
            self.metrics.record_completion(task);
        }
        (energy_j, served)
    }

    /// Aggregate counters for dashboards and batch reports.
    pub fn stats(&self) -> SimStats {
        let summary = self.metrics.summary(self.params.deadline_s());
        SimStats {
            time_slot: self.time_slot,
            tasks_generated: self.task_id_counter,
            completed_tasks: summary.completed_tasks,
            local_completions: self.metrics.completions_at(ProcessingSite::Local),
            server_completions: self.metrics.completions_at(ProcessingSite::Server),
            queued_tasks: self.queued_tasks(),
            total_energy_j: summary.total_energy_j,
            avg_latency_ms: summary.avg_latency_ms,
            qos_violation_rate: summary.qos_violation_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(n: usize, seed: u64) -> Environment {
        Environment::new(Params::default(), n, seed).expect("default params are valid")
    }

    #[test]
    fn test_rejects_invalid_params() {
        let inverted = Params { task_size_bytes: (1500.0, 1000.0), ..Params::default() };
        assert!(matches!(
            Environment::new(inverted, 3, 1),
            Err(ConfigError::InvertedRange { name: "task_size_bytes", .. })
        ));

        let no_road = Params { road_length_km: 0.0, ..Params::default() };
        assert!(matches!(
            Environment::new(no_road, 3, 1),
            Err(ConfigError::NonPositive { name: "road_length_km", .. })
        ));

        let slow = Params { vehicle_speed_kmh: (100.0, 60.0), ..Params::default() };
        assert!(Environment::new(slow, 3, 1).is_err());
    }

    #[test]
    fn test_degenerate_ranges_are_accepted() {
        let fixed = Params {
            task_size_bytes: (1200.0, 1200.0),
            vehicle_speed_kmh: (72.0, 72.0),
            ..Params::default()
        };
        let mut e = Environment::new(fixed, 4, 9).expect("point ranges are valid");
        for _ in 0..10 {
            e.step(&Action::new(vec![0.0; 4], vec![0.25; 4])).expect("valid action");
        }
        assert!(e.metrics().completed_tasks().iter().all(|t| t.size_bytes == 1200.0));
        assert!(e.vehicles().iter().all(|v| (v.speed_mps - 20.0).abs() < 1e-12));
    }

    #[test]
    fn test_initial_fleet_within_ranges() {
        let e = env(30, 7);
        let (lo, hi) = e.params().speed_range_mps();
        for v in e.vehicles() {
            assert!(v.speed_mps >= lo && v.speed_mps <= hi);
            assert!(v.position_m >= 0.0 && v.position_m < 2000.0);
            assert!(v.pending.is_empty());
        }
        assert_eq!(e.time_slot(), 0);
        assert_eq!(e.get_state().server_queue_lengths, vec![0; 30]);
    }

    #[test]
    fn test_invalid_action_leaves_state_untouched() {
        let mut e = env(3, 1);
        let before = e.get_state();
        let err = e.step(&Action::new(vec![0.5; 2], vec![0.3; 3]));
        assert!(matches!(err, Err(ActionError::LengthMismatch { field: "w", .. })));
        assert_eq!(e.get_state(), before);
        assert_eq!(e.tasks_generated(), 0);
    }

    #[test]
    fn test_local_energy_formula() {
        let mut e = env(1, 3);
        // Force a single pending task through the local path
        e.vehicles[0].pending.push(Task::new(99, 0, 1000.0, 0, 0.2));
        e.task_id_counter = 100;
        let outcome = e.dispatch_pending(&[0.0]);
        assert_eq!(outcome.local, 1);
        // 1000 B * 0.25e6 cycles/B / 5e9 Hz = 0.05 s; E = 1e-26 * 25e18 * 0.05
        let expected = 1e-26 * 5e9f64.powi(2) * 0.05;
        assert!((outcome.energy_j - expected).abs() < 1e-20);
        let t = &e.metrics().completed_tasks()[0];
        assert_eq!(t.site, Some(ProcessingSite::Local));
        assert!((t.completed_at.unwrap_or_default() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_zero_allocation_skips_server() {
        let mut e = env(2, 5);
        e.server_queues[0].push_back(Task::new(0, 0, 1200.0, 0, 0.2));
        e.effective_allocation = vec![0.0, 1.0];
        let (energy, served) = e.process_server_queues();
        assert_eq!(served, 0);
        assert_eq!(energy, 0.0);
        assert_eq!(e.server_queues[0].len(), 1);
    }

    #[test]
    fn test_server_drains_one_task_per_queue() {
        let mut e = env(1, 5);
        for id in 0..3 {
            e.server_queues[0].push_back(Task::new(id, 0, 1000.0, 0, 0.2));
        }
        e.effective_allocation = vec![1.0];
        let (_, served) = e.process_server_queues();
        assert_eq!(served, 1);
        assert_eq!(e.server_queues[0].len(), 2);
        // FIFO: the head left first
        assert_eq!(e.metrics().completed_tasks()[0].id, 0);
    }

    #[test]
    fn test_dynamic_speed_changes_speeds() {
        let mut e = env(20, 11);
        e.set_dynamic_speed(true);
        let before: Vec<f64> = e.vehicles().iter().map(|v| v.speed_mps).collect();
        for _ in 0..20 {
            e.step(&Action::fallback(20)).expect("valid action");
        }
        let after: Vec<f64> = e.vehicles().iter().map(|v| v.speed_mps).collect();
        assert_ne!(before, after);
    }

    #[test]
    fn test_static_speed_is_constant() {
        let mut e = env(5, 11);
        let before: Vec<f64> = e.vehicles().iter().map(|v| v.speed_mps).collect();
        for _ in 0..10 {
            e.step(&Action::fallback(5)).expect("valid action");
        }
        let after: Vec<f64> = e.vehicles().iter().map(|v| v.speed_mps).collect();
        assert_eq!(before, after);
    }
}

// Copyright 2026 Hypermesh Foundation. All rights reserved.
// VEC Simulation Suite - Parameter Set

//! Physical and simulation constants for one run.
//!
//! A [`Params`] value is handed to the environment once at construction and
//! never mutated afterwards. Defaults reproduce the reference parameter table
//! (20 MHz uplink, 400 GHz edge server, 5 GHz vehicles, 2 km ring road).

use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating a parameter set.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("parameter `{name}` must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("range `{name}` is inverted: [{lo}, {hi}]")]
    InvertedRange { name: &'static str, lo: f64, hi: f64 },

    #[error("`num_vehicles_options` must not be empty")]
    NoVehicleCounts,

    #[error("forecast horizon must be at least one slot")]
    ZeroHorizon,

    #[error("fleet of {0} vehicles exceeds the u32 id space")]
    FleetTooLarge(usize),

    #[error("failed to read parameter file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse parameters: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Uplink bandwidth in MHz.
    pub network_bandwidth_mhz: f64,
    /// Total edge server CPU frequency in GHz, shared by all queues.
    pub server_cpu_freq_ghz: f64,
    /// On-board CPU frequency of every vehicle in GHz.
    pub vehicle_cpu_freq_ghz: f64,
    pub vehicle_tx_power_mw: f64,
    pub channel_noise_dbm: f64,
    /// Fleet sizes swept by the scalability study.
    pub num_vehicles_options: Vec<usize>,
    pub vehicle_speed_kmh: (f64, f64),
    pub task_size_bytes: (f64, f64),
    /// Mega-cycles needed per byte of task input.
    pub cpu_cycles_per_byte_mhz: f64,
    /// Forecast horizon H in slots.
    pub prediction_horizon: usize,
    pub simulation_time_slots: u64,
    pub task_deadline_ms: f64,
    pub road_length_km: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            network_bandwidth_mhz: 20.0,
            server_cpu_freq_ghz: 400.0,
            vehicle_cpu_freq_ghz: 5.0,
            vehicle_tx_power_mw: 200.0,
            channel_noise_dbm: -110.0,
            num_vehicles_options: vec![10, 20, 30],
            vehicle_speed_kmh: (60.0, 100.0),
            task_size_bytes: (1000.0, 1500.0),
            cpu_cycles_per_byte_mhz: 0.25,
            prediction_horizon: 5,
            simulation_time_slots: 100,
            task_deadline_ms: 200.0,
            road_length_km: 2.0,
        }
    }
}

impl Params {
    /// Parse a (possibly partial) JSON parameter set. Missing fields take
    /// their default values. The result is validated.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let params: Params = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positives = [
            ("network_bandwidth_mhz", self.network_bandwidth_mhz),
            ("server_cpu_freq_ghz", self.server_cpu_freq_ghz),
            ("vehicle_cpu_freq_ghz", self.vehicle_cpu_freq_ghz),
            ("vehicle_tx_power_mw", self.vehicle_tx_power_mw),
            ("cpu_cycles_per_byte_mhz", self.cpu_cycles_per_byte_mhz),
            ("task_deadline_ms", self.task_deadline_ms),
            ("road_length_km", self.road_length_km),
        ];
        for (name, value) in positives {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }

        let ranges = [
            ("vehicle_speed_kmh", self.vehicle_speed_kmh),
            ("task_size_bytes", self.task_size_bytes),
        ];
        for (name, (lo, hi)) in ranges {
            if !(lo.is_finite() && hi.is_finite()) || lo < 0.0 || lo > hi {
                return Err(ConfigError::InvertedRange { name, lo, hi });
            }
        }

        if self.num_vehicles_options.is_empty() {
            return Err(ConfigError::NoVehicleCounts);
        }
        if self.prediction_horizon == 0 {
            return Err(ConfigError::ZeroHorizon);
        }
        Ok(())
    }

    // ─── Derived quantities ─────────────────────────────────────────────

    pub fn road_length_m(&self) -> f64 {
        self.road_length_km * 1000.0
    }

    pub fn tx_power_watts(&self) -> f64 {
        self.vehicle_tx_power_mw / 1000.0
    }

    /// Noise floor converted from dBm to watts.
    pub fn noise_watts(&self) -> f64 {
        10f64.powf(self.channel_noise_dbm / 10.0) / 1000.0
    }

    pub fn bandwidth_hz(&self) -> f64 {
        self.network_bandwidth_mhz * 1e6
    }

    pub fn vehicle_cpu_hz(&self) -> f64 {
        self.vehicle_cpu_freq_ghz * 1e9
    }

    pub fn server_cpu_hz(&self) -> f64 {
        self.server_cpu_freq_ghz * 1e9
    }

    /// Deadline budget in seconds (one slot = one second).
    pub fn deadline_s(&self) -> f64 {
        self.task_deadline_ms / 1000.0
    }

    pub fn cycles_for(&self, size_bytes: f64) -> f64 {
        size_bytes * self.cpu_cycles_per_byte_mhz * 1e6
    }

    /// Speed range converted to metres per second.
    pub fn speed_range_mps(&self) -> (f64, f64) {
        let (lo, hi) = self.vehicle_speed_kmh;
        (kmh_to_mps(lo), kmh_to_mps(hi))
    }
}

pub fn kmh_to_mps(kmh: f64) -> f64 {
    kmh * 1000.0 / 3600.0
}

// Copyright 2026 Hypermesh Foundation. All rights reserved.
// VEC Simulation Suite - Predictive Digital Twin
//
// Projects the current snapshot H slots ahead: positions by constant-speed
// extrapolation, task loads by a decaying noisy multiplier. The twin keeps
// no state between calls apart from its own random stream, so drawing a
// forecast never perturbs the environment's trajectory.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::simulation::Environment;
use crate::types::{wrap_position, Forecast, ForecastStep, Snapshot, VehicleForecast};

const LOAD_NOISE_MEAN: f64 = 1.0;
const LOAD_NOISE_STD: f64 = 0.2;
/// Per-slot decay applied to projected task load.
const LOAD_DECAY: f64 = 0.9;

#[derive(Debug, Clone)]
pub struct DigitalTwin {
    horizon: usize,
    road_length_m: f64,
    rng: ChaCha8Rng,
}

impl DigitalTwin {
    pub fn new(horizon: usize, road_length_m: f64, seed: u64) -> Self {
        Self {
            horizon,
            road_length_m,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Twin configured from an environment's parameter set.
    pub fn for_environment(env: &Environment, seed: u64) -> Self {
        let params = env.params();
        Self::new(params.prediction_horizon, params.road_length_m(), seed)
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Forecast from the environment's current state (read-only borrow).
    pub fn forecast(&mut self, env: &Environment) -> Forecast {
        self.forecast_from(&env.get_state())
    }

    /// Forecast `horizon` steps ahead of `state`. Step `h` (1-based) carries
    /// `time_slot = state.time_slot + h`.
    pub fn forecast_from(&mut self, state: &Snapshot) -> Forecast {
        (1..=self.horizon)
            .map(|h| {
                let vehicles = state.vehicles.iter()
                    .map(|v| {
                        let z: f64 = StandardNormal.sample(&mut self.rng);
                        let noise = LOAD_NOISE_MEAN + LOAD_NOISE_STD * z;
                        let load = v.task_load_bytes * noise * LOAD_DECAY.powi(h as i32);
                        VehicleForecast {
                            id: v.id,
                            predicted_position_m: wrap_position(
                                v.position_m + v.speed_mps * h as f64,
                                self.road_length_m,
                            ),
                            predicted_task_load_bytes: load.max(0.0),
                        }
                    })
                    .collect();
                ForecastStep { time_slot: state.time_slot + h as u64, vehicles }
            })
            .collect()
    }
}

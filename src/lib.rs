// Copyright 2026 Hypermesh Foundation. All rights reserved.
// VEC Simulation Suite - vehicular edge-computing network simulator

pub mod types;
pub mod params;
pub mod channel;
pub mod action;
pub mod metrics;
pub mod simulation;
pub mod twin;
pub mod policy;
pub mod runner;

pub use types::*;
pub use action::{normalize_allocation, Action, ActionError};
pub use metrics::{Metrics, RunSummary};
pub use params::{ConfigError, Params};
pub use policy::{
    DecisionRequest, DecisionService, GreedyPolicy, HeuristicOrchestrator, Policy, RandomPolicy,
    RemotePolicy, SemanticGoal, ServiceError,
};
pub use runner::run_episode;
pub use simulation::Environment;
pub use twin::DigitalTwin;

use wasm_bindgen::prelude::*;

// ─── WASM Interface ──────────────────────────────────────────────────────────

/// Browser-facing handle around one environment and its forecaster.
#[wasm_bindgen]
pub struct VecSimulation {
    env: Environment,
    twin: DigitalTwin,
    num_vehicles: u32,
    seed: u64,
}

fn js_error<E: std::fmt::Display>(e: E) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
impl VecSimulation {
    #[wasm_bindgen(constructor)]
    pub fn new(num_vehicles: u32, seed: u64, dynamic_speed: bool) -> Result<VecSimulation, JsValue> {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        let mut env = Environment::new(Params::default(), num_vehicles as usize, seed)
            .map_err(js_error)?;
        env.set_dynamic_speed(dynamic_speed);
        let twin = DigitalTwin::for_environment(&env, seed.wrapping_add(1));
        Ok(Self { env, twin, num_vehicles, seed })
    }

    pub fn get_state(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.env.get_state()).unwrap_or(JsValue::NULL)
    }

    /// Step with an `{w, a}` object. Malformed actions are rejected with a
    /// JS error and leave the simulation untouched.
    pub fn step(&mut self, action: JsValue) -> Result<JsValue, JsValue> {
        let action: Action = serde_wasm_bindgen::from_value(action).map_err(js_error)?;
        let state = self.env.step(&action).map_err(js_error)?;
        Ok(serde_wasm_bindgen::to_value(&state).unwrap_or(JsValue::NULL))
    }

    pub fn forecast(&mut self) -> JsValue {
        let forecast = self.twin.forecast(&self.env);
        serde_wasm_bindgen::to_value(&forecast).unwrap_or(JsValue::NULL)
    }

    pub fn get_stats(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.env.stats()).unwrap_or(JsValue::NULL)
    }

    pub fn time_slot(&self) -> u64 {
        self.env.time_slot()
    }

    /// Run N slots under the greedy baseline without returning snapshots.
    pub fn run_batch(&mut self, slots: u32) -> Result<(), JsValue> {
        run_episode(
            &mut self.env,
            &mut self.twin,
            &mut GreedyPolicy,
            SemanticGoal::Balance,
            slots as u64,
            |_| {},
        )
        .map_err(js_error)
    }

    /// Reset to a fresh environment with the seed it was built with.
    pub fn reset(&mut self) -> Result<(), JsValue> {
        let dynamic_speed = self.env.dynamic_speed;
        *self = VecSimulation::new(self.num_vehicles, self.seed, dynamic_speed)?;
        Ok(())
    }
}

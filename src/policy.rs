// Copyright 2026 Hypermesh Foundation. All rights reserved.
// VEC Simulation Suite - Decision Policies

//! Decision policies consumed by the slot loop.
//!
//! Every policy is a plain implementation of [`Policy`]; the loop neither
//! knows nor cares whether the decision comes from a local heuristic or a
//! remote service. Implementations provided here:
//!
//! - [`RandomPolicy`]: uniform random offloading around one half.
//! - [`GreedyPolicy`]: offload heavily from the vehicle with the best channel.
//! - [`HeuristicOrchestrator`]: channel- and queue-aware decisions shaped by
//!   the semantic goal, optionally using forecasts.
//! - [`RemotePolicy`]: delegates to a [`DecisionService`] and guards its
//!   responses.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::action::Action;
use crate::types::{Forecast, Snapshot};

// ─── Semantic Goal ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemanticGoal {
    #[default]
    Balance,
    SaveEnergy,
    LowLatency,
}

impl SemanticGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Balance => "BALANCE",
            Self::SaveEnergy => "SAVE_ENERGY",
            Self::LowLatency => "LOW_LATENCY",
        }
    }
}

// ─── Policy Trait ────────────────────────────────────────────────────────────

pub trait Policy {
    /// Decide the offloading and allocation ratios for the coming slot.
    /// The returned action must carry one entry per vehicle in `state`.
    fn act(&mut self, state: &Snapshot, forecast: Option<&Forecast>, goal: SemanticGoal) -> Action;

    fn name(&self) -> &str;

    /// Whether the loop should compute a forecast before calling `act`.
    fn uses_forecast(&self) -> bool {
        false
    }
}

// ─── Random ──────────────────────────────────────────────────────────────────

/// Offloading ratios drawn from `U(0.3, 0.7)`, allocation drawn uniformly
/// and normalised to sum to one.
pub struct RandomPolicy {
    rng: ChaCha8Rng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }
}

impl Policy for RandomPolicy {
    fn act(&mut self, state: &Snapshot, _forecast: Option<&Forecast>, _goal: SemanticGoal) -> Action {
        let n = state.num_vehicles();
        let w = (0..n).map(|_| self.rng.gen_range(0.3..0.7)).collect();
        let raw: Vec<f64> = (0..n).map(|_| self.rng.gen::<f64>()).collect();
        let total: f64 = raw.iter().sum();
        let a = if total > 0.0 {
            raw.iter().map(|r| r / total).collect()
        } else {
            vec![1.0 / n.max(1) as f64; n]
        };
        Action::new(w, a)
    }

    fn name(&self) -> &str {
        "random"
    }
}

// ─── Greedy ──────────────────────────────────────────────────────────────────

/// Offload 90 % of the work of the vehicle with the strongest channel and
/// 10 % everywhere else; split the server evenly.
#[derive(Debug, Default)]
pub struct GreedyPolicy;

impl Policy for GreedyPolicy {
    fn act(&mut self, state: &Snapshot, _forecast: Option<&Forecast>, _goal: SemanticGoal) -> Action {
        let n = state.num_vehicles();
        if n == 0 {
            return Action::new(Vec::new(), Vec::new());
        }
        let mut w = vec![0.1; n];
        // First maximum wins on ties
        let best = state.vehicles.iter()
            .enumerate()
            .fold(0, |best, (i, v)| {
                if v.channel_gain > state.vehicles[best].channel_gain { i } else { best }
            });
        w[best] = 0.9;
        Action::new(w, vec![1.0 / n as f64; n])
    }

    fn name(&self) -> &str {
        "greedy"
    }
}

// ─── Heuristic Orchestrator ──────────────────────────────────────────────────

/// Share of allocation steered by forecast load in proactive mode.
const FORECAST_BLEND: f64 = 0.5;

/// Channel- and backlog-aware orchestrator.
///
/// Vehicles with an above-average channel offload most of their work; server
/// capacity follows queue backlog. The semantic goal then scales decisions:
/// `SaveEnergy` keeps work and capacity low, `LowLatency` pushes both up.
///
/// A proactive orchestrator asks for forecasts and shifts part of the
/// allocation toward vehicles expected to carry more load. A reactive one
/// ignores forecasts and the caller's goal, always balancing.
pub struct HeuristicOrchestrator {
    proactive: bool,
    rng: ChaCha8Rng,
}

impl HeuristicOrchestrator {
    pub fn proactive(seed: u64) -> Self {
        Self { proactive: true, rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    pub fn reactive(seed: u64) -> Self {
        Self { proactive: false, rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    fn offloading(&mut self, state: &Snapshot) -> Vec<f64> {
        let n = state.num_vehicles();
        let avg_gain = if n > 0 {
            state.vehicles.iter().map(|v| v.channel_gain).sum::<f64>() / n as f64
        } else {
            0.0
        };
        state.vehicles.iter()
            .map(|v| {
                if v.channel_gain > avg_gain {
                    self.rng.gen_range(0.6..0.9)
                } else {
                    self.rng.gen_range(0.1..0.4)
                }
            })
            .collect()
    }
}

/// Allocation proportional to queue backlog, or equal shares when idle.
fn backlog_allocation(state: &Snapshot) -> Vec<f64> {
    let n = state.num_vehicles();
    let total = state.total_queued();
    if total > 0 {
        state.server_queue_lengths.iter().map(|&q| q as f64 / total as f64).collect()
    } else {
        vec![1.0 / n.max(1) as f64; n]
    }
}

/// Blend `a` toward each vehicle's share of mean predicted load.
fn blend_with_forecast(a: &mut [f64], forecast: &Forecast) {
    if forecast.is_empty() {
        return;
    }
    let mut predicted = vec![0.0; a.len()];
    for step in forecast {
        for v in &step.vehicles {
            if let Some(slot) = predicted.get_mut(v.id as usize) {
                *slot += v.predicted_task_load_bytes / forecast.len() as f64;
            }
        }
    }
    let total: f64 = predicted.iter().sum();
    if total <= 0.0 {
        return;
    }
    for (share, load) in a.iter_mut().zip(&predicted) {
        *share = (1.0 - FORECAST_BLEND) * *share + FORECAST_BLEND * load / total;
    }
}

fn apply_goal(w: &mut [f64], a: &mut [f64], goal: SemanticGoal) {
    match goal {
        SemanticGoal::Balance => {}
        SemanticGoal::SaveEnergy => {
            w.iter_mut().for_each(|r| *r *= 0.3);
            a.iter_mut().for_each(|r| *r *= 0.3);
        }
        SemanticGoal::LowLatency => {
            w.iter_mut().for_each(|r| *r = (*r * 1.5).min(1.0));
            a.iter_mut().for_each(|r| *r = (*r * 1.5).min(1.0));
            let total: f64 = a.iter().sum();
            if total > 0.0 {
                a.iter_mut().for_each(|r| *r /= total);
            }
        }
    }
}

impl Policy for HeuristicOrchestrator {
    fn act(&mut self, state: &Snapshot, forecast: Option<&Forecast>, goal: SemanticGoal) -> Action {
        let mut w = self.offloading(state);
        let mut a = backlog_allocation(state);

        if self.proactive {
            if let Some(forecast) = forecast {
                blend_with_forecast(&mut a, forecast);
            }
        }

        let goal = if self.proactive { goal } else { SemanticGoal::Balance };
        apply_goal(&mut w, &mut a, goal);
        Action::new(w, a)
    }

    fn name(&self) -> &str {
        if self.proactive { "proactive" } else { "reactive" }
    }

    fn uses_forecast(&self) -> bool {
        self.proactive
    }
}

// ─── Remote Decision Service ─────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("decision service unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode decision request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Payload handed to a remote decision service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub goal: SemanticGoal,
    pub state: Snapshot,
    pub forecast: Option<Forecast>,
}

impl DecisionRequest {
    pub fn to_json(&self) -> Result<String, ServiceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A blocking remote decision backend. Returns the raw response body,
/// expected to be `{"w": [...], "a": [...]}`.
pub trait DecisionService {
    fn decide(&mut self, request: &DecisionRequest) -> Result<String, ServiceError>;
}

impl<F> DecisionService for F
where
    F: FnMut(&DecisionRequest) -> Result<String, ServiceError>,
{
    fn decide(&mut self, request: &DecisionRequest) -> Result<String, ServiceError> {
        self(request)
    }
}

/// Policy backed by a [`DecisionService`]. Transport failures and malformed
/// responses never reach the loop: they are logged and replaced by
/// [`Action::fallback`].
pub struct RemotePolicy<S> {
    service: S,
    use_forecast: bool,
    fallbacks: u64,
}

impl<S: DecisionService> RemotePolicy<S> {
    pub fn new(service: S, use_forecast: bool) -> Self {
        Self { service, use_forecast, fallbacks: 0 }
    }

    /// Number of slots decided by the fallback action so far.
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks
    }
}

impl<S: DecisionService> Policy for RemotePolicy<S> {
    fn act(&mut self, state: &Snapshot, forecast: Option<&Forecast>, goal: SemanticGoal) -> Action {
        let n = state.num_vehicles();
        let request = DecisionRequest {
            goal,
            state: state.clone(),
            forecast: if self.use_forecast { forecast.cloned() } else { None },
        };
        let decided = self.service
            .decide(&request)
            .map_err(|e| e.to_string())
            .and_then(|body| Action::from_response(&body, n).map_err(|e| e.to_string()));

        match decided {
            Ok(action) => action,
            Err(reason) => {
                self.fallbacks += 1;
                warn!(slot = state.time_slot, %reason, "decision service failed, using default action");
                Action::fallback(n)
            }
        }
    }

    fn name(&self) -> &str {
        "remote"
    }

    fn uses_forecast(&self) -> bool {
        self.use_forecast
    }
}

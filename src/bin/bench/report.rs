// Benchmark Report Types
// Structured output for independent analysis of policy comparisons

use serde::Serialize;

// ─── Statistics (per-metric Monte Carlo aggregation) ────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub std_dev: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl Stats {
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self { mean: 0.0, std_dev: 0.0, ci_lower: 0.0, ci_upper: 0.0, min: 0.0, max: 0.0, n: 0 };
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let std_dev = variance.sqrt();
        let stderr = std_dev / (n as f64).sqrt();
        let z = 1.96; // 95% CI
        Self {
            mean,
            std_dev,
            ci_lower: mean - z * stderr,
            ci_upper: mean + z * stderr,
            min: samples.iter().cloned().fold(f64::INFINITY, f64::min),
            max: samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            n,
        }
    }

    pub fn half_width(&self) -> f64 {
        (self.ci_upper - self.ci_lower) / 2.0
    }
}

// ─── Single-Run Result ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub scenario: String,
    pub agent: String,
    pub phase: usize,
    pub goal: &'static str,
    pub seed: u64,
    pub num_vehicles: usize,
    pub slots: u64,
    pub tasks_generated: u64,
    pub completed_tasks: usize,
    pub local_completions: usize,
    pub server_completions: usize,
    pub queued_at_end: usize,
    pub avg_latency_ms: f64,
    pub qos_violation_rate: f64,
    pub peak_violation_rate: f64,
    pub peak_backlog: usize,
    pub total_energy_j: f64,
    /// completed + queued == generated and the energy ledger balances.
    pub invariants_hold: bool,
    pub elapsed_ms: u128,
}

// ─── Aggregation per (agent, phase) ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub agent: String,
    pub phase: usize,
    pub goal: &'static str,
    pub n_runs: usize,
    pub avg_latency_ms: Stats,
    pub qos_violation_rate: Stats,
    pub peak_violation_rate: Stats,
    pub total_energy_j: Stats,
    pub completed_tasks: Stats,
    pub peak_backlog: Stats,
    pub elapsed_ms: Stats,
    pub invariant_failures: usize,
    pub individual_runs: Vec<RunResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario_name: String,
    pub label: String,
    pub category: String,
    pub num_vehicles: usize,
    pub dynamic_speed: bool,
    pub agents: Vec<AgentReport>,
}

impl ScenarioReport {
    pub fn invariant_failures(&self) -> usize {
        self.agents.iter().map(|a| a.invariant_failures).sum()
    }
}

// ─── Top-Level Report ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub timestamp: String,
    pub version: &'static str,
    pub prng: &'static str,
    pub n_runs_per_scenario: usize,
    pub base_seed: u64,
    pub params: vec_engine::Params,
    pub summary: Summary,
    pub scenarios: Vec<ScenarioReport>,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub scenarios: usize,
    pub runs: usize,
    pub invariant_failures: usize,
}

// Monte Carlo Infrastructure: N runs per (scenario, agent, phase)
// Run i uses base seed + i; environment, forecaster and policy draw from
// separate streams derived from it, mean ± 95% CI per metric

use anyhow::Context;
use tracing::{debug, warn};
use vec_engine::*;

use crate::report::*;
use crate::scenarios::{Agent, Scenario};
use crate::metrics::{BacklogTracker, PeakViolationTracker};
use crate::time_series::TimeSeriesRecorder;

use std::time::Instant;

const TWIN_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;
const POLICY_STREAM: u64 = 0xC2B2_AE3D_27D4_EB4F;

/// Per-phase seed so consecutive phases never replay the same traffic.
fn phase_seed(seed: u64, phase: usize) -> u64 {
    seed.wrapping_add((phase as u64).wrapping_mul(1_000_003))
}

/// Run a single (agent, phase) iteration with a specific seed.
pub fn run_single(
    scenario: &Scenario,
    agent: Agent,
    phase: usize,
    params: &Params,
    seed: u64,
    time_series_dir: Option<&std::path::Path>,
) -> anyhow::Result<RunResult> {
    let start = Instant::now();
    let plan = &scenario.phases[phase];
    let goal = (plan.goal_for)(agent);
    let env_seed = phase_seed(seed, phase);

    let mut env = Environment::new(params.clone(), scenario.num_vehicles, env_seed)
        .with_context(|| format!("building {} environment", scenario.name))?;
    env.set_dynamic_speed(scenario.dynamic_speed);
    let mut twin = DigitalTwin::for_environment(&env, env_seed ^ TWIN_STREAM);
    let mut policy = agent.build(env_seed ^ POLICY_STREAM);

    let mut peak = PeakViolationTracker::new();
    let mut backlog = BacklogTracker::new();
    let mut time_series = time_series_dir.map(|_| TimeSeriesRecorder::new());

    run_episode(&mut env, &mut twin, policy.as_mut(), goal, plan.slots, |env| {
        peak.record_slot(env);
        backlog.record_slot(env);
        if let Some(ts) = time_series.as_mut() {
            ts.record(env);
        }
    })
    .with_context(|| format!("{} produced an invalid action (seed {})", agent.label(), seed))?;

    if let (Some(ts), Some(dir)) = (&time_series, time_series_dir) {
        let path = dir.join(format!("{}-phase{}-seed-{}.jsonl", agent.label(), phase + 1, seed));
        if let Err(e) = ts.write_jsonl(&path) {
            warn!(path = %path.display(), error = %e, "failed to write time series");
        }
    }

    let stats = env.stats();
    let invariants_hold = check_invariants(&env);
    if !invariants_hold {
        warn!(scenario = %scenario.name, agent = agent.label(), seed, "run violated accounting invariants");
    }
    debug!(
        scenario = %scenario.name,
        agent = agent.label(),
        phase = phase + 1,
        seed,
        completed = stats.completed_tasks,
        violation_rate = stats.qos_violation_rate,
        "run finished"
    );

    Ok(RunResult {
        scenario: scenario.name.clone(),
        agent: agent.label().to_string(),
        phase: phase + 1,
        goal: goal.as_str(),
        seed,
        num_vehicles: scenario.num_vehicles,
        slots: plan.slots,
        tasks_generated: stats.tasks_generated,
        completed_tasks: stats.completed_tasks,
        local_completions: stats.local_completions,
        server_completions: stats.server_completions,
        queued_at_end: stats.queued_tasks,
        avg_latency_ms: stats.avg_latency_ms,
        qos_violation_rate: stats.qos_violation_rate,
        peak_violation_rate: peak.peak_rate,
        peak_backlog: backlog.peak,
        total_energy_j: stats.total_energy_j,
        invariants_hold,
        elapsed_ms: start.elapsed().as_millis(),
    })
}

/// Task conservation plus the energy ledger: every generated task is either
/// completed or queued, and total energy equals per-task energy plus the
/// transmission energy of tasks still waiting.
fn check_invariants(env: &Environment) -> bool {
    let stats = env.stats();
    let conserved = stats.completed_tasks + stats.queued_tasks == stats.tasks_generated as usize;

    let ledger: f64 = env.metrics().completed_tasks().iter()
        .map(Task::total_energy_j)
        .sum::<f64>()
        + env.outstanding_transmission_energy();
    let total = env.metrics().total_energy_j();
    let balanced = (ledger - total).abs() <= 1e-9 * total.max(1e-30);

    conserved && balanced
}

/// Run Monte Carlo: N runs of every (agent, phase) pair, aggregate stats.
pub fn run_monte_carlo(
    scenario: &Scenario,
    params: &Params,
    n_runs: usize,
    base_seed: u64,
    time_series_base: Option<&std::path::Path>,
) -> anyhow::Result<ScenarioReport> {
    let ts_dir = time_series_base.map(|base| base.join(scenario.name.to_lowercase()));

    let mut agents = Vec::new();
    for phase in 0..scenario.phases.len() {
        for &agent in &scenario.agents {
            let mut results = Vec::with_capacity(n_runs);
            for i in 0..n_runs {
                let seed = base_seed + i as u64;
                results.push(run_single(scenario, agent, phase, params, seed, ts_dir.as_deref())?);
            }
            agents.push(aggregate(agent, phase, (scenario.phases[phase].goal_for)(agent), results));
        }
    }

    Ok(ScenarioReport {
        scenario_name: scenario.name.clone(),
        label: scenario.label.clone(),
        category: scenario.category.to_string(),
        num_vehicles: scenario.num_vehicles,
        dynamic_speed: scenario.dynamic_speed,
        agents,
    })
}

fn sample<F: Fn(&RunResult) -> f64>(results: &[RunResult], f: F) -> Stats {
    Stats::from_samples(&results.iter().map(f).collect::<Vec<_>>())
}

/// Aggregate individual runs into an AgentReport.
fn aggregate(agent: Agent, phase: usize, goal: SemanticGoal, results: Vec<RunResult>) -> AgentReport {
    AgentReport {
        agent: agent.label().to_string(),
        phase: phase + 1,
        goal: goal.as_str(),
        n_runs: results.len(),
        avg_latency_ms: sample(&results, |r| r.avg_latency_ms),
        qos_violation_rate: sample(&results, |r| r.qos_violation_rate),
        peak_violation_rate: sample(&results, |r| r.peak_violation_rate),
        total_energy_j: sample(&results, |r| r.total_energy_j),
        completed_tasks: sample(&results, |r| r.completed_tasks as f64),
        peak_backlog: sample(&results, |r| r.peak_backlog as f64),
        elapsed_ms: sample(&results, |r| r.elapsed_ms as f64),
        invariant_failures: results.iter().filter(|r| !r.invariants_hold).count(),
        individual_runs: results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::scenarios;

    #[test]
    fn test_monte_carlo_is_reproducible() {
        let params = Params::default();
        let all = scenarios(&params, 20);
        let scenario = &all[0];
        let a = run_monte_carlo(scenario, &params, 3, 11, None).expect("valid actions");
        let b = run_monte_carlo(scenario, &params, 3, 11, None).expect("valid actions");
        assert_eq!(a.agents.len(), scenario.agents.len());
        for (x, y) in a.agents.iter().zip(&b.agents) {
            assert_eq!(x.n_runs, 3);
            assert_eq!(x.avg_latency_ms.mean, y.avg_latency_ms.mean);
            assert_eq!(x.total_energy_j.mean, y.total_energy_j.mean);
            assert_eq!(x.invariant_failures, 0);
        }
    }

    #[test]
    fn test_phases_reported_separately() {
        let params = Params::default();
        let all = scenarios(&params, 20);
        let adaptation = all.iter().find(|s| s.category == "adaptation").expect("present");
        let report = run_monte_carlo(adaptation, &params, 2, 0, None).expect("valid actions");
        assert_eq!(report.agents.len(), adaptation.agents.len() * 2);
        let proactive_phase2 = report.agents.iter()
            .find(|a| a.agent == "proactive" && a.phase == 2)
            .expect("present");
        assert_eq!(proactive_phase2.goal, "SAVE_ENERGY");
        assert!(proactive_phase2.individual_runs.iter().all(|r| r.slots == 10));
    }

    #[test]
    fn test_invalid_params_error_instead_of_panicking() {
        let params = Params { task_size_bytes: (1500.0, 1000.0), ..Params::default() };
        let all = scenarios(&Params::default(), 5);
        let err = run_monte_carlo(&all[0], &params, 1, 0, None).expect_err("inverted range");
        assert!(format!("{:#}", err).contains("task_size_bytes"));
    }
}

// VEC Benchmark Runner v1.0.0: Policy Comparison Studies
// Monte Carlo (N=10), seedable ChaCha8 streams, optional per-slot audit trail
//
// Usage:
//   cargo run --release --bin bench                       # All studies (10 runs each)
//   cargo run --release --bin bench -- --runs 3           # Quick mode
//   cargo run --release --bin bench -- dynamic            # Filter by name/category
//   cargo run --release --bin bench -- --time-series      # Enable JSONL output
//   cargo run --release --bin bench -- --params p.json    # Override parameters
//   cargo run --release --bin bench -- --seed 42 --slots 200

mod report;
mod scenarios;
mod monte_carlo;
mod metrics;
mod time_series;

use anyhow::{bail, Context};
use clap::Parser;
use report::*;
use scenarios::*;
use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vec_engine::Params;

// ─── CLI Parsing ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "bench", about = "Monte Carlo comparison of VEC offloading policies")]
struct Cli {
    /// Runs per (scenario, agent, phase)
    #[arg(long, default_value_t = 10)]
    runs: usize,

    /// Base seed; run i uses seed + i
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Slots per study (defaults to simulation_time_slots)
    #[arg(long)]
    slots: Option<u64>,

    /// JSON parameter file; missing fields keep their defaults
    #[arg(long)]
    params: Option<PathBuf>,

    /// Write per-run JSONL slot series under <output-dir>/time-series
    #[arg(long)]
    time_series: bool,

    #[arg(long, default_value = "benchmark-results")]
    output_dir: PathBuf,

    /// Substring matched against scenario name, label and category
    filter: Option<String>,
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vec_engine=info,bench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let params = match &cli.params {
        Some(path) => Params::from_file(path)
            .with_context(|| format!("loading parameters from {}", path.display()))?,
        None => Params::default(),
    };
    params.validate().context("invalid parameter set")?;
    let slots = cli.slots.unwrap_or(params.simulation_time_slots);
    if cli.runs == 0 || slots == 0 {
        bail!("--runs and --slots must be positive");
    }

    let all_scenarios = scenarios(&params, slots);
    let to_run: Vec<&Scenario> = match &cli.filter {
        Some(f) => {
            let f_lower = f.to_lowercase();
            all_scenarios.iter()
                .filter(|s| s.name.to_lowercase().contains(&f_lower)
                          || s.label.to_lowercase().contains(&f_lower)
                          || s.category.contains(&f_lower))
                .collect()
        }
        None => all_scenarios.iter().collect(),
    };
    if to_run.is_empty() {
        bail!("no scenarios match filter {:?}", cli.filter);
    }

    let ts_dir = cli.time_series.then(|| cli.output_dir.join("time-series"));

    info!(runs = cli.runs, seed = cli.seed, slots, scenarios = to_run.len(), "starting benchmark");
    println!("\n  VEC Benchmark Runner v1.0.0");
    println!("  PRNG: ChaCha8Rng | Runs: {} | Base seed: {} | Slots: {}", cli.runs, cli.seed, slots);
    println!("  Running {} scenario(s)...\n", to_run.len());
    println!("  {:<26} {:<10} {:>2} {:<12} {:>14} {:>14} {:>9} {:>12}",
        "Scenario", "Agent", "Ph", "Goal", "Latency(ms)", "Violation%", "Peak%", "Energy(J)");
    println!("  {}", "-".repeat(106));

    let suite_start = Instant::now();
    let mut reports = Vec::new();

    for scenario in &to_run {
        let report = monte_carlo::run_monte_carlo(
            scenario,
            &params,
            cli.runs,
            cli.seed,
            ts_dir.as_deref(),
        )
        .with_context(|| format!("running scenario {}", scenario.name))?;

        for agent in &report.agents {
            let peak = if scenario.category == "dynamic" {
                format!("{:>8.1}%", agent.peak_violation_rate.mean)
            } else {
                format!("{:>9}", "-")
            };
            println!("  {:<26} {:<10} {:>2} {:<12} {:>8.1}±{:<5.1} {:>8.2}±{:<5.2} {} {:>12.3e}",
                report.label,
                agent.agent,
                agent.phase,
                agent.goal,
                agent.avg_latency_ms.mean, agent.avg_latency_ms.half_width(),
                agent.qos_violation_rate.mean, agent.qos_violation_rate.half_width(),
                peak,
                agent.total_energy_j.mean,
            );
        }

        reports.push(report);
    }

    // ─── Summary ────────────────────────────────────────────────────────

    let invariant_failures: usize = reports.iter().map(ScenarioReport::invariant_failures).sum();
    let runs: usize = reports.iter()
        .flat_map(|r| r.agents.iter())
        .map(|a| a.n_runs)
        .sum();

    println!("  {}", "-".repeat(106));
    println!("  Scenarios: {}  Runs: {}  Invariant failures: {}  Suite time: {:.1}s\n",
        reports.len(), runs, invariant_failures, suite_start.elapsed().as_secs_f64());

    // ─── Write JSON Report ──────────────────────────────────────────────

    let ts = SystemTime::now().duration_since(UNIX_EPOCH)
        .context("system clock before UNIX epoch")?
        .as_millis();
    let timestamp = ts.to_string();

    let report = BenchReport {
        timestamp: timestamp.clone(),
        version: "1.0.0",
        prng: "ChaCha8Rng",
        n_runs_per_scenario: cli.runs,
        base_seed: cli.seed,
        params,
        summary: Summary {
            scenarios: reports.len(),
            runs,
            invariant_failures,
        },
        scenarios: reports,
    };

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating {}", cli.output_dir.display()))?;
    let path = cli.output_dir.join(format!("vec-bench-{}.json", timestamp));
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    println!("  Results saved to: {}\n", path.display());
    info!(path = %path.display(), "benchmark report written");

    if invariant_failures > 0 {
        bail!("{} run(s) violated accounting invariants", invariant_failures);
    }
    Ok(())
}

// Scenario Definitions: scalability, dynamic mobility, goal adaptation
// Each phase runs on a fresh environment; goals are chosen per agent and phase

use vec_engine::{GreedyPolicy, HeuristicOrchestrator, Params, Policy, RandomPolicy, SemanticGoal};

// ─── Agents ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agent {
    /// Forecast-aware orchestrator that follows the requested goal.
    Proactive,
    /// Orchestrator without forecasts, always balancing.
    Reactive,
    Random,
    Greedy,
}

impl Agent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Proactive => "proactive",
            Self::Reactive => "reactive",
            Self::Random => "random",
            Self::Greedy => "greedy",
        }
    }

    pub fn build(&self, seed: u64) -> Box<dyn Policy> {
        match self {
            Self::Proactive => Box::new(HeuristicOrchestrator::proactive(seed)),
            Self::Reactive => Box::new(HeuristicOrchestrator::reactive(seed)),
            Self::Random => Box::new(RandomPolicy::new(seed)),
            Self::Greedy => Box::new(GreedyPolicy),
        }
    }
}

const ALL_AGENTS: [Agent; 4] = [Agent::Proactive, Agent::Reactive, Agent::Random, Agent::Greedy];

// ─── Scenario Configuration ─────────────────────────────────────────────────

pub struct Phase {
    pub slots: u64,
    pub goal_for: fn(Agent) -> SemanticGoal,
}

pub struct Scenario {
    pub name: String,
    pub label: String,
    pub category: &'static str,
    pub num_vehicles: usize,
    pub dynamic_speed: bool,
    pub agents: Vec<Agent>,
    pub phases: Vec<Phase>,
}

fn always_balance(_agent: Agent) -> SemanticGoal {
    SemanticGoal::Balance
}

/// Only the proactive orchestrator adapts to the new operator goal.
fn save_energy_if_adaptive(agent: Agent) -> SemanticGoal {
    if agent == Agent::Proactive {
        SemanticGoal::SaveEnergy
    } else {
        SemanticGoal::Balance
    }
}

// ─── Scenario Definitions ───────────────────────────────────────────────────

pub fn scenarios(params: &Params, slots: u64) -> Vec<Scenario> {
    let mut all: Vec<Scenario> = params.num_vehicles_options.iter()
        .map(|&n| Scenario {
            name: format!("SCALABILITY_N{}", n),
            label: format!("Scalability N={}", n),
            category: "scalability",
            num_vehicles: n,
            dynamic_speed: false,
            agents: ALL_AGENTS.to_vec(),
            phases: vec![Phase { slots, goal_for: always_balance }],
        })
        .collect();

    all.push(Scenario {
        name: "DYNAMIC_N20".to_string(),
        label: "Dynamic Speeds N=20".to_string(),
        category: "dynamic",
        num_vehicles: 20,
        dynamic_speed: true,
        agents: vec![Agent::Proactive, Agent::Reactive],
        phases: vec![Phase { slots, goal_for: always_balance }],
    });

    let half = (slots / 2).max(1);
    all.push(Scenario {
        name: "GOAL_ADAPTATION_N20".to_string(),
        label: "Goal Adaptation N=20".to_string(),
        category: "adaptation",
        num_vehicles: 20,
        dynamic_speed: false,
        agents: vec![Agent::Proactive, Agent::Reactive, Agent::Random],
        phases: vec![
            Phase { slots: half, goal_for: always_balance },
            Phase { slots: half, goal_for: save_energy_if_adaptive },
        ],
    });

    all
}

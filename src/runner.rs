// Copyright 2026 Hypermesh Foundation. All rights reserved.
// VEC Simulation Suite - Slot Loop

use crate::action::ActionError;
use crate::policy::{Policy, SemanticGoal};
use crate::simulation::Environment;
use crate::twin::DigitalTwin;

/// Drive `env` for `slots` slots: observe, forecast if the policy wants it,
/// decide, step. `observer` sees the environment after every step.
///
/// The policy call is synchronous; a slow policy stalls the loop.
pub fn run_episode<P, F>(
    env: &mut Environment,
    twin: &mut DigitalTwin,
    policy: &mut P,
    goal: SemanticGoal,
    slots: u64,
    mut observer: F,
) -> Result<(), ActionError>
where
    P: Policy + ?Sized,
    F: FnMut(&Environment),
{
    for _ in 0..slots {
        let state = env.get_state();
        let forecast = policy.uses_forecast().then(|| twin.forecast_from(&state));
        let action = policy.act(&state, forecast.as_ref(), goal);
        env.step(&action)?;
        observer(env);
    }
    Ok(())
}

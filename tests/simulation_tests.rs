#[cfg(test)]
mod tests {
    use vec_engine::*;

    fn env(n: usize, seed: u64) -> Environment {
        Environment::new(Params::default(), n, seed).expect("valid params")
    }

    fn uniform(n: usize, w: f64) -> Action {
        Action::new(vec![w; n], vec![1.0 / n as f64; n])
    }

    // ========== Mobility ==========

    #[test]
    fn test_positions_stay_on_road() {
        let mut sim = env(30, 1);
        sim.set_dynamic_speed(true);
        for _ in 0..500 {
            let state = sim.step(&uniform(30, 0.5)).expect("valid action");
            for v in &state.vehicles {
                assert!(
                    v.position_m >= 0.0 && v.position_m < 2000.0,
                    "vehicle {} off road at {}",
                    v.id,
                    v.position_m
                );
            }
        }
    }

    // ========== Dispatch ==========

    #[test]
    fn test_no_offload_processes_everything_locally() {
        let mut sim = env(3, 42);
        let state = sim.step(&uniform(3, 0.0)).expect("valid action");

        let generated = sim.tasks_generated() as usize;
        let completed = sim.metrics().completed_tasks();
        assert_eq!(completed.len(), generated);
        for t in completed {
            assert_eq!(t.site, Some(ProcessingSite::Local));
            let done = t.completed_at.expect("completed");
            assert!(done >= t.created_at);
            assert_eq!(t.created_at, 0.0);
        }
        assert_eq!(state.server_queue_lengths, vec![0, 0, 0]);
        assert_eq!(state.time_slot, 1);
    }

    #[test]
    fn test_full_offload_queues_every_task() {
        let mut sim = env(4, 9);
        // No server capacity: offloaded tasks must stay queued
        let action = Action::new(vec![1.0; 4], vec![0.0; 4]);
        for _ in 0..5 {
            sim.step(&action).expect("valid action");
        }
        assert!(sim.metrics().completed_tasks().is_empty());
        assert_eq!(sim.queued_tasks() as u64, sim.tasks_generated());
        assert!(sim.metrics().total_energy_j() > 0.0, "transmission energy must be charged");
    }

    #[test]
    fn test_snapshot_reports_no_pending_load_after_step() {
        let mut sim = env(10, 4);
        let state = sim.step(&uniform(10, 0.5)).expect("valid action");
        assert!(state.vehicles.iter().all(|v| v.task_load_bytes == 0.0));
        assert!(state.vehicles.iter().all(|v| v.channel_gain > 0.0 && v.channel_gain <= 1.0));
    }

    #[test]
    fn test_channel_gain_bounded_for_every_snapshot() {
        for seed in 0..40 {
            let mut sim = env(20, seed);
            sim.set_dynamic_speed(true);
            for _ in 0..100 {
                let state = sim.step(&Action::fallback(20)).expect("valid action");
                for v in &state.vehicles {
                    assert!(
                        v.channel_gain > 0.0 && v.channel_gain <= 1.0,
                        "seed {} vehicle {} at {} has gain {}",
                        seed,
                        v.id,
                        v.position_m,
                        v.channel_gain
                    );
                }
            }
        }
    }

    #[test]
    fn test_invalid_params_rejected_at_construction() {
        let params = Params { task_size_bytes: (1500.0, 1000.0), ..Params::default() };
        let err = Environment::new(params, 3, 1).expect_err("inverted size range");
        assert!(matches!(err, ConfigError::InvertedRange { name: "task_size_bytes", .. }));
    }

    // ========== Allocation ==========

    #[test]
    fn test_over_committed_allocation_is_rescaled() {
        let mut sim = env(2, 3);
        sim.step(&Action::new(vec![0.5, 0.5], vec![0.7, 0.5])).expect("valid action");
        let used = sim.effective_allocation();
        assert!((used[0] - 0.7 / 1.2).abs() < 1e-12);
        assert!((used[1] - 0.5 / 1.2).abs() < 1e-12);
        assert!((used[0] - 0.583).abs() < 1e-3);
        assert!((used[1] - 0.417).abs() < 1e-3);
        assert!((used.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_under_committed_allocation_is_untouched() {
        let mut sim = env(3, 3);
        let a = vec![0.2, 0.3, 0.1];
        sim.step(&Action::new(vec![0.5; 3], a.clone())).expect("valid action");
        assert_eq!(sim.effective_allocation(), a.as_slice());
    }

    // ========== Exactly-once processing ==========

    #[test]
    fn test_every_task_completes_exactly_once() {
        let mut sim = env(10, 21);
        let action = uniform(10, 0.6);
        for _ in 0..100 {
            sim.step(&action).expect("valid action");
        }
        // Generation stops contributing once we only drain
        let mut drained = 0;
        while sim.queued_tasks() > 0 && drained < 1000 {
            let before = sim.queued_tasks();
            sim.step(&Action::new(vec![0.0; 10], vec![0.1; 10])).expect("valid action");
            assert!(sim.queued_tasks() <= before);
            drained += 1;
        }
        assert_eq!(sim.queued_tasks(), 0);

        let completed = sim.metrics().completed_tasks();
        assert_eq!(completed.len() as u64, sim.tasks_generated());
        let mut ids: Vec<u64> = completed.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), completed.len(), "a task was completed twice");
        assert!(completed.iter().all(|t| t.completed_at.is_some()));
    }

    #[test]
    fn test_server_queues_drain_fifo() {
        let mut sim = env(1, 8);
        // Fill the queue without serving it
        for _ in 0..20 {
            sim.step(&Action::new(vec![1.0], vec![0.0])).expect("valid action");
        }
        let queued: Vec<u64> = sim.server_queue(0).expect("queue").iter().map(|t| t.id).collect();
        assert!(!queued.is_empty());
        while sim.queued_tasks() > 0 {
            sim.step(&Action::new(vec![0.0], vec![1.0])).expect("valid action");
        }
        let served: Vec<u64> = sim.metrics().completed_tasks().iter()
            .filter(|t| t.site == Some(ProcessingSite::Server))
            .map(|t| t.id)
            .collect();
        assert_eq!(served, queued);
    }

    // ========== Energy accounting ==========

    #[test]
    fn test_energy_monotone_and_matches_task_ledger() {
        let mut sim = env(15, 12);
        let mut policy = RandomPolicy::new(5);
        let mut last = 0.0;
        for _ in 0..60 {
            let state = sim.get_state();
            let action = policy.act(&state, None, SemanticGoal::Balance);
            sim.step(&action).expect("valid action");
            let total = sim.metrics().total_energy_j();
            assert!(total >= last, "energy decreased: {} -> {}", last, total);
            last = total;
        }
        let ledger: f64 = sim.metrics().completed_tasks().iter()
            .map(Task::total_energy_j)
            .sum::<f64>()
            + sim.outstanding_transmission_energy();
        let total = sim.metrics().total_energy_j();
        assert!(
            (ledger - total).abs() <= 1e-9 * total.max(1e-30),
            "ledger {} vs total {}",
            ledger,
            total
        );
    }

    // ========== Reproducibility ==========

    #[test]
    fn test_same_seed_same_violations() {
        let run = |seed: u64| {
            let mut sim = env(20, seed);
            let mut twin = DigitalTwin::for_environment(&sim, seed + 1);
            let mut policy = HeuristicOrchestrator::proactive(seed + 2);
            run_episode(&mut sim, &mut twin, &mut policy, SemanticGoal::Balance, 100, |_| {})
                .expect("valid actions");
            sim.metrics().summary(sim.params().deadline_s())
        };
        let a = run(17);
        let b = run(17);
        assert_eq!(a, b);
        assert!(a.completed_tasks > 0);
    }

    #[test]
    fn test_violation_definition_matches_summary() {
        let mut sim = env(20, 2);
        let mut twin = DigitalTwin::for_environment(&sim, 3);
        run_episode(&mut sim, &mut twin, &mut GreedyPolicy, SemanticGoal::Balance, 50, |_| {})
            .expect("valid actions");
        let deadline = sim.params().deadline_s();
        let manual = sim.metrics().completed_tasks().iter()
            .filter(|t| t.completed_at.unwrap_or(0.0) - t.created_at > deadline)
            .count();
        assert_eq!(sim.metrics().summary(deadline).violation_count, manual);
    }

    // ========== Forecaster ==========

    #[test]
    fn test_forecast_at_slot_ten() {
        let mut sim = env(6, 5);
        for _ in 0..10 {
            sim.step(&uniform(6, 0.5)).expect("valid action");
        }
        let mut twin = DigitalTwin::new(5, sim.params().road_length_m(), 99);
        let before = sim.get_state();
        let forecast = twin.forecast(&sim);
        assert_eq!(forecast.len(), 5);
        let slots: Vec<u64> = forecast.iter().map(|s| s.time_slot).collect();
        assert_eq!(slots, vec![11, 12, 13, 14, 15]);
        for step in &forecast {
            assert_eq!(step.vehicles.len(), 6);
            assert!(step.vehicles.iter().all(|v| v.predicted_task_load_bytes >= 0.0));
            assert!(step.vehicles.iter()
                .all(|v| v.predicted_position_m >= 0.0 && v.predicted_position_m < 2000.0));
        }
        // Forecasting is read-only
        assert_eq!(sim.get_state(), before);
    }

    // ========== Policies end to end ==========

    #[test]
    fn test_all_reference_policies_run_cleanly() {
        let mut policies: Vec<Box<dyn Policy>> = vec![
            Box::new(HeuristicOrchestrator::proactive(1)),
            Box::new(HeuristicOrchestrator::reactive(1)),
            Box::new(RandomPolicy::new(1)),
            Box::new(GreedyPolicy),
        ];
        for policy in policies.iter_mut() {
            let mut sim = env(10, 31);
            let mut twin = DigitalTwin::for_environment(&sim, 32);
            run_episode(&mut sim, &mut twin, policy.as_mut(), SemanticGoal::LowLatency, 40, |_| {})
                .unwrap_or_else(|e| panic!("{} produced an invalid action: {}", policy.name(), e));
            let stats = sim.stats();
            assert_eq!(stats.time_slot, 40);
            assert_eq!(
                stats.completed_tasks + stats.queued_tasks,
                stats.tasks_generated as usize,
                "{} lost tasks",
                policy.name()
            );
        }
    }

    #[test]
    fn test_save_energy_goal_spends_less_energy() {
        let energy = |goal: SemanticGoal| {
            let mut sim = env(20, 50);
            let mut twin = DigitalTwin::for_environment(&sim, 51);
            let mut policy = HeuristicOrchestrator::proactive(52);
            run_episode(&mut sim, &mut twin, &mut policy, goal, 50, |_| {}).expect("valid actions");
            sim.metrics().total_energy_j()
        };
        assert!(energy(SemanticGoal::SaveEnergy) < energy(SemanticGoal::Balance));
    }
}

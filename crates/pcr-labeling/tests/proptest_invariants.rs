// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use pcr_labeling::{
    AbsoluteDataCost, CostTerms, EngineConfig, ExpansionEngine, Scheduler, WeightedPottsCost,
};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

const MIN_PROPTEST_CASES: u32 = 64;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

fn build_engine(
    data: &[f64],
    weights: &[usize],
    levels: &[f64],
    lambda_d: f64,
    lambda_s: f64,
    scheduler: Scheduler,
    seed: u64,
) -> ExpansionEngine {
    let mut terms = CostTerms::new().with_data(
        AbsoluteDataCost::new(lambda_d, data, weights, levels).expect("inputs are valid"),
    );
    if lambda_s > 0.0 {
        terms = terms
            .with_smooth(WeightedPottsCost::new(lambda_s, weights).expect("inputs are valid"));
    }

    let config = EngineConfig {
        scheduler,
        seed,
        ..EngineConfig::default()
    };
    ExpansionEngine::new(data.len(), levels.len(), terms, config).expect("dimensions are valid")
}

fn run_expansion(
    data: &[f64],
    weights: &[usize],
    levels: &[f64],
    lambda_d: f64,
    lambda_s: f64,
    scheduler: Scheduler,
    seed: u64,
) -> (Vec<usize>, i64, Vec<i64>) {
    let mut engine = build_engine(data, weights, levels, lambda_d, lambda_s, scheduler, seed);
    engine.assign_initial_labels().expect("assignment succeeds");
    let energy = engine.expand().expect("expansion succeeds");
    let labels = engine.labels().expect("labels exist");

    let history = engine.energy_history();
    let totals: Vec<i64> = (0..history.len(pcr_core::EnergyTerm::Data))
        .map(|i| {
            history.series(pcr_core::EnergyTerm::Data)[i]
                + history.series(pcr_core::EnergyTerm::Smooth)[i]
                + history.series(pcr_core::EnergyTerm::Label)[i]
        })
        .collect();

    (labels, energy, totals)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        max_shrink_iters: 512,
        failure_persistence: Some(Box::new(FileFailurePersistence::Direct("proptest-regressions/tests/proptest_invariants.txt"))),
        .. ProptestConfig::default()
    })]

    #[test]
    fn labels_stay_inside_the_level_range(
        data in prop::collection::vec(-20.0f64..20.0, 1..12),
        weights in prop::collection::vec(1usize..6, 12),
        n_levels in 2usize..5,
        seed in 0u64..1024,
    ) {
        let weights = &weights[..data.len()];
        let levels: Vec<f64> = (0..n_levels).map(|i| -20.0 + 40.0 * i as f64 / (n_levels - 1) as f64).collect();

        let (labels, _, _) = run_expansion(
            &data, weights, &levels, 1.0, 0.5, Scheduler::Backtracking, seed,
        );

        prop_assert_eq!(labels.len(), data.len());
        for label in labels {
            prop_assert!(label < levels.len());
        }
    }

    #[test]
    fn recorded_energies_never_increase(
        data in prop::collection::vec(-20.0f64..20.0, 1..12),
        weights in prop::collection::vec(1usize..6, 12),
        seed in 0u64..1024,
    ) {
        let weights = &weights[..data.len()];
        let levels = [-20.0, -10.0, 0.0, 10.0, 20.0];

        let (_, _, totals) = run_expansion(
            &data, weights, &levels, 1.0, 1.0, Scheduler::Backtracking, seed,
        );

        for window in totals.windows(2) {
            prop_assert!(
                window[1] <= window[0],
                "energy increased from {} to {}",
                window[0],
                window[1]
            );
        }
    }

    #[test]
    fn final_energy_matches_an_independent_reevaluation(
        data in prop::collection::vec(-20.0f64..20.0, 1..12),
        weights in prop::collection::vec(1usize..6, 12),
        seed in 0u64..1024,
    ) {
        let weights = &weights[..data.len()];
        let levels = [-20.0, 0.0, 20.0];

        let mut engine = build_engine(
            &data, weights, &levels, 1.0, 1.0, Scheduler::Backtracking, seed,
        );
        engine.assign_initial_labels().expect("assignment succeeds");
        let energy = engine.expand().expect("expansion succeeds");

        prop_assert_eq!(energy, engine.current_energy().expect("evaluation succeeds"));
    }

    #[test]
    fn seeded_runs_are_deterministic(
        data in prop::collection::vec(-20.0f64..20.0, 1..10),
        weights in prop::collection::vec(1usize..6, 10),
        seed in 0u64..1024,
    ) {
        let weights = &weights[..data.len()];
        let levels = [-20.0, -5.0, 5.0, 20.0];

        let first = run_expansion(&data, weights, &levels, 1.0, 0.5, Scheduler::Backtracking, seed);
        let second = run_expansion(&data, weights, &levels, 1.0, 0.5, Scheduler::Backtracking, seed);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn sweep_and_backtracking_agree_without_smoothing(
        data in prop::collection::vec(-20.0f64..20.0, 1..10),
        weights in prop::collection::vec(1usize..6, 10),
        seed in 0u64..1024,
    ) {
        // With only a data term the optimum is separable, so both
        // schedulers must reach the same energy.
        let weights = &weights[..data.len()];
        let levels = [-20.0, -5.0, 5.0, 20.0];

        let (_, sweep_energy, _) = run_expansion(
            &data, weights, &levels, 1.0, 0.0,
            Scheduler::Sweep { max_iterations: 16 }, seed,
        );
        let (_, backtrack_energy, _) = run_expansion(
            &data, weights, &levels, 1.0, 0.0, Scheduler::Backtracking, seed,
        );
        prop_assert_eq!(sweep_energy, backtrack_energy);
    }
}

// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

use byzantine_generals::{
    Action, ConfigError, CorruptionPolicy, Outcome, Scenario, SimulationConfig, configure,
};

fn run(config: SimulationConfig) -> Outcome {
    configure(config).unwrap().run().unwrap()
}

#[test]
fn all_loyal_without_relay() {
    let outcome = run(SimulationConfig::new(3, 0).with_commander(true, Action::Attack));
    assert_eq!(outcome.rounds_executed, 1);
    assert_eq!(outcome.decisions.len(), 3);
    assert!(outcome.decisions.values().all(|d| *d == Action::Attack));
    assert_eq!(outcome.global_outcome, Action::Attack);
    assert!(outcome.loyal_agreement);
}

#[test]
fn one_flipping_traitor_among_five() {
    for traitor in 1..=5 {
        let outcome = run(SimulationConfig::new(5, 1)
            .with_commander(true, Action::Attack)
            .with_traitors(&[traitor])
            .with_corruption(CorruptionPolicy::Flip));
        assert_eq!(outcome.traitors, 1);
        for (id, decision) in &outcome.decisions {
            if *id != traitor {
                assert_eq!(*decision, Action::Attack);
            }
        }
        assert_eq!(outcome.global_outcome, Action::Attack);
    }
}

#[test]
fn flipping_traitor_commander() {
    let outcome = run(SimulationConfig::new(4, 1)
        .with_commander(false, Action::Attack)
        .with_corruption(CorruptionPolicy::Flip));
    assert!(outcome.loyal_agreement);
    assert!(outcome.decisions.values().all(|d| *d == Action::Retreat));
    assert_eq!(outcome.global_outcome, Action::Retreat);
}

#[test]
fn coin_flipping_traitor_commander() {
    // every lieutenant ends up counting the same multiset of round 0 orders
    for seed in 0..50 {
        let outcome = run(SimulationConfig::new(4, 1)
            .with_commander(false, Action::Attack)
            .with_corruption(CorruptionPolicy::Random)
            .with_seed(seed));
        assert!(outcome.loyal_agreement, "disagreement with seed {seed}");
    }
}

#[test]
fn tie_at_lieutenant_goes_to_retreat() {
    // lieutenant 1 gets ATTACK from the commander and a flipped RETREAT from lieutenant 2
    let outcome = run(SimulationConfig::new(2, 1)
        .with_commander(true, Action::Attack)
        .with_traitors(&[2]));
    assert_eq!(outcome.decisions[&1], Action::Retreat);
    assert_eq!(outcome.decisions[&2], Action::Attack);
    assert_eq!(outcome.global_outcome, Action::Retreat);
}

#[test]
fn disagreement_is_an_outcome() {
    // without relay rounds a coin-flipping commander splits the lieutenants
    let disagreements = (0..50)
        .map(|seed| {
            run(SimulationConfig::new(3, 0)
                .with_commander(false, Action::Attack)
                .with_corruption(CorruptionPolicy::Random)
                .with_seed(seed))
        })
        .filter(|outcome| !outcome.loyal_agreement)
        .count();
    assert!(disagreements > 0);
}

#[test]
fn scenario_file() {
    let scenario = Scenario::from_toml_str(
        r#"
        lieutenants = 7
        max_traitors = 2
        commander_order = "retreat"
        traitors = [2, 6]
        corruption = "flip"
        seed = 1
        worker_threads = 2
        "#,
    )
    .unwrap();
    let outcome = run(scenario.into_config().unwrap());
    assert_eq!(outcome.rounds_executed, 3);
    assert_eq!(outcome.traitors, 2);
    assert!(outcome.loyal_agreement);
    assert_eq!(outcome.global_outcome, Action::Retreat);
}

#[test]
fn invalid_configuration_never_runs() {
    let config = SimulationConfig::new(0, 1);
    assert!(matches!(
        configure(config),
        Err(ConfigError::NonPositiveLieutenants(0))
    ));

    let config = SimulationConfig::new(4, 1).with_loyalty(vec![true; 5]);
    assert!(matches!(
        configure(config),
        Err(ConfigError::LoyaltyLength {
            expected: 4,
            got: 5
        })
    ));

    let scenario = Scenario::from_toml_str("lieutenants = 4\nmax_traitors = -1").unwrap();
    assert!(matches!(
        scenario.into_config(),
        Err(ConfigError::NegativeMaxTraitors(-1))
    ));
}

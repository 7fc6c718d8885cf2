// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Running a complete simulation.
//!
//! [`configure`] validates a [`SimulationConfig`] and sets up the participants
//! and worker pool. [`Simulation::run`] then executes all rounds and computes
//! every lieutenant's decision as well as the global outcome.
//!
//! # Examples
//!
//! ```
//! use byzantine_generals::{Action, SimulationConfig, configure};
//!
//! let config = SimulationConfig::new(5, 1).with_traitors(&[4]);
//! let mut simulation = configure(config).unwrap();
//! let outcome = simulation.run().unwrap();
//! assert!(outcome.loyal_agreement);
//! assert_eq!(outcome.global_outcome, Action::Attack);
//! ```

use std::collections::BTreeMap;
use std::time::Instant;

use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;

use crate::consensus::{decide_all, global_outcome, loyal_agreement};
use crate::relay::RelayEngine;
use crate::{
    Action, ConfigError, ParticipantId, ProtocolError, Registry, SimulationConfig, Transcript,
};

/// Result of a single run.
#[derive(Clone, Debug)]
pub struct Outcome {
    /// Final decision of every lieutenant, loyal or not.
    pub decisions: BTreeMap<ParticipantId, Action>,
    /// Majority over the decisions of loyal lieutenants.
    pub global_outcome: Action,
    /// Number of rounds executed, including round 0.
    pub rounds_executed: usize,
    /// Whether all loyal lieutenants decided the same.
    pub loyal_agreement: bool,
    pub traitors: usize,
    /// Sealed logs of all rounds.
    pub transcript: Transcript,
}

impl Outcome {
    /// Returns a serializable summary without the transcript.
    pub fn report(&self) -> Report {
        Report {
            decisions: self.decisions.clone(),
            global_outcome: self.global_outcome,
            rounds_executed: self.rounds_executed,
            loyal_agreement: self.loyal_agreement,
            traitors: self.traitors,
            messages_per_round: self.transcript.message_counts(),
        }
    }
}

/// Serializable summary of an [`Outcome`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Report {
    pub decisions: BTreeMap<ParticipantId, Action>,
    pub global_outcome: Action,
    pub rounds_executed: usize,
    pub loyal_agreement: bool,
    pub traitors: usize,
    pub messages_per_round: Vec<usize>,
}

/// A configured simulation, ready to run.
pub struct Simulation {
    config: SimulationConfig,
    registry: Registry,
    engine: RelayEngine,
    pool: Option<ThreadPool>,
}

/// Validates `config` and prepares a [`Simulation`].
///
/// # Errors
///
/// Returns [`ConfigError`] if the configuration is invalid.
/// In that case no round is ever executed.
pub fn configure(config: SimulationConfig) -> Result<Simulation, ConfigError> {
    config.validate()?;
    let pool = match config.worker_threads {
        Some(threads) => Some(ThreadPoolBuilder::new().num_threads(threads).build()?),
        None => None,
    };
    let registry = Registry::new(
        config.commander_loyal,
        config.commander_order,
        &config.lieutenant_loyalty,
    );
    let engine = RelayEngine::new(config.corruption, config.seed, config.max_traitors);
    debug!(
        "configured {} lieutenants with {} traitors, m={}, {} corruption",
        config.num_lieutenants,
        registry.traitor_count(),
        config.max_traitors,
        config.corruption
    );
    Ok(Simulation {
        config,
        registry,
        engine,
        pool,
    })
}

impl Simulation {
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Participants, with each lieutenant's action as received in the last run.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Executes rounds `0..=m` and decides.
    ///
    /// Runs are reproducible: the same configuration always yields the same outcome.
    /// Disagreement among loyal lieutenants is a valid outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] only if an internal invariant was violated.
    pub fn run(&mut self) -> Result<Outcome, ProtocolError> {
        let start = Instant::now();
        self.registry.reset();
        let Self {
            registry,
            engine,
            pool,
            ..
        } = self;
        let outcome = match pool {
            Some(pool) => pool.install(|| Self::execute(engine, registry)),
            None => Self::execute(engine, registry),
        }?;
        debug!(
            "decided {} after {} rounds in {:.2} ms (loyal agreement: {})",
            outcome.global_outcome,
            outcome.rounds_executed,
            start.elapsed().as_secs_f64() * 1000.0,
            outcome.loyal_agreement
        );
        Ok(outcome)
    }

    fn execute(engine: &RelayEngine, registry: &mut Registry) -> Result<Outcome, ProtocolError> {
        let transcript = engine.execute(registry)?;
        let decisions = decide_all(&transcript, registry)?;
        Ok(Outcome {
            global_outcome: global_outcome(registry, &decisions),
            loyal_agreement: loyal_agreement(registry, &decisions),
            rounds_executed: transcript.rounds().len(),
            traitors: registry.traitor_count(),
            decisions,
            transcript,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CorruptionPolicy;

    #[test]
    fn rejects_invalid_config() {
        let config = SimulationConfig::new(2, 0).with_loyalty(vec![true]);
        assert!(matches!(
            configure(config),
            Err(ConfigError::LoyaltyLength { .. })
        ));
    }

    #[test]
    fn dedicated_pool() {
        let config = SimulationConfig::new(4, 1)
            .with_traitors(&[2])
            .with_worker_threads(2);
        let mut simulation = configure(config).unwrap();
        let outcome = simulation.run().unwrap();
        assert_eq!(outcome.rounds_executed, 2);
        assert_eq!(outcome.traitors, 1);
        assert_eq!(outcome.global_outcome, Action::Attack);
        for lt in simulation.registry().lieutenants() {
            assert_eq!(lt.current_action(), Action::Attack);
        }
    }

    #[test]
    fn rerun_is_identical() {
        let config = SimulationConfig::new(6, 2)
            .with_commander(false, Action::Attack)
            .with_traitors(&[1, 4])
            .with_corruption(CorruptionPolicy::Random)
            .with_seed(99);
        let mut simulation = configure(config).unwrap();
        let first = simulation.run().unwrap();
        let second = simulation.run().unwrap();
        assert_eq!(first.report(), second.report());
        assert_eq!(first.transcript, second.transcript);
    }

    #[test]
    fn report() {
        let mut simulation = configure(SimulationConfig::new(3, 1)).unwrap();
        let report = simulation.run().unwrap().report();
        assert_eq!(report.messages_per_round, vec![3, 6]);
        assert_eq!(report.decisions.len(), 3);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"global_outcome\":\"attack\""));
    }
}

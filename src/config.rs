// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Simulation configuration.
//!
//! [`SimulationConfig`] is the validated, typed input of [`crate::configure`].
//! [`Scenario`] is its on-disk TOML form, which allows a more convenient
//! description of who the traitors are.
//!
//! # Examples
//!
//! ```
//! use byzantine_generals::{Action, Scenario};
//!
//! let scenario = Scenario::from_toml_str(
//!     r#"
//!     lieutenants = 4
//!     max_traitors = 1
//!     commander_order = "attack"
//!     traitors = [3]
//!     "#,
//! )
//! .unwrap();
//! let config = scenario.into_config().unwrap();
//! assert_eq!(config.lieutenant_loyalty, vec![true, true, false, true]);
//! assert_eq!(config.commander_order, Action::Attack);
//! ```

use std::path::Path;

use log::warn;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Deserialize;
use thiserror::Error;

use crate::{Action, CorruptionPolicy, ParticipantId};

/// Round bound used when a scenario does not specify one.
///
/// Relay work grows factorially in the number of rounds.
pub const DEFAULT_ROUND_CAP: usize = 2;

/// Errors detected before any round executes.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("number of lieutenants must be positive, got {0}")]
    NonPositiveLieutenants(i64),
    #[error("maximum number of traitors must not be negative, got {0}")]
    NegativeMaxTraitors(i64),
    #[error("loyalty given for {got} lieutenants, but there are {expected}")]
    LoyaltyLength { expected: usize, got: usize },
    #[error("{lieutenants} lieutenants cannot relay for {max_traitors} rounds, at most {lieutenants}")]
    RoundBoundTooLarge {
        max_traitors: usize,
        lieutenants: usize,
    },
    #[error("commander must issue either attack or retreat")]
    UnknownOrder,
    #[error("participant {0} is not a lieutenant")]
    UnknownLieutenant(ParticipantId),
    #[error("at most one of `loyalty`, `traitors` and `loyal_fraction` may be given")]
    ConflictingLoyalty,
    #[error("loyal fraction must be within [0, 1], got {0}")]
    InvalidLoyalFraction(f64),
    #[error("worker pool needs at least one thread")]
    ZeroWorkerThreads,
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Full configuration of a single simulation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Number of lieutenants `N`.
    pub num_lieutenants: usize,
    /// Round bound `m`. Rounds `0..=m` are executed.
    pub max_traitors: usize,
    pub commander_loyal: bool,
    pub commander_order: Action,
    /// Loyalty of lieutenants `1..=N`, in order.
    pub lieutenant_loyalty: Vec<bool>,
    pub corruption: CorruptionPolicy,
    /// Seed for all corruption decisions.
    pub seed: u64,
    /// Size of a dedicated worker pool. `None` uses the global [`rayon`] pool.
    pub worker_threads: Option<usize>,
}

impl SimulationConfig {
    /// Creates a configuration with a loyal commander ordering attack and only loyal lieutenants.
    pub fn new(num_lieutenants: usize, max_traitors: usize) -> Self {
        Self {
            num_lieutenants,
            max_traitors,
            commander_loyal: true,
            commander_order: Action::Attack,
            lieutenant_loyalty: vec![true; num_lieutenants],
            corruption: CorruptionPolicy::default(),
            seed: 0,
            worker_threads: None,
        }
    }

    #[must_use]
    pub fn with_commander(mut self, loyal: bool, order: Action) -> Self {
        self.commander_loyal = loyal;
        self.commander_order = order;
        self
    }

    #[must_use]
    pub fn with_loyalty(mut self, loyalty: Vec<bool>) -> Self {
        self.lieutenant_loyalty = loyalty;
        self
    }

    /// Marks the given lieutenants as traitors. Unknown IDs are caught by [`Self::validate`].
    #[must_use]
    pub fn with_traitors(mut self, traitors: &[ParticipantId]) -> Self {
        for &id in traitors {
            if let Some(loyal) = id
                .checked_sub(1)
                .and_then(|i| self.lieutenant_loyalty.get_mut(i as usize))
            {
                *loyal = false;
            }
        }
        self
    }

    #[must_use]
    pub fn with_corruption(mut self, corruption: CorruptionPolicy) -> Self {
        self.corruption = corruption;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    /// Number of traitors, including the commander if disloyal.
    pub fn traitor_count(&self) -> usize {
        let lieutenants = self.lieutenant_loyalty.iter().filter(|l| !**l).count();
        lieutenants + usize::from(!self.commander_loyal)
    }

    /// Returns `true` iff the classical bound `N >= 3m + 1` holds.
    pub fn within_classical_bound(&self) -> bool {
        self.max_traitors
            .checked_mul(3)
            .is_some_and(|t| self.num_lieutenants > t)
    }

    /// Checks that this configuration describes a runnable simulation.
    ///
    /// Violating the classical bound `N >= 3m + 1` is allowed, it only means
    /// that agreement is no longer guaranteed. The round bound may not exceed
    /// `N` though: a message in round `r` has visited `r + 1` participants,
    /// so every round after round `N - 1` is empty.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_lieutenants == 0 {
            return Err(ConfigError::NonPositiveLieutenants(0));
        }
        if self.lieutenant_loyalty.len() != self.num_lieutenants {
            return Err(ConfigError::LoyaltyLength {
                expected: self.num_lieutenants,
                got: self.lieutenant_loyalty.len(),
            });
        }
        if self.max_traitors > self.num_lieutenants {
            return Err(ConfigError::RoundBoundTooLarge {
                max_traitors: self.max_traitors,
                lieutenants: self.num_lieutenants,
            });
        }
        if !self.commander_order.is_order() {
            return Err(ConfigError::UnknownOrder);
        }
        if self.worker_threads == Some(0) {
            return Err(ConfigError::ZeroWorkerThreads);
        }
        if !self.within_classical_bound() {
            warn!(
                "{} lieutenants cannot tolerate {} traitors, agreement is not guaranteed",
                self.num_lieutenants, self.max_traitors
            );
        }
        if self.traitor_count() > self.max_traitors {
            warn!(
                "{} traitors exceed the round bound of {}",
                self.traitor_count(),
                self.max_traitors
            );
        }
        Ok(())
    }
}

/// Scenario description as read from a TOML file.
///
/// At most one of `loyalty`, `traitors` and `loyal_fraction` may be given.
/// Without any of them all lieutenants are loyal.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub lieutenants: i64,
    /// Defaults to the number of traitors, capped at [`DEFAULT_ROUND_CAP`]
    /// and the number of lieutenants.
    pub max_traitors: Option<i64>,
    pub commander_loyal: Option<bool>,
    pub commander_order: Option<Action>,
    pub loyalty: Option<Vec<bool>>,
    pub traitors: Option<Vec<ParticipantId>>,
    /// Probability of each lieutenant being loyal, drawn from `seed`.
    pub loyal_fraction: Option<f64>,
    #[serde(default)]
    pub corruption: CorruptionPolicy,
    #[serde(default)]
    pub seed: u64,
    pub worker_threads: Option<usize>,
}

impl Scenario {
    /// Parses a scenario from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the input is malformed.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Reads and parses a scenario file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Turns this scenario into a validated [`SimulationConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the scenario is inconsistent.
    pub fn into_config(self) -> Result<SimulationConfig, ConfigError> {
        let num_lieutenants = usize::try_from(self.lieutenants)
            .ok()
            .filter(|n| *n > 0)
            .ok_or(ConfigError::NonPositiveLieutenants(self.lieutenants))?;
        let sources = [
            self.loyalty.is_some(),
            self.traitors.is_some(),
            self.loyal_fraction.is_some(),
        ];
        if sources.iter().filter(|s| **s).count() > 1 {
            return Err(ConfigError::ConflictingLoyalty);
        }

        let lieutenant_loyalty = if let Some(loyalty) = self.loyalty {
            loyalty
        } else if let Some(traitors) = &self.traitors {
            let mut loyalty = vec![true; num_lieutenants];
            for &id in traitors {
                let index = crate::registry::lieutenant_index(id, num_lieutenants)
                    .ok_or(ConfigError::UnknownLieutenant(id))?;
                loyalty[index] = false;
            }
            loyalty
        } else if let Some(fraction) = self.loyal_fraction {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(ConfigError::InvalidLoyalFraction(fraction));
            }
            let mut rng = StdRng::seed_from_u64(self.seed);
            (0..num_lieutenants)
                .map(|_| rng.random_bool(fraction))
                .collect()
        } else {
            vec![true; num_lieutenants]
        };

        let mut config = SimulationConfig {
            num_lieutenants,
            max_traitors: 0,
            commander_loyal: self.commander_loyal.unwrap_or(true),
            commander_order: self.commander_order.unwrap_or(Action::Attack),
            lieutenant_loyalty,
            corruption: self.corruption,
            seed: self.seed,
            worker_threads: self.worker_threads,
        };
        config.max_traitors = match self.max_traitors {
            Some(m) => usize::try_from(m).map_err(|_| ConfigError::NegativeMaxTraitors(m))?,
            None => config
                .traitor_count()
                .min(DEFAULT_ROUND_CAP)
                .min(num_lieutenants),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let config = SimulationConfig::new(5, 1)
            .with_commander(false, Action::Retreat)
            .with_traitors(&[2, 9])
            .with_corruption(CorruptionPolicy::Random)
            .with_seed(3)
            .with_worker_threads(2);
        assert_eq!(config.lieutenant_loyalty, vec![true, false, true, true, true]);
        assert_eq!(config.traitor_count(), 2);
        assert!(config.within_classical_bound());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_configs() {
        let config = SimulationConfig::new(0, 0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveLieutenants(0))
        ));

        let config = SimulationConfig::new(3, 0).with_loyalty(vec![true; 2]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LoyaltyLength {
                expected: 3,
                got: 2
            })
        ));

        let config = SimulationConfig::new(3, 0).with_commander(true, Action::Unknown);
        assert!(matches!(config.validate(), Err(ConfigError::UnknownOrder)));

        let config = SimulationConfig::new(3, 0).with_worker_threads(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroWorkerThreads)
        ));

        // violating the classical bound is allowed
        let config = SimulationConfig::new(3, 1);
        assert!(!config.within_classical_bound());
        assert!(config.validate().is_ok());
        let config = SimulationConfig::new(2, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn huge_round_bound() {
        for m in [3, 1_000_000_000, usize::MAX / 2, usize::MAX] {
            let config = SimulationConfig::new(2, m);
            assert!(!config.within_classical_bound());
            assert!(matches!(
                config.validate(),
                Err(ConfigError::RoundBoundTooLarge {
                    lieutenants: 2,
                    ..
                })
            ));
        }

        let scenario =
            Scenario::from_toml_str("lieutenants = 2\nmax_traitors = 9223372036854775807").unwrap();
        assert!(matches!(
            scenario.into_config(),
            Err(ConfigError::RoundBoundTooLarge {
                max_traitors: 9_223_372_036_854_775_807,
                lieutenants: 2
            })
        ));
    }

    #[test]
    fn scenario_defaults() {
        let config = Scenario::from_toml_str("lieutenants = 3")
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config, SimulationConfig::new(3, 0));
    }

    #[test]
    fn scenario_round_cap() {
        let scenario = Scenario::from_toml_str(
            r#"
            lieutenants = 6
            commander_loyal = false
            commander_order = "retreat"
            traitors = [1, 2, 5]
            corruption = "random"
            seed = 11
            "#,
        )
        .unwrap();
        let config = scenario.into_config().unwrap();
        assert_eq!(config.traitor_count(), 4);
        assert_eq!(config.max_traitors, DEFAULT_ROUND_CAP);
        assert_eq!(config.corruption, CorruptionPolicy::Random);
        assert_eq!(config.commander_order, Action::Retreat);
        assert_eq!(config.seed, 11);
    }

    #[test]
    fn scenario_errors() {
        let parse = |s: &str| Scenario::from_toml_str(s).and_then(Scenario::into_config);

        assert!(matches!(
            parse("lieutenants = -2"),
            Err(ConfigError::NonPositiveLieutenants(-2))
        ));
        assert!(matches!(
            parse("lieutenants = 3\nmax_traitors = -1"),
            Err(ConfigError::NegativeMaxTraitors(-1))
        ));
        assert!(matches!(
            parse("lieutenants = 3\ntraitors = [4]"),
            Err(ConfigError::UnknownLieutenant(4))
        ));
        assert!(matches!(
            parse("lieutenants = 3\ntraitors = [0]"),
            Err(ConfigError::UnknownLieutenant(0))
        ));
        assert!(matches!(
            parse("lieutenants = 2\ntraitors = [1]\nloyalty = [true, false]"),
            Err(ConfigError::ConflictingLoyalty)
        ));
        assert!(matches!(
            parse("lieutenants = 2\nloyal_fraction = 1.5"),
            Err(ConfigError::InvalidLoyalFraction(_))
        ));
        assert!(matches!(
            parse("lieutenants = 2\nloyalty = [true]"),
            Err(ConfigError::LoyaltyLength { .. })
        ));
        assert!(matches!(
            parse("lieutenants = 2\ngenerals = 3"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Scenario::load("does/not/exist.toml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn loyal_fraction_is_seeded() {
        let parse = |s: &str| {
            Scenario::from_toml_str(s)
                .and_then(Scenario::into_config)
                .unwrap()
        };
        let a = parse("lieutenants = 20\nloyal_fraction = 0.7\nseed = 5");
        let b = parse("lieutenants = 20\nloyal_fraction = 0.7\nseed = 5");
        assert_eq!(a.lieutenant_loyalty, b.lieutenant_loyalty);

        let all = parse("lieutenants = 20\nloyal_fraction = 1.0");
        assert_eq!(all.traitor_count(), 0);
        let none = parse("lieutenants = 20\nloyal_fraction = 0.0\nmax_traitors = 0");
        assert_eq!(none.traitor_count(), 20);

        // the default round bound never exceeds the number of lieutenants
        let single = parse("lieutenants = 1\ncommander_loyal = false\ntraitors = [1]");
        assert_eq!(single.traitor_count(), 2);
        assert_eq!(single.max_traitors, 1);
    }
}

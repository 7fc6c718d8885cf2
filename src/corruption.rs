// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Corruption model for traitorous senders.
//!
//! Loyal senders always transmit the order they were asked to transmit.
//! Traitors transmit an adversarial order chosen by the [`CorruptionPolicy`]
//! of the run. Neither ever transmits [`Action::Unknown`].
//!
//! Entropy is always passed in explicitly. For reproducible parallel runs,
//! [`link_rng`] derives an independent generator for every directed link.

use std::fmt::Display;
use std::str::FromStr;

use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Action, Participant, ParticipantId};

/// How traitors pick the order they transmit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptionPolicy {
    /// Traitors always send the opposite of the requested order.
    #[default]
    Flip,
    /// Traitors toss a fair coin between attack and retreat for every message.
    Random,
}

impl CorruptionPolicy {
    /// Returns the order `sender` actually transmits when asked to send `order`.
    pub fn transmit<R: Rng + ?Sized>(
        self,
        sender: &Participant,
        order: Action,
        rng: &mut R,
    ) -> Action {
        if sender.is_loyal() {
            order
        } else {
            self.corrupt(order, rng)
        }
    }

    /// Returns the adversarial replacement for `order`.
    pub fn corrupt<R: Rng + ?Sized>(self, order: Action, rng: &mut R) -> Action {
        match self {
            Self::Flip => order.flipped(),
            Self::Random => {
                if rng.random_bool(0.5) {
                    Action::Attack
                } else {
                    Action::Retreat
                }
            }
        }
    }
}

impl Display for CorruptionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flip => f.write_str("flip"),
            Self::Random => f.write_str("random"),
        }
    }
}

/// Error returned when parsing a [`CorruptionPolicy`] from a string fails.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown corruption policy '{0}', expected 'flip' or 'random'")]
pub struct ParsePolicyError(String);

impl FromStr for CorruptionPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flip" => Ok(Self::Flip),
            "random" | "coin" => Ok(Self::Random),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// Creates the generator for all messages sent over one link in one round.
///
/// The stream only depends on `(seed, round, sender, receiver)`,
/// so results do not depend on how work is scheduled across workers.
pub fn link_rng(seed: u64, round: usize, sender: ParticipantId, receiver: ParticipantId) -> StdRng {
    let mut rng = StdRng::seed_from_u64(seed);
    for word in [round as u64, sender, receiver] {
        rng = StdRng::seed_from_u64(rng.random::<u64>() ^ word);
    }
    rng
}

// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Defines the [`Action`] type.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An order that can be issued, relayed and decided upon.
///
/// [`Action::Unknown`] is what a lieutenant holds before any message arrived.
/// It never travels on the wire and is never counted as a vote.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Attack,
    Retreat,
    #[default]
    Unknown,
}

impl Action {
    /// Returns the opposite order.
    ///
    /// [`Action::Attack`] becomes [`Action::Retreat`], anything else becomes
    /// [`Action::Attack`], so the result is always an actual order.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Attack => Self::Retreat,
            Self::Retreat | Self::Unknown => Self::Attack,
        }
    }

    /// Returns `true` iff this is [`Action::Attack`] or [`Action::Retreat`].
    pub const fn is_order(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Attack => "ATTACK",
            Self::Retreat => "RETREAT",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Error returned when parsing an [`Action`] from a string fails.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown action '{0}', expected 'attack' or 'retreat'")]
pub struct ParseActionError(String);

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "attack" => Ok(Self::Attack),
            "retreat" => Ok(Self::Retreat),
            "unknown" => Ok(Self::Unknown),
            _ => Err(ParseActionError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip() {
        assert_eq!(Action::Attack.flipped(), Action::Retreat);
        assert_eq!(Action::Retreat.flipped(), Action::Attack);
        assert_eq!(Action::Unknown.flipped(), Action::Attack);
        assert!(!Action::Unknown.is_order());
        assert!(Action::Attack.flipped().is_order());
    }

    #[test]
    fn parse_and_display() {
        for action in [Action::Attack, Action::Retreat, Action::Unknown] {
            let parsed: Action = action.to_string().parse().unwrap();
            assert_eq!(parsed, action);
        }
        assert_eq!("Attack".parse::<Action>(), Ok(Action::Attack));
        assert!("charge".parse::<Action>().is_err());
    }
}

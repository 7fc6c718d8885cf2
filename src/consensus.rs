// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Consensus calculation over sealed round logs.
//!
//! Every lieutenant decides by majority over all messages addressed to it in
//! any round. Ties go to [`Action::Retreat`]. [`Action::Unknown`] is never counted.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::{Action, Message, ParticipantId, ProtocolError, Registry, Transcript};

/// Vote counts for the two actual orders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    attack: usize,
    retreat: usize,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a single vote. [`Action::Unknown`] is ignored.
    pub fn add(&mut self, action: Action) {
        match action {
            Action::Attack => self.attack += 1,
            Action::Retreat => self.retreat += 1,
            Action::Unknown => {}
        }
    }

    pub fn attack(&self) -> usize {
        self.attack
    }

    pub fn retreat(&self) -> usize {
        self.retreat
    }

    pub fn is_tie(&self) -> bool {
        self.attack == self.retreat
    }

    /// Majority decision: attack only with strictly more attack votes.
    pub fn verdict(&self) -> Action {
        if self.attack > self.retreat {
            Action::Attack
        } else {
            Action::Retreat
        }
    }
}

impl Extend<Action> for Tally {
    fn extend<I: IntoIterator<Item = Action>>(&mut self, iter: I) {
        for action in iter {
            self.add(action);
        }
    }
}

impl FromIterator<Action> for Tally {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut tally = Self::new();
        tally.extend(iter);
        tally
    }
}

impl<'a> FromIterator<&'a Message> for Tally {
    fn from_iter<I: IntoIterator<Item = &'a Message>>(iter: I) -> Self {
        iter.into_iter().map(Message::order).collect()
    }
}

/// Decides for a single lieutenant, based on all rounds in `transcript`.
///
/// # Errors
///
/// Returns [`ProtocolError::UnknownLieutenant`] if `lieutenant` does not exist.
pub fn decide(transcript: &Transcript, lieutenant: ParticipantId) -> Result<Action, ProtocolError> {
    let tally: Tally = transcript.messages_for(lieutenant)?.into_iter().collect();
    Ok(tally.verdict())
}

/// Decides for every lieutenant in `registry`, in parallel.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the transcript does not match the registry.
pub fn decide_all(
    transcript: &Transcript,
    registry: &Registry,
) -> Result<BTreeMap<ParticipantId, Action>, ProtocolError> {
    registry
        .lieutenants()
        .par_iter()
        .map(|lt| decide(transcript, lt.id()).map(|action| (lt.id(), action)))
        .collect()
}

/// Aggregates the decisions of loyal lieutenants into one global outcome.
///
/// Loyalty is only used as ground truth for evaluating the protocol here.
/// Lieutenants without a decision are not counted.
pub fn global_outcome(registry: &Registry, decisions: &BTreeMap<ParticipantId, Action>) -> Action {
    registry
        .loyal_lieutenants()
        .filter_map(|id| decisions.get(&id).copied())
        .collect::<Tally>()
        .verdict()
}

/// Returns `true` iff all loyal lieutenants reached the same decision.
pub fn loyal_agreement(registry: &Registry, decisions: &BTreeMap<ParticipantId, Action>) -> bool {
    let mut loyal = registry
        .loyal_lieutenants()
        .filter_map(|id| decisions.get(&id));
    match loyal.next() {
        Some(first) => loyal.all(|d| d == first),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally() {
        let tally: Tally = [Action::Attack, Action::Retreat, Action::Unknown, Action::Attack]
            .into_iter()
            .collect();
        assert_eq!(tally.attack(), 2);
        assert_eq!(tally.retreat(), 1);
        assert!(!tally.is_tie());
        assert_eq!(tally.verdict(), Action::Attack);
    }

    #[test]
    fn tie_goes_to_retreat() {
        assert_eq!(Tally::new().verdict(), Action::Retreat);
        let tally: Tally = [Action::Attack, Action::Retreat].into_iter().collect();
        assert!(tally.is_tie());
        assert_eq!(tally.verdict(), Action::Retreat);

        // unknown votes do not break ties
        let tally: Tally = [Action::Attack, Action::Unknown, Action::Retreat, Action::Unknown]
            .into_iter()
            .collect();
        assert_eq!(tally.verdict(), Action::Retreat);
    }

    #[test]
    fn global_only_counts_loyal() {
        let registry = Registry::new(true, Action::Attack, &[true, false, false, true]);
        let decisions = BTreeMap::from([
            (1, Action::Attack),
            (2, Action::Attack),
            (3, Action::Attack),
            (4, Action::Retreat),
        ]);
        // loyal lieutenants 1 and 4 are tied
        assert_eq!(global_outcome(&registry, &decisions), Action::Retreat);
        assert!(!loyal_agreement(&registry, &decisions));

        let decisions = BTreeMap::from([(1, Action::Attack), (4, Action::Attack)]);
        assert_eq!(global_outcome(&registry, &decisions), Action::Attack);
        assert!(loyal_agreement(&registry, &decisions));
    }

    #[test]
    fn no_loyal_lieutenants() {
        let registry = Registry::new(true, Action::Attack, &[false, false]);
        let decisions = BTreeMap::from([(1, Action::Attack), (2, Action::Attack)]);
        assert_eq!(global_outcome(&registry, &decisions), Action::Retreat);
        assert!(loyal_agreement(&registry, &decisions));
    }
}

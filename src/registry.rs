// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Participant registry.
//!
//! Holds the fixed set of generals for one simulation: one commander and `N`
//! lieutenants, stored in an arena indexed by [`ParticipantId`].

use std::fmt::Display;

use crate::{Action, ParticipantId};

/// ID of the commander, who originates the order.
pub const COMMANDER_ID: ParticipantId = 0;

/// A single general taking part in the protocol.
///
/// The loyalty flag only determines how this participant behaves when sending.
/// Protocol logic never inspects the loyalty of other participants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    id: ParticipantId,
    is_loyal: bool,
    current_action: Action,
}

impl Participant {
    fn new(id: ParticipantId, is_loyal: bool, current_action: Action) -> Self {
        Self {
            id,
            is_loyal,
            current_action,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    pub fn is_loyal(&self) -> bool {
        self.is_loyal
    }

    pub fn is_commander(&self) -> bool {
        self.id == COMMANDER_ID
    }

    /// For the commander this is the order to issue.
    /// For a lieutenant it is the order most recently received from the commander.
    pub fn current_action(&self) -> Action {
        self.current_action
    }

    pub(crate) fn set_current_action(&mut self, action: Action) {
        self.current_action = action;
    }
}

impl Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loyalty = if self.is_loyal { "Loyal" } else { "Traitor" };
        if self.is_commander() {
            write!(
                f,
                "Commander (ID {}): {loyalty}, Order: {}",
                self.id, self.current_action
            )
        } else {
            write!(
                f,
                "Lieutenant {}: {loyalty}, Action: {}",
                self.id, self.current_action
            )
        }
    }
}

/// Arena of all participants of a simulation.
///
/// Index 0 is the commander, index `i > 0` is lieutenant `i`.
/// Participants are never added or removed after construction.
#[derive(Clone, Debug)]
pub struct Registry {
    participants: Vec<Participant>,
}

impl Registry {
    /// Creates a registry with one lieutenant per entry of `lieutenant_loyalty`.
    ///
    /// All lieutenants start out holding [`Action::Unknown`].
    pub fn new(commander_loyal: bool, commander_order: Action, lieutenant_loyalty: &[bool]) -> Self {
        let mut participants = Vec::with_capacity(lieutenant_loyalty.len() + 1);
        participants.push(Participant::new(
            COMMANDER_ID,
            commander_loyal,
            commander_order,
        ));
        for (i, &loyal) in lieutenant_loyalty.iter().enumerate() {
            let id = i as ParticipantId + 1;
            participants.push(Participant::new(id, loyal, Action::Unknown));
        }
        Self { participants }
    }

    pub fn commander(&self) -> &Participant {
        &self.participants[0]
    }

    /// Returns all lieutenants, ordered by ID.
    pub fn lieutenants(&self) -> &[Participant] {
        &self.participants[1..]
    }

    /// Returns all participants, commander first.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn num_lieutenants(&self) -> usize {
        self.participants.len() - 1
    }

    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(usize::try_from(id).ok()?)
    }

    /// Returns the lieutenant with the given ID, if it exists.
    pub fn lieutenant(&self, id: ParticipantId) -> Option<&Participant> {
        self.get(id).filter(|p| !p.is_commander())
    }

    /// Number of traitors, including the commander if disloyal.
    pub fn traitor_count(&self) -> usize {
        self.participants.iter().filter(|p| !p.is_loyal()).count()
    }

    /// Returns the IDs of all loyal lieutenants.
    pub fn loyal_lieutenants(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.lieutenants()
            .iter()
            .filter(|p| p.is_loyal())
            .map(Participant::id)
    }

    /// Splits into the commander and mutable access to all lieutenants.
    pub(crate) fn split_commander_mut(&mut self) -> (&Participant, &mut [Participant]) {
        let (commander, lieutenants) = self.participants.split_at_mut(1);
        (&commander[0], lieutenants)
    }

    /// Forgets whatever the lieutenants received in a previous run.
    pub(crate) fn reset(&mut self) {
        for lt in &mut self.participants[1..] {
            lt.set_current_action(Action::Unknown);
        }
    }
}

/// Maps a lieutenant ID to its position in [`Registry::lieutenants`].
pub(crate) fn lieutenant_index(id: ParticipantId, num_lieutenants: usize) -> Option<usize> {
    let index = usize::try_from(id.checked_sub(1)?).ok()?;
    (index < num_lieutenants).then_some(index)
}

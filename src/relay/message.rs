// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Defines the [`Message`] type.

use smallvec::SmallVec;
use static_assertions::assert_impl_all;

use super::ProtocolError;
use crate::{Action, COMMANDER_ID, ParticipantId};

/// Participants a message passed through, commander first, latest sender last.
pub type Path = SmallVec<[ParticipantId; 4]>;

/// A single order as delivered to a lieutenant.
///
/// Messages are immutable. Relaying creates a new message with the relaying
/// lieutenant appended to the path.
///
/// The derived ordering compares paths first, which is the canonical order of
/// messages inside a sealed round log.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Message {
    path: Path,
    order: Action,
}

// messages are produced and moved across worker threads
assert_impl_all!(Message: Send, Sync);

impl Message {
    /// Creates the round-0 message the commander sends to a lieutenant.
    #[must_use]
    pub fn originate(order: Action) -> Self {
        let mut path = Path::new();
        path.push(COMMANDER_ID);
        Self { path, order }
    }

    /// Creates the message `sender` forwards after receiving `self`.
    #[must_use]
    pub fn relay(&self, sender: ParticipantId, order: Action) -> Self {
        let mut path = self.path.clone();
        path.push(sender);
        Self { path, order }
    }

    /// Returns the ID of whoever sent this message, which always ends the path.
    pub fn sender(&self) -> ParticipantId {
        self.path.last().copied().unwrap_or(COMMANDER_ID)
    }

    pub fn order(&self) -> Action {
        self.order
    }

    pub fn path(&self) -> &[ParticipantId] {
        &self.path
    }

    /// Number of relay hops, equal to the round the message was sent in.
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// Returns `true` iff `id` already appears on the path.
    pub fn has_visited(&self, id: ParticipantId) -> bool {
        self.path.contains(&id)
    }

    /// Checks the path invariants for a message delivered to `recipient` in `round`.
    pub(crate) fn check(&self, round: usize, recipient: ParticipantId) -> Result<(), ProtocolError> {
        if self.path.len() != round + 1 {
            return Err(ProtocolError::PathLength {
                round,
                recipient,
                len: self.path.len(),
            });
        }
        if self.path[0] != COMMANDER_ID {
            return Err(ProtocolError::NotOriginatedByCommander { round, recipient });
        }
        for (i, id) in self.path.iter().enumerate() {
            if self.path[i + 1..].contains(id) {
                return Err(ProtocolError::CyclicPath { round, id: *id });
            }
        }
        if self.has_visited(recipient) {
            return Err(ProtocolError::ReturnedToSender { round, recipient });
        }
        if !self.order.is_order() {
            return Err(ProtocolError::UnknownOrder {
                round,
                sender: self.sender(),
            });
        }
        Ok(())
    }
}

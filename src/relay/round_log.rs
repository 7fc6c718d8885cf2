// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-round message logs.
//!
//! While a round executes, its log is an [`OpenRoundLog`] that workers append to.
//! Inboxes are sharded by recipient, so appends for different recipients never
//! contend on the same lock. Once all work of the round has drained, the log
//! is sealed into a read-only [`ClosedRoundLog`].

use std::sync::{Mutex, PoisonError};

use super::{Message, ProtocolError};
use crate::ParticipantId;
use crate::registry::lieutenant_index;

/// Round log that is still being written to.
pub(crate) struct OpenRoundLog {
    round: usize,
    inboxes: Vec<Mutex<Vec<Message>>>,
}

impl OpenRoundLog {
    pub(crate) fn new(round: usize, num_lieutenants: usize) -> Self {
        let inboxes = (0..num_lieutenants)
            .map(|_| Mutex::new(Vec::new()))
            .collect();
        Self { round, inboxes }
    }

    /// Appends all of `msgs` to the inbox of the lieutenant at `index`.
    pub(crate) fn deliver(&self, index: usize, msgs: impl IntoIterator<Item = Message>) {
        let mut inbox = self.inboxes[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        inbox.extend(msgs);
    }

    /// Closes the log for writing.
    ///
    /// Each inbox is sorted into canonical order and every message is checked
    /// against the path invariants of this round.
    pub(crate) fn seal(self) -> Result<ClosedRoundLog, ProtocolError> {
        let round = self.round;
        let mut inboxes = Vec::with_capacity(self.inboxes.len());
        for (index, inbox) in self.inboxes.into_iter().enumerate() {
            let mut msgs = inbox.into_inner().unwrap_or_else(PoisonError::into_inner);
            msgs.sort_unstable();
            let recipient = index as ParticipantId + 1;
            for msg in &msgs {
                msg.check(round, recipient)?;
            }
            inboxes.push(msgs);
        }
        Ok(ClosedRoundLog { round, inboxes })
    }
}

/// Immutable log of all messages delivered in one round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClosedRoundLog {
    round: usize,
    inboxes: Vec<Vec<Message>>,
}

impl ClosedRoundLog {
    /// Log of a round in which nothing was delivered.
    pub(crate) fn quiet(round: usize, num_lieutenants: usize) -> Self {
        Self {
            round,
            inboxes: vec![Vec::new(); num_lieutenants],
        }
    }

    pub fn round(&self) -> usize {
        self.round
    }

    /// Returns all messages delivered to lieutenant `recipient` in this round.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownLieutenant`] if there is no such lieutenant.
    pub fn inbox(&self, recipient: ParticipantId) -> Result<&[Message], ProtocolError> {
        lieutenant_index(recipient, self.inboxes.len())
            .map(|index| self.inboxes[index].as_slice())
            .ok_or(ProtocolError::UnknownLieutenant(recipient))
    }

    /// Iterates over `(recipient, messages)` for all lieutenants.
    pub fn inboxes(&self) -> impl Iterator<Item = (ParticipantId, &[Message])> {
        self.inboxes
            .iter()
            .enumerate()
            .map(|(index, msgs)| (index as ParticipantId + 1, msgs.as_slice()))
    }

    /// Total number of messages delivered in this round.
    pub fn len(&self) -> usize {
        self.inboxes.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.inboxes.iter().all(Vec::is_empty)
    }

    pub(crate) fn inbox_at(&self, index: usize) -> &[Message] {
        &self.inboxes[index]
    }
}

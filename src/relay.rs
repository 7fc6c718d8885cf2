// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Message relay engine.
//!
//! Executes round 0, where the commander broadcasts its order, and then the
//! relay rounds `1..=m`, where every lieutenant forwards everything it
//! received in the previous round to every other lieutenant.
//!
//! A message is never forwarded to a lieutenant that is already on its path.
//! Hence, a message sent in round `r` has a path of exactly `r + 1` distinct
//! participants.
//!
//! Work inside a round runs in parallel on the current [`rayon`] pool.
//! Rounds themselves run strictly one after the other: round `r` only starts
//! after the log of round `r - 1` was sealed.

mod message;
mod round_log;

use log::{debug, trace};
use rayon::prelude::*;
use thiserror::Error;

pub use self::message::{Message, Path};
pub use self::round_log::ClosedRoundLog;
use self::round_log::OpenRoundLog;
use crate::corruption::link_rng;
use crate::{CorruptionPolicy, ParticipantId, Registry};

/// Internal invariant violations detected while relaying.
///
/// Any of these indicates a bug in the simulator, not a protocol outcome.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("message for {recipient} in round {round} has path of length {len}")]
    PathLength {
        round: usize,
        recipient: ParticipantId,
        len: usize,
    },
    #[error("message for {recipient} in round {round} did not originate at the commander")]
    NotOriginatedByCommander {
        round: usize,
        recipient: ParticipantId,
    },
    #[error("participant {id} appears twice on the path of a round {round} message")]
    CyclicPath { round: usize, id: ParticipantId },
    #[error("round {round} message was relayed back to {recipient} who already saw it")]
    ReturnedToSender {
        round: usize,
        recipient: ParticipantId,
    },
    #[error("participant {sender} sent an unknown order in round {round}")]
    UnknownOrder { round: usize, sender: ParticipantId },
    #[error("round {requested} is outside of the executed rounds 0..={last}")]
    RoundOutOfRange { requested: usize, last: usize },
    #[error("participant {0} is not a lieutenant")]
    UnknownLieutenant(ParticipantId),
}

/// Sealed logs of all rounds of one run, round 0 first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transcript {
    rounds: Vec<ClosedRoundLog>,
}

impl Transcript {
    pub fn rounds(&self) -> &[ClosedRoundLog] {
        &self.rounds
    }

    /// Returns the sealed log of the given round.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::RoundOutOfRange`] if that round was not executed.
    pub fn round(&self, round: usize) -> Result<&ClosedRoundLog, ProtocolError> {
        self.rounds
            .get(round)
            .ok_or(ProtocolError::RoundOutOfRange {
                requested: round,
                last: self.last_round(),
            })
    }

    /// Index of the final executed round.
    pub fn last_round(&self) -> usize {
        self.rounds.len().saturating_sub(1)
    }

    /// Collects all messages delivered to `recipient` over all rounds.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownLieutenant`] if there is no such lieutenant.
    pub fn messages_for(&self, recipient: ParticipantId) -> Result<Vec<&Message>, ProtocolError> {
        let mut msgs = Vec::new();
        for log in &self.rounds {
            msgs.extend(log.inbox(recipient)?);
        }
        Ok(msgs)
    }

    /// Number of messages delivered in each round.
    pub fn message_counts(&self) -> Vec<usize> {
        self.rounds.iter().map(ClosedRoundLog::len).collect()
    }
}

/// Drives the rounds of a single run.
#[derive(Clone, Copy, Debug)]
pub struct RelayEngine {
    policy: CorruptionPolicy,
    seed: u64,
    max_traitors: usize,
}

impl RelayEngine {
    /// Creates an engine that executes rounds `0..=max_traitors`.
    pub fn new(policy: CorruptionPolicy, seed: u64, max_traitors: usize) -> Self {
        Self {
            policy,
            seed,
            max_traitors,
        }
    }

    /// Executes all rounds and returns their sealed logs.
    ///
    /// Updates each lieutenant's current action with what it received in round 0.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if any message violates the path invariants.
    pub fn execute(&self, registry: &mut Registry) -> Result<Transcript, ProtocolError> {
        let n = registry.num_lieutenants();
        let mut rounds = Vec::with_capacity(self.max_traitors.min(n).saturating_add(1));
        let mut log = self.broadcast(registry)?;
        for round in 1..=self.max_traitors {
            // nothing left to forward, all later rounds are empty as well
            let next = if log.is_empty() {
                ClosedRoundLog::quiet(round, n)
            } else {
                self.relay(registry, &log)?
            };
            rounds.push(std::mem::replace(&mut log, next));
        }
        rounds.push(log);
        Ok(Transcript { rounds })
    }

    /// Round 0: the commander sends its order to every lieutenant.
    fn broadcast(&self, registry: &mut Registry) -> Result<ClosedRoundLog, ProtocolError> {
        let log = OpenRoundLog::new(0, registry.num_lieutenants());
        let (commander, lieutenants) = registry.split_commander_mut();
        let order = commander.current_action();
        lieutenants
            .par_iter_mut()
            .enumerate()
            .for_each(|(index, lt)| {
                let mut rng = link_rng(self.seed, 0, commander.id(), lt.id());
                let sent = self.policy.transmit(commander, order, &mut rng);
                trace!("commander sends {sent} to {}", lt.id());
                lt.set_current_action(sent);
                log.deliver(index, [Message::originate(sent)]);
            });
        let log = log.seal()?;
        debug!("round 0: commander broadcast {} messages", log.len());
        Ok(log)
    }

    /// Round `prev.round() + 1`: every lieutenant forwards what it got in `prev`.
    fn relay(&self, registry: &Registry, prev: &ClosedRoundLog) -> Result<ClosedRoundLog, ProtocolError> {
        let round = prev.round() + 1;
        if round > self.max_traitors {
            return Err(ProtocolError::RoundOutOfRange {
                requested: round,
                last: self.max_traitors,
            });
        }
        let lieutenants = registry.lieutenants();
        let n = lieutenants.len();
        let log = OpenRoundLog::new(round, n);
        (0..n)
            .into_par_iter()
            .flat_map(|s| (0..n).into_par_iter().map(move |r| (s, r)))
            .filter(|(s, r)| s != r)
            .for_each(|(s, r)| {
                let sender = &lieutenants[s];
                let receiver = lieutenants[r].id();
                let mut rng = link_rng(self.seed, round, sender.id(), receiver);
                let batch = prev
                    .inbox_at(s)
                    .iter()
                    .filter(|msg| !msg.has_visited(receiver))
                    .map(|msg| {
                        let sent = self.policy.transmit(sender, msg.order(), &mut rng);
                        msg.relay(sender.id(), sent)
                    })
                    .collect::<Vec<_>>();
                trace!(
                    "round {round}: {} relays {} messages to {receiver}",
                    sender.id(),
                    batch.len()
                );
                log.deliver(r, batch);
            });
        let log = log.seal()?;
        debug!("round {round}: lieutenants relayed {} messages", log.len());
        Ok(log)
    }
}

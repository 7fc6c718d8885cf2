// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Byzantine Generals: parallel simulation of the OM(m) agreement protocol.
//!
//! A commander issues an order to `N` lieutenants. Over `m` relay rounds the
//! lieutenants forward everything they received to each other, while traitors
//! corrupt what they send. Finally every lieutenant decides by majority vote
//! over all messages addressed to it.
//!
//! The main entry points are [`configure`] and [`Simulation::run`].
//! Component data structures are defined in the submodules:
//! - [`registry`] holds the fixed set of participants.
//! - [`corruption`] decides what a (possibly traitorous) sender transmits.
//! - [`relay`] executes round 0 and the relay rounds into per-round logs.
//! - [`consensus`] turns the sealed logs into decisions.
//! - [`simulation`] ties everything together on a [`rayon`] worker pool.

#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod consensus;
pub mod corruption;
pub mod logging;
pub mod registry;
pub mod relay;
pub mod simulation;
pub mod types;

pub use self::config::{ConfigError, Scenario, SimulationConfig};
pub use self::corruption::CorruptionPolicy;
pub use self::registry::{COMMANDER_ID, Participant, Registry};
pub use self::relay::{Message, ProtocolError, Transcript};
pub use self::simulation::{Outcome, Simulation, configure};
pub use self::types::Action;

/// Participant ID number type.
///
/// The commander always has ID [`COMMANDER_ID`], lieutenants are numbered `1..=N`.
pub type ParticipantId = u64;

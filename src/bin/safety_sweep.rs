// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Monte-Carlo sweep over protocol configurations.
//!
//! Evaluates empirically whether the flattened relay protocol achieves
//! agreement and validity, both inside and outside the classical bound
//! `N >= 3m + 1`.
//!
//! For every corruption policy, number of lieutenants, round bound `m` and
//! number of traitors, many trials with randomly placed traitors are run in
//! parallel with [`rayon`]. The commander may be one of the traitors.
//! One CSV line per configuration is written to [`OUTPUT_FILE`].

use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use byzantine_generals::{Action, CorruptionPolicy, SimulationConfig, configure, logging};
use color_eyre::Result;
use log::{debug, info, warn};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Serialize;

/// Number of trials per configuration.
const TRIALS: usize = 2_000;
/// Largest number of lieutenants simulated.
const MAX_LIEUTENANTS: usize = 10;
/// Largest round bound simulated.
const MAX_ROUNDS: usize = 2;
const POLICIES: [CorruptionPolicy; 2] = [CorruptionPolicy::Flip, CorruptionPolicy::Random];
const OUTPUT_FILE: &str = "data/output/safety_sweep.csv";

#[derive(Debug, Serialize)]
struct SweepRecord {
    corruption: CorruptionPolicy,
    lieutenants: usize,
    max_traitors: usize,
    traitors: usize,
    within_bound: bool,
    agreement_rate: f64,
    validity_rate: Option<f64>,
}

/// Counters shared by all trials of one configuration.
#[derive(Debug, Default)]
struct Counters {
    agreements: AtomicUsize,
    loyal_commander_runs: AtomicUsize,
    valid_runs: AtomicUsize,
}

fn main() -> Result<()> {
    // enable fancy `color_eyre` error messages + `logforth` logging
    color_eyre::install()?;
    logging::enable_logforth_stderr();

    let path = PathBuf::from(OUTPUT_FILE);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_writer(File::create(&path)?);

    for corruption in POLICIES {
        for lieutenants in 1..=MAX_LIEUTENANTS {
            for max_traitors in 0..=MAX_ROUNDS.min(lieutenants) {
                for traitors in 0..=(max_traitors + 1).min(lieutenants + 1) {
                    let record = sweep(corruption, lieutenants, max_traitors, traitors)?;
                    if record.within_bound && record.agreement_rate < 1.0 {
                        warn!(
                            "{corruption}: n={lieutenants} m={max_traitors} t={traitors} \
                             disagreed within the classical bound ({:.3})",
                            record.agreement_rate
                        );
                    }
                    writer.serialize(record)?;
                }
            }
        }
        writer.flush()?;
        info!("finished {corruption} corruption");
    }
    info!("results written to {}", path.display());

    Ok(())
}

fn sweep(
    corruption: CorruptionPolicy,
    lieutenants: usize,
    max_traitors: usize,
    traitors: usize,
) -> Result<SweepRecord> {
    debug!("sweeping {corruption}: n={lieutenants} m={max_traitors} t={traitors}");
    let counters = Counters::default();
    (0..TRIALS).into_par_iter().try_for_each(|trial| {
        let seed = ((trial as u64) << 32) | ((lieutenants as u64) << 16) | traitors as u64;
        let mut rng = StdRng::seed_from_u64(seed);

        // place traitors uniformly among all participants, commander is 0
        let mut loyalty = vec![true; lieutenants + 1];
        for i in rand::seq::index::sample(&mut rng, lieutenants + 1, traitors).iter() {
            loyalty[i] = false;
        }
        let commander_loyal = loyalty[0];
        let order = if rng.random_bool(0.5) {
            Action::Attack
        } else {
            Action::Retreat
        };

        let config = SimulationConfig::new(lieutenants, max_traitors)
            .with_commander(commander_loyal, order)
            .with_loyalty(loyalty[1..].to_vec())
            .with_corruption(corruption)
            .with_seed(rng.random());
        let outcome = configure(config)?.run()?;

        if outcome.loyal_agreement {
            counters.agreements.fetch_add(1, Ordering::Relaxed);
        }
        if commander_loyal {
            counters.loyal_commander_runs.fetch_add(1, Ordering::Relaxed);
            let valid = outcome
                .decisions
                .iter()
                .filter(|(id, _)| loyalty[**id as usize])
                .all(|(_, decision)| *decision == order);
            if valid {
                counters.valid_runs.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok::<_, color_eyre::Report>(())
    })?;

    let loyal_commander_runs = counters.loyal_commander_runs.into_inner();
    Ok(SweepRecord {
        corruption,
        lieutenants,
        max_traitors,
        traitors,
        within_bound: lieutenants > 3 * max_traitors && traitors <= max_traitors,
        agreement_rate: counters.agreements.into_inner() as f64 / TRIALS as f64,
        validity_rate: (loyal_commander_runs > 0)
            .then(|| counters.valid_runs.into_inner() as f64 / loyal_commander_runs as f64),
    })
}

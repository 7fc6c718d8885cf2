// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Runs a single Byzantine Generals simulation and prints the result.
//!
//! The scenario can be loaded from a TOML file and/or given on the command line.
//! Command line flags take precedence over values from the file.

use std::path::PathBuf;
use std::time::Instant;

use byzantine_generals::logging::{self, DEFAULT_FILTER, VERBOSE_FILTER};
use byzantine_generals::{Action, CorruptionPolicy, ParticipantId, Scenario, configure};
use clap::Parser;
use color_eyre::Result;
use log::info;

#[derive(Debug, Parser)]
#[command(version, about = "Simulate the Byzantine Generals OM(m) protocol")]
struct Args {
    /// Scenario file (TOML) to start from.
    #[arg(short, long)]
    scenario: Option<PathBuf>,
    /// Number of lieutenants.
    #[arg(short = 'n', long)]
    lieutenants: Option<i64>,
    /// Number of relay rounds (maximum number of tolerated traitors).
    #[arg(short = 'm', long, allow_negative_numbers = true)]
    max_traitors: Option<i64>,
    /// Order issued by the commander.
    #[arg(short, long)]
    order: Option<Action>,
    /// Make the commander a traitor.
    #[arg(long)]
    traitor_commander: bool,
    /// Lieutenants that are traitors, e.g. `--traitors 2,5`.
    #[arg(short, long, value_delimiter = ',')]
    traitors: Option<Vec<ParticipantId>>,
    /// Probability of each lieutenant being loyal.
    #[arg(long)]
    loyal_fraction: Option<f64>,
    /// How traitors corrupt messages: `flip` or `random`.
    #[arg(short, long)]
    corruption: Option<CorruptionPolicy>,
    /// Seed for all random choices.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of worker threads, defaults to one per core.
    #[arg(short = 'j', long)]
    threads: Option<usize>,
    /// Print a JSON report instead of the status lines.
    #[arg(long)]
    json: bool,
    /// Log per-round details.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_scenario(self) -> Result<Scenario> {
        let mut scenario = match &self.scenario {
            Some(path) => Scenario::load(path)?,
            None => Scenario {
                lieutenants: 6,
                loyal_fraction: Some(0.7),
                ..Scenario::default()
            },
        };
        if let Some(n) = self.lieutenants {
            scenario.lieutenants = n;
        }
        if self.max_traitors.is_some() {
            scenario.max_traitors = self.max_traitors;
        }
        if self.order.is_some() {
            scenario.commander_order = self.order;
        }
        if self.traitor_commander {
            scenario.commander_loyal = Some(false);
        }
        if self.traitors.is_some() || self.loyal_fraction.is_some() {
            scenario.loyalty = None;
            scenario.traitors = self.traitors;
            scenario.loyal_fraction = self.loyal_fraction;
        }
        if let Some(corruption) = self.corruption {
            scenario.corruption = corruption;
        }
        scenario.seed = match self.seed {
            Some(seed) => seed,
            None if self.scenario.is_none() => rand::random(),
            None => scenario.seed,
        };
        if self.threads.is_some() {
            scenario.worker_threads = self.threads;
        }
        Ok(scenario)
    }
}

fn main() -> Result<()> {
    // enable fancy `color_eyre` error messages + `logforth` logging
    color_eyre::install()?;
    let args = Args::parse();
    logging::enable_logforth(if args.verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    });

    let json = args.json;
    let config = args.into_scenario()?.into_config()?;
    info!(
        "running with seed {} and {} corruption",
        config.seed, config.corruption
    );
    let mut simulation = configure(config)?;
    let start = Instant::now();
    let outcome = simulation.run()?;
    let elapsed = start.elapsed();

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.report())?);
        return Ok(());
    }

    let registry = simulation.registry();
    println!("=== Byzantine Generals Problem ===");
    println!("Number of traitors: {}", outcome.traitors);
    println!("Rounds executed: {}", outcome.rounds_executed);
    println!();
    for participant in registry.participants() {
        println!("{participant}");
    }
    println!();
    for (id, decision) in &outcome.decisions {
        println!("Lieutenant {id} decides {decision}");
    }
    if !outcome.loyal_agreement {
        println!("Loyal lieutenants disagree!");
    }
    println!();
    println!("Final Decision: {}", outcome.global_outcome);
    println!("Time taken: {:.3} ms", elapsed.as_secs_f64() * 1000.0);

    Ok(())
}

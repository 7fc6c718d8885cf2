// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging setup for the binaries.
//!
//! The library itself only emits records through the [`log`] facade.

use logforth::color::LevelColor;
use logforth::filter::EnvFilter;
use logforth::{Layout, append};

/// Filter used if `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "byzantine_generals=info,warn";
/// Filter used for verbose output if `RUST_LOG` is not set, includes per-round details.
pub const VERBOSE_FILTER: &str = "byzantine_generals=debug,info";

#[derive(Clone, Copy, Debug)]
struct MinimalLogforthLayout;

impl Layout for MinimalLogforthLayout {
    fn format(
        &self,
        record: &log::Record,
        _: &[Box<dyn logforth::Diagnostic>],
    ) -> anyhow::Result<Vec<u8>> {
        let colors = LevelColor::default();
        let level = colors.colorize_record_level(false, record.level());
        let message = record.args();
        Ok(format!("{level:>5} {message}").into_bytes())
    }
}

/// Installs a compact colored logger on stderr.
///
/// `default_filter` only applies if `RUST_LOG` is not set.
pub fn enable_logforth(default_filter: &str) {
    let append = append::Stderr::default().with_layout(MinimalLogforthLayout);
    enable_logforth_append(append, default_filter);
}

/// Installs a logger on stderr using logforth's default layout, including timestamps.
///
/// Used for long-running sweeps, where timing of log lines matters.
pub fn enable_logforth_stderr() {
    enable_logforth_append(append::Stderr::default(), DEFAULT_FILTER);
}

fn enable_logforth_append<A: logforth::Append>(to_append: A, default_filter: &str) {
    let filter = EnvFilter::from_default_env_or(default_filter);
    logforth::builder()
        .dispatch(|d| d.filter(filter).append(to_append))
        .apply();
}

#[cfg(test)]
mod tests {
    use log::{Level, debug, error, info, log_enabled, trace, warn};

    use super::*;

    #[test]
    fn basic() {
        enable_logforth(DEFAULT_FILTER);

        assert!(log_enabled!(Level::Error));
        assert!(log_enabled!(Level::Warn));

        trace!("trace");
        debug!("debug");
        info!("info");
        warn!("warn");
        error!("error");
    }
}

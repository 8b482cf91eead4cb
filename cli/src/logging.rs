//! # Logging for `timevault`
//!
//! Library events come from the `timevault_client` target, the binary's own
//! from `timevault`. By default both log at `info`: submissions, phase
//! transitions, rejected transactions and failed reads. Address derivation
//! and account fetches log at `debug`.
//!
//! `RUST_LOG` replaces the default filter entirely:
//!
//! - `RUST_LOG=timevault_client=debug` adds derivations and fetches;
//! - `RUST_LOG=warn` keeps only rejections and read failures;
//! - `RUST_LOG=timevault_client::cluster=trace` shows RPC traffic.
//!
//! Logs go to stderr. Stdout carries command output and notifications, so
//! `timevault status --log-format json > status.json` captures a clean
//! status document.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "timevault=info,timevault_client=info";

/// How log lines are rendered. `--log-format json` also switches `status`
/// output to JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, for a terminal.
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. Call once, first thing in `main`; a second
/// call panics.
pub fn init_logging(format: LogFormat) {
    let registry = tracing_subscriber::registry().with(filter(DEFAULT_FILTER));
    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .init(),
    }

    tracing::debug!(?format, "logging initialized");
}

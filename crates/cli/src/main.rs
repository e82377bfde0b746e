//! Foodloop walkthrough driver

use std::{future, io, process, time::Instant};

use humanize_duration::{Truncate, prelude::DurationExt};
use jiff::Timestamp;
use tracing::{error, info, warn};

use crate::{config::CliConfig, replay::Replay};

mod config;
mod observability;
mod replay;
mod report;
mod script;
mod shutdown;

/// Foodloop walkthrough driver entry point
#[tokio::main(flavor = "current_thread")]
pub async fn main() {
    // Load configuration from .env and CLI arguments
    let config = CliConfig::load().unwrap_or_else(|e| {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized yet, must use eprintln for config errors"
        )]
        {
            eprintln!("Configuration error: {e}");
        }

        process::exit(1);
    });

    if let Err(e) = observability::init(&config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging failed to initialize, must use eprintln"
        )]
        {
            eprintln!("Logging error: {e}");
        }

        process::exit(1);
    }

    let started = Instant::now();

    let (mut replay, script) = match Replay::load(&config, Timestamp::now()) {
        Ok(loaded) => loaded,
        Err(load_error) => {
            error!("failed to load walkthrough: {load_error}");

            process::exit(1);
        }
    };

    tokio::select! {
        result = replay.run(&script) => {
            if let Err(run_error) = result {
                error!("walkthrough failed: {run_error}");

                process::exit(1);
            }
        }
        () = interrupted() => {
            warn!("walkthrough interrupted");
        }
    }

    if let Err(report_error) = report::write(io::stdout().lock(), replay.controller(), replay.now())
    {
        error!("failed to write report: {report_error}");

        process::exit(1);
    }

    info!(
        rejected = replay.rejected(),
        elapsed = %started.elapsed().human(Truncate::Nano),
        "done"
    );
}

async fn interrupted() {
    if let Err(signal_error) = shutdown::listen().await {
        error!("failed to listen for shutdown signal: {signal_error}");

        future::pending::<()>().await;
    }
}

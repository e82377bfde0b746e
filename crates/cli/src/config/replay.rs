//! Replay Config

use std::path::PathBuf;

use clap::Args;

/// Walkthrough replay settings.
#[derive(Debug, Args)]
pub struct ReplayConfig {
    /// Walkthrough script YAML (defaults to the bundled walkthrough)
    #[arg(long, env = "FOODLOOP_SCRIPT")]
    pub script: Option<PathBuf>,

    /// Sleep through step delays instead of simulating them
    #[arg(long, env = "FOODLOOP_REALTIME", default_value_t = false)]
    pub realtime: bool,

    /// Seed for reproducible pickup codes (overrides the session config)
    #[arg(long, env = "FOODLOOP_SEED")]
    pub seed: Option<u64>,
}

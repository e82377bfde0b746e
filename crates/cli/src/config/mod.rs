//! Command line configuration

use std::path::PathBuf;

use clap::Parser;

use crate::config::{logging::LoggingConfig, replay::ReplayConfig};

pub(crate) mod logging;
pub(crate) mod replay;

pub(crate) use logging::LogFormat;

/// Foodloop walkthrough driver configuration
#[derive(Debug, Parser)]
#[command(name = "foodloop", about = "Replay a Foodloop session walkthrough", long_about = None)]
pub struct CliConfig {
    /// Deal catalog YAML (defaults to the bundled mock catalog)
    #[arg(short, long, env = "FOODLOOP_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Session tunables YAML (delays, pickup window, cart pricing)
    #[arg(short, long, env = "FOODLOOP_SESSION_CONFIG")]
    pub session_config: Option<PathBuf>,

    /// Replay settings.
    #[command(flatten)]
    pub replay: ReplayConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}

impl CliConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn defaults_replay_the_bundled_walkthrough() -> TestResult {
        let config = CliConfig::try_parse_from(["foodloop"])?;

        assert!(config.catalog.is_none());
        assert!(config.session_config.is_none());
        assert!(config.replay.script.is_none());
        assert!(!config.replay.realtime);
        assert!(matches!(config.logging.log_format, LogFormat::Compact));

        Ok(())
    }

    #[test]
    fn flags_override_defaults() -> TestResult {
        let config = CliConfig::try_parse_from([
            "foodloop",
            "--script",
            "walk.yml",
            "--realtime",
            "--seed",
            "7",
            "--log-format",
            "json",
        ])?;

        assert_eq!(config.replay.script, Some(PathBuf::from("walk.yml")));
        assert!(config.replay.realtime);
        assert_eq!(config.replay.seed, Some(7));
        assert!(matches!(config.logging.log_format, LogFormat::Json));

        Ok(())
    }
}

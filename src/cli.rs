//! CLI command implementations for Tessera.

pub(crate) mod clash;
pub(crate) mod replay;
pub(crate) mod run;
pub(crate) mod tournament;

mod output;

use std::error::Error;
use std::fmt;
use std::path::Path;

use clap::ValueEnum;
use tessera::EngineConfig;

/// Output format for `run`, `replay` and `clash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Output format for the `tournament` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum TournamentFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
    /// CSV format.
    Csv,
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<tessera::EngineError> for CliError {
    fn from(e: tessera::EngineError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON serialization failed: {e}"))
    }
}

/// Seed from the clock when none was given.
pub(crate) fn seed_or_clock(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() ^ u64::from(d.subsec_nanos()))
            .unwrap_or(42)
    })
}

/// Load a config file, or the defaults when none was given.
pub(crate) fn load_config(path: Option<&Path>) -> Result<EngineConfig, CliError> {
    match path {
        Some(path) => EngineConfig::load(path)
            .map_err(|e| CliError::new(format!("Failed to load {}: {e}", path.display()))),
        None => Ok(EngineConfig::default()),
    }
}

/// Print the default configuration as JSON.
pub(crate) fn print_default_config() -> Result<(), CliError> {
    println!("{}", EngineConfig::default().to_json()?);
    Ok(())
}

//! Application configuration
//!
//! Process-wide settings derived from the command line before any
//! subcommand runs.

use anyhow::Result;
use std::path::PathBuf;

/// Application configuration structure
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Working directory
    pub working_dir: PathBuf,
    /// Raise the log floor to debug regardless of `verbose`
    pub debug: bool,
}

impl AppConfig {
    /// Create a new application configuration
    pub fn new(verbose: u8) -> Result<Self> {
        let working_dir = std::env::current_dir()
            .map_err(|e| anyhow::anyhow!("Failed to get current directory: {}", e))?;

        Ok(Self {
            verbose,
            working_dir,
            debug: false,
        })
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Honour `CLAUDO_DEBUG`
    pub fn with_debug_from_env(self) -> Self {
        let debug = std::env::var("CLAUDO_DEBUG")
            .map(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(false);
        self.with_debug(debug)
    }

    /// Get the log level string based on verbosity.
    ///
    /// Logs share stderr with transcript diagnostics, so the quiet default
    /// only lets warnings through.
    pub fn log_level(&self) -> &'static str {
        match (self.verbose, self.debug) {
            (0, false) => "warn",
            (0, true) | (1, _) => "debug",
            _ => "trace",
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            working_dir: PathBuf::from("."),
            debug: false,
        }
    }
}

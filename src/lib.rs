//! # claudo
//!
//! Launches Claude agents and renders their `--output-format stream-json`
//! transcripts as a readable, live log.
//!
//! ## Usage
//!
//! ```bash
//! claude -p "..." --output-format stream-json --verbose | claudo parse --agent worker
//! claudo agent worker "fix the failing tests"
//! claudo follow --container claudo-worker
//! ```
//!
//! ## Modules
//!
//! - `app` - Logging setup, application configuration and fatal error reporting
//! - `cli` - Argument parsing and subcommand handlers
//! - `config` - `.claudo/config.toml` and `CLAUDO_*` environment settings
//! - `error` - Unified error type with stable codes
//! - `prompt` - Role prompts and execution context detection
//! - `subprocess` - Process supervision and the streaming transcript pipeline
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod prompt;
pub mod subprocess;

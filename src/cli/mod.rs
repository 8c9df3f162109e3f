//! CLI command handlers
//!
//! Argument parsing structures, command routing and the command
//! implementations themselves.

pub mod args;
pub mod commands;
pub mod router;

// Re-export the main CLI structures for convenience
pub use args::{Cli, Commands, RenderArgs};
pub use router::execute_command;

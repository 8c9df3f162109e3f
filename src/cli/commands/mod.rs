//! Command implementation modules
//!
//! Each subcommand is implemented in its own module.

pub mod agent;
pub mod follow;
pub mod parse;

pub use agent::{run_agent_command, AgentParams};
pub use follow::run_follow_command;
pub use parse::run_parse_command;

use crate::error::{ClaudoError, ErrorCode};

/// Exit status used when the operator interrupts a run
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

pub(crate) fn interrupted() -> ClaudoError {
    ClaudoError::execution_with_code(ErrorCode::EXEC_SIGNAL_RECEIVED, "interrupted", None)
        .with_exit_code(INTERRUPTED_EXIT_CODE)
}

//! Process supervision: spawning `claude`, `docker` and friends

pub mod builder;
pub mod claude;
pub mod error;
pub mod runner;
pub mod streaming;

#[cfg(test)]
mod tests;

pub use builder::ProcessCommandBuilder;
pub use claude::{AvailabilityCheck, ClaudeInvocation, VersionProbe};
pub use error::ProcessError;
pub use runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner, TokioProcessRunner};

use std::sync::Arc;

/// Entry point for running external commands
#[derive(Clone)]
pub struct SubprocessManager {
    runner: Arc<dyn ProcessRunner>,
    streaming: Arc<streaming::StreamingCommandRunner>,
}

impl SubprocessManager {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            streaming: Arc::new(streaming::StreamingCommandRunner::new()),
        }
    }

    pub fn production() -> Self {
        Self::new(Arc::new(TokioProcessRunner))
    }

    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }

    pub fn streaming(&self) -> &streaming::StreamingCommandRunner {
        &self.streaming
    }
}

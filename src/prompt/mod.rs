//! Role prompts for launched agents

pub mod context;
pub mod resolver;

pub use context::ExecutionContext;
pub use resolver::PromptResolver;

use crate::error::{ClaudoError, ErrorCode};
use std::fmt;
use std::str::FromStr;

/// The kinds of agent claudo can launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Plan,
    Worker,
    Critic,
    Oracle,
    Manager,
}

impl AgentRole {
    pub const ALL: [AgentRole; 5] = [
        AgentRole::Plan,
        AgentRole::Worker,
        AgentRole::Critic,
        AgentRole::Oracle,
        AgentRole::Manager,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Plan => "plan",
            AgentRole::Worker => "worker",
            AgentRole::Critic => "critic",
            AgentRole::Oracle => "oracle",
            AgentRole::Manager => "manager",
        }
    }

    /// File name of the role's default prompt; `plan` reads `planner.md`
    pub fn prompt_file(&self) -> String {
        match self {
            AgentRole::Plan => "planner.md".to_string(),
            other => format!("{}.md", other.as_str()),
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = ClaudoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| {
                ClaudoError::prompt_with_code(
                    ErrorCode::PROMPT_UNKNOWN_ROLE,
                    format!(
                        "unknown agent role '{}' (expected one of: plan, worker, critic, oracle, manager)",
                        s
                    ),
                    None,
                )
            })
    }
}

/// Combine a role prompt with the operator's task
pub fn compose_prompt(base: &str, task: &str) -> String {
    format!("{}\n\nTask: {}", base, task)
}

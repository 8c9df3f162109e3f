//! Locating and reading role prompts

use super::context::ExecutionContext;
use super::AgentRole;
use crate::error::{ClaudoError, ErrorCode};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PromptResolver {
    context: ExecutionContext,
    cwd: PathBuf,
    prompts_dir: PathBuf,
}

impl PromptResolver {
    pub fn new(context: ExecutionContext, cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        let prompts_dir = context.prompts_dir(&cwd);
        Self {
            context,
            cwd,
            prompts_dir,
        }
    }

    /// Look for default prompts somewhere other than `<workdir>/prompts`
    pub fn with_prompts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompts_dir = dir.into();
        self
    }

    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    pub fn prompts_dir(&self) -> &Path {
        &self.prompts_dir
    }

    /// Read the prompt for `role`.
    ///
    /// An override that exists wins. A missing override is reported and the
    /// role's default prompt is used instead; if that is missing too the
    /// result is a not-found error.
    pub fn resolve(
        &self,
        role: AgentRole,
        override_path: Option<&Path>,
    ) -> Result<String, ClaudoError> {
        if let Some(requested) = override_path {
            if let Some(prompt) = self.read_override(requested) {
                return Ok(prompt);
            }
            tracing::warn!(
                "Custom prompt file not found: {}; falling back to the default {} prompt",
                requested.display(),
                role
            );
        }
        self.read_default(role)
    }

    fn override_candidates(&self, requested: &Path) -> Vec<PathBuf> {
        if requested.is_absolute() {
            return vec![requested.to_path_buf()];
        }
        let mut candidates = vec![self.context.working_dir(&self.cwd).join(requested)];
        if self.context == ExecutionContext::Docker {
            candidates.push(self.cwd.join(requested));
        }
        candidates
    }

    fn read_override(&self, requested: &Path) -> Option<String> {
        for candidate in self.override_candidates(requested) {
            if !candidate.is_file() {
                continue;
            }
            match std::fs::read_to_string(&candidate) {
                Ok(prompt) => {
                    tracing::debug!("Using custom prompt {}", candidate.display());
                    return Some(prompt);
                }
                Err(e) => {
                    tracing::error!(
                        "Error reading custom prompt file {}: {}",
                        candidate.display(),
                        e
                    );
                }
            }
        }
        None
    }

    fn read_default(&self, role: AgentRole) -> Result<String, ClaudoError> {
        let path = self.prompts_dir.join(role.prompt_file());
        if !path.is_file() {
            return Err(ClaudoError::prompt_not_found(path));
        }
        std::fs::read_to_string(&path).map_err(|e| {
            ClaudoError::prompt_with_code(
                ErrorCode::PROMPT_UNREADABLE,
                format!("Error reading default prompt file: {}", e),
                Some(path.clone()),
            )
            .with_source(e)
        })
    }
}

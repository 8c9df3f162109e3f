//! Where claudo is running: directly on the host or inside its container

use std::fmt;
use std::path::{Path, PathBuf};

/// Mount point of the project inside the agent container
pub const CONTAINER_WORKSPACE: &str = "/workspace";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    Native,
    Docker,
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionContext::Native => write!(f, "native"),
            ExecutionContext::Docker => write!(f, "docker"),
        }
    }
}

impl ExecutionContext {
    /// Detect from the filesystem and the current directory
    pub fn detect() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::detect_from(Path::new("/.dockerenv").exists(), &cwd)
    }

    pub fn detect_from(dockerenv_exists: bool, cwd: &Path) -> Self {
        if dockerenv_exists || cwd == Path::new(CONTAINER_WORKSPACE) {
            ExecutionContext::Docker
        } else {
            ExecutionContext::Native
        }
    }

    /// Directory that relative paths are resolved against
    pub fn working_dir(&self, cwd: &Path) -> PathBuf {
        match self {
            ExecutionContext::Docker => PathBuf::from(CONTAINER_WORKSPACE),
            ExecutionContext::Native => cwd.to_path_buf(),
        }
    }

    /// Directory holding the default role prompts
    pub fn prompts_dir(&self, cwd: &Path) -> PathBuf {
        self.working_dir(cwd).join("prompts")
    }
}

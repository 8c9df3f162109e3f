//! Building the `claude` invocation for a launched agent

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::builder::ProcessCommandBuilder;
use super::error::ProcessError;
use super::runner::{ProcessCommand, ProcessRunner};
use crate::prompt::context::CONTAINER_WORKSPACE;
use crate::prompt::ExecutionContext;

/// Home directory of the user inside the agent image
const CONTAINER_HOME: &str = "/home/node";

/// Files from `~/.claude` mounted read-only into the container
const CREDENTIAL_FILES: [&str; 2] = [".credentials.json", "settings.json"];

/// One `claude -p` run producing `stream-json` on stdout
#[derive(Debug, Clone)]
pub struct ClaudeInvocation {
    pub prompt: String,
    pub model: String,
    pub extra_args: Vec<String>,
    pub context: ExecutionContext,
    pub image: String,
    pub project_dir: PathBuf,
    pub home_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl ClaudeInvocation {
    pub fn new(prompt: impl Into<String>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompt: prompt.into(),
            model: crate::config::DEFAULT_MODEL.to_string(),
            extra_args: Vec::new(),
            context: ExecutionContext::Native,
            image: crate::config::DEFAULT_IMAGE.to_string(),
            project_dir: project_dir.into(),
            home_dir: dirs::home_dir(),
            timeout: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_home_dir(mut self, home: Option<PathBuf>) -> Self {
        self.home_dir = home;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments passed to `claude` itself
    pub fn claude_args(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.prompt.clone(),
            "--dangerously-skip-permissions".to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
            "--model".to_string(),
            self.model.clone(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    pub fn command(&self) -> ProcessCommand {
        let builder = match self.context {
            ExecutionContext::Native => ProcessCommandBuilder::new("claude")
                .args(self.claude_args())
                .current_dir(&self.project_dir),
            ExecutionContext::Docker => self.docker_builder(),
        };
        match self.timeout {
            Some(timeout) => builder.timeout(timeout).build(),
            None => builder.build(),
        }
    }

    fn docker_builder(&self) -> ProcessCommandBuilder {
        let mut builder = ProcessCommandBuilder::new("docker")
            .args(["run", "--rm", "-i"])
            .volume(&self.project_dir, Path::new(CONTAINER_WORKSPACE), false);

        if let Some(home) = &self.home_dir {
            for file in CREDENTIAL_FILES {
                let host = home.join(".claude").join(file);
                if host.exists() {
                    let guest = Path::new(CONTAINER_HOME).join(".claude").join(file);
                    builder = builder.volume(&host, &guest, true);
                } else {
                    tracing::debug!("Not mounting missing {}", host.display());
                }
            }
        }

        builder
            .args(["-w", CONTAINER_WORKSPACE])
            .arg(&self.image)
            .arg("claude")
            .args(self.claude_args())
    }
}

/// Whether `program` can be started at all
#[async_trait]
pub trait AvailabilityCheck: Send + Sync {
    async fn is_available(&self, program: &str) -> Result<bool, ProcessError>;
}

pub struct VersionProbe {
    runner: Arc<dyn ProcessRunner>,
}

impl VersionProbe {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl AvailabilityCheck for VersionProbe {
    async fn is_available(&self, program: &str) -> Result<bool, ProcessError> {
        let result = self
            .runner
            .run(
                ProcessCommandBuilder::new(program)
                    .arg("--version")
                    .timeout(Duration::from_secs(10))
                    .build(),
            )
            .await;

        match result {
            Ok(output) => Ok(output.status.success()),
            Err(ProcessError::CommandNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

//! `claudo agent`: launch a role agent and render what it does

use crate::app::AppConfig;
use crate::cli::args::RenderArgs;
use crate::config::ClaudoConfig;
use crate::error::{ClaudoError, ErrorCode};
use crate::prompt::{compose_prompt, AgentRole, ExecutionContext, PromptResolver};
use crate::subprocess::streaming::{StreamParser, TranscriptSession};
use crate::subprocess::{AvailabilityCheck, ClaudeInvocation, SubprocessManager, VersionProbe};
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Parameters for `claudo agent`
#[derive(Debug, Clone, Default)]
pub struct AgentParams {
    pub role: String,
    pub task: Vec<String>,
    pub prompt_file: Option<PathBuf>,
    pub docker: bool,
    pub native: bool,
    pub model: Option<String>,
    pub image: Option<String>,
    pub timeout: Option<u64>,
    pub render: RenderArgs,
}

impl AgentParams {
    /// Where the agent runs. Defaults to the container, unless claudo is
    /// already inside one.
    pub fn launch_context(&self, detected: ExecutionContext) -> ExecutionContext {
        if self.native {
            ExecutionContext::Native
        } else if self.docker {
            ExecutionContext::Docker
        } else {
            match detected {
                ExecutionContext::Docker => ExecutionContext::Native,
                ExecutionContext::Native => ExecutionContext::Docker,
            }
        }
    }
}

pub async fn run_agent_command(params: AgentParams, app: &AppConfig) -> Result<()> {
    let role: AgentRole = params.role.parse()?;
    let task = params.task.join(" ");
    if task.trim().is_empty() {
        return Err(ClaudoError::config_with_code(
            ErrorCode::CONFIG_INVALID_VALUE,
            "a task for the agent is required",
        )
        .into());
    }

    let config = ClaudoConfig::load(&app.working_dir)?;
    let detected = ExecutionContext::detect();
    let launch = params.launch_context(detected);
    debug!("Running in {} context, launching {} agent", detected, launch);

    let mut resolver = PromptResolver::new(detected, &app.working_dir);
    if let Some(dir) = &config.agent.prompts_dir {
        resolver = resolver.with_prompts_dir(dir.clone());
    }
    let base = resolver.resolve(role, params.prompt_file.as_deref())?;

    let invocation = ClaudeInvocation::new(compose_prompt(&base, &task), &app.working_dir)
        .with_model(params.model.as_deref().unwrap_or(config.model()))
        .with_image(params.image.as_deref().unwrap_or(config.image()))
        .with_extra_args(config.extra_args()?)
        .with_context(launch)
        .with_timeout(
            params
                .timeout
                .or(config.agent.timeout_secs)
                .map(Duration::from_secs),
        );
    let command = invocation.command();

    let subprocess = SubprocessManager::production();
    let probe = VersionProbe::new(subprocess.runner());
    if !probe
        .is_available(&command.program)
        .await
        .map_err(ClaudoError::from)?
    {
        return Err(ClaudoError::execution_with_code(
            ErrorCode::EXEC_COMMAND_NOT_FOUND,
            "not installed or not on PATH",
            Some(command.program.clone()),
        )
        .into());
    }

    let agent_name = params
        .render
        .agent
        .clone()
        .unwrap_or_else(|| role.to_string());
    let parser_config = params
        .render
        .apply(config.parser_config(Some(&agent_name)));
    let session = TranscriptSession::start(StreamParser::new(parser_config)?);

    info!("Launching {} agent with {}", role, command.program);
    let run = subprocess.streaming().run_streaming(command, &session);
    let outcome = tokio::select! {
        result = run => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    session.teardown().await;

    let output = match outcome {
        None => return Err(super::interrupted().into()),
        Some(result) => result.map_err(ClaudoError::from)?,
    };

    if output.timed_out {
        return Err(ClaudoError::execution_with_code(
            ErrorCode::EXEC_TIMEOUT,
            format!("{} agent timed out after {:.0?}", role, output.duration),
            None,
        )
        .into());
    }
    match output.exit_code {
        Some(0) => Ok(()),
        Some(code) => Err(ClaudoError::execution_with_code(
            ErrorCode::EXEC_SUBPROCESS_FAILED,
            format!("{} agent exited with code {}", role, code),
            None,
        )
        .with_exit_code(code)
        .into()),
        None => Err(ClaudoError::execution_with_code(
            ErrorCode::EXEC_SIGNAL_RECEIVED,
            format!("{} agent was killed by a signal", role),
            None,
        )
        .into()),
    }
}

//! Command routing and execution
//!
//! This module routes parsed CLI commands to their implementations.

use crate::app::AppConfig;
use crate::cli::args::{Commands, RenderArgs};
use crate::cli::commands::*;
use crate::subprocess::streaming::FollowSource;
use anyhow::Result;

/// Execute a CLI command based on the parsed arguments.
///
/// With no subcommand, stdin is rendered as if `parse` had been given.
pub async fn execute_command(command: Option<Commands>, app: &AppConfig) -> Result<()> {
    match command {
        Some(Commands::Parse { render }) => run_parse_command(render, app).await,
        Some(Commands::Agent {
            role,
            task,
            prompt_file,
            docker,
            native,
            model,
            image,
            timeout,
            render,
        }) => {
            let params = AgentParams {
                role,
                task,
                prompt_file,
                docker,
                native,
                model,
                image,
                timeout,
                render,
            };
            run_agent_command(params, app).await
        }
        Some(Commands::Follow {
            container,
            file,
            render,
        }) => {
            let source = match (container, file) {
                (Some(name), _) => FollowSource::Container(name),
                (None, Some(path)) => FollowSource::File(path),
                (None, None) => {
                    return Err(crate::error::ClaudoError::config(
                        "follow needs --container or --file",
                    )
                    .into())
                }
            };
            run_follow_command(source, render, app).await
        }
        None => run_parse_command(RenderArgs::default(), app).await,
    }
}

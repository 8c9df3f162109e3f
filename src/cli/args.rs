//! CLI argument structures
//!
//! This module defines the command-line interface of claudo: the main
//! `Cli` structure and its subcommands.

use crate::subprocess::streaming::{OutputDestination, ParserConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Render Claude agent transcripts as they stream
#[derive(Parser)]
#[command(name = "claudo")]
#[command(about = "claudo - Launch Claude agents and render their stream-json transcripts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a stream-json transcript read from stdin
    #[command(name = "parse")]
    Parse {
        #[command(flatten)]
        render: RenderArgs,
    },

    /// Launch an agent and render its transcript
    #[command(name = "agent")]
    Agent {
        /// Agent role: plan, worker, critic, oracle or manager
        role: String,

        /// Task for the agent
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,

        /// Use this prompt file instead of the role's default
        #[arg(long, value_name = "FILE")]
        prompt_file: Option<PathBuf>,

        /// Run the agent inside the claudo container
        #[arg(long, conflicts_with = "native")]
        docker: bool,

        /// Run the agent directly on this machine
        #[arg(long)]
        native: bool,

        /// Model passed to claude
        #[arg(long)]
        model: Option<String>,

        /// Container image for --docker
        #[arg(long)]
        image: Option<String>,

        /// Kill the agent after this many seconds
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Follow a transcript being written by a container or to a file
    #[command(name = "follow")]
    Follow {
        /// Container whose logs to follow
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        container: Option<String>,

        /// Transcript file to follow
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,

        #[command(flatten)]
        render: RenderArgs,
    },
}

/// Transcript rendering flags shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct RenderArgs {
    /// Label shown on tool lines
    #[arg(long)]
    pub agent: Option<String>,

    /// Disable ANSI colors
    #[arg(long)]
    pub no_color: bool,

    /// Drop lines that are not valid JSON instead of echoing them
    #[arg(long)]
    pub no_fallback: bool,

    /// Report decode errors and end-of-stream statistics
    #[arg(long)]
    pub verbose_parse: bool,

    /// Truncate text blocks longer than this many characters
    #[arg(long, value_name = "CHARS")]
    pub max_text_length: Option<usize>,

    /// Write the transcript to this file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

impl RenderArgs {
    /// Apply the flags that were given on top of `config`
    pub fn apply(&self, mut config: ParserConfig) -> ParserConfig {
        if let Some(agent) = &self.agent {
            config.agent_name = agent.clone();
        }
        if self.no_color {
            config = config.with_color(false);
        }
        if self.no_fallback {
            config = config.with_fallback_to_raw(false);
        }
        if self.verbose_parse {
            config = config.with_verbose_diagnostics(true);
        }
        if let Some(max) = self.max_text_length {
            config = config.with_max_text_length(max);
        }
        if let Some(path) = &self.output {
            config = config.with_output(OutputDestination::File(path.clone()));
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "claudo",
            "-v",
            "parse",
            "--agent",
            "worker",
            "--no-color",
            "--max-text-length",
            "20",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Some(Commands::Parse { render }) = cli.command else {
            panic!("expected parse");
        };
        let config = render.apply(ParserConfig::default());
        assert_eq!(config.agent_name, "worker");
        assert_eq!(config.use_color, Some(false));
        assert_eq!(config.max_text_length, 20);
        assert!(config.fallback_to_raw);
    }

    #[test]
    fn test_agent_task_words() {
        let cli = Cli::try_parse_from([
            "claudo", "agent", "worker", "fix", "the", "tests", "--native",
        ])
        .unwrap();
        let Some(Commands::Agent {
            role, task, native, ..
        }) = cli.command
        else {
            panic!("expected agent");
        };
        assert_eq!(role, "worker");
        assert!(native);
        assert_eq!(task, vec!["fix", "the", "tests"]);
    }

    #[test]
    fn test_docker_and_native_conflict() {
        let both = ["claudo", "agent", "plan", "x", "--docker", "--native"];
        assert!(Cli::try_parse_from(both).is_err());
    }

    #[test]
    fn test_follow_requires_a_source() {
        assert!(Cli::try_parse_from(["claudo", "follow"]).is_err());
        let both = ["claudo", "follow", "--container", "a", "--file", "b"];
        assert!(Cli::try_parse_from(both).is_err());
        assert!(Cli::try_parse_from(["claudo", "follow", "--file", "t.jsonl"]).is_ok());
    }
}

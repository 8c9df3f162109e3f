//! `claudo parse`: render a transcript piped in on stdin

use crate::app::AppConfig;
use crate::cli::args::RenderArgs;
use crate::config::ClaudoConfig;
use crate::error::ClaudoError;
use crate::subprocess::streaming::{StreamParser, TranscriptSession};
use anyhow::Result;
use tracing::debug;

pub async fn run_parse_command(render: RenderArgs, app: &AppConfig) -> Result<()> {
    let config = ClaudoConfig::load(&app.working_dir)?;
    let parser_config = render.apply(config.parser_config(None));
    let parser = StreamParser::new(parser_config)?;
    let session = TranscriptSession::start(parser);

    let outcome = tokio::select! {
        result = session.consume(tokio::io::stdin()) => {
            result
                .map(|bytes| debug!("stdin closed after {} bytes", bytes))
                .map_err(|e| {
                    ClaudoError::other("failed to read transcript from stdin")
                        .with_source(e)
                        .into()
                })
        }
        _ = tokio::signal::ctrl_c() => Err(super::interrupted().into()),
    };

    // Statistics are reported even when interrupted
    let stats = session.teardown().await;
    debug!(
        "Rendered {} lines ({} decode errors)",
        stats.lines, stats.errors
    );
    outcome
}

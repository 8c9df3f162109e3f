//! `claudo follow`: render a transcript another process is producing

use crate::app::AppConfig;
use crate::cli::args::RenderArgs;
use crate::config::ClaudoConfig;
use crate::error::{ClaudoError, ErrorCode};
use crate::subprocess::streaming::{
    FeedSupervisor, FollowEvent, FollowSource, LogFollower, StreamParser, TranscriptSession,
};
use anyhow::Result;
use tokio::sync::mpsc;
use tracing::debug;

pub async fn run_follow_command(
    source: FollowSource,
    render: RenderArgs,
    app: &AppConfig,
) -> Result<()> {
    let config = ClaudoConfig::load(&app.working_dir)?;
    let parser_config = render.apply(config.parser_config(None));
    let check_interval = parser_config.health_check_interval;
    let parser = StreamParser::new(parser_config)?;

    let (follower, mut events) = LogFollower::new(source.clone());
    follower.start().await.map_err(ClaudoError::from)?;
    let supervisor: std::sync::Arc<dyn FeedSupervisor> = follower.clone();
    let session = TranscriptSession::start_supervised(parser, supervisor);

    let mut ticker = tokio::time::interval(check_interval);
    ticker.tick().await;

    let outcome: Result<()> = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(FollowEvent::Data(chunk)) => session.feed(&chunk).await,
                Some(FollowEvent::ContainerMissing(line)) => {
                    session.warn(&line).await;
                    break Err(container_missing(&source).into());
                }
                None => break Ok(()),
            },
            _ = ticker.tick() => {
                if !follower.is_alive().await && session.restarts_exhausted().await {
                    debug!("{} is gone and will not be restarted", follower.describe());
                    break Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => break Err(super::interrupted().into()),
        }
    };

    follower.shutdown().await;
    drain_pending(&mut events, &session).await;
    session.finish().await;
    session.teardown().await;
    outcome
}

/// Render whatever the follower delivered before it stopped
async fn drain_pending(events: &mut mpsc::Receiver<FollowEvent>, session: &TranscriptSession) {
    while let Ok(event) = events.try_recv() {
        if let FollowEvent::Data(chunk) = event {
            session.feed(&chunk).await;
        }
    }
}

fn container_missing(source: &FollowSource) -> ClaudoError {
    let name = match source {
        FollowSource::Container(name) => name.clone(),
        FollowSource::File(path) => path.display().to_string(),
    };
    ClaudoError::execution_with_code(
        ErrorCode::EXEC_CONTAINER_NOT_FOUND,
        format!("no such container: {}", name),
        Some("docker logs".to_string()),
    )
}

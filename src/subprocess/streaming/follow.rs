//! Following a transcript that another process is writing
//!
//! The follower runs `docker logs -f` (container) or `tail -f` (file) and
//! forwards stdout chunks over a channel. When the health timer finds the
//! follower dead it is restarted from the last data it forwarded rather
//! than from the beginning. A file resumes at the exact byte offset; a
//! container resumes one second before the last chunk, so a few lines
//! may repeat but none are skipped.

use super::health::FeedSupervisor;
use crate::subprocess::{ProcessCommand, ProcessCommandBuilder, ProcessError};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, Mutex};

const CHANNEL_CAPACITY: usize = 256;
const READ_CHUNK_SIZE: usize = 8192;
const RESUME_OVERLAP_SECS: i64 = 1;

/// What is being followed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowSource {
    Container(String),
    File(PathBuf),
}

/// Delivered to whoever drains the follower
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowEvent {
    Data(Vec<u8>),
    /// The container does not exist; restarting will not help
    ContainerMissing(String),
}

/// How far the follower got, updated by the stdout pump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedProgress {
    /// Bytes forwarded across every follower run
    pub bytes: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub last_chunk_at: Option<DateTime<Utc>>,
}

impl FeedProgress {
    /// Timestamp to pass to `docker logs --since` on restart
    pub fn resume_since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let last = self.last_chunk_at.or(self.started_at).unwrap_or(now);
        last - ChronoDuration::seconds(RESUME_OVERLAP_SECS)
    }
}

pub struct LogFollower {
    source: FollowSource,
    tx: mpsc::Sender<FollowEvent>,
    child: Mutex<Option<Child>>,
    progress: Arc<Mutex<FeedProgress>>,
    shutdown: AtomicBool,
}

impl LogFollower {
    pub fn new(source: FollowSource) -> (Arc<Self>, mpsc::Receiver<FollowEvent>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let follower = Arc::new(Self {
            source,
            tx,
            child: Mutex::new(None),
            progress: Arc::new(Mutex::new(FeedProgress::default())),
            shutdown: AtomicBool::new(false),
        });
        (follower, rx)
    }

    pub fn source(&self) -> &FollowSource {
        &self.source
    }

    /// Command that follows from the very beginning
    pub fn initial_command(&self) -> ProcessCommand {
        match &self.source {
            FollowSource::Container(name) => ProcessCommandBuilder::new("docker")
                .args(["logs", "-f", name.as_str()])
                .build(),
            FollowSource::File(path) => ProcessCommandBuilder::new("tail")
                .args(["-n", "+1", "-f"])
                .arg(&path.to_string_lossy())
                .build(),
        }
    }

    /// Command that resumes from `progress` after the previous follower exited
    pub fn resume_command(&self, progress: &FeedProgress, now: DateTime<Utc>) -> ProcessCommand {
        match &self.source {
            FollowSource::Container(name) => ProcessCommandBuilder::new("docker")
                .args(["logs", "-f", "--since"])
                .arg(
                    &progress
                        .resume_since(now)
                        .to_rfc3339_opts(SecondsFormat::Secs, true),
                )
                .arg(name)
                .build(),
            FollowSource::File(path) => ProcessCommandBuilder::new("tail")
                .arg("-c")
                .arg(&format!("+{}", progress.bytes + 1))
                .arg("-f")
                .arg(&path.to_string_lossy())
                .build(),
        }
    }

    pub async fn progress(&self) -> FeedProgress {
        *self.progress.lock().await
    }

    pub async fn start(&self) -> Result<(), ProcessError> {
        self.progress.lock().await.started_at = Some(Utc::now());
        self.spawn(self.initial_command()).await
    }

    async fn spawn(&self, command: ProcessCommand) -> Result<(), ProcessError> {
        command.log_start();
        let mut cmd = command.to_tokio();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| ProcessError::from_spawn(&command.program, e))?;

        if let Some(mut stdout) = child.stdout.take() {
            let tx = self.tx.clone();
            let progress = Arc::clone(&self.progress);
            tokio::spawn(async move {
                let mut buf = vec![0u8; READ_CHUNK_SIZE];
                loop {
                    match stdout.read(&mut buf).await {
                        Ok(0) => break,
                        Ok(n) => {
                            {
                                let mut progress = progress.lock().await;
                                progress.bytes += n as u64;
                                progress.last_chunk_at = Some(Utc::now());
                            }
                            if tx.send(FollowEvent::Data(buf[..n].to_vec())).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::debug!("Follower stdout closed: {}", e);
                            break;
                        }
                    }
                }
            });
        }

        if let Some(stderr) = child.stderr.take() {
            let tx = self.tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.contains("No such container") {
                        let _ = tx.send(FollowEvent::ContainerMissing(line)).await;
                    } else if !line.trim().is_empty() {
                        tracing::warn!(target: "claudo::upstream", "{}", line);
                    }
                }
            });
        }

        *self.child.lock().await = Some(child);
        Ok(())
    }

    /// Stop following; the health timer will not restart it afterwards
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let mut slot = self.child.lock().await;
        if let Some(child) = slot.as_mut() {
            if let Err(e) = child.kill().await {
                tracing::debug!("Follower already gone: {}", e);
            }
        }
        *slot = None;
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSupervisor for LogFollower {
    async fn is_alive(&self) -> bool {
        let mut slot = self.child.lock().await;
        let Some(child) = slot.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                tracing::debug!("Follower exited with {}", status);
                *slot = None;
                false
            }
            Err(e) => {
                tracing::debug!("Could not poll follower: {}", e);
                false
            }
        }
    }

    async fn needs_restart(&self) -> bool {
        !self.is_shutting_down() && !self.is_alive().await
    }

    async fn restart(&self) -> anyhow::Result<()> {
        let progress = self.progress().await;
        let command = self.resume_command(&progress, Utc::now());
        if let FollowSource::Container(_) = self.source {
            tracing::info!(
                "Restarting follower: {} (lines from the last {}s may repeat)",
                command.display(),
                RESUME_OVERLAP_SECS
            );
        } else {
            tracing::info!("Restarting follower: {}", command.display());
        }
        self.spawn(command).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.source {
            FollowSource::Container(name) => format!("Log follower for container {}", name),
            FollowSource::File(path) => format!("Log follower for {}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_container_commands() {
        let (follower, _rx) = LogFollower::new(FollowSource::Container("claudo-worker".into()));
        assert_eq!(follower.initial_command().display(), "docker logs -f claudo-worker");

        let progress = FeedProgress {
            bytes: 4096,
            started_at: Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()),
            last_chunk_at: Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap()),
        };
        let polled_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(
            follower.resume_command(&progress, polled_at).args,
            vec!["logs", "-f", "--since", "2026-03-01T12:29:59Z", "claudo-worker"]
        );
    }

    #[test]
    fn test_resume_since_falls_back_to_start() {
        let started = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 10, 0).unwrap();
        let silent = FeedProgress {
            started_at: Some(started),
            ..Default::default()
        };
        assert_eq!(silent.resume_since(now), started - ChronoDuration::seconds(1));
        assert_eq!(
            FeedProgress::default().resume_since(now),
            now - ChronoDuration::seconds(1)
        );
    }

    #[test]
    fn test_file_commands() {
        let (follower, _rx) =
            LogFollower::new(FollowSource::File(PathBuf::from("/tmp/agent.log")));
        assert_eq!(follower.initial_command().args, vec!["-n", "+1", "-f", "/tmp/agent.log"]);

        let progress = FeedProgress {
            bytes: 42,
            ..Default::default()
        };
        assert_eq!(
            follower.resume_command(&progress, Utc::now()).args,
            vec!["-c", "+43", "-f", "/tmp/agent.log"]
        );
    }

    #[tokio::test]
    async fn test_not_started_follower_is_dead() {
        let (follower, _rx) = LogFollower::new(FollowSource::File(PathBuf::from("/nonexistent")));
        assert!(!follower.is_alive().await);
        assert!(follower.needs_restart().await);

        follower.shutdown().await;
        assert!(!follower.needs_restart().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_follows_existing_file_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("transcript.jsonl");
        std::fs::write(&path, "{\"type\":\"system\"}\n").unwrap();

        let (follower, mut rx) = LogFollower::new(FollowSource::File(path));
        follower.start().await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, FollowEvent::Data(b"{\"type\":\"system\"}\n".to_vec()));
        assert!(follower.is_alive().await);

        follower.shutdown().await;
        assert!(!follower.is_alive().await);
        assert!(!follower.needs_restart().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_restart_picks_up_lines_written_while_dead() {
        use std::io::Write;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("transcript.jsonl");
        std::fs::write(&path, "first\n").unwrap();

        let (follower, mut rx) = LogFollower::new(FollowSource::File(path.clone()));
        follower.start().await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, FollowEvent::Data(b"first\n".to_vec()));
        assert_eq!(follower.progress().await.bytes, 6);

        if let Some(child) = follower.child.lock().await.as_mut() {
            child.kill().await.unwrap();
        }
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"second\n")
            .unwrap();

        assert!(follower.needs_restart().await);
        follower.restart().await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, FollowEvent::Data(b"second\n".to_vec()));

        follower.shutdown().await;
    }
}

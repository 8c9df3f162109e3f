//! Stall detection for a transcript stream
//!
//! The monitor only observes. A slow upstream (a long tool run) looks the
//! same as a dead one from here, so a stall produces a warning and nothing
//! else. Restarting a dead feed is left to a [`FeedSupervisor`].

use super::sink::SinkActivity;
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Something that owns the upstream feed and can bring it back
#[async_trait]
pub trait FeedSupervisor: Send + Sync {
    /// Whether the upstream process is still running
    async fn is_alive(&self) -> bool;

    /// Whether the feed stopped without being asked to
    async fn needs_restart(&self) -> bool {
        !self.is_alive().await
    }

    /// Start the feed again, resuming where it left off
    async fn restart(&self) -> anyhow::Result<()>;

    /// Human-readable name used in warnings
    fn describe(&self) -> String;
}

/// Result of one health check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    /// Silent for longer than the threshold. `first_report` is true only
    /// on the first check of a stall episode.
    Stalled {
        silent_for: Duration,
        first_report: bool,
    },
}

#[derive(Debug)]
pub struct StreamHealthMonitor {
    threshold: Duration,
    started_at: Instant,
    in_stall: bool,
    stalls: u64,
    restarts: u32,
    max_restarts: u32,
}

impl StreamHealthMonitor {
    pub fn new(threshold: Duration, max_restarts: u32) -> Self {
        Self::starting_at(threshold, max_restarts, Instant::now())
    }

    pub fn starting_at(threshold: Duration, max_restarts: u32, started_at: Instant) -> Self {
        Self {
            threshold,
            started_at,
            in_stall: false,
            stalls: 0,
            restarts: 0,
            max_restarts,
        }
    }

    /// Compare `now` against the sink's last transcript write.
    ///
    /// Notices (including the stall warning itself) are not transcript
    /// activity. Before anything has been written, silence is measured
    /// from when the monitor started.
    pub fn check(&mut self, now: Instant, activity: &SinkActivity) -> HealthStatus {
        let last = activity.last_transcript.unwrap_or(self.started_at);
        let silent_for = now.saturating_duration_since(last);

        if silent_for <= self.threshold {
            if self.in_stall {
                tracing::debug!("Output resumed after stall");
            }
            self.in_stall = false;
            return HealthStatus::Healthy;
        }

        let first_report = !self.in_stall;
        if first_report {
            self.in_stall = true;
            self.stalls += 1;
            tracing::debug!("Stream stalled for {:?}", silent_for);
        }
        HealthStatus::Stalled {
            silent_for,
            first_report,
        }
    }

    pub fn stalls(&self) -> u64 {
        self.stalls
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    pub fn max_restarts(&self) -> u32 {
        self.max_restarts
    }

    /// Claim one restart attempt; `false` once the budget is spent
    pub fn try_claim_restart(&mut self) -> bool {
        if self.restarts >= self.max_restarts {
            return false;
        }
        self.restarts += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity_at(at: Option<Instant>) -> SinkActivity {
        SinkActivity {
            last_transcript: at,
            ..Default::default()
        }
    }

    #[test]
    fn test_healthy_within_threshold() {
        let start = Instant::now();
        let mut monitor = StreamHealthMonitor::starting_at(Duration::from_secs(10), 5, start);
        let status = monitor.check(start + Duration::from_secs(9), &activity_at(None));
        assert_eq!(status, HealthStatus::Healthy);
        assert_eq!(monitor.stalls(), 0);
    }

    #[test]
    fn test_stall_reported_once_per_episode() {
        let start = Instant::now();
        let mut monitor = StreamHealthMonitor::starting_at(Duration::from_secs(10), 5, start);
        let silent = activity_at(Some(start));

        let first = monitor.check(start + Duration::from_secs(11), &silent);
        assert_eq!(
            first,
            HealthStatus::Stalled {
                silent_for: Duration::from_secs(11),
                first_report: true
            }
        );
        let second = monitor.check(start + Duration::from_secs(16), &silent);
        assert!(matches!(
            second,
            HealthStatus::Stalled {
                first_report: false,
                ..
            }
        ));
        assert_eq!(monitor.stalls(), 1);

        // Output resumes, then goes quiet again
        let resumed = activity_at(Some(start + Duration::from_secs(20)));
        assert_eq!(
            monitor.check(start + Duration::from_secs(21), &resumed),
            HealthStatus::Healthy
        );
        assert!(matches!(
            monitor.check(start + Duration::from_secs(40), &resumed),
            HealthStatus::Stalled {
                first_report: true,
                ..
            }
        ));
        assert_eq!(monitor.stalls(), 2);
    }

    #[test]
    fn test_notices_do_not_end_a_stall() {
        let start = Instant::now();
        let mut monitor = StreamHealthMonitor::starting_at(Duration::from_secs(15), 5, start);
        let warned_at = start + Duration::from_secs(20);
        let activity = SinkActivity {
            last_success: Some(warned_at),
            last_transcript: Some(start),
            ..Default::default()
        };

        assert!(matches!(
            monitor.check(warned_at, &activity),
            HealthStatus::Stalled {
                first_report: true,
                ..
            }
        ));
        assert!(matches!(
            monitor.check(warned_at + Duration::from_secs(10), &activity),
            HealthStatus::Stalled {
                first_report: false,
                ..
            }
        ));
        assert_eq!(
            monitor.check(start + Duration::from_secs(60), &activity),
            HealthStatus::Stalled {
                silent_for: Duration::from_secs(60),
                first_report: false
            }
        );
        assert_eq!(monitor.stalls(), 1);
    }

    #[test]
    fn test_restart_budget() {
        let mut monitor = StreamHealthMonitor::new(Duration::from_secs(1), 2);
        assert!(monitor.try_claim_restart());
        assert!(monitor.try_claim_restart());
        assert!(!monitor.try_claim_restart());
        assert_eq!(monitor.restarts(), 2);
    }
}

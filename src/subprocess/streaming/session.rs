//! Async driver around a [`StreamParser`]
//!
//! The parser sits behind a `tokio::sync::Mutex`. The chunk path and the
//! two timers (overflow flush, health check) each take the lock for the
//! whole of their work, so a timer never observes a half-processed chunk.

use super::health::FeedSupervisor;
use super::parser::StreamParser;
use super::types::ParserStatistics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const READ_CHUNK_SIZE: usize = 8192;

pub struct TranscriptSession {
    parser: Arc<Mutex<StreamParser>>,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl TranscriptSession {
    /// Start timers for `parser`. Must be called from within a tokio runtime.
    pub fn start(parser: StreamParser) -> Self {
        Self::spawn(parser, None)
    }

    /// Like [`start`](Self::start), with a supervisor the health timer may
    /// ask to restart the upstream feed
    pub fn start_supervised(parser: StreamParser, supervisor: Arc<dyn FeedSupervisor>) -> Self {
        Self::spawn(parser, Some(supervisor))
    }

    fn spawn(parser: StreamParser, supervisor: Option<Arc<dyn FeedSupervisor>>) -> Self {
        let flush_interval = parser.config().flush_interval;
        let health_interval = parser.config().health_check_interval;
        let parser = Arc::new(Mutex::new(parser));

        let timers = vec![
            tokio::spawn(flush_loop(Arc::clone(&parser), flush_interval)),
            tokio::spawn(health_loop(Arc::clone(&parser), health_interval, supervisor)),
        ];

        Self {
            parser,
            timers: Mutex::new(timers),
        }
    }

    pub fn parser(&self) -> Arc<Mutex<StreamParser>> {
        Arc::clone(&self.parser)
    }

    /// Feed one chunk; processing completes before this returns
    pub async fn feed(&self, chunk: &[u8]) {
        self.parser.lock().await.feed(chunk);
    }

    /// Process any trailing unterminated line
    pub async fn finish(&self) {
        self.parser.lock().await.finish();
    }

    /// Read `reader` to end-of-stream, feeding every chunk in order.
    /// Returns the number of bytes consumed.
    pub async fn consume<R>(&self, mut reader: R) -> std::io::Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            total += n as u64;
            self.feed(&buf[..n]).await;
        }
        self.finish().await;
        Ok(total)
    }

    /// Write an operator-facing warning to the error channel
    pub async fn warn(&self, message: &str) {
        self.parser.lock().await.warn(message);
    }

    /// Whether the health timer has used up its feed restarts
    pub async fn restarts_exhausted(&self) -> bool {
        let parser = self.parser.lock().await;
        let monitor = parser.monitor();
        monitor.restarts() >= monitor.max_restarts()
    }

    pub async fn statistics(&self) -> ParserStatistics {
        self.parser.lock().await.statistics()
    }

    /// Stop the timers, flush, and emit statistics once
    pub async fn teardown(&self) -> ParserStatistics {
        for timer in self.timers.lock().await.drain(..) {
            timer.abort();
        }
        self.parser.lock().await.teardown()
    }
}

impl Drop for TranscriptSession {
    fn drop(&mut self) {
        if let Ok(mut timers) = self.timers.try_lock() {
            for timer in timers.drain(..) {
                timer.abort();
            }
        }
    }
}

async fn flush_loop(parser: Arc<Mutex<StreamParser>>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let mut parser = parser.lock().await;
        if parser.sink().overflow_len() > 0 {
            parser.flush_output();
        }
    }
}

async fn health_loop(
    parser: Arc<Mutex<StreamParser>>,
    period: Duration,
    supervisor: Option<Arc<dyn FeedSupervisor>>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;
    let mut gave_up = false;

    loop {
        ticker.tick().await;
        parser.lock().await.check_health(Instant::now());

        let Some(supervisor) = &supervisor else {
            continue;
        };
        if gave_up || !supervisor.needs_restart().await {
            continue;
        }

        let claimed = {
            let mut parser = parser.lock().await;
            let monitor = parser.monitor_mut();
            let claimed = monitor.try_claim_restart();
            let (attempt, max) = (monitor.restarts(), monitor.max_restarts());
            if claimed {
                parser.warn(&format!(
                    "{} exited unexpectedly; restarting ({}/{})",
                    supervisor.describe(),
                    attempt,
                    max
                ));
            } else {
                parser.warn(&format!(
                    "{} exited unexpectedly; giving up after {} restarts",
                    supervisor.describe(),
                    max
                ));
                gave_up = true;
            }
            claimed
        };

        if claimed {
            if let Err(e) = supervisor.restart().await {
                tracing::error!("Restart of {} failed: {:#}", supervisor.describe(), e);
                parser
                    .lock()
                    .await
                    .warn(&format!("Failed to restart {}: {}", supervisor.describe(), e));
            }
        }
    }
}

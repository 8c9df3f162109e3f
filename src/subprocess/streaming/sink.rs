//! Line delivery with a fallback chain
//!
//! A line goes to the primary writer. If that fails it goes, tagged
//! `[FALLBACK]`, to the secondary writer. If both fail it waits in an
//! overflow queue that is retried periodically. Nothing is dropped.

use super::types::OutputDestination;
use crate::error::{ClaudoError, ErrorCode};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

const FALLBACK_TAG: &str = "[FALLBACK] ";

/// A destination that accepts whole lines
pub trait LineWriter: Send {
    /// Write `line` followed by a newline
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Human-readable name used in logs
    fn describe(&self) -> String;
}

/// Writes to stdout, flushing after every line
#[derive(Debug, Default)]
pub struct ConsoleWriter;

impl LineWriter for ConsoleWriter {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", line)?;
        out.flush()
    }

    fn describe(&self) -> String {
        "stdout".to_string()
    }
}

/// Writes to stderr
#[derive(Debug, Default)]
pub struct StderrWriter;

impl LineWriter for StderrWriter {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut err = io::stderr().lock();
        writeln!(err, "{}", line)?;
        err.flush()
    }

    fn describe(&self) -> String {
        "stderr".to_string()
    }
}

/// Append-only file writer.
///
/// Each line is a single `write_all` on a file opened with `O_APPEND`, so
/// several parsers can share one file without clobbering each other.
#[derive(Debug)]
pub struct FileWriter {
    file: File,
    path: PathBuf,
}

impl FileWriter {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineWriter for FileWriter {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        self.file.write_all(buf.as_bytes())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Which link of the chain accepted a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Primary,
    Fallback,
    Buffered,
}

/// Successful-write bookkeeping observed by the health monitor
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkActivity {
    pub lines_written: u64,
    pub bytes_written: u64,
    pub fallback_writes: u64,
    /// Last successful write of any line, notices included
    pub last_success: Option<Instant>,
    /// Last successful write of a line that came from the upstream stream
    pub last_transcript: Option<Instant>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingLine {
    diagnostic: bool,
    notice: bool,
    text: String,
}

/// Output sink owning a primary and a secondary writer
pub struct OutputSink {
    primary: Box<dyn LineWriter>,
    secondary: Box<dyn LineWriter>,
    overflow: VecDeque<PendingLine>,
    activity: SinkActivity,
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink")
            .field("primary", &self.primary.describe())
            .field("secondary", &self.secondary.describe())
            .field("overflow", &self.overflow.len())
            .field("activity", &self.activity)
            .finish()
    }
}

impl OutputSink {
    pub fn with_writers(primary: Box<dyn LineWriter>, secondary: Box<dyn LineWriter>) -> Self {
        Self {
            primary,
            secondary,
            overflow: VecDeque::new(),
            activity: SinkActivity::default(),
        }
    }

    /// Console output with stderr as the fallback channel
    pub fn console() -> Self {
        Self::with_writers(Box::new(ConsoleWriter), Box::new(StderrWriter))
    }

    /// Build a sink for `destination`.
    ///
    /// This is the one place the sink can fail: a file destination that
    /// cannot be opened is a configuration error.
    pub fn for_destination(destination: &OutputDestination) -> Result<Self, ClaudoError> {
        match destination {
            OutputDestination::Console => Ok(Self::console()),
            OutputDestination::File(path) => {
                if path.as_os_str().is_empty() || path.is_dir() {
                    return Err(ClaudoError::output_with_code(
                        ErrorCode::OUTPUT_PATH_UNRESOLVABLE,
                        "output path must name a file",
                        Some(path.clone()),
                    ));
                }
                let writer = FileWriter::open(path).map_err(|e| {
                    ClaudoError::output_with_code(
                        ErrorCode::OUTPUT_OPEN_FAILED,
                        e.to_string(),
                        Some(path.clone()),
                    )
                    .with_source(e)
                })?;
                tracing::debug!("Writing transcript to {}", path.display());
                Ok(Self::with_writers(Box::new(writer), Box::new(StderrWriter)))
            }
        }
    }

    /// Deliver a transcript line. Never fails.
    pub fn write(&mut self, line: &str) -> Delivery {
        self.deliver(PendingLine {
            diagnostic: false,
            notice: false,
            text: line.to_string(),
        })
    }

    /// Deliver a diagnostic line: error channel first, then primary.
    pub fn write_diagnostic(&mut self, line: &str) -> Delivery {
        self.deliver(PendingLine {
            diagnostic: true,
            notice: false,
            text: line.to_string(),
        })
    }

    /// Deliver an operator notice on the diagnostic route.
    ///
    /// Notices do not count as transcript activity, so a stall warning
    /// never ends the stall it reports.
    pub fn write_notice(&mut self, line: &str) -> Delivery {
        self.deliver(PendingLine {
            diagnostic: true,
            notice: true,
            text: line.to_string(),
        })
    }

    fn deliver(&mut self, line: PendingLine) -> Delivery {
        if !self.overflow.is_empty() {
            self.flush_overflow();
            if !self.overflow.is_empty() {
                self.overflow.push_back(line);
                return Delivery::Buffered;
            }
        }

        match self.try_chain(&line) {
            Some(delivery) => delivery,
            None => {
                tracing::warn!(
                    "Both {} and {} are unwritable; buffering output",
                    self.primary.describe(),
                    self.secondary.describe()
                );
                self.overflow.push_back(line);
                Delivery::Buffered
            }
        }
    }

    fn try_chain(&mut self, line: &PendingLine) -> Option<Delivery> {
        let (first, second) = if line.diagnostic {
            (&mut self.secondary, &mut self.primary)
        } else {
            (&mut self.primary, &mut self.secondary)
        };

        let delivery = match first.write_line(&line.text) {
            Ok(()) => Delivery::Primary,
            Err(e) => {
                tracing::debug!("Write to {} failed: {}", first.describe(), e);
                let tagged = format!("{}{}", FALLBACK_TAG, line.text);
                match second.write_line(&tagged) {
                    Ok(()) => Delivery::Fallback,
                    Err(e) => {
                        tracing::debug!("Write to {} failed: {}", second.describe(), e);
                        return None;
                    }
                }
            }
        };

        self.activity.lines_written += 1;
        self.activity.bytes_written += line.text.len() as u64 + 1;
        let now = Instant::now();
        self.activity.last_success = Some(now);
        if !line.notice {
            self.activity.last_transcript = Some(now);
        }
        if delivery == Delivery::Fallback {
            self.activity.fallback_writes += 1;
        }
        Some(delivery)
    }

    /// Retry buffered lines in order, stopping at the first that still
    /// cannot be delivered. Returns how many were delivered.
    pub fn flush_overflow(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(line) = self.overflow.pop_front() {
            if self.try_chain(&line).is_none() {
                self.overflow.push_front(line);
                break;
            }
            delivered += 1;
        }
        if delivered > 0 {
            tracing::debug!(
                "Delivered {} buffered lines, {} remain",
                delivered,
                self.overflow.len()
            );
        }
        delivered
    }

    pub fn overflow_len(&self) -> usize {
        self.overflow.len()
    }

    /// Take every line still waiting in the overflow buffer
    pub fn drain_overflow(&mut self) -> Vec<String> {
        self.overflow.drain(..).map(|line| line.text).collect()
    }

    pub fn activity(&self) -> SinkActivity {
        self.activity
    }
}

#[cfg(test)]
pub(crate) mod test_writers {
    use super::LineWriter;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Records every line; shares its log so tests can inspect it after the
    /// writer has been boxed into a sink
    #[derive(Debug, Clone, Default)]
    pub struct RecordingWriter {
        pub lines: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingWriter {
        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl LineWriter for RecordingWriter {
        fn write_line(&mut self, line: &str) -> io::Result<()> {
            self.lines.lock().unwrap().push(line.to_string());
            Ok(())
        }

        fn describe(&self) -> String {
            "recording".to_string()
        }
    }

    /// Fails while `broken` is set, otherwise records
    #[derive(Debug, Clone, Default)]
    pub struct FlakyWriter {
        pub broken: Arc<Mutex<bool>>,
        pub inner: RecordingWriter,
    }

    impl FlakyWriter {
        pub fn broken() -> Self {
            let writer = Self::default();
            writer.set_broken(true);
            writer
        }

        pub fn set_broken(&self, broken: bool) {
            *self.broken.lock().unwrap() = broken;
        }

        pub fn lines(&self) -> Vec<String> {
            self.inner.lines()
        }
    }

    impl LineWriter for FlakyWriter {
        fn write_line(&mut self, line: &str) -> io::Result<()> {
            if *self.broken.lock().unwrap() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
            }
            self.inner.write_line(line)
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_writers::{FlakyWriter, RecordingWriter};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_primary_write() {
        let primary = RecordingWriter::default();
        let secondary = RecordingWriter::default();
        let mut sink =
            OutputSink::with_writers(Box::new(primary.clone()), Box::new(secondary.clone()));

        assert_eq!(sink.write("[Agent] hi"), Delivery::Primary);
        assert_eq!(primary.lines(), vec!["[Agent] hi"]);
        assert!(secondary.lines().is_empty());
        assert_eq!(sink.activity().lines_written, 1);
        assert_eq!(sink.activity().bytes_written, 11);
        assert!(sink.activity().last_success.is_some());
        assert_eq!(sink.activity().last_transcript, sink.activity().last_success);
    }

    #[test]
    fn test_notice_is_not_transcript_activity() {
        let primary = RecordingWriter::default();
        let secondary = RecordingWriter::default();
        let mut sink =
            OutputSink::with_writers(Box::new(primary.clone()), Box::new(secondary.clone()));

        assert_eq!(sink.write_notice("stalled"), Delivery::Primary);
        assert_eq!(secondary.lines(), vec!["stalled"]);
        assert!(sink.activity().last_success.is_some());
        assert!(sink.activity().last_transcript.is_none());

        sink.write_diagnostic("[Agent] [Unknown message type] system");
        assert!(sink.activity().last_transcript.is_some());
    }

    #[test]
    fn test_fallback_is_tagged() {
        let primary = FlakyWriter::broken();
        let secondary = RecordingWriter::default();
        let mut sink = OutputSink::with_writers(Box::new(primary), Box::new(secondary.clone()));

        assert_eq!(sink.write("[Agent] hi"), Delivery::Fallback);
        assert_eq!(secondary.lines(), vec!["[FALLBACK] [Agent] hi"]);
        assert_eq!(sink.activity().fallback_writes, 1);
    }

    #[test]
    fn test_overflow_retains_and_preserves_order() {
        let primary = FlakyWriter::broken();
        let secondary = FlakyWriter::broken();
        let mut sink = OutputSink::with_writers(Box::new(primary.clone()), Box::new(secondary));

        assert_eq!(sink.write("one"), Delivery::Buffered);
        assert_eq!(sink.write("two"), Delivery::Buffered);
        assert_eq!(sink.overflow_len(), 2);
        assert_eq!(sink.activity().lines_written, 0);

        primary.set_broken(false);
        assert_eq!(sink.write("three"), Delivery::Primary);
        assert_eq!(primary.lines(), vec!["one", "two", "three"]);
        assert_eq!(sink.overflow_len(), 0);
    }

    #[test]
    fn test_flush_overflow_and_drain() {
        let primary = FlakyWriter::broken();
        let mut sink = OutputSink::with_writers(
            Box::new(primary.clone()),
            Box::new(FlakyWriter::broken()),
        );

        sink.write("a");
        sink.write_diagnostic("b");
        assert_eq!(sink.flush_overflow(), 0);
        assert_eq!(sink.drain_overflow(), vec!["a", "b"]);
        assert_eq!(sink.overflow_len(), 0);
    }

    #[test]
    fn test_diagnostics_prefer_error_channel() {
        let primary = RecordingWriter::default();
        let secondary = FlakyWriter::default();
        let mut sink =
            OutputSink::with_writers(Box::new(primary.clone()), Box::new(secondary.clone()));

        assert_eq!(sink.write_diagnostic("warn"), Delivery::Primary);
        assert_eq!(secondary.lines(), vec!["warn"]);
        assert!(primary.lines().is_empty());

        secondary.set_broken(true);
        assert_eq!(sink.write_diagnostic("warn2"), Delivery::Fallback);
        assert_eq!(primary.lines(), vec!["[FALLBACK] warn2"]);
    }

    #[test]
    fn test_file_destination_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("agent.log");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "existing\n").unwrap();

        let destination = OutputDestination::File(path.clone());
        let mut first = OutputSink::for_destination(&destination).unwrap();
        let mut second = OutputSink::for_destination(&destination).unwrap();
        first.write("from first");
        second.write("from second");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "existing\nfrom first\nfrom second\n");
    }

    #[test]
    fn test_file_destination_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".claudo").join("worker.log");
        let destination = OutputDestination::File(path.clone());
        let mut sink = OutputSink::for_destination(&destination).unwrap();
        sink.write("line");
        assert!(path.exists());
    }

    #[test]
    fn test_directory_destination_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = OutputSink::for_destination(&OutputDestination::File(dir.path().to_path_buf()))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::OUTPUT_PATH_UNRESOLVABLE);
        assert_eq!(err.exit_code(), 4);
    }
}

//! Core types for the transcript pipeline

use std::path::PathBuf;
use std::time::Duration;

/// Stream source identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

/// Where rendered transcript lines are delivered
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputDestination {
    /// Interactive console (stdout)
    #[default]
    Console,
    /// Append-only file; may be shared with other parser instances
    File(PathBuf),
}

impl OutputDestination {
    pub fn is_console(&self) -> bool {
        matches!(self, OutputDestination::Console)
    }
}

/// Parser configuration
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Label prefixed to every rendered line
    pub agent_name: String,
    /// Force colors on or off; `None` means auto-detect from the destination
    pub use_color: Option<bool>,
    /// Emit decode failures and internal errors as diagnostics
    pub verbose_diagnostics: bool,
    /// Render best-effort `[RAW]` lines for undecodable input
    pub fallback_to_raw: bool,
    /// Maximum characters of a text item before truncation
    pub max_text_length: usize,
    /// Primary output destination
    pub output: OutputDestination,
    /// How often the overflow buffer is retried
    pub flush_interval: Duration,
    /// How often the health monitor runs
    pub health_check_interval: Duration,
    /// Silence longer than this is reported as a stall
    pub stall_threshold: Duration,
    /// Upper bound on upstream feed restarts
    pub max_restarts: u32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            agent_name: "Agent".to_string(),
            use_color: None,
            verbose_diagnostics: false,
            fallback_to_raw: true,
            max_text_length: 1000,
            output: OutputDestination::Console,
            flush_interval: Duration::from_millis(100),
            health_check_interval: Duration::from_secs(5),
            stall_threshold: Duration::from_secs(15),
            max_restarts: 5,
        }
    }
}

impl ParserConfig {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            ..Self::default()
        }
    }

    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = Some(use_color);
        self
    }

    pub fn with_verbose_diagnostics(mut self, verbose: bool) -> Self {
        self.verbose_diagnostics = verbose;
        self
    }

    pub fn with_fallback_to_raw(mut self, fallback: bool) -> Self {
        self.fallback_to_raw = fallback;
        self
    }

    pub fn with_max_text_length(mut self, max: usize) -> Self {
        self.max_text_length = max;
        self
    }

    pub fn with_output(mut self, output: OutputDestination) -> Self {
        self.output = output;
        self
    }

    pub fn with_stall_threshold(mut self, threshold: Duration) -> Self {
        self.stall_threshold = threshold;
        self
    }

    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_max_restarts(mut self, max: u32) -> Self {
        self.max_restarts = max;
        self
    }

    /// Resolve the effective color setting.
    ///
    /// Colors default on only for a console destination attached to a
    /// terminal.
    pub fn colors_enabled(&self) -> bool {
        use std::io::IsTerminal;

        match self.use_color {
            Some(explicit) => explicit,
            None => self.output.is_console() && std::io::stdout().is_terminal(),
        }
    }
}

/// Counters describing one parser's lifetime so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParserStatistics {
    /// Complete lines seen, including blank ones
    pub lines: u64,
    /// Lines that decoded as JSON
    pub successes: u64,
    /// Lines that failed to decode
    pub errors: u64,
    /// `errors / lines` as a percentage
    pub error_rate: f64,
    /// Tool invocations still waiting for a result
    pub pending_tools: usize,
    /// Lines held in the sink's overflow buffer
    pub buffered_output: usize,
    /// Text items cut at `max_text_length`
    pub truncated_items: u64,
    /// Content items that were skipped because their fields were invalid
    pub rejected_items: u64,
    /// Stall episodes reported by the health monitor
    pub stalls: u64,
}

/// Output from streaming command execution
#[derive(Debug, Clone)]
pub struct StreamingOutput {
    /// Process exit code, `None` when killed by a signal
    pub exit_code: Option<i32>,
    /// Whether the timeout fired and the process was killed
    pub timed_out: bool,
    /// Execution duration
    pub duration: Duration,
}

impl StreamingOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

//! Turns decoded events into transcript lines

use super::correlation::ToolCorrelationTable;
use super::decoder::{salvage, MalformedLine, Salvage};
use super::events::{ContentItem, ItemError, StreamEvent, ToolResultItem};
use super::types::{ParserConfig, ParserStatistics};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

const COMMAND_SUMMARY_CHARS: usize = 100;
const PATTERN_SUMMARY_CHARS: usize = 50;
const DEFAULT_SUMMARY_CHARS: usize = 100;
const PREVIEW_LINE_CHARS: usize = 200;
const ERROR_PREVIEW_LINES: usize = 2;
const RESULT_PREVIEW_LINES: usize = 3;
const PREVIEW_INDENT: &str = "   ";

/// Which channel a rendered line belongs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// The transcript itself
    Output,
    /// Warnings, statistics and verbose decode detail
    Diagnostic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub channel: Channel,
    pub text: String,
}

impl RenderedLine {
    pub fn output(text: impl Into<String>) -> Self {
        Self {
            channel: Channel::Output,
            text: text.into(),
        }
    }

    pub fn diagnostic(text: impl Into<String>) -> Self {
        Self {
            channel: Channel::Diagnostic,
            text: text.into(),
        }
    }
}

/// Semantic role of a rendered fragment, used only for coloring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Agent,
    Arrow,
    ToolName,
    Success,
    Failure,
    Elapsed,
    Preview,
    ErrorPreview,
    RawSalvage,
    RawUnparsed,
    Warning,
}

/// ANSI styling that degrades to a no-op when colors are off
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn paint(&self, text: &str, role: Role) -> String {
        if !self.enabled {
            return text.to_string();
        }

        let code = match role {
            Role::Agent => "\x1b[1m",
            Role::Arrow => "\x1b[36m",
            Role::ToolName | Role::RawSalvage | Role::Warning => "\x1b[33m",
            Role::Success => "\x1b[32m",
            Role::Failure | Role::ErrorPreview | Role::RawUnparsed => "\x1b[31m",
            Role::Elapsed => "\x1b[90m",
            Role::Preview => "\x1b[2m",
        };
        format!("{}{}\x1b[0m", code, text)
    }
}

/// Formats the one-line summary shown when a tool is invoked
pub type SummaryFn = Box<dyn Fn(&Value) -> String + Send + Sync>;

/// Tool name to summary formatter, with a JSON fallback for unknown tools
pub struct ToolSummaryRegistry {
    formatters: HashMap<String, SummaryFn>,
}

impl fmt::Debug for ToolSummaryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.formatters.keys().collect();
        names.sort();
        f.debug_struct("ToolSummaryRegistry")
            .field("tools", &names)
            .finish()
    }
}

impl Default for ToolSummaryRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ToolSummaryRegistry {
    /// A registry with no formatters; every tool uses the JSON fallback
    pub fn empty() -> Self {
        Self {
            formatters: HashMap::new(),
        }
    }

    /// Formatters for Claude's built-in tools
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("Bash", |input| match str_field(input, "command") {
            Some(cmd) => format!("$ {}", truncate_chars(cmd, COMMAND_SUMMARY_CHARS).0),
            None => "Running command...".to_string(),
        });
        registry.register("Read", |input| {
            format!("Reading {}", str_field(input, "file_path").unwrap_or("file"))
        });
        for editor in ["Edit", "Write", "MultiEdit"] {
            registry.register(editor, |input| {
                format!("Editing {}", str_field(input, "file_path").unwrap_or("file"))
            });
        }
        registry.register("Grep", |input| {
            let pattern = str_field(input, "pattern").unwrap_or("");
            format!(
                "Searching for: {}",
                truncate_chars(pattern, PATTERN_SUMMARY_CHARS).0
            )
        });
        registry.register("Glob", |input| {
            format!(
                "Finding files: {}",
                str_field(input, "pattern").unwrap_or("")
            )
        });
        registry
    }

    pub fn register<F>(&mut self, tool: impl Into<String>, formatter: F)
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.formatters.insert(tool.into(), Box::new(formatter));
    }

    pub fn summarize(&self, tool: &str, input: &Value) -> String {
        if input.is_null() {
            return "[no input]".to_string();
        }
        match self.formatters.get(tool) {
            Some(formatter) => formatter(input),
            None => truncate_chars(&input.to_string(), DEFAULT_SUMMARY_CHARS).0,
        }
    }
}

fn str_field<'a>(input: &'a Value, field: &str) -> Option<&'a str> {
    input.get(field).and_then(Value::as_str)
}

/// Cut `text` to at most `max` characters
pub fn truncate_chars(text: &str, max: usize) -> (String, bool) {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => (text[..byte_idx].to_string(), true),
        None => (text.to_string(), false),
    }
}

/// Per-parser rendering state and counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderState {
    /// Insert a blank line before the next text item
    pub last_item_was_tool_result: bool,
    pub line_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub truncated_items: u64,
    pub rejected_items: u64,
}

/// Renders events for one stream
#[derive(Debug)]
pub struct TranscriptRenderer {
    agent_name: String,
    max_text_length: usize,
    verbose: bool,
    fallback_to_raw: bool,
    palette: Palette,
    summaries: ToolSummaryRegistry,
    preview_tools: HashSet<String>,
    table: ToolCorrelationTable,
    state: RenderState,
}

impl TranscriptRenderer {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            agent_name: config.agent_name.clone(),
            max_text_length: config.max_text_length,
            verbose: config.verbose_diagnostics,
            fallback_to_raw: config.fallback_to_raw,
            palette: Palette::new(config.colors_enabled()),
            summaries: ToolSummaryRegistry::with_defaults(),
            preview_tools: ["Bash", "Grep"].into_iter().map(String::from).collect(),
            table: ToolCorrelationTable::new(),
            state: RenderState::default(),
        }
    }

    /// Replace the set of tools whose successful output is previewed
    pub fn with_preview_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preview_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn summaries_mut(&mut self) -> &mut ToolSummaryRegistry {
        &mut self.summaries
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut RenderState {
        &mut self.state
    }

    pub fn pending_tools(&self) -> usize {
        self.table.len()
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    fn label(&self) -> String {
        format!("[{}]", self.palette.paint(&self.agent_name, Role::Agent))
    }

    /// Render a decoded event, updating the correlation table and state
    pub fn render_event(&mut self, event: &StreamEvent, now: Instant) -> Vec<RenderedLine> {
        let mut lines = Vec::new();
        match event {
            StreamEvent::AssistantTurn { content } => {
                for item in content {
                    match item {
                        Ok(ContentItem::Text { text }) => self.render_text(text, &mut lines),
                        Ok(ContentItem::ToolInvocation { id, name, input }) => {
                            self.render_invocation(id, name, input, now, &mut lines)
                        }
                        Err(e) => self.reject_item(e, &mut lines),
                    }
                }
            }
            StreamEvent::ToolResultTurn { items } => {
                for item in items {
                    match item {
                        Ok(result) => self.render_result(result, now, &mut lines),
                        Err(e) => self.reject_item(e, &mut lines),
                    }
                }
            }
            StreamEvent::Unrecognized { kind } => {
                tracing::trace!("Ignoring {} record", kind);
                if self.verbose {
                    lines.push(RenderedLine::diagnostic(format!(
                        "{} [Unknown message type] {}",
                        self.label(),
                        kind
                    )));
                }
            }
        }
        lines
    }

    fn render_text(&mut self, text: &str, lines: &mut Vec<RenderedLine>) {
        if self.state.last_item_was_tool_result {
            lines.push(RenderedLine::output(""));
            self.state.last_item_was_tool_result = false;
        }

        let (mut body, truncated) = truncate_chars(text, self.max_text_length);
        if truncated {
            self.state.truncated_items += 1;
            body.push_str("...");
        }
        lines.push(RenderedLine::output(format!("{} {}", self.label(), body)));
    }

    fn render_invocation(
        &mut self,
        id: &str,
        name: &str,
        input: &Value,
        now: Instant,
        lines: &mut Vec<RenderedLine>,
    ) {
        let summary = self.summaries.summarize(name, input);
        lines.push(RenderedLine::output(format!(
            "{} {} {}: {}",
            self.label(),
            self.palette.paint("→", Role::Arrow),
            self.palette.paint(name, Role::ToolName),
            summary
        )));
        self.table.record_at(id, name, input.clone(), now);
    }

    fn render_result(
        &mut self,
        result: &ToolResultItem,
        now: Instant,
        lines: &mut Vec<RenderedLine>,
    ) {
        let pending = self.table.resolve(&result.tool_use_id);
        if pending.is_none() {
            tracing::debug!("No pending invocation for tool result {}", result.tool_use_id);
        }

        let elapsed = pending
            .as_ref()
            .map(|p| format!(" {}", self.format_elapsed(p.elapsed(now))))
            .unwrap_or_default();

        if result.is_error {
            lines.push(RenderedLine::output(format!(
                "{} {}{}",
                self.label(),
                self.palette.paint("✗ Tool failed", Role::Failure),
                elapsed
            )));
            self.push_preview(&result.content, ERROR_PREVIEW_LINES, Role::ErrorPreview, lines);
        } else {
            lines.push(RenderedLine::output(format!(
                "{} {}{}",
                self.label(),
                self.palette.paint("✓ Completed", Role::Success),
                elapsed
            )));
            let previewable = pending
                .as_ref()
                .is_some_and(|p| self.preview_tools.contains(&p.name));
            if previewable {
                self.push_preview(&result.content, RESULT_PREVIEW_LINES, Role::Preview, lines);
            }
        }

        self.state.last_item_was_tool_result = true;
    }

    fn format_elapsed(&self, elapsed: Duration) -> String {
        self.palette
            .paint(&format!("({:.1}s)", elapsed.as_secs_f64()), Role::Elapsed)
    }

    fn push_preview(
        &self,
        content: &str,
        max_lines: usize,
        role: Role,
        lines: &mut Vec<RenderedLine>,
    ) {
        if content.trim().is_empty() {
            return;
        }

        let all: Vec<&str> = content.lines().collect();
        for line in all.iter().take(max_lines) {
            let (mut shown, cut) = truncate_chars(line, PREVIEW_LINE_CHARS);
            if cut {
                shown.push_str("...");
            }
            lines.push(RenderedLine::output(format!(
                "{}{}",
                PREVIEW_INDENT,
                self.palette.paint(&shown, role)
            )));
        }

        if all.len() > max_lines {
            let more = format!("... ({} more lines)", all.len() - max_lines);
            lines.push(RenderedLine::output(format!(
                "{}{}",
                PREVIEW_INDENT,
                self.palette.paint(&more, Role::Preview)
            )));
        }
    }

    fn reject_item(&mut self, error: &ItemError, lines: &mut Vec<RenderedLine>) {
        self.state.rejected_items += 1;
        tracing::debug!("Skipping content item: {}", error);
        if self.verbose {
            lines.push(RenderedLine::diagnostic(format!(
                "{} Error processing content item: {}",
                self.label(),
                error
            )));
        }
    }

    /// Render a line that failed to decode
    pub fn render_malformed(&self, line: &MalformedLine) -> Vec<RenderedLine> {
        let mut lines = Vec::new();

        if self.verbose {
            lines.push(RenderedLine::diagnostic(format!(
                "{} Failed to parse line: {}",
                self.label(),
                line.error
            )));
        }

        if !self.fallback_to_raw {
            return lines;
        }

        let rendered = match salvage(&line.raw) {
            Salvage::Text(text) => {
                let (text, _) = truncate_chars(&text, self.max_text_length);
                format!(
                    "{} {} {}",
                    self.label(),
                    self.palette.paint("[RAW TEXT]", Role::RawSalvage),
                    text
                )
            }
            Salvage::Tool(name) => format!(
                "{} {} {}",
                self.label(),
                self.palette.paint("[RAW TOOL]", Role::RawSalvage),
                name
            ),
            Salvage::Raw { preview, truncated } => format!(
                "{} {} {}{}",
                self.label(),
                self.palette.paint("[RAW]", Role::RawUnparsed),
                preview,
                if truncated { "..." } else { "" }
            ),
        };
        lines.push(RenderedLine::output(rendered));
        lines
    }

    /// The end-of-session statistics block
    pub fn render_statistics(&self, stats: &ParserStatistics) -> Vec<RenderedLine> {
        let mut lines = vec![RenderedLine::diagnostic(format!(
            "{} Parser Statistics: lines={}, successes={}, errors={}, errorRate={:.1}%, pendingTools={}",
            self.label(),
            stats.lines,
            stats.successes,
            stats.errors,
            stats.error_rate,
            stats.pending_tools
        ))];

        if stats.truncated_items > 0 || stats.buffered_output > 0 || stats.rejected_items > 0 {
            lines.push(RenderedLine::diagnostic(format!(
                "{} truncatedItems={}, rejectedItems={}, bufferedOutput={}",
                self.label(),
                stats.truncated_items,
                stats.rejected_items,
                stats.buffered_output
            )));
        }
        lines
    }

    /// A stall warning for the error channel
    pub fn render_stall(&self, silent_for: Duration, bytes: u64, lines: u64) -> RenderedLine {
        let warning = format!(
            "⚠ No output for {:.1}s (received {} bytes, {} lines so far)",
            silent_for.as_secs_f64(),
            bytes,
            lines
        );
        RenderedLine::diagnostic(format!(
            "{} {}",
            self.label(),
            self.palette.paint(&warning, Role::Warning)
        ))
    }

    /// A free-form warning for the error channel
    pub fn render_warning(&self, message: &str) -> RenderedLine {
        RenderedLine::diagnostic(format!(
            "{} {}",
            self.label(),
            self.palette.paint(&format!("⚠ {}", message), Role::Warning)
        ))
    }
}

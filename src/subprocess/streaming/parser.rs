//! The synchronous core: chunks in, transcript lines out
//!
//! `StreamParser` is driven one chunk at a time and does all decoding and
//! rendering before `feed` returns, so lines come out in the order their
//! records arrived. It holds no locks and spawns nothing; see
//! [`TranscriptSession`](super::session::TranscriptSession) for the async
//! wrapper with timers.

use super::decoder::{decode_line, DecodedLine, LineDecoder};
use super::health::{HealthStatus, StreamHealthMonitor};
use super::renderer::{Channel, RenderedLine, TranscriptRenderer};
use super::sink::OutputSink;
use super::types::{ParserConfig, ParserStatistics};
use crate::error::ClaudoError;
use std::time::Instant;

#[derive(Debug)]
pub struct StreamParser {
    config: ParserConfig,
    decoder: LineDecoder,
    renderer: TranscriptRenderer,
    sink: OutputSink,
    monitor: StreamHealthMonitor,
    bytes_received: u64,
    torn_down: bool,
}

impl StreamParser {
    /// Create a parser writing to the configured destination.
    ///
    /// Fails only when the destination cannot be opened.
    pub fn new(config: ParserConfig) -> Result<Self, ClaudoError> {
        let sink = OutputSink::for_destination(&config.output)?;
        Ok(Self::with_sink(config, sink))
    }

    /// Create a parser with an explicit sink
    pub fn with_sink(config: ParserConfig, sink: OutputSink) -> Self {
        let renderer = TranscriptRenderer::new(&config);
        let monitor = StreamHealthMonitor::new(config.stall_threshold, config.max_restarts);
        Self {
            config,
            decoder: LineDecoder::new(),
            renderer,
            sink,
            monitor,
            bytes_received: 0,
            torn_down: false,
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut OutputSink {
        &mut self.sink
    }

    pub fn monitor(&self) -> &StreamHealthMonitor {
        &self.monitor
    }

    pub fn monitor_mut(&mut self) -> &mut StreamHealthMonitor {
        &mut self.monitor
    }

    /// Consume one chunk of upstream bytes
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.torn_down {
            tracing::debug!("Ignoring {} bytes fed after teardown", chunk.len());
            return;
        }
        self.bytes_received += chunk.len() as u64;

        for line in self.decoder.push(chunk) {
            self.process_line(&line);
        }
    }

    /// Process a trailing unterminated fragment, if any
    pub fn finish(&mut self) {
        if let Some(fragment) = self.decoder.finish() {
            tracing::trace!("Processing {} byte trailing fragment", fragment.len());
            self.process_line(&fragment);
        }
    }

    fn process_line(&mut self, line: &str) {
        self.renderer.state_mut().line_count += 1;

        let rendered = match decode_line(line) {
            DecodedLine::Blank => return,
            DecodedLine::Event(event) => {
                self.renderer.state_mut().success_count += 1;
                tracing::trace!("Decoded {} record", event.kind());
                self.renderer.render_event(&event, Instant::now())
            }
            DecodedLine::Malformed(malformed) => {
                self.renderer.state_mut().error_count += 1;
                tracing::debug!(
                    "Line {} is not valid JSON: {}",
                    self.renderer.state().line_count,
                    malformed.error
                );
                self.renderer.render_malformed(&malformed)
            }
        };

        self.emit(rendered);
    }

    fn emit(&mut self, lines: Vec<RenderedLine>) {
        for line in lines {
            match line.channel {
                Channel::Output => self.sink.write(&line.text),
                Channel::Diagnostic => self.sink.write_diagnostic(&line.text),
            };
        }
    }

    /// Retry lines waiting in the sink's overflow buffer
    pub fn flush_output(&mut self) -> usize {
        self.sink.flush_overflow()
    }

    /// Run one health check, writing a warning at the start of a stall
    pub fn check_health(&mut self, now: Instant) -> HealthStatus {
        let activity = self.sink.activity();
        let status = self.monitor.check(now, &activity);
        if let HealthStatus::Stalled {
            silent_for,
            first_report: true,
        } = status
        {
            let warning = self.renderer.render_stall(
                silent_for,
                self.bytes_received,
                self.renderer.state().line_count,
            );
            self.notify(vec![warning]);
        }
        status
    }

    /// Write an operator-facing warning to the error channel
    pub fn warn(&mut self, message: &str) {
        let line = self.renderer.render_warning(message);
        self.notify(vec![line]);
    }

    /// Write lines the parser produced itself rather than from a record
    fn notify(&mut self, lines: Vec<RenderedLine>) {
        for line in lines {
            self.sink.write_notice(&line.text);
        }
    }

    pub fn statistics(&self) -> ParserStatistics {
        let state = self.renderer.state();
        let error_rate = if state.line_count > 0 {
            state.error_count as f64 / state.line_count as f64 * 100.0
        } else {
            0.0
        };

        ParserStatistics {
            lines: state.line_count,
            successes: state.success_count,
            errors: state.error_count,
            error_rate,
            pending_tools: self.renderer.pending_tools(),
            buffered_output: self.sink.overflow_len(),
            truncated_items: state.truncated_items,
            rejected_items: state.rejected_items,
            stalls: self.monitor.stalls(),
        }
    }

    /// Flush everything and emit final statistics.
    ///
    /// Safe to call more than once; only the first call has any effect.
    pub fn teardown(&mut self) -> ParserStatistics {
        if self.torn_down {
            return self.statistics();
        }

        self.finish();
        self.flush_output();

        let stats = self.statistics();
        if self.config.verbose_diagnostics || stats.errors > 0 {
            let lines = self.renderer.render_statistics(&stats);
            self.notify(lines);
        }

        self.torn_down = true;
        let stats = self.statistics();
        if stats.buffered_output > 0 {
            tracing::warn!(
                "{} transcript lines could not be delivered and remain buffered",
                stats.buffered_output
            );
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::streaming::sink::test_writers::RecordingWriter;

    fn recorded(config: ParserConfig) -> (StreamParser, RecordingWriter, RecordingWriter) {
        let out = RecordingWriter::default();
        let err = RecordingWriter::default();
        let sink = OutputSink::with_writers(Box::new(out.clone()), Box::new(err.clone()));
        (StreamParser::with_sink(config, sink), out, err)
    }

    #[test]
    fn test_blank_lines_counted_but_not_decoded() {
        let (mut parser, out, _) = recorded(ParserConfig::new("Agent").with_color(false));
        parser.feed(b"\n   \n");
        let stats = parser.statistics();
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.successes, 0);
        assert_eq!(stats.errors, 0);
        assert!(out.lines().is_empty());
    }

    #[test]
    fn test_feed_after_teardown_is_ignored() {
        let (mut parser, out, _) = recorded(ParserConfig::new("Agent").with_color(false));
        parser.teardown();
        parser.feed(br#"{"type":"assistant","message":{"content":[{"type":"text","text":"late"}]}}
"#);
        assert!(out.lines().is_empty());
        assert_eq!(parser.statistics().lines, 0);
    }

    #[test]
    fn test_stall_warning_goes_to_error_channel() {
        let (mut parser, out, err) = recorded(
            ParserConfig::new("Agent")
                .with_color(false)
                .with_stall_threshold(std::time::Duration::from_secs(5)),
        );
        parser.feed(b"not json\n");
        let later = Instant::now() + std::time::Duration::from_secs(30);

        assert!(matches!(
            parser.check_health(later),
            HealthStatus::Stalled {
                first_report: true,
                ..
            }
        ));
        parser.check_health(later);

        let warnings: Vec<_> = err
            .lines()
            .into_iter()
            .filter(|l| l.contains("⚠ No output for"))
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("received 9 bytes, 1 lines so far"));
        assert_eq!(out.lines(), vec!["[Agent] [RAW] not json"]);
        assert_eq!(parser.statistics().stalls, 1);
    }

    #[test]
    fn test_continuous_silence_is_one_stall() {
        use std::time::Duration;

        let (mut parser, _, err) = recorded(
            ParserConfig::new("Agent")
                .with_color(false)
                .with_stall_threshold(Duration::from_millis(100)),
        );
        parser.feed(b"not json\n");
        std::thread::sleep(Duration::from_millis(150));

        // The warning is written now; checks right after it and later
        // still belong to the same silence
        let first = parser.check_health(Instant::now());
        let second = parser.check_health(Instant::now());
        std::thread::sleep(Duration::from_millis(150));
        let third = parser.check_health(Instant::now());

        assert!(matches!(
            first,
            HealthStatus::Stalled {
                first_report: true,
                ..
            }
        ));
        for status in [second, third] {
            assert!(matches!(
                status,
                HealthStatus::Stalled {
                    first_report: false,
                    ..
                }
            ));
        }
        if let HealthStatus::Stalled { silent_for, .. } = third {
            assert!(silent_for >= Duration::from_millis(300));
        }

        let warnings = err
            .lines()
            .into_iter()
            .filter(|l| l.contains("⚠ No output for"))
            .count();
        assert_eq!(warnings, 1);
        assert_eq!(parser.statistics().stalls, 1);
    }

    #[test]
    fn test_restart_warning_does_not_reset_silence() {
        let (mut parser, _, _) = recorded(
            ParserConfig::new("Agent")
                .with_color(false)
                .with_stall_threshold(std::time::Duration::from_millis(100)),
        );
        parser.feed(b"not json\n");
        std::thread::sleep(std::time::Duration::from_millis(150));
        parser.warn("feed stopped; restarting");

        assert!(matches!(
            parser.check_health(Instant::now()),
            HealthStatus::Stalled { .. }
        ));
    }

    #[test]
    fn test_error_rate() {
        let (mut parser, _, _) = recorded(ParserConfig::new("Agent").with_color(false));
        parser.feed(b"{}\n{}\n{}\nbroken\n");
        let stats = parser.statistics();
        assert_eq!(stats.lines, 4);
        assert_eq!(stats.errors, 1);
        assert!((stats.error_rate - 25.0).abs() < f64::EPSILON);
    }
}

//! Line framing and record decoding
//!
//! Records are one JSON object per line. A newline inside a JSON string is
//! always escaped by a conforming producer, so a raw `\n` byte is treated as
//! a record boundary unconditionally; a producer that emits literal newlines
//! inside a record will have that record split and reported as malformed.

use super::events::StreamEvent;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Characters of an unrecognizable line kept in a `[RAW]` preview
pub const RAW_PREVIEW_CHARS: usize = 100;

static TEXT_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""text"\s*:\s*"([^"]*)"#).expect("text field pattern is valid")
});

static NAME_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""name"\s*:\s*"([^"]*)"#).expect("name field pattern is valid")
});

static TEXT_ITEM_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""type"\s*:\s*"text""#).expect("text marker pattern is valid"));

static TOOL_USE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""type"\s*:\s*"tool_use""#).expect("tool_use marker pattern is valid")
});

/// Accumulates chunks and yields complete lines.
///
/// Bytes are buffered rather than text so that a multi-byte character split
/// across two chunks is reassembled before UTF-8 decoding.
#[derive(Debug, Default)]
pub struct LineDecoder {
    partial: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.partial.extend_from_slice(chunk);

        let Some(last_newline) = self.partial.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = self.partial.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.partial, rest);

        complete[..complete.len() - 1]
            .split(|b| *b == b'\n')
            .map(normalize_line)
            .collect()
    }

    /// Take the trailing unterminated fragment, if any
    pub fn finish(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            return None;
        }
        let fragment = std::mem::take(&mut self.partial);
        Some(normalize_line(&fragment))
    }

    /// Bytes held waiting for a line separator
    pub fn pending_len(&self) -> usize {
        self.partial.len()
    }
}

fn normalize_line(bytes: &[u8]) -> String {
    let line = String::from_utf8_lossy(bytes);
    line.strip_suffix('\r').unwrap_or(&line).to_string()
}

/// Result of decoding one line
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedLine {
    /// Empty or whitespace-only
    Blank,
    Event(StreamEvent),
    Malformed(MalformedLine),
}

/// A line that is not valid JSON
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedLine {
    pub raw: String,
    pub error: String,
}

/// Decode a single complete line
pub fn decode_line(line: &str) -> DecodedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return DecodedLine::Blank;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => DecodedLine::Event(StreamEvent::from_value(&value)),
        Err(e) => DecodedLine::Malformed(MalformedLine {
            raw: trimmed.to_string(),
            error: e.to_string(),
        }),
    }
}

/// Best-effort reading of a line that failed to decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Salvage {
    /// A text fragment was recognized
    Text(String),
    /// A tool name was recognized
    Tool(String),
    /// Nothing recognizable; a bounded preview of the line
    Raw { preview: String, truncated: bool },
}

/// Pattern-match recognizable fragments out of a malformed line
pub fn salvage(raw: &str) -> Salvage {
    if TEXT_ITEM_MARKER.is_match(raw) {
        if let Some(text) = capture(&TEXT_FIELD, raw) {
            return Salvage::Text(text);
        }
    }

    if TOOL_USE_MARKER.is_match(raw) {
        if let Some(name) = capture(&NAME_FIELD, raw) {
            return Salvage::Tool(name);
        }
    }

    let truncated = raw.chars().count() > RAW_PREVIEW_CHARS;
    Salvage::Raw {
        preview: raw.chars().take(RAW_PREVIEW_CHARS).collect(),
        truncated,
    }
}

fn capture(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_trailing_fragment() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.push(b"first\nsec"), vec!["first".to_string()]);
        assert_eq!(decoder.pending_len(), 3);
        assert_eq!(decoder.push(b"ond\n\nthird"), vec!["second", ""]);
        assert_eq!(decoder.finish(), Some("third".to_string()));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_push_without_newline_yields_nothing() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"{\"type\":").is_empty());
        assert!(decoder.push(b"\"assistant\"}").is_empty());
        assert_eq!(decoder.push(b"\n"), vec!["{\"type\":\"assistant\"}"]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let bytes = "✓ done\n".as_bytes();
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(&bytes[..1]).is_empty());
        assert_eq!(decoder.push(&bytes[1..]), vec!["✓ done"]);
    }

    #[test]
    fn test_crlf_is_normalized() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.push(b"a\r\nb\r\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_decode_line_classification() {
        assert_eq!(decode_line("   "), DecodedLine::Blank);
        assert!(matches!(
            decode_line(r#"{"type":"system","subtype":"init"}"#),
            DecodedLine::Event(StreamEvent::Unrecognized { .. })
        ));
        assert!(matches!(
            decode_line(r#"{"type":"assistant","message":"#),
            DecodedLine::Malformed(_)
        ));
    }

    #[test]
    fn test_salvage_text_fragment() {
        let raw = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"partial answ"#;
        assert_eq!(salvage(raw), Salvage::Text("partial answ".to_string()));
    }

    #[test]
    fn test_salvage_tool_name() {
        let raw = r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"Grep","input":{"#;
        assert_eq!(salvage(raw), Salvage::Tool("Grep".to_string()));
    }

    #[test]
    fn test_salvage_raw_preview_is_bounded() {
        let raw = "x".repeat(250);
        let Salvage::Raw { preview, truncated } = salvage(&raw) else {
            panic!("expected raw salvage");
        };
        assert_eq!(preview.chars().count(), RAW_PREVIEW_CHARS);
        assert!(truncated);

        assert_eq!(
            salvage("not json"),
            Salvage::Raw {
                preview: "not json".to_string(),
                truncated: false
            }
        );
    }
}

//! Event model for Claude's `stream-json` output
//!
//! Only two record shapes are rendered: assistant turns (text and tool
//! invocations) and user turns carrying tool results. Everything else that
//! is valid JSON decodes to [`StreamEvent::Unrecognized`].
//!
//! Content items are decoded one at a time so a single bad item never
//! takes its siblings down with it.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// One decoded record from the stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// `{"type":"assistant","message":{"content":[...]}}`
    AssistantTurn {
        content: Vec<Result<ContentItem, ItemError>>,
    },
    /// `{"type":"user","message":{"content":[{"type":"tool_result",...}]}}`
    ToolResultTurn {
        items: Vec<Result<ToolResultItem, ItemError>>,
    },
    /// Well-formed JSON that is not one of the rendered shapes
    Unrecognized { kind: String },
}

/// An item inside an assistant turn
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Text {
        text: String,
    },
    ToolInvocation {
        id: String,
        name: String,
        input: Value,
    },
}

/// The outcome of a tool invocation, matched to it by `tool_use_id`
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResultItem {
    pub tool_use_id: String,
    pub content: String,
    pub is_error: bool,
}

/// A known content item whose fields could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    pub kind: String,
    pub reason: String,
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} item: {}", self.kind, self.reason)
    }
}

/// Wire shape of a single content block
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContent {
    Text {
        #[serde(default)]
        text: Option<String>,
    },
    ToolUse {
        id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Value,
        #[serde(default)]
        is_error: Option<bool>,
    },
}

impl StreamEvent {
    /// Classify a parsed JSON record
    pub fn from_value(value: &Value) -> Self {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let content = value
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_array);

        match (kind, content) {
            ("assistant", Some(items)) => StreamEvent::AssistantTurn {
                content: items.iter().filter_map(decode_content_item).collect(),
            },
            ("user", Some(items)) => StreamEvent::ToolResultTurn {
                items: items.iter().filter_map(decode_result_item).collect(),
            },
            _ => StreamEvent::Unrecognized {
                kind: kind.to_string(),
            },
        }
    }

    /// Short label used in diagnostics
    pub fn kind(&self) -> &str {
        match self {
            StreamEvent::AssistantTurn { .. } => "assistant",
            StreamEvent::ToolResultTurn { .. } => "user",
            StreamEvent::Unrecognized { kind } => kind,
        }
    }
}

fn item_type(item: &Value) -> Option<&str> {
    item.get("type").and_then(Value::as_str)
}

fn decode_wire(item: &Value, kind: &str) -> Result<WireContent, ItemError> {
    WireContent::deserialize(item).map_err(|e| ItemError {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

/// Decode one assistant content block. Unknown block types (thinking,
/// images, ...) and empty text blocks yield `None`.
fn decode_content_item(item: &Value) -> Option<Result<ContentItem, ItemError>> {
    let kind = item_type(item)?;
    if kind != "text" && kind != "tool_use" {
        tracing::trace!("Skipping assistant content block of type {}", kind);
        return None;
    }

    match decode_wire(item, kind) {
        Ok(WireContent::Text { text }) => {
            let text = text.filter(|t| !t.is_empty())?;
            Some(Ok(ContentItem::Text { text }))
        }
        Ok(WireContent::ToolUse { id, name, input }) => {
            if id.is_empty() {
                return Some(Err(ItemError {
                    kind: kind.to_string(),
                    reason: "empty tool_use id".to_string(),
                }));
            }
            Some(Ok(ContentItem::ToolInvocation {
                id,
                name: name
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| "Unknown".to_string()),
                input,
            }))
        }
        Ok(WireContent::ToolResult { .. }) => None,
        Err(e) => Some(Err(e)),
    }
}

/// Decode one user-turn block; only `tool_result` blocks are of interest
fn decode_result_item(item: &Value) -> Option<Result<ToolResultItem, ItemError>> {
    let kind = item_type(item)?;
    if kind != "tool_result" {
        return None;
    }

    match decode_wire(item, kind) {
        Ok(WireContent::ToolResult {
            tool_use_id,
            content,
            is_error,
        }) => Some(Ok(ToolResultItem {
            tool_use_id,
            content: flatten_result_content(&content),
            is_error: is_error.unwrap_or(false),
        })),
        Ok(_) => None,
        Err(e) => Some(Err(e)),
    }
}

/// Tool result content is either a plain string or a list of content
/// blocks; lists are reduced to their text parts.
pub fn flatten_result_content(content: &Value) -> String {
    match content {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                Value::String(s) => Some(s.clone()),
                other => other.get("text").and_then(Value::as_str).map(String::from),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assistant_text_and_tool_use() {
        let value = json!({
            "type": "assistant",
            "message": {"content": [
                {"type": "text", "text": "Looking at the repo"},
                {"type": "tool_use", "id": "toolu_01", "name": "Bash", "input": {"command": "ls"}}
            ]}
        });

        let event = StreamEvent::from_value(&value);
        let StreamEvent::AssistantTurn { content } = event else {
            panic!("expected assistant turn");
        };
        assert_eq!(content.len(), 2);
        assert_eq!(
            content[0],
            Ok(ContentItem::Text {
                text: "Looking at the repo".to_string()
            })
        );
        assert!(matches!(
            &content[1],
            Ok(ContentItem::ToolInvocation { id, name, .. }) if id == "toolu_01" && name == "Bash"
        ));
    }

    #[test]
    fn test_bad_item_does_not_hide_siblings() {
        let value = json!({
            "type": "assistant",
            "message": {"content": [
                {"type": "tool_use", "name": "Read"},
                {"type": "text", "text": "still here"}
            ]}
        });

        let StreamEvent::AssistantTurn { content } = StreamEvent::from_value(&value) else {
            panic!("expected assistant turn");
        };
        assert_eq!(content.len(), 2);
        assert!(content[0].is_err());
        assert_eq!(content[0].as_ref().unwrap_err().kind, "tool_use");
        assert!(content[1].is_ok());
    }

    #[test]
    fn test_unknown_blocks_and_empty_text_are_skipped() {
        let value = json!({
            "type": "assistant",
            "message": {"content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": ""},
                {"no_type": true}
            ]}
        });

        let StreamEvent::AssistantTurn { content } = StreamEvent::from_value(&value) else {
            panic!("expected assistant turn");
        };
        assert!(content.is_empty());
    }

    #[test]
    fn test_tool_result_defaults() {
        let value = json!({
            "type": "user",
            "message": {"role": "user", "content": [
                {"type": "tool_result", "tool_use_id": "toolu_01", "content": "file1.txt"},
                {"type": "tool_result", "tool_use_id": "toolu_02", "content": "boom", "is_error": true}
            ]}
        });

        let StreamEvent::ToolResultTurn { items } = StreamEvent::from_value(&value) else {
            panic!("expected tool result turn");
        };
        assert_eq!(
            items[0],
            Ok(ToolResultItem {
                tool_use_id: "toolu_01".to_string(),
                content: "file1.txt".to_string(),
                is_error: false,
            })
        );
        assert!(items[1].as_ref().unwrap().is_error);
    }

    #[test]
    fn test_tool_result_block_list_content() {
        let content = json!([
            {"type": "text", "text": "line one"},
            {"type": "image", "source": {}},
            {"type": "text", "text": "line two"}
        ]);
        assert_eq!(flatten_result_content(&content), "line one\nline two");
        assert_eq!(flatten_result_content(&Value::Null), "");
        assert_eq!(flatten_result_content(&json!(42)), "42");
    }

    #[test]
    fn test_unrecognized_shapes() {
        for value in [
            json!({"type": "system", "subtype": "init"}),
            json!({"type": "assistant"}),
            json!({"message": {"id": "msg_01"}}),
            json!({"type": "user", "message": {}}),
            json!({"type": "assistant", "message": {"content": null}}),
            json!([1, 2, 3]),
        ] {
            assert!(
                matches!(StreamEvent::from_value(&value), StreamEvent::Unrecognized { .. }),
                "expected unrecognized for {value}"
            );
        }
    }
}

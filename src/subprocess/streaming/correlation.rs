//! Pairs tool results with the invocations that produced them

use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// An invocation waiting for its result
#[derive(Debug, Clone)]
pub struct PendingTool {
    pub name: String,
    pub input: Value,
    pub started_at: Instant,
}

impl PendingTool {
    /// Time since the invocation was seen; never negative
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }
}

/// Map from tool invocation id to its pending entry.
///
/// Owned by a single parser. There is no bound on the number of entries;
/// a stream's lifetime bounds it.
#[derive(Debug, Default)]
pub struct ToolCorrelationTable {
    pending: HashMap<String, PendingTool>,
}

impl ToolCorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an invocation seen now
    pub fn record(&mut self, id: impl Into<String>, name: impl Into<String>, input: Value) {
        self.record_at(id, name, input, Instant::now());
    }

    /// Record an invocation with an explicit start time
    pub fn record_at(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        input: Value,
        started_at: Instant,
    ) {
        let id = id.into();
        let entry = PendingTool {
            name: name.into(),
            input,
            started_at,
        };
        if let Some(previous) = self.pending.insert(id.clone(), entry) {
            tracing::debug!(
                "Tool id {} reused while {} was still pending; keeping the newer invocation",
                id,
                previous.name
            );
        }
    }

    /// Remove and return the entry for `id`
    pub fn resolve(&mut self, id: &str) -> Option<PendingTool> {
        self.pending.remove(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_then_resolve() {
        let mut table = ToolCorrelationTable::new();
        let start = Instant::now();
        table.record_at("t1", "Bash", json!({"command": "ls"}), start);
        assert_eq!(table.len(), 1);

        let pending = table.resolve("t1").unwrap();
        assert_eq!(pending.name, "Bash");
        assert_eq!(pending.elapsed(start + Duration::from_millis(1500)).as_millis(), 1500);
        assert!(table.is_empty());
    }

    #[test]
    fn test_resolve_twice_is_not_found() {
        let mut table = ToolCorrelationTable::new();
        table.record("t1", "Read", json!({}));
        assert!(table.resolve("t1").is_some());
        assert!(table.resolve("t1").is_none());
        assert!(table.resolve("never-seen").is_none());
    }

    #[test]
    fn test_duplicate_id_keeps_single_entry() {
        let mut table = ToolCorrelationTable::new();
        table.record("t1", "Read", json!({}));
        table.record("t1", "Write", json!({}));
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("t1").unwrap().name, "Write");
    }

    #[test]
    fn test_elapsed_saturates_for_earlier_clock() {
        let now = Instant::now();
        let pending = PendingTool {
            name: "Bash".to_string(),
            input: Value::Null,
            started_at: now + Duration::from_secs(1),
        };
        assert_eq!(pending.elapsed(now), Duration::ZERO);
    }
}

//! Accumulated acquisition diagnostics.
//!
//! One `DebugMeta` lives for the duration of one acquisition. Every stage
//! writes the facts it learned into it; the map ends up in the caller's
//! return value and in any Failcase record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key holding the last pipeline stage reached (user-facing reason code).
pub const STEP_KEY: &str = "step";

/// Key a strategy sets when it fetched the condition report directly.
pub const ISOLATED_REPORT_KEY: &str = "isolated_report";

/// Structured debug metadata collected during one acquisition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DebugMeta(Map<String, Value>);

impl DebugMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key, replacing any previous value.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Append a value to the array stored under `key`, creating it if needed.
    pub fn push(&mut self, key: &str, value: impl Into<Value>) {
        let entry = self
            .0
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => items.push(value.into()),
            other => {
                let previous = other.take();
                *other = Value::Array(vec![previous, value.into()]);
            }
        }
    }

    /// Record the pipeline stage currently executing.
    pub fn step(&mut self, step: &str) {
        self.set(STEP_KEY, step);
    }

    pub fn current_step(&self) -> Option<&str> {
        self.0.get(STEP_KEY).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Whether the strategy marked the bytes as an already-isolated report.
    pub fn is_isolated_report(&self) -> bool {
        self.get_bool(ISOLATED_REPORT_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_creates_array() {
        let mut debug = DebugMeta::new();
        debug.push("tried", "a");
        debug.push("tried", "b");
        assert_eq!(debug.get("tried"), Some(&serde_json::json!(["a", "b"])));
    }

    #[test]
    fn test_push_onto_scalar_wraps_it() {
        let mut debug = DebugMeta::new();
        debug.set("tried", "a");
        debug.push("tried", "b");
        assert_eq!(debug.get("tried"), Some(&serde_json::json!(["a", "b"])));
    }

    #[test]
    fn test_step_and_isolated_flag() {
        let mut debug = DebugMeta::new();
        assert!(!debug.is_isolated_report());
        debug.step("discovery");
        debug.set(ISOLATED_REPORT_KEY, true);
        assert_eq!(debug.current_step(), Some("discovery"));
        assert!(debug.is_isolated_report());
    }
}

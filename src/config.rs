use std::collections::HashMap;

use serde_json::Value;

/// Global key disabling the suppression system entirely.
pub const NOSEC: &str = "nosec";
/// Global key replacing the default `#nosec` suppression token.
pub const NOSEC_ALTERNATIVE: &str = "nosec-alternative";

const DEFAULT_NOSEC_TAG: &str = "#nosec";

/// Flat key/value configuration. The analyzer reads the two global keys;
/// per-rule keys are passed through to the rule builders untouched.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<String, Value>,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key)?.as_str()
    }

    /// Whether the `#nosec` suppression system is globally disabled.
    pub fn is_nosec_disabled(&self) -> bool {
        self.get_bool(NOSEC).unwrap_or(false)
    }

    /// The active suppression token.
    pub fn nosec_tag(&self) -> &str {
        self.get_str(NOSEC_ALTERNATIVE).unwrap_or(DEFAULT_NOSEC_TAG)
    }
}

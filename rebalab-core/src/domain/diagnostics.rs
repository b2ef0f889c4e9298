//! Per-step diagnostic values written by models, rules and the agent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiagnosticValue {
    Number(f64),
    Text(String),
}

/// Ordered label → value map. Entries are overwritten, never cleared implicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticLog(BTreeMap<String, DiagnosticValue>);

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, label: impl Into<String>, value: f64) {
        self.0.insert(label.into(), DiagnosticValue::Number(value));
    }

    pub fn note(&mut self, label: impl Into<String>, text: impl Into<String>) {
        self.0.insert(label.into(), DiagnosticValue::Text(text.into()));
    }

    pub fn get(&self, label: &str) -> Option<&DiagnosticValue> {
        self.0.get(label)
    }

    pub fn number(&self, label: &str) -> Option<f64> {
        match self.0.get(label) {
            Some(DiagnosticValue::Number(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DiagnosticValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_overwrites() {
        let mut log = DiagnosticLog::new();
        log.record("lambda", 0.5);
        log.record("lambda", 0.7);
        log.note("variant", "PAMR1");
        assert_eq!(log.number("lambda"), Some(0.7));
        assert_eq!(log.number("variant"), None);
        assert_eq!(log.len(), 2);
    }
}

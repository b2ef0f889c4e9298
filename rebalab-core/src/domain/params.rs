//! Named strategy parameters.
//!
//! Every model and rule declares the exact names it accepts through a
//! `ParamSpec`. A `ParamSet` carries values; numbers coming out of a
//! continuous search are rounded where an integer is expected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConfigError;

/// A single parameter value: numeric or a categorical choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Choice(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(v) => write!(f, "{v}"),
            ParamValue::Choice(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Choice(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Choice(s)
    }
}

/// Ordered name → value map.
///
/// `BTreeMap` keeps serialization (and therefore the fingerprint) stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    /// Values from `other` override values in `self`.
    pub fn merged(&self, other: &ParamSet) -> ParamSet {
        let mut out = self.clone();
        for (k, v) in &other.0 {
            out.0.insert(k.clone(), v.clone());
        }
        out
    }

    /// The subset of entries whose names `spec` accepts.
    pub fn restricted_to(&self, spec: &ParamSpec) -> ParamSet {
        ParamSet(
            self.0
                .iter()
                .filter(|(k, _)| spec.accepts(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn number(&self, name: &str) -> Result<f64, ConfigError> {
        match self.0.get(name) {
            Some(ParamValue::Number(v)) if v.is_finite() => Ok(*v),
            Some(ParamValue::Number(_)) => Err(ConfigError::InvalidValue {
                param: name.to_string(),
                reason: "not a finite number".into(),
            }),
            Some(ParamValue::Choice(_)) => Err(ConfigError::WrongType {
                param: name.to_string(),
                expected: "number",
            }),
            None => Err(ConfigError::MissingParam(name.to_string())),
        }
    }

    pub fn number_or(&self, name: &str, default: f64) -> Result<f64, ConfigError> {
        if self.contains(name) {
            self.number(name)
        } else {
            Ok(default)
        }
    }

    /// Integer parameter, rounded to nearest. Must be at least `min`.
    pub fn count(&self, name: &str, min: usize) -> Result<usize, ConfigError> {
        let v = self.number(name)?.round();
        if v < min as f64 {
            return Err(ConfigError::InvalidValue {
                param: name.to_string(),
                reason: format!("must be at least {min}, got {v}"),
            });
        }
        Ok(v as usize)
    }

    pub fn choice(&self, name: &str) -> Result<&str, ConfigError> {
        match self.0.get(name) {
            Some(ParamValue::Choice(s)) => Ok(s.as_str()),
            Some(ParamValue::Number(_)) => Err(ConfigError::WrongType {
                param: name.to_string(),
                expected: "string",
            }),
            None => Err(ConfigError::MissingParam(name.to_string())),
        }
    }

    /// Stable hex digest of the parameter set.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(&self.0).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

impl FromIterator<(String, ParamValue)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        ParamSet(iter.into_iter().collect())
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Parameter names a component accepts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSpec {
    pub required: Vec<String>,
    pub optional: Vec<String>,
}

impl ParamSpec {
    pub fn new(required: &[&str], optional: &[&str]) -> Self {
        Self {
            required: required.iter().map(|s| s.to_string()).collect(),
            optional: optional.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn accepts(&self, name: &str) -> bool {
        self.required.iter().chain(&self.optional).any(|n| n == name)
    }

    /// Union of two specs.
    pub fn join(mut self, other: ParamSpec) -> ParamSpec {
        for name in other.required {
            if !self.required.contains(&name) {
                self.required.push(name);
            }
        }
        for name in other.optional {
            if !self.accepts(&name) {
                self.optional.push(name);
            }
        }
        self
    }

    /// Reject unknown names and missing required ones.
    pub fn validate(&self, params: &ParamSet) -> Result<(), ConfigError> {
        if let Some(unknown) = params.names().find(|n| !self.accepts(n)) {
            return Err(ConfigError::UnknownParam(unknown.to_string()));
        }
        if let Some(missing) = self.required.iter().find(|n| !params.contains(n)) {
            return Err(ConfigError::MissingParam(missing.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_report_config_errors() {
        let p = ParamSet::new().with("sensitivity", 0.03).with("variant", "PAMR1");
        assert_eq!(p.number("sensitivity").unwrap(), 0.03);
        assert_eq!(p.choice("variant").unwrap(), "PAMR1");
        assert!(matches!(
            p.number("variant"),
            Err(ConfigError::WrongType { .. })
        ));
        assert_eq!(
            p.number("C"),
            Err(ConfigError::MissingParam("C".into()))
        );
        assert_eq!(p.number_or("C", 2444.0).unwrap(), 2444.0);
    }

    #[test]
    fn count_rounds_and_bounds() {
        let p = ParamSet::new().with("window", 6.6).with("ma1", 0.2);
        assert_eq!(p.count("window", 1).unwrap(), 7);
        assert!(p.count("ma1", 1).is_err());
    }

    #[test]
    fn spec_rejects_unknown_and_missing() {
        let spec = ParamSpec::new(&["eps", "window"], &["smooth"]);
        let ok = ParamSet::new().with("eps", 0.02).with("window", 7.0);
        assert!(spec.validate(&ok).is_ok());

        let unknown = ok.clone().with("bogus", 1.0);
        assert_eq!(
            spec.validate(&unknown),
            Err(ConfigError::UnknownParam("bogus".into()))
        );

        let missing = ParamSet::new().with("eps", 0.02);
        assert_eq!(
            spec.validate(&missing),
            Err(ConfigError::MissingParam("window".into()))
        );
    }

    #[test]
    fn fingerprint_is_order_independent() {
        let a = ParamSet::new().with("a", 1.0).with("b", "x");
        let b = ParamSet::new().with("b", "x").with("a", 1.0);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), a.clone().with("a", 2.0).fingerprint());
    }

    #[test]
    fn untagged_serde_roundtrip() {
        let p = ParamSet::new().with("C", 100.0).with("variant", "PAMR2");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"C":100.0,"variant":"PAMR2"}"#);
        let back: ParamSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}

//! Error taxonomy for strategies and their inputs.
//!
//! - `ConfigError`: bad parameter names, values or categorical choices. Fatal
//!   to the evaluation that triggered it.
//! - `DegenerateInputError`: inputs for which no meaningful allocation exists
//!   (zero portfolio value, too-short window, non-finite intermediate vectors).
//! - `StrategyError`: what `predict` / `update` / `rebalance` return.

use thiserror::Error;

/// Invalid strategy configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown value '{value}' for parameter '{param}'")]
    UnknownChoice { param: String, value: String },

    #[error("missing required parameter '{0}'")]
    MissingParam(String),

    #[error("unknown parameter '{0}'")]
    UnknownParam(String),

    #[error("moving average spans must satisfy fast < slow, got fast={fast} slow={slow}")]
    InvalidSpans { fast: usize, slow: usize },

    #[error("invalid value for '{param}': {reason}")]
    InvalidValue { param: String, reason: String },

    #[error("parameter '{param}' must be a {expected}")]
    WrongType {
        param: String,
        expected: &'static str,
    },

    #[error("unknown strategy kind '{0}'")]
    UnknownStrategy(String),
}

/// Input for which no allocation can be derived.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DegenerateInputError {
    #[error("total portfolio value is zero")]
    ZeroPortfolioValue,

    #[error("observation window is empty")]
    EmptyWindow,

    #[error("window has {available} rows but {required} are required")]
    InsufficientHistory { required: usize, available: usize },

    #[error("non-finite values in {stage}")]
    NonFinite { stage: &'static str },

    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Error returned by signal models, update rules and the agent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Degenerate(#[from] DegenerateInputError),
}

impl StrategyError {
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Malformed observation window at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindowError {
    #[error("window has no rows")]
    NoRows,

    #[error("window has no non-fiat assets")]
    NoAssets,

    #[error("series '{symbol}' has {actual} rows, expected {expected}")]
    RaggedSeries {
        symbol: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate symbol '{0}'")]
    DuplicateSymbol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_error_wraps_config() {
        let err: StrategyError = ConfigError::MissingParam("sensitivity".into()).into();
        assert!(err.is_config());
        assert_eq!(err.to_string(), "missing required parameter 'sensitivity'");
    }

    #[test]
    fn strategy_error_wraps_degenerate() {
        let err: StrategyError = DegenerateInputError::ZeroPortfolioValue.into();
        assert!(!err.is_config());
    }
}

//! Moving averages over a price series.
//!
//! All functions return a vector aligned with the input; positions before the
//! first complete window are NaN.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// KAMA fast smoothing constant, 2 / (2 + 1).
const KAMA_FAST: f64 = 2.0 / 3.0;
/// KAMA slow smoothing constant, 2 / (30 + 1).
const KAMA_SLOW: f64 = 2.0 / 31.0;

/// Which moving average a momentum model uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeanType {
    Simple,
    Exp,
    Kama,
}

impl MeanType {
    pub fn compute(&self, values: &[f64], span: usize) -> Vec<f64> {
        match self {
            MeanType::Simple => sma(values, span),
            MeanType::Exp => ewm(values, span),
            MeanType::Kama => kama(values, span),
        }
    }

    /// Index of the first non-NaN output for a given span.
    pub fn first_valid(&self, span: usize) -> usize {
        match self {
            MeanType::Simple => span.saturating_sub(1),
            MeanType::Exp => 0,
            MeanType::Kama => span,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MeanType::Simple => "simple",
            MeanType::Exp => "exp",
            MeanType::Kama => "kama",
        }
    }
}

impl fmt::Display for MeanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeanType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(MeanType::Simple),
            "exp" => Ok(MeanType::Exp),
            "kama" => Ok(MeanType::Kama),
            other => Err(ConfigError::UnknownChoice {
                param: "mean_type".into(),
                value: other.to_string(),
            }),
        }
    }
}

/// Simple rolling mean.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut sum: f64 = values[..period].iter().sum();
    result[period - 1] = sum / period as f64;
    for i in period..n {
        sum += values[i] - values[i - period];
        result[i] = sum / period as f64;
    }
    result
}

/// Span-parameterised exponential mean with bias adjustment.
///
/// Equivalent to weighting `values[t - i]` by `(1 - α)^i` over the whole
/// history and dividing by the weight sum, with `α = 2 / (span + 1)`.
/// Defined from the first value onward.
pub fn ewm(values: &[f64], span: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if span == 0 {
        return result;
    }

    let decay = 1.0 - 2.0 / (span as f64 + 1.0);
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &v) in values.iter().enumerate() {
        num = v + decay * num;
        den = 1.0 + decay * den;
        result[i] = num / den;
    }
    result
}

/// Kaufman adaptive moving average.
///
/// First value at index `period`, seeded with `values[period - 1]`.
/// Efficiency ratio = |net change over `period`| / Σ|bar-to-bar change|
/// (1 when the path length is zero); smoothing = (ER·(fast − slow) + slow)².
pub fn kama(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n <= period {
        return result;
    }

    let mut path: f64 = (1..=period)
        .map(|i| (values[i] - values[i - 1]).abs())
        .sum();
    let mut prev = values[period - 1];

    for t in period..n {
        if t > period {
            path += (values[t] - values[t - 1]).abs();
            path -= (values[t - period] - values[t - period - 1]).abs();
        }
        let change = values[t] - values[t - period];
        let er = if path <= change || path == 0.0 {
            1.0
        } else {
            (change / path).abs()
        };
        let sc = (er * (KAMA_FAST - KAMA_SLOW) + KAMA_SLOW).powi(2);
        prev += sc * (values[t] - prev);
        result[t] = prev;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn sma_basic() {
        let r = sma(&[1.0, 2.0, 3.0, 4.0], 2);
        assert!(r[0].is_nan());
        assert_approx(r[1], 1.5, DEFAULT_EPSILON);
        assert_approx(r[3], 3.5, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_too_short_is_all_nan() {
        assert!(sma(&[1.0, 2.0], 3).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ewm_matches_adjusted_weights() {
        // span 3 → α = 0.5; t=1: (2 + 0.5·1) / 1.5
        let r = ewm(&[1.0, 2.0, 3.0], 3);
        assert_approx(r[0], 1.0, DEFAULT_EPSILON);
        assert_approx(r[1], 2.5 / 1.5, DEFAULT_EPSILON);
        // t=2: (3 + 0.5·2 + 0.25·1) / 1.75
        assert_approx(r[2], 4.25 / 1.75, DEFAULT_EPSILON);
    }

    #[test]
    fn kama_constant_series_is_constant() {
        let r = kama(&[5.0; 10], 3);
        assert!(r[2].is_nan());
        for v in &r[3..] {
            assert_approx(*v, 5.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn kama_trending_series_uses_fast_constant() {
        // Monotonic series → ER = 1 → sc = fast²
        let values = [1.0, 2.0, 3.0, 4.0];
        let r = kama(&values, 2);
        let sc = KAMA_FAST * KAMA_FAST;
        let k2 = 2.0 + sc * (3.0 - 2.0);
        assert_approx(r[2], k2, DEFAULT_EPSILON);
        assert_approx(r[3], k2 + sc * (4.0 - k2), DEFAULT_EPSILON);
    }

    #[test]
    fn mean_type_parses_and_rejects() {
        assert_eq!("kama".parse::<MeanType>().unwrap(), MeanType::Kama);
        assert_eq!(
            "median".parse::<MeanType>(),
            Err(ConfigError::UnknownChoice {
                param: "mean_type".into(),
                value: "median".into()
            })
        );
    }
}

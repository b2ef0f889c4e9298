//! Fixed-target and no-signal models for the benchmark strategies.

use super::SignalModel;
use crate::domain::{ObservationWindow, ParamSet, ParamSpec, SignalVector};
use crate::error::{ConfigError, DegenerateInputError, StrategyError};

/// Constant target allocation re-applied every step.
///
/// Parameters are one weight per symbol, `w0..w{n-1}` with fiat last. The
/// weights are normalized over all symbols and the fiat share is dropped,
/// so the target never holds fiat. With no weights the target is uniform
/// over the non-fiat assets.
#[derive(Debug, Clone, Default)]
pub struct ConstantModel {
    weights: Vec<f64>,
}

impl ConstantModel {
    pub fn uniform() -> Self {
        Self::default()
    }

    /// Declare `n_symbols` weight parameters.
    pub fn with_symbols(n_symbols: usize) -> Self {
        Self {
            weights: vec![1.0; n_symbols],
        }
    }

    pub fn weight_param(i: usize) -> String {
        format!("w{i}")
    }
}

impl SignalModel for ConstantModel {
    fn name(&self) -> &str {
        "constant_rebalance"
    }

    fn warmup_rows(&self) -> usize {
        1
    }

    fn predict(&self, window: &ObservationWindow) -> Result<SignalVector, StrategyError> {
        let n = window.n_assets();
        if self.weights.is_empty() {
            return Ok(vec![1.0 / n as f64; n]);
        }
        if self.weights.len() != window.n_symbols() {
            return Err(DegenerateInputError::LengthMismatch {
                expected: window.n_symbols(),
                actual: self.weights.len(),
            }
            .into());
        }
        let total: f64 = self.weights.iter().map(|w| w.max(0.0)).sum();
        if total <= 0.0 {
            return Ok(vec![1.0 / n as f64; n]);
        }
        Ok(self.weights[..n].iter().map(|w| w.max(0.0) / total).collect())
    }

    fn param_spec(&self) -> ParamSpec {
        ParamSpec {
            required: (0..self.weights.len()).map(Self::weight_param).collect(),
            optional: Vec::new(),
        }
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)?;
        for (i, w) in self.weights.iter_mut().enumerate() {
            *w = params.number(&Self::weight_param(i))?;
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SignalModel> {
        Box::new(self.clone())
    }
}

/// Emits zeros; used where the rule ignores the signal.
#[derive(Debug, Clone, Default)]
pub struct FlatModel;

impl SignalModel for FlatModel {
    fn name(&self) -> &str {
        "flat"
    }

    fn warmup_rows(&self) -> usize {
        1
    }

    fn predict(&self, window: &ObservationWindow) -> Result<SignalVector, StrategyError> {
        Ok(vec![0.0; window.n_assets()])
    }

    fn param_spec(&self) -> ParamSpec {
        ParamSpec::empty()
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)
    }

    fn clone_box(&self) -> Box<dyn SignalModel> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> ObservationWindow {
        ObservationWindow::from_opens(
            &["A", "B"],
            "USDT",
            &[vec![1.0], vec![2.0]],
            &[1.0, 1.0],
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn uniform_without_weights() {
        assert_eq!(ConstantModel::uniform().predict(&window()).unwrap(), vec![0.5, 0.5]);
    }

    #[test]
    fn weights_normalized_over_all_symbols_then_fiat_dropped() {
        let mut model = ConstantModel::with_symbols(3);
        model
            .set_params(&ParamSet::new().with("w0", 1.0).with("w1", 2.0).with("w2", 1.0))
            .unwrap();
        assert_eq!(model.predict(&window()).unwrap(), vec![0.25, 0.5]);
    }

    #[test]
    fn weight_count_must_match_symbols() {
        let model = ConstantModel::with_symbols(2);
        assert!(model.predict(&window()).is_err());
    }
}

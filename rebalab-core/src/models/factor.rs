//! Weighted combination of injected sub-models.

use super::SignalModel;
use crate::domain::{ObservationWindow, ParamSet, ParamSpec, SignalVector};
use crate::error::{ConfigError, DegenerateInputError, StrategyError};

/// Bounds of the weight search range for each sub-model.
pub const WEIGHT_RANGE: (f64, f64) = (1e-5, 1.0);

/// `Σ_k weight_k · model_k.predict(window)`.
///
/// Each sub-model contributes a `<name>_weight` parameter. Sub-model
/// parameters themselves are fixed at construction.
#[derive(Debug, Clone)]
pub struct FactorModel {
    factors: Vec<Box<dyn SignalModel>>,
    weights: Vec<f64>,
}

impl FactorModel {
    pub fn new(factors: Vec<Box<dyn SignalModel>>) -> Result<Self, ConfigError> {
        if factors.is_empty() {
            return Err(ConfigError::InvalidValue {
                param: "factors".into(),
                reason: "at least one sub-model is required".into(),
            });
        }
        let mut names: Vec<&str> = factors.iter().map(|f| f.name()).collect();
        names.sort_unstable();
        if let Some(dup) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(ConfigError::InvalidValue {
                param: "factors".into(),
                reason: format!("sub-model '{}' appears more than once", dup[0]),
            });
        }
        let weights = vec![1.0; factors.len()];
        Ok(Self { factors, weights })
    }

    pub fn weight_param(model: &dyn SignalModel) -> String {
        format!("{}_weight", model.name())
    }

    /// `(parameter name, min, max)` for each sub-model weight.
    pub fn weight_dimensions(&self) -> Vec<(String, f64, f64)> {
        self.factors
            .iter()
            .map(|f| (Self::weight_param(f.as_ref()), WEIGHT_RANGE.0, WEIGHT_RANGE.1))
            .collect()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl SignalModel for FactorModel {
    fn name(&self) -> &str {
        "factor"
    }

    fn warmup_rows(&self) -> usize {
        self.factors
            .iter()
            .map(|f| f.warmup_rows())
            .max()
            .unwrap_or(1)
    }

    fn predict(&self, window: &ObservationWindow) -> Result<SignalVector, StrategyError> {
        let mut action = vec![0.0; window.n_assets()];
        for (weight, factor) in self.weights.iter().zip(&self.factors) {
            let signal = factor.predict(window)?;
            if signal.len() != action.len() {
                return Err(DegenerateInputError::LengthMismatch {
                    expected: action.len(),
                    actual: signal.len(),
                }
                .into());
            }
            for (a, s) in action.iter_mut().zip(&signal) {
                *a += weight * s;
            }
        }
        Ok(action)
    }

    fn param_spec(&self) -> ParamSpec {
        let names: Vec<String> = self
            .factors
            .iter()
            .map(|f| Self::weight_param(f.as_ref()))
            .collect();
        ParamSpec {
            required: names,
            optional: Vec::new(),
        }
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)?;
        for (weight, factor) in self.weights.iter_mut().zip(&self.factors) {
            *weight = params.number(&Self::weight_param(factor.as_ref()))?;
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SignalModel> {
        Box::new(self.clone())
    }
}

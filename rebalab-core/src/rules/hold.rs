//! Rules for the benchmark strategies.

use super::{with_fiat_slot, UpdateRule};
use crate::domain::{Allocation, DiagnosticLog, ParamSet, ParamSpec};
use crate::error::{ConfigError, StrategyError};
use crate::numeric::ensure_finite;
use crate::projection::project_simplex;

/// Ignore the previous allocation and apply the model's target, fiat at 0.
#[derive(Debug, Clone, Default)]
pub struct HoldUpdate;

impl UpdateRule for HoldUpdate {
    fn name(&self) -> &str {
        "hold_target"
    }

    fn update(
        &self,
        prev: &Allocation,
        signal: &[f64],
        _log: &mut DiagnosticLog,
    ) -> Result<Allocation, StrategyError> {
        let target = with_fiat_slot(signal, prev.len(), 0.0)?;
        ensure_finite(&target, "constant target")?;
        Ok(project_simplex(&target))
    }

    fn param_spec(&self) -> ParamSpec {
        ParamSpec::empty()
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)
    }

    fn clone_box(&self) -> Box<dyn UpdateRule> {
        Box::new(self.clone())
    }
}

/// Keep whatever the portfolio drifted to; never trades after the first step.
#[derive(Debug, Clone, Default)]
pub struct DriftUpdate;

impl UpdateRule for DriftUpdate {
    fn name(&self) -> &str {
        "drift"
    }

    fn update(
        &self,
        prev: &Allocation,
        _signal: &[f64],
        _log: &mut DiagnosticLog,
    ) -> Result<Allocation, StrategyError> {
        ensure_finite(prev.weights(), "current allocation")?;
        Ok(project_simplex(prev.weights()))
    }

    fn param_spec(&self) -> ParamSpec {
        ParamSpec::empty()
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)
    }

    fn clone_box(&self) -> Box<dyn UpdateRule> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_applies_target_regardless_of_prev() {
        let prev = Allocation::from_raw(vec![0.0, 0.0, 1.0]);
        let mut log = DiagnosticLog::new();
        let next = HoldUpdate.update(&prev, &[0.25, 0.75], &mut log).unwrap();
        assert_eq!(next.weights(), &[0.25, 0.75, 0.0]);
    }

    #[test]
    fn drift_returns_current_weights() {
        let prev = Allocation::from_raw(vec![0.6, 0.3, 0.1]);
        let mut log = DiagnosticLog::new();
        let next = DriftUpdate.update(&prev, &[0.0, 0.0], &mut log).unwrap();
        for (a, b) in next.iter().zip(prev.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}

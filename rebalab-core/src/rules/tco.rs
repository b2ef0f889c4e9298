//! Transaction-cost-aware update.
//!
//! The predicted relatives are normalized by the predicted portfolio growth,
//! `v = x / (b · x + ε)`, then each coordinate's deviation from the mean is
//! soft-thresholded by `toff` before being added to the previous allocation.
//! Small deviations never trade.

use super::{with_fiat_slot, UpdateRule};
use crate::domain::{Allocation, DiagnosticLog, ParamSet, ParamSpec, EPSILON};
use crate::error::{ConfigError, StrategyError};
use crate::numeric::{dot, ensure_finite, mean};
use crate::projection::project_simplex;

#[derive(Debug, Clone)]
pub struct TcoUpdate {
    pub toff: f64,
}

impl Default for TcoUpdate {
    fn default() -> Self {
        Self { toff: 0.1 }
    }
}

/// `sign(d) · max(|d| − threshold, 0)`
fn soft_threshold(d: f64, threshold: f64) -> f64 {
    if d == 0.0 {
        return 0.0;
    }
    d.signum() * (d.abs() - threshold).max(0.0)
}

impl UpdateRule for TcoUpdate {
    fn name(&self) -> &str {
        "tco_update"
    }

    fn update(
        &self,
        prev: &Allocation,
        signal: &[f64],
        log: &mut DiagnosticLog,
    ) -> Result<Allocation, StrategyError> {
        let x = with_fiat_slot(signal, prev.len(), 1.0)?;
        let growth = dot(prev.weights(), &x);
        let v: Vec<f64> = x.iter().map(|xi| xi / (growth + EPSILON)).collect();
        let v_mean = mean(&v);

        let b: Vec<f64> = prev
            .iter()
            .zip(&v)
            .map(|(bi, vi)| bi + soft_threshold(vi - v_mean, self.toff))
            .collect();
        ensure_finite(&b, "tco update")?;

        log.record("predicted_growth", growth);
        Ok(project_simplex(&b))
    }

    fn param_spec(&self) -> ParamSpec {
        ParamSpec::new(&["toff"], &[])
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)?;
        let toff = params.number("toff")?;
        if toff < 0.0 {
            return Err(ConfigError::InvalidValue {
                param: "toff".into(),
                reason: format!("must be non-negative, got {toff}"),
            });
        }
        self.toff = toff;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn UpdateRule> {
        Box::new(self.clone())
    }
}

//! Update rules: turn the previous allocation and a signal into a new allocation.
//!
//! Every rule ends in `project_simplex`. Pre-projection vectors that are not
//! finite are rejected with `DegenerateInputError::NonFinite`. Step sizes of
//! the passive-aggressive family are clamped to `[0, cap]`.

pub mod asymmetric;
pub mod hold;
pub mod passive_aggressive;
pub mod tco;

pub use asymmetric::{AsymmetricStep, StepDirection, VolatilityScaledStep};
pub use hold::{DriftUpdate, HoldUpdate};
pub use passive_aggressive::{MomentumUpdate, OlmarUpdate, PamrUpdate, PamrVariant, StmrUpdate};
pub use tco::TcoUpdate;

use std::fmt::Debug;

use crate::domain::{Allocation, DiagnosticLog, ObservationWindow, ParamSet, ParamSpec, SignalVector};
use crate::error::{ConfigError, DegenerateInputError, StrategyError};

pub trait UpdateRule: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Rescale a raw model signal using the window before `update`.
    fn condition(
        &self,
        _window: &ObservationWindow,
        signal: SignalVector,
    ) -> Result<SignalVector, StrategyError> {
        Ok(signal)
    }

    /// New allocation from the previous one. `prev` includes the fiat slot.
    fn update(
        &self,
        prev: &Allocation,
        signal: &[f64],
        log: &mut DiagnosticLog,
    ) -> Result<Allocation, StrategyError>;

    fn param_spec(&self) -> ParamSpec;

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError>;

    fn clone_box(&self) -> Box<dyn UpdateRule>;
}

impl Clone for Box<dyn UpdateRule> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Extend an asset-only signal to `len` entries with `fiat` in the last slot.
///
/// A signal that already has `len` entries is returned unchanged.
pub(crate) fn with_fiat_slot(
    signal: &[f64],
    len: usize,
    fiat: f64,
) -> Result<Vec<f64>, DegenerateInputError> {
    if signal.len() == len {
        return Ok(signal.to_vec());
    }
    if signal.len() + 1 == len {
        let mut out = signal.to_vec();
        out.push(fiat);
        return Ok(out);
    }
    Err(DegenerateInputError::LengthMismatch {
        expected: len,
        actual: signal.len(),
    })
}

/// First `n_assets` entries of a signal that may carry a fiat slot.
pub(crate) fn asset_slots(signal: &[f64], n_assets: usize) -> Result<&[f64], DegenerateInputError> {
    if signal.len() == n_assets || signal.len() == n_assets + 1 {
        Ok(&signal[..n_assets])
    } else {
        Err(DegenerateInputError::LengthMismatch {
            expected: n_assets,
            actual: signal.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fiat_slot_is_appended_once() {
        assert_eq!(with_fiat_slot(&[1.1, 0.9], 3, 1.0).unwrap(), vec![1.1, 0.9, 1.0]);
        assert_eq!(with_fiat_slot(&[1.1, 0.9], 2, 1.0).unwrap(), vec![1.1, 0.9]);
        assert!(with_fiat_slot(&[1.1], 3, 1.0).is_err());
    }

    #[test]
    fn asset_slots_drop_fiat() {
        assert_eq!(asset_slots(&[0.1, 0.2, 0.0], 2).unwrap(), &[0.1, 0.2]);
        assert!(asset_slots(&[0.1], 2).is_err());
    }
}

//! Decay-smoothed signed steps with asymmetric up/down coefficients.
//!
//! For each non-fiat asset:
//! `w_i = max(0, decay · prev_i + (1 − decay) + direction · α(s_i) · s_i)`
//! where `α` is `alpha_up` for `s_i ≥ 0` and `alpha_down` otherwise. The fiat
//! slot takes the residual `max(0, 1 − Σ w_i)` and the result is projected.

use serde::{Deserialize, Serialize};

use super::{asset_slots, UpdateRule};
use crate::domain::{
    Allocation, DiagnosticLog, ObservationWindow, ParamSet, ParamSpec, SignalVector, EPSILON,
};
use crate::error::{ConfigError, StrategyError};
use crate::indicators::rolling_std_last;
use crate::numeric::ensure_finite;
use crate::projection::project_simplex;

/// Whether the step follows the signal or leans against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepDirection {
    Follow,
    Against,
}

impl StepDirection {
    fn sign(self) -> f64 {
        match self {
            StepDirection::Follow => 1.0,
            StepDirection::Against => -1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AsymmetricStep {
    pub decay: f64,
    pub alpha_up: f64,
    pub alpha_down: f64,
    pub direction: StepDirection,
    /// Whether `decay` is a tunable parameter of this rule.
    tunable_decay: bool,
}

impl AsymmetricStep {
    /// Step with a tunable decay (harmonic rebalancing).
    pub fn smoothed(decay: f64, direction: StepDirection) -> Self {
        Self {
            decay,
            alpha_up: 1.0,
            alpha_down: 1.0,
            direction,
            tunable_decay: true,
        }
    }

    /// Step from the previous allocation without smoothing (decay fixed at 1).
    pub fn plain(direction: StepDirection) -> Self {
        Self {
            decay: 1.0,
            alpha_up: 1.0,
            alpha_down: 1.0,
            direction,
            tunable_decay: false,
        }
    }

    fn alpha(&self, s: f64) -> f64 {
        if s >= 0.0 {
            self.alpha_up
        } else {
            self.alpha_down
        }
    }
}

impl UpdateRule for AsymmetricStep {
    fn name(&self) -> &str {
        "asymmetric_step"
    }

    fn update(
        &self,
        prev: &Allocation,
        signal: &[f64],
        _log: &mut DiagnosticLog,
    ) -> Result<Allocation, StrategyError> {
        let n_assets = prev.len().saturating_sub(1);
        let s = asset_slots(signal, n_assets)?;
        let sign = self.direction.sign();

        let mut w: Vec<f64> = prev.weights()[..n_assets]
            .iter()
            .zip(s)
            .map(|(p, si)| {
                (self.decay * p + (1.0 - self.decay) + sign * self.alpha(*si) * si).max(0.0)
            })
            .collect();
        let residual = (1.0 - w.iter().sum::<f64>()).max(0.0);
        w.push(residual);
        ensure_finite(&w, "asymmetric step")?;

        Ok(project_simplex(&w))
    }

    fn param_spec(&self) -> ParamSpec {
        if self.tunable_decay {
            ParamSpec::new(&["decay", "alpha_up", "alpha_down"], &[])
        } else {
            ParamSpec::new(&["alpha_up", "alpha_down"], &[])
        }
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)?;
        if self.tunable_decay {
            self.decay = params.number("decay")?;
        }
        self.alpha_up = params.number("alpha_up")?;
        self.alpha_down = params.number("alpha_down")?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn UpdateRule> {
        Box::new(self.clone())
    }
}

// ─── Volatility-scaled step ──────────────────────────────────────────

/// `AsymmetricStep` whose signal is first divided by each asset's relative
/// volatility: `s_i / (std_weight · std_i / open_i + ε)`, with `std_i` the
/// centered rolling std over `std_window` rows at the last position.
#[derive(Debug, Clone)]
pub struct VolatilityScaledStep {
    step: AsymmetricStep,
    pub std_window: usize,
    pub std_weight: f64,
}

impl VolatilityScaledStep {
    pub fn new(std_window: usize, std_weight: f64) -> Self {
        Self {
            step: AsymmetricStep::plain(StepDirection::Follow),
            std_window: std_window.max(1),
            std_weight,
        }
    }
}

impl Default for VolatilityScaledStep {
    fn default() -> Self {
        Self::new(3, 1.0)
    }
}

impl UpdateRule for VolatilityScaledStep {
    fn name(&self) -> &str {
        "volatility_scaled_step"
    }

    fn condition(
        &self,
        window: &ObservationWindow,
        signal: SignalVector,
    ) -> Result<SignalVector, StrategyError> {
        let s = asset_slots(&signal, window.n_assets())?;
        let scaled: Vec<f64> = s
            .iter()
            .enumerate()
            .map(|(i, si)| {
                let opens = window.opens(i);
                let last = opens.last().copied().unwrap_or(f64::NAN);
                let rel_vol = self.std_weight * rolling_std_last(&opens, self.std_window, true) / last;
                si / (rel_vol + EPSILON)
            })
            .collect();
        ensure_finite(&scaled, "volatility scaling")?;
        Ok(scaled)
    }

    fn update(
        &self,
        prev: &Allocation,
        signal: &[f64],
        log: &mut DiagnosticLog,
    ) -> Result<Allocation, StrategyError> {
        self.step.update(prev, signal, log)
    }

    fn param_spec(&self) -> ParamSpec {
        ParamSpec::new(&["std_window", "std_weight"], &[]).join(self.step.param_spec())
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)?;
        self.std_window = params.count("std_window", 1)?;
        self.std_weight = params.number("std_weight")?;
        self.step
            .set_params(&params.restricted_to(&self.step.param_spec()))
    }

    fn clone_box(&self) -> Box<dyn UpdateRule> {
        Box::new(self.clone())
    }
}

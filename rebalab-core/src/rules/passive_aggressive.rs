//! Passive-aggressive updates: move the previous allocation along the
//! centered signal just far enough to satisfy a loss threshold.
//!
//! All variants compute `x̄ = mean(x)`, `portvar = b · x`, a step size λ from
//! a loss and `‖x − x̄‖²`, then `b + λ (x − x̄)` projected onto the simplex.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{asset_slots, with_fiat_slot, UpdateRule};
use crate::domain::{Allocation, DiagnosticLog, ParamSet, ParamSpec, EPSILON};
use crate::error::{ConfigError, StrategyError};
use crate::numeric::{centered_norm_sq, dot, ensure_finite, mean};
use crate::projection::project_simplex;

/// Step-size ceiling for PAMR and OLMAR.
pub const PAMR_LAMBDA_CAP: f64 = 1e5;
/// Step-size ceiling for the momentum and short-term reversion updates.
pub const MOMENTUM_LAMBDA_CAP: f64 = 1e6;

/// `b + step · (x − x̄)`, checked for finiteness.
fn shifted(b: &[f64], x: &[f64], step: f64, stage: &'static str) -> Result<Vec<f64>, StrategyError> {
    let x_mean = mean(x);
    let out: Vec<f64> = b
        .iter()
        .zip(x)
        .map(|(bi, xi)| bi + step * (xi - x_mean))
        .collect();
    ensure_finite(&out, stage)?;
    Ok(out)
}

// ─── Momentum ────────────────────────────────────────────────────────

/// Step toward assets whose predicted relative exceeds the mean.
///
/// `change = (|portvar − 1| + max|x − 1|) / 2`,
/// `λ = clip((change − sensitivity) / (‖x − x̄‖² + ε), 0, 1e6)`.
#[derive(Debug, Clone)]
pub struct MomentumUpdate {
    pub sensitivity: f64,
}

impl Default for MomentumUpdate {
    fn default() -> Self {
        Self { sensitivity: 0.1 }
    }
}

impl UpdateRule for MomentumUpdate {
    fn name(&self) -> &str {
        "momentum_update"
    }

    fn update(
        &self,
        prev: &Allocation,
        signal: &[f64],
        log: &mut DiagnosticLog,
    ) -> Result<Allocation, StrategyError> {
        let x = with_fiat_slot(signal, prev.len(), 1.0)?;
        let x_mean = mean(&x);
        let portvar = dot(prev.weights(), &x);

        let max_dev = x.iter().map(|v| (v - 1.0).abs()).fold(0.0, f64::max);
        let change = ((portvar - 1.0).abs() + max_dev) / 2.0;
        let lam = ((change - self.sensitivity) / (centered_norm_sq(&x) + EPSILON))
            .clamp(0.0, MOMENTUM_LAMBDA_CAP);

        log.record("lambda", lam);
        log.record("mean_pct_change_prediction", (1.0 / x_mean - 1.0) * 100.0);
        log.record("portfolio_pct_change_prediction", (1.0 / portvar - 1.0) * 100.0);

        let b = shifted(prev.weights(), &x, lam, "momentum update")?;
        Ok(project_simplex(&b))
    }

    fn param_spec(&self) -> ParamSpec {
        ParamSpec::new(&[], &["sensitivity"])
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)?;
        self.sensitivity = params.number_or("sensitivity", self.sensitivity)?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn UpdateRule> {
        Box::new(self.clone())
    }
}

// ─── PAMR ────────────────────────────────────────────────────────────

/// How the PAMR step size is derived from the loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PamrVariant {
    /// `λ = ℓ / ‖x − x̄‖²`
    Pamr0,
    /// `λ = min(C, ℓ / ‖x − x̄‖²)`
    Pamr1,
    /// `λ = ℓ / (‖x − x̄‖² + 0.5 / C)`
    Pamr2,
}

impl fmt::Display for PamrVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PamrVariant::Pamr0 => "PAMR0",
            PamrVariant::Pamr1 => "PAMR1",
            PamrVariant::Pamr2 => "PAMR2",
        })
    }
}

impl FromStr for PamrVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAMR" | "PAMR0" => Ok(PamrVariant::Pamr0),
            "PAMR1" => Ok(PamrVariant::Pamr1),
            "PAMR2" => Ok(PamrVariant::Pamr2),
            other => Err(ConfigError::UnknownChoice {
                param: "variant".into(),
                value: other.to_string(),
            }),
        }
    }
}

/// Passive-aggressive mean reversion on price relatives.
///
/// The loss is the distance of `portvar` outside `[1 − s, 1 + s]`. The step
/// always moves weight toward assets whose price fell (high `x`). Inside the
/// band the allocation is only re-projected.
#[derive(Debug, Clone)]
pub struct PamrUpdate {
    pub sensitivity: f64,
    pub c: f64,
    pub variant: PamrVariant,
}

impl Default for PamrUpdate {
    fn default() -> Self {
        Self {
            sensitivity: 0.03,
            c: 2444.0,
            variant: PamrVariant::Pamr1,
        }
    }
}

impl PamrUpdate {
    /// Distance of the portfolio relative outside the sensitivity band.
    fn loss(&self, portvar: f64) -> f64 {
        if portvar > 1.0 + self.sensitivity {
            portvar - (1.0 + self.sensitivity)
        } else if portvar < 1.0 - self.sensitivity {
            (1.0 - self.sensitivity) - portvar
        } else {
            0.0
        }
    }

    fn step_size(&self, loss: f64, norm_sq: f64) -> f64 {
        let lam = match self.variant {
            PamrVariant::Pamr0 => loss / (norm_sq + EPSILON),
            PamrVariant::Pamr1 => (loss / (norm_sq + EPSILON)).min(self.c),
            PamrVariant::Pamr2 => loss / (norm_sq + 0.5 / self.c + EPSILON),
        };
        lam.clamp(0.0, PAMR_LAMBDA_CAP)
    }
}

impl UpdateRule for PamrUpdate {
    fn name(&self) -> &str {
        "pamr_update"
    }

    fn update(
        &self,
        prev: &Allocation,
        signal: &[f64],
        log: &mut DiagnosticLog,
    ) -> Result<Allocation, StrategyError> {
        let x = with_fiat_slot(signal, prev.len(), 1.0)?;
        let portvar = dot(prev.weights(), &x);
        let lam = self.step_size(self.loss(portvar), centered_norm_sq(&x));

        log.record("lambda", lam);

        let b = shifted(prev.weights(), &x, lam, "pamr update")?;
        Ok(project_simplex(&b))
    }

    fn param_spec(&self) -> ParamSpec {
        ParamSpec::new(&["sensitivity", "variant"], &["C"])
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)?;
        let c = params.number_or("C", self.c)?;
        if c <= 0.0 {
            return Err(ConfigError::InvalidValue {
                param: "C".into(),
                reason: format!("must be positive, got {c}"),
            });
        }
        self.sensitivity = params.number("sensitivity")?;
        self.variant = params.choice("variant")?.parse()?;
        self.c = c;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn UpdateRule> {
        Box::new(self.clone())
    }
}

// ─── STMR ────────────────────────────────────────────────────────────

/// Short-term reversion on centered returns.
///
/// `change = |(portvar + x[argmax |x|]) / 2|`,
/// `λ = clip((change − sensitivity) / ‖x − x̄‖², 0, 1e6)`, zero when the
/// norm vanishes.
#[derive(Debug, Clone)]
pub struct StmrUpdate {
    pub sensitivity: f64,
}

impl Default for StmrUpdate {
    fn default() -> Self {
        Self { sensitivity: 0.02 }
    }
}

impl UpdateRule for StmrUpdate {
    fn name(&self) -> &str {
        "stmr_update"
    }

    fn update(
        &self,
        prev: &Allocation,
        signal: &[f64],
        log: &mut DiagnosticLog,
    ) -> Result<Allocation, StrategyError> {
        let x = with_fiat_slot(signal, prev.len(), 0.0)?;
        let portvar = dot(prev.weights(), &x);
        let extreme = x
            .iter()
            .copied()
            .max_by(|a, b| a.abs().total_cmp(&b.abs()))
            .unwrap_or(0.0);
        let change = ((portvar + extreme) / 2.0).abs();

        let norm_sq = centered_norm_sq(&x);
        let lam = if norm_sq > 0.0 {
            ((change - self.sensitivity) / norm_sq).clamp(0.0, MOMENTUM_LAMBDA_CAP)
        } else {
            0.0
        };

        log.record("lambda", lam);

        let b = shifted(prev.weights(), &x, lam, "stmr update")?;
        Ok(project_simplex(&b))
    }

    fn param_spec(&self) -> ParamSpec {
        ParamSpec::new(&["sensitivity"], &[])
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)?;
        self.sensitivity = params.number("sensitivity")?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn UpdateRule> {
        Box::new(self.clone())
    }
}

// ─── OLMAR ───────────────────────────────────────────────────────────

/// Moving-average reversion update on the non-fiat slots only.
///
/// `λ = max(0, (b·x − 1 − eps) / ‖x − x̄‖²)` when `b·x ≥ 1`, otherwise
/// `max(0, (1 − eps − b·x) / ‖x − x̄‖²)`, capped at 1e5 and damped by
/// `smooth`. The fiat weight is appended as 0 after projection.
#[derive(Debug, Clone)]
pub struct OlmarUpdate {
    pub eps: f64,
    pub smooth: f64,
}

impl Default for OlmarUpdate {
    fn default() -> Self {
        Self {
            eps: 0.02,
            smooth: 0.5,
        }
    }
}

impl UpdateRule for OlmarUpdate {
    fn name(&self) -> &str {
        "olmar_update"
    }

    fn update(
        &self,
        prev: &Allocation,
        signal: &[f64],
        log: &mut DiagnosticLog,
    ) -> Result<Allocation, StrategyError> {
        let n_assets = prev.len().saturating_sub(1);
        let b = &prev.weights()[..n_assets];
        let x = asset_slots(signal, n_assets)?;

        let portvar = dot(b, x);
        let norm_sq = centered_norm_sq(x) + EPSILON;
        let raw = if portvar >= 1.0 {
            (portvar - 1.0 - self.eps) / norm_sq
        } else {
            (1.0 - self.eps - portvar) / norm_sq
        };
        let lam = raw.clamp(0.0, PAMR_LAMBDA_CAP);

        log.record("lambda", lam);

        let moved = shifted(b, x, self.smooth * lam, "olmar update")?;
        let mut weights = project_simplex(&moved).into_inner();
        weights.push(0.0);
        Ok(Allocation::from_raw(weights))
    }

    fn param_spec(&self) -> ParamSpec {
        ParamSpec::new(&["eps", "smooth"], &[])
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)?;
        self.eps = params.number("eps")?;
        self.smooth = params.number("smooth")?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn UpdateRule> {
        Box::new(self.clone())
    }
}

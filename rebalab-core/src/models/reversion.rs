//! Mean-reversion signals: price relatives and moving-average reversion.

use super::SignalModel;
use crate::domain::{DiagnosticLog, ObservationWindow, ParamSet, ParamSpec, SignalVector, EPSILON};
use crate::error::{ConfigError, StrategyError};
use crate::indicators::{pct_change, sample_std};
use crate::numeric::ensure_finite;

/// `open[t-1] / open[t]` for one asset.
fn price_relative(window: &ObservationWindow, asset: usize) -> f64 {
    let cur = window.open_at(asset, 0).unwrap_or(f64::NAN);
    let prev = window.open_at(asset, 1).unwrap_or(f64::NAN);
    prev / (cur + EPSILON)
}

// ─── PAMR ────────────────────────────────────────────────────────────

/// Previous open over current open per asset.
#[derive(Debug, Clone, Default)]
pub struct PriceRelativeModel;

impl SignalModel for PriceRelativeModel {
    fn name(&self) -> &str {
        "pamr"
    }

    fn warmup_rows(&self) -> usize {
        2
    }

    fn predict(&self, window: &ObservationWindow) -> Result<SignalVector, StrategyError> {
        window.require_rows(2)?;
        let x: Vec<f64> = (0..window.n_assets())
            .map(|i| price_relative(window, i))
            .collect();
        ensure_finite(&x, "price relative")?;
        Ok(x)
    }

    fn annotate(&self, window: &ObservationWindow, signal: &[f64], log: &mut DiagnosticLog) {
        for (asset, x) in window.assets().iter().zip(signal) {
            log.record(
                format!("price_pct_change.{}", asset.symbol),
                100.0 * (1.0 / (x + EPSILON) - 1.0),
            );
        }
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

// ─── OLMAR ───────────────────────────────────────────────────────────

/// Mean of the `window` opens before the current row, over the current open.
///
/// Shorter histories average whatever rows precede the current one.
#[derive(Debug, Clone)]
pub struct MovingAverageReversionModel {
    window: usize,
}

impl MovingAverageReversionModel {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }
}

impl Default for MovingAverageReversionModel {
    fn default() -> Self {
        Self::new(7)
    }
}

impl SignalModel for MovingAverageReversionModel {
    fn name(&self) -> &str {
        "olmar"
    }

    fn warmup_rows(&self) -> usize {
        2
    }

    fn predict(&self, window: &ObservationWindow) -> Result<SignalVector, StrategyError> {
        window.require_rows(2)?;
        let x: Vec<f64> = (0..window.n_assets())
            .map(|i| {
                let opens = window.opens(i);
                let n = opens.len();
                let history = &opens[n.saturating_sub(self.window + 1)..n - 1];
                let avg = history.iter().sum::<f64>() / history.len() as f64;
                avg / (opens[n - 1] + EPSILON)
            })
            .collect();
        ensure_finite(&x, "moving average relative")?;
        Ok(x)
    }

    fn param_spec(&self) -> ParamSpec {
        ParamSpec::new(&["window"], &[])
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)?;
        self.window = params.count("window", 1)?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SignalModel> {
        Box::new(self.clone())
    }
}

// ─── STMR ────────────────────────────────────────────────────────────

/// Price relative minus one, divided by a cross-asset dispersion regularizer.
///
/// `reg = ‖std of pct changes over the last std_window rows‖₂ / √n_symbols + 1`.
#[derive(Debug, Clone)]
pub struct ShortTermReversionModel {
    std_window: usize,
}

impl ShortTermReversionModel {
    pub const MIN_STD_WINDOW: usize = 3;

    pub fn new(std_window: usize) -> Self {
        Self {
            std_window: std_window.max(Self::MIN_STD_WINDOW),
        }
    }

    pub fn regularizer(&self, window: &ObservationWindow) -> f64 {
        let norm_sq: f64 = (0..window.n_assets())
            .map(|i| {
                let opens = window.opens(i);
                let start = opens.len().saturating_sub(self.std_window + 1);
                sample_std(&pct_change(&opens[start..])).powi(2)
            })
            .sum();
        norm_sq.sqrt() / (window.n_symbols() as f64).sqrt() + 1.0
    }
}

impl Default for ShortTermReversionModel {
    fn default() -> Self {
        Self::new(Self::MIN_STD_WINDOW)
    }
}

impl SignalModel for ShortTermReversionModel {
    fn name(&self) -> &str {
        "stmr"
    }

    fn warmup_rows(&self) -> usize {
        2
    }

    fn predict(&self, window: &ObservationWindow) -> Result<SignalVector, StrategyError> {
        window.require_rows(2)?;
        let reg = self.regularizer(window);
        let x: Vec<f64> = (0..window.n_assets())
            .map(|i| (price_relative(window, i) - 1.0) / reg)
            .collect();
        ensure_finite(&x, "short term return")?;
        Ok(x)
    }

    fn param_spec(&self) -> ParamSpec {
        ParamSpec::new(&["std_window"], &[])
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)?;
        self.std_window = params.count("std_window", 0)?.max(Self::MIN_STD_WINDOW);
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SignalModel> {
        Box::new(self.clone())
    }
}

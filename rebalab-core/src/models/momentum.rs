//! Momentum models built on the spread between a fast and a slow moving average.

use serde::{Deserialize, Serialize};

use super::SignalModel;
use crate::domain::{ObservationWindow, ParamSet, ParamSpec, SignalVector, EPSILON};
use crate::error::{ConfigError, StrategyError};
use crate::indicators::{rolling_std_last, sample_std, MeanType};
use crate::numeric::ensure_finite;

/// Fast/slow moving average pair over open prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovingAverageSpread {
    pub mean_type: MeanType,
    pub fast: usize,
    pub slow: usize,
}

impl MovingAverageSpread {
    pub fn new(mean_type: MeanType, fast: usize, slow: usize) -> Result<Self, ConfigError> {
        if fast == 0 || fast >= slow {
            return Err(ConfigError::InvalidSpans { fast, slow });
        }
        Ok(Self {
            mean_type,
            fast,
            slow,
        })
    }

    fn from_params(params: &ParamSet) -> Result<Self, ConfigError> {
        let mean_type = params.choice("mean_type")?.parse()?;
        Self::new(mean_type, params.count("ma1", 1)?, params.count("ma2", 1)?)
    }

    /// Rows needed for the spread to be defined at the last two positions.
    pub fn warmup_rows(&self) -> usize {
        self.mean_type
            .first_valid(self.fast)
            .max(self.mean_type.first_valid(self.slow))
            + 2
    }

    /// Last value of `fast − slow` and its change over the last row.
    pub fn level_and_change(&self, opens: &[f64]) -> (f64, f64) {
        let fast = self.mean_type.compute(opens, self.fast);
        let slow = self.mean_type.compute(opens, self.slow);
        let n = opens.len();
        if n < 2 {
            return (f64::NAN, f64::NAN);
        }
        let last = fast[n - 1] - slow[n - 1];
        let prev = fast[n - 2] - slow[n - 2];
        (last, last - prev)
    }
}

impl Default for MovingAverageSpread {
    fn default() -> Self {
        Self {
            mean_type: MeanType::Kama,
            fast: 2,
            slow: 3,
        }
    }
}

// ─── Momentum ────────────────────────────────────────────────────────

/// Volatility-scaled MA spread plus a weighted derivative term.
///
/// `factor = alpha_v · (level + alpha_a · change) / (std(last std_span opens) + ε)`,
/// then divided by the total absolute factor across assets and shifted by +1,
/// so the output reads like a price relative centred on 1.
#[derive(Debug, Clone)]
pub struct MomentumModel {
    spread: MovingAverageSpread,
    std_span: usize,
    alpha_v: f64,
    alpha_a: f64,
}

impl MomentumModel {
    pub fn new(spread: MovingAverageSpread, std_span: usize, alpha_v: f64, alpha_a: f64) -> Self {
        Self {
            spread,
            std_span: std_span.max(1),
            alpha_v,
            alpha_a,
        }
    }
}

impl Default for MomentumModel {
    fn default() -> Self {
        Self::new(MovingAverageSpread::default(), 3, 1.0, 1.0)
    }
}

impl SignalModel for MomentumModel {
    fn name(&self) -> &str {
        "momentum"
    }

    fn warmup_rows(&self) -> usize {
        self.spread.warmup_rows().max(self.std_span)
    }

    fn predict(&self, window: &ObservationWindow) -> Result<SignalVector, StrategyError> {
        window.require_rows(self.spread.warmup_rows())?;

        let factors: Vec<f64> = (0..window.n_assets())
            .map(|i| {
                let opens = window.opens(i);
                let (level, change) = self.spread.level_and_change(&opens);
                let start = opens.len().saturating_sub(self.std_span);
                let vol = sample_std(&opens[start..]);
                self.alpha_v * (level + self.alpha_a * change) / (vol + EPSILON)
            })
            .collect();
        ensure_finite(&factors, "momentum factor")?;

        let scale: f64 = factors.iter().map(|f| f.abs()).sum::<f64>() + EPSILON;
        Ok(factors.iter().map(|f| f / scale + 1.0).collect())
    }

    fn param_spec(&self) -> ParamSpec {
        ParamSpec::new(
            &["alpha_v", "alpha_a", "mean_type", "ma1", "ma2", "std_span"],
            &[],
        )
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)?;
        self.spread = MovingAverageSpread::from_params(params)?;
        self.std_span = params.count("std_span", 1)?;
        self.alpha_v = params.number("alpha_v")?;
        self.alpha_a = params.number("alpha_a")?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SignalModel> {
        Box::new(self.clone())
    }
}

// ─── Reversed momentum ───────────────────────────────────────────────

/// Change of the MA spread over the last row, scaled by trailing volatility.
///
/// Not normalized; the paired step rule moves against the sign.
#[derive(Debug, Clone)]
pub struct ReversedMomentumModel {
    spread: MovingAverageSpread,
    std_span: usize,
}

impl ReversedMomentumModel {
    pub fn new(spread: MovingAverageSpread, std_span: usize) -> Self {
        Self {
            spread,
            std_span: std_span.max(1),
        }
    }
}

impl Default for ReversedMomentumModel {
    fn default() -> Self {
        Self::new(MovingAverageSpread::default(), 3)
    }
}

impl SignalModel for ReversedMomentumModel {
    fn name(&self) -> &str {
        "reversed_momentum"
    }

    fn warmup_rows(&self) -> usize {
        self.spread.warmup_rows()
    }

    fn predict(&self, window: &ObservationWindow) -> Result<SignalVector, StrategyError> {
        window.require_rows(self.warmup_rows())?;

        let factors: Vec<f64> = (0..window.n_assets())
            .map(|i| {
                let opens = window.opens(i);
                let (_, change) = self.spread.level_and_change(&opens);
                change / (rolling_std_last(&opens, self.std_span, false) + EPSILON)
            })
            .collect();
        ensure_finite(&factors, "reversed momentum factor")?;
        Ok(factors)
    }

    fn param_spec(&self) -> ParamSpec {
        ParamSpec::new(&["mean_type", "ma1", "ma2", "std_span"], &[])
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)?;
        self.spread = MovingAverageSpread::from_params(params)?;
        self.std_span = params.count("std_span", 1)?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SignalModel> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DegenerateInputError;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    fn window(opens: &[Vec<f64>]) -> ObservationWindow {
        let symbols: Vec<String> = (0..opens.len()).map(|i| format!("A{i}")).collect();
        let refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
        ObservationWindow::from_opens(&refs, "USDT", opens, &vec![1.0; opens.len()], 0.0)
            .unwrap()
    }

    fn simple_spread() -> MovingAverageSpread {
        MovingAverageSpread::new(MeanType::Simple, 2, 3).unwrap()
    }

    #[test]
    fn spans_must_be_ordered() {
        assert_eq!(
            MovingAverageSpread::new(MeanType::Exp, 5, 3),
            Err(ConfigError::InvalidSpans { fast: 5, slow: 3 })
        );
        assert!(MovingAverageSpread::new(MeanType::Exp, 3, 3).is_err());
    }

    #[test]
    fn momentum_signal_is_normalized_around_one() {
        // Rising: sma2 − sma3 = 0.5 flat, std of [3,4,5] = 1 → factor 0.5
        // Falling: factor −0.5. Σ|f| = 1.
        let w = window(&[
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![5.0, 4.0, 3.0, 2.0, 1.0],
        ]);
        let model = MomentumModel::new(simple_spread(), 3, 1.0, 1.0);
        let s = model.predict(&w).unwrap();
        assert_eq!(s.len(), 2);
        assert_approx(s[0], 1.5, 1e-9);
        assert_approx(s[1], 0.5, 1e-9);
    }

    #[test]
    fn momentum_needs_warmup_rows() {
        let w = window(&[vec![1.0, 2.0, 3.0]]);
        let model = MomentumModel::new(simple_spread(), 3, 1.0, 1.0);
        assert_eq!(
            model.predict(&w),
            Err(StrategyError::Degenerate(
                DegenerateInputError::InsufficientHistory {
                    required: 4,
                    available: 3
                }
            ))
        );
    }

    #[test]
    fn reversed_momentum_uses_spread_change() {
        let opens = vec![1.0, 2.0, 4.0, 8.0, 16.0];
        let w = window(&[opens]);
        let model = ReversedMomentumModel::new(simple_spread(), 3);
        let s = model.predict(&w).unwrap();
        // spread: 12 − 28/3 = 8/3, previous 6 − 14/3 = 4/3
        let expected = (4.0 / 3.0) / (sample_std(&[4.0, 8.0, 16.0]) + EPSILON);
        assert_approx(s[0], expected, DEFAULT_EPSILON);
    }

    #[test]
    fn set_params_rejects_unknown_mean_type() {
        let mut model = MomentumModel::default();
        let params = ParamSet::new()
            .with("alpha_v", 1.0)
            .with("alpha_a", 0.5)
            .with("mean_type", "median")
            .with("ma1", 2.0)
            .with("ma2", 5.0)
            .with("std_span", 4.0);
        assert!(matches!(
            model.set_params(&params),
            Err(ConfigError::UnknownChoice { .. })
        ));
    }

    #[test]
    fn set_params_rejects_inverted_spans() {
        let mut model = ReversedMomentumModel::default();
        let params = ParamSet::new()
            .with("mean_type", "exp")
            .with("ma1", 8.0)
            .with("ma2", 4.0)
            .with("std_span", 4.0);
        assert_eq!(
            model.set_params(&params),
            Err(ConfigError::InvalidSpans { fast: 8, slow: 4 })
        );
    }

    #[test]
    fn set_params_requires_every_name() {
        let mut model = MomentumModel::default();
        let params = ParamSet::new().with("alpha_v", 1.0);
        assert!(matches!(
            model.set_params(&params),
            Err(ConfigError::MissingParam(_))
        ));
    }
}

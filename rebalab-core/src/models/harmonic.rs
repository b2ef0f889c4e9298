//! Fibonacci harmonic pattern detection.
//!
//! The last five turning points of the open series (local extrema of order
//! `peak_order`, plus the last row) define four legs XA, AB, BC, CD, counted
//! backward from the most recent point. A pattern matches when each leg's
//! length relative to the previous one falls strictly inside the pattern's
//! ratio band widened by `err_allowed`. A bullish leg-sign sequence scores +1,
//! the mirrored sequence −1. Scores of all patterns are summed.

use super::SignalModel;
use crate::domain::{ObservationWindow, ParamSet, ParamSpec, SignalVector};
use crate::error::{ConfigError, StrategyError};
use crate::indicators::turning_points;

/// Retracement ratio bands of one pattern family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicPattern {
    pub name: &'static str,
    /// |AB| / |XA|
    pub ab: (f64, f64),
    /// |BC| / |AB|
    pub bc: (f64, f64),
    /// |CD| / |BC|
    pub cd: (f64, f64),
}

pub const PATTERNS: [HarmonicPattern; 4] = [
    HarmonicPattern {
        name: "gartley",
        ab: (0.618, 0.618),
        bc: (0.382, 0.886),
        cd: (1.27, 1.618),
    },
    HarmonicPattern {
        name: "butterfly",
        ab: (0.786, 0.786),
        bc: (0.382, 0.886),
        cd: (1.618, 2.618),
    },
    HarmonicPattern {
        name: "bat",
        ab: (0.382, 0.5),
        bc: (0.382, 0.886),
        cd: (1.618, 2.618),
    },
    HarmonicPattern {
        name: "crab",
        ab: (0.382, 0.618),
        bc: (0.382, 0.886),
        cd: (2.24, 3.618),
    },
];

/// The four most recent legs, newest first: XA, AB, BC, CD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Legs {
    pub xa: f64,
    pub ab: f64,
    pub bc: f64,
    pub cd: f64,
}

impl Legs {
    /// Legs from the turning points of `opens`; `None` with fewer than five points.
    pub fn from_series(opens: &[f64], peak_order: usize) -> Option<Self> {
        let idx = turning_points(opens, peak_order);
        let n = idx.len();
        if n < 5 {
            return None;
        }
        let e = |k: usize| opens[idx[n - k]];
        Some(Self {
            xa: e(2) - e(1),
            ab: e(3) - e(2),
            bc: e(4) - e(3),
            cd: e(5) - e(4),
        })
    }
}

impl HarmonicPattern {
    /// +1 bullish match, −1 bearish match, 0 otherwise.
    pub fn score(&self, legs: &Legs, err_allowed: f64) -> f64 {
        let inside = |leg: f64, prev: f64, band: (f64, f64)| {
            let lo = (band.0 - err_allowed) * prev.abs();
            let hi = (band.1 + err_allowed) * prev.abs();
            lo < leg.abs() && leg.abs() < hi
        };
        if !(inside(legs.ab, legs.xa, self.ab)
            && inside(legs.bc, legs.ab, self.bc)
            && inside(legs.cd, legs.bc, self.cd))
        {
            return 0.0;
        }
        if legs.xa > 0.0 && legs.ab < 0.0 && legs.bc > 0.0 && legs.cd < 0.0 {
            1.0
        } else if legs.xa < 0.0 && legs.ab > 0.0 && legs.bc < 0.0 && legs.cd > 0.0 {
            -1.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarmonicModel {
    peak_order: usize,
    err_allowed: f64,
}

impl HarmonicModel {
    pub fn new(peak_order: usize, err_allowed: f64) -> Self {
        Self {
            peak_order: peak_order.max(1),
            err_allowed,
        }
    }

    /// Summed pattern score of a single open series.
    pub fn score_series(&self, opens: &[f64]) -> f64 {
        match Legs::from_series(opens, self.peak_order) {
            Some(legs) => PATTERNS
                .iter()
                .map(|p| p.score(&legs, self.err_allowed))
                .sum(),
            None => 0.0,
        }
    }
}

impl Default for HarmonicModel {
    fn default() -> Self {
        Self::new(7, 0.05)
    }
}

impl SignalModel for HarmonicModel {
    fn name(&self) -> &str {
        "harmonic"
    }

    fn warmup_rows(&self) -> usize {
        1
    }

    fn predict(&self, window: &ObservationWindow) -> Result<SignalVector, StrategyError> {
        window.require_rows(1)?;
        Ok((0..window.n_assets())
            .map(|i| self.score_series(&window.opens(i)))
            .collect())
    }

    fn param_spec(&self) -> ParamSpec {
        ParamSpec::new(&["err_allowed", "peak_order"], &[])
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ConfigError> {
        self.param_spec().validate(params)?;
        self.err_allowed = params.number("err_allowed")?;
        self.peak_order = params.count("peak_order", 1)?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SignalModel> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Zig-zag whose turning points, oldest → newest, are
    /// 10 (D), 20 (C), 15 (B), 17 (A), 12 (X = last row).
    ///
    /// XA = 17 − 12 = 5, AB = 15 − 17 = −2 (0.4·|XA|),
    /// BC = 20 − 15 = 5 (2.5·|AB|), CD = 10 − 20 = −10 (2.0·|BC|).
    fn zigzag() -> Vec<f64> {
        vec![11.0, 10.0, 15.0, 20.0, 18.0, 15.0, 16.0, 17.0, 14.0, 12.0]
    }

    #[test]
    fn legs_are_read_backward_from_last_row() {
        let legs = Legs::from_series(&zigzag(), 1).unwrap();
        assert_eq!(
            legs,
            Legs {
                xa: 5.0,
                ab: -2.0,
                bc: 5.0,
                cd: -10.0
            }
        );
    }

    #[test]
    fn too_few_turning_points_score_zero() {
        let model = HarmonicModel::new(1, 0.05);
        assert_eq!(model.score_series(&[1.0, 2.0, 3.0, 4.0]), 0.0);
    }

    #[test]
    fn bullish_sequence_inside_bands_scores_plus_one() {
        let legs = Legs {
            xa: 10.0,
            ab: -6.18,
            bc: 4.0,
            cd: -6.0,
        };
        // AB/XA = 0.618, BC/AB ≈ 0.647, CD/BC = 1.5 → gartley only
        let scores: Vec<f64> = PATTERNS.iter().map(|p| p.score(&legs, 0.05)).collect();
        assert_eq!(scores, vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn mirrored_sequence_scores_minus_one() {
        let legs = Legs {
            xa: -10.0,
            ab: 6.18,
            bc: -4.0,
            cd: 6.0,
        };
        assert_eq!(PATTERNS[0].score(&legs, 0.05), -1.0);
    }

    #[test]
    fn ratios_outside_bands_score_zero() {
        let legs = Legs::from_series(&zigzag(), 1).unwrap();
        // BC/AB = 2.5 is outside every BC band
        let model = HarmonicModel::new(1, 0.05);
        assert!(PATTERNS.iter().all(|p| p.score(&legs, 0.05) == 0.0));
        assert_eq!(model.score_series(&zigzag()), 0.0);
    }

    #[test]
    fn predict_scores_every_asset() {
        let w = ObservationWindow::from_opens(
            &["A", "B"],
            "USDT",
            &[zigzag(), vec![1.0; 10]],
            &[1.0, 1.0],
            0.0,
        )
        .unwrap();
        let s = HarmonicModel::new(1, 0.05).predict(&w).unwrap();
        assert_eq!(s, vec![0.0, 0.0]);
    }
}

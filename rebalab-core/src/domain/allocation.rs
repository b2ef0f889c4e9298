//! Allocation vectors and signal vectors.

use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Small constant added to denominators instead of branching on zero.
pub const EPSILON: f64 = 1e-16;

/// Tolerance used by the simplex invariant checks.
pub const SIMPLEX_TOLERANCE: f64 = 1e-9;

/// One real value per asset, sometimes with a neutral fiat slot appended.
pub type SignalVector = Vec<f64>;

/// Portfolio weights, one per symbol with fiat last.
///
/// Produced fresh every step; the previous step's allocation is only ever
/// read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allocation(Vec<f64>);

impl Allocation {
    /// Wrap raw weights without checking the simplex invariant.
    pub fn from_raw(weights: Vec<f64>) -> Self {
        Self(weights)
    }

    /// Uniform over the non-fiat assets, fiat weight exactly 0.
    pub fn bootstrap(n_symbols: usize) -> Self {
        match n_symbols {
            0 => Self(Vec::new()),
            1 => Self(vec![1.0]),
            n => {
                let w = 1.0 / (n - 1) as f64;
                let mut weights = vec![w; n - 1];
                weights.push(0.0);
                Self(weights)
            }
        }
    }

    /// Everything in fiat.
    pub fn all_fiat(n_symbols: usize) -> Self {
        let mut weights = vec![0.0; n_symbols];
        if let Some(last) = weights.last_mut() {
            *last = 1.0;
        }
        Self(weights)
    }

    /// Sum-normalize `values` (negatives clipped to 0). Falls back to
    /// uniform when nothing positive remains.
    pub fn normalized(values: &[f64]) -> Self {
        let clipped: Vec<f64> = values
            .iter()
            .map(|v| if v.is_finite() { v.max(0.0) } else { 0.0 })
            .collect();
        let total: f64 = clipped.iter().sum();
        if total <= 0.0 {
            let n = values.len().max(1) as f64;
            return Self(vec![1.0 / n; values.len()]);
        }
        Self(clipped.into_iter().map(|v| v / total).collect())
    }

    pub fn weights(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Weight of the fiat slot (the last entry).
    pub fn fiat_weight(&self) -> f64 {
        self.0.last().copied().unwrap_or(0.0)
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn is_on_simplex(&self, tolerance: f64) -> bool {
        !self.0.is_empty()
            && self.0.iter().all(|w| w.is_finite() && *w >= -tolerance)
            && (self.sum() - 1.0).abs() <= tolerance
    }

    /// Sum of absolute weight changes, the turnover of moving from `self` to `other`.
    pub fn turnover(&self, other: &Allocation) -> f64 {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b).abs())
            .sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.0.iter()
    }
}

impl Index<usize> for Allocation {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

impl AsRef<[f64]> for Allocation {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

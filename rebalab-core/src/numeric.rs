//! Small vector helpers shared by models and rules.

use crate::error::DegenerateInputError;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// ‖v − mean(v)‖².
pub fn centered_norm_sq(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum()
}

/// Fail with `NonFinite` if any entry is NaN or infinite.
pub fn ensure_finite(values: &[f64], stage: &'static str) -> Result<(), DegenerateInputError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(DegenerateInputError::NonFinite { stage })
    }
}

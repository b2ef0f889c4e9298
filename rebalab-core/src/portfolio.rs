//! Current portfolio weights from held quantities and prices.

use crate::domain::{Allocation, ObservationWindow};
use crate::error::DegenerateInputError;

/// Weights of each asset and of fiat at `back` rows before the last row.
///
/// Asset value is held quantity × open price; fiat contributes its balance.
/// A zero (or non-finite) total is reported instead of producing NaN weights.
pub fn portfolio_vector(
    window: &ObservationWindow,
    back: usize,
) -> Result<Allocation, DegenerateInputError> {
    let row = window
        .row(back)
        .ok_or(DegenerateInputError::InsufficientHistory {
            required: back + 1,
            available: window.len(),
        })?;

    let mut values: Vec<f64> = window
        .assets()
        .iter()
        .map(|a| a.holdings[row] * a.bars[row].open)
        .collect();
    values.push(window.fiat().balance[row]);

    let total: f64 = values.iter().sum();
    if !total.is_finite() {
        return Err(DegenerateInputError::NonFinite {
            stage: "portfolio value",
        });
    }
    if total == 0.0 {
        return Err(DegenerateInputError::ZeroPortfolioValue);
    }

    Ok(Allocation::from_raw(
        values.into_iter().map(|v| v / total).collect(),
    ))
}

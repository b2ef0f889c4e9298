//! Series indicators used by the signal models.
//!
//! Plain functions over `&[f64]` open-price series. Moving averages return a
//! vector aligned with the input (NaN before the first complete window);
//! dispersion helpers return scalars evaluated at the last position.

pub mod extrema;
pub mod moving_average;
pub mod volatility;

pub use extrema::{local_extrema, turning_points, ExtremumKind};
pub use moving_average::{ewm, kama, sma, MeanType};
pub use volatility::{pct_change, rolling_std_last, sample_std};

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

//! Dispersion helpers: sample standard deviation, rolling std, returns.

/// Sample standard deviation (n − 1 denominator). Zero for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Rolling sample std evaluated at the last position only, min periods 1.
///
/// A trailing window covers the last `window` values. A centered window at
/// the last position only has its left half plus the current value:
/// `window - (window - 1) / 2` values.
pub fn rolling_std_last(values: &[f64], window: usize, centered: bool) -> f64 {
    let window = window.max(1);
    let take = if centered {
        window - (window - 1) / 2
    } else {
        window
    };
    let start = values.len().saturating_sub(take);
    sample_std(&values[start..])
}

/// Period-over-period fractional change, `x[t] / x[t-1] - 1`, length n − 1.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

//! Euclidean projection onto the probability simplex.
//!
//! Sort descending, find the largest prefix whose shifted values stay
//! positive, derive the shift θ from it, then clip `max(v_i - θ, 0)`.
//! Deterministic, O(n log n).

use crate::domain::Allocation;

/// Nearest point to `v` in `{x : x >= 0, Σx = 1}`.
///
/// Callers are expected to pass finite values; non-finite entries are
/// rejected upstream by the update rules.
pub fn project_simplex(v: &[f64]) -> Allocation {
    if v.is_empty() {
        return Allocation::from_raw(Vec::new());
    }

    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let mut cumsum = 0.0;
    let mut theta = 0.0;
    for (j, &u) in sorted.iter().enumerate() {
        cumsum += u;
        let candidate = (cumsum - 1.0) / (j + 1) as f64;
        if u - candidate > 0.0 {
            theta = candidate;
        }
    }

    Allocation::from_raw(v.iter().map(|&x| (x - theta).max(0.0)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SIMPLEX_TOLERANCE;

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-12, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn equal_entries_project_to_uniform() {
        let p = project_simplex(&[0.5, 0.5, 0.5]);
        assert_close(p.weights(), &[1.0 / 3.0; 3]);
    }

    #[test]
    fn point_on_simplex_is_fixed() {
        let p = project_simplex(&[0.2, 0.3, 0.5]);
        assert_close(p.weights(), &[0.2, 0.3, 0.5]);
    }

    #[test]
    fn dominant_entry_takes_everything() {
        let p = project_simplex(&[3.0, 0.0, -1.0]);
        assert_close(p.weights(), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn negative_entries_clip() {
        let p = project_simplex(&[0.6, 0.6, -0.5]);
        assert_close(p.weights(), &[0.5, 0.5, 0.0]);
    }

    #[test]
    fn single_entry_is_one() {
        let p = project_simplex(&[-7.0]);
        assert_close(p.weights(), &[1.0]);
    }

    #[test]
    fn output_is_on_simplex_and_idempotent() {
        let v = [1.7, -0.3, 0.25, 0.9, -2.0];
        let once = project_simplex(&v);
        assert!(once.is_on_simplex(SIMPLEX_TOLERANCE));
        let twice = project_simplex(once.weights());
        assert_close(once.weights(), twice.weights());
    }
}

//! Local extrema detection.
//!
//! An index is a local maximum of order `k` when its value is strictly greater
//! than every neighbour within `k` positions on both sides. Neighbour indices
//! are clipped to the series bounds, so the first and last points never
//! qualify.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtremumKind {
    Max,
    Min,
}

fn is_extremum(values: &[f64], i: usize, order: usize, kind: ExtremumKind) -> bool {
    let last = values.len() - 1;
    (1..=order).all(|k| {
        let left = i.saturating_sub(k);
        let right = (i + k).min(last);
        match kind {
            ExtremumKind::Max => values[i] > values[left] && values[i] > values[right],
            ExtremumKind::Min => values[i] < values[left] && values[i] < values[right],
        }
    })
}

/// Indices of strict local extrema of the given kind.
pub fn local_extrema(values: &[f64], order: usize, kind: ExtremumKind) -> Vec<usize> {
    if values.is_empty() || order == 0 {
        return Vec::new();
    }
    (0..values.len())
        .filter(|&i| is_extremum(values, i, order, kind))
        .collect()
}

/// Sorted indices of all maxima and minima plus the last index.
pub fn turning_points(values: &[f64], order: usize) -> Vec<usize> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut idx = local_extrema(values, order, ExtremumKind::Max);
    idx.extend(local_extrema(values, order, ExtremumKind::Min));
    idx.push(values.len() - 1);
    idx.sort_unstable();
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_peaks_and_troughs() {
        let v = [1.0, 3.0, 1.0, 0.0, 2.0, 1.0];
        assert_eq!(local_extrema(&v, 1, ExtremumKind::Max), vec![1, 4]);
        assert_eq!(local_extrema(&v, 1, ExtremumKind::Min), vec![3]);
    }

    #[test]
    fn higher_order_needs_wider_dominance() {
        let v = [1.0, 3.0, 2.5, 0.0, 2.0, 1.0];
        assert_eq!(local_extrema(&v, 1, ExtremumKind::Max), vec![1, 4]);
        // index 4 is not above index 2 at distance 2
        assert_eq!(local_extrema(&v, 2, ExtremumKind::Max), vec![1]);
    }

    #[test]
    fn edges_never_qualify() {
        let v = [5.0, 1.0, 2.0, 9.0];
        assert!(local_extrema(&v, 1, ExtremumKind::Max).is_empty());
        assert_eq!(local_extrema(&v, 1, ExtremumKind::Min), vec![1]);
    }

    #[test]
    fn plateau_is_not_strict() {
        let v = [1.0, 2.0, 2.0, 1.0];
        assert!(local_extrema(&v, 1, ExtremumKind::Max).is_empty());
    }

    #[test]
    fn turning_points_include_last_index() {
        let v = [1.0, 3.0, 1.0, 0.0, 2.0, 1.0];
        assert_eq!(turning_points(&v, 1), vec![1, 3, 4, 5]);
    }
}

//! Rank statistics shared by the in-memory calculations.
//!
//! Percentiles use the nearest-rank method: `sorted[floor(n * q)]`, no
//! interpolation. The median is the middle element for odd `n` and the mean of
//! the two middle elements for even `n`. The store-side stats pipeline uses the
//! same definitions so both paths agree.

/// Finite values sorted ascending; NaN and infinities are dropped.
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

pub fn mean(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return 0.0;
    }
    finite.iter().sum::<f64>() / finite.len() as f64
}

/// Median of an already sorted slice; 0 when empty.
pub fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

pub fn median(values: &[f64]) -> f64 {
    median_sorted(&sorted_finite(values))
}

/// Nearest-rank percentile of an already sorted slice; `q` in `[0, 1]`.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let q = q.clamp(0.0, 1.0);
    let idx = ((sorted.len() as f64) * q).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

pub fn percentile(values: &[f64], q: f64) -> f64 {
    percentile_sorted(&sorted_finite(values), q)
}

/// `(to - from) / from * 100`, or None when `from` is zero or the result is not finite.
pub fn percent_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        return None;
    }
    let pct = (to - from) / from * 100.0;
    pct.is_finite().then_some(pct)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[5.0, 1.0, 3.0]), 3.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn median_matches_direct_definition() {
        let samples: [&[f64]; 4] = [
            &[3.0, 5.0, 8.0, 15.0, 40.0, 95.0, 120.0],
            &[10.0, 20.0],
            &[7.0],
            &[9.0, 1.0, 8.0, 2.0, 7.0, 3.0],
        ];
        for values in samples {
            let mut sorted = values.to_vec();
            sorted.sort_by(f64::total_cmp);
            let n = sorted.len();
            let expected = if n % 2 == 1 {
                sorted[n / 2]
            } else {
                (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
            };
            assert_eq!(median(values), expected, "values={values:?}");
        }
    }

    #[test]
    fn percentile_is_nearest_rank_not_interpolated() {
        let values = [10.0, 20.0, 30.0, 40.0];
        // floor(4 * 0.25) = 1, floor(4 * 0.75) = 3, floor(4 * 0.9) = 3
        assert_eq!(percentile(&values, 0.25), 20.0);
        assert_eq!(percentile(&values, 0.5), 30.0);
        assert_eq!(percentile(&values, 0.75), 40.0);
        assert_eq!(percentile(&values, 0.9), 40.0);
        // Linear interpolation would give 17.5 for p25.
        assert_ne!(percentile(&values, 0.25), 17.5);
    }

    #[test]
    fn percentile_clamps_top_rank() {
        assert_eq!(percentile(&[1.0, 2.0, 3.0], 1.0), 3.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn non_finite_values_are_ignored() {
        assert_eq!(mean(&[f64::NAN, 2.0, 4.0]), 3.0);
        assert_eq!(median(&[f64::INFINITY, 1.0]), 1.0);
    }

    #[test]
    fn percent_change_guards_zero_base() {
        assert_eq!(percent_change(0.0, 10.0), None);
        assert_eq!(percent_change(400_000.0, 500_000.0), Some(25.0));
    }
}

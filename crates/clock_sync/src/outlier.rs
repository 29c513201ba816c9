//! One-sided outlier test for round-trip times.

/// Whether `value` lies more than `k` standard deviations above `mean`
///
/// Unusually small round trips are always accepted.
#[inline]
pub fn is_outlier(value: f64, mean: f64, sigma: f64, k: f64) -> bool {
    value - mean > k * sigma
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_large_values_rejected() {
        assert!(is_outlier(60.0, 40.0, 5.0, 1.0));
        assert!(!is_outlier(45.0, 40.0, 5.0, 1.0));
        assert!(!is_outlier(0.0, 40.0, 5.0, 1.0));
    }

    #[test]
    fn test_zero_sigma_accepts_the_mean() {
        assert!(!is_outlier(40.0, 40.0, 0.0, 1.0));
        assert!(is_outlier(40.5, 40.0, 0.0, 1.0));
    }
}

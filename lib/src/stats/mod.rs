//! Exploratory statistics.
//!
//! Read-only reporting utilities over a feature matrix and its column names.
//! Nothing here mutates its input or feeds back into model training; missing
//! cells (NaN) are skipped the way a data-frame `describe()` would.
//!
//! - [`describe`]: count, mean, std, min, quartiles, max per column
//! - [`skewness`] / [`kurtosis`]: bias-corrected shape statistics
//! - [`correlation_matrix`] / [`target_correlations`]: Pearson correlation
//! - [`histogram`]: equal-width bin counts
//! - [`Pca`]: two-component projection of standardized features

pub mod correlation;
pub mod describe;
pub mod histogram;
pub mod moments;
pub mod pca;

pub use correlation::{correlation_matrix, pearson, target_correlations};
pub use describe::{describe, ColumnSummary};
pub use histogram::{histogram, Histogram};
pub use moments::{kurtosis, skewness, top_n};
pub use pca::Pca;

/// Non-missing values of an iterator, in order.
pub fn observed<I: IntoIterator<Item = f64>>(values: I) -> Vec<f64> {
    values.into_iter().filter(|v| !v.is_nan()).collect()
}

/// Median of `values`. NaN-free input expected; empty input gives NaN.
pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

/// Linearly interpolated quantile (`q` in `[0, 1]`) of unsorted values.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

/// Same as [`quantile`] for already sorted values.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Arithmetic mean; NaN for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_skips_nan() {
        assert_eq!(observed(vec![1.0, f64::NAN, 3.0]), vec![1.0, 3.0]);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.25), 1.75);
        assert_eq!(quantile(&values, 0.75), 3.25);
        assert_eq!(quantile(&values, 0.0), 1.0);
        assert_eq!(quantile(&values, 1.0), 4.0);
    }
}

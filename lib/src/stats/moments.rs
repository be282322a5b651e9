//! Shape statistics: skewness and excess kurtosis.
//!
//! Both use the bias-corrected estimators (adjusted Fisher-Pearson skewness,
//! unbiased excess kurtosis). A constant column reports 0.

use super::observed;
use ndarray::{Array2, Axis};

fn central_sums(values: &[f64]) -> (f64, f64, f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (n, m2, m3, m4)
}

/// Sample skewness of one column (needs at least 3 observed values).
pub fn column_skewness(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return f64::NAN;
    }
    let (n, m2, m3, _) = central_sums(values);
    if m2 == 0.0 {
        return 0.0;
    }
    let m2 = m2 / n;
    let m3 = m3 / n;
    (n * (n - 1.0)).sqrt() / (n - 2.0) * m3 / m2.powf(1.5)
}

/// Sample excess kurtosis of one column (needs at least 4 observed values).
pub fn column_kurtosis(values: &[f64]) -> f64 {
    if values.len() < 4 {
        return f64::NAN;
    }
    let (n, m2, _, m4) = central_sums(values);
    if m2 == 0.0 {
        return 0.0;
    }
    let adj = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    let numerator = n * (n + 1.0) * (n - 1.0) * m4;
    let denominator = (n - 2.0) * (n - 3.0) * m2 * m2;
    numerator / denominator - adj
}

/// Skewness of every column of `x`, NaN cells skipped.
pub fn skewness(x: &Array2<f64>) -> Vec<f64> {
    x.axis_iter(Axis(1))
        .map(|c| column_skewness(&observed(c.iter().copied())))
        .collect()
}

/// Excess kurtosis of every column of `x`, NaN cells skipped.
pub fn kurtosis(x: &Array2<f64>) -> Vec<f64> {
    x.axis_iter(Axis(1))
        .map(|c| column_kurtosis(&observed(c.iter().copied())))
        .collect()
}

/// The `n` largest values with their names, largest first. NaN is skipped.
pub fn top_n(names: &[String], values: &[f64], n: usize) -> Vec<(String, f64)> {
    let mut pairs: Vec<(String, f64)> = names
        .iter()
        .zip(values)
        .filter(|(_, v)| !v.is_nan())
        .map(|(name, &v)| (name.clone(), v))
        .collect();
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
    pairs.truncate(n);
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_skewness_symmetric_is_zero() {
        assert!(column_skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]).abs() < 1e-12);
    }

    #[test]
    fn test_skewness_right_tail_positive() {
        assert!(column_skewness(&[1.0, 2.0, 2.0, 3.0, 30.0]) > 1.0);
    }

    #[test]
    fn test_kurtosis_uniform_steps() {
        // 1..=5 has excess kurtosis -1.2 with the unbiased estimator.
        assert!((column_kurtosis(&[1.0, 2.0, 3.0, 4.0, 5.0]) + 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_moments_small_samples_and_constants() {
        assert!(column_skewness(&[1.0, 2.0]).is_nan());
        assert!(column_kurtosis(&[1.0, 2.0, 3.0]).is_nan());
        assert_eq!(column_skewness(&[4.0, 4.0, 4.0]), 0.0);
        assert_eq!(column_kurtosis(&[4.0, 4.0, 4.0, 4.0]), 0.0);
    }

    #[test]
    fn test_column_wise_skip_nan() {
        let x = array![[1.0, 1.0], [2.0, f64::NAN], [3.0, 2.0], [4.0, 3.0], [5.0, 100.0]];
        let skew = skewness(&x);
        assert!(skew[0].abs() < 1e-12);
        assert!(skew[1] > 0.0);
    }

    #[test]
    fn test_top_n_orders_descending() {
        let names: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let values = [0.5, f64::NAN, 3.0, 1.0];
        let top = top_n(&names, &values, 2);
        assert_eq!(top, vec![("c".to_string(), 3.0), ("d".to_string(), 1.0)]);
    }
}

//! Per-column descriptive statistics.

use super::{observed, quantile_sorted};
use ndarray::{Array2, Axis};
use serde::Serialize;

/// Summary of one column; statistics are NaN when the column has no
/// observed values (and `std` also when it has only one).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (ddof = 1).
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
}

/// Describe every column of `x`.
pub fn describe(x: &Array2<f64>, names: &[String]) -> Vec<ColumnSummary> {
    x.axis_iter(Axis(1))
        .zip(names)
        .map(|(column, name)| summarize(name, observed(column.iter().copied())))
        .collect()
}

fn summarize(name: &str, mut values: Vec<f64>) -> ColumnSummary {
    values.sort_by(f64::total_cmp);
    let count = values.len();
    let mean = super::mean(&values);
    let std = if count > 1 {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    } else {
        f64::NAN
    };

    ColumnSummary {
        name: name.to_string(),
        count,
        mean,
        std,
        min: values.first().copied().unwrap_or(f64::NAN),
        q25: quantile_sorted(&values, 0.25),
        q50: quantile_sorted(&values, 0.5),
        q75: quantile_sorted(&values, 0.75),
        max: values.last().copied().unwrap_or(f64::NAN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_describe_basic() {
        let x = array![[1.0, f64::NAN], [2.0, f64::NAN], [3.0, 5.0], [4.0, f64::NAN]];
        let names = vec!["a".to_string(), "b".to_string()];
        let summary = describe(&x, &names);

        let a = &summary[0];
        assert_eq!(a.count, 4);
        assert_eq!(a.mean, 2.5);
        assert!((a.std - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!((a.min, a.q25, a.q50, a.q75, a.max), (1.0, 1.75, 2.5, 3.25, 4.0));

        let b = &summary[1];
        assert_eq!(b.count, 1);
        assert_eq!(b.mean, 5.0);
        assert!(b.std.is_nan());
    }
}

//! Pearson correlation on pairwise-complete observations.

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;

/// Pearson correlation of two equally long columns.
///
/// Rows where either value is NaN are skipped. Returns NaN when fewer than two
/// complete pairs remain or either side has zero variance.
pub fn pearson(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(&x, &y)| (x, y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return f64::NAN;
    }
    (cov / (var_a * var_b).sqrt()).clamp(-1.0, 1.0)
}

/// Symmetric `n_features × n_features` correlation matrix of `x`.
pub fn correlation_matrix(x: &Array2<f64>) -> Array2<f64> {
    let p = x.ncols();
    let rows: Vec<Vec<f64>> = (0..p)
        .into_par_iter()
        .map(|i| {
            (0..p)
                .map(|j| {
                    if j < i {
                        f64::NAN // filled from the mirrored entry below
                    } else {
                        pearson(x.column(i), x.column(j))
                    }
                })
                .collect()
        })
        .collect();

    let mut corr = Array2::from_elem((p, p), f64::NAN);
    for i in 0..p {
        for j in i..p {
            corr[[i, j]] = rows[i][j];
            corr[[j, i]] = rows[i][j];
        }
    }
    corr
}

/// Correlation of each feature with the label, strongest (signed) first.
///
/// Features whose correlation is undefined are left out.
pub fn target_correlations(
    x: &Array2<f64>,
    labels: &Array1<usize>,
    names: &[String],
    top: usize,
) -> Vec<(String, f64)> {
    let y = labels.mapv(|l| l as f64);
    let values: Vec<f64> = (0..x.ncols())
        .into_par_iter()
        .map(|j| pearson(x.column(j), y.view()))
        .collect();
    super::top_n(names, &values, top)
}

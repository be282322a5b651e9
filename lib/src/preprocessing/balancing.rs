//! SMOTE: synthetic minority oversampling.
//!
//! Each synthetic sample sits on the segment between a random minority
//! sample and one of its `k` nearest minority neighbours:
//! `x + gap * (x_nn - x)` with `gap` drawn uniformly from `[0, 1)`.

use crate::dataset::class_counts;
use crate::preprocessing::error::PreprocessingError;
use ndarray::{concatenate, Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Smote {
    pub k_neighbors: usize,
    pub seed: u64,
    /// Oversample only when `minority / majority` is below this ratio.
    pub threshold: f64,
}

impl Default for Smote {
    fn default() -> Self {
        Self {
            k_neighbors: 5,
            seed: 42,
            threshold: 0.5,
        }
    }
}

/// Output of [`Smote::fit_resample`]: the original rows first, then the
/// synthetic ones.
#[derive(Clone, Debug)]
pub struct Resampled {
    pub x: Array2<f64>,
    pub y: Array1<usize>,
    pub n_synthetic: usize,
}

impl Smote {
    pub fn new(k_neighbors: usize, seed: u64, threshold: f64) -> Self {
        Self {
            k_neighbors,
            seed,
            threshold,
        }
    }

    pub fn fit_resample(
        &self,
        x: &Array2<f64>,
        y: &Array1<usize>,
    ) -> Result<Resampled, PreprocessingError> {
        if x.nrows() != y.len() {
            return Err(PreprocessingError::InvalidShape {
                expected: format!("{} rows", y.len()),
                got: format!("{} rows", x.nrows()),
            });
        }
        if self.k_neighbors == 0 {
            return Err(PreprocessingError::InvalidParameter(
                "k_neighbors must be at least 1".to_string(),
            ));
        }
        if x.iter().any(|v| v.is_nan()) {
            return Err(PreprocessingError::MissingValues(
                "SMOTE input contains NaN; impute first".to_string(),
            ));
        }

        let counts = class_counts(y);
        let present: Vec<usize> = (0..counts.len()).filter(|&c| counts[c] > 0).collect();
        if present.len() != 2 {
            return Err(PreprocessingError::InvalidLabels(format!(
                "SMOTE needs exactly two classes, found {}",
                present.len()
            )));
        }
        let (minority, majority) = if counts[present[0]] <= counts[present[1]] {
            (present[0], present[1])
        } else {
            (present[1], present[0])
        };
        let n_minority = counts[minority];
        let n_majority = counts[majority];

        let ratio = n_minority as f64 / n_majority as f64;
        if ratio >= self.threshold {
            debug!(ratio, threshold = self.threshold, "classes balanced enough, skipping SMOTE");
            return Ok(Resampled {
                x: x.clone(),
                y: y.clone(),
                n_synthetic: 0,
            });
        }

        if n_minority < 2 {
            return Err(PreprocessingError::InsufficientMinority {
                class: minority,
                count: n_minority,
                required: 2,
            });
        }
        let k = if n_minority <= self.k_neighbors {
            warn!(
                k_neighbors = self.k_neighbors,
                minority = n_minority,
                "too few minority samples, reducing k_neighbors to {}",
                n_minority - 1
            );
            n_minority - 1
        } else {
            self.k_neighbors
        };

        let minority_idx: Vec<usize> = (0..y.len()).filter(|&i| y[i] == minority).collect();
        let samples = x.select(Axis(0), &minority_idx);
        let neighbors = nearest_neighbors(&samples, k);

        let n_synthetic = n_majority - n_minority;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut synthetic = Array2::zeros((n_synthetic, x.ncols()));
        for mut row in synthetic.axis_iter_mut(Axis(0)) {
            let i = rng.gen_range(0..n_minority);
            let nn = neighbors[i][rng.gen_range(0..k)];
            let gap: f64 = rng.gen();
            let base = samples.row(i);
            let diff = &samples.row(nn) - &base;
            row.assign(&(&base + &(diff * gap)));
        }

        let x_out = concatenate(Axis(0), &[x.view(), synthetic.view()])
            .map_err(|e| PreprocessingError::NumericalError(e.to_string()))?;
        let mut y_out = y.to_vec();
        y_out.extend(std::iter::repeat(minority).take(n_synthetic));

        info!(
            minority_class = minority,
            before = n_minority,
            after = n_majority,
            n_synthetic,
            "SMOTE oversampling"
        );
        Ok(Resampled {
            x: x_out,
            y: Array1::from(y_out),
            n_synthetic,
        })
    }
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// For each row, the indices of its `k` nearest other rows (ties by index).
fn nearest_neighbors(samples: &Array2<f64>, k: usize) -> Vec<Vec<usize>> {
    let n = samples.nrows();
    (0..n)
        .into_par_iter()
        .map(|i| {
            let mut dists: Vec<(f64, usize)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (squared_distance(samples.row(i), samples.row(j)), j))
                .collect();
            dists.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            dists.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}

//! Principal component analysis by power iteration.
//!
//! The covariance matrix of the centred input is decomposed one component at a
//! time: power iteration finds the dominant eigenvector, which is then
//! deflated out before the next component. This is plenty for the two
//! components used for visual exploration and keeps the crate free of a
//! LAPACK dependency.

use crate::preprocessing::PreprocessingError;
use ndarray::{Array1, Array2, Axis};

const MAX_ITERATIONS: usize = 1_000;
const TOLERANCE: f64 = 1e-12;

/// A fitted PCA projection.
#[derive(Clone, Debug)]
pub struct Pca {
    mean: Array1<f64>,
    /// `n_components × n_features`, one unit-length component per row.
    components: Array2<f64>,
    explained_variance: Vec<f64>,
    explained_variance_ratio: Vec<f64>,
}

impl Pca {
    /// Fit `n_components` principal components of `x` (NaN-free).
    pub fn fit(x: &Array2<f64>, n_components: usize) -> Result<Self, PreprocessingError> {
        let (n, p) = x.dim();
        if n < 2 {
            return Err(PreprocessingError::EmptyData(
                "PCA needs at least two samples".to_string(),
            ));
        }
        if n_components == 0 || n_components > p {
            return Err(PreprocessingError::InvalidParameter(format!(
                "n_components must be in 1..={}, got {}",
                p, n_components
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(PreprocessingError::MissingValues(
                "PCA input must be finite".to_string(),
            ));
        }

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| PreprocessingError::EmptyData("no rows".to_string()))?;
        let centred = x - &mean;
        let mut cov = centred.t().dot(&centred) / (n - 1) as f64;
        let total_variance: f64 = cov.diag().sum();

        let mut components = Array2::zeros((n_components, p));
        let mut explained_variance = Vec::with_capacity(n_components);
        for k in 0..n_components {
            let (eigenvalue, vector) = dominant_eigenpair(&cov);
            let vector = flip_sign(vector);
            components.row_mut(k).assign(&vector);
            explained_variance.push(eigenvalue);

            // Deflate: remove the found direction from the covariance.
            let outer = vector
                .view()
                .insert_axis(Axis(1))
                .dot(&vector.view().insert_axis(Axis(0)));
            cov.scaled_add(-eigenvalue, &outer);
        }

        let explained_variance_ratio = explained_variance
            .iter()
            .map(|v| if total_variance > 0.0 { v / total_variance } else { 0.0 })
            .collect();

        Ok(Self {
            mean,
            components,
            explained_variance,
            explained_variance_ratio,
        })
    }

    /// Project `x` onto the fitted components (`n_samples × n_components`).
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, PreprocessingError> {
        if x.ncols() != self.mean.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.mean.len(),
                got_features: x.ncols(),
            });
        }
        Ok((x - &self.mean).dot(&self.components.t()))
    }

    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }

    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }
}

fn dominant_eigenpair(matrix: &Array2<f64>) -> (f64, Array1<f64>) {
    let p = matrix.nrows();
    // Slightly uneven start so the iterate is not orthogonal to the target by symmetry.
    let mut v = Array1::from_iter((0..p).map(|i| 1.0 + i as f64 / p as f64));
    v /= v.dot(&v).sqrt();

    for _ in 0..MAX_ITERATIONS {
        let next = matrix.dot(&v);
        let norm = next.dot(&next).sqrt();
        if norm == 0.0 {
            return (0.0, v);
        }
        let next = next / norm;
        let shift = (&next - &v).fold(0.0_f64, |acc, d| acc.max(d.abs()));
        v = next;
        if shift <= TOLERANCE {
            break;
        }
    }
    let eigenvalue = v.dot(&matrix.dot(&v));
    (eigenvalue.max(0.0), v)
}

/// Make the largest-magnitude loading positive so signs are reproducible.
fn flip_sign(v: Array1<f64>) -> Array1<f64> {
    let pivot = v
        .iter()
        .copied()
        .fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
    if pivot < 0.0 {
        -v
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_pca_finds_dominant_direction() {
        // Points along y = x with a small perpendicular wobble.
        let x = array![
            [-2.0, -2.1],
            [-1.0, -0.9],
            [0.0, 0.1],
            [1.0, 0.9],
            [2.0, 2.1]
        ];
        let pca = Pca::fit(&x, 2).unwrap();

        let first = pca.components().row(0);
        let expected = 1.0 / 2.0f64.sqrt();
        assert!((first[0].abs() - expected).abs() < 0.05);
        assert!((first[1].abs() - expected).abs() < 0.05);
        assert!(pca.explained_variance_ratio()[0] > 0.95);
        assert!(pca.explained_variance()[0] >= pca.explained_variance()[1]);

        let ratio_sum: f64 = pca.explained_variance_ratio().iter().sum();
        assert!((ratio_sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pca_projection_shape_and_centering() {
        let x = array![[1.0, 2.0, 3.0], [2.0, 1.0, 0.0], [4.0, 4.0, 1.0], [0.0, 3.0, 2.0]];
        let pca = Pca::fit(&x, 2).unwrap();
        let projected = pca.transform(&x).unwrap();

        assert_eq!(projected.dim(), (4, 2));
        let means = projected.mean_axis(Axis(0)).unwrap();
        assert!(means.iter().all(|m| m.abs() < 1e-9));
    }

    #[test]
    fn test_pca_components_are_orthonormal() {
        let x = array![[1.0, 2.0, 3.0], [2.0, 1.0, 0.0], [4.0, 4.0, 1.0], [0.0, 3.0, 2.0]];
        let pca = Pca::fit(&x, 2).unwrap();
        let c = pca.components();
        assert!((c.row(0).dot(&c.row(0)) - 1.0).abs() < 1e-9);
        assert!((c.row(1).dot(&c.row(1)) - 1.0).abs() < 1e-9);
        assert!(c.row(0).dot(&c.row(1)).abs() < 1e-6);
    }

    #[test]
    fn test_pca_rejects_bad_input() {
        let x = array![[1.0, 2.0], [f64::NAN, 1.0]];
        assert!(Pca::fit(&x, 1).is_err());

        let x = array![[1.0, 2.0], [3.0, 1.0]];
        assert!(Pca::fit(&x, 3).is_err());
        assert!(Pca::fit(&array![[1.0, 2.0]], 1).is_err());
    }
}

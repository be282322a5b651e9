//! Gaussian naive Bayes.

use crate::model::{argmax, validate_training, Classifier, FittedClassifier, ModelError};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Gaussian naive Bayes with per-class feature means and variances.
///
/// `var_smoothing` times the largest feature variance is added to every
/// variance so that near-constant features cannot produce infinite
/// likelihoods.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianNb {
    pub var_smoothing: f64,
}

impl Default for GaussianNb {
    fn default() -> Self {
        Self {
            var_smoothing: 1e-9,
        }
    }
}

impl GaussianNb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Classifier for GaussianNb {
    type Fitted = FittedGaussianNb;

    fn fit(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView1<usize>,
    ) -> Result<FittedGaussianNb, ModelError> {
        if !(self.var_smoothing >= 0.0) {
            return Err(ModelError::InvalidParameter(
                "var_smoothing must be non-negative".to_string(),
            ));
        }
        let n_classes = validate_training(x, y)?;
        let (n, p) = x.dim();

        let max_var = x
            .var_axis(Axis(0), 0.0)
            .iter()
            .copied()
            .fold(0.0_f64, f64::max);
        let epsilon = if max_var > 0.0 {
            self.var_smoothing * max_var
        } else {
            self.var_smoothing
        };

        let mut theta = Array2::zeros((n_classes, p));
        let mut var = Array2::ones((n_classes, p));
        let mut class_prior = Array1::zeros(n_classes);
        for class in 0..n_classes {
            let rows: Vec<usize> = (0..n).filter(|&i| y[i] == class).collect();
            if rows.is_empty() {
                continue;
            }
            let subset = x.select(Axis(0), &rows);
            if let Some(mean) = subset.mean_axis(Axis(0)) {
                theta.row_mut(class).assign(&mean);
            }
            var.row_mut(class)
                .assign(&(subset.var_axis(Axis(0), 0.0) + epsilon));
            class_prior[class] = rows.len() as f64 / n as f64;
        }

        Ok(FittedGaussianNb {
            class_prior,
            theta,
            var,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaussianNbParams {
    pub class_prior: Vec<f64>,
    pub n_features: usize,
    /// Row-major `n_classes × n_features`.
    pub theta: Vec<f64>,
    pub var: Vec<f64>,
}

#[derive(Clone, Debug)]
pub struct FittedGaussianNb {
    class_prior: Array1<f64>,
    theta: Array2<f64>,
    var: Array2<f64>,
}

impl FittedGaussianNb {
    /// `log P(c) + log P(x | c)` for every sample and class.
    pub fn joint_log_likelihood(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, ModelError> {
        self.check_features(x)?;
        let n_classes = self.class_prior.len();
        let mut jll = Array2::from_elem((x.nrows(), n_classes), f64::NEG_INFINITY);
        for class in 0..n_classes {
            if self.class_prior[class] <= 0.0 {
                continue;
            }
            let mean = self.theta.row(class);
            let var = self.var.row(class);
            let log_norm: f64 = var.iter().map(|v| (2.0 * PI * v).ln()).sum::<f64>() * -0.5;
            let log_prior = self.class_prior[class].ln();
            for (i, row) in x.rows().into_iter().enumerate() {
                let mahalanobis: f64 = row
                    .iter()
                    .zip(mean.iter().zip(var.iter()))
                    .map(|(xv, (m, v))| (xv - m).powi(2) / v)
                    .sum();
                jll[[i, class]] = log_prior + log_norm - 0.5 * mahalanobis;
            }
        }
        Ok(jll)
    }

    pub fn class_prior(&self) -> &Array1<f64> {
        &self.class_prior
    }

    pub fn theta(&self) -> &Array2<f64> {
        &self.theta
    }
}

impl FittedClassifier for FittedGaussianNb {
    type Params = GaussianNbParams;

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>, ModelError> {
        let jll = self.joint_log_likelihood(x)?;
        Ok(jll.rows().into_iter().map(argmax).collect())
    }

    fn n_features_in(&self) -> usize {
        self.theta.ncols()
    }

    fn extract_params(&self) -> GaussianNbParams {
        GaussianNbParams {
            class_prior: self.class_prior.to_vec(),
            n_features: self.theta.ncols(),
            theta: self.theta.iter().copied().collect(),
            var: self.var.iter().copied().collect(),
        }
    }

    fn from_params(params: GaussianNbParams) -> Result<Self, ModelError> {
        let shape = (params.class_prior.len(), params.n_features);
        let theta = Array2::from_shape_vec(shape, params.theta)
            .map_err(|e| ModelError::InvalidParams(e.to_string()))?;
        let var = Array2::from_shape_vec(shape, params.var)
            .map_err(|e| ModelError::InvalidParams(e.to_string()))?;
        if var.iter().any(|v| !(*v > 0.0)) {
            return Err(ModelError::InvalidParams(
                "variances must be positive".to_string(),
            ));
        }
        Ok(Self {
            class_prior: Array1::from(params.class_prior),
            theta,
            var,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_nb_fits_means_and_priors() {
        let x = array![[1.0, 10.0], [3.0, 10.0], [10.0, 0.0], [12.0, 2.0], [11.0, 1.0]];
        let y = array![0, 0, 1, 1, 1];
        let nb = GaussianNb::new().fit(x.view(), y.view()).unwrap();

        assert_eq!(nb.class_prior().to_vec(), vec![0.4, 0.6]);
        assert_eq!(nb.theta().row(0).to_vec(), vec![2.0, 10.0]);
        assert_eq!(nb.theta().row(1).to_vec(), vec![11.0, 1.0]);
        assert_eq!(nb.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_nb_handles_constant_feature_within_class() {
        // Feature 1 is constant inside class 0; smoothing keeps it finite.
        let x = array![[0.0, 5.0], [1.0, 5.0], [4.0, 6.0], [5.0, 7.0]];
        let y = array![0, 0, 1, 1];
        let nb = GaussianNb::new().fit(x.view(), y.view()).unwrap();
        let jll = nb.joint_log_likelihood(x.view()).unwrap();
        assert!(jll.iter().all(|v| !v.is_nan()));
        assert_eq!(nb.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_nb_feature_mismatch() {
        let x = array![[0.0], [1.0]];
        let y = array![0, 1];
        let nb = GaussianNb::new().fit(x.view(), y.view()).unwrap();
        assert!(matches!(
            nb.predict(array![[0.0, 1.0]].view()),
            Err(ModelError::FeatureMismatch { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn test_nb_params_roundtrip() {
        let x = array![[0.0, 1.0], [1.0, 0.5], [4.0, 3.0], [5.0, 2.0]];
        let y = array![0, 0, 1, 1];
        let nb = GaussianNb::new().fit(x.view(), y.view()).unwrap();
        let restored = FittedGaussianNb::from_params(nb.extract_params()).unwrap();
        assert_eq!(
            restored.joint_log_likelihood(x.view()).unwrap(),
            nb.joint_log_likelihood(x.view()).unwrap()
        );
    }
}

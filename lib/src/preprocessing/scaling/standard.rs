//! Standard Scaler (Z-score normalization).
//!
//! Transforms features by removing the mean and scaling to unit variance.
//!
//! The standard score of a sample `x` is calculated as:
//! ```text
//! z = (x - u) / s
//! ```
//! where `u` is the mean of the training samples, and `s` is the population
//! standard deviation (ddof = 0). A feature with zero spread keeps `s = 1`.
//!
//! # Example
//! ```ignore
//! use yieldsense::preprocessing::{FittedTransformer, StandardScaler, Transformer};
//!
//! let fitted = StandardScaler::new().fit(&x_train)?;
//! let x_train = fitted.transform(&x_train)?;
//! let x_test = fitted.transform(&x_test)?;
//! ```

use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Serializable parameters for a fitted StandardScaler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScalerParams {
    /// Mean of each feature.
    pub mean: Vec<f64>,
    /// Standard deviation of each feature (1 for constant features).
    pub std: Vec<f64>,
}

/// StandardScaler transformer (unfitted). It has no hyperparameters.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardScaler;

impl StandardScaler {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for StandardScaler {
    type Params = StandardScalerParams;
    type Fitted = FittedStandardScaler;

    fn fit(&self, data: &Array2<f64>) -> Result<Self::Fitted, PreprocessingError> {
        if data.nrows() == 0 {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit StandardScaler on empty data".to_string(),
            ));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(PreprocessingError::MissingValues(
                "StandardScaler requires finite input; impute first".to_string(),
            ));
        }

        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| PreprocessingError::EmptyData("no rows".to_string()))?;
        let std = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 { 1.0 } else { s });

        Ok(FittedStandardScaler { mean, std })
    }
}

/// Fitted StandardScaler ready for inference.
#[derive(Clone, Debug)]
pub struct FittedStandardScaler {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl FittedStandardScaler {
    /// Get the mean values for each feature.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Get the standard deviation values for each feature.
    pub fn std(&self) -> &Array1<f64> {
        &self.std
    }
}

impl FittedTransformer for FittedStandardScaler {
    type Params = StandardScalerParams;

    fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, PreprocessingError> {
        self.check_features(data)?;

        let mut result = data.clone();
        result -= &self.mean;
        result /= &self.std;
        Ok(result)
    }

    fn extract_params(&self) -> Self::Params {
        StandardScalerParams {
            mean: self.mean.to_vec(),
            std: self.std.to_vec(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        if params.mean.len() != params.std.len() {
            return Err(PreprocessingError::InvalidShape {
                expected: format!("{} std values", params.mean.len()),
                got: format!("{} std values", params.std.len()),
            });
        }
        if params.std.iter().any(|&s| s <= 0.0 || !s.is_finite()) {
            return Err(PreprocessingError::NumericalError(
                "scaler std must be positive and finite".to_string(),
            ));
        }

        Ok(Self {
            mean: Array1::from(params.mean),
            std: Array1::from(params.std),
        })
    }

    fn n_features_in(&self) -> usize {
        self.mean.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn create_test_data() -> Array2<f64> {
        array![[0.0, 1.0], [0.0, 1.0], [1.0, 3.0]]
    }

    #[test]
    fn test_standard_scaler_fit() {
        let fitted = StandardScaler::new().fit(&create_test_data()).unwrap();

        // Mean: [1/3, 5/3]
        let mean = fitted.mean();
        assert!((mean[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((mean[1] - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_standard_scaler_transform() {
        let data = create_test_data();
        let transformed = StandardScaler::new().fit_transform(&data).unwrap();

        let mean = transformed.mean_axis(Axis(0)).unwrap();
        let std = transformed.std_axis(Axis(0), 0.0);
        for j in 0..2 {
            assert!(mean[j].abs() < 1e-12, "mean[{}] = {}", j, mean[j]);
            assert!((std[j] - 1.0).abs() < 1e-12, "std[{}] = {}", j, std[j]);
        }
    }

    #[test]
    fn test_standard_scaler_test_partition_not_refit() {
        let train = create_test_data();
        let test = array![[2.0, 5.0], [4.0, 1.0]];
        let fitted = StandardScaler::new().fit(&train).unwrap();

        let scaled = fitted.transform(&test).unwrap();
        let expected = (2.0 - fitted.mean()[0]) / fitted.std()[0];
        assert!((scaled[[0, 0]] - expected).abs() < 1e-12);
        // Statistics come from train, so the test mean is not centered.
        assert!(scaled.mean_axis(Axis(0)).unwrap()[0].abs() > 1e-3);
    }

    #[test]
    fn test_standard_scaler_constant_feature() {
        let data = array![[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]];
        let fitted = StandardScaler::new().fit(&data).unwrap();

        assert_eq!(fitted.std()[0], 1.0);
        assert_eq!(fitted.mean()[0], 5.0);
    }

    #[test]
    fn test_standard_scaler_rejects_nan() {
        let data = array![[1.0], [f64::NAN]];
        assert!(matches!(
            StandardScaler::new().fit(&data),
            Err(PreprocessingError::MissingValues(_))
        ));
    }

    #[test]
    fn test_standard_scaler_empty_data() {
        let data = Array2::<f64>::zeros((0, 2));
        assert!(StandardScaler::new().fit(&data).is_err());
    }

    #[test]
    fn test_standard_scaler_feature_mismatch() {
        let fitted = StandardScaler::new().fit(&create_test_data()).unwrap();
        let wrong = array![[1.0, 2.0, 3.0]];
        assert!(matches!(
            fitted.transform(&wrong),
            Err(PreprocessingError::FeatureMismatch {
                expected_features: 2,
                got_features: 3
            })
        ));
    }

    #[test]
    fn test_standard_scaler_fit_is_deterministic() {
        let data = create_test_data();
        let a = StandardScaler::new().fit(&data).unwrap().extract_params();
        let b = StandardScaler::new().fit(&data).unwrap().extract_params();
        assert_eq!(a, b);
    }

    #[test]
    fn test_standard_scaler_save_load_file() {
        let data = create_test_data();
        let fitted = StandardScaler::new().fit(&data).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.bin");
        fitted.save_to_file(&path).unwrap();

        let loaded = FittedStandardScaler::load_from_file(&path).unwrap();
        assert_eq!(loaded.n_features_in(), 2);
        assert_eq!(loaded.transform(&data).unwrap(), fitted.transform(&data).unwrap());
    }

    #[test]
    fn test_standard_scaler_from_params_rejects_zero_std() {
        let params = StandardScalerParams {
            mean: vec![0.0],
            std: vec![0.0],
        };
        assert!(FittedStandardScaler::from_params(params).is_err());
    }
}

//! Simple Imputer.
//!
//! Imputation transformer for completing missing values with a per-column
//! statistic. NaN marks a missing value.
//!
//! Unlike a silent zero fill, fitting on a column with no observed values is
//! an error: the caller decides whether to drop that column first.
//!
//! # Example
//! ```ignore
//! use yieldsense::preprocessing::{ImputeStrategy, SimpleImputer, Transformer};
//!
//! let fitted = SimpleImputer::new(ImputeStrategy::Median).fit(&x_train)?;
//! let imputed = fitted.transform(&x_test)?;
//! ```

use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use crate::stats;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Strategy for imputing missing values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace missing values with the mean of each column.
    Mean,
    /// Replace missing values with the median of each column.
    #[default]
    Median,
}

/// Serializable parameters for a fitted SimpleImputer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimpleImputerParams {
    /// Strategy used for imputation.
    pub strategy: ImputeStrategy,
    /// Fill value for each feature.
    pub statistics: Vec<f64>,
}

/// SimpleImputer transformer (unfitted).
#[derive(Clone, Debug, Default)]
pub struct SimpleImputer {
    strategy: ImputeStrategy,
}

impl SimpleImputer {
    /// Create a new SimpleImputer with the specified strategy.
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }
}

impl Transformer for SimpleImputer {
    type Params = SimpleImputerParams;
    type Fitted = FittedSimpleImputer;

    fn fit(&self, data: &Array2<f64>) -> Result<Self::Fitted, PreprocessingError> {
        if data.nrows() == 0 {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit SimpleImputer on empty data".to_string(),
            ));
        }

        let mut statistics = Vec::with_capacity(data.ncols());
        for (idx, column) in data.axis_iter(Axis(1)).enumerate() {
            let observed = stats::observed(column.iter().copied());
            if observed.is_empty() {
                return Err(PreprocessingError::AllMissing { column: idx });
            }
            let value = match self.strategy {
                ImputeStrategy::Mean => observed.iter().sum::<f64>() / observed.len() as f64,
                ImputeStrategy::Median => stats::median(&observed),
            };
            statistics.push(value);
        }

        Ok(FittedSimpleImputer {
            strategy: self.strategy,
            statistics: Array1::from(statistics),
        })
    }
}

/// Fitted SimpleImputer ready for inference.
#[derive(Clone, Debug)]
pub struct FittedSimpleImputer {
    strategy: ImputeStrategy,
    statistics: Array1<f64>,
}

impl FittedSimpleImputer {
    /// Get the fill value for each feature.
    pub fn statistics(&self) -> &Array1<f64> {
        &self.statistics
    }

    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }
}

impl FittedTransformer for FittedSimpleImputer {
    type Params = SimpleImputerParams;

    fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, PreprocessingError> {
        self.check_features(data)?;

        let mut result = data.clone();
        for mut row in result.axis_iter_mut(Axis(0)) {
            for (value, fill) in row.iter_mut().zip(self.statistics.iter()) {
                if value.is_nan() {
                    *value = *fill;
                }
            }
        }
        Ok(result)
    }

    fn extract_params(&self) -> Self::Params {
        SimpleImputerParams {
            strategy: self.strategy,
            statistics: self.statistics.to_vec(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        if params.statistics.iter().any(|v| !v.is_finite()) {
            return Err(PreprocessingError::NumericalError(
                "imputer statistics must be finite".to_string(),
            ));
        }
        Ok(Self {
            strategy: params.strategy,
            statistics: Array1::from(params.statistics),
        })
    }

    fn n_features_in(&self) -> usize {
        self.statistics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn create_test_data() -> Array2<f64> {
        array![
            [1.0, 10.0],
            [f64::NAN, 20.0],
            [3.0, f64::NAN],
            [5.0, 40.0]
        ]
    }

    #[test]
    fn test_simple_imputer_median() {
        let fitted = SimpleImputer::new(ImputeStrategy::Median)
            .fit(&create_test_data())
            .unwrap();
        assert_eq!(fitted.statistics().to_vec(), vec![3.0, 20.0]);
    }

    #[test]
    fn test_simple_imputer_median_even_count() {
        let data = array![[1.0], [2.0], [f64::NAN], [10.0], [4.0]];
        let fitted = SimpleImputer::new(ImputeStrategy::Median).fit(&data).unwrap();
        assert_eq!(fitted.statistics()[0], 3.0);
    }

    #[test]
    fn test_simple_imputer_mean() {
        let fitted = SimpleImputer::new(ImputeStrategy::Mean)
            .fit(&create_test_data())
            .unwrap();
        assert!((fitted.statistics()[0] - 3.0).abs() < 1e-12);
        assert!((fitted.statistics()[1] - 70.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_simple_imputer_transform_fills_only_missing() {
        let data = create_test_data();
        let imputed = SimpleImputer::new(ImputeStrategy::Median)
            .fit_transform(&data)
            .unwrap();

        assert_eq!(imputed[[0, 0]], 1.0);
        assert_eq!(imputed[[1, 0]], 3.0);
        assert_eq!(imputed[[2, 1]], 20.0);
        assert!(imputed.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_simple_imputer_all_missing_column_errors() {
        let data = array![[1.0, f64::NAN], [2.0, f64::NAN]];
        let result = SimpleImputer::new(ImputeStrategy::Median).fit(&data);
        assert!(matches!(
            result,
            Err(PreprocessingError::AllMissing { column: 1 })
        ));
    }

    #[test]
    fn test_simple_imputer_empty_data() {
        let data = Array2::<f64>::zeros((0, 3));
        let result = SimpleImputer::default().fit(&data);
        assert!(matches!(result, Err(PreprocessingError::EmptyData(_))));
    }

    #[test]
    fn test_simple_imputer_feature_mismatch() {
        let fitted = SimpleImputer::default().fit(&create_test_data()).unwrap();
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
    fn test_simple_imputer_save_load_file() {
        let data = create_test_data();
        let fitted = SimpleImputer::default().fit(&data).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imputer.bin");
        fitted.save_to_file(&path).unwrap();
        let loaded = FittedSimpleImputer::load_from_file(&path).unwrap();

        assert_eq!(loaded.strategy(), ImputeStrategy::Median);
        assert_eq!(loaded.transform(&data).unwrap(), fitted.transform(&data).unwrap());
    }
}

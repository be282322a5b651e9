//! Core traits for preprocessing transformers.
//!
//! This module defines the two central traits:
//! - [`Transformer`]: Used during fitting; has hyperparameters and learns from data.
//! - [`FittedTransformer`]: After fitting; applies the learned statistics and
//!   can be serialized.
//!
//! Keeping the two states in separate types is what prevents leakage: the
//! statistics of a [`FittedTransformer`] are frozen, so transforming the test
//! partition can never re-fit on it.

use crate::preprocessing::error::PreprocessingError;
use crate::serialization::SerializableParams;
use ndarray::Array2;

/// Trait for unfitted transformers with hyperparameters.
///
/// # Example
/// ```ignore
/// use yieldsense::preprocessing::{StandardScaler, Transformer, FittedTransformer};
///
/// let fitted = StandardScaler::new().fit(&x_train)?;
/// let x_train = fitted.transform(&x_train)?;
/// let x_test = fitted.transform(&x_test)?;
/// ```
pub trait Transformer: Clone {
    /// Serializable representation of learned parameters.
    type Params: SerializableParams;
    /// The fitted transformer type ready for inference.
    type Fitted: FittedTransformer<Params = Self::Params>;

    /// Learn the transformer's statistics from `data` (rows = samples).
    ///
    /// # Errors
    /// Returns [`PreprocessingError`] if the data is empty or unusable for
    /// this transformer.
    fn fit(&self, data: &Array2<f64>) -> Result<Self::Fitted, PreprocessingError>;

    /// Fit the transformer and transform the same data in one step.
    fn fit_transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, PreprocessingError> {
        let fitted = self.fit(data)?;
        fitted.transform(data)
    }
}

/// Trait for fitted transformers ready for inference.
///
/// # Guarantees
/// - `extract_params()` + `from_params()` is a round-trip.
/// - `save_to_file` / `load_from_file` are cross-platform compatible.
pub trait FittedTransformer: Clone {
    /// Serializable representation of learned parameters.
    type Params: SerializableParams;

    /// Transform data using learned parameters.
    ///
    /// # Errors
    /// Returns [`PreprocessingError::FeatureMismatch`] if the column count
    /// differs from the one seen during fit.
    fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, PreprocessingError>;

    /// Extract learned parameters as a serializable representation.
    fn extract_params(&self) -> Self::Params;

    /// Reconstruct a fitted transformer from parameters.
    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError>
    where
        Self: Sized;

    /// Returns the number of features seen during fit.
    fn n_features_in(&self) -> usize;

    /// Save the fitted transformer to a file.
    fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> std::io::Result<()> {
        crate::serialization::write_params(&self.extract_params(), path)
    }

    /// Load a fitted transformer from a file.
    fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, PreprocessingError>
    where
        Self: Sized,
    {
        let bytes = std::fs::read(path)?;
        let params = Self::Params::from_bytes(&bytes)
            .map_err(|e| PreprocessingError::SerializationError(e.to_string()))?;
        Self::from_params(params)
    }

    /// Check that `data` has the column count seen during fit.
    fn check_features(&self, data: &Array2<f64>) -> Result<(), PreprocessingError> {
        let got = data.ncols();
        if got != self.n_features_in() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.n_features_in(),
                got_features: got,
            });
        }
        Ok(())
    }
}

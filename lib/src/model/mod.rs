//! Classifiers.
//!
//! Every model comes as an unfitted/fitted pair:
//! - [`Classifier`] holds hyperparameters only and produces a fitted model.
//! - [`FittedClassifier`] holds learned parameters only; it predicts and can
//!   be serialized, but knows nothing about how it was trained.
//!
//! Labels are dense class ids `0..n_classes`.

pub mod forest;
pub mod naive_bayes;
pub mod svm;
pub mod tree;

pub use forest::{FittedRandomForest, RandomForest, RandomForestParams};
pub use naive_bayes::{FittedGaussianNb, GaussianNb, GaussianNbParams};
pub use svm::{FittedSvc, Gamma, Kernel, Svc, SvcParams};
pub use tree::{DecisionTree, DecisionTreeParams, FittedDecisionTree, MaxFeatures};

use crate::serialization::{read_params, write_params, SerializableParams};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Hyperparameter name → value, sorted by name.
pub type ParamMap = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid hyperparameter: {0}")]
    InvalidParameter(String),
    #[error("Empty training data")]
    EmptyData,
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("Feature mismatch: expected {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },
    #[error("Invalid labels: {0}")]
    InvalidLabels(String),
    #[error("Input contains non-finite values")]
    NonFinite,
    #[error("Invalid model parameters: {0}")]
    InvalidParams(String),
}

/// An unfitted classifier: hyperparameters plus a way to learn from data.
pub trait Classifier: Clone + Send + Sync {
    type Fitted: FittedClassifier;

    fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<Self::Fitted, ModelError>;
}

/// A trained classifier ready for inference.
pub trait FittedClassifier: Clone + Send + Sync {
    type Params: SerializableParams;

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>, ModelError>;

    fn n_features_in(&self) -> usize;

    fn extract_params(&self) -> Self::Params;

    fn from_params(params: Self::Params) -> Result<Self, ModelError>
    where
        Self: Sized;

    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        write_params(&self.extract_params(), path)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self>
    where
        Self: Sized,
    {
        let params = read_params::<Self::Params, _>(path)?;
        Self::from_params(params)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    fn check_features(&self, x: ArrayView2<f64>) -> Result<(), ModelError> {
        if x.ncols() != self.n_features_in() {
            return Err(ModelError::FeatureMismatch {
                expected: self.n_features_in(),
                got: x.ncols(),
            });
        }
        Ok(())
    }
}

/// Models whose hyperparameters are tuned by grid search.
pub trait Hyperparameters {
    fn hyperparameters(&self) -> ParamMap;
}

/// The three model families compared by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelKind {
    NaiveBayes,
    Svm,
    RandomForest,
}

impl ModelKind {
    /// Lower is simpler; used to break ties in test accuracy.
    pub fn complexity_rank(&self) -> u8 {
        match self {
            ModelKind::NaiveBayes => 0,
            ModelKind::Svm => 1,
            ModelKind::RandomForest => 2,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::RandomForest => "Random Forest",
            ModelKind::Svm => "SVM",
            ModelKind::NaiveBayes => "Naive Bayes",
        };
        f.write_str(name)
    }
}

/// Shared checks for `fit`: non-empty, matching lengths, finite features.
/// Returns the number of classes (`max label + 1`).
pub(crate) fn validate_training(
    x: ArrayView2<f64>,
    y: ArrayView1<usize>,
) -> Result<usize, ModelError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ModelError::EmptyData);
    }
    if x.nrows() != y.len() {
        return Err(ModelError::ShapeMismatch(format!(
            "{} samples but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::NonFinite);
    }
    Ok(y.iter().max().map_or(0, |&m| m + 1))
}

/// Index of the largest value; ties go to the lowest index.
pub(crate) fn argmax(values: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_validate_training() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(validate_training(x.view(), array![0, 1].view()).unwrap(), 2);
        assert!(matches!(
            validate_training(x.view(), array![0].view()),
            Err(ModelError::ShapeMismatch(_))
        ));
        let bad = array![[1.0, f64::NAN]];
        assert!(matches!(
            validate_training(bad.view(), array![0].view()),
            Err(ModelError::NonFinite)
        ));
    }

    #[test]
    fn test_argmax_ties_go_low() {
        assert_eq!(argmax(array![0.5, 0.5].view()), 0);
        assert_eq!(argmax(array![0.2, 0.7, 0.1].view()), 1);
    }

    #[test]
    fn test_model_kind_order() {
        assert!(ModelKind::NaiveBayes.complexity_rank() < ModelKind::Svm.complexity_rank());
        assert!(ModelKind::Svm.complexity_rank() < ModelKind::RandomForest.complexity_rank());
        assert_eq!(ModelKind::RandomForest.to_string(), "Random Forest");
    }
}

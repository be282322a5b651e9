//! The persisted best-model bundle.
//!
//! A [`ModelArtifact`] holds everything needed to score new raw feature rows
//! without retraining: the fitted model parameters, the fitted scaler (and
//! imputer, when one was fitted), the feature names in column order and the
//! label encoding of the input data. It is written with bincode through
//! [`SerializableParams`](crate::serialization::SerializableParams).

use crate::error::PipelineError;
use crate::model::{
    FittedClassifier, FittedGaussianNb, FittedRandomForest, FittedSvc, GaussianNbParams,
    ModelKind, RandomForestParams, SvcParams,
};
use crate::preprocessing::{
    FittedSimpleImputer, FittedStandardScaler, FittedTransformer, LabelEncoding,
    PreprocessingError, SimpleImputerParams, StandardScalerParams,
};
use crate::serialization::{read_params, write_params};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::info;

/// Bumped whenever the serialized layout changes.
pub const FORMAT_VERSION: u32 = 1;

/// Fitted parameters of the persisted model family.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ModelParams {
    RandomForest(RandomForestParams),
    Svm(SvcParams),
    NaiveBayes(GaussianNbParams),
}

impl ModelParams {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelParams::RandomForest(_) => ModelKind::RandomForest,
            ModelParams::Svm(_) => ModelKind::Svm,
            ModelParams::NaiveBayes(_) => ModelKind::NaiveBayes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub model: ModelParams,
    pub scaler: StandardScalerParams,
    pub imputer: Option<SimpleImputerParams>,
    pub feature_names: Vec<String>,
    pub label_encoding: LabelEncoding,
    pub test_accuracy: f64,
}

impl ModelArtifact {
    pub fn new(
        model: ModelParams,
        scaler: StandardScalerParams,
        imputer: Option<SimpleImputerParams>,
        feature_names: Vec<String>,
        label_encoding: LabelEncoding,
        test_accuracy: f64,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            model,
            scaler,
            imputer,
            feature_names,
            label_encoding,
            test_accuracy,
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PipelineError> {
        let path = path.as_ref();
        write_params(self, path).map_err(|source| PipelineError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), model = %self.kind(), "model artifact written");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let artifact: ModelArtifact = read_params(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::InvalidData {
                PipelineError::Artifact(format!("{}: {}", path.display(), source))
            } else {
                PipelineError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        if artifact.format_version != FORMAT_VERSION {
            return Err(PipelineError::Artifact(format!(
                "unsupported format version {} (expected {})",
                artifact.format_version, FORMAT_VERSION
            )));
        }
        Ok(artifact)
    }

    /// Class ids for raw feature rows, columns ordered as `feature_names`.
    ///
    /// Missing cells (NaN) are filled by the stored imputer; without one they
    /// are an error.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>, PipelineError> {
        if x.ncols() != self.n_features() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.n_features(),
                got_features: x.ncols(),
            }
            .into());
        }

        let imputed = match &self.imputer {
            Some(params) => FittedSimpleImputer::from_params(params.clone())?.transform(x)?,
            None if x.iter().any(|v| v.is_nan()) => {
                return Err(PreprocessingError::MissingValues(
                    "input has missing cells and the artifact has no imputer".to_string(),
                )
                .into())
            }
            None => x.clone(),
        };
        let scaled = FittedStandardScaler::from_params(self.scaler.clone())?.transform(&imputed)?;

        let predictions = match &self.model {
            ModelParams::RandomForest(params) => {
                FittedRandomForest::from_params(params.clone())?.predict(scaled.view())?
            }
            ModelParams::Svm(params) => {
                FittedSvc::from_params(params.clone())?.predict(scaled.view())?
            }
            ModelParams::NaiveBayes(params) => {
                FittedGaussianNb::from_params(params.clone())?.predict(scaled.view())?
            }
        };
        Ok(predictions)
    }

    /// Predictions mapped back to the input label encoding (e.g. `-1`/`1`).
    pub fn predict_labels(&self, x: &Array2<f64>) -> Result<Vec<i64>, PipelineError> {
        let classes = self.predict(x)?;
        Ok(classes.iter().map(|&c| self.label_encoding.decode(c)).collect())
    }
}

impl fmt::Display for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "model:          {}", self.kind())?;
        writeln!(f, "format version: {}", self.format_version)?;
        writeln!(f, "test accuracy:  {:.4}", self.test_accuracy)?;
        writeln!(f, "features:       {}", self.n_features())?;
        writeln!(f, "label encoding: {:?}", self.label_encoding)?;
        write!(
            f,
            "imputer:        {}",
            if self.imputer.is_some() { "median" } else { "none" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Classifier, GaussianNb};
    use crate::preprocessing::{ImputeStrategy, SimpleImputer, StandardScaler, Transformer};
    use ndarray::array;

    fn fitted_artifact(with_imputer: bool) -> (ModelArtifact, Array2<f64>, Array1<usize>) {
        let x = array![
            [1.0, 10.0],
            [1.2, 11.0],
            [0.9, 9.5],
            [5.0, 50.0],
            [5.3, 52.0],
            [4.8, 49.0]
        ];
        let y = array![0, 0, 0, 1, 1, 1];
        let imputer = SimpleImputer::new(ImputeStrategy::Median).fit(&x).unwrap();
        let scaler = StandardScaler::new().fit(&x).unwrap();
        let scaled = scaler.transform(&x).unwrap();
        let model = GaussianNb::new().fit(scaled.view(), y.view()).unwrap();

        let artifact = ModelArtifact::new(
            ModelParams::NaiveBayes(model.extract_params()),
            scaler.extract_params(),
            with_imputer.then(|| imputer.extract_params()),
            vec!["sensor_1".to_string(), "sensor_2".to_string()],
            LabelEncoding::MinusOnePlusOne,
            1.0,
        );
        (artifact, x, y)
    }

    #[test]
    fn test_save_load_predict() {
        let (artifact, x, y) = fitted_artifact(false);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best_model.bin");

        artifact.save(&path).unwrap();
        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded, artifact);
        assert_eq!(loaded.kind(), ModelKind::NaiveBayes);
        assert_eq!(loaded.predict(&x).unwrap(), y);
        assert_eq!(loaded.predict_labels(&x).unwrap(), vec![-1, -1, -1, 1, 1, 1]);
    }

    #[test]
    fn test_predict_imputes_missing_cells() {
        let (artifact, _, _) = fitted_artifact(true);
        let rows = array![[f64::NAN, 10.5], [5.1, f64::NAN]];
        assert_eq!(artifact.predict(&rows).unwrap(), array![0, 1]);

        let (without, _, _) = fitted_artifact(false);
        assert!(matches!(
            without.predict(&rows),
            Err(PipelineError::Preprocessing(PreprocessingError::MissingValues(_)))
        ));
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let (artifact, _, _) = fitted_artifact(false);
        assert!(artifact.predict(&array![[1.0, 2.0, 3.0]]).is_err());
    }

    #[test]
    fn test_save_to_unwritable_path() {
        let (artifact, _, _) = fitted_artifact(false);
        let err = artifact.save("/nonexistent-dir/model.bin").unwrap_err();
        assert!(matches!(err, PipelineError::Persistence { .. }));
    }

    #[test]
    fn test_load_rejects_garbage_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.bin");
        std::fs::write(&path, b"definitely not bincode").unwrap();
        assert!(matches!(ModelArtifact::load(&path), Err(PipelineError::Artifact(_))));
        assert!(matches!(
            ModelArtifact::load(dir.path().join("missing.bin")),
            Err(PipelineError::Io { .. })
        ));
    }
}

//! Top-level error type for the pipeline.
//!
//! Each layer has its own `thiserror` enum ([`PreprocessingError`],
//! [`ModelError`], [`SearchError`], [`ConfigError`]); `PipelineError` wraps
//! them so stage functions can use `?` throughout.

use crate::config::ConfigError;
use crate::model::ModelError;
use crate::preprocessing::PreprocessingError;
use crate::selection::SearchError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Missing label column, empty dataset, non-binary labels and the like.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    #[error(transparent)]
    Preprocessing(#[from] PreprocessingError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to persist model artifact to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid model artifact: {0}")]
    Artifact(String),
}

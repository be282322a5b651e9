//! # yieldsense
//!
//! Pass/fail classification for semiconductor manufacturing sensor data:
//! clean a wide CSV of sensor readings, explore it, rebalance the rare fail
//! class with SMOTE, grid-search a random forest and an SVM, fit a Gaussian
//! naive Bayes baseline and persist whichever scores best on held-out data.
//!
//! ## Core Design Principles
//!
//! - **Fitted vs unfitted types**: every learned step (imputer, scaler,
//!   classifier) is an unfitted type holding hyperparameters whose `fit`
//!   returns a separate fitted type holding only learned parameters.
//! - **No leakage**: the scaler (and the imputer, when deferred) is fitted on
//!   the training partition only and applied unchanged to the test partition.
//! - **Deterministic**: one seed drives the split, SMOTE and the forest; grid
//!   candidates run in parallel but results are gathered in grid order.
//!
//! ## Quick Start
//!
//! ```no_run
//! use yieldsense::config::PipelineConfig;
//! use yieldsense::pipeline::Pipeline;
//!
//! let config = PipelineConfig::builder()
//!     .input("sensor-data.csv")
//!     .model_path("best_model.bin")
//!     .build()
//!     .unwrap();
//! let outcome = Pipeline::new(config).unwrap().run().unwrap();
//! println!("{}", outcome.summary);
//! ```
//!
//! ## Module Structure
//!
//! - `dataset`: CSV ingestion and the in-memory `(X, y)` dataset
//! - `preprocessing`: cleaning, imputation, scaling, split and SMOTE
//! - `stats`: exploratory statistics
//! - `model`: random forest, SVC and Gaussian naive Bayes
//! - `selection`: stratified k-fold and grid search
//! - `evaluation`: accuracy and classification reports
//! - `pipeline`: the stages wired together
//! - `artifact` / `serialization`: model persistence

/// Persisted best-model bundle.
pub mod artifact;

/// Pipeline configuration and validation.
pub mod config;

/// Data loading utilities and dataset abstractions.
pub mod dataset;

pub mod error;

/// Metrics for fitted classifiers.
pub mod evaluation;

/// Classifiers with separate unfitted and fitted types.
pub mod model;

pub mod pipeline;

/// Data preprocessing transformers and sampling.
pub mod preprocessing;

/// Exploration and comparison reports.
pub mod report;

/// Hyperparameter search.
pub mod selection;

/// Model persistence and format conversion utilities.
pub mod serialization;

/// Exploratory statistics.
pub mod stats;

pub use artifact::ModelArtifact;
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use pipeline::Pipeline;

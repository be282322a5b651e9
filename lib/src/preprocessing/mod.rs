//! Data preprocessing: cleaning, imputation, scaling, splitting and balancing.
//!
//! Learned transformations follow a type-state pattern: an unfitted
//! [`Transformer`] carries hyperparameters, and `fit` returns a separate
//! [`FittedTransformer`] whose statistics are frozen. Fitted transformers are
//! serializable so they can travel with the persisted model.
//!
//! # Available Components
//!
//! ## Cleaning
//! - [`clean`]: raw table to an `InMemoryDataset`, with a [`CleaningReport`]
//!
//! ## Imputation
//! - [`SimpleImputer`]: fill missing values with the column median, mean or a constant
//!
//! ## Scaling
//! - [`StandardScaler`]: z-score normalization
//!
//! ## Sampling
//! - [`StratifiedSplit`]: seeded, class-proportional train/test split
//! - [`Smote`]: synthetic minority oversampling
//!
//! # Example
//!
//! ```ignore
//! use yieldsense::preprocessing::{FittedTransformer, StandardScaler, Transformer};
//!
//! // Fit on the training partition only
//! let scaler = StandardScaler::new().fit(&x_train)?;
//!
//! let x_train = scaler.transform(&x_train)?;
//! let x_test = scaler.transform(&x_test)?;
//!
//! scaler.save_to_file("scaler.bin")?;
//! ```

pub mod balancing;
pub mod cleaning;
pub mod error;
pub mod imputation;
pub mod scaling;
pub mod split;
pub mod traits;

// Re-export main types
pub use balancing::{Resampled, Smote};
pub use cleaning::{
    clean, normalize_name, CleanedDataset, CleaningConfig, CleaningReport, ImputeScope,
    LabelEncoding, MissingColumn,
};
pub use error::PreprocessingError;
pub use imputation::{FittedSimpleImputer, ImputeStrategy, SimpleImputer, SimpleImputerParams};
pub use scaling::{FittedStandardScaler, StandardScaler, StandardScalerParams};
pub use split::{SplitIndices, StratifiedSplit};
pub use traits::{FittedTransformer, Transformer};

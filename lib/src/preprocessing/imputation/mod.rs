//! Imputation transformers for handling missing values.
//!
//! | Transformer | Description |
//! |-------------|-------------|
//! | [`SimpleImputer`] | Impute with the column mean, median, or a constant |

pub mod simple;

pub use simple::{FittedSimpleImputer, ImputeStrategy, SimpleImputer, SimpleImputerParams};

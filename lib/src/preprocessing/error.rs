//! Error types for preprocessing operations.

use thiserror::Error;

/// Error type for preprocessing operations.
#[derive(Debug, Error)]
pub enum PreprocessingError {
    /// Shape mismatch between expected and actual dimensions.
    #[error("Invalid shape: expected {expected}, got {got}")]
    InvalidShape { expected: String, got: String },
    /// Numerical computation error (overflow, degenerate input, etc.).
    #[error("Numerical error: {0}")]
    NumericalError(String),
    /// Data contains missing values (NaN) when not expected.
    #[error("Missing values: {0}")]
    MissingValues(String),
    /// Every value of a column is missing, so no fill statistic exists.
    #[error("Column {column} has no observed values")]
    AllMissing { column: usize },
    /// Invalid hyperparameter value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Labels outside the supported encoding.
    #[error("Invalid labels: {0}")]
    InvalidLabels(String),
    /// Too few minority samples to synthesize new ones.
    #[error("Cannot balance classes: minority class {class} has {count} sample(s), at least {required} needed")]
    InsufficientMinority {
        class: usize,
        count: usize,
        required: usize,
    },
    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(String),
    /// Empty data provided where non-empty was required.
    #[error("Empty data: {0}")]
    EmptyData(String),
    /// Feature dimension mismatch.
    #[error("Feature mismatch: expected {expected_features} features, got {got_features}")]
    FeatureMismatch {
        expected_features: usize,
        got_features: usize,
    },
}

impl From<std::io::Error> for PreprocessingError {
    fn from(err: std::io::Error) -> Self {
        PreprocessingError::IoError(err.to_string())
    }
}

impl From<bincode::Error> for PreprocessingError {
    fn from(err: bincode::Error) -> Self {
        PreprocessingError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_shape() {
        let err = PreprocessingError::InvalidShape {
            expected: "(2, 3)".to_string(),
            got: "(3, 2)".to_string(),
        };
        assert!(err.to_string().contains("Invalid shape"));
    }

    #[test]
    fn test_error_display_all_missing() {
        let err = PreprocessingError::AllMissing { column: 7 };
        assert_eq!(err.to_string(), "Column 7 has no observed values");
    }

    #[test]
    fn test_error_display_insufficient_minority() {
        let err = PreprocessingError::InsufficientMinority {
            class: 1,
            count: 1,
            required: 2,
        };
        assert!(err.to_string().starts_with("Cannot balance classes"));
    }

    #[test]
    fn test_error_display_feature_mismatch() {
        let err = PreprocessingError::FeatureMismatch {
            expected_features: 5,
            got_features: 3,
        };
        assert!(err.to_string().contains("expected 5 features, got 3"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: PreprocessingError = io_err.into();
        assert!(matches!(err, PreprocessingError::IoError(_)));
    }

    #[test]
    fn test_error_from_bincode_error() {
        let bad_bytes: &[u8] = &[0xff, 0xff, 0xff, 0xff];
        let bincode_result: Result<String, bincode::Error> = bincode::deserialize(bad_bytes);
        if let Err(e) = bincode_result {
            let err: PreprocessingError = e.into();
            assert!(matches!(err, PreprocessingError::SerializationError(_)));
        }
    }
}

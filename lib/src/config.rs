//! Pipeline configuration.
//!
//! Every field has a default, so a JSON config file only needs the values it
//! changes. CLI flags are applied on top of the loaded file.
//!
//! # Example
//!
//! ```rust
//! use yieldsense::config::PipelineConfig;
//!
//! let config = PipelineConfig::builder()
//!     .input("sensor-data.csv")
//!     .seed(7)
//!     .test_size(0.25)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.seed, 7);
//! ```

use crate::preprocessing::{CleaningConfig, ImputeScope};
use crate::selection::{ForestGrid, SvmGrid};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// When SMOTE runs relative to the train/test split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStage {
    /// Balance only the training partition; the test partition stays real.
    #[default]
    TrainPartition,
    /// Balance the whole dataset, then split.
    BeforeSplit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Whether SMOTE runs at all.
    /// Default: true
    pub enabled: bool,
    /// Default: TrainPartition
    pub stage: BalanceStage,
    /// Oversample when `minority / majority` is below this ratio.
    /// Default: 0.5
    pub threshold: f64,
    /// Default: 5
    pub k_neighbors: usize,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stage: BalanceStage::default(),
            threshold: 0.5,
            k_neighbors: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input CSV file.
    /// Default: "sensor-data.csv"
    pub input: PathBuf,

    /// Where the best model artifact is written.
    /// Default: "best_model.bin"
    pub model_path: PathBuf,

    /// Directory for CSV/JSON reports; `None` disables reports.
    /// Default: Some("reports")
    pub report_dir: Option<PathBuf>,

    pub cleaning: CleaningConfig,

    /// Fraction of rows held out for testing.
    /// Default: 0.2
    pub test_size: f64,

    /// Seed for the split, SMOTE and the random forest.
    /// Default: 42
    pub seed: u64,

    pub balance: BalanceConfig,

    /// Default: 5
    pub cv_folds: usize,

    pub forest_grid: ForestGrid,

    pub svm_grid: SvmGrid,

    /// Bins per histogram in the exploration report.
    /// Default: 20
    pub histogram_bins: usize,

    /// Length of the "top N" lists (skewness, correlations, importances).
    /// Default: 10
    pub top_n: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("sensor-data.csv"),
            model_path: PathBuf::from("best_model.bin"),
            report_dir: Some(PathBuf::from("reports")),
            cleaning: CleaningConfig::default(),
            test_size: 0.2,
            seed: 42,
            balance: BalanceConfig::default(),
            cv_folds: 5,
            forest_grid: ForestGrid::default(),
            svm_grid: SvmGrid::default(),
            histogram_bins: 20,
            top_n: 10,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {value} ({reason})")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Grid '{0}' has no candidates")]
    EmptyGrid(&'static str),

    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load a (possibly partial) JSON config and validate it.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "test_size",
                value: self.test_size.to_string(),
                reason: "must be between 0 and 1, exclusive",
            });
        }
        if !(self.balance.threshold > 0.0 && self.balance.threshold <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "balance.threshold",
                value: self.balance.threshold.to_string(),
                reason: "must be in (0, 1]",
            });
        }
        if self.balance.k_neighbors == 0 {
            return Err(ConfigError::InvalidValue {
                field: "balance.k_neighbors",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }
        if self.cv_folds < 2 {
            return Err(ConfigError::InvalidValue {
                field: "cv_folds",
                value: self.cv_folds.to_string(),
                reason: "must be at least 2",
            });
        }
        if self.histogram_bins == 0 {
            return Err(ConfigError::InvalidValue {
                field: "histogram_bins",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }
        if self.cleaning.label_column.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cleaning.label_column",
                value: String::new(),
                reason: "must not be empty",
            });
        }
        // SMOTE needs complete rows, so balancing before the split requires
        // the medians to be filled in during cleaning.
        if self.balance.enabled
            && self.balance.stage == BalanceStage::BeforeSplit
            && self.cleaning.impute_scope == ImputeScope::TrainPartition
        {
            return Err(ConfigError::InvalidValue {
                field: "cleaning.impute_scope",
                value: "train_partition".to_string(),
                reason: "requires balance.stage = train_partition",
            });
        }
        if self.forest_grid.is_empty() {
            return Err(ConfigError::EmptyGrid("forest_grid"));
        }
        if self.svm_grid.is_empty() {
            return Err(ConfigError::EmptyGrid("svm_grid"));
        }
        Ok(())
    }
}

/// Builder for [`PipelineConfig`]; unset fields keep their defaults.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Start from an existing configuration (e.g. one loaded from JSON).
    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input = path.into();
        self
    }

    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.model_path = path.into();
        self
    }

    /// `None` disables report files.
    pub fn report_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config.report_dir = dir;
        self
    }

    pub fn label_column(mut self, column: impl Into<String>) -> Self {
        self.config.cleaning.label_column = column.into();
        self
    }

    pub fn impute_scope(mut self, scope: ImputeScope) -> Self {
        self.config.cleaning.impute_scope = scope;
        self
    }

    pub fn test_size(mut self, test_size: f64) -> Self {
        self.config.test_size = test_size;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn balance_threshold(mut self, threshold: f64) -> Self {
        self.config.balance.threshold = threshold;
        self
    }

    pub fn balance_stage(mut self, stage: BalanceStage) -> Self {
        self.config.balance.stage = stage;
        self
    }

    pub fn balance_enabled(mut self, enabled: bool) -> Self {
        self.config.balance.enabled = enabled;
        self
    }

    pub fn cv_folds(mut self, folds: usize) -> Self {
        self.config.cv_folds = folds;
        self
    }

    pub fn forest_grid(mut self, grid: ForestGrid) -> Self {
        self.config.forest_grid = grid;
        self
    }

    pub fn svm_grid(mut self, grid: SvmGrid) -> Self {
        self.config.svm_grid = grid;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

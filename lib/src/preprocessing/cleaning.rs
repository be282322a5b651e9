//! Cleaning: raw table to a model-ready [`InMemoryDataset`].
//!
//! Steps, in order:
//! 1. locate and decode the label column
//! 2. record the missing-value report
//! 3. drop identifier columns, other text columns and all-missing columns
//! 4. drop columns whose observed values are all identical
//! 5. median-impute (unless deferred to the training partition)
//! 6. normalize the surviving column names

use crate::dataset::{ColumnValues, InMemoryDataset, RawColumn, RawTable};
use crate::error::PipelineError;
use crate::preprocessing::imputation::{FittedSimpleImputer, ImputeStrategy, SimpleImputer};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Where the median imputer is fitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeScope {
    /// Fit the medians on the whole dataset during cleaning.
    #[default]
    FullDataset,
    /// Keep missing cells through cleaning; the pipeline fits the imputer on
    /// the training partition after the split.
    TrainPartition,
}

/// How the label column was encoded in the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelEncoding {
    /// `-1` (pass) / `1` (fail); `-1` maps to class 0.
    MinusOnePlusOne,
    /// `0` / `1`, kept as is.
    ZeroOne,
}

impl LabelEncoding {
    /// The input value that class id `class` came from.
    pub fn decode(&self, class: usize) -> i64 {
        match (self, class) {
            (LabelEncoding::MinusOnePlusOne, 0) => -1,
            _ => class as i64,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub label_column: String,
    pub identifier_columns: Vec<String>,
    pub impute_scope: ImputeScope,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            label_column: "Pass/Fail".to_string(),
            identifier_columns: vec!["Time".to_string()],
            impute_scope: ImputeScope::default(),
        }
    }
}

/// One row of the missing-value report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MissingColumn {
    pub name: String,
    pub missing: usize,
    pub percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CleaningReport {
    pub n_rows: usize,
    pub n_input_columns: usize,
    /// Columns with at least one missing cell, most missing first.
    pub missing: Vec<MissingColumn>,
    pub dropped_identifiers: Vec<String>,
    pub dropped_text: Vec<String>,
    pub dropped_all_missing: Vec<String>,
    pub dropped_constant: Vec<String>,
    pub imputed_cells: usize,
    pub label_encoding: LabelEncoding,
}

impl CleaningReport {
    pub fn n_dropped(&self) -> usize {
        self.dropped_identifiers.len()
            + self.dropped_text.len()
            + self.dropped_all_missing.len()
            + self.dropped_constant.len()
    }
}

#[derive(Clone, Debug)]
pub struct CleanedDataset {
    pub dataset: InMemoryDataset,
    pub report: CleaningReport,
    /// The imputer fitted during cleaning; `None` when imputation is deferred.
    pub imputer: Option<FittedSimpleImputer>,
}

/// Trim a column name and replace every whitespace character with `_`.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

pub fn clean(table: RawTable, config: &CleaningConfig) -> Result<CleanedDataset, PipelineError> {
    let n_rows = table.n_rows();
    let n_input_columns = table.n_columns();
    let label_key = normalize_name(&config.label_column);
    let identifiers: Vec<String> = config
        .identifier_columns
        .iter()
        .map(|c| normalize_name(c))
        .collect();

    let mut columns = table.into_columns();
    let label_pos = columns
        .iter()
        .position(|c| normalize_name(&c.name) == label_key)
        .ok_or_else(|| {
            PipelineError::DataIntegrity(format!(
                "label column '{}' not found",
                config.label_column
            ))
        })?;
    let label_column = columns.remove(label_pos);
    let (labels, label_encoding) = decode_labels(&label_column)?;

    let missing = missing_report(&columns, n_rows);

    let mut dropped_identifiers = Vec::new();
    let mut dropped_text = Vec::new();
    let mut dropped_all_missing = Vec::new();
    let mut dropped_constant = Vec::new();
    let mut kept: Vec<(String, Vec<Option<f64>>)> = Vec::with_capacity(columns.len());

    for RawColumn { name, values } in columns {
        let key = normalize_name(&name);
        if identifiers.contains(&key) {
            debug!(column = %name, "dropping identifier column");
            dropped_identifiers.push(name);
            continue;
        }
        let values = match values {
            ColumnValues::Numeric(values) => values,
            ColumnValues::Text(_) => {
                warn!(column = %name, "dropping non-numeric column");
                dropped_text.push(name);
                continue;
            }
        };
        let observed: Vec<f64> = values.iter().flatten().copied().collect();
        match observed.first() {
            None => dropped_all_missing.push(name),
            Some(&first) if observed.iter().all(|&v| v == first) => dropped_constant.push(name),
            Some(_) => kept.push((key, values)),
        }
    }

    if kept.is_empty() {
        return Err(PipelineError::DataIntegrity(
            "no usable feature columns remain after cleaning".to_string(),
        ));
    }

    let feature_names: Vec<String> = kept.iter().map(|(name, _)| name.clone()).collect();
    let mut features = Array2::from_elem((n_rows, kept.len()), f64::NAN);
    for (j, (_, values)) in kept.iter().enumerate() {
        for (i, v) in values.iter().enumerate() {
            if let Some(v) = v {
                features[[i, j]] = *v;
            }
        }
    }

    let imputed_cells = features.iter().filter(|v| v.is_nan()).count();
    let imputer = match config.impute_scope {
        ImputeScope::FullDataset => {
            let fitted = SimpleImputer::new(ImputeStrategy::Median).fit(&features)?;
            features = fitted.transform(&features)?;
            Some(fitted)
        }
        ImputeScope::TrainPartition => None,
    };

    let dataset = InMemoryDataset::new(features, labels, feature_names)
        .map_err(PipelineError::DataIntegrity)?;

    let report = CleaningReport {
        n_rows,
        n_input_columns,
        missing,
        dropped_identifiers,
        dropped_text,
        dropped_all_missing,
        dropped_constant,
        imputed_cells: if imputer.is_some() { imputed_cells } else { 0 },
        label_encoding,
    };

    info!(
        rows = n_rows,
        features = dataset.n_features(),
        dropped = report.n_dropped(),
        imputed_cells = report.imputed_cells,
        "cleaned dataset"
    );

    Ok(CleanedDataset {
        dataset,
        report,
        imputer,
    })
}

fn decode_labels(
    column: &RawColumn,
) -> Result<(ndarray::Array1<usize>, LabelEncoding), PipelineError> {
    let values = match &column.values {
        ColumnValues::Numeric(values) => values,
        ColumnValues::Text(_) => {
            return Err(PipelineError::DataIntegrity(format!(
                "label column '{}' is not numeric",
                column.name
            )))
        }
    };

    let mut raw = Vec::with_capacity(values.len());
    for (row, value) in values.iter().enumerate() {
        let v = value.ok_or_else(|| {
            PipelineError::DataIntegrity(format!("label missing in row {}", row))
        })?;
        if v != -1.0 && v != 0.0 && v != 1.0 {
            return Err(PipelineError::DataIntegrity(format!(
                "label value {} in row {} is not binary",
                v, row
            )));
        }
        raw.push(v as i64);
    }

    let has = |target: i64| raw.iter().any(|&v| v == target);
    let encoding = match (has(-1), has(0), has(1)) {
        (true, false, true) => LabelEncoding::MinusOnePlusOne,
        (false, true, true) => LabelEncoding::ZeroOne,
        (true, true, _) => {
            return Err(PipelineError::DataIntegrity(
                "labels mix -1 and 0; expected {-1, 1} or {0, 1}".to_string(),
            ))
        }
        _ => {
            return Err(PipelineError::DataIntegrity(
                "label column has a single class".to_string(),
            ))
        }
    };

    let labels = raw.into_iter().map(|v| usize::from(v == 1)).collect();
    Ok((labels, encoding))
}

fn missing_report(columns: &[RawColumn], n_rows: usize) -> Vec<MissingColumn> {
    let mut report: Vec<MissingColumn> = columns
        .iter()
        .map(|c| (c, c.values.missing_count()))
        .filter(|(_, missing)| *missing > 0)
        .map(|(c, missing)| MissingColumn {
            name: c.name.clone(),
            missing,
            percent: 100.0 * missing as f64 / n_rows as f64,
        })
        .collect();
    report.sort_by(|a, b| b.missing.cmp(&a.missing));
    report
}

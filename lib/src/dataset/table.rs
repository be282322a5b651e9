//! Raw tabular data as read from disk, before any cleaning.

use serde::{Deserialize, Serialize};

/// Cells of one raw column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColumnValues {
    /// Every observed cell parsed as a number; `None` marks a missing cell.
    Numeric(Vec<Option<f64>>),
    /// At least one cell is not a number (timestamps, identifiers).
    Text(Vec<String>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(values) => values.len(),
            ColumnValues::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnValues::Numeric(_))
    }

    /// Number of missing cells. Text columns count empty strings.
    pub fn missing_count(&self) -> usize {
        match self {
            ColumnValues::Numeric(values) => values.iter().filter(|v| v.is_none()).count(),
            ColumnValues::Text(values) => values.iter().filter(|v| v.is_empty()).count(),
        }
    }
}

/// A named raw column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    pub values: ColumnValues,
}

impl RawColumn {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Text(values),
        }
    }
}

/// An ordered set of equally long columns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    columns: Vec<RawColumn>,
    n_rows: usize,
}

impl RawTable {
    /// Build a table, checking that all columns have the same length.
    pub fn new(columns: Vec<RawColumn>) -> Result<Self, String> {
        let n_rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.values.len() != n_rows) {
            return Err(format!(
                "column '{}' has {} rows, expected {}",
                bad.name,
                bad.values.len(),
                n_rows
            ));
        }
        Ok(Self { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[RawColumn] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<RawColumn> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_table_rejects_ragged_columns() {
        let columns = vec![
            RawColumn::numeric("a", vec![Some(1.0), Some(2.0)]),
            RawColumn::numeric("b", vec![Some(1.0)]),
        ];
        assert!(RawTable::new(columns).is_err());
    }

    #[test]
    fn test_raw_table_lookup_and_missing_count() {
        let table = RawTable::new(vec![
            RawColumn::text("Time", vec!["t0".into(), "t1".into()]),
            RawColumn::numeric("0", vec![None, Some(2.0)]),
        ])
        .unwrap();

        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.column_names(), vec!["Time", "0"]);
        assert_eq!(table.column("0").unwrap().values.missing_count(), 1);
        assert!(!table.column("Time").unwrap().values.is_numeric());
        assert!(table.column("missing").is_none());
    }
}

//! CSV ingestion into a [`RawTable`].
//!
//! The file has one header row. A column is numeric when every non-missing
//! cell parses as `f64`; otherwise it is kept as text (a timestamp column, for
//! example) and left for the cleaning stage to drop.

use crate::dataset::table::{RawColumn, RawTable};
use crate::error::PipelineError;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Cell spellings treated as missing, compared case-insensitively.
const MISSING_MARKERS: [&str; 4] = ["nan", "na", "null", "none"];

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || MISSING_MARKERS.iter().any(|m| cell.eq_ignore_ascii_case(m))
}

/// Load a delimited file from `path`.
///
/// # Errors
/// - [`PipelineError::Io`] if the file cannot be opened
/// - [`PipelineError::Csv`] on malformed rows
/// - [`PipelineError::DataIntegrity`] if the file has no data rows
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<RawTable, PipelineError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = read_csv(BufReader::new(file))?;
    info!(
        path = %path.display(),
        rows = table.n_rows(),
        columns = table.n_columns(),
        "loaded dataset"
    );
    Ok(table)
}

/// Parse CSV text from any reader.
pub fn read_csv<R: Read>(reader: R) -> Result<RawTable, PipelineError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(PipelineError::DataIntegrity(
            "input has no header row".to_string(),
        ));
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in rdr.records() {
        let record = record?;
        for (column, cell) in cells.iter_mut().zip(record.iter()) {
            column.push(cell.to_string());
        }
    }

    if cells[0].is_empty() {
        return Err(PipelineError::DataIntegrity(
            "empty dataset: no data rows after the header".to_string(),
        ));
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| parse_column(name, raw))
        .collect();

    RawTable::new(columns).map_err(PipelineError::DataIntegrity)
}

fn parse_column(name: String, raw: Vec<String>) -> RawColumn {
    let mut values = Vec::with_capacity(raw.len());
    for cell in &raw {
        if is_missing(cell) {
            values.push(None);
            continue;
        }
        match cell.parse::<f64>() {
            Ok(v) if v.is_finite() => values.push(Some(v)),
            _ => {
                debug!(column = %name, cell = %cell, "non-numeric cell, keeping column as text");
                return RawColumn::text(name, raw);
            }
        }
    }
    RawColumn::numeric(name, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::table::ColumnValues;

    const SAMPLE: &str = "\
Time,0,1,Pass/Fail
2008-07-19 11:55:00,3030.93,,-1
2008-07-19 12:32:00,3095.78,NaN,1
2008-07-19 13:17:00, 2932.61 ,7.5,-1
";

    #[test]
    fn test_read_csv_detects_column_kinds() {
        let table = read_csv(SAMPLE.as_bytes()).unwrap();

        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.column_names(), vec!["Time", "0", "1", "Pass/Fail"]);
        assert!(!table.column("Time").unwrap().values.is_numeric());
        assert_eq!(
            table.column("0").unwrap().values,
            ColumnValues::Numeric(vec![Some(3030.93), Some(3095.78), Some(2932.61)])
        );
        assert_eq!(
            table.column("1").unwrap().values,
            ColumnValues::Numeric(vec![None, None, Some(7.5)])
        );
    }

    #[test]
    fn test_read_csv_header_only_is_empty_dataset() {
        let err = read_csv("a,b,label\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrity(_)));
    }

    #[test]
    fn test_read_csv_ragged_rows_error() {
        let err = read_csv("a,b\n1,2\n3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Csv(_)));
    }

    #[test]
    fn test_load_csv_missing_file() {
        let err = load_csv("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn test_missing_markers() {
        assert!(is_missing(""));
        assert!(is_missing("NaN"));
        assert!(is_missing("NA"));
        assert!(!is_missing("0"));
    }
}

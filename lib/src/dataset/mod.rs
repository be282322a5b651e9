//! Dataset abstractions.
//!
//! - [`RawTable`]: named columns exactly as read from the input file, numeric
//!   cells possibly missing, text columns kept as strings.
//! - [`InMemoryDataset`]: the cleaned `(X, y)` pair: an `n_samples × n_features`
//!   matrix plus class-id labels and feature names.
//!
//! # Example
//!
//! ```no_run
//! use yieldsense::dataset::load_csv;
//!
//! let table = load_csv("sensor-data.csv").unwrap();
//! println!("{} rows, {} columns", table.n_rows(), table.n_columns());
//! ```

pub mod loader;
pub mod memory;
pub mod table;

pub use self::loader::{load_csv, read_csv};
pub use self::memory::{class_counts, InMemoryDataset};
pub use self::table::{ColumnValues, RawColumn, RawTable};

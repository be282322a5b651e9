//! Model evaluation.

pub mod metrics;

pub use metrics::{accuracy, confusion_matrix, AveragedMetrics, ClassMetrics, ClassificationReport};

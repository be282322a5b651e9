//! Hyperparameter search: grids, stratified k-fold and grid search.

pub mod cross_validation;
pub mod grid;
pub mod search;

pub use cross_validation::{cross_val_score, Fold, StratifiedKFold};
pub use grid::{ForestGrid, SvmGrid};
pub use search::{CandidateResult, GridSearch, SearchError, SearchOutcome};

//! Exhaustive grid search with cross-validation.

use crate::model::{Classifier, Hyperparameters, ModelError, ParamMap};
use crate::selection::cross_validation::{cross_val_score, StratifiedKFold};
use ndarray::{Array1, ArrayView2};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("grid search has no candidates")]
    EmptyGrid,
    #[error("invalid cross-validation setup: {0}")]
    InvalidFolds(String),
    #[error("all {0} candidates failed to fit")]
    NoViableCandidate(usize),
    #[error("refitting the best candidate failed: {0}")]
    Refit(#[source] ModelError),
}

/// Cross-validation result of one grid point.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CandidateResult {
    pub params: ParamMap,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
}

#[derive(Clone, Debug)]
pub struct SearchOutcome<F> {
    /// Position of the winner in grid order.
    pub best_index: usize,
    pub best_params: ParamMap,
    pub best_score: f64,
    /// The winning candidate refitted on all training rows.
    pub best_model: F,
    /// Successful candidates, in grid order.
    pub candidates: Vec<CandidateResult>,
    pub n_failed: usize,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GridSearch {
    pub cv: StratifiedKFold,
}

impl GridSearch {
    pub fn new(n_splits: usize) -> Self {
        Self {
            cv: StratifiedKFold::new(n_splits),
        }
    }

    /// Evaluate every candidate with stratified k-fold accuracy and refit the
    /// best one. Ties in mean score go to the earliest candidate.
    pub fn fit<C>(
        &self,
        candidates: &[C],
        x: ArrayView2<f64>,
        y: &Array1<usize>,
    ) -> Result<SearchOutcome<C::Fitted>, SearchError>
    where
        C: Classifier + Hyperparameters,
    {
        if candidates.is_empty() {
            return Err(SearchError::EmptyGrid);
        }
        let folds = self.cv.split(y)?;
        info!(
            candidates = candidates.len(),
            folds = folds.len(),
            "Fitting {} folds for each of {} candidates, totalling {} fits",
            folds.len(),
            candidates.len(),
            folds.len() * candidates.len()
        );

        let scores: Vec<Result<Vec<f64>, ModelError>> = candidates
            .par_iter()
            .map(|candidate| cross_val_score(candidate, x, y, &folds))
            .collect();

        let mut results = Vec::with_capacity(candidates.len());
        let mut best: Option<(usize, usize)> = None;
        let mut n_failed = 0;
        for (index, (candidate, outcome)) in candidates.iter().zip(scores).enumerate() {
            let params = candidate.hyperparameters();
            let fold_scores = match outcome {
                Ok(scores) => scores,
                Err(err) => {
                    warn!(params = ?params, error = %err, "candidate failed, skipping");
                    n_failed += 1;
                    continue;
                }
            };
            let (mean_score, std_score) = mean_std(&fold_scores);
            debug!(params = ?params, mean_score, std_score, "candidate scored");

            let better = best.map_or(true, |(_, r)| {
                let current: &CandidateResult = &results[r];
                mean_score > current.mean_score
            });
            if better {
                best = Some((index, results.len()));
            }
            results.push(CandidateResult {
                params,
                fold_scores,
                mean_score,
                std_score,
            });
        }

        let (best_index, best_result) =
            best.ok_or(SearchError::NoViableCandidate(candidates.len()))?;
        let best_model = candidates[best_index]
            .fit(x, y.view())
            .map_err(SearchError::Refit)?;
        let winner: &CandidateResult = &results[best_result];
        info!(
            best_params = ?winner.params,
            best_score = winner.mean_score,
            n_failed,
            "grid search finished"
        );

        Ok(SearchOutcome {
            best_index,
            best_params: winner.params.clone(),
            best_score: winner.mean_score,
            best_model,
            candidates: results,
            n_failed,
        })
    }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FittedClassifier, Gamma, Kernel, Svc};
    use crate::selection::SvmGrid;
    use ndarray::Array2;
    use serde_json::json;

    fn separable() -> (Array2<f64>, Array1<usize>) {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| {
            let offset = if i < 15 { 0.0 } else { 5.0 };
            offset + ((i * 7 + j * 3) % 5) as f64 * 0.3
        });
        let y = Array1::from_shape_fn(30, |i| usize::from(i >= 15));
        (x, y)
    }

    #[test]
    fn test_search_picks_and_refits_best() {
        let (x, y) = separable();
        let candidates = SvmGrid {
            c: vec![1.0],
            gamma: vec![Gamma::Scale],
            kernel: vec![Kernel::Linear, Kernel::Rbf],
        }
        .candidates(&Svc::default());

        let outcome = GridSearch::new(5).fit(&candidates, x.view(), &y).unwrap();
        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.n_failed, 0);
        assert_eq!(outcome.best_score, 1.0);
        // both are perfect, the earlier one wins
        assert_eq!(outcome.best_index, 0);
        assert_eq!(outcome.best_params["kernel"], json!("linear"));
        assert_eq!(outcome.best_model.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_failed_candidates_are_skipped() {
        let (x, y) = separable();
        let candidates = vec![
            Svc::new(-1.0, Kernel::Linear, Gamma::Scale),
            Svc::new(1.0, Kernel::Linear, Gamma::Scale),
        ];
        let outcome = GridSearch::new(3).fit(&candidates, x.view(), &y).unwrap();
        assert_eq!(outcome.n_failed, 1);
        assert_eq!(outcome.best_index, 1);
        assert_eq!(outcome.candidates.len(), 1);
    }

    #[test]
    fn test_all_candidates_failing() {
        let (x, y) = separable();
        let candidates = vec![Svc::new(0.0, Kernel::Rbf, Gamma::Auto)];
        assert!(matches!(
            GridSearch::new(3).fit(&candidates, x.view(), &y),
            Err(SearchError::NoViableCandidate(1))
        ));
    }

    #[test]
    fn test_empty_grid() {
        let (x, y) = separable();
        let candidates: Vec<Svc> = Vec::new();
        assert!(matches!(
            GridSearch::default().fit(&candidates, x.view(), &y),
            Err(SearchError::EmptyGrid)
        ));
    }

    #[test]
    fn test_mean_std() {
        let (mean, std) = mean_std(&[1.0, 0.5, 1.0, 0.5]);
        assert_eq!(mean, 0.75);
        assert_eq!(std, 0.25);
    }
}

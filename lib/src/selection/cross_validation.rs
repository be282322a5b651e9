//! Stratified k-fold cross-validation.

use crate::evaluation::accuracy;
use crate::model::{Classifier, FittedClassifier, ModelError};
use crate::selection::SearchError;
use ndarray::{Array1, ArrayView2, Axis};
use tracing::warn;

/// Unshuffled stratified k-fold.
///
/// Labels are sorted and dealt round-robin into `n_splits` folds to decide
/// how many samples of each class every fold receives; each class then fills
/// its folds in dataset order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StratifiedKFold {
    pub n_splits: usize,
}

/// `(train, test)` row indices of one fold.
pub type Fold = (Vec<usize>, Vec<usize>);

impl Default for StratifiedKFold {
    fn default() -> Self {
        Self { n_splits: 5 }
    }
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn split(&self, y: &Array1<usize>) -> Result<Vec<Fold>, SearchError> {
        let k = self.n_splits;
        let n = y.len();
        if k < 2 {
            return Err(SearchError::InvalidFolds(format!(
                "n_splits must be at least 2, got {}",
                k
            )));
        }
        if k > n {
            return Err(SearchError::InvalidFolds(format!(
                "cannot make {} folds from {} samples",
                k, n
            )));
        }

        // Encode classes by order of first appearance.
        let mut first_seen: Vec<usize> = Vec::new();
        let encoded: Vec<usize> = y
            .iter()
            .map(|label| match first_seen.iter().position(|c| c == label) {
                Some(pos) => pos,
                None => {
                    first_seen.push(*label);
                    first_seen.len() - 1
                }
            })
            .collect();
        let n_classes = first_seen.len();
        let mut counts = vec![0usize; n_classes];
        for &c in &encoded {
            counts[c] += 1;
        }
        if counts.iter().all(|&c| c < k) {
            return Err(SearchError::InvalidFolds(format!(
                "n_splits={} is greater than the number of members in every class",
                k
            )));
        }
        if let Some(&smallest) = counts.iter().min() {
            if smallest < k {
                warn!(
                    smallest_class = smallest,
                    n_splits = k,
                    "least populated class has fewer members than n_splits"
                );
            }
        }

        let mut sorted = encoded.clone();
        sorted.sort_unstable();
        let mut allocation = vec![vec![0usize; n_classes]; k];
        for (pos, &c) in sorted.iter().enumerate() {
            allocation[pos % k][c] += 1;
        }

        let mut test_fold = vec![0usize; n];
        for class in 0..n_classes {
            let folds_for_class =
                (0..k).flat_map(|fold| std::iter::repeat(fold).take(allocation[fold][class]));
            let members = (0..n).filter(|&i| encoded[i] == class);
            for (i, fold) in members.zip(folds_for_class) {
                test_fold[i] = fold;
            }
        }

        Ok((0..k)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..n).partition(|&i| test_fold[i] == fold);
                (train, test)
            })
            .collect())
    }
}

/// Accuracy of `model` on each fold, fitted on the remaining folds.
pub fn cross_val_score<C: Classifier>(
    model: &C,
    x: ArrayView2<f64>,
    y: &Array1<usize>,
    folds: &[Fold],
) -> Result<Vec<f64>, ModelError> {
    folds
        .iter()
        .map(|(train, test)| {
            let x_train = x.select(Axis(0), train);
            let y_train = y.select(Axis(0), train);
            let fitted = model.fit(x_train.view(), y_train.view())?;
            let x_test = x.select(Axis(0), test);
            let y_test = y.select(Axis(0), test);
            let predictions = fitted.predict(x_test.view())?;
            Ok(accuracy(&y_test, &predictions))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GaussianNb;
    use ndarray::Array2;

    #[test]
    fn test_folds_partition_samples() {
        let y = Array1::from(vec![0, 0, 0, 0, 0, 0, 1, 1, 1, 1]);
        let folds = StratifiedKFold::new(2).split(&y).unwrap();
        assert_eq!(folds.len(), 2);

        let mut seen = vec![0; y.len()];
        for (train, test) in &folds {
            assert_eq!(train.len() + test.len(), y.len());
            for &i in test {
                seen[i] += 1;
            }
            // each class is represented in every test fold
            assert!(test.iter().any(|&i| y[i] == 0));
            assert!(test.iter().any(|&i| y[i] == 1));
        }
        assert!(seen.iter().all(|&s| s == 1));
    }

    #[test]
    fn test_folds_fill_in_dataset_order() {
        let y = Array1::from(vec![1, 0, 1, 0, 1, 0]);
        let folds = StratifiedKFold::new(3).split(&y).unwrap();
        // Each class contributes its members to folds 0, 1, 2 in order.
        assert_eq!(folds[0].1, vec![0, 1]);
        assert_eq!(folds[1].1, vec![2, 3]);
        assert_eq!(folds[2].1, vec![4, 5]);
    }

    #[test]
    fn test_unbalanced_allocation_matches_round_robin() {
        // 7 zeros and 3 ones over 5 folds: zeros get 2,2,1,1,1 and ones 0,0,1,1,1.
        let y = Array1::from(vec![0, 0, 0, 0, 0, 0, 0, 1, 1, 1]);
        let folds = StratifiedKFold::new(5).split(&y).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|(_, test)| test.len()).collect();
        assert_eq!(sizes, vec![2, 2, 2, 2, 2]);
        assert_eq!(folds[0].1, vec![0, 1]);
        assert_eq!(folds[2].1, vec![4, 7]);
    }

    #[test]
    fn test_too_many_folds() {
        let y = Array1::from(vec![0, 0, 1, 1]);
        assert!(StratifiedKFold::new(3).split(&y).is_err());
        assert!(StratifiedKFold::new(1).split(&y).is_err());
        assert!(StratifiedKFold::new(5).split(&y).is_err());
    }

    #[test]
    fn test_cross_val_score_returns_one_score_per_fold() {
        let x = Array2::from_shape_fn((20, 1), |(i, _)| {
            if i < 10 {
                i as f64
            } else {
                100.0 + i as f64
            }
        });
        let y = Array1::from_shape_fn(20, |i| usize::from(i >= 10));
        let folds = StratifiedKFold::new(5).split(&y).unwrap();
        let scores = cross_val_score(&GaussianNb::new(), x.view(), &y, &folds).unwrap();
        assert_eq!(scores.len(), 5);
        assert!(scores.iter().all(|&s| s == 1.0));
    }
}

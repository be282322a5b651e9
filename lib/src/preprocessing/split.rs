//! Stratified train/test split.

use crate::preprocessing::error::PreprocessingError;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

/// Seeded, class-proportional train/test split.
///
/// `n_test = round(test_size * n)` is shared out across classes in
/// proportion to their size (floors first, then the largest remainders).
/// The same labels and seed always give the same indices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StratifiedSplit {
    pub test_size: f64,
    pub seed: u64,
}

impl Default for StratifiedSplit {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
        }
    }
}

/// Row indices of the two partitions. Disjoint, and together they cover
/// every row exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl StratifiedSplit {
    pub fn new(test_size: f64, seed: u64) -> Self {
        Self { test_size, seed }
    }

    pub fn split(&self, labels: &Array1<usize>) -> Result<SplitIndices, PreprocessingError> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PreprocessingError::InvalidParameter(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        let n = labels.len();
        let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (i, &label) in labels.iter().enumerate() {
            members[label].push(i);
        }
        members.retain(|m| !m.is_empty());

        if let Some(small) = members.iter().find(|m| m.len() < 2) {
            return Err(PreprocessingError::InvalidLabels(format!(
                "class of sample {} has a single member; stratified split needs at least 2",
                small[0]
            )));
        }

        let n_test = (self.test_size * n as f64).round() as usize;
        if n_test < members.len() || n - n_test < members.len() {
            return Err(PreprocessingError::InvalidParameter(format!(
                "test_size {} gives {} test and {} train samples for {} classes",
                self.test_size,
                n_test,
                n - n_test,
                members.len()
            )));
        }

        let allocation = allocate(&members, n, n_test);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut train = Vec::with_capacity(n - n_test);
        let mut test = Vec::with_capacity(n_test);
        for (mut indices, n_class_test) in members.into_iter().zip(allocation) {
            indices.shuffle(&mut rng);
            test.extend_from_slice(&indices[..n_class_test]);
            train.extend_from_slice(&indices[n_class_test..]);
        }
        train.shuffle(&mut rng);
        test.shuffle(&mut rng);

        debug!(train = train.len(), test = test.len(), seed = self.seed, "stratified split");
        Ok(SplitIndices { train, test })
    }
}

/// Per-class test counts summing to `n_test`, each class keeping at least
/// one training sample.
///
/// Callers guarantee `n_test <= n - members.len()`, so the capped classes can
/// always absorb the whole allocation.
fn allocate(members: &[Vec<usize>], n: usize, n_test: usize) -> Vec<usize> {
    let caps: Vec<usize> = members.iter().map(|m| m.len() - 1).collect();
    let ideal: Vec<f64> = members
        .iter()
        .map(|m| n_test as f64 * m.len() as f64 / n as f64)
        .collect();
    let mut counts: Vec<usize> = ideal
        .iter()
        .zip(&caps)
        .map(|(v, &cap)| (v.floor() as usize).min(cap))
        .collect();

    let mut order: Vec<usize> = (0..members.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = ideal[a] - ideal[a].floor();
        let rb = ideal[b] - ideal[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });

    // Largest remainders first; a class at its cap passes its turn on.
    let mut remaining = n_test.saturating_sub(counts.iter().sum());
    while remaining > 0 {
        let before = remaining;
        for &class in &order {
            if remaining == 0 {
                break;
            }
            if counts[class] < caps[class] {
                counts[class] += 1;
                remaining -= 1;
            }
        }
        if remaining == before {
            break;
        }
    }
    counts
}

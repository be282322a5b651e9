use ndarray::{Array1, Array2, Axis};

/// Feature matrix, class labels and feature names held in memory.
///
/// Labels are class ids (`0` = pass, `1` = fail after cleaning).
#[derive(Clone, Debug, PartialEq)]
pub struct InMemoryDataset {
    features: Array2<f64>,
    labels: Array1<usize>,
    feature_names: Vec<String>,
}

impl InMemoryDataset {
    pub fn new(
        features: Array2<f64>,
        labels: Array1<usize>,
        feature_names: Vec<String>,
    ) -> Result<Self, String> {
        if features.nrows() != labels.len() {
            return Err(format!(
                "features have {} rows but there are {} labels",
                features.nrows(),
                labels.len()
            ));
        }
        if features.ncols() != feature_names.len() {
            return Err(format!(
                "features have {} columns but there are {} names",
                features.ncols(),
                feature_names.len()
            ));
        }
        if labels.is_empty() {
            return Err("Dataset is empty".into());
        }
        Ok(Self {
            features,
            labels,
            feature_names,
        })
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &Array1<usize> {
        &self.labels
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn into_parts(self) -> (Array2<f64>, Array1<usize>, Vec<String>) {
        (self.features, self.labels, self.feature_names)
    }

    /// Per-class sample counts, indexed by class id.
    pub fn class_counts(&self) -> Vec<usize> {
        class_counts(&self.labels)
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
            feature_names: self.feature_names.clone(),
        }
    }
}

/// Per-class counts for labels `0..=max`.
pub fn class_counts(labels: &Array1<usize>) -> Vec<usize> {
    let n_classes = labels.iter().max().map(|&m| m + 1).unwrap_or(0);
    let mut counts = vec![0; n_classes];
    for &label in labels {
        counts[label] += 1;
    }
    counts
}

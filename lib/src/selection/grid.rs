//! Hyperparameter grids.
//!
//! Candidates are enumerated with parameter names in sorted order and the
//! last name varying fastest, so grid order is stable and documented.

use crate::model::{Gamma, Kernel, RandomForest, Svc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestGrid {
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_leaf: Vec<usize>,
    pub min_samples_split: Vec<usize>,
    pub n_estimators: Vec<usize>,
}

impl Default for ForestGrid {
    fn default() -> Self {
        Self {
            max_depth: vec![None, Some(10), Some(20)],
            min_samples_leaf: vec![1, 2, 4],
            min_samples_split: vec![2, 5, 10],
            n_estimators: vec![50, 100, 150],
        }
    }
}

impl ForestGrid {
    pub fn len(&self) -> usize {
        self.max_depth.len()
            * self.min_samples_leaf.len()
            * self.min_samples_split.len()
            * self.n_estimators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every combination, applied on top of `base` (seed, max_features...).
    pub fn candidates(&self, base: &RandomForest) -> Vec<RandomForest> {
        let mut out = Vec::with_capacity(self.len());
        for &max_depth in &self.max_depth {
            for &min_samples_leaf in &self.min_samples_leaf {
                for &min_samples_split in &self.min_samples_split {
                    for &n_estimators in &self.n_estimators {
                        out.push(RandomForest {
                            max_depth,
                            min_samples_leaf,
                            min_samples_split,
                            n_estimators,
                            ..base.clone()
                        });
                    }
                }
            }
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmGrid {
    #[serde(rename = "C")]
    pub c: Vec<f64>,
    pub gamma: Vec<Gamma>,
    pub kernel: Vec<Kernel>,
}

impl Default for SvmGrid {
    fn default() -> Self {
        Self {
            c: vec![0.1, 1.0, 10.0],
            gamma: vec![Gamma::Scale, Gamma::Auto],
            kernel: vec![Kernel::Linear, Kernel::Rbf],
        }
    }
}

impl SvmGrid {
    pub fn len(&self) -> usize {
        self.c.len() * self.gamma.len() * self.kernel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn candidates(&self, base: &Svc) -> Vec<Svc> {
        let mut out = Vec::with_capacity(self.len());
        for &c in &self.c {
            for &gamma in &self.gamma {
                for &kernel in &self.kernel {
                    out.push(Svc {
                        c,
                        gamma,
                        kernel,
                        ..base.clone()
                    });
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Hyperparameters;
    use serde_json::json;

    #[test]
    fn test_forest_grid_size_and_order() {
        let grid = ForestGrid::default();
        let candidates = grid.candidates(&RandomForest::default());
        assert_eq!(candidates.len(), 81);
        assert_eq!(grid.len(), 81);

        // last name (n_estimators) varies fastest
        assert_eq!(candidates[0].n_estimators, 50);
        assert_eq!(candidates[1].n_estimators, 100);
        assert_eq!(candidates[3].min_samples_split, 5);
        assert_eq!(candidates[80].max_depth, Some(20));
        assert!(candidates.iter().all(|c| c.seed == 42));
    }

    #[test]
    fn test_svm_grid_order() {
        let candidates = SvmGrid::default().candidates(&Svc::default());
        assert_eq!(candidates.len(), 12);
        let first = candidates[0].hyperparameters();
        assert_eq!(first["C"], json!(0.1));
        assert_eq!(first["gamma"], json!("scale"));
        assert_eq!(first["kernel"], json!("linear"));
        assert_eq!(candidates[1].kernel, Kernel::Rbf);
        assert_eq!(candidates[2].gamma, Gamma::Auto);
    }

    #[test]
    fn test_grid_from_json() {
        let grid: SvmGrid = serde_json::from_str(r#"{"C": [2.0], "kernel": ["rbf"]}"#).unwrap();
        assert_eq!(grid.c, vec![2.0]);
        assert_eq!(grid.kernel, vec![Kernel::Rbf]);
        assert_eq!(grid.gamma, vec![Gamma::Scale, Gamma::Auto]);
        assert_eq!(grid.len(), 2);
    }
}

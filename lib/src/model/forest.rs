//! Random forest classifier.
//!
//! Each tree is grown on a bootstrap sample with `sqrt(n_features)` features
//! tried per split. Tree `i` draws from its own `StdRng` seeded with
//! `seed + i`, so the fitted forest does not depend on how rayon schedules the
//! trees. Prediction averages the leaf class distributions (soft voting).

use crate::model::tree::{
    normalized, DecisionTree, DecisionTreeParams, FittedDecisionTree, MaxFeatures,
};
use crate::model::{
    argmax, validate_training, Classifier, FittedClassifier, Hyperparameters, ModelError, ParamMap,
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

#[derive(Clone, Debug, PartialEq)]
pub struct RandomForest {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl RandomForest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn tree(&self) -> DecisionTree {
        DecisionTree {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
            seed: self.seed,
        }
    }
}

impl Hyperparameters for RandomForest {
    fn hyperparameters(&self) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert("max_depth".into(), json!(self.max_depth));
        params.insert("min_samples_leaf".into(), json!(self.min_samples_leaf));
        params.insert("min_samples_split".into(), json!(self.min_samples_split));
        params.insert("n_estimators".into(), json!(self.n_estimators));
        params
    }
}

impl Classifier for RandomForest {
    type Fitted = FittedRandomForest;

    fn fit(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView1<usize>,
    ) -> Result<FittedRandomForest, ModelError> {
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParameter(
                "n_estimators must be >= 1".to_string(),
            ));
        }
        let tree = self.tree();
        tree.validate()?;
        let n_classes = validate_training(x, y)?;
        let n = x.nrows();

        let trees: Vec<FittedDecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(i as u64));
                let indices = if self.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                tree.grow(x, y, indices, n_classes, &mut rng)
            })
            .collect();

        let importances = forest_importances(&trees, x.ncols());
        debug!(
            n_estimators = self.n_estimators,
            max_depth = ?self.max_depth,
            "fitted random forest"
        );
        Ok(FittedRandomForest {
            trees,
            n_features: x.ncols(),
            n_classes,
            importances,
        })
    }
}

/// Per-tree normalized importances, averaged over the forest and
/// normalized again.
fn forest_importances(trees: &[FittedDecisionTree], n_features: usize) -> Vec<f64> {
    let mut total = vec![0.0; n_features];
    for tree in trees {
        for (acc, v) in total.iter_mut().zip(normalized(tree.impurity_decrease())) {
            *acc += v;
        }
    }
    normalized(&total)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomForestParams {
    pub trees: Vec<DecisionTreeParams>,
    pub n_features: usize,
    pub n_classes: usize,
    pub importances: Vec<f64>,
}

#[derive(Clone, Debug)]
pub struct FittedRandomForest {
    trees: Vec<FittedDecisionTree>,
    n_features: usize,
    n_classes: usize,
    importances: Vec<f64>,
}

impl FittedRandomForest {
    /// Mean class probabilities over all trees.
    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, ModelError> {
        self.check_features(x)?;
        let mut sum = Array2::zeros((x.nrows(), self.n_classes));
        for tree in &self.trees {
            sum += &tree.predict_proba(x)?;
        }
        Ok(sum / self.trees.len() as f64)
    }

    /// Mean-decrease-in-impurity importance per feature, summing to 1.
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl FittedClassifier for FittedRandomForest {
    type Params = RandomForestParams;

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>, ModelError> {
        let proba = self.predict_proba(x)?;
        Ok(proba.rows().into_iter().map(argmax).collect())
    }

    fn n_features_in(&self) -> usize {
        self.n_features
    }

    fn extract_params(&self) -> RandomForestParams {
        RandomForestParams {
            trees: self.trees.iter().map(|t| t.extract_params()).collect(),
            n_features: self.n_features,
            n_classes: self.n_classes,
            importances: self.importances.clone(),
        }
    }

    fn from_params(params: RandomForestParams) -> Result<Self, ModelError> {
        if params.trees.is_empty() {
            return Err(ModelError::InvalidParams("forest has no trees".to_string()));
        }
        let trees = params
            .trees
            .into_iter()
            .map(FittedDecisionTree::from_params)
            .collect::<Result<Vec<_>, _>>()?;
        if trees
            .iter()
            .any(|t| t.n_features_in() != params.n_features || t.n_classes() != params.n_classes)
        {
            return Err(ModelError::InvalidParams(
                "tree shape differs from the forest".to_string(),
            ));
        }
        if params.importances.len() != params.n_features {
            return Err(ModelError::InvalidParams(
                "importances length differs from n_features".to_string(),
            ));
        }
        Ok(Self {
            trees,
            n_features: params.n_features,
            n_classes: params.n_classes,
            importances: params.importances,
        })
    }
}

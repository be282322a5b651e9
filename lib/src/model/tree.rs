//! CART decision tree for classification (Gini impurity).
//!
//! Nodes are stored flat in a `Vec`; a split sends `x[feature] <= threshold`
//! left. Leaves keep the class distribution of their training samples, which
//! the forest averages for soft voting.

use crate::model::{argmax, validate_training, Classifier, FittedClassifier, ModelError};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Number of features examined at each split.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxFeatures {
    All,
    /// `max(1, floor(sqrt(n_features)))`
    #[default]
    Sqrt,
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => ((n_features as f64).sqrt() as usize).max(1),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        /// Class frequencies of the training samples that reached this leaf.
        proba: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecisionTree {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub seed: u64,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            seed: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeParams {
    pub nodes: Vec<Node>,
    pub n_features: usize,
    pub n_classes: usize,
    /// Total weighted impurity decrease per feature (not normalized).
    pub impurity_decrease: Vec<f64>,
}

#[derive(Clone, Debug)]
pub struct FittedDecisionTree {
    nodes: Vec<Node>,
    n_features: usize,
    n_classes: usize,
    impurity_decrease: Vec<f64>,
}

const IMPURITY_EPSILON: f64 = 1e-12;

impl DecisionTree {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.min_samples_split < 2 {
            return Err(ModelError::InvalidParameter(format!(
                "min_samples_split must be >= 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf < 1 {
            return Err(ModelError::InvalidParameter(
                "min_samples_leaf must be >= 1".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(ModelError::InvalidParameter(
                "max_depth must be >= 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Grow a tree on the rows listed in `indices` (duplicates allowed, as in
    /// a bootstrap sample). `rng` drives feature subsampling.
    pub(crate) fn grow(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView1<usize>,
        indices: Vec<usize>,
        n_classes: usize,
        rng: &mut StdRng,
    ) -> FittedDecisionTree {
        let n_features = x.ncols();
        let mut builder = Builder {
            x: x.view(),
            y: y.view(),
            n_classes,
            params: self,
            max_features: self.max_features.resolve(n_features),
            nodes: vec![Node::Leaf { proba: Vec::new() }],
            impurity_decrease: vec![0.0; n_features],
        };

        let mut stack = vec![(0usize, indices, 0usize)];
        while let Some((id, idx, depth)) = stack.pop() {
            if let Some((left, right)) = builder.expand(id, &idx, depth, rng) {
                stack.push((right.0, right.1, depth + 1));
                stack.push((left.0, left.1, depth + 1));
            }
        }

        FittedDecisionTree {
            nodes: builder.nodes,
            n_features,
            n_classes,
            impurity_decrease: builder.impurity_decrease,
        }
    }
}

impl Classifier for DecisionTree {
    type Fitted = FittedDecisionTree;

    fn fit(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView1<usize>,
    ) -> Result<FittedDecisionTree, ModelError> {
        self.validate()?;
        let n_classes = validate_training(x, y)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        Ok(self.grow(x, y, (0..x.nrows()).collect(), n_classes, &mut rng))
    }
}

struct Builder<'a> {
    x: ArrayView2<'a, f64>,
    y: ArrayView1<'a, usize>,
    n_classes: usize,
    params: &'a DecisionTree,
    max_features: usize,
    nodes: Vec<Node>,
    impurity_decrease: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    child_impurity: f64,
}

type Child = (usize, Vec<usize>);

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

impl Builder<'_> {
    /// Turn node `id` into a split or a leaf. Returns the children to grow.
    fn expand(
        &mut self,
        id: usize,
        idx: &[usize],
        depth: usize,
        rng: &mut StdRng,
    ) -> Option<(Child, Child)> {
        let n = idx.len();
        let mut counts = vec![0usize; self.n_classes];
        for &i in idx {
            counts[self.y[i]] += 1;
        }
        let impurity = gini(&counts, n);

        let p = self.params;
        let stop = p.max_depth.is_some_and(|d| depth >= d)
            || n < p.min_samples_split
            || n < 2 * p.min_samples_leaf
            || impurity <= IMPURITY_EPSILON;

        let split = if stop {
            None
        } else {
            self.best_split(idx, &counts, rng)
        };

        let Some(split) = split else {
            let proba = counts.iter().map(|&c| c as f64 / n as f64).collect();
            self.nodes[id] = Node::Leaf { proba };
            return None;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = idx
            .iter()
            .partition(|&&i| self.x[[i, split.feature]] <= split.threshold);

        self.impurity_decrease[split.feature] += n as f64 * impurity - split.child_impurity;

        let left = self.nodes.len();
        let right = left + 1;
        self.nodes.push(Node::Leaf { proba: Vec::new() });
        self.nodes.push(Node::Leaf { proba: Vec::new() });
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        Some(((left, left_idx), (right, right_idx)))
    }

    /// Lowest weighted child impurity over a random subset of features.
    /// Constant features do not count towards `max_features`.
    fn best_split(&self, idx: &[usize], counts: &[usize], rng: &mut StdRng) -> Option<BestSplit> {
        let n = idx.len();
        let min_leaf = self.params.min_samples_leaf;
        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(rng);

        let mut best: Option<BestSplit> = None;
        let mut visited = 0;
        let mut column: Vec<(f64, usize)> = Vec::with_capacity(n);

        for feature in features {
            if visited >= self.max_features {
                break;
            }
            column.clear();
            column.extend(idx.iter().map(|&i| (self.x[[i, feature]], self.y[i])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));
            if column[0].0 >= column[n - 1].0 {
                continue;
            }
            visited += 1;

            let mut left = vec![0usize; self.n_classes];
            let mut right = counts.to_vec();
            for pos in 0..n - 1 {
                let class = column[pos].1;
                left[class] += 1;
                right[class] -= 1;

                let n_left = pos + 1;
                let n_right = n - n_left;
                if column[pos + 1].0 <= column[pos].0 || n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let child =
                    n_left as f64 * gini(&left, n_left) + n_right as f64 * gini(&right, n_right);
                if best.as_ref().map_or(true, |b| child < b.child_impurity) {
                    let (lo, hi) = (column[pos].0, column[pos + 1].0);
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        child_impurity: child,
                    });
                }
            }
        }
        best
    }
}

impl FittedDecisionTree {
    fn leaf(&self, row: ArrayView1<f64>) -> &[f64] {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { proba } => return proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Class probabilities, `n_samples × n_classes`.
    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, ModelError> {
        self.check_features(x)?;
        let mut out = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            for (c, &p) in self.leaf(row).iter().enumerate() {
                out[[i, c]] = p;
            }
        }
        Ok(out)
    }

    pub(crate) fn impurity_decrease(&self) -> &[f64] {
        &self.impurity_decrease
    }

    /// Impurity-based importances, normalized to sum to 1 (all zero for a
    /// single-leaf tree).
    pub fn feature_importances(&self) -> Vec<f64> {
        normalized(&self.impurity_decrease)
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Node::Split { left, right, .. } = &self.nodes[id] {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        max_depth
    }
}

pub(crate) fn normalized(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter().map(|v| v / total).collect()
    } else {
        vec![0.0; values.len()]
    }
}

impl FittedClassifier for FittedDecisionTree {
    type Params = DecisionTreeParams;

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>, ModelError> {
        let proba = self.predict_proba(x)?;
        Ok(proba.rows().into_iter().map(argmax).collect())
    }

    fn n_features_in(&self) -> usize {
        self.n_features
    }

    fn extract_params(&self) -> DecisionTreeParams {
        DecisionTreeParams {
            nodes: self.nodes.clone(),
            n_features: self.n_features,
            n_classes: self.n_classes,
            impurity_decrease: self.impurity_decrease.clone(),
        }
    }

    fn from_params(params: DecisionTreeParams) -> Result<Self, ModelError> {
        if params.nodes.is_empty() {
            return Err(ModelError::InvalidParams("tree has no nodes".to_string()));
        }
        let n_nodes = params.nodes.len();
        for (id, node) in params.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= params.n_features || *left >= n_nodes || *right >= n_nodes {
                        return Err(ModelError::InvalidParams(
                            "split refers to a missing feature or node".to_string(),
                        ));
                    }
                    // Children always follow their parent, so traversal terminates.
                    if *left <= id || *right <= id {
                        return Err(ModelError::InvalidParams(format!(
                            "node {} has a child that does not come after it",
                            id
                        )));
                    }
                }
                Node::Leaf { proba } => {
                    if proba.len() != params.n_classes {
                        return Err(ModelError::InvalidParams(format!(
                            "leaf has {} probabilities for {} classes",
                            proba.len(),
                            params.n_classes
                        )));
                    }
                }
            }
        }
        if params.impurity_decrease.len() != params.n_features {
            return Err(ModelError::InvalidParams(
                "impurity_decrease length differs from n_features".to_string(),
            ));
        }
        Ok(Self {
            nodes: params.nodes,
            n_features: params.n_features,
            n_classes: params.n_classes,
            impurity_decrease: params.impurity_decrease,
        })
    }
}

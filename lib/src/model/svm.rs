//! Binary soft-margin support vector classifier.
//!
//! The dual problem
//!
//! ```text
//! min  ½ αᵀQα − eᵀα    s.t.  0 ≤ αᵢ ≤ C,  yᵀα = 0,   Qᵢⱼ = yᵢ yⱼ K(xᵢ, xⱼ)
//! ```
//!
//! is solved by sequential minimal optimization: each step picks the maximal
//! violating pair, solves the two-variable subproblem analytically and clips
//! it to the box. Class 1 is the positive side; `f(x) > 0` predicts 1.

use crate::model::{
    validate_training, Classifier, FittedClassifier, Hyperparameters, ModelError, ParamMap,
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kernel {
    Linear,
    Rbf,
}

impl Kernel {
    pub fn name(&self) -> &'static str {
        match self {
            Kernel::Linear => "linear",
            Kernel::Rbf => "rbf",
        }
    }
}

/// RBF kernel width.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gamma {
    /// `1 / (n_features * X.var())`
    Scale,
    /// `1 / n_features`
    Auto,
    Value(f64),
}

impl Gamma {
    pub fn resolve(&self, x: ArrayView2<f64>) -> f64 {
        let p = x.ncols() as f64;
        match self {
            Gamma::Scale => {
                let var = x.var(0.0);
                if var > 0.0 {
                    1.0 / (p * var)
                } else {
                    1.0
                }
            }
            Gamma::Auto => 1.0 / p,
            Gamma::Value(g) => *g,
        }
    }

    fn to_json(self) -> serde_json::Value {
        match self {
            Gamma::Scale => json!("scale"),
            Gamma::Auto => json!("auto"),
            Gamma::Value(g) => json!(g),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Svc {
    pub c: f64,
    pub kernel: Kernel,
    pub gamma: Gamma,
    /// Stopping tolerance on the maximal KKT violation.
    pub tol: f64,
}

impl Default for Svc {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: Kernel::Rbf,
            gamma: Gamma::Scale,
            tol: 1e-3,
        }
    }
}

impl Svc {
    pub fn new(c: f64, kernel: Kernel, gamma: Gamma) -> Self {
        Self {
            c,
            kernel,
            gamma,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(ModelError::InvalidParameter(format!(
                "C must be positive, got {}",
                self.c
            )));
        }
        if let Gamma::Value(g) = self.gamma {
            if !(g.is_finite() && g > 0.0) {
                return Err(ModelError::InvalidParameter(format!(
                    "gamma must be positive, got {}",
                    g
                )));
            }
        }
        if !(self.tol > 0.0) {
            return Err(ModelError::InvalidParameter(
                "tol must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Hyperparameters for Svc {
    fn hyperparameters(&self) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert("C".into(), json!(self.c));
        params.insert("gamma".into(), self.gamma.to_json());
        params.insert("kernel".into(), json!(self.kernel.name()));
        params
    }
}

/// `K(a_i, b_j)` for every pair of rows.
fn kernel_matrix(
    a: ArrayView2<f64>,
    b: ArrayView2<f64>,
    kernel: Kernel,
    gamma: f64,
) -> Array2<f64> {
    let mut gram = a.dot(&b.t());
    if kernel == Kernel::Rbf {
        let a_sq: Vec<f64> = a.rows().into_iter().map(|r| r.dot(&r)).collect();
        let b_sq: Vec<f64> = b.rows().into_iter().map(|r| r.dot(&r)).collect();
        for (mut row, &na) in gram.rows_mut().into_iter().zip(&a_sq) {
            for (k, &nb) in row.iter_mut().zip(&b_sq) {
                let dist = (na + nb - 2.0 * *k).max(0.0);
                *k = (-gamma * dist).exp();
            }
        }
    }
    gram
}

const TAU: f64 = 1e-12;

struct Solution {
    alpha: Vec<f64>,
    rho: f64,
    iterations: usize,
}

/// SMO with maximal-violating-pair selection.
fn solve(k: &Array2<f64>, y: &[f64], c: f64, tol: f64) -> Solution {
    let n = y.len();
    let max_iter = (100 * n).max(10_000_000);
    let mut alpha = vec![0.0; n];
    let mut grad = vec![-1.0; n];
    let q = |i: usize, j: usize| y[i] * y[j] * k[[i, j]];

    let mut iterations = 0;
    while iterations < max_iter {
        let mut g_max = f64::NEG_INFINITY;
        let mut g_min = f64::INFINITY;
        let mut i_up = usize::MAX;
        let mut j_low = usize::MAX;
        for t in 0..n {
            let v = -y[t] * grad[t];
            let up = (y[t] > 0.0 && alpha[t] < c) || (y[t] < 0.0 && alpha[t] > 0.0);
            let low = (y[t] > 0.0 && alpha[t] > 0.0) || (y[t] < 0.0 && alpha[t] < c);
            if up && v > g_max {
                g_max = v;
                i_up = t;
            }
            if low && v < g_min {
                g_min = v;
                j_low = t;
            }
        }
        if i_up == usize::MAX || j_low == usize::MAX || g_max - g_min < tol {
            break;
        }
        iterations += 1;

        let (i, j) = (i_up, j_low);
        let (old_i, old_j) = (alpha[i], alpha[j]);
        if y[i] != y[j] {
            let mut quad = k[[i, i]] + k[[j, j]] + 2.0 * q(i, j);
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (-grad[i] - grad[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;
            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > 0.0 {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = c - diff;
                }
            } else if alpha[j] > c {
                alpha[j] = c;
                alpha[i] = c + diff;
            }
        } else {
            let mut quad = k[[i, i]] + k[[j, j]] - 2.0 * q(i, j);
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (grad[i] - grad[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;
            if sum > c {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = sum - c;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c {
                if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = sum - c;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }

        let (d_i, d_j) = (alpha[i] - old_i, alpha[j] - old_j);
        for t in 0..n {
            grad[t] += q(i, t) * d_i + q(j, t) * d_j;
        }
    }

    if iterations >= max_iter {
        warn!(iterations, "SMO reached the iteration limit before converging");
    }

    Solution {
        rho: compute_rho(&alpha, &grad, y, c),
        alpha,
        iterations,
    }
}

fn compute_rho(alpha: &[f64], grad: &[f64], y: &[f64], c: f64) -> f64 {
    let mut upper = f64::INFINITY;
    let mut lower = f64::NEG_INFINITY;
    let mut n_free = 0usize;
    let mut sum_free = 0.0;
    for t in 0..y.len() {
        let yg = y[t] * grad[t];
        if alpha[t] >= c {
            if y[t] < 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else if alpha[t] <= 0.0 {
            if y[t] > 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else {
            n_free += 1;
            sum_free += yg;
        }
    }
    if n_free > 0 {
        sum_free / n_free as f64
    } else {
        (upper + lower) / 2.0
    }
}

impl Classifier for Svc {
    type Fitted = FittedSvc;

    fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<FittedSvc, ModelError> {
        self.validate()?;
        let n_classes = validate_training(x, y)?;
        if n_classes > 2 {
            return Err(ModelError::InvalidLabels(format!(
                "SVC is binary, got {} classes",
                n_classes
            )));
        }
        if !y.iter().any(|&c| c == 0) || !y.iter().any(|&c| c == 1) {
            return Err(ModelError::InvalidLabels(
                "SVC needs samples of both classes".to_string(),
            ));
        }

        let gamma = self.gamma.resolve(x);
        let signs: Vec<f64> = y.iter().map(|&c| if c == 1 { 1.0 } else { -1.0 }).collect();
        let k = kernel_matrix(x, x, self.kernel, gamma);
        let solution = solve(&k, &signs, self.c, self.tol);

        let support: Vec<usize> = (0..signs.len())
            .filter(|&t| solution.alpha[t] > 0.0)
            .collect();
        let dual_coef: Vec<f64> = support
            .iter()
            .map(|&t| solution.alpha[t] * signs[t])
            .collect();
        let support_vectors = x.select(Axis(0), &support);

        debug!(
            c = self.c,
            kernel = self.kernel.name(),
            gamma,
            iterations = solution.iterations,
            n_support = support.len(),
            "fitted SVC"
        );
        Ok(FittedSvc {
            kernel: self.kernel,
            gamma,
            support_vectors,
            dual_coef: Array1::from(dual_coef),
            rho: solution.rho,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SvcParams {
    pub kernel: Kernel,
    pub gamma: f64,
    pub n_features: usize,
    /// Row-major `n_support × n_features`.
    pub support_vectors: Vec<f64>,
    /// `alpha_i * y_i` for each support vector.
    pub dual_coef: Vec<f64>,
    pub rho: f64,
}

#[derive(Clone, Debug)]
pub struct FittedSvc {
    kernel: Kernel,
    gamma: f64,
    support_vectors: Array2<f64>,
    dual_coef: Array1<f64>,
    rho: f64,
}

impl FittedSvc {
    /// Signed distance-like score; positive means class 1.
    pub fn decision_function(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        self.check_features(x)?;
        let k = kernel_matrix(x, self.support_vectors.view(), self.kernel, self.gamma);
        Ok(k.dot(&self.dual_coef) - self.rho)
    }

    pub fn n_support(&self) -> usize {
        self.support_vectors.nrows()
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl FittedClassifier for FittedSvc {
    type Params = SvcParams;

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>, ModelError> {
        Ok(self
            .decision_function(x)?
            .mapv(|f| usize::from(f > 0.0)))
    }

    fn n_features_in(&self) -> usize {
        self.support_vectors.ncols()
    }

    fn extract_params(&self) -> SvcParams {
        SvcParams {
            kernel: self.kernel,
            gamma: self.gamma,
            n_features: self.support_vectors.ncols(),
            support_vectors: self.support_vectors.iter().copied().collect(),
            dual_coef: self.dual_coef.to_vec(),
            rho: self.rho,
        }
    }

    fn from_params(params: SvcParams) -> Result<Self, ModelError> {
        let n_support = params.dual_coef.len();
        let support_vectors =
            Array2::from_shape_vec((n_support, params.n_features), params.support_vectors)
                .map_err(|e| ModelError::InvalidParams(e.to_string()))?;
        Ok(Self {
            kernel: params.kernel,
            gamma: params.gamma,
            support_vectors,
            dual_coef: Array1::from(params.dual_coef),
            rho: params.rho,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_linear_svc_separates() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [3.0, 3.0], [3.0, 4.0], [4.0, 3.0]];
        let y = array![0, 0, 0, 1, 1, 1];
        let svc = Svc::new(10.0, Kernel::Linear, Gamma::Scale)
            .fit(x.view(), y.view())
            .unwrap();
        assert_eq!(svc.predict(x.view()).unwrap(), y);

        let scores = svc.decision_function(array![[-5.0, -5.0], [8.0, 8.0]].view()).unwrap();
        assert!(scores[0] < 0.0 && scores[1] > 0.0);
    }

    #[test]
    fn test_rbf_svc_learns_ring() {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..16 {
            let angle = i as f64 * std::f64::consts::PI / 8.0;
            rows.extend_from_slice(&[0.3 * angle.cos(), 0.3 * angle.sin()]);
            labels.push(0);
            rows.extend_from_slice(&[2.0 * angle.cos(), 2.0 * angle.sin()]);
            labels.push(1);
        }
        let x = Array2::from_shape_vec((32, 2), rows).unwrap();
        let y = Array1::from(labels);
        let svc = Svc::new(10.0, Kernel::Rbf, Gamma::Scale)
            .fit(x.view(), y.view())
            .unwrap();
        assert_eq!(svc.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_dual_constraints_hold() {
        let x = array![[0.0], [1.0], [2.0], [2.5], [3.0], [4.0]];
        let y = array![0, 0, 1, 0, 1, 1];
        let c = 1.0;
        let svc = Svc::new(c, Kernel::Linear, Gamma::Auto)
            .fit(x.view(), y.view())
            .unwrap();
        // sum(alpha_i * y_i) == 0 and |alpha_i| <= C
        assert!(svc.dual_coef.sum().abs() < 1e-9);
        assert!(svc.dual_coef.iter().all(|a| a.abs() <= c + 1e-12));
    }

    #[test]
    fn test_gamma_resolution() {
        let x = array![[1.0, 3.0], [3.0, 1.0]];
        // all-element variance is 1
        assert!((Gamma::Scale.resolve(x.view()) - 0.5).abs() < 1e-12);
        assert_eq!(Gamma::Auto.resolve(x.view()), 0.5);
        let flat = array![[2.0, 2.0], [2.0, 2.0]];
        assert_eq!(Gamma::Scale.resolve(flat.view()), 1.0);
    }

    #[test]
    fn test_invalid_c_and_labels() {
        let x = array![[0.0], [1.0]];
        let y = array![0, 1];
        assert!(matches!(
            Svc::new(0.0, Kernel::Linear, Gamma::Scale).fit(x.view(), y.view()),
            Err(ModelError::InvalidParameter(_))
        ));
        assert!(matches!(
            Svc::new(1.0, Kernel::Rbf, Gamma::Value(-1.0)).fit(x.view(), y.view()),
            Err(ModelError::InvalidParameter(_))
        ));
        assert!(matches!(
            Svc::default().fit(x.view(), array![1, 1].view()),
            Err(ModelError::InvalidLabels(_))
        ));
    }

    #[test]
    fn test_hyperparameter_names() {
        let params = Svc::new(0.1, Kernel::Linear, Gamma::Auto).hyperparameters();
        let names: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["C", "gamma", "kernel"]);
        assert_eq!(params["gamma"], json!("auto"));
        assert_eq!(params["kernel"], json!("linear"));
    }

    #[test]
    fn test_params_roundtrip() {
        let x = array![[0.0, 1.0], [1.0, 1.0], [3.0, 0.0], [4.0, 1.0]];
        let y = array![0, 0, 1, 1];
        let svc = Svc::default().fit(x.view(), y.view()).unwrap();
        let restored = FittedSvc::from_params(svc.extract_params()).unwrap();
        assert_eq!(
            restored.decision_function(x.view()).unwrap(),
            svc.decision_function(x.view()).unwrap()
        );
    }
}

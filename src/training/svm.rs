//! Epsilon-insensitive support vector regression
//!
//! Solved in the dual by coordinate descent. The bias is folded into the
//! kernel (`K(x, y) + 1`), so each dual coefficient is updated on its own
//! inside the box `[-C, C]`.

use super::regressor::impl_regressor;
use crate::error::{Result, TournamentError};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum number of samples for eager kernel matrix computation
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Kernel function type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// K(x, y) = x · y
    Linear,
    /// K(x, y) = exp(-γ ||x - y||²). Without an explicit γ the fit uses
    /// `1 / (n_features * Var(X))`.
    Rbf { gamma: Option<f64> },
}

impl KernelType {
    fn eval(self, gamma: f64, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self {
            KernelType::Linear => a.dot(&b),
            KernelType::Rbf { .. } => {
                let norm_sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
                (-gamma * norm_sq).exp()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvrConfig {
    pub kernel: KernelType,
    /// Box constraint on the dual coefficients
    pub c: f64,
    /// Half-width of the insensitive tube
    pub epsilon: f64,
    /// Stop once no coefficient moves more than this in an epoch
    pub tol: f64,
    pub max_iter: usize,
    /// Seeds the per-epoch visiting order
    pub random_state: u64,
}

impl Default for SvrConfig {
    fn default() -> Self {
        Self {
            kernel: KernelType::Rbf { gamma: None },
            c: 1.0,
            epsilon: 0.1,
            tol: 1e-3,
            max_iter: 1000,
            random_state: 42,
        }
    }
}

/// Support Vector Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvrRegressor {
    pub config: SvrConfig,
    gamma: f64,
    support_vectors: Option<Array2<f64>>,
    dual_coef: Array1<f64>,
    bias: f64,
    n_iter: usize,
}

impl SvrRegressor {
    pub fn new(config: SvrConfig) -> Self {
        Self {
            config,
            gamma: 0.0,
            support_vectors: None,
            dual_coef: Array1::zeros(0),
            bias: 0.0,
            n_iter: 0,
        }
    }

    pub fn rbf(c: f64) -> Self {
        Self::new(SvrConfig {
            kernel: KernelType::Rbf { gamma: None },
            c,
            ..SvrConfig::default()
        })
    }

    pub fn linear(c: f64) -> Self {
        Self::new(SvrConfig {
            kernel: KernelType::Linear,
            c,
            ..SvrConfig::default()
        })
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.config.random_state = seed;
        self
    }

    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.as_ref().map(|sv| sv.nrows()).unwrap_or(0)
    }

    /// Epochs the last fit ran
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    fn resolve_gamma(&self, x: &Array2<f64>) -> Result<f64> {
        match self.config.kernel {
            KernelType::Linear => Ok(0.0),
            KernelType::Rbf { gamma: Some(g) } if g > 0.0 && g.is_finite() => Ok(g),
            KernelType::Rbf { gamma: Some(g) } => Err(TournamentError::InvalidParameter {
                name: "gamma".to_string(),
                value: g.to_string(),
                reason: "must be positive".to_string(),
            }),
            KernelType::Rbf { gamma: None } => {
                let mean = x.mean().unwrap_or(0.0);
                let var = x.mapv(|v| (v - mean).powi(2)).mean().unwrap_or(0.0);
                Ok(if var > 0.0 { 1.0 / (x.ncols() as f64 * var) } else { 1.0 })
            }
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        if n != y.len() {
            return Err(TournamentError::ShapeError {
                expected: format!("y length = {}", n),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n == 0 {
            return Err(TournamentError::DataError("cannot fit SVR on zero rows".to_string()));
        }
        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(TournamentError::InvalidParameter {
                name: "n_samples".to_string(),
                value: n.to_string(),
                reason: format!("SVR kernel matrix is limited to {} rows", MAX_KERNEL_MATRIX_SAMPLES),
            });
        }
        if !(self.config.c > 0.0) || self.config.epsilon < 0.0 {
            return Err(TournamentError::InvalidParameter {
                name: "c/epsilon".to_string(),
                value: format!("{}/{}", self.config.c, self.config.epsilon),
                reason: "C must be positive and epsilon non-negative".to_string(),
            });
        }

        let kernel = self.config.kernel;
        let gamma = self.resolve_gamma(x)?;
        let entries: Vec<f64> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| (0..n).map(move |j| kernel.eval(gamma, x.row(i), x.row(j)) + 1.0))
            .collect();
        let q = Array2::from_shape_vec((n, n), entries)?;

        let (c, epsilon) = (self.config.c, self.config.epsilon);
        let mut beta = Array1::<f64>::zeros(n);
        // q · beta, kept in step with every coefficient change
        let mut fitted = Array1::<f64>::zeros(n);
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);

        let mut epochs = 0;
        for _ in 0..self.config.max_iter {
            epochs += 1;
            order.shuffle(&mut rng);
            let mut max_step: f64 = 0.0;

            for &i in &order {
                let h = q[[i, i]];
                if h <= 0.0 {
                    continue;
                }
                let g = fitted[i] - y[i];
                let (gp, gn) = (g + epsilon, g - epsilon);
                let b = beta[i];
                let step = if gp < h * b {
                    -gp / h
                } else if gn > h * b {
                    -gn / h
                } else {
                    -b
                };

                let delta = (b + step).clamp(-c, c) - b;
                if delta.abs() > 1e-12 {
                    // q is symmetric, so row i doubles as column i
                    fitted.scaled_add(delta, &q.row(i));
                    beta[i] += delta;
                    max_step = max_step.max(delta.abs());
                }
            }

            if max_step < self.config.tol {
                break;
            }
        }

        let support: Vec<usize> = (0..n).filter(|&i| beta[i].abs() > 1e-8).collect();
        self.bias = beta.sum();
        self.support_vectors = Some(x.select(Axis(0), &support));
        self.dual_coef = support.iter().map(|&i| beta[i]).collect();
        self.gamma = gamma;
        self.n_iter = epochs;
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let sv = self.support_vectors.as_ref().ok_or(TournamentError::ModelNotFitted)?;
        if x.ncols() != sv.ncols() {
            return Err(TournamentError::ShapeError {
                expected: format!("{} features", sv.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let kernel = self.config.kernel;
        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let sample = x.row(i);
                sv.outer_iter()
                    .zip(self.dual_coef.iter())
                    .map(|(s, a)| a * kernel.eval(self.gamma, sample, s))
                    .sum::<f64>()
                    + self.bias
            })
            .collect();
        Ok(Array1::from_vec(predictions))
    }

    fn unfitted(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl_regressor!(SvrRegressor, Svr);

#[cfg(test)]
mod tests {
    use super::*;

    fn rmse(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
        ((a - b).mapv(|e| e * e).sum() / a.len() as f64).sqrt()
    }

    #[test]
    fn test_linear_kernel_recovers_plane() {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| if j == 0 { i as f64 / 20.0 - 1.0 } else { ((i * 7) % 11) as f64 / 5.5 - 1.0 });
        let y = Array1::from_shape_fn(40, |i| 2.0 * x[[i, 0]] - x[[i, 1]] + 0.5);

        let mut model = SvrRegressor::linear(10.0);
        model.fit(&x, &y).unwrap();
        let err = rmse(&model.predict(&x).unwrap(), &y);
        assert!(err < 0.2, "rmse = {}", err);
    }

    #[test]
    fn test_rbf_kernel_fits_curve() {
        let x = Array2::from_shape_fn((50, 1), |(i, _)| i as f64 * 0.12);
        let y = x.column(0).mapv(f64::sin);
        let mean = y.sum() / y.len() as f64;
        let baseline = rmse(&Array1::from_elem(y.len(), mean), &y);

        let mut model = SvrRegressor::rbf(1.0);
        model.fit(&x, &y).unwrap();
        let err = rmse(&model.predict(&x).unwrap(), &y);
        assert!(err < 0.5 * baseline, "rmse = {}, baseline = {}", err, baseline);
        assert!(model.n_support_vectors() > 0);
    }

    #[test]
    fn test_same_seed_same_fit() {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| ((i * (j + 2)) % 9) as f64);
        let y = Array1::from_shape_fn(30, |i| x[[i, 0]] * 0.5 + 1.0);
        let mut a = SvrRegressor::rbf(1.0).with_random_state(5);
        let mut b = a.clone();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_oversized_kernel_rejected() {
        let x = Array2::zeros((MAX_KERNEL_MATRIX_SAMPLES + 1, 1));
        let y = Array1::zeros(MAX_KERNEL_MATRIX_SAMPLES + 1);
        let mut model = SvrRegressor::linear(1.0);
        assert!(matches!(model.fit(&x, &y), Err(TournamentError::InvalidParameter { .. })));
    }

    #[test]
    fn test_predict_unfitted() {
        let model = SvrRegressor::rbf(1.0);
        assert!(matches!(
            model.predict(&Array2::zeros((1, 2))),
            Err(TournamentError::ModelNotFitted)
        ));
    }
}

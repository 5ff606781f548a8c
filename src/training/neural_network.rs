//! Multi-layer perceptron regressor
//!
//! Fully connected ReLU network with a linear output unit, trained by
//! mini-batch Adam on half mean squared error plus an L2 penalty. Training
//! stops after `max_epochs` or once the epoch loss fails to improve by `tol`
//! for `n_iter_no_change` consecutive epochs.

use super::regressor::impl_regressor;
use crate::error::{Result, TournamentError};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpConfig {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub max_epochs: usize,
    /// Capped at the number of training rows
    pub batch_size: usize,
    /// L2 penalty
    pub alpha: f64,
    pub tol: f64,
    pub n_iter_no_change: usize,
    pub random_state: u64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![100],
            learning_rate: 0.001,
            max_epochs: 500,
            batch_size: 200,
            alpha: 0.0001,
            tol: 1e-4,
            n_iter_no_change: 10,
            random_state: 42,
        }
    }
}

/// Adam moment estimates for one parameter tensor
#[derive(Debug, Clone)]
struct AdamState<D: ndarray::Dimension> {
    m: ndarray::Array<f64, D>,
    v: ndarray::Array<f64, D>,
}

impl<D: ndarray::Dimension> AdamState<D> {
    const BETA1: f64 = 0.9;
    const BETA2: f64 = 0.999;
    const EPS: f64 = 1e-8;

    fn new(shape: D) -> Self {
        Self {
            m: ndarray::Array::zeros(shape.clone()),
            v: ndarray::Array::zeros(shape),
        }
    }

    fn step(&mut self, param: &mut ndarray::Array<f64, D>, grad: &ndarray::Array<f64, D>, lr_t: f64) {
        self.m.zip_mut_with(grad, |m, &g| *m = Self::BETA1 * *m + (1.0 - Self::BETA1) * g);
        self.v.zip_mut_with(grad, |v, &g| *v = Self::BETA2 * *v + (1.0 - Self::BETA2) * g * g);
        ndarray::Zip::from(param)
            .and(&self.m)
            .and(&self.v)
            .for_each(|p, &m, &v| *p -= lr_t * m / (v.sqrt() + Self::EPS));
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpRegressor {
    pub config: MlpConfig,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    n_features: usize,
    n_epochs: usize,
}

impl MlpRegressor {
    pub fn new(config: MlpConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            biases: Vec::new(),
            n_features: 0,
            n_epochs: 0,
        }
    }

    pub fn with_hidden_layers(hidden_layers: Vec<usize>, random_state: u64) -> Self {
        Self::new(MlpConfig {
            hidden_layers,
            random_state,
            ..Default::default()
        })
    }

    /// Epochs run by the last fit
    pub fn n_epochs(&self) -> usize {
        self.n_epochs
    }

    fn initialize(&mut self, rng: &mut ChaCha8Rng) {
        let mut sizes = vec![self.n_features];
        sizes.extend(&self.config.hidden_layers);
        sizes.push(1);

        self.weights.clear();
        self.biases.clear();
        for pair in sizes.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
            self.weights
                .push(Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-bound..bound)));
            self.biases
                .push(Array1::from_shape_fn(fan_out, |_| rng.gen_range(-bound..bound)));
        }
    }

    /// Layer activations, input first and network output last
    fn forward(&self, x: &Array2<f64>) -> Vec<Array2<f64>> {
        let n_layers = self.weights.len();
        let mut activations = Vec::with_capacity(n_layers + 1);
        activations.push(x.clone());

        for (l, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let mut z = activations[l].dot(w) + b;
            if l + 1 < n_layers {
                z.mapv_inplace(|v| v.max(0.0));
            }
            activations.push(z);
        }
        activations
    }

    fn backward(&self, activations: &[Array2<f64>], y: &Array1<f64>) -> (Vec<Array2<f64>>, Vec<Array1<f64>>) {
        let n_layers = self.weights.len();
        let batch = y.len() as f64;

        let output = &activations[n_layers];
        let mut delta = (output - &y.view().insert_axis(Axis(1))) / batch;

        let mut grad_w = vec![Array2::zeros((0, 0)); n_layers];
        let mut grad_b = vec![Array1::zeros(0); n_layers];

        for l in (0..n_layers).rev() {
            grad_w[l] = activations[l].t().dot(&delta) + &(&self.weights[l] * (self.config.alpha / batch));
            grad_b[l] = delta.sum_axis(Axis(0));

            if l > 0 {
                let mut prev = delta.dot(&self.weights[l].t());
                prev.zip_mut_with(&activations[l], |d, &a| {
                    if a <= 0.0 {
                        *d = 0.0;
                    }
                });
                delta = prev;
            }
        }
        (grad_w, grad_b)
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(TournamentError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(TournamentError::DataError("cannot train an MLP on zero rows".to_string()));
        }

        self.n_features = x.ncols();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);
        self.initialize(&mut rng);

        let mut adam_w: Vec<_> = self.weights.iter().map(|w| AdamState::new(w.raw_dim())).collect();
        let mut adam_b: Vec<_> = self.biases.iter().map(|b| AdamState::new(b.raw_dim())).collect();

        let batch_size = self.config.batch_size.clamp(1, n_samples);
        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut best_loss = f64::INFINITY;
        let mut no_improve = 0;
        let mut t = 0i32;
        self.n_epochs = 0;

        for _ in 0..self.config.max_epochs {
            indices.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for chunk in indices.chunks(batch_size) {
                let x_batch = x.select(Axis(0), chunk);
                let y_batch = y.select(Axis(0), chunk);

                let activations = self.forward(&x_batch);
                let pred = activations[self.weights.len()].column(0);
                epoch_loss += pred
                    .iter()
                    .zip(y_batch.iter())
                    .map(|(p, target)| (p - target).powi(2))
                    .sum::<f64>()
                    / 2.0;

                let (grad_w, grad_b) = self.backward(&activations, &y_batch);

                t += 1;
                let lr_t = self.config.learning_rate
                    * (1.0 - AdamState::<ndarray::Ix2>::BETA2.powi(t)).sqrt()
                    / (1.0 - AdamState::<ndarray::Ix2>::BETA1.powi(t));
                for l in 0..self.weights.len() {
                    adam_w[l].step(&mut self.weights[l], &grad_w[l], lr_t);
                    adam_b[l].step(&mut self.biases[l], &grad_b[l], lr_t);
                }
            }

            self.n_epochs += 1;
            let loss = epoch_loss / n_samples as f64;
            if !loss.is_finite() {
                return Err(TournamentError::DataError(
                    "MLP training loss diverged".to_string(),
                ));
            }

            if loss > best_loss - self.config.tol {
                no_improve += 1;
            } else {
                no_improve = 0;
            }
            best_loss = best_loss.min(loss);
            if no_improve >= self.config.n_iter_no_change {
                break;
            }
        }

        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.weights.is_empty() {
            return Err(TournamentError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(TournamentError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        let activations = self.forward(x);
        Ok(activations[self.weights.len()].column(0).to_owned())
    }

    fn unfitted(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl_regressor!(MlpRegressor, Mlp);

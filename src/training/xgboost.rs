//! XGBoost-style gradient boosting with second-order approximation
//!
//! Differences from [`GradientBoostingRegressor`](super::GradientBoostingRegressor):
//! - leaf weights are regularised, `w* = -G / (H + lambda)` with optional L1 soft-thresholding
//! - splits are scored by gain,
//!   `0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - (GL+GR)²/(HL+HR+λ)]`, and must beat `gamma`
//! - children need at least `min_child_weight` hessian mass

use super::regressor::impl_regressor;
use crate::error::{Result, TournamentError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_state: u64,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum XgbNode {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<XgbNode>,
        right: Box<XgbNode>,
    },
}

impl XgbNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        match self {
            XgbNode::Leaf { weight } => *weight,
            XgbNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }
}

/// Best split of one feature: `(feature, threshold, gain)`
type SplitCandidate = (usize, f64, f64);

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    grad: &'a Array1<f64>,
    hess: &'a Array1<f64>,
    features: &'a [usize],
    config: &'a XGBoostConfig,
}

impl TreeBuilder<'_> {
    fn build(&self, indices: &[usize], depth: usize) -> XgbNode {
        let g_sum: f64 = indices.iter().map(|&i| self.grad[i]).sum();
        let h_sum: f64 = indices.iter().map(|&i| self.hess[i]).sum();
        let weight = leaf_weight(g_sum, h_sum, self.config.reg_lambda, self.config.reg_alpha);

        if depth >= self.config.max_depth || indices.len() < 2 || h_sum < self.config.min_child_weight {
            return XgbNode::Leaf { weight };
        }

        let per_feature: Vec<Option<SplitCandidate>> = self
            .features
            .par_iter()
            .map(|&f| self.best_split(indices, f, g_sum, h_sum))
            .collect();
        // Sequential fold keeps the lowest feature index on equal gain
        let best = per_feature
            .into_iter()
            .flatten()
            .fold(None::<SplitCandidate>, |acc, cand| match acc {
                Some(a) if a.2 >= cand.2 => Some(a),
                _ => Some(cand),
            });

        match best {
            Some((feature, threshold, gain)) if gain > self.config.gamma => {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
                    indices.iter().partition(|&&i| self.x[[i, feature]] <= threshold);
                if left_idx.is_empty() || right_idx.is_empty() {
                    return XgbNode::Leaf { weight };
                }
                XgbNode::Split {
                    feature,
                    threshold,
                    left: Box::new(self.build(&left_idx, depth + 1)),
                    right: Box::new(self.build(&right_idx, depth + 1)),
                }
            }
            _ => XgbNode::Leaf { weight },
        }
    }

    /// Exact greedy scan over the sorted values of one feature
    fn best_split(&self, indices: &[usize], feature: usize, g_total: f64, h_total: f64) -> Option<SplitCandidate> {
        let x = self.x;
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let lambda = self.config.reg_lambda;
        let parent = g_total * g_total / (h_total + lambda);
        let (mut g_left, mut h_left) = (0.0, 0.0);
        let mut best: Option<SplitCandidate> = None;

        for pos in 0..sorted.len() - 1 {
            let (idx, next) = (sorted[pos], sorted[pos + 1]);
            g_left += self.grad[idx];
            h_left += self.hess[idx];

            let (here, there) = (x[[idx, feature]], x[[next, feature]]);
            if there - here < 1e-12 {
                continue;
            }
            let (g_right, h_right) = (g_total - g_left, h_total - h_left);
            if h_left < self.config.min_child_weight || h_right < self.config.min_child_weight {
                continue;
            }

            let gain = 0.5 * (g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda) - parent);
            if best.map_or(true, |b| gain > b.2) {
                best = Some((feature, (here + there) / 2.0, gain));
            }
        }
        best
    }
}

/// Optimal leaf weight with L1 (alpha) and L2 (lambda) regularization
fn leaf_weight(g_sum: f64, h_sum: f64, lambda: f64, alpha: f64) -> f64 {
    let g = if g_sum > alpha {
        g_sum - alpha
    } else if g_sum < -alpha {
        g_sum + alpha
    } else {
        return 0.0;
    };
    -g / (h_sum + lambda)
}

/// XGBoost Regressor (squared error loss)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostRegressor {
    pub config: XGBoostConfig,
    trees: Vec<XgbNode>,
    base_score: Option<f64>,
    n_features: usize,
}

impl XGBoostRegressor {
    pub fn new(config: XGBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: None,
            n_features: 0,
        }
    }

    pub fn with_estimators(n_estimators: usize, seed: u64) -> Self {
        Self::new(XGBoostConfig {
            n_estimators,
            random_state: seed,
            ..XGBoostConfig::default()
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let (n_samples, n_features) = x.dim();
        if n_samples != y.len() {
            return Err(TournamentError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || n_features == 0 {
            return Err(TournamentError::DataError("cannot boost on an empty matrix".to_string()));
        }
        let ratios_ok = |r: f64| r > 0.0 && r <= 1.0;
        if !ratios_ok(self.config.subsample) || !ratios_ok(self.config.colsample_bytree) {
            return Err(TournamentError::InvalidParameter {
                name: "subsample/colsample_bytree".to_string(),
                value: format!("{}/{}", self.config.subsample, self.config.colsample_bytree),
                reason: "must be in (0, 1]".to_string(),
            });
        }

        let base_score = y.sum() / n_samples as f64;
        let mut preds = Array1::from_elem(n_samples, base_score);
        let hess = Array1::from_elem(n_samples, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);

        let mut trees = Vec::with_capacity(self.config.n_estimators);
        for _ in 0..self.config.n_estimators {
            // Squared error: grad = pred - y, hess = 1
            let grad: Array1<f64> = &preds - y;
            let rows = draw(&mut rng, n_samples, self.config.subsample);
            let cols = draw(&mut rng, n_features, self.config.colsample_bytree);

            let builder = TreeBuilder {
                x,
                grad: &grad,
                hess: &hess,
                features: &cols,
                config: &self.config,
            };
            let tree = builder.build(&rows, 0);

            for (i, row) in x.outer_iter().enumerate() {
                preds[i] += self.config.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        self.trees = trees;
        self.base_score = Some(base_score);
        self.n_features = n_features;
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let base = self.base_score.ok_or(TournamentError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(TournamentError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let eta = self.config.learning_rate;
        Ok(x
            .outer_iter()
            .map(|row| base + eta * self.trees.iter().map(|t| t.predict(row)).sum::<f64>())
            .collect())
    }

    /// Split counts per feature, normalised to sum to one
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.base_score.is_none() {
            return None;
        }
        let mut counts = Array1::<f64>::zeros(self.n_features);
        for tree in &self.trees {
            count_splits(tree, &mut counts);
        }
        let total = counts.sum();
        if total > 0.0 {
            counts /= total;
        }
        Some(counts)
    }

    fn unfitted(&self) -> Self {
        Self::new(self.config.clone())
    }
}

fn count_splits(node: &XgbNode, counts: &mut Array1<f64>) {
    if let XgbNode::Split { feature, left, right, .. } = node {
        counts[*feature] += 1.0;
        count_splits(left, counts);
        count_splits(right, counts);
    }
}

/// Sorted row or column subset; everything when `ratio` is 1
fn draw(rng: &mut ChaCha8Rng, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64 * ratio).ceil() as usize).clamp(1, n);
    let mut picked = sample(rng, n, k).into_vec();
    picked.sort_unstable();
    picked
}

impl_regressor!(XGBoostRegressor, XGBoost);

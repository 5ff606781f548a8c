//! K-nearest neighbours regression

use super::regressor::impl_regressor;
use crate::error::{Result, TournamentError};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
}

impl DistanceMetric {
    fn distance(self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).powi(2))
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
        }
    }
}

/// Weighting scheme for neighbours
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    #[default]
    Uniform,
    /// Inverse distance; an exact match takes the whole weight
    Distance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnRegressor {
    pub n_neighbors: usize,
    pub metric: DistanceMetric,
    pub weights: WeightScheme,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl KnnRegressor {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            metric: DistanceMetric::default(),
            weights: WeightScheme::default(),
            x_train: None,
            y_train: None,
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.weights = weights;
        self
    }

    /// Stores the training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(TournamentError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if self.n_neighbors == 0 || x.nrows() < self.n_neighbors {
            return Err(TournamentError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: self.n_neighbors.to_string(),
                reason: format!("must be in 1..={} for this training set", x.nrows()),
            });
        }

        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(x), Some(y)) => (x, y),
            _ => return Err(TournamentError::ModelNotFitted),
        };
        if x.ncols() != x_train.ncols() {
            return Err(TournamentError::ShapeError {
                expected: format!("{} features", x_train.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let k = self.n_neighbors;
        let metric = self.metric;
        let weights = self.weights;

        let predictions: Vec<f64> = x
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|query| {
                let mut dists: Vec<(f64, usize)> = x_train
                    .axis_iter(Axis(0))
                    .enumerate()
                    .map(|(i, row)| (metric.distance(query, row), i))
                    .collect();
                // Ties resolve to the earlier training row
                dists.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                let neighbours = &dists[..k];

                match weights {
                    WeightScheme::Uniform => {
                        neighbours.iter().map(|&(_, i)| y_train[i]).sum::<f64>() / k as f64
                    }
                    WeightScheme::Distance => {
                        if let Some(&(_, i)) = neighbours.iter().find(|(d, _)| *d == 0.0) {
                            return y_train[i];
                        }
                        let (num, den) = neighbours.iter().fold((0.0, 0.0), |(num, den), &(d, i)| {
                            (num + y_train[i] / d, den + 1.0 / d)
                        });
                        num / den
                    }
                }
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn unfitted(&self) -> Self {
        Self::new(self.n_neighbors)
            .with_metric(self.metric)
            .with_weights(self.weights)
    }
}

impl_regressor!(KnnRegressor, Knn);

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_uniform_average() {
        let x = array![[0.0], [1.0], [2.0], [10.0]];
        let y = array![1.0, 2.0, 3.0, 100.0];

        let mut knn = KnnRegressor::new(3);
        knn.fit(&x, &y).unwrap();
        let pred = knn.predict(&array![[1.0]]).unwrap();
        assert!((pred[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_weighting_exact_match() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![1.0, 5.0, 9.0];

        let mut knn = KnnRegressor::new(2).with_weights(WeightScheme::Distance);
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&array![[1.0]]).unwrap()[0], 5.0);
    }

    #[test]
    fn test_manhattan() {
        let d = DistanceMetric::Manhattan.distance(array![0.0, 0.0].view(), array![3.0, 4.0].view());
        assert_eq!(d, 7.0);
        let d = DistanceMetric::Euclidean.distance(array![0.0, 0.0].view(), array![3.0, 4.0].view());
        assert_eq!(d, 5.0);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let mut knn = KnnRegressor::new(10);
        let err = knn.fit(&array![[0.0], [1.0]], &array![0.0, 1.0]).unwrap_err();
        assert!(matches!(err, TournamentError::InvalidParameter { .. }));
    }
}

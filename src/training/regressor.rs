//! The trainable-regressor capability and its serialisable envelope

use super::cross_validation::{cross_validate, CvScores, KFold};
use super::metrics::Metric;
use super::{
    DecisionTreeRegressor, ElasticNet, GradientBoostingRegressor, KnnRegressor, LinearRegression,
    MlpRegressor, RandomForestRegressor, RidgeRegression, SvrRegressor, XGBoostRegressor,
};
use crate::error::{Result, TournamentError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A model that can be fitted to a feature matrix and predict a numeric target.
///
/// The tournament only ever talks to competitors through this trait, so any
/// implementation can enter the pool.
pub trait Regressor: Send + Sync + fmt::Debug {
    /// Fit to training data, replacing any previous fit
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one value per row of `x`
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// An unfitted copy with identical hyperparameters
    fn fresh(&self) -> Box<dyn Regressor>;

    /// A copy including fitted state
    fn clone_box(&self) -> Box<dyn Regressor>;

    /// Serialise the fitted model for artifact storage
    fn to_bytes(&self) -> Result<Vec<u8>>;

    /// K-fold cross-validation; every fold trains on a fresh copy
    fn cross_validate(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        folds: &KFold,
        metrics: &[Metric],
    ) -> Result<CvScores> {
        cross_validate(self, x, y, folds, metrics)
    }
}

impl Clone for Box<dyn Regressor> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Every built-in regressor, in a form that survives a round trip to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "model")]
pub enum TrainedModel {
    LinearRegression(LinearRegression),
    Ridge(RidgeRegression),
    ElasticNet(ElasticNet),
    Knn(KnnRegressor),
    DecisionTree(DecisionTreeRegressor),
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
    XGBoost(XGBoostRegressor),
    Svr(SvrRegressor),
    Mlp(MlpRegressor),
}

impl TrainedModel {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            TournamentError::PersistenceError(format!("cannot decode model artifact: {}", e))
        })
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            TrainedModel::LinearRegression(m) => m,
            TrainedModel::Ridge(m) => m,
            TrainedModel::ElasticNet(m) => m,
            TrainedModel::Knn(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::GradientBoosting(m) => m,
            TrainedModel::XGBoost(m) => m,
            TrainedModel::Svr(m) => m,
            TrainedModel::Mlp(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Regressor {
        match self {
            TrainedModel::LinearRegression(m) => m,
            TrainedModel::Ridge(m) => m,
            TrainedModel::ElasticNet(m) => m,
            TrainedModel::Knn(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::GradientBoosting(m) => m,
            TrainedModel::XGBoost(m) => m,
            TrainedModel::Svr(m) => m,
            TrainedModel::Mlp(m) => m,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TrainedModel::LinearRegression(_) => "LinearRegression",
            TrainedModel::Ridge(_) => "Ridge",
            TrainedModel::ElasticNet(_) => "ElasticNet",
            TrainedModel::Knn(_) => "KNN",
            TrainedModel::DecisionTree(_) => "DecisionTree",
            TrainedModel::RandomForest(_) => "RandomForest",
            TrainedModel::GradientBoosting(_) => "GradientBoosting",
            TrainedModel::XGBoost(_) => "XGBoost",
            TrainedModel::Svr(_) => "SVR",
            TrainedModel::Mlp(_) => "MLP",
        }
    }
}

impl Regressor for TrainedModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        self.inner().fresh()
    }

    fn clone_box(&self) -> Box<dyn Regressor> {
        Box::new(self.clone())
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Wire a concrete model's inherent `fit`/`predict`/`unfitted` into the
/// [`Regressor`] trait and the [`TrainedModel`] envelope.
macro_rules! impl_regressor {
    ($ty:ty, $variant:ident) => {
        impl $crate::training::Regressor for $ty {
            fn fit(
                &mut self,
                x: &ndarray::Array2<f64>,
                y: &ndarray::Array1<f64>,
            ) -> $crate::error::Result<()> {
                <$ty>::fit(self, x, y)
            }

            fn predict(&self, x: &ndarray::Array2<f64>) -> $crate::error::Result<ndarray::Array1<f64>> {
                <$ty>::predict(self, x)
            }

            fn fresh(&self) -> Box<dyn $crate::training::Regressor> {
                Box::new(self.unfitted())
            }

            fn clone_box(&self) -> Box<dyn $crate::training::Regressor> {
                Box::new(self.clone())
            }

            fn to_bytes(&self) -> $crate::error::Result<Vec<u8>> {
                let envelope = $crate::training::TrainedModel::$variant(self.clone());
                Ok(serde_json::to_vec(&envelope)?)
            }
        }

        impl From<$ty> for $crate::training::TrainedModel {
            fn from(model: $ty) -> Self {
                $crate::training::TrainedModel::$variant(model)
            }
        }
    };
}

pub(crate) use impl_regressor;

//! Regressors, metrics and cross-validation
//!
//! Every model implements [`Regressor`] and can be boxed into a tournament
//! candidate. Fitted models persist through the [`TrainedModel`] envelope.
//!
//! - Linear models (OLS, Ridge, Lasso, ElasticNet)
//! - K-nearest neighbours
//! - Support vector regression (linear and RBF kernels)
//! - Decision trees, random forests, gradient boosting and second-order (XGBoost-style) boosting
//! - Multi-layer perceptron

pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod knn;
pub mod linear_models;
pub mod metrics;
pub mod neural_network;
pub mod random_forest;
mod regressor;
pub mod svm;
pub mod xgboost;

pub use cross_validation::{cross_validate, CVSplit, CvScores, KFold};
pub use decision_tree::{DecisionTreeRegressor, TreeNode};
pub use gradient_boosting::GradientBoostingRegressor;
pub use knn::{DistanceMetric, KnnRegressor, WeightScheme};
pub use linear_models::{ElasticNet, LinearRegression, RidgeRegression};
pub use metrics::{Metric, RegressionMetrics};
pub use neural_network::{MlpConfig, MlpRegressor};
pub use random_forest::{MaxFeatures, RandomForestRegressor};
pub use regressor::{Regressor, TrainedModel};
pub use svm::{KernelType, SvrConfig, SvrRegressor};
pub use xgboost::{XGBoostConfig, XGBoostRegressor};

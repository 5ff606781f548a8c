//! Linear model implementations

use super::regressor::impl_regressor;
use crate::error::{Result, TournamentError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Solve the symmetric positive-definite system `A x = b` via Cholesky.
/// Returns `None` when `A` is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 1e-12 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * y[j]).sum();
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gaussian elimination with partial pivoting. Fallback for systems that
/// Cholesky rejects.
fn gaussian_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut m = a.clone();
    let mut rhs = b.clone();

    for col in 0..n {
        let pivot = (col..n).max_by(|&r1, &r2| m[[r1, col]].abs().total_cmp(&m[[r2, col]].abs()))?;
        if m[[pivot, col]].abs() < 1e-12 {
            return None;
        }
        if pivot != col {
            for j in 0..n {
                m.swap([col, j], [pivot, j]);
            }
            rhs.swap(col, pivot);
        }

        for row in (col + 1)..n {
            let factor = m[[row, col]] / m[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                m[[row, j]] -= factor * m[[col, j]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| m[[i, j]] * x[j]).sum();
        x[i] = (rhs[i] - sum) / m[[i, i]];
    }
    Some(x)
}

/// Solve `(XᵀX + alpha·I) w = Xᵀy` on centered data
fn solve_normal_equations(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<Array1<f64>> {
    let mut xtx = x.t().dot(x);
    for i in 0..xtx.nrows() {
        xtx[[i, i]] += alpha;
    }
    let xty = x.t().dot(y);

    cholesky_solve(&xtx, &xty)
        .or_else(|| gaussian_solve(&xtx, &xty))
        .ok_or_else(|| {
            TournamentError::DataError("normal equations are singular".to_string())
        })
}

fn check_shapes(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(TournamentError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(TournamentError::DataError("cannot fit on zero rows".to_string()));
    }
    Ok(())
}

/// Center features and target; returns the means used
fn center(x: &Array2<f64>, y: &Array1<f64>) -> (Array2<f64>, Array1<f64>, Array1<f64>, f64) {
    let x_mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()));
    let y_mean = y.mean().unwrap_or(0.0);
    let x_centered = x - &x_mean.view().insert_axis(Axis(0));
    let y_centered = y - y_mean;
    (x_centered, y_centered, x_mean, y_mean)
}

/// Fitted linear weights shared by every model in this file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LinearFit {
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl LinearFit {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coef = self.coefficients.as_ref().ok_or(TournamentError::ModelNotFitted)?;
        if x.ncols() != coef.len() {
            return Err(TournamentError::ShapeError {
                expected: format!("{} features", coef.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(coef) + self.intercept)
    }
}

/// Ordinary least squares
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    fitted: LinearFit,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_shapes(x, y)?;
        let (xc, yc, x_mean, y_mean) = center(x, y);
        let coef = solve_normal_equations(&xc, &yc, 0.0)?;
        self.fitted = LinearFit {
            intercept: y_mean - coef.dot(&x_mean),
            coefficients: Some(coef),
        };
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fitted.predict(x)
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fitted.coefficients.as_ref()
    }

    fn unfitted(&self) -> Self {
        Self::new()
    }
}

/// L2-regularized least squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub alpha: f64,
    fitted: LinearFit,
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            fitted: LinearFit::default(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_shapes(x, y)?;
        let (xc, yc, x_mean, y_mean) = center(x, y);
        let coef = solve_normal_equations(&xc, &yc, self.alpha)?;
        self.fitted = LinearFit {
            intercept: y_mean - coef.dot(&x_mean),
            coefficients: Some(coef),
        };
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fitted.predict(x)
    }

    fn unfitted(&self) -> Self {
        Self::new(self.alpha)
    }
}

/// Elastic net via cyclic coordinate descent.
///
/// Minimises `1/(2n)·‖y − Xw‖² + α·ρ·‖w‖₁ + ½·α·(1−ρ)·‖w‖²` where ρ is
/// `l1_ratio`. With `l1_ratio = 1` this is the Lasso.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticNet {
    pub alpha: f64,
    pub l1_ratio: f64,
    pub max_iter: usize,
    pub tol: f64,
    fitted: LinearFit,
}

impl ElasticNet {
    pub fn new(alpha: f64, l1_ratio: f64) -> Self {
        Self {
            alpha,
            l1_ratio,
            max_iter: 1000,
            tol: 1e-4,
            fitted: LinearFit::default(),
        }
    }

    /// Pure L1 penalty
    pub fn lasso(alpha: f64) -> Self {
        Self::new(alpha, 1.0)
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    fn soft_threshold(value: f64, threshold: f64) -> f64 {
        if value > threshold {
            value - threshold
        } else if value < -threshold {
            value + threshold
        } else {
            0.0
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_shapes(x, y)?;
        if !(0.0..=1.0).contains(&self.l1_ratio) || self.alpha < 0.0 {
            return Err(TournamentError::InvalidParameter {
                name: "l1_ratio/alpha".to_string(),
                value: format!("{}/{}", self.l1_ratio, self.alpha),
                reason: "l1_ratio must be in [0, 1] and alpha non-negative".to_string(),
            });
        }

        let (xc, yc, x_mean, y_mean) = center(x, y);
        let n = xc.nrows() as f64;
        let p = xc.ncols();

        let l1 = self.alpha * self.l1_ratio;
        let l2 = self.alpha * (1.0 - self.l1_ratio);
        let col_sq: Vec<f64> = (0..p).map(|j| xc.column(j).dot(&xc.column(j)) / n).collect();

        let mut w = Array1::<f64>::zeros(p);
        let mut residual = yc.clone();

        for _ in 0..self.max_iter {
            let mut max_delta = 0.0f64;
            for j in 0..p {
                if col_sq[j] == 0.0 {
                    continue;
                }
                let col = xc.column(j);
                let w_old = w[j];
                let rho = col.dot(&residual) / n + col_sq[j] * w_old;
                let w_new = Self::soft_threshold(rho, l1) / (col_sq[j] + l2);

                let delta = w_new - w_old;
                if delta != 0.0 {
                    residual.scaled_add(-delta, &col);
                    w[j] = w_new;
                }
                max_delta = max_delta.max(delta.abs());
            }
            if max_delta < self.tol {
                break;
            }
        }

        if w.iter().any(|v| !v.is_finite()) {
            return Err(TournamentError::DataError(
                "coordinate descent diverged".to_string(),
            ));
        }

        self.fitted = LinearFit {
            intercept: y_mean - w.dot(&x_mean),
            coefficients: Some(w),
        };
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fitted.predict(x)
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fitted.coefficients.as_ref()
    }

    fn unfitted(&self) -> Self {
        Self::new(self.alpha, self.l1_ratio).with_max_iter(self.max_iter)
    }
}

impl_regressor!(LinearRegression, LinearRegression);
impl_regressor!(RidgeRegression, Ridge);
impl_regressor!(ElasticNet, ElasticNet);

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn line() -> (Array2<f64>, Array1<f64>) {
        let x = array![[1.0, 0.5], [2.0, 1.5], [3.0, 1.0], [4.0, 3.0], [5.0, 2.0], [6.0, 4.5]];
        let y = x.column(0).mapv(|v| 3.0 * v) - x.column(1).mapv(|v| 2.0 * v) + 1.0;
        (x, y)
    }

    #[test]
    fn test_linear_regression_recovers_weights() {
        let (x, y) = line();
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients().unwrap();
        assert!((coef[0] - 3.0).abs() < 1e-8);
        assert!((coef[1] + 2.0).abs() < 1e-8);

        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-8);
        }
    }

    #[test]
    fn test_collinear_features_fall_back_or_error() {
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let y = array![1.0, 2.0, 3.0];
        assert!(LinearRegression::new().fit(&x, &y).is_err());

        // Ridge regularization makes the system solvable
        let mut ridge = RidgeRegression::new(1.0);
        ridge.fit(&x, &y).unwrap();
        assert!(ridge.predict(&x).is_ok());
    }

    #[test]
    fn test_ridge_shrinks_weights() {
        let (x, y) = line();
        let mut ols = LinearRegression::new();
        ols.fit(&x, &y).unwrap();
        let mut ridge = RidgeRegression::new(10.0);
        ridge.fit(&x, &y).unwrap();

        let ols_norm = ols.coefficients().unwrap().mapv(|v| v * v).sum();
        let ridge_norm = ridge.fitted.coefficients.as_ref().unwrap().mapv(|v| v * v).sum();
        assert!(ridge_norm < ols_norm);
    }

    #[test]
    fn test_lasso_zeroes_irrelevant_feature() {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| if j == 0 { i as f64 } else { ((i * 7) % 5) as f64 });
        let y = x.column(0).mapv(|v| 2.0 * v);

        let mut lasso = ElasticNet::lasso(0.5);
        lasso.fit(&x, &y).unwrap();
        let coef = lasso.coefficients().unwrap();
        assert!(coef[0] > 1.5);
        assert!(coef[1].abs() < 1e-6);
    }

    #[test]
    fn test_elastic_net_predicts() {
        let (x, y) = line();
        let mut model = ElasticNet::new(0.01, 0.5);
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        let rmse = ((&pred - &y).mapv(|e| e * e).sum() / y.len() as f64).sqrt();
        assert!(rmse < 0.5);
    }

    #[test]
    fn test_predict_before_fit() {
        let model = RidgeRegression::new(1.0);
        assert!(matches!(model.predict(&array![[1.0]]), Err(TournamentError::ModelNotFitted)));
    }
}

//! L2-regularised least squares.

use mt_types::{ModelError, MtResult, ParamMap, ParamMapExt};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use tracing::debug;

use crate::estimator::{check_fit_input, check_predict_input, Estimator};

/// Ridge regression: minimizes `|y - Xw|² + α|w|²` on centred data.
#[derive(Debug, Clone)]
pub struct RidgeRegression {
    alpha: f64,
    fit_intercept: bool,
    coef: Option<Array1<f64>>,
    intercept: f64,
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            fit_intercept: true,
            coef: None,
            intercept: 0.0,
        }
    }

    pub fn with_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Build from sampled parameters `alpha` and `fit_intercept`.
    pub fn from_params(params: &ParamMap) -> MtResult<Self> {
        let alpha = params.float_or("alpha", 1.0)?;
        if !(alpha >= 0.0 && alpha.is_finite()) {
            return Err(ModelError::InvalidParameter {
                parameter: "alpha".to_string(),
                message: format!("must be a finite non-negative number, got {alpha}"),
            }
            .into());
        }
        let fit_intercept = params.bool_or("fit_intercept", true)?;
        Ok(Self::new(alpha).with_intercept(fit_intercept))
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coef.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

const MAX_SVD_ITERATIONS: usize = 10_000;

/// Least-squares solve of the ridge problem written as an augmented system
/// `[X; sqrt(alpha) I] w = [y; 0]`.
///
/// SVD gives the minimum-norm solution when columns are collinear. Singular
/// values are cut relative to the largest one so the feature scale does not
/// matter. `None` if no tolerance yields a finite solution.
fn solve_ridge(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>, alpha: f64) -> Option<Array1<f64>> {
    let (n_rows, n_features) = x.dim();
    let penalty = alpha.sqrt();
    let design = DMatrix::from_fn(n_rows + n_features, n_features, |i, j| {
        if i < n_rows {
            x[[i, j]]
        } else if i - n_rows == j {
            penalty
        } else {
            0.0
        }
    });
    let target = DVector::from_fn(n_rows + n_features, |i, _| if i < n_rows { y[i] } else { 0.0 });

    let svd = design.try_svd(true, true, f64::EPSILON, MAX_SVD_ITERATIONS)?;
    let largest = svd.singular_values.max();
    for &relative in &[1e-12, 1e-10, 1e-8] {
        if let Ok(coef) = svd.solve(&target, relative * largest) {
            if coef.iter().all(|v| v.is_finite()) {
                return Some(coef.iter().copied().collect());
            }
        }
    }
    None
}

impl Estimator for RidgeRegression {
    fn name(&self) -> &str {
        "RidgeRegression"
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> MtResult<()> {
        check_fit_input(x, y)?;
        if !(x.iter().all(|v| v.is_finite()) && y.iter().all(|v| v.is_finite())) {
            return Err(ModelError::FitFailed {
                message: "training data contains non-finite values".to_string(),
            }
            .into());
        }

        let n_features = x.ncols();
        let (x_mean, y_mean) = if self.fit_intercept {
            let x_mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n_features));
            (x_mean, y.mean().unwrap_or(0.0))
        } else {
            (Array1::zeros(n_features), 0.0)
        };

        let xc = &x - &x_mean;
        let yc = &y - y_mean;
        let coef = solve_ridge(xc.view(), yc.view(), self.alpha).ok_or_else(|| ModelError::FitFailed {
            message: "least-squares solve produced no finite coefficients".to_string(),
        })?;

        self.intercept = y_mean - x_mean.dot(&coef);
        debug!(alpha = self.alpha, intercept = self.intercept, "ridge fitted");
        self.coef = Some(coef);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> MtResult<Array1<f64>> {
        let coef = self.coef.as_ref().ok_or_else(|| ModelError::NotFitted {
            model: self.name().to_string(),
        })?;
        check_predict_input(coef.len(), x)?;
        Ok(x.dot(coef) + self.intercept)
    }
}

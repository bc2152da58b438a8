//! The estimator contract shared by built-in and user models.

use std::fmt;
use std::sync::Arc;

use mt_types::{DataError, MtResult, ParamMap};
use ndarray::{Array1, ArrayView1, ArrayView2};

/// A model that can be fitted on a feature matrix and then predict targets.
///
/// Classification estimators predict class labels encoded as integer-valued
/// floats; regression estimators predict continuous values.
pub trait Estimator: Send + Sync + fmt::Debug {
    /// Short model name used in logs and errors.
    fn name(&self) -> &str;

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> MtResult<()>;

    fn predict(&self, x: ArrayView2<'_, f64>) -> MtResult<Array1<f64>>;
}

/// Builds a fresh, unfitted estimator from a sampled configuration.
pub type ModelFactory = Arc<dyn Fn(&ParamMap) -> MtResult<Box<dyn Estimator>> + Send + Sync>;

/// Shared shape checks for `fit`.
pub fn check_fit_input(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> MtResult<()> {
    if x.nrows() != y.len() {
        return Err(DataError::ShapeMismatch {
            message: format!("{} feature rows but {} targets", x.nrows(), y.len()),
        }
        .into());
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(DataError::InsufficientData {
            message: "cannot fit on an empty feature matrix".to_string(),
        }
        .into());
    }
    Ok(())
}

/// Shared shape checks for `predict`.
pub fn check_predict_input(n_features: usize, x: ArrayView2<'_, f64>) -> MtResult<()> {
    if x.ncols() != n_features {
        return Err(DataError::ShapeMismatch {
            message: format!("model was fitted on {n_features} features, got {}", x.ncols()),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mt_types::MtError;
    use ndarray::array;

    #[test]
    fn fit_input_rows_must_match() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        assert!(matches!(
            check_fit_input(x.view(), y.view()),
            Err(MtError::Data(DataError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn fit_input_must_not_be_empty() {
        let x = ndarray::Array2::<f64>::zeros((0, 2));
        let y = ndarray::Array1::<f64>::zeros(0);
        assert!(check_fit_input(x.view(), y.view()).is_err());
    }

    #[test]
    fn predict_input_width_must_match() {
        let x = array![[1.0, 2.0]];
        assert!(check_predict_input(2, x.view()).is_ok());
        assert!(check_predict_input(3, x.view()).is_err());
    }
}

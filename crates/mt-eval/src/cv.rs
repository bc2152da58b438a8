//! Cross-validated scoring.

use mt_models::Estimator;
use mt_types::{MtResult, ProblemType};
use ndarray::{ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use tracing::trace;

use crate::metrics::default_score;
use crate::split::Fold;

/// Fit a fresh estimator on every fold's training rows and score it on the
/// held-out rows. Folds run in parallel; scores come back in fold order.
pub fn cross_val_score<F>(
    build: F,
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    folds: &[Fold],
    problem: ProblemType,
) -> MtResult<Vec<f64>>
where
    F: Fn() -> MtResult<Box<dyn Estimator>> + Sync,
{
    folds
        .par_iter()
        .enumerate()
        .map(|(i, fold)| {
            let x_train = x.select(Axis(0), &fold.train);
            let y_train = y.select(Axis(0), &fold.train);
            let x_test = x.select(Axis(0), &fold.test);
            let y_test = y.select(Axis(0), &fold.test);

            let mut model = build()?;
            model.fit(x_train.view(), y_train.view())?;
            let predicted = model.predict(x_test.view())?;
            let score = default_score(problem, y_test.view(), predicted.view())?;
            trace!("fold {i}: {} scored {score:.4}", model.name());
            Ok(score)
        })
        .collect()
}

/// Arithmetic mean of fold scores; `None` for an empty slice.
pub fn mean_score(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

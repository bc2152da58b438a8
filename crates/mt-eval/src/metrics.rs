//! Regression and classification metrics.
//!
//! Report keys match the names downstream consumers already expect:
//! `R2`, `MAE`, `MSE`, `RMSE` for regression and `F1-Score`, `precision`,
//! `recall` for classification.

use std::collections::{BTreeMap, BTreeSet};

use mt_types::{DataError, MtResult, ProblemType};
use ndarray::ArrayView1;

/// Metric name → value.
pub type MetricReport = BTreeMap<String, f64>;

pub const R2: &str = "R2";
pub const MAE: &str = "MAE";
pub const MSE: &str = "MSE";
pub const RMSE: &str = "RMSE";
pub const F1_SCORE: &str = "F1-Score";
pub const PRECISION: &str = "precision";
pub const RECALL: &str = "recall";

fn check_lengths(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> MtResult<()> {
    if y_true.len() != y_pred.len() {
        return Err(DataError::ShapeMismatch {
            message: format!("{} true values but {} predictions", y_true.len(), y_pred.len()),
        }
        .into());
    }
    if y_true.is_empty() {
        return Err(DataError::InsufficientData {
            message: "cannot score an empty prediction set".to_string(),
        }
        .into());
    }
    Ok(())
}

/// Coefficient of determination.
///
/// A constant target scores 1.0 when predicted exactly and 0.0 otherwise.
pub fn r2_score(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> MtResult<f64> {
    check_lengths(y_true, y_pred)?;
    let mean = y_true.sum() / y_true.len() as f64;
    let ss_res: f64 = y_true.iter().zip(y_pred.iter()).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

pub fn mean_absolute_error(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> MtResult<f64> {
    check_lengths(y_true, y_pred)?;
    let total: f64 = y_true.iter().zip(y_pred.iter()).map(|(t, p)| (t - p).abs()).sum();
    Ok(total / y_true.len() as f64)
}

pub fn mean_squared_error(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> MtResult<f64> {
    check_lengths(y_true, y_pred)?;
    let total: f64 = y_true.iter().zip(y_pred.iter()).map(|(t, p)| (t - p).powi(2)).sum();
    Ok(total / y_true.len() as f64)
}

/// Fraction of exactly matching labels.
pub fn accuracy_score(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> MtResult<f64> {
    check_lengths(y_true, y_pred)?;
    let hits = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
    Ok(hits as f64 / y_true.len() as f64)
}

/// Support-weighted precision, recall and F1.
///
/// Labels are taken from both vectors. Per-label scores with a zero
/// denominator count as 0; labels absent from `y_true` carry zero weight.
pub fn precision_recall_f1(
    y_true: ArrayView1<'_, f64>,
    y_pred: ArrayView1<'_, f64>,
) -> MtResult<(f64, f64, f64)> {
    check_lengths(y_true, y_pred)?;

    let labels: BTreeSet<i64> = y_true
        .iter()
        .chain(y_pred.iter())
        .map(|&v| v as i64)
        .collect();

    let n = y_true.len() as f64;
    let (mut precision, mut recall, mut f1) = (0.0, 0.0, 0.0);
    for label in labels {
        let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            let (t, p) = (t as i64, p as i64);
            match (t == label, p == label) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }

        let support = (tp + fn_) as f64;
        if support == 0.0 {
            continue;
        }
        let p = if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 };
        let r = tp as f64 / support;
        let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };

        let weight = support / n;
        precision += weight * p;
        recall += weight * r;
        f1 += weight * f;
    }

    Ok((precision, recall, f1))
}

pub fn regression_metrics(
    y_true: ArrayView1<'_, f64>,
    y_pred: ArrayView1<'_, f64>,
) -> MtResult<MetricReport> {
    let mse = mean_squared_error(y_true, y_pred)?;
    let mut report = MetricReport::new();
    report.insert(R2.to_string(), r2_score(y_true, y_pred)?);
    report.insert(MAE.to_string(), mean_absolute_error(y_true, y_pred)?);
    report.insert(MSE.to_string(), mse);
    report.insert(RMSE.to_string(), mse.sqrt());
    Ok(report)
}

pub fn classification_metrics(
    y_true: ArrayView1<'_, f64>,
    y_pred: ArrayView1<'_, f64>,
) -> MtResult<MetricReport> {
    let (precision, recall, f1) = precision_recall_f1(y_true, y_pred)?;
    let mut report = MetricReport::new();
    report.insert(F1_SCORE.to_string(), f1);
    report.insert(PRECISION.to_string(), precision);
    report.insert(RECALL.to_string(), recall);
    Ok(report)
}

/// Full metric report for the problem type.
pub fn evaluate(
    problem: ProblemType,
    y_true: ArrayView1<'_, f64>,
    y_pred: ArrayView1<'_, f64>,
) -> MtResult<MetricReport> {
    match problem {
        ProblemType::Classification => classification_metrics(y_true, y_pred),
        ProblemType::Regression => regression_metrics(y_true, y_pred),
    }
}

/// The score cross-validation maximizes: accuracy or R².
pub fn default_score(
    problem: ProblemType,
    y_true: ArrayView1<'_, f64>,
    y_pred: ArrayView1<'_, f64>,
) -> MtResult<f64> {
    match problem {
        ProblemType::Classification => accuracy_score(y_true, y_pred),
        ProblemType::Regression => r2_score(y_true, y_pred),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mt_types::MtError;
    use ndarray::array;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn regression_report_values() {
        let y_true = array![3.0, -0.5, 2.0, 7.0];
        let y_pred = array![2.5, 0.0, 2.0, 8.0];
        let report = regression_metrics(y_true.view(), y_pred.view()).unwrap();

        assert!(close(report[MAE], 0.5));
        assert!(close(report[MSE], 0.375));
        assert!(close(report[RMSE], 0.375_f64.sqrt()));
        assert!(close(report[R2], 0.948_608_137_044_967_9));
    }

    #[test]
    fn r2_of_constant_target() {
        let y = array![2.0, 2.0, 2.0];
        assert_eq!(r2_score(y.view(), y.view()).unwrap(), 1.0);
        assert_eq!(r2_score(y.view(), array![2.0, 2.0, 3.0].view()).unwrap(), 0.0);
    }

    #[test]
    fn weighted_classification_scores() {
        let y_true = array![0.0, 1.0, 2.0, 0.0, 1.0, 2.0];
        let y_pred = array![0.0, 2.0, 1.0, 0.0, 0.0, 1.0];
        let report = classification_metrics(y_true.view(), y_pred.view()).unwrap();

        // label 0: p=2/3 r=1 f=0.8; labels 1 and 2 score zero; equal support.
        assert!(close(report[PRECISION], 2.0 / 9.0));
        assert!(close(report[RECALL], 1.0 / 3.0));
        assert!(close(report[F1_SCORE], 0.8 / 3.0));
    }

    #[test]
    fn perfect_classification() {
        let y = array![1.0, 0.0, 1.0, 1.0];
        let report = classification_metrics(y.view(), y.view()).unwrap();
        assert_eq!(report[F1_SCORE], 1.0);
        assert_eq!(report[PRECISION], 1.0);
        assert_eq!(report[RECALL], 1.0);
        assert_eq!(accuracy_score(y.view(), y.view()).unwrap(), 1.0);
    }

    #[test]
    fn accuracy_counts_matches() {
        let y_true = array![0.0, 1.0, 1.0, 0.0];
        let y_pred = array![0.0, 1.0, 0.0, 0.0];
        assert_eq!(accuracy_score(y_true.view(), y_pred.view()).unwrap(), 0.75);
        assert_eq!(
            default_score(ProblemType::Classification, y_true.view(), y_pred.view()).unwrap(),
            0.75
        );
    }

    #[test]
    fn report_keys_follow_problem_type() {
        let y = array![1.0, 2.0, 3.0];
        let regression = evaluate(ProblemType::Regression, y.view(), y.view()).unwrap();
        assert_eq!(
            regression.keys().map(String::as_str).collect::<Vec<_>>(),
            vec![MAE, MSE, R2, RMSE]
        );
        let classification = evaluate(ProblemType::Classification, y.view(), y.view()).unwrap();
        assert_eq!(
            classification.keys().map(String::as_str).collect::<Vec<_>>(),
            vec![F1_SCORE, PRECISION, RECALL]
        );
    }

    #[test]
    fn mismatched_lengths_fail() {
        let err = mean_squared_error(array![1.0, 2.0].view(), array![1.0].view()).unwrap_err();
        assert!(matches!(err, MtError::Data(DataError::ShapeMismatch { .. })));
        let empty = ndarray::Array1::<f64>::zeros(0);
        assert!(r2_score(empty.view(), empty.view()).is_err());
    }
}

//! # mt-eval
//!
//! Evaluation helpers used by the tuner: regression and classification
//! metrics, shuffled train/test splitting, k-fold splitters with the
//! dataset-size fold lookup, and parallel cross-validated scoring.

mod cv;
mod metrics;
mod split;

pub use cv::{cross_val_score, mean_score};
pub use metrics::{
    accuracy_score, classification_metrics, default_score, evaluate, mean_absolute_error,
    mean_squared_error, precision_recall_f1, r2_score, regression_metrics, MetricReport,
    F1_SCORE, MAE, MSE, PRECISION, R2, RECALL, RMSE,
};
pub use split::{
    folds_for, kfold, kfold_count, stratified_kfold, train_test_split, Fold, TrainTestSplit,
};

//! # mt-models
//!
//! The [`Estimator`] abstraction every tunable model implements, plus a few
//! built-in estimators so tuning works without an external ML library.

mod estimator;
mod knn;
mod linear;
mod naive_bayes;

pub use estimator::{check_fit_input, check_predict_input, Estimator, ModelFactory};
pub use knn::{KNeighbors, NeighborWeights};
pub use linear::RidgeRegression;
pub use naive_bayes::GaussianNb;

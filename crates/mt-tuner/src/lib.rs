//! # mt-tuner
//!
//! Hyperparameter tuning for a model picked by an upstream selection step.
//!
//! [`tune_model`] looks up the model's parameter space in a [`ModelRegistry`],
//! runs a cross-validated [`Study`](mt_optimizer::Study) with early stopping,
//! reports hold-out metrics for the best configuration and returns that
//! configuration retrained on the full dataset.

mod config;
mod registry;
mod tuner;

pub use config::TunerConfig;
pub use registry::{ModelEntry, ModelRegistry};
pub use tuner::{tune_model, CrossValObjective, TunedModel, Tuner};

pub use mt_eval::MetricReport;
pub use mt_optimizer::EarlyStoppingConfig;
pub use mt_types::{Dataset, MtError, MtResult, ProblemType};

//! # mt-optimizer
//!
//! Parameter search and trial orchestration for modeltune.
//!
//! Provides search space definitions (including the JSON datatype encoding
//! used by the model registry), sweep strategies (grid, random, Bayesian),
//! trial tracking, the parallel [`Study`] loop and the plateau-aware
//! [`EarlyStopping`] callback.

mod early_stop;
mod search;
mod study;
mod trial;

pub use early_stop::{EarlyStopper, EarlyStopping, EarlyStoppingConfig, StopDecision};
pub use mt_types::{ParamMap, ParameterValue};
pub use search::{
    build_strategy, BayesianSearch, GridSearch, ParameterDef, ParameterKind, RandomSearch,
    SearchSpace, SearchStrategy,
};
pub use study::{Objective, Study, StudyCallback};
pub use trial::{
    ObjectiveDirection, OptimizationConfig, OptimizationId, OptimizationState, OptimizationStatus,
    Trial, TrialResult, TrialStatus,
};

//! The tuning workflow: search, early stopping, hold-out metrics and the
//! final retrain on the full dataset.

use mt_eval::{
    cross_val_score, evaluate, folds_for, kfold_count, mean_score, train_test_split, Fold,
    MetricReport,
};
use mt_models::Estimator;
use mt_optimizer::{
    EarlyStopping, Objective, ObjectiveDirection, OptimizationConfig, Study, TrialResult,
};
use mt_types::{Dataset, ModelError, MtResult, ParamMap, ProblemType};
use ndarray::{ArrayView1, ArrayView2};
use tracing::{debug, error, info};

use crate::config::TunerConfig;
use crate::registry::{ModelEntry, ModelRegistry};

/// Outcome of a tuning run.
#[derive(Debug)]
pub struct TunedModel {
    /// Best configuration retrained on every row of the dataset.
    pub model: Box<dyn Estimator>,
    pub best_params: ParamMap,
    /// Mean cross-validated score of the best trial.
    pub best_score: f64,
    /// Hold-out metrics of the best configuration.
    pub metrics: MetricReport,
    pub trials_completed: usize,
    pub trials_failed: usize,
    pub stopped_early: bool,
}

/// Objective scoring one configuration by k-fold cross-validation.
pub struct CrossValObjective<'a> {
    entry: &'a ModelEntry,
    x: ArrayView2<'a, f64>,
    y: ArrayView1<'a, f64>,
    folds: Vec<Fold>,
    problem: ProblemType,
}

impl<'a> CrossValObjective<'a> {
    pub fn new(
        entry: &'a ModelEntry,
        x: ArrayView2<'a, f64>,
        y: ArrayView1<'a, f64>,
        folds: Vec<Fold>,
        problem: ProblemType,
    ) -> Self {
        Self {
            entry,
            x,
            y,
            folds,
            problem,
        }
    }

    pub fn folds(&self) -> &[Fold] {
        &self.folds
    }
}

impl Objective for CrossValObjective<'_> {
    fn evaluate(&self, params: &ParamMap) -> MtResult<f64> {
        let scores = cross_val_score(
            || self.entry.build(params),
            self.x,
            self.y,
            &self.folds,
            self.problem,
        )?;
        mean_score(&scores).ok_or_else(|| mt_types::internal_error!("no folds to score"))
    }
}

/// Runs tuning jobs against a fixed registry and configuration.
#[derive(Debug, Clone)]
pub struct Tuner {
    registry: ModelRegistry,
    config: TunerConfig,
}

impl Tuner {
    pub fn new(registry: ModelRegistry, config: TunerConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn tune(
        &self,
        dataset: &Dataset,
        target: &str,
        model_key: &str,
        problem_type: ProblemType,
    ) -> MtResult<TunedModel> {
        tune_model(dataset, target, model_key, &self.registry, problem_type, &self.config)
    }
}

/// Tune `model_key` on `dataset` to predict `target`.
///
/// Searches the model's registered parameter space, scoring each
/// configuration by cross-validated accuracy (classification) or R²
/// (regression), then fits the best configuration on a shuffled hold-out
/// split for the reported metrics and finally on the full data.
pub fn tune_model(
    dataset: &Dataset,
    target: &str,
    model_key: &str,
    registry: &ModelRegistry,
    problem_type: ProblemType,
    config: &TunerConfig,
) -> MtResult<TunedModel> {
    run_tuning(dataset, target, model_key, registry, problem_type, config)
        .inspect_err(|e| error!("Tuning {model_key} on {target} failed: {e}"))
}

fn run_tuning(
    dataset: &Dataset,
    target: &str,
    model_key: &str,
    registry: &ModelRegistry,
    problem_type: ProblemType,
    config: &TunerConfig,
) -> MtResult<TunedModel> {
    config.validate()?;

    let entry = registry.get(model_key)?;
    if entry.problem_type != problem_type {
        return Err(ModelError::ProblemTypeMismatch {
            model: model_key.to_string(),
            expected: entry.problem_type.to_string(),
            actual: problem_type.to_string(),
        }
        .into());
    }

    let (x, y) = dataset.split_target(target)?;
    problem_type.check_target(y.view())?;

    let n_folds = match config.cv_folds {
        Some(k) => k,
        None => kfold_count(y.len())?,
    };
    let folds = folds_for(problem_type, y.view(), n_folds)?;
    debug!("Scoring {model_key} with {} folds over {} rows", folds.len(), y.len());

    let metric = match problem_type {
        ProblemType::Classification => "accuracy",
        ProblemType::Regression => "r2",
    };
    let optimization = OptimizationConfig::new(
        format!("tune-{model_key}"),
        entry.search_space.clone(),
        &config.strategy,
    )
    .with_max_trials(config.n_trials)
    .with_concurrency(config.concurrency)
    .with_objective(metric, ObjectiveDirection::Maximize)
    .with_exploration_weight(config.exploration_weight)
    .with_grid_steps(config.grid_steps)
    .with_seed(config.seed);

    let mut study = Study::new(optimization)?;
    if let Some(early_stopping) = config.early_stopping {
        study = study.with_callback(EarlyStopping::new(early_stopping));
    }

    info!(
        "Tuning {model_key} ({problem_type}) over {} parameters, up to {} trials",
        entry.search_space.len(),
        config.n_trials
    );
    let objective = CrossValObjective::new(entry, x.view(), y.view(), folds, problem_type);
    let status = study.optimize(&objective)?;
    let TrialResult {
        objective: best_score,
        parameters: best_params,
        ..
    } = study.best_trial()?;

    let split = train_test_split(x.view(), y.view(), config.test_size, config.split_seed)?;
    let mut holdout_model = entry.build(&best_params)?;
    holdout_model.fit(split.x_train.view(), split.y_train.view())?;
    let predicted = holdout_model.predict(split.x_test.view())?;
    let metrics = evaluate(problem_type, split.y_test.view(), predicted.view())?;

    let mut model = entry.build(&best_params)?;
    model.fit(x.view(), y.view())?;

    info!(
        "Best {metric} for {model_key}: {best_score:.4} after {} trials ({} failed)",
        status.trials_completed, status.trials_failed
    );
    for (name, value) in &metrics {
        debug!("hold-out {name}: {value:.4}");
    }

    Ok(TunedModel {
        model,
        best_params,
        best_score,
        metrics,
        trials_completed: status.trials_completed,
        trials_failed: status.trials_failed,
        stopped_early: status.stopped_early,
    })
}

//! The optimization loop: ask the strategy for configurations, evaluate
//! them on a worker pool, track the best trial and let callbacks stop the run.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};

use mt_types::{MtResult, ParamMap, SearchError};
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::search::{build_strategy, SearchStrategy};
use crate::trial::{OptimizationConfig, OptimizationStatus, Trial, TrialResult};

/// The function being optimized. Called concurrently from worker threads.
pub trait Objective: Sync {
    fn evaluate(&self, params: &ParamMap) -> MtResult<f64>;
}

impl<F> Objective for F
where
    F: Fn(&ParamMap) -> MtResult<f64> + Sync,
{
    fn evaluate(&self, params: &ParamMap) -> MtResult<f64> {
        self(params)
    }
}

/// Hook invoked after every successfully completed trial.
///
/// Invocations are serialized by the study, and `status` already reflects
/// the trial that just finished. Returning `ControlFlow::Break` asks the study
/// to stop: trials that have not started yet are skipped, running ones finish.
pub trait StudyCallback: Send + Sync {
    fn on_trial_complete(&self, status: &OptimizationStatus, result: &TrialResult) -> ControlFlow<()>;

    fn name(&self) -> &str {
        "callback"
    }
}

impl<F> StudyCallback for F
where
    F: Fn(&OptimizationStatus, &TrialResult) -> ControlFlow<()> + Send + Sync,
{
    fn on_trial_complete(&self, status: &OptimizationStatus, result: &TrialResult) -> ControlFlow<()> {
        self(status, result)
    }
}

/// One optimization session over many trials.
pub struct Study {
    status: Mutex<OptimizationStatus>,
    strategy: Mutex<Box<dyn SearchStrategy>>,
    callbacks: Vec<Box<dyn StudyCallback>>,
    trials: Mutex<Vec<Trial>>,
    stop_requested: AtomicBool,
}

impl Study {
    /// Create a study using the strategy named in `config`.
    pub fn new(config: OptimizationConfig) -> MtResult<Self> {
        if config.max_trials == 0 {
            return Err(mt_types::config_error!("max_trials must be at least 1"));
        }
        let strategy = build_strategy(
            &config.strategy,
            config.search_space.clone(),
            config.exploration_weight,
            config.grid_steps,
            config.seed,
        )?;

        Ok(Self {
            status: Mutex::new(OptimizationStatus::new(config)),
            strategy: Mutex::new(strategy),
            callbacks: Vec::new(),
            trials: Mutex::new(Vec::new()),
            stop_requested: AtomicBool::new(false),
        })
    }

    /// Replace the configured strategy.
    pub fn with_strategy(self, strategy: Box<dyn SearchStrategy>) -> Self {
        *self.strategy.lock() = strategy;
        self
    }

    pub fn with_callback(mut self, callback: impl StudyCallback + 'static) -> Self {
        self.callbacks.push(Box::new(callback));
        self
    }

    /// Ask the running optimization to stop after in-flight trials.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> OptimizationStatus {
        self.status.lock().clone()
    }

    /// Every trial launched so far, in completion-batch order.
    pub fn trials(&self) -> Vec<Trial> {
        self.trials.lock().clone()
    }

    pub fn best_trial(&self) -> MtResult<TrialResult> {
        let status = self.status.lock();
        status.best_trial.clone().ok_or_else(|| {
            SearchError::NoCompletedTrials {
                attempted: status.trials_completed + status.trials_failed,
            }
            .into()
        })
    }

    pub fn best_value(&self) -> MtResult<f64> {
        Ok(self.best_trial()?.objective)
    }

    pub fn best_params(&self) -> MtResult<ParamMap> {
        Ok(self.best_trial()?.parameters)
    }

    /// Run up to `max_trials` trials of `objective`, `concurrency` at a time.
    ///
    /// Calling it again resumes the study: a previous stop request is cleared,
    /// the strategy keeps its state and trial numbers continue.
    /// Fails with [`SearchError::NoCompletedTrials`] when no trial has ever
    /// completed.
    pub fn optimize<O: Objective + ?Sized>(&self, objective: &O) -> MtResult<OptimizationStatus> {
        self.stop_requested.store(false, Ordering::SeqCst);
        let first_trial = self.trials.lock().len();
        let (optimization_id, name, metric, max_trials, workers) = {
            let mut status = self.status.lock();
            status.mark_running();
            status.stopped_early = false;
            let config = &status.config;
            let workers = if config.concurrency == 0 {
                rayon::current_num_threads()
            } else {
                config.concurrency
            };
            (
                config.id,
                config.name.clone(),
                config.objective_metric.clone(),
                config.max_trials,
                workers,
            )
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("mt-trial-{i}"))
            .build()
            .map_err(|e| SearchError::WorkerPool {
                message: e.to_string(),
            })?;

        info!(
            "Starting study {name}: {} strategy optimizing {metric}, up to {max_trials} trials on {workers} workers",
            self.strategy.lock().name()
        );

        let mut launched = 0;
        while launched < max_trials && !self.is_stop_requested() {
            let batch_size = workers.min(max_trials - launched);
            let suggestions = self.strategy.lock().suggest(batch_size);
            if suggestions.is_empty() {
                debug!("Search space exhausted after {launched} trials");
                break;
            }

            let batch: Vec<Trial> = suggestions
                .into_iter()
                .enumerate()
                .map(|(i, params)| Trial::new(optimization_id, first_trial + launched + i, params))
                .collect();
            launched += batch.len();

            let finished: Vec<Trial> = pool.install(|| {
                batch
                    .into_par_iter()
                    .map(|trial| self.run_trial(trial, objective))
                    .collect()
            });

            {
                let mut strategy = self.strategy.lock();
                for trial in &finished {
                    if let Some(result) = &trial.result {
                        strategy.report(&trial.parameters, result.objective);
                    }
                }
            }
            self.trials.lock().extend(finished);
        }

        let mut status = self.status.lock();
        if status.best_trial.is_none() {
            let err = SearchError::NoCompletedTrials { attempted: launched };
            error!("Study {name} failed: {err}");
            status.mark_failed(err.to_string());
            return Err(err.into());
        }

        status.mark_completed();
        info!(
            "Study {name} finished: {} completed, {} failed, best {metric} {:.4}{}",
            status.trials_completed,
            status.trials_failed,
            status.best_value().unwrap_or(f64::NAN),
            if status.stopped_early { " (stopped early)" } else { "" }
        );
        Ok(status.clone())
    }

    fn run_trial<O: Objective + ?Sized>(&self, mut trial: Trial, objective: &O) -> Trial {
        if self.is_stop_requested() {
            trial.mark_skipped();
            return trial;
        }

        trial.mark_running(rayon::current_thread_index().map(|i| format!("worker-{i}")));
        self.status.lock().trials_running += 1;

        let outcome = objective.evaluate(&trial.parameters);

        let mut status = self.status.lock();
        status.trials_running -= 1;

        let value = match outcome {
            Ok(value) if value.is_finite() => value,
            Ok(value) => {
                warn!("Trial {} returned a non-finite score {value}", trial.trial_number);
                status.trials_failed += 1;
                trial.mark_failed(format!("objective returned {value}"));
                return trial;
            }
            Err(e) => {
                warn!("Trial {} failed: {e}", trial.trial_number);
                status.trials_failed += 1;
                trial.mark_failed(e.to_string());
                return trial;
            }
        };

        let result = TrialResult {
            trial_id: trial.id,
            trial_number: trial.trial_number,
            objective: value,
            parameters: trial.parameters.clone(),
        };
        status.trials_completed += 1;
        if status.update_best(&result) {
            debug!("Trial {} is the new best: {value:.4}", trial.trial_number);
        } else {
            debug!("Trial {} scored {value:.4}", trial.trial_number);
        }

        for callback in &self.callbacks {
            if callback.on_trial_complete(&status, &result).is_break() {
                debug!("Callback {} requested a stop", callback.name());
                self.stop_requested.store(true, Ordering::SeqCst);
                status.stopped_early = true;
            }
        }

        trial.mark_completed(result);
        trial
    }
}

//! Trial tracking and optimization run management.

use chrono::{DateTime, Utc};
use mt_types::ParamMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::search::SearchSpace;

/// Unique optimization run identifier.
pub type OptimizationId = Uuid;

/// Whether we are maximizing or minimizing the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ObjectiveDirection {
    #[default]
    Maximize,
    Minimize,
}

impl ObjectiveDirection {
    /// True when `candidate` is strictly better than `incumbent`.
    pub fn improves(&self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Maximize => candidate > incumbent,
            Self::Minimize => candidate < incumbent,
        }
    }
}

/// Top-level configuration for an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationConfig {
    pub id: OptimizationId,
    pub name: String,
    pub description: String,

    /// The parameter search space.
    pub search_space: SearchSpace,

    /// Which search strategy to use: "grid", "random", or "bayesian".
    pub strategy: String,

    /// Maximum number of trials to run.
    pub max_trials: usize,

    /// How many trials to run in parallel.
    pub concurrency: usize,

    /// Metric name to optimize (e.g. "accuracy", "r2").
    pub objective_metric: String,

    /// Direction of optimization.
    pub direction: ObjectiveDirection,

    /// Exploration weight for Bayesian search (ignored for grid/random).
    pub exploration_weight: f64,

    /// Number of steps per continuous dimension for grid search.
    pub grid_steps: usize,

    /// Seed for the search strategy's sampler.
    pub seed: Option<u64>,

    pub created_at: DateTime<Utc>,
}

impl OptimizationConfig {
    pub fn new(name: String, search_space: SearchSpace, strategy: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description: String::new(),
            search_space,
            strategy: strategy.to_string(),
            max_trials: 50,
            concurrency: 4,
            objective_metric: "accuracy".to_string(),
            direction: ObjectiveDirection::Maximize,
            exploration_weight: 0.3,
            grid_steps: 5,
            seed: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_max_trials(mut self, n: usize) -> Self {
        self.max_trials = n;
        self
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    pub fn with_objective(mut self, metric: &str, direction: ObjectiveDirection) -> Self {
        self.objective_metric = metric.to_string();
        self.direction = direction;
        self
    }

    pub fn with_exploration_weight(mut self, weight: f64) -> Self {
        self.exploration_weight = weight;
        self
    }

    pub fn with_grid_steps(mut self, steps: usize) -> Self {
        self.grid_steps = steps;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

/// Lifecycle state for an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Aggregate status of an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationStatus {
    pub id: OptimizationId,
    pub config: OptimizationConfig,
    pub state: OptimizationState,
    pub trials_completed: usize,
    pub trials_failed: usize,
    pub trials_running: usize,
    pub best_trial: Option<TrialResult>,
    /// Set when a callback halted the run before `max_trials`.
    pub stopped_early: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl OptimizationStatus {
    pub fn new(config: OptimizationConfig) -> Self {
        Self {
            id: config.id,
            config,
            state: OptimizationState::Pending,
            trials_completed: 0,
            trials_failed: 0,
            trials_running: 0,
            best_trial: None,
            stopped_early: false,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = OptimizationState::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        self.state = OptimizationState::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = OptimizationState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    /// Objective of the best trial so far.
    pub fn best_value(&self) -> Option<f64> {
        self.best_trial.as_ref().map(|t| t.objective)
    }

    /// Update the best trial if `result` improves on the current best.
    /// Returns whether it did.
    pub fn update_best(&mut self, result: &TrialResult) -> bool {
        let improved = match &self.best_trial {
            None => true,
            Some(current_best) => self
                .config
                .direction
                .improves(result.objective, current_best.objective),
        };
        if improved {
            self.best_trial = Some(result.clone());
        }
        improved
    }
}

// ---------------------------------------------------------------------------
// Individual trial
// ---------------------------------------------------------------------------

/// A single trial (one sampled configuration evaluated by the objective).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub id: Uuid,
    pub optimization_id: OptimizationId,
    pub trial_number: usize,
    pub parameters: ParamMap,
    pub status: TrialStatus,
    pub result: Option<TrialResult>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub worker_id: Option<String>,
    pub error: Option<String>,
}

impl Trial {
    pub fn new(optimization_id: OptimizationId, trial_number: usize, parameters: ParamMap) -> Self {
        Self {
            id: Uuid::new_v4(),
            optimization_id,
            trial_number,
            parameters,
            status: TrialStatus::Pending,
            result: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            worker_id: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self, worker_id: Option<String>) {
        self.status = TrialStatus::Running;
        self.started_at = Some(Utc::now());
        self.worker_id = worker_id;
    }

    pub fn mark_completed(&mut self, result: TrialResult) {
        self.status = TrialStatus::Completed;
        self.finished_at = Some(Utc::now());
        self.result = Some(result);
    }

    pub fn mark_failed(&mut self, error: String) {
        self.status = TrialStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    /// The run was stopped before this trial started.
    pub fn mark_skipped(&mut self) {
        self.status = TrialStatus::Skipped;
        self.finished_at = Some(Utc::now());
    }

    /// Wall time between start and finish, if both are known.
    pub fn duration_ms(&self) -> Option<u64> {
        let elapsed = self.finished_at? - self.started_at?;
        elapsed.num_milliseconds().try_into().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// Result of a single trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial_id: Uuid,
    pub trial_number: usize,
    pub objective: f64,
    pub parameters: ParamMap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchSpace;
    use mt_types::ParameterValue;

    fn sample_config() -> OptimizationConfig {
        let space = SearchSpace::new()
            .add_int("n_neighbors", 1, 15)
            .add_float("alpha", 0.5, 1.0);

        OptimizationConfig::new("test_opt".into(), space, "random")
            .with_max_trials(50)
            .with_concurrency(4)
            .with_objective("accuracy", ObjectiveDirection::Maximize)
    }

    fn result(objective: f64) -> TrialResult {
        TrialResult {
            trial_id: Uuid::new_v4(),
            trial_number: 0,
            objective,
            parameters: ParamMap::new(),
        }
    }

    #[test]
    fn optimization_status_lifecycle() {
        let config = sample_config();
        let mut status = OptimizationStatus::new(config);

        assert_eq!(status.state, OptimizationState::Pending);
        assert!(status.started_at.is_none());

        status.mark_running();
        assert_eq!(status.state, OptimizationState::Running);
        assert!(status.started_at.is_some());

        status.mark_completed();
        assert_eq!(status.state, OptimizationState::Completed);
        assert!(status.finished_at.is_some());
    }

    #[test]
    fn best_trial_tracking_maximize() {
        let mut status = OptimizationStatus::new(sample_config());
        assert_eq!(status.best_value(), None);

        assert!(status.update_best(&result(0.85)));
        assert_eq!(status.best_value(), Some(0.85));

        assert!(status.update_best(&result(0.91)));
        assert_eq!(status.best_value(), Some(0.91));

        // Worse or equal results should not replace
        assert!(!status.update_best(&result(0.70)));
        assert!(!status.update_best(&result(0.91)));
        assert_eq!(status.best_value(), Some(0.91));
    }

    #[test]
    fn best_trial_tracking_minimize() {
        let space = SearchSpace::new().add_float("x", 0.0, 1.0);
        let config = OptimizationConfig::new("min_test".into(), space, "random")
            .with_objective("mse", ObjectiveDirection::Minimize);
        let mut status = OptimizationStatus::new(config);

        status.update_best(&result(0.15));
        assert_eq!(status.best_value(), Some(0.15));

        status.update_best(&result(0.05));
        assert_eq!(status.best_value(), Some(0.05));
    }

    #[test]
    fn trial_lifecycle() {
        let opt_id = Uuid::new_v4();
        let mut params = ParamMap::new();
        params.insert("n_neighbors".into(), ParameterValue::Int(10));

        let mut trial = Trial::new(opt_id, 1, params.clone());
        assert_eq!(trial.status, TrialStatus::Pending);

        trial.mark_running(Some("worker-0".into()));
        assert_eq!(trial.status, TrialStatus::Running);
        assert_eq!(trial.worker_id.as_deref(), Some("worker-0"));

        let result = TrialResult {
            trial_id: trial.id,
            trial_number: 1,
            objective: 0.93,
            parameters: params,
        };
        trial.mark_completed(result);
        assert_eq!(trial.status, TrialStatus::Completed);
        assert!(trial.finished_at.is_some());
        assert!(trial.duration_ms().is_some());
        assert_eq!(trial.result.as_ref().unwrap().objective, 0.93);
    }

    #[test]
    fn trial_failure() {
        let mut trial = Trial::new(Uuid::new_v4(), 0, ParamMap::new());
        trial.mark_running(None);
        trial.mark_failed("model construction failed".into());
        assert_eq!(trial.status, TrialStatus::Failed);
        assert_eq!(trial.error.as_deref(), Some("model construction failed"));
    }

    #[test]
    fn skipped_trial_has_no_duration() {
        let mut trial = Trial::new(Uuid::new_v4(), 3, ParamMap::new());
        trial.mark_skipped();
        assert_eq!(trial.status, TrialStatus::Skipped);
        assert_eq!(trial.duration_ms(), None);
    }
}

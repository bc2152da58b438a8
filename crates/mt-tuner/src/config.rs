//! Tuning run configuration.

use std::path::Path;

use mt_optimizer::EarlyStoppingConfig;
use mt_types::MtResult;
use serde::{Deserialize, Serialize};

/// Everything that shapes a tuning run apart from the data and the model.
///
/// All fields have defaults, so a JSON document only needs the keys it
/// changes: `{"n_trials": 20, "strategy": "random"}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Upper bound on optimization trials.
    pub n_trials: usize,
    /// Trials evaluated in parallel; 0 uses rayon's thread count.
    pub concurrency: usize,
    /// "grid", "random" or "bayesian".
    pub strategy: String,
    pub exploration_weight: f64,
    pub grid_steps: usize,
    /// Seed for the search strategy.
    pub seed: Option<u64>,
    /// Fold count override; `None` picks it from the dataset size.
    pub cv_folds: Option<usize>,
    /// Hold-out fraction used for the reported metrics.
    pub test_size: f64,
    pub split_seed: u64,
    /// `None` disables early stopping.
    pub early_stopping: Option<EarlyStoppingConfig>,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            n_trials: 50,
            concurrency: 0,
            strategy: "bayesian".to_string(),
            exploration_weight: 0.3,
            grid_steps: 5,
            seed: None,
            cv_folds: None,
            test_size: 0.2,
            split_seed: 123,
            early_stopping: Some(EarlyStoppingConfig::default()),
        }
    }
}

impl TunerConfig {
    pub fn with_trials(mut self, n_trials: usize) -> Self {
        self.n_trials = n_trials;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_strategy(mut self, strategy: &str) -> Self {
        self.strategy = strategy.to_string();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = Some(folds);
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_early_stopping(mut self, early_stopping: Option<EarlyStoppingConfig>) -> Self {
        self.early_stopping = early_stopping;
        self
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> MtResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> MtResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> MtResult<()> {
        if self.n_trials == 0 {
            return Err(mt_types::config_error!("n_trials must be at least 1"));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(mt_types::config_error!(
                "test_size must lie in (0, 1), got {}",
                self.test_size
            ));
        }
        if matches!(self.cv_folds, Some(k) if k < 2) {
            return Err(mt_types::config_error!("cv_folds must be at least 2"));
        }
        if !(self.exploration_weight.is_finite() && (0.0..=1.0).contains(&self.exploration_weight)) {
            return Err(mt_types::config_error!(
                "exploration_weight must lie in [0, 1], got {}",
                self.exploration_weight
            ));
        }
        if let Some(early_stopping) = &self.early_stopping {
            early_stopping.validate()?;
        }
        Ok(())
    }
}

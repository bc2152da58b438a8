//! Early stopping on the study's running best score.
//!
//! The stopper watches the best objective value after every completed trial
//! and halts the run once the score is good enough, or once it has sat on a
//! "good but not perfect" plateau for too long:
//!
//! - best `>= target` stops immediately;
//! - best in `[floor, target)` that has not improved for `patience`
//!   consecutive observations stops on the next non-improving one.
//!
//! Scores below `floor` never trigger the plateau rule.

use std::ops::ControlFlow;

use mt_types::MtResult;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::study::StudyCallback;
use crate::trial::{OptimizationStatus, TrialResult};

/// Thresholds for [`EarlyStopper`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarlyStoppingConfig {
    /// Stop as soon as the best score reaches this value.
    pub target: f64,
    /// Lower edge of the plateau band `[floor, target)`.
    pub floor: f64,
    /// Non-improving observations tolerated inside the plateau band.
    pub patience: usize,
}

impl Default for EarlyStoppingConfig {
    fn default() -> Self {
        Self {
            target: 0.99,
            floor: 0.90,
            patience: 10,
        }
    }
}

impl EarlyStoppingConfig {
    pub fn validate(&self) -> MtResult<()> {
        if !(self.floor.is_finite() && self.target.is_finite()) {
            return Err(mt_types::config_error!("early stopping thresholds must be finite"));
        }
        if self.floor >= self.target {
            return Err(mt_types::config_error!(
                "early stopping floor {} must be below target {}",
                self.floor,
                self.target
            ));
        }
        Ok(())
    }
}

/// Outcome of one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopDecision {
    Continue,
    TargetReached,
    Plateaued,
}

impl StopDecision {
    pub fn should_stop(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// State machine over the running best score.
#[derive(Debug, Clone)]
pub struct EarlyStopper {
    config: EarlyStoppingConfig,
    reference: Option<f64>,
    stalled: usize,
}

impl EarlyStopper {
    pub fn new(config: EarlyStoppingConfig) -> Self {
        Self {
            config,
            reference: None,
            stalled: 0,
        }
    }

    pub fn config(&self) -> &EarlyStoppingConfig {
        &self.config
    }

    /// Consecutive non-improving observations inside the plateau band.
    pub fn stalled(&self) -> usize {
        self.stalled
    }

    /// Best score the stall count is measured against.
    pub fn reference(&self) -> Option<f64> {
        self.reference
    }

    pub fn reset(&mut self) {
        self.reference = None;
        self.stalled = 0;
    }

    /// Feed the current running best.
    pub fn observe(&mut self, best: f64) -> StopDecision {
        let reference = *self.reference.get_or_insert(best);

        if best > reference {
            self.reference = Some(best);
            self.stalled = 0;
        }

        if best >= self.config.target {
            return StopDecision::TargetReached;
        }
        if best > reference {
            return StopDecision::Continue;
        }

        if best >= self.config.floor {
            if self.stalled < self.config.patience {
                self.stalled += 1;
            } else {
                self.reset();
                return StopDecision::Plateaued;
            }
        }
        StopDecision::Continue
    }
}

/// Study callback wrapping an [`EarlyStopper`].
///
/// Completions can arrive from several workers; the stopper sits behind a
/// mutex so observations are applied one at a time.
#[derive(Debug)]
pub struct EarlyStopping {
    stopper: Mutex<EarlyStopper>,
}

impl EarlyStopping {
    pub fn new(config: EarlyStoppingConfig) -> Self {
        Self {
            stopper: Mutex::new(EarlyStopper::new(config)),
        }
    }
}

impl Default for EarlyStopping {
    fn default() -> Self {
        Self::new(EarlyStoppingConfig::default())
    }
}

impl StudyCallback for EarlyStopping {
    fn on_trial_complete(&self, status: &OptimizationStatus, result: &TrialResult) -> ControlFlow<()> {
        let Some(best) = status.best_value() else {
            return ControlFlow::Continue(());
        };

        let mut stopper = self.stopper.lock();
        match stopper.observe(best) {
            StopDecision::Continue => ControlFlow::Continue(()),
            StopDecision::TargetReached => {
                info!(
                    "Stopping after trial {}: best score {best:.4} reached target {}",
                    result.trial_number,
                    stopper.config().target
                );
                ControlFlow::Break(())
            }
            StopDecision::Plateaued => {
                info!(
                    "Stopping after trial {}: best score {best:.4} unchanged for {} trials",
                    result.trial_number,
                    stopper.config().patience
                );
                ControlFlow::Break(())
            }
        }
    }

    fn name(&self) -> &str {
        "early_stopping"
    }
}

//! Search space definitions and parameter sweep strategies.

use mt_types::{MtResult, ParamMap, ParameterValue, SearchError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single parameter dimension in the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Parameter name as the model constructor expects it (e.g. "n_neighbors").
    pub name: String,
    /// The kind of search range.
    pub kind: ParameterKind,
}

/// Describes how a parameter is sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Continuous uniform range [low, high].
    FloatRange { low: f64, high: f64 },
    /// Integer range [low, high] inclusive.
    IntRange { low: i64, high: i64 },
    /// Log-uniform range (sampled in log-space then exponentiated).
    LogUniform { low: f64, high: f64 },
    /// Categorical choices.
    Choice { values: Vec<serde_json::Value> },
}

/// The full search space: an ordered list of parameter definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub parameters: Vec<ParameterDef>,
}

fn invalid_spec(parameter: &str, message: impl Into<String>) -> SearchError {
    SearchError::InvalidSpec {
        parameter: parameter.to_string(),
        message: message.into(),
    }
}

fn invalid_range(parameter: &str, message: impl Into<String>) -> SearchError {
    SearchError::InvalidRange {
        parameter: parameter.to_string(),
        message: message.into(),
    }
}

fn bounds(name: &str, arg: &serde_json::Value) -> MtResult<(f64, f64)> {
    match arg.as_array().map(Vec::as_slice) {
        Some([low, high]) => match (low.as_f64(), high.as_f64()) {
            (Some(low), Some(high)) => Ok((low, high)),
            _ => Err(invalid_spec(name, "bounds must be numbers").into()),
        },
        _ => Err(invalid_spec(name, "expected a [low, high] pair").into()),
    }
}

fn int_bounds(name: &str, arg: &serde_json::Value) -> MtResult<(i64, i64)> {
    match arg.as_array().map(Vec::as_slice) {
        Some([low, high]) => match (low.as_i64(), high.as_i64()) {
            (Some(low), Some(high)) => Ok((low, high)),
            _ => Err(invalid_spec(name, "integer bounds must be integers").into()),
        },
        _ => Err(invalid_spec(name, "expected a [low, high] pair").into()),
    }
}

impl SearchSpace {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    /// Parse the registry encoding: each parameter name maps to a single
    /// `{datatype: arg}` entry.
    ///
    /// ```json
    /// {
    ///   "n_neighbors": {"int": [1, 30]},
    ///   "alpha": {"loguniform": [0.0001, 10.0]},
    ///   "weights": {"str": ["uniform", "distance"]}
    /// }
    /// ```
    ///
    /// `int`, `float` and `loguniform` take `[low, high]`; `str`, `bool` and
    /// `object` take the list of choices.
    pub fn from_spec(spec: &serde_json::Value) -> MtResult<Self> {
        let entries = spec
            .as_object()
            .ok_or_else(|| invalid_spec("<root>", "expected an object of parameter specs"))?;

        let mut space = Self::new();
        for (name, def) in entries {
            let (datatype, arg) = match def.as_object() {
                Some(map) if map.len() == 1 => map
                    .iter()
                    .next()
                    .ok_or_else(|| invalid_spec(name, "empty datatype entry"))?,
                _ => return Err(invalid_spec(name, "expected exactly one {datatype: arg} entry").into()),
            };

            let kind = match datatype.as_str() {
                "int" => {
                    let (low, high) = int_bounds(name, arg)?;
                    ParameterKind::IntRange { low, high }
                }
                "float" => {
                    let (low, high) = bounds(name, arg)?;
                    ParameterKind::FloatRange { low, high }
                }
                "loguniform" => {
                    let (low, high) = bounds(name, arg)?;
                    ParameterKind::LogUniform { low, high }
                }
                "str" | "bool" | "object" => {
                    let values = arg
                        .as_array()
                        .cloned()
                        .ok_or_else(|| invalid_spec(name, "choices must be a list"))?;
                    ParameterKind::Choice { values }
                }
                other => return Err(invalid_spec(name, format!("unknown datatype {other:?}")).into()),
            };
            space.parameters.push(ParameterDef {
                name: name.clone(),
                kind,
            });
        }

        space.validate()?;
        Ok(space)
    }

    pub fn add_float(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::FloatRange { low, high },
        });
        self
    }

    pub fn add_int(mut self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::IntRange { low, high },
        });
        self
    }

    pub fn add_log_uniform(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::LogUniform { low, high },
        });
        self
    }

    pub fn add_choice(mut self, name: impl Into<String>, values: Vec<serde_json::Value>) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::Choice { values },
        });
        self
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Reject unsampleable ranges and duplicate names.
    pub fn validate(&self) -> MtResult<()> {
        let mut names = HashSet::new();
        for param in &self.parameters {
            let name = param.name.as_str();
            if !names.insert(name) {
                return Err(invalid_spec(name, "parameter defined twice").into());
            }
            match &param.kind {
                ParameterKind::FloatRange { low, high } => {
                    if !(low.is_finite() && high.is_finite()) {
                        return Err(invalid_range(name, "bounds must be finite").into());
                    }
                    if low > high {
                        return Err(invalid_range(name, format!("low {low} exceeds high {high}")).into());
                    }
                }
                ParameterKind::IntRange { low, high } => {
                    if low > high {
                        return Err(invalid_range(name, format!("low {low} exceeds high {high}")).into());
                    }
                }
                ParameterKind::LogUniform { low, high } => {
                    if !(*low > 0.0 && high.is_finite()) {
                        return Err(invalid_range(name, "log-uniform bounds must be positive and finite").into());
                    }
                    if low > high {
                        return Err(invalid_range(name, format!("low {low} exceeds high {high}")).into());
                    }
                }
                ParameterKind::Choice { values } => {
                    if values.is_empty() {
                        return Err(invalid_range(name, "no choices given").into());
                    }
                }
            }
        }
        Ok(())
    }

    /// Total number of grid points. `None` if any parameter is continuous
    /// or the count does not fit in a `usize`.
    pub fn grid_size(&self) -> Option<usize> {
        let mut total: usize = 1;
        for param in &self.parameters {
            let dim_size = match &param.kind {
                ParameterKind::IntRange { low, high } => {
                    usize::try_from(int_span(*low, *high)).ok()?
                }
                ParameterKind::Choice { values } => values.len(),
                // continuous dimensions have no natural grid
                _ => return None,
            };
            total = total.checked_mul(dim_size)?;
        }
        Some(total)
    }
}

/// Number of integers in `[low, high]`.
fn int_span(low: i64, high: i64) -> u128 {
    (i128::from(high) - i128::from(low) + 1).max(0) as u128
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::new()
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn sample_param(kind: &ParameterKind, rng: &mut StdRng) -> ParameterValue {
    match kind {
        ParameterKind::FloatRange { low, high } => ParameterValue::Float(rng.random_range(*low..=*high)),
        ParameterKind::IntRange { low, high } => ParameterValue::Int(rng.random_range(*low..=*high)),
        ParameterKind::LogUniform { low, high } => {
            let log_val: f64 = rng.random_range(low.ln()..=high.ln());
            ParameterValue::Float(log_val.exp().clamp(*low, *high))
        }
        ParameterKind::Choice { values } => {
            let idx = rng.random_range(0..values.len());
            ParameterValue::Json(values[idx].clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Search strategies
// ---------------------------------------------------------------------------

/// Common trait for all search strategies.
pub trait SearchStrategy: Send + Sync {
    /// Generate the next batch of parameter combinations to evaluate. An
    /// empty batch means the strategy is exhausted.
    fn suggest(&mut self, count: usize) -> Vec<ParamMap>;

    /// Report completed trial results so adaptive strategies can learn.
    fn report(&mut self, _params: &ParamMap, _objective: f64) {}

    /// Human-readable strategy name.
    fn name(&self) -> &str;
}

/// Build a strategy by name: `"grid"`, `"random"` or `"bayesian"`.
pub fn build_strategy(
    name: &str,
    space: SearchSpace,
    exploration_weight: f64,
    grid_steps: usize,
    seed: Option<u64>,
) -> MtResult<Box<dyn SearchStrategy>> {
    space.validate()?;
    match name {
        "grid" => Ok(Box::new(GridSearch::new(space, grid_steps))),
        "random" => Ok(Box::new(RandomSearch::new(space, seed))),
        "bayesian" => Ok(Box::new(BayesianSearch::new(space, exploration_weight, seed))),
        other => Err(SearchError::UnknownStrategy {
            name: other.to_string(),
        }
        .into()),
    }
}

// ---- Grid search ----

/// One grid dimension. Integer ranges are indexed arithmetically so wide
/// ranges cost nothing until a point is requested.
#[derive(Debug, Clone)]
enum GridAxis {
    Ints { low: i64, len: u128 },
    Values(Vec<ParameterValue>),
}

impl GridAxis {
    fn len(&self) -> u128 {
        match self {
            Self::Ints { len, .. } => *len,
            Self::Values(values) => values.len() as u128,
        }
    }

    fn value(&self, digit: u128) -> ParameterValue {
        match self {
            // digit < len, so the sum stays within [low, high]
            Self::Ints { low, .. } => ParameterValue::Int((i128::from(*low) + digit as i128) as i64),
            Self::Values(values) => values[digit as usize].clone(),
        }
    }
}

/// Exhaustive grid search over parameter combinations.
///
/// Combinations are decoded from the cursor in mixed radix, last parameter
/// varying fastest, so only the points actually suggested are materialized.
#[derive(Debug, Clone)]
pub struct GridSearch {
    axes: Vec<(String, GridAxis)>,
    total: u128,
    cursor: u128,
}

impl GridSearch {
    /// `float_steps` sets the number of points on each continuous dimension.
    pub fn new(space: SearchSpace, float_steps: usize) -> Self {
        let axes: Vec<(String, GridAxis)> = space
            .parameters
            .into_iter()
            .map(|param| {
                let axis = Self::build_axis(&param.kind, float_steps);
                (param.name, axis)
            })
            .collect();
        // saturate: a study never gets through 2^128 trials
        let total = axes
            .iter()
            .try_fold(1u128, |acc, (_, axis)| acc.checked_mul(axis.len()))
            .unwrap_or(u128::MAX);

        Self {
            axes,
            total,
            cursor: 0,
        }
    }

    /// Combinations not yet suggested, saturating at `usize::MAX`.
    pub fn remaining(&self) -> usize {
        usize::try_from(self.total - self.cursor).unwrap_or(usize::MAX)
    }

    fn build_axis(kind: &ParameterKind, float_steps: usize) -> GridAxis {
        let steps = float_steps.max(2);
        let fraction = |i: usize| i as f64 / (steps - 1) as f64;
        match kind {
            ParameterKind::IntRange { low, high } => GridAxis::Ints {
                low: *low,
                len: int_span(*low, *high),
            },
            ParameterKind::FloatRange { low, high } => GridAxis::Values(
                (0..steps)
                    .map(|i| ParameterValue::Float(low + fraction(i) * (high - low)))
                    .collect(),
            ),
            ParameterKind::LogUniform { low, high } => {
                let (log_low, log_high) = (low.ln(), high.ln());
                GridAxis::Values(
                    (0..steps)
                        .map(|i| {
                            ParameterValue::Float((log_low + fraction(i) * (log_high - log_low)).exp())
                        })
                        .collect(),
                )
            }
            ParameterKind::Choice { values } => {
                GridAxis::Values(values.iter().cloned().map(ParameterValue::Json).collect())
            }
        }
    }

    fn combination(&self, mut index: u128) -> ParamMap {
        let mut combo = ParamMap::with_capacity(self.axes.len());
        for (name, axis) in self.axes.iter().rev() {
            let len = axis.len();
            combo.insert(name.clone(), axis.value(index % len));
            index /= len;
        }
        combo
    }
}

impl SearchStrategy for GridSearch {
    fn suggest(&mut self, count: usize) -> Vec<ParamMap> {
        let end = self.cursor.saturating_add(count as u128).min(self.total);
        let batch = (self.cursor..end).map(|i| self.combination(i)).collect();
        self.cursor = end;
        batch
    }

    fn name(&self) -> &str {
        "grid"
    }
}

// ---- Random search ----

/// Independent random sampling across the search space.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    space: SearchSpace,
    rng: StdRng,
}

impl RandomSearch {
    /// A `seed` makes the sequence of suggestions reproducible.
    pub fn new(space: SearchSpace, seed: Option<u64>) -> Self {
        Self {
            space,
            rng: make_rng(seed),
        }
    }

    fn sample_one(&mut self) -> ParamMap {
        self.space
            .parameters
            .iter()
            .map(|param| (param.name.clone(), sample_param(&param.kind, &mut self.rng)))
            .collect()
    }
}

impl SearchStrategy for RandomSearch {
    fn suggest(&mut self, count: usize) -> Vec<ParamMap> {
        (0..count).map(|_| self.sample_one()).collect()
    }

    fn name(&self) -> &str {
        "random"
    }
}

// ---- Bayesian search ----

/// Explore/exploit search biased toward the best observation.
///
/// Tracks observed (params, objective) pairs and biases future sampling
/// toward the best one: with probability `exploration_weight` a fresh random
/// point is drawn, otherwise the best-known point is perturbed.
#[derive(Debug, Clone)]
pub struct BayesianSearch {
    space: SearchSpace,
    observations: Vec<(ParamMap, f64)>,
    exploration_weight: f64,
    rng: StdRng,
}

impl BayesianSearch {
    pub fn new(space: SearchSpace, exploration_weight: f64, seed: Option<u64>) -> Self {
        Self {
            space,
            observations: Vec::new(),
            exploration_weight,
            rng: make_rng(seed),
        }
    }

    /// Pure exploration sample (same as random).
    fn explore(&mut self) -> ParamMap {
        self.space
            .parameters
            .iter()
            .map(|param| (param.name.clone(), sample_param(&param.kind, &mut self.rng)))
            .collect()
    }

    /// Exploitation: perturb the best-known point.
    fn exploit(&mut self) -> ParamMap {
        let best = self
            .observations
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(params, _)| params.clone());

        let base = match best {
            Some(params) => params,
            None => return self.explore(),
        };

        let rng = &mut self.rng;
        let mut perturbed = ParamMap::new();

        for param in &self.space.parameters {
            let base_val = base.get(&param.name);
            let value = match (&param.kind, base_val) {
                (ParameterKind::FloatRange { low, high }, Some(ParameterValue::Float(v))) => {
                    let range = high - low;
                    let noise = rng.random_range(-0.1..0.1) * range;
                    ParameterValue::Float((v + noise).clamp(*low, *high))
                }
                (ParameterKind::IntRange { low, high }, Some(ParameterValue::Int(v))) => {
                    let delta: i64 = rng.random_range(-2..=2);
                    ParameterValue::Int((v + delta).clamp(*low, *high))
                }
                (ParameterKind::LogUniform { low, high }, Some(ParameterValue::Float(v))) => {
                    let log_v = v.ln();
                    let log_range = high.ln() - low.ln();
                    let noise = rng.random_range(-0.1..0.1) * log_range;
                    ParameterValue::Float((log_v + noise).exp().clamp(*low, *high))
                }
                // Choices, or a base point missing this parameter.
                (kind, _) => sample_param(kind, rng),
            };
            perturbed.insert(param.name.clone(), value);
        }

        perturbed
    }
}

impl SearchStrategy for BayesianSearch {
    fn suggest(&mut self, count: usize) -> Vec<ParamMap> {
        (0..count)
            .map(|_| {
                if self.observations.is_empty() || self.rng.random::<f64>() < self.exploration_weight {
                    self.explore()
                } else {
                    self.exploit()
                }
            })
            .collect()
    }

    fn report(&mut self, params: &ParamMap, objective: f64) {
        self.observations.push((params.clone(), objective));
    }

    fn name(&self) -> &str {
        "bayesian"
    }
}

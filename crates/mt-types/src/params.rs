//! Concrete hyperparameter values and typed lookups.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{ModelError, MtResult};

/// A concrete parameter value produced by a search strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    Json(serde_json::Value),
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

/// One sampled configuration, keyed by parameter name.
pub type ParamMap = HashMap<String, ParameterValue>;

/// Typed accessors used by model constructors.
///
/// Each accessor falls back to `default` when the parameter is absent and
/// fails with [`ModelError::InvalidParameter`] when it has the wrong type.
pub trait ParamMapExt {
    fn int_or(&self, name: &str, default: i64) -> MtResult<i64>;
    fn float_or(&self, name: &str, default: f64) -> MtResult<f64>;
    fn str_or(&self, name: &str, default: &str) -> MtResult<String>;
    fn bool_or(&self, name: &str, default: bool) -> MtResult<bool>;
}

fn mismatch(name: &str, expected: &str, found: &ParameterValue) -> ModelError {
    ModelError::InvalidParameter {
        parameter: name.to_string(),
        message: format!("expected {expected}, found {found}"),
    }
}

impl ParamMapExt for ParamMap {
    fn int_or(&self, name: &str, default: i64) -> MtResult<i64> {
        match self.get(name) {
            None => Ok(default),
            Some(ParameterValue::Int(v)) => Ok(*v),
            Some(ParameterValue::Json(v)) if v.is_i64() => Ok(v.as_i64().unwrap_or(default)),
            Some(other) => Err(mismatch(name, "an integer", other).into()),
        }
    }

    fn float_or(&self, name: &str, default: f64) -> MtResult<f64> {
        match self.get(name) {
            None => Ok(default),
            Some(ParameterValue::Float(v)) => Ok(*v),
            Some(ParameterValue::Int(v)) => Ok(*v as f64),
            Some(ParameterValue::Json(v)) if v.is_number() => Ok(v.as_f64().unwrap_or(default)),
            Some(other) => Err(mismatch(name, "a number", other).into()),
        }
    }

    fn str_or(&self, name: &str, default: &str) -> MtResult<String> {
        match self.get(name) {
            None => Ok(default.to_string()),
            Some(ParameterValue::Json(serde_json::Value::String(s))) => Ok(s.clone()),
            Some(other) => Err(mismatch(name, "a string", other).into()),
        }
    }

    fn bool_or(&self, name: &str, default: bool) -> MtResult<bool> {
        match self.get(name) {
            None => Ok(default),
            Some(ParameterValue::Json(serde_json::Value::Bool(b))) => Ok(*b),
            Some(other) => Err(mismatch(name, "a bool", other).into()),
        }
    }
}

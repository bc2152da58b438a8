//! Model registry: constructors and parameter spaces keyed by model name.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use mt_models::{Estimator, GaussianNb, KNeighbors, ModelFactory, RidgeRegression};
use mt_optimizer::SearchSpace;
use mt_types::{ModelError, MtResult, ParamMap, ProblemType};
use serde_json::json;
use tracing::debug;

/// A tunable model: how to build it and which parameters to search.
#[derive(Clone)]
pub struct ModelEntry {
    pub name: String,
    pub problem_type: ProblemType,
    pub factory: ModelFactory,
    pub search_space: SearchSpace,
}

impl ModelEntry {
    /// Instantiate the model with a sampled configuration.
    pub fn build(&self, params: &ParamMap) -> MtResult<Box<dyn Estimator>> {
        (self.factory)(params)
    }
}

impl fmt::Debug for ModelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelEntry")
            .field("name", &self.name)
            .field("problem_type", &self.problem_type)
            .field("search_space", &self.search_space)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    entries: BTreeMap<String, ModelEntry>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in estimators.
    pub fn with_defaults() -> MtResult<Self> {
        let mut registry = Self::new();

        let knn_space = json!({
            "n_neighbors": {"int": [1, 30]},
            "weights": {"str": ["uniform", "distance"]},
            "p": {"int": [1, 2]}
        });
        registry.register(
            "knn_classifier",
            ProblemType::Classification,
            &knn_space,
            |params: &ParamMap| -> MtResult<Box<dyn Estimator>> {
                Ok(Box::new(KNeighbors::from_params(ProblemType::Classification, params)?))
            },
        )?;
        registry.register(
            "knn_regressor",
            ProblemType::Regression,
            &knn_space,
            |params: &ParamMap| -> MtResult<Box<dyn Estimator>> {
                Ok(Box::new(KNeighbors::from_params(ProblemType::Regression, params)?))
            },
        )?;
        registry.register(
            "ridge",
            ProblemType::Regression,
            &json!({
                "alpha": {"loguniform": [1e-4, 100.0]},
                "fit_intercept": {"bool": [true, false]}
            }),
            |params: &ParamMap| -> MtResult<Box<dyn Estimator>> {
                Ok(Box::new(RidgeRegression::from_params(params)?))
            },
        )?;
        registry.register(
            "gaussian_nb",
            ProblemType::Classification,
            &json!({"var_smoothing": {"loguniform": [1e-12, 1e-3]}}),
            |params: &ParamMap| -> MtResult<Box<dyn Estimator>> {
                Ok(Box::new(GaussianNb::from_params(params)?))
            },
        )?;

        Ok(registry)
    }

    /// Register a model under `key` with a parameter space in the JSON
    /// `{name: {datatype: arg}}` encoding. Replaces any existing entry.
    pub fn register<F>(
        &mut self,
        key: &str,
        problem_type: ProblemType,
        spec: &serde_json::Value,
        factory: F,
    ) -> MtResult<()>
    where
        F: Fn(&ParamMap) -> MtResult<Box<dyn Estimator>> + Send + Sync + 'static,
    {
        let search_space = SearchSpace::from_spec(spec)?;
        debug!(
            "Registered {key} ({problem_type}) with {} tunable parameters",
            search_space.len()
        );
        self.insert(ModelEntry {
            name: key.to_string(),
            problem_type,
            factory: Arc::new(factory),
            search_space,
        });
        Ok(())
    }

    pub fn insert(&mut self, entry: ModelEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    pub fn get(&self, key: &str) -> MtResult<&ModelEntry> {
        self.entries.get(key).ok_or_else(|| {
            ModelError::UnknownModel {
                name: key.to_string(),
            }
            .into()
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mt_types::{MtError, ParameterValue, SearchError};

    #[test]
    fn defaults_cover_both_problem_types() {
        let registry = ModelRegistry::with_defaults().unwrap();
        assert_eq!(
            registry.keys().collect::<Vec<_>>(),
            vec!["gaussian_nb", "knn_classifier", "knn_regressor", "ridge"]
        );
        assert_eq!(registry.get("ridge").unwrap().problem_type, ProblemType::Regression);
        assert_eq!(
            registry.get("knn_classifier").unwrap().problem_type,
            ProblemType::Classification
        );
        assert_eq!(registry.get("knn_classifier").unwrap().search_space.len(), 3);
    }

    #[test]
    fn entries_build_models_from_params() {
        let registry = ModelRegistry::with_defaults().unwrap();
        let mut params = ParamMap::new();
        params.insert("n_neighbors".into(), ParameterValue::Int(3));
        params.insert("weights".into(), ParameterValue::Json(json!("distance")));

        let model = registry.get("knn_regressor").unwrap().build(&params).unwrap();
        assert_eq!(model.name(), "KNeighborsRegressor");

        params.insert("n_neighbors".into(), ParameterValue::Int(0));
        assert!(registry.get("knn_regressor").unwrap().build(&params).is_err());
    }

    #[test]
    fn unknown_key_is_an_error() {
        let registry = ModelRegistry::with_defaults().unwrap();
        let err = registry.get("svm").unwrap_err();
        assert!(matches!(
            err,
            MtError::Model(ModelError::UnknownModel { ref name }) if name == "svm"
        ));
    }

    #[test]
    fn register_rejects_bad_specs() {
        let mut registry = ModelRegistry::new();
        let err = registry
            .register(
                "broken",
                ProblemType::Regression,
                &json!({"alpha": {"float": [2.0, 1.0]}}),
                |params: &ParamMap| -> MtResult<Box<dyn Estimator>> {
                    Ok(Box::new(RidgeRegression::from_params(params)?))
                },
            )
            .unwrap_err();
        assert!(matches!(err, MtError::Search(SearchError::InvalidRange { .. })));
        assert!(registry.is_empty());
    }
}

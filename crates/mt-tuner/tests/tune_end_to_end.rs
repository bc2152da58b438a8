use mt_eval::{F1_SCORE, MAE, MSE, PRECISION, R2, RECALL, RMSE};
use mt_tuner::{
    tune_model, Dataset, EarlyStoppingConfig, ModelRegistry, MtError, ProblemType, Tuner,
    TunerConfig,
};
use mt_models::Estimator;
use mt_types::{ModelError, MtResult, ParamMap, SearchError};
use ndarray::{array, Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Two well separated blobs with labels 0 and 1.
fn blobs(n_per_class: usize) -> Dataset {
    let mut rng = StdRng::seed_from_u64(7);
    let mut rows = Vec::with_capacity(n_per_class * 2);
    for i in 0..n_per_class * 2 {
        let label = (i % 2) as f64;
        let centre = label * 10.0;
        rows.push(vec![
            centre + rng.random_range(-1.0..1.0),
            centre + rng.random_range(-1.0..1.0),
            label,
        ]);
    }
    Dataset::from_rows(vec!["x0".into(), "x1".into(), "class".into()], &rows).unwrap()
}

/// y = 3 x0 - 2 x1 + 1, no noise.
fn linear(n: usize) -> Dataset {
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let x0 = i as f64 * 0.5;
            let x1 = ((i * 7) % 11) as f64;
            vec![x0, x1, 3.0 * x0 - 2.0 * x1 + 1.0]
        })
        .collect();
    Dataset::from_rows(vec!["x0".into(), "x1".into(), "y".into()], &rows).unwrap()
}

#[test]
fn separable_classification_stops_at_target() {
    let registry = ModelRegistry::with_defaults().unwrap();
    let config = TunerConfig::default().with_concurrency(1).with_seed(3);

    let tuned = tune_model(
        &blobs(30),
        "class",
        "knn_classifier",
        &registry,
        ProblemType::Classification,
        &config,
    )
    .unwrap();

    assert_eq!(tuned.best_score, 1.0);
    assert!(tuned.stopped_early);
    assert_eq!(tuned.trials_completed, 1);
    assert_eq!(tuned.trials_failed, 0);

    for key in [F1_SCORE, PRECISION, RECALL] {
        assert_eq!(tuned.metrics[key], 1.0, "{key}");
    }
    assert_eq!(tuned.model.name(), "KNeighborsClassifier");
    let predicted = tuned.model.predict(array![[0.2, -0.1], [9.5, 10.3]].view()).unwrap();
    assert_eq!(predicted, array![0.0, 1.0]);
}

#[test]
fn ridge_recovers_a_linear_target() {
    let registry = ModelRegistry::with_defaults().unwrap();
    let tuner = Tuner::new(
        registry,
        TunerConfig::default().with_strategy("random").with_seed(11),
    );

    let tuned = tuner.tune(&linear(60), "y", "ridge", ProblemType::Regression).unwrap();

    assert!(tuned.best_score >= 0.99, "best {}", tuned.best_score);
    assert!(tuned.stopped_early);
    for key in [R2, MAE, MSE, RMSE] {
        assert!(tuned.metrics.contains_key(key), "{key}");
    }
    assert!(tuned.metrics[R2] > 0.95);
    assert!((tuned.metrics[RMSE] - tuned.metrics[MSE].sqrt()).abs() < 1e-12);
    assert!(tuned.best_params.contains_key("alpha"));
}

#[test]
fn without_early_stopping_every_trial_runs() {
    let registry = ModelRegistry::with_defaults().unwrap();
    let config = TunerConfig::default()
        .with_trials(6)
        .with_concurrency(2)
        .with_cv_folds(3)
        .with_seed(5)
        .with_early_stopping(None);

    let tuned = tune_model(
        &blobs(15),
        "class",
        "gaussian_nb",
        &registry,
        ProblemType::Classification,
        &config,
    )
    .unwrap();

    assert_eq!(tuned.trials_completed, 6);
    assert!(!tuned.stopped_early);
}

#[test]
fn plateau_stops_after_eleven_trials() {
    // a constant-score objective plateaus inside the [0.90, 0.99) band
    let mut registry = ModelRegistry::new();
    registry
        .register(
            "always_one",
            ProblemType::Classification,
            &serde_json::json!({"seed": {"int": [0, 1000]}}),
            |_: &ParamMap| -> MtResult<Box<dyn Estimator>> { Ok(Box::new(AlwaysOne::default())) },
        )
        .unwrap();

    // 19 of 20 rows are class 1, so predicting 1 everywhere gives 0.95 accuracy
    let rows: Vec<Vec<f64>> = (0..40)
        .map(|i| vec![i as f64, if i % 20 == 0 { 0.0 } else { 1.0 }])
        .collect();
    let dataset = Dataset::from_rows(vec!["x".into(), "label".into()], &rows).unwrap();
    let config = TunerConfig::default()
        .with_concurrency(1)
        .with_cv_folds(2)
        .with_early_stopping(Some(EarlyStoppingConfig::default()));

    let tuned = tune_model(
        &dataset,
        "label",
        "always_one",
        &registry,
        ProblemType::Classification,
        &config,
    )
    .unwrap();

    assert!((tuned.best_score - 0.95).abs() < 1e-12);
    assert!(tuned.stopped_early);
    assert_eq!(tuned.trials_completed, 11);
}

#[test]
fn failing_model_reports_no_completed_trials() {
    let mut registry = ModelRegistry::new();
    registry
        .register(
            "broken",
            ProblemType::Regression,
            &serde_json::json!({}),
            |_: &ParamMap| -> MtResult<Box<dyn Estimator>> {
                Err(ModelError::FitFailed {
                    message: "always fails".into(),
                }
                .into())
            },
        )
        .unwrap();

    let err = tune_model(
        &linear(20),
        "y",
        "broken",
        &registry,
        ProblemType::Regression,
        &TunerConfig::default().with_trials(3).with_concurrency(1),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        MtError::Search(SearchError::NoCompletedTrials { attempted: 3 })
    ));
}

#[derive(Debug, Default)]
struct AlwaysOne {
    fitted: bool,
}

impl Estimator for AlwaysOne {
    fn name(&self) -> &str {
        "AlwaysOne"
    }

    fn fit(&mut self, _x: ArrayView2<'_, f64>, _y: ArrayView1<'_, f64>) -> MtResult<()> {
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> MtResult<Array1<f64>> {
        if !self.fitted {
            return Err(ModelError::NotFitted {
                model: self.name().to_string(),
            }
            .into());
        }
        Ok(Array1::ones(x.nrows()))
    }
}

//! k-nearest-neighbours classifier and regressor.

use std::collections::BTreeMap;

use mt_types::{ModelError, MtResult, ParamMap, ParamMapExt, ProblemType};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::estimator::{check_fit_input, check_predict_input, Estimator};

/// How neighbours are weighted when aggregating their targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeighborWeights {
    Uniform,
    /// Inverse distance. Exact matches, when present, take all the weight.
    Distance,
}

impl NeighborWeights {
    fn parse(value: &str) -> MtResult<Self> {
        match value {
            "uniform" => Ok(Self::Uniform),
            "distance" => Ok(Self::Distance),
            other => Err(ModelError::InvalidParameter {
                parameter: "weights".to_string(),
                message: format!("expected \"uniform\" or \"distance\", found {other:?}"),
            }
            .into()),
        }
    }
}

/// Brute-force k-nearest-neighbours over a Minkowski distance.
#[derive(Debug, Clone)]
pub struct KNeighbors {
    task: ProblemType,
    n_neighbors: usize,
    weights: NeighborWeights,
    p: f64,
    fitted: Option<(Array2<f64>, Array1<f64>)>,
}

impl KNeighbors {
    pub fn new(task: ProblemType, n_neighbors: usize) -> Self {
        Self {
            task,
            n_neighbors: n_neighbors.max(1),
            weights: NeighborWeights::Uniform,
            p: 2.0,
            fitted: None,
        }
    }

    pub fn classifier(n_neighbors: usize) -> Self {
        Self::new(ProblemType::Classification, n_neighbors)
    }

    pub fn regressor(n_neighbors: usize) -> Self {
        Self::new(ProblemType::Regression, n_neighbors)
    }

    pub fn with_weights(mut self, weights: NeighborWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_p(mut self, p: f64) -> Self {
        self.p = p;
        self
    }

    /// Build from sampled parameters `n_neighbors`, `weights` and `p`.
    pub fn from_params(task: ProblemType, params: &ParamMap) -> MtResult<Self> {
        let n_neighbors = params.int_or("n_neighbors", 5)?;
        if n_neighbors < 1 {
            return Err(ModelError::InvalidParameter {
                parameter: "n_neighbors".to_string(),
                message: format!("must be at least 1, got {n_neighbors}"),
            }
            .into());
        }
        let p = params.float_or("p", 2.0)?;
        if p < 1.0 {
            return Err(ModelError::InvalidParameter {
                parameter: "p".to_string(),
                message: format!("Minkowski power must be at least 1, got {p}"),
            }
            .into());
        }
        let weights = NeighborWeights::parse(&params.str_or("weights", "uniform")?)?;

        Ok(Self::new(task, n_neighbors as usize)
            .with_weights(weights)
            .with_p(p))
    }

    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        let diffs = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs());
        if self.p == 1.0 {
            diffs.sum()
        } else if self.p == 2.0 {
            diffs.map(|d| d * d).sum::<f64>().sqrt()
        } else {
            diffs.map(|d| d.powf(self.p)).sum::<f64>().powf(1.0 / self.p)
        }
    }

    fn predict_row(&self, train_x: &Array2<f64>, train_y: &Array1<f64>, row: ArrayView1<'_, f64>) -> f64 {
        let mut neighbours: Vec<(f64, f64)> = train_x
            .rows()
            .into_iter()
            .zip(train_y.iter())
            .map(|(sample, &label)| (self.distance(sample, row), label))
            .collect();
        neighbours.sort_by(|a, b| a.0.total_cmp(&b.0));
        neighbours.truncate(self.n_neighbors.min(train_y.len()));

        let exact_match = neighbours.iter().any(|(d, _)| *d == 0.0);
        let weighted: Vec<(f64, f64)> = neighbours
            .into_iter()
            .map(|(d, label)| {
                let w = match self.weights {
                    NeighborWeights::Uniform => 1.0,
                    NeighborWeights::Distance if exact_match => {
                        if d == 0.0 {
                            1.0
                        } else {
                            0.0
                        }
                    }
                    NeighborWeights::Distance => 1.0 / d,
                };
                (w, label)
            })
            .collect();

        match self.task {
            ProblemType::Classification => {
                let mut votes: BTreeMap<i64, f64> = BTreeMap::new();
                for (w, label) in &weighted {
                    *votes.entry(*label as i64).or_insert(0.0) += w;
                }
                // Ties resolve to the smallest label.
                let mut best: Option<(i64, f64)> = None;
                for (label, score) in votes {
                    if best.map_or(true, |(_, s)| score > s) {
                        best = Some((label, score));
                    }
                }
                best.map(|(label, _)| label as f64).unwrap_or(f64::NAN)
            }
            ProblemType::Regression => {
                let total: f64 = weighted.iter().map(|(w, _)| w).sum();
                weighted.iter().map(|(w, y)| w * y).sum::<f64>() / total
            }
        }
    }
}

impl Estimator for KNeighbors {
    fn name(&self) -> &str {
        match self.task {
            ProblemType::Classification => "KNeighborsClassifier",
            ProblemType::Regression => "KNeighborsRegressor",
        }
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> MtResult<()> {
        check_fit_input(x, y)?;
        if self.task == ProblemType::Classification {
            self.task.check_target(y)?;
        }
        debug!("{} stored {} training samples", self.name(), x.nrows());
        self.fitted = Some((x.to_owned(), y.to_owned()));
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> MtResult<Array1<f64>> {
        let (train_x, train_y) = self.fitted.as_ref().ok_or_else(|| ModelError::NotFitted {
            model: self.name().to_string(),
        })?;
        check_predict_input(train_x.ncols(), x)?;

        Ok(x.rows()
            .into_iter()
            .map(|row| self.predict_row(train_x, train_y, row))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mt_types::{MtError, ParameterValue};
    use ndarray::array;
    use serde_json::json;

    fn two_clusters() -> (Array2<f64>, Array1<f64>) {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [9.0, 9.0], [9.0, 10.0], [10.0, 9.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn classifier_votes_by_majority() {
        let (x, y) = two_clusters();
        let mut model = KNeighbors::classifier(3);
        model.fit(x.view(), y.view()).unwrap();

        let predicted = model.predict(array![[0.5, 0.5], [9.5, 9.5]].view()).unwrap();
        assert_eq!(predicted, array![0.0, 1.0]);
    }

    #[test]
    fn tie_resolves_to_smallest_label() {
        let x = array![[0.0], [2.0]];
        let y = array![3.0, 1.0];
        let mut model = KNeighbors::classifier(2);
        model.fit(x.view(), y.view()).unwrap();
        assert_eq!(model.predict(array![[1.0]].view()).unwrap(), array![1.0]);
    }

    #[test]
    fn regressor_averages_neighbours() {
        let x = array![[0.0], [1.0], [2.0], [10.0]];
        let y = array![0.0, 1.0, 2.0, 10.0];
        let mut model = KNeighbors::regressor(3);
        model.fit(x.view(), y.view()).unwrap();
        let predicted = model.predict(array![[1.0]].view()).unwrap();
        assert!((predicted[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn distance_weighting_prefers_exact_matches() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![5.0, 7.0, 9.0];
        let mut model = KNeighbors::regressor(3).with_weights(NeighborWeights::Distance);
        model.fit(x.view(), y.view()).unwrap();
        assert_eq!(model.predict(array![[1.0]].view()).unwrap(), array![7.0]);
    }

    #[test]
    fn manhattan_distance() {
        let model = KNeighbors::classifier(1).with_p(1.0);
        let a = array![0.0, 0.0];
        let b = array![3.0, 4.0];
        assert_eq!(model.distance(a.view(), b.view()), 7.0);
        let euclid = KNeighbors::classifier(1);
        assert_eq!(euclid.distance(a.view(), b.view()), 5.0);
    }

    #[test]
    fn k_larger_than_training_set_uses_all_samples() {
        let (x, y) = two_clusters();
        let mut model = KNeighbors::regressor(50);
        model.fit(x.view(), y.view()).unwrap();
        let predicted = model.predict(array![[0.0, 0.0]].view()).unwrap();
        assert!((predicted[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn predict_before_fit_fails() {
        let model = KNeighbors::classifier(1);
        let err = model.predict(array![[1.0]].view()).unwrap_err();
        assert!(matches!(err, MtError::Model(ModelError::NotFitted { .. })));
    }

    #[test]
    fn from_params_reads_sampled_values() {
        let mut params = ParamMap::new();
        params.insert("n_neighbors".into(), ParameterValue::Int(4));
        params.insert("weights".into(), ParameterValue::Json(json!("distance")));
        params.insert("p".into(), ParameterValue::Int(1));

        let model = KNeighbors::from_params(ProblemType::Classification, &params).unwrap();
        assert_eq!(model.n_neighbors, 4);
        assert_eq!(model.weights, NeighborWeights::Distance);
        assert_eq!(model.p, 1.0);
    }

    #[test]
    fn from_params_rejects_bad_values() {
        let mut params = ParamMap::new();
        params.insert("n_neighbors".into(), ParameterValue::Int(0));
        assert!(KNeighbors::from_params(ProblemType::Regression, &params).is_err());

        let mut params = ParamMap::new();
        params.insert("weights".into(), ParameterValue::Json(json!("gaussian")));
        assert!(KNeighbors::from_params(ProblemType::Regression, &params).is_err());
    }
}

use std::f64::consts::PI;

use mt_types::{ModelError, MtResult, ParamMap, ParamMapExt, ProblemType};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use tracing::debug;

use crate::estimator::{check_fit_input, check_predict_input, Estimator};

#[derive(Debug, Clone)]
struct ClassStats {
    label: f64,
    log_prior: f64,
    mean: Array1<f64>,
    var: Array1<f64>,
}

/// Gaussian naive Bayes classifier.
#[derive(Debug, Clone)]
pub struct GaussianNb {
    var_smoothing: f64,
    classes: Vec<ClassStats>,
}

impl GaussianNb {
    pub fn new(var_smoothing: f64) -> Self {
        Self {
            var_smoothing,
            classes: Vec::new(),
        }
    }

    pub fn from_params(params: &ParamMap) -> MtResult<Self> {
        let var_smoothing = params.float_or("var_smoothing", 1e-9)?;
        if !(var_smoothing > 0.0 && var_smoothing.is_finite()) {
            return Err(ModelError::InvalidParameter {
                parameter: "var_smoothing".to_string(),
                message: format!("must be a finite positive number, got {var_smoothing}"),
            }
            .into());
        }
        Ok(Self::new(var_smoothing))
    }

    pub fn classes(&self) -> Vec<f64> {
        self.classes.iter().map(|c| c.label).collect()
    }

    fn joint_log_likelihood(stats: &ClassStats, row: ArrayView1<'_, f64>) -> f64 {
        let mut jll = stats.log_prior;
        for ((x, mean), var) in row.iter().zip(stats.mean.iter()).zip(stats.var.iter()) {
            jll -= 0.5 * (2.0 * PI * var).ln();
            jll -= (x - mean).powi(2) / (2.0 * var);
        }
        jll
    }
}

impl Estimator for GaussianNb {
    fn name(&self) -> &str {
        "GaussianNB"
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> MtResult<()> {
        check_fit_input(x, y)?;
        ProblemType::Classification.check_target(y)?;

        let max_var = x
            .var_axis(Axis(0), 0.0)
            .iter()
            .copied()
            .fold(0.0_f64, f64::max);
        let epsilon = self.var_smoothing * max_var;

        let mut labels: Vec<f64> = y.to_vec();
        labels.sort_by(|a, b| a.total_cmp(b));
        labels.dedup();

        let n = y.len() as f64;
        let mut classes = Vec::with_capacity(labels.len());
        for label in labels {
            let rows: Vec<usize> = y
                .iter()
                .enumerate()
                .filter(|&(_, &v)| v == label)
                .map(|(i, _)| i)
                .collect();
            let members: Array2<f64> = x.select(Axis(0), &rows);
            let mean = members
                .mean_axis(Axis(0))
                .ok_or_else(|| ModelError::FitFailed {
                    message: format!("class {label} has no samples"),
                })?;
            // Constant features with zero smoothing would divide by zero.
            let var = members
                .var_axis(Axis(0), 0.0)
                .mapv(|v| (v + epsilon).max(f64::EPSILON));

            classes.push(ClassStats {
                label,
                log_prior: (rows.len() as f64 / n).ln(),
                mean,
                var,
            });
        }

        debug!("GaussianNB fitted {} classes (epsilon {epsilon:e})", classes.len());
        self.classes = classes;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> MtResult<Array1<f64>> {
        let first = self.classes.first().ok_or_else(|| ModelError::NotFitted {
            model: self.name().to_string(),
        })?;
        check_predict_input(first.mean.len(), x)?;

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let mut best = (first.label, f64::NEG_INFINITY);
                for stats in &self.classes {
                    let jll = Self::joint_log_likelihood(stats, row);
                    if jll > best.1 {
                        best = (stats.label, jll);
                    }
                }
                best.0
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mt_types::{MtError, ParameterValue};
    use ndarray::array;

    #[test]
    fn separates_gaussian_blobs() {
        let x = array![
            [0.0, 0.1],
            [0.2, -0.1],
            [-0.1, 0.0],
            [5.0, 5.2],
            [5.1, 4.9],
            [4.8, 5.0]
        ];
        let y = array![2.0, 2.0, 2.0, 7.0, 7.0, 7.0];

        let mut model = GaussianNb::new(1e-9);
        model.fit(x.view(), y.view()).unwrap();
        assert_eq!(model.classes(), vec![2.0, 7.0]);

        let predicted = model.predict(array![[0.1, 0.0], [5.0, 5.0]].view()).unwrap();
        assert_eq!(predicted, array![2.0, 7.0]);
    }

    #[test]
    fn constant_features_do_not_produce_nan() {
        let x = array![[1.0], [1.0], [1.0], [1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let mut model = GaussianNb::new(1e-9);
        model.fit(x.view(), y.view()).unwrap();
        let predicted = model.predict(array![[1.0]].view()).unwrap();
        assert!(predicted[0] == 0.0 || predicted[0] == 1.0);
    }

    #[test]
    fn rejects_fractional_labels() {
        let x = array![[1.0], [2.0]];
        let y = array![0.5, 1.0];
        let mut model = GaussianNb::new(1e-9);
        assert!(matches!(
            model.fit(x.view(), y.view()),
            Err(MtError::Data(mt_types::DataError::InvalidLabel { .. }))
        ));
    }

    #[test]
    fn from_params_requires_positive_smoothing() {
        let mut params = ParamMap::new();
        params.insert("var_smoothing".into(), ParameterValue::Float(0.0));
        assert!(GaussianNb::from_params(&params).is_err());
        params.insert("var_smoothing".into(), ParameterValue::Float(1e-6));
        assert!(GaussianNb::from_params(&params).is_ok());
    }
}

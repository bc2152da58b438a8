//! Train/test splitting and k-fold partitioning.

use std::collections::BTreeMap;

use mt_types::{DataError, MtResult, ProblemType};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row count below which datasets get the larger fold count.
const SMALL_DATASET_ROWS: usize = 500;
const SMALL_DATASET_FOLDS: usize = 10;
const DEFAULT_FOLDS: usize = 5;

/// One cross-validation partition of row indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Number of cross-validation folds for a dataset of `n_rows`.
///
/// Small datasets use 10 folds so each training split keeps most of the
/// data; larger ones use 5. Never more folds than rows.
pub fn kfold_count(n_rows: usize) -> MtResult<usize> {
    if n_rows < 2 {
        return Err(DataError::InsufficientData {
            message: format!("cross-validation needs at least 2 rows, got {n_rows}"),
        }
        .into());
    }
    let folds = if n_rows < SMALL_DATASET_ROWS {
        SMALL_DATASET_FOLDS
    } else {
        DEFAULT_FOLDS
    };
    Ok(folds.min(n_rows))
}

fn check_fold_count(n_rows: usize, k: usize) -> MtResult<()> {
    if k < 2 {
        return Err(mt_types::validation_error!("k-fold needs at least 2 folds, got {k}"));
    }
    if k > n_rows {
        return Err(DataError::InsufficientData {
            message: format!("cannot split {n_rows} rows into {k} folds"),
        }
        .into());
    }
    Ok(())
}

fn folds_from_assignment(assignment: &[usize], k: usize) -> Vec<Fold> {
    (0..k)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..assignment.len()).partition(|&row| assignment[row] == fold);
            Fold { train, test }
        })
        .collect()
}

/// Contiguous, unshuffled k-fold. The first `n_rows % k` folds hold one
/// extra row.
pub fn kfold(n_rows: usize, k: usize) -> MtResult<Vec<Fold>> {
    check_fold_count(n_rows, k)?;

    let base = n_rows / k;
    let extra = n_rows % k;
    let mut assignment = Vec::with_capacity(n_rows);
    for fold in 0..k {
        let size = base + usize::from(fold < extra);
        assignment.extend(std::iter::repeat(fold).take(size));
    }
    Ok(folds_from_assignment(&assignment, k))
}

/// Stratified k-fold: members of each class are dealt round-robin across
/// folds, continuing the rotation from one class to the next so fold sizes
/// differ by at most one.
pub fn stratified_kfold(labels: ArrayView1<'_, f64>, k: usize) -> MtResult<Vec<Fold>> {
    check_fold_count(labels.len(), k)?;

    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (row, &label) in labels.iter().enumerate() {
        by_class.entry(label as i64).or_default().push(row);
    }

    let mut assignment = vec![0; labels.len()];
    let mut next = 0;
    for rows in by_class.values() {
        for &row in rows {
            assignment[row] = next % k;
            next += 1;
        }
    }
    Ok(folds_from_assignment(&assignment, k))
}

/// Stratified folds for classification, contiguous folds for regression.
pub fn folds_for(problem: ProblemType, y: ArrayView1<'_, f64>, k: usize) -> MtResult<Vec<Fold>> {
    match problem {
        ProblemType::Classification => stratified_kfold(y, k),
        ProblemType::Regression => kfold(y.len(), k),
    }
}

/// Hold-out split produced by [`train_test_split`].
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

/// Shuffle rows with a seeded RNG and hold out `ceil(test_size * n)` of them.
pub fn train_test_split(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    test_size: f64,
    seed: u64,
) -> MtResult<TrainTestSplit> {
    if x.nrows() != y.len() {
        return Err(DataError::ShapeMismatch {
            message: format!("{} feature rows but {} targets", x.nrows(), y.len()),
        }
        .into());
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(mt_types::validation_error!(
            "test_size must lie in (0, 1), got {test_size}"
        ));
    }

    let n = y.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(DataError::InsufficientData {
            message: format!("{n} rows cannot be split with test_size {test_size}"),
        }
        .into());
    }

    let mut rows: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    rows.shuffle(&mut rng);
    let (test, train) = rows.split_at(n_test);

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), train),
        x_test: x.select(Axis(0), test),
        y_train: y.select(Axis(0), train),
        y_test: y.select(Axis(0), test),
    })
}

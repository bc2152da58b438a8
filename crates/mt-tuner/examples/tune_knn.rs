//! Tune a k-nearest-neighbours classifier on a synthetic three-class dataset.
//!
//! Run with `RUST_LOG=debug` to see every trial. An optional first argument
//! names a JSON `TunerConfig` file.

use mt_tuner::{tune_model, Dataset, ModelRegistry, ProblemType, TunerConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn synthetic_dataset(rows_per_class: usize) -> anyhow::Result<Dataset> {
    let centres = [(0.0, 0.0), (4.0, 1.0), (1.5, 4.5)];
    let mut rng = StdRng::seed_from_u64(2024);
    let mut rows = Vec::with_capacity(rows_per_class * centres.len());
    for (label, (cx, cy)) in centres.iter().enumerate() {
        for _ in 0..rows_per_class {
            rows.push(vec![
                cx + rng.random_range(-1.5..1.5),
                cy + rng.random_range(-1.5..1.5),
                rng.random_range(0.0..1.0),
                label as f64,
            ]);
        }
    }
    let columns = ["x", "y", "noise", "species"].map(String::from).to_vec();
    Ok(Dataset::from_rows(columns, &rows)?)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => TunerConfig::from_file(path)?,
        None => TunerConfig::default().with_seed(7),
    };
    let registry = ModelRegistry::with_defaults()?;
    let dataset = synthetic_dataset(80)?;

    let tuned = tune_model(
        &dataset,
        "species",
        "knn_classifier",
        &registry,
        ProblemType::Classification,
        &config,
    )?;

    info!(
        "best cv accuracy {:.4} after {} trials{}",
        tuned.best_score,
        tuned.trials_completed,
        if tuned.stopped_early { " (stopped early)" } else { "" }
    );
    let mut params: Vec<_> = tuned.best_params.iter().collect();
    params.sort_by(|a, b| a.0.cmp(b.0));
    for (name, value) in params {
        info!("  {name} = {value}");
    }
    for (metric, value) in &tuned.metrics {
        info!("  {metric}: {value:.4}");
    }
    Ok(())
}

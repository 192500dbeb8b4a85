use arrow::array::{Array, StringArray, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};
use sir_core::GraphSummary;
use sir_sampler::{Ensemble, Report, SimConfig, StepRecord};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub mod cli;
pub mod network;

pub use network::{load_network, NetworkFile};

/// Everything needed to reproduce a run or an ensemble.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub timestamp: String,
    pub seed: u64,
    pub engine: String,
    pub kernel: Option<String>,
    pub rng: String,
    pub reseed: String,
    pub p: f32,
    pub q: f32,
    pub max_steps: Option<u32>,
    pub network: String,
    pub nodes: usize,
    pub edges: usize,
    pub n_runs: usize,
    /// Outcome figures of the run (or ensemble statistics).
    pub results: serde_json::Value,
    pub commit_hash: Option<String>,
    /// Declared `rust-version` of the build.
    pub rust_version: String,
}

/// Engine, kernel and stream names as given on the command line.
#[derive(Clone, Debug)]
pub struct RunLabels {
    pub engine: String,
    pub kernel: Option<String>,
    pub rng: String,
}

impl RunManifest {
    pub fn new(
        config: &SimConfig,
        labels: &RunLabels,
        network: &Path,
        graph: &GraphSummary,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            seed: config.seed,
            engine: labels.engine.clone(),
            kernel: labels.kernel.clone(),
            rng: labels.rng.clone(),
            reseed: config.reseed.to_string(),
            p: config.probabilities.p(),
            q: config.probabilities.q(),
            max_steps: config.max_steps,
            network: network.display().to_string(),
            nodes: graph.nodes,
            edges: graph.edges,
            n_runs: 0, // set when writing
            results: serde_json::Value::Null,
            commit_hash: get_git_commit(),
            rust_version: env!("CARGO_PKG_RUST_VERSION").to_string(),
        }
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let manifest = serde_json::from_str(&json)?;
        Ok(manifest)
    }
}

/// `steps.parquet` -> `steps.manifest.json`.
pub fn manifest_path_for(out: &Path) -> PathBuf {
    out.with_extension("manifest.json")
}

/// Per-step table of a single run:
/// `(run_id, step, active, infected, recovered, elapsed_ns)`.
fn step_table(report: &Report, run_id: &str) -> anyhow::Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("run_id", DataType::Utf8, false),
        Field::new("step", DataType::UInt32, false),
        Field::new("active", DataType::UInt64, false),
        Field::new("infected", DataType::UInt64, false),
        Field::new("recovered", DataType::UInt64, false),
        Field::new("elapsed_ns", DataType::UInt64, false),
    ]));

    let records = &report.records;
    let column = |f: &dyn Fn(&StepRecord) -> u64| -> Arc<dyn Array> {
        Arc::new(UInt64Array::from(records.iter().map(f).collect::<Vec<_>>()))
    };
    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(vec![run_id; records.len()])),
        Arc::new(UInt32Array::from(
            records.iter().map(|r| r.step).collect::<Vec<_>>(),
        )),
        column(&|r: &StepRecord| r.active as u64),
        column(&|r: &StepRecord| r.infected as u64),
        column(&|r: &StepRecord| r.recovered as u64),
        column(&|r: &StepRecord| r.elapsed.as_nanos().min(u128::from(u64::MAX)) as u64),
    ];
    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// One row per replicate:
/// `(run_id, replicate, seed, outcome, steps, final_size, peak_active)`.
fn replicate_table(ensemble: &Ensemble, run_id: &str) -> anyhow::Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("run_id", DataType::Utf8, false),
        Field::new("replicate", DataType::UInt64, false),
        Field::new("seed", DataType::UInt64, false),
        Field::new("outcome", DataType::Utf8, false),
        Field::new("steps", DataType::UInt32, false),
        Field::new("final_size", DataType::UInt64, false),
        Field::new("peak_active", DataType::UInt64, false),
    ]));

    let runs = &ensemble.runs;
    let outcomes: Vec<String> = runs.iter().map(|r| r.outcome.to_string()).collect();
    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(vec![run_id; runs.len()])),
        Arc::new(UInt64Array::from(runs.iter().map(|r| r.run_id).collect::<Vec<_>>())),
        Arc::new(UInt64Array::from(runs.iter().map(|r| r.seed).collect::<Vec<_>>())),
        Arc::new(StringArray::from(outcomes)),
        Arc::new(UInt32Array::from(runs.iter().map(|r| r.steps).collect::<Vec<_>>())),
        Arc::new(UInt64Array::from(
            runs.iter().map(|r| r.final_size as u64).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            runs.iter().map(|r| r.peak_active as u64).collect::<Vec<_>>(),
        )),
    ];
    Ok(RecordBatch::try_new(schema, arrays)?)
}

fn write_parquet(batch: &RecordBatch, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Writes the step table of `report` to `parquet_path` and the manifest
/// next to it.
pub fn write_report_with_manifest(
    report: &Report,
    manifest: &RunManifest,
    parquet_path: &Path,
) -> anyhow::Result<PathBuf> {
    write_parquet(&step_table(report, &manifest.run_id)?, parquet_path)?;

    let mut manifest = manifest.clone();
    manifest.n_runs = 1;
    manifest.results = serde_json::json!({
        "outcome": report.outcome,
        "steps": report.steps,
        "final_size": report.final_size,
        "peak_active": report.peak_active,
        "peak_step": report.peak_step,
        "elapsed_secs": report.elapsed.as_secs_f64(),
    });
    let manifest_path = manifest_path_for(parquet_path);
    manifest.save_to_file(&manifest_path)?;

    info!(
        steps = report.records.len(),
        parquet = %parquet_path.display(),
        manifest = %manifest_path.display(),
        "wrote run report"
    );
    Ok(manifest_path)
}

/// Writes one row per replicate to `parquet_path` and the manifest, with
/// ensemble statistics, next to it.
pub fn write_ensemble_with_manifest(
    ensemble: &Ensemble,
    manifest: &RunManifest,
    threshold: f64,
    parquet_path: &Path,
) -> anyhow::Result<PathBuf> {
    write_parquet(&replicate_table(ensemble, &manifest.run_id)?, parquet_path)?;

    let mut manifest = manifest.clone();
    manifest.n_runs = ensemble.n_runs();
    manifest.results = serde_json::to_value(ensemble.final_statistics(threshold))?;
    let manifest_path = manifest_path_for(parquet_path);
    manifest.save_to_file(&manifest_path)?;

    info!(
        runs = ensemble.n_runs(),
        parquet = %parquet_path.display(),
        manifest = %manifest_path.display(),
        "wrote ensemble"
    );
    Ok(manifest_path)
}

fn get_git_commit() -> Option<String> {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout).ok()
            } else {
                None
            }
        })
        .map(|s| s.trim().to_string())
}

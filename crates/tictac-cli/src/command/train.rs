use std::{io::Write as _, path::PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tictac_training::{
    classifier::ModelKind, evaluation::MetricsSidecar, pipeline::TrainingRun,
};

use crate::{config::PipelineArgs, util::Output};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    #[clap(flatten)]
    pipeline: PipelineArgs,
    /// Write per-model test metrics as JSON to this file
    #[arg(long)]
    metrics: Option<PathBuf>,
    /// Write a run summary as JSON to this file
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    trained_at: DateTime<Utc>,
    seed: u64,
    dataset_rows: usize,
    train_rows: usize,
    validation_rows: usize,
    test_rows: usize,
    selected: ModelKind,
    training_secs: Vec<(ModelKind, f64)>,
    metrics: MetricsSidecar<'a>,
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let TrainArg {
        pipeline,
        metrics,
        summary,
    } = arg;

    let config = pipeline.load_config()?;
    let dataset = pipeline.load_dataset()?;
    let run = TrainingRun::train(&dataset, &config).context("Training failed")?;

    let mut stdout = Output::stdout();
    for report in run.reports() {
        let marker = if report.model == run.selected() { "*" } else { " " };
        writeln!(
            stdout,
            "{marker} {:<13} accuracy {:.4}  macro-F1 {:.4}",
            report.model.name(),
            report.accuracy,
            report.macro_f1
        )?;
        for class in &report.classes {
            writeln!(
                stdout,
                "    {:<10} precision {:.4}  recall {:.4}  F1 {:.4}  support {}",
                class.class.label(),
                class.precision,
                class.recall,
                class.f1,
                class.support
            )?;
        }
    }
    writeln!(stdout, "selected: {}", run.selected().name())?;
    stdout.flush()?;

    if let Some(path) = metrics {
        Output::save_json(&run.metrics(), Some(path.clone()))?;
        tracing::info!(path = %path.display(), "metrics written");
    }

    if let Some(path) = summary {
        let partition = run.partition();
        let summary = RunSummary {
            trained_at: Utc::now(),
            seed: config.seed,
            dataset_rows: dataset.len(),
            train_rows: partition.train.len(),
            validation_rows: partition.validation.len(),
            test_rows: partition.test.len(),
            selected: run.selected(),
            training_secs: run
                .classifiers()
                .iter()
                .map(|c| (c.kind, c.training_time.as_secs_f64()))
                .collect(),
            metrics: run.metrics(),
        };
        Output::save_json(&summary, Some(path.clone()))?;
        tracing::info!(path = %path.display(), "run summary written");
    }

    Ok(())
}

use std::io::Write as _;

use anyhow::Context as _;
use tictac_engine::Board;
use tictac_training::{
    classifier::ModelKind,
    pipeline::{TrainingRun, classify_with_retraining},
};

use crate::{config::PipelineArgs, util::Output};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ClassifyArg {
    #[clap(flatten)]
    pipeline: PipelineArgs,
    /// Boards as nine cells (`xobbxbbbb` or `x,o,b,b,x,b,b,b,b`); tree
    /// models read unknown cells as blank, the others ignore them
    #[arg(required = true)]
    boards: Vec<String>,
    /// Model to use instead of the best-scoring one
    #[arg(long)]
    model: Option<ModelKind>,
    /// Retrain everything for each board instead of once up front
    #[arg(long)]
    retrain_per_call: bool,
    /// Print one JSON object per board
    #[arg(long)]
    json: bool,
}

pub(crate) fn run(arg: &ClassifyArg) -> anyhow::Result<()> {
    let ClassifyArg {
        pipeline,
        boards,
        model,
        retrain_per_call,
        json,
    } = arg;

    let config = pipeline.load_config()?;
    let dataset = pipeline.load_dataset()?;
    let run = if *retrain_per_call {
        None
    } else {
        Some(TrainingRun::train(&dataset, &config).context("Training failed")?)
    };

    let mut stdout = Output::stdout();
    for text in boards {
        let tokens = Board::tokenize(text);
        let result = match &run {
            Some(run) => run.classify(&tokens, *model)?,
            None => classify_with_retraining(&dataset, &config, &tokens, *model)?,
        };
        if *json {
            serde_json::to_writer(&mut stdout, &result)?;
            writeln!(stdout)?;
        } else {
            writeln!(stdout, "{text}\t{}\t{}", result.prediction, result.model)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

use std::{io::Write as _, path::PathBuf};

use anyhow::Context as _;
use tictac_engine::rules;
use tictac_training::{
    classifier::ModelKind,
    feedback::{FeedbackTracker, InMemoryPendingPredictions},
    pipeline::TrainingRun,
};

use crate::{
    config::PipelineArgs,
    util::{self, Output},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ReplayArg {
    #[clap(flatten)]
    pipeline: PipelineArgs,
    /// File with one board per line; blank lines and `#` comments are skipped
    #[arg(long)]
    boards: PathBuf,
    /// Model to use instead of the best-scoring one
    #[arg(long)]
    model: Option<ModelKind>,
}

pub(crate) fn run(arg: &ReplayArg) -> anyhow::Result<()> {
    let ReplayArg {
        pipeline,
        boards,
        model,
    } = arg;

    let config = pipeline.load_config()?;
    let dataset = pipeline.load_dataset()?;
    let boards = util::read_boards_file(boards)?;
    let run = TrainingRun::train(&dataset, &config).context("Training failed")?;

    let mut tracker = FeedbackTracker::new(InMemoryPendingPredictions::default());
    for board in &boards {
        let prediction = run.classify_board(board, *model)?;
        let request_id = tracker.record(prediction)?;
        let actual = rules::label_of(board);
        tracing::debug!(
            %request_id,
            %board,
            predicted = %prediction.prediction,
            %actual,
            "replayed"
        );
        tracker.log_actual(&request_id, actual);
    }

    let mut stdout = Output::stdout();
    let total = tracker.counts();
    writeln!(
        stdout,
        "all           n {:>5}  hits {:>5}  misses {:>5}  accuracy {:.4}",
        total.n,
        total.hits,
        total.misses,
        total.accuracy()
    )?;
    for kind in ModelKind::ALL {
        let counts = tracker.model_counts(kind);
        if counts.n == 0 {
            continue;
        }
        writeln!(
            stdout,
            "{:<13} n {:>5}  hits {:>5}  misses {:>5}  accuracy {:.4}",
            kind.name(),
            counts.n,
            counts.hits,
            counts.misses,
            counts.accuracy()
        )?;
    }
    stdout.flush()?;
    Ok(())
}

use std::{io::Write as _, path::PathBuf};

use anyhow::Context as _;
use tictac_analysis::dataset::Dataset;
use tictac_engine::{enumerate, rules};

use crate::util::Output;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct GenerateDatasetArg {
    /// Output CSV file (defaults to stdout)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &GenerateDatasetArg) -> anyhow::Result<()> {
    let dataset = Dataset::from_boards(enumerate::reachable_boards(), rules::label_of)
        .context("Failed to build the reachable-board dataset")?;

    let mut output = Output::from_output_path(arg.output.clone())?;
    dataset
        .write_csv(&mut output)
        .with_context(|| format!("Failed to write dataset to {}", output.display_path()))?;
    output
        .flush()
        .with_context(|| format!("Failed to flush output to {}", output.display_path()))?;

    tracing::info!(
        rows = dataset.len(),
        output = %output.display_path(),
        "dataset written"
    );
    Ok(())
}

use std::path::PathBuf;

use anyhow::Context as _;
use tictac_analysis::dataset::Dataset;
use tictac_engine::{enumerate, rules};
use tictac_training::{classifier::ModelKind, pipeline::PipelineConfig};

use crate::util;

/// Dataset and training options shared by the commands that train.
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct PipelineArgs {
    /// Labeled dataset: headerless CSV with nine cells and a label per line.
    /// Defaults to every reachable board labeled by the game rules.
    #[arg(long)]
    dataset: Option<PathBuf>,
    /// Skip the first line of the dataset file
    #[arg(long)]
    header: bool,
    /// JSON pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for the split and every model
    #[arg(long)]
    seed: Option<u64>,
    /// Abort training after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Models to train: distance, neural, tree, ensemble (comma-separated)
    #[arg(long = "models", value_delimiter = ',')]
    models: Vec<ModelKind>,
}

impl PipelineArgs {
    pub(crate) fn load_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_json_file::<PipelineConfig, _>("pipeline config", path)?,
            None => PipelineConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(secs) = self.timeout_secs {
            config.training_timeout_secs = Some(secs);
        }
        if !self.models.is_empty() {
            config.models.clone_from(&self.models);
        }
        tracing::debug!(?config, "pipeline configuration");
        Ok(config)
    }

    pub(crate) fn load_dataset(&self) -> anyhow::Result<Dataset> {
        match &self.dataset {
            Some(path) => Dataset::open(path, self.header)
                .with_context(|| format!("Failed to load dataset: {}", path.display())),
            None => {
                let dataset = Dataset::from_boards(enumerate::reachable_boards(), rules::label_of)
                    .context("Failed to build the reachable-board dataset")?;
                tracing::info!(rows = dataset.len(), "using generated reachable-board dataset");
                Ok(dataset)
            }
        }
    }
}

use std::io;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, Layer as _, layer::SubscriberExt as _, util::SubscriberInitExt as _};

use self::{
    classify::ClassifyArg, generate_dataset::GenerateDatasetArg, label::LabelArg, replay::ReplayArg,
    train::TrainArg,
};

mod classify;
mod generate_dataset;
mod label;
mod replay;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log more (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Train the classifier bank and report test-partition scores
    Train(#[clap(flatten)] TrainArg),
    /// Classify boards with a trained model
    Classify(#[clap(flatten)] ClassifyArg),
    /// Label boards with the game rules
    Label(#[clap(flatten)] LabelArg),
    /// Write every reachable board with its rule label as a dataset
    GenerateDataset(#[clap(flatten)] GenerateDatasetArg),
    /// Classify a file of boards and track live accuracy against the rule labels
    Replay(#[clap(flatten)] ReplayArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_logging(args.verbose, args.quiet);
    match args.mode {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::Classify(arg) => classify::run(&arg)?,
        Mode::Label(arg) => label::run(&arg)?,
        Mode::GenerateDataset(arg) => generate_dataset::run(&arg)?,
        Mode::Replay(arg) => replay::run(&arg)?,
    }
    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match verbose {
        0 if quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(filter);
    tracing_subscriber::registry().with(stderr_layer).init();
}

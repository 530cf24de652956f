use std::io::Write as _;

use tictac_engine::rules;

use crate::util::{self, Output};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct LabelArg {
    /// Boards as nine cells (`xobbxbbbb` or `x,o,b,b,x,b,b,b,b`)
    #[arg(required = true)]
    boards: Vec<String>,
}

pub(crate) fn run(arg: &LabelArg) -> anyhow::Result<()> {
    let mut stdout = Output::stdout();
    for text in &arg.boards {
        let board = util::parse_board(text)?;
        writeln!(stdout, "{board}\t{}", rules::label_of(&board))?;
    }
    stdout.flush()?;
    Ok(())
}

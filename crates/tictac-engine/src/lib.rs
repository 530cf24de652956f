//! Board model and rule-based game-state labelling for tic-tac-toe.
//!
//! - [`board`]: cells, players and the 9-cell [`Board`]
//! - [`game_state`]: the five-valued [`GameState`] label alphabet
//! - [`rules`]: pure win / threat / fullness predicates and [`rules::label_of`]
//! - [`enumerate`]: every board reachable in legal play
//!
//! # Example
//!
//! ```
//! use tictac_engine::{Board, GameState, rules};
//!
//! let board: Board = "xxxoobbbb".parse().unwrap();
//! assert_eq!(rules::label_of(&board), GameState::XWins);
//! ```

pub use self::{board::*, game_state::*};

pub mod board;
pub mod enumerate;
pub mod game_state;
pub mod rules;

/// A board rejected at the input boundary.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum InvalidBoardError {
    #[display("board must have exactly {} cells, got {len}", Board::CELL_COUNT)]
    WrongLength { len: usize },
    #[display("cell {index} has invalid value '{token}' (expected one of x, o, b)")]
    InvalidCell { index: usize, token: String },
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown cell value '{token}' (expected one of x, o, b)")]
pub struct ParseCellError {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown game state label '{label}'")]
pub struct ParseGameStateError {
    pub label: String,
}

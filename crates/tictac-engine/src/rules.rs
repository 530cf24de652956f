//! Pure game-state predicates over a [`Board`].
//!
//! These rules derive the ground-truth label of a board and double as a
//! zero-training classifier. Win lines are scanned in a fixed order (rows,
//! then columns, then diagonals).
//!
//! Priority of [`label_of`]: a completed line wins over everything, then a
//! full board is a draw, then an open threat is "near end", else "ongoing".
//!
//! ```
//! use tictac_engine::{Board, GameState, rules};
//!
//! let draw: Board = "xoxoxooxo".parse().unwrap();
//! assert_eq!(rules::label_of(&draw), GameState::Draw);
//!
//! let threat: Board = "xobbxbbbb".parse().unwrap();
//! assert_eq!(rules::label_of(&threat), GameState::NearEnd);
//! ```

use crate::{Board, Cell, GameState, Player};

pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Returns the owner of the first completed win line, if any.
#[must_use]
pub fn winner(board: &Board) -> Option<Player> {
    WIN_LINES.iter().find_map(|&[a, b, c]| {
        let player = board[a].player()?;
        (board[a] == board[b] && board[a] == board[c]).then_some(player)
    })
}

/// Whether some win line holds exactly one empty cell and two identical marks.
#[must_use]
pub fn has_threat(board: &Board) -> bool {
    WIN_LINES.iter().any(|line| {
        let count = |cell| line.iter().filter(|&&i| board[i] == cell).count();
        count(Cell::Blank) == 1 && (count(Cell::X) == 2 || count(Cell::O) == 2)
    })
}

#[must_use]
pub fn label_of(board: &Board) -> GameState {
    match winner(board) {
        Some(Player::X) => GameState::XWins,
        Some(Player::O) => GameState::OWins,
        None if board.is_full() => GameState::Draw,
        None if has_threat(board) => GameState::NearEnd,
        None => GameState::Ongoing,
    }
}

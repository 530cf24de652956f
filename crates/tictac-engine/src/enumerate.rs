//! Exhaustive enumeration of boards reachable in legal play.

use std::collections::HashSet;

use crate::{Board, Player, rules};

/// Number of distinct boards reachable from the empty board.
pub const REACHABLE_BOARD_COUNT: usize = 5478;

/// Every board reachable in legal play, empty board included.
///
/// X moves first, players alternate, and play stops once a line is
/// completed. Boards are returned in depth-first discovery order, so the
/// output is identical on every call.
#[must_use]
pub fn reachable_boards() -> Vec<Board> {
    let mut seen = HashSet::new();
    let mut boards = vec![];
    visit(Board::empty(), Player::X, &mut seen, &mut boards);
    boards
}

fn visit(board: Board, to_move: Player, seen: &mut HashSet<Board>, boards: &mut Vec<Board>) {
    if !seen.insert(board) {
        return;
    }
    boards.push(board);
    if rules::winner(&board).is_some() {
        return;
    }
    for index in board.empty_cells().collect::<Vec<_>>() {
        let next = board.with(index, to_move.cell());
        visit(next, to_move.opponent(), seen, boards);
    }
}

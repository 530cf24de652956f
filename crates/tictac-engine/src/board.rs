use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{InvalidBoardError, ParseCellError};

/// A single board cell.
///
/// The declaration order (`Blank < O < X`) matches the lexical order of the
/// dataset tokens `b`, `o`, `x`, so sorted category universes line up with
/// the tokens as written.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_more::IsVariant,
)]
pub enum Cell {
    #[serde(rename = "b")]
    Blank,
    #[serde(rename = "o")]
    O,
    #[serde(rename = "x")]
    X,
}

impl Cell {
    pub const ALL: [Cell; 3] = [Cell::Blank, Cell::O, Cell::X];

    #[must_use]
    pub const fn token(self) -> char {
        match self {
            Cell::Blank => 'b',
            Cell::O => 'o',
            Cell::X => 'x',
        }
    }

    #[must_use]
    pub const fn player(self) -> Option<Player> {
        match self {
            Cell::Blank => None,
            Cell::O => Some(Player::O),
            Cell::X => Some(Player::X),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl FromStr for Cell {
    type Err = ParseCellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "b" | "B" => Ok(Cell::Blank),
            "o" | "O" => Ok(Cell::O),
            "x" | "X" => Ok(Cell::X),
            other => Err(ParseCellError {
                token: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Player {
    #[display("X")]
    X,
    #[display("O")]
    O,
}

impl Player {
    #[must_use]
    pub const fn cell(self) -> Cell {
        match self {
            Player::X => Cell::X,
            Player::O => Cell::O,
        }
    }

    #[must_use]
    pub const fn opponent(self) -> Player {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }
}

/// A 3x3 board stored row-major.
///
/// Cell `i` is at row `i / 3`, column `i % 3`. A `Board` always holds exactly
/// nine cells from the `{b, o, x}` alphabet; anything else is rejected (or
/// coerced, see [`Board::coerce_from_tokens`]) before a `Board` exists.
///
/// # Example
///
/// ```
/// use tictac_engine::{Board, Cell};
///
/// let board: Board = "x,o,b,b,x,b,b,b,b".parse().unwrap();
/// assert_eq!(board[0], Cell::X);
/// assert_eq!(board.to_string(), "xobbxbbbb");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board([Cell; Board::CELL_COUNT]);

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl Board {
    pub const CELL_COUNT: usize = 9;

    #[must_use]
    pub const fn empty() -> Self {
        Self([Cell::Blank; Self::CELL_COUNT])
    }

    #[must_use]
    pub const fn from_cells(cells: [Cell; Self::CELL_COUNT]) -> Self {
        Self(cells)
    }

    #[must_use]
    pub const fn cells(&self) -> &[Cell; Self::CELL_COUNT] {
        &self.0
    }

    /// Returns a copy of this board with cell `index` replaced.
    #[must_use]
    pub fn with(mut self, index: usize, cell: Cell) -> Self {
        self.0[index] = cell;
        self
    }

    #[must_use]
    pub fn count(&self, cell: Cell) -> usize {
        self.0.iter().filter(|c| **c == cell).count()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        !self.0.contains(&Cell::Blank)
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_blank())
            .map(|(i, _)| i)
    }

    /// Builds a board from raw tokens, rejecting anything outside the alphabet.
    ///
    /// This is the strict boundary check: a caller-supplied board with the
    /// wrong length or an unknown token yields [`InvalidBoardError`].
    pub fn from_tokens<S>(tokens: &[S]) -> Result<Self, InvalidBoardError>
    where
        S: AsRef<str>,
    {
        Self::build(tokens, |index, token| {
            token
                .parse::<Cell>()
                .map_err(|ParseCellError { token }| InvalidBoardError::InvalidCell { index, token })
        })
    }

    /// Builds a board from raw tokens, replacing unknown tokens with [`Cell::Blank`].
    ///
    /// The length must still be exactly nine.
    pub fn coerce_from_tokens<S>(tokens: &[S]) -> Result<Self, InvalidBoardError>
    where
        S: AsRef<str>,
    {
        Ok(RawBoard::from_tokens(tokens)?.coerce())
    }

    fn build<S, F>(tokens: &[S], mut parse: F) -> Result<Self, InvalidBoardError>
    where
        S: AsRef<str>,
        F: FnMut(usize, &str) -> Result<Cell, InvalidBoardError>,
    {
        if tokens.len() != Self::CELL_COUNT {
            return Err(InvalidBoardError::WrongLength { len: tokens.len() });
        }
        let mut cells = [Cell::Blank; Self::CELL_COUNT];
        for (index, (cell, token)) in cells.iter_mut().zip(tokens).enumerate() {
            *cell = parse(index, token.as_ref())?;
        }
        Ok(Self(cells))
    }

    /// Splits board text into tokens: either comma-separated, or one character per cell.
    #[must_use]
    pub fn tokenize(s: &str) -> Vec<String> {
        let s = s.trim();
        if s.contains(',') {
            s.split(',').map(|t| t.trim().to_owned()).collect()
        } else {
            s.chars()
                .filter(|c| !c.is_whitespace())
                .map(String::from)
                .collect()
        }
    }
}

/// Nine cells as read from untrusted input, where an unreadable token is
/// kept as `None` instead of being rejected.
///
/// ```
/// use tictac_engine::{Cell, RawBoard};
///
/// let raw = RawBoard::from_tokens(&["x", "?", "b", "b", "b", "b", "b", "b", "b"]).unwrap();
/// assert_eq!(raw.cells()[1], None);
/// assert_eq!(raw.coerce()[1], Cell::Blank);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawBoard([Option<Cell>; Board::CELL_COUNT]);

impl RawBoard {
    /// Only the length is checked.
    pub fn from_tokens<S>(tokens: &[S]) -> Result<Self, InvalidBoardError>
    where
        S: AsRef<str>,
    {
        if tokens.len() != Board::CELL_COUNT {
            return Err(InvalidBoardError::WrongLength { len: tokens.len() });
        }
        let mut cells = [None; Board::CELL_COUNT];
        for (cell, token) in cells.iter_mut().zip(tokens) {
            *cell = token.as_ref().parse::<Cell>().ok();
        }
        Ok(Self(cells))
    }

    #[must_use]
    pub const fn cells(&self) -> &[Option<Cell>; Board::CELL_COUNT] {
        &self.0
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    /// Reads every unreadable cell as [`Cell::Blank`].
    #[must_use]
    pub fn coerce(&self) -> Board {
        Board(self.0.map(|cell| cell.unwrap_or(Cell::Blank)))
    }
}

impl From<Board> for RawBoard {
    fn from(board: Board) -> Self {
        Self(board.0.map(Some))
    }
}

impl std::ops::Index<usize> for Board {
    type Output = Cell;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cell in &self.0 {
            write!(f, "{cell}")?;
        }
        Ok(())
    }
}

impl FromStr for Board {
    type Err = InvalidBoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tokens(&Self::tokenize(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compact_and_comma_forms() {
        let compact: Board = "xxxoobbbb".parse().unwrap();
        let comma: Board = "x, x, x, o, o, b, b, b, b".parse().unwrap();
        assert_eq!(compact, comma);
        assert_eq!(compact.count(Cell::X), 3);
        assert_eq!(compact.count(Cell::Blank), 4);
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let err = "xxo".parse::<Board>().unwrap_err();
        assert_eq!(err, InvalidBoardError::WrongLength { len: 3 });
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        let err = Board::from_tokens(&["x", "o", "z", "b", "b", "b", "b", "b", "b"]).unwrap_err();
        assert_eq!(
            err,
            InvalidBoardError::InvalidCell {
                index: 2,
                token: "z".to_owned()
            }
        );
    }

    #[test]
    fn test_coerce_replaces_invalid_tokens_with_blank() {
        let board =
            Board::coerce_from_tokens(&["x", "?", "o", "", "X", "b", "b", "b", "q"]).unwrap();
        assert_eq!(board.to_string(), "xbobxbbbb");
        assert!(Board::coerce_from_tokens(&["x"; 8]).is_err());
    }

    #[test]
    fn test_raw_board_keeps_unreadable_cells() {
        let raw = RawBoard::from_tokens(&["x", "?", "o", "", "X", "b", "b", "b", "q"]).unwrap();
        assert!(!raw.is_complete());
        assert_eq!(raw.cells()[0], Some(Cell::X));
        assert_eq!(raw.cells()[1], None);
        assert_eq!(raw.cells()[3], None);
        assert_eq!(raw.cells()[4], Some(Cell::X));
        assert_eq!(raw.cells()[8], None);
        assert_eq!(raw.coerce().to_string(), "xbobxbbbb");
        assert_eq!(
            RawBoard::from_tokens(&["x"; 10]).unwrap_err(),
            InvalidBoardError::WrongLength { len: 10 }
        );
    }

    #[test]
    fn test_raw_board_from_board_is_complete() {
        let board: Board = "xobbxbbbo".parse().unwrap();
        let raw = RawBoard::from(board);
        assert!(raw.is_complete());
        assert_eq!(raw.coerce(), board);
    }

    #[test]
    fn test_cell_order_matches_token_order() {
        let mut tokens = Cell::ALL.map(Cell::token);
        tokens.sort_unstable();
        assert_eq!(tokens, Cell::ALL.map(Cell::token));
    }

    #[test]
    fn test_serde_uses_tokens() {
        let board: Board = "xobbbbbbb".parse().unwrap();
        let json = serde_json::to_string(&board).unwrap();
        assert_eq!(json, r#"["x","o","b","b","b","b","b","b","b"]"#);
        let back: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(back, board);
    }
}

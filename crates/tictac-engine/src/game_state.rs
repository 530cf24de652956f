use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ParseGameStateError;

/// Game-state category of a board.
///
/// Declaration order is the order used for sorted label universes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    /// No winner yet and no immediate threat.
    Ongoing,
    /// Some win line holds two identical marks and one empty cell.
    NearEnd,
    /// Board full with no winner.
    Draw,
    OWins,
    XWins,
}

impl GameState {
    pub const ALL: [GameState; 5] = [
        GameState::Ongoing,
        GameState::NearEnd,
        GameState::Draw,
        GameState::OWins,
        GameState::XWins,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            GameState::Ongoing => "ongoing",
            GameState::NearEnd => "near end",
            GameState::Draw => "draw",
            GameState::OWins => "O wins",
            GameState::XWins => "X wins",
        }
    }

    /// Label spelling used by the published tic-tac-toe state dataset.
    #[must_use]
    pub const fn dataset_label(self) -> &'static str {
        match self {
            GameState::Ongoing => "Tem jogo",
            GameState::NearEnd => "Possibilidade de Fim de Jogo",
            GameState::Draw => "Empate",
            GameState::OWins => "O vence",
            GameState::XWins => "X vence",
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GameState {
    type Err = ParseGameStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        let state = match normalized.as_str() {
            "ongoing" | "tem jogo" => GameState::Ongoing,
            "near end" | "possibilidade de fim de jogo" => GameState::NearEnd,
            "draw" | "empate" => GameState::Draw,
            "o wins" | "o vence" => GameState::OWins,
            "x wins" | "x vence" => GameState::XWins,
            _ => {
                return Err(ParseGameStateError {
                    label: s.trim().to_owned(),
                });
            }
        };
        Ok(state)
    }
}

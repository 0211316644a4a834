//! Game termination detection.
//!
//! [`evaluate`] is a pure function over the position history, run after
//! every history mutation. Detection order is fixed: checkmate, then
//! stalemate, then the fifty-move rule, then threefold repetition.

use std::collections::HashMap;
use std::fmt;

use crate::position::{Color, Position};

/// Half-move clock value at which the fifty-move rule draws the game.
const FIFTY_MOVE_PLIES: u32 = 100;

/// Occurrences of a position (current one included) that draw by
/// repetition.
const REPETITION_DRAWS: u32 = 3;

/// Outcome code of a game, in the legacy protocol's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultCode {
    /// Game still in progress; the only non-terminal code.
    #[default]
    None,
    WhiteWins,
    BlackWins,
    Draw,
    /// A result was recorded but the game was not played out ("*").
    Unfinished,
}

impl ResultCode {
    /// The protocol token for this code. `None` and `Unfinished` both
    /// render as "*"; callers display a result line only once one is
    /// recorded.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResultCode::WhiteWins => "1-0",
            ResultCode::BlackWins => "0-1",
            ResultCode::Draw => "1/2-1/2",
            ResultCode::None | ResultCode::Unfinished => "*",
        }
    }

    /// Parse a protocol result token.
    #[must_use]
    pub fn from_token(token: &str) -> ResultCode {
        match token {
            "1-0" => ResultCode::WhiteWins,
            "0-1" => ResultCode::BlackWins,
            "1/2-1/2" => ResultCode::Draw,
            _ => ResultCode::Unfinished,
        }
    }
}

/// A game outcome plus a free-text comment.
///
/// Terminal (`code != None`) results stick until an explicit new-game or
/// board-reset operation; every mutating engine operation fails while
/// one is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameResult {
    pub code: ResultCode,
    pub comment: String,
}

impl GameResult {
    /// No result; the game is in progress.
    #[must_use]
    pub fn none() -> GameResult {
        GameResult::default()
    }

    #[must_use]
    pub fn new(code: ResultCode, comment: &str) -> GameResult {
        GameResult {
            code,
            comment: comment.to_string(),
        }
    }

    /// True once any result (including "*") has been recorded.
    #[must_use]
    pub fn is_concluded(&self) -> bool {
        self.code != ResultCode::None
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.comment.is_empty() {
            write!(f, "{}", self.code.as_str())
        } else {
            write!(f, "{} {{{}}}", self.code.as_str(), self.comment)
        }
    }
}

/// Occurrence counts of repetition keys across a history.
#[derive(Clone, Debug)]
struct RepetitionTable {
    counts: HashMap<u64, u32>,
}

impl RepetitionTable {
    fn new() -> Self {
        RepetitionTable {
            counts: HashMap::new(),
        }
    }

    fn get(&self, key: u64) -> u32 {
        self.counts.get(&key).copied().unwrap_or(0)
    }

    fn increment(&mut self, key: u64) -> u32 {
        let next = self.get(key).saturating_add(1);
        self.counts.insert(key, next);
        next
    }
}

/// Evaluate the result of the game whose positions are `history`.
///
/// `history` must be non-empty; the last entry is the current position.
/// Returns `GameResult::none()` while the game is undecided.
#[must_use]
pub fn evaluate<P: Position>(history: &[P]) -> GameResult {
    let Some(current) = history.last() else {
        return GameResult::none();
    };

    if current.in_checkmate() {
        return match current.side_to_move() {
            Color::White => GameResult::new(ResultCode::BlackWins, "Black mates"),
            Color::Black => GameResult::new(ResultCode::WhiteWins, "White mates"),
        };
    }

    if current.in_stalemate() {
        return GameResult::new(ResultCode::Draw, "Stalemate");
    }

    if current.halfmove_clock() >= FIFTY_MOVE_PLIES {
        return GameResult::new(ResultCode::Draw, "Draw by fifty move rule");
    }

    let mut seen = RepetitionTable::new();
    for position in history {
        seen.increment(position.repetition_key());
    }
    if seen.get(current.repetition_key()) >= REPETITION_DRAWS {
        return GameResult::new(ResultCode::Draw, "Draw by repetition");
    }

    GameResult::none()
}

//! Board representation, classification and game status.
//!
//! Side 0 is always the player on roll. Each side is indexed from its own ace
//! point (index 0) to its 24-point (index 23); index 24 is the bar. Chequers
//! borne off are implicit: `variant.chequers() - on_board`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::variant::GameVariant;

/// Bar index within a side.
pub const BAR: usize = 24;

/// Board errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("side {side} has {count} chequers on board, variant allows {max}")]
    TooManyChequers { side: usize, count: u32, max: u32 },
    #[error("both sides occupy the same point (side 0 index {index})")]
    SharedPoint { index: usize },
    #[error("failed to parse board: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub struct Board(pub [[u8; 25]; 2]);

impl Board {
    pub fn empty() -> Self {
        Board([[0; 25]; 2])
    }

    pub fn initial(variant: GameVariant) -> Self {
        let side = variant.initial_side();
        Board([side, side])
    }

    pub fn side(&self, side: usize) -> &[u8; 25] {
        &self.0[side]
    }

    /// Exchange the two sides so the opponent becomes side 0.
    pub fn swap_sides(&mut self) {
        self.0.swap(0, 1);
    }

    pub fn swapped(&self) -> Board {
        Board([self.0[1], self.0[0]])
    }

    /// Chequers still on the board (bar included) for `side`.
    pub fn chequers(&self, side: usize) -> u32 {
        self.0[side].iter().map(|&c| c as u32).sum()
    }

    /// Pip counts `[side 0, side 1]`; a chequer on the bar counts 25.
    pub fn pip_count(&self) -> [u32; 2] {
        let mut pips = [0u32; 2];
        for (side, pip) in pips.iter_mut().enumerate() {
            *pip = self.0[side]
                .iter()
                .enumerate()
                .map(|(i, &c)| (i as u32 + 1) * c as u32)
                .sum();
        }
        pips
    }

    /// Highest occupied index for `side` (bar = 24), `None` when all are off.
    pub fn back_chequer(&self, side: usize) -> Option<usize> {
        (0..25).rev().find(|&i| self.0[side][i] > 0)
    }

    /// True when every chequer of `side` is in its home board (or borne off).
    pub fn all_home(&self, side: usize) -> bool {
        self.0[side][6..].iter().all(|&c| c == 0)
    }

    /// True when any chequer could still meet an opposing chequer.
    pub fn has_contact(&self) -> bool {
        match (self.back_chequer(0), self.back_chequer(1)) {
            (Some(b0), Some(b1)) => b0 + b1 > 23,
            _ => false,
        }
    }

    pub fn validate(&self, variant: GameVariant) -> Result<(), BoardError> {
        let max = variant.chequers();
        for side in 0..2 {
            let count = self.chequers(side);
            if count > max {
                return Err(BoardError::TooManyChequers { side, count, max });
            }
        }
        for index in 0..24 {
            if self.0[0][index] > 0 && self.0[1][23 - index] > 0 {
                return Err(BoardError::SharedPoint { index });
            }
        }
        Ok(())
    }

    /// Stable 64-bit key of the position, independent of process hashing state.
    pub fn position_key(&self) -> u64 {
        let mut state = 0x243F_6A88_85A3_08D3u64;
        for side in &self.0 {
            for &c in side.iter() {
                state = (state ^ c as u64).wrapping_mul(0x0000_0100_0000_01B3);
                state ^= state >> 29;
            }
        }
        state
    }
}

impl fmt::Display for Board {
    /// Two comma-separated sides of 25 counts, separated by `/`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for side in 0..2 {
            if side == 1 {
                write!(f, "/")?;
            }
            for (i, c) in self.0[side].iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for Board {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sides: Vec<&str> = s.trim().split('/').collect();
        if sides.len() != 2 {
            return Err(BoardError::Parse(format!(
                "expected two sides separated by '/', got {}",
                sides.len()
            )));
        }
        let mut board = Board::empty();
        for (side, text) in sides.iter().enumerate() {
            let counts: Vec<&str> = text.split(',').map(str::trim).collect();
            if counts.len() != 25 {
                return Err(BoardError::Parse(format!(
                    "side {side} has {} entries, expected 25",
                    counts.len()
                )));
            }
            for (i, c) in counts.iter().enumerate() {
                board.0[side][i] = c
                    .parse::<u8>()
                    .map_err(|e| BoardError::Parse(format!("side {side} index {i}: {e}")))?;
            }
        }
        Ok(board)
    }
}

/// How a finished game was won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum GameResult {
    Single = 1,
    Gammon = 2,
    Backgammon = 3,
}

impl GameResult {
    pub fn points(self) -> u32 {
        self as u32
    }
}

/// Returns the winning side and result once one side has borne off everything.
pub fn game_status(board: &Board, variant: GameVariant) -> Option<(usize, GameResult)> {
    let winner = (0..2).find(|&side| board.chequers(side) == 0)?;
    let loser = 1 - winner;
    if board.chequers(loser) < variant.chequers() {
        return Some((winner, GameResult::Single));
    }
    // Loser's indices 18..=24 are the winner's home board and the bar.
    if board.0[loser][18..].iter().any(|&c| c > 0) {
        Some((winner, GameResult::Backgammon))
    } else {
        Some((winner, GameResult::Gammon))
    }
}

/// Position classes, ordered from most to least exactly evaluable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum PositionClass {
    Over,
    /// Both sides home with at most six chequers each.
    Bearoff2,
    /// Both sides home.
    BearoffOneSided,
    Race,
    Contact,
}

impl PositionClass {
    /// Covered by the two-sided bearoff evaluation.
    pub fn is_two_sided_bearoff(self) -> bool {
        self <= PositionClass::Bearoff2
    }

    /// Covered by the one-sided bearoff evaluation.
    pub fn is_one_sided_bearoff(self) -> bool {
        self <= PositionClass::BearoffOneSided
    }
}

pub fn classify_position(board: &Board, _variant: GameVariant) -> PositionClass {
    if board.chequers(0) == 0 || board.chequers(1) == 0 {
        return PositionClass::Over;
    }
    if board.has_contact() {
        return PositionClass::Contact;
    }
    if board.all_home(0) && board.all_home(1) {
        if board.chequers(0) <= 6 && board.chequers(1) <= 6 {
            PositionClass::Bearoff2
        } else {
            PositionClass::BearoffOneSided
        }
    } else {
        PositionClass::Race
    }
}

/// Position classification seam; the rollout only depends on this trait.
pub trait PositionClassifier: Send + Sync {
    fn classify(&self, board: &Board, variant: GameVariant) -> PositionClass;
}

/// Rule-based classifier backed by [`classify_position`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleClassifier;

impl PositionClassifier for RuleClassifier {
    fn classify(&self, board: &Board, variant: GameVariant) -> PositionClass {
        classify_position(board, variant)
    }
}

//! Players, cube ownership and match state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::variant::GameVariant;

/// Absolute seat identity, independent of whose turn it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Player {
    Zero,
    One,
}

impl Player {
    pub fn index(self) -> usize {
        match self {
            Player::Zero => 0,
            Player::One => 1,
        }
    }

    pub fn from_index(i: usize) -> Player {
        if i == 0 {
            Player::Zero
        } else {
            Player::One
        }
    }

    pub fn opponent(self) -> Player {
        match self {
            Player::Zero => Player::One,
            Player::One => Player::Zero,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum CubeOwner {
    Centered,
    Owned(Player),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CubeError {
    #[error("cube value {0} is not a power of two")]
    NotPowerOfTwo(u32),
    #[error("score {score:?} is not below match length {match_to}")]
    ScoreOutOfRange { score: [u32; 2], match_to: u32 },
    #[error("crawford game requires a player at match point")]
    CrawfordWithoutMatchPoint,
}

/// Cube and match state seen from the seat of `on_roll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct CubeInfo {
    pub cube: u32,
    pub owner: CubeOwner,
    pub on_roll: Player,
    /// 0 for money play.
    pub match_to: u32,
    pub score: [u32; 2],
    pub crawford: bool,
    pub jacoby: bool,
    pub beavers: bool,
    pub variant: GameVariant,
}

impl CubeInfo {
    /// Centered 1-cube money game with Jacoby and beavers.
    pub fn money(on_roll: Player) -> Self {
        Self {
            cube: 1,
            owner: CubeOwner::Centered,
            on_roll,
            match_to: 0,
            score: [0, 0],
            crawford: false,
            jacoby: true,
            beavers: true,
            variant: GameVariant::Standard,
        }
    }

    pub fn match_play(on_roll: Player, match_to: u32, score: [u32; 2], crawford: bool) -> Self {
        Self {
            match_to,
            score,
            crawford,
            jacoby: false,
            beavers: false,
            ..Self::money(on_roll)
        }
    }

    pub fn is_money(&self) -> bool {
        self.match_to == 0
    }

    pub fn is_centered(&self) -> bool {
        self.owner == CubeOwner::Centered
    }

    /// Post-Crawford: a player is at match point and this is not the Crawford game.
    pub fn post_crawford(&self) -> bool {
        !self.is_money()
            && !self.crawford
            && self.score.iter().any(|&s| s + 1 == self.match_to)
    }

    /// Whether `player` is allowed to turn the cube now.
    pub fn may_double(&self, player: Player) -> bool {
        let owns = match self.owner {
            CubeOwner::Centered => true,
            CubeOwner::Owned(p) => p == player,
        };
        if !owns {
            return false;
        }
        if self.is_money() {
            return true;
        }
        let score = self.score[player.index()];
        if self.crawford || score + self.cube >= self.match_to {
            return false;
        }
        !(self.post_crawford() && score + 1 == self.match_to)
    }

    /// Same state with the other player on roll.
    pub fn flipped(&self) -> CubeInfo {
        CubeInfo {
            on_roll: self.on_roll.opponent(),
            ..*self
        }
    }

    /// Cube state after the player on roll doubles and the opponent takes.
    pub fn doubled(&self) -> CubeInfo {
        CubeInfo {
            cube: self.cube * 2,
            owner: CubeOwner::Owned(self.on_roll.opponent()),
            ..*self
        }
    }

    /// log2 of the cube value.
    pub fn log_cube(&self) -> usize {
        self.cube.max(1).trailing_zeros() as usize
    }

    pub fn validate(&self) -> Result<(), CubeError> {
        if !self.cube.is_power_of_two() {
            return Err(CubeError::NotPowerOfTwo(self.cube));
        }
        if !self.is_money() {
            if self.score.iter().any(|&s| s >= self.match_to) {
                return Err(CubeError::ScoreOutOfRange {
                    score: self.score,
                    match_to: self.match_to,
                });
            }
            if self.crawford && !self.score.iter().any(|&s| s + 1 == self.match_to) {
                return Err(CubeError::CrawfordWithoutMatchPoint);
            }
        }
        Ok(())
    }
}

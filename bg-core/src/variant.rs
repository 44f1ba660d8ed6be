//! Game variants and their starting positions.

use serde::{Deserialize, Serialize};

/// Rule set being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameVariant {
    #[default]
    Standard,
    Nackgammon,
    Hypergammon1,
    Hypergammon2,
    Hypergammon3,
}

impl GameVariant {
    /// Chequers each side starts with.
    pub fn chequers(self) -> u32 {
        match self {
            GameVariant::Standard | GameVariant::Nackgammon => 15,
            GameVariant::Hypergammon1 => 1,
            GameVariant::Hypergammon2 => 2,
            GameVariant::Hypergammon3 => 3,
        }
    }

    pub fn is_hypergammon(self) -> bool {
        matches!(
            self,
            GameVariant::Hypergammon1 | GameVariant::Hypergammon2 | GameVariant::Hypergammon3
        )
    }

    /// Starting layout for one side, indexed from that side's own ace point.
    pub fn initial_side(self) -> [u8; 25] {
        let mut side = [0u8; 25];
        match self {
            GameVariant::Standard => {
                side[5] = 5;
                side[7] = 3;
                side[12] = 5;
                side[23] = 2;
            }
            GameVariant::Nackgammon => {
                side[5] = 4;
                side[7] = 3;
                side[12] = 4;
                side[22] = 2;
                side[23] = 2;
            }
            GameVariant::Hypergammon1 => {
                side[23] = 1;
            }
            GameVariant::Hypergammon2 => {
                side[23] = 1;
                side[22] = 1;
            }
            GameVariant::Hypergammon3 => {
                side[23] = 1;
                side[22] = 1;
                side[21] = 1;
            }
        }
        side
    }
}

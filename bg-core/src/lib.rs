//! bg-core: board representation, cube state, move generation, dice and configuration.

pub mod board;
pub mod config;
pub mod cube;
pub mod dice;
pub mod movegen;
pub mod variant;

pub use board::{
    classify_position, game_status, Board, BoardError, GameResult, PositionClass,
    PositionClassifier, RuleClassifier, BAR,
};
pub use config::{Config, ConfigError};
pub use cube::{CubeError, CubeInfo, CubeOwner, Player};
pub use dice::{DiceSource, PermutationTable, RngKind, TrialDice};
pub use movegen::{generate_moves, MoveError, Play, Step};
pub use variant::GameVariant;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");


#[cfg(test)]
mod dice_tests;

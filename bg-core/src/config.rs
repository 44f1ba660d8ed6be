//! Configuration schema for rollouts and evaluation.
//!
//! One YAML file drives the CLI and the benches; every field has a default so
//! partial files are accepted.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::cube::{CubeInfo, CubeOwner, Player};
use crate::dice::RngKind;
use crate::variant::GameVariant;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Rollout procedure settings.
    #[serde(default)]
    pub rollout: RolloutConfig,
    /// Evaluation contexts used inside the rollout.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Cube and match state of the position being analysed.
    #[serde(default)]
    pub cube: CubeConfig,
    /// Thread pool and batching.
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// NDJSON event output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RolloutConfig {
    /// Maximum number of trials per alternative.
    #[serde(default = "default_trials")]
    pub trials: u32,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Generator used beyond the quasi-random table.
    #[serde(default)]
    pub rng: RngKind,
    #[serde(default = "default_true")]
    pub quasi_random_dice: bool,
    #[serde(default = "default_true")]
    pub variance_reduction: bool,
    #[serde(default = "default_true")]
    pub cubeful: bool,
    /// Rolling out the opening position: no doubles on the first turn.
    #[serde(default)]
    pub initial_position: bool,
    #[serde(default)]
    pub truncation: TruncationConfig,
    #[serde(default)]
    pub stop_on_std: StopOnStdConfig,
    #[serde(default)]
    pub late_evals: LateEvalConfig,
}

fn default_trials() -> u32 {
    1296
}

fn default_seed() -> u64 {
    1
}

fn default_true() -> bool {
    true
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            trials: default_trials(),
            seed: default_seed(),
            rng: RngKind::default(),
            quasi_random_dice: true,
            variance_reduction: true,
            cubeful: true,
            initial_position: false,
            truncation: TruncationConfig::default(),
            stop_on_std: StopOnStdConfig::default(),
            late_evals: LateEvalConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TruncationConfig {
    /// Stop games after `plies` turns and evaluate.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_truncation_plies")]
    pub plies: u32,
    /// Truncate cubeful money games and cubeless games at two-sided bearoff positions.
    #[serde(default = "default_true")]
    pub bearoff_two_sided: bool,
    /// Truncate cubeless games at one-sided bearoff positions.
    #[serde(default)]
    pub bearoff_one_sided: bool,
}

fn default_truncation_plies() -> u32 {
    11
}

impl Default for TruncationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            plies: default_truncation_plies(),
            bearoff_two_sided: true,
            bearoff_one_sided: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StopOnStdConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_minimum_games")]
    pub minimum_games: u32,
    /// Stop once every relevant std error is below `std_limit * |mean|`.
    #[serde(default = "default_std_limit")]
    pub std_limit: f32,
}

fn default_minimum_games() -> u32 {
    144
}

fn default_std_limit() -> f32 {
    0.01
}

impl Default for StopOnStdConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            minimum_games: default_minimum_games(),
            std_limit: default_std_limit(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LateEvalConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Turn from which the late contexts apply.
    #[serde(default)]
    pub after_turn: u32,
}

/// Plain evaluation settings (mirrors the evaluator's context).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct EvalSettings {
    #[serde(default)]
    pub plies: u32,
    #[serde(default = "default_true")]
    pub cubeful: bool,
    #[serde(default = "default_true")]
    pub deterministic: bool,
    #[serde(default)]
    pub noise: f32,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            plies: 0,
            cubeful: true,
            deterministic: true,
            noise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MoveFilterConfig {
    /// Candidates always kept after the 0-ply pass.
    #[serde(default = "default_filter_accept")]
    pub accept: u32,
    /// Further candidates kept when within this equity of the best.
    #[serde(default = "default_filter_threshold")]
    pub threshold: f32,
}

fn default_filter_accept() -> u32 {
    8
}

fn default_filter_threshold() -> f32 {
    0.16
}

impl Default for MoveFilterConfig {
    fn default() -> Self {
        Self {
            accept: default_filter_accept(),
            threshold: default_filter_threshold(),
        }
    }
}

/// Evaluation contexts, applied to both players.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub chequer: EvalSettings,
    #[serde(default)]
    pub cube: EvalSettings,
    #[serde(default)]
    pub late_chequer: EvalSettings,
    #[serde(default)]
    pub late_cube: EvalSettings,
    #[serde(default)]
    pub truncation: EvalSettings,
    #[serde(default)]
    pub move_filter: MoveFilterConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CubeConfig {
    #[serde(default = "default_cube_value")]
    pub value: u32,
    /// `None` for a centered cube, otherwise the owner's seat (0 or 1).
    #[serde(default)]
    pub owner: Option<u8>,
    /// Seat on roll (0 or 1).
    #[serde(default)]
    pub on_roll: u8,
    /// Match length; 0 for money play.
    #[serde(default)]
    pub match_to: u32,
    #[serde(default)]
    pub score: [u32; 2],
    #[serde(default)]
    pub crawford: bool,
    #[serde(default = "default_true")]
    pub jacoby: bool,
    #[serde(default = "default_true")]
    pub beavers: bool,
    #[serde(default)]
    pub variant: GameVariant,
}

fn default_cube_value() -> u32 {
    1
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            value: default_cube_value(),
            owner: None,
            on_roll: 0,
            match_to: 0,
            score: [0, 0],
            crawford: false,
            jacoby: true,
            beavers: true,
            variant: GameVariant::Standard,
        }
    }
}

impl CubeConfig {
    pub fn to_cube_info(&self) -> CubeInfo {
        CubeInfo {
            cube: self.value,
            owner: match self.owner {
                None => CubeOwner::Centered,
                Some(seat) => CubeOwner::Owned(Player::from_index(seat as usize)),
            },
            on_roll: Player::from_index(self.on_roll as usize),
            match_to: self.match_to,
            score: self.score,
            crawford: self.crawford,
            jacoby: self.jacoby,
            beavers: self.beavers,
            variant: self.variant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Worker threads; 1 runs trials inline on the calling thread.
    #[serde(default = "default_threads")]
    pub threads: u32,
    /// Trials per batch between progress reports.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: u32,
}

fn default_threads() -> u32 {
    1
}

fn default_checkpoint_every() -> u32 {
    36
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            checkpoint_every: default_checkpoint_every(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Append rollout events to this NDJSON file.
    #[serde(default)]
    pub events_path: Option<String>,
    /// Write a JSON run manifest here when the rollout ends.
    #[serde(default)]
    pub manifest_path: Option<String>,
    /// Flush every N lines (0 = flush on every write).
    #[serde(default)]
    pub flush_every_lines: u64,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

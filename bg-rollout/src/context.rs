//! Rollout settings, resolved from the YAML configuration.

use bg_core::config::{Config, EvalSettings};
use bg_core::{Player, RngKind};
use bg_eval::{EvalContext, MoveFilter};
use serde::{Deserialize, Serialize};

use crate::error::RolloutError;

/// Everything that controls how one alternative is rolled out.
///
/// Per-side arrays are indexed by the absolute seat on roll.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RolloutContext {
    pub chequer: [EvalContext; 2],
    pub cube: [EvalContext; 2],
    pub late_chequer: [EvalContext; 2],
    pub late_cube: [EvalContext; 2],
    /// Turn from which the late contexts apply; `None` disables them.
    pub late_evals_after: Option<u32>,
    pub truncation: EvalContext,
    pub move_filters: [MoveFilter; 2],
    pub late_move_filters: [MoveFilter; 2],
    /// Stop each game after this many turns; `None` plays games out.
    pub truncate_at: Option<u32>,
    pub truncate_bearoff2: bool,
    pub truncate_bearoff_os: bool,
    pub variance_reduction: bool,
    pub quasi_random_dice: bool,
    pub initial_position: bool,
    pub cubeful: bool,
    pub trials: u32,
    pub stop_on_std: bool,
    pub minimum_games: u32,
    pub std_limit: f32,
    pub rng: RngKind,
    pub seed: u64,
}

impl Default for RolloutContext {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RolloutContext {
    pub fn from_config(cfg: &Config) -> Self {
        let r = &cfg.rollout;
        let e = &cfg.evaluation;
        let both = |s: &EvalSettings| {
            let ec = EvalContext::from(s);
            [ec, ec]
        };
        let filter = MoveFilter::from(&e.move_filter);
        Self {
            chequer: both(&e.chequer),
            cube: both(&e.cube),
            late_chequer: both(&e.late_chequer),
            late_cube: both(&e.late_cube),
            late_evals_after: r.late_evals.enabled.then_some(r.late_evals.after_turn),
            truncation: EvalContext::from(&e.truncation),
            move_filters: [filter, filter],
            late_move_filters: [filter, filter],
            // Depth 0 means no truncation.
            truncate_at: (r.truncation.enabled && r.truncation.plies > 0)
                .then_some(r.truncation.plies),
            truncate_bearoff2: r.truncation.bearoff_two_sided,
            truncate_bearoff_os: r.truncation.bearoff_one_sided,
            variance_reduction: r.variance_reduction,
            quasi_random_dice: r.quasi_random_dice,
            initial_position: r.initial_position,
            cubeful: r.cubeful,
            trials: r.trials,
            stop_on_std: r.stop_on_std.enabled,
            minimum_games: r.stop_on_std.minimum_games,
            std_limit: r.stop_on_std.std_limit,
            rng: r.rng.clone(),
            seed: r.seed,
        }
    }

    pub fn validate(&self) -> Result<(), RolloutError> {
        if self.trials == 0 {
            return Err(RolloutError::InvalidConfig("trials must be > 0".into()));
        }
        if !self.std_limit.is_finite() || self.std_limit < 0.0 {
            return Err(RolloutError::InvalidConfig(format!(
                "std_limit must be a non-negative number, got {}",
                self.std_limit
            )));
        }
        if self.truncate_at == Some(0) {
            return Err(RolloutError::InvalidConfig(
                "truncation depth must be > 0".into(),
            ));
        }
        let contexts = self
            .chequer
            .iter()
            .chain(&self.cube)
            .chain(&self.late_chequer)
            .chain(&self.late_cube)
            .chain(std::iter::once(&self.truncation));
        for ec in contexts {
            if !ec.noise.is_finite() || ec.noise < 0.0 {
                return Err(RolloutError::InvalidConfig(format!(
                    "evaluation noise must be a non-negative number, got {}",
                    ec.noise
                )));
            }
        }
        if let RngKind::Manual { rolls } = &self.rng {
            if rolls.is_empty() {
                return Err(RolloutError::InvalidConfig(
                    "manual dice need at least one roll".into(),
                ));
            }
            if let Some(bad) = rolls.iter().flatten().find(|d| !(1..=6).contains(*d)) {
                return Err(RolloutError::InvalidConfig(format!(
                    "manual die {bad} is outside 1..=6"
                )));
            }
        }
        Ok(())
    }

    fn is_late(&self, turn: u32) -> bool {
        self.late_evals_after.is_some_and(|after| turn >= after)
    }

    pub fn chequer_context(&self, player: Player, turn: u32) -> EvalContext {
        if self.is_late(turn) {
            self.late_chequer[player.index()]
        } else {
            self.chequer[player.index()]
        }
    }

    pub fn cube_context(&self, player: Player, turn: u32) -> EvalContext {
        if self.is_late(turn) {
            self.late_cube[player.index()]
        } else {
            self.cube[player.index()]
        }
    }

    pub fn move_filter(&self, player: Player, turn: u32) -> MoveFilter {
        if self.is_late(turn) {
            self.late_move_filters[player.index()]
        } else {
            self.move_filters[player.index()]
        }
    }

    /// Context for the opponent's evaluation after each of the 21 rolls.
    pub fn variance_reduction_context(&self, player: Player) -> EvalContext {
        let base = self.chequer[player.index()];
        EvalContext {
            plies: base.plies.saturating_sub(1),
            cubeful: base.cubeful || self.cubeful,
            ..base
        }
    }
}

//! Alternatives, evaluation setups and resumable rollout progress.

use bg_core::{Board, CubeInfo};
use bg_eval::outputs::{NUM_OUTPUTS, NUM_PROBS};
use bg_eval::{EvalContext, Outputs};
use serde::{Deserialize, Serialize};

use crate::context::RolloutContext;
use crate::stats::RolloutStat;

/// Running statistics of one alternative.
///
/// Sums and variances are kept in `f64` so a stopped rollout can be resumed
/// without loss.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RolloutProgress {
    pub games_done: u32,
    /// Stopped early because every output was precise enough.
    pub no_more: bool,
    pub sum: [f64; NUM_OUTPUTS],
    pub variance: [f64; NUM_OUTPUTS],
    pub mean: Outputs,
    pub sigma: Outputs,
}

impl RolloutProgress {
    /// Rebuild accumulators from published means and standard errors.
    pub fn from_published(mean: Outputs, sigma: Outputs, games_done: u32) -> Self {
        let n = games_done as f64;
        let mut sum = [0.0; NUM_OUTPUTS];
        let mut variance = [0.0; NUM_OUTPUTS];
        for j in 0..NUM_OUTPUTS {
            sum[j] = mean[j] as f64 * n;
            variance[j] = sigma[j] as f64 * sigma[j] as f64 * n;
        }
        Self {
            games_done,
            no_more: false,
            sum,
            variance,
            mean,
            sigma,
        }
    }

    /// Fold the result of trial `games_done` into the running mean and variance.
    pub fn fold(&mut self, out: &Outputs) {
        let i = self.games_done;
        let n = (i + 1) as f64;
        for j in 0..NUM_OUTPUTS {
            self.sum[j] += out[j] as f64;
            let mu = (self.sum[j] / n) as f32;
            if i > 0 {
                let delta = mu - self.mean[j];
                self.variance[j] =
                    self.variance[j] * (1.0 - 1.0 / i as f64) + ((i + 1) as f32 * delta * delta) as f64;
            }
            self.mean[j] = if j < NUM_PROBS { mu.clamp(0.0, 1.0) } else { mu };
            self.sigma[j] = (self.variance[j] / n).sqrt() as f32;
        }
        self.games_done = i + 1;
    }
}

/// How a position is to be evaluated.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvalSetup {
    #[default]
    None,
    Eval(EvalContext),
    Rollout {
        context: Box<RolloutContext>,
        #[serde(default)]
        progress: Option<RolloutProgress>,
    },
}

impl EvalSetup {
    pub fn rollout(context: RolloutContext) -> Self {
        EvalSetup::Rollout {
            context: Box::new(context),
            progress: None,
        }
    }

    /// Progress of a rollout that can be resumed.
    pub fn progress(&self) -> Option<&RolloutProgress> {
        match self {
            EvalSetup::Rollout {
                progress: Some(p), ..
            } if p.games_done > 0 => Some(p),
            _ => None,
        }
    }
}

/// One line of a rollout: a position, its cube state and its results.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Alternative {
    pub label: String,
    /// Side 0 is on roll.
    pub board: Board,
    pub ci: CubeInfo,
    /// The player on roll may turn the cube before the first move.
    pub cube_decision_at_top: bool,
    pub setup: EvalSetup,
    pub mean: Outputs,
    pub std_error: Outputs,
    pub stats: RolloutStat,
}

impl Alternative {
    pub fn new(label: impl Into<String>, board: Board, ci: CubeInfo) -> Self {
        Self {
            label: label.into(),
            board,
            ci,
            cube_decision_at_top: false,
            setup: EvalSetup::None,
            mean: [0.0; NUM_OUTPUTS],
            std_error: [0.0; NUM_OUTPUTS],
            stats: RolloutStat::default(),
        }
    }

    pub fn with_cube_decision_at_top(mut self, yes: bool) -> Self {
        self.cube_decision_at_top = yes;
        self
    }

    pub fn with_setup(mut self, setup: EvalSetup) -> Self {
        self.setup = setup;
        self
    }

    pub fn games_done(&self) -> u32 {
        self.setup.progress().map_or(0, |p| p.games_done)
    }
}

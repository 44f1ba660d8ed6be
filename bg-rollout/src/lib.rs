//! bg-rollout: cube-aware Monte-Carlo rollouts.
//!
//! [`rollout_general`] plays the same quasi-random games for every
//! [`Alternative`], folds the per-trial outputs into running means and
//! standard errors and stops early once they are precise enough.

pub mod api;
pub mod context;
pub mod driver;
pub mod error;
pub mod executor;
pub mod setup;
pub mod simulator;
pub mod stats;

pub use api::{
    cube_decision_rollout, evaluate_rollout, extend_cube_decision_rollout, general_cube_decision,
    general_evaluation, resign_equities, resignation, score_moves_rollout, CubeRolloutResult,
    MoveRolloutScore, Resignation, RolloutResult,
};
pub use context::RolloutContext;
pub use driver::{
    rollout_general, AlternativeProgress, ProgressReport, RolloutHooks, RolloutSummary,
};
pub use error::RolloutError;
pub use executor::TrialExecutor;
pub use setup::{Alternative, EvalSetup, RolloutProgress};
pub use simulator::{simulate_trial, TrialLine};
pub use stats::{PlayerStat, RolloutStat, STAT_MAXCUBE};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_nonempty() {
        assert!(!VERSION.is_empty());
    }
}

#[cfg(test)]
mod simulator_tests;

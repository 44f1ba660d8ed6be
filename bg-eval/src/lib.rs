//! bg-eval: evaluation interfaces, equity model and cube decisions.
//!
//! The [`Evaluator`] trait is the seam to a position evaluator; everything in
//! this crate (lookahead, move choice, cubeful equity, cube classification)
//! is built on the five probabilities it returns.

pub mod context;
pub mod cube;
pub mod equity;
pub mod evaluator;
pub mod lookahead;
pub mod met;
pub mod outputs;
pub mod sanity;

pub use context::{EvalContext, MoveFilter};
pub use cube::{find_cube_decision, CubeAction, CubeDecision, DoublePointEquities};
pub use equity::{cube_efficiency, cubeful_equity, double_point, gammon_prices, utility};
pub use evaluator::{EvalEnv, EvalError, Evaluator, HeuristicEvaluator};
pub use lookahead::{
    evaluate_probs, find_best_move, general_cube_decision_e, general_evaluation_e, score_plays,
    ScoredPlay,
};
pub use met::{default_met, MatchEquityTable};
pub use outputs::{invert_outputs, invert_probs, Outputs, Probs};
pub use sanity::sanity_check;

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
mod cube_tests;
#[cfg(test)]
mod equity_tests;
#[cfg(test)]
mod evaluator_tests;
#[cfg(test)]
mod lookahead_tests;

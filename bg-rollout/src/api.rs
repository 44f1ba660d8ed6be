//! Entry points: position, cube-decision and move rollouts, setup dispatch
//! and resignation analysis.

use bg_core::{Board, CubeInfo, CubeOwner, Play};
use bg_eval::outputs::{
    probs_of, NUM_OUTPUTS, OUTPUT_CUBEFUL_EQUITY, OUTPUT_EQUITY, OUTPUT_LOSEBACKGAMMON,
    OUTPUT_LOSEGAMMON,
};
use bg_eval::{
    double_point, find_cube_decision, general_cube_decision_e, general_evaluation_e, utility,
    CubeDecision, DoublePointEquities, EvalEnv, Outputs, Probs,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::RolloutContext;
use crate::driver::{rollout_general, RolloutHooks, RolloutSummary};
use crate::error::RolloutError;
use crate::setup::{Alternative, EvalSetup};
use crate::stats::RolloutStat;

/// Result of rolling out a single position.
#[derive(Debug, Clone)]
pub struct RolloutResult {
    pub mean: Outputs,
    pub std_error: Outputs,
    pub stats: RolloutStat,
    pub summary: RolloutSummary,
}

/// Result of rolling out no double against double/take.
#[derive(Debug, Clone)]
pub struct CubeRolloutResult {
    /// `[no double, double/take]`; money take equity is in units of the current cube.
    pub outputs: [Outputs; 2],
    pub std_errors: [Outputs; 2],
    pub stats: [RolloutStat; 2],
    pub decision: CubeDecision,
    pub equities: DoublePointEquities,
    pub summary: RolloutSummary,
    /// Resumable state of both lines; see [`extend_cube_decision_rollout`].
    pub setups: [EvalSetup; 2],
}

/// Rollout score of one candidate play, from the mover's point of view.
#[derive(Debug, Clone)]
pub struct MoveRolloutScore {
    pub label: String,
    pub board: Board,
    pub mean: Outputs,
    pub std_error: Outputs,
    /// Cubeful equity (match play: converted from MWC) or cubeless equity.
    pub score: f32,
    /// Cubeless equity.
    pub score2: f32,
}

/// Roll out `board` with the player on roll in `ci` to move.
pub fn evaluate_rollout(
    board: &Board,
    ci: &CubeInfo,
    ctx: &RolloutContext,
    env: &EvalEnv<'_>,
    hooks: RolloutHooks<'_>,
) -> Result<RolloutResult, RolloutError> {
    let mut alts = [Alternative::new("position", *board, *ci)];
    let summary = rollout_general(&mut alts, false, ctx, env, hooks)?;
    let [alt] = alts;
    Ok(RolloutResult {
        mean: alt.mean,
        std_error: alt.std_error,
        stats: alt.stats,
        summary,
    })
}

/// Roll out the no-double and double/take lines and classify the decision.
pub fn cube_decision_rollout(
    board: &Board,
    ci: &CubeInfo,
    ctx: &RolloutContext,
    env: &EvalEnv<'_>,
    hooks: RolloutHooks<'_>,
) -> Result<CubeRolloutResult, RolloutError> {
    let fresh = [EvalSetup::None, EvalSetup::None];
    roll_out_cube_lines(board, ci, fresh, Default::default(), ctx, env, hooks)
}

/// Continue `previous` up to `ctx.trials` trials.
///
/// Both lines resume from their stored progress and statistics, so the
/// result matches a single run of the same length.
pub fn extend_cube_decision_rollout(
    board: &Board,
    ci: &CubeInfo,
    previous: &CubeRolloutResult,
    ctx: &RolloutContext,
    env: &EvalEnv<'_>,
    hooks: RolloutHooks<'_>,
) -> Result<CubeRolloutResult, RolloutError> {
    roll_out_cube_lines(
        board,
        ci,
        previous.setups.clone(),
        previous.stats.clone(),
        ctx,
        env,
        hooks,
    )
}

fn roll_out_cube_lines(
    board: &Board,
    ci: &CubeInfo,
    setups: [EvalSetup; 2],
    stats: [RolloutStat; 2],
    ctx: &RolloutContext,
    env: &EvalEnv<'_>,
    hooks: RolloutHooks<'_>,
) -> Result<CubeRolloutResult, RolloutError> {
    if double_point(ci, env.met).is_none() {
        return Err(RolloutError::CubeUnavailable);
    }
    let mut ctx = ctx.clone();
    if !ctx.cubeful {
        info!("cube decision rollouts are cubeful; enabling cubeful evaluation");
        ctx.cubeful = true;
    }

    let mut alts = [
        Alternative::new("no double", *board, *ci),
        Alternative::new("double, take", *board, ci.doubled()),
    ];
    for ((alt, mut setup), stats) in alts.iter_mut().zip(setups).zip(stats) {
        if let EvalSetup::Rollout { context, .. } = &mut setup {
            context.cubeful = true;
        }
        alt.setup = setup;
        alt.stats = stats;
    }
    let summary = rollout_general(&mut alts, false, &ctx, env, hooks)?;
    let [nd, dt] = alts;
    let outputs = [nd.mean, dt.mean];
    let (decision, equities) = find_cube_decision(&outputs, ci, env.met);
    Ok(CubeRolloutResult {
        outputs,
        std_errors: [nd.std_error, dt.std_error],
        stats: [nd.stats, dt.stats],
        decision,
        equities,
        summary,
        setups: [nd.setup, dt.setup],
    })
}

/// Roll out the positions after each play; `ci` has the mover on roll.
///
/// Every position is rolled out from the opponent's seat and the results
/// inverted, so scores are for the mover.
pub fn score_moves_rollout(
    plays: &[Play],
    ci: &CubeInfo,
    ctx: &RolloutContext,
    env: &EvalEnv<'_>,
    hooks: RolloutHooks<'_>,
) -> Result<(Vec<MoveRolloutScore>, RolloutSummary), RolloutError> {
    let opp = ci.flipped();
    let mut alts: Vec<Alternative> = plays
        .iter()
        .map(|p| {
            Alternative::new(p.to_string(), p.board.swapped(), opp).with_cube_decision_at_top(true)
        })
        .collect();
    let summary = rollout_general(&mut alts, true, ctx, env, hooks)?;

    let scores = plays
        .iter()
        .zip(alts)
        .map(|(play, alt)| {
            let score = if ctx.cubeful {
                if ci.is_money() {
                    alt.mean[OUTPUT_CUBEFUL_EQUITY]
                } else {
                    env.met.mwc2eq(alt.mean[OUTPUT_CUBEFUL_EQUITY], ci)
                }
            } else {
                alt.mean[OUTPUT_EQUITY]
            };
            MoveRolloutScore {
                label: alt.label,
                board: play.board,
                mean: alt.mean,
                std_error: alt.std_error,
                score,
                score2: alt.mean[OUTPUT_EQUITY],
            }
        })
        .collect();
    Ok((scores, summary))
}

/// Evaluate a position as `setup` asks; returns means and standard errors.
pub fn general_evaluation(
    board: &Board,
    ci: &CubeInfo,
    setup: &EvalSetup,
    env: &EvalEnv<'_>,
    hooks: RolloutHooks<'_>,
) -> Result<(Outputs, Outputs), RolloutError> {
    let zero = [0.0; NUM_OUTPUTS];
    match setup {
        EvalSetup::None => Ok((zero, zero)),
        EvalSetup::Eval(ec) => {
            let out = general_evaluation_e(board, ci, ec, env).map_err(|source| {
                RolloutError::Eval {
                    source,
                    trials_completed: 0,
                }
            })?;
            Ok((out, zero))
        }
        EvalSetup::Rollout { context, .. } => {
            let r = evaluate_rollout(board, ci, context, env, hooks)?;
            Ok((r.mean, r.std_error))
        }
    }
}

/// No-double and double/take evaluations.
///
/// `setups[0]` selects the method. Rollouts resume each line from its setup
/// and write the updated progress back, so raising the trials in
/// `setups[0]` and calling again extends the rollout.
pub fn general_cube_decision(
    board: &Board,
    ci: &CubeInfo,
    setups: &mut [EvalSetup; 2],
    env: &EvalEnv<'_>,
    hooks: RolloutHooks<'_>,
) -> Result<([Outputs; 2], [Outputs; 2]), RolloutError> {
    let zero = [[0.0; NUM_OUTPUTS]; 2];
    match &setups[0] {
        EvalSetup::None => Ok((zero, zero)),
        EvalSetup::Eval(ec) => {
            let out = general_cube_decision_e(board, ci, ec, env).map_err(|source| {
                RolloutError::Eval {
                    source,
                    trials_completed: 0,
                }
            })?;
            Ok((out, zero))
        }
        EvalSetup::Rollout { context, .. } => {
            let ctx = (**context).clone();
            let r = roll_out_cube_lines(
                board,
                ci,
                setups.clone(),
                Default::default(),
                &ctx,
                env,
                hooks,
            )?;
            *setups = r.setups;
            Ok((r.outputs, r.std_errors))
        }
    }
}

/// What the player on roll should resign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Resignation {
    None,
    Single,
    Gammon,
    Backgammon,
}

impl Resignation {
    pub fn points(self) -> u32 {
        match self {
            Resignation::None => 0,
            Resignation::Single => 1,
            Resignation::Gammon => 2,
            Resignation::Backgammon => 3,
        }
    }
}

const RESIGN_TOLERANCE: f32 = 1e-6;

/// Jacoby money game with a centered cube: gammons do not count.
fn only_single_counts(ci: &CubeInfo) -> bool {
    ci.is_money() && ci.jacoby && ci.owner == CubeOwner::Centered
}

/// Resign when a sure loss of that size is worth as much as playing on.
/// Returns the decision and the evaluation it was based on.
pub fn resignation(
    board: &Board,
    ci: &CubeInfo,
    setup: &EvalSetup,
    env: &EvalEnv<'_>,
) -> Result<(Resignation, Outputs), RolloutError> {
    let (out, _) = general_evaluation(board, ci, setup, env, RolloutHooks::default())?;
    let play = utility(&probs_of(&out), ci, env.met);
    let same = |q: &Probs| (utility(q, ci, env.met) - play).abs() < RESIGN_TOLERANCE;

    let mut sure: Probs = [0.0, 0.0, 0.0, 1.0, 1.0];
    let capped = |r: Resignation| {
        if only_single_counts(ci) {
            Resignation::Single
        } else {
            r
        }
    };

    if out[OUTPUT_LOSEBACKGAMMON] > 0.0 && same(&sure) {
        return Ok((capped(Resignation::Backgammon), out));
    }
    sure[OUTPUT_LOSEBACKGAMMON] = 0.0;
    if out[OUTPUT_LOSEGAMMON] > 0.0 && same(&sure) {
        return Ok((capped(Resignation::Gammon), out));
    }
    sure[OUTPUT_LOSEGAMMON] = 0.0;
    let decision = if same(&sure) {
        Resignation::Single
    } else {
        Resignation::None
    };
    Ok((decision, out))
}

/// Cubeless equity before and after accepting a resignation of `resigned`.
pub fn resign_equities(
    out: &Outputs,
    ci: &CubeInfo,
    resigned: Resignation,
    env: &EvalEnv<'_>,
) -> (f32, f32) {
    let before = utility(&probs_of(out), ci, env.met);
    let mut sure: Probs = [0.0; 5];
    if resigned >= Resignation::Gammon {
        sure[OUTPUT_LOSEGAMMON] = 1.0;
    }
    if resigned >= Resignation::Backgammon {
        sure[OUTPUT_LOSEBACKGAMMON] = 1.0;
    }
    (before, utility(&sure, ci, env.met))
}

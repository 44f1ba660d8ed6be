//! One simulated game per line, with cube handling and variance reduction.
//!
//! All lines of a call share the dice. Every output is expressed for the
//! player on roll at the start of the game (the root).

use bg_core::{game_status, Board, CubeInfo, DiceSource, Player, PositionClass, BAR};
use bg_eval::outputs::{NUM_OUTPUTS, OUTPUT_CUBEFUL_EQUITY, OUTPUT_EQUITY};
use bg_eval::{
    double_point, find_best_move, find_cube_decision, general_cube_decision_e,
    general_evaluation_e, invert_outputs, CubeAction, EvalContext, EvalEnv, EvalError, MoveFilter,
    Outputs,
};

use crate::context::RolloutContext;
use crate::stats::RolloutStat;

/// Simulation state of one line for a single trial.
#[derive(Debug, Clone)]
pub struct TrialLine {
    pub board: Board,
    pub ci: CubeInfo,
    pub cube_decision_at_top: bool,
    /// Money cubeful results are expressed in units of this cube.
    pub reference_cube: u32,
    pub finished: bool,
    pub output: Outputs,
    pub stats: Option<RolloutStat>,
    root: Player,
    initial_cube: u32,
    var_redn: Outputs,
    hit: [bool; 2],
    closed_out: [bool; 2],
}

impl TrialLine {
    pub fn new(board: Board, ci: CubeInfo, cube_decision_at_top: bool) -> Self {
        Self {
            board,
            ci,
            cube_decision_at_top,
            reference_cube: ci.cube,
            finished: false,
            output: [0.0; NUM_OUTPUTS],
            stats: None,
            root: ci.on_roll,
            initial_cube: ci.cube,
            var_redn: [0.0; NUM_OUTPUTS],
            hit: [false; 2],
            closed_out: [false; 2],
        }
    }

    pub fn with_stats(mut self) -> Self {
        self.stats = Some(RolloutStat::default());
        self
    }

    pub fn with_reference_cube(mut self, cube: u32) -> Self {
        self.reference_cube = cube;
        self
    }

    /// Store outputs of the player on roll as the line result.
    fn finish(&mut self, mut out: Outputs) {
        if self.ci.on_roll != self.root {
            invert_outputs(&mut out, &self.ci);
        }
        self.output = out;
        self.finished = true;
    }

    fn stats_mut(&mut self) -> Option<&mut RolloutStat> {
        self.stats.as_mut()
    }
}

fn home_board_closed(board: &Board) -> bool {
    board.side(0)[..6].iter().all(|&c| c > 1)
}

/// Play one game for every line, starting at `first_turn`.
pub fn simulate_trial(
    lines: &mut [TrialLine],
    first_turn: u32,
    trial: u32,
    ctx: &RolloutContext,
    env: &EvalEnv<'_>,
    dice: &DiceSource,
) -> Result<(), EvalError> {
    let mut rolls = dice.trial(trial);
    let mut turn = first_turn;

    while ctx.truncate_at.map_or(true, |limit| turn < limit) && lines.iter().any(|l| !l.finished)
    {
        for line in lines.iter_mut().filter(|l| !l.finished) {
            cube_phase(line, turn, ctx, env)?;
        }

        let (d0, d1) = rolls.roll(turn, ctx.initial_position);
        if !(1..=6).contains(&d0) || !(1..=6).contains(&d1) {
            return Err(EvalError::Evaluator(format!(
                "roll {d0}-{d1} on turn {turn} is outside 1..=6"
            )));
        }

        for line in lines.iter_mut().filter(|l| !l.finished) {
            move_phase(line, turn, (d0, d1), ctx, env)?;
            if !line.finished {
                line.board.swap_sides();
                line.ci = line.ci.flipped();
            }
        }

        turn += 1;
    }

    for line in lines.iter_mut() {
        if !line.finished {
            let ec = ctx.truncation.with_cubeful(ctx.cubeful);
            let out = general_evaluation_e(&line.board, &line.ci, &ec, env)?;
            line.finish(out);
        }

        let money = line.ci.is_money();
        if money {
            line.output[OUTPUT_CUBEFUL_EQUITY] *= line.ci.cube as f32 / line.initial_cube as f32;
        }
        if ctx.variance_reduction {
            for (o, v) in line.output.iter_mut().zip(line.var_redn) {
                *o += v;
            }
        }
        if money {
            line.output[OUTPUT_CUBEFUL_EQUITY] *=
                line.initial_cube as f32 / line.reference_cube.max(1) as f32;
        }
    }
    Ok(())
}

fn cube_live(line: &TrialLine, turn: u32, ctx: &RolloutContext) -> bool {
    turn > 0 || (line.cube_decision_at_top && !ctx.initial_position)
}

fn cube_phase(
    line: &mut TrialLine,
    turn: u32,
    ctx: &RolloutContext,
    env: &EvalEnv<'_>,
) -> Result<(), EvalError> {
    let class = env.classify(&line.board, line.ci.variant);

    if class == PositionClass::Over {
        return game_over(line, turn, ctx, env);
    }

    if ctx.truncate_bearoff2
        && class.is_two_sided_bearoff()
        && ctx.cubeful
        && line.ci.is_money()
        && cube_live(line, turn, ctx)
    {
        let out = general_evaluation_e(&line.board, &line.ci, &EvalContext::zero_ply(true), env)?;
        line.finish(out);
        return Ok(());
    }

    if !ctx.cubeful
        && ((ctx.truncate_bearoff2 && class.is_two_sided_bearoff())
            || (ctx.truncate_bearoff_os && class.is_one_sided_bearoff()))
    {
        let out =
            general_evaluation_e(&line.board, &line.ci, &EvalContext::zero_ply(false), env)?;
        line.finish(out);
        return Ok(());
    }

    if !ctx.cubeful || !cube_live(line, turn, ctx) {
        return Ok(());
    }
    let Some(dp) = double_point(&line.ci, env.met) else {
        return Ok(());
    };

    let doubler = line.ci.on_roll;
    let ec = ctx.cube_context(doubler, turn);
    let both = general_cube_decision_e(&line.board, &line.ci, &ec, env)?;
    let (decision, _) = find_cube_decision(&both, &line.ci, env.met);
    let log_cube = line.ci.log_cube();

    match decision.action() {
        CubeAction::Take => {
            if let Some(s) = line.stats_mut() {
                s.record_double_take(doubler, log_cube);
            }
            line.ci = line.ci.doubled();
        }
        CubeAction::Pass => {
            let mut out = both[0];
            out[OUTPUT_CUBEFUL_EQUITY] = dp;
            line.finish(out);
            if let Some(s) = line.stats_mut() {
                s.record_double_drop(doubler, log_cube);
            }
        }
        CubeAction::NoOp => {}
    }
    Ok(())
}

fn move_phase(
    line: &mut TrialLine,
    turn: u32,
    (d0, d1): (u8, u8),
    ctx: &RolloutContext,
    env: &EvalEnv<'_>,
) -> Result<(), EvalError> {
    let mover = line.ci.on_roll;
    let variant = line.ci.variant;
    let chequer = ctx.chequer_context(mover, turn);
    let filter = ctx.move_filter(mover, turn);

    let opp_bar_before = line.board.side(1)[BAR];
    let class_before = env.classify(&line.board, variant);
    let pips_before = line.board.pip_count()[0];

    if ctx.variance_reduction {
        let finder = EvalContext::zero_ply(ctx.cubeful);
        let opp_ci = line.ci.flipped();
        let reduced = ctx.variance_reduction_context(opp_ci.on_roll);
        let skip_doubles = ctx.initial_position && turn == 0;

        let mut after = [[None::<(Board, Outputs)>; 6]; 6];
        let mut mean = [0.0f32; NUM_OUTPUTS];
        for hi in 1..=6u8 {
            for lo in 1..=hi {
                if skip_doubles && hi == lo {
                    continue;
                }
                let moved =
                    find_best_move(&line.board, hi, lo, &line.ci, &finder, &MoveFilter::default(), env)?;
                let mut out = general_evaluation_e(&moved.swapped(), &opp_ci, &reduced, env)?;
                if opp_ci.on_roll != line.root {
                    invert_outputs(&mut out, &line.ci);
                }
                let weight = if hi == lo { 1.0 } else { 2.0 };
                for (m, v) in mean.iter_mut().zip(out) {
                    *m += weight * v;
                }
                after[hi as usize - 1][lo as usize - 1] = Some((moved, out));
            }
        }
        let rolls = if skip_doubles { 30.0 } else { 36.0 };
        for m in &mut mean {
            *m /= rolls;
        }

        let Some((reused, actual)) = after[d0 as usize - 1][d1 as usize - 1] else {
            return Err(EvalError::Evaluator(format!(
                "no variance reduction entry for roll {d0}-{d1}"
            )));
        };
        line.board = if chequer.plies == 0 && chequer.cubeful == ctx.cubeful && chequer.noise == 0.0
        {
            reused
        } else {
            find_best_move(&line.board, d0, d1, &line.ci, &chequer, &filter, env)?
        };

        let cube_ratio = line.ci.cube as f32 / line.initial_cube as f32;
        for k in 0..NUM_OUTPUTS {
            let diff = mean[k] - actual[k];
            line.var_redn[k] += if k == OUTPUT_CUBEFUL_EQUITY && line.ci.is_money() {
                diff * cube_ratio
            } else {
                diff
            };
        }
    } else {
        line.board = find_best_move(&line.board, d0, d1, &line.ci, &chequer, &filter, env)?;
    }

    let class_after = env.classify(&line.board, variant);

    if line.stats.is_some() {
        let m = mover.index();
        if !line.hit[m] && line.board.side(1)[BAR] > opp_bar_before {
            line.hit[m] = true;
            if let Some(s) = line.stats_mut() {
                s.record_hit(mover, turn);
            }
        }
        if class_before.is_one_sided_bearoff() && class_after.is_one_sided_bearoff() {
            let pips_after = line.board.pip_count()[0];
            let dice_pips = if d0 == d1 {
                4 * d0 as u32
            } else {
                (d0 + d1) as u32
            };
            let wasted = dice_pips.saturating_sub(pips_before.saturating_sub(pips_after));
            if let Some(s) = line.stats_mut() {
                s.record_bearoff(mover, wasted);
            }
        }
        if !line.closed_out[m] && line.board.side(1)[BAR] > 0 && home_board_closed(&line.board) {
            line.closed_out[m] = true;
            if let Some(s) = line.stats_mut() {
                s.record_closeout(mover, turn);
            }
        }
    }

    if class_after == PositionClass::Over {
        game_over(line, turn, ctx, env)?;
    }
    Ok(())
}

/// Evaluate a finished game for the player on roll and record who won.
fn game_over(
    line: &mut TrialLine,
    turn: u32,
    ctx: &RolloutContext,
    env: &EvalEnv<'_>,
) -> Result<(), EvalError> {
    let ec = ctx.cube_context(line.ci.on_roll, turn);
    let mut out = general_evaluation_e(&line.board, &line.ci, &ec, env)?;
    out[OUTPUT_CUBEFUL_EQUITY] = if line.ci.is_money() {
        out[OUTPUT_EQUITY]
    } else {
        env.met.eq2mwc(out[OUTPUT_EQUITY], &line.ci)
    };

    if let Some((side, result)) = game_status(&line.board, line.ci.variant) {
        let winner = if side == 0 {
            line.ci.on_roll
        } else {
            line.ci.on_roll.opponent()
        };
        let log_cube = line.ci.log_cube();
        if let Some(s) = line.stats_mut() {
            s.record_win(winner, log_cube, result);
        }
    }
    line.finish(out);
    Ok(())
}

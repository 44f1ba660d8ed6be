//! N-ply evaluation, full output vectors and move selection.

use bg_core::{generate_moves, Board, CubeInfo, Play, PositionClass};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::context::{EvalContext, MoveFilter};
use crate::equity::{cube_efficiency, cubeful_equity, utility};
use crate::evaluator::{terminal_probs, EvalEnv, EvalError};
use crate::outputs::{
    invert_outputs, invert_probs, Outputs, Probs, NUM_PROBS, OUTPUT_CUBEFUL_EQUITY,
    OUTPUT_EQUITY, OUTPUT_LOSEBACKGAMMON, OUTPUT_LOSEGAMMON, OUTPUT_WIN, OUTPUT_WINBACKGAMMON,
    OUTPUT_WINGAMMON,
};

/// Perturb static probabilities; deterministic noise depends only on the position.
fn add_noise(p: &mut Probs, board: &Board, ec: &EvalContext) {
    let Ok(normal) = Normal::new(0.0f32, ec.noise) else {
        return;
    };
    if ec.deterministic {
        let mut rng = ChaCha8Rng::seed_from_u64(board.position_key());
        for v in p.iter_mut() {
            *v += normal.sample(&mut rng);
        }
    } else {
        let mut rng = rand::thread_rng();
        for v in p.iter_mut() {
            *v += normal.sample(&mut rng);
        }
    }
    p[OUTPUT_WIN] = p[OUTPUT_WIN].clamp(0.0, 1.0);
    let lose = 1.0 - p[OUTPUT_WIN];
    p[OUTPUT_WINGAMMON] = p[OUTPUT_WINGAMMON].clamp(0.0, p[OUTPUT_WIN]);
    p[OUTPUT_WINBACKGAMMON] = p[OUTPUT_WINBACKGAMMON].clamp(0.0, p[OUTPUT_WINGAMMON]);
    p[OUTPUT_LOSEGAMMON] = p[OUTPUT_LOSEGAMMON].clamp(0.0, lose);
    p[OUTPUT_LOSEBACKGAMMON] = p[OUTPUT_LOSEBACKGAMMON].clamp(0.0, p[OUTPUT_LOSEGAMMON]);
}

/// Cubeless probabilities for the player on roll, searched `ec.plies` deep.
pub fn evaluate_probs(
    board: &Board,
    ci: &CubeInfo,
    ec: &EvalContext,
    env: &EvalEnv<'_>,
) -> Result<Probs, EvalError> {
    if env.classify(board, ci.variant) == PositionClass::Over {
        return Ok(terminal_probs(board, ci.variant));
    }
    if ec.plies == 0 {
        let mut p = env.evaluator.evaluate(board, ci, ec)?;
        if ec.noise > 0.0 {
            add_noise(&mut p, board, ec);
        }
        return Ok(p);
    }

    let chooser = EvalContext::zero_ply(ec.cubeful);
    let deeper = ec.with_plies(ec.plies - 1);
    let opp_ci = ci.flipped();
    let mut acc = [0.0f32; NUM_PROBS];
    for d0 in 1..=6u8 {
        for d1 in 1..=d0 {
            let moved = find_best_move(board, d0, d1, ci, &chooser, &MoveFilter::default(), env)?;
            let mut p = evaluate_probs(&moved.swapped(), &opp_ci, &deeper, env)?;
            invert_probs(&mut p);
            let weight = if d0 == d1 { 1.0 } else { 2.0 };
            for (a, v) in acc.iter_mut().zip(p) {
                *a += weight * v;
            }
        }
    }
    for a in &mut acc {
        *a /= 36.0;
    }
    Ok(acc)
}

/// Probabilities plus cubeless and cubeful equity for the player on roll.
pub fn general_evaluation_e(
    board: &Board,
    ci: &CubeInfo,
    ec: &EvalContext,
    env: &EvalEnv<'_>,
) -> Result<Outputs, EvalError> {
    let p = evaluate_probs(board, ci, ec, env)?;
    let class = env.classify(board, ci.variant);
    let equity = utility(&p, ci, env.met);
    let dead = if ci.is_money() {
        equity
    } else {
        env.met.eq2mwc(equity, ci)
    };
    let cubeful = if ec.cubeful && class != PositionClass::Over {
        cubeful_equity(&p, ci, cube_efficiency(board, class), env.met)
    } else {
        dead
    };
    Ok([p[0], p[1], p[2], p[3], p[4], equity, cubeful])
}

/// No-double and double/take evaluations; money take equity is scaled to the
/// current cube.
pub fn general_cube_decision_e(
    board: &Board,
    ci: &CubeInfo,
    ec: &EvalContext,
    env: &EvalEnv<'_>,
) -> Result<[Outputs; 2], EvalError> {
    let ec = ec.with_cubeful(true);
    let no_double = general_evaluation_e(board, ci, &ec, env)?;
    let mut take = general_evaluation_e(board, &ci.doubled(), &ec, env)?;
    if ci.is_money() {
        take[OUTPUT_CUBEFUL_EQUITY] *= 2.0;
    }
    Ok([no_double, take])
}

#[derive(Debug, Clone)]
pub struct ScoredPlay {
    pub play: Play,
    /// Outputs for the mover after the play.
    pub outputs: Outputs,
    pub score: f32,
}

fn score_after(
    after: &Board,
    ci: &CubeInfo,
    ec: &EvalContext,
    env: &EvalEnv<'_>,
) -> Result<(Outputs, f32), EvalError> {
    let mut out = general_evaluation_e(&after.swapped(), &ci.flipped(), ec, env)?;
    invert_outputs(&mut out, ci);
    let score = if ec.cubeful {
        out[OUTPUT_CUBEFUL_EQUITY]
    } else {
        out[OUTPUT_EQUITY]
    };
    Ok((out, score))
}

/// Rank plays best first: every play at 0-ply, then the candidates passing
/// `filter` again at `ec.plies`.
pub fn score_plays(
    plays: Vec<Play>,
    ci: &CubeInfo,
    ec: &EvalContext,
    filter: &MoveFilter,
    env: &EvalEnv<'_>,
) -> Result<Vec<ScoredPlay>, EvalError> {
    let shallow = EvalContext {
        plies: 0,
        ..*ec
    };
    let mut scored = Vec::with_capacity(plays.len());
    for play in plays {
        let (outputs, score) = score_after(&play.board, ci, &shallow, env)?;
        scored.push(ScoredPlay {
            play,
            outputs,
            score,
        });
    }
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    if ec.plies == 0 || scored.len() <= 1 {
        return Ok(scored);
    }

    let best = scored[0].score;
    let keep = scored
        .iter()
        .enumerate()
        .take_while(|(i, s)| *i < filter.accept.max(1) as usize || best - s.score <= filter.threshold)
        .count();
    for entry in scored.iter_mut().take(keep) {
        let (outputs, score) = score_after(&entry.play.board, ci, ec, env)?;
        entry.outputs = outputs;
        entry.score = score;
    }
    scored[..keep].sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(scored)
}

/// Board after the best play for `(d0, d1)`, still from the mover's side.
pub fn find_best_move(
    board: &Board,
    d0: u8,
    d1: u8,
    ci: &CubeInfo,
    ec: &EvalContext,
    filter: &MoveFilter,
    env: &EvalEnv<'_>,
) -> Result<Board, EvalError> {
    let mut plays = generate_moves(board, d0, d1)?;
    if plays.len() == 1 {
        return Ok(plays.swap_remove(0).board);
    }
    let ranked = score_plays(plays, ci, ec, filter, env)?;
    Ok(ranked.first().map_or(*board, |s| s.play.board))
}

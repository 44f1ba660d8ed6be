use bg_core::{Board, CubeInfo, GameVariant, Player};

use crate::context::{EvalContext, MoveFilter};
use crate::evaluator::EvalEnv;
use crate::lookahead::{
    evaluate_probs, find_best_move, general_cube_decision_e, general_evaluation_e, score_plays,
};
use crate::outputs::{OUTPUT_CUBEFUL_EQUITY, OUTPUT_EQUITY};

fn board_from(me: &[(usize, u8)], opp: &[(usize, u8)]) -> Board {
    let mut b = Board::empty();
    for &(i, c) in me {
        b.0[0][i] = c;
    }
    for &(i, c) in opp {
        b.0[1][i] = c;
    }
    b
}

#[test]
fn one_ply_is_average_over_rolls() {
    let env = EvalEnv::reference();
    let ci = CubeInfo::money(Player::Zero);
    // Two chequers on the ace point: every roll bears both off.
    let b = board_from(&[(0, 2)], &[(0, 15)]);
    let p = evaluate_probs(&b, &ci, &EvalContext::zero_ply(false).with_plies(1), &env).unwrap();
    assert_eq!(p, [1.0, 1.0, 0.0, 0.0, 0.0]);
}

#[test]
fn one_ply_stays_consistent_in_the_opening() {
    let env = EvalEnv::reference();
    let ci = CubeInfo::money(Player::Zero);
    let b = Board::initial(GameVariant::Standard);
    let p = evaluate_probs(&b, &ci, &EvalContext::zero_ply(true).with_plies(1), &env).unwrap();
    assert!((0.0..=1.0).contains(&p[0]));
    assert!(p[1] <= p[0] + 1e-5);
}

#[test]
fn deterministic_noise_is_repeatable() {
    let env = EvalEnv::reference();
    let ci = CubeInfo::money(Player::Zero);
    let b = Board::initial(GameVariant::Standard);
    let ec = EvalContext {
        noise: 0.05,
        ..EvalContext::zero_ply(false)
    };
    let a = evaluate_probs(&b, &ci, &ec, &env).unwrap();
    let c = evaluate_probs(&b, &ci, &ec, &env).unwrap();
    assert_eq!(a, c);
    let clean = evaluate_probs(&b, &ci, &EvalContext::zero_ply(false), &env).unwrap();
    assert_ne!(a, clean);
}

#[test]
fn random_noise_keeps_probabilities_consistent() {
    let env = EvalEnv::reference();
    let ci = CubeInfo::money(Player::Zero);
    let b = Board::initial(GameVariant::Standard);
    let ec = EvalContext {
        deterministic: false,
        noise: 0.2,
        ..EvalContext::zero_ply(false)
    };
    for _ in 0..50 {
        let p = evaluate_probs(&b, &ci, &ec, &env).unwrap();
        assert!((0.0..=1.0).contains(&p[0]));
        assert!(p[1] >= 0.0 && p[1] <= p[0]);
        assert!(p[2] >= 0.0 && p[2] <= p[1]);
        assert!(p[3] >= 0.0 && p[3] <= 1.0 - p[0]);
        assert!(p[4] >= 0.0 && p[4] <= p[3]);
    }
}

#[test]
fn cubeless_context_copies_equity() {
    let env = EvalEnv::reference();
    let ci = CubeInfo::money(Player::Zero);
    let b = Board::initial(GameVariant::Standard);
    let out = general_evaluation_e(&b, &ci, &EvalContext::zero_ply(false), &env).unwrap();
    assert_eq!(out[OUTPUT_EQUITY], out[OUTPUT_CUBEFUL_EQUITY]);
}

#[test]
fn cube_decision_pair_scales_take_for_money() {
    let env = EvalEnv::reference();
    let ci = CubeInfo::money(Player::Zero);
    let b = board_from(&[(0, 2)], &[(0, 15)]);
    let [nd, take] = general_cube_decision_e(&b, &ci, &EvalContext::zero_ply(false), &env).unwrap();
    // Certain gammon: cube owned by the taker values the game at twice the cube.
    assert!((nd[OUTPUT_CUBEFUL_EQUITY] - 1.0).abs() < 1e-5);
    assert!((take[OUTPUT_CUBEFUL_EQUITY] - 4.0).abs() < 1e-5);
}

#[test]
fn best_move_prefers_bearing_off() {
    let env = EvalEnv::reference();
    let ci = CubeInfo::money(Player::Zero);
    let b = board_from(&[(0, 1), (5, 1)], &[(0, 15)]);
    let best = find_best_move(&b, 6, 1, &ci, &EvalContext::zero_ply(true), &MoveFilter::default(), &env)
        .unwrap();
    assert_eq!(best.chequers(0), 0);
}

#[test]
fn scored_plays_are_sorted() {
    let env = EvalEnv::reference();
    let ci = CubeInfo::money(Player::Zero);
    let b = Board::initial(GameVariant::Standard);
    let plays = bg_core::generate_moves(&b, 6, 5).unwrap();
    let n = plays.len();
    let ranked = score_plays(
        plays,
        &ci,
        &EvalContext::zero_ply(false).with_plies(1),
        &MoveFilter { accept: 2, threshold: 0.0 },
        &env,
    )
    .unwrap();
    assert_eq!(ranked.len(), n);
    assert!(ranked[0].score >= ranked[1].score);
}

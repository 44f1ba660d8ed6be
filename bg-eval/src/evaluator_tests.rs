use bg_core::{Board, CubeInfo, GameVariant, Player, BAR};

use crate::context::EvalContext;
use crate::evaluator::{terminal_probs, EvalEnv, Evaluator, HeuristicEvaluator};
use crate::outputs::{invert_outputs, invert_probs, Outputs};
use crate::sanity::sanity_check;

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

fn assert_consistent(p: &[f32; 5]) {
    assert!((0.0..=1.0).contains(&p[0]));
    assert!(p[1] <= p[0] + 1e-6);
    assert!(p[2] <= p[1] + 1e-6);
    assert!(p[3] <= 1.0 - p[0] + 1e-6);
    assert!(p[4] <= p[3] + 1e-6);
    assert!(p.iter().all(|&v| v >= 0.0));
}

#[test]
fn opening_position_favours_player_on_roll() {
    let ci = CubeInfo::money(Player::Zero);
    let p = HeuristicEvaluator
        .evaluate(&Board::initial(GameVariant::Standard), &ci, &EvalContext::default())
        .unwrap();
    assert!(p[0] > 0.5 && p[0] < 0.6, "{p:?}");
    assert_consistent(&p);
}

#[test]
fn two_on_the_ace_point_wins_a_gammon() {
    let ci = CubeInfo::money(Player::Zero);
    let b = board_from(&[(0, 2)], &[(0, 15)]);
    let p = HeuristicEvaluator
        .evaluate(&b, &ci, &EvalContext::default())
        .unwrap();
    assert_eq!(p, [1.0, 1.0, 0.0, 0.0, 0.0]);

    let stuck = board_from(&[(0, 2)], &[(0, 14), (BAR, 1)]);
    let p = HeuristicEvaluator
        .evaluate(&stuck, &ci, &EvalContext::default())
        .unwrap();
    assert_eq!(p, [1.0, 1.0, 1.0, 0.0, 0.0]);
}

#[test]
fn no_gammons_once_a_chequer_is_off() {
    let ci = CubeInfo::money(Player::Zero);
    let b = board_from(&[(10, 10), (3, 5)], &[(19, 3), (2, 10)]);
    let p = HeuristicEvaluator
        .evaluate(&b, &ci, &EvalContext::default())
        .unwrap();
    assert_eq!(p[1], 0.0);
    assert_eq!(p[2], 0.0);
    assert_consistent(&p);
}

#[test]
fn terminal_probabilities() {
    let lost = board_from(&[(0, 15)], &[]);
    assert_eq!(
        terminal_probs(&lost, GameVariant::Standard),
        [0.0, 0.0, 0.0, 1.0, 0.0]
    );
    let won = board_from(&[], &[(3, 2)]);
    assert_eq!(
        terminal_probs(&won, GameVariant::Standard),
        [1.0, 0.0, 0.0, 0.0, 0.0]
    );
}

#[test]
fn invert_is_an_involution() {
    let mut p = [0.6, 0.2, 0.05, 0.1, 0.01];
    let orig = p;
    invert_probs(&mut p);
    assert!((p[0] - 0.4).abs() < 1e-6);
    assert_eq!(p[1], 0.1);
    assert_eq!(p[3], 0.2);
    invert_probs(&mut p);
    assert!((p[0] - orig[0]).abs() < 1e-6);

    let money = CubeInfo::money(Player::Zero);
    let mut out: Outputs = [0.6, 0.2, 0.05, 0.1, 0.01, 0.3, 0.25];
    invert_outputs(&mut out, &money);
    assert_eq!(out[5], -0.3);
    assert_eq!(out[6], -0.25);

    let m = CubeInfo::match_play(Player::Zero, 5, [0, 0], false);
    let mut out: Outputs = [0.6, 0.2, 0.05, 0.1, 0.01, 0.3, 0.625];
    invert_outputs(&mut out, &m);
    assert_eq!(out[6], 0.375);
}

#[test]
fn sanity_check_repairs_impossible_values() {
    // Opponent already bore off: no gammons for us; our win gammon above win.
    let b = board_from(&[(3, 15)], &[(1, 4)]);
    let mut out: Outputs = [1.2, 0.5, 0.1, 0.0, 0.0, 0.0, 0.0];
    assert!(sanity_check(&b, &mut out, GameVariant::Standard));
    assert_eq!(out[0], 1.0);
    assert_eq!(out[1], 0.0);
    assert_eq!(out[2], 0.0);

    let mut fine: Outputs = [0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    assert!(!sanity_check(&b, &mut fine, GameVariant::Standard));
}

#[test]
fn sanity_check_caps_gammons_by_wins() {
    let b = Board::initial(GameVariant::Standard);
    let mut out: Outputs = [0.3, 0.4, 0.5, 0.9, 0.95, 0.0, 0.0];
    assert!(sanity_check(&b, &mut out, GameVariant::Standard));
    assert_eq!(out[1], 0.3);
    assert_eq!(out[2], 0.3);
    assert!((out[3] - 0.7).abs() < 1e-6);
    assert_eq!(out[4], out[3]);
}

#[test]
fn reference_environment_is_usable() {
    let env = EvalEnv::reference();
    let b = Board::initial(GameVariant::Standard);
    let ci = CubeInfo::money(Player::Zero);
    let p = env.evaluator.evaluate(&b, &ci, &EvalContext::default()).unwrap();
    assert_consistent(&p);
}

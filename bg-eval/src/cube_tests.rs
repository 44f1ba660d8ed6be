use bg_core::{CubeInfo, CubeOwner, Player};

use crate::cube::{find_cube_decision, CubeAction, CubeDecision};
use crate::met::default_met;
use crate::outputs::{Outputs, OUTPUT_CUBEFUL_EQUITY};

fn pair(no_double: f32, take: f32) -> [Outputs; 2] {
    let mut a = [0.0f32; 7];
    let mut b = [0.0f32; 7];
    a[OUTPUT_CUBEFUL_EQUITY] = no_double;
    b[OUTPUT_CUBEFUL_EQUITY] = take;
    [a, b]
}

fn decide(no_double: f32, take: f32, ci: &CubeInfo) -> CubeDecision {
    find_cube_decision(&pair(no_double, take), ci, default_met()).0
}

#[test]
fn take_above_drop_is_double_pass() {
    let ci = CubeInfo::money(Player::Zero);
    let (cd, eq) = find_cube_decision(&pair(0.0, 1.5), &ci, default_met());
    assert_eq!(cd, CubeDecision::DoublePass);
    assert_eq!(cd.action(), CubeAction::Pass);
    assert_eq!(eq.drop, 1.0);
}

#[test]
fn money_decisions() {
    let ci = CubeInfo::money(Player::Zero);
    assert_eq!(decide(0.5, 0.7, &ci), CubeDecision::DoubleTake);
    assert_eq!(decide(0.3, 0.2, &ci), CubeDecision::NoDoubleTake);
    assert_eq!(decide(1.2, 1.4, &ci), CubeDecision::TooGoodPass);
    assert_eq!(decide(1.2, 0.9, &ci), CubeDecision::TooGoodTake);
    assert_eq!(decide(-0.5, -0.2, &ci), CubeDecision::DoubleBeaver);
    assert_eq!(decide(-0.1, -0.4, &ci), CubeDecision::NoDoubleBeaver);
    assert_eq!(decide(0.4, 0.4, &ci), CubeDecision::OptionalDoubleTake);
    assert_eq!(decide(1.0, 1.3, &ci), CubeDecision::OptionalDoublePass);
}

#[test]
fn redouble_variants_when_owned() {
    let ci = CubeInfo {
        owner: CubeOwner::Owned(Player::Zero),
        ..CubeInfo::money(Player::Zero)
    };
    assert_eq!(decide(0.5, 0.7, &ci), CubeDecision::RedoubleTake);
    assert_eq!(decide(0.5, 1.3, &ci), CubeDecision::RedoublePass);
    assert_eq!(decide(0.3, 0.2, &ci), CubeDecision::NoRedoubleTake);
    assert_eq!(decide(1.2, 1.4, &ci), CubeDecision::TooGoodRedoublePass);
    // Beavers only apply to a centered cube.
    assert_eq!(decide(-0.5, -0.2, &ci), CubeDecision::RedoubleTake);
}

#[test]
fn unavailable_cube() {
    let ci = CubeInfo {
        owner: CubeOwner::Owned(Player::One),
        ..CubeInfo::money(Player::Zero)
    };
    assert_eq!(decide(0.5, 0.7, &ci), CubeDecision::NotAvailable);
    assert_eq!(decide(0.5, 0.7, &ci).action(), CubeAction::NoOp);
}

#[test]
fn match_play_converts_through_mwc() {
    let met = default_met();
    let ci = CubeInfo::match_play(Player::Zero, 7, [0, 0], false);
    let nd = met.eq2mwc(0.5, &ci);
    let take = met.eq2mwc(0.7, &ci);
    let (cd, eq) = find_cube_decision(&pair(nd, take), &ci, met);
    assert_eq!(cd, CubeDecision::DoubleTake);
    assert!((eq.drop - 1.0).abs() < 1e-5);
    assert!((eq.no_double - 0.5).abs() < 1e-5);
}

#[test]
fn take_and_beaver_are_takes() {
    assert_eq!(CubeDecision::DoubleTake.action(), CubeAction::Take);
    assert_eq!(CubeDecision::DoubleBeaver.action(), CubeAction::Take);
    assert_eq!(CubeDecision::RedoubleTake.action(), CubeAction::Take);
    assert_eq!(CubeDecision::TooGoodPass.action(), CubeAction::NoOp);
    assert_eq!(CubeDecision::OptionalDoubleTake.action(), CubeAction::NoOp);
    assert_eq!(CubeDecision::DoublePass.to_string(), "Double, pass");
}

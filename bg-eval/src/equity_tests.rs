use bg_core::{Board, CubeInfo, CubeOwner, GameVariant, Player, PositionClass};

use crate::equity::{cube_efficiency, cubeful_equity, double_point, gammon_prices, utility};
use crate::met::default_met;

#[test]
fn money_gammon_prices_respect_jacoby() {
    let met = default_met();
    let mut ci = CubeInfo::money(Player::Zero);
    assert_eq!(gammon_prices(&ci, met), [0.0; 4]);
    ci.jacoby = false;
    assert_eq!(gammon_prices(&ci, met), [1.0; 4]);
    ci.jacoby = true;
    ci.owner = CubeOwner::Owned(Player::Zero);
    assert_eq!(gammon_prices(&ci, met), [1.0; 4]);
}

#[test]
fn match_gammon_prices_are_finite() {
    let met = default_met();
    let ci = CubeInfo::match_play(Player::Zero, 7, [0, 0], false);
    for gp in gammon_prices(&ci, met) {
        assert!(gp.is_finite());
        assert!(gp >= 0.0);
    }
}

#[test]
fn money_utility() {
    let met = default_met();
    let mut ci = CubeInfo::money(Player::Zero);
    ci.jacoby = false;
    let p = [0.6, 0.2, 0.05, 0.1, 0.01];
    let expected = 2.0 * 0.6 - 1.0 + 0.2 - 0.1 + 0.05 - 0.01;
    assert!((utility(&p, &ci, met) - expected).abs() < 1e-6);
}

#[test]
fn double_point_availability() {
    let met = default_met();
    let ci = CubeInfo::money(Player::Zero);
    assert_eq!(double_point(&ci, met), Some(1.0));
    let owned_by_opp = CubeInfo {
        owner: CubeOwner::Owned(Player::One),
        ..ci
    };
    assert_eq!(double_point(&owned_by_opp, met), None);

    let m = CubeInfo::match_play(Player::Zero, 5, [0, 0], false);
    let dp = double_point(&m, met).unwrap();
    assert!((dp - met.get_me_ci(&m, Player::Zero, 1, Player::Zero)).abs() < 1e-6);
}

#[test]
fn dead_cube_equals_cubeless_utility() {
    let met = default_met();
    let ci = CubeInfo::match_play(Player::Zero, 5, [4, 2], true);
    let p = [0.55, 0.15, 0.01, 0.1, 0.0];
    let mwc = cubeful_equity(&p, &ci, 0.68, met);
    assert!((mwc - met.eq2mwc(utility(&p, &ci, met), &ci)).abs() < 1e-6);
}

#[test]
fn cubeful_equity_is_monotone_in_win_chance() {
    let met = default_met();
    let ci = CubeInfo::money(Player::Zero);
    let mut last = f32::NEG_INFINITY;
    for i in 0..=20 {
        let w = i as f32 / 20.0;
        let e = cubeful_equity(&[w, 0.0, 0.0, 0.0, 0.0], &ci, 0.68, met);
        assert!(e >= last - 1e-6, "w={w}");
        assert!((-1.0..=1.0).contains(&e));
        last = e;
    }
}

#[test]
fn owning_the_cube_is_worth_something() {
    let met = default_met();
    let p = [0.6, 0.0, 0.0, 0.0, 0.0];
    let centered = CubeInfo::money(Player::Zero);
    let mine = CubeInfo {
        owner: CubeOwner::Owned(Player::Zero),
        ..centered
    };
    let theirs = CubeInfo {
        owner: CubeOwner::Owned(Player::One),
        ..centered
    };
    let e_mine = cubeful_equity(&p, &mine, 0.68, met);
    let e_theirs = cubeful_equity(&p, &theirs, 0.68, met);
    assert!(e_mine > e_theirs);
}

#[test]
fn efficiency_by_class() {
    let b = Board::initial(GameVariant::Standard);
    assert_eq!(cube_efficiency(&b, PositionClass::Contact), 0.68);
    assert_eq!(cube_efficiency(&b, PositionClass::Bearoff2), 0.6);
    let e = cube_efficiency(&b, PositionClass::Race);
    assert!((0.6..=0.7).contains(&e));
}

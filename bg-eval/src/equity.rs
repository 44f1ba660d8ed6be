//! Cubeless utility, gammon prices and the cubeful equity model.
//!
//! Cubeful equity interpolates between a dead-cube value (the cubeless
//! utility) and a fully live cube, where take and cash points follow from the
//! average value of wins and losses. The interpolation weight is the cube
//! efficiency of the position class.

use bg_core::{Board, CubeInfo, PositionClass};

use crate::met::MatchEquityTable;
use crate::outputs::{
    Probs, OUTPUT_LOSEBACKGAMMON, OUTPUT_LOSEGAMMON, OUTPUT_WIN, OUTPUT_WINBACKGAMMON,
    OUTPUT_WINGAMMON,
};

/// Gammon prices `[win gammon, lose gammon, win backgammon, lose backgammon]`
/// for the player on roll.
pub fn gammon_prices(ci: &CubeInfo, met: &MatchEquityTable) -> [f32; 4] {
    if ci.is_money() {
        if ci.jacoby && ci.is_centered() {
            return [0.0; 4];
        }
        return [1.0; 4];
    }
    let me = ci.on_roll;
    let opp = me.opponent();
    let w = met.get_me_ci(ci, me, ci.cube, me);
    let l = met.get_me_ci(ci, me, ci.cube, opp);
    let wg = met.get_me_ci(ci, me, 2 * ci.cube, me);
    let lg = met.get_me_ci(ci, me, 2 * ci.cube, opp);
    let wbg = met.get_me_ci(ci, me, 3 * ci.cube, me);
    let lbg = met.get_me_ci(ci, me, 3 * ci.cube, opp);

    let center = 0.5 * (w + l);
    let unit = w - center;
    if unit <= 0.0 {
        return [0.0; 4];
    }
    [
        (wg - center) / unit - 1.0,
        (center - lg) / unit - 1.0,
        (wbg - wg) / unit,
        (lg - lbg) / unit,
    ]
}

/// Cubeless equity of the probabilities for the player on roll.
pub fn utility(p: &Probs, ci: &CubeInfo, met: &MatchEquityTable) -> f32 {
    let gp = gammon_prices(ci, met);
    2.0 * p[OUTPUT_WIN] - 1.0 + p[OUTPUT_WINGAMMON] * gp[0] - p[OUTPUT_LOSEGAMMON] * gp[1]
        + p[OUTPUT_WINBACKGAMMON] * gp[2]
        - p[OUTPUT_LOSEBACKGAMMON] * gp[3]
}

/// Value of the double point for the player on roll: 1.0 for money, the
/// match winning chance of cashing the cube in match play. `None` when the
/// cube is not available to the player on roll.
pub fn double_point(ci: &CubeInfo, met: &MatchEquityTable) -> Option<f32> {
    if !ci.may_double(ci.on_roll) {
        return None;
    }
    if ci.is_money() {
        Some(1.0)
    } else {
        Some(met.get_me_ci(ci, ci.on_roll, ci.cube, ci.on_roll))
    }
}

/// Share of the live-cube value realised in this kind of position.
pub fn cube_efficiency(board: &Board, class: PositionClass) -> f32 {
    match class {
        PositionClass::Over | PositionClass::Bearoff2 | PositionClass::BearoffOneSided => 0.6,
        PositionClass::Race => {
            let pips = board.pip_count()[0] as f32;
            (0.55 + 0.00125 * pips).clamp(0.6, 0.7)
        }
        PositionClass::Contact => 0.68,
    }
}

/// Average value of a win and of a loss, in cube units.
fn win_loss_values(p: &Probs, gp: &[f32; 4]) -> (f32, f32) {
    let win = p[OUTPUT_WIN];
    let lose = 1.0 - win;
    let w = if win > 0.0 {
        1.0 + (gp[0] * p[OUTPUT_WINGAMMON] + gp[2] * p[OUTPUT_WINBACKGAMMON]) / win
    } else {
        1.0
    };
    let l = if lose > 0.0 {
        1.0 + (gp[1] * p[OUTPUT_LOSEGAMMON] + gp[3] * p[OUTPUT_LOSEBACKGAMMON]) / lose
    } else {
        1.0
    };
    (w, l)
}

/// Fully live cube equity for win probability `p`.
fn live_cube_equity(p: f32, w: f32, l: f32, me: bool, opp: bool) -> f32 {
    let take_point = (l - 0.5) / (w + l + 0.5);
    let cash_point = (l + 1.0) / (w + l + 0.5);
    match (me, opp) {
        (true, true) => {
            if p < take_point {
                -1.0
            } else if p < cash_point {
                -1.0 + 2.0 * (p - take_point) / (cash_point - take_point)
            } else {
                1.0
            }
        }
        (true, false) => {
            if p < cash_point {
                -l + (l + 1.0) * p / cash_point
            } else {
                1.0
            }
        }
        (false, true) => {
            if p <= take_point {
                -1.0
            } else {
                -1.0 + (w + 1.0) * (p - take_point) / (1.0 - take_point)
            }
        }
        (false, false) => p * (w + l) - l,
    }
}

/// Cubeful equity for the player on roll.
///
/// Money play returns equity normalised to the current cube; match play
/// returns match winning chance.
pub fn cubeful_equity(p: &Probs, ci: &CubeInfo, efficiency: f32, met: &MatchEquityTable) -> f32 {
    let gp = gammon_prices(ci, met);
    let dead = utility(p, ci, met);
    let me = ci.may_double(ci.on_roll);
    let opp = ci.may_double(ci.on_roll.opponent());

    let equity = if me || opp {
        let (w, l) = win_loss_values(p, &gp);
        let live = live_cube_equity(p[OUTPUT_WIN], w, l, me, opp);
        efficiency * live + (1.0 - efficiency) * dead
    } else {
        dead
    };

    if ci.is_money() {
        equity
    } else {
        met.eq2mwc(equity, ci)
    }
}

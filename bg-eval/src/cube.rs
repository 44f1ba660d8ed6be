//! Cube-decision classification.

use std::fmt;

use bg_core::CubeInfo;
use serde::{Deserialize, Serialize};

use crate::equity::double_point;
use crate::met::MatchEquityTable;
use crate::outputs::{Outputs, OUTPUT_CUBEFUL_EQUITY};

const OPTIONAL_EPSILON: f32 = 1e-6;

/// Classified cube decision for the player on roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum CubeDecision {
    DoubleTake,
    DoublePass,
    DoubleBeaver,
    NoDoubleTake,
    NoDoubleBeaver,
    TooGoodTake,
    TooGoodPass,
    RedoubleTake,
    RedoublePass,
    NoRedoubleTake,
    TooGoodRedoubleTake,
    TooGoodRedoublePass,
    OptionalDoubleTake,
    OptionalDoubleBeaver,
    OptionalDoublePass,
    OptionalRedoubleTake,
    OptionalRedoublePass,
    NotAvailable,
}

/// What a rollout does with a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeAction {
    /// The cube is turned and taken.
    Take,
    /// The cube is turned and passed; the game ends.
    Pass,
    NoOp,
}

impl CubeDecision {
    pub fn action(self) -> CubeAction {
        match self {
            CubeDecision::DoubleTake | CubeDecision::DoubleBeaver | CubeDecision::RedoubleTake => {
                CubeAction::Take
            }
            CubeDecision::DoublePass | CubeDecision::RedoublePass => CubeAction::Pass,
            _ => CubeAction::NoOp,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CubeDecision::DoubleTake => "Double, take",
            CubeDecision::DoublePass => "Double, pass",
            CubeDecision::DoubleBeaver => "Double, beaver",
            CubeDecision::NoDoubleTake => "No double, take",
            CubeDecision::NoDoubleBeaver => "No double, beaver",
            CubeDecision::TooGoodTake => "Too good to double, take",
            CubeDecision::TooGoodPass => "Too good to double, pass",
            CubeDecision::RedoubleTake => "Redouble, take",
            CubeDecision::RedoublePass => "Redouble, pass",
            CubeDecision::NoRedoubleTake => "No redouble, take",
            CubeDecision::TooGoodRedoubleTake => "Too good to redouble, take",
            CubeDecision::TooGoodRedoublePass => "Too good to redouble, pass",
            CubeDecision::OptionalDoubleTake => "Optional double, take",
            CubeDecision::OptionalDoubleBeaver => "Optional double, beaver",
            CubeDecision::OptionalDoublePass => "Optional double, pass",
            CubeDecision::OptionalRedoubleTake => "Optional redouble, take",
            CubeDecision::OptionalRedoublePass => "Optional redouble, pass",
            CubeDecision::NotAvailable => "Cube not available",
        }
    }
}

impl fmt::Display for CubeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equities of the three outcomes, normalised to the current cube.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DoublePointEquities {
    pub no_double: f32,
    pub take: f32,
    pub drop: f32,
}

/// Classify a cube decision from the no-double (`outputs[0]`) and
/// double/take (`outputs[1]`) evaluations. Money take equity must already be
/// scaled to the current cube.
pub fn find_cube_decision(
    outputs: &[Outputs; 2],
    ci: &CubeInfo,
    met: &MatchEquityTable,
) -> (CubeDecision, DoublePointEquities) {
    let dp = double_point(ci, met);
    let nd_raw = outputs[0][OUTPUT_CUBEFUL_EQUITY];
    let take_raw = outputs[1][OUTPUT_CUBEFUL_EQUITY];
    let eq = if ci.is_money() {
        DoublePointEquities {
            no_double: nd_raw,
            take: take_raw,
            drop: 1.0,
        }
    } else {
        let drop_mwc = met.get_me_ci(ci, ci.on_roll, ci.cube, ci.on_roll);
        DoublePointEquities {
            no_double: met.mwc2eq(nd_raw, ci),
            take: met.mwc2eq(take_raw, ci),
            drop: met.mwc2eq(dp.unwrap_or(drop_mwc), ci),
        }
    };

    if dp.is_none() {
        return (CubeDecision::NotAvailable, eq);
    }
    (classify(&eq, ci), eq)
}

fn classify(eq: &DoublePointEquities, ci: &CubeInfo) -> CubeDecision {
    let centered = ci.is_centered();
    let beaver = ci.is_money() && centered && ci.beavers && eq.take < 0.0;

    if eq.take >= eq.no_double && eq.drop >= eq.no_double {
        if eq.drop > eq.take {
            let optional = (eq.take - eq.no_double).abs() < OPTIONAL_EPSILON;
            return match (beaver, centered, optional) {
                (true, _, false) => CubeDecision::DoubleBeaver,
                (true, _, true) => CubeDecision::OptionalDoubleBeaver,
                (false, true, false) => CubeDecision::DoubleTake,
                (false, true, true) => CubeDecision::OptionalDoubleTake,
                (false, false, false) => CubeDecision::RedoubleTake,
                (false, false, true) => CubeDecision::OptionalRedoubleTake,
            };
        }
        let optional = (eq.drop - eq.no_double).abs() < OPTIONAL_EPSILON;
        return match (centered, optional) {
            (true, false) => CubeDecision::DoublePass,
            (true, true) => CubeDecision::OptionalDoublePass,
            (false, false) => CubeDecision::RedoublePass,
            (false, true) => CubeDecision::OptionalRedoublePass,
        };
    }

    if eq.no_double > eq.drop {
        // Too good to double.
        return match (eq.take > eq.drop, centered) {
            (true, true) => CubeDecision::TooGoodPass,
            (true, false) => CubeDecision::TooGoodRedoublePass,
            (false, true) => CubeDecision::TooGoodTake,
            (false, false) => CubeDecision::TooGoodRedoubleTake,
        };
    }

    if beaver {
        CubeDecision::NoDoubleBeaver
    } else if centered {
        CubeDecision::NoDoubleTake
    } else {
        CubeDecision::NoRedoubleTake
    }
}

//! The evaluation output vector.

use bg_core::CubeInfo;

pub const OUTPUT_WIN: usize = 0;
pub const OUTPUT_WINGAMMON: usize = 1;
pub const OUTPUT_WINBACKGAMMON: usize = 2;
pub const OUTPUT_LOSEGAMMON: usize = 3;
pub const OUTPUT_LOSEBACKGAMMON: usize = 4;
pub const OUTPUT_EQUITY: usize = 5;
pub const OUTPUT_CUBEFUL_EQUITY: usize = 6;

pub const NUM_PROBS: usize = 5;
pub const NUM_OUTPUTS: usize = 7;

/// Win, win gammon, win backgammon, lose gammon, lose backgammon.
pub type Probs = [f32; NUM_PROBS];

/// Probabilities followed by cubeless equity and cubeful equity (money) or MWC (match).
pub type Outputs = [f32; NUM_OUTPUTS];

/// Probabilities as seen by the other player.
pub fn invert_probs(p: &mut Probs) {
    p[OUTPUT_WIN] = 1.0 - p[OUTPUT_WIN];
    p.swap(OUTPUT_WINGAMMON, OUTPUT_LOSEGAMMON);
    p.swap(OUTPUT_WINBACKGAMMON, OUTPUT_LOSEBACKGAMMON);
}

/// Full output vector as seen by the other player.
pub fn invert_outputs(out: &mut Outputs, ci: &CubeInfo) {
    out[OUTPUT_WIN] = 1.0 - out[OUTPUT_WIN];
    out.swap(OUTPUT_WINGAMMON, OUTPUT_LOSEGAMMON);
    out.swap(OUTPUT_WINBACKGAMMON, OUTPUT_LOSEBACKGAMMON);
    out[OUTPUT_EQUITY] = -out[OUTPUT_EQUITY];
    out[OUTPUT_CUBEFUL_EQUITY] = if ci.is_money() {
        -out[OUTPUT_CUBEFUL_EQUITY]
    } else {
        1.0 - out[OUTPUT_CUBEFUL_EQUITY]
    };
}

pub fn probs_of(out: &Outputs) -> Probs {
    [out[0], out[1], out[2], out[3], out[4]]
}

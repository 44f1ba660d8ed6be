//! Consistency repair for averaged or estimated outputs.

use bg_core::{Board, GameVariant};

use crate::outputs::{
    Outputs, OUTPUT_LOSEBACKGAMMON, OUTPUT_LOSEGAMMON, OUTPUT_WIN, OUTPUT_WINBACKGAMMON,
    OUTPUT_WINGAMMON,
};

/// Force the probabilities in `out` to agree with what is still possible on
/// `board` (side 0 is the player the outputs belong to). Returns whether
/// anything was changed.
pub fn sanity_check(board: &Board, out: &mut Outputs, variant: GameVariant) -> bool {
    let before = *out;
    let full = variant.chequers();

    out[OUTPUT_WIN] = out[OUTPUT_WIN].clamp(0.0, 1.0);

    // A side that has borne off cannot be gammoned.
    if board.chequers(1) < full {
        out[OUTPUT_WINGAMMON] = 0.0;
        out[OUTPUT_WINBACKGAMMON] = 0.0;
    }
    if board.chequers(0) < full {
        out[OUTPUT_LOSEGAMMON] = 0.0;
        out[OUTPUT_LOSEBACKGAMMON] = 0.0;
    }

    // Without contact nothing can return to the other side's home board.
    if !board.has_contact() {
        if board.side(1)[18..].iter().all(|&c| c == 0) {
            out[OUTPUT_WINBACKGAMMON] = 0.0;
        }
        if board.side(0)[18..].iter().all(|&c| c == 0) {
            out[OUTPUT_LOSEBACKGAMMON] = 0.0;
        }
    }

    let lose = 1.0 - out[OUTPUT_WIN];
    out[OUTPUT_WINGAMMON] = out[OUTPUT_WINGAMMON].clamp(0.0, out[OUTPUT_WIN]);
    out[OUTPUT_LOSEGAMMON] = out[OUTPUT_LOSEGAMMON].clamp(0.0, lose);
    out[OUTPUT_WINBACKGAMMON] = out[OUTPUT_WINBACKGAMMON].clamp(0.0, out[OUTPUT_WINGAMMON]);
    out[OUTPUT_LOSEBACKGAMMON] = out[OUTPUT_LOSEBACKGAMMON].clamp(0.0, out[OUTPUT_LOSEGAMMON]);

    *out != before
}

//! Positions shared by the benchmarks.

use bg_core::{Board, GameVariant};

/// Opening position.
pub fn opening() -> Board {
    Board::initial(GameVariant::Standard)
}

/// Middle-game position with contact and a blot on each side.
pub fn contact() -> Board {
    let mut b = Board::empty();
    b.0[0][5] = 4;
    b.0[0][7] = 3;
    b.0[0][12] = 4;
    b.0[0][15] = 1;
    b.0[0][23] = 3;
    b.0[1][4] = 5;
    b.0[1][6] = 2;
    b.0[1][12] = 5;
    b.0[1][14] = 1;
    b.0[1][23] = 2;
    b
}

/// Non-contact race with every chequer still on the board.
pub fn race() -> Board {
    let mut b = Board::empty();
    b.0[0][1] = 3;
    b.0[0][3] = 4;
    b.0[0][5] = 4;
    b.0[0][8] = 4;
    b.0[1][2] = 5;
    b.0[1][4] = 5;
    b.0[1][7] = 5;
    b
}

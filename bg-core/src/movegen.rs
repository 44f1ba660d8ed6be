//! Legal move generation.
//!
//! Moves are generated for side 0 (the player on roll). A play must use as
//! many dice as possible; when only one die of a non-double can be used, the
//! higher one must be played if it can be.

use std::fmt;

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::board::{Board, BAR};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("die value out of range: {0}")]
    InvalidDie(u8),
}

/// One chequer movement; `to == None` means borne off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Step {
    pub from: u8,
    pub to: Option<u8>,
    pub hit: bool,
}

/// A complete play and the board it leads to (still from the mover's side).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Play {
    pub steps: Vec<Step>,
    pub board: Board,
}

impl fmt::Display for Play {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "(no move)");
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            if step.from as usize == BAR {
                write!(f, "bar/")?;
            } else {
                write!(f, "{}/", step.from + 1)?;
            }
            match step.to {
                Some(to) => write!(f, "{}", to + 1)?,
                None => write!(f, "off")?,
            }
            if step.hit {
                write!(f, "*")?;
            }
        }
        Ok(())
    }
}

/// Move one chequer of side 0 from `from` by `die` pips, if legal.
pub fn apply_die(board: &Board, from: usize, die: u8) -> Option<(Board, Step)> {
    let me = &board.0[0];
    if me[from] == 0 || (me[BAR] > 0 && from != BAR) {
        return None;
    }
    let dest = from as i32 - die as i32;
    let mut next = *board;
    next.0[0][from] -= 1;

    if dest >= 0 {
        let dest = dest as usize;
        let opp = 23 - dest;
        let hit = match board.0[1][opp] {
            0 => false,
            1 => true,
            _ => return None,
        };
        if hit {
            next.0[1][opp] = 0;
            next.0[1][BAR] += 1;
        }
        next.0[0][dest] += 1;
        return Some((
            next,
            Step {
                from: from as u8,
                to: Some(dest as u8),
                hit,
            },
        ));
    }

    if !board.all_home(0) {
        return None;
    }
    // Overshooting is only allowed from the highest occupied point.
    if dest < -1 && me[from + 1..6].iter().any(|&c| c > 0) {
        return None;
    }
    Some((
        next,
        Step {
            from: from as u8,
            to: None,
            hit: false,
        },
    ))
}

struct Leaf {
    play: Play,
    dice_used: usize,
    first_die: u8,
}

fn expand(board: &Board, dice: &[u8], steps: &mut Vec<Step>, first_die: u8, out: &mut Vec<Leaf>) {
    let Some((&die, rest)) = dice.split_first() else {
        out.push(Leaf {
            play: Play {
                steps: steps.clone(),
                board: *board,
            },
            dice_used: steps.len(),
            first_die,
        });
        return;
    };

    let mut moved = false;
    for from in (0..=BAR).rev() {
        if let Some((next, step)) = apply_die(board, from, die) {
            moved = true;
            steps.push(step);
            let first = if steps.len() == 1 { die } else { first_die };
            expand(&next, rest, steps, first, out);
            steps.pop();
        }
    }
    if !moved {
        out.push(Leaf {
            play: Play {
                steps: steps.clone(),
                board: *board,
            },
            dice_used: steps.len(),
            first_die,
        });
    }
}

/// All distinct legal plays for dice `(d0, d1)`. Always returns at least one
/// play: a blocked player gets the empty play on the unchanged board.
pub fn generate_moves(board: &Board, d0: u8, d1: u8) -> Result<Vec<Play>, MoveError> {
    for d in [d0, d1] {
        if !(1..=6).contains(&d) {
            return Err(MoveError::InvalidDie(d));
        }
    }

    let mut leaves = Vec::new();
    let mut steps = Vec::with_capacity(4);
    if d0 == d1 {
        expand(board, &[d0; 4], &mut steps, 0, &mut leaves);
    } else {
        expand(board, &[d0, d1], &mut steps, 0, &mut leaves);
        expand(board, &[d1, d0], &mut steps, 0, &mut leaves);
    }

    let max_used = leaves.iter().map(|l| l.dice_used).max().unwrap_or(0);
    let high = d0.max(d1);
    let must_use_high = d0 != d1
        && max_used == 1
        && leaves
            .iter()
            .any(|l| l.dice_used == 1 && l.first_die == high);

    let mut seen = FxHashSet::default();
    let mut plays = Vec::new();
    for leaf in leaves {
        if leaf.dice_used != max_used || (must_use_high && leaf.first_die != high) {
            continue;
        }
        if seen.insert(leaf.play.board) {
            plays.push(leaf.play);
        }
    }
    Ok(plays)
}

//! Match equity table and equity/MWC conversions.
//!
//! The built-in table is generated from a simple game model (each game won
//! with probability one half, a fixed share of wins being gammons, no cube).
//! Published tables can be plugged in with [`MatchEquityTable::from_tables`].

use std::sync::OnceLock;

use bg_core::{CubeInfo, Player};

use crate::evaluator::EvalError;

/// Largest match length covered by the generated table.
pub const MAX_SCORE: usize = 64;
pub const DEFAULT_GAMMON_RATE: f32 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchEquityTable {
    /// `pre[a - 1][b - 1]`: match winning chance of a player needing `a`
    /// points against one needing `b`. Row 0 is the Crawford game.
    pre: Vec<Vec<f32>>,
    /// `post[a - 1]`: trailer needing `a` points against a leader at match
    /// point, after the Crawford game.
    post: Vec<f32>,
}

/// Process-wide generated table.
pub fn default_met() -> &'static MatchEquityTable {
    static MET: OnceLock<MatchEquityTable> = OnceLock::new();
    MET.get_or_init(|| MatchEquityTable::generated(DEFAULT_GAMMON_RATE))
}

impl MatchEquityTable {
    pub fn generated(gammon_rate: f32) -> Self {
        let n = MAX_SCORE;
        let g = gammon_rate;

        let mut post = vec![0.0f32; n];
        let post_at = |post: &[f32], a: i64| -> f32 {
            if a <= 0 {
                1.0
            } else {
                post[a as usize - 1]
            }
        };
        for a in 1..=n as i64 {
            post[a as usize - 1] = if a == 1 {
                0.5
            } else {
                // The trailer doubles at once, so every game is worth two points.
                0.5 * ((1.0 - g) * post_at(&post, a - 2) + g * post_at(&post, a - 4))
            };
        }

        let mut pre = vec![vec![0.0f32; n]; n];
        pre[0][0] = 0.5;
        for b in 2..=n as i64 {
            let trailer_wins = (1.0 - g) * (1.0 - post_at(&post, b - 1))
                + g * (1.0 - post_at(&post, b - 2));
            let crawford = 0.5 + 0.5 * trailer_wins;
            pre[0][b as usize - 1] = crawford;
            pre[b as usize - 1][0] = 1.0 - crawford;
        }
        let at = |pre: &[Vec<f32>], x: i64, y: i64| -> f32 {
            if x <= 0 {
                1.0
            } else if y <= 0 {
                0.0
            } else {
                pre[x as usize - 1][y as usize - 1]
            }
        };
        for a in 2..=n {
            for b in 2..=n {
                let (ai, bi) = (a as i64, b as i64);
                let win = (1.0 - g) * at(&pre, ai - 1, bi) + g * at(&pre, ai - 2, bi);
                let lose = (1.0 - g) * at(&pre, ai, bi - 1) + g * at(&pre, ai, bi - 2);
                pre[a - 1][b - 1] = 0.5 * win + 0.5 * lose;
            }
        }

        Self { pre, post }
    }

    /// Table from explicit rows: `pre` must be square and `post` as long.
    pub fn from_tables(pre: Vec<Vec<f32>>, post: Vec<f32>) -> Result<Self, EvalError> {
        let n = pre.len();
        if n == 0 {
            return Err(EvalError::InvalidTable("empty table".to_string()));
        }
        if let Some(row) = pre.iter().position(|r| r.len() != n) {
            return Err(EvalError::InvalidTable(format!(
                "row {row} has {} entries, expected {n}",
                pre[row].len()
            )));
        }
        if post.len() != n {
            return Err(EvalError::InvalidTable(format!(
                "post-Crawford row has {} entries, expected {n}",
                post.len()
            )));
        }
        let out_of_range = |v: &f32| !(0.0..=1.0).contains(v);
        if pre.iter().flatten().any(out_of_range) || post.iter().any(out_of_range) {
            return Err(EvalError::InvalidTable(
                "entries must lie in [0, 1]".to_string(),
            ));
        }
        Ok(Self { pre, post })
    }

    pub fn len(&self) -> usize {
        self.pre.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pre.is_empty()
    }

    /// Pre-Crawford equity for a player needing `a` against one needing `b`.
    pub fn pre(&self, a: i64, b: i64) -> f32 {
        if a <= 0 {
            return 1.0;
        }
        if b <= 0 {
            return 0.0;
        }
        let n = self.len() as i64;
        self.pre[(a.min(n) - 1) as usize][(b.min(n) - 1) as usize]
    }

    /// Post-Crawford equity of the trailer needing `a`.
    pub fn post(&self, a: i64) -> f32 {
        if a <= 0 {
            return 1.0;
        }
        let n = self.len() as i64;
        self.post[(a.min(n) - 1) as usize]
    }

    /// Match winning chance for `player` after `winner` wins `points`.
    pub fn get_me(
        &self,
        score: [u32; 2],
        match_to: u32,
        player: Player,
        points: u32,
        winner: Player,
        crawford: bool,
    ) -> f32 {
        let needed = |seat: Player| -> i64 {
            let won = if winner == seat { points } else { 0 };
            match_to as i64 - (score[seat.index()] as i64 + won as i64)
        };
        let a0 = needed(Player::Zero);
        let a1 = needed(Player::One);
        let for_player = |me0: f32| if player == Player::Zero { me0 } else { 1.0 - me0 };

        if a0 <= 0 {
            return for_player(1.0);
        }
        if a1 <= 0 {
            return for_player(0.0);
        }

        let crawford_or_later = crawford
            || match_to as i64 - score[0] as i64 == 1
            || match_to as i64 - score[1] as i64 == 1;
        let me0 = if crawford_or_later && a0 == 1 {
            1.0 - self.post(a1)
        } else if crawford_or_later && a1 == 1 {
            self.post(a0)
        } else {
            self.pre(a0, a1)
        };
        for_player(me0)
    }

    /// [`get_me`](Self::get_me) with score and Crawford state taken from `ci`.
    pub fn get_me_ci(&self, ci: &CubeInfo, player: Player, points: u32, winner: Player) -> f32 {
        self.get_me(ci.score, ci.match_to, player, points, winner, ci.crawford)
    }

    /// MWC for the player on roll when winning or losing the current cube.
    fn win_lose(&self, ci: &CubeInfo) -> (f32, f32) {
        let me = ci.on_roll;
        (
            self.get_me_ci(ci, me, ci.cube, me),
            self.get_me_ci(ci, me, ci.cube, me.opponent()),
        )
    }

    pub fn eq2mwc(&self, equity: f32, ci: &CubeInfo) -> f32 {
        let (w, l) = self.win_lose(ci);
        0.5 * (equity * (w - l) + (w + l))
    }

    pub fn mwc2eq(&self, mwc: f32, ci: &CubeInfo) -> f32 {
        let (w, l) = self.win_lose(ci);
        if w == l {
            return 0.0;
        }
        (2.0 * mwc - (w + l)) / (w - l)
    }

    pub fn se_eq2mwc(&self, se: f32, ci: &CubeInfo) -> f32 {
        let (w, l) = self.win_lose(ci);
        0.5 * se * (w - l)
    }

    pub fn se_mwc2eq(&self, se: f32, ci: &CubeInfo) -> f32 {
        let (w, l) = self.win_lose(ci);
        if w == l {
            return 0.0;
        }
        2.0 * se / (w - l)
    }
}

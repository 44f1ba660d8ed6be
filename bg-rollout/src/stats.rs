//! Per-alternative game statistics gathered during a rollout.

use std::fmt::Write as _;

use bg_core::{GameResult, Player};
use serde::{Deserialize, Serialize};

/// Cube levels tracked (1-cube up to 512-cube).
pub const STAT_MAXCUBE: usize = 10;

/// Counters for one seat. Cube-level arrays are indexed by log2 of the cube.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PlayerStat {
    pub wins: [u32; STAT_MAXCUBE],
    pub gammons: [u32; STAT_MAXCUBE],
    pub backgammons: [u32; STAT_MAXCUBE],
    /// Doubles this seat gave that were dropped, by cube value before doubling.
    pub double_drops: [u32; STAT_MAXCUBE],
    /// Doubles this seat gave that were taken, by cube value before doubling.
    pub double_takes: [u32; STAT_MAXCUBE],
    /// Games in which this seat hit the opponent, and the summed turn of the first hit.
    pub opponent_hit: u32,
    pub opponent_hit_turns: u64,
    pub opponent_closed_out: u32,
    pub opponent_closed_out_turns: u64,
    pub bearoff_moves: u32,
    pub bearoff_pips_wasted: u64,
}

fn level(log_cube: usize) -> usize {
    log_cube.min(STAT_MAXCUBE - 1)
}

impl PlayerStat {
    fn merge(&mut self, other: &PlayerStat) {
        for i in 0..STAT_MAXCUBE {
            self.wins[i] += other.wins[i];
            self.gammons[i] += other.gammons[i];
            self.backgammons[i] += other.backgammons[i];
            self.double_drops[i] += other.double_drops[i];
            self.double_takes[i] += other.double_takes[i];
        }
        self.opponent_hit += other.opponent_hit;
        self.opponent_hit_turns += other.opponent_hit_turns;
        self.opponent_closed_out += other.opponent_closed_out;
        self.opponent_closed_out_turns += other.opponent_closed_out_turns;
        self.bearoff_moves += other.bearoff_moves;
        self.bearoff_pips_wasted += other.bearoff_pips_wasted;
    }

    fn games_won(&self) -> u32 {
        self.wins.iter().sum::<u32>()
            + self.gammons.iter().sum::<u32>()
            + self.backgammons.iter().sum::<u32>()
            + self.double_drops.iter().sum::<u32>()
    }
}

/// Statistics of one alternative, indexed by absolute seat.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RolloutStat {
    pub players: [PlayerStat; 2],
}

impl RolloutStat {
    pub fn player(&self, p: Player) -> &PlayerStat {
        &self.players[p.index()]
    }

    pub fn record_win(&mut self, winner: Player, log_cube: usize, result: GameResult) {
        let s = &mut self.players[winner.index()];
        let l = level(log_cube);
        match result {
            GameResult::Single => s.wins[l] += 1,
            GameResult::Gammon => s.gammons[l] += 1,
            GameResult::Backgammon => s.backgammons[l] += 1,
        }
    }

    pub fn record_double_take(&mut self, doubler: Player, log_cube: usize) {
        self.players[doubler.index()].double_takes[level(log_cube)] += 1;
    }

    pub fn record_double_drop(&mut self, doubler: Player, log_cube: usize) {
        self.players[doubler.index()].double_drops[level(log_cube)] += 1;
    }

    pub fn record_hit(&mut self, hitter: Player, turn: u32) {
        let s = &mut self.players[hitter.index()];
        s.opponent_hit += 1;
        s.opponent_hit_turns += turn as u64;
    }

    pub fn record_closeout(&mut self, player: Player, turn: u32) {
        let s = &mut self.players[player.index()];
        s.opponent_closed_out += 1;
        s.opponent_closed_out_turns += turn as u64;
    }

    pub fn record_bearoff(&mut self, player: Player, pips_wasted: u32) {
        let s = &mut self.players[player.index()];
        s.bearoff_moves += 1;
        s.bearoff_pips_wasted += pips_wasted as u64;
    }

    pub fn merge(&mut self, other: &RolloutStat) {
        for (a, b) in self.players.iter_mut().zip(&other.players) {
            a.merge(b);
        }
    }

    /// Games that ended by bear-off or a dropped double.
    pub fn games_finished(&self) -> u32 {
        self.players.iter().map(PlayerStat::games_won).sum()
    }

    /// Plain-text breakdown of points won per seat and cube level.
    pub fn report(&self, games: u32, names: [&str; 2]) -> String {
        let pct = |n: u32| {
            if games == 0 {
                0.0
            } else {
                100.0 * n as f64 / games as f64
            }
        };
        let rule = "-".repeat(66);
        let mut out = String::new();
        for (s, name) in self.players.iter().zip(names) {
            let _ = writeln!(out, "{name}\n\nPoints won:\n");
            let mut total_points = 0u64;
            let sections: [(&str, &[u32; STAT_MAXCUBE], u64); 4] = [
                ("wins", &s.wins, 1),
                ("gammon wins", &s.gammons, 2),
                ("bg wins", &s.backgammons, 3),
                ("double, drop", &s.double_drops, 1),
            ];
            for (label, counts, mult) in sections {
                let mut n_sum = 0u32;
                let mut points = 0u64;
                for (i, &n) in counts.iter().enumerate() {
                    let cube = 1u64 << i;
                    let p = cube * mult * n as u64;
                    let _ = writeln!(
                        out,
                        "{label:<14} {cube:>4}-cube {n:>8} {:>8.3}% {p:>8}",
                        pct(n)
                    );
                    n_sum += n;
                    points += p;
                }
                let _ = writeln!(out, "{rule}");
                let _ = writeln!(
                    out,
                    "Total {label:<20} {n_sum:>8} {:>8.3}% {points:>8}",
                    pct(n_sum)
                );
                let _ = writeln!(out, "{rule}\n");
                total_points += points;
            }
            let _ = writeln!(out, "Total points won {total_points:>25}\n");

            let _ = writeln!(out, "Other statistics:\n");
            for (i, &n) in s.double_takes.iter().enumerate() {
                let cube = 2u64 << i;
                let _ = writeln!(out, "{cube:>4}-cube double, take {n:>8} {:>8.3}%", pct(n));
            }
            let avg = |sum: u64, n: u32| if n == 0 { 0.0 } else { sum as f64 / n as f64 };
            let _ = writeln!(
                out,
                "Opponent hit {:>8} {:>8.3}%  average turn {:.2}",
                s.opponent_hit,
                pct(s.opponent_hit),
                avg(s.opponent_hit_turns, s.opponent_hit)
            );
            let _ = writeln!(
                out,
                "Opponent closed out {:>8} {:>8.3}%  average turn {:.2}",
                s.opponent_closed_out,
                pct(s.opponent_closed_out),
                avg(s.opponent_closed_out_turns, s.opponent_closed_out)
            );
            let _ = writeln!(
                out,
                "Bearoff moves {:>8}  pips wasted {:>8}  average {:.2}\n",
                s.bearoff_moves,
                s.bearoff_pips_wasted,
                avg(s.bearoff_pips_wasted, s.bearoff_moves)
            );
        }
        out
    }
}

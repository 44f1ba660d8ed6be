//! Deterministic dice for rollouts.
//!
//! Dice are a pure function of (seed, trial, turn): every trial owns a fresh
//! stream so trials can run in any order or in parallel. With quasi-random dice
//! the first 128 turns are drawn from stratified permutations, so consecutive
//! trials cover the 36 rolls evenly at every turn.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::{ChaCha20Rng, ChaCha8Rng};
use serde::{Deserialize, Serialize};

/// Turns covered by the permutation table.
pub const QUASI_TURNS: usize = 128;
/// Nested permutation generations (36^6 trials before the pattern repeats).
pub const GENERATIONS: usize = 6;

/// Generator for dice not covered by the permutation table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RngKind {
    #[default]
    #[serde(rename = "chacha8")]
    ChaCha8,
    #[serde(rename = "chacha20")]
    ChaCha20,
    #[serde(rename = "splitmix64")]
    SplitMix64,
    /// Fixed sequence indexed by turn (wraps around).
    Manual { rolls: Vec<[u8; 2]> },
}

/// SplitMix64 step.
fn splitmix64_next(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// `perm[generation][turn]` is a permutation of the 36 ordered rolls.
#[derive(Debug, Clone)]
pub struct PermutationTable {
    seed: u64,
    perm: Vec<u8>,
}

impl PermutationTable {
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut perm = vec![0u8; GENERATIONS * QUASI_TURNS * 36];
        for gen in 0..GENERATIONS {
            for turn in gen..QUASI_TURNS {
                let row = &mut perm[Self::offset(gen, turn)..Self::offset(gen, turn) + 36];
                for (k, slot) in row.iter_mut().enumerate() {
                    *slot = k as u8;
                }
                for k in 0..35 {
                    let r = rng.gen_range(0..36 - k);
                    row.swap(k, k + r);
                }
            }
        }
        Self { seed, perm }
    }

    fn offset(gen: usize, turn: usize) -> usize {
        (gen * QUASI_TURNS + turn) * 36
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn get(&self, gen: usize, turn: usize, k: usize) -> u8 {
        self.perm[Self::offset(gen, turn) + k]
    }
}

fn roll_from_index(j: u8) -> (u8, u8) {
    (j / 6 + 1, j % 6 + 1)
}

fn sorted(d0: u8, d1: u8) -> (u8, u8) {
    if d0 >= d1 {
        (d0, d1)
    } else {
        (d1, d0)
    }
}

/// Owns the seed, generator choice and (optionally) the permutation table.
#[derive(Debug, Clone)]
pub struct DiceSource {
    seed: u64,
    rng: RngKind,
    quasi: Option<Arc<PermutationTable>>,
}

impl DiceSource {
    pub fn new(seed: u64, rng: RngKind, quasi_random: bool) -> Self {
        let quasi = if quasi_random && !matches!(rng, RngKind::Manual { .. }) {
            Some(Arc::new(PermutationTable::new(seed)))
        } else {
            None
        };
        Self { seed, rng, quasi }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn is_quasi_random(&self) -> bool {
        self.quasi.is_some()
    }

    /// Independent dice stream for one trial.
    pub fn trial(&self, trial: u32) -> TrialDice<'_> {
        let trial_seed = self.seed.wrapping_add((trial as u64) << 8);
        let prng = match self.rng {
            RngKind::ChaCha8 => TrialRng::ChaCha8(Box::new(ChaCha8Rng::seed_from_u64(trial_seed))),
            RngKind::ChaCha20 => {
                TrialRng::ChaCha20(Box::new(ChaCha20Rng::seed_from_u64(trial_seed)))
            }
            RngKind::SplitMix64 => TrialRng::SplitMix64(trial_seed),
            RngKind::Manual { .. } => TrialRng::Manual,
        };
        TrialDice {
            source: self,
            trial,
            prng,
        }
    }
}

enum TrialRng {
    ChaCha8(Box<ChaCha8Rng>),
    ChaCha20(Box<ChaCha20Rng>),
    SplitMix64(u64),
    Manual,
}

impl TrialRng {
    fn die(&mut self) -> u8 {
        match self {
            TrialRng::ChaCha8(rng) => rng.gen_range(1..=6),
            TrialRng::ChaCha20(rng) => rng.gen_range(1..=6),
            TrialRng::SplitMix64(state) => (splitmix64_next(state) % 6 + 1) as u8,
            TrialRng::Manual => 1,
        }
    }
}

/// Dice stream for a single trial; rolls are requested turn by turn.
pub struct TrialDice<'a> {
    source: &'a DiceSource,
    trial: u32,
    prng: TrialRng,
}

impl TrialDice<'_> {
    pub fn trial(&self) -> u32 {
        self.trial
    }

    /// Roll for `turn`, higher die first. On the first turn of a game started
    /// from the opening position doubles never occur.
    pub fn roll(&mut self, turn: u32, initial_position: bool) -> (u8, u8) {
        let opening = initial_position && turn == 0;

        if let RngKind::Manual { rolls } = &self.source.rng {
            return manual_roll(rolls, turn as usize, opening);
        }

        if let Some(table) = &self.source.quasi {
            if opening {
                return opening_roll(table, self.trial);
            }
            if (turn as usize) < QUASI_TURNS {
                let turn = turn as usize;
                let mut j = 0usize;
                let mut scale = 1u64;
                for gen in 0..GENERATIONS.min(turn + 1) {
                    let k = ((self.trial as u64 / scale + j as u64) % 36) as usize;
                    j = table.get(gen, turn, k) as usize;
                    scale *= 36;
                }
                let (d0, d1) = roll_from_index(j as u8);
                return sorted(d0, d1);
            }
        }

        loop {
            let d0 = self.prng.die();
            let d1 = self.prng.die();
            if !opening || d0 != d1 {
                return sorted(d0, d1);
            }
        }
    }
}

/// The (trial mod 30)-th non-double of the turn-0 permutation.
fn opening_roll(table: &PermutationTable, trial: u32) -> (u8, u8) {
    let wanted = (trial % 30) as usize;
    let mut seen = 0usize;
    for k in 0..36 {
        let j = table.get(0, 0, k);
        let (d0, d1) = roll_from_index(j);
        if d0 == d1 {
            continue;
        }
        if seen == wanted {
            return sorted(d0, d1);
        }
        seen += 1;
    }
    (2, 1)
}

fn manual_roll(rolls: &[[u8; 2]], turn: usize, opening: bool) -> (u8, u8) {
    if rolls.is_empty() {
        return (2, 1);
    }
    for offset in 0..rolls.len() {
        let [d0, d1] = rolls[(turn + offset) % rolls.len()];
        if !opening || d0 != d1 {
            return sorted(d0, d1);
        }
    }
    (2, 1)
}

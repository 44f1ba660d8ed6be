use std::collections::BTreeMap;

use crate::dice::{DiceSource, PermutationTable, RngKind};

fn tally(source: &DiceSource, trials: std::ops::Range<u32>, turn: u32, initial: bool) -> BTreeMap<(u8, u8), u32> {
    let mut counts = BTreeMap::new();
    for t in trials {
        let mut dice = source.trial(t);
        // Draw earlier turns first, as a game would.
        for earlier in 0..turn {
            dice.roll(earlier, initial);
        }
        *counts.entry(dice.roll(turn, initial)).or_insert(0) += 1;
    }
    counts
}

#[test]
fn same_seed_same_rolls() {
    for rng in [RngKind::ChaCha8, RngKind::ChaCha20, RngKind::SplitMix64] {
        let a = DiceSource::new(77, rng.clone(), false);
        let b = DiceSource::new(77, rng, false);
        for trial in 0..20 {
            let mut da = a.trial(trial);
            let mut db = b.trial(trial);
            for turn in 0..50 {
                assert_eq!(da.roll(turn, false), db.roll(turn, false));
            }
        }
    }
}

#[test]
fn dice_are_sorted_and_in_range() {
    let source = DiceSource::new(3, RngKind::SplitMix64, true);
    for trial in 0..100 {
        let mut dice = source.trial(trial);
        for turn in 0..200 {
            let (d0, d1) = dice.roll(turn, false);
            assert!((1..=6).contains(&d0));
            assert!((1..=6).contains(&d1));
            assert!(d0 >= d1);
        }
    }
}

#[test]
fn quasi_random_covers_all_rolls_every_36_trials() {
    let source = DiceSource::new(1, RngKind::ChaCha8, true);
    for turn in [0u32, 1, 5, 127] {
        for block in 0..2u32 {
            let counts = tally(&source, block * 36..(block + 1) * 36, turn, false);
            assert_eq!(counts.len(), 21, "turn {turn} block {block}");
            for ((d0, d1), n) in counts {
                let expected = if d0 == d1 { 1 } else { 2 };
                assert_eq!(n, expected, "turn {turn}: {d0}-{d1}");
            }
        }
    }
}

#[test]
fn opening_turn_covers_non_doubles_every_30_trials() {
    let source = DiceSource::new(9, RngKind::ChaCha8, true);
    let counts = tally(&source, 0..30, 0, true);
    assert_eq!(counts.len(), 15);
    for ((d0, d1), n) in counts {
        assert_ne!(d0, d1);
        assert_eq!(n, 2);
    }
    // The next cycle repeats the same order.
    for t in 0..30 {
        assert_eq!(source.trial(t).roll(0, true), source.trial(t + 30).roll(0, true));
    }
}

#[test]
fn pseudo_random_opening_rerolls_doubles() {
    let source = DiceSource::new(5, RngKind::ChaCha8, false);
    for t in 0..500 {
        let (d0, d1) = source.trial(t).roll(0, true);
        assert_ne!(d0, d1);
    }
}

#[test]
fn manual_dice_replay_sequence() {
    let rolls = vec![[1, 3], [6, 6], [2, 5]];
    let source = DiceSource::new(0, RngKind::Manual { rolls }, true);
    assert!(!source.is_quasi_random());
    let mut dice = source.trial(17);
    assert_eq!(dice.roll(0, false), (3, 1));
    assert_eq!(dice.roll(1, false), (6, 6));
    assert_eq!(dice.roll(2, false), (5, 2));
    assert_eq!(dice.roll(3, false), (3, 1));
}

#[test]
fn manual_opening_skips_doubles() {
    let rolls = vec![[4, 4], [2, 1]];
    let source = DiceSource::new(0, RngKind::Manual { rolls }, false);
    assert_eq!(source.trial(0).roll(0, true), (2, 1));
    assert_eq!(source.trial(0).roll(0, false), (4, 4));
}

#[test]
fn permutation_rows_are_permutations() {
    let table = PermutationTable::new(11);
    for gen in 0..6 {
        for turn in [gen, 64, 127] {
            let mut seen = [false; 36];
            for k in 0..36 {
                seen[table.get(gen, turn, k) as usize] = true;
            }
            assert!(seen.iter().all(|&s| s), "gen {gen} turn {turn}");
        }
    }
}

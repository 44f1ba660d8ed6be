use bg_core::{Board, CubeInfo, CubeOwner, DiceSource, GameVariant, Player, RngKind};
use bg_eval::outputs::{
    NUM_OUTPUTS, OUTPUT_CUBEFUL_EQUITY, OUTPUT_EQUITY, OUTPUT_LOSEBACKGAMMON, OUTPUT_LOSEGAMMON,
    OUTPUT_WIN, OUTPUT_WINGAMMON,
};
use bg_eval::{
    find_best_move, general_cube_decision_e, general_evaluation_e, invert_outputs, EvalContext,
    EvalEnv, EvalError, MoveFilter,
};

use crate::context::RolloutContext;
use crate::simulator::{simulate_trial, TrialLine};

/// Side 0 has one chequer left on the ace point; side 1 has not started bearing off.
fn forced_bearoff() -> Board {
    let mut b = Board::empty();
    b.0[0][0] = 1;
    b.0[1][5] = 15;
    b
}

/// Five chequers each, side 0 a little ahead: a money double and take.
fn race() -> Board {
    let mut b = Board::empty();
    b.0[0][2] = 3;
    b.0[0][8] = 2;
    b.0[1][3] = 3;
    b.0[1][7] = 2;
    b
}

/// Side 0 is 20 pips ahead in a short race: double, pass.
fn crushing_race() -> Board {
    let mut b = Board::empty();
    b.0[0][6] = 2;
    b.0[1][5] = 3;
    b.0[1][7] = 2;
    b
}

fn manual(rolls: &[[u8; 2]]) -> RngKind {
    RngKind::Manual {
        rolls: rolls.to_vec(),
    }
}

fn quick_context() -> RolloutContext {
    RolloutContext {
        trials: 8,
        ..RolloutContext::default()
    }
}

#[test]
fn forced_bearoff_is_a_sure_gammon() {
    let env = EvalEnv::reference();
    let ctx = quick_context();
    let dice = DiceSource::new(ctx.seed, ctx.rng.clone(), ctx.quasi_random_dice);
    let ci = CubeInfo::money(Player::Zero);

    for trial in 0..8 {
        let mut lines = [TrialLine::new(forced_bearoff(), ci, false).with_stats()];
        simulate_trial(&mut lines, 0, trial, &ctx, &env, &dice).unwrap();
        let line = &lines[0];
        assert!(line.finished);
        assert_eq!(line.output[OUTPUT_WIN], 1.0);
        assert_eq!(line.output[OUTPUT_WINGAMMON], 1.0);
        assert_eq!(line.output[OUTPUT_LOSEGAMMON], 0.0);
        assert_eq!(line.output[OUTPUT_LOSEBACKGAMMON], 0.0);
        assert_eq!(line.output[OUTPUT_CUBEFUL_EQUITY], line.output[OUTPUT_EQUITY]);

        let stats = line.stats.as_ref().unwrap();
        assert_eq!(stats.player(Player::Zero).gammons[0], 1);
        assert_eq!(stats.games_finished(), 1);
    }
}

#[test]
fn money_results_are_scaled_to_the_reference_cube() {
    let env = EvalEnv::reference();
    let ctx = quick_context();
    let dice = DiceSource::new(ctx.seed, ctx.rng.clone(), ctx.quasi_random_dice);
    let taken = CubeInfo::money(Player::Zero).doubled();

    let mut lines = [
        TrialLine::new(forced_bearoff(), taken, false),
        TrialLine::new(forced_bearoff(), taken, false).with_reference_cube(1),
    ];
    simulate_trial(&mut lines, 0, 0, &ctx, &env, &dice).unwrap();
    let own = lines[0].output;
    let reference = lines[1].output;
    assert_eq!(own[OUTPUT_CUBEFUL_EQUITY], own[OUTPUT_EQUITY]);
    assert_eq!(reference[OUTPUT_CUBEFUL_EQUITY], 2.0 * own[OUTPUT_CUBEFUL_EQUITY]);
    assert_eq!(reference[OUTPUT_EQUITY], own[OUTPUT_EQUITY]);
}

#[test]
fn truncated_line_matches_a_direct_evaluation() {
    let env = EvalEnv::reference();
    let ctx = RolloutContext {
        truncate_at: Some(1),
        variance_reduction: false,
        cubeful: false,
        initial_position: true,
        rng: RngKind::Manual {
            rolls: vec![[3, 3], [3, 1]],
        },
        ..RolloutContext::default()
    };
    let dice = DiceSource::new(ctx.seed, ctx.rng.clone(), ctx.quasi_random_dice);
    let board = Board::initial(GameVariant::Standard);
    let ci = CubeInfo::money(Player::Zero);

    let mut lines = [TrialLine::new(board, ci, false)];
    simulate_trial(&mut lines, 0, 0, &ctx, &env, &dice).unwrap();

    // The opening roll skips the double.
    let moved = find_best_move(
        &board,
        3,
        1,
        &ci,
        &ctx.chequer_context(Player::Zero, 0),
        &ctx.move_filter(Player::Zero, 0),
        &env,
    )
    .unwrap();
    let opp = ci.flipped();
    let mut expected =
        general_evaluation_e(&moved.swapped(), &opp, &ctx.truncation.with_cubeful(false), &env)
            .unwrap();
    invert_outputs(&mut expected, &opp);

    assert!(lines[0].finished);
    assert_eq!(lines[0].board, moved.swapped());
    assert_eq!(lines[0].output, expected);
}

#[test]
fn lines_sharing_dice_play_identical_games() {
    let env = EvalEnv::reference();
    let ctx = RolloutContext {
        truncate_at: Some(4),
        ..RolloutContext::default()
    };
    let dice = DiceSource::new(ctx.seed, ctx.rng.clone(), ctx.quasi_random_dice);
    let board = Board::initial(GameVariant::Standard);
    let ci = CubeInfo::money(Player::Zero);

    let mut lines = [TrialLine::new(board, ci, false), TrialLine::new(board, ci, false)];
    simulate_trial(&mut lines, 0, 3, &ctx, &env, &dice).unwrap();
    assert_eq!(lines[0].output, lines[1].output);
    assert_eq!(lines[0].board, lines[1].board);
}

#[test]
fn finished_game_records_the_winner() {
    let env = EvalEnv::reference();
    let ctx = RolloutContext {
        variance_reduction: false,
        ..quick_context()
    };
    let dice = DiceSource::new(ctx.seed, ctx.rng.clone(), ctx.quasi_random_dice);
    // Player One is on roll and bears off its last chequer.
    let ci = CubeInfo::money(Player::One);
    let mut lines = [TrialLine::new(forced_bearoff(), ci, false).with_stats()];
    simulate_trial(&mut lines, 0, 0, &ctx, &env, &dice).unwrap();

    let stats = lines[0].stats.as_ref().unwrap();
    assert_eq!(stats.player(Player::One).gammons[0], 1);
    assert_eq!(stats.player(Player::Zero).gammons, [0; 10]);
    assert_eq!(lines[0].output[OUTPUT_WIN], 1.0);
}

#[test]
fn pass_ends_the_line_at_the_double_point() {
    let env = EvalEnv::reference();
    let ctx = RolloutContext {
        variance_reduction: false,
        ..quick_context()
    };
    let dice = DiceSource::new(ctx.seed, ctx.rng.clone(), ctx.quasi_random_dice);
    let ci = CubeInfo::money(Player::Zero);

    let mut lines = [TrialLine::new(crushing_race(), ci, true).with_stats()];
    simulate_trial(&mut lines, 0, 0, &ctx, &env, &dice).unwrap();
    let line = &lines[0];

    let [nd, _] =
        general_cube_decision_e(&crushing_race(), &ci, &ctx.cube_context(Player::Zero, 0), &env)
            .unwrap();
    assert!(line.finished);
    assert_eq!(line.ci.cube, 1);
    assert_eq!(line.output[OUTPUT_CUBEFUL_EQUITY], 1.0);
    assert_eq!(line.output[..OUTPUT_CUBEFUL_EQUITY], nd[..OUTPUT_CUBEFUL_EQUITY]);

    let stats = line.stats.as_ref().unwrap();
    assert_eq!(stats.player(Player::Zero).double_drops[0], 1);
    assert_eq!(stats.player(Player::Zero).double_takes, [0; 10]);
    assert_eq!(stats.games_finished(), 1);
}

#[test]
fn take_doubles_the_cube_for_the_opponent() {
    let env = EvalEnv::reference();
    let ctx = RolloutContext {
        truncate_at: Some(1),
        variance_reduction: false,
        rng: manual(&[[6, 5]]),
        ..quick_context()
    };
    let dice = DiceSource::new(ctx.seed, ctx.rng.clone(), ctx.quasi_random_dice);
    let ci = CubeInfo::money(Player::Zero);

    let mut lines = [TrialLine::new(race(), ci, true).with_stats()];
    simulate_trial(&mut lines, 0, 0, &ctx, &env, &dice).unwrap();
    let line = &lines[0];

    // Truncated after Player Zero's first move, Player One on roll.
    assert!(line.finished);
    assert_eq!(line.ci.cube, 2);
    assert_eq!(line.ci.owner, CubeOwner::Owned(Player::One));
    assert_eq!(line.ci.on_roll, Player::One);

    let stats = line.stats.as_ref().unwrap();
    assert_eq!(stats.player(Player::Zero).double_takes[0], 1);
    assert_eq!(stats.player(Player::Zero).double_drops, [0; 10]);
}

#[test]
fn two_sided_bearoff_truncates_before_the_cube() {
    let env = EvalEnv::reference();
    let ctx = quick_context();
    let dice = DiceSource::new(ctx.seed, ctx.rng.clone(), ctx.quasi_random_dice);
    let ci = CubeInfo::money(Player::Zero);
    let mut board = Board::empty();
    board.0[0][0] = 3;
    board.0[1][5] = 3;

    let mut lines = [TrialLine::new(board, ci, true).with_stats()];
    simulate_trial(&mut lines, 0, 0, &ctx, &env, &dice).unwrap();
    let line = &lines[0];

    let expected = general_evaluation_e(&board, &ci, &EvalContext::zero_ply(true), &env).unwrap();
    assert!(line.finished);
    assert_eq!(line.board, board);
    assert_eq!(line.ci, ci);
    assert_eq!(line.output, expected);
    let stats = line.stats.as_ref().unwrap();
    assert_eq!(stats.player(Player::Zero).double_takes, [0; 10]);
    assert_eq!(stats.player(Player::Zero).double_drops, [0; 10]);
}

#[test]
fn variance_reduction_does_not_change_the_moves() {
    let env = EvalEnv::reference();
    let on = RolloutContext {
        truncate_at: Some(6),
        ..RolloutContext::default()
    };
    let off = RolloutContext {
        variance_reduction: false,
        ..on.clone()
    };
    let dice = DiceSource::new(on.seed, on.rng.clone(), on.quasi_random_dice);
    let board = Board::initial(GameVariant::Standard);
    let ci = CubeInfo::money(Player::Zero);

    for trial in 0..4 {
        let mut a = [TrialLine::new(board, ci, false)];
        let mut b = [TrialLine::new(board, ci, false)];
        simulate_trial(&mut a, 0, trial, &on, &env, &dice).unwrap();
        simulate_trial(&mut b, 0, trial, &off, &env, &dice).unwrap();
        assert_eq!(a[0].board, b[0].board, "trial {trial}");
        assert_eq!(a[0].ci, b[0].ci, "trial {trial}");
    }
}

#[test]
fn forced_result_has_no_variance_correction() {
    let env = EvalEnv::reference();
    let on = quick_context();
    let off = RolloutContext {
        variance_reduction: false,
        ..on.clone()
    };
    let dice = DiceSource::new(on.seed, on.rng.clone(), on.quasi_random_dice);
    let ci = CubeInfo::money(Player::Zero);

    for trial in 0..6 {
        let mut a = [TrialLine::new(forced_bearoff(), ci, false)];
        let mut b = [TrialLine::new(forced_bearoff(), ci, false)];
        simulate_trial(&mut a, 0, trial, &on, &env, &dice).unwrap();
        simulate_trial(&mut b, 0, trial, &off, &env, &dice).unwrap();
        assert_eq!(a[0].output, b[0].output);
    }
}

#[test]
fn cubeful_correction_follows_the_cube() {
    let env = EvalEnv::reference();
    let on = RolloutContext {
        truncate_at: Some(1),
        rng: manual(&[[6, 5]]),
        ..quick_context()
    };
    let off = RolloutContext {
        variance_reduction: false,
        ..on.clone()
    };
    let dice = DiceSource::new(on.seed, on.rng.clone(), on.quasi_random_dice);
    let ci = CubeInfo::money(Player::Zero);

    let mut a = [TrialLine::new(race(), ci, true)];
    let mut b = [TrialLine::new(race(), ci, true)];
    simulate_trial(&mut a, 0, 0, &on, &env, &dice).unwrap();
    simulate_trial(&mut b, 0, 0, &off, &env, &dice).unwrap();
    assert_eq!(a[0].ci.cube, 2);
    assert_eq!(a[0].board, b[0].board);

    // Mean over the 21 rolls minus the roll played, for the root player.
    let taken = ci.doubled();
    let opp = taken.flipped();
    let finder = EvalContext::zero_ply(true);
    let reduced = on.variance_reduction_context(Player::One);
    let mut mean = [0.0f32; NUM_OUTPUTS];
    let mut actual = [0.0f32; NUM_OUTPUTS];
    for hi in 1..=6u8 {
        for lo in 1..=hi {
            let moved =
                find_best_move(&race(), hi, lo, &taken, &finder, &MoveFilter::default(), &env)
                    .unwrap();
            let mut out = general_evaluation_e(&moved.swapped(), &opp, &reduced, &env).unwrap();
            invert_outputs(&mut out, &taken);
            let weight = if hi == lo { 1.0 } else { 2.0 };
            for (m, v) in mean.iter_mut().zip(out) {
                *m += weight * v;
            }
            if (hi, lo) == (6, 5) {
                actual = out;
            }
        }
    }

    for k in 0..NUM_OUTPUTS {
        let diff = mean[k] / 36.0 - actual[k];
        let correction = if k == OUTPUT_CUBEFUL_EQUITY { 2.0 * diff } else { diff };
        assert!(
            (a[0].output[k] - (b[0].output[k] + correction)).abs() < 1e-5,
            "output {k}: {} vs {} + {}",
            a[0].output[k],
            b[0].output[k],
            correction
        );
    }
}

#[test]
fn dice_outside_the_die_range_are_an_error() {
    let env = EvalEnv::reference();
    let ctx = RolloutContext {
        rng: manual(&[[0, 3]]),
        ..quick_context()
    };
    let dice = DiceSource::new(ctx.seed, ctx.rng.clone(), ctx.quasi_random_dice);
    let ci = CubeInfo::money(Player::Zero);

    let mut lines = [TrialLine::new(race(), ci, false)];
    let err = simulate_trial(&mut lines, 0, 0, &ctx, &env, &dice).unwrap_err();
    assert!(matches!(err, EvalError::Evaluator(_)));
}

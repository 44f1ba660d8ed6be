//! Multi-alternative rollout loop: trials, folding, stopping and reporting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use bg_core::{CubeInfo, DiceSource, RngKind};
use bg_eval::outputs::{NUM_OUTPUTS, NUM_PROBS, OUTPUT_EQUITY};
use bg_eval::{invert_outputs, sanity_check, EvalEnv, EvalError, MatchEquityTable, Outputs};
use bg_logging::{
    now_ms, AlternativeSummaryV1, NdjsonWriter, RolloutProgressEventV1, RolloutResultEventV1,
    SanityWarningEventV1, VersionInfoV1,
};
use tracing::{debug, warn};

use crate::context::RolloutContext;
use crate::error::RolloutError;
use crate::executor::TrialExecutor;
use crate::setup::{Alternative, EvalSetup, RolloutProgress};
use crate::simulator::{simulate_trial, TrialLine};
use crate::stats::RolloutStat;

/// Outcome of a rollout that completed at least one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolloutSummary {
    /// Trial index the rollout reached (resumed trials included).
    pub trials_completed: u32,
    pub interrupted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlternativeProgress {
    pub index: usize,
    pub games_done: u32,
    pub no_more: bool,
    pub mean: Outputs,
    pub std_error: Outputs,
}

/// Snapshot handed to the progress callback at every checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub trials_completed: u32,
    pub trials: u32,
    pub alternatives: Vec<AlternativeProgress>,
}

/// Optional observers and controls for [`rollout_general`].
#[derive(Default)]
pub struct RolloutHooks<'a> {
    /// Set to stop the rollout after the current trial.
    pub interrupt: Option<&'a AtomicBool>,
    pub progress: Option<&'a mut dyn FnMut(&ProgressReport)>,
    pub events: Option<&'a mut NdjsonWriter>,
    /// Runs on the calling thread when absent.
    pub executor: Option<&'a TrialExecutor>,
    pub run_id: &'a str,
}

struct AltRun {
    ctx: RolloutContext,
    progress: RolloutProgress,
    dice: usize,
}

struct TrialOutcome {
    output: Outputs,
    stats: RolloutStat,
}

fn dice_key(ctx: &RolloutContext) -> (u64, RngKind, bool) {
    (ctx.seed, ctx.rng.clone(), ctx.quasi_random_dice)
}

/// Every output is within `std_limit` relative standard error.
fn precise_enough(
    progress: &RolloutProgress,
    ctx: &RolloutContext,
    ci: &CubeInfo,
    reference: &CubeInfo,
    met: &MatchEquityTable,
) -> bool {
    for k in 0..NUM_OUTPUTS {
        let (v, s) = if k < NUM_PROBS {
            (progress.mean[k].abs(), progress.sigma[k].abs())
        } else if k == OUTPUT_EQUITY {
            if ci.is_money() {
                let ratio = ci.cube as f32 / reference.cube as f32;
                ((progress.mean[k] * ratio).abs(), (progress.sigma[k] * ratio).abs())
            } else {
                (
                    met.mwc2eq(met.eq2mwc(progress.mean[k], ci), reference).abs(),
                    met.se_mwc2eq(met.se_eq2mwc(progress.sigma[k], ci), reference).abs(),
                )
            }
        } else {
            if !ctx.cubeful {
                continue;
            }
            if ci.is_money() {
                (progress.mean[k].abs(), progress.sigma[k].abs())
            } else {
                (
                    met.mwc2eq(progress.mean[k], reference).abs(),
                    met.se_mwc2eq(progress.sigma[k], reference).abs(),
                )
            }
        };
        if v >= 1e-4 && v * ctx.std_limit < s {
            return false;
        }
    }
    true
}

fn summaries(alts: &[Alternative], runs: &[AltRun]) -> Vec<AlternativeSummaryV1> {
    alts.iter()
        .zip(runs)
        .enumerate()
        .map(|(i, (alt, run))| AlternativeSummaryV1 {
            index: i as u32,
            label: alt.label.clone(),
            games_done: run.progress.games_done,
            no_more: run.progress.no_more,
            mean: run.progress.mean,
            std_error: run.progress.sigma,
        })
        .collect()
}

fn report(runs: &[AltRun], trials_completed: u32, trials: u32) -> ProgressReport {
    ProgressReport {
        trials_completed,
        trials,
        alternatives: runs
            .iter()
            .enumerate()
            .map(|(index, run)| AlternativeProgress {
                index,
                games_done: run.progress.games_done,
                no_more: run.progress.no_more,
                mean: run.progress.mean,
                std_error: run.progress.sigma,
            })
            .collect(),
    }
}

/// Resolve each alternative's context and starting statistics.
fn prepare(
    alts: &mut [Alternative],
    defaults: &RolloutContext,
) -> Result<(Vec<AltRun>, Vec<DiceSource>), RolloutError> {
    let mut sources: Vec<((u64, RngKind, bool), DiceSource)> = Vec::new();
    let mut runs = Vec::with_capacity(alts.len());
    for (i, alt) in alts.iter_mut().enumerate() {
        alt.board
            .validate(alt.ci.variant)
            .map_err(|e| RolloutError::InvalidConfig(format!("alternative {i}: {e}")))?;
        alt.ci
            .validate()
            .map_err(|e| RolloutError::InvalidConfig(format!("alternative {i}: {e}")))?;

        let (mut ctx, mut progress) = match &alt.setup {
            EvalSetup::Rollout {
                context,
                progress: Some(p),
            } if p.games_done > 0 => ((**context).clone(), p.clone()),
            _ => {
                alt.stats = RolloutStat::default();
                (defaults.clone(), RolloutProgress::default())
            }
        };
        ctx.validate()?;
        ctx.trials = defaults.trials;
        progress.no_more = false;

        let key = dice_key(&ctx);
        let dice = match sources.iter().position(|(k, _)| *k == key) {
            Some(d) => d,
            None => {
                sources.push((key, DiceSource::new(ctx.seed, ctx.rng.clone(), ctx.quasi_random_dice)));
                sources.len() - 1
            }
        };
        runs.push(AltRun {
            ctx,
            progress,
            dice,
        });
    }
    let dice = sources.into_iter().map(|(_, d)| d).collect();
    Ok((runs, dice))
}

fn store(alts: &mut [Alternative], runs: Vec<AltRun>) {
    for (alt, run) in alts.iter_mut().zip(runs) {
        alt.mean = run.progress.mean;
        alt.std_error = run.progress.sigma;
        alt.setup = EvalSetup::Rollout {
            context: Box::new(run.ctx),
            progress: Some(run.progress),
        };
    }
}

/// Roll out every alternative with the same trial indices.
///
/// Alternatives whose setup carries progress resume from it; all others
/// start over with a copy of `ctx`. With `invert` the results are expressed
/// for the player not on roll in each alternative. Results, statistics and
/// progress are written back into `alts`, also when an error is returned.
pub fn rollout_general(
    alts: &mut [Alternative],
    invert: bool,
    ctx: &RolloutContext,
    env: &EvalEnv<'_>,
    mut hooks: RolloutHooks<'_>,
) -> Result<RolloutSummary, RolloutError> {
    if alts.is_empty() {
        return Err(RolloutError::InvalidConfig(
            "no alternatives to roll out".into(),
        ));
    }
    ctx.validate()?;
    let (mut runs, dice) = prepare(alts, ctx)?;
    let result = drive(alts, &mut runs, &dice, invert, ctx.trials, env, &mut hooks);
    store(alts, runs);
    result
}

fn drive(
    alts: &mut [Alternative],
    runs: &mut [AltRun],
    dice: &[DiceSource],
    invert: bool,
    trials: u32,
    env: &EvalEnv<'_>,
    hooks: &mut RolloutHooks<'_>,
) -> Result<RolloutSummary, RolloutError> {
    let started = Instant::now();
    let fallback = TrialExecutor::default();
    let executor = hooks.executor.unwrap_or(&fallback);
    let checkpoint = executor.checkpoint_every();
    let reference = alts[0].ci;

    let mut trial = runs.iter().map(|r| r.progress.games_done).min().unwrap_or(0);
    let mut interrupted = false;

    'batches: while trial < trials {
        if runs.iter().all(|r| r.progress.no_more) {
            break;
        }
        let end = trial.saturating_add(executor.batch_trials()).min(trials);

        let jobs: Vec<(u32, usize)> = {
            let runs: &[AltRun] = runs;
            (trial..end)
                .flat_map(move |t| {
                    runs.iter()
                        .enumerate()
                        .filter(move |(_, r)| !r.progress.no_more && r.progress.games_done <= t)
                        .map(move |(a, _)| (t, a))
                })
                .collect()
        };

        let outcomes = {
            let alts: &[Alternative] = alts;
            let runs: &[AltRun] = runs;
            let interrupt = hooks.interrupt;
            executor.run(&jobs, |&(t, a)| {
                if interrupt.is_some_and(|f| f.load(Ordering::Relaxed)) {
                    return None;
                }
                Some(play_trial(&alts[a], &runs[a], &dice[runs[a].dice], t, invert, reference.cube, env))
            })
        };

        let mut outcomes = outcomes.into_iter();
        let mut cursor = 0;
        for t in trial..end {
            let group_len = jobs[cursor..].iter().take_while(|(jt, _)| *jt == t).count();
            let group = &jobs[cursor..cursor + group_len];
            let results: Vec<_> = outcomes.by_ref().take(group_len).collect();
            cursor += group_len;

            // A raised flag is seen by the next task; trials that finished are kept.
            if results.iter().any(Option::is_none) {
                interrupted = true;
                break 'batches;
            }
            let mut finished = Vec::with_capacity(group_len);
            for res in results.into_iter().flatten() {
                match res {
                    Ok(outcome) => finished.push(outcome),
                    Err(source) => {
                        return Err(RolloutError::Eval {
                            source,
                            trials_completed: t,
                        })
                    }
                }
            }

            for (&(_, a), outcome) in group.iter().zip(finished) {
                if runs[a].progress.no_more {
                    continue;
                }
                fold_outcome(&mut alts[a], &mut runs[a], a, t, outcome, invert, &reference, env, hooks)?;
            }
            trial = t + 1;

            if trial % checkpoint == 0 && trial < trials {
                checkpoint_report(alts, runs, trial, trials, hooks)?;
            }
            if runs.iter().all(|r| r.progress.no_more) {
                break 'batches;
            }
        }
    }

    if trial == 0 {
        return Err(RolloutError::NoTrialsCompleted);
    }

    let summary = RolloutSummary {
        trials_completed: trial,
        interrupted,
    };
    if let Some(cb) = hooks.progress.as_deref_mut() {
        cb(&report(runs, trial, trials));
    }
    if let Some(w) = hooks.events.as_deref_mut() {
        w.write_event(&RolloutResultEventV1 {
            event: "rollout_result".to_string(),
            ts_ms: now_ms(),
            v: VersionInfoV1::current(),
            run_id: hooks.run_id.to_string(),
            trials_completed: trial,
            interrupted,
            elapsed_ms: started.elapsed().as_millis() as u64,
            alternatives: summaries(alts, runs),
        })?;
        w.flush()?;
    }
    debug!(trials_completed = trial, interrupted, "rollout finished");
    Ok(summary)
}

fn play_trial(
    alt: &Alternative,
    run: &AltRun,
    dice: &DiceSource,
    trial: u32,
    invert: bool,
    reference_cube: u32,
    env: &EvalEnv<'_>,
) -> Result<TrialOutcome, EvalError> {
    let mut line = [TrialLine::new(alt.board, alt.ci, alt.cube_decision_at_top)
        .with_stats()
        .with_reference_cube(reference_cube)];
    simulate_trial(&mut line, 0, trial, &run.ctx, env, dice)?;
    let [line] = line;
    let mut output = line.output;
    if invert {
        invert_outputs(&mut output, &alt.ci);
    }
    Ok(TrialOutcome {
        output,
        stats: line.stats.unwrap_or_default(),
    })
}

#[allow(clippy::too_many_arguments)]
fn fold_outcome(
    alt: &mut Alternative,
    run: &mut AltRun,
    index: usize,
    trial: u32,
    outcome: TrialOutcome,
    invert: bool,
    reference: &CubeInfo,
    env: &EvalEnv<'_>,
    hooks: &mut RolloutHooks<'_>,
) -> Result<(), RolloutError> {
    run.progress.fold(&outcome.output);
    alt.stats.merge(&outcome.stats);

    let variant = alt.ci.variant;
    if !variant.is_hypergammon() {
        // Outputs belong to side 1 of the board when inverted.
        let board = if invert { alt.board.swapped() } else { alt.board };
        let before = run.progress.mean;
        if sanity_check(&board, &mut run.progress.mean, variant) {
            warn!(
                alternative = index,
                trial,
                ?before,
                after = ?run.progress.mean,
                "rollout mean adjusted by sanity check"
            );
            if let Some(w) = hooks.events.as_deref_mut() {
                w.write_event(&SanityWarningEventV1 {
                    event: "sanity_warning".to_string(),
                    ts_ms: now_ms(),
                    v: VersionInfoV1::current(),
                    run_id: hooks.run_id.to_string(),
                    alternative: index as u32,
                    trial,
                    before,
                    after: run.progress.mean,
                })?;
            }
        }
    }

    if run.ctx.stop_on_std
        && trial >= run.ctx.minimum_games
        && precise_enough(&run.progress, &run.ctx, &alt.ci, reference, env.met)
    {
        debug!(alternative = index, games = run.progress.games_done, "standard error reached");
        run.progress.no_more = true;
    }
    Ok(())
}

fn checkpoint_report(
    alts: &[Alternative],
    runs: &[AltRun],
    trial: u32,
    trials: u32,
    hooks: &mut RolloutHooks<'_>,
) -> Result<(), RolloutError> {
    debug!(trial, trials, "rollout checkpoint");
    if let Some(cb) = hooks.progress.as_deref_mut() {
        cb(&report(runs, trial, trials));
    }
    if let Some(w) = hooks.events.as_deref_mut() {
        w.write_event(&RolloutProgressEventV1 {
            event: "rollout_progress".to_string(),
            ts_ms: now_ms(),
            v: VersionInfoV1::current(),
            run_id: hooks.run_id.to_string(),
            trial,
            trials,
            alternatives: summaries(alts, runs),
        })?;
    }
    Ok(())
}

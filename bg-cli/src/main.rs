//! bg: command line front end for rollouts and cube analysis.
//!
//! Subcommands:
//! - rollout (a position, or every play of a roll with `--dice`)
//! - cube
//! - eval
//! - config

use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use bg_core::config::Config;
use bg_core::{generate_moves, Board, RngKind};
use bg_eval::outputs::{Outputs, OUTPUT_CUBEFUL_EQUITY, OUTPUT_EQUITY};
use bg_eval::{double_point, find_cube_decision, EvalContext, EvalEnv};
use bg_logging::{
    hash_config_bytes, now_ms, write_manifest_atomic, NdjsonWriter, RolloutManifestV1,
    RUN_MANIFEST_VERSION,
};
use bg_rollout::{
    cube_decision_rollout, evaluate_rollout, general_cube_decision, general_evaluation,
    resignation, score_moves_rollout, EvalSetup, ProgressReport, RolloutContext, RolloutHooks,
    RolloutSummary, TrialExecutor,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const SEAT_NAMES: [&str; 2] = ["Player 0", "Player 1"];

fn fail(what: &str, err: impl fmt::Display) -> ! {
    eprintln!("{what}: {err}");
    process::exit(1);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Options shared by the subcommands; each subcommand accepts a subset.
#[derive(Debug, Default)]
struct RunArgs {
    config: Option<PathBuf>,
    board: Option<Board>,
    dice: Option<(u8, u8)>,
    trials: Option<u32>,
    seed: Option<u64>,
    threads: Option<u32>,
    plies: Option<u32>,
    events: Option<String>,
    manifest: Option<String>,
    run_id: Option<String>,
    stats: bool,
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(v) => v,
        None => {
            eprintln!("Missing value for {flag}");
            process::exit(1);
        }
    }
}

fn parse_flag<T: FromStr>(args: &[String], i: usize, flag: &str) -> T {
    let raw = flag_value(args, i, flag);
    raw.parse().unwrap_or_else(|_| {
        eprintln!("Invalid {flag} value: {raw}");
        process::exit(1);
    })
}

fn parse_dice(raw: &str) -> Option<(u8, u8)> {
    let (a, b) = raw.split_once('-')?;
    let (a, b): (u8, u8) = (a.trim().parse().ok()?, b.trim().parse().ok()?);
    ((1..=6).contains(&a) && (1..=6).contains(&b)).then_some((a, b))
}

/// Returns `None` after printing `usage` for `--help`.
fn parse_run_args(cmd: &str, args: &[String], usage: &str, allowed: &[&str]) -> Option<RunArgs> {
    let mut out = RunArgs::default();
    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        if flag == "--help" || flag == "-h" {
            println!("{usage}");
            return None;
        }
        if !allowed.contains(&flag) {
            eprintln!("Unknown option for `bg {cmd}`: {flag}");
            eprintln!("Run `bg {cmd} --help` for usage.");
            process::exit(1);
        }
        match flag {
            "--stats" => {
                out.stats = true;
                i += 1;
                continue;
            }
            "--config" => out.config = Some(PathBuf::from(flag_value(args, i, flag))),
            "--board" => {
                let raw = flag_value(args, i, flag);
                out.board = Some(Board::from_str(raw).unwrap_or_else(|e| fail("Invalid --board", e)));
            }
            "--dice" => {
                let raw = flag_value(args, i, flag);
                out.dice = Some(parse_dice(raw).unwrap_or_else(|| {
                    eprintln!("Invalid --dice value: {raw} (expected e.g. 6-5)");
                    process::exit(1);
                }));
            }
            "--trials" => out.trials = Some(parse_flag(args, i, flag)),
            "--seed" => out.seed = Some(parse_flag(args, i, flag)),
            "--threads" => out.threads = Some(parse_flag(args, i, flag)),
            "--plies" => out.plies = Some(parse_flag(args, i, flag)),
            "--events" => out.events = Some(flag_value(args, i, flag).to_string()),
            "--manifest" => out.manifest = Some(flag_value(args, i, flag).to_string()),
            "--run-id" => out.run_id = Some(flag_value(args, i, flag).to_string()),
            _ => {
                eprintln!("Unhandled option for `bg {cmd}`: {flag}");
                process::exit(1);
            }
        }
        i += 2;
    }
    Some(out)
}

/// Configuration plus the bytes its hash is taken from.
fn load_config(a: &RunArgs) -> (Config, Vec<u8>) {
    let (mut cfg, bytes) = match &a.config {
        Some(path) => {
            let bytes = fs::read(path)
                .unwrap_or_else(|e| fail(&format!("Failed to read {}", path.display()), e));
            let text = String::from_utf8_lossy(&bytes);
            let cfg = Config::from_yaml(&text).unwrap_or_else(|e| fail("Invalid config", e));
            (cfg, bytes)
        }
        None => {
            let cfg = Config::default();
            let bytes = cfg.to_yaml().map(String::into_bytes).unwrap_or_default();
            (cfg, bytes)
        }
    };
    if let Some(t) = a.trials {
        cfg.rollout.trials = t;
    }
    if let Some(s) = a.seed {
        cfg.rollout.seed = s;
    }
    if let Some(t) = a.threads {
        cfg.runtime.threads = t;
    }
    if let Some(p) = a.plies {
        cfg.evaluation.chequer.plies = p;
        cfg.evaluation.cube.plies = p;
    }
    if a.events.is_some() {
        cfg.logging.events_path = a.events.clone();
    }
    if a.manifest.is_some() {
        cfg.logging.manifest_path = a.manifest.clone();
    }
    (cfg, bytes)
}

fn rng_name(rng: &RngKind) -> &'static str {
    match rng {
        RngKind::ChaCha8 => "chacha8",
        RngKind::ChaCha20 => "chacha20",
        RngKind::SplitMix64 => "splitmix64",
        RngKind::Manual { .. } => "manual",
    }
}

/// Executor, event log and manifest bookkeeping of one rollout run.
struct Session {
    cfg: Config,
    config_hash: String,
    run_id: String,
    created_ts_ms: u64,
    executor: TrialExecutor,
    events: Option<NdjsonWriter>,
}

impl Session {
    fn open(a: &RunArgs) -> Self {
        let (cfg, bytes) = load_config(a);
        let created_ts_ms = now_ms();
        let run_id = a
            .run_id
            .clone()
            .unwrap_or_else(|| format!("rollout-{created_ts_ms}"));
        let executor = TrialExecutor::new(cfg.runtime.threads, cfg.runtime.checkpoint_every)
            .unwrap_or_else(|e| fail("Failed to start workers", e));
        let events = cfg.logging.events_path.as_ref().map(|p| {
            NdjsonWriter::open_append_with_flush(p, cfg.logging.flush_every_lines)
                .unwrap_or_else(|e| fail(&format!("Failed to open {p}"), e))
        });
        info!(
            run_id = %run_id,
            threads = executor.threads(),
            trials = cfg.rollout.trials,
            "rollout session started"
        );
        Self {
            config_hash: hash_config_bytes(&bytes),
            cfg,
            run_id,
            created_ts_ms,
            executor,
            events,
        }
    }

    fn context(&self) -> RolloutContext {
        let ctx = RolloutContext::from_config(&self.cfg);
        ctx.validate().unwrap_or_else(|e| fail("Invalid config", e));
        ctx
    }

    fn hooks<'a>(&'a mut self, progress: &'a mut dyn FnMut(&ProgressReport)) -> RolloutHooks<'a> {
        RolloutHooks {
            interrupt: None,
            progress: Some(progress),
            events: self.events.as_mut(),
            executor: Some(&self.executor),
            run_id: &self.run_id,
        }
    }

    fn finish(&self, ctx: &RolloutContext, alternatives: Vec<String>, summary: &RolloutSummary) {
        let Some(path) = &self.cfg.logging.manifest_path else {
            return;
        };
        let manifest = RolloutManifestV1 {
            run_manifest_version: RUN_MANIFEST_VERSION,
            run_id: self.run_id.clone(),
            created_ts_ms: self.created_ts_ms,
            finished_ts_ms: Some(now_ms()),
            config_hash: Some(self.config_hash.clone()),
            seed: ctx.seed,
            rng: rng_name(&ctx.rng).to_string(),
            quasi_random_dice: ctx.quasi_random_dice,
            trials_requested: ctx.trials,
            trials_completed: summary.trials_completed,
            interrupted: summary.interrupted,
            alternatives,
            events_path: self.cfg.logging.events_path.clone(),
        };
        write_manifest_atomic(path, &manifest)
            .unwrap_or_else(|e| fail("Failed to write run manifest", e));
    }
}

fn log_progress(r: &ProgressReport) {
    for a in &r.alternatives {
        info!(
            trial = r.trials_completed,
            trials = r.trials,
            alternative = a.index,
            games = a.games_done,
            equity = a.mean[OUTPUT_EQUITY],
            cubeful = a.mean[OUTPUT_CUBEFUL_EQUITY],
            "rollout progress"
        );
    }
}

fn print_header() {
    println!(
        "{:<28} {:>7} {:>7} {:>7} {:>7} {:>7} {:>8} {:>8}",
        "", "Win", "W(g)", "W(bg)", "L(g)", "L(bg)", "Equity", "Cubeful"
    );
}

fn print_row(label: &str, out: &Outputs) {
    println!(
        "{label:<28} {:>7.4} {:>7.4} {:>7.4} {:>7.4} {:>7.4} {:>+8.4} {:>+8.4}",
        out[0], out[1], out[2], out[3], out[4], out[5], out[6]
    );
}

fn print_summary(summary: &RolloutSummary, trials: u32) {
    if summary.interrupted {
        println!("Interrupted after {} of {trials} trials", summary.trials_completed);
    } else {
        println!("Trials: {}", summary.trials_completed);
    }
}

const ROLLOUT_USAGE: &str = r#"bg rollout

USAGE:
    bg rollout [--config cfg.yaml] [--board BOARD] [--dice D-D] [--trials N] [--seed S]

OPTIONS:
    --config PATH    YAML config (default: built-in defaults)
    --board BOARD    Position as two '/'-separated sides of 25 counts (default: opening)
    --dice D-D       Roll out every legal play of this roll instead of the position
    --trials N       Override rollout.trials
    --seed S         Override rollout.seed
    --threads N      Override runtime.threads
    --plies N        Chequer and cube evaluation depth
    --events PATH    Append NDJSON progress events here
    --manifest PATH  Write a JSON run manifest here
    --run-id ID      Run id recorded in events and the manifest
    --stats          Print game statistics
"#;

const ROLLOUT_FLAGS: &[&str] = &[
    "--config",
    "--board",
    "--dice",
    "--trials",
    "--seed",
    "--threads",
    "--plies",
    "--events",
    "--manifest",
    "--run-id",
    "--stats",
];

fn cmd_rollout(args: &[String]) {
    let Some(a) = parse_run_args("rollout", args, ROLLOUT_USAGE, ROLLOUT_FLAGS) else {
        return;
    };
    let mut session = Session::open(&a);
    let ctx = session.context();
    let ci = session.cfg.cube.to_cube_info();
    let board = a.board.unwrap_or_else(|| Board::initial(ci.variant));
    let env = EvalEnv::reference();
    let mut progress = log_progress;

    match a.dice {
        None => {
            let r = evaluate_rollout(&board, &ci, &ctx, &env, session.hooks(&mut progress))
                .unwrap_or_else(|e| fail("Rollout failed", e));
            print_header();
            print_row("position", &r.mean);
            print_row("  std. error", &r.std_error);
            print_summary(&r.summary, ctx.trials);
            if a.stats {
                print!("\n{}", r.stats.report(r.summary.trials_completed, SEAT_NAMES));
            }
            session.finish(&ctx, vec!["position".to_string()], &r.summary);
        }
        Some((d0, d1)) => {
            let plays =
                generate_moves(&board, d0, d1).unwrap_or_else(|e| fail("Move generation failed", e));
            let (mut scores, summary) =
                score_moves_rollout(&plays, &ci, &ctx, &env, session.hooks(&mut progress))
                    .unwrap_or_else(|e| fail("Rollout failed", e));
            let labels = scores.iter().map(|s| s.label.clone()).collect();
            scores.sort_by(|x, y| y.score.total_cmp(&x.score));
            let best = scores.first().map_or(0.0, |s| s.score);

            print_header();
            for (rank, s) in scores.iter().enumerate() {
                print_row(&format!("{}. {}", rank + 1, s.label), &s.mean);
                println!("{:<28} score {:+.4} ({:+.4})", "", s.score, s.score - best);
            }
            print_summary(&summary, ctx.trials);
            session.finish(&ctx, labels, &summary);
        }
    }
}

const CUBE_USAGE: &str = r#"bg cube

USAGE:
    bg cube [--config cfg.yaml] [--board BOARD] [--trials N] [--seed S]

OPTIONS:
    --config PATH    YAML config; the cube section sets cube owner, value and score
    --board BOARD    Position as two '/'-separated sides of 25 counts (default: opening)
    --trials N       Override rollout.trials
    --seed S         Override rollout.seed
    --threads N      Override runtime.threads
    --plies N        Chequer and cube evaluation depth
    --events PATH    Append NDJSON progress events here
    --manifest PATH  Write a JSON run manifest here
    --run-id ID      Run id recorded in events and the manifest
"#;

const CUBE_FLAGS: &[&str] = &[
    "--config",
    "--board",
    "--trials",
    "--seed",
    "--threads",
    "--plies",
    "--events",
    "--manifest",
    "--run-id",
];

fn cmd_cube(args: &[String]) {
    let Some(a) = parse_run_args("cube", args, CUBE_USAGE, CUBE_FLAGS) else {
        return;
    };
    let mut session = Session::open(&a);
    let ctx = session.context();
    let ci = session.cfg.cube.to_cube_info();
    let board = a.board.unwrap_or_else(|| Board::initial(ci.variant));
    let env = EvalEnv::reference();
    let mut progress = log_progress;

    let r = cube_decision_rollout(&board, &ci, &ctx, &env, session.hooks(&mut progress))
        .unwrap_or_else(|e| fail("Cube rollout failed", e));
    print_header();
    print_row("no double", &r.outputs[0]);
    print_row("  std. error", &r.std_errors[0]);
    print_row("double, take", &r.outputs[1]);
    print_row("  std. error", &r.std_errors[1]);
    println!();
    println!("No double     {:+.4}", r.equities.no_double);
    println!("Double, take  {:+.4}", r.equities.take);
    println!("Double, pass  {:+.4}", r.equities.drop);
    println!("Proper cube action: {}", r.decision);
    print_summary(&r.summary, ctx.trials);
    session.finish(
        &ctx,
        vec!["no double".to_string(), "double, take".to_string()],
        &r.summary,
    );
}

const EVAL_USAGE: &str = r#"bg eval

USAGE:
    bg eval [--config cfg.yaml] [--board BOARD] [--plies N]

OPTIONS:
    --config PATH    YAML config (default: built-in defaults)
    --board BOARD    Position as two '/'-separated sides of 25 counts (default: opening)
    --plies N        Evaluation depth (default: evaluation.chequer.plies)
"#;

fn cmd_eval(args: &[String]) {
    let Some(a) = parse_run_args("eval", args, EVAL_USAGE, &["--config", "--board", "--plies"])
    else {
        return;
    };
    let (cfg, _) = load_config(&a);
    let ci = cfg.cube.to_cube_info();
    let board = a.board.unwrap_or_else(|| Board::initial(ci.variant));
    let env = EvalEnv::reference();
    let setup = EvalSetup::Eval(EvalContext::from(&cfg.evaluation.chequer));

    let (out, _) = general_evaluation(&board, &ci, &setup, &env, RolloutHooks::default())
        .unwrap_or_else(|e| fail("Evaluation failed", e));
    print_header();
    print_row("position", &out);

    if double_point(&ci, env.met).is_some() {
        let mut setups = [setup.clone(), setup.clone()];
        let (both, _) =
            general_cube_decision(&board, &ci, &mut setups, &env, RolloutHooks::default())
                .unwrap_or_else(|e| fail("Cube evaluation failed", e));
        let (decision, eq) = find_cube_decision(&both, &ci, env.met);
        println!();
        println!("No double     {:+.4}", eq.no_double);
        println!("Double, take  {:+.4}", eq.take);
        println!("Double, pass  {:+.4}", eq.drop);
        println!("Proper cube action: {decision}");
    }

    let (resign, _) =
        resignation(&board, &ci, &setup, &env).unwrap_or_else(|e| fail("Evaluation failed", e));
    println!("Resignation: {resign:?}");
}

fn cmd_config(args: &[String]) {
    let usage = "bg config\n\nUSAGE:\n    bg config [--config cfg.yaml]\n\nPrints the resolved configuration.";
    let Some(a) = parse_run_args("config", args, usage, &["--config"]) else {
        return;
    };
    let (cfg, _) = load_config(&a);
    let yaml = cfg.to_yaml().unwrap_or_else(|e| fail("Failed to render config", e));
    print!("{yaml}");
}

fn print_help() {
    eprintln!(
        r#"bg - backgammon rollout and cube analysis

USAGE:
    bg <COMMAND> [OPTIONS]

COMMANDS:
    rollout     Roll out a position, or every play of a roll
    cube        Roll out no double against double/take
    eval        Evaluate a position and its cube decision
    config      Print the resolved configuration

OPTIONS:
    -h, --help      Print this help message
    -V, --version   Print version

Run `bg <COMMAND> --help` for command options. RUST_LOG sets the log filter.
"#
    );
}

fn print_version() {
    println!("bg {}", env!("CARGO_PKG_VERSION"));
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        process::exit(0);
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => print_help(),
        "-V" | "--version" => print_version(),
        "rollout" => {
            init_tracing();
            cmd_rollout(&args[2..]);
        }
        "cube" => {
            init_tracing();
            cmd_cube(&args[2..]);
        }
        "eval" => {
            init_tracing();
            cmd_eval(&args[2..]);
        }
        "config" => cmd_config(&args[2..]),
        cmd => {
            eprintln!("Unknown command: {cmd}");
            eprintln!("Run `bg --help` for usage.");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dice_parse_as_two_dice() {
        assert_eq!(parse_dice("6-5"), Some((6, 5)));
        assert_eq!(parse_dice("1-1"), Some((1, 1)));
        assert_eq!(parse_dice("7-1"), None);
        assert_eq!(parse_dice("65"), None);
    }

    #[test]
    fn run_args_collect_known_flags() {
        let args: Vec<String> = ["--trials", "64", "--seed", "9", "--stats"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let a = parse_run_args("rollout", &args, ROLLOUT_USAGE, ROLLOUT_FLAGS).unwrap();
        assert_eq!(a.trials, Some(64));
        assert_eq!(a.seed, Some(9));
        assert!(a.stats);

        let (cfg, bytes) = load_config(&a);
        assert_eq!(cfg.rollout.trials, 64);
        assert_eq!(cfg.rollout.seed, 9);
        assert!(!bytes.is_empty());
    }
}

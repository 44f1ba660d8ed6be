//! Evaluator interface and the reference pip-count evaluator.

use bg_core::{
    classify_position, game_status, Board, BoardError, CubeInfo, GameResult, GameVariant,
    MoveError, PositionClass, PositionClassifier, RuleClassifier, BAR,
};
use thiserror::Error;

use crate::context::EvalContext;
use crate::met::{default_met, MatchEquityTable};
use crate::outputs::{
    Probs, OUTPUT_LOSEBACKGAMMON, OUTPUT_LOSEGAMMON, OUTPUT_WIN, OUTPUT_WINBACKGAMMON,
    OUTPUT_WINGAMMON,
};

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("invalid board: {0}")]
    Board(#[from] BoardError),
    #[error("move generation failed: {0}")]
    Move(#[from] MoveError),
    #[error("invalid match equity table: {0}")]
    InvalidTable(String),
    #[error("evaluator failed: {0}")]
    Evaluator(String),
}

/// Static position evaluator.
///
/// Returns cubeless probabilities for side 0 of `board`, the player on roll.
/// Finished positions never reach the evaluator.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, board: &Board, ci: &CubeInfo, ec: &EvalContext)
        -> Result<Probs, EvalError>;
}

/// Collaborators every evaluation routine needs.
#[derive(Clone, Copy)]
pub struct EvalEnv<'a> {
    pub evaluator: &'a dyn Evaluator,
    pub classifier: &'a dyn PositionClassifier,
    pub met: &'a MatchEquityTable,
}

static HEURISTIC: HeuristicEvaluator = HeuristicEvaluator;
static RULES: RuleClassifier = RuleClassifier;

impl<'a> EvalEnv<'a> {
    pub fn new(
        evaluator: &'a dyn Evaluator,
        classifier: &'a dyn PositionClassifier,
        met: &'a MatchEquityTable,
    ) -> Self {
        Self {
            evaluator,
            classifier,
            met,
        }
    }

    pub fn classify(&self, board: &Board, variant: GameVariant) -> PositionClass {
        self.classifier.classify(board, variant)
    }
}

impl EvalEnv<'static> {
    /// Heuristic evaluator, rule classifier and the generated equity table.
    pub fn reference() -> Self {
        Self::new(&HEURISTIC, &RULES, default_met())
    }
}

/// Exact probabilities of a finished game for side 0.
pub fn terminal_probs(board: &Board, variant: GameVariant) -> Probs {
    let mut p = [0.0f32; 5];
    if let Some((winner, result)) = game_status(board, variant) {
        let gammon = if result >= GameResult::Gammon { 1.0 } else { 0.0 };
        let backgammon = if result == GameResult::Backgammon { 1.0 } else { 0.0 };
        if winner == 0 {
            p[OUTPUT_WIN] = 1.0;
            p[OUTPUT_WINGAMMON] = gammon;
            p[OUTPUT_WINBACKGAMMON] = backgammon;
        } else {
            p[OUTPUT_LOSEGAMMON] = gammon;
            p[OUTPUT_LOSEBACKGAMMON] = backgammon;
        }
    }
    p
}

/// Pip-count evaluator: race odds from the pip difference, gammon odds from
/// how far the losing side is from bearing off its first chequer.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEvaluator;

fn logistic(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Side 0 bears off everything with any roll.
fn finishes_next_roll(board: &Board) -> bool {
    let me = board.side(0);
    match board.chequers(0) {
        0 => true,
        1 => me[3..].iter().all(|&c| c == 0),
        2 => me[0] == 2 || (me[0] == 1 && me[1] == 1),
        _ => false,
    }
}

/// Pips `side` must travel before it can bear off a chequer.
fn pips_to_save_gammon(board: &Board, side: usize) -> u32 {
    let s = board.side(side);
    let outside: u32 = (6..=BAR).map(|i| (i as u32 - 5) * s[i] as u32).sum();
    outside + 1
}

/// Conditional chance that a win by `winner` is a gammon.
fn gammon_share(board: &Board, winner: usize, pips: [u32; 2]) -> f32 {
    let loser = 1 - winner;
    let need = pips_to_save_gammon(board, loser) as f32;
    let race = pips[winner] as f32;
    let tempo = if winner == 0 { 4.0 } else { -4.0 };
    logistic(1.2 * (need - race + tempo) / (need + race + 1.0).sqrt())
}

/// Loser still has chequers in the winner's home board or on the bar.
fn backgammon_exposed(board: &Board, loser: usize) -> bool {
    board.side(loser)[18..].iter().any(|&c| c > 0)
}

impl Evaluator for HeuristicEvaluator {
    fn evaluate(
        &self,
        board: &Board,
        ci: &CubeInfo,
        _ec: &EvalContext,
    ) -> Result<Probs, EvalError> {
        let variant = ci.variant;
        let class = classify_position(board, variant);
        if class == PositionClass::Over {
            return Ok(terminal_probs(board, variant));
        }
        let full = variant.chequers();
        let pips = board.pip_count();

        let mut p = [0.0f32; 5];
        if finishes_next_roll(board) {
            p[OUTPUT_WIN] = 1.0;
            if board.chequers(1) == full {
                p[OUTPUT_WINGAMMON] = 1.0;
                if backgammon_exposed(board, 1) {
                    p[OUTPUT_WINBACKGAMMON] = 1.0;
                }
            }
            return Ok(p);
        }

        let k = if class == PositionClass::Contact { 0.9 } else { 1.43 };
        let (p0, p1) = (pips[0] as f32, pips[1] as f32);
        let win = logistic(k * (p1 - p0 + 4.0) / (p0 + p1).max(1.0).sqrt());
        p[OUTPUT_WIN] = win;

        if board.chequers(1) == full {
            p[OUTPUT_WINGAMMON] = win * gammon_share(board, 0, pips);
            if backgammon_exposed(board, 1) {
                p[OUTPUT_WINBACKGAMMON] = 0.2 * p[OUTPUT_WINGAMMON];
            }
        }
        if board.chequers(0) == full {
            p[OUTPUT_LOSEGAMMON] = (1.0 - win) * gammon_share(board, 1, pips);
            if backgammon_exposed(board, 0) {
                p[OUTPUT_LOSEBACKGAMMON] = 0.2 * p[OUTPUT_LOSEGAMMON];
            }
        }
        Ok(p)
    }
}

use bg_eval::EvalError;
use bg_logging::NdjsonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("invalid rollout configuration: {0}")]
    InvalidConfig(String),
    #[error("cube is not available to the player on roll")]
    CubeUnavailable,
    #[error("evaluation failed after {trials_completed} trials: {source}")]
    Eval {
        source: EvalError,
        trials_completed: u32,
    },
    #[error("no trials completed")]
    NoTrialsCompleted,
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to write rollout events: {0}")]
    Events(#[from] NdjsonError),
}

//! Runs batches of independent trial jobs, inline or on a rayon pool.

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::error::RolloutError;

/// Default trials between progress reports.
pub const DEFAULT_CHECKPOINT_EVERY: u32 = 36;

pub struct TrialExecutor {
    pool: Option<ThreadPool>,
    checkpoint_every: u32,
}

impl Default for TrialExecutor {
    fn default() -> Self {
        Self::inline(DEFAULT_CHECKPOINT_EVERY)
    }
}

impl TrialExecutor {
    /// Run every job on the calling thread.
    pub fn inline(checkpoint_every: u32) -> Self {
        Self {
            pool: None,
            checkpoint_every: checkpoint_every.max(1),
        }
    }

    /// `threads <= 1` runs inline.
    pub fn new(threads: u32, checkpoint_every: u32) -> Result<Self, RolloutError> {
        if threads <= 1 {
            return Ok(Self::inline(checkpoint_every));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads as usize)
            .thread_name(|i| format!("bg-rollout-{i}"))
            .build()?;
        Ok(Self {
            pool: Some(pool),
            checkpoint_every: checkpoint_every.max(1),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.as_ref().map_or(1, ThreadPool::current_num_threads)
    }

    pub fn checkpoint_every(&self) -> u32 {
        self.checkpoint_every
    }

    /// Trials handed out per batch. Inline execution folds after every trial.
    pub fn batch_trials(&self) -> u32 {
        if self.pool.is_some() {
            self.checkpoint_every
        } else {
            1
        }
    }

    /// Apply `f` to every job; results come back in job order.
    pub fn run<J, R, F>(&self, jobs: &[J], f: F) -> Vec<R>
    where
        J: Sync,
        R: Send,
        F: Fn(&J) -> R + Sync + Send,
    {
        match &self.pool {
            None => jobs.iter().map(f).collect(),
            Some(pool) => pool.install(|| jobs.par_iter().map(f).collect()),
        }
    }
}

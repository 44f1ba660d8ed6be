//! Evaluation contexts and move filters.

use bg_core::config::{EvalSettings, MoveFilterConfig};
use serde::{Deserialize, Serialize};

/// How deep and how to evaluate a position.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct EvalContext {
    /// Lookahead depth; 0 is a static evaluation.
    pub plies: u32,
    pub cubeful: bool,
    /// Noise derived from the position instead of a random source.
    pub deterministic: bool,
    /// Standard deviation of noise added to static evaluations.
    pub noise: f32,
}

impl EvalContext {
    pub const fn zero_ply(cubeful: bool) -> Self {
        Self {
            plies: 0,
            cubeful,
            deterministic: true,
            noise: 0.0,
        }
    }

    pub fn with_plies(self, plies: u32) -> Self {
        Self { plies, ..self }
    }

    pub fn with_cubeful(self, cubeful: bool) -> Self {
        Self { cubeful, ..self }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::zero_ply(true)
    }
}

impl From<&EvalSettings> for EvalContext {
    fn from(s: &EvalSettings) -> Self {
        Self {
            plies: s.plies,
            cubeful: s.cubeful,
            deterministic: s.deterministic,
            noise: s.noise,
        }
    }
}

/// Candidate pruning between the 0-ply pass and a deeper re-evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MoveFilter {
    pub accept: u32,
    pub threshold: f32,
}

impl Default for MoveFilter {
    fn default() -> Self {
        Self {
            accept: 8,
            threshold: 0.16,
        }
    }
}

impl From<&MoveFilterConfig> for MoveFilter {
    fn from(c: &MoveFilterConfig) -> Self {
        Self {
            accept: c.accept,
            threshold: c.threshold,
        }
    }
}

//! bg-logging: NDJSON rollout events and run manifests.
//!
//! Append-only event logs let a long rollout be inspected while it runs and
//! post-mortem after an interrupt.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Event schema version written into every event.
pub const EVENT_SCHEMA_VERSION: u32 = 1;

/// Run manifest schema version.
pub const RUN_MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutManifestV1 {
    pub run_manifest_version: u32,

    pub run_id: String,
    pub created_ts_ms: u64,
    pub finished_ts_ms: Option<u64>,

    // Reproducibility.
    pub config_hash: Option<String>,
    pub seed: u64,
    pub rng: String,
    pub quasi_random_dice: bool,

    // Progress.
    pub trials_requested: u32,
    pub trials_completed: u32,
    pub interrupted: bool,

    pub alternatives: Vec<String>,
    pub events_path: Option<String>,
}

pub fn now_ms() -> u64 {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    d.as_millis() as u64
}

pub fn hash_config_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

pub fn read_manifest(path: impl AsRef<Path>) -> Result<RolloutManifestV1, NdjsonError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice::<RolloutManifestV1>(&bytes)?)
}

pub fn write_manifest_atomic(
    path: impl AsRef<Path>,
    m: &RolloutManifestV1,
) -> Result<(), NdjsonError> {
    let path = path.as_ref();
    let tmp = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(m)?;
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Versioning fields carried by every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfoV1 {
    pub event_schema_version: u32,
    pub engine_version: String,
}

impl VersionInfoV1 {
    pub fn current() -> Self {
        Self {
            event_schema_version: EVENT_SCHEMA_VERSION,
            engine_version: VERSION.to_string(),
        }
    }
}

/// Running statistics of one alternative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeSummaryV1 {
    pub index: u32,
    pub label: String,
    pub games_done: u32,
    pub no_more: bool,
    pub mean: [f32; 7],
    pub std_error: [f32; 7],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutProgressEventV1 {
    pub event: String,
    pub ts_ms: u64,
    pub v: VersionInfoV1,

    pub run_id: String,
    /// Trials fully folded for every active alternative.
    pub trial: u32,
    pub trials: u32,

    pub alternatives: Vec<AlternativeSummaryV1>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanityWarningEventV1 {
    pub event: String,
    pub ts_ms: u64,
    pub v: VersionInfoV1,

    pub run_id: String,
    pub alternative: u32,
    pub trial: u32,
    pub before: [f32; 7],
    pub after: [f32; 7],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutResultEventV1 {
    pub event: String,
    pub ts_ms: u64,
    pub v: VersionInfoV1,

    pub run_id: String,
    pub trials_completed: u32,
    pub interrupted: bool,
    pub elapsed_ms: u64,

    pub alternatives: Vec<AlternativeSummaryV1>,
}

#[derive(Debug, Error)]
pub enum NdjsonError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Append-only NDJSON writer.
///
/// Contract: each call writes exactly one JSON object followed by a newline.
pub struct NdjsonWriter {
    w: BufWriter<File>,
    lines_since_flush: u64,
    flush_every_lines: u64,
}

impl NdjsonWriter {
    /// Open a file for append. Creates it if it doesn't exist.
    pub fn open_append(path: impl AsRef<Path>) -> Result<Self, NdjsonError> {
        Self::open_append_with_flush(path, 0)
    }

    /// `flush_every_lines=0` flushes after every event.
    pub fn open_append_with_flush(
        path: impl AsRef<Path>,
        flush_every_lines: u64,
    ) -> Result<Self, NdjsonError> {
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            w: BufWriter::new(f),
            lines_since_flush: 0,
            flush_every_lines,
        })
    }

    pub fn write_event<T: Serialize>(&mut self, event: &T) -> Result<(), NdjsonError> {
        let mut buf = serde_json::to_vec(event)?;
        buf.push(b'\n');
        self.w.write_all(&buf)?;
        self.lines_since_flush += 1;
        if self.flush_every_lines == 0 || self.lines_since_flush >= self.flush_every_lines {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), NdjsonError> {
        self.w.flush()?;
        self.lines_since_flush = 0;
        Ok(())
    }
}

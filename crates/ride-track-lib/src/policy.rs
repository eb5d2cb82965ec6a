//! Inline vs deferred execution, chosen once per upload from its size

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the pipeline of one upload runs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// On the calling path; the caller sees a terminal status
    Inline,
    /// On the bounded worker pool; the caller sees PROCESSING
    Deferred,
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingMode::Inline => f.write_str("inline"),
            ProcessingMode::Deferred => f.write_str("deferred"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeReason {
    BelowThreshold,
    AtOrAboveThreshold,
}

/// Outcome of [`ModePolicy::decide`], recorded as a metrics event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeDecision {
    pub mode: ProcessingMode,
    pub reason: ModeReason,
    pub file_size_bytes: u64,
    pub threshold_bytes: u64,
}

/// Size-based mode selection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModePolicy {
    /// Uploads of at least this many bytes are deferred. Default: 1 MiB
    pub async_threshold_bytes: u64,
}

impl Default for ModePolicy {
    fn default() -> Self {
        Self::new(1024 * 1024)
    }
}

impl ModePolicy {
    pub fn new(async_threshold_bytes: u64) -> Self {
        Self {
            async_threshold_bytes,
        }
    }

    pub fn decide(&self, file_size_bytes: u64) -> ModeDecision {
        let (mode, reason) = if file_size_bytes >= self.async_threshold_bytes {
            (ProcessingMode::Deferred, ModeReason::AtOrAboveThreshold)
        } else {
            (ProcessingMode::Inline, ModeReason::BelowThreshold)
        };
        ModeDecision {
            mode,
            reason,
            file_size_bytes,
            threshold_bytes: self.async_threshold_bytes,
        }
    }
}

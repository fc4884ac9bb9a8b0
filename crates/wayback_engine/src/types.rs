use std::time::Duration;

use thiserror::Error;
use wayback_core::{BatchViewModel, FailureReason, Outcome, TargetIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Downloading,
    Writing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    pub index: TargetIndex,
    pub stage: Stage,
    pub bytes: Option<u64>,
}

/// Everything the engine reports while a batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Started {
        index: TargetIndex,
        url: String,
        filename: String,
    },
    Resolved {
        index: TargetIndex,
        location: String,
    },
    Retrying {
        index: TargetIndex,
        stage: Stage,
        /// 1-based number of the attempt about to start.
        attempt: u32,
        delay: Duration,
        kind: FailureReason,
    },
    Progress(JobProgress),
    Completed {
        index: TargetIndex,
        url: String,
        outcome: Outcome,
        progress: BatchViewModel,
    },
}

/// Where the archived copy of a target can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub url: String,
    /// Snapshot timestamp (`YYYYMMDDhhmmss`) when the archive reported one.
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub path: std::path::PathBuf,
    pub bytes_written: u64,
    pub attempts: u32,
    pub final_url: String,
    pub content_type: Option<String>,
}

/// Failure of a single resolve or fetch step, tagged for retry decisions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureReason,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureReason, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub type ResolveResult = Result<ResolvedLocation, FetchError>;
pub type FetchResult = Result<FetchOutput, FetchError>;

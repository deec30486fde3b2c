//! Error types shared by the library and the binaries.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CnxError>;

/// Failures that abort an operation. Per-attempt outcomes (no candidate,
/// category collision, retry exhaustion) are not errors and never show up here.
#[derive(Error, Debug)]
pub enum CnxError {
    /// The corpus could not be loaded at all; a batch must not start.
    #[error("corpus unavailable at {path}: {reason}")]
    CorpusUnavailable { path: PathBuf, reason: String },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("malformed report at line {line}: {message}")]
    MalformedReport { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

impl CnxError {
    pub fn corpus_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorpusUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn malformed_report(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedReport {
            line,
            message: message.into(),
        }
    }

    /// True when the whole batch has to stop before running any attempt.
    pub fn is_fatal_to_batch(&self) -> bool {
        matches!(self, Self::CorpusUnavailable { .. } | Self::InvalidConfig { .. })
    }
}

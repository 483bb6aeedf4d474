use std::path::PathBuf;

use chrono::Duration;

use crate::elapsed::ElapsedTime;

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("corrupt ledger data: {detail}")]
    CorruptData {
        detail: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("ledger not found at {}", .0.display())]
    StorageNotFound(PathBuf),

    #[error("invalid session: {0}")]
    InvalidSession(String),

    #[error("invalid duration: {0} is negative")]
    InvalidDuration(Duration),

    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl TrackError {
    pub fn corrupt(detail: impl Into<String>) -> Self {
        TrackError::CorruptData {
            detail: detail.into(),
            source: None,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrackError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure from `Session::finish`. Carries the elapsed split when it could be
/// computed so the caller can still report it.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct FinishError {
    pub elapsed: Option<ElapsedTime>,
    #[source]
    pub source: TrackError,
}

impl From<TrackError> for FinishError {
    fn from(source: TrackError) -> Self {
        FinishError {
            elapsed: None,
            source,
        }
    }
}

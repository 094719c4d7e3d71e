//! Error taxonomy.
//!
//! Setup failures ([`ConfigError`]) abort a run before any pair is touched.
//! Per-pair failures ([`SyncError`]) are recorded in that pair's report and
//! the run moves on to the next pair. A conflict is not an error at all; it
//! is a [`PairOutcome`](crate::synchronise::PairOutcome).

use std::path::PathBuf;

/// Boxed error returned by remote collaborators, as in the upload contract.
pub type RemoteError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {name} is not set")]
    MissingVar { name: &'static str },
    #[error("environment variable {name} is empty")]
    EmptyVar { name: &'static str },
    #[error("invalid value for {name}: {reason}")]
    InvalidVar { name: &'static str, reason: String },
    #[error("could not build HTTP client: {0}")]
    Client(#[source] RemoteError),
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote error: {0}")]
    Remote(#[source] RemoteError),
    #[error("failed to read {}: {source}", path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    pub fn read_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::ReadFailure {
            path: path.into(),
            source,
        }
    }
}

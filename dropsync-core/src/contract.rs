#![allow(unused)]

//! # contract: collaborator interfaces around the sync engine
//!
//! The decision engine only needs answers to a few questions: what does the
//! remote side hold, what does the local side hold, may we transfer, and how
//! is a transfer carried out. Each question is a trait here so the engine can
//! be driven by the real HTTP client and filesystem, or by mocks in tests.
//!
//! ## Interface & Extensibility
//! - Remote traits ([`RemoteMetadataReader`], [`TransferExecutor`]) are async
//!   and return the boxed [`RemoteError`].
//! - Local traits ([`LocalFileProbe`], [`ConfirmationGate`], [`Notifier`])
//!   are synchronous: they wrap plain disk reads and a terminal.
//!
//! ## Mocking & Testing
//! - Every trait except [`Notifier`] is annotated for `mockall`. Mocks are
//!   exported under the default `test-export-mocks` feature so integration
//!   tests and dependent crates can use them.

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mockall::{automock, predicate::*};

use crate::error::RemoteError;
use crate::fingerprint::FileFingerprint;
use crate::synchronise::PairReport;
use crate::timestamp::FileTimestamp;

/// Snapshot of one remote object, fetched fresh for every pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub exists: bool,
    pub fingerprint: Option<FileFingerprint>,
    /// Client-side modification time stored with the object. Zero when absent.
    pub modified_at: FileTimestamp,
}

impl RemoteMetadata {
    pub fn absent() -> Self {
        RemoteMetadata {
            exists: false,
            fingerprint: None,
            modified_at: FileTimestamp::default(),
        }
    }

    pub fn file(fingerprint: FileFingerprint, modified_at: FileTimestamp) -> Self {
        RemoteMetadata {
            exists: true,
            fingerprint: Some(fingerprint),
            modified_at,
        }
    }
}

/// Result of probing a local path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalState {
    pub exists: bool,
    pub modified_at: FileTimestamp,
    pub size: u64,
}

impl LocalState {
    pub fn missing() -> Self {
        LocalState {
            exists: false,
            modified_at: FileTimestamp::default(),
            size: 0,
        }
    }
}

/// One (local path, remote path) association, taken verbatim from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPair {
    pub local: PathBuf,
    pub remote: String,
}

impl SyncPair {
    pub fn new(local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        SyncPair {
            local: local.into(),
            remote: remote.into(),
        }
    }
}

/// Reads metadata of remote objects.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteMetadataReader: Send + Sync {
    /// Fetch the current metadata for `remote_path`.
    ///
    /// A missing object is `Ok(RemoteMetadata::absent())`, never an error.
    async fn get(&self, remote_path: &str) -> Result<RemoteMetadata, RemoteError>;
}

/// Moves file content between the local filesystem and the remote store.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    /// Upload `local_path` to `remote_path`, overwriting it, and record
    /// `client_modified` as the remote object's modification time.
    async fn upload(
        &self,
        local_path: &Path,
        remote_path: &str,
        client_modified: FileTimestamp,
    ) -> Result<(), RemoteError>;

    /// Download `remote_path` into `local_path`, overwriting it.
    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<(), RemoteError>;
}

/// Inspects and opens local files.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait LocalFileProbe: Send + Sync {
    /// A path that does not exist yields [`LocalState::missing`].
    fn stat(&self, local_path: &Path) -> std::io::Result<LocalState>;

    fn open(&self, local_path: &Path) -> std::io::Result<Box<dyn Read + Send>>;
}

/// Yes/no decision point in front of every transfer.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ConfirmationGate: Send + Sync {
    fn ask(&self, prompt: &str, default: bool) -> bool;
}

/// Receives the user-visible outcome of each pair.
pub trait Notifier: Send + Sync {
    fn notify(&self, report: &PairReport);
}

//! Sync direction for a single pair.
//!
//! Rules, first match wins:
//! 1. local missing → download
//! 2. remote missing → upload
//! 3. equal fingerprints → nothing
//! 4. older side is overwritten by the newer side
//!
//! Equal modification times with different content is reported as
//! [`Reason::Conflict`] and nothing is transferred.

use std::fmt;
use std::io;

use crate::contract::{LocalState, RemoteMetadata};
use crate::fingerprint::FileFingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    None,
    Upload,
    Download,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    LocalMissing,
    RemoteMissing,
    Unchanged,
    RemoteNewer,
    LocalNewer,
    Conflict,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Reason::LocalMissing => "local missing",
            Reason::RemoteMissing => "remote missing",
            Reason::Unchanged => "unchanged",
            Reason::RemoteNewer => "remote newer",
            Reason::LocalNewer => "local newer",
            Reason::Conflict => "conflict",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: SyncAction,
    pub reason: Reason,
    /// Local fingerprint, when rule 3 had to compute it.
    pub local_fingerprint: Option<FileFingerprint>,
}

impl Decision {
    fn new(action: SyncAction, reason: Reason) -> Self {
        Decision {
            action,
            reason,
            local_fingerprint: None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.reason == Reason::Conflict
    }
}

/// Decides what to do with one pair.
///
/// `local_fingerprint` is only invoked when both sides exist, so a missing
/// file on either side is never read. Its error is the only failure mode.
pub fn decide<F>(
    local: &LocalState,
    remote: &RemoteMetadata,
    local_fingerprint: F,
) -> io::Result<Decision>
where
    F: FnOnce() -> io::Result<FileFingerprint>,
{
    if !local.exists {
        return Ok(Decision::new(SyncAction::Download, Reason::LocalMissing));
    }

    let remote_fingerprint = match &remote.fingerprint {
        Some(fingerprint) if remote.exists => fingerprint,
        _ => return Ok(Decision::new(SyncAction::Upload, Reason::RemoteMissing)),
    };

    let fingerprint = local_fingerprint()?;
    tracing::debug!(
        local = %fingerprint,
        remote = %remote_fingerprint,
        "Comparing content fingerprints"
    );

    let (action, reason) = if &fingerprint == remote_fingerprint {
        (SyncAction::None, Reason::Unchanged)
    } else if local.modified_at < remote.modified_at {
        (SyncAction::Download, Reason::RemoteNewer)
    } else if remote.modified_at < local.modified_at {
        (SyncAction::Upload, Reason::LocalNewer)
    } else {
        (SyncAction::None, Reason::Conflict)
    };

    Ok(Decision {
        action,
        reason,
        local_fingerprint: Some(fingerprint),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint_bytes;
    use crate::timestamp::FileTimestamp;

    fn local(mtime: i64) -> LocalState {
        LocalState {
            exists: true,
            modified_at: FileTimestamp::from_epoch_seconds(mtime),
            size: 1,
        }
    }

    fn remote(content: &[u8], mtime: i64) -> RemoteMetadata {
        RemoteMetadata::file(
            fingerprint_bytes(content),
            FileTimestamp::from_epoch_seconds(mtime),
        )
    }

    fn hashing(content: &'static [u8]) -> impl FnOnce() -> io::Result<FileFingerprint> {
        move || Ok(fingerprint_bytes(content))
    }

    fn never_hashed() -> io::Result<FileFingerprint> {
        panic!("local file must not be hashed for this decision")
    }

    #[test]
    fn local_missing_downloads_without_hashing() {
        let d = decide(&LocalState::missing(), &remote(b"A", 100), never_hashed).unwrap();
        assert_eq!(d.action, SyncAction::Download);
        assert_eq!(d.reason.to_string(), "local missing");
    }

    #[test]
    fn local_missing_wins_even_when_remote_is_absent() {
        let d = decide(&LocalState::missing(), &RemoteMetadata::absent(), never_hashed).unwrap();
        assert_eq!(d.action, SyncAction::Download);
        assert_eq!(d.reason, Reason::LocalMissing);
    }

    #[test]
    fn remote_missing_uploads_without_hashing() {
        let d = decide(&local(100), &RemoteMetadata::absent(), never_hashed).unwrap();
        assert_eq!(d.action, SyncAction::Upload);
        assert_eq!(d.reason.to_string(), "remote missing");
    }

    #[test]
    fn remote_without_fingerprint_counts_as_missing() {
        let meta = RemoteMetadata {
            exists: true,
            fingerprint: None,
            modified_at: FileTimestamp::from_epoch_seconds(5),
        };
        let d = decide(&local(100), &meta, never_hashed).unwrap();
        assert_eq!(d.reason, Reason::RemoteMissing);
    }

    #[test]
    fn equal_content_is_unchanged_whatever_the_mtimes() {
        for remote_mtime in [50, 100, 500] {
            let d = decide(&local(100), &remote(b"A", remote_mtime), hashing(b"A")).unwrap();
            assert_eq!(d.action, SyncAction::None);
            assert_eq!(d.reason, Reason::Unchanged);
            assert_eq!(d.local_fingerprint, Some(fingerprint_bytes(b"A")));
        }
    }

    #[test]
    fn newer_remote_downloads() {
        let d = decide(&local(100), &remote(b"B", 200), hashing(b"A")).unwrap();
        assert_eq!(d.action, SyncAction::Download);
        assert_eq!(d.reason.to_string(), "remote newer");
    }

    #[test]
    fn newer_local_uploads() {
        let d = decide(&local(300), &remote(b"A", 200), hashing(b"B")).unwrap();
        assert_eq!(d.action, SyncAction::Upload);
        assert_eq!(d.reason.to_string(), "local newer");
    }

    #[test]
    fn equal_mtimes_with_different_content_is_a_conflict() {
        let d = decide(&local(200), &remote(b"A", 200), hashing(b"B")).unwrap();
        assert_eq!(d.action, SyncAction::None);
        assert_eq!(d.reason, Reason::Conflict);
        assert!(d.is_conflict());
    }

    #[test]
    fn read_failure_propagates() {
        let err = decide(&local(1), &remote(b"A", 1), || {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        })
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }
}

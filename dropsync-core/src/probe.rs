//! Filesystem-backed [`LocalFileProbe`] and the non-interactive
//! [`ConfirmationGate`].

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::contract::{ConfirmationGate, LocalFileProbe, LocalState};
use crate::timestamp::FileTimestamp;

/// Reads local files straight from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl LocalFileProbe for FsProbe {
    fn stat(&self, local_path: &Path) -> io::Result<LocalState> {
        let metadata = match fs::metadata(local_path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %local_path.display(), "Local file does not exist");
                return Ok(LocalState::missing());
            }
            Err(e) => return Err(e),
        };

        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", local_path.display()),
            ));
        }

        Ok(LocalState {
            exists: true,
            modified_at: FileTimestamp::from_system_time(metadata.modified()?),
            size: metadata.len(),
        })
    }

    fn open(&self, local_path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(BufReader::new(File::open(local_path)?)))
    }
}

/// Answers every prompt with a fixed value, for headless runs.
#[derive(Debug, Clone, Copy)]
pub struct BatchGate {
    answer: Option<bool>,
}

impl BatchGate {
    /// Always answers `answer`.
    pub fn always(answer: bool) -> Self {
        BatchGate {
            answer: Some(answer),
        }
    }

    /// Answers with whatever default the prompt offers.
    pub fn defaults() -> Self {
        BatchGate { answer: None }
    }
}

impl ConfirmationGate for BatchGate {
    fn ask(&self, prompt: &str, default: bool) -> bool {
        let answer = self.answer.unwrap_or(default);
        tracing::debug!(prompt, answer, "Batch confirmation");
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempdir().unwrap();
        let state = FsProbe.stat(&dir.path().join("nope.txt")).unwrap();
        assert_eq!(state, LocalState::missing());
    }

    #[test]
    fn stat_reports_size_and_whole_second_mtime() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"hello").unwrap();
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_millis(1_700_000_000_750);
        file.set_modified(mtime).unwrap();
        drop(file);

        let state = FsProbe.stat(&path).unwrap();
        assert!(state.exists);
        assert_eq!(state.size, 5);
        assert_eq!(state.modified_at.epoch_seconds(), 1_700_000_000);
    }

    #[test]
    fn directories_are_rejected() {
        let dir = tempdir().unwrap();
        let err = FsProbe.stat(dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn open_streams_file_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("b.txt");
        fs::write(&path, b"content").unwrap();

        let mut buf = String::new();
        FsProbe.open(&path).unwrap().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "content");
    }

    #[test]
    fn batch_gate_answers() {
        assert!(BatchGate::always(true).ask("go?", false));
        assert!(!BatchGate::always(false).ask("go?", true));
        assert!(BatchGate::defaults().ask("go?", true));
        assert!(!BatchGate::defaults().ask("go?", false));
    }
}

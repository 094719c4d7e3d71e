//! # fingerprint: block-hash content fingerprints
//!
//! The remote store summarises every file with a two-level SHA-256 hash:
//! the file is cut into 4 MiB blocks, each block is hashed, and the raw
//! block digests are concatenated and hashed once more. The result is
//! rendered as 64 lowercase hex characters.
//!
//! [`BlockHasher`] reproduces that scheme incrementally so a file is never
//! held in memory beyond a single block's hashing state, and so the output
//! does not depend on how the caller chunks its reads.

use std::fmt;
use std::io::{self, Read};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Size of one hashing block: 4 MiB.
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Read buffer used by [`fingerprint`]. Block boundaries are tracked
/// independently of read sizes.
const READ_BUFFER: usize = 64 * 1024;

/// A 64-character lowercase hex content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileFingerprint(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid content fingerprint {0:?}: expected 64 lowercase hex characters")]
pub struct InvalidFingerprint(pub String);

impl FileFingerprint {
    /// Parses a fingerprint as reported by the remote store.
    pub fn parse(raw: &str) -> Result<Self, InvalidFingerprint> {
        let valid = raw.len() == 64
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(FileFingerprint(raw.to_owned()))
        } else {
            Err(InvalidFingerprint(raw.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FileFingerprint {
    type Error = InvalidFingerprint;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        FileFingerprint::parse(&raw)
    }
}

impl From<FileFingerprint> for String {
    fn from(fingerprint: FileFingerprint) -> Self {
        fingerprint.0
    }
}

/// Incremental block hasher.
///
/// Feed bytes with [`update`](BlockHasher::update) in any chunking, then call
/// [`finalize`](BlockHasher::finalize). Block digests are fed straight into
/// the outer hash instead of being buffered, which yields the same digest as
/// hashing their concatenation.
#[derive(Clone, Default)]
pub struct BlockHasher {
    block: Sha256,
    block_len: usize,
    overall: Sha256,
    blocks: u64,
}

impl BlockHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let room = BLOCK_SIZE - self.block_len;
            let take = room.min(data.len());
            self.block.update(&data[..take]);
            self.block_len += take;
            data = &data[take..];

            if self.block_len == BLOCK_SIZE {
                self.finish_block();
            }
        }
    }

    fn finish_block(&mut self) {
        let digest = std::mem::take(&mut self.block).finalize();
        self.overall.update(digest);
        self.block_len = 0;
        self.blocks += 1;
    }

    /// Consumes the hasher. A trailing short block is hashed as-is.
    pub fn finalize(mut self) -> FileFingerprint {
        if self.block_len > 0 {
            self.finish_block();
        }
        tracing::trace!(blocks = self.blocks, "Finalising block hash");
        FileFingerprint(hex::encode(self.overall.finalize()))
    }
}

/// Streams `reader` to the end and returns its fingerprint.
pub fn fingerprint<R: Read>(mut reader: R) -> io::Result<FileFingerprint> {
    let mut hasher = BlockHasher::new();
    let mut buffer = vec![0u8; READ_BUFFER];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize())
}

/// Fingerprint of a byte slice already in memory.
pub fn fingerprint_bytes(data: &[u8]) -> FileFingerprint {
    let mut hasher = BlockHasher::new();
    hasher.update(data);
    hasher.finalize()
}

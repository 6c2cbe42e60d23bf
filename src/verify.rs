//! SHA-256 verification of downloaded archives.

use log::debug;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

use crate::runtime::Runtime;

/// Outcome of checking a file against an expected digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified,
    /// The file was read completely but hashed to something else.
    Mismatch { actual: String },
    /// The file could not be opened or read.
    Unreadable { reason: String },
}

impl Verification {
    /// Boolean view: anything other than a match counts as a failed check.
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified)
    }
}

/// Normalise a `.sha256` body into the digest to compare against.
///
/// Accepts a bare digest or `sha256sum` output (`<hex>  <file>`).
pub fn expected_digest(body: &str) -> &str {
    body.split_whitespace().next().unwrap_or("")
}

/// Hash `path` and compare the lowercase hex digest with `expected`.
///
/// The comparison is case-sensitive. I/O failures are reported as
/// [`Verification::Unreadable`], never as an error.
#[tracing::instrument(skip(runtime))]
pub fn verify<R: Runtime>(runtime: &R, path: &Path, expected: &str) -> Verification {
    let actual = match file_digest(runtime, path) {
        Ok(digest) => digest,
        Err(e) => {
            debug!("Cannot hash {:?}: {:#}", path, e);
            return Verification::Unreadable {
                reason: format!("{:#}", e),
            };
        }
    };

    if actual == expected {
        Verification::Verified
    } else {
        Verification::Mismatch { actual }
    }
}

/// Lowercase hex SHA-256 of a file, read in chunks.
pub fn file_digest<R: Runtime>(runtime: &R, path: &Path) -> anyhow::Result<String> {
    let mut reader = runtime.open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

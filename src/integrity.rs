//! Evidence file fingerprinting.
//!
//! A database under examination must be byte-for-byte unchanged after it has
//! been queried. These helpers hash the file before and after a run so the
//! caller can prove it.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use tracing::debug;

use crate::error::{Result, WardenError};

const CHUNK_SIZE: usize = 8192;

/// Returns the lowercase hex SHA-256 digest of the file at `path`.
///
/// The file is streamed in fixed-size chunks, so large images are never
/// loaded into memory at once.
pub fn fingerprint(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| {
        WardenError::integrity(format!("Cannot open {} for hashing: {e}", path.display()))
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(WardenError::integrity(format!(
                    "Failed reading {}: {e}",
                    path.display()
                )))
            }
        };
        hasher.update(&buffer[..read]);
    }

    let digest = format!("{:x}", hasher.finalize());
    debug!("SHA-256 of {}: {}", path.display(), digest);
    Ok(digest)
}

/// Re-hashes the file and fails if it no longer matches `before`.
pub fn verify_unchanged(before: &str, path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let after = fingerprint(path)?;
    if !after.eq_ignore_ascii_case(before) {
        return Err(WardenError::integrity(format!(
            "{} changed during the run: {before} before, {after} after",
            path.display()
        )));
    }
    Ok(after)
}

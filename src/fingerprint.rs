//! Content fingerprinting.
//!
//! A fingerprint is the hex SHA-256 of a note's raw bytes. Identical
//! content always yields the same fingerprint; any edit changes it.
//! Hashing streams through a fixed-size buffer so arbitrarily large notes
//! never need to be resident in memory.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::SyncError;

/// Read buffer size for streaming fingerprints.
const HASH_BUF_SIZE: usize = 8 * 1024;

/// Fingerprint all bytes from a reader.
///
/// Consumes the reader to EOF. An I/O failure mid-stream propagates —
/// a partially hashed note must never be classified.
pub fn fingerprint_reader<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_BUF_SIZE];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Fingerprint a note file by streaming its content.
///
/// Any failure to open or fully read the file is reported as
/// [`SyncError::UnreadableSource`] for that note.
pub fn fingerprint_file(path: &Path) -> Result<String, SyncError> {
    let identity = path.to_string_lossy().to_string();
    let file = File::open(path).map_err(|e| SyncError::unreadable(&identity, e))?;
    fingerprint_reader(file).map_err(|e| SyncError::unreadable(identity, e))
}

/// Fingerprint in-memory content.
pub fn fingerprint_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

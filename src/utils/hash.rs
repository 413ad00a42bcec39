//! Hash calculation utilities.
//!
//! Digests here are content identifiers for signature lookup, not integrity
//! guarantees.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Chunk size fed to the hashers (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Hash results for a piece of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHashes {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
    /// Content size in bytes
    pub size: u64,
}

/// Hash calculator for in-memory content.
pub struct HashCalculator;

impl HashCalculator {
    /// Calculate all three digests of an in-memory buffer in a single pass.
    pub fn digest_bytes(data: &[u8]) -> FileHashes {
        let mut md5 = Md5::new();
        let mut sha1 = Sha1::new();
        let mut sha256 = Sha256::new();

        for chunk in data.chunks(BUFFER_SIZE) {
            md5.update(chunk);
            sha1.update(chunk);
            sha256.update(chunk);
        }

        FileHashes {
            md5: hex::encode(md5.finalize()),
            sha1: hex::encode(sha1.finalize()),
            sha256: hex::encode(sha256.finalize()),
            size: data.len() as u64,
        }
    }

    /// Calculate SHA256 hash of bytes.
    pub fn sha256_bytes(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    /// Calculate SHA1 hash of bytes.
    pub fn sha1_bytes(data: &[u8]) -> String {
        hex::encode(Sha1::digest(data))
    }

    /// Calculate MD5 hash of bytes.
    pub fn md5_bytes(data: &[u8]) -> String {
        hex::encode(Md5::digest(data))
    }
}

/*!
 * Content hashing for fingerprinted file names
 */

use sha2::{Digest, Sha256};
use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

/// Number of hex characters embedded in a hashed file name
pub const HASH_LEN: usize = 16;

/// Hash function used to fingerprint asset content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    /// SHA-256, truncated to `HASH_LEN` hex characters
    #[default]
    Sha256,
    /// XXH3-64, non-cryptographic and much faster
    Xxh3,
}

impl HashAlgorithm {
    /// Pick the algorithm from the `quick_hash` switch
    pub fn from_quick(quick: bool) -> Self {
        if quick {
            HashAlgorithm::Xxh3
        } else {
            HashAlgorithm::Sha256
        }
    }

    /// Fingerprint a byte slice as `HASH_LEN` lowercase hex characters
    pub fn fingerprint(&self, data: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha256 => {
                let digest = Sha256::digest(data);
                let mut hex = hex::encode(digest);
                hex.truncate(HASH_LEN);
                hex
            }
            HashAlgorithm::Xxh3 => format!("{:016x}", xxh3_64(data)),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha256 => write!(f, "sha256"),
            HashAlgorithm::Xxh3 => write!(f, "xxh3"),
        }
    }
}

//! Content checksums for change detection.
//!
//! The checksum of a [`Config`] is the SHA-256 of its serialized YAML, so any
//! change that reaches the artifact also changes the checksum, and an
//! unchanged configuration always hashes the same.

use sha2::{Digest, Sha256};

use crate::error::Result;

use super::server::Config;

/// Hasher for computing content checksums.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the hex-encoded SHA-256 of raw bytes.
    #[must_use]
    pub fn checksum(&self, data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    /// Computes the checksum of a configuration's serialized form.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized.
    pub fn hash_config(&self, config: &Config) -> Result<String> {
        let yaml = config.to_yaml()?;
        Ok(self.checksum(yaml.as_bytes()))
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }

    /// Compares two hashes to determine if they are equal.
    ///
    /// This is the default checksum comparator of the persister.
    #[must_use]
    pub fn hashes_match(hash1: &str, hash2: &str) -> bool {
        // Constant-time comparison
        if hash1.len() != hash2.len() {
            return false;
        }

        hash1
            .bytes()
            .zip(hash2.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

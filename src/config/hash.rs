//! Content hashing for change detection.
//!
//! Notebook definition files are fingerprinted at scan time, and the declared
//! state as a whole is hashed so that a printed plan can be tied to the
//! repository contents it was computed from.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::items::Item;

/// Hasher for computing content fingerprints.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentHasher;

impl ContentHasher {
    /// Creates a new content hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Hashes a byte slice.
    #[must_use]
    pub fn hash_bytes(&self, data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    /// Hashes the full contents of a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn hash_file(&self, path: &Path) -> std::io::Result<String> {
        let data = std::fs::read(path)?;
        Ok(self.hash_bytes(&data))
    }

    /// Computes a hash of a declared state.
    ///
    /// Items are sorted by kind and name first, so scan order does not matter.
    #[must_use]
    pub fn hash_items(&self, items: &[Item]) -> String {
        let mut sorted: Vec<&Item> = items.iter().collect();
        sorted.sort_by(|a, b| {
            a.item_type
                .cmp(&b.item_type)
                .then_with(|| a.display_name.cmp(&b.display_name))
        });

        let mut hasher = Sha256::new();
        for item in sorted {
            hasher.update(item.item_type.as_bytes());
            hasher.update([0u8]);
            hasher.update(item.display_name.as_bytes());
            hasher.update([0u8]);
            if let Some(fingerprint) = &item.content_fingerprint {
                hasher.update(fingerprint.as_bytes());
            }
            hasher.update([0xffu8]);
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}

//! Persistent translation cache.
//!
//! One row per (entity type, entity id, field, target language). The stored
//! `source_hash` fingerprints the source text the translation was made from;
//! a row whose fingerprint no longer matches the live text is stale.

mod sqlite;

use anyhow::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

pub use sqlite::SqliteCacheStore;

/// Uniqueness key of a cached translation, also used to coalesce requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CacheKey {
    pub entity_type: String,
    pub entity_id: i64,
    pub field: String,
    pub target_lang: String,
}

impl CacheKey {
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: i64,
        field: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
            field: field.into(),
            target_lang: target_lang.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.entity_type, self.entity_id, self.field, self.target_lang
        )
    }
}

/// A stored translation row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationEntry {
    pub key: CacheKey,
    pub source_lang: String,
    pub source_hash: String,
    pub translated_text: String,
    pub provider: String,
    pub model: String,
    pub created_at: String,
    pub updated_at: String,
    pub last_used_at: Option<String>,
}

/// A freshly produced translation waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub key: CacheKey,
    pub source_lang: String,
    pub source_hash: String,
    pub translated_text: String,
    pub provider: String,
    pub model: String,
}

/// Row counts for operators and eviction sweeps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: u64,
    /// Entries that were written but never served as a hit.
    pub never_used: u64,
    pub by_target_lang: BTreeMap<String, u64>,
}

/// Durable store behind the translation pipeline.
///
/// Implementations must be safe to share across concurrent orchestration
/// passes; every write is scoped to rows identified by their [`CacheKey`].
pub trait CacheStore: Send + Sync {
    /// Fetches every stored entry among `keys` in a single round trip.
    fn lookup(&self, keys: &[CacheKey]) -> Result<Vec<TranslationEntry>>;

    /// Removes the entries for `keys`, returning how many rows went away.
    fn delete(&self, keys: &[CacheKey]) -> Result<usize>;

    /// Refreshes `last_used_at` on the entries for `keys`.
    fn touch(&self, keys: &[CacheKey]) -> Result<()>;

    /// Inserts `entries`, silently skipping keys that already exist.
    fn insert_ignore(&self, entries: &[NewEntry]) -> Result<usize>;

    /// Removes every cached translation of one entity.
    fn invalidate_entity(&self, entity_type: &str, entity_id: i64) -> Result<usize>;

    fn stats(&self) -> Result<CacheStats>;
}

/// Hex-encoded SHA-256 of `text`, the version fingerprint stored with each entry.
pub fn source_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_digest_is_64_hex_chars() {
        let digest = source_digest("경복궁");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_source_digest_tracks_content() {
        assert_eq!(source_digest("title"), source_digest("title"));
        assert_ne!(source_digest("title"), source_digest("title "));
    }

    #[test]
    fn test_source_digest_known_value() {
        assert_eq!(
            source_digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_cache_key_ordering_groups_entity() {
        let a = CacheKey::new("place", 1, "title", "eng_Latn");
        let b = CacheKey::new("place", 1, "title", "jpn_Jpan");
        let c = CacheKey::new("place", 2, "address", "eng_Latn");
        let mut keys = vec![c.clone(), b.clone(), a.clone()];
        keys.sort();
        assert_eq!(keys, vec![a, b, c]);
    }

    #[test]
    fn test_cache_key_display() {
        let key = CacheKey::new("shortform", 42, "title", "eng_Latn");
        assert_eq!(key.to_string(), "shortform:42:title:eng_Latn");
    }
}

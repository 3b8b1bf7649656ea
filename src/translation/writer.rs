use tracing::{debug, warn};

use super::backend::is_degraded_provider;
use crate::cache::{CacheStore, NewEntry};

/// Writes fresh translations to the cache.
pub struct CacheWriter<'a> {
    store: &'a dyn CacheStore,
}

impl<'a> CacheWriter<'a> {
    pub const fn new(store: &'a dyn CacheStore) -> Self {
        Self { store }
    }

    /// Stores `entries` in one insert and returns how many rows were written.
    ///
    /// Entries labelled by a fallback or error path are dropped first. Keys
    /// that a concurrent pass already wrote are left as they are.
    pub fn persist(&self, entries: Vec<NewEntry>) -> usize {
        let offered = entries.len();
        let cacheable: Vec<NewEntry> = entries
            .into_iter()
            .filter(|entry| !is_degraded_provider(&entry.provider))
            .collect();

        if cacheable.len() < offered {
            debug!(
                dropped = offered - cacheable.len(),
                "not caching degraded translations"
            );
        }
        if cacheable.is_empty() {
            return 0;
        }

        match self.store.insert_ignore(&cacheable) {
            Ok(written) => written,
            Err(err) => {
                warn!(
                    entries = cacheable.len(),
                    error = %format!("{err:#}"),
                    "failed to persist translations"
                );
                0
            }
        }
    }
}

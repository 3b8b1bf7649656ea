//! Cache resolution with self-healing of stale entries.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use super::coalesce::{CoalescedRequest, Item};
use crate::cache::{CacheKey, CacheStore, TranslationEntry};

/// Outcome of resolving one pass against the cache.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Keys served from the cache.
    pub hits: usize,
    /// Entries that were deleted because the source changed.
    pub stale: usize,
    /// Requests that still need a translation.
    pub misses: Vec<CoalescedRequest>,
}

/// Why a stored entry can no longer be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Staleness {
    ContentChanged,
    LanguageChanged,
}

fn staleness(entry: &TranslationEntry, request: &CoalescedRequest) -> Option<Staleness> {
    if entry.source_hash != request.source_hash {
        Some(Staleness::ContentChanged)
    } else if entry.source_lang != request.source_lang {
        Some(Staleness::LanguageChanged)
    } else {
        None
    }
}

pub struct CacheResolver<'a> {
    store: &'a dyn CacheStore,
}

impl<'a> CacheResolver<'a> {
    pub const fn new(store: &'a dyn CacheStore) -> Self {
        Self { store }
    }

    /// Serves every request the cache can answer and returns the rest.
    ///
    /// One lookup covers all keys. Stale entries are deleted, never patched.
    /// A failing store degrades to treating every key as a miss.
    pub fn resolve(
        &self,
        requests: BTreeMap<CacheKey, CoalescedRequest>,
        items: &mut [Item],
    ) -> Resolution {
        if requests.is_empty() {
            return Resolution::default();
        }

        let keys: Vec<CacheKey> = requests.keys().cloned().collect();
        let entries = match self.store.lookup(&keys) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    keys = keys.len(),
                    error = %format!("{err:#}"),
                    "cache lookup failed, treating all keys as misses"
                );
                Vec::new()
            }
        };

        let mut stored: HashMap<CacheKey, TranslationEntry> = entries
            .into_iter()
            .map(|entry| (entry.key.clone(), entry))
            .collect();

        let mut hit_keys = Vec::new();
        let mut stale_keys = Vec::new();
        let mut misses = Vec::new();

        for (key, request) in requests {
            let Some(entry) = stored.remove(&key) else {
                misses.push(request);
                continue;
            };

            if let Some(reason) = staleness(&entry, &request) {
                debug!(key = %key, ?reason, "dropping stale translation");
                stale_keys.push(key);
                misses.push(request);
            } else {
                request.apply(items, &entry.translated_text);
                hit_keys.push(key);
            }
        }

        if !stale_keys.is_empty()
            && let Err(err) = self.store.delete(&stale_keys)
        {
            warn!(
                keys = stale_keys.len(),
                error = %format!("{err:#}"),
                "failed to delete stale translations"
            );
        }

        if !hit_keys.is_empty()
            && let Err(err) = self.store.touch(&hit_keys)
        {
            warn!(
                keys = hit_keys.len(),
                error = %format!("{err:#}"),
                "failed to refresh last_used_at"
            );
        }

        Resolution {
            hits: hit_keys.len(),
            stale: stale_keys.len(),
            misses,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cache::{NewEntry, SqliteCacheStore, source_digest};
    use crate::translation::coalesce::Consumer;
    use anyhow::{Result, bail};
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn create_test_store(temp_dir: &TempDir) -> SqliteCacheStore {
        SqliteCacheStore::open(temp_dir.path().join("cache.db")).unwrap()
    }

    fn request(text: &str, source_lang: &str) -> CoalescedRequest {
        CoalescedRequest {
            key: CacheKey::new("place", 1, "title", "eng_Latn"),
            text: text.to_string(),
            source_lang: source_lang.to_string(),
            source_hash: source_digest(text),
            consumers: vec![Consumer {
                item_index: 0,
                output_field: "title_translated".to_string(),
            }],
        }
    }

    fn requests(request: CoalescedRequest) -> BTreeMap<CacheKey, CoalescedRequest> {
        BTreeMap::from([(request.key.clone(), request)])
    }

    fn store_translation(store: &SqliteCacheStore, text: &str, source_lang: &str, translated: &str) {
        store
            .insert_ignore(&[NewEntry {
                key: CacheKey::new("place", 1, "title", "eng_Latn"),
                source_lang: source_lang.to_string(),
                source_hash: source_digest(text),
                translated_text: translated.to_string(),
                provider: "nllb".to_string(),
                model: "nllb-200".to_string(),
            }])
            .unwrap();
    }

    fn empty_items() -> Vec<Item> {
        vec![json!({"id": 1}).as_object().unwrap().clone()]
    }

    #[test]
    fn test_hit_is_applied_and_touched() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_test_store(&temp_dir);
        store_translation(&store, "경복궁", "kor_Hang", "Gyeongbokgung Palace");
        let mut items = empty_items();

        let resolution =
            CacheResolver::new(&store).resolve(requests(request("경복궁", "kor_Hang")), &mut items);

        assert_eq!(resolution.hits, 1);
        assert!(resolution.misses.is_empty());
        assert_eq!(items[0]["title_translated"], json!("Gyeongbokgung Palace"));
        let entry = &store
            .lookup(&[CacheKey::new("place", 1, "title", "eng_Latn")])
            .unwrap()[0];
        assert!(entry.last_used_at.is_some());
    }

    #[test]
    fn test_absent_key_is_a_miss() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_test_store(&temp_dir);
        let mut items = empty_items();

        let resolution =
            CacheResolver::new(&store).resolve(requests(request("경복궁", "kor_Hang")), &mut items);

        assert_eq!(resolution.hits, 0);
        assert_eq!(resolution.misses.len(), 1);
        assert!(items[0].get("title_translated").is_none());
    }

    #[test]
    fn test_changed_content_is_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_test_store(&temp_dir);
        store_translation(&store, "경복궁", "kor_Hang", "Gyeongbokgung Palace");
        let mut items = empty_items();

        let resolution = CacheResolver::new(&store)
            .resolve(requests(request("경복궁 야간개장", "kor_Hang")), &mut items);

        assert_eq!(resolution.stale, 1);
        assert_eq!(resolution.misses.len(), 1);
        assert_eq!(items[0].get("title_translated"), None::<&Value>);
        assert_eq!(store.stats().unwrap().total, 0);
    }

    #[test]
    fn test_changed_language_is_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_test_store(&temp_dir);
        store_translation(&store, "Tokyo Tower", "eng_Latn", "Tokyo Tower");
        let mut items = empty_items();

        let resolution = CacheResolver::new(&store)
            .resolve(requests(request("Tokyo Tower", "jpn_Jpan")), &mut items);

        assert_eq!(resolution.stale, 1);
        assert_eq!(resolution.misses.len(), 1);
        assert_eq!(store.stats().unwrap().total, 0);
    }

    struct BrokenStore;

    impl CacheStore for BrokenStore {
        fn lookup(&self, _keys: &[CacheKey]) -> Result<Vec<TranslationEntry>> {
            bail!("database is locked")
        }
        fn delete(&self, _keys: &[CacheKey]) -> Result<usize> {
            bail!("database is locked")
        }
        fn touch(&self, _keys: &[CacheKey]) -> Result<()> {
            bail!("database is locked")
        }
        fn insert_ignore(&self, _entries: &[NewEntry]) -> Result<usize> {
            bail!("database is locked")
        }
        fn invalidate_entity(&self, _entity_type: &str, _entity_id: i64) -> Result<usize> {
            bail!("database is locked")
        }
        fn stats(&self) -> Result<crate::cache::CacheStats> {
            bail!("database is locked")
        }
    }

    #[test]
    fn test_lookup_failure_degrades_to_misses() {
        let mut items = empty_items();

        let resolution =
            CacheResolver::new(&BrokenStore).resolve(requests(request("경복궁", "kor_Hang")), &mut items);

        assert_eq!(resolution.hits, 0);
        assert_eq!(resolution.misses.len(), 1);
    }
}

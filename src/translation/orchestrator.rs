//! Entry points of the translation pipeline.
//!
//! A pass runs coalesce → resolve → dispatch → persist. Callers always get
//! a value back: failures degrade to the original text and are only logged.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::backend::TranslationBackend;
use super::coalesce::{FieldSpec, ID_FIELD, Item, RequestCoalescer, SOURCE_LANG_FIELD};
use super::dispatch::BatchDispatcher;
use super::resolve::CacheResolver;
use super::settings::PipelineSettings;
use super::writer::CacheWriter;
use crate::cache::{CacheStats, CacheStore, NewEntry};

/// Counters of one `translate_items` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub items: usize,
    /// Fields written back without touching cache or backend.
    pub passthrough: usize,
    /// Distinct cache keys after coalescing.
    pub keys: usize,
    pub hits: usize,
    pub stale: usize,
    pub misses: usize,
    pub translated: usize,
    pub degraded: usize,
    pub failed_chunks: usize,
    /// Failed chunks refused for the shared secret.
    pub rejected_chunks: usize,
    pub persisted: usize,
}

pub struct Orchestrator {
    store: Arc<dyn CacheStore>,
    backend: Arc<dyn TranslationBackend>,
    settings: PipelineSettings,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn CacheStore>,
        backend: Arc<dyn TranslationBackend>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            backend,
            settings,
        }
    }

    pub const fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    fn dispatcher(&self) -> BatchDispatcher {
        BatchDispatcher::new(
            Arc::clone(&self.backend),
            self.settings.effective_chunk_size(),
            self.settings.effective_concurrency(),
            self.settings.model_label.as_str(),
        )
    }

    /// Translates the requested fields of every item in place.
    ///
    /// Each field's result lands in its output field (`<field>_translated`
    /// unless the [`FieldSpec`] says otherwise).
    pub async fn translate_items(
        &self,
        items: &mut [Item],
        target_lang: &str,
        entity_type: &str,
        fields: &[FieldSpec],
    ) -> PassReport {
        let requests =
            RequestCoalescer::new(&self.settings).coalesce(items, entity_type, target_lang, fields);
        let keys = requests.len();
        let consumers: usize = requests.values().map(|r| r.consumers.len()).sum();

        let resolution = CacheResolver::new(self.store.as_ref()).resolve(requests, items);
        let misses = resolution.misses.len();

        let dispatched = self.dispatcher().dispatch(resolution.misses, items).await;
        let persisted = CacheWriter::new(self.store.as_ref()).persist(dispatched.new_entries);

        let report = PassReport {
            items: items.len(),
            passthrough: (items.len() * fields.len()).saturating_sub(consumers),
            keys,
            hits: resolution.hits,
            stale: resolution.stale,
            misses,
            translated: dispatched.translated,
            degraded: dispatched.degraded,
            failed_chunks: dispatched.failed_chunks,
            rejected_chunks: dispatched.rejected_chunks,
            persisted,
        };

        info!(
            entity_type,
            target_lang,
            items = report.items,
            keys = report.keys,
            hits = report.hits,
            stale = report.stale,
            misses = report.misses,
            degraded = report.degraded,
            rejected_chunks = report.rejected_chunks,
            persisted = report.persisted,
            "translation pass finished"
        );

        report
    }

    /// Translates a single field, going through the cache like a full pass.
    ///
    /// With `source_lang` the text is taken to be in that language, otherwise
    /// the language is detected. Returns the original text when no
    /// translation can be produced.
    pub async fn translate_one(
        &self,
        entity_type: &str,
        entity_id: i64,
        field: &str,
        text: &str,
        source_lang: Option<&str>,
        target_lang: &str,
    ) -> String {
        let spec = match source_lang {
            Some(_) => FieldSpec::entity(field),
            None => FieldSpec::detected(field),
        };

        let mut item = Map::new();
        item.insert(ID_FIELD.to_string(), Value::from(entity_id));
        if let Some(lang) = source_lang {
            item.insert(SOURCE_LANG_FIELD.to_string(), Value::from(lang));
        }
        item.insert(field.to_string(), Value::from(text));
        let mut items = [item];

        let requests = RequestCoalescer::new(&self.settings).coalesce(
            &mut items,
            entity_type,
            target_lang,
            std::slice::from_ref(&spec),
        );
        let resolution = CacheResolver::new(self.store.as_ref()).resolve(requests, &mut items);

        for request in resolution.misses {
            match self
                .backend
                .translate_one(&request.text, &request.source_lang, target_lang)
                .await
            {
                Ok(translated) => {
                    request.apply(&mut items, &translated.text);
                    CacheWriter::new(self.store.as_ref()).persist(vec![NewEntry {
                        key: request.key,
                        source_lang: request.source_lang,
                        source_hash: request.source_hash,
                        translated_text: translated.text,
                        provider: translated.provider,
                        model: translated
                            .model
                            .unwrap_or_else(|| self.settings.model_label.clone()),
                    }]);
                }
                Err(err) => {
                    if err.is_auth() {
                        error!(
                            key = %request.key,
                            error = %err,
                            "backend rejected the shared secret, returning original text"
                        );
                    } else {
                        warn!(
                            key = %request.key,
                            error = %err,
                            "translation failed, returning original text"
                        );
                    }
                    request.apply(&mut items, &request.text);
                }
            }
        }

        let [item] = items;
        item.get(&spec.output_field)
            .and_then(Value::as_str)
            .map_or_else(|| text.to_string(), ToString::to_string)
    }

    /// Drops every cached translation of one entity.
    pub fn invalidate(&self, entity_type: &str, entity_id: i64) -> Result<usize> {
        let removed = self
            .store
            .invalidate_entity(entity_type, entity_id)
            .with_context(|| format!("Failed to invalidate {entity_type} {entity_id}"))?;

        info!(entity_type, entity_id, removed, "cache invalidated");
        Ok(removed)
    }

    pub fn cache_stats(&self) -> Result<CacheStats> {
        self.store.stats()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cache::SqliteCacheStore;
    use crate::translation::mock::{MockBackend, MockMode};
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_orchestrator(
        temp_dir: &TempDir,
        backend: Arc<MockBackend>,
    ) -> Orchestrator {
        let store = SqliteCacheStore::open(temp_dir.path().join("cache.db")).unwrap();
        Orchestrator::new(Arc::new(store), backend, PipelineSettings::default())
    }

    #[tokio::test]
    async fn test_translate_one_caches_result() {
        let temp_dir = TempDir::new().unwrap();
        let mock = Arc::new(MockBackend::default());
        let orchestrator = create_test_orchestrator(&temp_dir, mock.clone());

        let first = orchestrator
            .translate_one("shortform", 7, "title", "한강 야경", Some("kor_Hang"), "eng_Latn")
            .await;
        let second = orchestrator
            .translate_one("shortform", 7, "title", "한강 야경", Some("kor_Hang"), "eng_Latn")
            .await;

        assert_eq!(first, "한강 야경_eng_Latn");
        assert_eq!(second, first);
        assert_eq!(mock.call_count(), 1);
        assert!(!mock.calls()[0].batch);
    }

    #[tokio::test]
    async fn test_translate_one_detects_language() {
        let temp_dir = TempDir::new().unwrap();
        let mock = Arc::new(MockBackend::default());
        let orchestrator = create_test_orchestrator(&temp_dir, mock.clone());

        orchestrator
            .translate_one("review", 3, "body", "東京タワーの夜景", None, "kor_Hang")
            .await;

        assert_eq!(mock.calls()[0].source_lang, "jpn_Jpan");
    }

    #[tokio::test]
    async fn test_translate_one_failure_returns_original() {
        let temp_dir = TempDir::new().unwrap();
        let mock = Arc::new(MockBackend::new(MockMode::Error("connection refused".to_string())));
        let orchestrator = create_test_orchestrator(&temp_dir, mock.clone());

        let result = orchestrator
            .translate_one("place", 1, "title", "경복궁", Some("kor_Hang"), "eng_Latn")
            .await;

        assert_eq!(result, "경복궁");
        assert_eq!(orchestrator.cache_stats().unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_translate_one_skips_gibberish() {
        let temp_dir = TempDir::new().unwrap();
        let mock = Arc::new(MockBackend::default());
        let orchestrator = create_test_orchestrator(&temp_dir, mock.clone());

        let result = orchestrator
            .translate_one("review", 1, "body", "ㅋㅋㅋ", None, "eng_Latn")
            .await;

        assert_eq!(result, "ㅋㅋㅋ");
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_translate_items_report() {
        let temp_dir = TempDir::new().unwrap();
        let mock = Arc::new(MockBackend::default());
        let orchestrator = create_test_orchestrator(&temp_dir, mock.clone());
        let mut items: Vec<Item> = vec![
            json!({"id": 1, "title": "경복궁", "comment": "ㅋㅋ"}),
            json!({"id": 2, "title": "남산타워", "comment": "야경이 정말 멋져요"}),
        ]
        .into_iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect();
        let fields = [FieldSpec::entity("title"), FieldSpec::detected("comment")];

        let report = orchestrator
            .translate_items(&mut items, "eng_Latn", "place", &fields)
            .await;

        assert_eq!(report.items, 2);
        assert_eq!(report.keys, 3);
        assert_eq!(report.passthrough, 1);
        assert_eq!(report.misses, 3);
        assert_eq!(report.persisted, 3);
        assert_eq!(items[0]["comment_translated"], json!("ㅋㅋ"));
        assert_eq!(items[1]["title_translated"], json!("남산타워_eng_Latn"));
    }

    #[tokio::test]
    async fn test_rejected_secret_is_reported_and_not_cached() {
        let temp_dir = TempDir::new().unwrap();
        let mock = Arc::new(MockBackend::new(MockMode::Unauthorized));
        let orchestrator = create_test_orchestrator(&temp_dir, mock.clone());
        let mut items: Vec<Item> = vec![json!({"id": 1, "title": "경복궁"})]
            .into_iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect();

        let report = orchestrator
            .translate_items(&mut items, "eng_Latn", "place", &[FieldSpec::entity("title")])
            .await;
        let single = orchestrator
            .translate_one("place", 2, "title", "남산타워", Some("kor_Hang"), "eng_Latn")
            .await;

        assert_eq!(report.rejected_chunks, 1);
        assert_eq!(report.persisted, 0);
        assert_eq!(items[0]["title_translated"], json!("경복궁"));
        assert_eq!(single, "남산타워");
        assert_eq!(orchestrator.cache_stats().unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let temp_dir = TempDir::new().unwrap();
        let mock = Arc::new(MockBackend::default());
        let orchestrator = create_test_orchestrator(&temp_dir, mock.clone());
        orchestrator
            .translate_one("place", 4, "title", "해운대 해수욕장", Some("kor_Hang"), "eng_Latn")
            .await;
        orchestrator
            .translate_one("place", 4, "title", "해운대 해수욕장", Some("kor_Hang"), "jpn_Jpan")
            .await;

        assert_eq!(orchestrator.invalidate("place", 4).unwrap(), 2);
        assert_eq!(orchestrator.cache_stats().unwrap().total, 0);
        assert_eq!(orchestrator.invalidate("place", 4).unwrap(), 0);
    }
}

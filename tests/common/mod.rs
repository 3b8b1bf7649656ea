//! Shared helpers for integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

use transcache::cache::SqliteCacheStore;
use transcache::translation::{Item, MockBackend, Orchestrator, PipelineSettings};

/// A cache database inside a temp dir that lives as long as the guard.
pub struct TestCache {
    pub dir: TempDir,
    pub store: Arc<SqliteCacheStore>,
}

pub fn create_test_cache() -> TestCache {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteCacheStore::open(dir.path().join("translations.db")).unwrap());
    TestCache { dir, store }
}

pub fn orchestrator(cache: &TestCache, backend: &Arc<MockBackend>) -> Orchestrator {
    orchestrator_with(cache, backend, PipelineSettings::default())
}

pub fn orchestrator_with(
    cache: &TestCache,
    backend: &Arc<MockBackend>,
    settings: PipelineSettings,
) -> Orchestrator {
    Orchestrator::new(cache.store.clone(), backend.clone(), settings)
}

/// Turns a `json!({...})` object into an item.
pub fn item(value: Value) -> Item {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub fn field<'a>(item: &'a Item, name: &str) -> &'a str {
    item.get(name).and_then(Value::as_str).unwrap_or_default()
}

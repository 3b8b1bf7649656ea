#![allow(clippy::unwrap_used)]
//! End-to-end behavior of translation passes against a real cache database
//! and the in-process mock backend.

mod common;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use common::{create_test_cache, field, item, orchestrator, orchestrator_with};
use transcache::cache::{CacheKey, CacheStore};
use transcache::translation::{FieldSpec, MockBackend, MockMode, PipelineSettings};

fn title() -> Vec<FieldSpec> {
    vec![FieldSpec::entity("title")]
}

#[tokio::test]
async fn test_place_with_title_and_location() {
    let cache = create_test_cache();
    let backend = Arc::new(MockBackend::default());
    let orchestrator = orchestrator(&cache, &backend);

    let mut items = vec![item(json!({
        "id": 1,
        "title": "경복궁",
        "location": "서울특별시 종로구 사직로",
    }))];
    let fields = [FieldSpec::entity("title"), FieldSpec::detected("location")];

    let report = orchestrator
        .translate_items(&mut items, "eng_Latn", "place", &fields)
        .await;

    assert_eq!(report.keys, 2);
    assert_eq!(report.persisted, 2);
    assert_eq!(field(&items[0], "title_translated"), "경복궁_eng_Latn");
    assert_eq!(
        field(&items[0], "location_translated"),
        "서울특별시 종로구 사직로_eng_Latn"
    );

    let stored = cache
        .store
        .lookup(&[
            CacheKey::new("place", 1, "title", "eng_Latn"),
            CacheKey::new("place", 1, "location", "eng_Latn"),
        ])
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|entry| entry.source_lang == "kor_Hang"));
}

#[tokio::test]
async fn test_second_pass_is_served_from_cache() {
    let cache = create_test_cache();
    let backend = Arc::new(MockBackend::default());
    let orchestrator = orchestrator(&cache, &backend);

    let original = vec![
        item(json!({"id": 1, "title": "경복궁"})),
        item(json!({"id": 2, "title": "남산타워"})),
    ];

    let mut first = original.clone();
    orchestrator
        .translate_items(&mut first, "eng_Latn", "place", &title())
        .await;
    let calls_after_first = backend.call_count();

    let mut second = original;
    let report = orchestrator
        .translate_items(&mut second, "eng_Latn", "place", &title())
        .await;

    assert_eq!(first, second);
    assert_eq!(report.hits, 2);
    assert_eq!(report.misses, 0);
    assert_eq!(backend.call_count(), calls_after_first);
}

#[tokio::test]
async fn test_degraded_results_heal_on_next_pass() {
    let cache = create_test_cache();
    let degraded = Arc::new(MockBackend::new(MockMode::Degraded("fallback".to_string())));

    let mut items = vec![item(json!({"id": 7, "title": "경복궁"}))];
    let report = orchestrator(&cache, &degraded)
        .translate_items(&mut items, "eng_Latn", "place", &title())
        .await;

    assert_eq!(report.degraded, 1);
    assert_eq!(report.persisted, 0);
    assert_eq!(field(&items[0], "title_translated"), "경복궁");
    assert_eq!(cache.store.stats().unwrap().total, 0);

    let healthy = Arc::new(MockBackend::default());
    let mut items = vec![item(json!({"id": 7, "title": "경복궁"}))];
    let report = orchestrator(&cache, &healthy)
        .translate_items(&mut items, "eng_Latn", "place", &title())
        .await;

    assert_eq!(report.misses, 1);
    assert_eq!(report.persisted, 1);
    assert_eq!(field(&items[0], "title_translated"), "경복궁_eng_Latn");
}

#[tokio::test]
async fn test_edited_source_is_retranslated() {
    let cache = create_test_cache();
    let backend = Arc::new(MockBackend::default());
    let orchestrator = orchestrator(&cache, &backend);

    let mut items = vec![item(json!({"id": 3, "title": "경복궁"}))];
    orchestrator
        .translate_items(&mut items, "eng_Latn", "place", &title())
        .await;

    let mut items = vec![item(json!({"id": 3, "title": "창덕궁"}))];
    let report = orchestrator
        .translate_items(&mut items, "eng_Latn", "place", &title())
        .await;

    assert_eq!(report.stale, 1);
    assert_eq!(report.persisted, 1);
    assert_eq!(field(&items[0], "title_translated"), "창덕궁_eng_Latn");

    let stored = cache
        .store
        .lookup(&[CacheKey::new("place", 3, "title", "eng_Latn")])
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].translated_text, "창덕궁_eng_Latn");
}

#[tokio::test]
async fn test_identical_items_share_one_request() {
    let cache = create_test_cache();
    let backend = Arc::new(MockBackend::default());
    let orchestrator = orchestrator(&cache, &backend);

    let mut items: Vec<_> = (0..4)
        .map(|_| item(json!({"id": 9, "title": "경복궁"})))
        .collect();

    let report = orchestrator
        .translate_items(&mut items, "eng_Latn", "place", &title())
        .await;

    assert_eq!(report.keys, 1);
    assert_eq!(backend.text_count(), 1);
    assert!(
        items
            .iter()
            .all(|item| field(item, "title_translated") == "경복궁_eng_Latn")
    );
}

#[tokio::test]
async fn test_results_keep_input_order() {
    let cache = create_test_cache();
    let backend = Arc::new(MockBackend::default());
    let orchestrator = orchestrator(&cache, &backend);

    let mut items: Vec<_> = (0..40)
        .map(|id| item(json!({"id": id, "title": format!("장소 {id}")})))
        .collect();

    orchestrator
        .translate_items(&mut items, "eng_Latn", "place", &title())
        .await;

    for (id, item) in items.iter().enumerate() {
        assert_eq!(
            field(item, "title_translated"),
            format!("장소 {id}_eng_Latn")
        );
    }
    assert_eq!(backend.call_count(), 3);
}

#[tokio::test]
async fn test_failed_language_does_not_poison_others() {
    let cache = create_test_cache();
    let flaky = Arc::new(MockBackend::default().failing_for("jpn_Jpan"));

    let original = vec![
        item(json!({"id": 1, "title": "경복궁"})),
        item(json!({"id": 2, "title": "東京タワー", "source_lang": "jpn_Jpan"})),
    ];

    let mut items = original.clone();
    let report = orchestrator(&cache, &flaky)
        .translate_items(&mut items, "eng_Latn", "place", &title())
        .await;

    assert_eq!(report.failed_chunks, 1);
    assert_eq!(report.persisted, 1);
    assert_eq!(field(&items[0], "title_translated"), "경복궁_eng_Latn");
    assert_eq!(field(&items[1], "title_translated"), "東京タワー");

    let healthy = Arc::new(MockBackend::default());
    let mut items = original;
    let report = orchestrator(&cache, &healthy)
        .translate_items(&mut items, "eng_Latn", "place", &title())
        .await;

    assert_eq!(report.hits, 1);
    assert_eq!(report.misses, 1);
    assert_eq!(field(&items[1], "title_translated"), "東京タワー_eng_Latn");
}

#[tokio::test]
async fn test_gibberish_is_passed_through() {
    let cache = create_test_cache();
    let backend = Arc::new(MockBackend::default());
    let orchestrator = orchestrator(&cache, &backend);

    let mut items = vec![item(json!({"id": 5, "content": "ㅋㅋㅋ"}))];
    let report = orchestrator
        .translate_items(
            &mut items,
            "eng_Latn",
            "review",
            &[FieldSpec::detected("content")],
        )
        .await;

    assert_eq!(report.passthrough, 1);
    assert_eq!(report.keys, 0);
    assert_eq!(backend.call_count(), 0);
    assert_eq!(field(&items[0], "content_translated"), "ㅋㅋㅋ");
}

#[tokio::test]
async fn test_same_language_is_passed_through() {
    let cache = create_test_cache();
    let backend = Arc::new(MockBackend::default());
    let orchestrator = orchestrator(&cache, &backend);

    let mut items = vec![item(json!({"id": 1, "title": "경복궁"}))];
    let report = orchestrator
        .translate_items(&mut items, "kor_Hang", "place", &title())
        .await;

    assert_eq!(report.passthrough, 1);
    assert_eq!(backend.call_count(), 0);
    assert_eq!(field(&items[0], "title_translated"), "경복궁");
    assert_eq!(cache.store.stats().unwrap().total, 0);
}

#[tokio::test]
async fn test_invalidate_forces_retranslation() {
    let cache = create_test_cache();
    let backend = Arc::new(MockBackend::default());
    let orchestrator = orchestrator(&cache, &backend);

    let fields = [FieldSpec::entity("title"), FieldSpec::entity("address")];
    let original = vec![item(json!({"id": 4, "title": "경복궁", "address": "사직로 161"}))];

    let mut items = original.clone();
    orchestrator
        .translate_items(&mut items, "eng_Latn", "place", &fields)
        .await;

    assert_eq!(orchestrator.invalidate("place", 4).unwrap(), 2);
    assert_eq!(orchestrator.cache_stats().unwrap().total, 0);

    let mut items = original;
    let report = orchestrator
        .translate_items(&mut items, "eng_Latn", "place", &fields)
        .await;
    assert_eq!(report.misses, 2);
}

#[tokio::test]
async fn test_translate_one_uses_cache() {
    let cache = create_test_cache();
    let backend = Arc::new(MockBackend::default());
    let orchestrator = orchestrator(&cache, &backend);

    let first = orchestrator
        .translate_one("shortform", 11, "title", "한강 야경", Some("kor_Hang"), "eng_Latn")
        .await;
    let second = orchestrator
        .translate_one("shortform", 11, "title", "한강 야경", Some("kor_Hang"), "eng_Latn")
        .await;

    assert_eq!(first, "한강 야경_eng_Latn");
    assert_eq!(first, second);
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_translate_one_returns_original_on_failure() {
    let cache = create_test_cache();
    let backend = Arc::new(MockBackend::new(MockMode::Error("down".to_string())));
    let orchestrator = orchestrator(&cache, &backend);

    let translated = orchestrator
        .translate_one("place", 1, "title", "경복궁", Some("kor_Hang"), "eng_Latn")
        .await;

    assert_eq!(translated, "경복궁");
    assert_eq!(cache.store.stats().unwrap().total, 0);
}

#[tokio::test]
async fn test_concurrent_passes_share_the_cache() {
    let cache = create_test_cache();
    let backend = Arc::new(MockBackend::default().with_delay(Duration::from_millis(20)));
    let left = orchestrator(&cache, &backend);
    let right = orchestrator(&cache, &backend);

    let original: Vec<_> = (0..10)
        .map(|id| item(json!({"id": id, "title": format!("장소 {id}")})))
        .collect();
    let mut left_items = original.clone();
    let mut right_items = original;

    let fields = title();
    let (left_report, right_report) = tokio::join!(
        left.translate_items(&mut left_items, "eng_Latn", "place", &fields),
        right.translate_items(&mut right_items, "eng_Latn", "place", &fields),
    );

    assert_eq!(left_items, right_items);
    assert_eq!(left_report.keys, 10);
    assert_eq!(right_report.keys, 10);
    assert_eq!(cache.store.stats().unwrap().total, 10);
}

#[tokio::test]
async fn test_sequential_mode_sends_one_chunk_at_a_time() {
    let cache = create_test_cache();
    let backend = Arc::new(MockBackend::default().with_delay(Duration::from_millis(5)));
    let settings = PipelineSettings {
        chunk_size: 2,
        parallel: false,
        ..PipelineSettings::default()
    };
    let orchestrator = orchestrator_with(&cache, &backend, settings);

    let mut items: Vec<_> = (0..8)
        .map(|id| item(json!({"id": id, "title": format!("장소 {id}")})))
        .collect();
    orchestrator
        .translate_items(&mut items, "eng_Latn", "place", &title())
        .await;

    assert_eq!(backend.call_count(), 4);
    assert_eq!(backend.max_in_flight(), 1);
}

#[tokio::test]
async fn test_large_page_is_served_from_cache_on_second_pass() {
    let cache = create_test_cache();
    let backend = Arc::new(MockBackend::default());
    let orchestrator = orchestrator(&cache, &backend);

    let original: Vec<_> = (0..750)
        .map(|id| {
            item(json!({
                "id": id,
                "title": format!("장소 {id}"),
                "body": format!("본문 {id}"),
            }))
        })
        .collect();
    let fields = [FieldSpec::entity("title"), FieldSpec::entity("body")];

    let mut first = original.clone();
    let report = orchestrator
        .translate_items(&mut first, "eng_Latn", "place", &fields)
        .await;
    assert_eq!(report.keys, 1_500);
    assert_eq!(report.persisted, 1_500);
    let calls_after_first = backend.call_count();

    let mut second = original;
    let report = orchestrator
        .translate_items(&mut second, "eng_Latn", "place", &fields)
        .await;

    assert_eq!(report.hits, 1_500);
    assert_eq!(report.misses, 0);
    assert_eq!(backend.call_count(), calls_after_first);
    assert_eq!(first, second);
    assert_eq!(cache.store.stats().unwrap().never_used, 0);
}

//! End-to-end pipeline runs against a scripted backend and real stores.

use rpt_common::gateway::GatewayError;
use rpt_common::{
    CacheKey, CacheStore, FakeBackend, MemoryCacheStore, Mode, PassThroughReason, Pipeline,
    PipelineSettings, PromptSet, RunStatus, SqliteCacheStore, TranslationGateway,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn build(cache: Arc<dyn CacheStore>, backend: Arc<FakeBackend>) -> Pipeline {
    let gateway = TranslationGateway::new(backend, Duration::from_secs(5));
    Pipeline::new(cache, gateway, PromptSet::default())
}

fn strict() -> PipelineSettings {
    PipelineSettings::new("strict")
}

#[tokio::test]
async fn dialogue_is_translated_cached_and_logged() {
    let cache = Arc::new(MemoryCacheStore::new());
    let backend = Arc::new(FakeBackend::always_text("Hi there"));
    let pipeline = build(cache.clone(), backend.clone());

    let outcome = pipeline.run("hello there", &strict()).await;

    assert_eq!(outcome.output, "Hi there");
    assert_eq!(outcome.status, RunStatus::Translated);
    assert_eq!(backend.call_count(), 1);

    let key = CacheKey::derive("strict", Mode::Dialogue, "hello there");
    assert_eq!(cache.get(&key).as_deref(), Some("Hi there"));

    let logs = cache.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].original_text, "hello there");
    assert_eq!(logs[0].result_text, "Hi there");
    assert_eq!(logs[0].style, "strict");
}

#[tokio::test]
async fn action_keeps_its_command_token() {
    let cache = Arc::new(MemoryCacheStore::new());
    let backend = Arc::new(FakeBackend::always_text("runs toward the enemy"));
    let pipeline = build(cache.clone(), backend.clone());

    let outcome = pipeline.run("/me lari ke arah musuh", &strict()).await;

    assert_eq!(outcome.output, "/me runs toward the enemy");
    let requests = backend.requests();
    assert_eq!(requests[0].1, "lari ke arah musuh");
    assert!(requests[0].0.contains("ACTION RULES"));
    assert!(cache.contains(&CacheKey::derive("strict", Mode::Action, "lari ke arah musuh")));
}

#[tokio::test]
async fn bare_command_is_left_alone() {
    let cache = Arc::new(MemoryCacheStore::new());
    let backend = Arc::new(FakeBackend::always_text("should not be used"));
    let pipeline = build(cache.clone(), backend.clone());

    let outcome = pipeline.run("/do", &strict()).await;

    assert_eq!(outcome.output, "/do");
    assert_eq!(outcome.status, RunStatus::NothingToTranslate);
    assert_eq!(backend.call_count(), 0);
    assert_eq!(cache.entry_count(), Some(0));
    assert!(cache.logs().is_empty());
}

#[tokio::test]
async fn repeat_selection_is_served_from_cache() {
    let cache = Arc::new(MemoryCacheStore::new());
    let backend = Arc::new(FakeBackend::always_text("Hi there"));
    let pipeline = build(cache.clone(), backend.clone());

    let first = pipeline.run("hello there", &strict()).await;
    let second = pipeline.run("hello there", &strict()).await;

    assert_eq!(second.output, first.output);
    assert_eq!(second.status, RunStatus::CacheHit);
    assert_eq!(backend.call_count(), 1);
    assert_eq!(cache.logs().len(), 2);
}

#[tokio::test]
async fn backend_failure_returns_input_without_cache_write() {
    let cache = Arc::new(MemoryCacheStore::new());
    let backend = Arc::new(FakeBackend::always_error(GatewayError::HttpError(
        "connection refused".to_string(),
    )));
    let pipeline = build(cache.clone(), backend.clone());

    let outcome = pipeline.run("/me lari", &strict()).await;

    assert_eq!(outcome.output, "/me lari");
    assert_eq!(outcome.status, RunStatus::PassThrough(PassThroughReason::Transport));
    assert_eq!(cache.entry_count(), Some(0));
    assert!(cache.logs().is_empty());
}

#[tokio::test]
async fn timeout_returns_input() {
    let cache = Arc::new(MemoryCacheStore::new());
    let backend = Arc::new(FakeBackend::always_text("late").with_delay(Duration::from_secs(5)));
    let gateway = TranslationGateway::new(backend, Duration::from_millis(50));
    let pipeline = Pipeline::new(cache.clone(), gateway, PromptSet::default());

    let outcome = pipeline.run("halo semua", &strict()).await;

    assert_eq!(outcome.output, "halo semua");
    assert_eq!(outcome.status, RunStatus::PassThrough(PassThroughReason::Timeout));
    assert_eq!(cache.entry_count(), Some(0));
}

#[tokio::test]
async fn sqlite_cache_survives_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("cache.db");

    {
        let store = Arc::new(SqliteCacheStore::open(&db_path).unwrap());
        let backend = Arc::new(FakeBackend::always_text("Hi there"));
        let pipeline = build(store, backend);
        pipeline.run("hello there", &strict()).await;
    }

    let store = Arc::new(SqliteCacheStore::open(&db_path).unwrap());
    let backend = Arc::new(FakeBackend::always_error(GatewayError::EmptyResponse));
    let pipeline = build(store.clone(), backend.clone());

    let outcome = pipeline.run("hello there", &strict()).await;
    assert_eq!(outcome.output, "Hi there");
    assert_eq!(outcome.status, RunStatus::CacheHit);
    assert_eq!(backend.call_count(), 0);
    assert_eq!(store.recent_logs(10).len(), 2);
}

#[tokio::test]
async fn broken_database_never_changes_the_output() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let store = Arc::new(SqliteCacheStore::open(&path).unwrap());

    let other = rusqlite::Connection::open(&path).unwrap();
    other
        .execute_batch("DROP TABLE cache; DROP TABLE logs;")
        .unwrap();

    let backend = Arc::new(FakeBackend::always_text("Hi there"));
    let pipeline = build(store.clone(), backend.clone());

    let outcome = pipeline.run("hello there", &strict()).await;
    assert_eq!(outcome.output, "Hi there");
    assert_eq!(outcome.status, RunStatus::Translated);

    let again = pipeline.run("hello there", &strict()).await;
    assert_eq!(again.output, "Hi there");
    assert_eq!(again.status, RunStatus::Translated);
    assert_eq!(backend.call_count(), 2);
    assert_eq!(store.entry_count(), None);
}

//! Daemon state shared across connections and runs
//!
//! Style and the enabled flag are runtime settings: changed over RPC,
//! persisted to the config file, and snapshotted into `PipelineSettings`
//! at the start of every run.

use rpt_common::config::{ClipboardConfig, RptConfig};
use rpt_common::{CacheStore, LogRecord, Pipeline, PipelineSettings};
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Largest `RecentLogs` page served
pub const MAX_LOG_LIMIT: usize = 500;

pub struct DaemonState {
    pub version: String,
    pub start_time: Instant,
    config: RwLock<RptConfig>,
    /// Where runtime changes are persisted; `None` keeps them in memory
    config_path: Option<PathBuf>,
    pipeline: Pipeline,
    api_key_configured: bool,
}

impl DaemonState {
    pub fn new(config: RptConfig, config_path: Option<PathBuf>, pipeline: Pipeline) -> Self {
        let api_key_configured = config.llm.resolved_api_key().is_some();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            config: RwLock::new(config),
            config_path,
            pipeline,
            api_key_configured,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn api_key_configured(&self) -> bool {
        self.api_key_configured
    }

    pub async fn config(&self) -> RptConfig {
        self.config.read().await.clone()
    }

    pub async fn pipeline_settings(&self) -> PipelineSettings {
        self.config.read().await.pipeline_settings()
    }

    pub async fn clipboard_delays(&self) -> ClipboardConfig {
        self.config.read().await.clipboard.clone()
    }

    pub async fn is_enabled(&self) -> bool {
        self.config.read().await.enabled
    }

    pub async fn style(&self) -> String {
        self.config.read().await.style.clone()
    }

    /// Change the style. Returns whether the cache was cleared.
    pub async fn set_style(&self, style: &str) -> Result<bool, String> {
        let style = style.trim();
        if style.is_empty() {
            return Err("Style must not be empty".to_string());
        }

        let mut config = self.config.write().await;
        if config.style == style {
            return Ok(false);
        }

        info!("[STATE] Style {} -> {}", config.style, style);
        config.style = style.to_string();
        self.pipeline.cache().clear();
        self.persist(&config);
        Ok(true)
    }

    pub async fn set_enabled(&self, enabled: bool) {
        let mut config = self.config.write().await;
        if config.enabled != enabled {
            info!(
                "[STATE] Translation {}",
                if enabled { "enabled" } else { "disabled" }
            );
            config.enabled = enabled;
            self.persist(&config);
        }
    }

    pub fn clear_cache(&self) {
        info!("[STATE] Clearing translation cache");
        self.pipeline.cache().clear();
    }

    pub fn recent_logs(&self, limit: usize) -> Vec<LogRecord> {
        self.pipeline.cache().recent_logs(limit.clamp(1, MAX_LOG_LIMIT))
    }

    pub fn cache_entries(&self) -> Option<usize> {
        self.pipeline.cache().entry_count()
    }

    fn persist(&self, config: &RptConfig) {
        let Some(path) = &self.config_path else {
            return;
        };
        if let Err(e) = config.save_to(path) {
            warn!("[STATE] Setting not persisted: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpt_common::{
        CacheKey, CacheStore, FakeBackend, MemoryCacheStore, Mode, PromptSet, TranslationGateway,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn state_with(cache: Arc<MemoryCacheStore>, config_path: Option<PathBuf>) -> DaemonState {
        state_from(RptConfig::default(), cache, config_path)
    }

    fn state_from(
        config: RptConfig,
        cache: Arc<MemoryCacheStore>,
        config_path: Option<PathBuf>,
    ) -> DaemonState {
        let gateway = TranslationGateway::new(
            Arc::new(FakeBackend::always_text("ok")),
            Duration::from_secs(1),
        );
        let pipeline = Pipeline::new(cache, gateway, PromptSet::default());
        DaemonState::new(config, config_path, pipeline)
    }

    #[tokio::test]
    async fn test_style_change_clears_cache_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cache = Arc::new(MemoryCacheStore::new());
        let key = CacheKey::derive("strict", Mode::Dialogue, "halo");
        cache.set(&key, "hello");

        let state = state_with(cache.clone(), Some(path.clone()));
        assert_eq!(state.set_style("  street ").await, Ok(true));

        assert_eq!(state.style().await, "street");
        assert!(!cache.contains(&key));
        assert_eq!(RptConfig::load_from(&path).unwrap().style, "street");
    }

    #[tokio::test]
    async fn test_unparseable_config_is_never_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let original = "style = [unclosed\n[llm]\napi_key = \"sk-user-secret\"\n";
        std::fs::write(&path, original).unwrap();

        let (config, persist_path) = RptConfig::load_for_update(&path);
        let state = state_from(config, Arc::new(MemoryCacheStore::new()), persist_path);

        assert_eq!(state.set_style("broken").await, Ok(true));
        state.set_enabled(false).await;

        assert_eq!(state.style().await, "broken");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn test_same_style_keeps_cache() {
        let cache = Arc::new(MemoryCacheStore::new());
        let key = CacheKey::derive("strict", Mode::Dialogue, "halo");
        cache.set(&key, "hello");

        let state = state_with(cache.clone(), None);
        assert_eq!(state.set_style("strict").await, Ok(false));
        assert!(cache.contains(&key));
    }

    #[tokio::test]
    async fn test_empty_style_is_rejected() {
        let state = state_with(Arc::new(MemoryCacheStore::new()), None);
        assert!(state.set_style("   ").await.is_err());
        assert_eq!(state.style().await, "strict");
    }

    #[tokio::test]
    async fn test_enabled_toggle() {
        let state = state_with(Arc::new(MemoryCacheStore::new()), None);
        assert!(state.is_enabled().await);
        state.set_enabled(false).await;
        assert!(!state.is_enabled().await);
    }
}

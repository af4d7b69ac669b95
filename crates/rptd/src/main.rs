//! RP Translator Daemon
//!
//! Waits for trigger events (RPC `Trigger` or SIGUSR1), then copies the
//! current selection, translates it and pastes the result back.

use anyhow::{Context, Result};
use clap::Parser;
use rpt_common::config::RptConfig;
use rpt_common::{
    paths, CacheStore, NullCacheStore, OpenAiBackend, Pipeline, SqliteCacheStore,
    TranslationGateway,
};
use rptd::clipboard::SystemClipboard;
use rptd::keys::detect_key_injector;
use rptd::{server, trigger, Daemon, DaemonState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "rptd", version, about = "RP Translator daemon")]
struct Args {
    /// Config file (default: $RPT_CONFIG or $XDG_CONFIG_HOME/rpt/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Socket path (overrides daemon.socket_path)
    #[arg(long)]
    socket: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(paths::config_path);

    // Logging level comes from the config, so peek at it before logging is up
    let level = RptConfig::load_from(&config_path)
        .map(|c| c.log.level)
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .init();

    info!("[BOOT] RP Translator daemon v{} starting...", env!("CARGO_PKG_VERSION"));

    let (config, persist_path) = RptConfig::load_for_update(&config_path);
    match &persist_path {
        Some(path) => info!("[BOOT] Config loaded from {}", path.display()),
        None => error!(
            "[BOOT] {} left untouched, runtime changes stay in memory",
            config_path.display()
        ),
    }

    let cache = open_cache(&config);
    let backend = OpenAiBackend::new(&config.llm).context("Failed to create LLM backend")?;
    let gateway = TranslationGateway::new(Arc::new(backend), config.llm.timeout());
    let pipeline = Pipeline::new(cache, gateway, config.prompts.load_prompts());
    info!(
        "[BOOT] Pipeline ready (style {}, split_lines {}, gate {:?})",
        config.style, config.pipeline.split_lines, config.gate.policy
    );

    let socket_path = args
        .socket
        .unwrap_or_else(|| config.daemon.resolved_socket_path());
    let policy = config.gate.policy;

    let state = Arc::new(DaemonState::new(config, persist_path, pipeline));
    let daemon = Arc::new(Daemon::new(
        state,
        Arc::new(SystemClipboard::detect()),
        detect_key_injector(),
        policy,
    ));

    let listener = server::bind(&socket_path)?;
    trigger::spawn_sigusr1_listener(daemon.clone());

    info!("[READY] rptd operational");

    let result = tokio::select! {
        result = server::serve(listener, daemon) => result.context("RPC server error"),
        _ = trigger::shutdown_signal() => Ok(()),
    };

    if let Err(e) = std::fs::remove_file(&socket_path) {
        warn!("[SHUTDOWN] Failed to remove socket: {}", e);
    }
    info!("[SHUTDOWN] rptd stopped");
    result
}

/// SQLite cache, or a null store when disabled or unavailable
fn open_cache(config: &RptConfig) -> Arc<dyn CacheStore> {
    if !config.cache.enabled {
        info!("[BOOT] Cache disabled");
        return Arc::new(NullCacheStore);
    }

    let db_path = config.cache.resolved_db_path();
    match SqliteCacheStore::open(&db_path) {
        Ok(store) => {
            info!("[BOOT] Cache at {}", db_path.display());
            Arc::new(store)
        }
        Err(e) => {
            warn!("[BOOT] Cache unavailable ({}), translating without cache", e);
            Arc::new(NullCacheStore)
        }
    }
}

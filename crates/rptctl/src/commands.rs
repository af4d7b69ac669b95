//! Command execution
//!
//! Settings commands (`style`, `enable`, `disable`, `cache clear`, `logs`)
//! go through the daemon when it is running and fall back to editing the
//! config file and cache database directly when it is not.

use crate::cli::{CacheCommands, Cli, Commands};
use crate::output;
use crate::rpc_client::RpcClient;
use anyhow::{Context, Result};
use rpt_common::config::RptConfig;
use rpt_common::ipc::{Method, ResponseData};
use rpt_common::{
    classify, paths, CacheStore, NullCacheStore, OpenAiBackend, Pipeline, SqliteCacheStore,
    TranslationGateway,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything a command needs besides its own arguments
pub struct CommandContext {
    pub config: RptConfig,
    pub config_path: PathBuf,
    /// `None` when the file exists but failed to load
    pub persist_path: Option<PathBuf>,
    pub socket_path: PathBuf,
}

impl CommandContext {
    pub fn from_cli(cli: &Cli) -> Self {
        let config_path = cli.config.clone().unwrap_or_else(paths::config_path);
        let (config, persist_path) = RptConfig::load_for_update(&config_path);
        let socket_path = RpcClient::discover_socket_path(cli.socket.as_deref(), &config);
        Self {
            config,
            config_path,
            persist_path,
            socket_path,
        }
    }

    async fn daemon(&self) -> Result<RpcClient> {
        Ok(RpcClient::connect(&self.socket_path)
            .await?
            .with_translate_timeout(self.config.llm.timeout()))
    }

    /// Daemon connection if one is listening right now
    async fn daemon_if_running(&self) -> Option<RpcClient> {
        match RpcClient::connect_quick(&self.socket_path).await {
            Ok(client) => Some(client),
            Err(e) => {
                debug!("Daemon not reachable: {}", e);
                None
            }
        }
    }
}

pub async fn run(command: Commands, ctx: CommandContext) -> Result<()> {
    match command {
        Commands::Trigger => trigger(&ctx).await,
        Commands::Translate { text, local, style } => translate(&ctx, &text, local, style).await,
        Commands::Classify { text } => {
            output::print_classification(&classify(&text));
            Ok(())
        }
        Commands::Style { name } => set_style(ctx, &name).await,
        Commands::Enable => set_enabled(ctx, true).await,
        Commands::Disable => set_enabled(ctx, false).await,
        Commands::Cache {
            action: CacheCommands::Clear,
        } => clear_cache(&ctx).await,
        Commands::Logs { limit } => logs(&ctx, limit).await,
        Commands::Status { json } => status(&ctx, json).await,
        Commands::Ping => {
            ctx.daemon().await?.ping().await?;
            println!("pong");
            Ok(())
        }
    }
}

async fn trigger(ctx: &CommandContext) -> Result<()> {
    match ctx.daemon().await?.call(Method::Trigger).await? {
        ResponseData::Triggered(outcome) => output::print_trigger(outcome),
        ResponseData::Disabled => {
            println!("[DISABLED] Translation is off. Run `rptctl enable` to turn it on.")
        }
        other => anyhow::bail!("Unexpected response: {:?}", other),
    }
    Ok(())
}

async fn translate(
    ctx: &CommandContext,
    text: &str,
    local: bool,
    style: Option<String>,
) -> Result<()> {
    let outcome = if local {
        let pipeline = local_pipeline(&ctx.config)?;
        let mut settings = ctx.config.pipeline_settings();
        if let Some(style) = style {
            settings.style = style;
        }
        pipeline.run(text, &settings).await
    } else {
        let response = ctx
            .daemon()
            .await?
            .call(Method::Translate {
                text: text.to_string(),
            })
            .await?;
        match response {
            ResponseData::Translation(outcome) => outcome,
            other => anyhow::bail!("Unexpected response: {:?}", other),
        }
    };

    output::print_outcome(&outcome);
    Ok(())
}

async fn set_style(mut ctx: CommandContext, name: &str) -> Result<()> {
    if let Some(mut client) = ctx.daemon_if_running().await {
        match client
            .call(Method::SetStyle {
                style: name.to_string(),
            })
            .await?
        {
            ResponseData::StyleChanged {
                style,
                cache_cleared,
            } => {
                report_style(&style, cache_cleared);
                return Ok(());
            }
            other => anyhow::bail!("Unexpected response: {:?}", other),
        }
    }

    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Style must not be empty");
    }
    let changed = ctx.config.style != name;
    if changed {
        ctx.config.style = name.to_string();
        save_config(&ctx)?;
        open_local_cache(&ctx.config).clear();
    }
    report_style(name, changed);
    Ok(())
}

fn report_style(style: &str, cache_cleared: bool) {
    if cache_cleared {
        output::display_success(&format!("Style set to {} (cache cleared)", style));
    } else {
        output::display_success(&format!("Style is already {}", style));
    }
}

async fn set_enabled(mut ctx: CommandContext, enabled: bool) -> Result<()> {
    if let Some(mut client) = ctx.daemon_if_running().await {
        client.call(Method::SetEnabled { enabled }).await?;
    } else if ctx.config.enabled != enabled {
        ctx.config.enabled = enabled;
        save_config(&ctx)?;
    }
    output::display_success(if enabled {
        "Translation enabled"
    } else {
        "Translation disabled"
    });
    Ok(())
}

async fn clear_cache(ctx: &CommandContext) -> Result<()> {
    match ctx.daemon_if_running().await {
        Some(mut client) => {
            client.call(Method::ClearCache).await?;
        }
        None => open_local_cache(&ctx.config).clear(),
    }
    output::display_success("Translation cache cleared");
    Ok(())
}

async fn logs(ctx: &CommandContext, limit: usize) -> Result<()> {
    let records = match ctx.daemon_if_running().await {
        Some(mut client) => match client.call(Method::RecentLogs { limit }).await? {
            ResponseData::Logs(records) => records,
            other => anyhow::bail!("Unexpected response: {:?}", other),
        },
        None => open_local_cache(&ctx.config).recent_logs(limit),
    };
    output::print_logs(&records);
    Ok(())
}

async fn status(ctx: &CommandContext, json: bool) -> Result<()> {
    let status = match ctx.daemon().await?.call(Method::Status).await? {
        ResponseData::Status(status) => status,
        other => anyhow::bail!("Unexpected response: {:?}", other),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        output::print_status(&status);
    }
    Ok(())
}

fn save_config(ctx: &CommandContext) -> Result<()> {
    let Some(path) = &ctx.persist_path else {
        anyhow::bail!(
            "{} could not be loaded; fix it before changing settings",
            ctx.config_path.display()
        );
    };
    ctx.config
        .save_to(path)
        .with_context(|| format!("Failed to update {}", path.display()))
}

/// Same stores the daemon uses, opened in this process
fn open_local_cache(config: &RptConfig) -> Arc<dyn CacheStore> {
    if !config.cache.enabled {
        return Arc::new(NullCacheStore);
    }
    match SqliteCacheStore::open(config.cache.resolved_db_path()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Cache unavailable: {}", e);
            Arc::new(NullCacheStore)
        }
    }
}

fn local_pipeline(config: &RptConfig) -> Result<Pipeline> {
    let backend = OpenAiBackend::new(&config.llm).context("Failed to create LLM backend")?;
    let gateway = TranslationGateway::new(Arc::new(backend), config.llm.timeout());
    Ok(Pipeline::new(
        open_local_cache(config),
        gateway,
        config.prompts.load_prompts(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;

    const BROKEN: &str = "style = [unclosed\n[llm]\napi_key = \"sk-user-secret\"\n";

    fn offline_context(dir: &std::path::Path) -> CommandContext {
        let config = dir.join("config.toml");
        let socket = dir.join("absent.sock");
        let cli = Cli::try_parse_from([
            "rptctl",
            "--config",
            config.to_str().unwrap(),
            "--socket",
            socket.to_str().unwrap(),
            "disable",
        ])
        .unwrap();
        CommandContext::from_cli(&cli)
    }

    #[tokio::test]
    async fn test_offline_setting_change_keeps_broken_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, BROKEN).unwrap();

        let ctx = offline_context(dir.path());
        assert!(ctx.persist_path.is_none());

        let result = run(Commands::Disable, ctx).await;
        assert!(result.unwrap_err().to_string().contains("could not be loaded"));
        assert_eq!(fs::read_to_string(&path).unwrap(), BROKEN);
    }

    #[tokio::test]
    async fn test_offline_setting_change_writes_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "style = \"street\"\n").unwrap();

        run(Commands::Disable, offline_context(dir.path()))
            .await
            .unwrap();

        let saved = RptConfig::load_from(&path).unwrap();
        assert!(!saved.enabled);
        assert_eq!(saved.style, "street");
    }
}

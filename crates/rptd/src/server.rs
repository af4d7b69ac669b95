//! RPC Server - Unix socket server for daemon-client communication

use crate::daemon::Daemon;
use anyhow::{Context, Result};
use rpt_common::ipc::{Method, Request, Response, ResponseData};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

/// Bind the daemon socket, replacing a stale one
pub fn bind(socket_path: &Path) -> Result<UnixListener> {
    if let Some(dir) = socket_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create socket directory {}", dir.display()))?;
    }

    if socket_path.exists() {
        std::fs::remove_file(socket_path).context("Failed to remove old socket")?;
    }

    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("Failed to bind socket at {}", socket_path.display()))?;

    // Owner only: the socket can paste into any focused window
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))
            .context("Failed to set socket permissions")?;
    }

    info!("[RPC] Listening on {}", socket_path.display());
    Ok(listener)
}

/// Accept connections forever
pub async fn serve(listener: UnixListener, daemon: Arc<Daemon>) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let daemon = Arc::clone(&daemon);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, daemon).await {
                        error!("[RPC] Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("[RPC] Failed to accept connection: {}", e);
            }
        }
    }
}

/// Handle a single client connection
async fn handle_connection(stream: UnixStream, daemon: Arc<Daemon>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .context("Failed to read from socket")?;

        if bytes_read == 0 {
            break;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle_request(request.id, request.method, &daemon).await,
            Err(e) => {
                warn!("[RPC] Invalid request JSON: {}", e);
                Response {
                    id: 0,
                    result: Err(format!("Invalid request: {}", e)),
                }
            }
        };

        let response_json = serde_json::to_string(&response)? + "\n";
        writer
            .write_all(response_json.as_bytes())
            .await
            .context("Failed to write response")?;
    }

    Ok(())
}

/// Handle a single request
pub async fn handle_request(id: u64, method: Method, daemon: &Daemon) -> Response {
    debug!("[RPC] #{} {}", id, method_name(&method));
    let state = daemon.state();

    let result = match method {
        Method::Ping => Ok(ResponseData::Pong),

        Method::Status => Ok(ResponseData::Status(daemon.status().await)),

        Method::Trigger => Ok(daemon.trigger().await),

        Method::Translate { text } => {
            let settings = state.pipeline_settings().await;
            let outcome = state.pipeline().run(&text, &settings).await;
            Ok(ResponseData::Translation(outcome))
        }

        Method::SetStyle { style } => {
            state
                .set_style(&style)
                .await
                .map(|cache_cleared| ResponseData::StyleChanged {
                    style: style.trim().to_string(),
                    cache_cleared,
                })
        }

        Method::SetEnabled { enabled } => {
            state.set_enabled(enabled).await;
            Ok(ResponseData::EnabledChanged { enabled })
        }

        Method::ClearCache => {
            state.clear_cache();
            Ok(ResponseData::CacheCleared)
        }

        Method::RecentLogs { limit } => Ok(ResponseData::Logs(state.recent_logs(limit))),
    };

    Response { id, result }
}

fn method_name(method: &Method) -> &'static str {
    match method {
        Method::Ping => "Ping",
        Method::Status => "Status",
        Method::Trigger => "Trigger",
        Method::Translate { .. } => "Translate",
        Method::SetStyle { .. } => "SetStyle",
        Method::SetEnabled { .. } => "SetEnabled",
        Method::ClearCache => "ClearCache",
        Method::RecentLogs { .. } => "RecentLogs",
    }
}

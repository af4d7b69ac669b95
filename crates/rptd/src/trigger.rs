//! Signal triggers
//!
//! `SIGUSR1` is one trigger event, so a hotkey can be bound to
//! `pkill -USR1 rptd` as well as to `rptctl trigger`.

use crate::daemon::Daemon;
use rpt_common::ipc::ResponseData;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};

/// Spawn the SIGUSR1 listener task
pub fn spawn_sigusr1_listener(daemon: Arc<Daemon>) {
    tokio::spawn(async move {
        let mut sigusr1 = match signal(SignalKind::user_defined1()) {
            Ok(s) => s,
            Err(e) => {
                warn!("[TRIGGER] Failed to register SIGUSR1 handler: {}", e);
                return;
            }
        };

        info!("[TRIGGER] SIGUSR1 handler registered");

        while sigusr1.recv().await.is_some() {
            match daemon.trigger().await {
                ResponseData::Triggered(outcome) => debug!("[TRIGGER] SIGUSR1 -> {:?}", outcome),
                _ => debug!("[TRIGGER] SIGUSR1 ignored"),
            }
        }
    });
}

/// Resolve on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!("[SHUTDOWN] Failed to register SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("[SHUTDOWN] Ctrl-C received"),
        _ = sigterm.recv() => info!("[SHUTDOWN] SIGTERM received"),
    }
}

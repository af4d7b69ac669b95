//! Daemon handle: runtime state plus the invocation gate in front of the
//! translation session. Shared by the RPC server and the signal listener.

use crate::clipboard::Clipboard;
use crate::keys::KeyInjector;
use crate::session::TranslationSession;
use crate::state::DaemonState;
use rpt_common::ipc::{ResponseData, StatusData};
use rpt_common::{GatePolicy, InvocationGate};
use std::sync::Arc;
use tracing::debug;

pub struct Daemon {
    state: Arc<DaemonState>,
    gate: InvocationGate,
}

impl Daemon {
    pub fn new(
        state: Arc<DaemonState>,
        clipboard: Arc<dyn Clipboard>,
        keys: Arc<dyn KeyInjector>,
        policy: GatePolicy,
    ) -> Self {
        let session = Arc::new(TranslationSession::new(state.clone(), clipboard, keys));
        Self {
            state,
            gate: InvocationGate::new(session, policy),
        }
    }

    pub fn state(&self) -> &Arc<DaemonState> {
        &self.state
    }

    pub fn gate(&self) -> &InvocationGate {
        &self.gate
    }

    /// One trigger event from any source
    pub async fn trigger(&self) -> ResponseData {
        if !self.state.is_enabled().await {
            debug!("[TRIGGER] Translation disabled, ignoring trigger");
            return ResponseData::Disabled;
        }
        ResponseData::Triggered(self.gate.submit())
    }

    pub async fn status(&self) -> StatusData {
        let config = self.state.config().await;
        let stats = self.gate.stats();
        StatusData {
            version: self.state.version.clone(),
            uptime_seconds: self.state.start_time.elapsed().as_secs(),
            style: config.style,
            enabled: config.enabled,
            busy: self.gate.is_busy(),
            gate_policy: self.gate.policy(),
            split_lines: config.pipeline.split_lines,
            runs_completed: stats.completed,
            triggers_dropped: stats.dropped,
            cache_entries: self.state.cache_entries(),
            model: config.llm.model,
            api_key_configured: self.state.api_key_configured(),
        }
    }
}

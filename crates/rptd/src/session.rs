//! Translation session - one trigger, end to end
//!
//! copy -> wait -> read clipboard -> pipeline -> write clipboard -> wait -> paste

use crate::clipboard::Clipboard;
use crate::keys::KeyInjector;
use crate::state::DaemonState;
use async_trait::async_trait;
use rpt_common::{PipelineOutcome, RunStatus, TriggerHandler};
use std::sync::Arc;
use tracing::{debug, info};

pub struct TranslationSession {
    state: Arc<DaemonState>,
    clipboard: Arc<dyn Clipboard>,
    keys: Arc<dyn KeyInjector>,
}

impl TranslationSession {
    pub fn new(
        state: Arc<DaemonState>,
        clipboard: Arc<dyn Clipboard>,
        keys: Arc<dyn KeyInjector>,
    ) -> Self {
        Self {
            state,
            clipboard,
            keys,
        }
    }

    /// Run the whole copy/translate/paste cycle once
    pub async fn run_once(&self) -> PipelineOutcome {
        let delays = self.state.clipboard_delays().await;

        self.keys.send_copy().await;
        tokio::time::sleep(delays.copy_delay()).await;

        let text = self.clipboard.read_selection().await;
        if text.trim().is_empty() {
            info!("[SESSION] Clipboard empty, nothing to translate");
            return PipelineOutcome {
                output: text,
                status: RunStatus::EmptyInput,
            };
        }

        let settings = self.state.pipeline_settings().await;
        let outcome = self.state.pipeline().run(&text, &settings).await;

        if outcome.status.is_skipped() {
            debug!("[SESSION] {} - selection left in place", outcome.status.label());
            return outcome;
        }

        self.clipboard.write_result(&outcome.output).await;
        tokio::time::sleep(delays.paste_delay()).await;
        self.keys.send_paste().await;

        info!("[SESSION] Done ({})", outcome.status.label());
        outcome
    }
}

#[async_trait]
impl TriggerHandler for TranslationSession {
    async fn on_trigger(&self) {
        // A queued trigger may outlive a `disable`
        if !self.state.is_enabled().await {
            info!("[SESSION] Translation disabled, skipping queued trigger");
            return;
        }
        self.run_once().await;
    }
}

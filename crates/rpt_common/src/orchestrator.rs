//! Pipeline Orchestrator - classify, cache lookup, translate, reassemble
//!
//! State flow for one selection:
//!
//! ```text
//! Idle -> Parsing -> CacheLookup -> Assemble -> Done            (hit)
//!                                -> Translating -> CacheWrite -> Assemble -> Done
//! ```
//!
//! Nothing here returns an error. The worst outcome is the original
//! selection handed back unchanged.

use crate::cache::{CacheKey, CacheStore};
use crate::classifier::classify;
use crate::gateway::TranslationGateway;
use crate::prompts::PromptSet;
use crate::types::{Classification, PipelineOutcome, RunStatus, Translation};
use std::sync::Arc;
use tracing::{debug, info};

/// Per-run settings snapshot, taken by the caller before a run starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub style: String,
    /// Treat every non-blank line as its own selection
    pub split_lines: bool,
}

impl PipelineSettings {
    pub fn new(style: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            split_lines: false,
        }
    }

    pub fn with_split_lines(mut self, split_lines: bool) -> Self {
        self.split_lines = split_lines;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Parsing,
    CacheLookup,
    Translating,
    CacheWrite,
    Assemble,
    Done,
}

fn enter(state: PipelineState) {
    debug!("[PIPELINE] -> {:?}", state);
}

pub struct Pipeline {
    cache: Arc<dyn CacheStore>,
    gateway: TranslationGateway,
    prompts: PromptSet,
}

impl Pipeline {
    pub fn new(cache: Arc<dyn CacheStore>, gateway: TranslationGateway, prompts: PromptSet) -> Self {
        Self {
            cache,
            gateway,
            prompts,
        }
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    /// Run one selection through the pipeline
    pub async fn run(&self, text: &str, settings: &PipelineSettings) -> PipelineOutcome {
        if text.trim().is_empty() {
            debug!("[PIPELINE] Empty selection, nothing to do");
            return PipelineOutcome {
                output: text.to_string(),
                status: RunStatus::EmptyInput,
            };
        }

        let outcome = if settings.split_lines && text.contains('\n') {
            self.run_lines(text, settings).await
        } else {
            self.process(text, settings).await
        };

        if outcome.status.produced_translation() {
            self.cache.append_log(text, &outcome.output, &settings.style);
        }

        enter(PipelineState::Done);
        info!(
            "[PIPELINE] {} chars -> {} chars ({}, style {})",
            text.chars().count(),
            outcome.output.chars().count(),
            outcome.status.label(),
            settings.style
        );
        outcome
    }

    /// Whole-selection path: steps Parsing through Assemble, no logging
    async fn process(&self, text: &str, settings: &PipelineSettings) -> PipelineOutcome {
        enter(PipelineState::Parsing);
        let parsed = match classify(text) {
            Classification::Translatable(parsed) => parsed,
            Classification::NothingToTranslate(parsed) => {
                debug!(
                    "[PIPELINE] {} carries no body, leaving selection as is",
                    parsed.command_token.as_deref().unwrap_or("selection")
                );
                return PipelineOutcome {
                    output: text.to_string(),
                    status: RunStatus::NothingToTranslate,
                };
            }
        };

        let template = self.prompts.for_mode(parsed.mode);
        let key = CacheKey::derive(&settings.style, parsed.mode, &parsed.body);

        enter(PipelineState::CacheLookup);
        if let Some(cached) = self.cache.get(&key) {
            debug!("[PIPELINE] Cache hit {}", &key.as_str()[..12]);
            enter(PipelineState::Assemble);
            return PipelineOutcome {
                output: parsed.assemble(&cached),
                status: RunStatus::CacheHit,
            };
        }

        enter(PipelineState::Translating);
        let translation = self
            .gateway
            .translate(&parsed.body, template, &settings.style)
            .await;

        let status = match &translation {
            Translation::Translated { text } => {
                enter(PipelineState::CacheWrite);
                self.cache.set(&key, text);
                RunStatus::Translated
            }
            Translation::PassThrough { reason, .. } => RunStatus::PassThrough(*reason),
        };

        enter(PipelineState::Assemble);
        PipelineOutcome {
            output: parsed.assemble(translation.text()),
            status,
        }
    }

    /// Line-by-line path. Blank lines are kept as they are.
    async fn run_lines(&self, text: &str, settings: &PipelineSettings) -> PipelineOutcome {
        let mut lines = Vec::new();
        let mut statuses = Vec::new();

        for line in text.split('\n') {
            if line.trim().is_empty() {
                lines.push(line.to_string());
                continue;
            }
            let outcome = self.process(line, settings).await;
            lines.push(outcome.output);
            statuses.push(outcome.status);
        }

        debug!("[PIPELINE] Processed {} lines", statuses.len());
        PipelineOutcome {
            output: lines.join("\n"),
            status: combine_statuses(&statuses),
        }
    }
}

/// Overall status of a multi-line run: any fresh translation wins, then any
/// cache hit, then the first pass-through.
fn combine_statuses(statuses: &[RunStatus]) -> RunStatus {
    if statuses.contains(&RunStatus::Translated) {
        return RunStatus::Translated;
    }
    if statuses.contains(&RunStatus::CacheHit) {
        return RunStatus::CacheHit;
    }
    statuses
        .iter()
        .find(|s| matches!(s, RunStatus::PassThrough(_)))
        .copied()
        .unwrap_or(RunStatus::NothingToTranslate)
}

//! RP Translator Common - Shared pipeline, storage and protocol types
//!
//! Everything that is not OS glue lives here: command classification,
//! the translation cache, the LLM gateway, the pipeline orchestrator and the
//! invocation gate. The daemon (`rptd`) and the CLI (`rptctl`) are thin
//! shells around these modules.

pub mod cache;
pub mod classifier;
pub mod config;
pub mod gate;
pub mod gateway;
pub mod ipc;
pub mod orchestrator;
pub mod paths;
pub mod prompts;
pub mod types;

pub use cache::{CacheKey, CacheStore, MemoryCacheStore, NullCacheStore, SqliteCacheStore};
pub use classifier::{classify, parse_selection};
pub use config::RptConfig;
pub use gate::{GatePolicy, InvocationGate, SubmitOutcome, TriggerHandler};
pub use gateway::{FakeBackend, LlmBackend, OpenAiBackend, TranslationGateway};
pub use orchestrator::{Pipeline, PipelineSettings};
pub use prompts::PromptSet;
pub use types::*;

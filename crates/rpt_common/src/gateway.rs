//! Translation Gateway
//!
//! Wraps the remote LLM call with a hard timeout and a fail-open contract:
//! whatever goes wrong (no API key, timeout, transport, bad status, garbage
//! JSON, empty answer) the caller gets the original body back, tagged with
//! the reason. The gateway is stateless; caching belongs to the pipeline.
//!
//! Backends:
//! - `OpenAiBackend` - OpenAI-compatible `/chat/completions`
//! - `FakeBackend`   - scripted replies for tests

use crate::config::LlmConfig;
use crate::prompts;
use crate::types::{PassThroughReason, Translation};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Backend failures. All of them end up as a pass-through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("No API key configured")]
    MissingCredentials,

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Backend returned HTTP {0}")]
    BadStatus(u16),

    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Backend returned empty response")]
    EmptyResponse,
}

impl GatewayError {
    pub fn reason(&self) -> PassThroughReason {
        match self {
            GatewayError::MissingCredentials => PassThroughReason::MissingCredentials,
            GatewayError::HttpError(_) => PassThroughReason::Transport,
            GatewayError::BadStatus(_) => PassThroughReason::BadStatus,
            GatewayError::InvalidJson(_) => PassThroughReason::MalformedResponse,
            GatewayError::Timeout(_) => PassThroughReason::Timeout,
            GatewayError::EmptyResponse => PassThroughReason::EmptyResponse,
        }
    }
}

/// A text-completion backend
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Send one system + user message pair and return the raw reply text
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String, GatewayError>;
}

/// Stateless translation front-end over an `LlmBackend`
#[derive(Clone)]
pub struct TranslationGateway {
    backend: Arc<dyn LlmBackend>,
    timeout: Duration,
}

impl TranslationGateway {
    pub fn new(backend: Arc<dyn LlmBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Translate `body` using `template` rendered with `style`
    pub async fn translate(&self, body: &str, template: &str, style: &str) -> Translation {
        if body.trim().is_empty() {
            return pass_through(body, PassThroughReason::EmptyInput);
        }

        let system_prompt = prompts::render(template, style);
        let start = std::time::Instant::now();

        let reply = tokio::time::timeout(self.timeout, self.backend.complete(&system_prompt, body)).await;

        match reply {
            Err(_) => {
                warn!(
                    "[GATEWAY] No reply within {}ms, passing text through",
                    self.timeout.as_millis()
                );
                pass_through(body, PassThroughReason::Timeout)
            }
            Ok(Err(e)) => {
                warn!("[GATEWAY] Translation failed, passing text through: {}", e);
                pass_through(body, e.reason())
            }
            Ok(Ok(text)) => {
                let text = text.trim();
                debug!("[GATEWAY] Reply in {}ms ({} chars)", start.elapsed().as_millis(), text.len());
                if text.is_empty() {
                    warn!("[GATEWAY] Empty reply, passing text through");
                    pass_through(body, PassThroughReason::EmptyResponse)
                } else if text == body {
                    pass_through(body, PassThroughReason::Unchanged)
                } else {
                    Translation::Translated {
                        text: text.to_string(),
                    }
                }
            }
        }
    }

    /// Plain-string form: translated text, or `body` on any failure
    pub async fn translate_text(&self, body: &str, template: &str, style: &str) -> String {
        self.translate(body, template, style).await.into_text()
    }
}

fn pass_through(body: &str, reason: PassThroughReason) -> Translation {
    Translation::PassThrough {
        text: body.to_string(),
        reason,
    }
}

// ============================================================================
// OpenAI-compatible backend
// ============================================================================

/// Chat-completions client (OpenAI or any compatible server)
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl OpenAiBackend {
    pub fn new(config: &LlmConfig) -> Result<Self, GatewayError> {
        let timeout_secs = config.effective_timeout_secs();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GatewayError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        let api_key = config.resolved_api_key();
        if api_key.is_none() {
            warn!("[GATEWAY] No API key configured - selections will pass through untranslated");
        }
        info!("[GATEWAY] Backend {} (model {})", config.base_url, config.model);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String, GatewayError> {
        let api_key = self.api_key.as_deref().ok_or(GatewayError::MissingCredentials)?;

        let request_body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_text},
            ],
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(self.timeout_secs)
                } else {
                    GatewayError::HttpError(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::BadStatus(status.as_u16()));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidJson(format!("Failed to parse response: {}", e)))?;

        extract_content(&response_json)
    }
}

/// Pull `choices[0].message.content` out of a chat-completions reply
pub fn extract_content(response: &Value) -> Result<String, GatewayError> {
    let text = response
        .get("choices")
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("message"))
        .and_then(|v| v.get("content"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| GatewayError::InvalidJson("missing choices[0].message.content".to_string()))?;

    let text = text.trim();
    if text.is_empty() {
        return Err(GatewayError::EmptyResponse);
    }
    Ok(text.to_string())
}

// ============================================================================
// Fake backend (testing)
// ============================================================================

/// Scripted backend. Replies are consumed in order; the last one repeats.
pub struct FakeBackend {
    responses: Mutex<Vec<Result<String, GatewayError>>>,
    requests: Mutex<Vec<(String, String)>>,
    delay: Option<Duration>,
}

impl FakeBackend {
    pub fn new(responses: Vec<Result<String, GatewayError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn always_text(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn always_error(error: GatewayError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Sleep before every reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// `(system_prompt, user_text)` of every call so far
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl LlmBackend for FakeBackend {
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String, GatewayError> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((system_prompt.to_string(), user_text.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut responses = self.responses.lock().unwrap_or_else(|p| p.into_inner());
        match responses.len() {
            0 => Err(GatewayError::EmptyResponse),
            1 => responses[0].clone(),
            _ => responses.remove(0),
        }
    }
}

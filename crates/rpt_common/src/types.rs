//! Core value types shared by the pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Roleplay mode of a selection, derived from its leading command token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// `/me`, `/lme` - third-person action grammar
    Action,
    /// `/do`, `/ldo` - descriptive/observational grammar
    Description,
    /// Plain text and any other slash command
    Dialogue,
}

impl Mode {
    /// Mode for a command token (case-insensitive)
    pub fn from_command(token: &str) -> Self {
        match token.to_lowercase().as_str() {
            "/me" | "/lme" => Mode::Action,
            "/do" | "/ldo" => Mode::Description,
            _ => Mode::Dialogue,
        }
    }

    /// Stable name folded into cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Action => "action",
            Mode::Description => "description",
            Mode::Dialogue => "dialogue",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selection split into its command token, mode and translatable body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSelection {
    /// Leading `/word` token, case preserved
    pub command_token: Option<String>,
    pub mode: Mode,
    /// Remainder after the token, trimmed
    pub body: String,
}

impl ParsedSelection {
    /// Rejoin a (translated) body with the original command token
    pub fn assemble(&self, translated_body: &str) -> String {
        match &self.command_token {
            Some(token) => format!("{} {}", token, translated_body),
            None => translated_body.to_string(),
        }
    }
}

/// Result of classifying a selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "selection", rename_all = "snake_case")]
pub enum Classification {
    Translatable(ParsedSelection),
    /// Body is empty after trimming (e.g. a bare `/do`)
    NothingToTranslate(ParsedSelection),
}

impl Classification {
    pub fn selection(&self) -> &ParsedSelection {
        match self {
            Classification::Translatable(s) | Classification::NothingToTranslate(s) => s,
        }
    }

    pub fn is_translatable(&self) -> bool {
        matches!(self, Classification::Translatable(_))
    }
}

/// Why the gateway handed back its input unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassThroughReason {
    EmptyInput,
    MissingCredentials,
    Timeout,
    Transport,
    BadStatus,
    MalformedResponse,
    EmptyResponse,
    /// Backend answered with the input text itself
    Unchanged,
}

impl PassThroughReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassThroughReason::EmptyInput => "empty input",
            PassThroughReason::MissingCredentials => "missing credentials",
            PassThroughReason::Timeout => "timeout",
            PassThroughReason::Transport => "transport error",
            PassThroughReason::BadStatus => "bad status",
            PassThroughReason::MalformedResponse => "malformed response",
            PassThroughReason::EmptyResponse => "empty response",
            PassThroughReason::Unchanged => "unchanged",
        }
    }
}

/// Gateway result: either a real translation or the input passed through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Translation {
    Translated { text: String },
    PassThrough { text: String, reason: PassThroughReason },
}

impl Translation {
    pub fn text(&self) -> &str {
        match self {
            Translation::Translated { text } | Translation::PassThrough { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Translation::Translated { text } | Translation::PassThrough { text, .. } => text,
        }
    }

    pub fn is_translated(&self) -> bool {
        matches!(self, Translation::Translated { .. })
    }
}

/// How a pipeline run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RunStatus {
    /// Selection was empty or whitespace
    EmptyInput,
    /// Command token without a body
    NothingToTranslate,
    CacheHit,
    Translated,
    PassThrough(PassThroughReason),
}

impl RunStatus {
    /// True when the output carries a translation (fresh or cached)
    pub fn produced_translation(&self) -> bool {
        matches!(self, RunStatus::CacheHit | RunStatus::Translated)
    }

    /// True when the run never reached the cache or the gateway
    pub fn is_skipped(&self) -> bool {
        matches!(self, RunStatus::EmptyInput | RunStatus::NothingToTranslate)
    }

    pub fn label(&self) -> String {
        match self {
            RunStatus::EmptyInput => "empty input".to_string(),
            RunStatus::NothingToTranslate => "nothing to translate".to_string(),
            RunStatus::CacheHit => "cache hit".to_string(),
            RunStatus::Translated => "translated".to_string(),
            RunStatus::PassThrough(reason) => format!("pass-through ({})", reason.as_str()),
        }
    }
}

/// Final text for the output collaborator plus how it was obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub output: String,
    pub status: RunStatus,
}

/// One translation history record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub original_text: String,
    pub result_text: String,
    pub style: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_command_is_case_insensitive() {
        assert_eq!(Mode::from_command("/ME"), Mode::Action);
        assert_eq!(Mode::from_command("/Lme"), Mode::Action);
        assert_eq!(Mode::from_command("/DO"), Mode::Description);
        assert_eq!(Mode::from_command("/ldo"), Mode::Description);
        assert_eq!(Mode::from_command("/shout"), Mode::Dialogue);
    }

    #[test]
    fn test_assemble_keeps_command_token() {
        let parsed = ParsedSelection {
            command_token: Some("/Me".to_string()),
            mode: Mode::Action,
            body: "lari".to_string(),
        };
        assert_eq!(parsed.assemble("runs"), "/Me runs");

        let plain = ParsedSelection {
            command_token: None,
            mode: Mode::Dialogue,
            body: "halo".to_string(),
        };
        assert_eq!(plain.assemble("hello"), "hello");
    }

    #[test]
    fn test_run_status_serializes_with_reason() {
        let status = RunStatus::PassThrough(PassThroughReason::Timeout);
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#"{"status":"pass_through","reason":"timeout"}"#);

        let back: RunStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }

    #[test]
    fn test_run_status_flags() {
        assert!(RunStatus::CacheHit.produced_translation());
        assert!(RunStatus::Translated.produced_translation());
        assert!(!RunStatus::PassThrough(PassThroughReason::Unchanged).produced_translation());
        assert!(RunStatus::NothingToTranslate.is_skipped());
        assert!(!RunStatus::CacheHit.is_skipped());
    }
}

//! RP Translator configuration
//!
//! Lives in `$XDG_CONFIG_HOME/rpt/config.toml` (see `paths::config_path`).
//! Every field has a default, so a partial or missing file is fine.

use crate::gate::GatePolicy;
use crate::orchestrator::PipelineSettings;
use crate::paths;
use crate::prompts::PromptSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, warn};

/// Environment variable consulted when `llm.api_key` is empty
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Translation backend settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Empty means "use $OPENAI_API_KEY"
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout (seconds, valid: 1-60)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn effective_timeout_secs(&self) -> u64 {
        self.timeout_secs.clamp(1, 60)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.effective_timeout_secs())
    }

    /// Configured key, else `$OPENAI_API_KEY`, else nothing
    pub fn resolved_api_key(&self) -> Option<String> {
        let configured = self.api_key.trim();
        if !configured.is_empty() {
            return Some(configured.to_string());
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Empty means `$XDG_DATA_HOME/rpt/rp_translator.db`
    #[serde(default)]
    pub db_path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: String::new(),
        }
    }
}

impl CacheConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        non_empty_path(&self.db_path).unwrap_or_else(paths::default_db_path)
    }
}

/// Optional prompt override files, one per mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptsConfig {
    #[serde(default)]
    pub action_file: String,
    #[serde(default)]
    pub description_file: String,
    #[serde(default)]
    pub dialogue_file: String,
}

impl PromptsConfig {
    pub fn load_prompts(&self) -> PromptSet {
        PromptSet::load(
            non_empty_path(&self.action_file).as_deref(),
            non_empty_path(&self.description_file).as_deref(),
            non_empty_path(&self.dialogue_file).as_deref(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Translate multi-line selections one line at a time
    #[serde(default)]
    pub split_lines: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub policy: GatePolicy,
}

/// Pauses around the simulated copy and paste keystrokes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardConfig {
    #[serde(default = "default_delay_ms")]
    pub copy_delay_ms: u64,

    #[serde(default = "default_delay_ms")]
    pub paste_delay_ms: u64,
}

fn default_delay_ms() -> u64 {
    100
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            copy_delay_ms: default_delay_ms(),
            paste_delay_ms: default_delay_ms(),
        }
    }
}

impl ClipboardConfig {
    pub fn copy_delay(&self) -> Duration {
        Duration::from_millis(self.copy_delay_ms)
    }

    pub fn paste_delay(&self) -> Duration {
        Duration::from_millis(self.paste_delay_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Empty means `$XDG_RUNTIME_DIR/rpt/rptd.sock`
    #[serde(default)]
    pub socket_path: String,
}

impl DaemonConfig {
    pub fn resolved_socket_path(&self) -> PathBuf {
        non_empty_path(&self.socket_path).unwrap_or_else(paths::default_socket_path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Complete configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RptConfig {
    /// Tone of the translation: strict, street, broken, or anything else
    #[serde(default = "default_style")]
    pub style: String,

    /// Whether triggers translate at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub prompts: PromptsConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub clipboard: ClipboardConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub log: LogConfig,
}

fn default_style() -> String {
    "strict".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RptConfig {
    fn default() -> Self {
        Self {
            style: default_style(),
            enabled: true,
            llm: LlmConfig::default(),
            cache: CacheConfig::default(),
            prompts: PromptsConfig::default(),
            pipeline: PipelineConfig::default(),
            gate: GateConfig::default(),
            clipboard: ClipboardConfig::default(),
            daemon: DaemonConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl RptConfig {
    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!("[CONFIG] {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load for a process that writes settings back.
    ///
    /// The returned path is `None` when the file exists but could not be
    /// loaded: the defaults in use must never replace it.
    pub fn load_for_update(path: &Path) -> (Self, Option<PathBuf>) {
        match Self::load_from(path) {
            Ok(config) => (config, Some(path.to_path_buf())),
            Err(e) => {
                error!(
                    "[CONFIG] {} - using defaults, setting changes will not be saved",
                    e
                );
                (Self::default(), None)
            }
        }
    }

    /// Write to `path` via a temp file and rename
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = toml::to_string_pretty(self)?;

        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, content).map_err(write_err)?;
        fs::rename(&tmp, path).map_err(write_err)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings::new(self.style.clone()).with_split_lines(self.pipeline.split_lines)
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

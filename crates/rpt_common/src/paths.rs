//! Path helpers for RP Translator
//!
//! Priority for each location:
//! 1. explicit environment override (`RPT_CONFIG`, `RPT_SOCKET`)
//! 2. XDG directory via `dirs`
//! 3. a per-user directory under the system temp dir

use std::path::PathBuf;

/// Subdirectory used under every XDG base directory
pub const APP_DIR: &str = "rpt";

pub const CONFIG_FILE: &str = "config.toml";
pub const DB_FILE: &str = "rp_translator.db";
pub const SOCKET_FILE: &str = "rptd.sock";

pub const CONFIG_ENV: &str = "RPT_CONFIG";
pub const SOCKET_ENV: &str = "RPT_SOCKET";

/// `$XDG_CONFIG_HOME/rpt/config.toml` unless `$RPT_CONFIG` is set
pub fn config_path() -> PathBuf {
    if let Some(path) = env_path(CONFIG_ENV) {
        return path;
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(fallback_dir)
        .join(CONFIG_FILE)
}

/// `$XDG_DATA_HOME/rpt/rp_translator.db`
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(fallback_dir)
        .join(DB_FILE)
}

/// `$XDG_RUNTIME_DIR/rpt/rptd.sock` unless `$RPT_SOCKET` is set
pub fn default_socket_path() -> PathBuf {
    if let Some(path) = env_path(SOCKET_ENV) {
        return path;
    }
    dirs::runtime_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(fallback_dir)
        .join(SOCKET_FILE)
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// /tmp/rpt-$USER
fn fallback_dir() -> PathBuf {
    let user = std::env::var("USER").unwrap_or_else(|_| "user".to_string());
    std::env::temp_dir().join(format!("{}-{}", APP_DIR, user))
}

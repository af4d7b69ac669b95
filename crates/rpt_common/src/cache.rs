//! Translation Cache
//!
//! Content-addressed store for translated bodies plus an append-only
//! history log. The cache only ever saves latency and API cost: every
//! `CacheStore` method is fail-open, so a broken or missing database turns
//! into cache misses and skipped log records, never into pipeline errors.
//!
//! Schema (SQLite):
//! - cache: hash -> translated body
//! - logs:  time, original selection, final output, style

use crate::types::{LogRecord, Mode};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Deterministic digest of `(style, mode, body)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Each component is length-prefixed so `("a::b", "c")` and
    /// `("a", "b::c")` never share a key.
    pub fn derive(style: &str, mode: Mode, body: &str) -> Self {
        let mut hasher = Sha256::new();
        for part in [style, mode.as_str(), body] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage-layer failures (only surfaced by the fallible `try_*` API)
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Key-value translation cache with an event log
pub trait CacheStore: Send + Sync {
    /// Cached body for `key`; storage failures read as a miss
    fn get(&self, key: &CacheKey) -> Option<String>;

    /// Upsert; failures are logged and swallowed
    fn set(&self, key: &CacheKey, value: &str);

    /// Best-effort history append
    fn append_log(&self, original_text: &str, result_text: &str, style: &str);

    /// Drop every cache entry. The history log is kept.
    fn clear(&self);

    /// Newest history records first
    fn recent_logs(&self, limit: usize) -> Vec<LogRecord>;

    /// Number of cached entries, `None` if unknown
    fn entry_count(&self) -> Option<usize>;
}

// ============================================================================
// SQLite store
// ============================================================================

/// SQLite-backed cache shared across worker threads
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteCacheStore {
    /// Open or create the store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init_schema(&conn)?;

        debug!("[CACHE] Opened {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    /// In-memory database (tests, throwaway runs)
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), CacheError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache (
                hash TEXT PRIMARY KEY,
                result TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                time TEXT NOT NULL,
                original TEXT NOT NULL,
                result TEXT NOT NULL,
                style TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_logs_time ON logs(time);
            "#,
        )?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    // A panic while holding the lock cannot leave a half-written row behind,
    // so a poisoned connection is still usable.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn try_get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let conn = self.lock();
        let value = conn
            .query_row(
                "SELECT result FROM cache WHERE hash = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn try_set(&self, key: &CacheKey, value: &str) -> Result<(), CacheError> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO cache (hash, result) VALUES (?1, ?2)",
            params![key.as_str(), value],
        )?;
        Ok(())
    }

    pub fn try_append_log(
        &self,
        original_text: &str,
        result_text: &str,
        style: &str,
    ) -> Result<(), CacheError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO logs (time, original, result, style) VALUES (?1, ?2, ?3, ?4)",
            params![Utc::now().to_rfc3339(), original_text, result_text, style],
        )?;
        Ok(())
    }

    pub fn try_clear(&self) -> Result<usize, CacheError> {
        let conn = self.lock();
        Ok(conn.execute("DELETE FROM cache", [])?)
    }

    pub fn try_recent_logs(&self, limit: usize) -> Result<Vec<LogRecord>, CacheError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT time, original, result, style FROM logs ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (time, original_text, result_text, style) = row?;
            let timestamp = match DateTime::parse_from_rfc3339(&time) {
                Ok(t) => t.with_timezone(&Utc),
                Err(e) => {
                    warn!("[CACHE] Skipping log row with bad timestamp {:?}: {}", time, e);
                    continue;
                }
            };
            records.push(LogRecord {
                timestamp,
                original_text,
                result_text,
                style,
            });
        }
        Ok(records)
    }

    pub fn try_entry_count(&self) -> Result<usize, CacheError> {
        let conn = self.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl CacheStore for SqliteCacheStore {
    fn get(&self, key: &CacheKey) -> Option<String> {
        self.try_get(key).unwrap_or_else(|e| {
            warn!("[CACHE] Lookup failed, treating as miss: {}", e);
            None
        })
    }

    fn set(&self, key: &CacheKey, value: &str) {
        if let Err(e) = self.try_set(key, value) {
            warn!("[CACHE] Write failed: {}", e);
        }
    }

    fn append_log(&self, original_text: &str, result_text: &str, style: &str) {
        if let Err(e) = self.try_append_log(original_text, result_text, style) {
            warn!("[CACHE] Log append failed: {}", e);
        }
    }

    fn clear(&self) {
        match self.try_clear() {
            Ok(removed) => debug!("[CACHE] Cleared {} entries", removed),
            Err(e) => warn!("[CACHE] Clear failed: {}", e),
        }
    }

    fn recent_logs(&self, limit: usize) -> Vec<LogRecord> {
        self.try_recent_logs(limit).unwrap_or_else(|e| {
            warn!("[CACHE] Reading logs failed: {}", e);
            Vec::new()
        })
    }

    fn entry_count(&self) -> Option<usize> {
        self.try_entry_count()
            .map_err(|e| warn!("[CACHE] Counting entries failed: {}", e))
            .ok()
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// HashMap-backed store for tests and one-shot CLI runs
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<CacheKey, String>>,
    logs: Mutex<Vec<LogRecord>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All log records, oldest first
    pub fn logs(&self) -> Vec<LogRecord> {
        self.logs.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains_key(key)
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &CacheKey) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &CacheKey, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.clone(), value.to_string());
    }

    fn append_log(&self, original_text: &str, result_text: &str, style: &str) {
        self.logs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(LogRecord {
                timestamp: Utc::now(),
                original_text: original_text.to_string(),
                result_text: result_text.to_string(),
                style: style.to_string(),
            });
    }

    fn clear(&self) {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    fn recent_logs(&self, limit: usize) -> Vec<LogRecord> {
        let logs = self.logs.lock().unwrap_or_else(|p| p.into_inner());
        logs.iter().rev().take(limit).cloned().collect()
    }

    fn entry_count(&self) -> Option<usize> {
        Some(self.entries.lock().unwrap_or_else(|p| p.into_inner()).len())
    }
}

// ============================================================================
// Disabled store
// ============================================================================

/// Used when caching is disabled or the database cannot be opened
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCacheStore;

impl CacheStore for NullCacheStore {
    fn get(&self, _key: &CacheKey) -> Option<String> {
        None
    }

    fn set(&self, _key: &CacheKey, _value: &str) {}

    fn append_log(&self, _original_text: &str, _result_text: &str, _style: &str) {}

    fn clear(&self) {}

    fn recent_logs(&self, _limit: usize) -> Vec<LogRecord> {
        Vec::new()
    }

    fn entry_count(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_store() -> (SqliteCacheStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = SqliteCacheStore::open(dir.path().join("cache.db")).unwrap();
        (store, dir)
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = CacheKey::derive("strict", Mode::Dialogue, "hello there");
        let b = CacheKey::derive("strict", Mode::Dialogue, "hello there");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_key_changes_with_each_component() {
        let base = CacheKey::derive("strict", Mode::Dialogue, "hello");
        assert_ne!(base, CacheKey::derive("street", Mode::Dialogue, "hello"));
        assert_ne!(base, CacheKey::derive("strict", Mode::Action, "hello"));
        assert_ne!(base, CacheKey::derive("strict", Mode::Description, "hello"));
        assert_ne!(base, CacheKey::derive("strict", Mode::Dialogue, "hello!"));
    }

    #[test]
    fn test_key_components_do_not_alias() {
        let a = CacheKey::derive("a::b", Mode::Dialogue, "c");
        let b = CacheKey::derive("a", Mode::Dialogue, "b::c");
        assert_ne!(a, b);
    }

    #[test]
    fn test_sqlite_round_trip() {
        let (store, _dir) = test_store();
        let key = CacheKey::derive("strict", Mode::Dialogue, "halo");

        assert_eq!(store.get(&key), None);
        store.set(&key, "hello");
        assert_eq!(store.get(&key), Some("hello".to_string()));

        // Overwrite replaces the whole value
        store.set(&key, "hi");
        assert_eq!(store.get(&key), Some("hi".to_string()));
        assert_eq!(store.entry_count(), Some(1));
    }

    #[test]
    fn test_sqlite_clear_keeps_logs() {
        let (store, _dir) = test_store();
        let key = CacheKey::derive("strict", Mode::Action, "lari");
        store.set(&key, "runs");
        store.append_log("/me lari", "/me runs", "strict");

        store.clear();

        assert_eq!(store.get(&key), None);
        assert_eq!(store.entry_count(), Some(0));
        let logs = store.recent_logs(10);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].original_text, "/me lari");
        assert_eq!(logs[0].result_text, "/me runs");
        assert_eq!(logs[0].style, "strict");
    }

    #[test]
    fn test_sqlite_recent_logs_newest_first() {
        let (store, _dir) = test_store();
        store.append_log("satu", "one", "strict");
        store.append_log("dua", "two", "street");
        store.append_log("tiga", "three", "broken");

        let logs = store.recent_logs(2);
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].original_text, "tiga");
        assert_eq!(logs[1].original_text, "dua");
    }

    #[test]
    fn test_sqlite_recent_logs_skip_bad_timestamps() {
        let (store, _dir) = test_store();
        store.append_log("satu", "one", "strict");
        store
            .lock()
            .execute(
                "INSERT INTO logs (time, original, result, style) VALUES ('yesterday', 'dua', 'two', 'strict')",
                [],
            )
            .unwrap();
        store.append_log("tiga", "three", "strict");

        let logs = store.recent_logs(10);
        let originals: Vec<&str> = logs.iter().map(|r| r.original_text.as_str()).collect();
        assert_eq!(originals, vec!["tiga", "satu"]);
    }

    #[test]
    fn test_sqlite_failures_degrade_to_miss() {
        let (store, dir) = test_store();
        let key = CacheKey::derive("strict", Mode::Dialogue, "halo");
        store.set(&key, "hello");

        let other = Connection::open(dir.path().join("cache.db")).unwrap();
        other
            .execute_batch("DROP TABLE cache; DROP TABLE logs;")
            .unwrap();

        assert_eq!(store.get(&key), None);
        store.set(&key, "hello");
        store.append_log("halo", "hello", "strict");
        store.clear();
        assert!(store.recent_logs(5).is_empty());
        assert_eq!(store.entry_count(), None);
    }

    #[test]
    fn test_sqlite_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.db");
        let key = CacheKey::derive("strict", Mode::Dialogue, "halo");

        {
            let store = SqliteCacheStore::open(&path).unwrap();
            store.set(&key, "hello");
        }

        let store = SqliteCacheStore::open(&path).unwrap();
        assert_eq!(store.get(&key), Some("hello".to_string()));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryCacheStore::new();
        let key = CacheKey::derive("strict", Mode::Dialogue, "halo");
        store.set(&key, "hello");
        assert_eq!(store.get(&key), Some("hello".to_string()));
        assert!(store.contains(&key));

        store.append_log("halo", "hello", "strict");
        store.clear();
        assert_eq!(store.get(&key), None);
        assert_eq!(store.logs().len(), 1);
    }

    #[test]
    fn test_null_store_always_misses() {
        let store = NullCacheStore;
        let key = CacheKey::derive("strict", Mode::Dialogue, "halo");
        store.set(&key, "hello");
        assert_eq!(store.get(&key), None);
        assert!(store.recent_logs(5).is_empty());
        assert_eq!(store.entry_count(), None);
    }
}

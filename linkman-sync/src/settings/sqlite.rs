//! SQLite settings store: a single `settings(key, value)` table holding
//! JSON-encoded values.

use super::SettingsBackend;
use crate::error::{SyncError, SyncResult};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

/// Persistent settings store backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteSettings {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSettings {
    /// Opens (or creates) a settings store at the given path.
    pub fn open(path: &str) -> SyncResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| SyncError::Storage(format!("failed to open settings store: {e}")))?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory settings store (for testing).
    pub fn open_in_memory() -> SyncResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            SyncError::Storage(format!("failed to open in-memory settings store: {e}"))
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> SyncResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .map_err(|e| SyncError::Storage(format!("failed to init settings schema: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> SyncResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SyncError::Storage("settings store lock poisoned".to_string()))
    }
}

impl SettingsBackend for SqliteSettings {
    fn get(&self, key: &str) -> SyncResult<Option<Value>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(SyncError::from)
    }

    fn set(&self, key: &str, value: Value) -> SyncResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value.to_string()],
        )?;
        Ok(())
    }
}

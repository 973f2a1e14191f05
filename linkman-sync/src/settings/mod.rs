//! Settings gateway.
//!
//! Settings live in an opaque key-value store ([`SettingsBackend`]). The
//! gateway reads a fresh [`Settings`] snapshot on every call and broadcasts
//! a [`SettingsChanged`] event after every write, which the scheduler
//! consumes to start or stop the periodic mirror.

mod sqlite;

pub use sqlite::SqliteSettings;

use crate::error::{SyncError, SyncResult};
use linkman_types::{SettingKey, Settings, SettingsPatch};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;

/// Capacity of the change channel. Slow subscribers skip older events.
const EVENT_CAPACITY: usize = 16;

/// A JSON-valued key-value store for settings.
pub trait SettingsBackend: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> SyncResult<Option<Value>>;

    /// Stores `value` under `key`.
    fn set(&self, key: &str, value: Value) -> SyncResult<()>;
}

/// Emitted after every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsChanged {
    /// The full snapshot after the write.
    pub settings: Settings,
    /// Keys the write touched.
    pub changed: Vec<SettingKey>,
}

impl SettingsChanged {
    /// Returns true if the write touched `key`.
    pub fn touched(&self, key: SettingKey) -> bool {
        self.changed.contains(&key)
    }
}

/// Reads and writes settings and publishes change notifications.
#[derive(Clone)]
pub struct SettingsGateway {
    backend: Arc<dyn SettingsBackend>,
    events: broadcast::Sender<SettingsChanged>,
}

impl SettingsGateway {
    pub fn new(backend: Arc<dyn SettingsBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { backend, events }
    }

    /// A gateway over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySettings::default()))
    }

    /// Returns the latest persisted snapshot. Missing keys take their
    /// defaults.
    pub fn read(&self) -> SyncResult<Settings> {
        read_snapshot(self.backend.as_ref())
    }

    /// The store behind this gateway. Holding it does not keep the change
    /// channel open.
    pub(crate) fn backend(&self) -> Arc<dyn SettingsBackend> {
        Arc::clone(&self.backend)
    }

    /// Persists the fields set in `patch` and notifies subscribers.
    /// Returns the snapshot after the write.
    pub fn write(&self, patch: SettingsPatch) -> SyncResult<Settings> {
        if let Some(url) = &patch.backend_url {
            self.backend
                .set(SettingKey::BackendUrl.as_str(), Value::from(url.as_str()))?;
        }
        if let Some(key) = &patch.api_key {
            self.backend
                .set(SettingKey::ApiKey.as_str(), Value::from(key.as_str()))?;
        }
        if let Some(enabled) = patch.auto_sync {
            self.backend
                .set(SettingKey::AutoSync.as_str(), Value::from(enabled))?;
        }
        if let Some(headers) = &patch.extra_headers {
            self.backend
                .set(SettingKey::ExtraHeaders.as_str(), serde_json::to_value(headers)?)?;
        }

        let settings = self.read()?;
        let changed = patch.keys();
        if !changed.is_empty() {
            debug!("Settings changed: {:?}", changed);
            // No subscribers is fine.
            let _ = self.events.send(SettingsChanged {
                settings: settings.clone(),
                changed,
            });
        }
        Ok(settings)
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SettingsChanged> {
        self.events.subscribe()
    }
}

/// Builds a snapshot from whatever keys `backend` holds.
pub(crate) fn read_snapshot(backend: &dyn SettingsBackend) -> SyncResult<Settings> {
    let mut settings = Settings::default();
    if let Some(v) = backend.get(SettingKey::BackendUrl.as_str())? {
        settings.backend_url = serde_json::from_value(v)?;
    }
    if let Some(v) = backend.get(SettingKey::ApiKey.as_str())? {
        settings.api_key = serde_json::from_value(v)?;
    }
    if let Some(v) = backend.get(SettingKey::AutoSync.as_str())? {
        settings.auto_sync = serde_json::from_value(v)?;
    }
    if let Some(v) = backend.get(SettingKey::ExtraHeaders.as_str())? {
        settings.extra_headers = serde_json::from_value(v)?;
    }
    Ok(settings)
}

/// In-memory settings store.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, Value>>,
}

impl SettingsBackend for MemorySettings {
    fn get(&self, key: &str) -> SyncResult<Option<Value>> {
        let values = self
            .values
            .lock()
            .map_err(|_| SyncError::Storage("settings lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> SyncResult<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| SyncError::Storage("settings lock poisoned".to_string()))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

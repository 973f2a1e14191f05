//! Sync settings.
//!
//! Settings live in an external key-value store. The engine reads a fresh
//! [`Settings`] snapshot at the start of every operation and never caches
//! it, so edits made while a run is in flight apply to the next run.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A static header sent with every request to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraHeader {
    pub key: String,
    pub value: String,
}

impl ExtraHeader {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parses `Key: Value`. Surrounding whitespace is trimmed from both halves.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let (key, value) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidHeader(format!("expected KEY:VALUE, got {s:?}")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidHeader(format!("empty header name in {s:?}")));
        }
        Ok(Self::new(key, value.trim()))
    }
}

/// The persisted keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    BackendUrl,
    ApiKey,
    AutoSync,
    ExtraHeaders,
}

impl SettingKey {
    pub const ALL: [SettingKey; 4] = [
        SettingKey::BackendUrl,
        SettingKey::ApiKey,
        SettingKey::AutoSync,
        SettingKey::ExtraHeaders,
    ];

    /// Key name in the backing store.
    pub const fn as_str(self) -> &'static str {
        match self {
            SettingKey::BackendUrl => "backendUrl",
            SettingKey::ApiKey => "apiKey",
            SettingKey::AutoSync => "autoSync",
            SettingKey::ExtraHeaders => "extraHeaders",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A snapshot of all settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Base URL of the remote service. Empty means unset.
    pub backend_url: String,
    pub api_key: String,
    /// Whether the periodic mirror is enabled.
    pub auto_sync: bool,
    pub extra_headers: Vec<ExtraHeader>,
}

impl Settings {
    /// The configured base URL without a trailing slash, or `None` when unset.
    pub fn backend_url(&self) -> Option<&str> {
        let url = self.backend_url.trim().trim_end_matches('/');
        if url.is_empty() { None } else { Some(url) }
    }
}

/// A partial update. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub backend_url: Option<String>,
    pub api_key: Option<String>,
    pub auto_sync: Option<bool>,
    pub extra_headers: Option<Vec<ExtraHeader>>,
}

impl SettingsPatch {
    #[must_use]
    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn auto_sync(mut self, enabled: bool) -> Self {
        self.auto_sync = Some(enabled);
        self
    }

    #[must_use]
    pub fn extra_headers(mut self, headers: Vec<ExtraHeader>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Keys this patch touches, in [`SettingKey::ALL`] order.
    pub fn keys(&self) -> Vec<SettingKey> {
        SettingKey::ALL
            .into_iter()
            .filter(|key| match key {
                SettingKey::BackendUrl => self.backend_url.is_some(),
                SettingKey::ApiKey => self.api_key.is_some(),
                SettingKey::AutoSync => self.auto_sync.is_some(),
                SettingKey::ExtraHeaders => self.extra_headers.is_some(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

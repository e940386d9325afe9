//! Session configuration.
//!
//! `QueueConfig` is built in Rust (`QueueConfig::new` plus field updates) or
//! parsed from the camelCase JSON option object the page passes to `init`.
//! Function-valued options (dynamic popup content, custom event handlers)
//! only exist on the Rust side; the browser facade attaches them after
//! parsing.
//!
//! ERROR HANDLING
//! ==============
//! [`QueueConfig::validate`] is the only fatal check in the SDK. It runs
//! before any side effect so a rejected `init` leaves the page untouched.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::net::api::{channel_endpoint, trim_base};
use crate::state::machine::Cadence;
use crate::state::registry::EventHandler;
use crate::util::locale::Locale;
use crate::util::overlay::PopupContent;
use crate::util::storage::StorageArea;

/// Default WAITING re-announce cadence.
pub const DEFAULT_REANNOUNCE_MS: u32 = 1000;
/// Default ACTIVE heartbeat cadence.
pub const DEFAULT_HEARTBEAT_MS: u32 = 30_000;

/// Configuration defects that make `init` fail.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("backend URL is required")]
    MissingBackendUrl,
    #[error("invalid {field}: {url}")]
    InvalidUrl { field: &'static str, url: String },
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
    #[error("maxReannounceMs ({cap}) is below reannounceMs ({base})")]
    CapBelowBase { base: u32, cap: u32 },
    #[error("invalid config object: {0}")]
    Parse(String),
}

/// Everything one `init` needs.
#[derive(Clone)]
pub struct QueueConfig {
    /// REST base for `join` and `status`. Required.
    pub backend_url: String,
    /// Realtime channel URL; derived from `backend_url` when absent.
    pub channel_url: Option<String>,
    /// Target of the best-effort leave notice; no notice is sent when absent.
    pub leave_url: Option<String>,
    /// Identity/session parameters forwarded verbatim to every call.
    pub params: BTreeMap<String, String>,
    /// Key the identity is persisted under; nothing is persisted when absent.
    pub storage_key: Option<String>,
    pub storage_area: StorageArea,
    /// Base WAITING re-announce interval.
    pub reannounce_ms: u32,
    /// Upper bound for the position-adjusted re-announce interval.
    pub max_reannounce_ms: Option<u32>,
    /// ACTIVE heartbeat interval.
    pub heartbeat_ms: u32,
    /// Overlay markup override.
    pub content: Option<PopupContent>,
    /// Overlay style override.
    pub style: Option<String>,
    pub locale: Locale,
    /// Custom channel events, keyed by event name.
    pub handlers: BTreeMap<String, EventHandler>,
}

impl std::fmt::Debug for QueueConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueConfig")
            .field("backend_url", &self.backend_url)
            .field("channel_url", &self.channel_url)
            .field("leave_url", &self.leave_url)
            .field("params", &self.params)
            .field("storage_key", &self.storage_key)
            .field("storage_area", &self.storage_area)
            .field("reannounce_ms", &self.reannounce_ms)
            .field("max_reannounce_ms", &self.max_reannounce_ms)
            .field("heartbeat_ms", &self.heartbeat_ms)
            .field("content", &self.content)
            .field("style", &self.style)
            .field("locale", &self.locale)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawConfig {
    backend_url: Option<String>,
    channel_url: Option<String>,
    leave_url: Option<String>,
    params: BTreeMap<String, Value>,
    storage_key: Option<String>,
    storage_area: StorageArea,
    reannounce_ms: Option<u32>,
    max_reannounce_ms: Option<u32>,
    heartbeat_ms: Option<u32>,
    content: Option<String>,
    style: Option<String>,
    locale: Locale,
}

impl QueueConfig {
    /// Defaults around a backend URL.
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            channel_url: None,
            leave_url: None,
            params: BTreeMap::new(),
            storage_key: None,
            storage_area: StorageArea::default(),
            reannounce_ms: DEFAULT_REANNOUNCE_MS,
            max_reannounce_ms: None,
            heartbeat_ms: DEFAULT_HEARTBEAT_MS,
            content: None,
            style: None,
            locale: Locale::default(),
            handlers: BTreeMap::new(),
        }
    }

    /// Parse the camelCase JSON option object.
    ///
    /// Non-string `params` values are forwarded as their JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or mistyped fields.
    /// Semantic checks are left to [`QueueConfig::validate`].
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::new(raw.backend_url.unwrap_or_default());
        config.channel_url = raw.channel_url;
        config.leave_url = raw.leave_url;
        config.params = raw
            .params
            .into_iter()
            .map(|(k, v)| match v {
                Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect();
        config.storage_key = raw.storage_key.filter(|k| !k.is_empty());
        config.storage_area = raw.storage_area;
        config.reannounce_ms = raw.reannounce_ms.unwrap_or(DEFAULT_REANNOUNCE_MS);
        config.max_reannounce_ms = raw.max_reannounce_ms;
        config.heartbeat_ms = raw.heartbeat_ms.unwrap_or(DEFAULT_HEARTBEAT_MS);
        config.content = raw.content.map(PopupContent::Static);
        config.style = raw.style;
        config.locale = raw.locale;
        Ok(config)
    }

    /// Check required fields and interval sanity.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let backend = self.backend_url.trim();
        if backend.is_empty() {
            return Err(ConfigError::MissingBackendUrl);
        }
        if !is_http_url(backend) {
            return Err(ConfigError::InvalidUrl { field: "backendUrl", url: self.backend_url.clone() });
        }
        if let Some(url) = &self.channel_url
            && !(url.starts_with("ws://") || url.starts_with("wss://"))
        {
            return Err(ConfigError::InvalidUrl { field: "channelUrl", url: url.clone() });
        }
        if let Some(url) = &self.leave_url
            && !is_http_url(url)
        {
            return Err(ConfigError::InvalidUrl { field: "leaveUrl", url: url.clone() });
        }
        if self.reannounce_ms == 0 {
            return Err(ConfigError::ZeroInterval("reannounceMs"));
        }
        if self.heartbeat_ms == 0 {
            return Err(ConfigError::ZeroInterval("heartbeatMs"));
        }
        if let Some(cap) = self.max_reannounce_ms
            && cap < self.reannounce_ms
        {
            return Err(ConfigError::CapBelowBase { base: self.reannounce_ms, cap });
        }
        Ok(())
    }

    /// Timer cadences for the state machine.
    #[must_use]
    pub fn cadence(&self) -> Cadence {
        Cadence { base_ms: self.reannounce_ms, cap_ms: self.max_reannounce_ms, heartbeat_ms: self.heartbeat_ms }
    }

    /// Make same-origin path URLs absolute against `origin`
    /// (`https://shop.example.com`), so the derived channel URL gets a
    /// `ws(s)://` scheme too.
    pub fn resolve_against(&mut self, origin: &str) {
        let origin = trim_base(origin);
        for url in std::iter::once(&mut self.backend_url).chain(self.leave_url.as_mut()) {
            if is_same_origin_path(url) {
                *url = format!("{origin}{url}");
            }
        }
    }

    /// Channel URL to connect to. Relative until [`QueueConfig::resolve_against`]
    /// has run on a same-origin `backend_url`.
    #[must_use]
    pub fn channel_target(&self) -> String {
        self.channel_url
            .clone()
            .unwrap_or_else(|| channel_endpoint(&self.backend_url))
    }
}

/// Absolute `http(s)` URL or a same-origin absolute path.
fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://") || is_same_origin_path(url)
}

fn is_same_origin_path(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//")
}

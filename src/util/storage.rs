//! Key/value persistence for the queue identity.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session only ever stores one string (the backend-assigned uuid) under
//! a configured key so a reload can rejoin the same slot. Browser storage
//! access is best-effort: quota or privacy-mode failures degrade to "nothing
//! stored" rather than an error.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::cell::RefCell;
use std::collections::HashMap;

use serde::Deserialize;

/// String storage under named keys.
pub trait Storage {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;
    /// Store `value` under `key`.
    fn set(&self, key: &str, value: &str);
    /// Remove whatever is stored under `key`.
    fn remove(&self, key: &str);
}

/// Browser storage area the identity is persisted in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
    /// `window.sessionStorage`: survives reloads of this tab only.
    #[default]
    Session,
    /// `window.localStorage`: shared across tabs.
    Local,
}

/// In-process storage used off-browser and in tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.borrow_mut().insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

/// `sessionStorage`/`localStorage` of the current window.
#[cfg(feature = "browser")]
#[derive(Clone, Copy, Debug)]
pub struct WebStorage {
    area: StorageArea,
}

#[cfg(feature = "browser")]
impl WebStorage {
    /// Storage backed by `area`.
    #[must_use]
    pub fn new(area: StorageArea) -> Self {
        Self { area }
    }

    fn handle(self) -> Option<web_sys::Storage> {
        let window = web_sys::window()?;
        let storage = match self.area {
            StorageArea::Session => window.session_storage(),
            StorageArea::Local => window.local_storage(),
        };
        match storage {
            Ok(storage) => storage,
            Err(err) => {
                log::warn!("waitroom: storage unavailable: {err:?}");
                None
            }
        }
    }
}

#[cfg(feature = "browser")]
impl Storage for WebStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.handle()?.get_item(key).unwrap_or_default()
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(storage) = self.handle()
            && let Err(err) = storage.set_item(key, value)
        {
            log::warn!("waitroom: failed to persist {key}: {err:?}");
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = self.handle()
            && let Err(err) = storage.remove_item(key)
        {
            log::warn!("waitroom: failed to remove {key}: {err:?}");
        }
    }
}

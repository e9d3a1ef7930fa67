use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::ports::{PortError, StoragePort};

/// Typed JSON view over a [`StoragePort`], scoped by a key prefix.
#[derive(Clone)]
pub struct JsonStorage {
    inner: Arc<dyn StoragePort>,
    prefix: String,
}

impl std::fmt::Debug for JsonStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStorage")
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl JsonStorage {
    pub fn new(inner: Arc<dyn StoragePort>, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    pub fn scoped(&self, suffix: &str) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            prefix: format!("{}{suffix}", self.prefix),
        }
    }

    pub fn raw(&self) -> &Arc<dyn StoragePort> {
        &self.inner
    }

    fn key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PortError> {
        let full = self.key(key);
        match self.inner.get_item(&full)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| PortError::Storage(format!("decode {full} failed: {e}"))),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), PortError> {
        let full = self.key(key);
        let raw = serde_json::to_string(value)
            .map_err(|e| PortError::Storage(format!("encode {full} failed: {e}")))?;
        self.inner.set_item(&full, &raw)
    }

    pub fn remove(&self, key: &str) -> Result<(), PortError> {
        self.inner.remove_item(&self.key(key))
    }
}

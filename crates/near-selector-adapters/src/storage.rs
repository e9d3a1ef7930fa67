use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use near_selector_core::{PortError, StoragePort};

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<Mutex<BTreeMap<String, String>>>,
}

impl StoragePort for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, PortError> {
        let g = self
            .items
            .lock()
            .map_err(|e| PortError::Transport(format!("storage lock poisoned: {e}")))?;
        Ok(g.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), PortError> {
        let mut g = self
            .items
            .lock()
            .map_err(|e| PortError::Transport(format!("storage lock poisoned: {e}")))?;
        g.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), PortError> {
        let mut g = self
            .items
            .lock()
            .map_err(|e| PortError::Transport(format!("storage lock poisoned: {e}")))?;
        g.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, PortError> {
        let g = self
            .items
            .lock()
            .map_err(|e| PortError::Transport(format!("storage lock poisoned: {e}")))?;
        Ok(g.keys().cloned().collect())
    }
}

/// `localStorage` replacement for native hosts: one JSON object per file,
/// rewritten through a temp file and rename on every mutation.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    items: Arc<Mutex<BTreeMap<String, String>>>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PortError> {
        let path = path.into();
        let items = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                PortError::Storage(format!("invalid storage file {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(PortError::Storage(format!(
                    "read {} failed: {e}",
                    path.display()
                )))
            }
        };
        Ok(Self {
            path,
            items: Arc::new(Mutex::new(items)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> Result<(), PortError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| PortError::Storage(format!("create storage dir failed: {e}")))?;
            }
        }
        let encoded = serde_json::to_vec_pretty(items)
            .map_err(|e| PortError::Storage(format!("encode storage failed: {e}")))?;
        let tmp = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp)
            .map_err(|e| PortError::Storage(format!("create {} failed: {e}", tmp.display())))?;
        file.write_all(&encoded)
            .and_then(|_| file.sync_all())
            .map_err(|e| PortError::Storage(format!("write {} failed: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| PortError::Storage(format!("rename storage file failed: {e}")))
    }
}

impl StoragePort for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, PortError> {
        let g = self
            .items
            .lock()
            .map_err(|e| PortError::Transport(format!("storage lock poisoned: {e}")))?;
        Ok(g.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), PortError> {
        let mut g = self
            .items
            .lock()
            .map_err(|e| PortError::Transport(format!("storage lock poisoned: {e}")))?;
        let previous = g.insert(key.to_owned(), value.to_owned());
        let persisted = self.persist(&g);
        if persisted.is_err() {
            match previous {
                Some(previous) => g.insert(key.to_owned(), previous),
                None => g.remove(key),
            };
        }
        persisted
    }

    fn remove_item(&self, key: &str) -> Result<(), PortError> {
        let mut g = self
            .items
            .lock()
            .map_err(|e| PortError::Transport(format!("storage lock poisoned: {e}")))?;
        let Some(previous) = g.remove(key) else {
            return Ok(());
        };
        let persisted = self.persist(&g);
        if persisted.is_err() {
            g.insert(key.to_owned(), previous);
        }
        persisted
    }

    fn keys(&self) -> Result<Vec<String>, PortError> {
        let g = self
            .items
            .lock()
            .map_err(|e| PortError::Transport(format!("storage lock poisoned: {e}")))?;
        Ok(g.keys().cloned().collect())
    }
}

#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Default)]
pub struct BrowserStorage;

#[cfg(target_arch = "wasm32")]
impl BrowserStorage {
    fn local_storage(&self) -> Result<web_sys::Storage, PortError> {
        let window =
            web_sys::window().ok_or_else(|| PortError::Transport("missing window".to_owned()))?;
        window
            .local_storage()
            .map_err(|e| PortError::Storage(format!("localStorage unavailable: {e:?}")))?
            .ok_or_else(|| PortError::NotFound("window.localStorage missing".to_owned()))
    }
}

#[cfg(target_arch = "wasm32")]
impl StoragePort for BrowserStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, PortError> {
        self.local_storage()?
            .get_item(key)
            .map_err(|e| PortError::Storage(format!("localStorage.getItem({key}) failed: {e:?}")))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), PortError> {
        self.local_storage()?
            .set_item(key, value)
            .map_err(|e| PortError::Storage(format!("localStorage.setItem({key}) failed: {e:?}")))
    }

    fn remove_item(&self, key: &str) -> Result<(), PortError> {
        self.local_storage()?.remove_item(key).map_err(|e| {
            PortError::Storage(format!("localStorage.removeItem({key}) failed: {e:?}"))
        })
    }

    fn keys(&self) -> Result<Vec<String>, PortError> {
        let storage = self.local_storage()?;
        let len = storage
            .length()
            .map_err(|e| PortError::Storage(format!("localStorage.length failed: {e:?}")))?;
        let mut keys = Vec::with_capacity(len as usize);
        for i in 0..len {
            if let Ok(Some(key)) = storage.key(i) {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

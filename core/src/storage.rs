//! On-device key/value persistence.
//!
//! # Design
//! `Storage` is a string-keyed store with single-key atomicity and
//! last-writer-wins semantics; nothing above it coordinates concurrent
//! writers. `FileStorage` keeps every key in one JSON object file and
//! rewrites it through a temp file on each mutation.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::ApiError;

/// Bearer token for the signed-in user.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Snapshot of the session store, read back at process start.
pub const SESSION_KEY: &str = "persist:session";
/// Last recorded notification permission (JSON `PermissionState`).
pub const PERMISSION_STATUS_KEY: &str = "@notification_permission_status";
/// Cached push token for this device.
pub const PUSH_TOKEN_KEY: &str = "@push_token";

pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ApiError>;
    fn remove(&self, key: &str) -> Result<(), ApiError>;
    fn clear(&self) -> Result<(), ApiError>;
}

/// Volatile storage, used by tests and hosts without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ApiError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        self.entries.lock().clear();
        Ok(())
    }
}

/// Storage persisted to a single JSON file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the store at `path`. A missing file is an
    /// empty store; an unreadable or corrupt one is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => HashMap::new(),
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| ApiError::Storage(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(ApiError::Storage(format!("{}: {e}", path.display()))),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy, write the copy, and only then commit it, so
    /// memory never holds what the file failed to store. `change` returns
    /// whether anything changed; an untouched store is not rewritten.
    fn update(&self, change: impl FnOnce(&mut HashMap<String, String>) -> bool) -> Result<(), ApiError> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        if !change(&mut next) {
            return Ok(());
        }
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<(), ApiError> {
        let to_storage_err = |e: io::Error| ApiError::Storage(format!("{}: {e}", self.path.display()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(to_storage_err)?;
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(to_storage_err)?;
        fs::rename(&tmp, &self.path).map_err(to_storage_err)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), ApiError> {
        self.update(|entries| entries.remove(key).is_some())
    }

    fn clear(&self) -> Result<(), ApiError> {
        self.update(|entries| {
            entries.clear();
            true
        })
    }
}

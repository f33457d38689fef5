//! String-key persistence for application state.
//!
//! Settings survive restarts through a small key-value abstraction:
//! [`KeyValueStore`] hides where the bytes live, [`JsonFileStore`] keeps one
//! JSON file per key under the user's config directory, and [`MemoryStore`]
//! backs tests. Values are opaque strings; callers do their own JSON
//! encoding.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Error, Result};

/// Key under which [`airsense_types::AppSettings`] is persisted.
pub const SETTINGS_KEY: &str = "app-settings";

/// Async string-key value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value for a key. `Ok(None)` when the key has never been set.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write the value for a key, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key. A no-op when the key does not exist.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// File-backed store keeping one `<key>.json` file per key.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at the platform config directory
    /// (e.g. `~/.config/airsense` on Linux).
    pub fn new() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::NoStorageDir("no config directory on this platform".to_string()))?
            .join("airsense");
        Ok(Self { dir })
    }

    /// Create a store rooted at an explicit directory.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory this store writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        // Write to a sibling temp file and rename so readers never see a
        // half-written value
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(key, path = %path.display(), "Persisted value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

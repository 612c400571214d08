//! Version History
//!
//! A capped, most-recent-first list of generated HTML snapshots, persisted
//! as one JSON array under a single storage key.
//!
//! # Persistence Policy
//!
//! The full list is written after every mutation and read once at load.
//! Storage failures are logged and swallowed: the in-memory list stays
//! authoritative for the running process.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::session::now_ms;

/// Storage key holding the serialized version list
pub const VERSIONS_KEY: &str = "website-builder-versions";

/// Maximum number of retained versions
pub const MAX_VERSIONS: usize = 10;

/// A saved snapshot of generated HTML
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    /// Timestamp-derived identifier
    pub id: String,
    /// The HTML document
    pub html_content: String,
    /// Separate stylesheet, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_content: Option<String>,
    /// Separate script, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_content: Option<String>,
    /// Creation time (Unix timestamp ms)
    pub timestamp: u64,
    /// What produced this version (usually the triggering prompt)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl VersionEntry {
    fn new(
        html_content: String,
        description: Option<String>,
        css_content: Option<String>,
        js_content: Option<String>,
    ) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let timestamp = now_ms();
        let count = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self {
            id: format!("v_{timestamp}_{count}"),
            html_content,
            css_content,
            js_content,
            timestamp,
            description,
        }
    }
}

// =============================================================================
// Storage Backends
// =============================================================================

/// Durable key/value storage for the version list
#[async_trait]
pub trait VersionStorage: Send + Sync {
    /// Read the value under `key` (`None` if never written)
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key`
    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// One JSON file per key inside a directory
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Store files under `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default data directory: `$XDG_DATA_HOME/site-builder`
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("site-builder"))
    }

    /// Path of the file backing `key`
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl VersionStorage for FileStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::Io {
                path: self.dir.clone(),
                source,
            })?;

        // Write-then-rename so a crash never leaves a truncated list behind
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|source| StorageError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StorageError::Io { path, source })
    }
}

/// In-memory storage (tests, ephemeral sessions)
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage pre-populated with one value
    pub fn with_value(key: &str, value: impl Into<String>) -> Self {
        let storage = Self::new();
        storage.values.lock().insert(key.to_string(), value.into());
        storage
    }

    /// Raw value currently stored under `key`
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }
}

#[async_trait]
impl VersionStorage for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// Version Store
// =============================================================================

/// Capped, persisted version history
pub struct VersionStore {
    storage: Arc<dyn VersionStorage>,
    key: String,
    max_versions: usize,
    versions: Vec<VersionEntry>,
}

impl VersionStore {
    /// Load the history from `storage` under [`VERSIONS_KEY`]
    pub async fn load(storage: Arc<dyn VersionStorage>) -> Self {
        Self::load_with(storage, VERSIONS_KEY, MAX_VERSIONS).await
    }

    /// Load with an explicit key and cap
    pub async fn load_with(
        storage: Arc<dyn VersionStorage>,
        key: impl Into<String>,
        max_versions: usize,
    ) -> Self {
        let key = key.into();
        let mut versions = match storage.read(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<VersionEntry>>(&raw) {
                Ok(versions) => versions,
                Err(e) => {
                    tracing::warn!(error = %StorageError::from(e), "Ignoring stored versions");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored versions");
                Vec::new()
            }
        };
        versions.truncate(max_versions);

        tracing::debug!(count = versions.len(), key = %key, "Loaded version history");
        Self {
            storage,
            key,
            max_versions,
            versions,
        }
    }

    /// Save a new version at the front, evicting the oldest beyond the cap
    pub async fn add_version(
        &mut self,
        html: impl Into<String>,
        description: Option<String>,
        css: Option<String>,
        js: Option<String>,
    ) -> VersionEntry {
        let entry = VersionEntry::new(html.into(), description, css, js);
        self.versions.insert(0, entry.clone());
        self.versions.truncate(self.max_versions);
        self.persist().await;

        tracing::info!(id = %entry.id, count = self.versions.len(), "Saved version");
        entry
    }

    /// All versions, most recent first
    pub fn versions(&self) -> &[VersionEntry] {
        &self.versions
    }

    /// Look up a version by ID
    pub fn get_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// Remove a version; returns whether anything was removed
    pub async fn delete_version(&mut self, id: &str) -> bool {
        let before = self.versions.len();
        self.versions.retain(|v| v.id != id);
        let removed = self.versions.len() != before;
        if removed {
            self.persist().await;
        }
        removed
    }

    /// Remove all versions
    pub async fn clear(&mut self) {
        self.versions.clear();
        self.persist().await;
    }

    /// Number of stored versions
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether no versions are stored
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    async fn persist(&self) {
        let raw = match serde_json::to_string(&self.versions) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize versions");
                return;
            }
        };
        if let Err(e) = self.storage.write(&self.key, &raw).await {
            tracing::warn!(error = %e, "Failed to persist versions");
        }
    }
}

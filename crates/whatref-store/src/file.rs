//! Durable history store backed by a single JSON file.
//!
//! The file holds the newest-first array of entries. Every mutation
//! rewrites it atomically (temp file + rename) while holding the store
//! mutex, so cap enforcement and persistence happen in one critical
//! section and a crash never leaves a half-written file behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use whatref_core::{defaults, Error, HistoryEntry, HistoryStore, Result};

use crate::buffer::HistoryBuffer;

/// Location and size of the history file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    pub path: PathBuf,
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(defaults::HISTORY_PATH),
            max_entries: defaults::HISTORY_MAX_ENTRIES,
        }
    }
}

impl HistoryConfig {
    /// Create from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            path: std::env::var(defaults::ENV_HISTORY_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(defaults::HISTORY_PATH)),
            max_entries: defaults::env_or(
                defaults::ENV_HISTORY_MAX_ENTRIES,
                defaults::HISTORY_MAX_ENTRIES,
            ),
        }
    }
}

/// History persisted to one JSON file.
pub struct FileHistoryStore {
    path: PathBuf,
    inner: Mutex<HistoryBuffer>,
}

impl FileHistoryStore {
    /// Open the store, loading existing entries if the file exists.
    ///
    /// A file that cannot be parsed is logged and treated as empty; it is
    /// overwritten on the next append.
    pub async fn open(config: HistoryConfig) -> Result<Self> {
        let buffer = match fs::read(&config.path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<HistoryEntry>>(&bytes) {
                Ok(entries) => HistoryBuffer::from_entries(entries, config.max_entries),
                Err(e) => {
                    warn!(
                        subsystem = "store",
                        component = "file_history",
                        path = %config.path.display(),
                        error = %e,
                        "History file unreadable, starting empty"
                    );
                    HistoryBuffer::new(config.max_entries)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                HistoryBuffer::new(config.max_entries)
            }
            Err(e) => {
                return Err(Error::Storage(format!(
                    "Failed to read history file {}: {}",
                    config.path.display(),
                    e
                )))
            }
        };

        info!(
            subsystem = "store",
            component = "file_history",
            path = %config.path.display(),
            entries = buffer.len(),
            max_entries = config.max_entries,
            "History store opened"
        );

        Ok(Self {
            path: config.path,
            inner: Mutex::new(buffer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, buffer: &HistoryBuffer) -> Result<()> {
        let json = serde_json::to_vec_pretty(&buffer.to_vec())?;
        write_atomic(&self.path, &json).await.map_err(|e| {
            warn!(
                subsystem = "store",
                component = "file_history",
                path = %self.path.display(),
                error = %e,
                "History write failed"
            );
            Error::Storage(format!(
                "Failed to write history file {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&temp_path, path).await
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let mut next = guard.clone();
        if let Some(evicted) = next.push(entry) {
            debug!(
                subsystem = "store",
                component = "file_history",
                evicted_id = %evicted.id,
                "Evicted oldest history entry"
            );
        }
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        Ok(self.inner.lock().await.newest(limit))
    }

    async fn clear(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let empty = HistoryBuffer::new(guard.capacity());
        self.persist(&empty).await?;
        *guard = empty;
        Ok(())
    }
}

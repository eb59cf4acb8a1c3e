//! In-memory history store.

use async_trait::async_trait;
use tokio::sync::Mutex;
use whatref_core::{defaults, HistoryEntry, HistoryStore, Result};

use crate::buffer::HistoryBuffer;

/// Process-local history, lost on restart.
pub struct MemoryHistoryStore {
    inner: Mutex<HistoryBuffer>,
}

impl MemoryHistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(HistoryBuffer::new(capacity)),
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new(defaults::HISTORY_MAX_ENTRIES)
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, entry: HistoryEntry) -> Result<()> {
        self.inner.lock().await.push(entry);
        Ok(())
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        Ok(self.inner.lock().await.newest(limit))
    }

    async fn clear(&self) -> Result<()> {
        self.inner.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::tests::entry;

    #[tokio::test]
    async fn test_append_list_clear() {
        let store = MemoryHistoryStore::default();
        for n in 0..12 {
            store.append(entry(n)).await.unwrap();
        }
        let all = store.list(None).await.unwrap();
        assert_eq!(all.len(), 10);
        assert_eq!(all[0].result, "1. Reference Number: REF-11");

        store.clear().await.unwrap();
        assert!(store.list(None).await.unwrap().is_empty());
    }
}

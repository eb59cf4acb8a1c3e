//! Bounded registry of live guess sessions.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;
use uuid::Uuid;
use whatref_core::{Error, GuessSession, Result};

/// Sessions keyed by their UUIDv7 id.
///
/// UUIDv7 ids sort by creation time, so the first key is always the
/// oldest session and is the one evicted when the registry is full.
pub struct SessionRegistry {
    sessions: RwLock<BTreeMap<Uuid, Arc<Mutex<GuessSession>>>>,
    capacity: usize,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Register a session, evicting the oldest ones past capacity.
    pub async fn insert(&self, session: GuessSession) -> Arc<Mutex<GuessSession>> {
        let id = session.id();
        let handle = Arc::new(Mutex::new(session));
        let mut sessions = self.sessions.write().await;
        sessions.insert(id, Arc::clone(&handle));
        while sessions.len() > self.capacity {
            if let Some((evicted, _)) = sessions.pop_first() {
                debug!(subsystem = "api", session_id = %evicted, "Evicted oldest session");
            }
        }
        handle
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<GuessSession>>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Exclusive access for a mutating request.
    ///
    /// Fails with [`Error::SessionBusy`] instead of waiting when another
    /// request already holds the session.
    pub async fn acquire(&self, id: Uuid) -> Result<OwnedMutexGuard<GuessSession>> {
        let handle = self
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Session {} not found", id)))?;
        handle.try_lock_owned().map_err(|_| {
            Error::SessionBusy("An analysis is already in progress for this image".to_string())
        })
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }
}

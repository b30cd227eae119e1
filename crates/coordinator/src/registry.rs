use crate::error::{Result, SessionError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

/// Sessions that report when they were last touched, so the registry can
/// evict the idle ones.
pub trait IdleTracked {
    fn last_activity(&self) -> Instant;
}

/// Shared map of live sessions keyed by session ID.
///
/// The registry lock only guards map membership. Each session carries its
/// own mutex, taken after the map lookup, so slow per-session work never
/// blocks unrelated sessions.
pub struct SessionRegistry<S> {
    sessions: RwLock<HashMap<String, Arc<Mutex<S>>>>,
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl<S> SessionRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session. Rejects a duplicate ID.
    pub async fn insert(&self, id: &str, session: S) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(id) {
            return Err(SessionError::AlreadyExists(id.to_string()));
        }
        sessions.insert(id.to_string(), Arc::new(Mutex::new(session)));
        Ok(())
    }

    /// Looks up a session, cloning the handle so the map lock is released
    /// before the caller takes the session lock.
    pub async fn get(&self, id: &str) -> Result<Arc<Mutex<S>>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Removes a session, failing if it is already gone.
    pub async fn remove(&self, id: &str) -> Result<Arc<Mutex<S>>> {
        let mut sessions = self.sessions.write().await;
        sessions
            .remove(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Removes a session if present. Returns whether anything was removed.
    pub async fn remove_silent(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn entries(&self) -> Vec<(String, Arc<Mutex<S>>)> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<S: IdleTracked + Send + 'static> SessionRegistry<S> {
    /// Evicts sessions idle longer than `ttl` and returns their IDs.
    ///
    /// The scan and the removal are separate lock acquisitions. A session
    /// touched between them is removed anyway; callers treat eviction as
    /// best-effort housekeeping.
    pub async fn evict_idle(&self, ttl: Duration) -> Vec<String> {
        let now = Instant::now();
        let mut expired = Vec::new();
        for (id, handle) in self.entries().await {
            let session = handle.lock().await;
            if now.duration_since(session.last_activity()) >= ttl {
                expired.push(id);
            }
        }
        if !expired.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &expired {
                sessions.remove(id);
                debug!(session_id = %id, "evicted idle session");
            }
        }
        expired
    }
}

impl<S: Send + 'static> SessionRegistry<S> {
    /// Removes a session after a delay, keeping it readable in the interim.
    pub fn remove_after(self: &Arc<Self>, id: String, delay: Duration) {
        let registry = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if registry.remove_silent(&id).await {
                debug!(session_id = %id, "removed session after grace period");
            }
        });
    }
}

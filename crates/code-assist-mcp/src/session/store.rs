//! Session table keyed by opaque session id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::state::Session;
use crate::auth::Claims;
use crate::config::SessionConfig;
use crate::types::{McpError, McpResult};

/// All live sessions. Removal is two-phase: the session is deactivated
/// first, then dropped from the table.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    ttl: Duration,
    queue_capacity: usize,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: config.ttl,
            queue_capacity: config.queue_capacity,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a session bound to the token's subject.
    pub async fn create(&self, claims: &Claims) -> Arc<Session> {
        let mut sessions = self.sessions.write().await;
        let id = loop {
            let candidate = uuid::Uuid::new_v4().simple().to_string();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        let session = Arc::new(Session::new(
            id.clone(),
            claims.subject().to_string(),
            claims.grants(),
            self.queue_capacity,
        ));
        sessions.insert(id, session.clone());

        tracing::info!(
            session = %session.id(),
            subject = %session.subject(),
            "Session created"
        );
        session
    }

    /// Look up a live session. Does not count as activity.
    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.get(id).cloned()?;
        let now = Instant::now();
        (session.is_active() && !self.is_expired(&session, now)).then_some(session)
    }

    /// Whether the session belongs to the token's subject.
    pub fn bind_check(&self, session: &Session, claims: &Claims) -> bool {
        session.subject() == claims.subject()
    }

    /// Look up a session and check it belongs to the caller. Both failures
    /// look the same on the wire.
    pub async fn resolve(&self, id: &str, claims: &Claims) -> McpResult<Arc<Session>> {
        let Some(session) = self.get(id).await else {
            tracing::warn!(session = %id, "Rejected unknown or expired session");
            return Err(McpError::SessionInvalid);
        };
        if !self.bind_check(&session, claims) {
            tracing::warn!(
                session = %id,
                subject = %claims.subject(),
                "Rejected session bound to a different subject"
            );
            return Err(McpError::SessionInvalid);
        }
        Ok(session)
    }

    pub fn touch(&self, session: &Session) {
        session.touch();
    }

    /// Remove sessions idle for longer than the TTL, and any already
    /// deactivated. Returns how many were removed.
    pub async fn expire_sweep(&self, now: Instant) -> usize {
        let expired: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<String> = sessions
                .values()
                .filter(|s| !s.is_active() || self.is_expired(s, now))
                .map(|s| s.id().to_string())
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for session in &expired {
            session.deactivate();
        }
        if !expired.is_empty() {
            tracing::info!(removed = expired.len(), "Expired sessions swept");
        }
        expired.len()
    }

    /// End a session. Returns `false` if it did not exist.
    pub async fn invalidate(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(session) => {
                session.deactivate();
                tracing::info!(session = %id, "Session invalidated");
                true
            }
            None => false,
        }
    }

    /// Invalidate every session.
    pub async fn shutdown(&self) {
        let drained: Vec<Arc<Session>> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        for session in &drained {
            session.deactivate();
        }
        tracing::info!(closed = drained.len(), "All sessions closed");
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Run [`SessionStore::expire_sweep`] every `interval` until cancelled.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        store.expire_sweep(Instant::now()).await;
                    }
                }
            }
            tracing::debug!("Session sweeper stopped");
        })
    }

    fn is_expired(&self, session: &Session, now: Instant) -> bool {
        session.idle_for(now) > self.ttl
    }
}

/// Wait for a sweeper task to finish. A panicked or aborted task is logged
/// and reported as `false`.
pub async fn join_sweeper(handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Session sweeper task failed: {e}");
            false
        }
    }
}

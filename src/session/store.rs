//! In-memory session store.
//!
//! Only sessions carrying an identity are kept. A caller without a usable
//! cookie gets a detached session that is stored once a handler logs it in,
//! and dropped again on logout or after `ttl` without use.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use uuid::Uuid;

use super::{ResolvedSession, Session, SessionResolver};

/// Default idle lifetime of a logged-in session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
struct StoredSession {
    session: Session,
    last_seen: Instant,
}

impl StoredSession {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_seen.elapsed() >= ttl
    }
}

/// A thread-safe map of session id -> logged-in session.
#[derive(Clone)]
pub struct MemorySessionStore {
    inner: Arc<DashMap<String, StoredSession>>,
    ttl: Duration,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Look up a live session without creating one, refreshing its idle timer.
    pub fn get(&self, id: &str) -> Option<Session> {
        match self.inner.entry(id.to_string()) {
            Entry::Occupied(entry) if entry.get().is_expired(self.ttl) => {
                entry.remove();
                tracing::debug!(session_id = %id, "Session expired");
                None
            }
            Entry::Occupied(mut entry) => {
                entry.get_mut().last_seen = Instant::now();
                Some(entry.get().session.clone())
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Drop every session idle for longer than the TTL.
    pub fn purge_expired(&self) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, stored| !stored.is_expired(self.ttl));
        let purged = before.saturating_sub(self.inner.len());
        if purged > 0 {
            tracing::debug!(purged, "Expired sessions purged");
        }
        purged
    }

    fn detached() -> Session {
        Session::new(Uuid::new_v4().simple().to_string())
    }
}

#[async_trait]
impl SessionResolver for MemorySessionStore {
    async fn resolve(&self, carrier: Option<&str>) -> ResolvedSession {
        // Unknown carriers (e.g. from before a restart) get a detached session.
        let session = carrier
            .and_then(|id| self.get(id))
            .unwrap_or_else(Self::detached);
        ResolvedSession {
            session,
            created: false,
        }
    }

    async fn commit(&self, session: &Session) -> bool {
        if session.user().is_none() {
            if self.inner.remove(session.id()).is_some() {
                tracing::debug!(session_id = %session.id(), "Session ended");
            }
            return false;
        }

        let created = match self.inner.entry(session.id().to_string()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().last_seen = Instant::now();
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(StoredSession {
                    session: session.clone(),
                    last_seen: Instant::now(),
                });
                true
            }
        };
        if created {
            tracing::debug!(session_id = %session.id(), "Session created");
            self.purge_expired();
        }
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_anonymous_sessions_are_not_stored() {
        let store = MemorySessionStore::new();

        for _ in 0..100 {
            let resolved = store.resolve(None).await;
            assert!(!resolved.created);
            assert!(!store.commit(&resolved.session).await);
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_login_stores_then_reuses() {
        let store = MemorySessionStore::new();

        let first = store.resolve(None).await;
        first.session.start("U1");
        assert!(store.commit(&first.session).await);
        assert_eq!(store.len(), 1);

        let again = store.resolve(Some(first.session.id())).await;
        assert_eq!(again.session.id(), first.session.id());
        assert_eq!(again.session.user().as_deref(), Some("U1"));
        assert!(!store.commit(&again.session).await);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_logout_removes_session() {
        let store = MemorySessionStore::new();
        let resolved = store.resolve(None).await;
        resolved.session.start("U1");
        store.commit(&resolved.session).await;

        resolved.session.end();
        assert!(!store.commit(&resolved.session).await);
        assert!(store.is_empty());
        assert!(store.get(resolved.session.id()).is_none());
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let store = MemorySessionStore::with_ttl(Duration::from_millis(20));
        let resolved = store.resolve(None).await;
        resolved.session.start("U1");
        store.commit(&resolved.session).await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        let again = store.resolve(Some(resolved.session.id())).await;
        assert_ne!(again.session.id(), resolved.session.id());
        assert_eq!(again.session.user(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_purge_drops_only_expired() {
        let store = MemorySessionStore::with_ttl(Duration::from_millis(30));
        let old = store.resolve(None).await.session;
        old.start("U1");
        store.commit(&old).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        let new = store.resolve(None).await.session;
        new.start("U2");
        // Storing a new session sweeps the expired one.
        assert!(store.commit(&new).await);
        assert_eq!(store.len(), 1);
        assert!(store.get(new.id()).is_some());
    }

    #[tokio::test]
    async fn test_unknown_carrier_gets_detached_session() {
        let store = MemorySessionStore::new();
        let resolved = store.resolve(Some("forged")).await;
        assert_ne!(resolved.session.id(), "forged");
        assert!(store.get("forged").is_none());
        assert!(store.is_empty());
    }
}

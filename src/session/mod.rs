//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Cookie header (session carrier)
//!     → SessionResolver::resolve (lookup, or a detached session)
//!     → Session handle (shared, per caller)
//!     → Parameter binder (session user / session handle sources)
//!     → SessionResolver::commit (store on login, drop on logout)
//!     → Set-Cookie on the response when a session was stored
//! ```
//!
//! # Design Decisions
//! - The dispatch core treats the resolver as a black box called once per request
//! - Identities only ever come from the session, never from client input
//! - The default store is in-memory; any other backend implements `SessionResolver`

pub mod store;

use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use async_trait::async_trait;

pub use store::MemorySessionStore;

/// A handle on one caller's session.
///
/// Cloning is cheap; all clones observe the same state.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionState>,
}

#[derive(Debug)]
struct SessionState {
    id: String,
    user: RwLock<Option<String>>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SessionState {
                id: id.into(),
                user: RwLock::new(None),
            }),
        }
    }

    /// The carrier value identifying this session.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The identity bound to this session, if any.
    pub fn user(&self) -> Option<String> {
        self.inner
            .user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bind an identity to this session.
    pub fn start(&self, user: impl Into<String>) {
        *self.write_user() = Some(user.into());
    }

    /// Drop the identity bound to this session.
    pub fn end(&self) {
        *self.write_user() = None;
    }

    fn write_user(&self) -> RwLockWriteGuard<'_, Option<String>> {
        self.inner
            .user
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of resolving a session carrier.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub session: Session,
    /// True once this request stored the session for the first time, so its
    /// carrier must be issued.
    pub created: bool,
}

/// Resolves an opaque session carrier (cookie value) to a session handle.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, carrier: Option<&str>) -> ResolvedSession;

    /// Persist the session's identity after the handler ran.
    ///
    /// Returns true when the session was newly stored.
    async fn commit(&self, session: &Session) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_identity_lifecycle() {
        let session = Session::new("abc");
        assert_eq!(session.id(), "abc");
        assert_eq!(session.user(), None);

        let clone = session.clone();
        session.start("U1");
        assert_eq!(clone.user().as_deref(), Some("U1"));

        clone.end();
        assert_eq!(session.user(), None);
    }
}

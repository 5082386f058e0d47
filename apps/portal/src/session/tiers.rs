//! Two-tier session store: the in-memory session plus its reduced projection in
//! the local cache. Every write goes memory first, then cache; the remote tier
//! is arbitrated through [`reconcile`].

use std::sync::Arc;

use serde_json::Map;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::session::cache::SessionCache;
use crate::session::model::{CachedSession, Identity, Role, UserSession};

/// What the auth provider reports at a lifecycle point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteIdentity {
    SignedIn(Identity),
    SignedOut,
    /// The provider could not be asked. Local state is kept and may diverge
    /// from the remote session until the next successful check.
    Unreachable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    Clear,
    KeepLocal,
    Adopt(UserSession),
}

/// Remote sign-out always wins. A remote session for the cached e-mail keeps
/// the local state; any other remote session replaces it.
pub fn reconcile(local: Option<&CachedSession>, remote: &RemoteIdentity) -> Reconciliation {
    match remote {
        RemoteIdentity::SignedOut => Reconciliation::Clear,
        RemoteIdentity::Unreachable => Reconciliation::KeepLocal,
        RemoteIdentity::SignedIn(identity) => match local {
            Some(cached) if cached.email.eq_ignore_ascii_case(&identity.email) => {
                Reconciliation::KeepLocal
            }
            _ => Reconciliation::Adopt(UserSession {
                email: identity.email.clone(),
                name: UserSession::display_name(&identity.email, None),
                role: identity.role.unwrap_or(Role::Candidate),
                profile_complete: false,
                details: Map::new(),
            }),
        },
    }
}

pub struct SessionStore {
    memory: RwLock<Option<UserSession>>,
    cache: Arc<dyn SessionCache>,
}

impl SessionStore {
    /// Seeds memory from the cache. An unreadable cache starts signed out.
    pub fn hydrate(cache: Arc<dyn SessionCache>) -> Self {
        let cached = match cache.load() {
            Ok(cached) => cached,
            Err(error) => {
                warn!(%error, "ignoring unreadable session cache");
                None
            }
        };
        Self {
            memory: RwLock::new(cached.map(UserSession::from)),
            cache,
        }
    }

    pub async fn current(&self) -> Option<UserSession> {
        self.memory.read().await.clone()
    }

    pub async fn replace(&self, session: UserSession) {
        let mut memory = self.memory.write().await;
        self.persist(&session);
        *memory = Some(session);
    }

    /// Mutates the current session and re-persists its projection. Returns the
    /// updated session, or `None` when nobody is signed in.
    pub async fn update<F>(&self, mutate: F) -> Option<UserSession>
    where
        F: FnOnce(&mut UserSession),
    {
        let mut memory = self.memory.write().await;
        let session = memory.as_mut()?;
        mutate(session);
        self.persist(session);
        Some(session.clone())
    }

    pub async fn clear(&self) {
        let mut memory = self.memory.write().await;
        *memory = None;
        self.clear_cache();
    }

    /// Reconciles against the remote tier and applies the outcome under one
    /// write lock, so a concurrent login cannot be overwritten by a stale read.
    pub async fn sync_with(&self, remote: &RemoteIdentity) -> Reconciliation {
        let mut memory = self.memory.write().await;
        let local = memory.as_ref().map(UserSession::projection);
        let outcome = reconcile(local.as_ref(), remote);
        match &outcome {
            Reconciliation::Clear => {
                debug!("remote session absent; clearing local session");
                *memory = None;
                self.clear_cache();
            }
            Reconciliation::KeepLocal => {}
            Reconciliation::Adopt(session) => {
                debug!(email = %session.email, "adopting remote session");
                self.persist(session);
                *memory = Some(session.clone());
            }
        }
        outcome
    }

    fn persist(&self, session: &UserSession) {
        if let Err(error) = self.cache.store(&session.projection()) {
            warn!(%error, "failed to write session cache");
        }
    }

    fn clear_cache(&self) {
        if let Err(error) = self.cache.clear() {
            warn!(%error, "failed to clear session cache");
        }
    }
}

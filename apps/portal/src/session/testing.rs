//! In-memory doubles for the synchronizer's collaborators.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use super::ProfileStore;
use crate::auth::{AuthEvent, AuthProvider};
use crate::error::PortalError;
use crate::session::cache::SessionCache;
use crate::session::model::{CachedSession, Identity, Role};
use crate::session::tiers::RemoteIdentity;

/// Keeps the serialized projection, like a browser's local storage would.
#[derive(Default)]
pub struct MemoryCache {
    raw: Mutex<Option<String>>,
}

impl MemoryCache {
    pub fn with(session: CachedSession) -> Self {
        let cache = Self::default();
        cache.store(&session).unwrap();
        cache
    }

    /// The stored JSON, exactly as written.
    pub fn raw(&self) -> Option<Value> {
        self.raw
            .lock()
            .unwrap()
            .as_deref()
            .map(|raw| serde_json::from_str(raw).unwrap())
    }
}

impl SessionCache for MemoryCache {
    fn load(&self) -> Result<Option<CachedSession>, PortalError> {
        match self.raw.lock().unwrap().as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn store(&self, session: &CachedSession) -> Result<(), PortalError> {
        *self.raw.lock().unwrap() = Some(serde_json::to_string(session)?);
        Ok(())
    }

    fn clear(&self) -> Result<(), PortalError> {
        *self.raw.lock().unwrap() = None;
        Ok(())
    }
}

fn unreachable_error() -> PortalError {
    PortalError::Api {
        status: 503,
        message: "unreachable".into(),
    }
}

pub struct FakeAuth {
    events: broadcast::Sender<AuthEvent>,
    remote: Mutex<RemoteIdentity>,
    pub fail_sign_out: AtomicBool,
    pub sign_out_calls: AtomicUsize,
    pub sign_ups: Mutex<Vec<(String, Role)>>,
}

impl FakeAuth {
    pub fn new(remote: RemoteIdentity) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            events,
            remote: Mutex::new(remote),
            fail_sign_out: AtomicBool::new(false),
            sign_out_calls: AtomicUsize::new(0),
            sign_ups: Mutex::new(Vec::new()),
        }
    }

    pub fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        role: Role,
    ) -> Result<Identity, PortalError> {
        self.sign_ups.lock().unwrap().push((email.to_string(), role));
        Ok(Identity {
            email: email.to_string(),
            role: Some(role),
        })
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<Identity, PortalError> {
        let identity = match &*self.remote.lock().unwrap() {
            RemoteIdentity::SignedIn(identity) if identity.email == email => identity.clone(),
            RemoteIdentity::Unreachable => return Err(unreachable_error()),
            _ => return Err(PortalError::Auth("Invalid login credentials".into())),
        };
        self.emit(AuthEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), PortalError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(unreachable_error());
        }
        *self.remote.lock().unwrap() = RemoteIdentity::SignedOut;
        Ok(())
    }

    async fn request_password_reset(&self, _email: &str) -> Result<(), PortalError> {
        Ok(())
    }

    async fn current_identity(&self) -> Result<Option<Identity>, PortalError> {
        match &*self.remote.lock().unwrap() {
            RemoteIdentity::SignedIn(identity) => Ok(Some(identity.clone())),
            RemoteIdentity::SignedOut => Ok(None),
            RemoteIdentity::Unreachable => Err(unreachable_error()),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[derive(Default)]
pub struct FakeProfiles {
    pub stored: Mutex<HashMap<String, Map<String, Value>>>,
    pub fail_fetch: AtomicBool,
    pub fail_upsert: AtomicBool,
    pub fetches: AtomicUsize,
    pub upserts: AtomicUsize,
}

#[async_trait]
impl ProfileStore for FakeProfiles {
    async fn fetch_profile(&self, email: &str) -> Result<Map<String, Value>, PortalError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(unreachable_error());
        }
        Ok(self
            .stored
            .lock()
            .unwrap()
            .get(email)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_profile(
        &self,
        email: &str,
        details: &Map<String, Value>,
    ) -> Result<(), PortalError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(unreachable_error());
        }
        let mut stored = self.stored.lock().unwrap();
        let profile = stored.entry(email.to_string()).or_default();
        for (key, value) in details {
            profile.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

/// Polls `check` until it holds; panics after about a second.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthEvent, AuthProvider};
use crate::error::PortalError;
use crate::forms::RegistrationForm;
use crate::session::cache::SessionCache;
use crate::session::model::{Role, UserSession};
use crate::session::tiers::{RemoteIdentity, SessionStore};
use crate::session::ProfileStore;

/// Owns the signed-in user for the lifetime of the process.
///
/// Local writes never wait on the network. Login and Logout treat remote
/// failures as non-fatal, CompleteProfile reports them, RefreshUser swallows
/// them. Only a remote sign-out forces the local session away.
pub struct SessionManager {
    store: Arc<SessionStore>,
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Reads the local cache before returning, so the cached session is
    /// visible before [`Self::hydrate`] talks to the auth provider.
    pub fn new(
        cache: Arc<dyn SessionCache>,
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            store: Arc::new(SessionStore::hydrate(cache)),
            auth,
            profiles,
            listener: Mutex::new(None),
        }
    }

    /// Checks the remote session once, then follows auth events in the background.
    pub async fn hydrate(&self) {
        let events = self.auth.subscribe();

        let remote = match self.auth.current_identity().await {
            Ok(Some(identity)) => RemoteIdentity::SignedIn(identity),
            Ok(None) => RemoteIdentity::SignedOut,
            Err(error) => {
                warn!(%error, "auth provider unreachable; keeping cached session");
                RemoteIdentity::Unreachable
            }
        };
        let outcome = self.store.sync_with(&remote).await;
        debug!(?outcome, "session hydrated");

        let handle = tokio::spawn(listen(self.store.clone(), events));
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(previous) = listener.replace(handle) {
                previous.abort();
            }
        }
    }

    pub async fn current(&self) -> Option<UserSession> {
        self.store.current().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.store.current().await.is_some()
    }

    /// Starts a session locally. Supplied `details` mark the profile complete
    /// and are pushed to the remote profile; a failed push is only logged.
    pub async fn login(
        &self,
        email: &str,
        role: Role,
        details: Option<Map<String, Value>>,
    ) -> UserSession {
        let session = UserSession {
            email: email.to_string(),
            name: UserSession::display_name(email, details.as_ref()),
            role,
            profile_complete: details.is_some(),
            details: details.unwrap_or_default(),
        };
        self.store.replace(session.clone()).await;
        info!(email, role = role.as_str(), "signed in locally");

        if session.profile_complete {
            if let Err(error) = self.profiles.upsert_profile(email, &session.details).await {
                error!(%error, email, "profile sync failed during login");
            }
        }
        session
    }

    /// Merges `details` into the session and waits for the remote upsert. The
    /// local merge stays even when the upsert fails.
    pub async fn complete_profile(
        &self,
        details: Map<String, Value>,
    ) -> Result<UserSession, PortalError> {
        let session = self
            .store
            .update(|session| {
                session
                    .details
                    .extend(details.iter().map(|(k, v)| (k.clone(), v.clone())));
                session.profile_complete = true;
            })
            .await
            .ok_or(PortalError::NotAuthenticated)?;

        self.profiles.upsert_profile(&session.email, &details).await?;
        info!(email = %session.email, "profile completed");
        Ok(session)
    }

    /// Pulls the remote profile. No session means no request; a failed request
    /// leaves the session as it was.
    pub async fn refresh_user(&self) {
        let Some(email) = self.store.current().await.map(|s| s.email) else {
            return;
        };

        let profile = match self.profiles.fetch_profile(&email).await {
            Ok(profile) => profile,
            Err(error) => {
                warn!(%error, %email, "profile refresh failed; keeping local state");
                return;
            }
        };
        if profile.is_empty() {
            return;
        }

        self.store
            .update(|session| {
                // A different user may have signed in while the fetch was in flight.
                if session.email == email {
                    session.details = profile;
                    session.profile_complete = true;
                }
            })
            .await;
    }

    /// Always clears local state; the remote sign-out is best effort.
    pub async fn logout(&self) {
        self.store.clear().await;
        if let Err(error) = self.auth.sign_out().await {
            warn!(%error, "remote sign-out failed; local session cleared anyway");
        }
    }

    pub async fn register(&self, form: RegistrationForm) -> Result<UserSession, PortalError> {
        form.validate()?;
        let email = form.normalized_email();
        self.auth.sign_up(&email, &form.password, form.role).await?;
        Ok(self.login(&email, form.role, form.profile_details()).await)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession, PortalError> {
        let email = email.trim().to_lowercase();
        let identity = self.auth.sign_in(&email, password).await?;
        self.login(&identity.email, identity.role.unwrap_or(Role::Candidate), None)
            .await;
        self.refresh_user().await;
        self.store.current().await.ok_or(PortalError::NotAuthenticated)
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), PortalError> {
        self.auth.request_password_reset(email.trim()).await
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

async fn listen(store: Arc<SessionStore>, mut events: broadcast::Receiver<AuthEvent>) {
    loop {
        let remote = match events.recv().await {
            Ok(AuthEvent::SignedIn(identity)) => RemoteIdentity::SignedIn(identity),
            Ok(AuthEvent::SignedOut) => RemoteIdentity::SignedOut,
            Ok(AuthEvent::TokenRefreshed) => {
                debug!("auth token refreshed");
                continue;
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "missed auth events");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        store.sync_with(&remote).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use super::*;
    use crate::navigation::{resolve, Resolution, Route};
    use crate::session::model::{CachedSession, Identity};
    use crate::session::testing::{eventually, FakeAuth, FakeProfiles, MemoryCache};

    struct Harness {
        cache: Arc<MemoryCache>,
        auth: Arc<FakeAuth>,
        profiles: Arc<FakeProfiles>,
        manager: SessionManager,
    }

    fn harness_with(cache: MemoryCache, remote: RemoteIdentity) -> Harness {
        let cache = Arc::new(cache);
        let auth = Arc::new(FakeAuth::new(remote));
        let profiles = Arc::new(FakeProfiles::default());
        let manager = SessionManager::new(cache.clone(), auth.clone(), profiles.clone());
        Harness {
            cache,
            auth,
            profiles,
            manager,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryCache::default(), RemoteIdentity::SignedOut)
    }

    fn details(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn cached_amine() -> CachedSession {
        CachedSession {
            email: "amine@mail.ma".into(),
            name: "Amine".into(),
            role: Role::Candidate,
            profile_complete: true,
        }
    }

    #[tokio::test]
    async fn test_login_with_details_caches_only_projection() {
        let h = harness();
        let session = h
            .manager
            .login(
                "amine@mail.ma",
                Role::Candidate,
                Some(details(json!({ "firstName": "Amine", "city": "Agadir" }))),
            )
            .await;

        assert!(session.profile_complete);
        assert_eq!(session.name, "Amine");
        assert!(h.manager.current().await.unwrap().profile_complete);
        assert_eq!(
            h.cache.raw().unwrap(),
            json!({
                "email": "amine@mail.ma",
                "name": "Amine",
                "role": "candidate",
                "profileComplete": true
            })
        );
        assert_eq!(h.profiles.upserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_login_without_details_is_incomplete_and_skips_remote() {
        let h = harness();
        let session = h.manager.login("rh@atlas.ma", Role::Employer, None).await;

        assert!(!session.profile_complete);
        assert_eq!(session.name, "rh");
        assert_eq!(h.profiles.upserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_login_survives_failed_profile_sync() {
        let h = harness();
        h.profiles.fail_upsert.store(true, Ordering::SeqCst);

        h.manager
            .login(
                "amine@mail.ma",
                Role::Candidate,
                Some(details(json!({ "firstName": "Amine" }))),
            )
            .await;

        let session = h.manager.current().await.unwrap();
        assert!(session.profile_complete);
        assert_eq!(h.cache.raw().unwrap()["profileComplete"], true);
    }

    #[tokio::test]
    async fn test_complete_profile_merges_and_reports_remote_failure() {
        let h = harness();
        h.manager
            .login(
                "amine@mail.ma",
                Role::Candidate,
                Some(details(json!({ "firstName": "Amine", "city": "Tiznit" }))),
            )
            .await;
        h.profiles.fail_upsert.store(true, Ordering::SeqCst);

        let result = h
            .manager
            .complete_profile(details(json!({ "city": "Agadir", "school": "ENCG" })))
            .await;
        assert!(result.is_err());

        let session = h.manager.current().await.unwrap();
        assert_eq!(session.details["firstName"], "Amine");
        assert_eq!(session.details["city"], "Agadir");
        assert_eq!(session.details["school"], "ENCG");
    }

    #[tokio::test]
    async fn test_complete_profile_requires_session() {
        let h = harness();
        let err = h
            .manager
            .complete_profile(details(json!({ "city": "Agadir" })))
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::NotAuthenticated));
        assert_eq!(h.profiles.upserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_without_session_makes_no_request() {
        let h = harness();
        h.manager.refresh_user().await;

        assert!(h.manager.current().await.is_none());
        assert_eq!(h.profiles.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_prior_session() {
        let h = harness();
        h.manager.login("amine@mail.ma", Role::Candidate, None).await;
        let before = h.manager.current().await;
        h.profiles.fail_fetch.store(true, Ordering::SeqCst);

        h.manager.refresh_user().await;

        assert_eq!(h.profiles.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(h.manager.current().await, before);
    }

    #[tokio::test]
    async fn test_refresh_adopts_remote_profile() {
        let h = harness();
        h.profiles.stored.lock().unwrap().insert(
            "amine@mail.ma".into(),
            details(json!({ "firstName": "Amine", "city": "Agadir" })),
        );
        h.manager.login("amine@mail.ma", Role::Candidate, None).await;

        h.manager.refresh_user().await;

        let session = h.manager.current().await.unwrap();
        assert!(session.profile_complete);
        assert_eq!(session.details["city"], "Agadir");
        assert_eq!(h.cache.raw().unwrap()["profileComplete"], true);
    }

    #[tokio::test]
    async fn test_refresh_ignores_empty_remote_profile() {
        let h = harness();
        h.manager.login("rh@atlas.ma", Role::Employer, None).await;
        h.manager.refresh_user().await;
        assert!(!h.manager.current().await.unwrap().profile_complete);
    }

    #[tokio::test]
    async fn test_logout_clears_cache_even_when_remote_fails() {
        let h = harness();
        h.manager.login("amine@mail.ma", Role::Candidate, None).await;
        h.auth.fail_sign_out.store(true, Ordering::SeqCst);

        h.manager.logout().await;

        assert!(h.manager.current().await.is_none());
        assert!(h.cache.raw().is_none());
        assert_eq!(h.auth.sign_out_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_new_shows_cached_session_before_hydrate() {
        let h = harness_with(MemoryCache::with(cached_amine()), RemoteIdentity::SignedOut);
        assert_eq!(h.manager.current().await.unwrap().email, "amine@mail.ma");
    }

    #[tokio::test]
    async fn test_hydrate_clears_when_remote_session_missing() {
        let h = harness_with(MemoryCache::with(cached_amine()), RemoteIdentity::SignedOut);
        h.manager.hydrate().await;

        assert!(h.manager.current().await.is_none());
        assert!(h.cache.raw().is_none());
    }

    #[tokio::test]
    async fn test_hydrate_keeps_cache_when_provider_unreachable() {
        let h = harness_with(MemoryCache::with(cached_amine()), RemoteIdentity::Unreachable);
        h.manager.hydrate().await;

        assert!(h.manager.current().await.unwrap().profile_complete);
        assert!(h.cache.raw().is_some());
    }

    #[tokio::test]
    async fn test_remote_sign_out_event_clears_everything() {
        let remote = RemoteIdentity::SignedIn(Identity {
            email: "amine@mail.ma".into(),
            role: Some(Role::Candidate),
        });
        let h = harness_with(MemoryCache::with(cached_amine()), remote);
        h.manager.hydrate().await;
        assert!(h.manager.is_authenticated().await);

        h.auth.emit(AuthEvent::SignedOut);

        let manager = &h.manager;
        eventually(|| async move { manager.current().await.is_none() }).await;
        assert!(h.cache.raw().is_none());
    }

    #[tokio::test]
    async fn test_remote_sign_in_event_for_other_user_replaces_session() {
        let h = harness_with(MemoryCache::with(cached_amine()), RemoteIdentity::Unreachable);
        h.manager.hydrate().await;

        h.auth.emit(AuthEvent::SignedIn(Identity {
            email: "rh@atlas.ma".into(),
            role: Some(Role::Employer),
        }));

        let manager = &h.manager;
        eventually(|| async move {
            manager
                .current()
                .await
                .is_some_and(|s| s.email == "rh@atlas.ma" && s.role == Role::Employer)
        })
        .await;
    }

    #[tokio::test]
    async fn test_sign_in_uses_role_metadata_and_refreshes() {
        let remote = RemoteIdentity::SignedIn(Identity {
            email: "rh@atlas.ma".into(),
            role: Some(Role::Employer),
        });
        let h = harness_with(MemoryCache::default(), remote);
        h.profiles
            .stored
            .lock()
            .unwrap()
            .insert("rh@atlas.ma".into(), details(json!({ "firstName": "Atlas Agro" })));

        let session = h.manager.sign_in(" RH@atlas.ma ", "secret1").await.unwrap();

        assert_eq!(session.role, Role::Employer);
        assert!(session.profile_complete);
        assert_eq!(h.profiles.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_register_employer_then_complete_profile_reaches_dashboard() {
        let h = harness();
        h.manager.hydrate().await;

        let session = h
            .manager
            .register(RegistrationForm {
                email: "rh@atlas.ma".into(),
                password: "secret1".into(),
                confirm_password: "secret1".into(),
                role: Role::Employer,
                details: None,
            })
            .await
            .unwrap();
        assert!(!session.profile_complete);
        assert_eq!(
            h.auth.sign_ups.lock().unwrap().as_slice(),
            &[("rh@atlas.ma".to_string(), Role::Employer)]
        );

        let current = h.manager.current().await;
        assert_eq!(
            resolve("/profil", current.as_ref()),
            Resolution::Render(Route::ProfileEditor)
        );

        let form = details(json!({ "firstName": "Atlas Agro", "city": "Agadir" }));
        crate::forms::validate_profile(Role::Employer, &form).unwrap();
        h.manager.complete_profile(form).await.unwrap();

        let current = h.manager.current().await;
        assert!(current.as_ref().unwrap().profile_complete);
        assert_eq!(
            resolve("/dashboard", current.as_ref()),
            Resolution::Render(Route::Dashboard)
        );
        assert_eq!(
            h.profiles.stored.lock().unwrap()["rh@atlas.ma"]["firstName"],
            "Atlas Agro"
        );
    }

    #[tokio::test]
    async fn test_register_rejects_mismatched_passwords_before_network() {
        let h = harness();
        let err = h
            .manager
            .register(RegistrationForm {
                email: "rh@atlas.ma".into(),
                password: "secret1".into(),
                confirm_password: "secret2".into(),
                role: Role::Employer,
                details: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PortalError::Validation(_)));
        assert!(h.auth.sign_ups.lock().unwrap().is_empty());
        assert!(h.manager.current().await.is_none());
    }
}

//! Auth provider seam and the GoTrue (Supabase auth) implementation.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::PortalError;
use crate::session::model::{Identity, Role};

const REQUEST_TIMEOUT_SECS: u64 = 15;
const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Identity),
    SignedOut,
    TokenRefreshed,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Creates the account with `role` stored as user metadata.
    async fn sign_up(&self, email: &str, password: &str, role: Role)
        -> Result<Identity, PortalError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, PortalError>;

    async fn sign_out(&self) -> Result<(), PortalError>;

    async fn request_password_reset(&self, email: &str) -> Result<(), PortalError>;

    /// `Ok(None)` when the provider holds no session for this client.
    async fn current_identity(&self) -> Result<Option<Identity>, PortalError>;

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

#[derive(Debug, Default, Deserialize)]
struct GoTrueUser {
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

impl GoTrueUser {
    fn into_identity(self, fallback_email: &str) -> Identity {
        let role = self
            .user_metadata
            .get("role")
            .cloned()
            .and_then(|role| serde_json::from_value::<Role>(role).ok());
        Identity {
            email: self
                .email
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| fallback_email.to_string()),
            role,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    refresh_token: Option<String>,
    #[serde(default)]
    user: GoTrueUser,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct StoredTokens {
    access_token: String,
    refresh_token: Option<String>,
    email: String,
}

/// GoTrue REST client. Tokens live in a file so that separate CLI invocations
/// share one remote session.
pub struct SupabaseAuth {
    client: Client,
    base_url: String,
    anon_key: String,
    token_path: PathBuf,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseAuth {
    pub fn new(base_url: &str, anon_key: String, token_path: PathBuf) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            token_path,
            events,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn emit(&self, event: AuthEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    async fn grant(&self, grant_type: &str, body: Value) -> Result<TokenGrant, PortalError> {
        let response = self
            .client
            .post(self.url("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(match PortalError::from_response(response).await {
                PortalError::Api { message, .. } => PortalError::Auth(message),
                other => other,
            });
        }
        Ok(response.json().await?)
    }

    fn accept_grant(&self, grant: TokenGrant, email: &str) -> Result<Identity, PortalError> {
        let identity = grant.user.into_identity(email);
        self.store_tokens(&StoredTokens {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            email: identity.email.clone(),
        })?;
        Ok(identity)
    }

    async fn refresh(&self, tokens: &StoredTokens) -> Option<Identity> {
        let refresh_token = tokens.refresh_token.as_deref()?;
        match self
            .grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
        {
            Ok(grant) => match self.accept_grant(grant, &tokens.email) {
                Ok(identity) => {
                    self.emit(AuthEvent::TokenRefreshed);
                    Some(identity)
                }
                Err(error) => {
                    warn!(%error, "could not store refreshed tokens");
                    None
                }
            },
            Err(error) => {
                debug!(%error, "token refresh rejected");
                None
            }
        }
    }

    fn load_tokens(&self) -> Option<StoredTokens> {
        let raw = fs::read_to_string(&self.token_path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(tokens) => Some(tokens),
            Err(error) => {
                warn!(%error, "ignoring unreadable auth token file");
                None
            }
        }
    }

    fn store_tokens(&self, tokens: &StoredTokens) -> Result<(), PortalError> {
        if let Some(parent) = self.token_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PortalError::Cache(format!("mkdir {}: {e}", parent.display())))?;
        }
        fs::write(&self.token_path, serde_json::to_string(tokens)?).map_err(|e| {
            PortalError::Cache(format!("write {}: {e}", self.token_path.display()))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.token_path, fs::Permissions::from_mode(0o600)).map_err(
                |e| PortalError::Cache(format!("chmod {}: {e}", self.token_path.display())),
            )?;
        }
        Ok(())
    }

    fn delete_tokens(&self) {
        if let Err(e) = fs::remove_file(&self.token_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to delete {}: {e}", self.token_path.display());
            }
        }
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<Identity, PortalError> {
        let response = self
            .client
            .post(self.url("signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "role": role.as_str(), "profile_status": "incomplete" }
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(match PortalError::from_response(response).await {
                PortalError::Api { message, .. } => PortalError::Auth(message),
                other => other,
            });
        }

        let body: Value = response.json().await?;
        info!(email, role = role.as_str(), "account created");

        // With e-mail confirmation disabled GoTrue answers with a full session.
        if body.get("access_token").is_some() {
            let grant: TokenGrant = serde_json::from_value(body)?;
            let identity = self.accept_grant(grant, email)?;
            self.emit(AuthEvent::SignedIn(identity.clone()));
            return Ok(identity);
        }
        Ok(Identity {
            email: email.to_string(),
            role: Some(role),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, PortalError> {
        let grant = self
            .grant("password", json!({ "email": email, "password": password }))
            .await?;
        let identity = self.accept_grant(grant, email)?;
        self.emit(AuthEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    /// Local tokens are dropped before the remote call, so a failed call still
    /// leaves this client signed out.
    async fn sign_out(&self) -> Result<(), PortalError> {
        let tokens = self.load_tokens();
        self.delete_tokens();
        self.emit(AuthEvent::SignedOut);

        let Some(tokens) = tokens else {
            return Ok(());
        };
        let response = self
            .client
            .post(self.url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&tokens.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PortalError::from_response(response).await);
        }
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), PortalError> {
        let response = self
            .client
            .post(self.url("recover"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PortalError::from_response(response).await);
        }
        Ok(())
    }

    async fn current_identity(&self) -> Result<Option<Identity>, PortalError> {
        let Some(tokens) = self.load_tokens() else {
            return Ok(None);
        };

        let response = self
            .client
            .get(self.url("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&tokens.access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let user: GoTrueUser = response.json().await?;
                Ok(Some(user.into_identity(&tokens.email)))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let identity = self.refresh(&tokens).await;
                if identity.is_none() {
                    self.delete_tokens();
                }
                Ok(identity)
            }
            _ => Err(PortalError::from_response(response).await),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

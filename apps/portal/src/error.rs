use thiserror::Error;

/// Errors surfaced by the portal to its caller (CLI command or test).
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("{0}")]
    Validation(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Session cache error: {0}")]
    Cache(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl PortalError {
    /// Builds an `Api` error from a non-success response, preferring the
    /// server's `{"error": {"message"}}` envelope over the raw body.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .or_else(|| v.get("msg"))
                    .or_else(|| v.get("error_description"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or(body);
        PortalError::Api { status, message }
    }
}

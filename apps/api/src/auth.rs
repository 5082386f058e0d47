use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::errors::AppError;

pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// The caller, identified by the `X-User-Email` header the portal attaches to
/// every profile/application/upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let email = parts
            .headers
            .get(USER_EMAIL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_lowercase())
            .filter(|v| is_plausible_email(v))
            .ok_or_else(|| {
                tracing::warn!("missing or malformed {USER_EMAIL_HEADER} header");
                AppError::Unauthorized
            })?;
        Ok(CurrentUser { email })
    }
}

fn is_plausible_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !value.contains(' '),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<CurrentUser, AppError> {
        let mut builder = Request::builder().uri("/api/v1/candidates/profile");
        if let Some(value) = header {
            builder = builder.header(USER_EMAIL_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_email_is_normalised() {
        let user = extract(Some("  Yassine@Example.MA ")).await.unwrap();
        assert_eq!(user.email, "yassine@example.ma");
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        assert!(matches!(extract(None).await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_malformed_header_is_unauthorized() {
        assert!(matches!(
            extract(Some("not-an-email")).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            extract(Some("@example.ma")).await,
            Err(AppError::Unauthorized)
        ));
    }
}

//! Pre-signed upload targets: the portal asks for a URL, then PUTs the file bytes
//! directly to object storage.

use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadCategory {
    Cv,
    CompanyDoc,
}

impl UploadCategory {
    fn prefix(self) -> &'static str {
        match self {
            UploadCategory::Cv => "cvs",
            UploadCategory::CompanyDoc => "company-docs",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub file_name: String,
    pub file_type: String,
    pub category: UploadCategory,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub public_url: String,
    pub key: String,
    pub expires_in_secs: u64,
}

/// POST /api/v1/uploads/upload-url
///
/// Registration uploads happen before the account exists, so the caller is optional.
pub async fn handle_upload_url(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Json(request): Json<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>, AppError> {
    if request.file_type.trim().is_empty() {
        return Err(AppError::Validation("fileType cannot be empty".to_string()));
    }

    let owner = user.as_ref().map(|u| u.email.as_str());
    let key = object_key(request.category, owner, &request.file_name, Uuid::new_v4());
    let ttl = state.config.upload_url_ttl_secs;

    let presigning = PresigningConfig::expires_in(Duration::from_secs(ttl))
        .map_err(|e| AppError::S3(format!("invalid presigning config: {e}")))?;
    let presigned = state
        .s3
        .put_object()
        .bucket(&state.config.s3_bucket)
        .key(&key)
        .content_type(request.file_type.trim())
        .presigned(presigning)
        .await
        .map_err(|e| AppError::S3(format!("presigning failed: {e}")))?;

    info!("Issued upload URL for s3://{}/{}", state.config.s3_bucket, key);

    Ok(Json(UploadUrlResponse {
        upload_url: presigned.uri().to_string(),
        public_url: public_url(&state.config.s3_public_base_url, &key),
        key,
        expires_in_secs: ttl,
    }))
}

/// `<prefix>/<owner>/<id>-<file name>`, with both owner and file name reduced to
/// URL-safe characters.
pub fn object_key(
    category: UploadCategory,
    owner: Option<&str>,
    file_name: &str,
    id: Uuid,
) -> String {
    let owner = owner.map(sanitize_segment).unwrap_or_else(|| "anonymous".to_string());
    let file_name = match sanitize_segment(file_name) {
        name if name.trim_matches(|c: char| c == '-' || c == '.').is_empty() => "document".to_string(),
        name => name,
    };
    format!("{}/{}/{}-{}", category.prefix(), owner, id, file_name)
}

pub fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

fn sanitize_segment(value: &str) -> String {
    let name = value.rsplit(['/', '\\']).next().unwrap_or(value);
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '@') {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_for_candidate_cv() {
        let id = Uuid::nil();
        assert_eq!(
            object_key(UploadCategory::Cv, Some("amine@mail.ma"), "Mon CV 2025.pdf", id),
            format!("cvs/amine@mail.ma/{id}-mon-cv-2025.pdf")
        );
    }

    #[test]
    fn test_object_key_strips_paths_and_defaults_owner() {
        let id = Uuid::nil();
        assert_eq!(
            object_key(UploadCategory::CompanyDoc, None, "../../etc/passwd", id),
            format!("company-docs/anonymous/{id}-passwd")
        );
        assert_eq!(
            object_key(UploadCategory::CompanyDoc, None, "  ", id),
            format!("company-docs/anonymous/{id}-document")
        );
    }

    #[test]
    fn test_public_url_joins_without_double_slash() {
        assert_eq!(
            public_url("http://localhost:9000/uploads/", "cvs/a/b.pdf"),
            "http://localhost:9000/uploads/cvs/a/b.pdf"
        );
    }

    #[test]
    fn test_category_deserializes_snake_case() {
        let request: UploadUrlRequest = serde_json::from_value(serde_json::json!({
            "fileName": "kbis.pdf",
            "fileType": "application/pdf",
            "category": "company_doc"
        }))
        .unwrap();
        assert_eq!(request.category, UploadCategory::CompanyDoc);
    }
}

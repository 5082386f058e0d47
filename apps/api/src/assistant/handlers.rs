use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::assistant::documents::{inline_from_bytes, CompanyFields, DocumentUpload, ResumeFields};
use crate::assistant::ADVICE_FALLBACK;
use crate::errors::AppError;
use crate::llm_client::InlineDocument;
use crate::state::AppState;

const MAX_QUERY_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct AdviceRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct AdviceResponse {
    pub answer: String,
}

/// POST /api/v1/documents/resume
pub async fn handle_extract_resume(
    State(state): State<AppState>,
    Json(upload): Json<DocumentUpload>,
) -> Result<Json<ResumeFields>, AppError> {
    let document = upload.into_inline()?;
    Ok(Json(state.assistant.extract_resume(&document).await?))
}

/// POST /api/v1/documents/company
pub async fn handle_extract_company(
    State(state): State<AppState>,
    Json(upload): Json<DocumentUpload>,
) -> Result<Json<CompanyFields>, AppError> {
    let document = upload.into_inline()?;
    Ok(Json(state.assistant.extract_company(&document).await?))
}

/// POST /api/v1/documents/resume/file
pub async fn handle_extract_resume_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ResumeFields>, AppError> {
    let document = read_file_field(multipart).await?;
    Ok(Json(state.assistant.extract_resume(&document).await?))
}

/// POST /api/v1/documents/company/file
pub async fn handle_extract_company_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<CompanyFields>, AppError> {
    let document = read_file_field(multipart).await?;
    Ok(Json(state.assistant.extract_company(&document).await?))
}

/// POST /api/v1/assistant/advice
///
/// A model failure still answers 200 with a fixed apology; only an empty or
/// oversized question is rejected.
pub async fn handle_advice(
    State(state): State<AppState>,
    Json(request): Json<AdviceRequest>,
) -> Result<Json<AdviceResponse>, AppError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(AppError::Validation("query cannot be empty".to_string()));
    }
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(AppError::Validation(format!(
            "query cannot exceed {MAX_QUERY_CHARS} characters"
        )));
    }

    let answer = match state.assistant.career_advice(query).await {
        Ok(answer) => answer,
        Err(error) => {
            tracing::warn!(%error, "career advice unavailable");
            ADVICE_FALLBACK.to_string()
        }
    };

    Ok(Json(AdviceResponse { answer }))
}

/// Reads the `file` part of a multipart body.
async fn read_file_field(mut multipart: Multipart) -> Result<InlineDocument, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data: Bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("could not read file: {e}")))?;
        return inline_from_bytes(&mime_type, &data);
    }
    Err(AppError::Validation("missing 'file' field".to_string()))
}

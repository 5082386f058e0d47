//! Incoming documents and the structured fields extracted from them.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};

use crate::assistant::prompts::EDUCATION_LEVELS;
use crate::errors::AppError;
use crate::llm_client::InlineDocument;

pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

pub const ACCEPTED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/webp",
    "text/plain",
];

/// A document as sent by the portal: base64 bytes plus MIME type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpload {
    pub data: String,
    pub mime_type: String,
}

impl DocumentUpload {
    /// Validates the MIME type, strips an optional `data:` URL prefix and checks
    /// that the payload decodes to a non-empty document within the size limit.
    pub fn into_inline(self) -> Result<InlineDocument, AppError> {
        let mime_type = accepted_mime(&self.mime_type)?;
        let data = match self.data.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => self.data.as_str(),
        };
        let data: String = data.chars().filter(|c| !c.is_whitespace()).collect();

        let decoded = STANDARD
            .decode(data.as_bytes())
            .map_err(|e| AppError::Validation(format!("document is not valid base64: {e}")))?;
        check_size(decoded.len())?;

        Ok(InlineDocument { mime_type, data })
    }
}

/// Builds an inline document from raw uploaded bytes.
pub fn inline_from_bytes(mime_type: &str, bytes: &[u8]) -> Result<InlineDocument, AppError> {
    let mime_type = accepted_mime(mime_type)?;
    check_size(bytes.len())?;
    Ok(InlineDocument {
        mime_type,
        data: STANDARD.encode(bytes),
    })
}

fn accepted_mime(mime_type: &str) -> Result<String, AppError> {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if ACCEPTED_MIME_TYPES.contains(&essence.as_str()) {
        Ok(essence)
    } else {
        Err(AppError::UnprocessableEntity(format!(
            "unsupported document type '{mime_type}'"
        )))
    }
}

fn check_size(len: usize) -> Result<(), AppError> {
    if len == 0 {
        return Err(AppError::Validation("document is empty".to_string()));
    }
    if len > MAX_DOCUMENT_BYTES {
        return Err(AppError::Validation(format!(
            "document exceeds {} MiB",
            MAX_DOCUMENT_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Extracted fields
// ────────────────────────────────────────────────────────────────────────────

/// Models sometimes answer `null` instead of omitting a field.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Resume fields as returned by the model, before normalisation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawResumeFields {
    #[serde(deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub last_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub city: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub education_level: String,
    pub experience_years: Option<f64>,
    #[serde(deserialize_with = "null_as_empty")]
    pub skills: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub school: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeFields {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub education_level: String,
    pub experience_years: u32,
    pub skills: String,
    pub description: String,
    pub school: String,
}

impl From<RawResumeFields> for ResumeFields {
    fn from(raw: RawResumeFields) -> Self {
        let education_level = EDUCATION_LEVELS
            .iter()
            .find(|level| level.eq_ignore_ascii_case(raw.education_level.trim()))
            .map(|level| level.to_string())
            .unwrap_or_default();
        let experience_years = raw
            .experience_years
            .filter(|y| y.is_finite() && *y > 0.0)
            .map(|y| y.round().min(60.0) as u32)
            .unwrap_or(0);

        ResumeFields {
            first_name: raw.first_name.trim().to_string(),
            last_name: raw.last_name.trim().to_string(),
            email: raw.email.trim().to_lowercase(),
            phone: raw.phone.trim().to_string(),
            city: raw.city.trim().to_string(),
            education_level,
            experience_years,
            skills: raw.skills.trim().to_string(),
            description: raw.description.trim().to_string(),
            school: raw.school.trim().to_string(),
        }
    }
}

/// Company document fields. `first_name` carries the company name, matching the
/// registration form the portal pre-fills.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyFields {
    #[serde(deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub company_sector: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub city: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub description: String,
}

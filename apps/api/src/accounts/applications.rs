use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::catalog::offers;
use crate::errors::AppError;

pub const DEFAULT_STATUS: &str = "submitted";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_offer_id: Uuid,
    pub candidate_email: String,
    pub company_id: Option<String>,
    pub offer_title: String,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub job_id: Uuid,
    pub company_id: Option<String>,
    #[serde(default)]
    pub offer_title: String,
}

/// Records an application to an existing offer. The offer title falls back to
/// the offer's own title when the client did not send one.
pub async fn apply(
    pool: &PgPool,
    candidate_email: &str,
    request: ApplyRequest,
) -> Result<Application, AppError> {
    let offer = offers::get_by_id(pool, request.job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Offer {} not found", request.job_id)))?;

    let offer_title = if request.offer_title.trim().is_empty() {
        offer.emploi_metier
    } else {
        request.offer_title.trim().to_string()
    };

    let application = sqlx::query_as::<_, Application>(
        r#"
        INSERT INTO applications (job_offer_id, candidate_email, company_id, offer_title, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(request.job_id)
    .bind(candidate_email)
    .bind(&request.company_id)
    .bind(&offer_title)
    .bind(DEFAULT_STATUS)
    .fetch_one(pool)
    .await?;

    info!(
        "Application {} by {candidate_email} to offer {}",
        application.id, application.job_offer_id
    );
    Ok(application)
}

pub async fn list_for(pool: &PgPool, candidate_email: &str) -> Result<Vec<Application>, AppError> {
    Ok(sqlx::query_as::<_, Application>(
        "SELECT * FROM applications WHERE candidate_email = $1 ORDER BY submitted_at DESC",
    )
    .bind(candidate_email)
    .fetch_all(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_request_accepts_portal_payload() {
        let id = Uuid::new_v4();
        let request: ApplyRequest = serde_json::from_value(serde_json::json!({
            "jobId": id,
            "companyId": "42",
            "offerTitle": "Chef de rang"
        }))
        .unwrap();
        assert_eq!(request.job_id, id);
        assert_eq!(request.company_id.as_deref(), Some("42"));
        assert_eq!(request.offer_title, "Chef de rang");
    }

    #[test]
    fn test_apply_request_title_is_optional() {
        let request: ApplyRequest =
            serde_json::from_value(serde_json::json!({ "jobId": Uuid::new_v4() })).unwrap();
        assert!(request.offer_title.is_empty());
        assert!(request.company_id.is_none());
    }
}

//! REST client for the job board API.
//!
//! One attempt per call, 15 s timeout. Calls the server answers with the model
//! (summaries, document extraction, advice) get a longer budget that outlasts
//! the server's own. Caller-scoped endpoints identify the user with the
//! `X-User-Email` header.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::PortalError;
use crate::session::ProfileStore;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MODEL_REQUEST_TIMEOUT: Duration = Duration::from_secs(150);
const USER_EMAIL_HEADER: &str = "X-User-Email";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    Offers,
    Companies,
    Schools,
    Articles,
}

impl Catalog {
    fn path(self) -> &'static str {
        match self {
            Catalog::Offers => "offers",
            Catalog::Companies => "companies",
            Catalog::Schools => "schools",
            Catalog::Articles => "articles",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobOffer {
    pub id: Uuid,
    pub emploi_metier: String,
    pub raison_sociale: String,
    pub ville: String,
    pub type_contrat: String,
    pub date_offre: NaiveDate,
    pub nbre_postes: i32,
    pub full_description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub suggested_salary_range: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Company {
    pub name: String,
    pub slug: String,
    pub sector: String,
    pub city: String,
    pub is_verified: bool,
    pub active_offers_count: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct School {
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub school_type: String,
    pub city: String,
    pub is_partner: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    pub title: String,
    pub slug: String,
    pub category: String,
    pub excerpt: Option<String>,
    pub read_time_minutes: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub job_offer_id: Uuid,
    pub offer_title: String,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
}

/// Publish-offer payload, field names as the API expects them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewOffer {
    pub emploi_metier: String,
    pub raison_sociale: String,
    pub ville: String,
    pub type_contrat: String,
    pub nbre_postes: Option<i32>,
    pub full_description: String,
    /// Comma-separated.
    pub required_skills: Option<String>,
    pub suggested_salary_range: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadCategory {
    Cv,
    CompanyDoc,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub upload_url: String,
    pub public_url: String,
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Resume,
    Company,
}

#[derive(Deserialize)]
struct SummaryResponse {
    summary: String,
}

#[derive(Deserialize)]
struct AdviceResponse {
    answer: String,
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    model_timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeouts(base_url, REQUEST_TIMEOUT, MODEL_REQUEST_TIMEOUT)
    }

    fn with_timeouts(base_url: &str, timeout: Duration, model_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model_timeout,
        }
    }

    /// POST to a route whose answer comes from the model.
    fn model_post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path)).timeout(self.model_timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, PortalError> {
        let response = request.send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Like [`Self::send`], but a 404 becomes `Ok(None)`.
    async fn send_optional<T: DeserializeOwned>(
        request: RequestBuilder,
    ) -> Result<Option<T>, PortalError> {
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::check(response).await?.json().await?))
    }

    async fn check(response: Response) -> Result<Response, PortalError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(PortalError::from_response(response).await)
        }
    }

    /// Lists a catalog. `criteria` are passed through as query-string pairs;
    /// none means the unfiltered listing.
    pub async fn search<T: DeserializeOwned>(
        &self,
        catalog: Catalog,
        criteria: &[(String, String)],
    ) -> Result<Vec<T>, PortalError> {
        debug!(catalog = catalog.path(), ?criteria, "listing");
        Self::send(self.client.get(self.url(catalog.path())).query(criteria)).await
    }

    pub async fn offer(&self, id: Uuid) -> Result<Option<JobOffer>, PortalError> {
        Self::send_optional(self.client.get(self.url(&format!("offers/{id}")))).await
    }

    pub async fn offer_summary(&self, id: Uuid) -> Result<String, PortalError> {
        let response: SummaryResponse =
            Self::send(self.model_post(&format!("offers/{id}/summary"))).await?;
        Ok(response.summary)
    }

    pub async fn applications(&self, email: &str) -> Result<Vec<Application>, PortalError> {
        Self::send(
            self.client
                .get(self.url("candidates/applications"))
                .header(USER_EMAIL_HEADER, email),
        )
        .await
    }

    pub async fn apply(
        &self,
        email: &str,
        job_id: Uuid,
        company_id: Option<&str>,
        offer_title: &str,
    ) -> Result<Application, PortalError> {
        Self::send(
            self.client
                .post(self.url("candidates/applications"))
                .header(USER_EMAIL_HEADER, email)
                .json(&json!({
                    "jobId": job_id,
                    "companyId": company_id,
                    "offerTitle": offer_title,
                })),
        )
        .await
    }

    pub async fn employer_jobs(&self, email: &str) -> Result<Vec<JobOffer>, PortalError> {
        Self::send(
            self.client
                .get(self.url("employer/jobs"))
                .header(USER_EMAIL_HEADER, email),
        )
        .await
    }

    pub async fn publish_offer(&self, email: &str, offer: &NewOffer) -> Result<JobOffer, PortalError> {
        Self::send(
            self.client
                .post(self.url("employer/jobs"))
                .header(USER_EMAIL_HEADER, email)
                .json(offer),
        )
        .await
    }

    /// Asks for a pre-signed target, then PUTs the bytes straight to storage.
    pub async fn upload(
        &self,
        email: Option<&str>,
        file_name: &str,
        content_type: &str,
        category: UploadCategory,
        bytes: Vec<u8>,
    ) -> Result<UploadTarget, PortalError> {
        let mut request = self.client.post(self.url("uploads/upload-url")).json(&json!({
            "fileName": file_name,
            "fileType": content_type,
            "category": category,
        }));
        if let Some(email) = email {
            request = request.header(USER_EMAIL_HEADER, email);
        }
        let target: UploadTarget = Self::send(request).await?;

        let response = self
            .client
            .put(&target.upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        Self::check(response).await?;
        debug!(key = %target.key, "upload complete");
        Ok(target)
    }

    /// Sends a document for field extraction. The result is the profile detail
    /// blob a registration can start from.
    pub async fn extract_document(
        &self,
        kind: DocumentKind,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<Map<String, Value>, PortalError> {
        let path = match kind {
            DocumentKind::Resume => "documents/resume",
            DocumentKind::Company => "documents/company",
        };
        Self::send(self.model_post(path).json(&json!({
            "data": STANDARD.encode(bytes),
            "mimeType": mime_type,
        })))
        .await
    }

    pub async fn advice(&self, query: &str) -> Result<String, PortalError> {
        let response: AdviceResponse = Self::send(
            self.model_post("assistant/advice")
                .json(&json!({ "query": query })),
        )
        .await?;
        Ok(response.answer)
    }
}

#[async_trait]
impl ProfileStore for ApiClient {
    async fn fetch_profile(&self, email: &str) -> Result<Map<String, Value>, PortalError> {
        Self::send(
            self.client
                .get(self.url("candidates/profile"))
                .header(USER_EMAIL_HEADER, email),
        )
        .await
    }

    async fn upsert_profile(
        &self,
        email: &str,
        details: &Map<String, Value>,
    ) -> Result<(), PortalError> {
        let _: Value = Self::send(
            self.client
                .post(self.url("candidates/profile"))
                .header(USER_EMAIL_HEADER, email)
                .json(details),
        )
        .await?;
        Ok(())
    }
}

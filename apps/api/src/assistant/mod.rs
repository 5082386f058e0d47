//! Document intelligence and the career assistant.
//!
//! `AppState` holds an `Arc<dyn DocumentAssistant>`; the default backend is
//! [`GeminiAssistant`]. All model calls go through `llm_client`.

pub mod documents;
pub mod handlers;
pub mod prompts;

use async_trait::async_trait;

use crate::assistant::documents::{CompanyFields, RawResumeFields, ResumeFields};
use crate::errors::AppError;
use crate::llm_client::{GenerationConfig, InlineDocument, LlmClient, DOCUMENT_MODEL, TEXT_MODEL};

/// Shown to the user when the advice model is unavailable.
pub const ADVICE_FALLBACK: &str =
    "Une erreur est survenue lors de la génération des conseils. Réessayez dans un instant.";

#[async_trait]
pub trait DocumentAssistant: Send + Sync {
    async fn extract_resume(&self, document: &InlineDocument) -> Result<ResumeFields, AppError>;

    async fn extract_company(&self, document: &InlineDocument)
        -> Result<CompanyFields, AppError>;

    async fn career_advice(&self, query: &str) -> Result<String, AppError>;

    async fn summarize_offer(&self, title: &str, description: &str) -> Result<String, AppError>;
}

pub struct GeminiAssistant(pub LlmClient);

#[async_trait]
impl DocumentAssistant for GeminiAssistant {
    async fn extract_resume(&self, document: &InlineDocument) -> Result<ResumeFields, AppError> {
        let raw: RawResumeFields = self
            .0
            .extract_json(
                DOCUMENT_MODEL,
                document,
                &prompts::resume_instruction(),
                prompts::resume_schema(),
            )
            .await
            .map_err(|e| AppError::Llm(format!("CV extraction failed: {e}")))?;
        Ok(ResumeFields::from(raw))
    }

    async fn extract_company(
        &self,
        document: &InlineDocument,
    ) -> Result<CompanyFields, AppError> {
        self.0
            .extract_json(
                TEXT_MODEL,
                document,
                &prompts::company_instruction(),
                prompts::company_schema(),
            )
            .await
            .map_err(|e| AppError::Llm(format!("Company document extraction failed: {e}")))
    }

    async fn career_advice(&self, query: &str) -> Result<String, AppError> {
        let config = GenerationConfig {
            temperature: Some(0.7),
            top_p: Some(0.95),
            ..GenerationConfig::default()
        };
        self.0
            .generate_text(TEXT_MODEL, &prompts::advice_prompt(query), config)
            .await
            .map_err(|e| AppError::Llm(format!("Career advice failed: {e}")))
    }

    async fn summarize_offer(&self, title: &str, description: &str) -> Result<String, AppError> {
        let config = GenerationConfig {
            temperature: Some(0.5),
            ..GenerationConfig::default()
        };
        self.0
            .generate_text(
                TEXT_MODEL,
                &prompts::offer_summary_prompt(title, description),
                config,
            )
            .await
            .map_err(|e| AppError::Llm(format!("Offer summary failed: {e}")))
    }
}

pub mod health;

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;

use crate::accounts::handlers as accounts;
use crate::assistant::handlers as assistant;
use crate::catalog::handlers as catalog;
use crate::llm_client;
use crate::state::AppState;
use crate::uploads;

/// Base64 inflates a 10 MiB document to roughly 13.4 MiB of JSON.
const DOCUMENT_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Request budget for routes that never call the model.
pub const API_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Request budget for routes that call the model. Outlasts the Gemini client
/// timeout so model failures still reach the handler's fallback.
pub const AI_REQUEST_TIMEOUT: Duration =
    Duration::from_secs(llm_client::REQUEST_TIMEOUT_SECS + 30);

pub fn build_router(state: AppState) -> Router {
    let documents = Router::new()
        .route("/api/v1/documents/resume", post(assistant::handle_extract_resume))
        .route("/api/v1/documents/company", post(assistant::handle_extract_company))
        .route(
            "/api/v1/documents/resume/file",
            post(assistant::handle_extract_resume_file),
        )
        .route(
            "/api/v1/documents/company/file",
            post(assistant::handle_extract_company_file),
        )
        .layer(DefaultBodyLimit::max(DOCUMENT_BODY_LIMIT));

    let model_backed = Router::new()
        .route(
            "/api/v1/offers/:id/summary",
            post(catalog::handle_summarize_offer),
        )
        .route("/api/v1/assistant/advice", post(assistant::handle_advice))
        .merge(documents)
        .layer(TimeoutLayer::new(AI_REQUEST_TIMEOUT));

    let data = Router::new()
        .route("/health", get(health::health_handler))
        // Catalog
        .route("/api/v1/offers", get(catalog::handle_search_offers))
        .route("/api/v1/offers/recent", get(catalog::handle_recent_offers))
        .route("/api/v1/offers/stats", get(catalog::handle_offer_stats))
        .route("/api/v1/offers/:id", get(catalog::handle_get_offer))
        .route("/api/v1/companies", get(catalog::handle_search_companies))
        .route("/api/v1/companies/stats", get(catalog::handle_company_stats))
        .route("/api/v1/companies/:slug", get(catalog::handle_get_company))
        .route("/api/v1/schools", get(catalog::handle_search_schools))
        .route("/api/v1/schools/:slug", get(catalog::handle_get_school))
        .route("/api/v1/articles", get(catalog::handle_search_articles))
        .route(
            "/api/v1/articles/featured",
            get(catalog::handle_featured_articles),
        )
        .route(
            "/api/v1/articles/categories",
            get(catalog::handle_article_categories),
        )
        .route("/api/v1/articles/:slug", get(catalog::handle_get_article))
        // Caller-scoped
        .route(
            "/api/v1/candidates/profile",
            get(accounts::handle_get_profile).post(accounts::handle_save_profile),
        )
        .route(
            "/api/v1/candidates/applications",
            get(accounts::handle_list_applications).post(accounts::handle_apply),
        )
        .route(
            "/api/v1/employer/jobs",
            get(accounts::handle_employer_jobs).post(accounts::handle_publish_offer),
        )
        .route("/api/v1/uploads/upload-url", post(uploads::handle_upload_url))
        .layer(TimeoutLayer::new(API_REQUEST_TIMEOUT));

    data.merge(model_backed).with_state(state)
}

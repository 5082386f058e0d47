//! Axum route handlers for the public catalog.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::articles::{self, Article, ArticleFilters};
use crate::catalog::companies::{self, Company, CompanyFilters, CompanyStats};
use crate::catalog::offers::{self, JobOffer, OfferFilters, OfferStats};
use crate::catalog::schools::{self, School, SchoolFilters};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OfferSummaryResponse {
    pub offer_id: Uuid,
    pub summary: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Offers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/offers
pub async fn handle_search_offers(
    State(state): State<AppState>,
    Query(filters): Query<OfferFilters>,
) -> Result<Json<Vec<JobOffer>>, AppError> {
    Ok(Json(offers::search(&state.db, &filters).await?))
}

/// GET /api/v1/offers/recent
pub async fn handle_recent_offers(
    State(state): State<AppState>,
    Query(params): Query<RecentQuery>,
) -> Result<Json<Vec<JobOffer>>, AppError> {
    Ok(Json(offers::recent(&state.db, params.limit).await?))
}

/// GET /api/v1/offers/stats
pub async fn handle_offer_stats(
    State(state): State<AppState>,
) -> Result<Json<OfferStats>, AppError> {
    Ok(Json(offers::stats(&state.db).await?))
}

/// GET /api/v1/offers/:id
pub async fn handle_get_offer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobOffer>, AppError> {
    offers::get_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Offer {id} not found")))
}

/// POST /api/v1/offers/:id/summary
///
/// Three-point summary of an offer. Falls back to the raw description when the
/// model is unavailable.
pub async fn handle_summarize_offer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OfferSummaryResponse>, AppError> {
    let offer = offers::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Offer {id} not found")))?;

    let summary = match state
        .assistant
        .summarize_offer(&offer.emploi_metier, &offer.full_description)
        .await
    {
        Ok(summary) => summary,
        Err(error) => {
            tracing::warn!(%error, offer_id = %id, "offer summary unavailable, using description");
            offer.full_description
        }
    };

    Ok(Json(OfferSummaryResponse {
        offer_id: id,
        summary,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Companies
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/companies
pub async fn handle_search_companies(
    State(state): State<AppState>,
    Query(filters): Query<CompanyFilters>,
) -> Result<Json<Vec<Company>>, AppError> {
    Ok(Json(companies::search(&state.db, &filters).await?))
}

/// GET /api/v1/companies/stats
pub async fn handle_company_stats(
    State(state): State<AppState>,
) -> Result<Json<CompanyStats>, AppError> {
    Ok(Json(companies::stats(&state.db).await?))
}

/// GET /api/v1/companies/:slug
pub async fn handle_get_company(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Company>, AppError> {
    companies::get_by_slug(&state.db, &slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Company {slug} not found")))
}

// ────────────────────────────────────────────────────────────────────────────
// Schools
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/schools
pub async fn handle_search_schools(
    State(state): State<AppState>,
    Query(filters): Query<SchoolFilters>,
) -> Result<Json<Vec<School>>, AppError> {
    Ok(Json(schools::search(&state.db, &filters).await?))
}

/// GET /api/v1/schools/:slug
pub async fn handle_get_school(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<School>, AppError> {
    schools::get_by_slug(&state.db, &slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("School {slug} not found")))
}

// ────────────────────────────────────────────────────────────────────────────
// Articles
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/articles
pub async fn handle_search_articles(
    State(state): State<AppState>,
    Query(filters): Query<ArticleFilters>,
) -> Result<Json<Vec<Article>>, AppError> {
    Ok(Json(articles::search(&state.db, &filters).await?))
}

/// GET /api/v1/articles/featured
pub async fn handle_featured_articles(
    State(state): State<AppState>,
) -> Result<Json<Vec<Article>>, AppError> {
    Ok(Json(articles::featured(&state.db).await?))
}

/// GET /api/v1/articles/categories
pub async fn handle_article_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(articles::categories(&state.db).await?))
}

/// GET /api/v1/articles/:slug
pub async fn handle_get_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Article>, AppError> {
    articles::get_by_slug(&state.db, &slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Article {slug} not found")))
}

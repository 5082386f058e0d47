use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde_json::Value;

use crate::accounts::applications::{self, Application, ApplyRequest};
use crate::accounts::profiles;
use crate::auth::CurrentUser;
use crate::catalog::offers::{self, JobOffer, PublishOfferRequest};
use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/candidates/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Value>, AppError> {
    Ok(Json(profiles::fetch(&state.db, &user.email).await?))
}

/// POST /api/v1/candidates/profile
pub async fn handle_save_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(details): Json<Value>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(profiles::upsert(&state.db, &user.email, details).await?))
}

/// GET /api/v1/candidates/applications
pub async fn handle_list_applications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Application>>, AppError> {
    Ok(Json(applications::list_for(&state.db, &user.email).await?))
}

/// POST /api/v1/candidates/applications
pub async fn handle_apply(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ApplyRequest>,
) -> Result<(StatusCode, Json<Application>), AppError> {
    let application = applications::apply(&state.db, &user.email, request).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /api/v1/employer/jobs
pub async fn handle_employer_jobs(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<JobOffer>>, AppError> {
    Ok(Json(offers::published_by(&state.db, &user.email).await?))
}

/// POST /api/v1/employer/jobs
pub async fn handle_publish_offer(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<PublishOfferRequest>,
) -> Result<(StatusCode, Json<JobOffer>), AppError> {
    let offer = request.prepare(Utc::now())?;
    let published = offers::publish(&state.db, &user.email, offer).await?;
    Ok((StatusCode::CREATED, Json(published)))
}

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Liveness probe. Never touches the database.
pub async fn health_handler() -> Json<Health> {
    Json(Health {
        status: "ok",
        service: "jobboard-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

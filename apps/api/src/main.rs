mod accounts;
mod assistant;
mod auth;
mod catalog;
mod config;
mod db;
mod errors;
mod llm_client;
mod routes;
mod state;
mod uploads;

use std::sync::Arc;

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assistant::GeminiAssistant;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::state::AppState;

// MinIO ignores the region but the SDK signer needs one.
const S3_REGION: &str = "us-east-1";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.rust_log);

    info!(version = env!("CARGO_PKG_VERSION"), "job board API starting");

    let state = AppState {
        db: db::connect(&config.database_url).await?,
        s3: s3_client(&config).await,
        assistant: Arc::new(GeminiAssistant(LlmClient::new(
            config.gemini_api_key.clone(),
        ))),
        config: config.clone(),
    };
    info!(
        bucket = %config.s3_bucket,
        text_model = llm_client::TEXT_MODEL,
        document_model = llm_client::DOCUMENT_MODEL,
        "clients ready"
    );

    // Per-route request timeouts are applied inside the router.
    let app = routes::build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// `RUST_LOG` wins when set; otherwise only this crate logs, at `default_level`.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{}={default_level}", env!("CARGO_PKG_NAME")))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Path-style addressing keeps object URLs under `<endpoint>/<bucket>/`, which
/// is what MinIO serves and what `s3_public_base_url` defaults to.
async fn s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "jobboard-static",
    );
    let shared = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(S3_REGION))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}

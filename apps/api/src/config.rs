use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

/// Server settings, read once from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    /// Prefix under which uploaded objects are publicly readable.
    /// Defaults to `<S3_ENDPOINT>/<S3_BUCKET>`.
    pub s3_public_base_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub gemini_api_key: String,
    pub upload_url_ttl_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let s3_endpoint = required("S3_ENDPOINT")?;
        let s3_bucket = required("S3_BUCKET")?;
        let s3_public_base_url = optional("S3_PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("{}/{s3_bucket}", s3_endpoint.trim_end_matches('/')));

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            aws_access_key_id: required("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
            gemini_api_key: required("GEMINI_API_KEY")?,
            upload_url_ttl_secs: parsed_or("UPLOAD_URL_TTL_SECS", 900)?,
            port: parsed_or("PORT", 8080)?,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".into()),
            s3_endpoint,
            s3_bucket,
            s3_public_base_url,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String> {
    optional(key).ok_or_else(|| anyhow!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DATA_DIR_NAME: &str = ".soussmassa";

/// Portal configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub api_url: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Holds the session cache and the auth token file.
    pub data_dir: PathBuf,
    pub rust_log: String,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let data_dir = match std::env::var("PORTAL_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::home_dir()
                .map(|home| home.join(DATA_DIR_NAME))
                .context("home directory not found; set PORTAL_DATA_DIR")?,
        };

        Ok(PortalConfig {
            api_url: std::env::var("PORTAL_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            supabase_url: require_env("SUPABASE_URL")?,
            supabase_anon_key: require_env("SUPABASE_ANON_KEY")?,
            data_dir,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()),
        })
    }

    pub fn session_cache_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn auth_token_path(&self) -> PathBuf {
        self.data_dir.join("auth.json")
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Missing required environment variable: {key}"))
}

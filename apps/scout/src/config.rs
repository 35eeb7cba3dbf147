use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_SOURCING_BASE_URL: &str = "https://app.leonar.app/api/v1";
const DEFAULT_LIVE_NETWORK_DAILY_LIMIT: u32 = 1000;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub sourcing_api_key: String,
    pub sourcing_base_url: String,
    pub anthropic_api_key: String,
    pub live_network_daily_limit: u32,
    /// `None` when no home directory is known and `USAGE_FILE` is unset;
    /// the quota counter then stays in memory at zero.
    pub usage_file: Option<PathBuf>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            sourcing_api_key: require_env("SOURCING_API_KEY")?,
            sourcing_base_url: std::env::var("SOURCING_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_SOURCING_BASE_URL.to_string()),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            live_network_daily_limit: match std::env::var("LIVE_NETWORK_DAILY_LIMIT") {
                Ok(value) => value
                    .parse::<u32>()
                    .context("LIVE_NETWORK_DAILY_LIMIT must be a non-negative integer")?,
                Err(_) => DEFAULT_LIVE_NETWORK_DAILY_LIMIT,
            },
            usage_file: std::env::var("USAGE_FILE")
                .ok()
                .map(PathBuf::from)
                .or_else(default_usage_file),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// `~/.scout/live_network_usage.json`
fn default_usage_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".scout").join("live_network_usage.json"))
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

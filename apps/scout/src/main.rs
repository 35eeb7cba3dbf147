mod config;
mod errors;
mod governor;
mod llm_client;
mod provider;
mod routes;
mod sourcing;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::governor::{FileUsageCounter, NullUsageCounter, QuotaGovernor, UsageCounter};
use crate::llm_client::LlmClient;
use crate::provider::ProviderClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Scout API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize sourcing provider client
    let provider = ProviderClient::new(
        config.sourcing_base_url.clone(),
        config.sourcing_api_key.clone(),
    );
    info!("Sourcing provider client initialized ({})", config.sourcing_base_url);

    // Live-network quota counter (file-backed when a location is known)
    let counter: Arc<dyn UsageCounter> = match &config.usage_file {
        Some(path) => {
            let file_counter = FileUsageCounter::new(path.clone());
            info!("Live-network usage file: {}", file_counter.path().display());
            Arc::new(file_counter)
        }
        None => {
            info!("No usage file location, live-network usage is not persisted");
            Arc::new(NullUsageCounter)
        }
    };
    let quota = QuotaGovernor::new(counter, config.live_network_daily_limit);
    info!(
        "Live-network quota: {}/{} used today",
        quota.used(),
        quota.daily_limit()
    );

    // Build app state
    let state = AppState {
        llm: Arc::new(llm),
        provider: Arc::new(provider),
        quota,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the form frontend's origin once it is deployed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

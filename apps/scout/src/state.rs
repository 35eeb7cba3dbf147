use std::sync::Arc;

use crate::config::Config;
use crate::governor::QuotaGovernor;
use crate::llm_client::LanguageModel;
use crate::provider::SourcingApi;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Claude in production; swapped for a scripted model in tests.
    pub llm: Arc<dyn LanguageModel>,
    pub provider: Arc<dyn SourcingApi>,
    /// Daily live-network ceiling, shared by every run of this process.
    pub quota: QuotaGovernor,
    pub config: Config,
}

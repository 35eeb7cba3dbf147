/// Sourcing provider client: every call against the provider REST API goes
/// through `ProviderClient::execute`, which applies the throttling policy of
/// the rate governor and classifies failures into `ProviderError`.
///
/// Pipeline code depends on the `SourcingApi` trait, never on `ProviderClient`.
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::governor::{self, backoff_delay, needs_pause, remaining_requests, MAX_ATTEMPTS};

pub mod models;

use models::{
    AddToProjectRequest, AddToProjectResult, ConnectedAccount, EntriesPage, Envelope,
    ListEnvelope, LiveSearchRequest, LocationMatch, NoteRequest, ProfilePayload, ProjectEntry,
    SearchPage, SourcingSearchRequest,
};

/// Scopes the provider token needs for every feature of this service.
pub const REQUIRED_SCOPES: &str = "sourcing:read, sourcing:write, contacts:read, projects:read";

/// Page size of the project-entries listing.
pub const ENTRIES_PAGE_SIZE: u32 = 50;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Invalid or revoked sourcing API key. Check SOURCING_API_KEY.")]
    InvalidApiKey,

    #[error("Insufficient permissions. Required scopes: {}. {message}", REQUIRED_SCOPES)]
    InsufficientScope { message: String },

    #[error("A paid subscription is required for this feature.")]
    BillingRequired,

    #[error("This feature is not available on the current plan.")]
    PlanUpgradeRequired,

    #[error("Invalid request parameters: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Provider rate limit exceeded after {attempts} attempts. Try again in a few minutes.")]
    RateLimitExceeded { attempts: u32 },

    #[error("{status} [{code}]: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Maps a non-success response to the provider error taxonomy using the
/// embedded `error.code`. Unknown codes keep the raw status and message.
pub fn classify_error(status: u16, body: &str) -> ProviderError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error);
    let code = detail
        .as_ref()
        .and_then(|d| d.code.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let message = detail
        .and_then(|d| d.message)
        .unwrap_or_else(|| body.to_string());

    match code.as_str() {
        "invalid_api_key" => ProviderError::InvalidApiKey,
        "insufficient_scope" => ProviderError::InsufficientScope { message },
        "billing_required" => ProviderError::BillingRequired,
        "plan_upgrade_required" => ProviderError::PlanUpgradeRequired,
        "validation_error" => ProviderError::Validation(message),
        "not_found" => ProviderError::NotFound(message),
        _ => ProviderError::Api {
            status,
            code,
            message,
        },
    }
}

/// The provider endpoints the candidate pipeline consumes.
#[async_trait]
pub trait SourcingApi: Send + Sync {
    async fn connected_accounts(&self) -> Result<Vec<ConnectedAccount>, ProviderError>;

    async fn lookup_locations(
        &self,
        query: &str,
        account_id: &str,
    ) -> Result<Vec<LocationMatch>, ProviderError>;

    async fn live_network_search(
        &self,
        request: &LiveSearchRequest,
    ) -> Result<SearchPage, ProviderError>;

    async fn sourcing_search(
        &self,
        request: &SourcingSearchRequest,
    ) -> Result<SearchPage, ProviderError>;

    async fn add_profiles_to_project(
        &self,
        project_id: &str,
        profiles: &[ProfilePayload],
    ) -> Result<AddToProjectResult, ProviderError>;

    async fn project_entries(
        &self,
        project_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<EntriesPage, ProviderError>;

    async fn add_note(&self, contact_id: &str, content: &str) -> Result<(), ProviderError>;
}

/// Fetches every entry of a project, 50 per page, pausing between pages.
pub async fn list_all_project_entries(
    api: &dyn SourcingApi,
    project_id: &str,
) -> Result<Vec<ProjectEntry>, ProviderError> {
    let mut entries = Vec::new();
    let mut offset = 0;

    loop {
        let page = api
            .project_entries(project_id, offset, ENTRIES_PAGE_SIZE)
            .await?;
        if page.entries.is_empty() {
            break;
        }
        entries.extend(page.entries);
        if !page.has_more {
            break;
        }
        offset += ENTRIES_PAGE_SIZE;
        tokio::time::sleep(governor::ENTRIES_PAGE_DELAY).await;
    }

    debug!(project_id, count = entries.len(), "Loaded existing project entries");
    Ok(entries)
}

/// Bearer-authenticated reqwest client for the provider REST API.
#[derive(Clone)]
pub struct ProviderClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ProviderClient {
    pub fn new(base_url: impl Into<String>, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");
        Self::with_client(client, base_url, api_key)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request built by `build`, retrying throttled responses with
    /// exponential backoff. Pauses when the provider reports fewer than 10
    /// requests left in the current window, whatever the status.
    async fn execute<F>(&self, build: F) -> Result<Response, ProviderError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        for attempt in 0..MAX_ATTEMPTS {
            let response = build().bearer_auth(&self.api_key).send().await?;

            let remaining = remaining_requests(response.headers());
            if needs_pause(remaining) {
                warn!(?remaining, "Provider quota window nearly spent, pausing");
                tokio::time::sleep(governor::LOW_REMAINING_PAUSE).await;
            }

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt + 1 == MAX_ATTEMPTS {
                    warn!("Provider throttled attempt {}, giving up", attempt + 1);
                    break;
                }
                let delay = backoff_delay(attempt);
                warn!(
                    "Provider throttled attempt {}, retrying after {}s...",
                    attempt + 1,
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(classify_error(status.as_u16(), &body));
            }

            return Ok(response);
        }

        Err(ProviderError::RateLimitExceeded {
            attempts: MAX_ATTEMPTS,
        })
    }

    async fn data<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
        Ok(response.json::<Envelope<T>>().await?.data)
    }
}

#[async_trait]
impl SourcingApi for ProviderClient {
    async fn connected_accounts(&self) -> Result<Vec<ConnectedAccount>, ProviderError> {
        let url = self.url("/connected-accounts");
        let response = self.execute(|| self.client.get(&url)).await?;
        Self::data(response).await
    }

    async fn lookup_locations(
        &self,
        query: &str,
        account_id: &str,
    ) -> Result<Vec<LocationMatch>, ProviderError> {
        let url = self.url("/sourcing/linkedin/locations");
        let params = [("q", query), ("account_id", account_id), ("api_type", "recruiter")];
        let response = self
            .execute(|| self.client.get(&url).query(&params))
            .await?;
        let envelope: ListEnvelope<LocationMatch> = response.json().await?;
        Ok(envelope.data)
    }

    async fn live_network_search(
        &self,
        request: &LiveSearchRequest,
    ) -> Result<SearchPage, ProviderError> {
        let url = self.url("/sourcing/linkedin/search");
        let response = self
            .execute(|| self.client.post(&url).json(request))
            .await?;
        Self::data(response).await
    }

    async fn sourcing_search(
        &self,
        request: &SourcingSearchRequest,
    ) -> Result<SearchPage, ProviderError> {
        let url = self.url("/sourcing/search");
        let response = self
            .execute(|| self.client.post(&url).json(request))
            .await?;
        Self::data(response).await
    }

    async fn add_profiles_to_project(
        &self,
        project_id: &str,
        profiles: &[ProfilePayload],
    ) -> Result<AddToProjectResult, ProviderError> {
        let url = self.url("/sourcing/add-to-project");
        let body = AddToProjectRequest {
            project_id,
            profiles,
        };
        let response = self
            .execute(|| self.client.post(&url).json(&body))
            .await?;
        Self::data(response).await
    }

    async fn project_entries(
        &self,
        project_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<EntriesPage, ProviderError> {
        let url = self.url(&format!("/projects/{project_id}/entries"));
        let params = [("limit", limit), ("offset", offset)];
        let response = self
            .execute(|| self.client.get(&url).query(&params))
            .await?;
        let envelope: ListEnvelope<ProjectEntry> = response.json().await?;
        Ok(EntriesPage {
            entries: envelope.data,
            has_more: envelope.meta.has_more,
        })
    }

    async fn add_note(&self, contact_id: &str, content: &str) -> Result<(), ProviderError> {
        let url = self.url(&format!("/contacts/{contact_id}/notes"));
        let body = NoteRequest { content };
        self.execute(|| self.client.post(&url).json(&body)).await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use axum::{
        http::{HeaderMap, HeaderValue, StatusCode as HttpStatus},
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use tokio::time::{Duration, Instant};

    use super::testing::MockSourcingApi;
    use super::*;
    use models::EntryContact;

    /// Local provider that throttles the first `throttled` calls to
    /// `/connected-accounts`, optionally reporting `remaining` requests left.
    async fn stub_provider(
        throttled: u32,
        remaining: Option<&'static str>,
    ) -> (ProviderClient, Arc<AtomicU32>) {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/connected-accounts",
            get(move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    let mut headers = HeaderMap::new();
                    if let Some(remaining) = remaining {
                        headers.insert("x-ratelimit-remaining", HeaderValue::from_static(remaining));
                    }
                    if n < throttled {
                        let body = json!({"error": {"code": "rate_limited", "message": "slow down"}});
                        (HttpStatus::TOO_MANY_REQUESTS, headers, Json(body))
                    } else {
                        let body = json!({"data": [{"id": 7, "name": "Recruiter seat"}]});
                        (HttpStatus::OK, headers, Json(body))
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        // No request timeout or idle-pool timer, so the paused clock only
        // advances through the client's own backoff sleeps.
        let client = Client::builder().pool_idle_timeout(None).build().unwrap();
        let provider = ProviderClient::with_client(client, format!("http://{addr}"), "key".to_string());
        (provider, hits)
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_recovers_after_one_throttle() {
        let (provider, hits) = stub_provider(1, None).await;
        let start = Instant::now();

        let accounts = provider.connected_accounts().await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(accounts[0].id, "7");
        assert!(start.elapsed() >= backoff_delay(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_gives_up_after_max_attempts() {
        let (provider, hits) = stub_provider(u32::MAX, None).await;
        let start = Instant::now();

        let err = provider.connected_accounts().await.unwrap_err();

        assert!(matches!(
            err,
            ProviderError::RateLimitExceeded { attempts } if attempts == MAX_ATTEMPTS
        ));
        assert_eq!(hits.load(Ordering::SeqCst), MAX_ATTEMPTS);
        // 2 + 4 + 8 + 16: no backoff after the final attempt.
        let slept = start.elapsed();
        assert!(slept >= Duration::from_secs(30), "slept {slept:?}");
        assert!(slept < Duration::from_secs(30 + 32), "slept {slept:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_pauses_when_window_nearly_spent() {
        let (provider, hits) = stub_provider(0, Some("3")).await;
        let start = Instant::now();

        provider.connected_accounts().await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() >= governor::LOW_REMAINING_PAUSE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_no_pause_with_room_left() {
        let (provider, _) = stub_provider(0, Some("250")).await;
        let start = Instant::now();

        provider.connected_accounts().await.unwrap();

        assert!(start.elapsed() < governor::LOW_REMAINING_PAUSE);
    }

    #[test]
    fn test_classify_known_codes() {
        let body = |code: &str| {
            format!(r#"{{"error": {{"code": "{code}", "message": "details here"}}}}"#)
        };

        assert!(matches!(
            classify_error(401, &body("invalid_api_key")),
            ProviderError::InvalidApiKey
        ));
        assert!(matches!(
            classify_error(403, &body("insufficient_scope")),
            ProviderError::InsufficientScope { .. }
        ));
        assert!(matches!(
            classify_error(402, &body("billing_required")),
            ProviderError::BillingRequired
        ));
        assert!(matches!(
            classify_error(403, &body("plan_upgrade_required")),
            ProviderError::PlanUpgradeRequired
        ));
        match classify_error(422, &body("validation_error")) {
            ProviderError::Validation(message) => assert_eq!(message, "details here"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            classify_error(404, &body("not_found")),
            ProviderError::NotFound(_)
        ));
    }

    #[test]
    fn test_classify_unknown_code_keeps_status_and_message() {
        let err = classify_error(500, r#"{"error": {"code": "boom", "message": "exploded"}}"#);
        assert_eq!(err.to_string(), "500 [boom]: exploded");
    }

    #[test]
    fn test_classify_non_json_body_uses_raw_text() {
        let err = classify_error(502, "Bad Gateway");
        assert_eq!(err.to_string(), "502 [unknown]: Bad Gateway");
    }

    #[test]
    fn test_scope_error_lists_required_scopes() {
        let err = classify_error(403, r#"{"error": {"code": "insufficient_scope"}}"#);
        assert!(err.to_string().contains("projects:read"));
    }

    fn entry(first: &str) -> ProjectEntry {
        ProjectEntry {
            contact: Some(EntryContact {
                first_name: Some(first.to_string()),
                last_name: Some("Doe".to_string()),
                linkedin_profile: None,
            }),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_all_project_entries_walks_every_page() {
        let api = MockSourcingApi {
            entries: (0..120).map(|i| entry(&format!("n{i}"))).collect(),
            ..Default::default()
        };
        let entries = list_all_project_entries(&api, "p1").await.unwrap();
        assert_eq!(entries.len(), 120);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_all_project_entries_propagates_errors() {
        let api = MockSourcingApi {
            entries_error: true,
            ..Default::default()
        };
        assert!(list_all_project_entries(&api, "p1").await.is_err());
    }
}

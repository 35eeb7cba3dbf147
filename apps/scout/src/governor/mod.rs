//! Rate/Quota Governor: throttling policy for every call against the sourcing
//! provider, inter-request pacing, and the daily live-network usage ceiling.

use std::time::Duration;

use rand::Rng;
use reqwest::header::HeaderMap;

pub mod quota;

pub use quota::{FileUsageCounter, NullUsageCounter, QuotaGovernor, QuotaStatus, UsageCounter};

/// Attempts per provider call before a throttled request becomes fatal.
pub const MAX_ATTEMPTS: u32 = 5;

/// Below this many remaining requests in the provider window we pause before continuing.
pub const LOW_REMAINING_THRESHOLD: u32 = 10;
pub const LOW_REMAINING_PAUSE: Duration = Duration::from_secs(2);

const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Fixed pacing between provider/LLM calls. None of these are correctness-critical.
pub const DATABASE_PAGE_DELAY: Duration = Duration::from_millis(500);
pub const ENTRIES_PAGE_DELAY: Duration = Duration::from_millis(300);
pub const SCORING_BATCH_DELAY: Duration = Duration::from_millis(300);
pub const PUSH_BATCH_DELAY: Duration = Duration::from_millis(500);
pub const NOTE_DELAY: Duration = Duration::from_millis(200);

/// Bounds of the randomized pause between live-network pages, in seconds.
pub const LIVE_NETWORK_DELAY_SECS: (f64, f64) = (2.0, 4.0);

/// Backoff before retrying a throttled call: 2s, 4s, 8s, 16s, 32s for attempts 0..5.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64 << attempt.min(MAX_ATTEMPTS - 1))
}

/// Reads the provider's remaining-requests header, if present and numeric.
pub fn remaining_requests(headers: &HeaderMap) -> Option<u32> {
    headers
        .get(RATE_LIMIT_REMAINING_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// True when the provider reports the quota window is nearly spent.
pub fn needs_pause(remaining: Option<u32>) -> bool {
    matches!(remaining, Some(n) if n < LOW_REMAINING_THRESHOLD)
}

/// Randomized pause between live-network pages to avoid bulk-request detection.
pub fn live_network_page_delay() -> Duration {
    let (low, high) = LIVE_NETWORK_DELAY_SECS;
    Duration::from_secs_f64(rand::thread_rng().gen_range(low..=high))
}

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

/// Default waits between attempts when GitHub reports rate limiting.
pub const BACKOFF_SECONDS: &[u64] = &[60, 120, 240];

/// Longest `retry-after` we are willing to honour for a single wait.
const MAX_RETRY_AFTER_SECONDS: u64 = 900;

/// Check whether a response is a rate-limit rejection.
///
/// GitHub answers 429 for secondary rate limits and 403 with
/// `x-ratelimit-remaining: 0` once the primary quota is exhausted.
pub fn is_rate_limited(status: u16, headers: &HeaderMap) -> bool {
    if status == 429 {
        return true;
    }
    status == 403
        && headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim() == "0")
            .unwrap_or(false)
}

/// How long to wait before the next attempt: the server's `retry-after`
/// when present, then the time until `x-ratelimit-reset`, otherwise the
/// scheduled backoff.
pub fn retry_wait(headers: &HeaderMap, scheduled: Duration) -> Duration {
    retry_wait_at(headers, scheduled, Utc::now())
}

fn retry_wait_at(headers: &HeaderMap, scheduled: Duration, now: DateTime<Utc>) -> Duration {
    if let Some(secs) = header_u64(headers, reqwest::header::RETRY_AFTER.as_str()) {
        return Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECONDS));
    }
    if let Some(reset) = header_u64(headers, "x-ratelimit-reset") {
        let until_reset = (reset as i64).saturating_sub(now.timestamp()).max(0) as u64;
        return Duration::from_secs(until_reset.min(MAX_RETRY_AFTER_SECONDS));
    }
    scheduled
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// The default backoff schedule.
pub fn default_backoff() -> Vec<Duration> {
    BACKOFF_SECONDS
        .iter()
        .map(|&secs| Duration::from_secs(secs))
        .collect()
}

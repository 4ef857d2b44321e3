use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde_json::Value;

use super::rate_limit;
use super::{PageQuery, PageSource};
use crate::error::{Error, Result};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Settings for building a [`GithubClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_base: String,
    pub token: Option<String>,
    pub timeout: Duration,
    /// Waits between attempts on rate-limit responses; its length bounds the
    /// number of retries.
    pub rate_limit_backoff: Vec<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            timeout: Duration::from_secs(30),
            rate_limit_backoff: rate_limit::default_backoff(),
        }
    }
}

/// HTTP transport for the GitHub REST API.
///
/// Built once and passed explicitly to every sync pass; clones share the
/// underlying connection pool.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    rate_limit_backoff: Vec<Duration>,
}

impl GithubClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ghmirror/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        if let Some(token) = options.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| Error::Config("GitHub token contains invalid characters".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: options.api_base.trim_end_matches('/').to_string(),
            rate_limit_backoff: options.rate_limit_backoff,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

#[async_trait]
impl PageSource for GithubClient {
    async fn fetch_page(&self, endpoint: &str, query: &PageQuery) -> Result<Vec<Value>> {
        let pairs = query.to_pairs();
        let mut attempt = 0_usize;
        loop {
            let response = self
                .http
                .get(endpoint)
                .query(&pairs)
                .send()
                .await
                .map_err(|source| Error::Http {
                    endpoint: endpoint.to_string(),
                    source,
                })?;

            let status = response.status();
            if status.is_success() {
                let value: Value = response.json().await.map_err(|source| Error::Http {
                    endpoint: endpoint.to_string(),
                    source,
                })?;
                return match value {
                    Value::Array(items) => Ok(items),
                    _ => Err(Error::Fetch {
                        endpoint: endpoint.to_string(),
                        message: "expected a JSON array".into(),
                    }),
                };
            }

            if rate_limit::is_rate_limited(status.as_u16(), response.headers()) {
                if let Some(&scheduled) = self.rate_limit_backoff.get(attempt) {
                    let wait = rate_limit::retry_wait(response.headers(), scheduled);
                    log::warn!(
                        "Rate limited ({}). Waiting {}s before retry {}/{}",
                        status.as_u16(),
                        wait.as_secs(),
                        attempt + 1,
                        self.rate_limit_backoff.len()
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                    continue;
                }
            }

            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: truncate_for_error(&body, 800),
            });
        }
    }
}

fn truncate_for_error(body: &str, max_chars: usize) -> String {
    let body = body.trim();
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let truncated: String = body.chars().take(max_chars).collect();
    format!("{truncated}...")
}

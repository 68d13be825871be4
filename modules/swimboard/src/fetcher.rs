// Board page retrieval with bounded retries.
//
// A PageSource makes exactly one attempt; Fetcher owns the retry loop so
// direct and relayed fetching share the same backoff and diagnostics.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use scraperapi_client::{RelayRequest, ScraperApiClient};
use tracing::{debug, info, warn};

use crate::error::{AttemptFailure, FetchAttempt, FetchError};
use crate::types::BoardTarget;

const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);
const RELAY_COUNTRY: &str = "kr";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[async_trait]
pub trait PageSource: Send + Sync {
    /// One fetch attempt, no retries.
    async fn fetch_once(&self, target: &BoardTarget) -> Result<String, AttemptFailure>;

    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: 2,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay after the failed attempt `attempt` (0-based): unit * base^attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_base.saturating_pow(attempt);
        self.backoff_unit.saturating_mul(factor)
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

pub struct Fetcher {
    source: Arc<dyn PageSource>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(source: Arc<dyn PageSource>, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Raw HTML of the board page, or `FetchError` once every attempt failed.
    pub async fn fetch(&self, target: &BoardTarget) -> Result<String, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let url = target.full_url();
        let mut attempts: Vec<FetchAttempt> = Vec::new();

        for attempt in 0..max_attempts {
            match self.source.fetch_once(target).await {
                Ok(html) => {
                    info!(
                        url = url.as_str(),
                        source = self.source.name(),
                        attempt = attempt + 1,
                        bytes = html.len(),
                        "Fetched board page"
                    );
                    return Ok(html);
                }
                Err(failure) => {
                    let last = attempt + 1 == max_attempts;
                    let backoff = if last {
                        Duration::ZERO
                    } else {
                        self.policy.delay_for(attempt)
                    };

                    warn!(
                        url = url.as_str(),
                        source = self.source.name(),
                        attempt = attempt + 1,
                        max_attempts,
                        error = %failure,
                        backoff_ms = backoff.as_millis() as u64,
                        "Fetch attempt failed"
                    );

                    attempts.push(FetchAttempt {
                        attempt: attempt + 1,
                        backoff,
                        failure,
                    });

                    if !last {
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        let reason = attempts
            .last()
            .map(|a| a.failure.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());
        Err(FetchError { reason, attempts })
    }
}

// ---------------------------------------------------------------------------
// DirectSource: reqwest straight to the board
// ---------------------------------------------------------------------------

pub struct DirectSource {
    client: reqwest::Client,
    preflight: bool,
}

impl DirectSource {
    pub fn new(preflight: bool) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(ATTEMPT_TIMEOUT)
            .cookie_store(true)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(browser_headers())
            .build()?;

        Ok(Self { client, preflight })
    }

    /// Hit the site root so the session cookie is set before the list
    /// request. Best effort only.
    async fn warm_up(&self, target: &BoardTarget) {
        match self.client.get(&target.site_root).send().await {
            Ok(resp) => debug!(status = resp.status().as_u16(), "Pre-flight request done"),
            Err(e) => debug!(error = %e, "Pre-flight request failed, continuing"),
        }
    }
}

#[async_trait]
impl PageSource for DirectSource {
    async fn fetch_once(&self, target: &BoardTarget) -> Result<String, AttemptFailure> {
        if self.preflight {
            self.warm_up(target).await;
        }

        let resp = self
            .client
            .get(&target.url)
            .query(&target.params)
            .header(header::REFERER, &target.site_root)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AttemptFailure::Status {
                status: status.as_u16(),
            });
        }

        Ok(resp.text().await?)
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers
}

// ---------------------------------------------------------------------------
// RelaySource: ScraperAPI does the fetch for us
// ---------------------------------------------------------------------------

pub struct RelaySource {
    client: ScraperApiClient,
}

impl RelaySource {
    pub fn new(api_key: &str) -> Result<Self, scraperapi_client::ScraperApiError> {
        Ok(Self {
            client: ScraperApiClient::new(api_key)?,
        })
    }
}

#[async_trait]
impl PageSource for RelaySource {
    async fn fetch_once(&self, target: &BoardTarget) -> Result<String, AttemptFailure> {
        let request = RelayRequest::new(&target.full_url())
            .country_code(RELAY_COUNTRY)
            .render(false)
            .timeout(Duration::from_secs(60));

        Ok(self.client.fetch(&request).await?)
    }

    fn name(&self) -> &'static str {
        "relay"
    }
}

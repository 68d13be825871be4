pub mod error;

pub use error::{Result, ScraperApiError};

use std::time::Duration;

use serde::Serialize;

const DEFAULT_BASE_URL: &str = "https://api.scraperapi.com";

/// Extra time the HTTP client waits beyond the relay-side timeout, so the
/// relay gets to report its own timeout before we give up on the socket.
const CLIENT_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

/// Parameters for a single relayed page fetch.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub url: String,
    pub country_code: Option<String>,
    pub render: bool,
    pub follow_redirect: bool,
    pub retry_404: bool,
    pub timeout: Duration,
}

impl RelayRequest {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            country_code: None,
            render: false,
            follow_redirect: true,
            retry_404: false,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn country_code(mut self, code: &str) -> Self {
        self.country_code = Some(code.to_string());
        self
    }

    pub fn render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct RelayQuery<'a> {
    api_key: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    country_code: Option<&'a str>,
    follow_redirect: bool,
    render: bool,
    timeout: u64,
    retry_404: bool,
}

pub struct ScraperApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ScraperApiClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Fetch the page body for `request.url` through the relay.
    /// Any non-200 relay status is an error, even other 2xx codes.
    pub async fn fetch(&self, request: &RelayRequest) -> Result<String> {
        let endpoint = format!("{}/", self.base_url);
        let query = self.query(request);

        tracing::debug!(url = %request.url, render = request.render, "Relaying page fetch");

        let resp = self
            .client
            .get(&endpoint)
            .query(&query)
            .timeout(request.timeout + CLIENT_TIMEOUT_SLACK)
            .send()
            .await?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let message = resp.text().await.unwrap_or_default();
            return Err(ScraperApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }

    fn query<'a>(&'a self, request: &'a RelayRequest) -> RelayQuery<'a> {
        RelayQuery {
            api_key: &self.api_key,
            url: &request.url,
            country_code: request.country_code.as_deref(),
            follow_redirect: request.follow_redirect,
            render: request.render,
            timeout: request.timeout.as_millis() as u64,
            retry_404: request.retry_404,
        }
    }
}

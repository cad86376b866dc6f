/*
[INPUT]:  HTTP configuration (base URL, timeouts, API token)
[OUTPUT]: Configured reqwest client ready for API calls
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use crate::http::{FinnhubError, Result};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Base URL for the Finnhub REST API
const API_BASE_URL: &str = "https://finnhub.io/api/v1/";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Main HTTP client for the Finnhub API.
///
/// The API token is appended as a `token` query parameter on every request.
#[derive(Debug, Clone)]
pub struct FinnhubClient {
    http_client: Client,
    base_url: Url,
    token: String,
}

impl FinnhubClient {
    /// Create a new client with default configuration
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_config(token, ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(token: impl Into<String>, config: ClientConfig) -> Result<Self> {
        Self::with_config_and_base_url(token, config, API_BASE_URL)
    }

    /// Create a new client against a custom base URL (used by tests)
    pub fn with_config_and_base_url(
        token: impl Into<String>,
        config: ClientConfig,
        base_url: &str,
    ) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(FinnhubError::Config("API token must not be empty".into()));
        }

        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        // Base URL must end with a slash so relative endpoints join under it.
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            http_client,
            base_url: Url::parse(&base_url)?,
            token,
        })
    }

    /// Build a request builder for an API endpoint, appending query
    /// parameters and the API token.
    pub(crate) fn api_request(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<RequestBuilder> {
        let mut url = self.base_url.join(endpoint)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("token", &self.token);
        }
        Ok(self.http_client.request(method, url))
    }

    /// Send a request and decode a JSON body, mapping non-success statuses
    /// to typed errors.
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok())
                .unwrap_or(1);
            return Err(FinnhubError::RateLimit { retry_after });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FinnhubError::api_error(status, message));
        }

        Ok(response.json::<T>().await?)
    }
}

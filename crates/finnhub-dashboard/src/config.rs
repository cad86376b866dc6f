/*
[INPUT]:  YAML configuration file, FINNHUB_API_KEY environment variable
[OUTPUT]: Parsed dashboard configuration
[POS]:    Configuration layer - API endpoints and display tuning
[UPDATE]: When adding new configuration options
*/

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the dashboard
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardConfig {
    /// Finnhub API token; falls back to FINNHUB_API_KEY when empty
    #[serde(default)]
    pub api_token: String,
    /// REST base URL
    #[serde(default = "default_rest_base_url")]
    pub rest_base_url: String,
    /// Trade stream URL (token is appended at connect time)
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Exchange code passed to symbol search
    #[serde(default = "default_exchange")]
    pub exchange: String,
    /// Minimum interval between outbound lookup calls, in milliseconds
    #[serde(default = "default_lookup_interval_ms")]
    pub lookup_interval_ms: u64,
    /// Maximum number of ticks kept for display
    #[serde(default = "default_tick_buffer_cap")]
    pub tick_buffer_cap: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            rest_base_url: default_rest_base_url(),
            ws_url: default_ws_url(),
            exchange: default_exchange(),
            lookup_interval_ms: default_lookup_interval_ms(),
            tick_buffer_cap: default_tick_buffer_cap(),
        }
    }
}

fn default_rest_base_url() -> String {
    "https://finnhub.io/api/v1/".to_string()
}

fn default_ws_url() -> String {
    "wss://ws.finnhub.io".to_string()
}

fn default_exchange() -> String {
    "US".to_string()
}

fn default_lookup_interval_ms() -> u64 {
    300
}

fn default_tick_buffer_cap() -> usize {
    8
}

impl DashboardConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply the CLI override and environment fallback for the API token
    pub fn resolve(mut self, api_key_override: Option<String>) -> anyhow::Result<Self> {
        if let Some(key) = api_key_override {
            self.api_token = key;
        }
        if self.api_token.is_empty()
            && let Ok(key) = std::env::var("FINNHUB_API_KEY")
        {
            self.api_token = key;
        }
        if self.api_token.is_empty() {
            bail!("no API token configured; set api_token, FINNHUB_API_KEY, or --api-key");
        }
        Ok(self)
    }

    /// Stream URL with the token query parameter appended
    pub fn ws_url_with_token(&self) -> String {
        let separator = if self.ws_url.contains('?') { '&' } else { '?' };
        format!("{}{}token={}", self.ws_url, separator, self.api_token)
    }

    pub fn lookup_interval(&self) -> Duration {
        Duration::from_millis(self.lookup_interval_ms)
    }
}

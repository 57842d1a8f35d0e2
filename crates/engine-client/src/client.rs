//! REST client for the trading engine.
//!
//! # Example
//!
//! ```ignore
//! use quantbot_engine_client::{EngineApi, EngineClient, EngineClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = EngineClient::new(EngineClientConfig::default())?;
//!     let status = client.get_status().await?;
//!     println!("running={} runs={}", status.running, status.run_count);
//!     Ok(())
//! }
//! ```

use crate::api::{EngineAction, EngineApi};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use quantbot_core::{
    ConfigUpdate, EngineMessage, EngineSettings, EngineStatus, ErrorDetail, OrdersResponse,
    PositionsResponse, TradingConfig, DEFAULT_ENGINE_URL,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the engine client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineClientConfig {
    /// Base URL of the engine, without trailing slash.
    pub base_url: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EngineClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ENGINE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl EngineClientConfig {
    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl From<&EngineSettings> for EngineClientConfig {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            timeout_secs: settings.timeout_secs,
        }
    }
}

// =============================================================================
// EngineClient
// =============================================================================

/// HTTP client for the engine's REST API. No authentication.
#[derive(Clone)]
pub struct EngineClient {
    base_url: String,
    http: Client,
}

impl std::fmt::Debug for EngineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl EngineClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the base URL is not http(s) or the HTTP client cannot be built.
    pub fn new(config: EngineClientConfig) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(EngineError::Configuration(format!(
                "engine base URL must be http(s): '{base_url}'"
            )));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EngineError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { base_url, http })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let bytes = Self::check_status(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// POSTs an optional JSON body and returns the raw success body.
    async fn post<B: Serialize + Sync>(&self, path: &str, body: Option<&B>) -> Result<Vec<u8>> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let mut request = self.http.post(&url).header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let bytes = Self::check_status(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Turns non-2xx responses into [`EngineError::Api`], reading `detail` when present.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorDetail>(&text)
            .ok()
            .filter(|d| !d.detail.is_null())
            .map(|d| d.text());

        tracing::debug!(status = status.as_u16(), detail = ?detail, "Engine returned error status");
        Err(EngineError::api(status.as_u16(), detail))
    }

    fn parse_message(bytes: &[u8]) -> Result<EngineMessage> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(EngineMessage::default());
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[async_trait]
impl EngineApi for EngineClient {
    async fn get_config(&self) -> Result<TradingConfig> {
        self.get("/config").await
    }

    async fn update_config(&self, update: &ConfigUpdate) -> Result<()> {
        self.post("/config", Some(update)).await?;
        Ok(())
    }

    async fn get_status(&self) -> Result<EngineStatus> {
        self.get("/status").await
    }

    async fn get_positions(&self) -> Result<Vec<Value>> {
        let response: PositionsResponse = self.get("/positions").await?;
        Ok(response.positions)
    }

    async fn get_orders(&self) -> Result<Vec<Value>> {
        let response: OrdersResponse = self.get("/orders").await?;
        Ok(response.orders)
    }

    async fn start(&self) -> Result<EngineMessage> {
        let bytes = self.post::<()>("/start", None).await?;
        Self::parse_message(&bytes)
    }

    async fn stop(&self) -> Result<EngineMessage> {
        let bytes = self.post::<()>("/stop", None).await?;
        Self::parse_message(&bytes)
    }

    async fn trigger(&self, action: EngineAction) -> Result<()> {
        self.post::<()>(action.path(), None).await?;
        Ok(())
    }
}

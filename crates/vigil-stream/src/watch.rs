//! Watch connection establishment.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use tracing::debug;

use crate::error::{Result, StreamError};

/// Watch endpoint path on the API server.
pub const DEFAULT_WATCH_PATH: &str = "/api/v1/events?watch=true";

/// Default timeout for establishing a connection.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// A readable byte stream from one watch connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, StreamError>> + Send>>;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the watch client.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Base URL of the API server.
    pub api_url: String,

    /// Bearer token for the watch request.
    pub token: String,

    /// Skip TLS certificate verification.
    pub insecure_tls: bool,

    /// Timeout for establishing the connection. There is no overall
    /// request timeout: the response body is unbounded.
    pub connect_timeout: Duration,
}

impl WatchConfig {
    /// Create a new config for the given endpoint and token.
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token: token.into(),
            insecure_tls: false,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Skip TLS certificate verification (self-signed control planes).
    pub fn with_insecure_tls(mut self, insecure: bool) -> Self {
        self.insecure_tls = insecure;
        self
    }

    /// Set the connection-establishment timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Connector
// ─────────────────────────────────────────────────────────────────────────────

/// Opens watch connections.
///
/// The orchestrator only needs "a readable byte stream from this HTTP
/// watch request"; tests substitute scripted connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open one watch connection and hand back its response body.
    async fn connect(&self) -> Result<ByteStream>;
}

/// Production connector: HTTP GET against the cluster watch endpoint.
pub struct WatchClient {
    client: reqwest::Client,
    config: WatchConfig,
}

impl WatchClient {
    /// Build a client from the given configuration.
    pub fn new(config: WatchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .danger_accept_invalid_certs(config.insecure_tls)
            .build()
            .map_err(|e| StreamError::Connect(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build the watch endpoint URL.
    fn watch_url(&self) -> String {
        format!(
            "{}{}",
            self.config.api_url.trim_end_matches('/'),
            DEFAULT_WATCH_PATH
        )
    }
}

#[async_trait]
impl Connector for WatchClient {
    async fn connect(&self) -> Result<ByteStream> {
        debug!(url = %self.watch_url(), "Opening watch connection");

        let response = self
            .client
            .get(self.watch_url())
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Connect(format!(
                "HTTP {} from watch endpoint",
                status
            )));
        }

        Ok(Box::pin(
            response
                .bytes_stream()
                .map_err(|e| StreamError::Ended(e.to_string())),
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

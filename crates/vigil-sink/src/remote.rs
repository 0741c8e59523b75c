//! Remote sink: ship each formatted line to a log collector over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use vigil_stream::{EventRecord, Sink, SinkError, format_line};

/// Default timeout for one delivery request.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for the remote sink.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Collector endpoint receiving POSTed payloads.
    pub url: String,

    /// Optional label attached to every payload.
    pub tag: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl RemoteConfig {
    /// Create a config for the given collector URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tag: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Attach a tag to every payload.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Payload POSTed to the collector, one per emitted record.
#[derive(Debug, Serialize)]
struct RemotePayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
    timestamp: DateTime<Utc>,
    line: String,
}

/// POSTs each emitted record to a remote log collector.
pub struct RemoteSink {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl RemoteSink {
    /// Build a sink from the given configuration.
    pub fn new(config: RemoteConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SinkError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn payload<'a>(&'a self, record: &EventRecord) -> RemotePayload<'a> {
        RemotePayload {
            tag: self.config.tag.as_deref(),
            timestamp: record.timestamp,
            line: format_line(record),
        }
    }
}

#[async_trait]
impl Sink for RemoteSink {
    async fn forward(&self, record: &EventRecord) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.config.url)
            .json(&self.payload(record))
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Transport(format!(
                "HTTP {} from collector",
                status
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "remote"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

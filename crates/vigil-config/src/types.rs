//! Configuration types and resolution to validated runtime settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Default lifetime of a dedup cache entry, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 30;

/// Default interval between cache sweeps, in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 600;

/// Default wait between failed connection attempts, in seconds.
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 5;

/// Default connection-establishment timeout, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// File Format
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level agent configuration, as parsed from TOML.
///
/// Every field is optional at this layer; [`AgentConfig::resolve`]
/// validates and applies defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub watch: WatchSection,
    #[serde(default)]
    pub dedup: DedupSection,
    #[serde(default)]
    pub stream: StreamSection,
    #[serde(default)]
    pub sink: SinkSection,
}

/// `[watch]`: where and how to open the event feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchSection {
    /// Base URL of the API server.
    pub api_url: Option<String>,

    /// Bearer token, inline.
    pub token: Option<String>,

    /// Path to a file holding the bearer token. Takes precedence over
    /// the inline token; trailing whitespace is trimmed.
    pub token_file: Option<PathBuf>,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure_tls: bool,

    /// Which upstream field supplies the grouping name for dedup.
    #[serde(default)]
    pub key_mode: KeySource,
}

/// `[dedup]`: duplicate-suppression tuning.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DedupSection {
    pub ttl_secs: Option<u64>,
    pub cleanup_interval_secs: Option<u64>,
}

impl DedupSection {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs.unwrap_or(DEFAULT_TTL_SECS))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(
            self.cleanup_interval_secs
                .unwrap_or(DEFAULT_CLEANUP_INTERVAL_SECS),
        )
    }
}

/// `[stream]`: connection loop tuning.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamSection {
    pub retry_interval_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
}

impl StreamSection {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(
            self.retry_interval_secs
                .unwrap_or(DEFAULT_RETRY_INTERVAL_SECS),
        )
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }
}

/// `[sink]`: where emitted events go.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SinkSection {
    #[serde(default)]
    pub kind: SinkKind,

    /// Collector endpoint; required when `kind = "remote"`.
    pub url: Option<String>,

    /// Optional label attached to remote payloads.
    pub tag: Option<String>,
}

/// Which grouping-key variant the deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeySource {
    /// Key on the event object's own name.
    #[default]
    ObjectName,
    /// Key on the involved object's name.
    InvolvedObject,
}

/// Which sink adapter to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SinkKind {
    #[default]
    Console,
    Remote,
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Validated runtime settings with all defaults applied.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_url: String,
    pub token: String,
    pub insecure_tls: bool,
    pub key_source: KeySource,
    pub dedup_ttl: Duration,
    pub cleanup_interval: Duration,
    pub retry_interval: Duration,
    pub connect_timeout: Duration,
    pub sink: ResolvedSink,
}

/// Validated sink selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSink {
    Console,
    Remote { url: String, tag: Option<String> },
}

impl AgentConfig {
    /// Validate the parsed configuration and apply defaults.
    ///
    /// Fails when a required setting with no safe default is absent.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let api_url = self
            .watch
            .api_url
            .clone()
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::Missing("watch.api_url"))?;

        let token = self.resolve_token()?;

        let sink = match self.sink.kind {
            SinkKind::Console => ResolvedSink::Console,
            SinkKind::Remote => ResolvedSink::Remote {
                url: self
                    .sink
                    .url
                    .clone()
                    .filter(|url| !url.is_empty())
                    .ok_or(ConfigError::Missing("sink.url"))?,
                tag: self.sink.tag.clone(),
            },
        };

        Ok(ResolvedConfig {
            api_url,
            token,
            insecure_tls: self.watch.insecure_tls,
            key_source: self.watch.key_mode,
            dedup_ttl: self.dedup.ttl(),
            cleanup_interval: self.dedup.cleanup_interval(),
            retry_interval: self.stream.retry_interval(),
            connect_timeout: self.stream.connect_timeout(),
            sink,
        })
    }

    /// Resolve the bearer token: token file first, then inline token.
    fn resolve_token(&self) -> Result<String> {
        if let Some(path) = &self.watch.token_file {
            let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
                path: path.display().to_string(),
                source: e,
            })?;
            let token = raw.trim().to_string();
            if token.is_empty() {
                return Err(ConfigError::Invalid {
                    field: "watch.token_file",
                    reason: "file is empty".to_string(),
                });
            }
            return Ok(token);
        }

        self.watch
            .token
            .clone()
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::Missing("watch.token"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

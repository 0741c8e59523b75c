//! Startup configuration for the vigil watch agent.
//!
//! Provides TOML-based configuration with environment-variable overrides:
//! - `[watch]`: endpoint, credential (inline token or token file), TLS
//!   mode and grouping-key variant
//! - `[dedup]` / `[stream]`: cache and connection-loop tuning
//! - `[sink]`: console or remote collector selection
//!
//! Missing required settings with no safe default are fatal at startup.

mod error;
mod load;
mod types;

pub use error::{ConfigError, Result};
pub use load::{apply_env_overrides, load_config, load_config_file};
pub use types::{
    AgentConfig, DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_RETRY_INTERVAL_SECS, DEFAULT_TTL_SECS, DedupSection, KeySource, ResolvedConfig,
    ResolvedSink, SinkKind, SinkSection, StreamSection, WatchSection,
};

//! Error types for configuration loading.

use thiserror::Error;

/// Result type alias using the config error type.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Error type for configuration loading and validation.
///
/// All variants are fatal: a missing or unusable setting with no safe
/// default aborts the process at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config or credential file could not be read.
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required setting is absent.
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A setting is present but unusable.
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

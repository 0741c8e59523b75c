//! Error types for the streaming pipeline.

use thiserror::Error;

/// Result type alias using the stream error type.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Error type for watch stream operations.
///
/// Every variant is recoverable at the orchestrator level: `Connect`
/// waits out the retry interval before the next attempt, `Ended` and
/// `Decode` trigger an immediate reconnect.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Establishing the watch connection failed (network, DNS, HTTP status).
    #[error("Connect error: {0}")]
    Connect(String),

    /// The response stream ended; clean close and read errors are not
    /// distinguished.
    #[error("Stream ended: {0}")]
    Ended(String),

    /// A line could not be decoded into an event record.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_from_serde() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let stream_err: StreamError = err.into();
        assert!(matches!(stream_err, StreamError::Decode(_)));
    }

    #[test]
    fn test_display_includes_detail() {
        let err = StreamError::Connect("dns failure".to_string());
        assert!(err.to_string().contains("dns failure"));
    }
}

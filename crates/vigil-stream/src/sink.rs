//! The outbound seam: forward one formatted event.
//!
//! The core only needs a "forward one record" capability; the actual
//! transports (console, remote collector) live in the sink adapter crate.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use crate::event::EventRecord;

/// Error type for sink deliveries.
///
/// Sink failures are logged by the session and never terminate it; no
/// error is ever surfaced to the sink as data.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Local write failed.
    #[error("Write error: {0}")]
    Write(String),

    /// Remote delivery failed (network or HTTP status).
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Destination for emitted event records.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Deliver one emitted record.
    async fn forward(&self, record: &EventRecord) -> std::result::Result<(), SinkError>;

    /// Name for log messages.
    fn name(&self) -> &str;
}

/// A sink that can be shared across components.
pub type SharedSink = Arc<dyn Sink>;

/// Render the stable line format shared by all sinks.
pub fn format_line(record: &EventRecord) -> String {
    format!(
        "{} | Project: {} | Name: {} | Kind: {} | Reason: {} | Message: {}",
        record.timestamp,
        record.namespace,
        record.name,
        record.kind,
        record.reason,
        record.message
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Sink
// ─────────────────────────────────────────────────────────────────────────────

/// A sink that records forwarded events, for deterministic testing.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: std::sync::Mutex<Vec<EventRecord>>,
    fail: AtomicBool,
}

impl MemorySink {
    /// Create an empty memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All records forwarded so far, in order.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Number of records forwarded so far.
    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Make subsequent deliveries fail (or succeed again).
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn forward(&self, record: &EventRecord) -> std::result::Result<(), SinkError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SinkError::Write("memory sink set to fail".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

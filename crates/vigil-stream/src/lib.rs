//! Streaming ingestion core for the vigil watch agent.
//!
//! Watches an unbounded HTTP response body of newline-delimited JSON
//! events, decides per record whether it is novel enough to emit, and
//! forwards accepted records to a sink. The pipeline is a single logical
//! stream of control:
//!
//! orchestrator → session → line source → decode → dedup cache → sink
//!
//! A dropped connection is re-established transparently; the dedup cache
//! outlives individual connections, so a duplicate arriving right after a
//! reconnect is still suppressed.

mod dedup;
mod error;
mod event;
mod lines;
mod orchestrator;
mod session;
mod sink;
mod watch;

pub use dedup::{DEFAULT_TTL, DedupCache};
pub use error::{Result, StreamError};
pub use event::{EventRecord, KeyMode};
pub use lines::LineSource;
pub use orchestrator::{DEFAULT_CLEANUP_INTERVAL, DEFAULT_RETRY_INTERVAL, Orchestrator};
pub use session::{SessionEnd, SessionOutcome, StreamSession};
pub use sink::{MemorySink, SharedSink, Sink, SinkError, format_line};
pub use watch::{ByteStream, Connector, DEFAULT_WATCH_PATH, WatchClient, WatchConfig};

//! Sink adapters for the vigil watch agent.
//!
//! Implementations of [`vigil_stream::Sink`] that deliver emitted events
//! to a console or to a remote log collector. The core treats every sink
//! as best-effort: delivery failures are logged upstream, never retried
//! per event.

mod console;
mod remote;

pub use console::ConsoleSink;
pub use remote::{RemoteConfig, RemoteSink};

pub use vigil_stream::{Sink, SinkError};

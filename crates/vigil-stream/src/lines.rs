//! Incremental line assembly over a raw byte stream.

use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::debug;

/// Splits a byte stream into newline-terminated lines.
///
/// A `LineSource` serves exactly one connection: once the underlying
/// stream yields a read error or end-of-stream, the sequence is over and
/// cannot be restarted. Clean close and network errors are not
/// distinguished; both simply end the sequence. Trailing bytes with no
/// terminator are discarded, not treated as a line.
pub struct LineSource<S> {
    stream: Pin<Box<S>>,
    buffer: Vec<u8>,
    ended: bool,
}

impl<S, E> LineSource<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: std::fmt::Display,
{
    /// Wrap a byte stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream: Box::pin(stream),
            buffer: Vec::new(),
            ended: false,
        }
    }

    /// Yield the next complete line, without its terminator.
    ///
    /// Returns `None` once the stream has ended; every later call also
    /// returns `None`.
    pub async fn next_line(&mut self) -> Option<Vec<u8>> {
        loop {
            // Complete lines already buffered are served before the
            // stream is polled again.
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                line.pop();
                return Some(line);
            }

            if self.ended {
                if !self.buffer.is_empty() {
                    debug!(
                        bytes = self.buffer.len(),
                        "Discarding partial line at end of stream"
                    );
                    self.buffer.clear();
                }
                return None;
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    debug!(error = %e, "Read error on watch stream");
                    self.ended = true;
                }
                None => {
                    debug!("Watch stream closed");
                    self.ended = true;
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

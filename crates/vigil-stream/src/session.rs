//! One connection's read → decode → dedup → forward loop.

use bytes::Bytes;
use futures::Stream;
use tracing::{trace, warn};

use crate::dedup::DedupCache;
use crate::error::StreamError;
use crate::event::{EventRecord, KeyMode};
use crate::lines::LineSource;
use crate::sink::Sink;

/// Why a session returned control to the orchestrator.
#[derive(Debug)]
pub enum SessionEnd {
    /// The underlying stream ended (clean close or read error).
    StreamEnded,

    /// A line failed to decode; the stream is assumed corrupt.
    Decode(StreamError),
}

impl std::fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StreamEnded => write!(f, "stream ended"),
            Self::Decode(err) => write!(f, "{}", err),
        }
    }
}

/// Counters and outcome for one completed session.
#[derive(Debug)]
pub struct SessionOutcome {
    /// Lines read from the stream.
    pub lines: u64,

    /// Records forwarded to the sink.
    pub emitted: u64,

    /// Records dropped as duplicates.
    pub suppressed: u64,

    /// How the session ended.
    pub end: SessionEnd,
}

/// Wraps one line source over one connection.
///
/// The session borrows the dedup cache for its lifetime; the cache itself
/// outlives the session so dedup state survives reconnects.
pub struct StreamSession<'a, S> {
    source: LineSource<S>,
    cache: &'a mut DedupCache,
    key_mode: KeyMode,
    lines: u64,
    emitted: u64,
    suppressed: u64,
}

impl<'a, S, E> StreamSession<'a, S>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: std::fmt::Display,
{
    /// Wrap a fresh connection's byte stream.
    pub fn new(stream: S, cache: &'a mut DedupCache, key_mode: KeyMode) -> Self {
        Self {
            source: LineSource::new(stream),
            cache,
            key_mode,
            lines: 0,
            emitted: 0,
            suppressed: 0,
        }
    }

    /// Drive the session until the stream ends or a line fails to decode.
    ///
    /// Event ordering within the connection is preserved: each line is
    /// fully decoded, judged and forwarded before the next is read. Sink
    /// failures are logged and do not terminate the session.
    pub async fn run(mut self, sink: &dyn Sink) -> SessionOutcome {
        loop {
            let Some(line) = self.source.next_line().await else {
                return self.finish(SessionEnd::StreamEnded);
            };
            self.lines += 1;

            let record = match EventRecord::decode(&line, self.key_mode) {
                Ok(record) => record,
                Err(err) => {
                    warn!(error = %err, "Failed to decode watch line, ending session");
                    return self.finish(SessionEnd::Decode(err));
                }
            };

            if self.cache.should_emit(&record.key, &record) {
                self.cache.record(&record.key, &record);
                if let Err(err) = sink.forward(&record).await {
                    warn!(sink = sink.name(), error = %err, "Failed to forward event");
                }
                self.emitted += 1;
            } else {
                trace!(key = %record.key, "Suppressed duplicate event");
                self.suppressed += 1;
            }
        }
    }

    fn finish(self, end: SessionEnd) -> SessionOutcome {
        SessionOutcome {
            lines: self.lines,
            emitted: self.emitted,
            suppressed: self.suppressed,
            end,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::DEFAULT_TTL;
    use crate::sink::MemorySink;

    fn line(namespace: &str, name: &str, ts: &str, message: &str) -> String {
        format!(
            concat!(
                r#"{{"object": {{"kind": "Event", "#,
                r#""metadata": {{"namespace": "{}", "name": "{}"}}, "#,
                r#""involvedObject": {{"name": "pod-0"}}, "#,
                r#""reason": "Failed", "message": "{}", "#,
                r#""lastTimestamp": "{}"}}}}"#,
            ),
            namespace, name, message, ts
        )
    }

    fn stream_of(lines: &[String]) -> impl Stream<Item = std::result::Result<Bytes, String>> {
        let body = lines
            .iter()
            .map(|l| format!("{}\n", l))
            .collect::<String>();
        futures::stream::iter(vec![Ok(Bytes::from(body))])
    }

    #[tokio::test]
    async fn test_duplicates_suppressed_within_session() {
        // First and third lines emit; the second is a true duplicate.
        let lines = vec![
            line("a", "x", "2024-03-01T00:01:40Z", "boom"),
            line("a", "x", "2024-03-01T00:01:40Z", "boom"),
            line("a", "x", "2024-03-01T00:03:20Z", "boom"),
        ];
        let mut cache = DedupCache::new(DEFAULT_TTL);
        let sink = MemorySink::new();

        let session = StreamSession::new(stream_of(&lines), &mut cache, KeyMode::ObjectName);
        let outcome = session.run(&sink).await;

        assert!(matches!(outcome.end, SessionEnd::StreamEnded));
        assert_eq!(outcome.lines, 3);
        assert_eq!(outcome.emitted, 2);
        assert_eq!(outcome.suppressed, 1);
        assert_eq!(sink.count(), 2);
        assert_eq!(
            sink.records()[1].timestamp,
            "2024-03-01T00:03:20Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap()
        );
    }

    #[tokio::test]
    async fn test_malformed_line_ends_session() {
        let lines = vec![
            line("a", "x", "2024-03-01T00:01:40Z", "boom"),
            "not json".to_string(),
            line("a", "y", "2024-03-01T00:01:40Z", "boom"),
        ];
        let mut cache = DedupCache::new(DEFAULT_TTL);
        let sink = MemorySink::new();

        let session = StreamSession::new(stream_of(&lines), &mut cache, KeyMode::ObjectName);
        let outcome = session.run(&sink).await;

        assert!(matches!(outcome.end, SessionEnd::Decode(_)));
        // The line after the malformed one was never reached.
        assert_eq!(outcome.lines, 2);
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test]
    async fn test_decode_failure_leaves_cache_unchanged() {
        let lines = vec![line("a", "x", "2024-03-01T00:01:40Z", "boom")];
        let mut cache = DedupCache::new(DEFAULT_TTL);
        let sink = MemorySink::new();

        let session = StreamSession::new(stream_of(&lines), &mut cache, KeyMode::ObjectName);
        session.run(&sink).await;
        assert_eq!(cache.len(), 1);

        let bad = vec!["{broken".to_string()];
        let session = StreamSession::new(stream_of(&bad), &mut cache, KeyMode::ObjectName);
        let outcome = session.run(&sink).await;

        assert!(matches!(outcome.end, SessionEnd::Decode(_)));
        assert_eq!(cache.len(), 1);
        // The surviving entry still suppresses.
        let repeat = vec![line("a", "x", "2024-03-01T00:01:40Z", "boom")];
        let session = StreamSession::new(stream_of(&repeat), &mut cache, KeyMode::ObjectName);
        let outcome = session.run(&sink).await;
        assert_eq!(outcome.suppressed, 1);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_end_session() {
        let lines = vec![
            line("a", "x", "2024-03-01T00:01:40Z", "boom"),
            line("a", "y", "2024-03-01T00:01:40Z", "boom"),
        ];
        let mut cache = DedupCache::new(DEFAULT_TTL);
        let sink = MemorySink::new();
        sink.set_fail(true);

        let session = StreamSession::new(stream_of(&lines), &mut cache, KeyMode::ObjectName);
        let outcome = session.run(&sink).await;

        assert!(matches!(outcome.end, SessionEnd::StreamEnded));
        assert_eq!(outcome.emitted, 2);
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn test_empty_stream_ends_cleanly() {
        let mut cache = DedupCache::new(DEFAULT_TTL);
        let sink = MemorySink::new();

        let session = StreamSession::new(stream_of(&[]), &mut cache, KeyMode::ObjectName);
        let outcome = session.run(&sink).await;

        assert!(matches!(outcome.end, SessionEnd::StreamEnded));
        assert_eq!(outcome.lines, 0);
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn test_involved_object_key_groups_across_event_names() {
        // Two event objects with distinct names but the same involved
        // object and identical timestamp/message dedup together.
        let lines = vec![
            line("a", "evt-1", "2024-03-01T00:01:40Z", "boom"),
            line("a", "evt-2", "2024-03-01T00:01:40Z", "boom"),
        ];
        let mut cache = DedupCache::new(DEFAULT_TTL);
        let sink = MemorySink::new();

        let session = StreamSession::new(stream_of(&lines), &mut cache, KeyMode::InvolvedObject);
        let outcome = session.run(&sink).await;

        assert_eq!(outcome.emitted, 1);
        assert_eq!(outcome.suppressed, 1);
        assert_eq!(sink.records()[0].key, "a/pod-0");
    }
}

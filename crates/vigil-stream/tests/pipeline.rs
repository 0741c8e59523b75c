//! Cross-session pipeline scenarios driven through the orchestrator:
//! reconnect persistence, retry behavior and decode-failure handling.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;

use vigil_stream::{
    ByteStream, Connector, DedupCache, MemorySink, Orchestrator, Result, StreamError,
};

/// One scripted connection attempt.
enum Attempt {
    /// Connection establishment fails.
    Refuse,
    /// Connection succeeds and streams these lines.
    Serve(Vec<String>),
}

/// Plays back a fixed sequence of connection attempts.
struct ScriptedConnector {
    attempts: Mutex<VecDeque<Attempt>>,
}

impl ScriptedConnector {
    fn new(attempts: Vec<Attempt>) -> Self {
        Self {
            attempts: Mutex::new(attempts.into()),
        }
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self) -> Result<ByteStream> {
        match self.attempts.lock().unwrap().pop_front() {
            Some(Attempt::Serve(lines)) => {
                let body: String = lines.iter().map(|l| format!("{}\n", l)).collect();
                let chunks: Vec<std::result::Result<Bytes, StreamError>> =
                    vec![Ok(Bytes::from(body))];
                Ok(Box::pin(futures::stream::iter(chunks)))
            }
            Some(Attempt::Refuse) | None => {
                Err(StreamError::Connect("connection refused".to_string()))
            }
        }
    }
}

fn event_line(namespace: &str, name: &str, ts: &str, message: &str) -> String {
    format!(
        concat!(
            r#"{{"object": {{"kind": "Event", "#,
            r#""metadata": {{"namespace": "{}", "name": "{}"}}, "#,
            r#""reason": "Failed", "message": "{}", "#,
            r#""lastTimestamp": "{}"}}}}"#,
        ),
        namespace, name, message, ts
    )
}

fn orchestrator(
    attempts: Vec<Attempt>,
    sink: Arc<MemorySink>,
) -> Orchestrator<ScriptedConnector> {
    // The loop only stops via max_sessions in these tests; a dropped
    // sender can never request shutdown.
    let (_tx, rx) = watch::channel(false);
    Orchestrator::new(ScriptedConnector::new(attempts), sink, DedupCache::default(), rx)
}

#[tokio::test]
async fn test_end_to_end_dedup_within_one_session() {
    // Three lines: the second is a true duplicate of the first, the third
    // repeats the message with a newer timestamp. Exactly two forward.
    let lines = vec![
        event_line("a", "x", "2024-03-01T00:01:40Z", "boom"),
        event_line("a", "x", "2024-03-01T00:01:40Z", "boom"),
        event_line("a", "x", "2024-03-01T00:03:20Z", "boom"),
    ];
    let sink = Arc::new(MemorySink::new());
    let mut orchestrator =
        orchestrator(vec![Attempt::Serve(lines)], Arc::clone(&sink)).with_max_sessions(1);

    orchestrator.run().await;

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].timestamp, "2024-03-01T00:01:40Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap());
    assert_eq!(records[1].timestamp, "2024-03-01T00:03:20Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap());
}

#[tokio::test]
async fn test_cache_survives_reconnect() {
    // The same event arrives again on a fresh connection after a stream
    // failure; the entry recorded in the first session still suppresses.
    let repeated = event_line("a", "x", "2024-03-01T00:01:40Z", "boom");
    let sink = Arc::new(MemorySink::new());
    let mut orchestrator = orchestrator(
        vec![
            Attempt::Serve(vec![repeated.clone()]),
            Attempt::Serve(vec![repeated]),
        ],
        Arc::clone(&sink),
    )
    .with_max_sessions(2);

    orchestrator.run().await;

    assert_eq!(sink.count(), 1);
    assert_eq!(orchestrator.cache().len(), 1);
}

#[tokio::test]
async fn test_malformed_line_reconnects_without_delay() {
    // A decode failure ends the session; the next session opens
    // immediately. The retry interval is set so high that taking the
    // delayed path would trip the assertion below.
    let sink = Arc::new(MemorySink::new());
    let mut orchestrator = orchestrator(
        vec![
            Attempt::Serve(vec![
                event_line("a", "x", "2024-03-01T00:01:40Z", "boom"),
                "not json".to_string(),
            ]),
            Attempt::Serve(vec![event_line("a", "y", "2024-03-01T00:01:40Z", "boom")]),
        ],
        Arc::clone(&sink),
    )
    .with_max_sessions(2)
    .with_retry_interval(Duration::from_secs(60));

    let started = Instant::now();
    orchestrator.run().await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(sink.count(), 2);
}

#[tokio::test]
async fn test_connect_failure_waits_then_retries() {
    let sink = Arc::new(MemorySink::new());
    let mut orchestrator = orchestrator(
        vec![
            Attempt::Refuse,
            Attempt::Serve(vec![event_line("a", "x", "2024-03-01T00:01:40Z", "boom")]),
        ],
        Arc::clone(&sink),
    )
    .with_max_sessions(1)
    .with_retry_interval(Duration::from_millis(20));

    let started = Instant::now();
    orchestrator.run().await;

    // One refused attempt, one served session.
    assert!(started.elapsed() >= Duration::from_millis(20));
    assert_eq!(sink.count(), 1);
}

#[tokio::test]
async fn test_decode_failure_does_not_disturb_suppression() {
    // Session 1 records an entry, session 2 dies on a malformed line,
    // session 3 delivers a duplicate of the original event. The cache is
    // unchanged by the failed session and still suppresses.
    let event = event_line("a", "x", "2024-03-01T00:01:40Z", "boom");
    let sink = Arc::new(MemorySink::new());
    let mut orchestrator = orchestrator(
        vec![
            Attempt::Serve(vec![event.clone()]),
            Attempt::Serve(vec!["{broken".to_string()]),
            Attempt::Serve(vec![event]),
        ],
        Arc::clone(&sink),
    )
    .with_max_sessions(3);

    orchestrator.run().await;

    assert_eq!(sink.count(), 1);
}

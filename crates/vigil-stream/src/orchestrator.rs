//! Reconnect control loop.
//!
//! The orchestrator owns the dedup cache across sessions and drives an
//! explicit state machine: `Idle → Connecting → Streaming → Idle`,
//! forever. Connection failures wait out a fixed retry interval before
//! the next attempt; a session that ends for any reason reconnects
//! immediately. The interval never grows.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::dedup::DedupCache;
use crate::event::KeyMode;
use crate::session::StreamSession;
use crate::sink::SharedSink;
use crate::watch::{ByteStream, Connector};

/// Default wait between failed connection attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Default interval between sweeps of expired cache entries.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(600);

/// Where the control loop currently is.
enum WatchState {
    /// Between sessions; the safe boundary for shutdown and sweeping.
    Idle,

    /// About to open a new watch connection.
    Connecting,

    /// Holding a live connection.
    Streaming(ByteStream),
}

/// Outer control loop: opens successive stream sessions against a
/// connector and forwards accepted records to the sink.
pub struct Orchestrator<C> {
    connector: C,
    sink: SharedSink,
    cache: DedupCache,
    key_mode: KeyMode,
    retry_interval: Duration,
    cleanup_interval: Duration,
    shutdown: watch::Receiver<bool>,
    max_sessions: Option<usize>,
    sessions: usize,
    last_sweep: Instant,
}

impl<C: Connector> Orchestrator<C> {
    /// Create an orchestrator over a connector, sink and cache.
    pub fn new(
        connector: C,
        sink: SharedSink,
        cache: DedupCache,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            connector,
            sink,
            cache,
            key_mode: KeyMode::default(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            shutdown,
            max_sessions: None,
            sessions: 0,
            last_sweep: Instant::now(),
        }
    }

    /// Select the grouping-key variant.
    pub fn with_key_mode(mut self, key_mode: KeyMode) -> Self {
        self.key_mode = key_mode;
        self
    }

    /// Set the wait between failed connection attempts.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Set the interval between cache sweeps.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Stop after this many established sessions. Tests only; a
    /// production orchestrator runs unbounded.
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = Some(max);
        self
    }

    /// The dedup cache shared across sessions.
    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }

    /// Drive the loop until shutdown is requested (or the session bound
    /// is reached, when one is set).
    pub async fn run(&mut self) {
        let mut state = WatchState::Idle;

        loop {
            state = match state {
                WatchState::Idle => {
                    if *self.shutdown.borrow() {
                        info!("Shutdown requested, stopping watch loop");
                        break;
                    }
                    if self.max_sessions.is_some_and(|max| self.sessions >= max) {
                        debug!(sessions = self.sessions, "Session bound reached");
                        break;
                    }
                    self.maybe_sweep();
                    WatchState::Connecting
                }

                WatchState::Connecting => match self.connector.connect().await {
                    Ok(stream) => WatchState::Streaming(stream),
                    Err(err) => {
                        warn!(
                            error = %err,
                            retry_secs = self.retry_interval.as_secs(),
                            "Failed to open watch connection"
                        );
                        if self.wait_retry().await {
                            info!("Shutdown requested, stopping watch loop");
                            break;
                        }
                        WatchState::Idle
                    }
                },

                WatchState::Streaming(stream) => {
                    self.sessions += 1;
                    let session = StreamSession::new(stream, &mut self.cache, self.key_mode);
                    let sink = Arc::clone(&self.sink);
                    let shutdown = &mut self.shutdown;

                    tokio::select! {
                        outcome = session.run(sink.as_ref()) => {
                            info!(
                                lines = outcome.lines,
                                emitted = outcome.emitted,
                                suppressed = outcome.suppressed,
                                end = %outcome.end,
                                "Watch session ended"
                            );
                            WatchState::Idle
                        }
                        _ = shutdown_requested(shutdown) => {
                            info!("Shutdown requested, abandoning watch session");
                            break;
                        }
                    }
                }
            };
        }
    }

    /// Sleep out the retry interval. Returns true if shutdown was
    /// requested while sleeping.
    async fn wait_retry(&mut self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.retry_interval) => false,
            _ = shutdown_requested(&mut self.shutdown) => true,
        }
    }

    /// Sweep expired entries once the cleanup interval has elapsed.
    ///
    /// Runs inline at the Idle boundary; expiry correctness never depends
    /// on it (lookups check deadlines themselves), it only bounds memory
    /// held by keys that are never revisited.
    fn maybe_sweep(&mut self) {
        if self.last_sweep.elapsed() < self.cleanup_interval {
            return;
        }
        let removed = self.cache.sweep();
        self.last_sweep = Instant::now();
        if removed > 0 {
            debug!(removed, live = self.cache.len(), "Swept expired dedup entries");
        }
    }
}

/// Resolves when the shutdown signal flips to true; pends forever if the
/// sender is gone.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

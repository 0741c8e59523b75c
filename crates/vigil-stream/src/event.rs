//! Event records decoded from the watch stream.
//!
//! Each line of the watch response body is a JSON envelope
//! `{ "type": ..., "object": ... }` wrapping one cluster event. Only the
//! identity fields, the last-occurrence timestamp and the message are
//! interpreted; everything else passes through verbatim.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::Result;

/// Which upstream field supplies the grouping name.
///
/// Deployments watching the aggregated feed key on the event object's own
/// name; deployments that track the workload behind each event key on the
/// involved object's name instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMode {
    /// Key is `namespace + "/" + metadata.name`.
    #[default]
    ObjectName,
    /// Key is `namespace + "/" + involvedObject.name`.
    InvolvedObject,
}

/// One decoded event from the watch stream.
///
/// Immutable once decoded; the grouping key is derived at decode time and
/// never recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Grouping identity used for dedup decisions.
    pub key: String,

    /// Last-occurrence time reported upstream. May repeat across records.
    pub timestamp: DateTime<Utc>,

    /// Namespace of the event object, verbatim.
    pub namespace: String,

    /// Name of the event object, verbatim.
    pub name: String,

    /// Object kind, verbatim.
    pub kind: String,

    /// Short machine reason, verbatim.
    pub reason: String,

    /// Human-readable message, verbatim.
    pub message: String,
}

impl EventRecord {
    /// Decode one raw line from the watch stream.
    ///
    /// The envelope must carry an `object` with `metadata` and a parseable
    /// `lastTimestamp`; the descriptive strings default to empty when
    /// absent. Any other shape is a decode error.
    pub fn decode(line: &[u8], key_mode: KeyMode) -> Result<Self> {
        let envelope: WatchEnvelope = serde_json::from_slice(line)?;
        let event = envelope.object;

        let keyed_name = match key_mode {
            KeyMode::ObjectName => &event.metadata.name,
            KeyMode::InvolvedObject => &event.involved_object.name,
        };
        let key = format!("{}/{}", event.metadata.namespace, keyed_name);

        Ok(Self {
            key,
            timestamp: event.last_timestamp,
            namespace: event.metadata.namespace,
            name: event.metadata.name,
            kind: event.kind,
            reason: event.reason,
            message: event.message,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Format
// ─────────────────────────────────────────────────────────────────────────────

/// Envelope wrapping each streamed event.
#[derive(Debug, Deserialize)]
struct WatchEnvelope {
    #[serde(rename = "type", default)]
    #[allow(dead_code)]
    event_type: Option<String>,
    object: ApiEvent,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    #[serde(default)]
    kind: String,
    metadata: ApiMetadata,
    #[serde(default)]
    involved_object: ApiObjectRef,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
    last_timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiMetadata {
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiObjectRef {
    #[serde(default)]
    name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Data model: lifecycle events, correlation keys, and trace records.
//!
//! A request's life is observed as a stream of [`LifecycleEvent`]s. Events
//! belonging to the same logical request share a correlation key: the
//! request id when the interception source supplies one, otherwise the
//! target URL (at most one in-flight request per target in that mode).
//!
//! The reconstructed, emittable snapshot of a request is a [`TraceRecord`].
//! Records emitted before `Finish` are partial (no response body, no finish
//! timestamp); the final record carries both.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed moment in a request's life.
///
/// Events for the same request id arrive causally ordered (start, zero or
/// more data chunks, at most one response, exactly one finish); events for
/// distinct requests may interleave arbitrarily.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// An outgoing request was started.
    Start {
        /// Correlation id; absent when the source cannot supply ids.
        request_id: Option<String>,
        /// Request target (URL).
        target: String,
        /// HTTP method.
        method: String,
        /// Request headers.
        headers: HashMap<String, String>,
        /// Leading bytes of the request body, if the source captured any.
        body_prefix: Option<Vec<u8>>,
    },
    /// Response metadata (status line + headers) arrived.
    Response {
        request_id: Option<String>,
        target: String,
        /// HTTP status code.
        status: u16,
        /// Response headers.
        headers: HashMap<String, String>,
    },
    /// A chunk of response body bytes arrived.
    Data {
        request_id: Option<String>,
        target: String,
        bytes: Vec<u8>,
    },
    /// The request completed (success, failure, or cancellation).
    Finish {
        request_id: Option<String>,
        target: String,
    },
}

impl LifecycleEvent {
    /// Correlation key for this event: the request id when present, the
    /// target otherwise.
    pub fn key(&self) -> CorrelationKey {
        let (id, target) = match self {
            LifecycleEvent::Start {
                request_id, target, ..
            }
            | LifecycleEvent::Response {
                request_id, target, ..
            }
            | LifecycleEvent::Data {
                request_id, target, ..
            }
            | LifecycleEvent::Finish { request_id, target } => (request_id, target),
        };
        match id {
            Some(id) => CorrelationKey::Id(id.clone()),
            None => CorrelationKey::Target(target.clone()),
        }
    }
}

/// The identifier used to group lifecycle events into one request.
///
/// Id-keyed mode supports any number of concurrent requests to the same
/// target; target-keyed mode is the fallback for sources that cannot supply
/// request ids and can represent only one in-flight request per target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CorrelationKey {
    /// Keyed by the source-supplied request id.
    Id(String),
    /// Keyed by target URL (id-less fallback).
    Target(String),
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationKey::Id(id) => write!(f, "id:{}", id),
            CorrelationKey::Target(target) => write!(f, "target:{}", target),
        }
    }
}

/// The reconstructed snapshot of a request at a point in its lifecycle.
///
/// Serializes with camelCase field names; receivers merge records by
/// `recordId`, which is minted once at `Start` and stable across every
/// emission for that request. `response_body` and `finished_at` are present
/// only on the final record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRecord {
    /// Stable identifier for this request, shared by all its records.
    pub record_id: String,
    /// Request target (URL).
    pub target: String,
    /// HTTP method.
    pub method: String,
    /// Request headers.
    pub request_headers: HashMap<String, String>,
    /// Captured request body prefix, capped at the configured maximum.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "serde_bytes")]
    pub request_body: Option<Vec<u8>>,
    /// Response headers; absent until a `Response` event is observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<HashMap<String, String>>,
    /// Accumulated response body; present only on the final record.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "serde_bytes")]
    pub response_body: Option<Vec<u8>>,
    /// HTTP status code; absent until a `Response` event is observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// When the request started.
    pub started_at: DateTime<Utc>,
    /// When the request finished; present only on the final record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl TraceRecord {
    /// Whether this is the final record for its request.
    #[inline]
    pub fn is_final(&self) -> bool {
        self.finished_at.is_some()
    }
}

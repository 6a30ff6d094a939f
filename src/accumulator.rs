//! Per-request state accumulation.
//!
//! The accumulator owns one entry per in-flight request, keyed by
//! [`CorrelationKey`]. It answers a single question: given this lifecycle
//! event, is there enough information to emit a record, and what does it
//! look like.
//!
//! Emission points:
//! - `Start` always yields a partial record, so an observer sees a request
//!   begin before it completes.
//! - `Response` yields an updated partial record (headers + status).
//! - `Data` yields nothing; chunks are accumulated invisibly so the record
//!   rate is independent of how finely the body is streamed.
//! - `Finish` yields the final record (accumulated body, finish timestamp)
//!   and removes the entry.
//!
//! Orphan events (no entry for the key) and duplicate finishes are no-ops,
//! not errors. Body bytes past the configured cap are silently truncated.
//!
//! An entry whose `Finish` never arrives stays in the map indefinitely;
//! there is no reaper. [`in_flight`](RequestAccumulator::in_flight) exists
//! so callers can watch for that leak.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::record::{CorrelationKey, TraceRecord};

/// Request-side metadata carried by a `Start` event.
#[derive(Debug, Clone)]
pub struct StartMeta {
    /// Request target (URL).
    pub target: String,
    /// HTTP method.
    pub method: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Leading request body bytes, if captured.
    pub body_prefix: Option<Vec<u8>>,
}

/// Response-side metadata carried by a `Response` event.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
}

/// State for one in-flight request.
#[derive(Debug)]
struct Entry {
    record_id: String,
    target: String,
    method: String,
    request_headers: HashMap<String, String>,
    request_body: Option<Vec<u8>>,
    response: Option<ResponseMeta>,
    /// Accumulated response body, never longer than the cap.
    body: Vec<u8>,
    started_at: DateTime<Utc>,
}

impl Entry {
    /// Partial snapshot: no response body, no finish timestamp.
    fn snapshot(&self) -> TraceRecord {
        TraceRecord {
            record_id: self.record_id.clone(),
            target: self.target.clone(),
            method: self.method.clone(),
            request_headers: self.request_headers.clone(),
            request_body: self.request_body.clone(),
            response_headers: self.response.as_ref().map(|r| r.headers.clone()),
            response_body: None,
            status_code: self.response.as_ref().map(|r| r.status),
            started_at: self.started_at,
            finished_at: None,
        }
    }

    /// Final record: consumes the entry, attaching the accumulated body.
    fn finalize(self, finished_at: DateTime<Utc>) -> TraceRecord {
        TraceRecord {
            record_id: self.record_id,
            target: self.target,
            method: self.method,
            request_headers: self.request_headers,
            request_body: self.request_body,
            response_headers: self.response.as_ref().map(|r| r.headers.clone()),
            response_body: Some(self.body),
            status_code: self.response.as_ref().map(|r| r.status),
            started_at: self.started_at,
            finished_at: Some(finished_at),
        }
    }
}

/// Tracks every in-flight request and builds records at emission points.
///
/// Not synchronized: the owning engine serializes access (see
/// [`Tracer`](crate::Tracer)).
pub struct RequestAccumulator {
    entries: HashMap<CorrelationKey, Entry>,
    body_cap: usize,
}

impl RequestAccumulator {
    /// Create an accumulator with the given per-body byte cap.
    pub fn new(body_cap: usize) -> Self {
        Self {
            entries: HashMap::new(),
            body_cap,
        }
    }

    /// Begin tracking a request; returns the initial partial record.
    ///
    /// A stale entry under the same key (a predecessor whose finish was
    /// never observed) is discarded without emitting a synthetic finish.
    pub fn on_start(&mut self, key: CorrelationKey, meta: StartMeta) -> TraceRecord {
        let mut request_body = meta.body_prefix;
        if let Some(body) = request_body.as_mut() {
            body.truncate(self.body_cap);
        }

        let entry = Entry {
            record_id: Uuid::new_v4().to_string(),
            target: meta.target,
            method: meta.method,
            request_headers: meta.headers,
            request_body,
            response: None,
            body: Vec::new(),
            started_at: Utc::now(),
        };

        let snapshot = entry.snapshot();
        if let Some(stale) = self.entries.insert(key, entry) {
            tracing::debug!(
                record_id = %stale.record_id,
                "discarding stale entry replaced by new start"
            );
        }
        snapshot
    }

    /// Record response metadata; returns an updated partial record, or
    /// `None` for an orphan event.
    pub fn on_response(&mut self, key: &CorrelationKey, meta: ResponseMeta) -> Option<TraceRecord> {
        let entry = self.entries.get_mut(key)?;
        entry.response = Some(meta);
        Some(entry.snapshot())
    }

    /// Append response body bytes up to the cap; bytes beyond it are
    /// silently dropped. Never emits.
    pub fn on_data(&mut self, key: &CorrelationKey, bytes: &[u8]) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        let room = self.body_cap.saturating_sub(entry.body.len());
        let take = room.min(bytes.len());
        if take > 0 {
            entry.body.extend_from_slice(&bytes[..take]);
        }
    }

    /// Finish a request: returns the final record and removes the entry.
    ///
    /// Returns `None` for a duplicate or unmatched finish, a no-op by
    /// contract, so a second finish can never re-emit or double-count.
    pub fn on_finish(&mut self, key: &CorrelationKey) -> Option<TraceRecord> {
        let entry = self.entries.remove(key)?;
        Some(entry.finalize(Utc::now()))
    }

    /// Number of requests currently being tracked.
    pub fn in_flight(&self) -> usize {
        self.entries.len()
    }
}

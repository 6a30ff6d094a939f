//! Delivery channel - buffered, best-effort frame delivery.
//!
//! The channel owns a bounded FIFO of encoded frames and whichever transport
//! handle is currently attached (at most one). Records are framed on
//! enqueue; frames wait in the queue while the transport is absent or
//! not-ready and are flushed in order once it is. Under sustained
//! backpressure the oldest frame is evicted to admit the newest (recency
//! over completeness).
//!
//! Attach deduplicates by peer identity: re-attaching the currently-attached
//! peer is a no-op, while a different (or previously detached) peer installs
//! a fresh handle. Detach drops the handle but keeps the queue, so frames
//! buffered across an observer restart are delivered on reconnect.
//!
//! Readiness transitions on the handle trigger a flush through a callback
//! holding a weak reference to the channel, so an attached transport never
//! keeps the channel alive and nobody polls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::codec::RecordEncoder;
use crate::error::Result;
use crate::protocol::encode_frame;
use crate::record::TraceRecord;
use crate::transport::{PeerIdentity, Transport};

/// Point-in-time counters for the delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    /// Frames currently queued.
    pub pending: usize,
    /// Total frames ever enqueued.
    pub enqueued: u64,
    /// Frames evicted to make room (oldest-first).
    pub evicted: u64,
    /// Frames handed to a transport.
    pub flushed: u64,
}

/// State owned by the channel's serialized region.
struct Inner {
    queue: VecDeque<Bytes>,
    transport: Option<Arc<dyn Transport>>,
    peer: Option<PeerIdentity>,
}

/// Best-effort, order-preserving, bounded-memory frame delivery.
pub struct DeliveryChannel {
    inner: Mutex<Inner>,
    capacity: usize,
    encoder: Box<dyn RecordEncoder>,
    /// Non-owning self-handle for ready callbacks, set at construction.
    weak_self: Weak<DeliveryChannel>,
    enqueued: AtomicU64,
    evicted: AtomicU64,
    flushed: AtomicU64,
}

impl DeliveryChannel {
    /// Create a channel with the given queue capacity and record encoder.
    ///
    /// A capacity of zero is bumped to one.
    pub fn new(capacity: usize, encoder: Box<dyn RecordEncoder>) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                transport: None,
                peer: None,
            }),
            capacity: capacity.max(1),
            encoder,
            weak_self: weak_self.clone(),
            enqueued: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
            flushed: AtomicU64::new(0),
        })
    }

    /// Attach a transport handle.
    ///
    /// No-op when the handle's peer identity equals the currently attached
    /// one. Otherwise installs the handle, registers the ready callback and
    /// flushes whatever is already ready to go.
    pub fn attach(&self, transport: Arc<dyn Transport>) {
        {
            let mut inner = self.inner.lock();
            if inner.transport.is_some() && inner.peer.as_ref() == Some(transport.peer()) {
                tracing::debug!(peer = %transport.peer(), "already attached, ignoring");
                return;
            }
            tracing::debug!(peer = %transport.peer(), "attaching transport");
            inner.peer = Some(transport.peer().clone());
            inner.transport = Some(transport.clone());
        }

        // Registered outside the lock: the transport may invoke the callback
        // synchronously if it is already ready.
        let weak = self.weak_self.clone();
        transport.on_ready(Box::new(move || {
            if let Some(channel) = weak.upgrade() {
                channel.flush();
            }
        }));

        self.flush();
    }

    /// Drop the current handle without discarding the queue.
    ///
    /// Frames already handed to the old handle are not retried. Clearing the
    /// attached identity lets a later `attach` to the same peer build a
    /// genuinely new connection (observer restarts).
    pub fn detach(&self) {
        let mut inner = self.inner.lock();
        if let Some(peer) = inner.peer.take() {
            tracing::debug!(peer = %peer, "detaching transport");
        }
        inner.transport = None;
    }

    /// Encode a record, frame it, and append it to the queue.
    ///
    /// When the queue is full the oldest frame is evicted first; eviction is
    /// expected backpressure behavior, not an error. An encoding failure is
    /// returned to the caller and leaves the queue untouched.
    pub fn enqueue(&self, record: &TraceRecord) -> Result<()> {
        let payload = self.encoder.encode(record)?;
        let frame = Bytes::from(encode_frame(&payload));

        let mut inner = self.inner.lock();
        if inner.queue.len() >= self.capacity {
            inner.queue.pop_front();
            self.evicted.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(capacity = self.capacity, "delivery queue full, evicting oldest frame");
        }
        inner.queue.push_back(frame);
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Send queued frames in FIFO order while a ready handle is attached.
    ///
    /// No-op without a handle or while the handle reports not-ready. Sends
    /// are fire-and-forget; the transport must not call back into the
    /// channel from `send`.
    pub fn flush(&self) {
        let mut inner = self.inner.lock();
        loop {
            let Some(transport) = inner.transport.clone() else {
                return;
            };
            if !transport.is_ready() {
                return;
            }
            let Some(frame) = inner.queue.pop_front() else {
                return;
            };
            transport.send(frame);
            self.flushed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of frames currently queued.
    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Snapshot of the channel counters.
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            pending: self.pending(),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            flushed: self.flushed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MsgPackEncoder;
    use crate::protocol::FrameBuffer;
    use crate::transport::ReadyCallback;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    /// In-memory transport: toggling readiness fires the registered
    /// callback the way a reconnecting socket would.
    struct MockTransport {
        peer: PeerIdentity,
        ready: AtomicBool,
        sent: Mutex<Vec<Bytes>>,
        callback: Mutex<Option<ReadyCallback>>,
        registrations: AtomicUsize,
    }

    impl MockTransport {
        fn new(ready: bool) -> Arc<Self> {
            Self::with_peer(ready, PeerIdentity::new("observer", "_wiretap._tcp", "local"))
        }

        fn with_peer(ready: bool, peer: PeerIdentity) -> Arc<Self> {
            Arc::new(Self {
                peer,
                ready: AtomicBool::new(ready),
                sent: Mutex::new(Vec::new()),
                callback: Mutex::new(None),
                registrations: AtomicUsize::new(0),
            })
        }

        fn set_ready(&self, ready: bool) {
            self.ready.store(ready, Ordering::SeqCst);
            if ready {
                if let Some(callback) = self.callback.lock().as_ref() {
                    callback();
                }
            }
        }

        fn sent_frames(&self) -> Vec<Bytes> {
            self.sent.lock().clone()
        }
    }

    impl Transport for MockTransport {
        fn peer(&self) -> &PeerIdentity {
            &self.peer
        }

        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        fn send(&self, frame: Bytes) {
            self.sent.lock().push(frame);
        }

        fn on_ready(&self, callback: ReadyCallback) {
            self.registrations.fetch_add(1, Ordering::SeqCst);
            *self.callback.lock() = Some(callback);
        }
    }

    fn channel(capacity: usize) -> Arc<DeliveryChannel> {
        DeliveryChannel::new(capacity, Box::new(MsgPackEncoder))
    }

    fn record(id: &str) -> TraceRecord {
        TraceRecord {
            record_id: id.to_string(),
            target: "https://example.com".to_string(),
            method: "GET".to_string(),
            request_headers: HashMap::new(),
            request_body: None,
            response_headers: None,
            response_body: None,
            status_code: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Unframe and decode everything a mock transport received.
    fn decode_sent(transport: &MockTransport) -> Vec<TraceRecord> {
        let mut buffer = FrameBuffer::new();
        let mut records = Vec::new();
        for frame in transport.sent_frames() {
            for payload in buffer.push(&frame).unwrap() {
                records.push(MsgPackEncoder::decode(&payload).unwrap());
            }
        }
        assert!(buffer.is_empty(), "partial frame left on the wire");
        records
    }

    #[test]
    fn test_enqueue_while_detached_buffers() {
        let channel = channel(8);
        channel.enqueue(&record("a")).unwrap();
        channel.enqueue(&record("b")).unwrap();

        assert_eq!(channel.pending(), 2);
        channel.flush(); // no handle: no-op
        assert_eq!(channel.pending(), 2);
    }

    #[test]
    fn test_attach_ready_flushes_in_order() {
        let channel = channel(8);
        for id in ["a", "b", "c"] {
            channel.enqueue(&record(id)).unwrap();
        }

        let transport = MockTransport::new(true);
        channel.attach(transport.clone());

        assert_eq!(channel.pending(), 0);
        let records = decode_sent(&transport);
        let ids: Vec<_> = records.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_attach_not_ready_sends_nothing_until_ready() {
        let channel = channel(8);
        for id in ["a", "b"] {
            channel.enqueue(&record(id)).unwrap();
        }

        let transport = MockTransport::new(false);
        channel.attach(transport.clone());
        assert!(transport.sent_frames().is_empty());
        assert_eq!(channel.pending(), 2);

        // Readiness transition triggers the flush; nobody calls flush().
        transport.set_ready(true);
        assert_eq!(channel.pending(), 0);
        assert_eq!(decode_sent(&transport).len(), 2);
    }

    #[test]
    fn test_queue_eviction_drops_oldest() {
        let capacity = 4;
        let channel = channel(capacity);
        for i in 0..=capacity {
            channel.enqueue(&record(&format!("r{}", i))).unwrap();
        }
        assert_eq!(channel.pending(), capacity);
        assert_eq!(channel.stats().evicted, 1);

        let transport = MockTransport::new(true);
        channel.attach(transport.clone());

        // Exactly the last `capacity` frames, original order, r0 missing.
        let ids: Vec<String> = decode_sent(&transport)
            .into_iter()
            .map(|r| r.record_id)
            .collect();
        assert_eq!(ids, ["r1", "r2", "r3", "r4"]);
    }

    #[test]
    fn test_flush_stops_when_handle_goes_not_ready() {
        let channel = channel(8);
        for id in ["a", "b", "c"] {
            channel.enqueue(&record(id)).unwrap();
        }

        let transport = MockTransport::new(false);
        channel.attach(transport.clone());
        transport.ready.store(true, Ordering::SeqCst);
        channel.flush();
        // Simulate the handle stalling mid-stream.
        transport.ready.store(false, Ordering::SeqCst);
        channel.enqueue(&record("d")).unwrap();
        channel.flush();

        assert_eq!(decode_sent(&transport).len(), 3);
        assert_eq!(channel.pending(), 1);
    }

    #[test]
    fn test_attach_same_peer_is_noop() {
        let channel = channel(8);
        let transport = MockTransport::new(true);
        channel.attach(transport.clone());
        assert_eq!(transport.registrations.load(Ordering::SeqCst), 1);

        // Same identity on a second handle: deduplicated.
        let duplicate = MockTransport::new(true);
        channel.attach(duplicate.clone());
        assert_eq!(duplicate.registrations.load(Ordering::SeqCst), 0);

        channel.enqueue(&record("a")).unwrap();
        channel.flush();
        assert_eq!(decode_sent(&transport).len(), 1);
        assert!(duplicate.sent_frames().is_empty());
    }

    #[test]
    fn test_attach_different_peer_replaces_handle() {
        let channel = channel(8);
        let first = MockTransport::new(true);
        channel.attach(first.clone());

        let second = MockTransport::with_peer(
            true,
            PeerIdentity::new("observer-2", "_wiretap._tcp", "local"),
        );
        channel.attach(second.clone());

        channel.enqueue(&record("a")).unwrap();
        channel.flush();
        assert!(first.sent_frames().is_empty());
        assert_eq!(decode_sent(&second).len(), 1);
    }

    #[test]
    fn test_detach_keeps_queue_and_resets_identity() {
        let channel = channel(8);
        let transport = MockTransport::new(false);
        channel.attach(transport.clone());

        channel.enqueue(&record("a")).unwrap();
        channel.detach();
        assert_eq!(channel.pending(), 1);

        // Re-attaching the SAME identity after detach is a real attach,
        // not a dedup no-op (the observer may have restarted).
        let reconnected = MockTransport::new(true);
        channel.attach(reconnected.clone());
        assert_eq!(reconnected.registrations.load(Ordering::SeqCst), 1);
        assert_eq!(decode_sent(&reconnected).len(), 1);
    }

    #[test]
    fn test_reconnect_flush_preserves_order_and_count() {
        let n = 5;
        let channel = channel(16);
        for i in 0..n {
            channel.enqueue(&record(&format!("r{}", i))).unwrap();
        }

        let transport = MockTransport::new(false);
        channel.attach(transport.clone());
        assert!(transport.sent_frames().is_empty());

        transport.set_ready(true);

        let ids: Vec<String> = decode_sent(&transport)
            .into_iter()
            .map(|r| r.record_id)
            .collect();
        assert_eq!(ids, ["r0", "r1", "r2", "r3", "r4"]);
    }

    #[test]
    fn test_stats_track_lifecycle() {
        let channel = channel(2);
        channel.enqueue(&record("a")).unwrap();
        channel.enqueue(&record("b")).unwrap();
        channel.enqueue(&record("c")).unwrap(); // evicts "a"

        let transport = MockTransport::new(true);
        channel.attach(transport);

        let stats = channel.stats();
        assert_eq!(stats.enqueued, 3);
        assert_eq!(stats.evicted, 1);
        assert_eq!(stats.flushed, 2);
        assert_eq!(stats.pending, 0);
    }
}

//! Correlation engine: the single ingress for lifecycle events.
//!
//! [`Tracer::record`] routes each event to the accumulator, runs the
//! optional [`TraceHook`] on any resulting record, and forwards accepted
//! records to the delivery channel. It is callable from any thread, any
//! number of times; accumulator access is serialized internally.
//!
//! # Hook re-entrancy
//!
//! The hook runs *after* the accumulator lock is released, on a snapshot
//! taken while it was held. A hook may therefore call `record()` on the
//! same tracer (e.g. to synthesize a diagnostic request) without
//! deadlocking and without observing half-mutated state. Nested sends reach
//! the delivery channel in completion order; ordering per request id is
//! preserved.
//!
//! # Example
//!
//! ```ignore
//! use tracewire::{LifecycleEvent, Tracer};
//!
//! let tracer = Tracer::builder().body_cap(32 * 1024).build();
//! tracer.record(LifecycleEvent::Start {
//!     request_id: Some("req-1".into()),
//!     target: "https://api.example.com/v1".into(),
//!     method: "GET".into(),
//!     headers: Default::default(),
//!     body_prefix: None,
//! });
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::accumulator::{RequestAccumulator, ResponseMeta, StartMeta};
use crate::channel::DeliveryChannel;
use crate::codec::{MsgPackEncoder, RecordEncoder};
use crate::config::TracerConfig;
use crate::record::{LifecycleEvent, TraceRecord};
use crate::transport::Transport;

/// Filter/rewrite hook invoked before a record is sent.
///
/// Returning a record (the input, or a modified copy) means "send this";
/// returning `None` drops it. The tracer holds the hook weakly: dropping
/// the owning `Arc` is equivalent to clearing the hook.
pub trait TraceHook: Send + Sync {
    /// Decide the fate of a record about to be sent.
    fn will_send(&self, record: TraceRecord) -> Option<TraceRecord>;
}

/// Point-in-time counters for the tracer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracerStats {
    /// Records accepted by the delivery channel.
    pub sent: u64,
    /// Records dropped by the hook or by an encoding failure.
    pub dropped: u64,
}

/// Builder for configuring and creating a [`Tracer`].
pub struct TracerBuilder {
    config: TracerConfig,
    encoder: Box<dyn RecordEncoder>,
}

impl TracerBuilder {
    /// Create a builder with default configuration and MsgPack encoding.
    pub fn new() -> Self {
        Self {
            config: TracerConfig::default(),
            encoder: Box::new(MsgPackEncoder),
        }
    }

    /// Set the per-request body byte cap.
    pub fn body_cap(mut self, cap: usize) -> Self {
        self.config.body_cap = cap;
        self
    }

    /// Set the delivery queue capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity.max(1);
        self
    }

    /// Use a custom record encoder.
    pub fn encoder<E: RecordEncoder + 'static>(mut self, encoder: E) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    /// Build the tracer.
    pub fn build(self) -> Tracer {
        Tracer {
            accumulator: Mutex::new(RequestAccumulator::new(self.config.body_cap)),
            hook: RwLock::new(None),
            channel: DeliveryChannel::new(self.config.queue_capacity, self.encoder),
            sent: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }
}

impl Default for TracerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The correlation engine.
///
/// Owns the request accumulator, the weak hook reference and the
/// sent/dropped counters; shares the delivery channel with whoever manages
/// peer connections.
pub struct Tracer {
    accumulator: Mutex<RequestAccumulator>,
    hook: RwLock<Option<Weak<dyn TraceHook>>>,
    channel: Arc<DeliveryChannel>,
    sent: AtomicU64,
    dropped: AtomicU64,
}

impl Tracer {
    /// Create a tracer builder.
    pub fn builder() -> TracerBuilder {
        TracerBuilder::new()
    }

    /// Create a tracer from a configuration, with MsgPack encoding.
    pub fn new(config: TracerConfig) -> Self {
        TracerBuilder {
            config,
            encoder: Box::new(MsgPackEncoder),
        }
        .build()
    }

    /// Feed one lifecycle event into the pipeline.
    ///
    /// Start and Response emit partial records; Data is accumulated
    /// silently; Finish emits the final record. Orphan events are ignored.
    /// Every emitted record ends up counted exactly once, as `sent` or
    /// `dropped`.
    pub fn record(&self, event: LifecycleEvent) {
        let key = event.key();
        let candidate = {
            let mut accumulator = self.accumulator.lock();
            match event {
                LifecycleEvent::Start {
                    target,
                    method,
                    headers,
                    body_prefix,
                    ..
                } => Some(accumulator.on_start(
                    key,
                    StartMeta {
                        target,
                        method,
                        headers,
                        body_prefix,
                    },
                )),
                LifecycleEvent::Response {
                    status, headers, ..
                } => accumulator.on_response(&key, ResponseMeta { status, headers }),
                LifecycleEvent::Data { bytes, .. } => {
                    accumulator.on_data(&key, &bytes);
                    None
                }
                LifecycleEvent::Finish { .. } => accumulator.on_finish(&key),
            }
        };

        let Some(record) = candidate else {
            return;
        };

        // Accumulator lock is released at this point; the hook is free to
        // re-enter record().
        let record = match self.apply_hook(record) {
            Some(record) => record,
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        match self.channel.enqueue(&record) {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                self.channel.flush();
            }
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    record_id = %record.record_id,
                    "failed to encode record, dropping: {}",
                    e
                );
            }
        }
    }

    /// Run the hook, if one is installed and still alive.
    fn apply_hook(&self, record: TraceRecord) -> Option<TraceRecord> {
        let hook = self.hook.read().as_ref().and_then(Weak::upgrade);
        match hook {
            Some(hook) => hook.will_send(record),
            None => Some(record),
        }
    }

    /// Install the extensibility hook.
    ///
    /// Held weakly: the tracer never extends the hook owner's lifetime, and
    /// a dropped hook behaves exactly like no hook (send-all).
    pub fn set_hook<H: TraceHook + 'static>(&self, hook: &Arc<H>) {
        let hook: Arc<dyn TraceHook> = hook.clone();
        let weak: Weak<dyn TraceHook> = Arc::downgrade(&hook);
        *self.hook.write() = Some(weak);
    }

    /// Remove the hook; subsequent records are sent unmodified.
    pub fn clear_hook(&self) {
        *self.hook.write() = None;
    }

    /// Attach a transport handle for delivery.
    pub fn attach(&self, transport: Arc<dyn Transport>) {
        self.channel.attach(transport);
    }

    /// Detach the current transport handle, keeping buffered frames.
    pub fn detach(&self) {
        self.channel.detach();
    }

    /// Records accepted by the delivery channel.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Records dropped by the hook or an encoding failure.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Snapshot of both counters.
    pub fn stats(&self) -> TracerStats {
        TracerStats {
            sent: self.sent(),
            dropped: self.dropped(),
        }
    }

    /// Requests currently tracked by the accumulator.
    ///
    /// A request whose finish never arrives stays here forever; watch this
    /// if the interception source is known to lose finish events.
    pub fn in_flight(&self) -> usize {
        self.accumulator.lock().in_flight()
    }

    /// The delivery channel, for callers that manage peers directly.
    pub fn channel(&self) -> &Arc<DeliveryChannel> {
        &self.channel
    }
}

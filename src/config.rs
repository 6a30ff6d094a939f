//! Tracer configuration.
//!
//! Two knobs bound the tracer's memory: the per-request body cap and the
//! delivery queue capacity. Both have conservative defaults; tune them via
//! [`TracerConfig`] or the setters on
//! [`TracerBuilder`](crate::TracerBuilder).

/// Default cap on accumulated body bytes per request (64 KiB).
pub const DEFAULT_BODY_CAP: usize = 64 * 1024;

/// Default delivery queue capacity (frames buffered while disconnected).
pub const DEFAULT_QUEUE_CAPACITY: usize = 512;

/// Configuration for the tracer pipeline.
#[derive(Debug, Clone)]
pub struct TracerConfig {
    /// Maximum bytes retained per request body (request prefix and response
    /// body each). Bytes past the cap are silently truncated, never an error.
    pub body_cap: usize,
    /// Maximum frames buffered by the delivery channel. When full, the
    /// oldest frame is evicted to make room (recency over completeness).
    pub queue_capacity: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            body_cap: DEFAULT_BODY_CAP,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl TracerConfig {
    /// Create a configuration with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the body cap.
    pub fn with_body_cap(mut self, cap: usize) -> Self {
        self.body_cap = cap;
        self
    }

    /// Set the delivery queue capacity.
    ///
    /// A capacity of zero is bumped to one; the channel always holds at
    /// least the most recent frame.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

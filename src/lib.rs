//! # tracewire
//!
//! In-process HTTP(S) traffic tracer: observes a stream of request
//! lifecycle events, reconstructs per-request records, and streams them to
//! a remote observer over an unreliable, intermittently-connected byte
//! stream.
//!
//! ## Architecture
//!
//! - **Correlation engine** ([`Tracer`]): single `record(event)` ingress;
//!   correlates interleaved events by request id (or target, as a
//!   fallback), emits partial records at start/response and a final record
//!   at finish, and runs an optional [`TraceHook`] that can rewrite or drop
//!   each record (and may re-enter the engine).
//! - **Delivery channel** ([`DeliveryChannel`]): bounded frame queue in
//!   front of whichever transport handle is currently attached; evicts
//!   oldest-first under backpressure, flushes on readiness transitions.
//! - **Frame codec** ([`protocol`]): 8-byte big-endian length-prefix
//!   framing with an incremental decoder that tolerates arbitrary stream
//!   fragmentation.
//!
//! Delivery is best-effort: every failure mode (hook drop, encoding
//! failure, queue overflow, transport loss) degrades completeness, never
//! aborts the pipeline.
//!
//! ## Example
//!
//! ```ignore
//! use tracewire::{LifecycleEvent, PeerIdentity, TcpTransport, Tracer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tracer = Tracer::builder().body_cap(64 * 1024).build();
//!
//!     // Peer discovery found an observer.
//!     let peer = PeerIdentity::new("observer-1", "_wiretap._tcp", "local");
//!     let transport = TcpTransport::connect("127.0.0.1:9000", peer).await?;
//!     tracer.attach(Arc::new(transport));
//!
//!     // The interception source feeds events from any thread.
//!     tracer.record(LifecycleEvent::Start {
//!         request_id: Some("req-1".into()),
//!         target: "https://api.example.com/v1".into(),
//!         method: "GET".into(),
//!         headers: Default::default(),
//!         body_prefix: None,
//!     });
//!     Ok(())
//! }
//! ```

pub mod accumulator;
pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod record;
pub mod transport;

mod engine;

pub use channel::{ChannelStats, DeliveryChannel};
pub use config::TracerConfig;
pub use engine::{TraceHook, Tracer, TracerBuilder, TracerStats};
pub use error::TracewireError;
pub use record::{CorrelationKey, LifecycleEvent, TraceRecord};
pub use transport::{PeerIdentity, TcpTransport, Transport};

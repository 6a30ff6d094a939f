//! Transport module - the seam between the delivery channel and the wire.
//!
//! The delivery channel does not know what carries its frames; it only needs
//! a readiness-reporting, send-capable handle. Peer discovery hands such
//! handles to [`DeliveryChannel::attach`](crate::DeliveryChannel::attach),
//! identified by a [`PeerIdentity`] so reconnects to the same observer can
//! be deduplicated.
//!
//! [`TcpTransport`] is the production implementation; tests substitute
//! in-memory mocks.

mod tcp;

pub use tcp::TcpTransport;

use std::fmt;

use bytes::Bytes;

/// Callback invoked when a transport transitions to ready.
pub type ReadyCallback = Box<dyn Fn() + Send + Sync>;

/// A send-capable, readiness-reporting handle to one observer connection.
///
/// `send` is fire-and-forget: the transport does not report completion and
/// the caller does not retry. A handle that fails stays not-ready; recovery
/// is a new handle attached after `detach`.
pub trait Transport: Send + Sync {
    /// Identity of the peer this handle is connected to.
    fn peer(&self) -> &PeerIdentity;

    /// Whether the handle can currently accept frames.
    fn is_ready(&self) -> bool;

    /// Hand a frame to the transport. Fire-and-forget; never blocks.
    fn send(&self, frame: Bytes);

    /// Register the callback fired on not-ready to ready transitions.
    ///
    /// Implementations hold at most one callback; registering replaces any
    /// previous one. The callback may be invoked from the transport's own
    /// task and must not assume the registering thread.
    fn on_ready(&self, callback: ReadyCallback);
}

/// Identity of an observer peer.
///
/// Discovery announces peers as a (name, service, domain) triple; collapsed
/// here into one comparable value so duplicate-connection suppression is a
/// plain equality check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerIdentity {
    /// Instance name (e.g. the observer's host name).
    pub name: String,
    /// Service type.
    pub service: String,
    /// Discovery domain.
    pub domain: String,
}

impl PeerIdentity {
    /// Create a peer identity from its discovery triple.
    pub fn new(
        name: impl Into<String>,
        service: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            service: service.into(),
            domain: domain.into(),
        }
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.name, self.service, self.domain)
    }
}

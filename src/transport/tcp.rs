//! TCP transport with a dedicated writer task.
//!
//! Frames are handed to the transport via a bounded mpsc channel and written
//! to the socket by a single spawned task. This keeps `send` synchronous and
//! non-blocking for the caller: a full channel drops the frame (best-effort
//! delivery), a closed socket marks the handle not-ready for good.
//!
//! # Architecture
//!
//! ```text
//! DeliveryChannel ──► mpsc::Sender<Bytes> ──► Writer Task ──► TcpStream
//! ```
//!
//! Readiness is "connected and the send queue is not saturated". When the
//! writer drains a saturated queue the registered ready callback fires,
//! which is what re-triggers a flush on the delivery channel without
//! polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;

use crate::error::Result;

use super::{PeerIdentity, ReadyCallback, Transport};

/// Default capacity of the frame queue feeding the writer task.
pub const DEFAULT_SEND_QUEUE: usize = 1024;

/// Shared state between the handle and its writer task.
struct Shared {
    /// False once the socket has failed or closed.
    connected: AtomicBool,
    /// True while the send queue is full; cleared by the writer.
    saturated: AtomicBool,
    /// Ready callback, registered by the delivery channel.
    on_ready: Mutex<Option<ReadyCallback>>,
}

/// A [`Transport`] backed by a TCP connection (or any `AsyncWrite`).
pub struct TcpTransport {
    peer: PeerIdentity,
    tx: mpsc::Sender<Bytes>,
    shared: Arc<Shared>,
}

impl TcpTransport {
    /// Connect to an observer and spawn the writer task.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn connect(addr: impl ToSocketAddrs, peer: PeerIdentity) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::from_writer(stream, peer))
    }

    /// Build a transport over an already-connected writer.
    ///
    /// Useful for tests (`tokio::io::duplex`) and for non-TCP byte streams.
    pub fn from_writer<W>(writer: W, peer: PeerIdentity) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self::from_writer_with_capacity(writer, peer, DEFAULT_SEND_QUEUE)
    }

    /// Build a transport with a custom send queue capacity.
    pub fn from_writer_with_capacity<W>(writer: W, peer: PeerIdentity, capacity: usize) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let shared = Arc::new(Shared {
            connected: AtomicBool::new(true),
            saturated: AtomicBool::new(false),
            on_ready: Mutex::new(None),
        });

        tokio::spawn(writer_loop(rx, writer, shared.clone()));

        Self { peer, tx, shared }
    }
}

impl Transport for TcpTransport {
    fn peer(&self) -> &PeerIdentity {
        &self.peer
    }

    fn is_ready(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
            && !self.shared.saturated.load(Ordering::Acquire)
    }

    fn send(&self, frame: Bytes) {
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.shared.saturated.store(true, Ordering::Release);
                tracing::warn!(peer = %self.peer, "send queue full, dropping frame");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.shared.connected.store(false, Ordering::Release);
                tracing::warn!(peer = %self.peer, "transport closed, dropping frame");
            }
        }
    }

    fn on_ready(&self, callback: ReadyCallback) {
        *self.shared.on_ready.lock() = Some(callback);
    }
}

/// Writer loop: drains the frame queue into the socket.
///
/// On write failure the transport is marked disconnected and the loop ends;
/// queued frames are discarded (best-effort delivery, never retried here).
async fn writer_loop<W>(mut rx: mpsc::Receiver<Bytes>, mut writer: W, shared: Arc<Shared>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        if let Err(e) = writer.write_all(&frame).await {
            tracing::warn!("transport write failed: {}", e);
            break;
        }
        if let Err(e) = writer.flush().await {
            tracing::warn!("transport flush failed: {}", e);
            break;
        }

        // A drained queue after saturation is a readiness transition.
        if shared.saturated.swap(false, Ordering::AcqRel) {
            if let Some(callback) = shared.on_ready.lock().as_ref() {
                callback();
            }
        }
    }

    shared.connected.store(false, Ordering::Release);
    rx.close();
}

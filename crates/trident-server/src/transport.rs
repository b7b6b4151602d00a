//! Byte-stream transports to a single remote peer.
//!
//! A [`Transport`] is owned by exactly one [`Connection`](crate::Connection),
//! which is the only writer. Writes never block the caller: the TCP
//! transport hands frames to a writer task that writes and flushes them in
//! order.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, ServerError};

/// Write side of a connection to one peer.
pub trait Transport: Send + Sync + 'static {
    /// The peer's address.
    fn remote_address(&self) -> SocketAddr;

    /// Queue a complete frame for writing and flushing.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::TransportClosed`] if the transport was closed.
    fn write(&self, frame: Bytes) -> Result<()>;

    /// Close the transport. Frames queued before the call are still flushed.
    fn close(&self);

    /// Whether [`Transport::close`] has been called or the peer went away.
    fn is_closed(&self) -> bool;
}

/// TCP transport backed by a writer task.
pub struct TcpTransport {
    addr: SocketAddr,
    tx: mpsc::UnboundedSender<Bytes>,
    closed: CancellationToken,
}

impl TcpTransport {
    /// Spawn the writer task for `writer` on the current Tokio runtime.
    #[must_use]
    pub fn spawn(writer: OwnedWriteHalf, addr: SocketAddr) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = CancellationToken::new();

        tokio::spawn(write_loop(writer, rx, closed.clone()));

        Self { addr, tx, closed }
    }

    /// Resolves once the transport has been closed.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }
}

impl Transport for TcpTransport {
    fn remote_address(&self) -> SocketAddr {
        self.addr
    }

    fn write(&self, frame: Bytes) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(ServerError::TransportClosed);
        }
        self.tx.send(frame).map_err(|_| ServerError::TransportClosed)
    }

    fn close(&self) {
        self.closed.cancel();
    }

    fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Bytes>,
    closed: CancellationToken,
) {
    loop {
        // Queued frames win over the close signal so nothing sent before
        // close() is dropped.
        let frame = tokio::select! {
            biased;
            frame = rx.recv() => frame,
            () = closed.cancelled() => None,
        };

        let Some(frame) = frame else {
            break;
        };

        let written = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = written {
            debug!("Write failed: {e}");
            break;
        }
    }

    closed.cancel();
    let _ = writer.shutdown().await;
}

/// In-memory transport that records every frame written to it.
///
/// Used by tests and by collaborators that drive connections without a socket.
#[derive(Debug)]
pub struct MemoryTransport {
    addr: SocketAddr,
    frames: Mutex<Vec<Bytes>>,
    closed: AtomicBool,
}

impl MemoryTransport {
    /// Create an open transport for `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            frames: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Frames written so far, in order.
    pub fn frames(&self) -> Vec<Bytes> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Transport for MemoryTransport {
    fn remote_address(&self) -> SocketAddr {
        self.addr
    }

    fn write(&self, frame: Bytes) -> Result<()> {
        if self.is_closed() {
            return Err(ServerError::TransportClosed);
        }
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    #[test]
    fn test_memory_transport_records_until_closed() {
        let transport = MemoryTransport::new("127.0.0.1:1".parse().unwrap());

        transport.write(Bytes::from_static(b"one")).unwrap();
        transport.write(Bytes::from_static(b"two")).unwrap();
        transport.close();

        assert!(transport.is_closed());
        assert!(matches!(
            transport.write(Bytes::from_static(b"three")),
            Err(ServerError::TransportClosed)
        ));
        assert_eq!(
            transport.frames(),
            vec![Bytes::from_static(b"one"), Bytes::from_static(b"two")]
        );
    }

    #[tokio::test]
    async fn test_tcp_transport_flushes_before_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let (server_side, peer) = listener.accept().await.unwrap();
        let (_reader, writer) = server_side.into_split();

        let transport = TcpTransport::spawn(writer, peer);
        transport.write(Bytes::from_static(b"hello ")).unwrap();
        transport.write(Bytes::from_static(b"world")).unwrap();
        transport.close();
        transport.closed().await;

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"hello world");

        assert!(matches!(
            transport.write(Bytes::from_static(b"late")),
            Err(ServerError::TransportClosed)
        ));
    }
}

//! TCP accept loop and per-connection read loop.
//!
//! Reader tasks decode frames against the connection's current stage and
//! hand every packet to the server thread. They never mutate connection
//! state themselves.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::{Instrument, debug, error, info, info_span, warn};
use trident_protocol::ProtocolError;
use trident_protocol::codec::read_packet;

use crate::server::Server;
use crate::transport::TcpTransport;

/// Accept connections on `listener` until `shutdown` resolves.
///
/// Connections that are already open keep running; they end when their
/// peer disconnects or the server logs them out.
pub async fn serve<F>(server: Arc<Server>, listener: TcpListener, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let server = Arc::clone(&server);
                    tokio::spawn(async move {
                        handle_connection(server, stream, addr).await;
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {e}");
                }
            },
        }
    }

    info!("Stopped accepting connections");
}

/// Drive a single client connection until it closes.
async fn handle_connection(server: Arc<Server>, stream: TcpStream, addr: SocketAddr) {
    async {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {e}");
        }

        let (mut reader, writer) = stream.into_split();
        let transport = Arc::new(TcpTransport::spawn(writer, addr));

        let Ok(connection) = server.connections().register(transport.clone()) else {
            return;
        };
        debug!("Connection opened");

        loop {
            let read = tokio::select! {
                read = read_packet(&mut reader) => read,
                () = transport.closed() => break,
            };

            let raw = match read {
                Ok(raw) => raw,
                Err(ProtocolError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    debug!("Client disconnected");
                    break;
                }
                Err(e) => {
                    warn!("Failed to read packet: {e}");
                    break;
                }
            };

            let stage = connection.stage();
            let packet = match server.protocol().decode(stage, raw) {
                Ok(packet) => packet,
                Err(e) if e.is_unknown_packet() => {
                    debug!("Ignoring packet: {e}");
                    continue;
                }
                Err(e) => {
                    warn!(?stage, "Dropping malformed packet: {e}");
                    break;
                }
            };

            debug!(packet = packet.as_packet().name(), ?stage, "Received packet");

            let changes_stage = packet.changes_stage();
            let handled = match server.dispatch(Arc::clone(&connection), packet) {
                Ok(handled) => handled,
                Err(e) => {
                    debug!("Dispatch failed: {e}");
                    break;
                }
            };

            if changes_stage {
                // The next frame must be decoded against the new stage.
                let _ = handled.await;
            }
        }

        server.disconnect(connection);
        debug!("Connection closed");
    }
    .instrument(info_span!("conn", ip = %addr.ip(), port = addr.port()))
    .await;
}

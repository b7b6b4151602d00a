//! The server: protocol table, connection registry and task queue.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info};
use trident_protocol::{InboundPacket, Protocol};

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::Result;
use crate::handler;
use crate::registry::ConnectionRegistry;
use crate::tasks::{TaskQueue, TaskResult};

/// Name of the thread that executes server tasks.
pub const SERVER_THREAD_NAME: &str = "trident-server";

/// Owns everything the network layer and handlers share.
///
/// Handlers run as tasks on the server thread, so anything they touch
/// through the server is only mutated from that one thread.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    protocol: Protocol,
    connections: ConnectionRegistry,
    tasks: TaskQueue,
}

impl Server {
    /// Start a server with the standard protocol table.
    ///
    /// # Errors
    ///
    /// Returns an error if the server thread cannot be spawned.
    pub fn start(config: ServerConfig) -> Result<Arc<Self>> {
        Self::start_with_protocol(config, Protocol::new())
    }

    /// Start a server with a custom protocol table.
    ///
    /// # Errors
    ///
    /// Returns an error if the server thread cannot be spawned.
    pub fn start_with_protocol(config: ServerConfig, protocol: Protocol) -> Result<Arc<Self>> {
        let tasks = TaskQueue::start(SERVER_THREAD_NAME)?;

        info!(
            max_players = config.max_players,
            wire_format = ?config.wire_format,
            "Server started"
        );

        Ok(Arc::new(Self {
            connections: ConnectionRegistry::new(config.wire_format),
            config,
            protocol,
            tasks,
        }))
    }

    /// The configuration the server was started with.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The packet table used to decode inbound packets.
    #[must_use]
    pub const fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// The live connections.
    #[must_use]
    pub const fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Schedule `task` on the server thread.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ShutDown`](crate::ServerError::ShutDown) after
    /// shutdown was requested.
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        self.tasks.submit(task)
    }

    /// Schedule handling of `packet` for `connection`.
    ///
    /// The returned receiver resolves once the handler has finished (or
    /// was dropped without running). The network layer waits on it after
    /// stage-changing packets so the next packet is decoded against the
    /// new stage.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ShutDown`](crate::ServerError::ShutDown) after
    /// shutdown was requested.
    pub fn dispatch(
        self: &Arc<Self>,
        connection: Arc<Connection>,
        packet: InboundPacket,
    ) -> Result<oneshot::Receiver<()>> {
        let (done_tx, done_rx) = oneshot::channel();
        let server = Arc::clone(self);

        self.submit(move || {
            let result = handler::handle(&server, &connection, packet);
            let _ = done_tx.send(());
            result
        })?;

        Ok(done_rx)
    }

    /// Log `connection` out on the server thread.
    ///
    /// Falls back to logging out directly once the server thread no longer
    /// accepts work.
    pub fn disconnect(self: &Arc<Self>, connection: Arc<Connection>) {
        let server = Arc::clone(self);
        let task_connection = Arc::clone(&connection);

        let queued = self.submit(move || {
            server.connections.logout(&task_connection);
            Ok(())
        });

        if queued.is_err() {
            self.connections.logout(&connection);
        }
        debug!(addr = %connection.address(), "Disconnect requested");
    }

    /// Request shutdown of the server thread. Already queued tasks still run.
    pub fn shutdown(&self) {
        info!("Shutting down");
        self.tasks.shutdown();
    }

    /// Wait for the server thread to exit.
    pub fn join(&self) {
        self.tasks.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use crate::transport::{MemoryTransport, Transport};
    use bytes::Bytes;
    use std::sync::mpsc;
    use std::time::Duration;
    use trident_protocol::ConnectionStage;

    const HANDSHAKE_TO_STATUS: &[u8] = &[
        0x00, 0x00, 0x09, b'l', b'o', b'c', b'a', b'l', b'h', b'o', b's', b't', 0x63, 0xdd, 0x01,
    ];

    #[tokio::test]
    async fn test_dispatch_runs_handler_and_signals() {
        let server = Server::start(ServerConfig::default()).unwrap();
        let transport = Arc::new(MemoryTransport::new("127.0.0.1:40000".parse().unwrap()));
        let connection = server.connections().register(transport).unwrap();

        let packet = server
            .protocol()
            .decode_bytes(connection.stage(), Bytes::from_static(HANDSHAKE_TO_STATUS))
            .unwrap();
        server
            .dispatch(Arc::clone(&connection), packet)
            .unwrap()
            .await
            .unwrap();

        assert_eq!(connection.stage(), ConnectionStage::Status);

        server.shutdown();
        server.join();
    }

    #[test]
    fn test_submit_runs_on_server_thread() {
        let server = Server::start(ServerConfig::default()).unwrap();
        let (tx, rx) = mpsc::channel();

        server
            .submit(move || {
                tx.send(std::thread::current().name().map(str::to_owned))?;
                Ok(())
            })
            .unwrap();

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some(SERVER_THREAD_NAME));

        server.shutdown();
        server.join();
    }

    #[test]
    fn test_disconnect_logs_out() {
        let server = Server::start(ServerConfig::default()).unwrap();
        let transport = Arc::new(MemoryTransport::new("127.0.0.1:40001".parse().unwrap()));
        let connection = server.connections().register(transport.clone()).unwrap();

        server.disconnect(Arc::clone(&connection));
        server.shutdown();
        server.join();

        assert!(transport.is_closed());
        assert!(!server.connections().is_logged_in(&connection.address()));
    }

    #[test]
    fn test_disconnect_after_shutdown_still_logs_out() {
        let server = Server::start(ServerConfig::default()).unwrap();
        let transport = Arc::new(MemoryTransport::new("127.0.0.1:40002".parse().unwrap()));
        let connection = server.connections().register(transport.clone()).unwrap();

        server.shutdown();
        server.join();
        server.disconnect(Arc::clone(&connection));

        assert!(transport.is_closed());
        assert!(server.connections().is_empty());
    }

    #[test]
    fn test_dispatch_after_shutdown_fails() {
        let server = Server::start(ServerConfig::default()).unwrap();
        let transport = Arc::new(MemoryTransport::new("127.0.0.1:40003".parse().unwrap()));
        let connection = server.connections().register(transport).unwrap();
        let packet = server
            .protocol()
            .decode_bytes(connection.stage(), Bytes::from_static(HANDSHAKE_TO_STATUS))
            .unwrap();

        server.shutdown();

        assert!(matches!(
            server.dispatch(connection, packet),
            Err(ServerError::ShutDown)
        ));
        server.join();
    }
}

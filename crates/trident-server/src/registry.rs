//! Registry of live connections, keyed by remote address.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};
use trident_protocol::{ConnectionStage, WireFormat};

use crate::connection::Connection;
use crate::error::{Result, ServerError};
use crate::transport::Transport;

/// Concurrent map of every live [`Connection`].
///
/// Membership only changes through [`ConnectionRegistry::register`] and
/// [`ConnectionRegistry::logout`], and each is atomic per address. There is
/// no transaction across calls: checking [`ConnectionRegistry::is_logged_in`]
/// before registering is racy, so `register` itself reports duplicates.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<SocketAddr, Arc<Connection>>,
    wire_format: WireFormat,
}

impl ConnectionRegistry {
    /// Create an empty registry whose connections send in `wire_format`.
    #[must_use]
    pub fn new(wire_format: WireFormat) -> Self {
        Self {
            connections: DashMap::new(),
            wire_format,
        }
    }

    /// Register a new connection for `transport`.
    ///
    /// The first registration for an address wins. A later registration for
    /// the same live address is rejected and its transport is closed; the
    /// existing connection is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AlreadyRegistered`] if a live connection
    /// already exists for the transport's remote address.
    pub fn register(&self, transport: Arc<dyn Transport>) -> Result<Arc<Connection>> {
        let addr = transport.remote_address();

        let inserted = match self.connections.entry(addr) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                let connection =
                    Arc::new(Connection::new(Arc::clone(&transport), self.wire_format));
                entry.insert(Arc::clone(&connection));
                Some(connection)
            }
        };

        // The shard lock is released before touching the rejected transport.
        let Some(connection) = inserted else {
            warn!(%addr, "Rejected duplicate connection");
            transport.close();
            return Err(ServerError::AlreadyRegistered(addr));
        };

        debug!(%addr, "Registered connection");
        Ok(connection)
    }

    /// Look up the connection for `addr`.
    #[must_use]
    pub fn get(&self, addr: &SocketAddr) -> Option<Arc<Connection>> {
        self.connections.get(addr).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether a connection is registered for `addr`.
    #[must_use]
    pub fn is_logged_in(&self, addr: &SocketAddr) -> bool {
        self.connections.contains_key(addr)
    }

    /// Remove `connection` from the registry and close its transport.
    ///
    /// Only removes the entry if it still refers to this exact connection.
    /// Returns `false` if there was nothing to remove, so a second logout is
    /// a no-op. Concurrent logouts of the same connection should still be
    /// serialized by the caller, typically by running them as server tasks.
    pub fn logout(&self, connection: &Connection) -> bool {
        let addr = connection.address();
        let removed = self
            .connections
            .remove_if(&addr, |_, current| std::ptr::eq(current.as_ref(), connection))
            .is_some();

        connection.close();

        if removed {
            debug!(%addr, "Logged out connection");
        }
        removed
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether there are no live connections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Number of live connections currently in `stage`.
    #[must_use]
    pub fn count_in_stage(&self, stage: ConnectionStage) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.value().stage() == stage)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn transport(addr: &str) -> Arc<MemoryTransport> {
        Arc::new(MemoryTransport::new(addr.parse().unwrap()))
    }

    #[test]
    fn test_register_and_get() {
        let registry = ConnectionRegistry::default();
        let addr: SocketAddr = "10.0.0.1:40000".parse().unwrap();

        let connection = registry.register(transport("10.0.0.1:40000")).unwrap();

        assert_eq!(connection.stage(), ConnectionStage::Handshake);
        assert!(!connection.is_encryption_enabled());
        assert!(registry.is_logged_in(&addr));
        assert!(Arc::ptr_eq(&registry.get(&addr).unwrap(), &connection));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_unknown_address() {
        let registry = ConnectionRegistry::default();
        let addr: SocketAddr = "10.0.0.1:40000".parse().unwrap();

        assert!(registry.get(&addr).is_none());
        assert!(!registry.is_logged_in(&addr));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_is_rejected_and_closed() {
        let registry = ConnectionRegistry::default();
        let first = transport("10.0.0.1:40000");
        let second = transport("10.0.0.1:40000");

        let existing = registry.register(first.clone()).unwrap();
        let result = registry.register(second.clone());

        assert!(matches!(result, Err(ServerError::AlreadyRegistered(_))));
        assert!(second.is_closed());
        assert!(!first.is_closed());
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(
            &registry.get(&existing.address()).unwrap(),
            &existing
        ));
    }

    #[test]
    fn test_logout_is_idempotent() {
        let registry = ConnectionRegistry::default();
        let transport = transport("10.0.0.1:40000");
        let connection = registry.register(transport.clone()).unwrap();

        assert!(registry.logout(&connection));
        assert!(transport.is_closed());
        assert!(!registry.is_logged_in(&connection.address()));

        assert!(!registry.logout(&connection));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_address_reusable_after_logout() {
        let registry = ConnectionRegistry::default();
        let old = registry.register(transport("10.0.0.1:40000")).unwrap();
        registry.logout(&old);

        let new = registry.register(transport("10.0.0.1:40000")).unwrap();

        // A stale logout must not evict the replacement.
        assert!(!registry.logout(&old));
        assert!(Arc::ptr_eq(&registry.get(&new.address()).unwrap(), &new));
    }

    #[test]
    fn test_count_in_stage() {
        let registry = ConnectionRegistry::default();
        let a = registry.register(transport("10.0.0.1:1")).unwrap();
        let b = registry.register(transport("10.0.0.1:2")).unwrap();
        registry.register(transport("10.0.0.1:3")).unwrap();

        a.set_stage(ConnectionStage::Login).unwrap();
        a.set_stage(ConnectionStage::Play).unwrap();
        b.set_stage(ConnectionStage::Status).unwrap();

        assert_eq!(registry.count_in_stage(ConnectionStage::Play), 1);
        assert_eq!(registry.count_in_stage(ConnectionStage::Status), 1);
        assert_eq!(registry.count_in_stage(ConnectionStage::Handshake), 1);
        assert_eq!(registry.count_in_stage(ConnectionStage::Login), 0);
    }
}

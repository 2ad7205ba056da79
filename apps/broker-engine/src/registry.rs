//! Canonical in-memory connection registry.
//!
//! Holds at most one [`BrokerConnection`] per [`BrokerType`]. Absence is
//! signaled through boolean returns or `None`; no operation errors on a
//! missing key. Readers only ever see deep snapshots, never live state.

use std::collections::BTreeMap;

use crate::domain::connection::{BrokerConnection, BrokerType};

/// Registry of broker connections, keyed by provider identity.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: BTreeMap<BrokerType, BrokerConnection>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the given connections.
    ///
    /// Later duplicates for the same provider are ignored.
    #[must_use]
    pub fn seeded(connections: Vec<BrokerConnection>) -> Self {
        let mut registry = Self::new();
        for connection in connections {
            registry.add(connection);
        }
        registry
    }

    /// Whether a connection exists for the given provider.
    #[must_use]
    pub fn contains(&self, broker: BrokerType) -> bool {
        self.connections.contains_key(&broker)
    }

    /// Register a connection.
    ///
    /// Returns `false` without mutation if the provider is already
    /// registered.
    pub fn add(&mut self, connection: BrokerConnection) -> bool {
        if self.connections.contains_key(&connection.broker) {
            return false;
        }
        self.connections.insert(connection.broker, connection);
        true
    }

    /// Remove the connection for a provider.
    ///
    /// Returns `false` if no such connection existed.
    pub fn remove(&mut self, broker: BrokerType) -> bool {
        self.connections.remove(&broker).is_some()
    }

    /// Get a copy of the connection for a provider, if registered.
    #[must_use]
    pub fn get(&self, broker: BrokerType) -> Option<BrokerConnection> {
        self.connections.get(&broker).cloned()
    }

    /// Atomically install a connection, discarding any prior record for the
    /// same provider.
    ///
    /// Used by the authoritative probe to supersede simulated state.
    pub fn replace(&mut self, connection: BrokerConnection) {
        self.connections.insert(connection.broker, connection);
    }

    /// Deep, independent copy of all connections.
    #[must_use]
    pub fn snapshot(&self) -> Vec<BrokerConnection> {
        self.connections.values().cloned().collect()
    }

    /// Apply a mutation to every registered connection.
    pub fn update_all(&mut self, mut mutate: impl FnMut(&mut BrokerConnection)) {
        for connection in self.connections.values_mut() {
            mutate(connection);
        }
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Remove all connections.
    pub fn clear(&mut self) {
        self.connections.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::connection::ConnectionStatus;

    fn connection(broker: BrokerType) -> BrokerConnection {
        BrokerConnection::connected(broker, 45.0, 0.99)
    }

    #[test]
    fn add_rejects_duplicate_provider() {
        let mut registry = ConnectionRegistry::new();

        assert!(registry.add(connection(BrokerType::Zerodha)));
        assert!(!registry.add(connection(BrokerType::Zerodha)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_add_leaves_existing_telemetry_untouched() {
        let mut registry = ConnectionRegistry::new();

        let mut first = connection(BrokerType::Fyers);
        first.data_points_received = 1234;
        registry.add(first);

        registry.add(connection(BrokerType::Fyers));

        let stored = registry.get(BrokerType::Fyers).unwrap();
        assert_eq!(stored.data_points_received, 1234);
    }

    #[test]
    fn remove_absent_returns_false() {
        let mut registry = ConnectionRegistry::new();
        assert!(!registry.remove(BrokerType::Upstox));

        registry.add(connection(BrokerType::Upstox));
        assert!(registry.remove(BrokerType::Upstox));
        assert!(!registry.remove(BrokerType::Upstox));
    }

    #[test]
    fn get_absent_is_none() {
        let registry = ConnectionRegistry::new();
        assert!(registry.get(BrokerType::Kotak).is_none());
    }

    #[test]
    fn replace_supersedes_existing_record() {
        let mut registry = ConnectionRegistry::new();

        let mut simulated = connection(BrokerType::Fyers);
        simulated.status = ConnectionStatus::Reconnecting;
        simulated.data_points_received = 500;
        registry.add(simulated);

        let mut authoritative = connection(BrokerType::Fyers);
        authoritative.data_points_received = 9_000;
        registry.replace(authoritative.clone());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(BrokerType::Fyers).unwrap(), authoritative);
    }

    #[test]
    fn replace_on_empty_registry_inserts() {
        let mut registry = ConnectionRegistry::new();
        registry.replace(connection(BrokerType::Hdfc));
        assert!(registry.contains(BrokerType::Hdfc));
    }

    #[test]
    fn snapshot_is_independent_of_later_mutation() {
        let mut registry = ConnectionRegistry::new();
        registry.add(connection(BrokerType::Zerodha));

        let snapshot = registry.snapshot();
        registry.update_all(|c| c.data_points_received += 100);

        assert_eq!(snapshot[0].data_points_received, 0);
        assert_eq!(
            registry.get(BrokerType::Zerodha).unwrap().data_points_received,
            100
        );
    }

    #[test]
    fn seeded_ignores_duplicate_providers() {
        let registry = ConnectionRegistry::seeded(vec![
            connection(BrokerType::Zerodha),
            connection(BrokerType::AngelOne),
            connection(BrokerType::Zerodha),
        ]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn clear_empties_registry() {
        let mut registry = ConnectionRegistry::seeded(vec![
            connection(BrokerType::Zerodha),
            connection(BrokerType::AngelOne),
        ]);

        registry.clear();

        assert!(registry.is_empty());
        assert!(registry.snapshot().is_empty());
    }
}

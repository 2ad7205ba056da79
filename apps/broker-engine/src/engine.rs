//! Broker connection engine.
//!
//! Owns the registry, runs the simulation and probe as independent
//! periodic tasks, and fans out snapshots through the subscriber hub.
//!
//! # Architecture
//!
//! ```text
//! BrokerEngine
//!     │
//!     ├── simulation task (tick_interval) ──► registry tick ──► notify
//!     ├── probe task (probe_interval) ──► AuthoritativeSource::fetch
//!     │                                        │ success
//!     │                                        ▼
//!     │                                   registry replace ──► notify
//!     └── add/remove/get/metrics ──────► registry (on demand)
//! ```
//!
//! All registry mutation happens under one lock; each batch commits fully
//! and snapshots before subscribers run, so observers never see a
//! partially updated registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::dispatch::{SubscriberHub, Subscription};
use crate::domain::connection::{BrokerConnection, BrokerType};
use crate::domain::metrics::BrokerMetrics;
use crate::probe::{AuthoritativeSource, HttpProbe};
use crate::registry::ConnectionRegistry;
use crate::simulator::{self, RandomSource, ThreadRandom};

/// State shared between the engine handle and its background tasks.
struct Shared {
    registry: Mutex<ConnectionRegistry>,
    subscribers: Arc<SubscriberHub>,
    rng: Mutex<Box<dyn RandomSource>>,
    shutdown: CancellationToken,
}

impl Shared {
    /// Run one simulation tick: mutate every connection, then notify with
    /// the committed snapshot. Returns `false` once shutdown has begun.
    fn tick(&self) -> bool {
        let snapshot = {
            let mut registry = self.registry.lock();
            let mut rng = self.rng.lock();
            registry.update_all(|connection| simulator::advance(connection, rng.as_mut()));
            registry.snapshot()
        };

        // A tick that races teardown is discarded rather than partially
        // notified.
        if self.shutdown.is_cancelled() {
            return false;
        }

        tracing::trace!(connections = snapshot.len(), "simulation tick committed");
        self.subscribers.notify(&snapshot);
        true
    }

    /// Install an authoritative record and notify with the new snapshot.
    fn reconcile(&self, record: BrokerConnection) {
        let broker = record.broker;
        let snapshot = {
            let mut registry = self.registry.lock();
            registry.replace(record);
            registry.snapshot()
        };

        if self.shutdown.is_cancelled() {
            return;
        }

        tracing::debug!(%broker, "authoritative record installed");
        self.subscribers.notify(&snapshot);
    }
}

/// Broker connection state and real-time metrics engine.
///
/// An explicit instance with its own lifecycle; independent engines never
/// share state, so tests can run several side by side.
pub struct BrokerEngine {
    shared: Arc<Shared>,
    config: EngineConfig,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl BrokerEngine {
    /// Create an engine seeded from `config`, using thread-local
    /// randomness for the simulation.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_random(config, Box::new(ThreadRandom))
    }

    /// Create an engine with an injected random source.
    #[must_use]
    pub fn with_random(config: EngineConfig, rng: Box<dyn RandomSource>) -> Self {
        let registry = ConnectionRegistry::seeded(config.seed.clone());
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(registry),
                subscribers: Arc::new(SubscriberHub::new()),
                rng: Mutex::new(rng),
                shutdown: CancellationToken::new(),
            }),
            config,
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start the periodic simulation and, when configured, the
    /// authoritative probe. Calling `start` again is a no-op.
    pub fn start(&self) {
        let source = self.config.probe.as_ref().and_then(|probe_config| {
            match HttpProbe::new(probe_config) {
                Ok(probe) => Some(Arc::new(probe) as Arc<dyn AuthoritativeSource>),
                Err(e) => {
                    tracing::warn!(error = %e, "probe disabled");
                    None
                }
            }
        });
        self.start_with_source(source);
    }

    /// Start with an explicit authoritative source (or none).
    pub fn start_with_source(&self, source: Option<Arc<dyn AuthoritativeSource>>) {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::warn!("engine already started");
            return;
        }

        tracing::info!(
            tick_ms = self.config.tick_interval_ms,
            probe_ms = self.config.probe_interval_ms,
            probe_enabled = source.is_some(),
            connections = self.shared.registry.lock().len(),
            "broker engine started"
        );

        let mut tasks = self.tasks.lock();
        tasks.push(self.spawn_simulation());
        if let Some(source) = source {
            tasks.push(self.spawn_probe(source));
        }
    }

    fn spawn_simulation(&self) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let period = self.config.tick_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately;
            // consume it so mutation starts one full period in.
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = shared.shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if !shared.tick() {
                            break;
                        }
                    }
                }
            }
        })
    }

    fn spawn_probe(&self, source: Arc<dyn AuthoritativeSource>) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let period = self.config.probe_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = shared.shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let result = tokio::select! {
                            () = shared.shutdown.cancelled() => break,
                            result = source.fetch() => result,
                        };
                        match result {
                            Ok(Some(record)) => shared.reconcile(record),
                            Ok(None) => tracing::trace!("probe reported no live session"),
                            Err(e) => tracing::debug!(error = %e, "probe attempt abandoned"),
                        }
                    }
                }
            }
        })
    }

    /// Register a connection for a provider with fresh startup telemetry.
    ///
    /// Returns `false` without mutation when the provider is already
    /// registered. On success, subscribers are notified with the new
    /// snapshot.
    pub fn add_broker(&self, broker: BrokerType) -> bool {
        let snapshot = {
            let mut registry = self.shared.registry.lock();
            if registry.contains(broker) {
                return false;
            }
            let mut rng = self.shared.rng.lock();
            registry.add(simulator::establish(broker, rng.as_mut()));
            registry.snapshot()
        };

        tracing::info!(%broker, "broker connected");
        self.shared.subscribers.notify(&snapshot);
        true
    }

    /// Remove a provider's connection.
    ///
    /// Returns `false` if absent. On success, subscribers are notified
    /// with the snapshot reflecting the removal.
    pub fn remove_broker(&self, broker: BrokerType) -> bool {
        let snapshot = {
            let mut registry = self.shared.registry.lock();
            if !registry.remove(broker) {
                return false;
            }
            registry.snapshot()
        };

        tracing::info!(%broker, "broker removed");
        self.shared.subscribers.notify(&snapshot);
        true
    }

    /// Copy of a single provider's connection, if registered.
    #[must_use]
    pub fn get_broker(&self, broker: BrokerType) -> Option<BrokerConnection> {
        self.shared.registry.lock().get(broker)
    }

    /// Deep snapshot of all registered connections.
    #[must_use]
    pub fn connected_brokers(&self) -> Vec<BrokerConnection> {
        self.shared.registry.lock().snapshot()
    }

    /// Portfolio metrics computed from a fresh snapshot.
    #[must_use]
    pub fn metrics(&self) -> BrokerMetrics {
        BrokerMetrics::from_snapshot(&self.connected_brokers())
    }

    /// Register a snapshot callback; the returned handle removes it again
    /// and is safe to invoke multiple times.
    pub fn subscribe(
        &self,
        callback: impl Fn(&[BrokerConnection]) + Send + Sync + 'static,
    ) -> Subscription {
        SubscriberHub::subscribe(&self.shared.subscribers, callback)
    }

    /// Install an authoritative record, superseding any simulated entry
    /// for the same provider, and notify subscribers.
    pub fn reconcile(&self, record: BrokerConnection) {
        self.shared.reconcile(record);
    }

    /// Tear the engine down: stop both periodic tasks, clear the registry
    /// and the subscriber list. Safe to call multiple times.
    pub fn destroy(&self) {
        self.shared.shutdown.cancel();
        for task in self.tasks.lock().drain(..) {
            // Tasks only await between batches, so aborting cannot cut a
            // notification pass short.
            task.abort();
        }
        self.shared.registry.lock().clear();
        self.shared.subscribers.clear();
    }
}

impl Drop for BrokerEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for BrokerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerEngine")
            .field("connections", &self.shared.registry.lock().len())
            .field("subscribers", &self.shared.subscribers.len())
            .field("started", &self.started.load(Ordering::SeqCst))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::connection::ConnectionStatus;
    use std::sync::atomic::AtomicUsize;

    fn quiet_config() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn seeded_engine_reports_reference_metrics() {
        let engine = BrokerEngine::new(quiet_config());
        let metrics = engine.metrics();

        assert_eq!(metrics.total_connections, 3);
        assert_eq!(metrics.active_connections, 3);
        assert_eq!(metrics.failed_connections, 0);
        assert_eq!(metrics.avg_latency_ms, 61.67);
        assert_eq!(metrics.overall_success_rate, 0.992);
    }

    #[test]
    fn add_broker_is_idempotent_per_provider() {
        let engine = BrokerEngine::new(quiet_config());

        assert!(engine.add_broker(BrokerType::Fyers));
        assert_eq!(engine.connected_brokers().len(), 4);

        let before = engine.get_broker(BrokerType::Fyers).unwrap();
        assert!(!engine.add_broker(BrokerType::Fyers));
        assert_eq!(engine.connected_brokers().len(), 4);
        assert_eq!(engine.get_broker(BrokerType::Fyers).unwrap(), before);
    }

    #[test]
    fn added_broker_starts_with_zero_counters() {
        let engine = BrokerEngine::new(quiet_config());
        engine.add_broker(BrokerType::Kotak);

        let conn = engine.get_broker(BrokerType::Kotak).unwrap();
        assert_eq!(conn.data_points_received, 0);
        assert_eq!(conn.failed_requests, 0);
        assert_eq!(conn.status, ConnectionStatus::Connected);
    }

    #[test]
    fn remove_broker_notifies_subscribers_once() {
        let engine = BrokerEngine::new(quiet_config());
        let notifications = Arc::new(Mutex::new(Vec::new()));

        let _sub = {
            let notifications = Arc::clone(&notifications);
            engine.subscribe(move |snapshot| notifications.lock().push(snapshot.to_vec()))
        };

        assert!(engine.remove_broker(BrokerType::AngelOne));
        assert!(!engine.remove_broker(BrokerType::AngelOne));

        let notifications = notifications.lock();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].len(), 2);
        assert!(
            !notifications[0]
                .iter()
                .any(|c| c.broker == BrokerType::AngelOne)
        );
    }

    #[test]
    fn reconcile_supersedes_simulated_entry() {
        let engine = BrokerEngine::new(quiet_config());
        let count = Arc::new(AtomicUsize::new(0));

        let _sub = {
            let count = Arc::clone(&count);
            engine.subscribe(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        let record = crate::probe::authoritative_record(BrokerType::Zerodha);
        engine.reconcile(record.clone());

        assert_eq!(engine.connected_brokers().len(), 3);
        assert_eq!(engine.get_broker(BrokerType::Zerodha).unwrap(), record);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn metrics_on_empty_registry_are_all_zero() {
        let config = EngineConfig {
            seed: Vec::new(),
            ..EngineConfig::default()
        };
        let engine = BrokerEngine::new(config);

        assert_eq!(engine.metrics(), BrokerMetrics::default());
    }

    #[tokio::test]
    async fn destroy_clears_everything_and_is_idempotent() {
        let engine = BrokerEngine::new(quiet_config());
        let _sub = engine.subscribe(|_| {});

        engine.start();
        engine.destroy();
        engine.destroy();

        assert!(engine.connected_brokers().is_empty());
        assert_eq!(engine.metrics().total_connections, 0);

        // Mutations after teardown still behave; nobody is listening.
        assert!(engine.add_broker(BrokerType::Hdfc));
    }
}

// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Broker Engine - Connection State & Real-Time Metrics
//!
//! Tracks the lifecycle of connections to external market-data/brokerage
//! providers, periodically mutates their telemetry to emulate live feeds,
//! aggregates portfolio-wide metrics, and broadcasts snapshots to
//! subscribers.
//!
//! # Components
//!
//! - [`registry::ConnectionRegistry`]: canonical in-memory connection set,
//!   one entry per provider
//! - [`simulator`]: per-tick stochastic telemetry mutation
//! - [`domain::metrics::BrokerMetrics`]: pure aggregation over snapshots
//! - [`dispatch::SubscriberHub`]: ordered callback fan-out
//! - [`probe::HttpProbe`]: best-effort reconciliation against an
//!   authoritative provider endpoint
//! - [`engine::BrokerEngine`]: lifecycle, scheduling, and the public
//!   surface consumed by UIs
//!
//! # Example
//!
//! ```rust,no_run
//! use broker_engine::{BrokerEngine, BrokerType, EngineConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = BrokerEngine::new(EngineConfig::default());
//!     let subscription = engine.subscribe(|snapshot| {
//!         println!("{} connections", snapshot.len());
//!     });
//!
//!     engine.start();
//!     engine.add_broker(BrokerType::Fyers);
//!
//!     // ...
//!
//!     subscription.unsubscribe();
//!     engine.destroy();
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Engine configuration and seed data.
pub mod config;

/// Subscriber fan-out.
pub mod dispatch;

/// Connection records and derived metrics.
pub mod domain;

/// Engine lifecycle and public surface.
pub mod engine;

/// Error types.
pub mod error;

/// Authoritative provider probe.
pub mod probe;

/// Connection registry.
pub mod registry;

/// Stochastic telemetry simulation.
pub mod simulator;

/// Tracing setup.
pub mod telemetry;

pub use config::{EngineConfig, ProbeConfig, default_seed};
pub use dispatch::{SubscriberHub, Subscription};
pub use domain::connection::{
    BrokerCapability, BrokerConnection, BrokerType, ConnectionHealth, ConnectionStatus,
    DataFlowStatus, SubscriptionPlan,
};
pub use domain::metrics::BrokerMetrics;
pub use engine::BrokerEngine;
pub use error::{ConfigError, ProbeError};
pub use probe::{AuthoritativeSource, HttpProbe};
pub use registry::ConnectionRegistry;
pub use simulator::{RandomSource, ThreadRandom};

//! Domain types for broker connections and derived metrics.

pub mod connection;
pub mod metrics;

pub use connection::{
    BrokerCapability, BrokerConnection, BrokerType, ConnectionHealth, ConnectionStatus,
    DataFlowStatus, SubscriptionPlan,
};
pub use metrics::BrokerMetrics;

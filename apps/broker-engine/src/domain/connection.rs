//! Broker connection record and its enumerated state dimensions.
//!
//! A [`BrokerConnection`] is the in-memory view of one provider's link:
//! lifecycle status, data-flow quality, health, and rolling telemetry
//! counters. Provider identity ([`BrokerType`]) is the unique registry key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard floor for simulated latency, in milliseconds.
pub const MIN_LATENCY_MS: f64 = 20.0;

/// Lower clamp for the rolling success rate.
pub const SUCCESS_RATE_FLOOR: f64 = 0.900;

/// Upper clamp for the rolling success rate.
pub const SUCCESS_RATE_CEIL: f64 = 0.999;

// ============================================================================
// Provider Identity
// ============================================================================

/// Identity of an external data/brokerage provider.
///
/// At most one [`BrokerConnection`] per variant exists in the registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrokerType {
    /// Zerodha Kite.
    Zerodha,
    /// Angel One SmartAPI.
    AngelOne,
    /// Upstox.
    Upstox,
    /// Fyers.
    Fyers,
    /// ICICI Direct Breeze.
    IciciDirect,
    /// Kotak Neo.
    Kotak,
    /// Sharekhan.
    Sharekhan,
    /// HDFC Securities.
    Hdfc,
    /// 5paisa.
    Fivepaisa,
}

impl BrokerType {
    /// All known provider identities.
    pub const ALL: [Self; 9] = [
        Self::Zerodha,
        Self::AngelOne,
        Self::Upstox,
        Self::Fyers,
        Self::IciciDirect,
        Self::Kotak,
        Self::Sharekhan,
        Self::Hdfc,
        Self::Fivepaisa,
    ];

    /// Canonical name, as used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Zerodha => "ZERODHA",
            Self::AngelOne => "ANGEL_ONE",
            Self::Upstox => "UPSTOX",
            Self::Fyers => "FYERS",
            Self::IciciDirect => "ICICI_DIRECT",
            Self::Kotak => "KOTAK",
            Self::Sharekhan => "SHAREKHAN",
            Self::Hdfc => "HDFC",
            Self::Fivepaisa => "FIVEPAISA",
        }
    }

    /// Stable connection identifier derived from the provider identity.
    #[must_use]
    pub fn connection_id(&self) -> String {
        format!("broker_{}_live", self.as_str().to_lowercase())
    }
}

impl std::fmt::Display for BrokerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized provider name.
#[derive(Debug, Error)]
#[error("unknown broker type: {0}")]
pub struct UnknownBrokerType(pub String);

impl std::str::FromStr for BrokerType {
    type Err = UnknownBrokerType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == upper)
            .ok_or_else(|| UnknownBrokerType(s.to_string()))
    }
}

// ============================================================================
// State Dimensions
// ============================================================================

/// Connection lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    /// Link is established and serving requests.
    Connected,
    /// Initial session negotiation in progress.
    Connecting,
    /// Link dropped and a reconnect attempt is underway.
    Reconnecting,
    /// Terminal failure; not cleared by simulation.
    Error,
    /// Link closed.
    Disconnected,
}

/// Quality of the market-data flow on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataFlowStatus {
    /// Full-rate streaming.
    Streaming,
    /// Active but below streaming rate.
    Active,
    /// Throttled or partial coverage.
    Limited,
    /// No data currently flowing.
    Inactive,
    /// Provider reports no data available.
    NoData,
}

/// Composite health assessment of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionHealth {
    /// Operating normally.
    Healthy,
    /// Degraded but functional.
    Warning,
    /// Severely degraded.
    Critical,
    /// Health cannot be determined.
    Unknown,
}

/// Capability offered by a provider over a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrokerCapability {
    /// Market data feed.
    MarketData,
    /// Order placement and management.
    OrderManagement,
    /// Real-time quote snapshots.
    RealTimeQuotes,
    /// Portfolio synchronization.
    PortfolioSync,
    /// Historical data download.
    HistoricalData,
}

/// Subscription tier, informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionPlan {
    /// Entry tier.
    Basic,
    /// Professional tier.
    Pro,
    /// Enterprise tier.
    Enterprise,
}

// ============================================================================
// Connection Record
// ============================================================================

/// In-memory record of one provider's link state and telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerConnection {
    /// Opaque stable identifier derived from the provider identity.
    pub id: String,
    /// Provider identity; unique key in the registry.
    pub broker: BrokerType,
    /// Lifecycle status.
    pub status: ConnectionStatus,
    /// Data-flow quality.
    pub data_flow: DataFlowStatus,
    /// Composite health.
    pub health: ConnectionHealth,
    /// When the link was established.
    pub connected_at: DateTime<Utc>,
    /// When data was last received.
    pub last_data_received: DateTime<Utc>,
    /// Round-trip latency in milliseconds; never below [`MIN_LATENCY_MS`].
    pub latency_ms: f64,
    /// Rolling request success rate, clamped to
    /// [[`SUCCESS_RATE_FLOOR`], [`SUCCESS_RATE_CEIL`]].
    pub success_rate: f64,
    /// Monotonically non-decreasing data point counter.
    pub data_points_received: u64,
    /// Monotonically non-decreasing failure counter.
    pub failed_requests: u64,
    /// Capabilities this connection serves.
    pub services: Vec<BrokerCapability>,
    /// Subscription tier.
    pub plan: SubscriptionPlan,
}

impl BrokerConnection {
    /// Build a freshly connected record with the given starting telemetry.
    ///
    /// Status is CONNECTED, data flow STREAMING, health HEALTHY, counters
    /// zeroed, both timestamps set to now.
    #[must_use]
    pub fn connected(broker: BrokerType, latency_ms: f64, success_rate: f64) -> Self {
        let now = Utc::now();
        Self {
            id: broker.connection_id(),
            broker,
            status: ConnectionStatus::Connected,
            data_flow: DataFlowStatus::Streaming,
            health: ConnectionHealth::Healthy,
            connected_at: now,
            last_data_received: now,
            latency_ms,
            success_rate,
            data_points_received: 0,
            failed_requests: 0,
            services: vec![
                BrokerCapability::MarketData,
                BrokerCapability::OrderManagement,
            ],
            plan: SubscriptionPlan::Pro,
        }
    }

    /// Whether this connection counts as active for portfolio metrics.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Engine configuration.
//!
//! Configuration is constructor-provided so independent engine instances
//! can coexist (notably in tests). `from_env` covers the binary's needs:
//!
//! - `BROKER_TICK_INTERVAL_MS`: simulation tick interval (default: 2000)
//! - `BROKER_PROBE_INTERVAL_MS`: authoritative probe interval (default: 10000)
//! - `BROKER_PROBE_URL`: profile endpoint; probe disabled when unset
//! - `BROKER_PROBE_PROVIDER`: designated provider (default: FYERS)
//! - `BROKER_PROBE_TIMEOUT_MS`: per-request timeout (default: 5000)

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;

use crate::domain::connection::{
    BrokerCapability, BrokerConnection, BrokerType, DataFlowStatus, SubscriptionPlan,
};
use crate::error::ConfigError;

/// Engine configuration: tick cadence, seed set, and probe settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simulation tick interval, milliseconds.
    pub tick_interval_ms: u64,
    /// Authoritative probe interval, milliseconds.
    pub probe_interval_ms: u64,
    /// Connections present at startup.
    pub seed: Vec<BrokerConnection>,
    /// Probe settings; `None` disables reconciliation.
    pub probe: Option<ProbeConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2_000,
            probe_interval_ms: 10_000,
            seed: default_seed(),
            probe: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = env_u64("BROKER_TICK_INTERVAL_MS")? {
            config.tick_interval_ms = value;
        }
        if let Some(value) = env_u64("BROKER_PROBE_INTERVAL_MS")? {
            config.probe_interval_ms = value;
        }

        if let Ok(url) = std::env::var("BROKER_PROBE_URL") {
            let mut probe = ProbeConfig::new(url);
            if let Ok(provider) = std::env::var("BROKER_PROBE_PROVIDER") {
                probe.broker = provider.parse().map_err(|_| ConfigError::InvalidValue {
                    var: "BROKER_PROBE_PROVIDER".to_string(),
                    value: provider,
                })?;
            }
            if let Some(value) = env_u64("BROKER_PROBE_TIMEOUT_MS")? {
                probe.timeout_ms = value;
            }
            config.probe = Some(probe);
        }

        Ok(config)
    }

    /// Simulation tick interval.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Authoritative probe interval.
    #[must_use]
    pub const fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }
}

/// Settings for the authoritative provider probe.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Profile endpoint returning `{ "success": bool, ... }`.
    pub profile_url: String,
    /// Provider whose state the probe reconciles.
    #[serde(default = "default_probe_broker")]
    pub broker: BrokerType,
    /// Per-request timeout, milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
}

impl ProbeConfig {
    /// Probe config for the given URL with default provider and timeout.
    #[must_use]
    pub fn new(profile_url: impl Into<String>) -> Self {
        Self {
            profile_url: profile_url.into(),
            broker: default_probe_broker(),
            timeout_ms: default_probe_timeout_ms(),
        }
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

const fn default_probe_broker() -> BrokerType {
    BrokerType::Fyers
}

const fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn env_u64(var: &str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var: var.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// Default startup portfolio of three live connections.
#[must_use]
pub fn default_seed() -> Vec<BrokerConnection> {
    let now = Utc::now();

    let mut zerodha = BrokerConnection::connected(BrokerType::Zerodha, 45.0, 0.995);
    zerodha.connected_at = now - ChronoDuration::hours(1);
    zerodha.data_points_received = 15_420;
    zerodha.failed_requests = 3;
    zerodha.services = vec![
        BrokerCapability::MarketData,
        BrokerCapability::OrderManagement,
        BrokerCapability::PortfolioSync,
    ];
    zerodha.plan = SubscriptionPlan::Enterprise;

    let mut angel = BrokerConnection::connected(BrokerType::AngelOne, 62.0, 0.992);
    angel.connected_at = now - ChronoDuration::hours(2);
    angel.data_flow = DataFlowStatus::Active;
    angel.data_points_received = 23_890;
    angel.failed_requests = 8;
    angel.services = vec![
        BrokerCapability::MarketData,
        BrokerCapability::OrderManagement,
        BrokerCapability::RealTimeQuotes,
    ];

    let mut upstox = BrokerConnection::connected(BrokerType::Upstox, 78.0, 0.988);
    upstox.connected_at = now - ChronoDuration::minutes(30);
    upstox.data_points_received = 8_750;
    upstox.failed_requests = 12;
    upstox.services = vec![
        BrokerCapability::MarketData,
        BrokerCapability::RealTimeQuotes,
    ];
    upstox.plan = SubscriptionPlan::Basic;

    vec![zerodha, angel, upstox]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_cadence() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(2_000));
        assert_eq!(config.probe_interval(), Duration::from_millis(10_000));
        assert!(config.probe.is_none());
        assert_eq!(config.seed.len(), 3);
    }

    #[test]
    fn default_seed_covers_distinct_providers() {
        let seed = default_seed();
        let brokers: Vec<BrokerType> = seed.iter().map(|c| c.broker).collect();
        assert_eq!(
            brokers,
            vec![BrokerType::Zerodha, BrokerType::AngelOne, BrokerType::Upstox]
        );
        assert_eq!(seed[0].latency_ms, 45.0);
        assert_eq!(seed[1].latency_ms, 62.0);
        assert_eq!(seed[2].latency_ms, 78.0);
    }

    #[test]
    fn probe_config_defaults() {
        let probe = ProbeConfig::new("http://127.0.0.1:5000/api/fyers/profile");
        assert_eq!(probe.broker, BrokerType::Fyers);
        assert_eq!(probe.timeout(), Duration::from_millis(5_000));
    }

    #[test]
    fn deserializes_partial_config() {
        let config: EngineConfig = serde_json::from_str(
            r#"{
                "tick_interval_ms": 500,
                "probe": { "profile_url": "http://localhost:5000/api/fyers/profile" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.tick_interval_ms, 500);
        assert_eq!(config.probe_interval_ms, 10_000);
        let probe = config.probe.unwrap();
        assert_eq!(probe.broker, BrokerType::Fyers);
        assert_eq!(probe.timeout_ms, 5_000);
    }
}

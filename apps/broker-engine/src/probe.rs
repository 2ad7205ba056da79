//! Best-effort reconciliation against an authoritative provider endpoint.
//!
//! The probe runs on its own, slower cadence and asks one designated
//! provider whether a real session exists. A positive answer produces an
//! authoritative [`BrokerConnection`] that wholesale replaces the simulated
//! entry for that provider. Every failure mode (network, status, payload)
//! collapses to "no authoritative update this cycle" and never reaches
//! registry callers or subscribers.

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;

use crate::config::ProbeConfig;
use crate::domain::connection::{BrokerCapability, BrokerConnection, BrokerType};
use crate::error::ProbeError;

/// Source of authoritative connection records for one provider.
#[async_trait]
pub trait AuthoritativeSource: Send + Sync {
    /// Attempt to fetch an authoritative record.
    ///
    /// `Ok(None)` means the endpoint answered but reported no live session.
    async fn fetch(&self) -> Result<Option<BrokerConnection>, ProbeError>;
}

/// Minimal shape of the provider profile response.
#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    success: bool,
}

/// HTTP-backed [`AuthoritativeSource`].
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
    broker: BrokerType,
}

impl HttpProbe {
    /// Build a probe from config; the per-request timeout bounds every
    /// fetch so a slow endpoint cannot stall the schedule.
    pub fn new(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: config.profile_url.clone(),
            broker: config.broker,
        })
    }
}

#[async_trait]
impl AuthoritativeSource for HttpProbe {
    async fn fetch(&self) -> Result<Option<BrokerConnection>, ProbeError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let profile: ProfileResponse = response
            .json()
            .await
            .map_err(|e| ProbeError::Payload(e.to_string()))?;

        if !profile.success {
            return Ok(None);
        }

        Ok(Some(authoritative_record(self.broker)))
    }
}

/// Build the CONNECTED record installed when the provider confirms a live
/// session.
#[must_use]
pub fn authoritative_record(broker: BrokerType) -> BrokerConnection {
    let mut rng = rand::rng();
    let mut connection = BrokerConnection::connected(broker, 45.0, 0.99);
    connection.data_points_received = rng.random_range(0..10_000);
    connection.failed_requests = rng.random_range(0..10);
    connection.services = vec![
        BrokerCapability::MarketData,
        BrokerCapability::OrderManagement,
        BrokerCapability::RealTimeQuotes,
    ];
    connection
}

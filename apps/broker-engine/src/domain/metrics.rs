//! Portfolio-wide connection metrics.
//!
//! [`BrokerMetrics`] is a pure aggregation over a registry snapshot. It is
//! recomputed on demand and never cached, so callers can request it at any
//! time without coordinating with the simulation tick.

use serde::Serialize;

use super::connection::BrokerConnection;

/// Aggregated statistics over all registered connections.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerMetrics {
    /// Number of registered connections.
    pub total_connections: usize,
    /// Connections currently in CONNECTED status.
    pub active_connections: usize,
    /// `total_connections - active_connections`.
    pub failed_connections: usize,
    /// Mean latency across all connections, rounded to 2 decimal places.
    pub avg_latency_ms: f64,
    /// Sum of data points received across all connections.
    pub total_data_points: u64,
    /// Mean success rate across all connections, rounded to 3 decimal places.
    pub overall_success_rate: f64,
}

impl BrokerMetrics {
    /// Compute metrics from a registry snapshot.
    ///
    /// An empty snapshot yields all-zero fields rather than an error.
    #[must_use]
    pub fn from_snapshot(snapshot: &[BrokerConnection]) -> Self {
        let total = snapshot.len();
        if total == 0 {
            return Self::default();
        }

        let active = snapshot.iter().filter(|c| c.is_active()).count();
        let total_data_points = snapshot.iter().map(|c| c.data_points_received).sum();
        let avg_latency = snapshot.iter().map(|c| c.latency_ms).sum::<f64>() / total as f64;
        let avg_success = snapshot.iter().map(|c| c.success_rate).sum::<f64>() / total as f64;

        Self {
            total_connections: total,
            active_connections: active,
            failed_connections: total - active,
            avg_latency_ms: round_to(avg_latency, 2),
            total_data_points,
            overall_success_rate: round_to(avg_success, 3),
        }
    }
}

/// Round half away from zero to the given number of decimal places.
fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

// ============================================================================
// Tests
// ============================================================================

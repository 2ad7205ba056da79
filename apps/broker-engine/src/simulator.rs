//! Stochastic telemetry simulation.
//!
//! Each tick perturbs every registered connection independently: latency
//! jitter with a hard floor, throughput growth, a Bernoulli failure trial,
//! and a clamped success-rate drift. Randomness comes through the
//! [`RandomSource`] trait so tests can script exact outcomes.

use chrono::Utc;
use rand::Rng;

use crate::domain::connection::{
    BrokerConnection, BrokerType, ConnectionHealth, ConnectionStatus, DataFlowStatus,
    MIN_LATENCY_MS, SUCCESS_RATE_CEIL, SUCCESS_RATE_FLOOR,
};

/// Per-tick latency jitter bound, in milliseconds (+/-).
pub const LATENCY_JITTER_MS: f64 = 10.0;

/// Minimum data points gained per tick.
pub const MIN_TICK_DATA_POINTS: u64 = 10;

/// Maximum data points gained per tick.
pub const MAX_TICK_DATA_POINTS: u64 = 59;

/// Probability of a failure event on any given tick.
pub const FAILURE_PROBABILITY: f64 = 0.05;

/// Probability that a failure event also flips status to RECONNECTING.
pub const RECONNECT_PROBABILITY: f64 = 0.30;

/// Lower bound of the per-tick success-rate drift.
pub const SUCCESS_DRIFT_LOW: f64 = -0.001;

/// Upper bound of the per-tick success-rate drift.
pub const SUCCESS_DRIFT_HIGH: f64 = 0.002;

/// Startup latency range for newly added connections, in milliseconds.
pub const STARTUP_LATENCY_RANGE: (u64, u64) = (30, 79);

// ============================================================================
// Random Source
// ============================================================================

/// Source of randomness for the simulation.
///
/// Injected rather than drawn from a hidden global generator so tests can
/// supply deterministic sequences.
pub trait RandomSource: Send {
    /// Uniform draw from `[low, high)`.
    fn uniform(&mut self, low: f64, high: f64) -> f64;

    /// Uniform integer draw from `[low, high]` inclusive.
    fn uniform_int(&mut self, low: u64, high: u64) -> u64;

    /// Bernoulli trial with the given success probability.
    fn chance(&mut self, probability: f64) -> bool;
}

/// [`RandomSource`] backed by the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        rand::rng().random_range(low..high)
    }

    fn uniform_int(&mut self, low: u64, high: u64) -> u64 {
        rand::rng().random_range(low..=high)
    }

    fn chance(&mut self, probability: f64) -> bool {
        rand::rng().random_bool(probability)
    }
}

// ============================================================================
// Tick Mutation
// ============================================================================

/// Apply one simulation tick to a single connection.
///
/// A terminal ERROR status set externally is never cleared here; every
/// other status converges back to CONNECTED on a clean tick.
pub fn advance(connection: &mut BrokerConnection, rng: &mut dyn RandomSource) {
    connection.latency_ms = (connection.latency_ms
        + rng.uniform(-LATENCY_JITTER_MS, LATENCY_JITTER_MS))
    .max(MIN_LATENCY_MS);

    connection.data_points_received += rng.uniform_int(MIN_TICK_DATA_POINTS, MAX_TICK_DATA_POINTS);

    if rng.chance(FAILURE_PROBABILITY) {
        connection.failed_requests += 1;
        if rng.chance(RECONNECT_PROBABILITY) {
            connection.status = ConnectionStatus::Reconnecting;
        }
        connection.data_flow = DataFlowStatus::Inactive;
        connection.health = ConnectionHealth::Warning;
    } else {
        if connection.status != ConnectionStatus::Error {
            connection.status = ConnectionStatus::Connected;
        }
        connection.data_flow = DataFlowStatus::Streaming;
        connection.health = ConnectionHealth::Healthy;
    }

    connection.success_rate = (connection.success_rate
        + rng.uniform(SUCCESS_DRIFT_LOW, SUCCESS_DRIFT_HIGH))
    .clamp(SUCCESS_RATE_FLOOR, SUCCESS_RATE_CEIL);

    connection.last_data_received = Utc::now();
}

/// Build the initial record for a newly added provider.
///
/// Latency starts in the configured startup range and the success rate
/// just under the ceiling.
pub fn establish(broker: BrokerType, rng: &mut dyn RandomSource) -> BrokerConnection {
    let latency = rng.uniform_int(STARTUP_LATENCY_RANGE.0, STARTUP_LATENCY_RANGE.1) as f64;
    let success_rate = 0.99 + rng.uniform(0.0, 0.009);
    BrokerConnection::connected(broker, latency, success_rate)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    /// Scripted random source for exercising exact branches.
    #[derive(Debug, Default)]
    struct Scripted {
        uniforms: VecDeque<f64>,
        ints: VecDeque<u64>,
        chances: VecDeque<bool>,
    }

    impl Scripted {
        fn new(
            uniforms: impl IntoIterator<Item = f64>,
            ints: impl IntoIterator<Item = u64>,
            chances: impl IntoIterator<Item = bool>,
        ) -> Self {
            Self {
                uniforms: uniforms.into_iter().collect(),
                ints: ints.into_iter().collect(),
                chances: chances.into_iter().collect(),
            }
        }
    }

    impl RandomSource for Scripted {
        fn uniform(&mut self, _low: f64, _high: f64) -> f64 {
            self.uniforms.pop_front().expect("scripted uniform exhausted")
        }

        fn uniform_int(&mut self, _low: u64, _high: u64) -> u64 {
            self.ints.pop_front().expect("scripted int exhausted")
        }

        fn chance(&mut self, _probability: f64) -> bool {
            self.chances.pop_front().expect("scripted chance exhausted")
        }
    }

    fn connection() -> BrokerConnection {
        BrokerConnection::connected(BrokerType::Zerodha, 45.0, 0.995)
    }

    #[test]
    fn latency_never_drops_below_floor() {
        let mut conn = connection();
        conn.latency_ms = 25.0;

        // Jitter of -10 would take latency to 15; floor holds at 20.
        let mut rng = Scripted::new([-10.0, 0.0], [10], [false]);
        advance(&mut conn, &mut rng);

        assert_eq!(conn.latency_ms, MIN_LATENCY_MS);
    }

    #[test]
    fn clean_tick_restores_streaming_healthy() {
        let mut conn = connection();
        conn.status = ConnectionStatus::Reconnecting;
        conn.data_flow = DataFlowStatus::Inactive;
        conn.health = ConnectionHealth::Warning;

        let mut rng = Scripted::new([0.0, 0.0], [25], [false]);
        advance(&mut conn, &mut rng);

        assert_eq!(conn.status, ConnectionStatus::Connected);
        assert_eq!(conn.data_flow, DataFlowStatus::Streaming);
        assert_eq!(conn.health, ConnectionHealth::Healthy);
        assert_eq!(conn.data_points_received, 25);
        assert_eq!(conn.failed_requests, 0);
    }

    #[test]
    fn failure_with_reconnect_flips_status() {
        let mut conn = connection();

        // Failure trial hits, reconnect trial hits.
        let mut rng = Scripted::new([0.0, 0.0], [10], [true, true]);
        advance(&mut conn, &mut rng);

        assert_eq!(conn.failed_requests, 1);
        assert_eq!(conn.status, ConnectionStatus::Reconnecting);
        assert_eq!(conn.data_flow, DataFlowStatus::Inactive);
        assert_eq!(conn.health, ConnectionHealth::Warning);
    }

    #[test]
    fn failure_without_reconnect_keeps_status() {
        let mut conn = connection();

        let mut rng = Scripted::new([0.0, 0.0], [10], [true, false]);
        advance(&mut conn, &mut rng);

        assert_eq!(conn.failed_requests, 1);
        assert_eq!(conn.status, ConnectionStatus::Connected);
        assert_eq!(conn.data_flow, DataFlowStatus::Inactive);
        assert_eq!(conn.health, ConnectionHealth::Warning);
    }

    #[test]
    fn error_status_survives_clean_tick() {
        let mut conn = connection();
        conn.status = ConnectionStatus::Error;

        let mut rng = Scripted::new([0.0, 0.0], [10], [false]);
        advance(&mut conn, &mut rng);

        assert_eq!(conn.status, ConnectionStatus::Error);
    }

    #[test]
    fn success_rate_clamps_at_both_ends() {
        let mut conn = connection();
        conn.success_rate = 0.999;
        let mut rng = Scripted::new([0.0, 0.002], [10], [false]);
        advance(&mut conn, &mut rng);
        assert_eq!(conn.success_rate, SUCCESS_RATE_CEIL);

        conn.success_rate = 0.900;
        let mut rng = Scripted::new([0.0, -0.001], [10], [false]);
        advance(&mut conn, &mut rng);
        assert_eq!(conn.success_rate, SUCCESS_RATE_FLOOR);
    }

    #[test]
    fn counters_are_monotonic() {
        let mut conn = connection();
        let mut rng = ThreadRandom;

        let mut last_points = 0;
        let mut last_failures = 0;
        for _ in 0..100 {
            advance(&mut conn, &mut rng);
            assert!(conn.data_points_received >= last_points + MIN_TICK_DATA_POINTS);
            assert!(conn.failed_requests >= last_failures);
            last_points = conn.data_points_received;
            last_failures = conn.failed_requests;
        }
    }

    #[test]
    fn invariants_hold_over_a_thousand_live_ticks() {
        let mut conn = connection();
        let mut rng = ThreadRandom;

        for _ in 0..1_000 {
            advance(&mut conn, &mut rng);
            assert!(conn.latency_ms >= MIN_LATENCY_MS);
            assert!(conn.success_rate >= SUCCESS_RATE_FLOOR);
            assert!(conn.success_rate <= SUCCESS_RATE_CEIL);
        }
    }

    #[test]
    fn establish_stays_in_startup_range() {
        let mut rng = ThreadRandom;
        for _ in 0..50 {
            let conn = establish(BrokerType::Sharekhan, &mut rng);
            assert!(conn.latency_ms >= STARTUP_LATENCY_RANGE.0 as f64);
            assert!(conn.latency_ms <= STARTUP_LATENCY_RANGE.1 as f64);
            assert!(conn.success_rate >= 0.99);
            assert!(conn.success_rate < 0.999);
        }
    }

    proptest! {
        #[test]
        fn tick_invariants_from_arbitrary_state(
            latency in MIN_LATENCY_MS..500.0f64,
            rate in SUCCESS_RATE_FLOOR..SUCCESS_RATE_CEIL,
            ticks in 1usize..64,
        ) {
            let mut conn = connection();
            conn.latency_ms = latency;
            conn.success_rate = rate;
            let mut rng = ThreadRandom;

            for _ in 0..ticks {
                advance(&mut conn, &mut rng);
                prop_assert!(conn.latency_ms >= MIN_LATENCY_MS);
                prop_assert!(conn.success_rate >= SUCCESS_RATE_FLOOR);
                prop_assert!(conn.success_rate <= SUCCESS_RATE_CEIL);
            }
        }
    }
}

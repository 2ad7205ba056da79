//! Broker Engine Binary
//!
//! Boots the connection engine, logs portfolio metrics on each snapshot,
//! and shuts down cleanly on Ctrl-C.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p broker-engine
//! ```
//!
//! # Environment Variables
//!
//! - `BROKER_TICK_INTERVAL_MS`: simulation tick interval (default: 2000)
//! - `BROKER_PROBE_INTERVAL_MS`: authoritative probe interval (default: 10000)
//! - `BROKER_PROBE_URL`: provider profile endpoint; probe disabled when unset
//! - `BROKER_PROBE_PROVIDER`: designated provider (default: FYERS)
//! - `BROKER_PROBE_TIMEOUT_MS`: probe request timeout (default: 5000)
//! - `RUST_LOG`: log level (default: info)

use broker_engine::{BrokerEngine, BrokerMetrics, EngineConfig, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init();

    let config = EngineConfig::from_env()?;
    let engine = BrokerEngine::new(config);

    let subscription = engine.subscribe(|snapshot| {
        let metrics = BrokerMetrics::from_snapshot(snapshot);
        tracing::info!(
            total = metrics.total_connections,
            active = metrics.active_connections,
            avg_latency_ms = metrics.avg_latency_ms,
            total_data_points = metrics.total_data_points,
            overall_success_rate = metrics.overall_success_rate,
            "registry snapshot"
        );
    });

    engine.start();

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    subscription.unsubscribe();
    engine.destroy();

    Ok(())
}

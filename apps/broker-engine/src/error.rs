//! Engine error types.

use thiserror::Error;

/// Failures while probing the authoritative provider endpoint.
///
/// These are internal to the probe cycle: a failed probe means "no
/// authoritative update this tick" and is never surfaced to registry
/// callers or subscribers.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// HTTP client could not be constructed.
    #[error("probe client construction failed: {0}")]
    Client(String),

    /// Request did not complete (network unreachable, timeout, ...).
    #[error("probe request failed: {0}")]
    Request(String),

    /// Endpoint answered with a non-success status code.
    #[error("probe returned status {0}")]
    Status(u16),

    /// Response body could not be decoded.
    #[error("malformed probe payload: {0}")]
    Payload(String),
}

/// Failures while reading engine configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that does not parse.
    #[error("invalid value for {var}: {value}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// Offending value.
        value: String,
    },
}

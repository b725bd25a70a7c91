//! Error types for flowmon.

use thiserror::Error;

/// Why a sample did not reach the collector.
///
/// Never surfaced to callers of the agent; it only feeds the delivery
/// status and the log.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Collector answered HTTP {0}")]
    Status(u16),

    #[error("Collector unreachable: {0}")]
    Transport(String),

    #[error("In-flight request limit reached")]
    Saturated,
}

/// Errors loading or validating the agent configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// A replay line that parsed but cannot be scheduled.
#[derive(Debug, Error, PartialEq)]
pub enum ReplayError {
    #[error("t_ms {0} is not a usable offset")]
    InvalidOffset(f64),

    #[error("t_ms {0} is beyond the replay clock")]
    OffsetOverflow(f64),
}

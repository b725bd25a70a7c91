//! flowmon - desktop input telemetry agent.
//!
//! Observes keyboard and pointer input, aggregates it into fixed-period
//! windows and POSTs one JSON sample per window to a collector.
//!
//! ## Modules
//!
//! - **aggregator**: counters and per-window statistics
//! - **monitor**: capture sources feeding input events
//! - **agent**: the cycle loop and its start/stop lifecycle
//! - **delivery**: best-effort HTTP delivery to the collector
//! - **server**: loopback status API and WebSocket feed

pub mod agent;
pub mod aggregator;
pub mod config;
pub mod delivery;
pub mod error;
pub mod monitor;
pub mod server;
pub mod status;
#[cfg(windows)]
pub mod winapi_utils;

pub use agent::{AgentHandle, TelemetryAgent};
pub use aggregator::{Aggregator, TelemetrySample};
pub use config::AgentConfig;
pub use delivery::{Collector, DeliveryStatus};
pub use status::StatusBoard;

/// Crate version reported by the status server.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

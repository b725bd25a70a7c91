//! Telemetry aggregation module.
//!
//! Turns a stream of key, pointer-move and pointer-down events into one
//! [`TelemetrySample`] per aggregation cycle.

pub mod state;
pub mod stats;
pub mod types;

pub use state::Aggregator;
pub use types::*;

//! Data types for telemetry samples.
//!
//! The serialized form of [`TelemetrySample`] is the wire contract with the
//! collector and must keep its field names and nesting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Typing statistics for one aggregation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingStats {
    /// Mean inter-keystroke interval in milliseconds (2 dp).
    pub mean_iki_ms: f64,

    /// Population variance of the interval log (2 dp).
    pub variance_iki: f64,

    /// Coefficient of variation of the interval log (3 dp).
    pub burstiness: f64,

    /// Keys pressed since the session started.
    pub total_keys: u64,

    /// Session-wide backspace share (3 dp).
    pub backspace_rate: f64,
}

/// Pointer statistics for one aggregation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouseStats {
    /// Pointer travel in whole pixels.
    pub distance_px: u64,

    /// Clicks per second over the window (3 dp).
    pub click_rate_per_sec: f64,
}

/// The snapshot emitted once per aggregation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub typing: TypingStats,
    pub mouse: MouseStats,

    /// Milliseconds since the last input event of any kind.
    pub idle_time_ms: u64,

    /// Wall-clock time the sample was built.
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

/// Counter values at a point in time, without resetting anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatorSnapshot {
    /// Intervals recorded in the current window.
    pub interval_count: usize,

    /// Pointer travel in the current window.
    pub pointer_distance_px: f64,

    /// Clicks in the current window.
    pub clicks: u64,

    /// Keys pressed since the session started.
    pub total_keys: u64,

    /// Backspaces since the session started.
    pub backspaces: u64,
}

/// `2024-01-15T14:00:00.000Z`, the format browsers emit for `toISOString`.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

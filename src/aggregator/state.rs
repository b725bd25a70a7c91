//! Rolling input counters and the per-cycle emission.
//!
//! The aggregator keeps two kinds of counters:
//! - **windowed** (interval log, pointer distance, clicks, window start),
//!   cleared by every [`Aggregator::emit`]
//! - **cumulative** (total keys, backspaces), kept for the whole session
//!
//! Rate statistics come from the first group, counts from the second.
//! Resetting the wrong group changes what the collector sees.
//!
//! All methods take explicit instants so the owner decides what "now" is.
//! The struct is not `Sync`-shared; one task owns it and feeds it events in
//! order.

use super::stats::{backspace_rate, burstiness, mean, rate_per_sec, round_to, variance};
use super::types::{AggregatorSnapshot, MouseStats, TelemetrySample, TypingStats};
use crate::monitor::{InputEvent, Key};
use chrono::{DateTime, Utc};
use std::time::Instant;

/// Session state for one monitored input stream.
#[derive(Debug, Clone)]
pub struct Aggregator {
    // === Keystrokes ===
    /// Previous key-down instant. Survives emission so the first interval
    /// of a window spans the boundary.
    last_key_at: Option<Instant>,

    /// Inter-keystroke intervals (ms) in the current window.
    intervals: Vec<f64>,

    /// Keys pressed this session.
    total_keys: u64,

    /// Backspaces pressed this session.
    backspaces: u64,

    // === Pointer ===
    /// Last seen pointer position. Position state, not a counter.
    last_position: Option<(f64, f64)>,

    /// Pointer travel (px) in the current window.
    pointer_distance: f64,

    /// Clicks in the current window.
    clicks: u64,

    // === Clocks ===
    /// Most recent input of any kind.
    last_activity: Instant,

    /// Start of the current aggregation window.
    window_start: Instant,
}

impl Aggregator {
    /// Creates an aggregator whose session and first window start at `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            last_key_at: None,
            intervals: Vec::new(),
            total_keys: 0,
            backspaces: 0,
            last_position: None,
            pointer_distance: 0.0,
            clicks: 0,
            last_activity: now,
            window_start: now,
        }
    }

    /// Dispatches a captured event to the matching handler.
    pub fn handle(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown { key, at } => self.on_key_down(*key, *at),
            InputEvent::PointerMove { x, y, at } => self.on_pointer_move(*x, *y, *at),
            InputEvent::PointerDown { at } => self.on_pointer_down(*at),
        }
    }

    /// Records a key press.
    pub fn on_key_down(&mut self, key: Key, at: Instant) {
        if let Some(prev) = self.last_key_at {
            let iki_ms = at.saturating_duration_since(prev).as_nanos() as f64 / 1e6;
            self.intervals.push(iki_ms);
        }
        self.last_key_at = Some(at);

        self.total_keys += 1;
        if key.is_backspace() {
            self.backspaces += 1;
        }

        self.touch(at);
    }

    /// Records a pointer position and accumulates straight-line travel.
    pub fn on_pointer_move(&mut self, x: f64, y: f64, at: Instant) {
        if let Some((px, py)) = self.last_position {
            self.pointer_distance += (x - px).hypot(y - py);
        }
        self.last_position = Some((x, y));
        self.touch(at);
    }

    /// Records a pointer button press.
    pub fn on_pointer_down(&mut self, at: Instant) {
        self.clicks += 1;
        self.touch(at);
    }

    /// Computes this window's sample and starts a new window at `now`.
    ///
    /// Cumulative counters are left untouched. `wall_clock` only stamps the
    /// sample; every duration is measured on the monotonic clock.
    pub fn emit(&mut self, now: Instant, wall_clock: DateTime<Utc>) -> TelemetrySample {
        let elapsed_secs = now.saturating_duration_since(self.window_start).as_secs_f64();

        let iki_mean = mean(&self.intervals);
        let iki_variance = variance(&self.intervals, iki_mean);
        let iki_burstiness = burstiness(&self.intervals, iki_mean, iki_variance);
        let click_rate = rate_per_sec(self.clicks, elapsed_secs);

        let sample = TelemetrySample {
            typing: TypingStats {
                mean_iki_ms: round_to(iki_mean, 2),
                variance_iki: round_to(iki_variance, 2),
                burstiness: round_to(iki_burstiness, 3),
                total_keys: self.total_keys,
                backspace_rate: backspace_rate(self.backspaces, self.total_keys),
            },
            mouse: MouseStats {
                distance_px: self.pointer_distance.round() as u64,
                click_rate_per_sec: round_to(click_rate, 3),
            },
            idle_time_ms: self.idle_ms(now),
            timestamp: wall_clock,
        };

        self.reset_window(now);
        sample
    }

    /// Milliseconds between the last input and `now`.
    pub fn idle_ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.last_activity).as_millis() as u64
    }

    /// Current counter values.
    pub fn snapshot(&self) -> AggregatorSnapshot {
        AggregatorSnapshot {
            interval_count: self.intervals.len(),
            pointer_distance_px: self.pointer_distance,
            clicks: self.clicks,
            total_keys: self.total_keys,
            backspaces: self.backspaces,
        }
    }

    fn touch(&mut self, at: Instant) {
        self.last_activity = at;
    }

    fn reset_window(&mut self, now: Instant) {
        self.intervals.clear();
        self.pointer_distance = 0.0;
        self.clicks = 0;
        self.window_start = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn wall() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn key(name: &str) -> Key {
        Key::from_name(name)
    }

    #[test]
    fn test_even_typing_scenario() {
        let t0 = Instant::now();
        let mut agg = Aggregator::new(t0);

        for i in 0..10 {
            agg.on_key_down(key("a"), t0 + ms(100 * i));
        }
        let sample = agg.emit(t0 + ms(5000), wall());

        assert_eq!(sample.typing.mean_iki_ms, 100.0);
        assert_eq!(sample.typing.variance_iki, 0.0);
        assert_eq!(sample.typing.burstiness, 0.0);
        assert_eq!(sample.typing.total_keys, 10);
        assert_eq!(sample.typing.backspace_rate, 0.0);
    }

    #[test]
    fn test_first_key_records_no_interval() {
        let t0 = Instant::now();
        let mut agg = Aggregator::new(t0);

        agg.on_key_down(key("a"), t0 + ms(10));
        let snap = agg.snapshot();
        assert_eq!(snap.interval_count, 0);
        assert_eq!(snap.total_keys, 1);
    }

    #[test]
    fn test_uneven_typing_has_spread() {
        let t0 = Instant::now();
        let mut agg = Aggregator::new(t0);

        // Intervals 100, 300
        agg.on_key_down(key("a"), t0);
        agg.on_key_down(key("b"), t0 + ms(100));
        agg.on_key_down(key("c"), t0 + ms(400));
        let sample = agg.emit(t0 + ms(5000), wall());

        assert_eq!(sample.typing.mean_iki_ms, 200.0);
        assert_eq!(sample.typing.variance_iki, 10_000.0);
        assert_eq!(sample.typing.burstiness, 0.5);
    }

    #[test]
    fn test_backspaces_are_counted() {
        let t0 = Instant::now();
        let mut agg = Aggregator::new(t0);

        agg.on_key_down(key("a"), t0);
        agg.on_key_down(key("Backspace"), t0 + ms(50));
        agg.on_key_down(key("Delete"), t0 + ms(100));
        agg.on_key_down(key("b"), t0 + ms(150));
        let sample = agg.emit(t0 + ms(1000), wall());

        assert_eq!(sample.typing.total_keys, 4);
        assert_eq!(sample.typing.backspace_rate, 0.25);
        assert!((0.0..=1.0).contains(&sample.typing.backspace_rate));
    }

    #[test]
    fn test_pointer_distance_and_clicks() {
        let t0 = Instant::now();
        let mut agg = Aggregator::new(t0);

        agg.on_pointer_move(0.0, 0.0, t0);
        agg.on_pointer_move(3.0, 4.0, t0 + ms(10));
        agg.on_pointer_move(6.0, 8.0, t0 + ms(20));
        agg.on_pointer_down(t0 + ms(30));
        agg.on_pointer_down(t0 + ms(40));
        let sample = agg.emit(t0 + ms(4000), wall());

        assert_eq!(sample.mouse.distance_px, 10);
        assert_eq!(sample.mouse.click_rate_per_sec, 0.5);
    }

    #[test]
    fn test_emit_resets_windowed_counters_only() {
        let t0 = Instant::now();
        let mut agg = Aggregator::new(t0);

        agg.on_key_down(key("a"), t0);
        agg.on_key_down(key("Backspace"), t0 + ms(120));
        agg.on_pointer_move(0.0, 0.0, t0 + ms(130));
        agg.on_pointer_move(30.0, 40.0, t0 + ms(140));
        agg.on_pointer_down(t0 + ms(150));

        let before = agg.snapshot();
        agg.emit(t0 + ms(5000), wall());
        let after = agg.snapshot();

        assert_eq!(after.interval_count, 0);
        assert_eq!(after.pointer_distance_px, 0.0);
        assert_eq!(after.clicks, 0);
        assert_eq!(after.total_keys, before.total_keys);
        assert_eq!(after.backspaces, before.backspaces);
    }

    #[test]
    fn test_cumulative_counts_carry_into_next_sample() {
        let t0 = Instant::now();
        let mut agg = Aggregator::new(t0);

        agg.on_key_down(key("Backspace"), t0);
        agg.emit(t0 + ms(5000), wall());
        agg.on_key_down(key("x"), t0 + ms(6000));
        let second = agg.emit(t0 + ms(10_000), wall());

        assert_eq!(second.typing.total_keys, 2);
        assert_eq!(second.typing.backspace_rate, 0.5);
        // The interval spans the window boundary.
        assert_eq!(second.typing.mean_iki_ms, 6000.0);
    }

    #[test]
    fn test_pointer_position_survives_emit() {
        let t0 = Instant::now();
        let mut agg = Aggregator::new(t0);

        agg.on_pointer_move(0.0, 0.0, t0);
        agg.emit(t0 + ms(5000), wall());
        agg.on_pointer_move(0.0, 25.0, t0 + ms(5100));
        let sample = agg.emit(t0 + ms(10_000), wall());

        assert_eq!(sample.mouse.distance_px, 25);
    }

    #[test]
    fn test_quiet_window() {
        let t0 = Instant::now();
        let mut agg = Aggregator::new(t0);

        let sample = agg.emit(t0 + ms(5000), wall());

        assert_eq!(sample.mouse.distance_px, 0);
        assert_eq!(sample.mouse.click_rate_per_sec, 0.0);
        assert_eq!(sample.typing.mean_iki_ms, 0.0);
        assert_eq!(sample.typing.total_keys, 0);
        assert_eq!(sample.idle_time_ms, 5000);
    }

    #[test]
    fn test_idle_time_grows_without_input() {
        let t0 = Instant::now();
        let mut agg = Aggregator::new(t0);

        agg.on_pointer_down(t0 + ms(1000));
        let first = agg.emit(t0 + ms(5000), wall());
        let second = agg.emit(t0 + ms(10_000), wall());
        let third = agg.emit(t0 + ms(15_000), wall());

        assert_eq!(first.idle_time_ms, 4000);
        assert_eq!(second.idle_time_ms, 9000);
        assert_eq!(third.idle_time_ms, 14_000);
    }

    #[test]
    fn test_zero_elapsed_click_rate() {
        let t0 = Instant::now();
        let mut agg = Aggregator::new(t0);

        agg.on_pointer_down(t0);
        let sample = agg.emit(t0, wall());
        assert_eq!(sample.mouse.click_rate_per_sec, 0.0);
    }

    #[test]
    fn test_handle_dispatches_events() {
        let t0 = Instant::now();
        let mut agg = Aggregator::new(t0);

        agg.handle(&InputEvent::KeyDown {
            key: key("Backspace"),
            at: t0,
        });
        agg.handle(&InputEvent::PointerMove {
            x: 1.0,
            y: 1.0,
            at: t0,
        });
        agg.handle(&InputEvent::PointerDown { at: t0 });

        let snap = agg.snapshot();
        assert_eq!(snap.total_keys, 1);
        assert_eq!(snap.backspaces, 1);
        assert_eq!(snap.clicks, 1);
    }
}

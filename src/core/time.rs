//! Time management for the simulation
//!
//! Both engines operate on seconds since run start (f64). The clock anchors
//! that axis at a UTC start time so logs and reports can carry ISO-8601
//! timestamps, and provides deterministic tick advancement for the
//! geometric contact engine.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Discrete tick axis anchored at a UTC start time.
///
/// Tick 0 lands at `offset_seconds` after the anchor; each tick advances by
/// `step_seconds`. Time never moves backwards.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use dtn_sim_core::SimClock;
///
/// let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
/// let mut clock = SimClock::new(start, 60.0, 0.0, 3600.0);
/// assert_eq!(clock.current_tick(), 0);
/// assert_eq!(clock.current_seconds(), 0.0);
///
/// clock.advance_tick();
/// assert_eq!(clock.current_seconds(), 60.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimClock {
    /// Wall-clock anchor for t = 0
    start: DateTime<Utc>,
    /// Seconds per tick
    step_seconds: f64,
    /// Seconds of simulated time skipped before tick 0
    offset_seconds: f64,
    /// Simulation end, in seconds since the anchor
    end_seconds: f64,
    /// Ticks elapsed since tick 0
    current_tick: usize,
}

impl SimClock {
    /// Create a new clock.
    ///
    /// # Panics
    /// Panics if `step_seconds` is not strictly positive.
    pub fn new(
        start: DateTime<Utc>,
        step_seconds: f64,
        offset_seconds: f64,
        end_seconds: f64,
    ) -> Self {
        assert!(step_seconds > 0.0, "step_seconds must be positive");
        Self {
            start,
            step_seconds,
            offset_seconds,
            end_seconds,
            current_tick: 0,
        }
    }

    /// Advance time by one tick.
    pub fn advance_tick(&mut self) {
        self.current_tick += 1;
    }

    /// Ticks elapsed since tick 0.
    pub fn current_tick(&self) -> usize {
        self.current_tick
    }

    /// Simulated seconds at a given tick.
    pub fn seconds_at(&self, tick: usize) -> f64 {
        self.offset_seconds + tick as f64 * self.step_seconds
    }

    /// Simulated seconds at the current tick.
    pub fn current_seconds(&self) -> f64 {
        self.seconds_at(self.current_tick)
    }

    /// True once the current tick falls past the simulation end.
    pub fn is_exhausted(&self) -> bool {
        self.current_seconds() > self.end_seconds
    }

    /// True when the horizon leaves no tick to execute (empty run).
    pub fn is_empty(&self) -> bool {
        self.offset_seconds >= self.end_seconds
    }

    /// Seconds per tick.
    pub fn step_seconds(&self) -> f64 {
        self.step_seconds
    }

    /// Simulation end in seconds since the anchor.
    pub fn end_seconds(&self) -> f64 {
        self.end_seconds
    }

    /// Wall-clock anchor for t = 0.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Wall-clock time for a point on the seconds axis.
    pub fn datetime_at(&self, seconds: f64) -> DateTime<Utc> {
        self.start + Duration::milliseconds((seconds * 1000.0).round() as i64)
    }

    /// ISO-8601 timestamp for a point on the seconds axis.
    pub fn iso_at(&self, seconds: f64) -> String {
        self.datetime_at(seconds)
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

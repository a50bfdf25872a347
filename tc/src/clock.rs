//! Global time base and the signals published from it

use std::f64::consts::TAU;
use std::time::Duration;

use tickproto::NamedValues;

/// Seconds between ticks when a topology names none
pub const DEFAULT_TARGET_INTERVAL: f64 = 0.1;

/// Time index and tick interval, both in seconds
///
/// The time index is kept as `base + steps * interval` so that `k` steps from
/// zero land exactly on `k * interval`; changing the interval rebases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockState {
    base: f64,
    steps: u64,
    target_interval: f64,
}

impl ClockState {
    pub fn new(target_interval: f64) -> Self {
        Self {
            base: 0.0,
            steps: 0,
            target_interval,
        }
    }

    pub fn time_index(&self) -> f64 {
        self.base + self.steps as f64 * self.target_interval
    }

    pub fn target_interval(&self) -> f64 {
        self.target_interval
    }

    pub fn set_target_interval(&mut self, interval: f64) {
        self.base = self.time_index();
        self.steps = 0;
        self.target_interval = interval;
    }

    pub fn advance(&mut self) {
        self.steps += 1;
    }

    /// How long to sleep between ticks
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.target_interval.max(0.0))
    }
}

/// The global signal file contents at time `t`
pub fn global_signals(t: f64) -> NamedValues {
    [
        ("sin1hz", (TAU * t).sin()),
        ("sin10hz", (10.0 * TAU * t).sin()),
        ("cos1hz", (TAU * t).cos()),
        ("cos10hz", (10.0 * TAU * t).cos()),
    ]
    .into_iter()
    .collect()
}

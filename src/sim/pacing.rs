//! Throttling simulation steps against the display refresh rate.

use std::time::Duration;

/// Time-accumulator throttle.
///
/// Every display refresh adds its elapsed time; once the total reaches the minimum
/// interval, one step is due and the accumulator starts again from zero. At most one
/// step is ever due per refresh, slow frames are not caught up.
#[derive(Debug)]
pub struct PacedLoop {
    min_interval: Duration,
    accumulated: Duration,
}

impl PacedLoop {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            accumulated: Duration::ZERO,
        }
    }

    /// Record `elapsed` and report whether a step should run on this refresh.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        self.accumulated += elapsed;
        if self.accumulated >= self.min_interval {
            self.accumulated = Duration::ZERO;
            true
        } else {
            false
        }
    }

    /// Time left until the next step is due
    pub fn remaining(&self) -> Duration {
        self.min_interval.saturating_sub(self.accumulated)
    }

    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Wall-clock time between consecutive refresh callbacks.
#[derive(Debug, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time since the previous call. The first call returns zero.
    pub fn elapsed(&mut self) -> Duration {
        self.elapsed_at(now_ms())
    }

    fn elapsed_at(&mut self, now: f64) -> Duration {
        let elapsed = match self.last_ms {
            Some(last) => Duration::from_secs_f64(((now - last) / 1000.0).max(0.0)),
            None => Duration::ZERO,
        };
        self.last_ms = Some(now);
        elapsed
    }
}

#[cfg(target_arch = "wasm32")]
fn now_ms() -> f64 {
    js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
fn now_ms() -> f64 {
    use std::{sync::OnceLock, time::Instant};

    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_secs_f64() * 1000.0
}

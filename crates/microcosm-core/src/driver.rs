//! Fixed-timestep pacing for interactive front ends.
//!
//! The world advances in discrete ticks; a renderer runs on wall-clock
//! time. `FixedStepDriver` converts elapsed real time into a whole number
//! of ticks to run, carrying the fractional remainder forward so the
//! simulation rate stays exact over time regardless of frame jitter.

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct FixedStepDriver {
    step: Duration,
    accumulator: Duration,
    max_catchup: u32,
}

impl FixedStepDriver {
    /// Default cap on ticks returned per call. Past this the backlog is
    /// dropped rather than spiraling after a stall.
    pub const DEFAULT_MAX_CATCHUP: u32 = 8;

    pub fn new(step: Duration) -> Self {
        Self::with_max_catchup(step, Self::DEFAULT_MAX_CATCHUP)
    }

    pub fn with_max_catchup(step: Duration, max_catchup: u32) -> Self {
        assert!(!step.is_zero(), "step duration must be positive");
        assert!(max_catchup > 0, "max_catchup must be positive");
        Self {
            step,
            accumulator: Duration::ZERO,
            max_catchup,
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Banks `elapsed` and returns how many ticks to run now. If the bank
    /// covers more than `max_catchup` ticks, the excess is discarded and
    /// simulated time falls behind wall time instead of freezing the frame.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulator = self.accumulator.saturating_add(elapsed);
        let mut ticks = 0;
        while self.accumulator >= self.step && ticks < self.max_catchup {
            self.accumulator -= self.step;
            ticks += 1;
        }
        if self.accumulator >= self.step {
            self.accumulator = Duration::ZERO;
        }
        ticks
    }

    /// Fraction of the next tick already banked, in `[0, 1)`. Useful for
    /// render-side interpolation.
    pub fn alpha(&self) -> f64 {
        self.accumulator.as_secs_f64() / self.step.as_secs_f64()
    }
}

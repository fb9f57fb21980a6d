//! Wall-clock timing for step runs.

use std::time::{Duration, Instant};
use tracing::trace;

/// Measures one step run from task start to completion.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    step: String,
}

impl SpanTimer {
    /// Starts timing the named step.
    #[must_use]
    pub fn start(step: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            step: step.into(),
        }
    }

    /// Returns the time elapsed so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Returns the step being timed.
    #[must_use]
    pub fn step(&self) -> &str {
        &self.step
    }

    /// Stops the timer and returns the elapsed milliseconds.
    #[must_use]
    pub fn finish(self) -> f64 {
        let ms = self.elapsed().as_secs_f64() * 1000.0;
        trace!(step = %self.step, duration_ms = ms, "Step timer stopped");
        ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reports_elapsed_millis() {
        let timer = SpanTimer::start("lengths");
        assert_eq!(timer.step(), "lengths");
        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.elapsed() >= Duration::from_millis(10));
        assert!(timer.finish() >= 10.0);
    }
}

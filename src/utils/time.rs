use std::fmt;
use std::time::{Duration, Instant};

/// Tracks wall-clock time since the first task of a compilation burst.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stopwatch {
    started: Option<Instant>,
    stopped: Option<Instant>,
}

impl Stopwatch {
    /// Starts the watch unless it is already running.
    pub fn start(&mut self) {
        if self.started.is_none() || self.stopped.is_some() {
            self.started = Some(Instant::now());
            self.stopped = None;
        }
    }

    /// Freezes the elapsed time.
    pub fn stop(&mut self) {
        if self.started.is_some() && self.stopped.is_none() {
            self.stopped = Some(Instant::now());
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        match (self.started, self.stopped) {
            (Some(start), Some(stop)) => stop - start,
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }
}

/// Linear time estimate for `total` units given `done` took `elapsed`.
#[must_use]
pub fn estimate_total(elapsed: Duration, done: u64, total: u64) -> Duration {
    if done == 0 || total <= done {
        return elapsed;
    }
    elapsed.mul_f64(total as f64 / done as f64)
}

/// `hh:mm:ss` rendering of a duration.
#[derive(Debug, Clone, Copy)]
pub struct Hms(pub Duration);

impl fmt::Display for Hms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        write!(f, "{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
    }
}

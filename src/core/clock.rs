//! Run timer

use std::fmt;

/// Timer collaborator measuring the time between start and finish lines.
pub trait RunTimer: fmt::Debug {
    /// Start (or resume) accumulating time
    fn start(&mut self);

    /// Stop accumulating; elapsed time is kept
    fn stop(&mut self);

    /// Advance by one simulation step
    fn tick(&mut self, dt: f32);

    /// Accumulated seconds
    fn elapsed(&self) -> f32;

    fn is_running(&self) -> bool;
}

/// Simulation-time clock driven by the fixed tick.
///
/// One instance is owned by each agent; there is no process-wide timer.
#[derive(Debug, Clone, Default)]
pub struct RunClock {
    running: bool,
    elapsed: f32,
}

impl RunClock {
    /// Create a stopped clock at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole minutes and remaining whole seconds
    #[must_use]
    pub fn minutes_seconds(&self) -> (u32, u32) {
        minutes_seconds(self.elapsed)
    }
}

fn minutes_seconds(seconds: f32) -> (u32, u32) {
    let total = seconds.max(0.0).floor() as u32;
    (total / 60, total % 60)
}

/// `Time: MM:SS` label for a number of seconds, as shown by [`RunClock`]
#[must_use]
pub fn elapsed_label(seconds: f32) -> String {
    let (mins, secs) = minutes_seconds(seconds);
    format!("Time: {mins:02}:{secs:02}")
}

impl RunTimer for RunClock {
    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn tick(&mut self, dt: f32) {
        if self.running {
            self.elapsed += dt;
        }
    }

    fn elapsed(&self) -> f32 {
        self.elapsed
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

impl fmt::Display for RunClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&elapsed_label(self.elapsed))
    }
}

//! Wall-clock timing for a run

use std::time::{Duration, Instant};

/// Measures how long a run took.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    started: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

/// Render seconds with two decimals, e.g. `0.05`.
pub fn format_secs(secs: f64) -> String {
    format!("{secs:.2}")
}

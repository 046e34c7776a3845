use std::time::{Duration, Instant};

use log::info;

/// Accumulated refresh timings, attached to a sensor and reset on demand.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RefreshProfile {
    pub fetch_time: Duration,
    pub step_time: Duration,
    pub total_time: Duration,

    /// Refreshes that found at least one stale instance.
    pub refresh_count: usize,
    pub instances_refreshed: usize,
}

impl RefreshProfile {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// One-line summary of the refresh counters.
    pub fn summary(&self) -> String {
        format!(
            "contact sensor: {} refreshes, {} instance updates, {:.2} ms total",
            self.refresh_count,
            self.instances_refreshed,
            self.total_time.as_secs_f32() * 1000.0
        )
    }

    pub fn report(&self) {
        let total_us = self.total_time.as_micros() as f32;
        if total_us < 1.0 {
            return;
        }

        info!("{}", self.summary());
        for (stage, time) in [("fetch", self.fetch_time), ("step", self.step_time)] {
            info!(
                "  {stage:<5}: {:.2} ms ({:.1}%)",
                time.as_secs_f32() * 1000.0,
                (time.as_micros() as f32 / total_us) * 100.0
            );
        }
    }
}

/// Runs `work` and adds its wall-clock time to `total`.
pub fn timed<T>(total: &mut Duration, work: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let output = work();
    *total += start.elapsed();
    output
}

use log::{Level, log_enabled, warn};
use std::time::{Duration, Instant};

/// Traces one refresh stage and how many instances it touched.
pub struct StageTrace {
    stage: &'static str,
    instances: usize,
    start: Option<Instant>,
}

impl StageTrace {
    pub fn new(stage: &'static str, instances: usize) -> Self {
        let start = log_enabled!(Level::Trace).then(|| {
            log::trace!("contact sensor {stage}: {instances} instance(s)");
            Instant::now()
        });
        Self {
            stage,
            instances,
            start,
        }
    }
}

impl Drop for StageTrace {
    fn drop(&mut self) {
        if let Some(start) = self.start {
            log::trace!(
                "contact sensor {} finished for {} instance(s) in {} µs",
                self.stage,
                self.instances,
                start.elapsed().as_micros()
            );
        }
    }
}

/// Warns when a sensor refresh took longer than the caller's budget.
///
/// Returns whether the budget was exceeded.
pub fn warn_if_refresh_budget_exceeded(duration: Duration, budget_ms: f32) -> bool {
    let elapsed_ms = duration.as_secs_f32() * 1000.0;
    if elapsed_ms > budget_ms {
        warn!("Contact sensor refresh exceeded budget: {elapsed_ms:.2} ms > {budget_ms:.2} ms");
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_check_compares_milliseconds() {
        assert!(warn_if_refresh_budget_exceeded(Duration::from_millis(5), 2.0));
        assert!(!warn_if_refresh_budget_exceeded(Duration::from_micros(500), 2.0));
    }

    #[test]
    fn stage_trace_skips_clock_without_trace_logging() {
        let trace = StageTrace::new("fetch", 3);
        assert_eq!(trace.start.is_some(), log_enabled!(Level::Trace));
        assert_eq!(trace.instances, 3);
    }
}

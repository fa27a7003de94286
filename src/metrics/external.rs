use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Register the metrics for the application
pub(super) fn register_metrics() {
    // Count of failed external requests. Should be labeled with the target.
    describe_counter!(
        "external_request_failures_total",
        "Total number of failed external requests"
    );

    // Latency of external requests in seconds, labeled by the target.
    describe_histogram!(
        "external_request_duration_seconds",
        "Duration of external requests in seconds"
    );
}

/// Record an external request failure for a given target
pub fn record_external_request_failure(target: Target) {
    counter!("external_request_failures_total", "target" => target.to_string()).increment(1);
}

/// Create a timer for an external request to a given target
pub fn external_request_timer(target: Target) -> Timer {
    Timer {
        start_time: Instant::now(),
        target,
    }
}

pub struct Timer {
    start_time: Instant,
    target: Target,
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start_time.elapsed().as_secs_f64();

        histogram!("external_request_duration_seconds", "target" => self.target.to_string())
            .record(duration);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Target {
    BetterStack,
    Slack,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::BetterStack => write!(f, "betterstack"),
            Target::Slack => write!(f, "slack"),
        }
    }
}

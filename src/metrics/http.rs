use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Register the metrics for the application
pub(super) fn register_metrics() {
    // Number of HTTP requests
    describe_counter!(
        "http_requests_total",
        "Total number of HTTP requests per endpoint"
    );

    // Latency of serving HTTP requests per endpoint
    describe_histogram!(
        "http_request_duration_seconds",
        "Duration of HTTP requests in seconds per endpoint"
    );
}

/// Record an HTTP request for a given endpoint
pub fn record_http_request(endpoint: &'static str) {
    counter!("http_requests_total", "endpoint" => endpoint).increment(1);
}

/// Create a timer for an HTTP request to a given endpoint
pub fn http_request_timer(endpoint: &'static str) -> Timer {
    Timer {
        start_time: Instant::now(),
        endpoint,
    }
}

pub struct Timer {
    start_time: Instant,
    endpoint: &'static str,
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start_time.elapsed().as_secs_f64();

        histogram!("http_request_duration_seconds", "endpoint" => self.endpoint).record(duration);
    }
}

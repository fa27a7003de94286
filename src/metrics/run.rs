use crate::metrics::Status;
use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Register the metrics for the application
pub(super) fn register_metrics() {
    // Count of pipeline runs. Should be labeled with the status (success or failure).
    describe_counter!("runs_total", "Total number of notification runs");

    // Monitors returned by the monitor API during the last run.
    describe_gauge!(
        "monitors_fetched",
        "Number of monitors fetched during the last run"
    );

    // Monitors per environment during the last run. Should be labeled with the environment.
    describe_gauge!(
        "environment_monitors",
        "Number of monitors classified into an environment"
    );

    // Down monitors per environment during the last run. Should be labeled with the environment.
    describe_gauge!(
        "environment_down_monitors",
        "Number of down monitors in an environment"
    );

    // Messages dispatched. Should be labeled with the environment, kind and status.
    describe_counter!(
        "notifications_total",
        "Total number of notification messages dispatched"
    );

    // All-clear notifications held back by the throttle. Should be labeled with the environment.
    describe_counter!(
        "notifications_suppressed_total",
        "Total number of all-clear notifications suppressed by the throttle"
    );

    // Timestamp of the last successful run
    describe_gauge!(
        "last_successful_run_timestamp",
        "Timestamp of the last successful notification run"
    );
}

/// Record a run with the given status
pub fn record_run(status: Status) {
    counter!("runs_total", "status" => status.to_string()).increment(1);
}

/// Record the timestamp of the last successful run
pub fn record_successful_run() {
    let timestamp = chrono::Utc::now().timestamp() as f64;

    gauge!("last_successful_run_timestamp").set(timestamp);
}

/// Record the number of monitors fetched
pub fn record_monitors_fetched(count: usize) {
    gauge!("monitors_fetched").set(count as f64);
}

/// Record the size of an environment bucket and how many of its monitors are down
pub fn record_environment(environment: &str, monitors: usize, down: usize) {
    gauge!("environment_monitors", "environment" => environment.to_string()).set(monitors as f64);
    gauge!("environment_down_monitors", "environment" => environment.to_string()).set(down as f64);
}

/// Record a dispatched message
pub fn record_notification(environment: &str, kind: MessageKind, status: Status) {
    counter!(
        "notifications_total",
        "environment" => environment.to_string(),
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record an all-clear notification held back by the throttle
pub fn record_suppressed(environment: &str) {
    counter!("notifications_suppressed_total", "environment" => environment.to_string())
        .increment(1);
}

#[derive(Debug, Clone, Copy)]
pub enum MessageKind {
    Summary,
    DownList,
    Error,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Summary => write!(f, "summary"),
            MessageKind::DownList => write!(f, "down_list"),
            MessageKind::Error => write!(f, "error"),
        }
    }
}

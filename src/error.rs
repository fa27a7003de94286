use reqwest::StatusCode;
use thiserror::Error;

/// Failure while polling the monitor API. Truncates pagination, never fatal on its own.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to monitor API failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("monitor API returned HTTP {0}")]
    Status(StatusCode),
}

/// Failure while posting a message to a chat webhook.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook returned HTTP {0}")]
    Status(StatusCode),

    #[error("no webhook configured for destination '{0}'")]
    UnknownDestination(String),
}

/// Failure while reading or writing throttle state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("state is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("state backend command failed: {0}")]
    Command(String),
}

/// Run-level failure, reported to the fallback destination.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no monitors could be fetched: {0}")]
    Fetch(#[source] FetchError),
}

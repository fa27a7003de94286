use serde::Deserialize;
use std::fmt;

/// A single uptime monitor as seen during one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    pub id: String,
    pub url: String,
    pub display_name: String,
    pub status: Status,
}

impl Monitor {
    /// Create a new monitor
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        display_name: impl Into<String>,
        status: Status,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            display_name: display_name.into(),
            status,
        }
    }

    pub fn is_down(&self) -> bool {
        self.status == Status::Down
    }
}

/// Health state reported by the monitor API.
///
/// Values the API may add later land in `Other` so they are still counted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "String")]
pub enum Status {
    Up,
    Down,
    Paused,
    Validating,
    Other(String),
}

impl Default for Status {
    fn default() -> Self {
        Status::Other("unknown".to_string())
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        match value.as_str() {
            "up" => Status::Up,
            "down" => Status::Down,
            "paused" => Status::Paused,
            "validating" => Status::Validating,
            _ => Status::Other(value),
        }
    }
}

impl From<&str> for Status {
    fn from(value: &str) -> Self {
        Status::from(value.to_string())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Up => write!(f, "up"),
            Status::Down => write!(f, "down"),
            Status::Paused => write!(f, "paused"),
            Status::Validating => write!(f, "validating"),
            Status::Other(other) => write!(f, "{}", other),
        }
    }
}

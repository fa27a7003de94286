use crate::monitor::{Monitor, Status};
use std::collections::BTreeMap;

/// Health counts for one environment bucket
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusAggregate {
    pub total: usize,
    pub counts: BTreeMap<Status, usize>,
    /// Monitors reporting `down`, in input order
    pub down: Vec<Monitor>,
}

impl StatusAggregate {
    pub fn count(&self, status: &Status) -> usize {
        self.counts.get(status).copied().unwrap_or(0)
    }

    /// Share of `up` monitors rounded to one decimal, `None` for an empty bucket
    pub fn uptime_percentage(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }

        let percentage = self.count(&Status::Up) as f64 / self.total as f64 * 100.0;
        Some((percentage * 10.0).round() / 10.0)
    }

    pub fn has_alerts(&self) -> bool {
        !self.down.is_empty()
    }

    /// Counts for statuses outside up/down/paused/validating
    pub fn other_counts(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().filter_map(|(status, count)| match status {
            Status::Other(name) => Some((name.as_str(), *count)),
            _ => None,
        })
    }
}

pub fn aggregate(bucket: &[Monitor]) -> StatusAggregate {
    let mut aggregate = StatusAggregate {
        total: bucket.len(),
        ..Default::default()
    };

    for monitor in bucket {
        *aggregate.counts.entry(monitor.status.clone()).or_insert(0) += 1;

        if monitor.is_down() {
            aggregate.down.push(monitor.clone());
        }
    }

    aggregate
}

//! Suppression of repeated "all clear" notifications.
//!
//! An environment without down monitors is only announced once per interval.
//! Incidents never go through here. Storage failures fail open: an unreadable
//! state means the notification goes out, a failed write is logged and ignored.

use crate::state::StateStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Persisted per environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleState {
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub last_notification_time: i64,
}

pub struct Throttle {
    store: Arc<dyn StateStore>,
    interval: Duration,
}

impl Throttle {
    pub fn new(store: Arc<dyn StateStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub async fn should_notify(&self, environment: &str) -> bool {
        self.should_notify_at(environment, Utc::now()).await
    }

    /// Whether an all-clear notification for `environment` may be sent at `now`
    #[tracing::instrument(skip(self, now))]
    pub async fn should_notify_at(&self, environment: &str, now: DateTime<Utc>) -> bool {
        let Some(state) = self.load(environment).await else {
            return true;
        };

        let Some(elapsed) = now
            .timestamp_millis()
            .checked_sub(state.last_notification_time)
        else {
            tracing::warn!("Ignoring out of range state for {}", environment);
            return true;
        };

        let interval = i64::try_from(self.interval.as_millis()).unwrap_or(i64::MAX);
        if elapsed >= interval {
            return true;
        }

        tracing::info!(
            "Skipping {} no-alert notification (last sent {:.1}h ago)",
            environment,
            elapsed as f64 / 3_600_000.0
        );

        false
    }

    pub async fn record_sent(&self, environment: &str) {
        self.record_sent_at(environment, Utc::now()).await
    }

    /// Remember that an all-clear notification for `environment` went out at `now`
    #[tracing::instrument(skip(self, now))]
    pub async fn record_sent_at(&self, environment: &str, now: DateTime<Utc>) {
        let state = ThrottleState {
            last_notification_time: now.timestamp_millis(),
        };

        let value = match serde_json::to_value(state) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize state for {}: {}", environment, e);
                return;
            }
        };

        if let Err(e) = self.store.set(environment, &value).await {
            tracing::error!("Failed to update state for {}: {}", environment, e);
        }
    }

    async fn load(&self, environment: &str) -> Option<ThrottleState> {
        let value = match self.store.get(environment).await {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("No readable state for {}: {}", environment, e);
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!("Ignoring malformed state for {}: {}", environment, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::StateError, state::MockStateStore};
    use chrono::TimeDelta;
    use serde_json::json;
    use std::sync::Mutex;

    /// Keeps the last written value so reads see earlier writes
    fn recording_store() -> MockStateStore {
        let stored = Arc::new(Mutex::new(None::<serde_json::Value>));
        let mut store = MockStateStore::new();

        let reader = stored.clone();
        store
            .expect_get()
            .returning(move |_| Ok(reader.lock().unwrap().clone()));
        store.expect_set().returning(move |_, value| {
            *stored.lock().unwrap() = Some(value.clone());
            Ok(())
        });

        store
    }

    #[tokio::test]
    async fn cold_start_notifies() {
        let mut store = MockStateStore::new();
        store.expect_get().returning(|_| Ok(None));

        let throttle = Throttle::new(Arc::new(store), DEFAULT_INTERVAL);

        assert!(throttle.should_notify("staging").await);
    }

    #[tokio::test]
    async fn suppresses_within_interval_and_notifies_after() {
        let throttle = Throttle::new(Arc::new(recording_store()), DEFAULT_INTERVAL);
        let start = Utc::now();

        assert!(throttle.should_notify_at("staging", start).await);
        throttle.record_sent_at("staging", start).await;

        let later = start + TimeDelta::hours(23);
        assert!(!throttle.should_notify_at("staging", later).await);

        let next_day = start + TimeDelta::hours(24);
        assert!(throttle.should_notify_at("staging", next_day).await);
    }

    #[tokio::test]
    async fn reads_state_written_by_earlier_deployments() {
        let now = Utc::now();
        let one_hour_ago = (now - TimeDelta::hours(1)).timestamp_millis();

        let mut store = MockStateStore::new();
        store
            .expect_get()
            .withf(|key| key == "production")
            .returning(move |_| Ok(Some(json!({ "lastNotificationTime": one_hour_ago }))));

        let throttle = Throttle::new(Arc::new(store), DEFAULT_INTERVAL);

        assert!(!throttle.should_notify_at("production", now).await);
    }

    #[tokio::test]
    async fn record_without_timestamp_is_eligible() {
        let mut store = MockStateStore::new();
        store.expect_get().returning(|_| Ok(Some(json!({}))));

        let throttle = Throttle::new(Arc::new(store), DEFAULT_INTERVAL);

        assert!(throttle.should_notify("staging").await);
    }

    #[tokio::test]
    async fn read_failure_fails_open() {
        let mut store = MockStateStore::new();
        store
            .expect_get()
            .returning(|_| Err(StateError::Command("forbidden".to_string())));

        let throttle = Throttle::new(Arc::new(store), DEFAULT_INTERVAL);

        assert!(throttle.should_notify("staging").await);
    }

    #[tokio::test]
    async fn malformed_state_fails_open() {
        let mut store = MockStateStore::new();
        store
            .expect_get()
            .returning(|_| Ok(Some(json!({ "lastNotificationTime": "yesterday" }))));

        let throttle = Throttle::new(Arc::new(store), DEFAULT_INTERVAL);

        assert!(throttle.should_notify("staging").await);
    }

    #[tokio::test]
    async fn out_of_range_timestamp_fails_open() {
        let mut store = MockStateStore::new();
        store
            .expect_get()
            .returning(|_| Ok(Some(json!({ "lastNotificationTime": i64::MIN }))));

        let throttle = Throttle::new(Arc::new(store), DEFAULT_INTERVAL);

        assert!(throttle.should_notify("staging").await);
    }

    #[tokio::test]
    async fn huge_interval_keeps_suppressing() {
        let throttle = Throttle::new(Arc::new(recording_store()), Duration::from_secs(u64::MAX));
        let start = Utc::now();

        throttle.record_sent_at("staging", start).await;

        let much_later = start + TimeDelta::days(365 * 100);
        assert!(!throttle.should_notify_at("staging", much_later).await);
    }

    #[tokio::test]
    async fn write_failure_is_swallowed() {
        let mut store = MockStateStore::new();
        store
            .expect_set()
            .times(1)
            .returning(|_, _| Err(StateError::Command("forbidden".to_string())));

        let throttle = Throttle::new(Arc::new(store), DEFAULT_INTERVAL);

        throttle.record_sent("staging").await;
    }

    #[tokio::test]
    async fn writes_epoch_millis() {
        let now = Utc::now();
        let expected = json!({ "lastNotificationTime": now.timestamp_millis() });

        let mut store = MockStateStore::new();
        store
            .expect_set()
            .withf(move |key, value| key == "staging" && *value == expected)
            .times(1)
            .returning(|_, _| Ok(()));

        let throttle = Throttle::new(Arc::new(store), DEFAULT_INTERVAL);

        throttle.record_sent_at("staging", now).await;
    }
}

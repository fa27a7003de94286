//! Key/value persistence for throttle state.

use crate::{config::State as StateConfig, config::StateBackend, error::StateError};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;

pub mod configmap;
pub mod file;

pub use configmap::ConfigMapStore;
pub use file::FileStore;

/// Stores one JSON document per key.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the document stored under `key`, `None` when nothing was stored yet.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StateError>;

    /// Replace the document stored under `key`.
    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), StateError>;
}

/// Build the store selected by the configuration
pub fn from_config(config: &StateConfig) -> Arc<dyn StateStore> {
    match config.backend {
        StateBackend::ConfigMap => {
            tracing::info!(
                "Using ConfigMap {}/{} for notification state",
                config.namespace,
                config.name
            );
            Arc::new(ConfigMapStore::new(&config.namespace, &config.name))
        }
        StateBackend::File | StateBackend::Auto => {
            tracing::info!(
                "Using directory {} for notification state",
                config.directory.display()
            );
            Arc::new(FileStore::new(&config.directory))
        }
    }
}

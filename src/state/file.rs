use super::StateStore;
use crate::error::StateError;
use async_trait::async_trait;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// One pretty-printed JSON file per key, named `betterstack-<key>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("betterstack-{}.json", key))
    }
}

#[async_trait]
impl StateStore for FileStore {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StateError> {
        let content = match tokio::fs::read_to_string(self.path(key)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&content)?))
    }

    #[tracing::instrument(skip(self, value), level = "debug")]
    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), StateError> {
        let content = serde_json::to_string_pretty(value)?;
        tokio::fs::write(self.path(key), content).await?;

        Ok(())
    }
}

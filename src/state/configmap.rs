use super::StateStore;
use crate::error::StateError;
use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;

/// Keys stored as entries of a Kubernetes ConfigMap, accessed through `kubectl`
#[derive(Debug, Clone)]
pub struct ConfigMapStore {
    namespace: String,
    name: String,
    kubectl: String,
}

impl ConfigMapStore {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            kubectl: "kubectl".to_string(),
        }
    }

    /// Use a different `kubectl` binary
    pub fn with_kubectl(mut self, kubectl: impl Into<String>) -> Self {
        self.kubectl = kubectl.into();
        self
    }

    fn get_args(&self, key: &str) -> Vec<String> {
        vec![
            "get".to_string(),
            "configmap".to_string(),
            self.name.clone(),
            "-n".to_string(),
            self.namespace.clone(),
            "-o".to_string(),
            format!("jsonpath={{.data.{}}}", key),
        ]
    }

    fn patch_args(&self, key: &str, value: &serde_json::Value) -> Vec<String> {
        let patch = json!({ "data": { key: value.to_string() } });

        vec![
            "patch".to_string(),
            "configmap".to_string(),
            self.name.clone(),
            "-n".to_string(),
            self.namespace.clone(),
            "--type".to_string(),
            "merge".to_string(),
            "-p".to_string(),
            patch.to_string(),
        ]
    }

    async fn kubectl(&self, args: Vec<String>) -> Result<String, StateError> {
        let output = Command::new(&self.kubectl).args(args).output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StateError::Command(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl StateStore for ConfigMapStore {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StateError> {
        let data = self.kubectl(self.get_args(key)).await?;

        if data.is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&data)?))
    }

    #[tracing::instrument(skip(self, value), level = "debug")]
    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), StateError> {
        self.kubectl(self.patch_args(key, value)).await?;

        Ok(())
    }
}

use crate::error::ConfigError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Persisted provider-scoped configuration, keyed by
/// `(provider, requirement)`.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Returns `Ok(None)` when nothing is stored under the key.
    async fn load(&self, provider: &str, requirement: &str) -> Result<Option<serde_json::Value>, ConfigError>;

    async fn save(&self, provider: &str, requirement: &str, value: serde_json::Value) -> Result<(), ConfigError>;
}

/// In-memory store, mostly for tests and embedding.
#[derive(Default)]
pub struct MemoryConfigStore {
    entries: RwLock<HashMap<(String, String), serde_json::Value>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, usable before the store is shared.
    pub fn with(mut self, provider: &str, requirement: &str, value: serde_json::Value) -> Self {
        self.entries
            .get_mut()
            .insert((provider.to_string(), requirement.to_string()), value);
        self
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self, provider: &str, requirement: &str) -> Result<Option<serde_json::Value>, ConfigError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&(provider.to_string(), requirement.to_string()))
            .cloned())
    }

    async fn save(&self, provider: &str, requirement: &str, value: serde_json::Value) -> Result<(), ConfigError> {
        let mut entries = self.entries.write().await;
        entries.insert((provider.to_string(), requirement.to_string()), value);
        Ok(())
    }
}

/// Stores each requirement as `<root>/<provider>/<requirement>.json`.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    root: PathBuf,
}

impl FileConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, provider: &str, requirement: &str) -> PathBuf {
        self.root.join(provider).join(format!("{}.json", requirement))
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load(&self, provider: &str, requirement: &str) -> Result<Option<serde_json::Value>, ConfigError> {
        let path = self.path_for(provider, requirement);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ConfigError::Unavailable {
                    provider: provider.to_string(),
                    requirement: requirement.to_string(),
                    reason: format!("{}: {}", path.display(), e),
                })
            }
        };

        tracing::debug!("Loaded {} bytes of config from {}", raw.len(), path.display());
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| ConfigError::Malformed {
                provider: provider.to_string(),
                requirement: requirement.to_string(),
                reason: e.to_string(),
            })
    }

    async fn save(&self, provider: &str, requirement: &str, value: serde_json::Value) -> Result<(), ConfigError> {
        let path = self.path_for(provider, requirement);
        let unavailable = |e: std::io::Error| ConfigError::Unavailable {
            provider: provider.to_string(),
            requirement: requirement.to_string(),
            reason: format!("{}: {}", path.display(), e),
        };

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(&unavailable)?;
        }
        let raw = serde_json::to_vec_pretty(&value).map_err(|e| ConfigError::Malformed {
            provider: provider.to_string(),
            requirement: requirement.to_string(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(&path, raw).await.map_err(&unavailable)
    }
}

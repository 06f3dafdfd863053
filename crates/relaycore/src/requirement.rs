//! Provider requirements: named configuration or credentials a provider
//! needs before its actions can run.

use crate::error::ConfigError;
use crate::store::ConfigStore;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[async_trait]
pub trait Requirement: Send + Sync {
    fn name(&self) -> &str;

    /// Record the owning provider. Called once by the provider on add.
    fn init(&self, provider_name: &str);

    fn provider_name(&self) -> Option<&str>;

    /// Load configuration for `(provider, name)` from `store`. Calls after a
    /// successful load are no-ops.
    async fn load_config(&self, store: &dyn ConfigStore) -> Result<(), ConfigError>;

    fn is_loaded(&self) -> bool;
}

/// A requirement whose configuration deserializes into `C`.
///
/// Share it with handlers through an `Arc` and read the loaded value with
/// [`get`](Self::get).
pub struct ConfigRequirement<C> {
    name: String,
    provider: OnceLock<String>,
    config: OnceLock<C>,
    default: Option<C>,
}

impl<C> ConfigRequirement<C>
where
    C: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: OnceLock::new(),
            config: OnceLock::new(),
            default: None,
        }
    }

    /// Use `default` when the store holds nothing for this requirement.
    pub fn with_default(name: impl Into<String>, default: C) -> Self {
        Self {
            default: Some(default),
            ..Self::new(name)
        }
    }

    pub fn config(&self) -> Option<&C> {
        self.config.get()
    }

    /// The loaded configuration, or an error naming what is missing.
    pub fn get(&self) -> Result<&C, ConfigError> {
        self.config.get().ok_or_else(|| match self.provider.get() {
            Some(provider) => ConfigError::Missing {
                provider: provider.clone(),
                requirement: self.name.clone(),
            },
            None => ConfigError::Uninitialized {
                requirement: self.name.clone(),
            },
        })
    }
}

#[async_trait]
impl<C> Requirement for ConfigRequirement<C>
where
    C: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self, provider_name: &str) {
        if let Err(name) = self.provider.set(provider_name.to_string()) {
            tracing::warn!(
                "Requirement {} already belongs to {:?}, ignoring {}",
                self.name,
                self.provider.get(),
                name
            );
        }
    }

    fn provider_name(&self) -> Option<&str> {
        self.provider.get().map(String::as_str)
    }

    async fn load_config(&self, store: &dyn ConfigStore) -> Result<(), ConfigError> {
        if self.config.get().is_some() {
            return Ok(());
        }
        let provider = self.provider.get().ok_or_else(|| ConfigError::Uninitialized {
            requirement: self.name.clone(),
        })?;

        let config = match store.load(provider, &self.name).await? {
            Some(value) => serde_json::from_value::<C>(value).map_err(|e| ConfigError::Malformed {
                provider: provider.clone(),
                requirement: self.name.clone(),
                reason: e.to_string(),
            })?,
            None => self.default.clone().ok_or_else(|| ConfigError::Missing {
                provider: provider.clone(),
                requirement: self.name.clone(),
            })?,
        };

        tracing::debug!("Loaded requirement {}/{}", provider, self.name);
        let _ = self.config.set(config);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.config.get().is_some()
    }
}

/// Client credentials for providers that authenticate with OAuth2.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryConfigStore;
    use serde_json::json;

    #[tokio::test]
    async fn loads_once_from_store() {
        let store = MemoryConfigStore::new().with(
            "slack",
            "oauth",
            json!({ "client_id": "id", "client_secret": "secret" }),
        );
        let req = ConfigRequirement::<OAuthClient>::new("oauth");
        req.init("slack");
        assert!(!req.is_loaded());

        req.load_config(&store).await.unwrap();
        assert_eq!(req.get().unwrap().client_id, "id");
        assert!(req.get().unwrap().scopes.is_empty());

        // a later change in the store is not picked up
        store
            .save("slack", "oauth", json!({ "client_id": "other", "client_secret": "s" }))
            .await
            .unwrap();
        req.load_config(&store).await.unwrap();
        assert_eq!(req.get().unwrap().client_id, "id");
    }

    #[tokio::test]
    async fn uninitialized_requirement_fails() {
        let req = ConfigRequirement::<OAuthClient>::new("oauth");
        let err = req.load_config(&MemoryConfigStore::new()).await.unwrap_err();
        assert_eq!(
            err,
            ConfigError::Uninitialized {
                requirement: "oauth".into()
            }
        );
    }

    #[tokio::test]
    async fn missing_and_malformed_config() {
        let store = MemoryConfigStore::new().with("slack", "oauth", json!({ "client_id": 7 }));

        let missing = ConfigRequirement::<OAuthClient>::new("token");
        missing.init("slack");
        assert!(matches!(
            missing.load_config(&store).await,
            Err(ConfigError::Missing { .. })
        ));

        let malformed = ConfigRequirement::<OAuthClient>::new("oauth");
        malformed.init("slack");
        assert!(matches!(
            malformed.load_config(&store).await,
            Err(ConfigError::Malformed { .. })
        ));
        assert!(!malformed.is_loaded());
    }

    #[tokio::test]
    async fn default_used_when_store_is_empty() {
        let req = ConfigRequirement::with_default("limits", 10u32);
        req.init("time");
        req.load_config(&MemoryConfigStore::new()).await.unwrap();
        assert_eq!(req.get(), Ok(&10));
    }

    #[test]
    fn debug_hides_secret() {
        let client = OAuthClient {
            client_id: "id".into(),
            client_secret: "hunter2".into(),
            scopes: vec![],
        };
        assert!(!format!("{:?}", client).contains("hunter2"));
    }
}

use crate::provider::Provider;
use relaycore::{Binding, ConfigError, ConfigStore, Descriptor, NotFoundError, TypeRegistry};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

/// Catalog of providers, resolving `(provider, group, action)` triples to
/// bindings.
///
/// Build it once at startup through `&mut` access, then share it as
/// `Arc<Registry>`; lookups never mutate and need no locking.
pub struct Registry {
    providers: HashMap<String, Provider>,
    types: Arc<TypeRegistry>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            types: Arc::new(TypeRegistry::new()),
        }
    }

    /// Register a provider. An existing provider with the same name is
    /// replaced.
    pub fn add_provider(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        icon: impl Into<Vec<u8>>,
    ) -> relaycore::Result<&mut Provider> {
        let descriptor = Descriptor::new(name, description, icon);
        descriptor.validate("Provider")?;
        let provider = Provider::new(descriptor, Arc::clone(&self.types));

        match self.providers.entry(provider.name().to_string()) {
            Entry::Occupied(mut slot) => {
                tracing::warn!("Replacing provider {}", provider.name());
                slot.insert(provider);
                Ok(slot.into_mut())
            }
            Entry::Vacant(slot) => {
                tracing::info!("Registering provider: {}", provider.name());
                Ok(slot.insert(provider))
            }
        }
    }

    pub fn provider(&self, name: &str) -> Option<&Provider> {
        self.providers.get(name)
    }

    pub fn provider_mut(&mut self, name: &str) -> Option<&mut Provider> {
        self.providers.get_mut(name)
    }

    /// All providers, in no particular order.
    pub fn providers(&self) -> Vec<&Provider> {
        self.providers.values().collect()
    }

    /// Resolve a binding, naming the missing level on failure.
    pub fn get_action(&self, provider: &str, group: &str, action: &str) -> Result<Arc<Binding>, NotFoundError> {
        let p = self.providers.get(provider).ok_or_else(|| NotFoundError::Provider {
            provider: provider.to_string(),
        })?;
        let g = p.group(group).ok_or_else(|| NotFoundError::Group {
            provider: provider.to_string(),
            group: group.to_string(),
        })?;
        g.action(action).cloned().ok_or_else(|| NotFoundError::Action {
            provider: provider.to_string(),
            group: group.to_string(),
            action: action.to_string(),
        })
    }

    /// Load requirement configuration for every provider, in name order.
    /// Stops at the first failure; providers after it stay unavailable and
    /// the caller is expected to abort startup.
    pub async fn load_provider_configs(&self, store: &dyn ConfigStore) -> Result<(), ConfigError> {
        let mut providers: Vec<&Provider> = self.providers.values().collect();
        providers.sort_by(|a, b| a.name().cmp(b.name()));
        for provider in providers {
            provider.load_requirement_config(store).await?;
        }
        tracing::info!("Loaded configuration for {} providers", self.providers.len());
        Ok(())
    }

    /// Serializable trigger input types, shared by every group.
    pub fn type_registry(&self) -> &Arc<TypeRegistry> {
        &self.types
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

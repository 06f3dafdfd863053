use crate::group::Group;
use relaycore::{validate_name, ConfigError, ConfigStore, Descriptor, Requirement, TypeRegistry};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

/// OAuth2 endpoints of a provider's upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthEndpoint {
    pub auth_url: String,
    pub token_url: String,
}

/// A third-party integration: its groups, requirements and OAuth metadata.
pub struct Provider {
    descriptor: Arc<Descriptor>,
    groups: HashMap<String, Group>,
    requirements: HashMap<String, Arc<dyn Requirement>>,
    oauth_endpoint: Option<OAuthEndpoint>,
    types: Arc<TypeRegistry>,
}

impl Provider {
    pub(crate) fn new(descriptor: Descriptor, types: Arc<TypeRegistry>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            groups: HashMap::new(),
            requirements: HashMap::new(),
            oauth_endpoint: None,
            types,
        }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Create a group owned by this provider. An existing group with the
    /// same name is replaced.
    pub fn add_group(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        icon: impl Into<Vec<u8>>,
    ) -> relaycore::Result<&mut Group> {
        let descriptor = Descriptor::child(&self.descriptor, name, description, icon);
        descriptor.validate("Group")?;
        let qualified = descriptor.qualified_name();
        let group = Group::new(descriptor, Arc::clone(&self.types));

        match self.groups.entry(group.name().to_string()) {
            Entry::Occupied(mut slot) => {
                tracing::warn!("Replacing group {}", qualified);
                slot.insert(group);
                Ok(slot.into_mut())
            }
            Entry::Vacant(slot) => {
                tracing::info!("Registering group: {}", qualified);
                Ok(slot.insert(group))
            }
        }
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn group_mut(&mut self, name: &str) -> Option<&mut Group> {
        self.groups.get_mut(name)
    }

    /// All groups, in no particular order.
    pub fn groups(&self) -> Vec<&Group> {
        self.groups.values().collect()
    }

    /// Register a requirement and record this provider as its owner.
    pub fn add_requirement<R: Requirement + 'static>(
        &mut self,
        requirement: Arc<R>,
    ) -> relaycore::Result<&mut Self> {
        validate_name("Requirement", requirement.name(), self.name())?;
        requirement.init(self.name());
        let requirement: Arc<dyn Requirement> = requirement;
        tracing::info!("Registering requirement: {}/{}", self.name(), requirement.name());
        self.requirements
            .insert(requirement.name().to_string(), requirement);
        Ok(self)
    }

    pub fn requirement(&self, name: &str) -> Option<&Arc<dyn Requirement>> {
        self.requirements.get(name)
    }

    pub fn requirements(&self) -> Vec<&Arc<dyn Requirement>> {
        self.requirements.values().collect()
    }

    pub fn set_oauth_endpoint(&mut self, endpoint: OAuthEndpoint) -> &mut Self {
        self.oauth_endpoint = Some(endpoint);
        self
    }

    pub fn oauth_endpoint(&self) -> Option<&OAuthEndpoint> {
        self.oauth_endpoint.as_ref()
    }

    /// Load every requirement's configuration, stopping at the first error.
    pub async fn load_requirement_config(&self, store: &dyn ConfigStore) -> Result<(), ConfigError> {
        for requirement in self.requirements.values() {
            if let Err(e) = requirement.load_config(store).await {
                tracing::error!(
                    "Failed to load requirement {}/{}: {}",
                    self.name(),
                    requirement.name(),
                    e
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// A provider is usable once all of its requirements have loaded.
    pub fn is_available(&self) -> bool {
        self.requirements.values().all(|r| r.is_loaded())
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.descriptor.name)
            .field("groups", &self.groups.keys().collect::<Vec<_>>())
            .field("requirements", &self.requirements.keys().collect::<Vec<_>>())
            .field("oauth_endpoint", &self.oauth_endpoint)
            .finish()
    }
}

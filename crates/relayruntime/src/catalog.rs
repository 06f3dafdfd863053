//! Read-only projections of the registry for UIs and APIs.

use crate::group::Group;
use crate::provider::{OAuthEndpoint, Provider};
use crate::registry::Registry;
use relaycore::{ActionInfo, Descriptor};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionSummary {
    pub name: String,
    pub description: String,
    pub is_trigger: bool,
    pub input_type: &'static str,
    pub output_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_svg: Option<String>,
}

/// One group of a provider, flattened with its actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionGroupListing {
    pub name: String,
    pub provider: String,
    pub actions: Vec<ActionSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSummary {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub groups: Vec<String>,
    pub requirements: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthEndpoint>,
}

fn icon_svg(descriptor: &Descriptor) -> Option<String> {
    if descriptor.icon.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&descriptor.icon).into_owned())
    }
}

impl From<&ActionInfo> for ActionSummary {
    fn from(info: &ActionInfo) -> Self {
        Self {
            name: info.descriptor.name.clone(),
            description: info.descriptor.description.clone(),
            is_trigger: info.is_trigger,
            input_type: info.input_type.name,
            output_type: info.output_type.name,
            icon_svg: icon_svg(&info.descriptor),
        }
    }
}

impl ActionGroupListing {
    fn new(provider: &Provider, group: &Group) -> Self {
        Self {
            name: group.name().to_string(),
            provider: provider.name().to_string(),
            actions: group
                .actions()
                .into_iter()
                .map(|binding| ActionSummary::from(binding.info()))
                .collect(),
        }
    }
}

impl From<&Provider> for ProviderSummary {
    fn from(provider: &Provider) -> Self {
        Self {
            name: provider.name().to_string(),
            description: provider.descriptor().description.clone(),
            available: provider.is_available(),
            groups: provider.groups().iter().map(|g| g.name().to_string()).collect(),
            requirements: provider
                .requirements()
                .iter()
                .map(|r| r.name().to_string())
                .collect(),
            oauth: provider.oauth_endpoint().cloned(),
        }
    }
}

impl Registry {
    /// Every `(group, provider, actions)` tuple, in no particular order.
    pub fn action_groups(&self) -> Vec<ActionGroupListing> {
        self.providers()
            .into_iter()
            .flat_map(|provider| {
                provider
                    .groups()
                    .into_iter()
                    .map(move |group| ActionGroupListing::new(provider, group))
            })
            .collect()
    }

    pub fn provider_summaries(&self) -> Vec<ProviderSummary> {
        self.providers()
            .into_iter()
            .map(ProviderSummary::from)
            .collect()
    }
}

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Immutable metadata shared by providers, groups and actions.
///
/// `parent` only exists to build qualified names for diagnostics; the
/// catalog is never walked upwards through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub icon: Vec<u8>,
    #[serde(skip)]
    pub parent: Option<Arc<Descriptor>>,
}

impl Descriptor {
    /// Create a root descriptor (a provider).
    pub fn new(name: impl Into<String>, description: impl Into<String>, icon: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            icon: icon.into(),
            parent: None,
        }
    }

    /// Create a descriptor nested under `parent`.
    pub fn child(
        parent: &Arc<Descriptor>,
        name: impl Into<String>,
        description: impl Into<String>,
        icon: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            parent: Some(Arc::clone(parent)),
            ..Self::new(name, description, icon)
        }
    }

    /// Slash separated path from the root, e.g. `time/timers/onInterval`.
    pub fn qualified_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}/{}", parent.qualified_name(), self.name),
            None => self.name.clone(),
        }
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref().map(|p| p.name.as_str())
    }

    /// Check the name can be used as one segment of a qualified name.
    pub fn validate(&self, kind: &'static str) -> Result<(), ValidationError> {
        let parent = self
            .parent
            .as_deref()
            .map(Descriptor::qualified_name)
            .unwrap_or_default();
        validate_name(kind, &self.name, &parent)
    }
}

/// Name rules shared by descriptors and requirements. Names double as
/// path segments in qualified names and in the file config store.
pub fn validate_name(kind: &'static str, name: &str, parent: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName {
            kind,
            parent: parent.to_string(),
        });
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(ValidationError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

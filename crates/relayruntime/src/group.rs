use relaycore::{Action, Binding, Descriptor, Trigger, TypeRegistry};
use std::collections::HashMap;
use std::sync::Arc;

/// Named collection of actions and triggers under one provider.
pub struct Group {
    descriptor: Arc<Descriptor>,
    actions: HashMap<String, Arc<Binding>>,
    types: Arc<TypeRegistry>,
}

impl Group {
    pub(crate) fn new(descriptor: Descriptor, types: Arc<TypeRegistry>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            actions: HashMap::new(),
            types,
        }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Bind and register an action. A binding with the same name is
    /// replaced.
    pub fn add_action<A: Action>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        icon: impl Into<Vec<u8>>,
        action: A,
    ) -> relaycore::Result<&mut Self> {
        let descriptor = Descriptor::child(&self.descriptor, name, description, icon);
        let binding = Binding::action(descriptor, action)?;
        self.insert(binding);
        Ok(self)
    }

    /// Bind and register a trigger. Its name must start with `on`; its input
    /// type is registered for persistence.
    pub fn add_trigger<T: Trigger>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        icon: impl Into<Vec<u8>>,
        trigger: T,
    ) -> relaycore::Result<&mut Self> {
        let descriptor = Descriptor::child(&self.descriptor, name, description, icon);
        let binding = Binding::trigger(descriptor, trigger, &self.types)?;
        self.insert(binding);
        Ok(self)
    }

    fn insert(&mut self, binding: Binding) {
        let name = binding.name().to_string();
        let kind = if binding.is_trigger() { "trigger" } else { "action" };
        // Last registration wins; kept for compatibility with re-registering providers
        if self.actions.contains_key(&name) {
            tracing::warn!("Replacing {} {}", kind, binding.qualified_name());
        } else {
            tracing::info!("Registering {}: {}", kind, binding.qualified_name());
        }
        self.actions.insert(name, Arc::new(binding));
    }

    pub fn action(&self, name: &str) -> Option<&Arc<Binding>> {
        self.actions.get(name)
    }

    /// All bindings, in no particular order.
    pub fn actions(&self) -> Vec<&Arc<Binding>> {
        self.actions.values().collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.descriptor.qualified_name())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

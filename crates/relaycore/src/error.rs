use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
}

/// A handler broke the registration contract. Raised once, when the
/// binding is added to its group, never during invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{kind} name must not be empty (under '{parent}')")]
    EmptyName { kind: &'static str, parent: String },

    #[error("{kind} name '{name}' must not contain '/', '\\' or '..'")]
    InvalidName { kind: &'static str, name: String },

    #[error("Trigger names must start with \"on\", change the name of \"{name}\"")]
    MissingTriggerPrefix { name: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Config store unreachable for {provider}/{requirement}: {reason}")]
    Unavailable {
        provider: String,
        requirement: String,
        reason: String,
    },

    #[error("No configuration stored for {provider}/{requirement}")]
    Missing {
        provider: String,
        requirement: String,
    },

    #[error("Malformed configuration for {provider}/{requirement}: {reason}")]
    Malformed {
        provider: String,
        requirement: String,
        reason: String,
    },

    #[error("Requirement '{requirement}' has not been added to a provider")]
    Uninitialized { requirement: String },

    #[error("Invalid runtime configuration: {0}")]
    Runtime(String),
}

/// Lookup miss; names the exact level of the path that was missing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("no provider: {provider}")]
    Provider { provider: String },

    #[error("Provider {provider} has no group {group}")]
    Group { provider: String, group: String },

    #[error("Group {provider}->{group} has no action {action}")]
    Action {
        provider: String,
        group: String,
        action: String,
    },
}

/// Failure surfaced by a running action or trigger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Invalid input for {action}: {reason}")]
    InvalidInput { action: String, reason: String },

    #[error("Execution failed: {0}")]
    Failed(String),

    #[error("Could not encode output of {action}: {reason}")]
    InvalidOutput { action: String, reason: String },

    #[error("{action} is a trigger; start it instead of running it")]
    NotAnAction { action: String },

    #[error("{action} is not a trigger")]
    NotATrigger { action: String },

    #[error("Cancelled")]
    Cancelled,
}

impl ActionError {
    /// Wrap any handler-side error.
    pub fn failed(err: impl std::fmt::Display) -> Self {
        ActionError::Failed(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerializationError {
    #[error("Type tag '{tag}' is already registered for {existing}, cannot register {requested}")]
    Conflict {
        tag: String,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("No type registered under tag '{0}'")]
    UnknownTag(String),

    #[error("Failed to encode {tag}: {reason}")]
    Encode { tag: String, reason: String },

    #[error("Failed to decode {tag}: {reason}")]
    Decode { tag: String, reason: String },
}

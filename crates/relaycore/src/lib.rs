//! Core abstractions for the relay action runtime
//!
//! This crate provides the typed handler contracts (actions and triggers),
//! the type-erased bindings the catalog stores, trigger event streams,
//! provider requirements and the configuration store they load from.

mod binding;
mod context;
mod descriptor;
mod error;
mod handler;
mod requirement;
mod store;
pub mod stream;
mod types;

pub use binding::{ActionInfo, ActionInput, Binding, Invocation, TypeInfo, TRIGGER_PREFIX};
pub use context::{ActionContext, InvocationId};
pub use descriptor::{validate_name, Descriptor};
pub use error::{
    ActionError, ConfigError, NotFoundError, RelayError, SerializationError, ValidationError,
};
pub use handler::{action_fn, trigger_fn, Action, ActionFn, Trigger, TriggerFn};
pub use requirement::{ConfigRequirement, OAuthClient, Requirement};
pub use store::{ConfigStore, FileConfigStore, MemoryConfigStore};
pub use stream::{EventSender, EventStream, DEFAULT_EVENT_BUFFER};
pub use types::{RecordedInput, TypeRegistry};

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

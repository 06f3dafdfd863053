//! Validated, invocable wrappers around provider handlers.
//!
//! A [`Binding`] owns one typed [`Action`] or [`Trigger`] and erases it
//! behind a JSON / `Any` boundary so the catalog can store heterogeneous
//! handlers side by side. Typed callers can still reach the concrete
//! handler through [`Binding::call`] and [`Binding::start_typed`].

use crate::context::ActionContext;
use crate::descriptor::Descriptor;
use crate::error::{ActionError, ValidationError};
use crate::handler::{Action, Trigger};
use crate::stream::EventStream;
use crate::types::TypeRegistry;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{Any, TypeId};
use tracing::Instrument;

/// Names of triggers must start with this prefix.
pub const TRIGGER_PREFIX: &str = "on";

/// Static description of a handler's input or output type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypeInfo {
    pub name: &'static str,
    #[serde(skip)]
    pub id: TypeId,
}

impl TypeInfo {
    pub fn of<T: 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }
}

/// Metadata resolved once when the binding is created.
#[derive(Debug, Clone)]
pub struct ActionInfo {
    pub descriptor: Descriptor,
    pub is_trigger: bool,
    pub input_type: TypeInfo,
    /// For triggers this is the event type, not the stream type.
    pub output_type: TypeInfo,
}

impl ActionInfo {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

/// Input handed to an erased binding.
pub enum ActionInput {
    /// Decoded into the handler's input type with serde.
    Json(serde_json::Value),
    /// Already the handler's input type (or a `Box` of it).
    Typed(Box<dyn Any + Send>),
}

impl ActionInput {
    pub fn typed<T: Send + 'static>(value: T) -> Self {
        ActionInput::Typed(Box::new(value))
    }

    fn kind(&self) -> &'static str {
        match self {
            ActionInput::Json(serde_json::Value::Object(_)) => "json object",
            ActionInput::Json(serde_json::Value::Array(_)) => "json array",
            ActionInput::Json(serde_json::Value::Null) => "json null",
            ActionInput::Json(_) => "json scalar",
            ActionInput::Typed(_) => "typed value",
        }
    }
}

impl From<serde_json::Value> for ActionInput {
    fn from(value: serde_json::Value) -> Self {
        ActionInput::Json(value)
    }
}

impl std::fmt::Debug for ActionInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionInput::Json(value) => f.debug_tuple("Json").field(value).finish(),
            ActionInput::Typed(_) => f.write_str("Typed(..)"),
        }
    }
}

/// Result of invoking an erased binding.
#[derive(Debug)]
pub enum Invocation {
    /// An action's single output.
    Output(serde_json::Value),
    /// A trigger's event stream; drain it at your own pace.
    Events(EventStream<serde_json::Value>),
}

#[async_trait]
trait ErasedHandler: Send + Sync {
    async fn invoke(
        &self,
        info: &ActionInfo,
        input: ActionInput,
        ctx: ActionContext,
    ) -> Result<Invocation, ActionError>;

    fn as_any(&self) -> &dyn Any;
}

struct ActionHandler<A>(A);

struct TriggerHandler<T>(T);

fn decode_input<I>(info: &ActionInfo, input: ActionInput) -> Result<I, ActionError>
where
    I: DeserializeOwned + 'static,
{
    let invalid = |reason: String| ActionError::InvalidInput {
        action: info.descriptor.qualified_name(),
        reason,
    };
    match input {
        ActionInput::Json(value) => serde_json::from_value(value).map_err(|e| invalid(e.to_string())),
        ActionInput::Typed(boxed) => match boxed.downcast::<I>() {
            Ok(value) => Ok(*value),
            Err(boxed) => boxed
                .downcast::<Box<I>>()
                .map(|value| **value)
                .map_err(|_| invalid(format!("expected a {}", info.input_type.name))),
        },
    }
}

fn encode_output<O: Serialize>(action: &str, output: O) -> Result<serde_json::Value, ActionError> {
    serde_json::to_value(output).map_err(|e| ActionError::InvalidOutput {
        action: action.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl<A: Action> ErasedHandler for ActionHandler<A> {
    async fn invoke(
        &self,
        info: &ActionInfo,
        input: ActionInput,
        ctx: ActionContext,
    ) -> Result<Invocation, ActionError> {
        let input: A::Input = decode_input(info, input)?;
        let output = self.0.run(input, ctx).await?;
        encode_output(&info.descriptor.qualified_name(), output).map(Invocation::Output)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl<T: Trigger> ErasedHandler for TriggerHandler<T> {
    async fn invoke(
        &self,
        info: &ActionInfo,
        input: ActionInput,
        ctx: ActionContext,
    ) -> Result<Invocation, ActionError> {
        let input: T::Input = decode_input(info, input)?;
        let events = self.0.start(input, ctx).await?;
        let action = info.descriptor.qualified_name();
        Ok(Invocation::Events(
            events.map_events(move |event| encode_output(&action, event)),
        ))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One validated action or trigger.
pub struct Binding {
    info: ActionInfo,
    handler: Box<dyn ErasedHandler>,
}

impl Binding {
    /// Bind an action. The descriptor's name must be a valid segment.
    pub fn action<A: Action>(descriptor: Descriptor, action: A) -> Result<Self, ValidationError> {
        descriptor.validate("Action")?;
        Ok(Self {
            info: ActionInfo {
                descriptor,
                is_trigger: false,
                input_type: TypeInfo::of::<A::Input>(),
                output_type: TypeInfo::of::<A::Output>(),
            },
            handler: Box::new(ActionHandler(action)),
        })
    }

    /// Bind a trigger. Its name must start with [`TRIGGER_PREFIX`] and its
    /// input type is registered with `types` for persistence.
    pub fn trigger<T: Trigger>(
        descriptor: Descriptor,
        trigger: T,
        types: &TypeRegistry,
    ) -> crate::Result<Self> {
        descriptor.validate("Trigger")?;
        if !descriptor.name.starts_with(TRIGGER_PREFIX) {
            return Err(ValidationError::MissingTriggerPrefix {
                name: descriptor.name,
            }
            .into());
        }
        types.register::<T::Input>()?;

        Ok(Self {
            info: ActionInfo {
                descriptor,
                is_trigger: true,
                input_type: TypeInfo::of::<T::Input>(),
                output_type: TypeInfo::of::<T::Event>(),
            },
            handler: Box::new(TriggerHandler(trigger)),
        })
    }

    pub fn info(&self) -> &ActionInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        self.info.name()
    }

    pub fn qualified_name(&self) -> String {
        self.info.descriptor.qualified_name()
    }

    pub fn is_trigger(&self) -> bool {
        self.info.is_trigger
    }

    /// Invoke with an erased input. Actions yield [`Invocation::Output`],
    /// triggers yield [`Invocation::Events`].
    pub async fn invoke(
        &self,
        input: impl Into<ActionInput>,
        ctx: ActionContext,
    ) -> Result<Invocation, ActionError> {
        let input = input.into();
        let name = self.qualified_name();
        let span = tracing::info_span!(
            "invoke",
            action = %name,
            invocation_id = %ctx.invocation_id
        );

        async {
            tracing::debug!(
                "Running {} with {} input ({})",
                name,
                input.kind(),
                self.info.input_type.name
            );
            let result = self.handler.invoke(&self.info, input, ctx).await;
            match &result {
                Ok(Invocation::Output(value)) => tracing::debug!("{} returned {}", name, value),
                Ok(Invocation::Events(_)) => {
                    tracing::debug!("{} started streaming {}", name, self.info.output_type.name)
                }
                Err(e) => tracing::debug!("{} failed: {}", name, e),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Run an action and return its JSON output.
    pub async fn run(
        &self,
        input: impl Into<ActionInput>,
        ctx: ActionContext,
    ) -> Result<serde_json::Value, ActionError> {
        if self.is_trigger() {
            return Err(ActionError::NotAnAction {
                action: self.qualified_name(),
            });
        }
        match self.invoke(input, ctx).await? {
            Invocation::Output(value) => Ok(value),
            Invocation::Events(events) => {
                events.cancel();
                Err(ActionError::NotAnAction {
                    action: self.qualified_name(),
                })
            }
        }
    }

    /// Start a trigger and return its JSON event stream.
    pub async fn start(
        &self,
        input: impl Into<ActionInput>,
        ctx: ActionContext,
    ) -> Result<EventStream<serde_json::Value>, ActionError> {
        if !self.is_trigger() {
            return Err(ActionError::NotATrigger {
                action: self.qualified_name(),
            });
        }
        match self.invoke(input, ctx).await? {
            Invocation::Events(events) => Ok(events),
            Invocation::Output(_) => Err(ActionError::NotATrigger {
                action: self.qualified_name(),
            }),
        }
    }

    /// Typed call for callers that know the concrete action.
    pub async fn call<A: Action>(&self, input: A::Input, ctx: ActionContext) -> Result<A::Output, ActionError> {
        let action = self.downcast_action::<A>().ok_or_else(|| ActionError::InvalidInput {
            action: self.qualified_name(),
            reason: format!("binding does not wrap {}", std::any::type_name::<A>()),
        })?;
        tracing::debug!(
            invocation_id = %ctx.invocation_id,
            "Running {} with typed input ({})",
            self.qualified_name(),
            self.info.input_type.name
        );
        let result = action.run(input, ctx).await;
        tracing::debug!("{} finished, ok = {}", self.qualified_name(), result.is_ok());
        result
    }

    /// Typed start for callers that know the concrete trigger.
    pub async fn start_typed<T: Trigger>(
        &self,
        input: T::Input,
        ctx: ActionContext,
    ) -> Result<EventStream<T::Event>, ActionError> {
        let trigger = self.downcast_trigger::<T>().ok_or_else(|| ActionError::NotATrigger {
            action: self.qualified_name(),
        })?;
        tracing::debug!(
            invocation_id = %ctx.invocation_id,
            "Starting {} with typed input ({})",
            self.qualified_name(),
            self.info.input_type.name
        );
        trigger.start(input, ctx).await
    }

    pub fn downcast_action<A: Action>(&self) -> Option<&A> {
        self.handler
            .as_any()
            .downcast_ref::<ActionHandler<A>>()
            .map(|h| &h.0)
    }

    pub fn downcast_trigger<T: Trigger>(&self) -> Option<&T> {
        self.handler
            .as_any()
            .downcast_ref::<TriggerHandler<T>>()
            .map(|h| &h.0)
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding").field("info", &self.info).finish()
    }
}

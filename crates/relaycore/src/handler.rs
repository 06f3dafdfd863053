//! Typed handler contracts.
//!
//! The shape of a handler (one input value plus a context, returning either
//! an output or an event stream, or an error) is enforced by these traits
//! at compile time. Name rules are checked when the handler is bound.

use crate::context::ActionContext;
use crate::error::ActionError;
use crate::stream::EventStream;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;

/// A one-shot operation: input + context → output or error.
#[async_trait]
pub trait Action: Send + Sync + 'static {
    type Input: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    async fn run(&self, input: Self::Input, ctx: ActionContext) -> Result<Self::Output, ActionError>;
}

/// A long-lived event source: input + context → stream of events or error.
///
/// The producer must stop once `ctx` is cancelled. Inputs are serializable
/// in both directions so started triggers can be recorded and replayed.
#[async_trait]
pub trait Trigger: Send + Sync + 'static {
    type Input: Serialize + DeserializeOwned + Send + 'static;
    type Event: Serialize + Send + 'static;

    async fn start(
        &self,
        input: Self::Input,
        ctx: ActionContext,
    ) -> Result<EventStream<Self::Event>, ActionError>;
}

/// Action backed by an async closure. See [`action_fn`].
pub struct ActionFn<F, Fut, I, O> {
    f: F,
    _marker: PhantomData<fn(I) -> (Fut, O)>,
}

/// Turn `async fn(input, ctx) -> Result<O, ActionError>` into an [`Action`].
pub fn action_fn<F, Fut, I, O>(f: F) -> ActionFn<F, Fut, I, O>
where
    F: Fn(I, ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ActionError>> + Send + 'static,
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
{
    ActionFn {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, I, O> Action for ActionFn<F, Fut, I, O>
where
    F: Fn(I, ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ActionError>> + Send + 'static,
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
{
    type Input = I;
    type Output = O;

    async fn run(&self, input: I, ctx: ActionContext) -> Result<O, ActionError> {
        (self.f)(input, ctx).await
    }
}

/// Trigger backed by an async closure. See [`trigger_fn`].
pub struct TriggerFn<F, Fut, I, E> {
    f: F,
    _marker: PhantomData<fn(I) -> (Fut, E)>,
}

/// Turn `async fn(input, ctx) -> Result<EventStream<E>, ActionError>` into a
/// [`Trigger`].
pub fn trigger_fn<F, Fut, I, E>(f: F) -> TriggerFn<F, Fut, I, E>
where
    F: Fn(I, ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<EventStream<E>, ActionError>> + Send + 'static,
    I: Serialize + DeserializeOwned + Send + 'static,
    E: Serialize + Send + 'static,
{
    TriggerFn {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, I, E> Trigger for TriggerFn<F, Fut, I, E>
where
    F: Fn(I, ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<EventStream<E>, ActionError>> + Send + 'static,
    I: Serialize + DeserializeOwned + Send + 'static,
    E: Serialize + Send + 'static,
{
    type Input = I;
    type Event = E;

    async fn start(&self, input: I, ctx: ActionContext) -> Result<EventStream<E>, ActionError> {
        (self.f)(input, ctx).await
    }
}

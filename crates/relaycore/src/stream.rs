//! Event streams produced by triggers.
//!
//! A trigger's producer runs on its own task and pushes events into a
//! bounded channel. When the buffer is full the producer waits, so a slow
//! consumer applies backpressure instead of growing memory. Cancelling the
//! context passed at start closes the stream: once the consumer observes
//! cancellation it receives no further events, even ones already buffered.

use crate::context::ActionContext;
use crate::error::ActionError;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Buffer used when a trigger does not choose its own.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Create a connected sender/stream pair bound to `ctx`'s cancellation.
pub fn channel<E: Send + 'static>(
    capacity: usize,
    ctx: &ActionContext,
) -> (EventSender<E>, EventStream<E>) {
    let (tx, mut rx) = mpsc::channel(capacity.max(1));
    let sender = EventSender {
        tx,
        cancellation: ctx.cancellation.clone(),
    };
    let inner = stream::poll_fn(move |cx| rx.poll_recv(cx)).boxed();
    (sender, EventStream::new(inner, ctx.cancellation.clone()))
}

/// Run `producer` on its own task and return the stream it feeds.
///
/// An error returned by the producer is delivered as the final item of the
/// stream, and so is a panic. Returning `ActionError::Cancelled` ends the
/// stream silently.
pub fn spawn<E, F, Fut>(ctx: &ActionContext, capacity: usize, producer: F) -> EventStream<E>
where
    E: Send + 'static,
    F: FnOnce(EventSender<E>) -> Fut,
    Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
{
    let (tx, events) = channel(capacity, ctx);
    let failure = tx.clone();
    let task = producer(tx);
    tokio::spawn(async move {
        match futures::FutureExt::catch_unwind(AssertUnwindSafe(task)).await {
            Ok(Ok(())) | Ok(Err(ActionError::Cancelled)) => {}
            Ok(Err(err)) => {
                tracing::debug!("Trigger producer failed: {}", err);
                failure.fail(err).await;
            }
            Err(_) => {
                tracing::error!("Trigger producer panicked");
                failure
                    .fail(ActionError::Failed("trigger producer panicked".to_string()))
                    .await;
            }
        }
    });
    events
}

/// Producer half of a trigger stream.
pub struct EventSender<E> {
    tx: mpsc::Sender<Result<E, ActionError>>,
    cancellation: CancellationToken,
}

impl<E> Clone for EventSender<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            cancellation: self.cancellation.clone(),
        }
    }
}

impl<E> EventSender<E> {
    /// Push one event, waiting for buffer space.
    ///
    /// Fails with `ActionError::Cancelled` once the context is cancelled or
    /// the consumer dropped the stream; producers should stop on error.
    pub async fn send(&self, event: E) -> Result<(), ActionError> {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(ActionError::Cancelled),
            sent = self.tx.send(Ok(event)) => sent.map_err(|_| ActionError::Cancelled),
        }
    }

    /// Close the stream with an error as its final item.
    pub async fn fail(self, err: ActionError) {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => {}
            _ = self.tx.send(Err(err)) => {}
        }
    }

    /// True when nothing will read further events.
    pub fn is_closed(&self) -> bool {
        self.cancellation.is_cancelled() || self.tx.is_closed()
    }

    /// Resolves when the context is cancelled or the consumer goes away.
    pub async fn closed(&self) {
        tokio::select! {
            _ = self.cancellation.cancelled() => {}
            _ = self.tx.closed() => {}
        }
    }
}

/// Consumer half of a trigger stream.
///
/// Yields `Ok(event)` items; an `Err` item is always the last one and means
/// the trigger failed rather than finished.
pub struct EventStream<E> {
    inner: BoxStream<'static, Result<E, ActionError>>,
    cancellation: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    done: bool,
}

impl<E: Send + 'static> EventStream<E> {
    /// Wrap an existing stream so it honors `ctx`'s cancellation.
    pub fn from_stream<S>(events: S, ctx: &ActionContext) -> Self
    where
        S: Stream<Item = Result<E, ActionError>> + Send + 'static,
    {
        Self::new(events.boxed(), ctx.cancellation.clone())
    }

    fn new(inner: BoxStream<'static, Result<E, ActionError>>, cancellation: CancellationToken) -> Self {
        Self {
            inner,
            cancelled: Box::pin(cancellation.clone().cancelled_owned()),
            cancellation,
            done: false,
        }
    }

    /// Convert every event, keeping cancellation behavior. A conversion
    /// error ends the stream with that error.
    pub fn map_events<U, F>(self, mut f: F) -> EventStream<U>
    where
        U: Send + 'static,
        F: FnMut(E) -> Result<U, ActionError> + Send + 'static,
    {
        let inner = self.inner.map(move |item| item.and_then(&mut f)).boxed();
        EventStream {
            inner,
            cancellation: self.cancellation,
            cancelled: self.cancelled,
            done: self.done,
        }
    }

    /// Stop the producer and close the stream.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl<E> Stream for EventStream<E> {
    type Item = Result<E, ActionError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if this.cancelled.as_mut().poll(cx).is_ready() {
            this.done = true;
            return Poll::Ready(None);
        }
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Err(err))) => {
                this.done = true;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl<E> std::fmt::Debug for EventStream<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("done", &self.done)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn delivers_events_in_order_then_ends() {
        let ctx = ActionContext::new();
        let events = spawn(&ctx, 2, |tx| async move {
            for i in 0..5u32 {
                tx.send(i).await?;
            }
            Ok::<(), ActionError>(())
        });

        let got: Vec<u32> = events.map(|e| e.unwrap()).collect().await;
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn producer_error_is_final_item() {
        let ctx = ActionContext::new();
        let mut events = spawn(&ctx, 4, |tx| async move {
            tx.send("first").await?;
            Err::<(), _>(ActionError::failed("upstream went away"))
        });

        assert_eq!(events.next().await, Some(Ok("first")));
        assert_eq!(
            events.next().await,
            Some(Err(ActionError::Failed("upstream went away".into())))
        );
        assert_eq!(events.next().await, None);
    }

    #[tokio::test]
    async fn producer_panic_ends_with_error() {
        let ctx = ActionContext::new();
        let mut events = spawn(&ctx, 4, |tx| async move {
            tx.send(1u32).await?;
            if !tx.is_closed() {
                panic!("producer blew up");
            }
            Ok::<(), ActionError>(())
        });

        assert_eq!(events.next().await, Some(Ok(1)));
        assert_eq!(
            events.next().await,
            Some(Err(ActionError::Failed("trigger producer panicked".into())))
        );
        assert_eq!(events.next().await, None);
    }

    #[tokio::test]
    async fn buffered_events_are_dropped_after_cancel() {
        let ctx = ActionContext::new();
        let (tx, mut events) = channel::<u32>(8, &ctx);
        tx.send(1).await.unwrap();
        tx.send(2).await.unwrap();

        assert_eq!(events.next().await, Some(Ok(1)));
        ctx.cancel();
        assert_eq!(events.next().await, None);
        assert_eq!(tx.send(3).await, Err(ActionError::Cancelled));
    }

    #[tokio::test]
    async fn full_buffer_blocks_producer() {
        let ctx = ActionContext::new();
        let (tx, _events) = channel::<u32>(1, &ctx);
        tx.send(1).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), tx.send(2)).await;
        assert!(blocked.is_err(), "second send should wait for capacity");
    }

    #[tokio::test]
    async fn map_events_converts_and_stops_on_error() {
        let ctx = ActionContext::new();
        let (tx, events) = channel::<i32>(4, &ctx);
        tx.send(1).await.unwrap();
        tx.send(-1).await.unwrap();
        tx.send(2).await.unwrap();
        drop(tx);

        let mapped = events.map_events(|n| {
            if n < 0 {
                Err(ActionError::failed("negative"))
            } else {
                Ok(n * 10)
            }
        });
        let got: Vec<_> = mapped.collect().await;
        assert_eq!(got, vec![Ok(10), Err(ActionError::Failed("negative".into()))]);
    }
}

use crate::stream::DEFAULT_EVENT_BUFFER;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type InvocationId = Uuid;

/// Context handed to every action and trigger invocation.
///
/// The runtime never interrupts a handler; handlers are expected to watch
/// `cancellation` and return (or close their stream) once it fires.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// Unique id, used to correlate the diagnostic records of one call
    pub invocation_id: InvocationId,

    /// Cancellation token for graceful shutdown
    pub cancellation: CancellationToken,

    /// Buffer size triggers should use for their event streams
    pub event_buffer: usize,
}

impl ActionContext {
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            cancellation,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer.max(1);
        self
    }

    /// A fresh context whose cancellation follows this one.
    pub fn child(&self) -> Self {
        Self::with_cancellation(self.cancellation.child_token()).with_event_buffer(self.event_buffer)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Resolves once the context is cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }
}

impl Default for ActionContext {
    fn default() -> Self {
        Self::new()
    }
}

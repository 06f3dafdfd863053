use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relaycore::{stream, Action, ActionContext, ActionError, EventStream, Trigger};
use relayruntime::Registry;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayInput {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delayed {
    pub waited_ms: u64,
}

/// Wait for a duration, returning early if cancelled
pub struct Delay;

#[async_trait]
impl Action for Delay {
    type Input = DelayInput;
    type Output = Delayed;

    async fn run(&self, input: DelayInput, ctx: ActionContext) -> Result<Delayed, ActionError> {
        tracing::debug!("Delaying for {}ms", input.delay_ms);
        tokio::select! {
            _ = sleep(Duration::from_millis(input.delay_ms)) => Ok(Delayed { waited_ms: input.delay_ms }),
            _ = ctx.cancelled() => Err(ActionError::Cancelled),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalInput {
    pub every_ms: u64,
    /// Stop after this many ticks
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub seq: u64,
    pub at: DateTime<Utc>,
}

/// Emits a tick every `every_ms` milliseconds
pub struct OnInterval;

#[async_trait]
impl Trigger for OnInterval {
    type Input = IntervalInput;
    type Event = Tick;

    async fn start(&self, input: IntervalInput, ctx: ActionContext) -> Result<EventStream<Tick>, ActionError> {
        if input.every_ms == 0 {
            return Err(ActionError::InvalidInput {
                action: "time/timers/onInterval".to_string(),
                reason: "every_ms must be positive".to_string(),
            });
        }

        Ok(stream::spawn(&ctx, ctx.event_buffer, move |tx| async move {
            let mut interval = tokio::time::interval(Duration::from_millis(input.every_ms));
            let mut seq = 0;
            while input.limit.map_or(true, |limit| seq < limit) {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = tx.closed() => return Ok(()),
                }
                tx.send(Tick { seq, at: Utc::now() }).await?;
                seq += 1;
            }
            Ok::<(), ActionError>(())
        }))
    }
}

pub fn register(registry: &mut Registry) -> relaycore::Result<()> {
    registry
        .add_provider("time", "Timers and delays", Vec::new())?
        .add_group("timers", "Wait for or react to the passage of time", Vec::new())?
        .add_action("delay", "Delay execution for specified milliseconds", Vec::new(), Delay)?
        .add_trigger("onInterval", "Fires at a fixed interval", Vec::new(), OnInterval)?;
    Ok(())
}

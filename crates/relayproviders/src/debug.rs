use relaycore::{action_fn, ActionContext, ActionError};
use relayruntime::Registry;

/// Logs its input and returns it unchanged
async fn echo(input: serde_json::Value, ctx: ActionContext) -> Result<serde_json::Value, ActionError> {
    tracing::info!(invocation_id = %ctx.invocation_id, "DEBUG: {}", input);
    Ok(input)
}

pub fn register(registry: &mut Registry) -> relaycore::Result<()> {
    registry
        .add_provider("debug", "Debugging helpers", Vec::new())?
        .add_group("log", "Inspect values", Vec::new())?
        .add_action("echo", "Logs input values for debugging", Vec::new(), action_fn(echo))?;
    Ok(())
}

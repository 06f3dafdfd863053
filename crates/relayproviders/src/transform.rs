use relaycore::{action_fn, ActionContext, ActionError};
use relayruntime::Registry;

async fn parse(json: String, _ctx: ActionContext) -> Result<serde_json::Value, ActionError> {
    serde_json::from_str(&json).map_err(|e| ActionError::Failed(format!("JSON parse error: {}", e)))
}

async fn stringify(value: serde_json::Value, _ctx: ActionContext) -> Result<String, ActionError> {
    serde_json::to_string_pretty(&value)
        .map_err(|e| ActionError::Failed(format!("JSON stringify error: {}", e)))
}

pub fn register(registry: &mut Registry) -> relaycore::Result<()> {
    registry
        .add_provider("json", "JSON helpers", Vec::new())?
        .add_group("transform", "Convert between text and JSON", Vec::new())?
        .add_action("parse", "Parse JSON string", Vec::new(), action_fn(parse))?
        .add_action("stringify", "Convert value to JSON string", Vec::new(), action_fn(stringify))?;
    Ok(())
}

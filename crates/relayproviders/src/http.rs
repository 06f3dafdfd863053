use async_trait::async_trait;
use relaycore::{Action, ActionContext, ActionError, ConfigRequirement};
use relayruntime::Registry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Client settings shared by every request, loaded from the `defaults`
/// requirement of the `web` provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpDefaults {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_user_agent() -> String {
    concat!("relay/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for HttpDefaults {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestInput {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// HTTP request action
pub struct HttpRequest {
    client: reqwest::Client,
    defaults: Arc<ConfigRequirement<HttpDefaults>>,
}

impl HttpRequest {
    pub fn new(defaults: Arc<ConfigRequirement<HttpDefaults>>) -> Self {
        Self {
            client: reqwest::Client::new(),
            defaults,
        }
    }

    fn build(&self, input: &RequestInput, defaults: &HttpDefaults) -> Result<reqwest::RequestBuilder, ActionError> {
        let request = match input.method.to_uppercase().as_str() {
            "GET" => self.client.get(&input.url),
            "POST" => self.client.post(&input.url),
            "PUT" => self.client.put(&input.url),
            "DELETE" => self.client.delete(&input.url),
            other => {
                return Err(ActionError::InvalidInput {
                    action: "web/http/request".to_string(),
                    reason: format!("Unsupported method: {}", other),
                })
            }
        };

        let mut request = request
            .header(reqwest::header::USER_AGENT, &defaults.user_agent)
            .timeout(Duration::from_millis(defaults.timeout_ms));
        for (key, value) in &input.headers {
            request = request.header(key, value);
        }
        Ok(match &input.body {
            Some(serde_json::Value::String(text)) => request.body(text.clone()),
            Some(json) => request.json(json),
            None => request,
        })
    }
}

#[async_trait]
impl Action for HttpRequest {
    type Input = RequestInput;
    type Output = Response;

    async fn run(&self, input: RequestInput, ctx: ActionContext) -> Result<Response, ActionError> {
        let defaults = self.defaults.get().map_err(ActionError::failed)?;
        let request = self.build(&input, defaults)?;
        tracing::info!("{} {}", input.method, input.url);

        let response = tokio::select! {
            response = request.send() => response
                .map_err(|e| ActionError::Failed(format!("HTTP request failed: {}", e)))?,
            _ = ctx.cancelled() => return Err(ActionError::Cancelled),
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| ActionError::Failed(format!("Failed to read response: {}", e)))?;

        tracing::debug!("Response status: {}", status);
        Ok(Response { status, headers, body })
    }
}

pub fn register(registry: &mut Registry) -> relaycore::Result<()> {
    let defaults = Arc::new(ConfigRequirement::with_default("defaults", HttpDefaults::default()));
    let provider = registry.add_provider("web", "Plain HTTP", Vec::new())?;
    provider.add_requirement(Arc::clone(&defaults))?;
    provider
        .add_group("http", "Make HTTP requests", Vec::new())?
        .add_action("request", "Send a request and return the response", Vec::new(), HttpRequest::new(defaults))?;
    Ok(())
}

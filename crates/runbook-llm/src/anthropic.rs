use async_trait::async_trait;
use reqwest::Client;
use runbook_core::{ContentBlock, Message, Result, Role, RunbookError};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::provider::*;

const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API provider.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.anthropic.com/v1".into(),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Turns already use the Messages API shape, so they serialize as-is.
    fn build_request_body(&self, request: &LlmRequest) -> Result<Value> {
        let mut body = json!({
            "model": &request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": serde_json::to_value(&request.messages)?,
        });

        if let Some(ref system) = request.system {
            body["system"] = json!(system);
        }

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameters,
                    })
                })
                .collect();
            body["tools"] = json!(tools);
        }

        Ok(body)
    }
}

/// Convert the `content` array of a Messages API response into blocks,
/// keeping the order the model produced them in. Block types the assistant
/// cannot act on (e.g. thinking) are skipped.
/// Map a non-success HTTP status to an error.
pub(crate) fn status_error(status: u16, model: &str, retry_after: Option<u64>, body: &str) -> RunbookError {
    match status {
        429 => RunbookError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(30),
        },
        404 => RunbookError::ModelNotFound(model.to_string()),
        _ => RunbookError::LlmProvider(format!("HTTP {status}: {body}")),
    }
}

pub(crate) fn parse_content_blocks(content: &Value) -> Vec<ContentBlock> {
    let Some(blocks) = content.as_array() else {
        return vec![];
    };
    blocks
        .iter()
        .filter_map(|b| match b["type"].as_str() {
            Some("text") => b["text"].as_str().map(ContentBlock::text),
            Some("tool_use") => Some(ContentBlock::ToolUse {
                id: b["id"].as_str().unwrap_or_default().to_string(),
                name: b["name"].as_str().unwrap_or_default().to_string(),
                input: b["input"].clone(),
            }),
            other => {
                debug!(block_type = ?other, "skipping unsupported content block");
                None
            }
        })
        .collect()
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn models(&self) -> Vec<String> {
        vec![
            "claude-opus-4-20250514".into(),
            "claude-sonnet-4-20250514".into(),
            "claude-haiku-3-5".into(),
        ]
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = self.build_request_body(request)?;
        debug!(model = %request.model, turns = request.messages.len(), "sending Anthropic API request");

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RunbookError::LlmProvider(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let text = resp.text().await.unwrap_or_default();
            return Err(status_error(status, &request.model, retry_after, &text));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| RunbookError::LlmProvider(e.to_string()))?;

        if data["stop_reason"].as_str() == Some("refusal") {
            warn!(model = %request.model, "model refused the request");
            return Err(RunbookError::ContentRefused(
                "the model declined to answer".into(),
            ));
        }

        let blocks = parse_content_blocks(&data["content"]);
        let usage = Usage {
            input_tokens: data["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: data["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(LlmResponse {
            message: Message::blocks(Role::Assistant, blocks),
            usage,
            stop_reason: StopReason::from_wire(data["stop_reason"].as_str()),
        })
    }

    async fn health_check(&self) -> Result<()> {
        info!("checking Anthropic API health");
        if self.api_key.is_empty() {
            return Err(RunbookError::LlmProvider("ANTHROPIC_API_KEY not set".into()));
        }
        Ok(())
    }
}

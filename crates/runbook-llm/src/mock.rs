//! Mock completion provider for deterministic testing.
//!
//! Returns pre-configured responses without making any HTTP calls.

use async_trait::async_trait;
use parking_lot::Mutex;
use runbook_core::{ContentBlock, Message, Result, Role, RunbookError};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::provider::*;

/// A mock provider that returns pre-configured responses in order.
///
/// When the queue runs dry it keeps returning the fallback response, which
/// is handy for driving a loop into its iteration limit.
///
/// # Example
/// ```
/// use runbook_llm::mock::MockProvider;
/// let provider = MockProvider::new("test")
///     .with_response("Hello, world!");
/// ```
pub struct MockProvider {
    responses: Mutex<VecDeque<MockResponse>>,
    fallback: Mutex<Option<MockResponse>>,
    /// Every request received, for assertions in tests.
    requests: Arc<Mutex<Vec<LlmRequest>>>,
    name: String,
}

/// A pre-configured response from the mock provider.
#[derive(Debug, Clone, Default)]
pub struct MockResponse {
    pub blocks: Vec<ContentBlock>,
    pub error: Option<MockError>,
}

#[derive(Debug, Clone)]
pub enum MockError {
    Provider(String),
    Refused,
}

impl MockResponse {
    pub fn text(text: &str) -> Self {
        Self {
            blocks: vec![ContentBlock::text(text)],
            error: None,
        }
    }

    pub fn tool_call(name: &str, args: serde_json::Value) -> Self {
        Self {
            blocks: vec![tool_use_block(name, args)],
            error: None,
        }
    }

    pub fn error(msg: &str) -> Self {
        Self {
            blocks: vec![],
            error: Some(MockError::Provider(msg.to_string())),
        }
    }
}

fn tool_use_block(name: &str, args: serde_json::Value) -> ContentBlock {
    ContentBlock::ToolUse {
        id: format!("toolu_{}", uuid::Uuid::new_v4().simple()),
        name: name.to_string(),
        input: args,
    }
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            requests: Arc::new(Mutex::new(vec![])),
            name: name.into(),
        }
    }

    /// Queue a simple text response.
    pub fn with_response(self, text: &str) -> Self {
        self.with_mock_response(MockResponse::text(text))
    }

    /// Queue a response holding a single tool call.
    pub fn with_tool_call(self, name: &str, args: serde_json::Value) -> Self {
        self.with_mock_response(MockResponse::tool_call(name, args))
    }

    /// Queue a response holding several tool calls, optionally preceded by text.
    pub fn with_tool_calls(self, text: Option<&str>, calls: Vec<(&str, serde_json::Value)>) -> Self {
        let mut blocks: Vec<ContentBlock> = text.map(ContentBlock::text).into_iter().collect();
        blocks.extend(calls.into_iter().map(|(name, args)| tool_use_block(name, args)));
        self.with_mock_response(MockResponse { blocks, error: None })
    }

    /// Queue a provider failure.
    pub fn with_error(self, error: &str) -> Self {
        self.with_mock_response(MockResponse::error(error))
    }

    /// Queue a content refusal.
    pub fn with_refusal(self) -> Self {
        self.with_mock_response(MockResponse {
            blocks: vec![],
            error: Some(MockError::Refused),
        })
    }

    /// Queue a fully custom response.
    pub fn with_mock_response(self, resp: MockResponse) -> Self {
        self.responses.lock().push_back(resp);
        self
    }

    /// Response returned whenever the queue is empty.
    pub fn with_fallback(self, resp: MockResponse) -> Self {
        *self.fallback.lock() = Some(resp);
        self
    }

    /// Get all requests that were made to this provider.
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_response(&self) -> MockResponse {
        if let Some(resp) = self.responses.lock().pop_front() {
            return resp;
        }
        self.fallback
            .lock()
            .clone()
            .unwrap_or_else(|| MockResponse::text("(mock: no more queued responses)"))
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> Vec<String> {
        vec!["mock/test-model".to_string()]
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        self.requests.lock().push(request.clone());
        let mock = self.next_response();

        match mock.error {
            Some(MockError::Provider(e)) => return Err(RunbookError::LlmProvider(e)),
            Some(MockError::Refused) => {
                return Err(RunbookError::ContentRefused("mock refusal".into()));
            }
            None => {}
        }

        let message = Message::blocks(Role::Assistant, mock.blocks);
        let stop_reason = if message.tool_uses().is_empty() {
            StopReason::EndTurn
        } else {
            StopReason::ToolUse
        };

        Ok(LlmResponse {
            message,
            usage: Usage {
                input_tokens: 100,
                output_tokens: 50,
            },
            stop_reason,
        })
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> LlmRequest {
        LlmRequest::new("test", vec![Message::user("hello")]).with_system("be nice")
    }

    #[tokio::test]
    async fn test_mock_text_response() {
        let provider = MockProvider::new("mock").with_response("Hello!");
        let resp = provider.complete(&request()).await.unwrap();
        assert_eq!(resp.message.text_content(), "Hello!");
        assert_eq!(resp.stop_reason, StopReason::EndTurn);
        assert!(!resp.has_tool_calls());
    }

    #[tokio::test]
    async fn test_mock_tool_call() {
        let provider =
            MockProvider::new("mock").with_tool_call("run_shell", json!({"command": "ls"}));
        let resp = provider.complete(&request()).await.unwrap();
        assert!(resp.has_tool_calls());
        assert_eq!(resp.message.tool_uses()[0].tool_name, "run_shell");
        assert_eq!(resp.stop_reason, StopReason::ToolUse);
    }

    #[tokio::test]
    async fn test_mock_text_then_tools_keeps_order() {
        let provider = MockProvider::new("mock").with_tool_calls(
            Some("Let me check"),
            vec![
                ("run_shell", json!({"command": "pwd"})),
                ("send_message", json!({"message": "done"})),
            ],
        );
        let resp = provider.complete(&request()).await.unwrap();
        let calls = resp.message.tool_uses();
        assert_eq!(calls.len(), 2);
        assert_ne!(calls[0].id, calls[1].id);
        assert_eq!(resp.message.text_content(), "Let me check");
    }

    #[tokio::test]
    async fn test_mock_error_and_refusal() {
        let provider = MockProvider::new("mock")
            .with_error("HTTP 500")
            .with_refusal();
        let err = provider.complete(&request()).await.unwrap_err();
        assert!(!err.is_refusal());
        let err = provider.complete(&request()).await.unwrap_err();
        assert!(err.is_refusal());
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let provider = MockProvider::new("mock").with_response("ok");
        let _ = provider.complete(&request()).await;
        let recorded = provider.recorded_requests();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].system, Some("be nice".into()));
    }

    #[tokio::test]
    async fn test_mock_fallback_repeats() {
        let provider = MockProvider::new("mock")
            .with_response("first")
            .with_fallback(MockResponse::text("again"));
        let r1 = provider.complete(&request()).await.unwrap();
        let r2 = provider.complete(&request()).await.unwrap();
        let r3 = provider.complete(&request()).await.unwrap();
        assert_eq!(r1.message.text_content(), "first");
        assert_eq!(r2.message.text_content(), "again");
        assert_eq!(r3.message.text_content(), "again");
        assert_eq!(provider.request_count(), 3);
    }
}

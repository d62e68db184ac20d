use runbook_config::AgentConfig;
use runbook_core::{ContentBlock, ConversationHistory, Result, RunbookError, ToolCall};
use runbook_llm::{LlmProvider, LlmRequest};
use tracing::{debug, info, warn};

use crate::session::AgentSession;
use crate::tool_dispatch::{DispatchOptions, dispatch};
use crate::tools::AgentTools;

/// Assistant turn appended when a turn would otherwise end on a user turn.
pub const WAITING_PLACEHOLDER: &str = "waiting for more messages";

/// Result of one user turn through the loop.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Messages for the user, in the order they were produced.
    pub messages: Vec<String>,
    /// The full history, ending on an assistant turn.
    pub history: ConversationHistory,
    /// Completions requested.
    pub iterations: u32,
    /// Whether the loop stopped at the iteration cap with work pending.
    pub exhausted: bool,
}

/// The bounded tool-calling loop for one user turn.
pub struct AgentLoop<'a> {
    provider: &'a dyn LlmProvider,
    session: &'a AgentSession,
    tools: &'a AgentTools,
    config: &'a AgentConfig,
}

impl<'a> AgentLoop<'a> {
    pub fn new(
        provider: &'a dyn LlmProvider,
        session: &'a AgentSession,
        tools: &'a AgentTools,
        config: &'a AgentConfig,
    ) -> Self {
        Self {
            provider,
            session,
            tools,
            config,
        }
    }

    /// Run `user_input` against `history` until the model stops asking for
    /// follow-up or `max_iterations` completions have been made.
    ///
    /// Provider failures (including refusals) are returned as `Err`; tool
    /// failures never are.
    pub async fn run_turn(&self, user_input: &str, history: ConversationHistory) -> Result<TurnOutcome> {
        if user_input.trim().is_empty() {
            return Err(RunbookError::Agent("empty user input".into()));
        }
        let mut history = history;
        let mut messages = Vec::new();
        let mut iterations = 0;
        let mut keep_going = true;
        let max_iterations = self.config.max_iterations;

        let system_prompt = self.session.system_prompt();
        let tools = self.session.tools();
        let options = DispatchOptions {
            echo_shell_commands: self.config.echo_shell_commands,
        };

        while keep_going && iterations < max_iterations {
            keep_going = false;
            let input = if iterations == 0 {
                user_input
            } else {
                self.config.continue_prompt.as_str()
            };
            history.push_user_text(input);
            iterations += 1;

            debug!(
                task = %self.session.task_name(),
                iteration = iterations,
                turns = history.len(),
                "requesting completion"
            );
            let request = LlmRequest::new(&self.config.model, history.as_slice().to_vec())
                .with_system(system_prompt.as_str())
                .with_tools(tools.clone())
                .with_limits(self.config.max_tokens, self.config.temperature);
            let response = self.provider.complete(&request).await?;

            for block in response.message.content.into_blocks() {
                match block {
                    ContentBlock::ToolUse { id, name, input } => {
                        let call = ToolCall {
                            id: id.clone(),
                            tool_name: name.clone(),
                            arguments: input.clone(),
                        };
                        history.push_assistant_block(ContentBlock::ToolUse { id, name, input });
                        let outcome = dispatch(self.session, self.tools, &call, options).await;
                        messages.extend(outcome.outbound);
                        history.push_tool_result(call.id, outcome.content);
                        keep_going |= outcome.continue_loop;
                    }
                    ContentBlock::Text { text } => {
                        if text.trim().is_empty() {
                            continue;
                        }
                        info!(task = %self.session.task_name(), "model replied with plain text");
                        messages.push(text.clone());
                        history.push_assistant_block(ContentBlock::Text { text });
                    }
                    ContentBlock::ToolResult { tool_use_id, .. } => {
                        warn!(%tool_use_id, "ignoring tool result block in a completion");
                    }
                }
            }
        }

        let exhausted = keep_going;
        if exhausted {
            warn!(
                task = %self.session.task_name(),
                iterations,
                "max agent iterations reached, loop stopped while running"
            );
        }
        if history.close_with_assistant(WAITING_PLACEHOLDER) {
            debug!("closed turn with placeholder assistant reply");
        }

        Ok(TurnOutcome {
            messages,
            history,
            iterations,
            exhausted,
        })
    }
}

//! # runbook-runtime
//!
//! The agent runtime: everything that happens between a user message
//! arriving and the replies going back.
//!
//! ```text
//!   user text ──► Assistant ──► IntentClassifier ──► AgentSession
//!                    │                                (task | meta)
//!                    ▼
//!                AgentLoop ◄──► LlmProvider
//!                    │
//!                    ▼
//!                dispatch ──► AgentTools (shell, task store)
//! ```
//!
//! The loop is bounded by `agent.max_iterations` and keeps the history in a
//! shape the completion protocol accepts after every append.

pub mod agent_loop;
pub mod classifier;
pub mod service;
pub mod session;
pub mod tool_dispatch;
pub mod tools;

pub use agent_loop::{AgentLoop, TurnOutcome, WAITING_PLACEHOLDER};
pub use classifier::{IntentClassifier, intent_prompt, parse_intent};
pub use service::{Assistant, LISTENING_REPLY, NO_INTENT_REPLY};
pub use session::{AgentSession, SessionMode};
pub use tool_dispatch::{
    AgentTool, DispatchOptions, MESSAGE_SENT, ToolInvocation, ToolOutcome, dispatch,
};
pub use tools::{AgentTools, ShellBackend};

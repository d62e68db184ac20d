//! # runbook-core
//!
//! Core types for the Runbook assistant: the error type, the conversation
//! vocabulary (messages, content blocks, history), tool descriptions and the
//! persisted task definition. Every other crate in the workspace speaks these.

pub mod error;
pub mod history;
pub mod message;
pub mod task;
pub mod tool;

pub use error::{Result, RunbookError};
pub use history::ConversationHistory;
pub use message::{ContentBlock, Message, MessageContent, Role};
pub use task::{TaskAction, TaskDef};
pub use tool::{Tool, ToolCall};

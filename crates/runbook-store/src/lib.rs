//! # runbook-store
//!
//! Persistence for task definitions and the conversation history, behind
//! traits so the agent can run against files or memory.

pub mod history;
pub mod tasks;

pub use history::{FileHistoryStore, HistoryStore, InMemoryHistoryStore};
pub use tasks::{
    FileTaskStore, InMemoryTaskStore, StoredTask, TaskListing, TaskStore, validate_task_name,
};

//! # runbook-config
//!
//! Configuration for the Runbook assistant. Reads `runbook.toml`, then applies
//! environment variable overrides.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    AgentConfig, ConfigWarning, LoggingConfig, RunbookConfig, ServicesConfig, ShellConfig,
    ShellMode, StorageConfig, UnclassifiedPolicy, WarningSeverity,
};

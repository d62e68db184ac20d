//! # runbook-cli
//!
//! Command-line interface for the Runbook assistant.
//!
//! ## Commands
//!
//! - `runbook chat`: Interactive chat in the terminal
//! - `runbook send <text>`: One message, replies printed
//! - `runbook transcribe <file>`: Voice message from an audio file
//! - `runbook tasks list|show|delete`: Inspect stored tasks
//! - `runbook emulate`: Try the shell emulator
//! - `runbook config`: Show configuration
//! - `runbook completions <shell>`: Shell completions

pub mod commands;

pub use commands::Cli;

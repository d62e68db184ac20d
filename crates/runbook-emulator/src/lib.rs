//! # runbook-emulator
//!
//! A deterministic, in-memory simulation of a small Ubuntu server shell.
//! Used in place of real command execution for tests and sandboxed runs.
//! It is not a security boundary.

mod builtins;
pub mod emulator;
pub mod fs;

pub use emulator::{Handler, ShellState, UnixEmulator, default_filesystem};
pub use fs::{Node, VirtualFs, normalize};

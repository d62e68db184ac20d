//! # runbook-llm
//!
//! Completion providers (Anthropic Messages API, deterministic mock) and the
//! speech-to-text backend used for audio input.

pub mod anthropic;
pub mod mock;
pub mod provider;
pub mod transcribe;

pub use anthropic::AnthropicProvider;
pub use mock::{MockProvider, MockResponse};
pub use provider::{LlmProvider, LlmRequest, LlmResponse, StopReason, Usage};
pub use transcribe::{OpenAiTranscriber, Transcriber};

use thiserror::Error;

/// Unified error type for the Runbook assistant.
#[derive(Error, Debug)]
pub enum RunbookError {
    // ── Agent errors ───────────────────────────────────────────
    #[error("agent error: {0}")]
    Agent(String),

    // ── LLM errors ─────────────────────────────────────────────
    #[error("llm provider error: {0}")]
    LlmProvider(String),

    #[error("llm rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("llm refused to process the content: {0}")]
    ContentRefused(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("transcription failed: {0}")]
    Transcription(String),

    // ── Store errors ───────────────────────────────────────────
    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("invalid task name: {0:?}")]
    InvalidTaskName(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RunbookError {
    /// Whether the provider declined the content (as opposed to failing).
    pub fn is_refusal(&self) -> bool {
        matches!(self, RunbookError::ContentRefused(_))
    }
}

pub type Result<T> = std::result::Result<T, RunbookError>;

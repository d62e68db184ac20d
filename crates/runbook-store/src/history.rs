use async_trait::async_trait;
use parking_lot::Mutex;
use runbook_core::{ConversationHistory, Message, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Persistence for the conversation history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Load at most the last `max_turns` turns, trimmed so the result opens
    /// on a plain user turn. Missing or unreadable history yields an empty
    /// history.
    async fn load_window(&self, max_turns: usize) -> Result<ConversationHistory>;

    /// Replace the stored history.
    async fn save(&self, history: &ConversationHistory) -> Result<()>;
}

/// History kept as a single JSON array of turns.
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn load_window(&self, max_turns: usize) -> Result<ConversationHistory> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "no history file yet");
                self.ensure_parent().await?;
                return Ok(ConversationHistory::new());
            }
            Err(e) => return Err(e.into()),
        };

        let messages: Vec<Message> = match serde_json::from_str(&raw) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "malformed history file, starting empty");
                return Ok(ConversationHistory::new());
            }
        };

        let total = messages.len();
        let history = ConversationHistory::recent_window(messages, max_turns);
        debug!(total, loaded = history.len(), "loaded history window");
        Ok(history)
    }

    async fn save(&self, history: &ConversationHistory) -> Result<()> {
        self.ensure_parent().await?;
        let body = serde_json::to_string(history)?;
        tokio::fs::write(&self.path, body).await?;
        info!(path = ?self.path, turns = history.len(), "saved history");
        Ok(())
    }
}

/// History held in memory, for tests and throwaway sessions.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    turns: Mutex<Vec<Message>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with raw turns, exactly as a history file would hold them.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            turns: Mutex::new(messages),
        }
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.turns.lock().clone()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn load_window(&self, max_turns: usize) -> Result<ConversationHistory> {
        let messages = self.turns.lock().clone();
        Ok(ConversationHistory::recent_window(messages, max_turns))
    }

    async fn save(&self, history: &ConversationHistory) -> Result<()> {
        *self.turns.lock() = history.as_slice().to_vec();
        Ok(())
    }
}

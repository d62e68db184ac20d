use std::sync::Arc;

use runbook_config::{RunbookConfig, UnclassifiedPolicy};
use runbook_core::{Result, RunbookError};
use runbook_llm::{AnthropicProvider, LlmProvider, OpenAiTranscriber, Transcriber};
use runbook_store::{FileHistoryStore, FileTaskStore, HistoryStore, TaskStore};
use tokio::sync::Mutex as TokioMutex;
use tracing::{info, warn};

use crate::agent_loop::AgentLoop;
use crate::classifier::IntentClassifier;
use crate::session::AgentSession;
use crate::tools::{AgentTools, ShellBackend};

/// Assistant turn inserted when the stored history ends on a user turn.
pub const LISTENING_REPLY: &str = "I'm listening, how can I help you?";

/// Reply used when no task matches and the policy is not to run meta mode.
pub const NO_INTENT_REPLY: &str = "Intent not identified, I'm your devops assistant, ask me to create, edit or remove a devops task or to execute an existing devops task";

/// Handles user turns end to end: history, classification, the agent loop
/// and persistence.
pub struct Assistant {
    config: RunbookConfig,
    provider: Arc<dyn LlmProvider>,
    tasks: Arc<dyn TaskStore>,
    history: Arc<dyn HistoryStore>,
    transcriber: Option<Arc<dyn Transcriber>>,
    classifier: IntentClassifier,
    /// One turn at a time: every turn reads and rewrites the same history.
    run_lock: TokioMutex<()>,
    /// Shared by the tool executors of successive turns.
    task_lock: Arc<TokioMutex<()>>,
}

impl Assistant {
    pub fn new(
        config: RunbookConfig,
        provider: Arc<dyn LlmProvider>,
        tasks: Arc<dyn TaskStore>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let classifier = IntentClassifier::new(provider.clone(), &config.agent);
        Self {
            config,
            provider,
            tasks,
            history,
            transcriber: None,
            classifier,
            run_lock: TokioMutex::new(()),
            task_lock: Arc::new(TokioMutex::new(())),
        }
    }

    /// Wire the Anthropic provider, file stores and, when a key is set, the
    /// OpenAI transcriber.
    pub fn from_config(config: RunbookConfig) -> Self {
        let services = &config.services;
        let provider = AnthropicProvider::new(services.anthropic_api_key.clone().unwrap_or_default())
            .with_base_url(services.anthropic_base_url.clone());
        let transcriber = services
            .openai_api_key
            .clone()
            .map(|key| Arc::new(OpenAiTranscriber::new(key)) as Arc<dyn Transcriber>);
        let tasks = Arc::new(FileTaskStore::new(&config.storage.tasks_dir));
        let history = Arc::new(FileHistoryStore::new(&config.storage.history_file));

        let mut assistant = Self::new(config, Arc::new(provider), tasks, history);
        assistant.transcriber = transcriber;
        assistant
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn config(&self) -> &RunbookConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn tasks(&self) -> &Arc<dyn TaskStore> {
        &self.tasks
    }

    pub fn transcriber(&self) -> Option<&Arc<dyn Transcriber>> {
        self.transcriber.as_ref()
    }

    /// A fresh executor, so each turn starts from a clean emulator.
    fn new_tools(&self) -> AgentTools {
        AgentTools::new(ShellBackend::from_config(&self.config.shell), self.tasks.clone())
            .with_task_lock(self.task_lock.clone())
    }

    /// Process one text message and return the replies for the user.
    pub async fn process_text(&self, text: &str) -> Result<Vec<String>> {
        if text.trim().is_empty() {
            return Err(RunbookError::Agent("empty user input".into()));
        }
        let _turn = self.run_lock.lock().await;

        let mut history = self
            .history
            .load_window(self.config.storage.history_window)
            .await?;
        if history.close_with_assistant(LISTENING_REPLY) {
            info!("history ended on a user turn, added an assistant turn");
        }

        let intent = self
            .classifier
            .classify(text, &history, self.tasks.as_ref())
            .await?;
        let session = match intent {
            Some(intent) => AgentSession::for_task(&intent, self.tasks.clone()).await,
            None => match self.config.agent.unclassified {
                UnclassifiedPolicy::Reply => {
                    info!("no intent found, returning generic response");
                    return Ok(vec![NO_INTENT_REPLY.to_string()]);
                }
                UnclassifiedPolicy::Meta => {
                    info!("no intent found, running in meta mode");
                    AgentSession::meta(self.tasks.clone())
                }
            },
        };

        let tools = self.new_tools();
        let outcome = AgentLoop::new(self.provider.as_ref(), &session, &tools, &self.config.agent)
            .run_turn(text, history)
            .await?;
        info!(
            task = %session.task_name(),
            iterations = outcome.iterations,
            replies = outcome.messages.len(),
            "turn complete"
        );

        self.history.save(&outcome.history).await?;
        Ok(outcome.messages)
    }

    /// Transcribe an audio message, then process the transcript.
    pub async fn process_audio(&self, audio: Vec<u8>, file_name: &str) -> Result<Vec<String>> {
        let Some(transcriber) = &self.transcriber else {
            warn!("audio received but no transcriber is configured");
            return Err(RunbookError::Transcription(
                "no transcription service configured (set OPENAI_API_KEY)".into(),
            ));
        };
        let text = transcriber.transcribe(audio, file_name).await?;
        info!(file = %file_name, chars = text.len(), "transcribed audio message");
        self.process_text(&text).await
    }
}

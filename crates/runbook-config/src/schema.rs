use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration, maps to `runbook.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunbookConfig {
    pub agent: AgentConfig,
    pub shell: ShellConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub services: ServicesConfig,
}

// ── Agent ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model identifier sent to the completion provider.
    pub model: String,
    /// Model used for intent classification (defaults to `model`).
    pub classifier_model: Option<String>,
    /// Maximum tokens per response.
    pub max_tokens: u32,
    /// Temperature (0.0 - 1.0).
    pub temperature: f32,
    /// Maximum completion calls per user turn before the loop is stopped.
    pub max_iterations: u32,
    /// Synthetic user turn inserted between assistant turns when no new
    /// human input exists.
    pub continue_prompt: String,
    /// What to do when no stored task matches the user's message.
    pub unclassified: UnclassifiedPolicy,
    /// Also surface each shell command to the user as it runs.
    pub echo_shell_commands: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".into(),
            classifier_model: None,
            max_tokens: 2000,
            temperature: 0.0,
            max_iterations: 12,
            continue_prompt: "Next action:".into(),
            unclassified: UnclassifiedPolicy::Meta,
            echo_shell_commands: false,
        }
    }
}

impl AgentConfig {
    pub fn classifier_model(&self) -> &str {
        self.classifier_model.as_deref().unwrap_or(&self.model)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnclassifiedPolicy {
    /// Run the agent in meta mode (list/inspect tasks, small talk).
    Meta,
    /// Answer with a fixed explanatory reply, no agent run.
    Reply,
}

// ── Shell ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub mode: ShellMode,
    /// Hard timeout for live shell commands.
    pub timeout_secs: u64,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            mode: ShellMode::Live,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellMode {
    /// Commands run against the real shell.
    Live,
    /// Commands run against the in-memory emulator (test / sandbox mode).
    Emulated,
}

impl std::str::FromStr for ShellMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(ShellMode::Live),
            "emulated" | "test" => Ok(ShellMode::Emulated),
            other => Err(format!("unknown shell mode '{other}'")),
        }
    }
}

// ── Storage ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one `<name>.json` document per task.
    pub tasks_dir: PathBuf,
    /// Conversation history file.
    pub history_file: PathBuf,
    /// Number of most recent turns loaded from the history file.
    pub history_window: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            tasks_dir: PathBuf::from("tasks"),
            history_file: PathBuf::from("data/history.json"),
            history_window: 10,
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

// ── Services ───────────────────────────────────────────────────

/// API credentials for external services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Anthropic API key. Falls back to `ANTHROPIC_API_KEY`.
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    /// OpenAI API key, used for audio transcription. Falls back to `OPENAI_API_KEY`.
    pub openai_api_key: Option<String>,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            anthropic_base_url: "https://api.anthropic.com/v1".into(),
            openai_api_key: None,
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            WarningSeverity::Error => "error",
            WarningSeverity::Warning => "warning",
        };
        write!(f, "{} {}: {}", label, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, " ({})", h)?;
        }
        Ok(())
    }
}

impl RunbookConfig {
    /// Validate the config and return a list of warnings.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> runbook_core::Result<Vec<ConfigWarning>> {
        let mut warnings = Vec::new();

        if self.agent.model.trim().is_empty() {
            warnings.push(ConfigWarning {
                field: "agent.model".into(),
                message: "model is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 'claude-sonnet-4-20250514'".into()),
            });
        }

        if !(0.0..=1.0).contains(&self.agent.temperature) {
            warnings.push(ConfigWarning {
                field: "agent.temperature".into(),
                message: format!("temperature {} is out of range", self.agent.temperature),
                severity: WarningSeverity::Error,
                hint: Some("Temperature must be between 0.0 and 1.0".into()),
            });
        }

        if self.agent.max_tokens == 0 {
            warnings.push(ConfigWarning {
                field: "agent.max_tokens".into(),
                message: "max_tokens is 0, the agent won't produce output".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 2000".into()),
            });
        }

        if self.agent.max_iterations == 0 {
            warnings.push(ConfigWarning {
                field: "agent.max_iterations".into(),
                message: "max_iterations is 0, the agent loop would never call the model".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 12".into()),
            });
        } else if self.agent.max_iterations > 50 {
            warnings.push(ConfigWarning {
                field: "agent.max_iterations".into(),
                message: format!(
                    "max_iterations {} allows very long tool chains per message",
                    self.agent.max_iterations
                ),
                severity: WarningSeverity::Warning,
                hint: None,
            });
        }

        if self.agent.continue_prompt.trim().is_empty() {
            warnings.push(ConfigWarning {
                field: "agent.continue_prompt".into(),
                message: "continue_prompt is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("The loop needs a user turn between assistant turns".into()),
            });
        }

        if self.shell.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                field: "shell.timeout_secs".into(),
                message: "timeout_secs is 0, every live command would time out".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 30".into()),
            });
        }

        if self.storage.history_window == 0 {
            warnings.push(ConfigWarning {
                field: "storage.history_window".into(),
                message: "history_window is 0, no prior turns will be loaded".into(),
                severity: WarningSeverity::Warning,
                hint: None,
            });
        }

        if self.services.anthropic_api_key.is_none() {
            warnings.push(ConfigWarning {
                field: "services.anthropic_api_key".into(),
                message: "no Anthropic API key configured".into(),
                severity: WarningSeverity::Warning,
                hint: Some("Set it in runbook.toml or export ANTHROPIC_API_KEY".into()),
            });
        }

        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        }

        let errors: Vec<&ConfigWarning> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .collect();

        if !errors.is_empty() {
            return Err(runbook_core::RunbookError::ConfigValidation {
                field: errors.iter().map(|w| w.field.as_str()).collect::<Vec<_>>().join(", "),
                reason: errors.iter().map(|w| w.message.as_str()).collect::<Vec<_>>().join("; "),
            });
        }

        Ok(warnings)
    }
}

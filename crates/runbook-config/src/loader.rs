use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::schema::{RunbookConfig, ShellMode};

/// Loads the Runbook configuration once at startup.
///
/// The loaded value is handed to the rest of the program explicitly; nothing
/// reads configuration from process-wide state after this point.
///
/// Loading usually runs before a subscriber is installed, so warnings are
/// collected and emitted later by [`log_warnings`](Self::log_warnings).
pub struct ConfigLoader {
    config: RunbookConfig,
    config_path: PathBuf,
    warnings: Vec<String>,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > RUNBOOK_CONFIG env > ~/.runbook/runbook.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("RUNBOOK_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".runbook")
            .join("runbook.toml")
    }

    /// Load the config from disk, falling back to defaults, then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> runbook_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let mut warnings = Vec::new();
        let config = if config_path.exists() {
            let raw = std::fs::read_to_string(&config_path)?;
            Self::parse(&raw, &config_path)?
        } else {
            warnings.push(format!(
                "config file {} not found, using defaults",
                config_path.display()
            ));
            RunbookConfig::default()
        };

        let (config, env_warnings) =
            Self::apply_env_overrides(config, |key| std::env::var(key).ok());
        warnings.extend(env_warnings);
        warnings.extend(config.validate()?.iter().map(ToString::to_string));

        Ok(Self {
            config,
            config_path,
            warnings,
        })
    }

    /// Parse a TOML document into a config.
    pub fn parse(raw: &str, origin: &Path) -> runbook_core::Result<RunbookConfig> {
        toml::from_str::<RunbookConfig>(raw).map_err(|e| {
            runbook_core::RunbookError::Config(format!(
                "failed to parse {}: {}",
                origin.display(),
                e
            ))
        })
    }

    /// Get a copy of the loaded config.
    pub fn get(&self) -> RunbookConfig {
        self.config.clone()
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Warnings gathered while loading, in the order they were found.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Emit the gathered warnings. Call once tracing is initialised.
    pub fn log_warnings(&self) {
        info!(path = ?self.config_path, "configuration loaded");
        for w in &self.warnings {
            warn!("{}", w);
        }
    }

    /// Apply environment overrides. `lookup` resolves a variable name.
    /// Returns the config and a warning for every override that was ignored.
    ///
    /// Model, log level and shell mode always override the file; API keys
    /// only fill in when the file leaves them unset.
    pub fn apply_env_overrides<F>(mut config: RunbookConfig, lookup: F) -> (RunbookConfig, Vec<String>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        if let Some(v) = lookup("RUNBOOK_AGENT_MODEL").or_else(|| lookup("LLM_MODEL")) {
            config.agent.model = v;
        }
        if let Some(v) = lookup("RUNBOOK_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Some(v) = lookup("RUNBOOK_SHELL_MODE") {
            match v.parse::<ShellMode>() {
                Ok(mode) => config.shell.mode = mode,
                Err(e) => warnings.push(format!("ignoring RUNBOOK_SHELL_MODE: {e}")),
            }
        }
        if config.services.anthropic_api_key.is_none() {
            config.services.anthropic_api_key = lookup("ANTHROPIC_API_KEY");
        }
        if config.services.openai_api_key.is_none() {
            config.services.openai_api_key = lookup("OPENAI_API_KEY");
        }
        (config, warnings)
    }
}

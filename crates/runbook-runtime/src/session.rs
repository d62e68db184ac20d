use std::sync::Arc;

use runbook_core::{Result, RunbookError, TaskDef, Tool};
use runbook_store::{TaskListing, TaskStore};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::tool_dispatch::AgentTool;

const META_TASK_NAME: &str = "meta";

const META_GOAL: &str =
    "Help the user with meta tasks like viewing available tasks and providing information";

const META_PROMPT: &str = "
You are an AI assistant that helps users manage their DevOps tasks.
You're currently running in meta mode, which means you:

1. Respond to small talk and general questions in a friendly, helpful manner
2. List all available tasks in the tasks directory when asked using the list_tasks tool
3. Show detailed information about a specific task when asked using the get_task_details tool
4. Run shell commands to provide information the user asks about using the run_shell tool

When listing tasks, format them in a clear, organized way.
When describing task details, highlight the goal, context, and commands.
When the user asks about system information or status, use appropriate shell commands to gather that information.

You can help users:
- Find and understand existing tasks
- Get information about the system environment
- Navigate their available automation options
- Answer general questions about DevOps concepts

Think step by step about what the user needs based on their input.
Use the available tools to perform actions as needed.
Only communicate with the user through the send_message tool.
";

/// Which system prompt and tool catalog a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// A task was selected; the prompt is built from its definition.
    Task,
    /// No task matched; the session can list and inspect tasks.
    Meta,
}

/// Per-turn agent configuration derived from the selected task.
pub struct AgentSession {
    mode: SessionMode,
    task_name: String,
    goal: String,
    context: Map<String, Value>,
    commands: Vec<String>,
    store: Arc<dyn TaskStore>,
}

impl AgentSession {
    /// Task mode when `intent` is set, meta mode otherwise.
    pub async fn new(intent: Option<&str>, store: Arc<dyn TaskStore>) -> Self {
        match intent {
            Some(intent) => Self::for_task(intent, store).await,
            None => Self::meta(store),
        }
    }

    /// Load the definition for `intent`. A missing or unreadable definition
    /// falls back to a goal derived from the name.
    pub async fn for_task(intent: &str, store: Arc<dyn TaskStore>) -> Self {
        let mut session = Self {
            mode: SessionMode::Task,
            task_name: intent.to_string(),
            goal: fallback_goal(intent),
            context: Map::new(),
            commands: Vec::new(),
            store,
        };

        let loaded = session.store.load(intent).await;
        match loaded {
            Ok(Some(task)) => {
                info!(task = %intent, "loaded task definition");
                if !task.goal.is_empty() {
                    session.goal = task.goal;
                }
                session.context = task.context;
                session.commands = task.commands;
            }
            Ok(None) => warn!(task = %intent, "task definition not found, using intent as goal"),
            Err(e) => error!(task = %intent, error = %e, "could not load task definition, using intent as goal"),
        }
        session
    }

    pub fn meta(store: Arc<dyn TaskStore>) -> Self {
        Self {
            mode: SessionMode::Meta,
            task_name: META_TASK_NAME.into(),
            goal: META_GOAL.into(),
            context: Map::new(),
            commands: Vec::new(),
            store,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn is_meta(&self) -> bool {
        self.mode == SessionMode::Meta
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn system_prompt(&self) -> String {
        match self.mode {
            SessionMode::Meta => META_PROMPT.to_string(),
            SessionMode::Task => self.task_prompt(),
        }
    }

    fn task_prompt(&self) -> String {
        let context = serde_json::to_string_pretty(&self.context).unwrap_or_default();
        let commands = if self.commands.is_empty() {
            String::new()
        } else {
            let mut listed = String::from("Commands to execute:\n");
            for command in &self.commands {
                listed.push_str(command);
                listed.push('\n');
            }
            listed
        };

        format!(
            "
You are an AI assistant that helps users manage and execute commands.
Your goal is: {goal}\n\n
Current task name: {task_name}\n\n
Current context information:
{context}\n\n
{commands}\n\n
Think step by step about what you need to accomplish based on the user's input and your goal.
Use the available tools when needed to perform actions.
Before running a task that comprises multiple shell commands ask for confirmation and if user asks for changes to the commands use update_tasks tool to update the commands for the task.
You can update the context for a task at any time as you gather more information from user and from the commands you run.
Keep commands short, avoid unnecessary commands.
",
            goal = self.goal,
            task_name = self.task_name,
        )
    }

    /// Whether `tool` is in this session's catalog.
    pub fn offers(&self, tool: AgentTool) -> bool {
        self.is_meta() || !tool.is_meta_only()
    }

    /// Tool catalog for the completion call.
    pub fn tools(&self) -> Vec<Tool> {
        AgentTool::ALL
            .into_iter()
            .filter(|tool| self.offers(*tool))
            .map(|tool| tool.definition())
            .collect()
    }

    /// One `- name: goal` line per stored task. Unparseable documents are
    /// listed with an inline error.
    pub async fn list_available_tasks(&self) -> String {
        let entries = match self.store.list().await {
            Ok(TaskListing::NoStore) => return "No tasks directory found.".into(),
            Ok(TaskListing::Tasks(entries)) => entries,
            Err(e) => {
                error!(error = %e, "failed to list tasks");
                return format!("Error listing tasks: {e}");
            }
        };
        if entries.is_empty() {
            return "No tasks found in tasks directory.".into();
        }

        let mut out = String::from("Available tasks:\n\n");
        for entry in entries {
            match entry.parsed {
                Ok(task) => {
                    out.push_str(&format!("- {}: {}\n", entry.name, goal_or_default(&task)));
                }
                Err(_) => {
                    out.push_str(&format!("- {}: [Error: Could not parse task file]\n", entry.name));
                }
            }
        }
        out
    }

    /// Goal, pretty-printed context and numbered commands of one task.
    pub async fn get_task_details(&self, name: &str) -> String {
        let task = match self.store.load(name).await {
            Ok(Some(task)) => task,
            Ok(None) | Err(RunbookError::InvalidTaskName(_)) => {
                return format!("Task '{name}' not found.");
            }
            Err(RunbookError::Serialization(_)) => {
                return format!("Error: Could not parse task file for '{name}'.");
            }
            Err(e) => return format!("Error retrieving task details: {e}"),
        };

        let mut out = format!("Task: {name}\n\nGoal: {}\n\n", goal_or_default(&task));
        if task.context.is_empty() {
            out.push_str("Context: No context information available.\n\n");
        } else {
            out.push_str("Context:\n");
            out.push_str(&serde_json::to_string_pretty(&task.context).unwrap_or_default());
            out.push_str("\n\n");
        }
        if task.commands.is_empty() {
            out.push_str("Commands: No commands defined.\n");
        } else {
            out.push_str("Commands:\n");
            for (i, command) in task.commands.iter().enumerate() {
                out.push_str(&format!("{}. {command}\n", i + 1));
            }
        }
        out
    }

    pub fn set_context(&mut self, key: impl Into<String>, value: Value) {
        self.context.insert(key.into(), value);
    }

    /// Write this session's context into the stored task definition.
    ///
    /// Fails with `TaskNotFound` when the definition does not exist. A
    /// document that no longer parses is replaced by a minimal one.
    pub async fn save_context(&self) -> Result<()> {
        if self.is_meta() {
            return Err(RunbookError::Agent("meta sessions have no task context".into()));
        }
        let mut task = match self.store.load(&self.task_name).await {
            Ok(Some(task)) => task,
            Ok(None) => return Err(RunbookError::TaskNotFound(self.task_name.clone())),
            Err(RunbookError::Serialization(e)) => {
                error!(task = %self.task_name, error = %e, "task definition is malformed, rewriting it");
                TaskDef::new(&self.task_name, fallback_goal(&self.task_name))
            }
            Err(e) => return Err(e),
        };
        task.context = self.context.clone();
        self.store.save(&task).await?;
        info!(task = %self.task_name, "saved task context");
        Ok(())
    }
}

impl std::fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSession")
            .field("mode", &self.mode)
            .field("task_name", &self.task_name)
            .field("goal", &self.goal)
            .finish_non_exhaustive()
    }
}

fn fallback_goal(intent: &str) -> String {
    format!("Process {intent} requests")
}

fn goal_or_default(task: &TaskDef) -> &str {
    if task.goal.is_empty() {
        "No goal specified"
    } else {
        &task.goal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runbook_store::InMemoryTaskStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_task_prompt_lists_commands() {
        let store = Arc::new(InMemoryTaskStore::new().with_task(
            TaskDef::new("deploy_api", "Deploy the API").with_commands(["git pull", "sudo reboot"]),
        ));
        let session = AgentSession::for_task("deploy_api", store).await;
        let prompt = session.system_prompt();
        assert!(prompt.contains("Your goal is: Deploy the API\n\n\n"));
        assert!(prompt.contains("Current task name: deploy_api"));
        assert!(prompt.contains("Commands to execute:\ngit pull\nsudo reboot\n"));
        assert!(prompt.contains("Current context information:\n{}\n"));
    }

    #[tokio::test]
    async fn test_empty_goal_falls_back() {
        let store = Arc::new(InMemoryTaskStore::new().with_raw("backup", json!({"commands": ["tar"]})));
        let session = AgentSession::for_task("backup", store).await;
        assert_eq!(session.goal(), "Process backup requests");
        assert_eq!(session.commands(), ["tar".to_string()]);

        let store = Arc::new(InMemoryTaskStore::new().with_raw("blank", json!({"goal": ""})));
        let session = AgentSession::for_task("blank", store).await;
        assert_eq!(session.goal(), "Process blank requests");
    }

    #[tokio::test]
    async fn test_meta_session_rejects_save_context() {
        let session = AgentSession::meta(Arc::new(InMemoryTaskStore::new()));
        assert_eq!(session.task_name(), "meta");
        assert!(session.save_context().await.is_err());
    }
}

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use runbook_config::{ShellConfig, ShellMode};
use runbook_core::{RunbookError, TaskAction, TaskDef};
use runbook_emulator::UnixEmulator;
use runbook_store::TaskStore;
use serde_json::Value;
use tokio::sync::Mutex as TokioMutex;
use tracing::{error, info, warn};

/// Where `run_shell` sends commands.
pub enum ShellBackend {
    /// The in-memory emulator. Nothing touches the host.
    Emulated(Mutex<UnixEmulator>),
    /// `sh -c` on the host, killed after `timeout`.
    Live { timeout: Duration },
}

impl ShellBackend {
    pub fn from_config(config: &ShellConfig) -> Self {
        match config.mode {
            ShellMode::Emulated => ShellBackend::Emulated(Mutex::new(UnixEmulator::new())),
            ShellMode::Live => ShellBackend::Live {
                timeout: Duration::from_secs(config.timeout_secs),
            },
        }
    }

    pub fn is_emulated(&self) -> bool {
        matches!(self, ShellBackend::Emulated(_))
    }
}

/// The side-effecting operations the agent loop can invoke.
///
/// Every failure is returned as text: the model reads tool output directly
/// and is expected to recover from a failed command on its own.
pub struct AgentTools {
    shell: ShellBackend,
    store: Arc<dyn TaskStore>,
    /// Serialises read-check-write sequences on the task store.
    task_lock: Arc<TokioMutex<()>>,
}

impl AgentTools {
    pub fn new(shell: ShellBackend, store: Arc<dyn TaskStore>) -> Self {
        if shell.is_emulated() {
            info!("shell commands run against the emulator, nothing is executed on the host");
        }
        Self {
            shell,
            store,
            task_lock: Arc::new(TokioMutex::new(())),
        }
    }

    /// Share a task-store lock with other executors writing the same store.
    pub fn with_task_lock(mut self, lock: Arc<TokioMutex<()>>) -> Self {
        self.task_lock = lock;
        self
    }

    pub fn is_emulated(&self) -> bool {
        self.shell.is_emulated()
    }

    /// Run a command and return its output.
    ///
    /// A zero exit returns stdout alone. A non-zero exit returns the code and
    /// both streams. A timeout or a spawn failure is also returned as text.
    pub async fn run_shell(&self, command: &str) -> String {
        info!(command, "running shell command");
        match &self.shell {
            ShellBackend::Emulated(emulator) => emulator.lock().execute(command),
            ShellBackend::Live { timeout } => run_live(command, *timeout).await,
        }
    }

    /// Add, edit or delete a task definition and describe the outcome.
    pub async fn update_task(&self, action: TaskAction, name: &str, data: Option<Value>) -> String {
        info!(action = %action, task = %name, "updating task");
        let _guard = self.task_lock.lock().await;

        if action == TaskAction::Delete {
            return match self.store.delete(name).await {
                Ok(true) => format!("Task '{name}' deleted successfully"),
                Ok(false) => format!("Task '{name}' not found"),
                Err(e) => failure(action, name, &e),
            };
        }

        let Some(data) = data else {
            return "Error: task_data is required for add or edit actions".to_string();
        };

        let exists = match self.store.exists(name).await {
            Ok(exists) => exists,
            Err(e) => return failure(action, name, &e),
        };
        match action {
            TaskAction::Add if exists => return format!("Error: Task '{name}' already exists"),
            TaskAction::Edit if !exists => return format!("Error: Task '{name}' not found"),
            _ => {}
        }

        let task = match TaskDef::from_tool_data(name, data) {
            Ok(task) => task,
            Err(reason) => {
                warn!(task = %name, %reason, "rejected task data");
                return format!("Failed to {action} task '{name}': {reason}");
            }
        };

        match self.store.save(&task).await {
            Ok(()) => format!("Task '{name}' {} successfully", action.past_tense()),
            Err(e) => failure(action, name, &e),
        }
    }
}

fn failure(action: TaskAction, name: &str, err: &RunbookError) -> String {
    let message = format!("Failed to {action} task '{name}': {err}");
    error!(task = %name, action = %action, error = %err, "task update failed");
    message
}

async fn run_live(command: &str, timeout: Duration) -> String {
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c").arg(command);
    // Interactive commands fail fast instead of hanging on a prompt.
    cmd.stdin(std::process::Stdio::null());
    cmd.kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!(command, error = %e, "failed to start shell command");
            return format!("Command could not be started: {e}");
        }
        Err(_) => {
            warn!(command, timeout_secs = timeout.as_secs(), "shell command timed out");
            return format!("Command timed out after {} seconds.", timeout.as_secs());
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    if output.status.success() {
        return stdout.into_owned();
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let code = output.status.code().unwrap_or(-1);
    format!("Command failed with return code {code}.\nSTDOUT: {stdout}\nSTDERR: {stderr}")
}

use runbook_core::{TaskAction, Tool, ToolCall};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::session::AgentSession;
use crate::tools::AgentTools;

/// Acknowledgement returned to the model for `send_message`.
pub const MESSAGE_SENT: &str = "Message sent";

/// The fixed tool vocabulary offered to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentTool {
    SendMessage,
    RunShell,
    UpdateTasks,
    ListTasks,
    GetTaskDetails,
}

impl AgentTool {
    pub const ALL: [AgentTool; 5] = [
        AgentTool::SendMessage,
        AgentTool::RunShell,
        AgentTool::UpdateTasks,
        AgentTool::ListTasks,
        AgentTool::GetTaskDetails,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AgentTool::SendMessage => "send_message",
            AgentTool::RunShell => "run_shell",
            AgentTool::UpdateTasks => "update_tasks",
            AgentTool::ListTasks => "list_tasks",
            AgentTool::GetTaskDetails => "get_task_details",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Tools only offered when no task was selected.
    pub fn is_meta_only(&self) -> bool {
        matches!(self, AgentTool::ListTasks | AgentTool::GetTaskDetails)
    }

    pub fn definition(&self) -> Tool {
        let (description, parameters) = match self {
            AgentTool::SendMessage => (
                "Send a message to the user",
                json!({
                    "type": "object",
                    "properties": {
                        "message": {
                            "type": "string",
                            "description": "The message to send to the user"
                        }
                    },
                    "required": ["message"]
                }),
            ),
            AgentTool::RunShell => (
                "Run a bash command and return the output. This tool is stateless so if you change directory with \"cd\" command the change only applies to this invocation, further invocations start from the same initial state",
                json!({
                    "type": "object",
                    "properties": {
                        "command": {
                            "type": "string",
                            "description": "bash command to run"
                        }
                    },
                    "required": ["command"]
                }),
            ),
            AgentTool::UpdateTasks => (
                "Add, edit, or delete tasks",
                json!({
                    "type": "object",
                    "properties": {
                        "action": {
                            "type": "string",
                            "enum": ["add", "edit", "delete"],
                            "description": "Action to perform on the task"
                        },
                        "task_name": {
                            "type": "string",
                            "description": "Name of the task to operate on"
                        },
                        "task_data": {
                            "type": "object",
                            "description": "Data for the task when adding or editing, a json with props: goal, steps, context(relevant technical context like pwd, credentials, etc required to execute the task, if given extract it from the user input and also run shell commands to get it), commands(Shell commands required to perform the task, infer it from text and gather it autonomously using context and run_shell tool) and description(Infer it). not required for delete"
                        }
                    },
                    "required": ["action", "task_name"]
                }),
            ),
            AgentTool::ListTasks => (
                "List all available tasks in the tasks directory",
                json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            ),
            AgentTool::GetTaskDetails => (
                "Get detailed information about a specific task",
                json!({
                    "type": "object",
                    "properties": {
                        "task_name": {
                            "type": "string",
                            "description": "Name of the task to get details for"
                        }
                    },
                    "required": ["task_name"]
                }),
            ),
        };
        Tool {
            name: self.name().into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool call with its arguments checked and typed.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    SendMessage {
        message: String,
    },
    RunShell {
        command: String,
    },
    UpdateTasks {
        action: TaskAction,
        task_name: String,
        task_data: Option<Value>,
    },
    ListTasks,
    GetTaskDetails {
        task_name: String,
    },
}

impl ToolInvocation {
    /// Type the arguments of `call`. The error is the text handed back to
    /// the model.
    pub fn parse(call: &ToolCall) -> Result<Self, String> {
        let tool = AgentTool::from_name(&call.tool_name)
            .ok_or_else(|| format!("Tool not found: {}", call.tool_name))?;
        let required = |key: &str| {
            call.str_arg(key)
                .map(str::to_string)
                .ok_or_else(|| format!("Error: {} requires a string '{key}' argument", tool.name()))
        };

        Ok(match tool {
            AgentTool::SendMessage => ToolInvocation::SendMessage {
                message: required("message")?,
            },
            AgentTool::RunShell => ToolInvocation::RunShell {
                command: required("command")?,
            },
            AgentTool::UpdateTasks => ToolInvocation::UpdateTasks {
                action: required("action")?
                    .parse::<TaskAction>()
                    .map_err(|e| format!("Error: {e}"))?,
                task_name: required("task_name")?,
                task_data: call.arguments.get("task_data").filter(|v| !v.is_null()).cloned(),
            },
            AgentTool::ListTasks => ToolInvocation::ListTasks,
            AgentTool::GetTaskDetails => ToolInvocation::GetTaskDetails {
                task_name: required("task_name")?,
            },
        })
    }

    pub fn tool(&self) -> AgentTool {
        match self {
            ToolInvocation::SendMessage { .. } => AgentTool::SendMessage,
            ToolInvocation::RunShell { .. } => AgentTool::RunShell,
            ToolInvocation::UpdateTasks { .. } => AgentTool::UpdateTasks,
            ToolInvocation::ListTasks => AgentTool::ListTasks,
            ToolInvocation::GetTaskDetails { .. } => AgentTool::GetTaskDetails,
        }
    }
}

/// What one tool call produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    /// Tool-result content for the history.
    pub content: String,
    /// Text to deliver to the user, if any.
    pub outbound: Option<String>,
    /// Whether the model needs another completion to read the result.
    pub continue_loop: bool,
}

impl ToolOutcome {
    fn followup(content: String) -> Self {
        Self {
            content,
            outbound: None,
            continue_loop: true,
        }
    }
}

/// Options that change what dispatch reports to the user.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOptions {
    /// Also surface `running: <command>` for each shell command.
    pub echo_shell_commands: bool,
}

/// Execute one tool call from a completion.
///
/// Unknown tools, bad arguments and tools the session does not offer all
/// come back as an error result with `continue_loop` set, so the model sees
/// its mistake on the next completion.
pub async fn dispatch(
    session: &AgentSession,
    tools: &AgentTools,
    call: &ToolCall,
    options: DispatchOptions,
) -> ToolOutcome {
    debug!(tool = %call.tool_name, id = %call.id, "executing tool");

    let invocation = match ToolInvocation::parse(call) {
        Ok(invocation) => invocation,
        Err(reason) => {
            warn!(tool = %call.tool_name, %reason, "invalid tool call");
            return ToolOutcome::followup(reason);
        }
    };
    if !session.offers(invocation.tool()) {
        warn!(tool = %call.tool_name, mode = ?session.mode(), "tool not offered in this mode");
        return ToolOutcome::followup(format!("Tool not found: {}", call.tool_name));
    }

    match invocation {
        ToolInvocation::SendMessage { message } => handle_send_message(message),
        ToolInvocation::RunShell { command } => handle_run_shell(tools, &command, options).await,
        ToolInvocation::UpdateTasks {
            action,
            task_name,
            task_data,
        } => handle_update_tasks(tools, action, &task_name, task_data).await,
        ToolInvocation::ListTasks => handle_list_tasks(session).await,
        ToolInvocation::GetTaskDetails { task_name } => {
            handle_get_task_details(session, &task_name).await
        }
    }
}

fn handle_send_message(message: String) -> ToolOutcome {
    ToolOutcome {
        content: MESSAGE_SENT.into(),
        outbound: Some(message),
        continue_loop: false,
    }
}

async fn handle_run_shell(tools: &AgentTools, command: &str, options: DispatchOptions) -> ToolOutcome {
    let output = tools.run_shell(command).await;
    ToolOutcome {
        content: output,
        outbound: options
            .echo_shell_commands
            .then(|| format!("running: {command}")),
        continue_loop: true,
    }
}

async fn handle_update_tasks(
    tools: &AgentTools,
    action: TaskAction,
    task_name: &str,
    task_data: Option<Value>,
) -> ToolOutcome {
    ToolOutcome::followup(tools.update_task(action, task_name, task_data).await)
}

async fn handle_list_tasks(session: &AgentSession) -> ToolOutcome {
    ToolOutcome::followup(session.list_available_tasks().await)
}

async fn handle_get_task_details(session: &AgentSession, task_name: &str) -> ToolOutcome {
    ToolOutcome::followup(session.get_task_details(task_name).await)
}

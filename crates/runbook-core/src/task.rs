use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A named, persisted automation definition.
///
/// Persisted as one JSON document per task:
/// `{"intent_name", "goal", "description"?, "context", "commands"}`.
/// Fields the model adds beyond these (e.g. `steps`) are kept in `extra`
/// so a load/save cycle does not drop them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDef {
    #[serde(rename = "intent_name", default)]
    pub name: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Facts gathered while executing the task. No fixed schema.
    #[serde(default)]
    pub context: Map<String, Value>,
    /// Shell commands in execution order.
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskDef {
    pub fn new(name: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            goal: goal.into(),
            ..Default::default()
        }
    }

    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands = commands.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Build a task from the free-form `task_data` object a model supplied,
    /// injecting `name` as the intent name.
    pub fn from_tool_data(name: &str, data: Value) -> std::result::Result<Self, String> {
        let Value::Object(mut fields) = data else {
            return Err("task_data must be a JSON object".into());
        };
        fields.insert("intent_name".into(), Value::String(name.to_string()));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| format!("task_data is not a valid task definition: {e}"))
    }
}

/// Mutation requested through the `update_tasks` tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskAction {
    Add,
    Edit,
    Delete,
}

impl TaskAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskAction::Add => "add",
            TaskAction::Edit => "edit",
            TaskAction::Delete => "delete",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            TaskAction::Add => "added",
            TaskAction::Edit => "edited",
            TaskAction::Delete => "deleted",
        }
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "add" => Ok(TaskAction::Add),
            "edit" => Ok(TaskAction::Edit),
            "delete" => Ok(TaskAction::Delete),
            other => Err(format!("unknown task action '{other}', expected add, edit or delete")),
        }
    }
}

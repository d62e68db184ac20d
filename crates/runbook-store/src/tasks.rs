use async_trait::async_trait;
use parking_lot::RwLock;
use runbook_core::{Result, RunbookError, TaskDef};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One entry of a store listing. A document that fails to parse is still
/// listed, with the parse error in place of the definition.
#[derive(Debug, Clone)]
pub struct StoredTask {
    pub name: String,
    pub parsed: std::result::Result<TaskDef, String>,
}

/// Result of enumerating a task store.
#[derive(Debug, Clone)]
pub enum TaskListing {
    /// The backing store does not exist at all (e.g. no tasks directory).
    NoStore,
    /// The store exists. Entries are sorted by name and may be empty.
    Tasks(Vec<StoredTask>),
}

impl TaskListing {
    /// Successfully parsed definitions, in name order.
    pub fn definitions(&self) -> Vec<&TaskDef> {
        match self {
            TaskListing::NoStore => vec![],
            TaskListing::Tasks(entries) => entries
                .iter()
                .filter_map(|e| e.parsed.as_ref().ok())
                .collect(),
        }
    }
}

/// Persistence for task definitions, keyed by task name.
///
/// `load` returns `Ok(None)` for a missing task and
/// `Err(RunbookError::Serialization)` for a document that exists but does not
/// parse, so callers can tell the two apart.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn load(&self, name: &str) -> Result<Option<TaskDef>>;

    /// Write `task` under `task.name`, replacing any existing document.
    async fn save(&self, task: &TaskDef) -> Result<()>;

    /// Remove a task. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool>;

    async fn exists(&self, name: &str) -> Result<bool>;

    async fn list(&self) -> Result<TaskListing>;
}

/// Reject names that could escape the store or collide with its layout.
pub fn validate_task_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed != name
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.contains('\0')
    {
        return Err(RunbookError::InvalidTaskName(name.to_string()));
    }
    Ok(())
}

// ── JSON directory store ───────────────────────────────────────

/// One pretty-printed `<name>.json` document per task in a directory.
pub struct FileTaskStore {
    dir: PathBuf,
}

impl FileTaskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_task_name(name)?;
        Ok(self.dir.join(format!("{name}.json")))
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn load(&self, name: &str) -> Result<Option<TaskDef>> {
        let path = self.path_for(name)?;
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let task: TaskDef = serde_json::from_str(&raw)?;
        debug!(task = %name, path = ?path, "loaded task definition");
        Ok(Some(task))
    }

    async fn save(&self, task: &TaskDef) -> Result<()> {
        let path = self.path_for(&task.name)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_string_pretty(task)?;
        tokio::fs::write(&path, body).await?;
        info!(task = %task.name, path = ?path, "saved task definition");
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(task = %name, "deleted task definition");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn list(&self) -> Result<TaskListing> {
        if !tokio::fs::try_exists(&self.dir).await? {
            debug!(dir = ?self.dir, "tasks directory does not exist");
            return Ok(TaskListing::NoStore);
        }

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut tasks = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            let parsed = match tokio::fs::read_to_string(&path).await {
                Ok(raw) => serde_json::from_str::<TaskDef>(&raw).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            if let Err(ref e) = parsed {
                warn!(path = ?path, error = %e, "failed to parse task definition");
            }
            tasks.push(StoredTask { name, parsed });
        }
        tasks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(TaskListing::Tasks(tasks))
    }
}

// ── In-memory store ────────────────────────────────────────────

/// Task store backed by a map of raw JSON documents. Used by tests and the
/// emulated shell mode when nothing should touch disk.
#[derive(Default)]
pub struct InMemoryTaskStore {
    docs: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(self, task: TaskDef) -> Self {
        let name = task.name.clone();
        let doc = serde_json::to_value(&task).unwrap_or(Value::Null);
        self.docs.write().insert(name, doc);
        self
    }

    /// Insert an arbitrary document, valid or not.
    pub fn with_raw(self, name: impl Into<String>, doc: Value) -> Self {
        self.docs.write().insert(name.into(), doc);
        self
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn load(&self, name: &str) -> Result<Option<TaskDef>> {
        validate_task_name(name)?;
        let Some(doc) = self.docs.read().get(name).cloned() else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(doc)?))
    }

    async fn save(&self, task: &TaskDef) -> Result<()> {
        validate_task_name(&task.name)?;
        let doc = serde_json::to_value(task)?;
        self.docs.write().insert(task.name.clone(), doc);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        validate_task_name(name)?;
        Ok(self.docs.write().remove(name).is_some())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        validate_task_name(name)?;
        Ok(self.docs.read().contains_key(name))
    }

    async fn list(&self) -> Result<TaskListing> {
        let tasks = self
            .docs
            .read()
            .iter()
            .map(|(name, doc)| StoredTask {
                name: name.clone(),
                parsed: serde_json::from_value::<TaskDef>(doc.clone()).map_err(|e| e.to_string()),
            })
            .collect();
        Ok(TaskListing::Tasks(tasks))
    }
}

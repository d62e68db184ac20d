use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::builtins;
use crate::fs::{VirtualFs, normalize};

pub const DEFAULT_USER: &str = "pablo";
pub const DEFAULT_HOME: &str = "/home/pablo";

/// A command handler. Receives the shell state and the argument string that
/// follows the (possibly compound) command name.
pub type Handler = Box<dyn Fn(&mut ShellState, &str) -> String + Send + Sync>;

/// Mutable state a handler may read or change.
#[derive(Debug, Clone)]
pub struct ShellState {
    pub fs: VirtualFs,
    cwd: String,
    home: String,
    user: String,
}

impl ShellState {
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Move to `path` if it names a directory. Returns whether it moved.
    pub fn set_cwd(&mut self, path: String) -> bool {
        if !self.fs.is_dir(&path) {
            return false;
        }
        self.cwd = path;
        true
    }

    /// Walk up from the current directory until an existing directory is
    /// found. Used after the tree is mutated under the shell.
    fn repair_cwd(&mut self) {
        while !self.fs.is_dir(&self.cwd) {
            self.cwd = normalize(&self.cwd, "..");
        }
    }
}

/// The default tree: `/home/pablo/motionapps`.
pub fn default_filesystem() -> VirtualFs {
    let mut fs = VirtualFs::empty();
    fs.add_entry(&format!("{DEFAULT_HOME}/motionapps"), true);
    fs
}

/// Deterministic in-memory stand-in for a Unix shell.
///
/// `execute` never fails: unknown commands come back as ordinary output so
/// the caller can hand the text straight to a model.
pub struct UnixEmulator {
    state: ShellState,
    handlers: HashMap<String, Handler>,
    compound_prefixes: HashSet<String>,
}

impl Default for UnixEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UnixEmulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut commands: Vec<&String> = self.handlers.keys().collect();
        commands.sort();
        f.debug_struct("UnixEmulator")
            .field("cwd", &self.state.cwd)
            .field("commands", &commands)
            .finish()
    }
}

impl UnixEmulator {
    /// An emulator over the default tree, starting in the home directory.
    pub fn new() -> Self {
        Self::with_filesystem(default_filesystem())
    }

    /// An emulator over a caller-supplied tree. The home directory is created
    /// if the tree lacks it.
    pub fn with_filesystem(mut fs: VirtualFs) -> Self {
        if !fs.is_dir(DEFAULT_HOME) {
            fs.add_entry(DEFAULT_HOME, true);
        }
        let mut handlers = HashMap::new();
        builtins::register(&mut handlers);
        Self {
            state: ShellState {
                fs,
                cwd: DEFAULT_HOME.into(),
                home: DEFAULT_HOME.into(),
                user: DEFAULT_USER.into(),
            },
            handlers,
            compound_prefixes: HashSet::from(["git".to_string()]),
        }
    }

    /// Register (or replace) a handler under an exact command string.
    pub fn register_command<F>(&mut self, command: impl Into<String>, handler: F)
    where
        F: Fn(&mut ShellState, &str) -> String + Send + Sync + 'static,
    {
        self.handlers.insert(command.into(), Box::new(handler));
    }

    /// Make `prefix <sub>` dispatch as one two-word command.
    pub fn register_compound_prefix(&mut self, prefix: impl Into<String>) {
        self.compound_prefixes.insert(prefix.into());
    }

    pub fn has_command(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }

    pub fn cwd(&self) -> &str {
        self.state.cwd()
    }

    pub fn filesystem(&self) -> &VirtualFs {
        &self.state.fs
    }

    pub fn add_entry(&mut self, path: &str, is_dir: bool) {
        let path = normalize(&self.state.cwd, path);
        self.state.fs.add_entry(&path, is_dir);
    }

    pub fn remove_entry(&mut self, path: &str) -> bool {
        let path = normalize(&self.state.cwd, path);
        let removed = self.state.fs.remove_entry(&path);
        self.state.repair_cwd();
        removed
    }

    /// Run one command line and return its output.
    pub fn execute(&mut self, command_line: &str) -> String {
        let line = command_line.trim();
        let Some((mut base, mut args)) = split_command(line) else {
            return String::new();
        };

        if self.compound_prefixes.contains(&base) {
            let mut rest = args.split_whitespace();
            if let Some(sub) = rest.next() {
                base = format!("{base} {sub}");
                args = rest.collect::<Vec<_>>().join(" ");
            }
        }

        debug!(command = %base, cwd = %self.state.cwd, "emulating command");

        if let Some(handler) = self.handlers.get(&base) {
            return handler(&mut self.state, &args);
        }
        if let Some(handler) = self.handlers.get(line) {
            return handler(&mut self.state, "");
        }
        format!("Command not found: {base}")
    }
}

/// Split on the first whitespace run into a command name and its arguments.
fn split_command(line: &str) -> Option<(String, String)> {
    let mut parts = line.splitn(2, char::is_whitespace);
    let base = parts.next().filter(|b| !b.is_empty())?;
    let args = parts.next().unwrap_or("").trim_start();
    Some((base.to_string(), args.to_string()))
}

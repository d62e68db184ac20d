use serde_json::Value;
use std::collections::BTreeMap;

/// A node of the virtual filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File,
    Dir(BTreeMap<String, Node>),
}

impl Node {
    fn empty_dir() -> Self {
        Node::Dir(BTreeMap::new())
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Dir(_))
    }
}

/// In-memory directory tree. The root always exists and is a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFs {
    root: Node,
}

impl Default for VirtualFs {
    fn default() -> Self {
        Self::empty()
    }
}

/// Split a path into its meaningful segments, dropping empty and `.` parts.
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty() && *s != ".")
}

/// Resolve `target` against `cwd` into an absolute path.
///
/// `..` pops one segment (never above the root); `.` and empty segments are
/// ignored. The result always starts with `/` and has no trailing slash.
pub fn normalize(cwd: &str, target: &str) -> String {
    let mut resolved: Vec<&str> = Vec::new();
    let joined = if target.starts_with('/') {
        target.to_string()
    } else {
        format!("{cwd}/{target}")
    };
    for part in segments(&joined) {
        if part == ".." {
            resolved.pop();
        } else {
            resolved.push(part);
        }
    }
    format!("/{}", resolved.join("/"))
}

impl VirtualFs {
    /// A filesystem holding only the root directory.
    pub fn empty() -> Self {
        Self {
            root: Node::empty_dir(),
        }
    }

    /// Build a tree from nested JSON objects. Objects become directories,
    /// every other value becomes a file.
    pub fn from_json(value: &Value) -> Result<Self, String> {
        fn build(value: &Value) -> Node {
            match value {
                Value::Object(children) => Node::Dir(
                    children
                        .iter()
                        .map(|(name, child)| (name.clone(), build(child)))
                        .collect(),
                ),
                _ => Node::File,
            }
        }
        match value {
            Value::Object(_) => Ok(Self { root: build(value) }),
            _ => Err("filesystem seed must be a JSON object".into()),
        }
    }

    /// Find the node at `path`. Relative paths resolve against the root.
    pub fn lookup(&self, path: &str) -> Option<&Node> {
        let path = normalize("/", path);
        let mut current = &self.root;
        for part in segments(&path) {
            match current {
                Node::Dir(children) => current = children.get(part)?,
                Node::File => return None,
            }
        }
        Some(current)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.lookup(path).is_some_and(Node::is_dir)
    }

    /// Entry names of a directory, sorted.
    pub fn list(&self, path: &str) -> Option<Vec<String>> {
        match self.lookup(path)? {
            Node::Dir(children) => Some(children.keys().cloned().collect()),
            Node::File => None,
        }
    }

    /// Create an entry, making missing intermediate directories. A file in
    /// the middle of the path is replaced by a directory. Adding a directory
    /// that already exists keeps its contents.
    pub fn add_entry(&mut self, path: &str, is_dir: bool) {
        let path = normalize("/", path);
        let parts: Vec<&str> = segments(&path).collect();
        let Some((name, parents)) = parts.split_last() else {
            return;
        };

        let mut current = &mut self.root;
        for part in parents {
            let Node::Dir(children) = current else {
                return;
            };
            let child = children.entry(part.to_string()).or_insert_with(Node::empty_dir);
            if !child.is_dir() {
                *child = Node::empty_dir();
            }
            current = child;
        }

        let Node::Dir(children) = current else {
            return;
        };
        let fresh = || if is_dir { Node::empty_dir() } else { Node::File };
        match children.get_mut(*name) {
            Some(existing) if is_dir && existing.is_dir() => {}
            Some(existing) => *existing = fresh(),
            None => {
                children.insert(name.to_string(), fresh());
            }
        }
    }

    /// Remove an entry (and everything below it). Returns whether it existed.
    /// The root cannot be removed.
    pub fn remove_entry(&mut self, path: &str) -> bool {
        let path = normalize("/", path);
        let parts: Vec<&str> = segments(&path).collect();
        let Some((name, parents)) = parts.split_last() else {
            return false;
        };

        let mut current = &mut self.root;
        for part in parents {
            match current {
                Node::Dir(children) => match children.get_mut(*part) {
                    Some(child) => current = child,
                    None => return false,
                },
                Node::File => return false,
            }
        }
        match current {
            Node::Dir(children) => children.remove(*name).is_some(),
            Node::File => false,
        }
    }
}

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

/// Reads a named resource as text.
pub trait ResourceLoader {
    /// Return the resource contents, or `None` when it cannot be found.
    fn read(&self, name: &str) -> Option<String>;
}

/// Resolves resource names as files under a root directory.
#[derive(Debug, Clone)]
pub struct FsResourceLoader {
    root: PathBuf,
}

impl FsResourceLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceLoader for FsResourceLoader {
    fn read(&self, name: &str) -> Option<String> {
        let path = self.root.join(name);
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read resource");
                None
            }
        }
    }
}

/// In-memory loader, handy for hosts that bundle their resources.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    entries: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, content: &str) -> Self {
        self.entries.insert(name.to_string(), content.to_string());
        self
    }
}

impl ResourceLoader for MemoryLoader {
    fn read(&self, name: &str) -> Option<String> {
        self.entries.get(name).cloned()
    }
}

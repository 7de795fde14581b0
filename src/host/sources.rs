//! Host-source providers: where project files come from.

use std::fs;
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;
use walkdir::WalkDir;

/// Supplies the current text of project source files.
pub trait SourceProvider: Send + Sync {
    /// All project source file names, in a stable order.
    fn file_names(&self) -> Vec<String>;

    /// Current text of a file, or `None` if it does not exist.
    fn read(&self, file_name: &str) -> Option<String>;

    fn exists(&self, file_name: &str) -> bool {
        self.read(file_name).is_some()
    }
}

/// In-memory sources, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceProvider {
    files: Vec<(String, String)>,
}

impl MemorySourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn with_file(mut self, file_name: impl Into<String>, content: impl Into<String>) -> Self {
        self.set_file(file_name, content);
        self
    }

    pub fn set_file(&mut self, file_name: impl Into<String>, content: impl Into<String>) {
        let file_name = file_name.into();
        let content = content.into();
        match self.files.iter_mut().find(|(name, _)| *name == file_name) {
            Some(entry) => entry.1 = content,
            None => self.files.push((file_name, content)),
        }
    }
}

impl SourceProvider for MemorySourceProvider {
    fn file_names(&self) -> Vec<String> {
        self.files.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read(&self, file_name: &str) -> Option<String> {
        let wanted = normalize_path(Path::new(file_name));
        self.files
            .iter()
            .find(|(name, _)| normalize_path(Path::new(name)) == wanted)
            .map(|(_, content)| content.clone())
    }
}

/// Sources read from disk under a project root.
pub struct FsSourceProvider {
    root: PathBuf,
    extensions: Vec<String>,
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl FsSourceProvider {
    pub fn new<P: AsRef<Path>>(root: P, extensions: &[&str]) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            include: None,
            exclude: None,
        }
    }

    /// Only keep files matching one of `patterns` (relative to the root).
    pub fn include(mut self, patterns: &[String]) -> Self {
        self.include = build_globset(patterns);
        self
    }

    /// Drop files matching one of `patterns` (relative to the root).
    pub fn exclude(mut self, patterns: &[String]) -> Self {
        self.exclude = build_globset(patterns);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_selected(&self, path: &Path) -> bool {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        if let Some(include) = &self.include {
            if !include.is_match(rel) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel) {
                return false;
            }
        }
        true
    }
}

impl SourceProvider for FsSourceProvider {
    fn file_names(&self) -> Vec<String> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                if e.depth() > 0 && e.file_type().is_dir() {
                    // Skip hidden, dependency and output directories
                    if name.starts_with('.') || name == "node_modules" || name == "__generated__" {
                        return false;
                    }
                }
                true
            })
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            let is_declaration = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(".d.ts"))
                .unwrap_or(false);
            if self.extensions.iter().any(|e| e == ext) && !is_declaration && self.is_selected(path) {
                files.push(path.to_string_lossy().to_string());
            }
        }

        files
    }

    fn read(&self, file_name: &str) -> Option<String> {
        let path = Path::new(file_name);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        fs::read_to_string(path).ok()
    }
}

fn build_globset(patterns: &[String]) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => warn!("ignoring invalid glob {:?}: {}", pattern, e),
        }
    }
    builder.build().ok()
}

/// Lexically normalize a path: drop `.` and fold `..` where possible.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve a relative module specifier (`./fragment`) imported from
/// `importer` to one of the provider's files.
pub fn resolve_relative_module(
    provider: &dyn SourceProvider,
    importer: &str,
    specifier: &str,
    extensions: &[&str],
) -> Option<String> {
    if !specifier.starts_with("./") && !specifier.starts_with("../") {
        return None;
    }
    let dir = Path::new(importer).parent().unwrap_or_else(|| Path::new(""));
    let base = normalize_path(&dir.join(specifier));
    let base_str = base.to_string_lossy().to_string();

    let mut candidates = vec![base_str.clone()];
    candidates.extend(extensions.iter().map(|ext| format!("{}.{}", base_str, ext)));
    candidates.extend(
        extensions
            .iter()
            .map(|ext| base.join(format!("index.{}", ext)).to_string_lossy().to_string()),
    );

    let known = provider.file_names();
    candidates.iter().find_map(|candidate| {
        let candidate_path = normalize_path(Path::new(candidate));
        known
            .iter()
            .find(|name| normalize_path(Path::new(name)) == candidate_path)
            .cloned()
    })
}

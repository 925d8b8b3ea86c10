//! Template source loaders
//!
//! A [`Loader`] turns a template name into source text (or an already compiled
//! template) plus an [`Origin`] describing where it came from. Origins that
//! record a directory take part in chain-aware resolution; virtual origins do
//! not.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, TemplateError};
use crate::template::Template;

/// Where a template's source was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Display name: the file path, or `<scheme>:<name>` for virtual origins
    pub name: String,
    /// Name the template was requested by
    pub load_name: String,
    directory: Option<PathBuf>,
}

impl Origin {
    /// Origin of a file found under a template directory
    pub fn file(directory: impl Into<PathBuf>, load_name: impl Into<String>) -> Self {
        let directory = directory.into();
        let load_name = load_name.into();
        Self {
            name: directory.join(&load_name).display().to_string(),
            load_name,
            directory: Some(directory),
        }
    }

    /// Origin that is not backed by an enumerable directory
    pub fn virtual_origin(scheme: &str, load_name: impl Into<String>) -> Self {
        let load_name = load_name.into();
        Self {
            name: format!("{}:{}", scheme, load_name),
            load_name,
            directory: None,
        }
    }

    /// Template directory this origin was found in
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn is_virtual(&self) -> bool {
        self.directory.is_none()
    }
}

/// Raw source or an already compiled template
#[derive(Debug, Clone)]
pub enum LoadedSource {
    Text(String),
    Compiled(Arc<Template>),
}

/// Turns template names into sources.
///
/// When `dirs` is given, directory-backed loaders search those directories
/// instead of their own. Loaders that are not directory-backed ignore it.
pub trait Loader: Send + Sync + fmt::Debug {
    fn load(&self, name: &str, dirs: Option<&[PathBuf]>)
        -> Result<Option<(LoadedSource, Origin)>>;

    /// Directories this loader searches by default
    fn directories(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Make a path absolute without touching the filesystem
pub(crate) fn normalize_dir(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Loads templates from an ordered list of directories
#[derive(Debug, Clone, Default)]
pub struct FileSystemLoader {
    dirs: Vec<PathBuf>,
}

impl FileSystemLoader {
    pub fn new<P: AsRef<Path>>(dirs: impl IntoIterator<Item = P>) -> Self {
        Self {
            dirs: dirs
                .into_iter()
                .map(|d| normalize_dir(d.as_ref()))
                .collect(),
        }
    }
}

/// Join a template name onto a directory, refusing names that would escape it
fn safe_join(dir: &Path, name: &str) -> Option<PathBuf> {
    let relative = Path::new(name);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || name.is_empty() {
        None
    } else {
        Some(dir.join(relative))
    }
}

impl Loader for FileSystemLoader {
    fn load(
        &self,
        name: &str,
        dirs: Option<&[PathBuf]>,
    ) -> Result<Option<(LoadedSource, Origin)>> {
        let dirs = dirs.unwrap_or(&self.dirs);
        for dir in dirs {
            let Some(path) = safe_join(dir, name) else {
                continue;
            };
            if !path.is_file() {
                continue;
            }
            let text =
                std::fs::read_to_string(&path).map_err(|e| TemplateError::io(&path, e))?;
            tracing::debug!(template = name, path = %path.display(), "loaded template from file");
            return Ok(Some((LoadedSource::Text(text), Origin::file(dir.clone(), name))));
        }
        Ok(None)
    }

    fn directories(&self) -> Vec<PathBuf> {
        self.dirs.clone()
    }
}

/// In-memory templates keyed by name
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    templates: HashMap<String, LoadedSource>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register template source text under a name
    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates
            .insert(name.into(), LoadedSource::Text(source.into()));
    }

    /// Register an already compiled template under a name
    pub fn insert_template(&mut self, name: impl Into<String>, template: Arc<Template>) {
        self.templates
            .insert(name.into(), LoadedSource::Compiled(template));
    }

    /// Builder form of [`MemoryLoader::insert`]
    pub fn with(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }
}

impl Loader for MemoryLoader {
    fn load(
        &self,
        name: &str,
        _dirs: Option<&[PathBuf]>,
    ) -> Result<Option<(LoadedSource, Origin)>> {
        Ok(self
            .templates
            .get(name)
            .map(|source| (source.clone(), Origin::virtual_origin("memory", name))))
    }
}

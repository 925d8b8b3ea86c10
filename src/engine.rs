//! The template engine: configuration, loaders, tags and filters
//!
//! An [`Engine`] is immutable once built and is shared across renders as
//! `Arc<Engine>`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::{Result, TemplateError};
use crate::filters::{builtin_filters, FilterFn};
use crate::loader::{normalize_dir, FileSystemLoader, LoadedSource, Loader, Origin};
use crate::parser::compiler;
use crate::template::{TagHandler, TagLibrary, Template};

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    loaders: Vec<Box<dyn Loader>>,
    tags: TagLibrary,
    filters: HashMap<String, FilterFn>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Create an engine. Configured directories get a [`FileSystemLoader`].
    pub fn new(config: EngineConfig) -> Self {
        let mut loaders: Vec<Box<dyn Loader>> = Vec::new();
        if !config.dirs.is_empty() {
            loaders.push(Box::new(FileSystemLoader::new(&config.dirs)));
        }
        Self {
            config,
            loaders,
            tags: TagLibrary::default(),
            filters: builtin_filters(),
        }
    }

    /// Append a loader, consulted after the existing ones
    pub fn with_loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    pub fn register_filter(&mut self, name: impl Into<String>, filter: FilterFn) {
        self.filters.insert(name.into(), filter);
    }

    pub fn register_tag(&mut self, name: impl Into<String>, handler: TagHandler) {
        self.tags.register(name, handler);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn debug(&self) -> bool {
        self.config.debug
    }

    pub fn autoescape(&self) -> bool {
        self.config.autoescape
    }

    pub fn tags(&self) -> &TagLibrary {
        &self.tags
    }

    pub fn filter(&self, name: &str) -> Option<FilterFn> {
        self.filters.get(name).copied()
    }

    /// Every directory a template may come from: configured directories, then
    /// each loader's own, absolute and without duplicates
    pub fn template_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        let configured = self.config.dirs.iter().cloned();
        let from_loaders = self.loaders.iter().flat_map(|loader| loader.directories());
        for dir in configured.chain(from_loaders) {
            let dir = normalize_dir(&dir);
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }

    /// Ask each loader in turn for `name`.
    ///
    /// With `dirs`, directory-backed loaders search only those directories.
    pub fn find_template(
        &self,
        name: &str,
        dirs: Option<&[PathBuf]>,
    ) -> Result<(LoadedSource, Origin)> {
        for loader in &self.loaders {
            if let Some(found) = loader.load(name, dirs)? {
                tracing::debug!(template = name, origin = %found.1.name, "found template");
                return Ok(found);
            }
        }
        let searched = match dirs {
            Some(dirs) => dirs.to_vec(),
            None => self.template_dirs(),
        };
        let tried = searched.iter().map(|d| d.display().to_string()).collect();
        Err(TemplateError::not_found_in(name, tried))
    }

    /// Compile source text into a template
    pub fn compile(
        &self,
        source: &str,
        origin: Option<Origin>,
        name: Option<&str>,
    ) -> Result<Arc<Template>> {
        let nodelist = compiler::compile(self, source, origin.clone(), name)?;
        Ok(Arc::new(Template::new(
            name.map(str::to_string),
            origin,
            nodelist,
        )))
    }

    /// Load and compile a template by name
    pub fn get_template(&self, name: &str) -> Result<Arc<Template>> {
        let (source, origin) = self.find_template(name, None)?;
        match source {
            LoadedSource::Compiled(template) => Ok(template),
            LoadedSource::Text(text) => self.compile(&text, Some(origin), Some(name)),
        }
    }

    /// Compile a template that was not loaded by name
    pub fn from_string(&self, source: &str) -> Result<Arc<Template>> {
        self.compile(source, None, None)
    }

    /// Load a template by name and render it
    pub fn render_to_string(&self, name: &str, ctx: &mut Context) -> Result<String> {
        self.get_template(name)?.render(ctx)
    }
}

//! Chain-aware resolution for templates that extend a template of the same name
//!
//! While a chain renders, each template name maps to the directories that have
//! not yet supplied a template of that name. Consuming a name removes the
//! directory its current template came from, so a later lookup of the same
//! name finds the next directory in order instead of the template itself.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{Result, TemplateError};
use crate::loader::{normalize_dir, Origin};

#[derive(Debug, Clone, Default)]
pub struct ChainResolution {
    remaining: HashMap<String, Vec<PathBuf>>,
}

impl ChainResolution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the candidate directories for a name on first use
    pub fn populate(&mut self, name: &str, dirs: impl FnOnce() -> Vec<PathBuf>) {
        self.remaining
            .entry(name.to_string())
            .or_insert_with(dirs);
    }

    /// Mark the directory that supplied `origin` as used for `name`.
    ///
    /// Virtual origins have no directory to remove and are skipped. A file
    /// origin whose directory is not among the candidates means the loader and
    /// engine disagree about the template directories.
    pub fn consume(&mut self, name: &str, origin: &Origin) -> Result<()> {
        let Some(directory) = origin.directory() else {
            tracing::debug!(template = name, origin = %origin.name, "virtual origin, nothing to consume");
            return Ok(());
        };
        let directory = normalize_dir(directory);
        let dirs = self.remaining.entry(name.to_string()).or_default();
        match dirs.iter().position(|d| *d == directory) {
            Some(index) => {
                dirs.remove(index);
                Ok(())
            }
            None => Err(TemplateError::configuration(format!(
                "template '{}' was loaded from '{}', which is not one of the engine's template directories",
                name,
                directory.display()
            ))),
        }
    }

    /// Directories still eligible to supply `name`
    pub fn candidates(&self, name: &str) -> Option<&[PathBuf]> {
        self.remaining.get(name).map(Vec::as_slice)
    }
}

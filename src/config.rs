//! Engine configuration
//!
//! Configuration can be built in code or read from a TOML file:
//!
//! ```toml
//! dirs = ["templates", "vendor/templates"]
//! debug = false
//! autoescape = true
//! ```
//!
//! Relative directories in a file are resolved against the file's own directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, TemplateError};

/// Configuration options for an [`Engine`](crate::Engine)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Template directories, searched in order
    pub dirs: Vec<PathBuf>,

    /// Propagate include failures and annotate errors with source locations
    pub debug: bool,

    /// HTML-escape variable output unless marked safe
    pub autoescape: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            debug: false,
            autoescape: true,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| TemplateError::io(path, e))?;
        let mut config = Self::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.dirs = config
                .dirs
                .into_iter()
                .map(|dir| if dir.is_relative() { base.join(dir) } else { dir })
                .collect();
        }
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Append a template directory
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.push(dir.into());
        self
    }

    /// Enable or disable debug mode
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enable or disable autoescaping
    pub fn with_autoescape(mut self, autoescape: bool) -> Self {
        self.autoescape = autoescape;
        self
    }
}

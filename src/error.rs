//! Error types for template compilation and rendering

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Result alias used throughout the crate
pub type Result<T, E = TemplateError> = std::result::Result<T, E>;

/// Position of a tag or variable in a template source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Template name, when the template was loaded by name
    pub template: Option<String>,
    /// 1-based line number
    pub line: usize,
    /// Byte range of the whole tag including delimiters
    pub span: Span,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.template {
            Some(name) => write!(f, "{}, line {}", name, self.line),
            None => write!(f, "<string>, line {}", self.line),
        }
    }
}

/// What went wrong
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Malformed tag, unmatched closer, duplicate block, misplaced `extends`
    #[error("{0}")]
    Syntax(String),

    /// No loader produced the requested template
    #[error("template not found: {name}{}", tried_suffix(.tried))]
    NotFound { name: String, tried: Vec<String> },

    /// Valid template used in an invalid way at render time
    #[error("{0}")]
    Usage(String),

    /// A byte value that is not valid UTF-8
    #[error("value could not be decoded as text: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// Loader/engine combination that chain-aware resolution cannot handle
    #[error("unsupported template configuration: {0}")]
    Configuration(String),

    /// Reading a template or configuration file failed
    #[error("error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML
    #[error("failed to parse configuration TOML: {0}")]
    Config(#[from] toml::de::Error),
}

/// Error raised while compiling or rendering a template.
///
/// The source location is recorded by the innermost frame that knows it and is
/// never replaced afterwards.
#[derive(Debug, Error)]
#[error("{kind}{}", location_suffix(.location))]
pub struct TemplateError {
    kind: ErrorKind,
    location: Option<SourceLocation>,
}

fn tried_suffix(tried: &[String]) -> String {
    if tried.is_empty() {
        String::new()
    } else {
        format!(" (tried: {})", tried.join(", "))
    }
}

fn location_suffix(location: &Option<SourceLocation>) -> String {
    match location {
        Some(loc) => format!(" (at {})", loc),
        None => String::new(),
    }
}

impl TemplateError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    /// Create a syntax error
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax(message.into()))
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Usage(message.into()))
    }

    /// Create a not-found error listing the places that were searched
    pub fn not_found_in(name: impl Into<String>, tried: Vec<String>) -> Self {
        Self::new(ErrorKind::NotFound {
            name: name.into(),
            tried,
        })
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration(message.into()))
    }

    /// Create an I/O error for the given path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::new(ErrorKind::Io {
            path: path.into(),
            source,
        })
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    /// Attach a source location unless one is already present
    pub fn annotate(mut self, location: SourceLocation) -> Self {
        if self.location.is_none() {
            self.location = Some(location);
        }
        self
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self.kind, ErrorKind::Syntax(_))
    }

    pub fn is_usage(&self) -> bool {
        matches!(self.kind, ErrorKind::Usage(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self.kind, ErrorKind::Decode(_))
    }

    /// The bare message without location suffix
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl From<ErrorKind> for TemplateError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<std::string::FromUtf8Error> for TemplateError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::new(ErrorKind::Decode(err))
    }
}

impl From<toml::de::Error> for TemplateError {
    fn from(err: toml::de::Error) -> Self {
        Self::new(ErrorKind::Config(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: usize) -> SourceLocation {
        SourceLocation {
            template: Some("page.html".to_string()),
            line,
            span: 0..4,
        }
    }

    #[test]
    fn test_annotate_first_writer_wins() {
        let err = TemplateError::usage("boom").annotate(loc(3)).annotate(loc(9));
        assert_eq!(err.location().map(|l| l.line), Some(3));
    }

    #[test]
    fn test_display_includes_location() {
        let err = TemplateError::syntax("bad tag").annotate(loc(2));
        assert_eq!(err.to_string(), "bad tag (at page.html, line 2)");
        assert_eq!(err.message(), "bad tag");
    }

    #[test]
    fn test_display_without_location() {
        let err = TemplateError::not_found_in("missing.html", Vec::new());
        assert_eq!(err.to_string(), "template not found: missing.html");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_decode_conversion() {
        let err: TemplateError = String::from_utf8(vec![0xff, 0xfe]).unwrap_err().into();
        assert!(err.is_decode());
    }
}

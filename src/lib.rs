//! Strata - layered text templates with block inheritance
//!
//! Templates extend parents with `{% extends %}`, override named regions with
//! `{% block %}`, reach the overridden content with `{{ block.super }}` and pull
//! in other templates with `{% include %}`. A template may extend another
//! template of the same name found in a later template directory, which allows
//! layered overrides across a search path.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use strata::{Context, Engine, MemoryLoader};
//!
//! let loader = MemoryLoader::new()
//!     .with("base.html", "<h1>{% block title %}Site{% endblock %}</h1>")
//!     .with(
//!         "page.html",
//!         r#"{% extends "base.html" %}{% block title %}Page | {{ block.super }}{% endblock %}"#,
//!     );
//! let engine = Arc::new(Engine::default().with_loader(loader));
//!
//! let mut ctx = Context::new(engine.clone());
//! let html = engine.render_to_string("page.html", &mut ctx).unwrap();
//! assert_eq!(html, "<h1>Page | Site</h1>");
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod filters;
pub mod loader;
pub mod parser;
pub mod template;
pub mod value;

pub use config::EngineConfig;
pub use context::Context;
pub use engine::Engine;
pub use error::{ErrorKind, Result, SourceLocation, TemplateError};
pub use loader::{FileSystemLoader, LoadedSource, Loader, MemoryLoader, Origin};
pub use template::{BlockContext, BlockNode, NodeList, ResolvedBlock, Template};
pub use value::Value;

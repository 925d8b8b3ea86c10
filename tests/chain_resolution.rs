//! Integration tests for templates that extend a template of the same name
//! found in a later template directory

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use strata::{
    Context, Engine, EngineConfig, ErrorKind, FileSystemLoader, LoadedSource, Loader,
    MemoryLoader, Origin,
};

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_engine() -> Arc<Engine> {
    let config = EngineConfig::default()
        .with_dir(fixtures().join("root1"))
        .with_dir(fixtures().join("root2"));
    Arc::new(Engine::new(config))
}

#[test]
fn test_same_name_chain_across_roots() {
    let engine = fixture_engine();
    let mut ctx = Context::new(engine.clone());
    let html = engine
        .render_to_string("admin/base.html", &mut ctx)
        .expect("Should render without recursing");

    assert!(html.contains("Hello from a index template that extends one with the same name"));
    insta::assert_snapshot!(
        html,
        @"<title>Admin</title><main>Hello from a index template that extends one with the same name</main>"
    );
}

#[test]
fn test_chain_tracks_each_name_separately() {
    // root1/shop/page.html -> root2/shop/page.html -> root1/shop/frame.html
    // -> root2/shop/frame.html, all within one render. Both directories are
    // used up for shop/page.html before shop/frame.html is first looked up.
    let engine = fixture_engine();
    let mut ctx = Context::new(engine.clone());
    let html = engine
        .render_to_string("shop/page.html", &mut ctx)
        .expect("Should render");
    assert_eq!(
        html,
        "<title>Shop</title><nav>root1+root2</nav><main>page</main>"
    );
}

#[test]
fn test_chain_state_is_per_render() {
    let engine = fixture_engine();
    let template = engine.get_template("admin/base.html").expect("Should load template");
    let mut ctx = Context::new(engine.clone());
    let first = template.render(&mut ctx).expect("Should render");
    let second = template.render(&mut ctx).expect("Should render");
    assert_eq!(first, second);
}

#[test]
fn test_config_file_engine() {
    let config = EngineConfig::from_file(&fixtures().join("strata.toml")).expect("Should read config");
    assert!(config.debug);
    let engine = Arc::new(Engine::new(config));
    let mut ctx = Context::new(engine.clone());
    let html = engine.render_to_string("admin/base.html", &mut ctx).expect("Should render");
    assert!(html.starts_with("<title>Admin</title>"));
}

#[test]
fn test_virtual_origin_is_tolerated() {
    // A same-name chain is impossible without directories, but a template
    // with a virtual origin must still be able to extend by name.
    let loader = MemoryLoader::new()
        .with("base.html", "<{% block x %}base{% endblock %}>")
        .with(
            "page.html",
            r#"{% extends "base.html" %}{% block x %}page{% endblock %}"#,
        );
    let engine = Arc::new(
        Engine::new(EngineConfig::default().with_dir(fixtures().join("root1"))).with_loader(loader),
    );
    let mut ctx = Context::new(engine.clone());
    assert_eq!(
        engine.render_to_string("page.html", &mut ctx).expect("Should render"),
        "<page>"
    );
}

/// Serves templates from a directory the engine does not know about
#[derive(Debug)]
struct StrayDirectoryLoader;

impl Loader for StrayDirectoryLoader {
    fn load(
        &self,
        name: &str,
        _dirs: Option<&[PathBuf]>,
    ) -> strata::Result<Option<(LoadedSource, Origin)>> {
        let source = match name {
            "page.html" => r#"{% extends "layout.html" %}{% block title %}Stray{% endblock %}"#,
            _ => return Ok(None),
        };
        Ok(Some((
            LoadedSource::Text(source.to_string()),
            Origin::file("/not/a/template/dir", name),
        )))
    }
}

#[test]
fn test_unknown_directory_is_configuration_error() {
    let engine = Arc::new(
        Engine::new(EngineConfig::default().with_dir(fixtures().join("root1")))
            .with_loader(StrayDirectoryLoader),
    );
    let mut ctx = Context::new(engine.clone());
    let err = engine.render_to_string("page.html", &mut ctx).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Configuration(_)));
}

#[test]
fn test_loader_directories_join_candidates() {
    // No configured dirs: both roots come from the loader itself
    let engine = Arc::new(Engine::default().with_loader(FileSystemLoader::new([
        fixtures().join("root1"),
        fixtures().join("root2"),
    ])));
    let mut ctx = Context::new(engine.clone());
    let html = engine.render_to_string("admin/base.html", &mut ctx).expect("Should render");
    assert!(html.starts_with("<title>Admin</title>"));
}

#[test]
fn test_missing_same_name_parent_is_not_found() {
    // Only root1 is configured, so the template cannot find another admin/base.html
    let engine = Arc::new(Engine::new(
        EngineConfig::default().with_dir(fixtures().join("root1")),
    ));
    let mut ctx = Context::new(engine.clone());
    let err = engine.render_to_string("admin/base.html", &mut ctx).unwrap_err();
    assert!(err.is_not_found());
}

//! Render context: variable scopes plus render-scoped state
//!
//! Variable scopes are a push/pop stack searched from the top. Render frames
//! hold state that never takes part in variable lookup: the block registry and
//! the chain-aware resolution state. [`Template::render`](crate::Template::render)
//! pushes a fresh frame for its duration, so an included template never sees
//! the registry of the template that included it.

use std::collections::HashMap;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::engine::Engine;
use crate::error::{Result, TemplateError};
use crate::template::{BlockContext, ChainResolution};
use crate::value::Value;

/// How deep templates may nest through `extends` and `include`
pub const MAX_DEPTH: usize = 64;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a context, recorded on blocks rendered through the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// State scoped to one `Template::render` call
#[derive(Debug, Default)]
pub struct RenderFrame {
    pub(crate) blocks: Option<BlockContext>,
    pub(crate) chain: ChainResolution,
}

#[derive(Debug)]
pub struct Context {
    id: ContextId,
    engine: Arc<Engine>,
    scopes: Vec<HashMap<String, Value>>,
    frame: RenderFrame,
    saved_frames: Vec<RenderFrame>,
    depth: usize,
    /// HTML-escape variable output unless marked safe
    pub autoescape: bool,
}

impl Context {
    /// Create an empty context for the given engine
    pub fn new(engine: Arc<Engine>) -> Self {
        let autoescape = engine.config().autoescape;
        Self {
            id: ContextId::next(),
            engine,
            scopes: vec![HashMap::new()],
            frame: RenderFrame::default(),
            saved_frames: Vec::new(),
            depth: 0,
            autoescape,
        }
    }

    /// Create a context seeded with variables
    pub fn with_values<K: Into<String>, V: Into<Value>>(
        engine: Arc<Engine>,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        let mut ctx = Self::new(engine);
        for (key, value) in values {
            ctx.set(key, value);
        }
        ctx
    }

    /// A fresh context that shares only the engine and flags with this one
    pub fn new_isolated(&self, values: HashMap<String, Value>) -> Self {
        Self {
            id: ContextId::next(),
            engine: self.engine.clone(),
            scopes: vec![values],
            frame: RenderFrame::default(),
            saved_frames: Vec::new(),
            depth: self.depth,
            autoescape: self.autoescape,
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Look up a variable, innermost scope first
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Bind a variable in the innermost scope
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        if self.scopes.is_empty() {
            self.scopes.push(HashMap::new());
        }
        let last = self.scopes.len() - 1;
        self.scopes[last].insert(name.into(), value.into());
    }

    /// Push a new innermost scope
    pub fn push(&mut self, values: HashMap<String, Value>) {
        self.scopes.push(values);
    }

    /// Pop the innermost scope. The outermost scope is never removed.
    pub fn pop(&mut self) -> Option<HashMap<String, Value>> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    /// Run `f` with `values` pushed as a new scope, popping it on every exit path
    pub fn scoped<T>(
        &mut self,
        values: HashMap<String, Value>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.push(values);
        let result = f(self);
        self.pop();
        result
    }

    pub(crate) fn push_frame(&mut self) {
        let frame = mem::take(&mut self.frame);
        self.saved_frames.push(frame);
    }

    pub(crate) fn pop_frame(&mut self) {
        self.frame = self.saved_frames.pop().unwrap_or_default();
    }

    /// Run `f` one nesting level deeper, failing once [`MAX_DEPTH`] is reached
    pub(crate) fn descend<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(TemplateError::usage(format!(
                "template nesting exceeded {} levels; check for a template that extends or includes itself",
                MAX_DEPTH
            )));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Block registry of the current render frame, if one was created
    pub fn block_context(&self) -> Option<&BlockContext> {
        self.frame.blocks.as_ref()
    }

    pub fn block_context_mut(&mut self) -> Option<&mut BlockContext> {
        self.frame.blocks.as_mut()
    }

    /// Block registry of the current render frame, created on first use
    pub fn ensure_block_context(&mut self) -> &mut BlockContext {
        self.frame.blocks.get_or_insert_with(BlockContext::default)
    }

    pub(crate) fn chain_resolution_mut(&mut self) -> &mut ChainResolution {
        &mut self.frame.chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn engine() -> Arc<Engine> {
        Arc::new(Engine::new(EngineConfig::default()))
    }

    #[test]
    fn test_scopes_shadow_and_pop() {
        let mut ctx = Context::with_values(engine(), [("name", "outer")]);
        let mut inner = HashMap::new();
        inner.insert("name".to_string(), Value::from("inner"));
        ctx.scoped(inner, |ctx| {
            assert_eq!(ctx.get("name"), Some(&Value::from("inner")));
        });
        assert_eq!(ctx.get("name"), Some(&Value::from("outer")));
    }

    #[test]
    fn test_outermost_scope_is_kept() {
        let mut ctx = Context::new(engine());
        assert!(ctx.pop().is_none());
        ctx.set("a", 1);
        assert_eq!(ctx.get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_isolated_context_sees_only_seeded_values() {
        let ctx = Context::with_values(engine(), [("secret", "x")]);
        let mut values = HashMap::new();
        values.insert("y".to_string(), Value::Int(1));
        let isolated = ctx.new_isolated(values);
        assert!(isolated.get("secret").is_none());
        assert_eq!(isolated.get("y"), Some(&Value::Int(1)));
        assert_ne!(isolated.id(), ctx.id());
    }

    #[test]
    fn test_frames_hide_registry() {
        let mut ctx = Context::new(engine());
        ctx.ensure_block_context();
        assert!(ctx.block_context().is_some());
        ctx.push_frame();
        assert!(ctx.block_context().is_none());
        ctx.pop_frame();
        assert!(ctx.block_context().is_some());
    }

    #[test]
    fn test_descend_limit() {
        fn recurse(ctx: &mut Context) -> Result<usize> {
            ctx.descend(|ctx| recurse(ctx).map(|n| n + 1))
        }
        let mut ctx = Context::new(engine());
        let err = recurse(&mut ctx).unwrap_err();
        assert!(err.is_usage());
        assert_eq!(ctx.depth, 0);
    }
}

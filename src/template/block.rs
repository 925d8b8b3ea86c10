//! `{% block %}` nodes and `{{ block.super }}`

use std::collections::HashMap;
use std::sync::Arc;

use super::NodeList;
use crate::context::{Context, ContextId};
use crate::error::{Result, TemplateError};
use crate::value::Value;

/// A named, overridable region of a template
#[derive(Debug, Clone)]
pub struct BlockNode {
    pub name: String,
    pub nodelist: NodeList,
}

impl BlockNode {
    pub fn new(name: impl Into<String>, nodelist: NodeList) -> Self {
        Self {
            name: name.into(),
            nodelist,
        }
    }
}

/// The block definition chosen for one render, bound to the `block` variable.
///
/// `context` is set only when the block was chosen through the registry and
/// identifies the context that rendered it. `block.super` needs it.
#[derive(Debug)]
pub struct ResolvedBlock {
    block: Arc<BlockNode>,
    context: Option<ContextId>,
}

impl ResolvedBlock {
    pub fn name(&self) -> &str {
        &self.block.name
    }

    pub fn context(&self) -> Option<ContextId> {
        self.context
    }

    /// Render the next-outer definition of this block
    pub fn super_block(&self, ctx: &mut Context) -> Result<Value> {
        let Some(owner) = self.context else {
            return Err(TemplateError::usage(format!(
                "'{}' block has no render context. Did you use {{{{ block.super }}}} in a base template?",
                self.name()
            )));
        };
        if owner != ctx.id() {
            return Err(TemplateError::usage(format!(
                "'{}' block.super was used outside the context that rendered the block",
                self.name()
            )));
        }
        let has_outer = ctx
            .block_context()
            .is_some_and(|registry| registry.get_block(self.name()).is_some());
        if has_outer {
            Ok(Value::Safe(render_block(&self.block, ctx)?))
        } else {
            Ok(Value::Safe(String::new()))
        }
    }
}

fn bind(block: Arc<ResolvedBlock>) -> HashMap<String, Value> {
    let mut scope = HashMap::new();
    scope.insert("block".to_string(), Value::Block(block));
    scope
}

/// Render whichever definition currently occupies `fallback`'s name.
///
/// The definition popped from the registry is pushed back before the result
/// is returned, on success and failure alike.
pub(crate) fn render_block(fallback: &Arc<BlockNode>, ctx: &mut Context) -> Result<String> {
    let Some(registry) = ctx.block_context_mut() else {
        let resolved = Arc::new(ResolvedBlock {
            block: Arc::clone(fallback),
            context: None,
        });
        return ctx.scoped(bind(resolved), |ctx| fallback.nodelist.render(ctx));
    };

    let popped = registry.pop(&fallback.name);
    let block = popped.clone().unwrap_or_else(|| Arc::clone(fallback));
    tracing::trace!(
        block = %fallback.name,
        overridden = popped.is_some(),
        "rendering block"
    );

    let resolved = Arc::new(ResolvedBlock {
        block: Arc::clone(&block),
        context: Some(ctx.id()),
    });
    let result = ctx.scoped(bind(resolved), |ctx| block.nodelist.render(ctx));

    if let Some(popped) = popped {
        if let Some(registry) = ctx.block_context_mut() {
            registry.push(&fallback.name, popped);
        }
    }
    result
}

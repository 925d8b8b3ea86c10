//! `{% extends %}` nodes and chain-aware parent lookup

use std::sync::Arc;

use super::{BlockMap, Node, NodeList, Template};
use crate::context::Context;
use crate::error::{Result, TemplateError};
use crate::loader::{LoadedSource, Origin};
use crate::parser::ast::FilterExpression;
use crate::value::Value;

/// Declares that the enclosing template renders through a parent
#[derive(Debug, Clone)]
pub struct ExtendsNode {
    /// Expression naming the parent, or holding a compiled parent
    pub parent: FilterExpression,
    /// Name the extending template was loaded by
    pub template_name: Option<String>,
    /// Where the extending template was loaded from
    pub origin: Option<Origin>,
    /// Everything after the `extends` tag
    pub nodelist: NodeList,
    /// Blocks this template overrides, nested blocks included
    pub blocks: BlockMap,
}

impl ExtendsNode {
    pub fn new(
        parent: FilterExpression,
        template_name: Option<String>,
        origin: Option<Origin>,
        nodelist: NodeList,
    ) -> Self {
        let blocks = nodelist.blocks();
        Self {
            parent,
            template_name,
            origin,
            nodelist,
            blocks,
        }
    }

    pub fn render(&self, ctx: &mut Context) -> Result<String> {
        let parent = self.get_parent(ctx)?;

        let registry = ctx.ensure_block_context();
        registry.add_blocks(&self.blocks);

        // The parent only contributes its own blocks when it is the root of the chain
        let parent_is_root = !matches!(parent.nodelist().first_non_text(), Some(Node::Extends(_)));
        if parent_is_root {
            registry.add_blocks(&parent.blocks());
        }
        tracing::debug!(
            template = self.template_name.as_deref().unwrap_or("<string>"),
            parent = parent.name().unwrap_or("<template>"),
            parent_is_root,
            "extending parent template"
        );

        parent.render_nodelist(ctx)
    }

    /// Evaluate the parent expression into a compiled template
    pub fn get_parent(&self, ctx: &mut Context) -> Result<Arc<Template>> {
        let parent = self.parent.resolve(ctx)?;
        if !parent.is_truthy() {
            let mut message = format!("Invalid template name in 'extends' tag: {}.", parent.repr());
            if !self.parent.is_literal() {
                message.push_str(&format!(
                    " Got this from the '{}' variable.",
                    self.parent.token
                ));
            }
            return Err(TemplateError::usage(message));
        }
        match parent {
            Value::Template(template) => Ok(template),
            other => self.get_template(&other.to_text()?, ctx),
        }
    }

    /// Find the parent by name, skipping directories that already supplied a
    /// template of this template's own name
    fn get_template(&self, name: &str, ctx: &mut Context) -> Result<Arc<Template>> {
        let engine = Arc::clone(ctx.engine());
        let (Some(own_name), Some(origin)) = (&self.template_name, &self.origin) else {
            return engine.get_template(name);
        };

        let chain = ctx.chain_resolution_mut();
        chain.populate(own_name, || engine.template_dirs());
        chain.consume(own_name, origin)?;
        let dirs = chain.candidates(name).map(<[_]>::to_vec);

        let (source, parent_origin) = engine.find_template(name, dirs.as_deref())?;
        match source {
            LoadedSource::Compiled(template) => Ok(template),
            LoadedSource::Text(text) => engine.compile(&text, Some(parent_origin), Some(name)),
        }
    }
}

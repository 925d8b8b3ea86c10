//! Compiled templates and the node tree they render
//!
//! A [`Template`] is an immutable [`NodeList`] plus the name and [`Origin`] it
//! was loaded under. Inheritance is carried by three node kinds:
//!
//! - [`BlockNode`]: a named, overridable region
//! - [`ExtendsNode`]: delegates rendering to a parent template after
//!   registering this template's blocks as overrides
//! - [`IncludeNode`]: renders another template inline
//!
//! # Example
//!
//! ```text
//! {# base.html #}
//! <title>{% block title %}Site{% endblock %}</title>
//!
//! {# page.html #}
//! {% extends "base.html" %}
//! {% block title %}Page | {{ block.super }}{% endblock %}
//! ```

mod block;
mod extends;
mod include;
mod registry;
mod resolver;
pub(crate) mod tags;
mod variable;

use std::sync::Arc;

use crate::context::Context;
use crate::error::{Result, SourceLocation};
use crate::loader::Origin;

pub use block::{BlockNode, ResolvedBlock};
pub use extends::ExtendsNode;
pub use include::IncludeNode;
pub use registry::{BlockContext, BlockMap};
pub use resolver::ChainResolution;
pub use tags::{TagHandler, TagLibrary};
pub use variable::VariableNode;

/// A compiled template
#[derive(Debug)]
pub struct Template {
    name: Option<String>,
    origin: Option<Origin>,
    nodelist: NodeList,
}

impl Template {
    pub fn new(name: Option<String>, origin: Option<Origin>, nodelist: NodeList) -> Self {
        Self {
            name,
            origin,
            nodelist,
        }
    }

    /// Name the template was loaded by, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    pub fn nodelist(&self) -> &NodeList {
        &self.nodelist
    }

    /// Every block declared in this template, nested blocks included
    pub fn blocks(&self) -> BlockMap {
        self.nodelist.blocks()
    }

    /// Render with a fresh render frame, so block overrides from an enclosing
    /// render are not visible
    pub fn render(&self, ctx: &mut Context) -> Result<String> {
        ctx.push_frame();
        let result = self.render_nodelist(ctx);
        ctx.pop_frame();
        result
    }

    /// Render in the caller's render frame. Used when a child delegates to its
    /// parent so the parent sees the child's block overrides.
    pub(crate) fn render_nodelist(&self, ctx: &mut Context) -> Result<String> {
        ctx.descend(|ctx| self.nodelist.render(ctx))
    }
}

/// A node together with where it was written
#[derive(Debug, Clone)]
pub struct Located<T> {
    pub node: T,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub enum Node {
    Text(String),
    Variable(VariableNode),
    Block(Arc<BlockNode>),
    Extends(Box<ExtendsNode>),
    Include(IncludeNode),
}

impl Node {
    fn render(&self, ctx: &mut Context) -> Result<String> {
        match self {
            Node::Text(text) => Ok(text.clone()),
            Node::Variable(node) => node.render(ctx),
            Node::Block(node) => block::render_block(node, ctx),
            Node::Extends(node) => node.render(ctx),
            Node::Include(node) => node.render(ctx),
        }
    }
}

/// Ordered sequence of nodes
#[derive(Debug, Clone, Default)]
pub struct NodeList(Vec<Located<Node>>);

impl NodeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// A list holding one text node, mostly useful in tests
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        let span = 0..text.len();
        Self(vec![Located {
            node: Node::Text(text),
            location: SourceLocation {
                template: None,
                line: 1,
                span,
            },
        }])
    }

    pub fn push(&mut self, node: Node, location: SourceLocation) {
        self.0.push(Located { node, location });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Located<Node>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True once the list holds anything besides text
    pub fn has_non_text(&self) -> bool {
        self.first_non_text().is_some()
    }

    /// First node that is not literal text
    pub fn first_non_text(&self) -> Option<&Node> {
        self.0
            .iter()
            .map(|located| &located.node)
            .find(|node| !matches!(node, Node::Text(_)))
    }

    /// Whether an `extends` node appears anywhere in the tree
    pub fn contains_extends(&self) -> bool {
        self.0.iter().any(|located| match &located.node {
            Node::Extends(_) => true,
            Node::Block(block) => block.nodelist.contains_extends(),
            _ => false,
        })
    }

    /// Every block node reachable from this list, keyed by name
    pub fn blocks(&self) -> BlockMap {
        let mut blocks = BlockMap::new();
        self.collect_blocks(&mut blocks);
        blocks
    }

    fn collect_blocks(&self, blocks: &mut BlockMap) {
        for located in &self.0 {
            match &located.node {
                Node::Block(block) => {
                    blocks.insert(block.name.clone(), Arc::clone(block));
                    block.nodelist.collect_blocks(blocks);
                }
                Node::Extends(extends) => extends.nodelist.collect_blocks(blocks),
                _ => {}
            }
        }
    }

    /// Render every node in order.
    ///
    /// In debug mode a failure is annotated with the location of the node
    /// that raised it, unless an inner node already did so.
    pub fn render(&self, ctx: &mut Context) -> Result<String> {
        let debug = ctx.engine().debug();
        let mut output = String::new();
        for located in &self.0 {
            match located.node.render(ctx) {
                Ok(text) => output.push_str(&text),
                Err(err) if debug => return Err(err.annotate(located.location.clone())),
                Err(err) => return Err(err),
            }
        }
        Ok(output)
    }
}

//! `{% include %}` nodes

use std::collections::HashMap;
use std::sync::Arc;

use super::Template;
use crate::context::Context;
use crate::error::Result;
use crate::parser::ast::FilterExpression;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct IncludeNode {
    pub template: FilterExpression,
    pub extra_context: Vec<(String, FilterExpression)>,
    /// Render with only `extra_context` visible (`only`)
    pub isolated: bool,
}

impl IncludeNode {
    pub fn new(
        template: FilterExpression,
        extra_context: Vec<(String, FilterExpression)>,
        isolated: bool,
    ) -> Self {
        Self {
            template,
            extra_context,
            isolated,
        }
    }

    /// Render the included template. Outside debug mode a failure is logged
    /// and renders as nothing.
    pub fn render(&self, ctx: &mut Context) -> Result<String> {
        match self.render_included(ctx) {
            Ok(output) => Ok(output),
            Err(err) if ctx.engine().debug() => Err(err),
            Err(err) => {
                tracing::warn!(
                    template = %self.template.token,
                    error = %err,
                    "rendering included template failed"
                );
                Ok(String::new())
            }
        }
    }

    fn render_included(&self, ctx: &mut Context) -> Result<String> {
        let template = self.resolve_template(ctx)?;
        let values = self
            .extra_context
            .iter()
            .map(|(name, expr)| Ok((name.clone(), expr.resolve(ctx)?)))
            .collect::<Result<HashMap<_, _>>>()?;

        if self.isolated {
            let mut isolated = ctx.new_isolated(values);
            template.render(&mut isolated)
        } else {
            ctx.scoped(values, |ctx| template.render(ctx))
        }
    }

    fn resolve_template(&self, ctx: &mut Context) -> Result<Arc<Template>> {
        match self.template.resolve(ctx)? {
            Value::Template(template) => Ok(template),
            other => ctx.engine().get_template(&other.to_text()?),
        }
    }
}

//! `{{ expression }}` nodes and filter expression evaluation

use crate::context::Context;
use crate::error::{Result, TemplateError};
use crate::parser::ast::{FilterExpression, Operand};
use crate::value::{escape_html, Value};

#[derive(Debug, Clone)]
pub struct VariableNode {
    pub expression: FilterExpression,
}

impl VariableNode {
    pub fn new(expression: FilterExpression) -> Self {
        Self { expression }
    }

    /// Render the expression. Undecodable bytes render as nothing.
    pub fn render(&self, ctx: &mut Context) -> Result<String> {
        match self.render_value(ctx) {
            Err(err) if err.is_decode() => {
                tracing::debug!(expression = %self.expression.token, "value is not valid UTF-8, rendering empty");
                Ok(String::new())
            }
            other => other,
        }
    }

    fn render_value(&self, ctx: &mut Context) -> Result<String> {
        let value = self.expression.resolve(ctx)?;
        let text = value.to_text()?;
        if ctx.autoescape && !value.is_safe() {
            Ok(escape_html(&text))
        } else {
            Ok(text)
        }
    }
}

impl FilterExpression {
    /// Evaluate the operand and apply each filter in turn
    pub fn resolve(&self, ctx: &mut Context) -> Result<Value> {
        let mut value = self.operand.resolve(ctx)?;
        for call in &self.filters {
            let filter = ctx
                .engine()
                .filter(&call.name)
                .ok_or_else(|| TemplateError::syntax(format!("Invalid filter: '{}'", call.name)))?;
            let arg = match &call.arg {
                Some(arg) => Some(arg.resolve(ctx)?),
                None => None,
            };
            value = filter(value, arg)?;
        }
        Ok(value)
    }
}

impl Operand {
    pub fn resolve(&self, ctx: &mut Context) -> Result<Value> {
        let path = match self {
            Operand::Literal(value) => return Ok(value.clone()),
            Operand::Variable(path) => path,
        };
        let Some((head, rest)) = path.split_first() else {
            return Ok(Value::None);
        };
        let mut value = ctx.get(head).cloned().unwrap_or_default();
        for segment in rest {
            value = match (&value, segment.as_str()) {
                (Value::Block(block), "super") => block.super_block(ctx)?,
                (Value::Block(block), "name") => Value::Str(block.name().to_string()),
                (other, key) => other.get_attr(key),
            };
        }
        Ok(value)
    }
}

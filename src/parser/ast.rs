//! Compiled expression types

use crate::value::Value;

/// Base value of a filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Quoted string or number written in the template
    Literal(Value),
    /// Dotted lookup path such as `user.name` or `items.0`
    Variable(Vec<String>),
}

impl Operand {
    pub fn is_literal(&self) -> bool {
        matches!(self, Operand::Literal(_))
    }
}

/// One `|name:arg` step of a filter chain
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub arg: Option<Operand>,
}

/// `operand|filter:arg|filter` as written in a variable tag or tag argument
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    /// Source text the expression was compiled from
    pub token: String,
    pub operand: Operand,
    pub filters: Vec<FilterCall>,
}

impl FilterExpression {
    /// True for a bare literal with no filters applied
    pub fn is_literal(&self) -> bool {
        self.filters.is_empty() && self.operand.is_literal()
    }
}

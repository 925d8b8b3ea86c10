//! Tokenizer, expression grammar and template compiler

pub mod ast;
pub mod compiler;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use compiler::{compile, Parser};
pub use grammar::parse_filter_expression;

//! Compile-time handlers for the inheritance tags

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use super::{BlockNode, ExtendsNode, IncludeNode, Node};
use crate::error::{Result, TemplateError};
use crate::parser::ast::FilterExpression;
use crate::parser::compiler::Parser;
use crate::parser::lexer::TemplateToken;

/// Compiles one block tag into a node. Handlers may consume further tokens
/// from the parser, e.g. a body up to an end tag.
pub type TagHandler = fn(&mut Parser<'_>, &TemplateToken) -> Result<Node>;

/// Block tags known to an engine, keyed by name
#[derive(Clone)]
pub struct TagLibrary {
    handlers: HashMap<String, TagHandler>,
}

impl TagLibrary {
    /// A library with no tags registered
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, handler: TagHandler) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<TagHandler> {
        self.handlers.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl Default for TagLibrary {
    fn default() -> Self {
        let mut library = Self::empty();
        library.register("block", do_block);
        library.register("extends", do_extends);
        library.register("include", do_include);
        library
    }
}

impl fmt::Debug for TagLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("TagLibrary").field("tags", &names).finish()
    }
}

/// `{% block name %}...{% endblock %}`
pub fn do_block(parser: &mut Parser<'_>, token: &TemplateToken) -> Result<Node> {
    // Block names are bare words
    let bits: Vec<&str> = token.contents.split_whitespace().collect();
    if bits.len() != 2 {
        return Err(TemplateError::syntax(format!(
            "'{}' tag takes only one argument",
            bits[0]
        )));
    }
    let name = bits[1];
    if !parser.register_block_name(name) {
        return Err(TemplateError::syntax(format!(
            "'{}' tag with name '{}' appears more than once",
            bits[0], name
        )));
    }

    let nodelist = parser.parse(&["endblock"])?;
    let Some(endblock) = parser.next_token() else {
        return Err(parser.unclosed_tag(&["endblock"]));
    };
    let acceptable = ["endblock".to_string(), format!("endblock {}", name)];
    if !acceptable.contains(&endblock.contents) {
        return Err(parser.invalid_block_tag(&endblock, "endblock", &acceptable));
    }

    Ok(Node::Block(Arc::new(BlockNode::new(name, nodelist))))
}

/// `{% extends parent %}`: the rest of the template becomes the node's body
pub fn do_extends(parser: &mut Parser<'_>, token: &TemplateToken) -> Result<Node> {
    let bits = split_contents(&token.contents);
    if bits.len() != 2 {
        return Err(TemplateError::syntax(format!(
            "'{}' takes one argument",
            bits[0]
        )));
    }

    let parent = parser.compile_filter(&bits[1])?;
    let nodelist = parser.parse(&[])?;
    if nodelist.contains_extends() {
        return Err(TemplateError::syntax(format!(
            "'{}' cannot appear more than once in the same template",
            bits[0]
        )));
    }

    Ok(Node::Extends(Box::new(ExtendsNode::new(
        parent,
        parser.template_name().map(str::to_string),
        parser.origin().cloned(),
        nodelist,
    ))))
}

/// `{% include target [with name=value ...] [only] %}`
pub fn do_include(parser: &mut Parser<'_>, token: &TemplateToken) -> Result<Node> {
    let bits = split_contents(&token.contents);
    if bits.len() < 2 {
        return Err(TemplateError::syntax(format!(
            "'{}' tag takes at least one argument: the name of the template to be included.",
            bits[0]
        )));
    }

    let mut extra_context = None;
    let mut isolated = None;
    let mut remaining: VecDeque<String> = bits[2..].iter().cloned().collect();
    while let Some(option) = remaining.pop_front() {
        match option.as_str() {
            "with" if extra_context.is_some() => return Err(duplicate_option(&option)),
            "only" if isolated.is_some() => return Err(duplicate_option(&option)),
            "with" => {
                let values = token_kwargs(&mut remaining, parser)?;
                if values.is_empty() {
                    return Err(TemplateError::syntax(format!(
                        "\"with\" in '{}' tag needs at least one keyword argument.",
                        bits[0]
                    )));
                }
                extra_context = Some(values);
            }
            "only" => isolated = Some(true),
            _ => {
                return Err(TemplateError::syntax(format!(
                    "Unknown argument for '{}' tag: '{}'.",
                    bits[0], option
                )))
            }
        }
    }

    Ok(Node::Include(IncludeNode::new(
        parser.compile_filter(&bits[1])?,
        extra_context.unwrap_or_default(),
        isolated.unwrap_or(false),
    )))
}

fn duplicate_option(option: &str) -> TemplateError {
    TemplateError::syntax(format!(
        "The '{}' option was specified more than once.",
        option
    ))
}

/// Split tag contents on whitespace, keeping quoted strings together
pub fn split_contents(contents: &str) -> Vec<String> {
    let mut bits = Vec::new();
    let mut current = String::new();
    let mut quote = None;
    let mut chars = contents.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    bits.push(std::mem::take(&mut current));
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                current.push(c);
            }
        }
    }
    if !current.is_empty() {
        bits.push(current);
    }
    bits
}

/// Split `name=value` into its parts when `name` is a plain identifier
fn split_kwarg(bit: &str) -> Option<(&str, &str)> {
    let (key, value) = bit.split_once('=')?;
    let is_identifier =
        !key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_');
    (is_identifier && !value.is_empty()).then_some((key, value))
}

/// Consume leading `name=value` bits, compiling each value
fn token_kwargs(
    bits: &mut VecDeque<String>,
    parser: &mut Parser<'_>,
) -> Result<Vec<(String, FilterExpression)>> {
    let mut kwargs: Vec<(String, FilterExpression)> = Vec::new();
    while let Some((key, value)) = bits.front().and_then(|bit| split_kwarg(bit)) {
        let key = key.to_string();
        let expression = parser.compile_filter(value)?;
        bits.pop_front();
        match kwargs.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = expression,
            None => kwargs.push((key, expression)),
        }
    }
    Ok(kwargs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_contents_keeps_quotes() {
        assert_eq!(
            split_contents(r#"include "a b.html" with title="Hi there" only"#),
            vec!["include", r#""a b.html""#, "with", r#"title="Hi there""#, "only"]
        );
    }

    #[test]
    fn test_split_contents_escaped_quote() {
        assert_eq!(
            split_contents(r#"include "say \"hi\"""#),
            vec!["include", r#""say \"hi\"""#]
        );
    }

    #[test]
    fn test_split_kwarg() {
        assert_eq!(split_kwarg("title=page.title"), Some(("title", "page.title")));
        assert_eq!(split_kwarg(r#"x="a=b""#), Some(("x", r#""a=b""#)));
        assert_eq!(split_kwarg("only"), None);
        assert_eq!(split_kwarg("=x"), None);
        assert_eq!(split_kwarg("a.b=x"), None);
        assert_eq!(split_kwarg("x="), None);
    }

    #[test]
    fn test_library_defaults() {
        let library = TagLibrary::default();
        assert!(library.contains("block"));
        assert!(library.contains("extends"));
        assert!(library.contains("include"));
        assert!(library.get("for").is_none());
    }
}

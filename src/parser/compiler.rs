//! Template compiler: turns template tokens into a node tree

use std::collections::HashSet;

use crate::engine::Engine;
use crate::error::{Result, SourceLocation, TemplateError};
use crate::loader::Origin;
use crate::parser::ast::FilterExpression;
use crate::parser::grammar::parse_filter_expression;
use crate::parser::lexer::{self, TemplateToken, TokenKind};
use crate::template::{Node, NodeList, VariableNode};

/// Compile template source into a node list
pub fn compile(
    engine: &Engine,
    source: &str,
    origin: Option<Origin>,
    name: Option<&str>,
) -> Result<NodeList> {
    let mut parser = Parser::new(engine, lexer::tokenize(source), origin, name);
    parser.parse(&[])
}

/// Walks template tokens, dispatching block tags to the engine's tag library
pub struct Parser<'e> {
    engine: &'e Engine,
    /// Remaining tokens, next token last
    tokens: Vec<TemplateToken>,
    origin: Option<Origin>,
    template_name: Option<String>,
    loaded_blocks: HashSet<String>,
    /// Open tags, innermost last
    command_stack: Vec<(String, TemplateToken)>,
}

impl<'e> Parser<'e> {
    pub fn new(
        engine: &'e Engine,
        mut tokens: Vec<TemplateToken>,
        origin: Option<Origin>,
        name: Option<&str>,
    ) -> Self {
        tokens.reverse();
        Self {
            engine,
            tokens,
            origin,
            template_name: name.map(str::to_string),
            loaded_blocks: HashSet::new(),
            command_stack: Vec::new(),
        }
    }

    pub fn template_name(&self) -> Option<&str> {
        self.template_name.as_deref()
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    /// Parse nodes until a block tag whose command is in `until`.
    ///
    /// The stopping tag is left for the caller to take with
    /// [`Parser::next_token`]. With an empty `until` the rest of the input is
    /// parsed.
    pub fn parse(&mut self, until: &[&str]) -> Result<NodeList> {
        let mut nodelist = NodeList::new();

        while let Some(token) = self.next_token() {
            match token.kind {
                TokenKind::Text => {
                    let location = self.location(&token);
                    nodelist.push(Node::Text(token.contents), location);
                }
                TokenKind::Comment => {}
                TokenKind::Variable => {
                    if token.contents.is_empty() {
                        return Err(self.error(&token, TemplateError::syntax("Empty variable tag")));
                    }
                    let expression = self
                        .compile_filter(&token.contents)
                        .map_err(|err| self.error(&token, err))?;
                    let location = self.location(&token);
                    nodelist.push(Node::Variable(VariableNode::new(expression)), location);
                }
                TokenKind::Block => {
                    let command = token.command().to_string();
                    if command.is_empty() {
                        return Err(self.error(&token, TemplateError::syntax("Empty block tag")));
                    }
                    if until.contains(&command.as_str()) {
                        self.prepend_token(token);
                        return Ok(nodelist);
                    }
                    let Some(handler) = self.engine.tags().get(&command) else {
                        let expected: Vec<String> = until.iter().map(|s| s.to_string()).collect();
                        return Err(self.invalid_block_tag(&token, &command, &expected));
                    };

                    self.command_stack.push((command, token.clone()));
                    let node = handler(self, &token).map_err(|err| self.error(&token, err))?;
                    self.command_stack.pop();

                    self.extend_nodelist(&mut nodelist, node, &token)?;
                }
            }
        }

        if !until.is_empty() {
            return Err(self.unclosed_tag(until));
        }
        Ok(nodelist)
    }

    fn extend_nodelist(
        &self,
        nodelist: &mut NodeList,
        node: Node,
        token: &TemplateToken,
    ) -> Result<()> {
        if matches!(node, Node::Extends(_)) && nodelist.has_non_text() {
            return Err(self.error(
                token,
                TemplateError::syntax("'extends' must be the first tag in the template."),
            ));
        }
        nodelist.push(node, self.location(token));
        Ok(())
    }

    pub fn next_token(&mut self) -> Option<TemplateToken> {
        self.tokens.pop()
    }

    pub fn prepend_token(&mut self, token: TemplateToken) {
        self.tokens.push(token);
    }

    /// Compile a filter expression, rejecting unknown filters
    pub fn compile_filter(&self, text: &str) -> Result<FilterExpression> {
        let expression = parse_filter_expression(text)?;
        if let Some(unknown) = expression
            .filters
            .iter()
            .find(|call| self.engine.filter(&call.name).is_none())
        {
            return Err(TemplateError::syntax(format!(
                "Invalid filter: '{}'",
                unknown.name
            )));
        }
        Ok(expression)
    }

    /// Record a block name; false if this template already declared it
    pub fn register_block_name(&mut self, name: &str) -> bool {
        self.loaded_blocks.insert(name.to_string())
    }

    pub fn invalid_block_tag(
        &self,
        token: &TemplateToken,
        command: &str,
        expected: &[String],
    ) -> TemplateError {
        let message = if expected.is_empty() {
            format!("Invalid block tag: '{}'", command)
        } else {
            let quoted: Vec<String> = expected.iter().map(|e| format!("'{}'", e)).collect();
            format!(
                "Invalid block tag: '{}', expected {}",
                command,
                text_list(&quoted)
            )
        };
        self.error(token, TemplateError::syntax(message))
    }

    /// Error for input that ended while `until` tags were still expected
    pub fn unclosed_tag(&mut self, until: &[&str]) -> TemplateError {
        let err = |command: &str| {
            TemplateError::syntax(format!(
                "Unclosed tag '{}'. Looking for one of: {}",
                command,
                until.join(", ")
            ))
        };
        match self.command_stack.pop() {
            Some((command, token)) => self.error(&token, err(&command)),
            None => err(until.first().copied().unwrap_or("")),
        }
    }

    fn location(&self, token: &TemplateToken) -> SourceLocation {
        SourceLocation {
            template: self.template_name.clone(),
            line: token.line,
            span: token.span.clone(),
        }
    }

    /// Attach the token's location in debug mode
    fn error(&self, token: &TemplateToken, err: TemplateError) -> TemplateError {
        if self.engine.debug() {
            err.annotate(self.location(token))
        } else {
            err
        }
    }
}

/// Join as `'a', 'b' or 'c'`
fn text_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}

//! Lexers for template sources using logos
//!
//! Lexing happens at two levels. [`tokenize`] splits a whole template into text
//! runs and `{{ }}`, `{% %}`, `{# #}` tags. [`lex_expression`] splits the inside
//! of a variable tag or a tag argument into expression tokens.

use logos::Logos;

use crate::error::Span;

/// Delimiters and text runs at the template level
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    #[token("{{")]
    VariableOpen,
    #[token("}}")]
    VariableClose,
    #[token("{%")]
    BlockOpen,
    #[token("%}")]
    BlockClose,
    #[token("{#")]
    CommentOpen,
    #[token("#}")]
    CommentClose,

    #[regex(r"[^{}%#]+")]
    Text,

    // A lone brace, percent or hash that does not form a delimiter
    #[regex(r"[{}%#]")]
    Stray,
}

/// Kind of a template-level token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    Variable,
    Block,
    Comment,
}

/// A template-level token: a text run or the trimmed contents of a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateToken {
    pub kind: TokenKind,
    pub contents: String,
    pub span: Span,
    /// 1-based line of the token start
    pub line: usize,
}

impl TemplateToken {
    /// First word of a block tag, e.g. `block` for `{% block content %}`
    pub fn command(&self) -> &str {
        self.contents.split_whitespace().next().unwrap_or("")
    }
}

/// Split a template source into text runs and tags.
///
/// An opener without a matching closer is kept as literal text.
pub fn tokenize(source: &str) -> Vec<TemplateToken> {
    let delimiters: Vec<(Delimiter, Span)> = Delimiter::lexer(source)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
        .collect();

    let mut tokens = Vec::new();
    let mut lines = LineCounter::new(source);
    let mut text_start = 0;
    let mut i = 0;

    while i < delimiters.len() {
        let (delimiter, open) = &delimiters[i];
        let (kind, closer) = match delimiter {
            Delimiter::VariableOpen => (TokenKind::Variable, Delimiter::VariableClose),
            Delimiter::BlockOpen => (TokenKind::Block, Delimiter::BlockClose),
            Delimiter::CommentOpen => (TokenKind::Comment, Delimiter::CommentClose),
            _ => {
                i += 1;
                continue;
            }
        };

        let Some(offset) = delimiters[i + 1..].iter().position(|(d, _)| *d == closer) else {
            i += 1;
            continue;
        };
        let close = &delimiters[i + 1 + offset].1;

        push_text(&mut tokens, &mut lines, text_start, open.start);
        tokens.push(TemplateToken {
            kind,
            contents: source[open.end..close.start].trim().to_string(),
            span: open.start..close.end,
            line: lines.line_at(open.start),
        });
        text_start = close.end;
        i += offset + 2;
    }

    push_text(&mut tokens, &mut lines, text_start, source.len());
    tokens
}

fn push_text(
    tokens: &mut Vec<TemplateToken>,
    lines: &mut LineCounter<'_>,
    start: usize,
    end: usize,
) {
    if start < end {
        tokens.push(TemplateToken {
            kind: TokenKind::Text,
            contents: lines.source[start..end].to_string(),
            span: start..end,
            line: lines.line_at(start),
        });
    }
}

/// Line numbers for offsets visited in increasing order.
///
/// Each call only scans the bytes since the previous offset.
struct LineCounter<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
        }
    }

    /// 1-based line of `offset`, which must not precede the last one asked for
    fn line_at(&mut self, offset: usize) -> usize {
        let newlines = self.source.as_bytes()[self.offset..offset]
            .iter()
            .filter(|&&b| b == b'\n')
            .count();
        self.line += newlines;
        self.offset = offset;
        self.line
    }
}

/// Tokens inside a variable tag or a tag argument
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    #[token(".")]
    Dot,
    #[token("|")]
    Pipe,
    #[token(":")]
    Colon,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unquote(lex.slice()))]
    String(String),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),
}

/// Strip the surrounding quotes of a string literal and resolve backslash escapes
fn unquote(literal: &str) -> String {
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Lex an expression into tokens with spans.
///
/// Returns the span of the first character that is not part of any token.
pub fn lex_expression(input: &str) -> Result<Vec<(Token, Span)>, Span> {
    let mut tokens: Vec<(Token, Span)> = Vec::new();
    for (tok, span) in Token::lexer(input).spanned() {
        match tok {
            // `items.0.1` is two index segments, not the number 0.1
            Ok(Token::Float(_)) if matches!(tokens.last(), Some((Token::Dot, _))) => {
                split_index_pair(input, span, &mut tokens)?;
            }
            Ok(t) => tokens.push((t, span)),
            Err(()) => return Err(span),
        }
    }
    Ok(tokens)
}

fn split_index_pair(
    input: &str,
    span: Span,
    tokens: &mut Vec<(Token, Span)>,
) -> Result<(), Span> {
    let slice = &input[span.clone()];
    let Some(dot) = slice.find('.') else {
        return Err(span);
    };
    let (first, second) = (&slice[..dot], &slice[dot + 1..]);
    let (Ok(first), Ok(second)) = (first.parse::<i64>(), second.parse::<i64>()) else {
        return Err(span);
    };
    let dot = span.start + dot;
    tokens.push((Token::Int(first), span.start..dot));
    tokens.push((Token::Dot, dot..dot + 1));
    tokens.push((Token::Int(second), dot + 1..span.end));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .into_iter()
            .map(|t| (t.kind, t.contents))
            .collect()
    }

    #[test]
    fn test_text_only() {
        assert_eq!(
            kinds("plain text"),
            vec![(TokenKind::Text, "plain text".to_string())]
        );
    }

    #[test]
    fn test_tags_and_text() {
        assert_eq!(
            kinds("a{{ name }}b{% block x %}c{# note #}"),
            vec![
                (TokenKind::Text, "a".to_string()),
                (TokenKind::Variable, "name".to_string()),
                (TokenKind::Text, "b".to_string()),
                (TokenKind::Block, "block x".to_string()),
                (TokenKind::Text, "c".to_string()),
                (TokenKind::Comment, "note".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_opener_is_text() {
        assert_eq!(
            kinds("50% off {{ price"),
            vec![(TokenKind::Text, "50% off {{ price".to_string())]
        );
    }

    #[test]
    fn test_closer_inside_other_tag_kind() {
        assert_eq!(
            kinds("{% if a }} %}"),
            vec![(TokenKind::Block, "if a }}".to_string())]
        );
    }

    #[test]
    fn test_line_numbers_and_spans() {
        let tokens = tokenize("one\ntwo {{ x }}\n{% y %}");
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].span, 8..15);
        assert_eq!(tokens[3].line, 3);
    }

    #[test]
    fn test_command() {
        let tokens = tokenize("{%  endblock content %}");
        assert_eq!(tokens[0].command(), "endblock");
    }

    #[test]
    fn test_expression_tokens() {
        let tokens: Vec<_> = lex_expression(r#"user.name|default:"anon""#)
            .expect("Should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("user".to_string()),
                Token::Dot,
                Token::Ident("name".to_string()),
                Token::Pipe,
                Token::Ident("default".to_string()),
                Token::Colon,
                Token::String("anon".to_string()),
            ]
        );
    }

    #[test]
    fn test_numbers_and_quotes() {
        let tokens: Vec<_> = lex_expression(r#"items.0 -3 2.5 'it\'s'"#)
            .expect("Should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("items".to_string()),
                Token::Dot,
                Token::Int(0),
                Token::Int(-3),
                Token::Float(2.5),
                Token::String("it's".to_string()),
            ]
        );
    }

    #[test]
    fn test_line_numbers_in_large_template() {
        let source = "line {{ x }}\n".repeat(50_000);
        let tokens = tokenize(&source);
        assert_eq!(tokens.len(), 100_001);
        let last = tokens.last().expect("Should have tokens");
        assert_eq!(last.kind, TokenKind::Text);
        assert_eq!(last.contents, "\n");
        assert_eq!(last.line, 50_000);
        let last_variable = &tokens[tokens.len() - 2];
        assert_eq!(last_variable.line, 50_000);
    }

    #[test]
    fn test_nested_index_after_dot() {
        let tokens = lex_expression("items.0.12|default:1.5").expect("Should lex");
        assert_eq!(
            tokens,
            vec![
                (Token::Ident("items".to_string()), 0..5),
                (Token::Dot, 5..6),
                (Token::Int(0), 6..7),
                (Token::Dot, 7..8),
                (Token::Int(12), 8..10),
                (Token::Pipe, 10..11),
                (Token::Ident("default".to_string()), 11..18),
                (Token::Colon, 18..19),
                (Token::Float(1.5), 19..22),
            ]
        );
    }

    #[test]
    fn test_unlexable_character() {
        let err = lex_expression("a + b").unwrap_err();
        assert_eq!(err, 2..3);
    }
}

//! Filter expression parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::{Result, TemplateError};
use crate::parser::ast::{FilterCall, FilterExpression, Operand};
use crate::parser::lexer::{self, Token};
use crate::value::Value;

/// Parse the text of a variable tag or tag argument into a filter expression
pub fn parse_filter_expression(input: &str) -> Result<FilterExpression> {
    let tokens = lexer::lex_expression(input).map_err(|span| {
        TemplateError::syntax(format!(
            "Could not parse the remainder: '{}' from '{}'",
            &input[span.start..],
            input
        ))
    })?;

    let len = input.len();
    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    let (operand, filters) = filter_expression_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| {
            let reason = errs
                .first()
                .map(|err| match err.found() {
                    Some(tok) => format!("unexpected {}", describe_token(tok)),
                    None => "unexpected end of expression".to_string(),
                })
                .unwrap_or_else(|| "invalid expression".to_string());
            TemplateError::syntax(format!("Could not parse '{}': {}", input, reason))
        })?;

    Ok(FilterExpression {
        token: input.to_string(),
        operand,
        filters,
    })
}

fn filter_expression_parser<'a, I>(
) -> impl Parser<'a, I, (Operand, Vec<FilterCall>), extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let identifier = select! {
        Token::Ident(s) => s,
    };

    let literal = select! {
        Token::String(s) => Value::Safe(s),
        Token::Int(n) => Value::Int(n),
        Token::Float(f) => Value::Float(f),
    };

    // Path segments after a dot may be names or list indices
    let segment = select! {
        Token::Ident(s) => s,
        Token::Int(n) => n.to_string(),
    };

    let path = identifier
        .clone()
        .then(
            just(Token::Dot)
                .ignore_then(segment)
                .repeated()
                .collect::<Vec<_>>(),
        )
        .map(|(head, rest)| {
            let mut path = Vec::with_capacity(rest.len() + 1);
            path.push(head);
            path.extend(rest);
            Operand::Variable(path)
        });

    let operand = choice((literal.map(Operand::Literal), path));

    let filter = just(Token::Pipe)
        .ignore_then(identifier)
        .then(just(Token::Colon).ignore_then(operand.clone()).or_not())
        .map(|(name, arg)| FilterCall { name, arg });

    operand
        .then(filter.repeated().collect::<Vec<_>>())
        .then_ignore(end())
}

fn describe_token(tok: &Token) -> String {
    match tok {
        Token::Dot => "'.'".to_string(),
        Token::Pipe => "'|'".to_string(),
        Token::Colon => "':'".to_string(),
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::String(s) => format!("string \"{}\"", s),
        Token::Int(n) => format!("number {}", n),
        Token::Float(n) => format!("number {}", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(parts: &[&str]) -> Operand {
        Operand::Variable(parts.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_parse_variable_path() {
        let expr = parse_filter_expression("user.friends.0.name").expect("Should parse");
        assert_eq!(expr.operand, path(&["user", "friends", "0", "name"]));
        assert!(expr.filters.is_empty());
        assert!(!expr.is_literal());
    }

    #[test]
    fn test_parse_nested_index_path() {
        let expr = parse_filter_expression("a.0.1").expect("Should parse");
        assert_eq!(expr.operand, path(&["a", "0", "1"]));
    }

    #[test]
    fn test_float_literal_still_parses() {
        let expr = parse_filter_expression("2.5").expect("Should parse");
        assert_eq!(expr.operand, Operand::Literal(Value::Float(2.5)));
    }

    #[test]
    fn test_parse_string_literal() {
        let expr = parse_filter_expression(r#""base.html""#).expect("Should parse");
        assert_eq!(
            expr.operand,
            Operand::Literal(Value::Safe("base.html".to_string()))
        );
        assert!(expr.is_literal());
        assert_eq!(expr.token, r#""base.html""#);
    }

    #[test]
    fn test_parse_filters_with_arguments() {
        let expr = parse_filter_expression(r#"name|default:"anon"|upper"#).expect("Should parse");
        assert_eq!(expr.operand, path(&["name"]));
        assert_eq!(expr.filters.len(), 2);
        assert_eq!(expr.filters[0].name, "default");
        assert_eq!(
            expr.filters[0].arg,
            Some(Operand::Literal(Value::Safe("anon".to_string())))
        );
        assert_eq!(expr.filters[1].name, "upper");
        assert_eq!(expr.filters[1].arg, None);
    }

    #[test]
    fn test_literal_with_filter_is_not_literal() {
        let expr = parse_filter_expression(r#""x"|upper"#).expect("Should parse");
        assert!(!expr.is_literal());
    }

    #[test]
    fn test_filter_argument_can_be_variable() {
        let expr = parse_filter_expression("items|join:sep").expect("Should parse");
        assert_eq!(expr.filters[0].arg, Some(path(&["sep"])));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse_filter_expression("a b").unwrap_err();
        assert!(err.is_syntax());
        assert!(err.to_string().contains("identifier 'b'"));
    }

    #[test]
    fn test_dangling_pipe_rejected() {
        let err = parse_filter_expression("a|").unwrap_err();
        assert!(err.is_syntax());
        assert!(err.to_string().starts_with("Could not parse 'a|'"));
    }

    #[test]
    fn test_unlexable_remainder() {
        let err = parse_filter_expression("a + 1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not parse the remainder: '+ 1' from 'a + 1'"
        );
    }
}

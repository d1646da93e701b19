//! Parser for the serialized form using chumsky
//!
//! Produces a generic s-expression tree; giving it meaning is left to the
//! decoder.

use chumsky::error::{RichPattern, RichReason};
use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use super::lexer::{lex, Token};
use crate::error::LoadError;
use crate::parser::ast::Spanned;

#[derive(Debug, Clone, PartialEq)]
pub enum Sexp {
    Symbol(String),
    Str(String),
    Int(usize),
    List(Vec<Spanned<Sexp>>),
}

/// Parse serialized text into a single s-expression
pub fn parse(input: &str) -> Result<Spanned<Sexp>, LoadError> {
    let len = input.len();
    let tokens = lex(input)?;

    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    document_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| match errs.into_iter().next() {
            Some(err) => syntax_error(err),
            None => LoadError::Syntax {
                span: 0..len,
                message: "unreadable input".to_string(),
            },
        })
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn document_parser<'a, I>() -> impl Parser<'a, I, Spanned<Sexp>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let sexp = recursive(|sexp| {
        let atom = select! {
            Token::Symbol(s) => Sexp::Symbol(s),
            Token::Str(s) => Sexp::Str(s),
            Token::Int(n) => Sexp::Int(n),
        };

        let list = sexp
            .repeated()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
            .map(Sexp::List);

        atom.or(list)
            .map_with(|node, e| Spanned::new(node, span_range(&e.span())))
    });

    sexp.then_ignore(end())
}

fn syntax_error(err: Rich<'_, Token>) -> LoadError {
    let message = match err.reason() {
        RichReason::ExpectedFound { found, .. } => {
            let found = match found {
                Some(tok) => describe(tok),
                None => "end of input".to_string(),
            };
            let expected: Vec<String> = err
                .expected()
                .filter_map(|pattern| match pattern {
                    RichPattern::Token(tok) => Some(describe(tok)),
                    RichPattern::Label(label) => Some(label.to_string()),
                    RichPattern::EndOfInput => Some("end of input".to_string()),
                    _ => None,
                })
                .collect();
            if expected.is_empty() {
                format!("unexpected {}", found)
            } else {
                format!("unexpected {}, expected {}", found, expected.join(" or "))
            }
        }
        RichReason::Custom(msg) => msg.to_string(),
    };

    LoadError::Syntax {
        span: err.span().into_range(),
        message,
    }
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::Symbol(s) => format!("symbol '{}'", s),
        Token::Str(s) => format!("string {:?}", s),
        Token::Int(n) => format!("integer {}", n),
        Token::Comment => "comment".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(sexp: Spanned<Sexp>) -> Sexp {
        match sexp.node {
            Sexp::List(items) => Sexp::List(
                items
                    .into_iter()
                    .map(|item| Spanned::new(strip(item), 0..0))
                    .collect(),
            ),
            other => other,
        }
    }

    fn list(items: Vec<Sexp>) -> Sexp {
        Sexp::List(items.into_iter().map(|s| Spanned::new(s, 0..0)).collect())
    }

    #[test]
    fn test_nested_lists() {
        let parsed = parse(r#"(code (text "a") (section "x" 1 2))"#).unwrap();
        assert_eq!(parsed.span, 0..35);
        assert_eq!(
            strip(parsed),
            list(vec![
                Sexp::Symbol("code".to_string()),
                list(vec![
                    Sexp::Symbol("text".to_string()),
                    Sexp::Str("a".to_string())
                ]),
                list(vec![
                    Sexp::Symbol("section".to_string()),
                    Sexp::Str("x".to_string()),
                    Sexp::Int(1),
                    Sexp::Int(2),
                ]),
            ])
        );
    }

    #[test]
    fn test_child_spans() {
        let parsed = parse("(a (b))").unwrap();
        let Sexp::List(items) = parsed.node else {
            panic!("expected a list");
        };
        assert_eq!(items[1].span, 3..6);
    }

    #[test]
    fn test_unbalanced_parens() {
        let err = parse("(template (code)").unwrap_err();
        assert!(matches!(err, LoadError::Syntax { .. }));
    }

    #[test]
    fn test_trailing_input_is_rejected() {
        let err = parse("(a) (b)").unwrap_err();
        assert!(matches!(err, LoadError::Syntax { .. }));
    }

    #[test]
    fn test_lex_errors_pass_through() {
        let err = parse("(a #)").unwrap_err();
        assert!(matches!(err, LoadError::Lex { .. }));
    }
}

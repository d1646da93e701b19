//! Lexer for the serialized template form using logos

use logos::Logos;

use crate::error::LoadError;
use crate::parser::ast::Span;

#[derive(Logos, Debug, Clone, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,

    #[regex(r"[a-z][a-z0-9-]*", |lex| lex.slice().to_string())]
    Symbol(String),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<usize>().ok())]
    Int(usize),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape(&s[1..s.len() - 1])
    })]
    Str(String),

    // Comments (skip)
    #[regex(r";[^\n]*", logos::skip)]
    Comment,
}

/// Lex input into tokens with spans, failing on the first unrecognized input
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, LoadError> {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| match tok {
            Ok(tok) => Ok((tok, span)),
            Err(()) => Err(LoadError::Lex { span }),
        })
        .collect()
}

/// Resolve `\\ \" \n \r \t \u{XXXX}` escapes; `None` on a bad escape
fn unescape(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'u' => {
                if chars.next()? != '{' {
                    return None;
                }
                let hex: String = chars.by_ref().take_while(|&c| c != '}').collect();
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            _ => return None,
        }
    }
    Some(out)
}

/// Quote `text` so that [`lex`] reads it back unchanged
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

//! Scanner: template text to a flat token stream
//!
//! A three-state machine (text / tag type / tag body) walks the source once.
//! Delimiter-change tags swap the active pair in place and emit nothing.
//! When a line is complete it is checked for the standalone rule: a line
//! holding only block-shaped tags and whitespace loses its whitespace and its
//! line break, and a standalone partial keeps the stripped whitespace as its
//! indent.

use std::mem;

use super::ast::{Delimiters, TagKind, Token};
use crate::error::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    TagType,
    Tag,
}

/// Scan template source into tokens using `delimiters` (or `{{ }}`)
pub fn scan(text: &str, delimiters: Option<&Delimiters>) -> Result<Vec<Token>, CompileError> {
    Scanner::new(text, delimiters.cloned().unwrap_or_default()).run()
}

struct Scanner<'a> {
    text: &'a str,
    delimiters: Delimiters,
    tokens: Vec<Token>,
    /// Pending literal text and where it began
    buf: String,
    buf_start: usize,
    /// Index into `tokens` where the current line begins
    line_start: usize,
    seen_tag: bool,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str, delimiters: Delimiters) -> Self {
        Self {
            text,
            delimiters,
            tokens: Vec::new(),
            buf: String::new(),
            buf_start: 0,
            line_start: 0,
            seen_tag: false,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, CompileError> {
        let text = self.text;
        let mut state = State::Text;
        let mut kind = TagKind::Variable;
        let mut triple = false;
        let mut tag_start = 0;
        let mut tag_body = String::new();
        let mut i = 0;

        while i < text.len() {
            let rest = &text[i..];
            let c = rest.chars().next().unwrap_or_default();

            match state {
                State::Text => {
                    if rest.starts_with(self.delimiters.open.as_str()) {
                        self.flush_text(i);
                        tag_start = i;
                        i += self.delimiters.open.len();
                        state = State::TagType;
                    } else if c == '\n' {
                        self.flush_text(i);
                        self.filter_line(i, false);
                        i += 1;
                    } else {
                        if self.buf.is_empty() {
                            self.buf_start = i;
                        }
                        self.buf.push(c);
                        i += c.len_utf8();
                    }
                }
                State::TagType => {
                    if c == '=' {
                        i = self.change_delimiters(tag_start, i)?;
                        state = State::Text;
                    } else {
                        match TagKind::from_sigil(c) {
                            Some(sigil) => {
                                kind = sigil;
                                triple = c == '{';
                                i += c.len_utf8();
                            }
                            None => {
                                kind = TagKind::Variable;
                                triple = false;
                            }
                        }
                        state = State::Tag;
                    }
                    self.seen_tag = true;
                }
                State::Tag => {
                    if rest.starts_with(self.delimiters.close.as_str()) {
                        let body = mem::take(&mut tag_body);
                        i = self.push_tag(kind, triple, &body, tag_start, i);
                        state = State::Text;
                    } else {
                        tag_body.push(c);
                        i += c.len_utf8();
                    }
                }
            }
        }

        // An unterminated tag is kept as literal text
        if state != State::Text {
            self.flush_text(tag_start);
            self.buf.push_str(&text[tag_start..]);
            self.buf_start = tag_start;
        }

        self.flush_text(text.len());
        self.filter_line(text.len(), true);
        mark_last_newlines(&mut self.tokens);
        Ok(self.tokens)
    }

    fn flush_text(&mut self, at: usize) {
        if !self.buf.is_empty() {
            let text = mem::take(&mut self.buf);
            self.tokens
                .push(Token::text(text, self.buf_start..at, &self.delimiters));
        }
    }

    /// Emit the tag whose close delimiter starts at `close_at`; returns the
    /// offset scanning resumes from.
    fn push_tag(
        &mut self,
        kind: TagKind,
        triple: bool,
        body: &str,
        tag_start: usize,
        close_at: usize,
    ) -> usize {
        let mut end = close_at + self.delimiters.close.len();
        let mut name = body.trim().to_string();

        if triple {
            if self.delimiters.close == "}}" {
                if self.text[end..].starts_with('}') {
                    end += 1;
                }
            } else if let Some(stripped) = name.strip_suffix('}') {
                name = stripped.trim_end().to_string();
            }
        }

        self.tokens
            .push(Token::tag(kind, name, tag_start..end, &self.delimiters));
        end
    }

    /// Handle `{{=open close=}}` with `eq_at` pointing at the first `=`
    fn change_delimiters(&mut self, tag_start: usize, eq_at: usize) -> Result<usize, CompileError> {
        let terminator = format!("={}", self.delimiters.close);
        let body_start = eq_at + 1;

        let Some(offset) = self.text[body_start..].find(&terminator) else {
            return Err(CompileError::MalformedDelimiters {
                span: tag_start..self.text.len(),
            });
        };

        let close_index = body_start + offset;
        let resume = close_index + terminator.len();
        self.delimiters = self.text[body_start..close_index]
            .parse()
            .map_err(|_| CompileError::MalformedDelimiters {
                span: tag_start..resume,
            })?;

        Ok(resume)
    }

    /// Close out the current line, applying the standalone rule
    fn filter_line(&mut self, at: usize, no_newline: bool) {
        if self.seen_tag && self.line_is_whitespace() {
            let line = self.tokens.split_off(self.line_start);
            let mut line = line.into_iter().peekable();
            while let Some(token) = line.next() {
                if token.kind == TagKind::Text {
                    if let Some(next) = line.peek_mut() {
                        if next.kind == TagKind::Partial {
                            next.indent = Some(token.text);
                        }
                    }
                    continue;
                }
                self.tokens.push(token);
            }
        } else if !no_newline {
            self.tokens.push(Token::newline(at, &self.delimiters));
        }

        self.seen_tag = false;
        self.line_start = self.tokens.len();
    }

    fn line_is_whitespace(&self) -> bool {
        self.tokens[self.line_start..].iter().all(|token| {
            token.kind.is_standalone()
                || (token.kind == TagKind::Text && token.text.chars().all(char::is_whitespace))
        })
    }
}

/// A newline is "last" when nothing but another newline (or the end of the
/// stream) follows it; no indent is written after such a line break.
fn mark_last_newlines(tokens: &mut [Token]) {
    for idx in 0..tokens.len() {
        if tokens[idx].kind == TagKind::Newline {
            tokens[idx].last = tokens
                .get(idx + 1)
                .map_or(true, |next| next.kind == TagKind::Newline);
        }
    }
}

//! Token and instruction-tree types for mustache templates

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Error returned when a delimiter pair cannot be parsed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid delimiters '{0}': expected \"open close\"")]
pub struct DelimitersError(pub String);

/// An open/close tag marker pair such as `{{` / `}}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Delimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new("{{", "}}")
    }
}

impl fmt::Display for Delimiters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.open, self.close)
    }
}

impl FromStr for Delimiters {
    type Err = DelimitersError;

    /// Parse the `"open close"` form. Extra inner whitespace is ignored; the
    /// first and last words win.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = s.split_whitespace().collect();
        match (words.first(), words.last()) {
            (Some(open), Some(close)) if words.len() >= 2 => Ok(Self::new(*open, *close)),
            _ => Err(DelimitersError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Delimiters {
    type Error = DelimitersError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Delimiters> for String {
    fn from(value: Delimiters) -> Self {
        value.to_string()
    }
}

/// Kind of a scanned token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// Literal text between tags
    Text,
    /// A line break that survived standalone-line stripping
    Newline,
    /// `{{name}}`
    Variable,
    /// `{{{name}}}` or `{{&name}}`
    Raw,
    /// `{{#name}}`
    Section,
    /// `{{^name}}`
    Inverted,
    /// `{{/name}}`
    Close,
    /// `{{!comment}}`
    Comment,
    /// `{{>name}}`
    Partial,
    /// `{{<name}}`, a partial inclusion carrying block overrides
    Super,
    /// `{{$name}}`, an overridable block
    Block,
}

impl TagKind {
    /// Map a tag sigil to its kind. `=` (delimiter change) and plain
    /// variables have no entry here.
    pub fn from_sigil(c: char) -> Option<Self> {
        match c {
            '#' => Some(TagKind::Section),
            '^' => Some(TagKind::Inverted),
            '<' => Some(TagKind::Super),
            '$' => Some(TagKind::Block),
            '/' => Some(TagKind::Close),
            '!' => Some(TagKind::Comment),
            '>' => Some(TagKind::Partial),
            '{' | '&' => Some(TagKind::Raw),
            _ => None,
        }
    }

    /// Tags that open a nested child sequence
    pub fn is_block(self) -> bool {
        matches!(
            self,
            TagKind::Section | TagKind::Inverted | TagKind::Super | TagKind::Block
        )
    }

    /// Tags that may stand alone on a line and have it stripped
    pub fn is_standalone(self) -> bool {
        self.is_block() || matches!(self, TagKind::Close | TagKind::Comment | TagKind::Partial)
    }

    /// Tokens legal as direct children of a `{{<name}}` inclusion
    pub fn allowed_in_super(self) -> bool {
        matches!(
            self,
            TagKind::Text | TagKind::Newline | TagKind::Block | TagKind::Close
        )
    }

    pub fn sigil(self) -> &'static str {
        match self {
            TagKind::Text | TagKind::Newline | TagKind::Variable => "",
            TagKind::Raw => "&",
            TagKind::Section => "#",
            TagKind::Inverted => "^",
            TagKind::Close => "/",
            TagKind::Comment => "!",
            TagKind::Partial => ">",
            TagKind::Super => "<",
            TagKind::Block => "$",
        }
    }
}

/// A scanned token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TagKind,
    /// Trimmed tag name; empty for text and newlines
    pub name: String,
    /// Literal text for `TagKind::Text`
    pub text: String,
    /// Source range of the whole tag (delimiters included)
    pub span: Span,
    /// Delimiters active when the tag was scanned
    pub delimiters: Delimiters,
    /// Whitespace stripped in front of a standalone partial
    pub indent: Option<String>,
    /// Set on a newline that ends the stream or precedes another newline
    pub last: bool,
}

impl Token {
    pub fn tag(kind: TagKind, name: impl Into<String>, span: Span, delimiters: &Delimiters) -> Self {
        Self {
            kind,
            name: name.into(),
            text: String::new(),
            span,
            delimiters: delimiters.clone(),
            indent: None,
            last: false,
        }
    }

    pub fn text(text: impl Into<String>, span: Span, delimiters: &Delimiters) -> Self {
        Self {
            text: text.into(),
            ..Self::tag(TagKind::Text, "", span, delimiters)
        }
    }

    pub fn newline(at: usize, delimiters: &Delimiters) -> Self {
        Self::tag(TagKind::Newline, "", at..at + 1, delimiters)
    }

    /// Render the tag the way it appeared, for diagnostics
    pub fn describe(&self) -> String {
        match self.kind {
            TagKind::Text => format!("text {:?}", self.text),
            TagKind::Newline => "newline".to_string(),
            kind => format!("{}{}", kind.sigil(), self.name),
        }
    }
}

/// A token plus, for block-shaped kinds, its children
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub token: Token,
    pub nodes: Vec<Node>,
    /// Source offset where the matching closer starts
    pub end: Option<usize>,
}

impl Node {
    pub fn leaf(token: Token) -> Self {
        Self {
            token,
            nodes: Vec::new(),
            end: None,
        }
    }

    pub fn kind(&self) -> TagKind {
        self.token.kind
    }

    pub fn name(&self) -> &str {
        &self.token.name
    }

    /// Source offset right after the opening tag
    pub fn start(&self) -> usize {
        self.token.span.end
    }
}

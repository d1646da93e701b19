//! Error types for compiling, rendering and loading templates

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

pub use crate::parser::ast::Span;

/// Errors raised while turning template text into a compiled template
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("missing closing tag: {name}")]
    MissingClosingTag { name: String, span: Span },

    #[error("closing tag without opener: /{name}")]
    ClosingTagWithoutOpener { name: String, span: Span },

    #[error("nesting error: {opener} vs. {closer}")]
    NestingError {
        opener: String,
        closer: String,
        span: Span,
    },

    #[error("illegal content in < super tag: {tag}")]
    IllegalInSuper { tag: String, span: Span },

    #[error("malformed delimiter change")]
    MalformedDelimiters { span: Span },
}

impl CompileError {
    /// Source range of the offending tag
    pub fn span(&self) -> &Span {
        match self {
            Self::MissingClosingTag { span, .. }
            | Self::ClosingTagWithoutOpener { span, .. }
            | Self::NestingError { span, .. }
            | Self::IllegalInSuper { span, .. }
            | Self::MalformedDelimiters { span } => span,
        }
    }

    fn label(&self) -> String {
        match self {
            Self::MissingClosingTag { name, .. } => format!("'{}' is opened here but never closed", name),
            Self::ClosingTagWithoutOpener { .. } => "nothing is open at this point".to_string(),
            Self::NestingError { opener, .. } => format!("expected the closer for '{}'", opener),
            Self::IllegalInSuper { .. } => "only text and {{$blocks}} may appear here".to_string(),
            Self::MalformedDelimiters { .. } => {
                "expected '=open close=' terminated by the current close delimiter".to_string()
            }
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        report(source, filename, self.span(), &self.to_string(), &self.label())
    }
}

/// Errors raised while executing a compiled template
#[derive(Error, Debug)]
pub enum RenderError {
    /// Source text had to be compiled at render time but the template has
    /// no live compiler
    #[error("no compiler available to compile {what}")]
    NoCompiler { what: String },

    #[error("lambda features disabled{}", in_block(block))]
    LambdasDisabled { block: Option<String> },

    /// Partial source or lambda output failed to compile
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Errors raised while reconstituting a serialized template
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("unrecognized input at {span:?}")]
    Lex { span: Span },

    #[error("syntax error at {span:?}: {message}")]
    Syntax { span: Span, message: String },

    #[error("malformed template at {span:?}: {message}")]
    Shape { span: Span, message: String },
}

impl LoadError {
    pub fn shape(span: Span, message: impl Into<String>) -> Self {
        Self::Shape {
            span,
            message: message.into(),
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            Self::Lex { span } | Self::Syntax { span, .. } | Self::Shape { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let label = match self {
            Self::Lex { .. } => "not a token of the serialized form".to_string(),
            Self::Syntax { message, .. } | Self::Shape { message, .. } => message.clone(),
        };
        report(source, filename, self.span(), "cannot load compiled template", &label)
    }
}

fn in_block(block: &Option<String>) -> String {
    match block {
        Some(name) => format!(" (in block '{}')", name),
        None => String::new(),
    }
}

fn report(source: &str, filename: &str, span: &Span, message: &str, label: &str) -> String {
    let mut buf = Vec::new();
    let written = Report::build(ReportKind::Error, filename, span.start)
        .with_message(message)
        .with_label(
            Label::new((filename, span.clone()))
                .with_message(label)
                .with_color(Color::Red),
        )
        .finish()
        .write((filename, Source::from(source)), &mut buf);

    match written {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_display() {
        let err = CompileError::NestingError {
            opener: "a".to_string(),
            closer: "b".to_string(),
            span: 6..12,
        };
        assert_eq!(err.to_string(), "nesting error: a vs. b");
        assert_eq!(err.span(), &(6..12));
    }

    #[test]
    fn test_compile_error_report_mentions_source() {
        let source = "{{#a}}{{/b}}";
        let err = CompileError::NestingError {
            opener: "a".to_string(),
            closer: "b".to_string(),
            span: 6..12,
        };
        let report = err.format(source, "page.mustache");
        assert!(report.contains("page.mustache"));
        assert!(report.contains("nesting error"));
        assert!(report.contains("expected the closer for 'a'"));
    }

    #[test]
    fn test_lambdas_disabled_display() {
        let err = RenderError::LambdasDisabled { block: None };
        assert_eq!(err.to_string(), "lambda features disabled");

        let err = RenderError::LambdasDisabled {
            block: Some("body".to_string()),
        };
        assert_eq!(err.to_string(), "lambda features disabled (in block 'body')");
    }
}

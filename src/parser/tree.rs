//! Tree builder: nests the flat token stream and validates tag pairing

use std::vec::IntoIter;

use serde::{Deserialize, Serialize};

use super::ast::{Node, TagKind, Token};
use crate::error::CompileError;

/// A custom open/close name pair treated like a `{{#section}}`, e.g.
/// `{{_i}}...{{/i}}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionTag {
    pub open: String,
    pub close: String,
}

impl SectionTag {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

/// Build the instruction tree for `tokens`
pub fn parse(tokens: Vec<Token>, section_tags: &[SectionTag]) -> Result<Vec<Node>, CompileError> {
    let mut builder = TreeBuilder {
        tokens: tokens.into_iter(),
        section_tags,
    };
    let (nodes, _) = builder.build(None)?;
    Ok(nodes)
}

struct TreeBuilder<'t> {
    tokens: IntoIter<Token>,
    section_tags: &'t [SectionTag],
}

impl TreeBuilder<'_> {
    /// Collect siblings until `opener`'s closer (or end of input at the top
    /// level). Returns the children and the source offset of the closer.
    fn build(&mut self, opener: Option<&Token>) -> Result<(Vec<Node>, Option<usize>), CompileError> {
        let in_super = opener.is_some_and(|o| o.kind == TagKind::Super);
        let mut nodes = Vec::new();

        while let Some(mut token) = self.tokens.next() {
            if in_super && !token.kind.allowed_in_super() {
                return Err(CompileError::IllegalInSuper {
                    tag: token.describe(),
                    span: token.span,
                });
            }

            if token.kind.is_block() || self.promote_custom_opener(&mut token) {
                let (children, end) = self.build(Some(&token))?;
                nodes.push(Node {
                    token,
                    nodes: children,
                    end,
                });
                continue;
            }

            if token.kind == TagKind::Close {
                let Some(opener) = opener else {
                    return Err(CompileError::ClosingTagWithoutOpener {
                        name: token.name,
                        span: token.span,
                    });
                };
                if token.name != opener.name && !self.is_custom_closer(&token.name, &opener.name) {
                    return Err(CompileError::NestingError {
                        opener: opener.name.clone(),
                        closer: token.name,
                        span: token.span,
                    });
                }
                return Ok((nodes, Some(token.span.start)));
            }

            nodes.push(Node::leaf(token));
        }

        match opener {
            Some(open) => Err(CompileError::MissingClosingTag {
                name: open.name.clone(),
                span: open.span.clone(),
            }),
            None => Ok((nodes, None)),
        }
    }

    /// Turn a variable named like a registered custom opener into a section
    fn promote_custom_opener(&self, token: &mut Token) -> bool {
        if !matches!(token.kind, TagKind::Variable | TagKind::Raw) {
            return false;
        }
        if self.section_tags.iter().any(|tag| tag.open == token.name) {
            token.kind = TagKind::Section;
            return true;
        }
        false
    }

    fn is_custom_closer(&self, close: &str, open: &str) -> bool {
        self.section_tags
            .iter()
            .any(|tag| tag.close == close && tag.open == open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::scanner::scan;

    fn tree(text: &str) -> Result<Vec<Node>, CompileError> {
        parse(scan(text, None)?, &[])
    }

    #[test]
    fn test_nested_sections() {
        let nodes = tree("{{#a}}x{{#b}}y{{/b}}{{/a}}z").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].kind(), TagKind::Section);
        assert_eq!(nodes[0].nodes.len(), 2);
        assert_eq!(nodes[0].nodes[1].name(), "b");
        assert_eq!(nodes[0].nodes[1].nodes[0].token.text, "y");
    }

    #[test]
    fn test_section_source_offsets() {
        let text = "{{#list}}<{{.}}>{{/list}}";
        let nodes = tree(text).unwrap();
        let section = &nodes[0];
        let end = section.end.unwrap();
        assert_eq!(&text[section.start()..end], "<{{.}}>");
    }

    #[test]
    fn test_missing_closing_tag() {
        let err = tree("{{#a}}{{#b}}{{/b}}").unwrap_err();
        assert_eq!(err.to_string(), "missing closing tag: a");
    }

    #[test]
    fn test_closing_without_opener() {
        let err = tree("x{{/a}}").unwrap_err();
        assert_eq!(err.to_string(), "closing tag without opener: /a");
        assert_eq!(err.span(), &(1..7));
    }

    #[test]
    fn test_nesting_error() {
        let err = tree("{{#a}}{{/b}}").unwrap_err();
        assert_eq!(err.to_string(), "nesting error: a vs. b");
    }

    #[test]
    fn test_illegal_content_in_super() {
        let err = tree("{{<parent}}{{name}}{{/parent}}").unwrap_err();
        assert!(matches!(err, CompileError::IllegalInSuper { .. }));

        let ok = tree("{{<parent}}\n  {{$a}}x{{/a}}\n{{/parent}}").unwrap();
        assert_eq!(ok[0].kind(), TagKind::Super);
        assert!(ok[0].nodes.iter().any(|n| n.kind() == TagKind::Block));
    }

    #[test]
    fn test_custom_section_tags() {
        let tags = [SectionTag::new("_i", "i")];
        let nodes = parse(scan("{{_i}}hi{{/i}}", None).unwrap(), &tags).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind(), TagKind::Section);
        assert_eq!(nodes[0].name(), "_i");

        let err = parse(scan("{{_i}}hi{{/x}}", None).unwrap(), &tags).unwrap_err();
        assert!(matches!(err, CompileError::NestingError { .. }));
    }

    #[test]
    fn test_custom_openers_only_promote_variables() {
        let tags = [SectionTag::new("_i", "i")];
        let nodes = parse(scan("{{&_i}}hi{{/i}}", None).unwrap(), &tags).unwrap();
        assert_eq!(nodes[0].kind(), TagKind::Section);

        let nodes = parse(scan("{{>_i}}{{!_i}}", None).unwrap(), &tags).unwrap();
        assert_eq!(nodes[0].kind(), TagKind::Partial);
        assert_eq!(nodes[1].kind(), TagKind::Comment);

        let err = parse(scan("{{>_i}}hi{{/i}}", None).unwrap(), &tags).unwrap_err();
        assert!(matches!(err, CompileError::ClosingTagWithoutOpener { .. }));
    }

    #[test]
    fn test_custom_closer_requires_registered_pair() {
        let err = tree("{{#_i}}hi{{/i}}").unwrap_err();
        assert!(matches!(err, CompileError::NestingError { .. }));
    }
}

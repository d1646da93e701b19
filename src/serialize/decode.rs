//! Decoder: s-expression tree to compiled unit

use std::sync::Arc;

use super::grammar::Sexp;
use super::Loaded;
use crate::compiler::{
    CompiledUnit, Instruction, Lookup, PartialRef, PartialTable, SubTable,
};
use crate::config::CompileOptions;
use crate::error::LoadError;
use crate::parser::ast::{Delimiters, Spanned};
use crate::parser::tree::SectionTag;

type Node = Spanned<Sexp>;

/// A `(head args...)` list
struct Form<'s> {
    head: &'s str,
    args: &'s [Node],
    span: &'s std::ops::Range<usize>,
}

fn form(node: &Node) -> Result<Form<'_>, LoadError> {
    let Sexp::List(items) = &node.node else {
        return Err(LoadError::shape(node.span.clone(), "expected a list"));
    };
    match items.split_first() {
        Some((
            Spanned {
                node: Sexp::Symbol(head),
                ..
            },
            args,
        )) => Ok(Form {
            head,
            args,
            span: &node.span,
        }),
        _ => Err(LoadError::shape(
            node.span.clone(),
            "expected a list starting with a symbol",
        )),
    }
}

fn string(node: &Node) -> Result<&str, LoadError> {
    match &node.node {
        Sexp::Str(s) => Ok(s),
        _ => Err(LoadError::shape(node.span.clone(), "expected a string")),
    }
}

fn int(node: &Node) -> Result<usize, LoadError> {
    match &node.node {
        Sexp::Int(n) => Ok(*n),
        _ => Err(LoadError::shape(node.span.clone(), "expected an integer")),
    }
}

impl<'s> Form<'s> {
    fn arg(&self, index: usize) -> Result<&'s Node, LoadError> {
        self.args.get(index).ok_or_else(|| {
            LoadError::shape(
                self.span.clone(),
                format!("'{}' is missing argument {}", self.head, index + 1),
            )
        })
    }

    fn string(&self, index: usize) -> Result<&'s str, LoadError> {
        string(self.arg(index)?)
    }

    fn int(&self, index: usize) -> Result<usize, LoadError> {
        int(self.arg(index)?)
    }

    fn expect_len(&self, len: usize) -> Result<(), LoadError> {
        if self.args.len() == len {
            Ok(())
        } else {
            Err(LoadError::shape(
                self.span.clone(),
                format!("'{}' takes {} argument(s)", self.head, len),
            ))
        }
    }
}

/// Decode a whole `(template ...)` document
pub fn template(node: &Node) -> Result<Loaded, LoadError> {
    let top = form(node)?;
    if top.head != "template" {
        return Err(LoadError::shape(node.span.clone(), "expected (template ...)"));
    }

    let mut source = None;
    let mut options = CompileOptions::default();
    let mut unit = CompiledUnit::default();

    for child in top.args {
        let section = form(child)?;
        match section.head {
            "source" => {
                section.expect_len(1)?;
                source = Some(section.string(0)?.to_string());
            }
            "options" => options = decode_options(&section)?,
            "code" => unit.code = instructions(section.args)?.into(),
            "subs" => unit.subs = subs(&section)?,
            "partials" => unit.partials = Arc::new(partials(&section)?),
            other => {
                return Err(LoadError::shape(
                    child.span.clone(),
                    format!("unknown template section '{}'", other),
                ))
            }
        }
    }

    let source = source.ok_or_else(|| LoadError::shape(node.span.clone(), "missing (source ...)"))?;
    Ok(Loaded {
        unit,
        source,
        options,
    })
}

fn decode_options(section: &Form<'_>) -> Result<CompileOptions, LoadError> {
    let mut options = CompileOptions::default();
    for child in section.args {
        let option = form(child)?;
        match option.head {
            "delimiters" => {
                option.expect_len(2)?;
                options.delimiters = Some(Delimiters::new(option.string(0)?, option.string(1)?));
            }
            "disable-lambda" => options.disable_lambda = true,
            "model-get" => options.model_get = true,
            "section-tag" => {
                option.expect_len(2)?;
                options
                    .section_tags
                    .push(SectionTag::new(option.string(0)?, option.string(1)?));
            }
            other => {
                return Err(LoadError::shape(
                    child.span.clone(),
                    format!("unknown option '{}'", other),
                ))
            }
        }
    }
    Ok(options)
}

fn instructions(nodes: &[Node]) -> Result<Vec<Instruction>, LoadError> {
    nodes.iter().map(instruction).collect()
}

fn instruction(node: &Node) -> Result<Instruction, LoadError> {
    let f = form(node)?;
    let instruction = match f.head {
        "text" => {
            f.expect_len(1)?;
            Instruction::Text(f.string(0)?.to_string())
        }
        "newline" => {
            f.expect_len(0)?;
            Instruction::Newline { last: false }
        }
        "newline-last" => {
            f.expect_len(0)?;
            Instruction::Newline { last: true }
        }
        "escape" => {
            f.expect_len(1)?;
            Instruction::Escaped(Lookup::new(f.string(0)?))
        }
        "raw" => {
            f.expect_len(1)?;
            Instruction::Raw(Lookup::new(f.string(0)?))
        }
        "section" => {
            let (start, end) = (f.int(1)?, f.int(2)?);
            if start > end {
                return Err(LoadError::shape(node.span.clone(), "section ends before it starts"));
            }
            Instruction::Section {
                key: Lookup::new(f.string(0)?),
                start,
                end,
                delimiters: Delimiters::new(f.string(3)?, f.string(4)?),
                body: instructions(&f.args[5..])?.into(),
            }
        }
        "inverted" => Instruction::Inverted {
            key: Lookup::new(f.string(0)?),
            body: instructions(&f.args[1..])?.into(),
        },
        "partial-ref" => {
            f.expect_len(2)?;
            Instruction::Partial {
                symbol: f.string(0)?.to_string(),
                indent: f.string(1)?.to_string(),
            }
        }
        "sub" => {
            f.expect_len(1)?;
            Instruction::Sub {
                name: f.string(0)?.to_string(),
            }
        }
        other => {
            return Err(LoadError::shape(
                node.span.clone(),
                format!("unknown instruction '{}'", other),
            ))
        }
    };
    Ok(instruction)
}

fn subs(section: &Form<'_>) -> Result<SubTable, LoadError> {
    let mut table = SubTable::new();
    for child in section.args {
        let block = form(child)?;
        if block.head != "block" {
            return Err(LoadError::shape(child.span.clone(), "expected (block ...)"));
        }
        let name = block.string(0)?.to_string();
        table.insert(name, instructions(&block.args[1..])?.into());
    }
    Ok(table)
}

fn partials(section: &Form<'_>) -> Result<PartialTable, LoadError> {
    let mut table = PartialTable::new();
    for child in section.args {
        let entry = form(child)?;
        if entry.head != "partial" {
            return Err(LoadError::shape(child.span.clone(), "expected (partial ...)"));
        }
        let symbol = entry.string(0)?.to_string();
        let mut partial = PartialRef::new(entry.string(1)?);

        for nested in &entry.args[2..] {
            let nested_form = form(nested)?;
            match nested_form.head {
                "partials" => partial.partials = Arc::new(partials(&nested_form)?),
                "subs" => partial.subs = subs(&nested_form)?,
                other => {
                    return Err(LoadError::shape(
                        nested.span.clone(),
                        format!("unexpected '{}' in partial", other),
                    ))
                }
            }
        }
        table.insert(symbol, partial);
    }
    Ok(table)
}

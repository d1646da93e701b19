//! Runtime execution engine
//!
//! Interprets a compiled unit against a context stack. All mutable state of
//! one render call (partial bindings and the active block name) lives in a
//! [`RenderState`] created for that call, so a shared [`Template`] can be
//! rendered concurrently or re-entrantly.
//!
//! Block overrides are layered: each `{{<name}}` inclusion adds a layer on
//! top of the caller's layers, and lookup consults the caller's layers first
//! so the definition closest to the render call wins.

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use tracing::{debug, trace};

use super::context::{self, find_in_scope};
use super::partials::{PartialSource, Partials};
use super::value::{Lambda, Value};
use super::Template;
use crate::compiler::{Block, Instruction, Lookup, PartialRef, PartialTable};
use crate::error::RenderError;
use crate::parser::ast::Delimiters;

/// A block body together with the tables it was compiled against
#[derive(Debug, Clone)]
struct BlockDef {
    body: Block,
    partials: Arc<PartialTable>,
    /// Text that section offsets inside `body` refer to
    source: Arc<str>,
}

#[derive(Debug)]
struct Overrides {
    blocks: HashMap<String, BlockDef>,
    /// Layers supplied by templates closer to the render call
    parent: Option<Arc<Overrides>>,
}

impl Overrides {
    fn lookup(&self, name: &str) -> Option<&BlockDef> {
        self.parent
            .as_deref()
            .and_then(|parent| parent.lookup(name))
            .or_else(|| self.blocks.get(name))
    }
}

/// What the instructions currently executing were compiled against
struct Frame<'t> {
    template: &'t Template,
    overrides: Option<Arc<Overrides>>,
    partials: Arc<PartialTable>,
    source: Arc<str>,
}

#[derive(Debug, Clone, Copy)]
struct SectionSource<'a> {
    start: usize,
    end: usize,
    delimiters: &'a Delimiters,
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct BindingKey {
    table: usize,
    symbol: String,
    overrides: usize,
}

struct Binding {
    /// Identity of the dictionary entry this binding was built from
    bound_onto: usize,
    template: Arc<Template>,
    overrides: Option<Arc<Overrides>>,
    // Keep the keyed identities alive so their addresses are not reused
    _table: Arc<PartialTable>,
    _caller: Option<Arc<Overrides>>,
}

pub(crate) struct RenderState<'p> {
    partials: &'p Partials,
    bindings: HashMap<BindingKey, Binding>,
    active_sub: Option<String>,
}

impl<'p> RenderState<'p> {
    pub(crate) fn new(partials: &'p Partials) -> Self {
        Self {
            partials,
            bindings: HashMap::new(),
            active_sub: None,
        }
    }

    /// Render `template` against `ctx`, appending to `out`
    pub(crate) fn render(
        &mut self,
        template: &Template,
        ctx: &mut Vec<Value>,
        indent: &str,
        out: &mut String,
    ) -> Result<(), RenderError> {
        self.run(template, None, ctx, indent, out)
    }

    fn run(
        &mut self,
        template: &Template,
        overrides: Option<Arc<Overrides>>,
        ctx: &mut Vec<Value>,
        indent: &str,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let frame = Frame {
            template,
            overrides,
            partials: template.unit.partials.clone(),
            source: template.source.clone(),
        };
        out.push_str(indent);
        self.exec(&frame, &template.unit.code, ctx, indent, out)
    }

    fn exec(
        &mut self,
        frame: &Frame<'_>,
        code: &[Instruction],
        ctx: &mut Vec<Value>,
        indent: &str,
        out: &mut String,
    ) -> Result<(), RenderError> {
        for instruction in code {
            match instruction {
                Instruction::Text(text) => out.push_str(text),
                Instruction::Newline { last } => {
                    out.push('\n');
                    if !last {
                        out.push_str(indent);
                    }
                }
                Instruction::Escaped(key) => {
                    let value = self.resolve(frame, key, ctx, false)?;
                    push_escaped(out, &value.to_string());
                }
                Instruction::Raw(key) => {
                    let value = self.resolve(frame, key, ctx, false)?;
                    out.push_str(&value.to_string());
                }
                Instruction::Section {
                    key,
                    body,
                    start,
                    end,
                    delimiters,
                } => {
                    let value = self.resolve(frame, key, ctx, true)?;
                    let source = SectionSource {
                        start: *start,
                        end: *end,
                        delimiters,
                    };
                    if self.start_section(frame, value, ctx, false, Some(source), out)? {
                        self.render_section(frame, body, ctx, indent, out)?;
                        ctx.pop();
                    }
                }
                Instruction::Inverted { key, body } => {
                    let value = self.resolve(frame, key, ctx, true)?;
                    if !self.start_section(frame, value, ctx, true, None, out)? {
                        self.exec(frame, body, ctx, indent, out)?;
                    }
                }
                Instruction::Partial { symbol, indent } => {
                    self.render_partial(frame, symbol, ctx, indent, out)?;
                }
                Instruction::Sub { name } => self.run_sub(frame, name, ctx, indent, out)?,
            }
        }
        Ok(())
    }

    /// Resolve a key. Section lookups leave lambdas uninvoked for the
    /// section algorithm to handle.
    fn resolve(
        &mut self,
        frame: &Frame<'_>,
        key: &Lookup,
        ctx: &mut Vec<Value>,
        section: bool,
    ) -> Result<Value, RenderError> {
        if key.dotted {
            self.resolve_dotted(frame, &key.name, ctx, section)
        } else {
            self.resolve_simple(frame, &key.name, ctx, section)
        }
    }

    fn resolve_simple(
        &mut self,
        frame: &Frame<'_>,
        name: &str,
        ctx: &mut Vec<Value>,
        section: bool,
    ) -> Result<Value, RenderError> {
        match context::lookup(name, ctx, frame.template.options.model_get) {
            Some(Value::Lambda(lambda)) if !section => self.method_variable(frame, &lambda, ctx),
            Some(value) => Ok(value),
            None => Ok(Value::Null),
        }
    }

    fn resolve_dotted(
        &mut self,
        frame: &Frame<'_>,
        name: &str,
        ctx: &mut Vec<Value>,
        section: bool,
    ) -> Result<Value, RenderError> {
        let model_get = frame.template.options.model_get;
        let mut names = name.split('.');
        let first = names.next().unwrap_or_default();
        let mut value = self.resolve_simple(frame, first, ctx, section)?;
        let mut receiver = Value::Null;

        if name == "." && context::is_iterating(ctx) {
            value = ctx.last().cloned().unwrap_or_default();
        } else {
            for segment in names {
                match find_in_scope(segment, &value, model_get) {
                    Some(found) => receiver = mem::replace(&mut value, found),
                    None => value = Value::String(String::new()),
                }
            }
        }

        match value {
            Value::Lambda(lambda) if !section => {
                ctx.push(receiver);
                let result = self.method_variable(frame, &lambda, ctx);
                ctx.pop();
                result
            }
            value => Ok(value),
        }
    }

    /// A lambda found for a variable: its result is the value, unless the
    /// result is itself a lambda whose output is compiled and rendered
    fn method_variable(
        &mut self,
        frame: &Frame<'_>,
        lambda: &Lambda,
        ctx: &[Value],
    ) -> Result<Value, RenderError> {
        let receiver = ctx.last().cloned().unwrap_or_default();
        match lambda.invoke(&receiver) {
            Value::Lambda(inner) => {
                let text = inner.expand(&receiver, "");
                let rendered = self.compile_and_render(frame, &text, receiver, None)?;
                Ok(Value::String(rendered))
            }
            value => Ok(value),
        }
    }

    /// A lambda found for a section. A higher-order result receives the
    /// section's raw text and its output is rendered in place.
    fn method_section(
        &mut self,
        frame: &Frame<'_>,
        lambda: &Lambda,
        ctx: &[Value],
        inverted: bool,
        source: Option<SectionSource<'_>>,
        out: &mut String,
    ) -> Result<Value, RenderError> {
        let receiver = ctx.last().cloned().unwrap_or_default();
        match lambda.invoke(&receiver) {
            Value::Lambda(_) if inverted => Ok(Value::Bool(true)),
            Value::Lambda(inner) => {
                let Some(source) = source else {
                    return Ok(Value::Bool(false));
                };
                let text = frame.source.get(source.start..source.end).unwrap_or_default();
                let expanded = inner.expand(&receiver, text);
                let rendered =
                    self.compile_and_render(frame, &expanded, receiver, Some(source.delimiters))?;
                out.push_str(&rendered);
                Ok(Value::Bool(false))
            }
            value => Ok(value),
        }
    }

    /// Compile lambda output and render it against `receiver` alone
    fn compile_and_render(
        &mut self,
        frame: &Frame<'_>,
        text: &str,
        receiver: Value,
        delimiters: Option<&Delimiters>,
    ) -> Result<String, RenderError> {
        if frame.template.options.disable_lambda {
            return Err(RenderError::LambdasDisabled {
                block: self.active_sub.clone(),
            });
        }
        let compiler = frame
            .template
            .compiler()
            .ok_or_else(|| RenderError::NoCompiler {
                what: "lambda output".to_string(),
            })?;

        let mut options = frame.template.options.for_runtime();
        if let Some(delimiters) = delimiters {
            options.delimiters = Some(delimiters.clone());
        }
        debug!(len = text.len(), "compiling lambda output");
        let template = compiler.compile_template(text, &options)?;

        let active = self.active_sub.take();
        let mut ctx = vec![receiver];
        let mut out = String::new();
        let result = self.run(&template, None, &mut ctx, "", &mut out);
        self.active_sub = active;
        result.map(|()| out)
    }

    /// Decide whether a section renders, pushing its scope if it does.
    ///
    /// An empty list is falsy. Objects and lists are pushed as the new scope;
    /// any other truthy value pushes a copy of the current top so the body
    /// sees the same names.
    fn start_section(
        &mut self,
        frame: &Frame<'_>,
        value: Value,
        ctx: &mut Vec<Value>,
        inverted: bool,
        source: Option<SectionSource<'_>>,
        out: &mut String,
    ) -> Result<bool, RenderError> {
        if value.is_empty_list() {
            return Ok(false);
        }

        let value = match value {
            Value::Lambda(lambda) => {
                self.method_section(frame, &lambda, ctx, inverted, source, out)?
            }
            value => value,
        };

        let pass = value.is_truthy();
        if !inverted && pass {
            let scope = if value.is_object() {
                value
            } else {
                ctx.last().cloned().unwrap_or_default()
            };
            ctx.push(scope);
        }
        Ok(pass)
    }

    /// Run a section body once, or once per element when the pushed scope
    /// is a list
    fn render_section(
        &mut self,
        frame: &Frame<'_>,
        body: &[Instruction],
        ctx: &mut Vec<Value>,
        indent: &str,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let Some(Value::List(items)) = ctx.last() else {
            return self.exec(frame, body, ctx, indent, out);
        };

        let items = Arc::clone(items);
        for item in items.iter() {
            ctx.push(item.clone());
            let result = self.exec(frame, body, ctx, indent, out);
            ctx.pop();
            result?;
        }
        Ok(())
    }

    fn render_partial(
        &mut self,
        frame: &Frame<'_>,
        symbol: &str,
        ctx: &mut Vec<Value>,
        indent: &str,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let Some(partial) = frame.partials.get(symbol) else {
            return Ok(());
        };
        let Some((template, overrides)) = self.ensure_partial(frame, symbol, partial)? else {
            return Ok(());
        };
        self.run(&template, overrides, ctx, indent, out)
    }

    /// Resolve the template and override layers bound to a partial symbol.
    ///
    /// Bindings are reused while the dictionary entry they were built from
    /// stays the same; a different entry under the same name is rebound.
    fn ensure_partial(
        &mut self,
        frame: &Frame<'_>,
        symbol: &str,
        partial: &PartialRef,
    ) -> Result<Option<(Arc<Template>, Option<Arc<Overrides>>)>, RenderError> {
        let partials = self.partials;
        let Some(entry) = partials.get(&partial.name) else {
            trace!(name = %partial.name, "partial not found");
            return Ok(None);
        };

        let bound_onto = entry as *const PartialSource as usize;
        let key = BindingKey {
            table: Arc::as_ptr(&frame.partials) as usize,
            symbol: symbol.to_string(),
            overrides: frame
                .overrides
                .as_ref()
                .map_or(0, |layer| Arc::as_ptr(layer) as usize),
        };

        if let Some(binding) = self.bindings.get(&key) {
            if binding.bound_onto == bound_onto {
                trace!(symbol, "reusing partial binding");
                return Ok(Some((binding.template.clone(), binding.overrides.clone())));
            }
            trace!(symbol, "partial entry changed, rebinding");
        }

        let template = match entry {
            PartialSource::Compiled(template) => template.clone(),
            PartialSource::Source(text) => {
                let compiler =
                    frame
                        .template
                        .compiler()
                        .ok_or_else(|| RenderError::NoCompiler {
                            what: format!("partial '{}'", partial.name),
                        })?;
                debug!(name = %partial.name, "compiling partial source");
                compiler.compile_template(text, &frame.template.options)?
            }
        };

        let overrides = if partial.has_overrides() {
            let blocks = partial
                .subs
                .iter()
                .map(|(name, body)| {
                    let def = BlockDef {
                        body: body.clone(),
                        partials: partial.partials.clone(),
                        source: frame.source.clone(),
                    };
                    (name.clone(), def)
                })
                .collect();
            Some(Arc::new(Overrides {
                blocks,
                parent: frame.overrides.clone(),
            }))
        } else {
            frame.overrides.clone()
        };

        self.bindings.insert(
            key,
            Binding {
                bound_onto,
                template: template.clone(),
                overrides: overrides.clone(),
                _table: frame.partials.clone(),
                _caller: frame.overrides.clone(),
            },
        );
        Ok(Some((template, overrides)))
    }

    /// Run the named block: the closest override if any, else the
    /// template's own default
    fn run_sub(
        &mut self,
        frame: &Frame<'_>,
        name: &str,
        ctx: &mut Vec<Value>,
        indent: &str,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let overridden = frame
            .overrides
            .as_deref()
            .and_then(|layer| layer.lookup(name))
            .cloned();
        let def = match overridden {
            Some(def) => def,
            None => match frame.template.unit.subs.get(name) {
                Some(body) => BlockDef {
                    body: body.clone(),
                    partials: frame.template.unit.partials.clone(),
                    source: frame.template.source.clone(),
                },
                None => return Ok(()),
            },
        };

        let block_frame = Frame {
            template: frame.template,
            overrides: frame.overrides.clone(),
            partials: def.partials,
            source: def.source,
        };
        let previous = self.active_sub.replace(name.to_string());
        let result = self.exec(&block_frame, &def.body, ctx, indent, out);
        self.active_sub = previous;
        result
    }
}

/// HTML-escape `text` onto `out`
pub(crate) fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

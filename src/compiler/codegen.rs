//! Code generator: instruction tree to [`CompiledUnit`]
//!
//! Walks the tree once. Sections and inverted sections inline their bodies
//! into the current scope, so blocks and partials found inside them land in
//! the same tables. `{{<name}}` walks its children in an isolated scope and
//! attaches the collected overrides to a fresh partial symbol; `{{$name}}`
//! walks in a scope that shares the enclosing partial table but prefixes new
//! symbols with the block name.

use std::mem;
use std::sync::Arc;

use super::unit::{Block, CompiledUnit, Instruction, Lookup, PartialRef, PartialTable, SubTable};
use crate::parser::ast::{Node, TagKind};

/// Generate the compiled unit for a parsed template
pub fn generate(tree: &[Node]) -> CompiledUnit {
    let mut generator = Generator { serial: 0 };
    let mut scope = Scope::default();
    generator.walk(tree, &mut scope);

    CompiledUnit {
        code: scope.code.into(),
        subs: scope.subs,
        partials: Arc::new(scope.partials),
    }
}

#[derive(Default)]
struct Scope {
    code: Vec<Instruction>,
    subs: SubTable,
    partials: PartialTable,
    /// Block name prepended to partial symbols created in this scope
    prefix: String,
    /// Direct children of `{{<name}}` only register overrides
    in_super: bool,
}

struct Generator {
    /// Partial symbol counter, reset for every unit
    serial: usize,
}

impl Generator {
    fn walk(&mut self, nodes: &[Node], scope: &mut Scope) {
        for node in nodes {
            match node.kind() {
                TagKind::Text => scope.code.push(Instruction::Text(node.token.text.clone())),
                TagKind::Newline => scope.code.push(Instruction::Newline {
                    last: node.token.last,
                }),
                TagKind::Variable => scope.code.push(Instruction::Escaped(Lookup::new(node.name()))),
                TagKind::Raw => scope.code.push(Instruction::Raw(Lookup::new(node.name()))),
                TagKind::Section => {
                    let body = self.inline_body(&node.nodes, scope);
                    scope.code.push(Instruction::Section {
                        key: Lookup::new(node.name()),
                        body,
                        start: node.start(),
                        end: node.end.unwrap_or_else(|| node.start()),
                        delimiters: node.token.delimiters.clone(),
                    });
                }
                TagKind::Inverted => {
                    let body = self.inline_body(&node.nodes, scope);
                    scope.code.push(Instruction::Inverted {
                        key: Lookup::new(node.name()),
                        body,
                    });
                }
                TagKind::Partial => {
                    self.create_partial(node, scope);
                }
                TagKind::Super => self.super_block(node, scope),
                TagKind::Block => self.overridable_block(node, scope),
                TagKind::Comment | TagKind::Close => {}
            }
        }
    }

    /// Generate `nodes` into the current scope's tables, returning the code
    fn inline_body(&mut self, nodes: &[Node], scope: &mut Scope) -> Block {
        let outer = mem::take(&mut scope.code);
        self.walk(nodes, scope);
        mem::replace(&mut scope.code, outer).into()
    }

    fn create_partial(&mut self, node: &Node, scope: &mut Scope) -> String {
        let symbol = format!("<{}{}{}", scope.prefix, node.name(), self.serial);
        self.serial += 1;

        scope
            .partials
            .insert(symbol.clone(), PartialRef::new(node.name()));
        scope.code.push(Instruction::Partial {
            symbol: symbol.clone(),
            indent: node.token.indent.clone().unwrap_or_default(),
        });
        symbol
    }

    fn super_block(&mut self, node: &Node, scope: &mut Scope) {
        let mut inner = Scope {
            in_super: true,
            ..Scope::default()
        };
        self.walk(&node.nodes, &mut inner);

        let symbol = self.create_partial(node, scope);
        if let Some(partial) = scope.partials.get_mut(&symbol) {
            partial.subs = inner.subs;
            partial.partials = Arc::new(inner.partials);
        }
    }

    fn overridable_block(&mut self, node: &Node, scope: &mut Scope) {
        let mut inner = Scope {
            partials: mem::take(&mut scope.partials),
            prefix: node.name().to_string(),
            ..Scope::default()
        };
        self.walk(&node.nodes, &mut inner);
        scope.partials = inner.partials;

        // Nested defaults stay reachable from the enclosing table, but an
        // override never overrides the blocks nested inside it
        if !scope.in_super {
            for (name, body) in inner.subs {
                scope.subs.entry(name).or_insert(body);
            }
        }
        scope
            .subs
            .insert(node.name().to_string(), inner.code.into());

        if !scope.in_super {
            scope.code.push(Instruction::Sub {
                name: node.name().to_string(),
            });
        }
    }
}

//! Writer for the serialized form
//!
//! Every list starts on its own line, indented two spaces per level; atoms
//! follow their list head on the same line.

use super::lexer::escape;
use crate::compiler::{CompiledUnit, Instruction, PartialTable, SubTable};
use crate::config::CompileOptions;

/// Serialize a compiled unit with the source and options it came from
pub fn write(unit: &CompiledUnit, source: &str, options: &CompileOptions) -> String {
    let mut p = Printer::default();
    p.out.push_str("; compiled mustache template\n");

    p.open("template");

    p.open("source");
    p.string(source);
    p.close();

    p.open("options");
    if let Some(delimiters) = &options.delimiters {
        p.open("delimiters");
        p.string(&delimiters.open);
        p.string(&delimiters.close);
        p.close();
    }
    if options.disable_lambda {
        p.open("disable-lambda");
        p.close();
    }
    if options.model_get {
        p.open("model-get");
        p.close();
    }
    for tag in &options.section_tags {
        p.open("section-tag");
        p.string(&tag.open);
        p.string(&tag.close);
        p.close();
    }
    p.close();

    p.open("code");
    p.instructions(&unit.code);
    p.close();

    p.subs(&unit.subs);
    p.partials(&unit.partials);

    p.close();
    p.out
}

#[derive(Default)]
struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn open(&mut self, head: &str) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push('(');
        self.out.push_str(head);
        self.depth += 1;
    }

    fn close(&mut self) {
        self.out.push(')');
        self.depth = self.depth.saturating_sub(1);
    }

    fn string(&mut self, text: &str) {
        self.out.push(' ');
        self.out.push_str(&escape(text));
    }

    fn int(&mut self, n: usize) {
        self.out.push(' ');
        self.out.push_str(&n.to_string());
    }

    fn instructions(&mut self, code: &[Instruction]) {
        for instruction in code {
            self.instruction(instruction);
        }
    }

    fn instruction(&mut self, instruction: &Instruction) {
        match instruction {
            Instruction::Text(text) => {
                self.open("text");
                self.string(text);
            }
            Instruction::Newline { last: false } => self.open("newline"),
            Instruction::Newline { last: true } => self.open("newline-last"),
            Instruction::Escaped(key) => {
                self.open("escape");
                self.string(&key.name);
            }
            Instruction::Raw(key) => {
                self.open("raw");
                self.string(&key.name);
            }
            Instruction::Section {
                key,
                body,
                start,
                end,
                delimiters,
            } => {
                self.open("section");
                self.string(&key.name);
                self.int(*start);
                self.int(*end);
                self.string(&delimiters.open);
                self.string(&delimiters.close);
                self.instructions(body);
            }
            Instruction::Inverted { key, body } => {
                self.open("inverted");
                self.string(&key.name);
                self.instructions(body);
            }
            Instruction::Partial { symbol, indent } => {
                self.open("partial-ref");
                self.string(symbol);
                self.string(indent);
            }
            Instruction::Sub { name } => {
                self.open("sub");
                self.string(name);
            }
        }
        self.close();
    }

    fn subs(&mut self, subs: &SubTable) {
        if subs.is_empty() {
            return;
        }
        self.open("subs");
        for (name, body) in subs {
            self.open("block");
            self.string(name);
            self.instructions(body);
            self.close();
        }
        self.close();
    }

    fn partials(&mut self, partials: &PartialTable) {
        if partials.is_empty() {
            return;
        }
        self.open("partials");
        for (symbol, partial) in partials {
            self.open("partial");
            self.string(symbol);
            self.string(&partial.name);
            self.partials(&partial.partials);
            self.subs(&partial.subs);
            self.close();
        }
        self.close();
    }
}

//! Compiled instruction tree
//!
//! A template compiles to a [`CompiledUnit`]: the top-level instruction
//! sequence, the table of overridable block bodies, and the table of partial
//! references keyed by their unique symbols. Blocks are shared slices so a
//! cached unit can be handed to any number of renders without copying.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::parser::ast::Delimiters;

/// An immutable instruction sequence
pub type Block = Arc<[Instruction]>;

/// Overridable block bodies by block name
pub type SubTable = BTreeMap<String, Block>;

/// Partial references by unique symbol
pub type PartialTable = BTreeMap<String, PartialRef>;

/// A key to resolve against the context stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub name: String,
    /// Dotted names walk properties after the first segment
    pub dotted: bool,
}

impl Lookup {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            dotted: name.contains('.'),
            name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Text(String),
    /// Line break; unless `last`, followed by the active indent
    Newline { last: bool },
    Escaped(Lookup),
    Raw(Lookup),
    Section {
        key: Lookup,
        body: Block,
        /// Raw source range of the body, handed to higher-order lambdas
        start: usize,
        end: usize,
        /// Delimiters active at the opening tag
        delimiters: Delimiters,
    },
    Inverted {
        key: Lookup,
        body: Block,
    },
    /// Render the partial registered under `symbol`
    Partial { symbol: String, indent: String },
    /// Run the named overridable block
    Sub { name: String },
}

/// Entry in a unit's partial table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartialRef {
    /// Name looked up in the partials dictionary at render time
    pub name: String,
    /// Partials referenced from the override bodies below
    pub partials: Arc<PartialTable>,
    /// Block overrides supplied by a `{{<name}}` inclusion
    pub subs: SubTable,
}

impl PartialRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// True for `{{<name}}` inclusions that supply overrides
    pub fn has_overrides(&self) -> bool {
        !self.subs.is_empty()
    }
}

/// The output of code generation
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledUnit {
    pub code: Block,
    pub subs: SubTable,
    pub partials: Arc<PartialTable>,
}

impl Default for CompiledUnit {
    fn default() -> Self {
        Self {
            code: Arc::from(Vec::new()),
            subs: SubTable::new(),
            partials: Arc::new(PartialTable::new()),
        }
    }
}

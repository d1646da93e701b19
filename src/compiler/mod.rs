//! Compiler handle: scan, parse, generate, cached
//!
//! A [`Compiler`] is a cheap-to-clone handle around a shared
//! [`CompileCache`]. Templates it produces hold a weak reference back to the
//! cache so partial source and lambda output can be compiled on demand while
//! rendering.

pub mod cache;
pub mod codegen;
pub mod unit;

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

pub use cache::{CacheKey, CacheStats, CompileCache};
pub use codegen::generate;
pub use unit::{Block, CompiledUnit, Instruction, Lookup, PartialRef, PartialTable, SubTable};

use crate::config::CompileOptions;
use crate::error::{CompileError, LoadError};
use crate::parser::{parse, scan};
use crate::serialize;
use crate::template::Template;

/// Result of [`Compiler::compile`]
#[derive(Debug, Clone)]
pub enum Compiled {
    Template(Arc<Template>),
    /// The serialized form, produced when `as_string` is set
    Serialized(Arc<str>),
}

impl Compiled {
    pub fn as_serialized(&self) -> Option<&str> {
        match self {
            Compiled::Serialized(text) => Some(text),
            Compiled::Template(_) => None,
        }
    }
}

static GLOBAL: Lazy<Compiler> = Lazy::new(Compiler::new);

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    cache: Arc<CompileCache>,
}

impl Compiler {
    /// Create a compiler with a fresh, private cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compiler sharing an existing cache
    pub fn with_cache(cache: Arc<CompileCache>) -> Self {
        Self { cache }
    }

    /// The process-wide compiler
    pub fn global() -> &'static Compiler {
        &GLOBAL
    }

    pub fn cache(&self) -> &Arc<CompileCache> {
        &self.cache
    }

    /// Compile `text`, reusing the cached result for identical text and
    /// options
    pub fn compile(&self, text: &str, options: &CompileOptions) -> Result<Compiled, CompileError> {
        self.cache
            .get_or_try_insert(CacheKey::new(text, options), || {
                let template = Arc::new(self.build(text, options)?);
                if options.as_string {
                    Ok(Compiled::Serialized(Arc::from(template.serialize())))
                } else {
                    Ok(Compiled::Template(template))
                }
            })
    }

    /// Compile `text` to a ready-to-run template, ignoring `as_string`
    pub fn compile_template(
        &self,
        text: &str,
        options: &CompileOptions,
    ) -> Result<Arc<Template>, CompileError> {
        let options = options.for_runtime();
        match self.compile(text, &options)? {
            Compiled::Template(template) => Ok(template),
            // Unreachable with `as_string` cleared; rebuild rather than panic
            Compiled::Serialized(_) => Ok(Arc::new(self.build(text, &options)?)),
        }
    }

    /// Reconstitute a serialized template bound to this compiler
    pub fn load(&self, serialized: &str) -> Result<Arc<Template>, LoadError> {
        let loaded = serialize::load(serialized)?;
        Ok(Arc::new(Template::new(
            loaded.unit,
            loaded.source,
            loaded.options,
            Some(Arc::downgrade(&self.cache)),
        )))
    }

    /// Run the full pipeline without touching the cache
    fn build(&self, text: &str, options: &CompileOptions) -> Result<Template, CompileError> {
        debug!(len = text.len(), "compiling template");
        let tokens = scan(text, options.delimiters.as_ref())?;
        let tree = parse(tokens, &options.section_tags)?;
        let unit = generate(&tree);
        Ok(Template::new(
            unit,
            text,
            options.clone(),
            Some(Arc::downgrade(&self.cache)),
        ))
    }
}

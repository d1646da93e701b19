//! Compiled templates and the data they render
//!
//! A [`Template`] is immutable once compiled: it owns its instruction tree,
//! the source text (needed to hand section bodies to lambdas) and the options
//! it was compiled with. Rendering creates fresh per-call state, so one
//! template can be shared across threads.
//!
//! # Example
//!
//! ```rust
//! use mustachio::{compile, Value};
//!
//! let template = compile("Hello, {{name}}!").unwrap();
//! let data = Value::map([("name", "Amy")]);
//! assert_eq!(template.render(&data).unwrap(), "Hello, Amy!");
//! ```

mod context;
mod partials;
mod render;
mod value;

use std::sync::{Arc, Weak};

pub use partials::{PartialSource, Partials};
pub use value::{Lambda, Model, Value};

use crate::compiler::{CompileCache, CompiledUnit, Compiler};
use crate::config::CompileOptions;
use crate::error::{LoadError, RenderError};
use crate::serialize;
use render::RenderState;

#[derive(Debug)]
pub struct Template {
    unit: CompiledUnit,
    source: Arc<str>,
    options: CompileOptions,
    compiler: Option<Weak<CompileCache>>,
}

impl Template {
    pub(crate) fn new(
        unit: CompiledUnit,
        source: impl Into<Arc<str>>,
        options: CompileOptions,
        compiler: Option<Weak<CompileCache>>,
    ) -> Self {
        Self {
            unit,
            source: source.into(),
            options,
            compiler,
        }
    }

    /// Reconstitute a serialized template without a compiler.
    ///
    /// Such a template renders precompiled partials only; partial source
    /// text or lambda output fails with [`RenderError::NoCompiler`].
    pub fn from_serialized(text: &str) -> Result<Self, LoadError> {
        let loaded = serialize::load(text)?;
        Ok(Self::new(loaded.unit, loaded.source, loaded.options, None))
    }

    pub fn unit(&self) -> &CompiledUnit {
        &self.unit
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// The serialized form of this template
    pub fn serialize(&self) -> String {
        serialize::write(&self.unit, &self.source, &self.options)
    }

    /// The compiler this template was built by, if it is still alive
    pub fn compiler(&self) -> Option<Compiler> {
        self.compiler
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Compiler::with_cache)
    }

    /// Render against `data` with no partials
    pub fn render(&self, data: &Value) -> Result<String, RenderError> {
        self.render_with(data, &Partials::new())
    }

    pub fn render_with(&self, data: &Value, partials: &Partials) -> Result<String, RenderError> {
        self.render_indented(data, partials, "")
    }

    /// Render with `indent` written at the start and after every line break
    /// that is followed by more output
    pub fn render_indented(
        &self,
        data: &Value,
        partials: &Partials,
        indent: &str,
    ) -> Result<String, RenderError> {
        let mut state = RenderState::new(partials);
        let mut ctx = vec![data.clone()];
        let mut out = String::new();
        state.render(self, &mut ctx, indent, &mut out)?;
        Ok(out)
    }
}

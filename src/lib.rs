//! Mustachio - a mustache template compiler and runtime
//!
//! Templates are scanned, nested into an instruction tree and compiled once
//! into a typed instruction sequence that the runtime interprets. Compiled
//! templates are cached by text and options, support partials, template
//! inheritance (`{{<parent}}` with `{{$block}}` overrides), lambdas and a
//! serialized form that can be loaded back without re-parsing.
//!
//! # Example
//!
//! ```rust
//! use mustachio::render;
//! use mustachio::Value;
//!
//! let data = Value::map([("name", "Amy")]);
//! assert_eq!(render("Hello, {{name}}!", &data).unwrap(), "Hello, Amy!");
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod parser;
pub mod serialize;
pub mod template;

use std::sync::Arc;

use thiserror::Error;

pub use compiler::{CacheStats, CompileCache, Compiled, Compiler};
pub use config::{CompileOptions, ConfigError};
pub use error::{CompileError, LoadError, RenderError};
pub use parser::{Delimiters, SectionTag};
pub use template::{Lambda, Model, PartialSource, Partials, Template, Value};

/// Errors from the one-shot [`render`] helpers
#[derive(Debug, Error)]
pub enum Error {
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),
}

/// Compile `text` with default options through the global compiler
///
/// # Example
///
/// ```rust
/// use mustachio::{compile, Value};
///
/// let template = compile("{{#items}}{{.}} {{/items}}").unwrap();
/// let data = Value::map([("items", Value::list(["a", "b"]))]);
/// assert_eq!(template.render(&data).unwrap(), "a b ");
/// ```
pub fn compile(text: &str) -> Result<Arc<Template>, CompileError> {
    compile_with(text, &CompileOptions::default())
}

/// Compile `text` with `options` through the global compiler
pub fn compile_with(text: &str, options: &CompileOptions) -> Result<Arc<Template>, CompileError> {
    Compiler::global().compile_template(text, options)
}

/// Compile and render in one step with default options
pub fn render(text: &str, data: &Value) -> Result<String, Error> {
    render_with(text, data, &Partials::new(), &CompileOptions::default())
}

/// Compile and render in one step
///
/// # Example
///
/// ```rust
/// use mustachio::{render_with, CompileOptions, Partials, Value};
///
/// let partials = Partials::new().with_source("user", "<b>{{name}}</b>");
/// let data = Value::map([("name", "Amy")]);
/// let out = render_with("Hi {{>user}}", &data, &partials, &CompileOptions::default()).unwrap();
/// assert_eq!(out, "Hi <b>Amy</b>");
/// ```
pub fn render_with(
    text: &str,
    data: &Value,
    partials: &Partials,
    options: &CompileOptions,
) -> Result<String, Error> {
    let template = compile_with(text, options)?;
    Ok(template.render_with(data, partials)?)
}

//! Serialized template form
//!
//! A compiled template can be written out as an s-expression document and
//! later loaded back without re-parsing the template source:
//!
//! ```text
//! (template
//!   (source "Hello, {{name}}!")
//!   (options)
//!   (code
//!     (text "Hello, ")
//!     (escape "name")
//!     (text "!")))
//! ```

mod decode;
pub mod grammar;
pub mod lexer;
mod writer;

use crate::compiler::CompiledUnit;
use crate::config::CompileOptions;
use crate::error::LoadError;

pub use writer::write;

/// A decoded serialized template
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub unit: CompiledUnit,
    pub source: String,
    pub options: CompileOptions,
}

/// Parse and decode a serialized template
pub fn load(text: &str) -> Result<Loaded, LoadError> {
    let document = grammar::parse(text)?;
    decode::template(&document)
}

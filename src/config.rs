//! Compile options
//!
//! Options travel with every compiled template and take part in the compile
//! cache key, so two compiles only share an entry when all of them agree.
//! They can be built in code or loaded from a TOML file:
//!
//! ```toml
//! delimiters = "<% %>"
//! disable_lambda = true
//! model_get = true
//!
//! [[section_tags]]
//! open = "_i"
//! close = "i"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::ast::Delimiters;
use crate::parser::tree::SectionTag;

/// Errors that can occur when loading options from TOML
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read options file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse options TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Options recognized by the compiler
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileOptions {
    /// Initial delimiter pair; `{{ }}` when unset
    pub delimiters: Option<Delimiters>,

    /// Produce the serialized form instead of a ready-to-run template
    pub as_string: bool,

    /// Fail instead of compiling text returned by lambdas
    pub disable_lambda: bool,

    /// Fall back to a value's getter capability during lookup
    pub model_get: bool,

    /// Extra open/close name pairs treated like `{{#name}}...{{/name}}`
    pub section_tags: Vec<SectionTag>,
}

impl CompileOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = Some(delimiters);
        self
    }

    pub fn with_as_string(mut self, as_string: bool) -> Self {
        self.as_string = as_string;
        self
    }

    pub fn with_disable_lambda(mut self, disable: bool) -> Self {
        self.disable_lambda = disable;
        self
    }

    pub fn with_model_get(mut self, model_get: bool) -> Self {
        self.model_get = model_get;
        self
    }

    /// Register a custom open/close section pair
    pub fn with_section_tag(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.section_tags.push(SectionTag::new(open, close));
        self
    }

    /// Load options from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load options from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Options used when a template compiles partial source or lambda
    /// output while rendering: never the serialized form.
    pub(crate) fn for_runtime(&self) -> Self {
        Self {
            as_string: false,
            ..self.clone()
        }
    }
}

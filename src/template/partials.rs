//! Partials dictionary supplied at render time

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::Template;

/// What a partial name resolves to
#[derive(Debug, Clone)]
pub enum PartialSource {
    /// Template text, compiled on first use through the including
    /// template's compiler
    Source(String),
    Compiled(Arc<Template>),
}

impl From<&str> for PartialSource {
    fn from(text: &str) -> Self {
        PartialSource::Source(text.to_string())
    }
}

impl From<String> for PartialSource {
    fn from(text: String) -> Self {
        PartialSource::Source(text)
    }
}

impl From<Arc<Template>> for PartialSource {
    fn from(template: Arc<Template>) -> Self {
        PartialSource::Compiled(template)
    }
}

/// Partial name to source text or compiled template
#[derive(Debug, Clone, Default)]
pub struct Partials {
    entries: HashMap<String, PartialSource>,
}

impl Partials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, PartialSource::Source(text.into()));
        self
    }

    pub fn with_template(mut self, name: impl Into<String>, template: Arc<Template>) -> Self {
        self.insert(name, PartialSource::Compiled(template));
        self
    }

    /// Add or replace an entry, returning the previous one
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        partial: impl Into<PartialSource>,
    ) -> Option<PartialSource> {
        self.entries.insert(name.into(), partial.into())
    }

    pub fn get(&self, name: &str) -> Option<&PartialSource> {
        self.entries.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<PartialSource> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load every `*.mustache` file in `dir` as a partial named by its
    /// file stem
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let mut partials = Self::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "mustache") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    let text = fs::read_to_string(&path)?;
                    partials.insert(stem, text);
                }
            }
        }
        Ok(partials)
    }
}

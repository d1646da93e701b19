//! Compile cache
//!
//! Maps template text plus the option fingerprint to the compiled result.
//! Entries are never evicted; the map grows with the number of distinct
//! (text, options) pairs compiled through it. Each entry is a once-cell, so
//! concurrent compiles of the same key build it exactly once while compiles
//! of distinct keys proceed independently.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::OnceCell;
use tracing::debug;

use super::Compiled;
use crate::config::CompileOptions;
use crate::error::CompileError;

/// Cache key: the template text and every option that shapes its output
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub text: String,
    pub options: CompileOptions,
}

impl CacheKey {
    pub fn new(text: &str, options: &CompileOptions) -> Self {
        Self {
            text: text.to_string(),
            options: options.clone(),
        }
    }
}

/// Hit/miss counters; a miss means the full scan/parse/generate pipeline ran
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

type Entry = Arc<OnceCell<Compiled>>;

#[derive(Default)]
pub struct CompileCache {
    entries: Mutex<HashMap<CacheKey, Entry>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result for `key`, running `build` on first use
    pub(crate) fn get_or_try_insert<F>(&self, key: CacheKey, build: F) -> Result<Compiled, CompileError>
    where
        F: FnOnce() -> Result<Compiled, CompileError>,
    {
        let cell = {
            let mut entries = self.lock();
            match entries.get(&key) {
                Some(cell) => cell.clone(),
                None => {
                    let cell = Entry::default();
                    entries.insert(key.clone(), cell.clone());
                    cell
                }
            }
        };

        let mut built = false;
        let result = cell.get_or_try_init(|| {
            built = true;
            build()
        });

        match result {
            Ok(compiled) if built => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(len = key.text.len(), "compile cache miss");
                Ok(compiled.clone())
            }
            Ok(compiled) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(len = key.text.len(), "compile cache hit");
                Ok(compiled.clone())
            }
            Err(err) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                // Failed compiles leave no entry behind
                let mut entries = self.lock();
                if entries
                    .get(&key)
                    .is_some_and(|current| Arc::ptr_eq(current, &cell) && current.get().is_none())
                {
                    entries.remove(&key);
                }
                Err(err)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CompileCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileCache")
            .field("stats", &self.stats())
            .finish()
    }
}

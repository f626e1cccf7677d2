//! Adapter Registry
//!
//! Maps a [`LanguageId`] to the adapter that handles it. The registry is
//! immutable once built; the process-wide instance is shared behind an `Arc`
//! and lookups for languages without an adapter fail closed.

use crate::adapters::{LanguageAdapter, PythonAdapter, RustAdapter, TypeScriptAdapter};
use crate::error::{AstError, Result};
use crate::ir::LanguageId;
use lazy_static::lazy_static;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

lazy_static! {
    static ref GLOBAL: Arc<AdapterRegistry> = Arc::new(AdapterRegistry::new());
}

/// Registry of language adapters
pub struct AdapterRegistry {
    adapters: BTreeMap<LanguageId, Box<dyn LanguageAdapter>>,
}

impl AdapterRegistry {
    /// Create a new registry with all built-in adapters
    pub fn new() -> Self {
        Self::with_adapters(vec![
            Box::new(RustAdapter::new()),
            Box::new(PythonAdapter::new()),
            Box::new(TypeScriptAdapter::typescript()), // .ts, .mts, .cts
            Box::new(TypeScriptAdapter::tsx()),        // .tsx
            Box::new(TypeScriptAdapter::javascript()), // .js, .mjs, .cjs
            Box::new(TypeScriptAdapter::jsx()),        // .jsx
        ])
    }

    /// Registry holding exactly `adapters`; a later adapter replaces an
    /// earlier one for the same language
    pub fn with_adapters(adapters: Vec<Box<dyn LanguageAdapter>>) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.language(), adapter))
            .collect();
        Self { adapters }
    }

    /// The process-wide registry of built-in adapters
    pub fn global() -> Arc<AdapterRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Get the adapter for a language, failing closed
    pub fn get(&self, language: LanguageId) -> Result<&dyn LanguageAdapter> {
        self.lookup(language)
            .ok_or(AstError::UnsupportedLanguage(language))
    }

    /// Get the adapter for a language, if any
    pub fn lookup(&self, language: LanguageId) -> Option<&dyn LanguageAdapter> {
        self.adapters.get(&language).map(|a| a.as_ref())
    }

    /// Languages with a registered adapter
    pub fn languages(&self) -> BTreeSet<LanguageId> {
        self.adapters.keys().copied().collect()
    }

    /// Check if a language is supported
    pub fn supports(&self, language: LanguageId) -> bool {
        self.adapters.contains_key(&language)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! AST Provider
//!
//! Option structs, the two result models and the [`AstProvider`] trait with
//! its Tree-sitter implementation, which ties the registry, the source loader
//! and the zoom cache together.

use crate::cache::{TreeCache, DEFAULT_CAPACITY};
use crate::config::ProjectConfig;
use crate::determinism;
use crate::error::{AstError, FatalError, IndexError, Result};
use crate::indexer::ProjectIndexer;
use crate::ir::{Block, Declaration, File, LanguageId};
use crate::orchestrator::{parse_source, BuildOptions};
use crate::registry::AdapterRegistry;
use crate::source::{FsLoader, SourceLoader};
use crate::zoom::SymbolZoomer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// Cancellation
// ============================================================================

/// Cooperative cancellation flag shared between a caller and a running operation
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Options
// ============================================================================

/// Default size limit for indexed files (1 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// Options for `index_project`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Hard cap on indexed files (0 = unlimited)
    pub max_files: usize,

    /// Glob patterns a file must match (empty = everything)
    pub include_patterns: Vec<String>,

    /// Glob patterns to exclude; directories matching are pruned
    pub exclude_patterns: Vec<String>,

    /// Extract comments and attach them to declarations
    pub extract_comments: bool,

    /// Follow symbolic links during traversal
    pub follow_symlinks: bool,

    /// Skip files larger than this many bytes (0 = unlimited)
    pub max_file_size: u64,

    /// Languages to index (empty = every supported language)
    pub languages: Vec<LanguageId>,

    /// Keep declarations nested in classes, impls and modules; when off only
    /// top-level declarations are recorded
    pub extract_nested: bool,

    #[serde(skip)]
    pub cancellation: CancellationToken,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            max_files: 0,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            extract_comments: true,
            follow_symlinks: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            languages: Vec::new(),
            extract_nested: true,
            cancellation: CancellationToken::default(),
        }
    }
}

impl IndexOptions {
    pub fn with_include(mut self, patterns: Vec<String>) -> Self {
        self.include_patterns = patterns;
        self
    }

    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_languages(mut self, languages: Vec<LanguageId>) -> Self {
        self.languages = languages;
        self
    }

    /// Whether `language` passes the language filter
    pub fn wants(&self, language: LanguageId) -> bool {
        self.languages.is_empty() || self.languages.contains(&language)
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Overlay the settings present in a project config file
    pub fn with_project_config(mut self, config: &ProjectConfig) -> Self {
        if let Some(include) = &config.include {
            self.include_patterns = include.clone();
        }
        self.exclude_patterns.extend(config.exclude.iter().cloned());
        if let Some(max_files) = config.max_files {
            self.max_files = max_files;
        }
        if let Some(max_file_size) = config.max_file_size {
            self.max_file_size = max_file_size;
        }
        if let Some(extract_comments) = config.extract_comments {
            self.extract_comments = extract_comments;
        }
        if let Some(follow_symlinks) = config.follow_symlinks {
            self.follow_symlinks = follow_symlinks;
        }
        if let Some(languages) = &config.languages {
            self.languages = languages.clone();
        }
        self
    }
}

/// Options for `zoom_into`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomOptions {
    /// Deepest control-flow nesting extracted; deeper nodes become one
    /// truncated unknown
    pub max_depth: usize,

    /// Record calls
    pub extract_calls: bool,

    /// Record control flow; when off, constructs are walked transparently
    pub extract_control_flow: bool,

    /// Raw lines before and after the declaration (0 = no context window)
    pub context_lines: usize,

    /// Record declarations nested in the body
    pub extract_nested: bool,

    #[serde(skip)]
    pub cancellation: CancellationToken,
}

impl Default for ZoomOptions {
    fn default() -> Self {
        Self {
            max_depth: 10,
            extract_calls: true,
            extract_control_flow: true,
            context_lines: 0,
            extract_nested: true,
            cancellation: CancellationToken::default(),
        }
    }
}

// ============================================================================
// Index Mode Result
// ============================================================================

/// Per-language counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageStats {
    pub files: usize,
    pub declarations: usize,
}

/// Statistics for one index run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    /// Dropped by `max_files`
    pub files_truncated: usize,
    /// Not started because the run was cancelled
    pub files_cancelled: usize,
    pub declarations_found: usize,
    pub imports_found: usize,
    pub comments_found: usize,
    pub unknown_regions: usize,
    pub syntax_errors: usize,
    /// Cumulative parse time; informational only
    pub parse_time_ms: u64,
    pub by_language: BTreeMap<String, LanguageStats>,
    pub cancelled: bool,
}

/// Whole-project index (Index mode)
///
/// `==` compares everything, parse timing included; use
/// [`PlanetariumModel::fingerprint`] or [`PlanetariumModel::same_content`]
/// to compare two runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetariumModel {
    pub root: String,
    /// Relative path to file, path-ordered
    pub files: BTreeMap<String, File>,
    pub stats: IndexStats,
    /// One entry per failed or partial file, path-ordered
    pub errors: Vec<IndexError>,
}

impl PlanetariumModel {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            files: BTreeMap::new(),
            stats: IndexStats::default(),
            errors: Vec::new(),
        }
    }

    /// Look up a file by relative path
    pub fn file(&self, path: &str) -> Option<&File> {
        self.files.get(path)
    }

    /// Every declaration, nested ones included, with its file's path
    pub fn all_declarations(&self) -> impl Iterator<Item = (&str, &Declaration)> {
        self.files
            .iter()
            .flat_map(|(path, file)| file.walk_declarations().map(move |d| (path.as_str(), d)))
    }

    /// Declarations named `name`, path-ordered
    pub fn find_by_name(&self, name: &str) -> Vec<(&str, &Declaration)> {
        self.all_declarations().filter(|(_, d)| d.name == name).collect()
    }

    pub fn total_declarations(&self) -> usize {
        self.files.values().map(File::total_declarations).sum()
    }

    /// Equality ignoring parse timing
    pub fn same_content(&self, other: &Self) -> bool {
        self.root == other.root
            && self.files == other.files
            && self.errors == other.errors
            && IndexStats {
                parse_time_ms: 0,
                ..self.stats.clone()
            } == IndexStats {
                parse_time_ms: 0,
                ..other.stats.clone()
            }
    }

    /// Canonical JSON with sorted keys
    pub fn to_json(&self) -> serde_json::Result<String> {
        determinism::to_canonical_json(self)
    }

    /// Content fingerprint; timing is excluded so unchanged input gives the
    /// same value
    pub fn fingerprint(&self) -> String {
        let mut stable = self.clone();
        stable.stats.parse_time_ms = 0;
        determinism::fingerprint(&stable).unwrap_or_default()
    }
}

// ============================================================================
// Zoom Mode Result
// ============================================================================

/// Raw source lines around a zoomed declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    pub before: Vec<String>,
    pub after: Vec<String>,
}

/// One symbol expanded (Zoom mode)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroscopeModel {
    pub file_path: String,
    pub language: LanguageId,
    /// The declaration as Index mode sees it
    pub symbol: Declaration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextWindow>,
    /// Exact source slice of the declaration
    pub source_text: String,
}

impl MicroscopeModel {
    /// The declaration with the zoomed body attached
    pub fn enriched_symbol(&self) -> Declaration {
        match &self.body {
            Some(body) => self.symbol.clone().enrich(body.clone()),
            None => self.symbol.clone(),
        }
    }

    /// Canonical JSON with sorted keys
    pub fn to_json(&self) -> serde_json::Result<String> {
        determinism::to_canonical_json(self)
    }
}

// ============================================================================
// Provider
// ============================================================================

/// The indexer's public operations
pub trait AstProvider: Send + Sync {
    /// Shallow index of every supported file under `root`
    fn index_project(&self, root: &Path, options: &IndexOptions) -> std::result::Result<PlanetariumModel, FatalError>;

    /// Deep extraction of one symbol's body
    fn zoom_into(&self, file_path: &Path, symbol_id: &str, options: &ZoomOptions) -> Result<MicroscopeModel>;

    /// Index-mode `File` for in-memory source; no filesystem access
    fn parse_file(&self, source: &str, language: LanguageId) -> Result<File>;

    /// Languages with an adapter
    fn supported_languages(&self) -> BTreeSet<LanguageId>;
}

/// Tree-sitter backed provider
pub struct TreeSitterProvider {
    registry: Arc<AdapterRegistry>,
    loader: Arc<dyn SourceLoader>,
    cache: TreeCache,
}

impl TreeSitterProvider {
    /// Provider over the process-wide registry, reading from disk
    pub fn new() -> Self {
        Self {
            registry: AdapterRegistry::global(),
            loader: Arc::new(FsLoader),
            cache: TreeCache::new(DEFAULT_CAPACITY),
        }
    }

    pub fn with_registry(mut self, registry: Arc<AdapterRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn SourceLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = TreeCache::new(capacity);
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &TreeCache {
        &self.cache
    }
}

impl Default for TreeSitterProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AstProvider for TreeSitterProvider {
    fn index_project(&self, root: &Path, options: &IndexOptions) -> std::result::Result<PlanetariumModel, FatalError> {
        ProjectIndexer::new(&self.registry, self.loader.as_ref()).index(root, options)
    }

    fn zoom_into(&self, file_path: &Path, symbol_id: &str, options: &ZoomOptions) -> Result<MicroscopeModel> {
        SymbolZoomer::new(&self.registry, self.loader.as_ref(), &self.cache).zoom(file_path, symbol_id, options)
    }

    fn parse_file(&self, source: &str, language: LanguageId) -> Result<File> {
        let adapter = self.registry.get(language)?;
        let extraction = parse_source(adapter, source, "", BuildOptions::index(true))?;
        if let Some(failure) = extraction.adapter_failure {
            return Err(AstError::parse_error_with_partial(
                format!("adapter failure: {}", failure),
                extraction.file,
            ));
        }
        if extraction.suspect {
            return Err(AstError::parse_error_with_partial(
                "syntax errors cover most of the source",
                extraction.file,
            ));
        }
        Ok(extraction.file)
    }

    fn supported_languages(&self) -> BTreeSet<LanguageId> {
        self.registry.languages()
    }
}

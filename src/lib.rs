//! orrery: Multi-language Structural Code Indexer
//!
//! Parses source files with Tree-sitter and maps each language's tree onto one
//! language-agnostic IR, so tools can reason about code structure without
//! knowing about any particular grammar.
//!
//! # Design Philosophy
//!
//! - Best-effort recovery over formal correctness
//! - Explicit uncertainty via `UnknownNode` markers
//! - Never silently drop content we can't parse
//! - Same input, same output: every list is in source order and JSON is
//!   emitted with sorted keys
//!
//! # Two Operating Modes
//!
//! 1. **Index (Planetarium)**: project-wide scan
//!    - Declarations with their children, imports, file-level comments
//!    - Bodies recorded only as spans
//!
//! 2. **Zoom (Microscope)**: one symbol in depth
//!    - Control flow, calls, comments and unknowns inside the body
//!    - Depth bounded; repeat zooms reuse a cached parse
//!
//! # Example
//!
//! ```rust,ignore
//! use orrery::{index_project, zoom_into, IndexOptions, ZoomOptions};
//! use std::path::Path;
//!
//! let model = index_project(Path::new("."), &IndexOptions::default())?;
//! for (path, file) in &model.files {
//!     println!("{}: {} declarations", path, file.total_declarations());
//! }
//!
//! let run = zoom_into(Path::new("src/main.rs"), "fn=main", &ZoomOptions::default())?;
//! println!("{} calls", run.body.map(|b| b.all_calls().len()).unwrap_or(0));
//! ```

pub mod adapters;
pub mod cache;
pub mod comments;
pub mod config;
pub mod determinism;
pub mod error;
pub mod indexer;
pub mod ir;
pub mod orchestrator;
pub mod provider;
pub mod registry;
pub mod source;
pub mod walker;
pub mod zoom;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export core types for convenience
pub use ir::{
    // Blocks and control flow
    Block,
    Call,
    // Comments
    Comment,
    CommentKind,
    ControlFlow,
    ControlFlowKind,
    // Declarations
    Declaration,
    DeclarationKind,
    // Core types
    File,
    ImportKind,
    // Imports
    ImportLike,
    // Language
    LanguageId,
    Parameter,
    Span,
    // Error recovery
    UnknownKind,
    UnknownNode,
    UnparsedBlock,
    Visibility,
};

pub use adapters::LanguageAdapter;
pub use config::ProjectConfig;
pub use error::{AstError, FatalError, IndexError};
pub use provider::{
    AstProvider, CancellationToken, ContextWindow, IndexOptions, IndexStats, LanguageStats,
    MicroscopeModel, PlanetariumModel, TreeSitterProvider, ZoomOptions,
};
pub use registry::AdapterRegistry;
pub use zoom::MODULE_SYMBOL;

use lazy_static::lazy_static;
use std::collections::BTreeSet;
use std::path::Path;

/// Version of the IR schema
pub const IR_VERSION: &str = "v1";

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

lazy_static! {
    static ref DEFAULT_PROVIDER: TreeSitterProvider = TreeSitterProvider::new();
}

/// Index a project with the default provider
pub fn index_project(root: &Path, options: &IndexOptions) -> Result<PlanetariumModel, FatalError> {
    DEFAULT_PROVIDER.index_project(root, options)
}

/// Zoom into one symbol with the default provider
///
/// Repeat zooms into the same file share the default provider's parse cache.
pub fn zoom_into(file_path: &Path, symbol_id: &str, options: &ZoomOptions) -> error::Result<MicroscopeModel> {
    DEFAULT_PROVIDER.zoom_into(file_path, symbol_id, options)
}

/// Index-mode `File` for in-memory source
pub fn parse_file(source: &str, language: LanguageId) -> error::Result<File> {
    DEFAULT_PROVIDER.parse_file(source, language)
}

/// Languages with a built-in adapter
pub fn supported_languages() -> BTreeSet<LanguageId> {
    DEFAULT_PROVIDER.supported_languages()
}

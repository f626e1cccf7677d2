//! Symbol Zoomer
//!
//! Zoom mode: parse one file (or reuse its cached tree), find a declaration
//! and run the adapter's body extraction over it.
//!
//! Symbol ids are resolved in this order:
//!
//! 1. `<module>`: the whole file as a synthetic module
//! 2. `kind:name:line`, the form produced by `Declaration::id()`
//! 3. `kind=name`, e.g. `function=add` or `fn=main`
//! 4. `name:line`
//! 5. `Parent.child` or `Parent::child`
//! 6. a plain name, first match in source order

use crate::adapters::{node_to_span, LanguageAdapter};
use crate::cache::{CachedParse, TreeCache};
use crate::comments;
use crate::determinism::canonicalize_block;
use crate::error::{AstError, Result};
use crate::ir::{Block, Declaration, DeclarationKind, DeclarationWalk, Span, UnknownKind};
use crate::orchestrator::{build_file, guard_adapter, non_whitespace, parse_tree, BuildOptions};
use crate::provider::{ContextWindow, MicroscopeModel, ZoomOptions};
use crate::registry::AdapterRegistry;
use crate::source::{checksum, decode, detect_language, normalize_path, Decoded, SourceLoader};
use std::path::Path;

/// Symbol id selecting the whole file
pub const MODULE_SYMBOL: &str = "<module>";

/// Zoom-mode driver over a registry, a source loader and a parse cache
pub struct SymbolZoomer<'a> {
    registry: &'a AdapterRegistry,
    loader: &'a dyn SourceLoader,
    cache: &'a TreeCache,
}

impl<'a> SymbolZoomer<'a> {
    pub fn new(registry: &'a AdapterRegistry, loader: &'a dyn SourceLoader, cache: &'a TreeCache) -> Self {
        Self {
            registry,
            loader,
            cache,
        }
    }

    /// Expand one symbol of `file_path`
    pub fn zoom(&self, file_path: &Path, symbol_id: &str, options: &ZoomOptions) -> Result<MicroscopeModel> {
        if options.cancellation.is_cancelled() {
            return Err(AstError::Cancelled);
        }
        let path = normalize_path(&file_path.to_string_lossy());

        let bytes = self
            .loader
            .read(file_path)
            .map_err(|err| AstError::from_io(&path, &err))?;
        let language = detect_language(file_path, &bytes);
        let adapter = self.registry.get(language)?;
        let source = match decode(&bytes) {
            Decoded::Clean(text) | Decoded::Lossy { text, .. } => text,
            Decoded::Binary => return Err(AstError::parse_error(format!("{} is not a text file", path))),
        };

        let parsed = self.parse(adapter, &path, source)?;
        let source = parsed.source.as_str();

        let symbol = if symbol_id == MODULE_SYMBOL {
            module_declaration(&parsed)
        } else {
            resolve(&parsed.file.declarations, symbol_id)
                .cloned()
                .ok_or_else(|| AstError::SymbolNotFound {
                    file: path.clone(),
                    symbol: symbol_id.to_string(),
                })?
        };

        let body = if symbol.body_span.is_some() {
            guard_adapter(|| adapter.extract_body(&parsed.tree, source, &symbol, options)).map_err(|message| {
                tracing::warn!(path = %path, symbol = %symbol_id, panic = %message, "adapter failure");
                AstError::parse_error_with_partial(format!("adapter failure: {}", message), parsed.file.clone())
            })?
        } else {
            None
        };
        let body = body.map(|mut block| {
            comments::attach_in_block(&mut block, &symbol.name, source);
            canonicalize_block(&mut block);
            block
        });

        if let Some(block) = &body {
            if is_suspect_body(block, source) {
                return Err(AstError::parse_error_with_partial(
                    format!("syntax errors cover most of the body of {}", symbol.name),
                    parsed.file.clone(),
                ));
            }
        }

        let context = (options.context_lines > 0).then(|| context_window(source, &symbol.span, options.context_lines));
        let source_text = source.get(symbol.span.start..symbol.span.end).unwrap_or("").to_string();

        tracing::debug!(path = %path, symbol = %symbol_id, kind = symbol.kind.as_str(), "zoomed");
        Ok(MicroscopeModel {
            file_path: path,
            language,
            symbol,
            body,
            context,
            source_text,
        })
    }

    /// Cached parse for `path`, built when missing or stale
    ///
    /// Adapter failures are returned as errors and never cached.
    fn parse(&self, adapter: &dyn LanguageAdapter, path: &str, source: String) -> Result<std::sync::Arc<CachedParse>> {
        let sum = checksum(&source);
        self.cache.get_or_insert_with(path, &sum, || {
            let tree = parse_tree(adapter, &source)?;
            let extraction = build_file(adapter, &tree, &source, path, BuildOptions::zoom());
            if let Some(failure) = extraction.adapter_failure {
                return Err(AstError::parse_error_with_partial(
                    format!("adapter failure: {}", failure),
                    extraction.file,
                ));
            }
            Ok(CachedParse {
                checksum: sum.clone(),
                tree,
                source,
                file: extraction.file,
            })
        })
    }
}

/// The whole file as one declaration; its body is the top-level code
fn module_declaration(parsed: &CachedParse) -> Declaration {
    let mut module = Declaration::new(MODULE_SYMBOL.to_string(), DeclarationKind::Module, parsed.file.span);
    module.body_span = Some(node_to_span(&parsed.tree.root_node()));
    module
}

/// Find the declaration `id` names
pub fn resolve<'d>(declarations: &'d [Declaration], id: &str) -> Option<&'d Declaration> {
    let walk = || DeclarationWalk::new(declarations);

    if let Some(found) = walk().find(|d| d.id() == id) {
        return Some(found);
    }

    if let Some((kind, name)) = id.split_once('=') {
        if let Some(kind) = DeclarationKind::parse(kind) {
            return walk().find(|d| d.kind == kind && d.name == name);
        }
    }

    if let Some((name, line)) = id.rsplit_once(':') {
        if let Ok(line) = line.parse::<usize>() {
            return walk()
                .find(|d| d.name == name && d.span.start_line == line)
                .or_else(|| {
                    walk()
                        .filter(|d| d.name == name && d.span.contains_line(line))
                        .last()
                });
        }
    }

    for separator in ["::", "."] {
        if let Some((parent, child)) = id.rsplit_once(separator) {
            let parent = parent.rsplit(separator).next().unwrap_or(parent);
            let found = walk()
                .filter(|d| d.name == parent)
                .find_map(|d| d.children.iter().find(|c| c.name == child));
            if found.is_some() {
                return found;
            }
        }
    }

    walk().find(|d| d.name == id)
}

/// Syntax errors cover more than half of the body's non-whitespace bytes
fn is_suspect_body(block: &Block, source: &str) -> bool {
    let damaged: usize = block
        .all_unknowns()
        .iter()
        .filter(|u| u.kind == UnknownKind::SyntaxError)
        .map(|u| non_whitespace(source, &u.span))
        .sum();
    damaged * 2 > non_whitespace(source, &block.span)
}

/// Up to `lines` raw lines before and after `span`
fn context_window(source: &str, span: &Span, lines: usize) -> ContextWindow {
    let all: Vec<&str> = source.lines().collect();
    let first = span.start_line.saturating_sub(1).min(all.len());
    let after_start = span.end_line.min(all.len());
    let after_end = (after_start + lines).min(all.len());

    ContextWindow {
        before: all[first.saturating_sub(lines)..first].iter().map(|l| l.to_string()).collect(),
        after: all[after_start..after_end].iter().map(|l| l.to_string()).collect(),
    }
}

//! Parse Orchestrator
//!
//! Turns source text into a Tree-sitter tree and the tree into a [`File`].
//! This is the single place where parse damage becomes IR: ERROR and MISSING
//! nodes are scanned before the adapter runs, adapter panics are caught at
//! the adapter boundary, and top-level nodes no extractor claimed are kept as
//! `Unclassified` unknowns.

use crate::adapters::{node_to_span, LanguageAdapter};
use crate::comments;
use crate::determinism::canonicalize_file;
use crate::error::{AstError, Result};
use crate::ir::{Comment, Declaration, DeclarationWalk, File, Span, UnknownKind, UnknownNode, UnparsedBlock};
use crate::source::checksum;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tree_sitter::{Parser, Tree};

/// Which pass a [`File`] is being built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Shallow project index: comments inside callable bodies are dropped
    Index,
    /// Zoom: every comment is kept
    Zoom,
}

/// Options for [`build_file`]
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub mode: ExtractMode,
    pub extract_comments: bool,
    /// Keep children of classes, impls and modules
    pub extract_nested: bool,
}

impl BuildOptions {
    pub fn index(extract_comments: bool) -> Self {
        Self {
            mode: ExtractMode::Index,
            extract_comments,
            extract_nested: true,
        }
    }

    pub fn nested(mut self, extract_nested: bool) -> Self {
        self.extract_nested = extract_nested;
        self
    }

    pub fn zoom() -> Self {
        Self {
            mode: ExtractMode::Zoom,
            extract_comments: true,
            extract_nested: true,
        }
    }
}

/// Result of building one file
#[derive(Debug, Clone)]
pub struct Extraction {
    pub file: File,
    /// Panic message when the adapter failed
    pub adapter_failure: Option<String>,
    /// Damage is severe enough to question the result
    pub suspect: bool,
}

/// ERROR and MISSING nodes found in a tree
#[derive(Debug, Clone, Default)]
pub struct SyntaxScan {
    pub unknowns: Vec<UnknownNode>,
    pub unparsed: Vec<UnparsedBlock>,
}

/// Parse `source` with the adapter's grammar
///
/// A fresh parser is created per call; parsers are never shared between
/// threads.
pub fn parse_tree(adapter: &dyn LanguageAdapter, source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&adapter.grammar())
        .map_err(|e| AstError::TreeSitterError(e.to_string()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| AstError::parse_error(format!("{} parser returned no tree", adapter.language().name())))
}

/// Collect ERROR and MISSING nodes
///
/// ERROR nodes are not descended, so nested damage is reported once.
pub fn scan_syntax_errors(tree: &Tree, source: &str) -> SyntaxScan {
    let mut scan = SyntaxScan::default();
    let mut cursor = tree.walk();

    loop {
        let node = cursor.node();
        let mut descend = node.has_error();

        if node.is_error() {
            let span = node_to_span(&node);
            scan.unknowns
                .push(UnknownNode::new(span, UnknownKind::SyntaxError, "syntax error").with_excerpt(source));
            if span.end_line > span.start_line {
                scan.unparsed.push(UnparsedBlock {
                    span,
                    reason: format!("syntax error spanning {} lines", span.end_line - span.start_line + 1),
                });
            }
            descend = false;
        } else if node.is_missing() {
            let span = node_to_span(&node);
            let span = Span {
                end: span.start,
                end_line: span.start_line,
                end_column: span.start_column,
                ..span
            };
            scan.unknowns.push(UnknownNode::new(
                span,
                UnknownKind::Missing,
                format!("missing {}", node.kind()),
            ));
            descend = false;
        }

        if descend && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return scan;
            }
        }
    }
}

/// Run an adapter call, turning a panic into its message
pub(crate) fn guard_adapter<T>(f: impl FnOnce() -> T) -> std::result::Result<T, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Build the [`File`] for a parsed tree
pub fn build_file(
    adapter: &dyn LanguageAdapter,
    tree: &Tree,
    source: &str,
    path: &str,
    options: BuildOptions,
) -> Extraction {
    let mut file = File::new(path.to_string(), adapter.language());
    file.checksum = checksum(source);
    file.span = Span::of_source(source);

    let scan = scan_syntax_errors(tree, source);

    let extracted = guard_adapter(|| {
        let declarations = adapter.extract_declarations(tree, source);
        let imports = adapter.extract_imports(tree, source);
        let comments = if options.extract_comments {
            adapter.extract_comments(tree, source)
        } else {
            Vec::new()
        };
        (declarations, imports, comments)
    });

    let mut unknowns = scan.unknowns;
    let mut adapter_failure = None;

    match extracted {
        Ok((mut declarations, imports, comments)) => {
            let comments = match options.mode {
                ExtractMode::Index => drop_body_comments(comments, &declarations),
                ExtractMode::Zoom => comments,
            };
            if !options.extract_nested {
                declarations.iter_mut().for_each(|d| d.children.clear());
            }
            let (comments, declarations) = comments::attach(comments, declarations, source);
            file.declarations = declarations;
            file.imports = imports;
            file.comments = comments;
            unknowns.extend(coverage_gaps(adapter, tree, &file));
        }
        Err(message) => {
            tracing::warn!(path = %path, language = ?adapter.language(), panic = %message, "adapter failure");
            unknowns.push(UnknownNode::new(
                file.span,
                UnknownKind::AdapterFailure,
                format!("adapter panicked: {}", message),
            ));
            adapter_failure = Some(message);
        }
    }

    file.unknown_regions = unknowns;
    file.unparsed_blocks = scan.unparsed;
    canonicalize_file(&mut file);

    let suspect = adapter_failure.is_some() || is_suspect(&file, source);
    Extraction {
        file,
        adapter_failure,
        suspect,
    }
}

/// Parse and build in one step
pub fn parse_source(
    adapter: &dyn LanguageAdapter,
    source: &str,
    path: &str,
    options: BuildOptions,
) -> Result<Extraction> {
    let tree = parse_tree(adapter, source)?;
    Ok(build_file(adapter, &tree, source, path, options))
}

/// Syntax errors cover more than half the non-whitespace bytes and nothing
/// was recovered
pub fn is_suspect(file: &File, source: &str) -> bool {
    if !file.declarations.is_empty() {
        return false;
    }
    let damaged: usize = file
        .unknown_regions
        .iter()
        .filter(|u| u.kind == UnknownKind::SyntaxError)
        .map(|u| non_whitespace(source, &u.span))
        .sum();
    damaged * 2 > non_whitespace(source, &file.span)
}

/// Non-whitespace bytes of `source` under `span`
pub(crate) fn non_whitespace(source: &str, span: &Span) -> usize {
    source
        .as_bytes()
        .get(span.start..span.end)
        .map(|bytes| bytes.iter().filter(|b| !b.is_ascii_whitespace()).count())
        .unwrap_or(0)
}

/// Comments inside function and method bodies belong to Zoom mode
fn drop_body_comments(comments: Vec<Comment>, declarations: &[Declaration]) -> Vec<Comment> {
    let bodies: Vec<Span> = DeclarationWalk::new(declarations)
        .filter(|d| d.is_callable())
        .filter_map(|d| d.body_span)
        .collect();
    comments
        .into_iter()
        .filter(|c| !bodies.iter().any(|body| body.encloses(&c.span)))
        .collect()
}

/// Named top-level nodes nothing claimed
fn coverage_gaps(adapter: &dyn LanguageAdapter, tree: &Tree, file: &File) -> Vec<UnknownNode> {
    let root = tree.root_node();
    let mut claimed: Vec<Span> = file.declarations.iter().map(|d| d.span).collect();
    claimed.extend(file.imports.iter().map(|i| i.span));
    claimed.extend(file.comments.iter().map(|c| c.span));

    let mut cursor = root.walk();
    let gaps = root
        .named_children(&mut cursor)
        .filter(|node| !node.is_error() && !node.is_missing() && !node.is_extra())
        .filter(|node| !adapter.is_trivia(node.kind()))
        .filter_map(|node| {
            let span = node_to_span(&node);
            (!claimed.iter().any(|c| c.overlaps(&span))).then(|| {
                UnknownNode::new(
                    span,
                    UnknownKind::Unclassified,
                    format!("unclassified top-level {}", node.kind()),
                )
            })
        })
        .collect();
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{PythonAdapter, RustAdapter, TypeScriptAdapter};
    use crate::ir::{Block, CommentKind, DeclarationKind, ImportLike, LanguageId, Visibility};
    use crate::provider::ZoomOptions;

    fn build(adapter: &dyn LanguageAdapter, source: &str, options: BuildOptions) -> Extraction {
        parse_source(adapter, source, "test", options).unwrap()
    }

    // =========================================================================
    // Parse Tests
    // =========================================================================

    #[test]
    fn test_clean_file() {
        let adapter = RustAdapter::new();
        let source = "/// Adds\npub fn add(a: i32, b: i32) -> i32 { a + b }\n";
        let result = build(&adapter, source, BuildOptions::index(true));

        assert!(!result.suspect);
        assert!(result.adapter_failure.is_none());
        assert_eq!(result.file.language, LanguageId::Rust);
        assert_eq!(result.file.checksum, checksum(source));
        assert_eq!(result.file.span.end, source.len());
        assert_eq!(result.file.declarations.len(), 1);
        assert!(result.file.unknown_regions.is_empty());
        assert_eq!(
            result.file.declarations[0].doc_comment.as_ref().map(|c| c.text.as_str()),
            Some("Adds")
        );
    }

    #[test]
    fn test_syntax_errors_become_unknowns() {
        let adapter = TypeScriptAdapter::javascript();
        let source = "function ok() { return 1; }\nfunction broken( {\n  let = ;\n}\n";
        let result = build(&adapter, source, BuildOptions::index(true));

        assert!(result.file.has_errors());
        assert!(result.file.find_declaration("ok").is_some());
        for unknown in &result.file.unknown_regions {
            assert!(unknown.span.is_within(source.len()));
        }
    }

    #[test]
    fn test_scan_clean_tree_is_empty() {
        let adapter = PythonAdapter::new();
        let source = "def f():\n    return 1\n";
        let tree = parse_tree(&adapter, source).unwrap();
        let scan = scan_syntax_errors(&tree, source);
        assert!(scan.unknowns.is_empty());
        assert!(scan.unparsed.is_empty());
    }

    #[test]
    fn test_scan_unparsed_blocks_are_multiline_errors() {
        let adapter = TypeScriptAdapter::javascript();
        let source = "const a = {\n  b: [1, 2,\n  c: )))\n";
        let tree = parse_tree(&adapter, source).unwrap();
        let scan = scan_syntax_errors(&tree, source);

        assert!(!scan.unknowns.is_empty());
        for block in &scan.unparsed {
            assert!(block.span.end_line > block.span.start_line);
            assert!(scan.unknowns.iter().any(|u| u.span == block.span));
        }
        for unknown in scan.unknowns.iter().filter(|u| u.kind == UnknownKind::Missing) {
            assert!(unknown.span.is_empty());
            assert!(unknown.reason.as_deref().unwrap_or("").starts_with("missing "));
        }
    }

    // =========================================================================
    // Coverage Tests
    // =========================================================================

    #[test]
    fn test_unclassified_top_level_statements() {
        let adapter = TypeScriptAdapter::javascript();
        let source = "import { add } from './a';\nadd(1, 2);\nfunction f() {}\n";
        let result = build(&adapter, source, BuildOptions::index(true));

        let unclassified: Vec<_> = result
            .file
            .unknown_regions
            .iter()
            .filter(|u| u.kind == UnknownKind::Unclassified)
            .collect();
        assert_eq!(unclassified.len(), 1);
        assert_eq!(
            unclassified[0].reason.as_deref(),
            Some("unclassified top-level expression_statement")
        );
        assert_eq!(unclassified[0].span.start_line, 2);
    }

    #[test]
    fn test_trivia_is_not_unclassified() {
        let adapter = RustAdapter::new();
        let source = "#![allow(dead_code)]\nfn f() {}\n";
        let result = build(&adapter, source, BuildOptions::index(false));
        assert!(result.file.unknown_regions.is_empty());
    }

    #[test]
    fn test_comments_disabled_do_not_leave_gaps() {
        let adapter = TypeScriptAdapter::typescript();
        let source = "// header\nexport function f() {}\n";
        let result = build(&adapter, source, BuildOptions::index(false));
        assert!(result.file.comments.is_empty());
        assert!(result.file.unknown_regions.is_empty());
    }

    #[test]
    fn test_nested_declarations_toggle() {
        let adapter = PythonAdapter::new();
        let source = "class Shape:\n    # area in units\n    def area(self):\n        return 0\n\n\ndef main():\n    pass\n";

        let full = build(&adapter, source, BuildOptions::index(true));
        assert_eq!(full.file.total_declarations(), 3);
        assert_eq!(full.file.declarations[0].children[0].name, "area");

        let flat = build(&adapter, source, BuildOptions::index(true).nested(false));
        let names: Vec<_> = flat.file.declarations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Shape", "main"]);
        assert!(flat.file.declarations[0].children.is_empty());
        assert_eq!(flat.file.total_declarations(), 2);
        assert_eq!(flat.file.comments[0].text, "area in units");
        assert_eq!(flat.file.comments[0].attached_to, None);
        assert!(flat.file.unknown_regions.is_empty());
    }

    // =========================================================================
    // Comment Mode Tests
    // =========================================================================

    #[test]
    fn test_body_comments_only_in_zoom_mode() {
        let adapter = TypeScriptAdapter::javascript();
        let source = "// top\nfunction f() {\n  // inside\n  return 1;\n}\n";

        let index = build(&adapter, source, BuildOptions::index(true));
        let texts: Vec<_> = index.file.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["top"]);

        let zoom = build(&adapter, source, BuildOptions::zoom());
        let texts: Vec<_> = zoom.file.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["top", "inside"]);
        assert_eq!(zoom.file.comments[0].kind, CommentKind::Line);
    }

    // =========================================================================
    // Adapter Failure Tests
    // =========================================================================

    struct PanickingAdapter;

    impl LanguageAdapter for PanickingAdapter {
        fn language(&self) -> LanguageId {
            LanguageId::JavaScript
        }

        fn grammar(&self) -> tree_sitter::Language {
            tree_sitter_javascript::LANGUAGE.into()
        }

        fn extract_declarations(&self, _tree: &Tree, _source: &str) -> Vec<Declaration> {
            panic!("declaration walk blew up")
        }

        fn extract_imports(&self, _tree: &Tree, _source: &str) -> Vec<ImportLike> {
            Vec::new()
        }

        fn extract_comments(&self, _tree: &Tree, _source: &str) -> Vec<Comment> {
            Vec::new()
        }

        fn extract_body(
            &self,
            _tree: &Tree,
            _source: &str,
            _declaration: &Declaration,
            _options: &ZoomOptions,
        ) -> Option<Block> {
            None
        }

        fn extract_visibility(&self, _node: &tree_sitter::Node, _source: &str) -> Visibility {
            Visibility::Unknown
        }
    }

    #[test]
    fn test_adapter_panic_is_contained() {
        let source = "function f() {}\n";
        let result = build(&PanickingAdapter, source, BuildOptions::index(true));

        assert!(result.suspect);
        assert_eq!(result.adapter_failure.as_deref(), Some("declaration walk blew up"));
        assert_eq!(result.file.unknown_regions.len(), 1);
        let unknown = &result.file.unknown_regions[0];
        assert_eq!(unknown.kind, UnknownKind::AdapterFailure);
        assert_eq!(unknown.span, Span::of_source(source));
    }

    // =========================================================================
    // Suspect Heuristic Tests
    // =========================================================================

    #[test]
    fn test_is_suspect() {
        let source = "xxxxxxxx yy";
        let mut file = File::new("a.js".to_string(), LanguageId::JavaScript);
        file.span = Span::of_source(source);
        file.unknown_regions
            .push(UnknownNode::new(Span::new(0, 8, 1, 1), UnknownKind::SyntaxError, "syntax error"));
        assert!(is_suspect(&file, source));

        file.declarations.push(Declaration::new(
            "yy".to_string(),
            DeclarationKind::Variable,
            Span::new(9, 11, 1, 1),
        ));
        assert!(!is_suspect(&file, source));
    }

    #[test]
    fn test_is_suspect_ignores_whitespace_and_other_unknowns() {
        let source = "ab          \n\n\n     cdef";
        let mut file = File::new("a.py".to_string(), LanguageId::Python);
        file.span = Span::of_source(source);
        file.unknown_regions
            .push(UnknownNode::new(Span::new(0, 12, 1, 1), UnknownKind::SyntaxError, "syntax error"));
        file.unknown_regions.push(UnknownNode::new(
            Span::new(20, 24, 4, 4),
            UnknownKind::Unclassified,
            "unclassified top-level expression_statement",
        ));
        // 2 damaged of 6 non-whitespace bytes
        assert!(!is_suspect(&file, source));
        assert!(!is_suspect(&File::new(String::new(), LanguageId::Python), ""));
    }
}

//! Language Adapters
//!
//! Each supported language has an adapter that translates a Tree-sitter parse
//! tree into the language-agnostic IR. Adapters implement [`LanguageAdapter`];
//! the registry picks one by [`LanguageId`].
//!
//! - **TypeScript / TSX / JavaScript / JSX**: the reference adapter
//! - **Rust**: items, impls, traits, modules, `use` trees
//! - **Python**: defs, classes, decorators, docstrings, imports
//!
//! Body extraction (zoom mode) is shared: adapters describe their grammar
//! through [`body::BodySyntax`] and [`body::BodyWalker`] does the walk.

pub mod body;
pub mod python_adapter;
pub mod rust_adapter;
pub mod typescript_adapter;

use crate::ir::{Block, Comment, CommentKind, Declaration, ImportLike, LanguageId, Span, Visibility};
use crate::provider::ZoomOptions;

pub use python_adapter::PythonAdapter;
pub use rust_adapter::RustAdapter;
pub use typescript_adapter::TypeScriptAdapter;

/// Per-language mapping from a Tree-sitter tree to IR fragments
///
/// Adapters never fail on malformed input. Anything they cannot interpret is
/// either left to the orchestrator's error scan (ERROR/MISSING nodes) or
/// reported as an `UnknownNode`; extraction continues with sibling nodes.
pub trait LanguageAdapter: Send + Sync {
    /// The language this adapter handles
    fn language(&self) -> LanguageId;

    /// The Tree-sitter grammar
    fn grammar(&self) -> tree_sitter::Language;

    /// Top-level declarations, nested ones as `children` (Index mode)
    ///
    /// Bodies are only recorded as `body_span`.
    fn extract_declarations(&self, tree: &tree_sitter::Tree, source: &str) -> Vec<Declaration>;

    /// Import-like statements in source order
    fn extract_imports(&self, tree: &tree_sitter::Tree, source: &str) -> Vec<ImportLike>;

    /// Every comment in the file, delimiters stripped
    fn extract_comments(&self, tree: &tree_sitter::Tree, source: &str) -> Vec<Comment>;

    /// Control flow, calls, comments and unknowns inside `declaration.body_span` (Zoom mode)
    fn extract_body(
        &self,
        tree: &tree_sitter::Tree,
        source: &str,
        declaration: &Declaration,
        options: &ZoomOptions,
    ) -> Option<Block>;

    /// Language-specific visibility rule; `Unknown` when there is no clear signal
    fn extract_visibility(&self, node: &tree_sitter::Node, source: &str) -> Visibility;

    /// Top-level node kinds that carry no structure of their own
    fn is_trivia(&self, _kind: &str) -> bool {
        false
    }
}

// ============================================================================
// Node helpers
// ============================================================================

/// Convert a Tree-sitter node to our Span type
pub fn node_to_span(node: &tree_sitter::Node) -> Span {
    Span {
        start: node.start_byte(),
        end: node.end_byte(),
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
        start_column: node.start_position().column,
        end_column: node.end_position().column,
    }
}

/// Span from the start of `first` to the end of `last`
pub fn span_between(first: &tree_sitter::Node, last: &tree_sitter::Node) -> Span {
    let head = node_to_span(first);
    let tail = node_to_span(last);
    Span {
        start: head.start,
        end: tail.end.max(head.start),
        start_line: head.start_line,
        end_line: tail.end_line.max(head.start_line),
        start_column: head.start_column,
        end_column: tail.end_column,
    }
}

/// Header span: from the node's start up to (not including) its body
pub fn signature_span(node: &tree_sitter::Node, body: &tree_sitter::Node, source: &str) -> Span {
    let start = node.start_byte();
    let mut end = body.start_byte().max(start);
    while end > start && source.as_bytes()[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    span_from_offsets(source, start, end, node.start_position().row + 1, node.start_position().column)
}

/// Build a span from byte offsets, counting lines from a known start position
pub fn span_from_offsets(
    source: &str,
    start: usize,
    end: usize,
    start_line: usize,
    start_column: usize,
) -> Span {
    let text = source.get(start..end).unwrap_or("");
    let newlines = text.bytes().filter(|b| *b == b'\n').count();
    let end_column = match text.rfind('\n') {
        Some(i) => text.len() - i - 1,
        None => start_column + text.len(),
    };
    Span {
        start,
        end,
        start_line,
        end_line: start_line + newlines,
        start_column,
        end_column,
    }
}

/// Get the text content of a Tree-sitter node
pub fn node_text<'a>(node: &tree_sitter::Node, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Find a child node by its kind
pub fn find_child_by_kind<'t>(node: &tree_sitter::Node<'t>, kind: &str) -> Option<tree_sitter::Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|child| child.kind() == kind);
    found
}

/// Find all children of a specific kind
pub fn find_children_by_kind<'t>(node: &tree_sitter::Node<'t>, kind: &str) -> Vec<tree_sitter::Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| child.kind() == kind)
        .collect()
}

/// All children (named and anonymous) as an owned list
pub fn children<'t>(node: &tree_sitter::Node<'t>) -> Vec<tree_sitter::Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Named children as an owned list
pub fn named_children<'t>(node: &tree_sitter::Node<'t>) -> Vec<tree_sitter::Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// The node whose byte range is exactly `span`, preferring the outermost one
pub fn node_for_span<'t>(tree: &'t tree_sitter::Tree, span: &Span) -> Option<tree_sitter::Node<'t>> {
    let mut node = tree
        .root_node()
        .descendant_for_byte_range(span.start, span.end)?;
    while let Some(parent) = node.parent() {
        if parent.start_byte() == span.start && parent.end_byte() == span.end {
            node = parent;
        } else {
            break;
        }
    }
    (node.start_byte() == span.start && node.end_byte() == span.end).then_some(node)
}

/// Whether `node` has a direct child of kind `kind` (keywords like `async`, `static`)
pub fn has_token(node: &tree_sitter::Node, kind: &str) -> bool {
    children(node).iter().any(|child| child.kind() == kind)
}

/// Every node in the tree accepted by `keep`, in document order
///
/// Accepted nodes are not descended into.
pub fn collect_nodes<'t>(
    tree: &'t tree_sitter::Tree,
    keep: impl Fn(&tree_sitter::Node) -> bool,
) -> Vec<tree_sitter::Node<'t>> {
    let mut found = Vec::new();
    let mut cursor = tree.walk();
    loop {
        let node = cursor.node();
        if keep(&node) {
            found.push(node);
        } else if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return found;
            }
        }
    }
}

/// Number of argument expressions in an argument list node
pub fn count_arguments(arguments: &tree_sitter::Node) -> usize {
    let mut cursor = arguments.walk();
    let count = arguments
        .named_children(&mut cursor)
        .filter(|arg| !arg.is_extra())
        .count();
    count
}

/// Collapse whitespace inside a callee expression (`a\n  .b` becomes `a.b`)
pub fn normalize_callee(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .replace(" .", ".")
        .replace(". ", ".")
        .replace(" ?.", "?.")
        .replace(" ::", "::")
        .replace(":: ", "::")
}

/// Strip surrounding quotes (and JS/Python string prefixes) from a literal
pub fn unquote(text: &str) -> String {
    let trimmed = text.trim();
    let body = trimmed.trim_start_matches(|c: char| matches!(c, 'r' | 'u' | 'b' | 'f' | 'R' | 'U' | 'B' | 'F'));
    for quote in ["\"\"\"", "'''", "\"", "'", "`"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return body[quote.len()..body.len() - quote.len()].to_string();
        }
    }
    trimmed.to_string()
}

// ============================================================================
// Comment helpers
// ============================================================================

/// Shrink a comment span so it ends on the comment's last character
///
/// Some grammars include the terminating newline in line-comment nodes.
pub fn trim_comment_span(span: Span, raw: &str) -> Span {
    let trimmed = raw.trim_end();
    if trimmed.len() == raw.len() {
        return span;
    }
    let end = span.start + trimmed.len();
    let newlines = trimmed.bytes().filter(|b| *b == b'\n').count();
    let end_column = match trimmed.rfind('\n') {
        Some(i) => trimmed.len() - i - 1,
        None => span.start_column + trimmed.len(),
    };
    Span {
        end,
        end_line: span.start_line + newlines,
        end_column,
        ..span
    }
}

/// Parse a `//`, `///`, `//!`, `/* */`, `/** */` or `/*! */` comment
pub fn c_style_comment(raw: &str, span: Span) -> Comment {
    let span = trim_comment_span(span, raw);
    let raw = raw.trim_end();

    let (text, kind, inner) = if let Some(rest) = raw.strip_prefix("//!") {
        (rest.trim().to_string(), CommentKind::Doc, true)
    } else if raw.starts_with("///") && !raw.starts_with("////") {
        (raw[3..].trim().to_string(), CommentKind::Doc, false)
    } else if let Some(rest) = raw.strip_prefix("//") {
        (rest.trim().to_string(), CommentKind::Line, false)
    } else if raw.starts_with("/*!") {
        (clean_block(&raw[3..]), CommentKind::Doc, true)
    } else if raw.starts_with("/**") && raw != "/**/" {
        (clean_block(&raw[3..]), CommentKind::Doc, false)
    } else if let Some(rest) = raw.strip_prefix("/*") {
        (clean_block(rest), CommentKind::Block, false)
    } else {
        (raw.trim().to_string(), CommentKind::Line, false)
    };

    Comment {
        text,
        kind,
        span,
        attached_to: None,
        inner,
    }
}

/// Parse a `#` comment
pub fn hash_comment(raw: &str, span: Span) -> Comment {
    let span = trim_comment_span(span, raw);
    let text = raw.trim_end().trim_start_matches('#').trim().to_string();
    Comment::new(text, CommentKind::Line, span)
}

/// Body of a block comment with the closing `*/` and leading `*` gutters removed
fn clean_block(body: &str) -> String {
    body.trim_end_matches("*/")
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Docstring text: quotes stripped, every line trimmed
pub fn clean_docstring(raw: &str) -> String {
    unquote(raw)
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

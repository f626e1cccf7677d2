//! Core IR (Intermediate Representation) Types
//!
//! The language-agnostic structural model shared by every component:
//!
//! 1. **Determinism**: ordered `Vec`s in source order, `BTreeMap` for maps
//! 2. **Serialization**: serde derives with stable lowercase field values
//! 3. **Error Tolerance**: `UnknownNode`/`UnparsedBlock` keep what could not
//!    be classified instead of dropping it

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Language Identification
// ============================================================================

/// Language identifier for source files
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LanguageId {
    Rust,
    Python,
    TypeScript,
    Tsx,
    JavaScript,
    Jsx,
    C,
    Cpp,
    Java,
    Go,
    Ruby,
    Php,
    CSharp,
    Swift,
    Kotlin,
    Scala,
    Bash,
    Sql,
    Html,
    Css,
    Json,
    Yaml,
    Toml,
    Markdown,
    Unknown,
}

impl LanguageId {
    /// Detect language from a file extension (without the dot)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "rs" => Self::Rust,
            "py" | "pyw" | "pyi" => Self::Python,
            "ts" | "mts" | "cts" => Self::TypeScript,
            "tsx" => Self::Tsx,
            "js" | "mjs" | "cjs" => Self::JavaScript,
            "jsx" => Self::Jsx,
            "c" | "h" => Self::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "hh" => Self::Cpp,
            "java" => Self::Java,
            "go" => Self::Go,
            "rb" | "rake" | "gemspec" => Self::Ruby,
            "php" | "phtml" => Self::Php,
            "cs" => Self::CSharp,
            "swift" => Self::Swift,
            "kt" | "kts" => Self::Kotlin,
            "scala" | "sc" => Self::Scala,
            "sh" | "bash" | "zsh" | "ksh" => Self::Bash,
            "sql" => Self::Sql,
            "html" | "htm" => Self::Html,
            "css" | "scss" | "sass" => Self::Css,
            "json" | "jsonc" => Self::Json,
            "yaml" | "yml" => Self::Yaml,
            "toml" => Self::Toml,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Detect language from the first line of a script (`#!/usr/bin/env python3`)
    pub fn from_shebang(first_line: &str) -> Self {
        let line = first_line.trim_end();
        let Some(command) = line.strip_prefix("#!") else {
            return Self::Unknown;
        };

        let mut words = command.split_whitespace();
        let mut program = words.next().unwrap_or("");
        if program.ends_with("/env") {
            // `env -S node --flags` style
            program = words.find(|w| !w.starts_with('-')).unwrap_or("");
        }
        let program = program.rsplit('/').next().unwrap_or(program);
        let base = program.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');

        match base {
            "python" | "pypy" => Self::Python,
            "node" | "nodejs" | "bun" => Self::JavaScript,
            "deno" | "ts-node" | "tsx" => Self::TypeScript,
            "bash" | "sh" | "zsh" | "ksh" | "dash" => Self::Bash,
            "ruby" => Self::Ruby,
            _ => Self::Unknown,
        }
    }

    /// Resolve a language from its lowercase serialized name or a common alias
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "rust" | "rs" => Self::Rust,
            "python" | "py" => Self::Python,
            "typescript" | "ts" => Self::TypeScript,
            "tsx" => Self::Tsx,
            "javascript" | "js" => Self::JavaScript,
            "jsx" => Self::Jsx,
            "c" => Self::C,
            "cpp" | "c++" => Self::Cpp,
            "java" => Self::Java,
            "go" => Self::Go,
            "ruby" => Self::Ruby,
            "php" => Self::Php,
            "csharp" | "c#" => Self::CSharp,
            "swift" => Self::Swift,
            "kotlin" => Self::Kotlin,
            "scala" => Self::Scala,
            "bash" | "sh" => Self::Bash,
            "sql" => Self::Sql,
            "html" => Self::Html,
            "css" => Self::Css,
            "json" => Self::Json,
            "yaml" => Self::Yaml,
            "toml" => Self::Toml,
            "markdown" | "md" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Canonical file extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Rust => "rs",
            Self::Python => "py",
            Self::TypeScript => "ts",
            Self::Tsx => "tsx",
            Self::JavaScript => "js",
            Self::Jsx => "jsx",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Java => "java",
            Self::Go => "go",
            Self::Ruby => "rb",
            Self::Php => "php",
            Self::CSharp => "cs",
            Self::Swift => "swift",
            Self::Kotlin => "kt",
            Self::Scala => "scala",
            Self::Bash => "sh",
            Self::Sql => "sql",
            Self::Html => "html",
            Self::Css => "css",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Markdown => "md",
            Self::Unknown => "",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rust => "Rust",
            Self::Python => "Python",
            Self::TypeScript => "TypeScript",
            Self::Tsx => "TSX",
            Self::JavaScript => "JavaScript",
            Self::Jsx => "JSX",
            Self::C => "C",
            Self::Cpp => "C++",
            Self::Java => "Java",
            Self::Go => "Go",
            Self::Ruby => "Ruby",
            Self::Php => "PHP",
            Self::CSharp => "C#",
            Self::Swift => "Swift",
            Self::Kotlin => "Kotlin",
            Self::Scala => "Scala",
            Self::Bash => "Bash",
            Self::Sql => "SQL",
            Self::Html => "HTML",
            Self::Css => "CSS",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
            Self::Markdown => "Markdown",
            Self::Unknown => "Unknown",
        }
    }

    /// Markup and data formats carry no declarations worth indexing
    pub fn is_data_format(&self) -> bool {
        matches!(
            self,
            Self::Html | Self::Css | Self::Json | Self::Yaml | Self::Toml | Self::Markdown
        )
    }
}

// ============================================================================
// Span
// ============================================================================

/// A contiguous region in source code
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,

    /// End byte offset (exclusive)
    pub end: usize,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed)
    pub end_line: usize,

    /// Start column (0-indexed, in bytes)
    pub start_column: usize,

    /// End column (0-indexed, in bytes)
    pub end_column: usize,
}

impl Span {
    /// Create a new span without column information
    pub fn new(start: usize, end: usize, start_line: usize, end_line: usize) -> Self {
        Self {
            start,
            end,
            start_line,
            end_line,
            start_column: 0,
            end_column: 0,
        }
    }

    /// Span covering the whole of `source`
    pub fn of_source(source: &str) -> Self {
        let lines = source.bytes().filter(|b| *b == b'\n').count();
        let last_line_len = source.len() - source.rfind('\n').map_or(0, |i| i + 1);
        Self {
            start: 0,
            end: source.len(),
            start_line: 1,
            end_line: lines + 1,
            start_column: 0,
            end_column: last_line_len,
        }
    }

    /// Check if this span contains a byte offset
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Check if this span contains a line number
    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// Check if `other` lies entirely inside this span
    pub fn encloses(&self, other: &Span) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Check if the two spans share at least one byte
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Span validity against the owning file's byte length
    pub fn is_within(&self, len: usize) -> bool {
        self.start <= self.end && self.end <= len && self.start_line >= 1 && self.start_line <= self.end_line
    }

    /// Get the length in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

// ============================================================================
// File
// ============================================================================

/// A parsed source file with its structural elements
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct File {
    /// Project-relative path with `/` separators (empty for in-memory sources)
    pub path: String,

    /// Detected language identifier
    pub language: LanguageId,

    /// Hex MD5 of the source text this file was built from
    pub checksum: String,

    /// Top-level declarations (functions, classes, structs, etc.)
    pub declarations: Vec<Declaration>,

    /// Import statements
    pub imports: Vec<ImportLike>,

    /// File-level comments (attached or free-floating)
    pub comments: Vec<Comment>,

    /// Regions that could not be classified or contain syntax errors
    pub unknown_regions: Vec<UnknownNode>,

    /// Multi-line regions swallowed by the grammar's error recovery
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unparsed_blocks: Vec<UnparsedBlock>,

    /// Byte range of the entire file
    pub span: Span,

    /// Additional metadata (BTreeMap for determinism)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl File {
    /// Create a new empty file
    pub fn new(path: String, language: LanguageId) -> Self {
        Self {
            path,
            language,
            checksum: String::new(),
            declarations: Vec::new(),
            imports: Vec::new(),
            comments: Vec::new(),
            unknown_regions: Vec::new(),
            unparsed_blocks: Vec::new(),
            span: Span::default(),
            metadata: BTreeMap::new(),
        }
    }

    /// Check if the file contains syntax errors
    pub fn has_errors(&self) -> bool {
        self.unknown_regions.iter().any(|u| u.kind.is_syntax())
    }

    /// True when nothing at all was produced for the file
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
            && self.imports.is_empty()
            && self.comments.is_empty()
            && self.unknown_regions.is_empty()
    }

    /// Get the total number of declarations (including nested)
    pub fn total_declarations(&self) -> usize {
        self.walk_declarations().count()
    }

    /// Iterate every declaration depth-first in source order
    pub fn walk_declarations(&self) -> DeclarationWalk<'_> {
        DeclarationWalk::new(&self.declarations)
    }

    /// Find the first declaration (at any depth) with the given name
    pub fn find_declaration(&self, name: &str) -> Option<&Declaration> {
        self.walk_declarations().find(|d| d.name == name)
    }
}

/// Depth-first, source-ordered iterator over a declaration tree
pub struct DeclarationWalk<'a> {
    stack: Vec<&'a Declaration>,
}

impl<'a> DeclarationWalk<'a> {
    pub fn new(roots: &'a [Declaration]) -> Self {
        Self {
            stack: roots.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for DeclarationWalk<'a> {
    type Item = &'a Declaration;

    fn next(&mut self) -> Option<Self::Item> {
        let decl = self.stack.pop()?;
        self.stack.extend(decl.children.iter().rev());
        Some(decl)
    }
}

// ============================================================================
// Declaration
// ============================================================================

/// A named declaration (function, class, struct, type, constant)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Declaration {
    /// The declaration's name
    pub name: String,

    /// What kind of declaration this is
    pub kind: DeclarationKind,

    /// Visibility (public, private, etc.)
    pub visibility: Visibility,

    /// The full span of the declaration
    pub span: Span,

    /// Span of just the signature/header (for display)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_span: Option<Span>,

    /// Span of the body (for Zoom mode extraction)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_span: Option<Span>,

    /// Attached documentation comment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_comment: Option<Comment>,

    /// Nested declarations (methods in class, etc.)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Declaration>,

    /// Parameters (for functions/methods)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,

    /// Return type annotation (if present)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,

    /// Body structure, only present once enriched by a zoom
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Block>,

    /// Additional metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Declaration {
    /// Create a new declaration
    pub fn new(name: String, kind: DeclarationKind, span: Span) -> Self {
        Self {
            name,
            kind,
            visibility: Visibility::Unknown,
            span,
            signature_span: None,
            body_span: None,
            doc_comment: None,
            children: Vec::new(),
            parameters: Vec::new(),
            return_type: None,
            body: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Stable identifier: `kind:name:start_line`
    pub fn id(&self) -> String {
        format!("{}:{}:{}", self.kind.as_str(), self.name, self.span.start_line)
    }

    /// Attach a zoomed body. Name, kind and span are left untouched.
    pub fn enrich(mut self, body: Block) -> Self {
        self.body = Some(body);
        self
    }

    /// Functions and methods own an executable body
    pub fn is_callable(&self) -> bool {
        matches!(self.kind, DeclarationKind::Function | DeclarationKind::Method)
    }
}

/// Kind of declaration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Function,
    Method,
    Class,
    Struct,
    Enum,
    Interface,
    Trait,
    Type,
    Constant,
    Variable,
    Module,
    Namespace,
    Impl,
    Macro,
    Other,
}

impl DeclarationKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Trait => "trait",
            Self::Type => "type",
            Self::Constant => "constant",
            Self::Variable => "variable",
            Self::Module => "module",
            Self::Namespace => "namespace",
            Self::Impl => "impl",
            Self::Macro => "macro",
            Self::Other => "other",
        }
    }

    /// Parse a kind name, accepting the short aliases used in zoom targets
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "function" | "fn" | "func" | "def" => Self::Function,
            "method" => Self::Method,
            "class" => Self::Class,
            "struct" => Self::Struct,
            "enum" => Self::Enum,
            "interface" => Self::Interface,
            "trait" => Self::Trait,
            "type" => Self::Type,
            "constant" | "const" => Self::Constant,
            "variable" | "var" | "let" => Self::Variable,
            "module" | "mod" => Self::Module,
            "namespace" => Self::Namespace,
            "impl" => Self::Impl,
            "macro" => Self::Macro,
            "other" => Self::Other,
            _ => return None,
        })
    }
}

/// Visibility of a declaration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Protected,
    Internal,
    #[default]
    Unknown,
}

/// A function/method parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parameter {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub span: Span,
}

// ============================================================================
// Block and Control Flow
// ============================================================================

/// A code block (function body, if body, loop body, etc.)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Block {
    /// The block's span
    pub span: Span,

    /// Nested control flow structures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub control_flow: Vec<ControlFlow>,

    /// Function/method calls within this block
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<Call>,

    /// Comments within this block
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,

    /// Unknown/unparsed regions within the block
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_regions: Vec<UnknownNode>,

    /// Named inner functions and classes (recorded, not descended)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_declarations: Vec<Declaration>,
}

impl Block {
    /// Create an empty block covering `span`
    pub fn new(span: Span) -> Self {
        Self {
            span,
            ..Default::default()
        }
    }

    /// Deepest control-flow nesting level below this block (0 when flat)
    pub fn max_depth(&self) -> usize {
        self.control_flow
            .iter()
            .map(|cf| {
                1 + cf
                    .branches
                    .iter()
                    .map(Block::max_depth)
                    .max()
                    .unwrap_or(0)
            })
            .max()
            .unwrap_or(0)
    }

    /// All calls in this block and its branches, in traversal order
    pub fn all_calls(&self) -> Vec<&Call> {
        let mut calls: Vec<&Call> = self.calls.iter().collect();
        for cf in &self.control_flow {
            for branch in &cf.branches {
                calls.extend(branch.all_calls());
            }
        }
        calls
    }

    /// All unknown regions in this block and its branches
    pub fn all_unknowns(&self) -> Vec<&UnknownNode> {
        let mut unknowns: Vec<&UnknownNode> = self.unknown_regions.iter().collect();
        for cf in &self.control_flow {
            for branch in &cf.branches {
                unknowns.extend(branch.all_unknowns());
            }
        }
        unknowns
    }
}

/// Control flow constructs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlFlow {
    pub kind: ControlFlowKind,
    pub span: Span,
    /// The condition expression span (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_span: Option<Span>,
    /// Child blocks (then branch, loop body, match arms) in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<Block>,
}

/// Kind of control flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ControlFlowKind {
    If,
    Else,
    ElseIf,
    Match,
    Switch,
    For,
    While,
    Loop,
    Try,
    Catch,
    Finally,
    With,
    Other,
}

/// A function or method call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Call {
    /// The callee expression (function name, method chain, etc.)
    pub callee: String,

    /// Span of the entire call expression
    pub span: Span,

    /// Number of arguments
    pub argument_count: usize,

    /// Whether this is a method call
    #[serde(default)]
    pub is_method: bool,
}

// ============================================================================
// Import
// ============================================================================

/// Import, require, include, using, or module reference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportLike {
    /// What is being imported (module path, file, etc.)
    pub source: String,

    /// Kind of import
    pub kind: ImportKind,

    /// Specific items imported (for selective imports)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,

    /// Alias if renamed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Whether this is a type-only import
    #[serde(default)]
    pub type_only: bool,

    pub span: Span,
}

impl ImportLike {
    pub fn new(source: String, kind: ImportKind, span: Span) -> Self {
        Self {
            source,
            kind,
            items: Vec::new(),
            alias: None,
            type_only: false,
            span,
        }
    }
}

/// Kind of import statement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    /// import x from 'y' or import 'y'
    Import,
    /// require('x')
    Require,
    /// #include <x>
    Include,
    /// using namespace x
    Using,
    /// mod x;
    Module,
    /// from x import y, export { y } from 'x'
    From,
    /// use x::y
    Use,
    Other,
}

// ============================================================================
// Comment
// ============================================================================

/// A comment in source code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    /// The comment text (without delimiters)
    pub text: String,

    /// Kind of comment
    pub kind: CommentKind,

    pub span: Span,

    /// Name of the declaration this comment belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_to: Option<String>,

    /// Documents the enclosing item (`//!`, module docstrings) rather than the next one
    #[serde(default, skip_serializing_if = "is_false")]
    pub inner: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Comment {
    pub fn new(text: String, kind: CommentKind, span: Span) -> Self {
        Self {
            text,
            kind,
            span,
            attached_to: None,
            inner: false,
        }
    }
}

/// Kind of comment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    /// Single-line comment (// or #)
    Line,
    /// Multi-line block comment (/* */)
    Block,
    /// Documentation comment (///, /** */, docstrings)
    Doc,
}

// ============================================================================
// Error Recovery Types
// ============================================================================

/// Why a region ended up as an [`UnknownNode`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKind {
    /// The grammar produced an ERROR node
    SyntaxError,
    /// The grammar inserted a MISSING token
    Missing,
    /// Well-formed syntax the adapter does not map to the IR
    Unclassified,
    /// Nesting cut off by a depth limit
    Truncated,
    /// The adapter failed while processing this region
    AdapterFailure,
}

impl UnknownKind {
    /// Grammar-level damage rather than an extraction decision
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::SyntaxError | Self::Missing)
    }
}

/// A region that couldn't be classified or is syntactically invalid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnknownNode {
    pub span: Span,
    pub kind: UnknownKind,
    /// Short diagnostic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The raw text of the region (may be truncated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl UnknownNode {
    pub fn new(span: Span, kind: UnknownKind, reason: impl Into<String>) -> Self {
        Self {
            span,
            kind,
            reason: Some(reason.into()),
            raw_text: None,
        }
    }

    /// Attach a debugging excerpt of `source` covered by the span
    pub fn with_excerpt(mut self, source: &str) -> Self {
        self.raw_text = excerpt(source, &self.span);
        self
    }
}

/// An unparsed block (multi-line region with syntax errors)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnparsedBlock {
    pub span: Span,
    pub reason: String,
}

const EXCERPT_LIMIT: usize = 200;

/// Slice of `source` under `span`, cut to a char boundary when long
pub fn excerpt(source: &str, span: &Span) -> Option<String> {
    let text = source.get(span.start..span.end)?;
    if text.is_empty() {
        return None;
    }
    if text.len() <= EXCERPT_LIMIT {
        return Some(text.to_string());
    }
    let mut cut = EXCERPT_LIMIT / 2;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    Some(format!("{}... ({} bytes)", &text[..cut], text.len()))
}

// ============================================================================
// Tests
// ============================================================================

//! Error Resilience Tests
//!
//! Damaged input never crashes the indexer, never loses content silently
//! and never produces spans outside the source.

use orrery::adapters::node_to_span;
use orrery::{
    AdapterRegistry, AstError, AstProvider, Block, Comment, Declaration, File, ImportLike, IndexOptions,
    LanguageAdapter, LanguageId, Span, TreeSitterProvider, UnknownKind, Visibility, ZoomOptions,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Corpus
// ============================================================================

const CORPUS: &[(LanguageId, &str)] = &[
    (
        LanguageId::TypeScript,
        r#"import { readFile } from 'fs/promises';

/** Loads settings from disk */
export async function load(path: string): Promise<Settings> {
  const raw = await readFile(path, 'utf8');
  if (!raw) {
    throw new Error('empty');
  }
  return JSON.parse(raw) as Settings;
}

export interface Settings {
  name: string;
  retries?: number;
}

export class Client {
  private retries = 3;

  constructor(private readonly url: string) {}

  async fetch(query: string): Promise<string> {
    for (let i = 0; i < this.retries; i++) {
      try {
        return await send(this.url, query);
      } catch (err) {
        console.warn(err);
      }
    }
    return '';
  }
}
"#,
    ),
    (
        LanguageId::JavaScript,
        r#"const path = require('path');

// Resolve every entry against the root
function resolveAll(root, entries) {
  return entries.map((entry) => path.join(root, entry));
}

class Queue {
  constructor() {
    this.items = [];
  }

  push(item) {
    this.items.push(item);
    return this;
  }
}

module.exports = { resolveAll, Queue };
"#,
    ),
    (
        LanguageId::Rust,
        r#"use std::collections::HashMap;
use std::fmt;

/// Word counter
#[derive(Debug, Default)]
pub struct Counter {
    counts: HashMap<String, usize>,
}

impl Counter {
    pub fn add(&mut self, word: &str) {
        *self.counts.entry(word.to_string()).or_insert(0) += 1;
    }

    pub fn top(&self) -> Option<(&String, &usize)> {
        self.counts.iter().max_by_key(|(_, n)| **n)
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (word, n) in &self.counts {
            writeln!(f, "{}: {}", word, n)?;
        }
        Ok(())
    }
}

pub enum Mode {
    Fast,
    Slow { delay: u64 },
}
"#,
    ),
    (
        LanguageId::Python,
        r#"import json
from dataclasses import dataclass


@dataclass
class Entry:
    """One journal entry."""

    title: str
    body: str = ""

    def to_json(self) -> str:
        return json.dumps({"title": self.title, "body": self.body})


def load(path):
    # read everything at once
    with open(path) as handle:
        for line in handle:
            if not line.strip():
                continue
            yield Entry(**json.loads(line))
"#,
    ),
];

/// Deterministic xorshift generator so failures reproduce
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

const NOISE: &[u8] = b"{}()[];:,.'\"`#/*\\=<>!?@$%^&|~-+ \nxyz019";

/// Replace one byte of an ASCII source with a random ASCII byte
fn corrupt(source: &str, rng: &mut Rng) -> String {
    let mut bytes = source.as_bytes().to_vec();
    let at = rng.below(bytes.len());
    bytes[at] = NOISE[rng.below(NOISE.len())];
    String::from_utf8(bytes).unwrap()
}

/// The file a parse produced, partial or not
fn parse_any(provider: &TreeSitterProvider, source: &str, language: LanguageId) -> File {
    match provider.parse_file(source, language) {
        Ok(file) => file,
        Err(err) => {
            assert!(err.has_partial(), "parse failed without partial output: {}", err);
            err.take_partial().unwrap()
        }
    }
}

fn assert_span(span: &Span, len: usize, what: &str) {
    assert!(span.start <= span.end, "{} span inverted: {:?}", what, span);
    assert!(span.is_within(len), "{} span outside source: {:?}", what, span);
    assert!(span.start_line <= span.end_line, "{} lines inverted: {:?}", what, span);
}

fn assert_block_spans(block: &Block, len: usize) {
    assert_span(&block.span, len, "block");
    block.calls.iter().for_each(|c| assert_span(&c.span, len, "call"));
    block.comments.iter().for_each(|c| assert_span(&c.span, len, "comment"));
    block.unknown_regions.iter().for_each(|u| assert_span(&u.span, len, "unknown"));
    for flow in &block.control_flow {
        assert_span(&flow.span, len, "control flow");
        flow.branches.iter().for_each(|b| assert_block_spans(b, len));
    }
}

fn assert_file_spans(file: &File, len: usize) {
    assert_span(&file.span, len, "file");
    for decl in file.walk_declarations() {
        assert_span(&decl.span, len, "declaration");
        if let Some(body) = decl.body_span {
            assert_span(&body, len, "body");
            assert!(decl.span.encloses(&body), "body outside declaration {}", decl.name);
        }
        if let Some(signature) = decl.signature_span {
            assert_span(&signature, len, "signature");
        }
        for param in &decl.parameters {
            assert_span(&param.span, len, "parameter");
        }
        for child in &decl.children {
            assert!(decl.span.encloses(&child.span), "child {} outside {}", child.name, decl.name);
        }
    }
    file.imports.iter().for_each(|i| assert_span(&i.span, len, "import"));
    file.comments.iter().for_each(|c| assert_span(&c.span, len, "comment"));
    file.unknown_regions.iter().for_each(|u| assert_span(&u.span, len, "unknown"));
    file.unparsed_blocks.iter().for_each(|u| assert_span(&u.span, len, "unparsed"));
}

// ============================================================================
// Resilience
// ============================================================================

#[test]
fn test_single_byte_corruption() {
    let provider = TreeSitterProvider::new();
    let mut rng = Rng(0x9E37_79B9_7F4A_7C15);
    let mut total = 0;
    let mut non_empty = 0;

    for (language, source) in CORPUS {
        for _ in 0..60 {
            let damaged = corrupt(source, &mut rng);
            let file = parse_any(&provider, &damaged, *language);
            assert_file_spans(&file, damaged.len());
            total += 1;
            if !file.is_empty() {
                non_empty += 1;
            }
        }
    }

    assert!(non_empty * 100 >= total * 98, "{} of {} non-empty", non_empty, total);
}

#[test]
fn test_garbage_input() {
    let provider = TreeSitterProvider::new();
    let garbage = "}}}{{{ ))) ((( ;;; @@@ ### \"\"\" ''' ``` \n\t\n ]]] [[[ <<< >>>";
    for language in provider.supported_languages() {
        let file = parse_any(&provider, garbage, language);
        assert_file_spans(&file, garbage.len());
        assert!(!file.is_empty(), "{:?} produced nothing for garbage", language);
    }
}

#[test]
fn test_truncated_sources() {
    let provider = TreeSitterProvider::new();
    for (language, source) in CORPUS {
        for cut in [1, source.len() / 3, source.len() / 2, source.len() - 2] {
            let partial = &source[..cut];
            let file = parse_any(&provider, partial, *language);
            assert_file_spans(&file, partial.len());
        }
    }
}

#[test]
fn test_module_zoom_on_damaged_sources() {
    let temp_dir = TempDir::new().unwrap();
    let provider = TreeSitterProvider::new();
    let mut rng = Rng(7);

    for (language, source) in CORPUS {
        let path = temp_dir.path().join(format!("damaged.{}", language.extension()));
        for _ in 0..10 {
            let damaged = corrupt(source, &mut rng);
            fs::write(&path, &damaged).unwrap();
            match provider.zoom_into(&path, orrery::MODULE_SYMBOL, &ZoomOptions::default()) {
                Ok(model) => assert_block_spans(&model.body.unwrap(), damaged.len()),
                Err(err) => assert!(err.has_partial(), "zoom failed without partial output: {}", err),
            }
        }
    }
}

#[test]
fn test_invalid_utf8_spans_match_disk_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let mut rng = Rng(0xC0FF_EE00);
    let mut on_disk = Vec::new();

    let latin = b"x = 'caf\xE9'\ndef f():\n    pass\n".to_vec();
    fs::write(temp_dir.path().join("latin.py"), &latin).unwrap();
    on_disk.push(("latin.py".to_string(), latin.clone()));

    for (language, source) in CORPUS {
        let mut bytes = source.as_bytes().to_vec();
        for _ in 0..3 {
            let at = rng.below(bytes.len());
            bytes[at] = 0xE9;
        }
        let name = format!("damaged.{}", language.extension());
        fs::write(temp_dir.path().join(&name), &bytes).unwrap();
        on_disk.push((name, bytes));
    }

    let provider = TreeSitterProvider::new();
    let model = provider.index_project(temp_dir.path(), &IndexOptions::default()).unwrap();
    for (name, bytes) in &on_disk {
        let file = model.file(name).unwrap_or_else(|| panic!("{} was not indexed", name));
        assert_file_spans(file, bytes.len());
        assert_eq!(file.span.end, bytes.len(), "{} file span", name);
    }

    let f = model.file("latin.py").unwrap().find_declaration("f").unwrap();
    assert_eq!(&latin[f.span.start..f.span.end], b"def f():\n    pass");
    assert!(model.errors.iter().any(|e| e.path == "latin.py" && e.recoverable));
}

// ============================================================================
// Coverage
// ============================================================================

#[test]
fn test_no_silent_drop() {
    let provider = TreeSitterProvider::new();
    let registry = AdapterRegistry::new();
    let mut rng = Rng(42);

    for (language, source) in CORPUS {
        for _ in 0..20 {
            let damaged = corrupt(source, &mut rng);
            let file = parse_any(&provider, &damaged, *language);

            let adapter = registry.get(*language).unwrap();
            let mut parser = tree_sitter::Parser::new();
            parser.set_language(&adapter.grammar()).unwrap();
            let tree = parser.parse(&damaged, None).unwrap();

            let mut covered: Vec<Span> = file.declarations.iter().map(|d| d.span).collect();
            covered.extend(file.imports.iter().map(|i| i.span));
            covered.extend(file.comments.iter().map(|c| c.span));
            covered.extend(file.unknown_regions.iter().map(|u| u.span));

            let root = tree.root_node();
            let mut cursor = root.walk();
            for node in root.named_children(&mut cursor) {
                if node.start_byte() == node.end_byte() || adapter.is_trivia(node.kind()) {
                    continue;
                }
                let span = node_to_span(&node);
                assert!(
                    covered.iter().any(|c| c.overlaps(&span)),
                    "{:?}: top-level {} at line {} is not represented",
                    language,
                    node.kind(),
                    span.start_line
                );
            }
        }
    }
}

// ============================================================================
// Adapter Failure
// ============================================================================

/// Adapter whose declaration extraction always panics
struct PanickingAdapter;

impl LanguageAdapter for PanickingAdapter {
    fn language(&self) -> LanguageId {
        LanguageId::JavaScript
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_javascript::LANGUAGE.into()
    }

    fn extract_declarations(&self, _tree: &tree_sitter::Tree, _source: &str) -> Vec<Declaration> {
        panic!("declaration walk failed")
    }

    fn extract_imports(&self, _tree: &tree_sitter::Tree, _source: &str) -> Vec<ImportLike> {
        Vec::new()
    }

    fn extract_comments(&self, _tree: &tree_sitter::Tree, _source: &str) -> Vec<Comment> {
        Vec::new()
    }

    fn extract_body(
        &self,
        _tree: &tree_sitter::Tree,
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

fn panicking_provider() -> TreeSitterProvider {
    let registry = AdapterRegistry::with_adapters(vec![Box::new(PanickingAdapter)]);
    TreeSitterProvider::new().with_registry(Arc::new(registry))
}

#[test]
fn test_adapter_panic_is_contained_when_indexing() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.js"), "function a() {}\n").unwrap();
    fs::write(temp_dir.path().join("b.py"), "def b():\n    pass\n").unwrap();

    let provider = panicking_provider();
    let model = provider.index_project(temp_dir.path(), &IndexOptions::default()).unwrap();

    let a = model.file("a.js").unwrap();
    assert_eq!(a.unknown_regions.len(), 1);
    assert_eq!(a.unknown_regions[0].kind, UnknownKind::AdapterFailure);
    assert_eq!(a.unknown_regions[0].span, a.span);
    assert!(a.unknown_regions[0]
        .reason
        .as_deref()
        .unwrap()
        .contains("declaration walk failed"));

    let error = model.errors.iter().find(|e| e.path == "a.js").unwrap();
    assert!(error.recoverable);

    // Python has no adapter in this registry
    let error = model.errors.iter().find(|e| e.path == "b.py").unwrap();
    assert!(!error.recoverable);
}

#[test]
fn test_adapter_panic_surfaces_partial_from_parse_file() {
    let provider = panicking_provider();
    let err = provider
        .parse_file("function a() {}\n", LanguageId::JavaScript)
        .unwrap_err();
    assert!(matches!(err, AstError::ParseError { .. }));
    let partial = err.take_partial().unwrap();
    assert_eq!(partial.unknown_regions[0].kind, UnknownKind::AdapterFailure);
}

#[test]
fn test_adapter_panic_surfaces_from_zoom() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("a.js");
    fs::write(&path, "function a() {}\n").unwrap();

    let provider = panicking_provider();
    let err = provider.zoom_into(&path, "a", &ZoomOptions::default()).unwrap_err();
    assert!(err.has_partial());
    assert_eq!(provider.cache().len(), 0);
}

//! Project Indexer
//!
//! Index mode: walk a project, run the orchestrator and adapter over every
//! supported file and collect a [`PlanetariumModel`]. Only conditions about
//! the root are fatal; per-file trouble becomes an [`IndexError`] and the run
//! continues.

use crate::error::{FatalError, IndexError};
use crate::ir::{File, LanguageId};
use crate::orchestrator::{parse_source, BuildOptions};
use crate::provider::{IndexOptions, PlanetariumModel};
use crate::registry::AdapterRegistry;
use crate::source::{decode, detect_language, Decoded, SourceLoader};
use crate::walker::{check_root, Candidate, ProjectWalker};
use std::borrow::Cow;
use std::path::Path;

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

/// A candidate with an adapter-backed language
struct Job<'c> {
    candidate: &'c Candidate,
    language: LanguageId,
    /// Content already read for shebang detection
    content: Option<Vec<u8>>,
}

/// What happened to one file
enum Outcome {
    Indexed {
        file: File,
        error: Option<IndexError>,
        parse_ms: u64,
    },
    Skipped(&'static str),
    Failed(IndexError),
    Cancelled,
}

/// Index-mode driver over a registry and a source loader
pub struct ProjectIndexer<'a> {
    registry: &'a AdapterRegistry,
    loader: &'a dyn SourceLoader,
}

impl<'a> ProjectIndexer<'a> {
    pub fn new(registry: &'a AdapterRegistry, loader: &'a dyn SourceLoader) -> Self {
        Self { registry, loader }
    }

    /// Index every supported file under `root`
    pub fn index(&self, root: &Path, options: &IndexOptions) -> Result<PlanetariumModel, FatalError> {
        check_root(root)?;
        let walker = ProjectWalker::new(root, options)?;
        let (candidates, walk_errors) = walker.walk();

        let mut model = PlanetariumModel::new(root.to_string_lossy());
        model.stats.files_failed += walk_errors.len();
        model.errors.extend(walk_errors);

        let mut jobs = Vec::new();
        for candidate in &candidates {
            let (language, content) = self.detect(candidate);
            if language == LanguageId::Unknown || language.is_data_format() || !options.wants(language) {
                model.stats.files_skipped += 1;
                continue;
            }
            if !self.registry.supports(language) {
                model.stats.files_failed += 1;
                model.errors.push(IndexError::fatal(
                    &candidate.relative,
                    format!("no adapter registered for {}", language.name()),
                ));
                continue;
            }
            jobs.push(Job {
                candidate,
                language,
                content,
            });
        }

        if options.max_files > 0 && jobs.len() > options.max_files {
            model.stats.files_truncated = jobs.len() - options.max_files;
            jobs.truncate(options.max_files);
        }

        tracing::debug!(root = %model.root, files = jobs.len(), "indexing project");
        let outcomes = map_jobs(&jobs, |job| self.index_file(job, options));

        for (job, outcome) in jobs.iter().zip(outcomes) {
            let path = &job.candidate.relative;
            match outcome {
                Outcome::Indexed { file, error, parse_ms } => {
                    record_file(&mut model, &file, parse_ms);
                    if let Some(error) = error {
                        tracing::warn!(path = %error.path, message = %error.message, "partial file");
                        model.errors.push(error);
                    }
                    model.files.insert(path.clone(), file);
                }
                Outcome::Skipped(reason) => {
                    tracing::debug!(path = %path, reason, "skipped file");
                    model.stats.files_skipped += 1;
                }
                Outcome::Failed(error) => {
                    tracing::warn!(path = %error.path, message = %error.message, "file failed");
                    model.stats.files_failed += 1;
                    model.errors.push(error);
                }
                Outcome::Cancelled => {
                    model.stats.files_cancelled += 1;
                    model.stats.cancelled = true;
                }
            }
        }

        model.errors.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::info!(
            root = %model.root,
            processed = model.stats.files_processed,
            skipped = model.stats.files_skipped,
            failed = model.stats.files_failed,
            declarations = model.stats.declarations_found,
            cancelled = model.stats.cancelled,
            "index complete"
        );
        Ok(model)
    }

    /// Extension first, shebang for extensionless files; the content read
    /// for a shebang is handed back so it is not read twice
    fn detect(&self, candidate: &Candidate) -> (LanguageId, Option<Vec<u8>>) {
        if candidate.path.extension().is_some() {
            return (detect_language(&candidate.path, &[]), None);
        }
        match self.loader.read(&candidate.path) {
            Ok(bytes) => (detect_language(&candidate.path, &bytes), Some(bytes)),
            Err(_) => (LanguageId::Unknown, None),
        }
    }

    fn index_file(&self, job: &Job, options: &IndexOptions) -> Outcome {
        if options.cancellation.is_cancelled() {
            return Outcome::Cancelled;
        }
        let path = &job.candidate.relative;

        let bytes: Cow<[u8]> = match &job.content {
            Some(content) => Cow::Borrowed(content.as_slice()),
            None => match self.loader.read(&job.candidate.path) {
                Ok(bytes) => Cow::Owned(bytes),
                Err(err) => return Outcome::Failed(IndexError::fatal(path, format!("read failed: {}", err))),
            },
        };
        if options.max_file_size > 0 && bytes.len() as u64 > options.max_file_size {
            return Outcome::Skipped("too large");
        }

        let mut notes = Vec::new();
        let source = match decode(&bytes) {
            Decoded::Clean(text) => text,
            Decoded::Lossy { text, replaced } => {
                notes.push(format!("invalid UTF-8: {} bytes replaced", replaced));
                text
            }
            Decoded::Binary => return Outcome::Skipped("binary"),
        };

        let adapter = match self.registry.get(job.language) {
            Ok(adapter) => adapter,
            Err(err) => return Outcome::Failed(IndexError::fatal(path, err.to_string())),
        };

        let (parsed, parse_ms) = timed(|| {
            let build = BuildOptions::index(options.extract_comments).nested(options.extract_nested);
            parse_source(adapter, &source, path, build)
        });
        let extraction = match parsed {
            Ok(extraction) => extraction,
            Err(err) => return Outcome::Failed(IndexError::fatal(path, err.to_string())),
        };

        if let Some(failure) = &extraction.adapter_failure {
            notes.push(format!("adapter failure: {}", failure));
        } else if extraction.suspect {
            notes.push("syntax errors cover most of the file".to_string());
        }

        tracing::debug!(path = %path, language = ?job.language, parse_ms, "indexed file");
        Outcome::Indexed {
            file: extraction.file,
            error: (!notes.is_empty()).then(|| IndexError::recoverable(path, notes.join("; "))),
            parse_ms,
        }
    }
}

fn record_file(model: &mut PlanetariumModel, file: &File, parse_ms: u64) {
    let stats = &mut model.stats;
    let declarations = file.total_declarations();
    stats.files_processed += 1;
    stats.parse_time_ms += parse_ms;
    stats.declarations_found += declarations;
    stats.imports_found += file.imports.len();
    stats.comments_found += file.comments.len();
    stats.unknown_regions += file.unknown_regions.len();
    stats.syntax_errors += file.unknown_regions.iter().filter(|u| u.kind.is_syntax()).count();

    let language = stats
        .by_language
        .entry(file.language.name().to_ascii_lowercase())
        .or_default();
    language.files += 1;
    language.declarations += declarations;
}

/// Map over jobs in parallel, keeping input order
#[cfg(not(target_arch = "wasm32"))]
fn map_jobs<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    items.par_iter().map(f).collect()
}

#[cfg(target_arch = "wasm32")]
fn map_jobs<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    F: Fn(&T) -> R,
{
    items.iter().map(f).collect()
}

#[cfg(not(target_arch = "wasm32"))]
fn timed<R>(f: impl FnOnce() -> R) -> (R, u64) {
    let start = std::time::Instant::now();
    let result = f();
    (result, start.elapsed().as_millis() as u64)
}

#[cfg(target_arch = "wasm32")]
fn timed<R>(f: impl FnOnce() -> R) -> (R, u64) {
    (f(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CancellationToken;
    use crate::source::{FsLoader, MockSourceLoader};
    use std::fs;
    use std::io;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn index(root: &Path, options: &IndexOptions) -> PlanetariumModel {
        let registry = AdapterRegistry::new();
        ProjectIndexer::new(&registry, &FsLoader).index(root, options).unwrap()
    }

    // =========================================================================
    // Detection Tests
    // =========================================================================

    #[test]
    fn test_mixed_project() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/lib.rs", b"pub fn lib() {}\n");
        write(tmp.path(), "tools/gen.py", b"def gen():\n    pass\n");
        write(tmp.path(), "web/app.ts", b"export const app = () => 1;\n");
        write(tmp.path(), "README.md", b"# readme\n");
        write(tmp.path(), "data.json", b"{}\n");
        write(tmp.path(), "cmd/main.go", b"package main\n");
        write(tmp.path(), "bin/tool", b"#!/usr/bin/env python3\ndef run():\n    pass\n");
        write(tmp.path(), "NOTES", b"plain text\n");

        let model = index(tmp.path(), &IndexOptions::default());
        let paths: Vec<_> = model.files.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["bin/tool", "src/lib.rs", "tools/gen.py", "web/app.ts"]);
        assert_eq!(model.file("bin/tool").unwrap().language, LanguageId::Python);

        assert_eq!(model.stats.files_processed, 4);
        assert_eq!(model.stats.files_skipped, 3);
        assert_eq!(model.stats.files_failed, 1);
        assert_eq!(model.errors.len(), 1);
        assert_eq!(model.errors[0].path, "cmd/main.go");
        assert_eq!(model.errors[0].message, "no adapter registered for Go");
        assert!(!model.errors[0].recoverable);

        assert_eq!(model.stats.by_language["python"].files, 2);
        assert_eq!(model.stats.by_language["rust"].declarations, 1);
        assert_eq!(model.stats.declarations_found, 4);
    }

    // =========================================================================
    // Limit Tests
    // =========================================================================

    #[test]
    fn test_max_files_truncates_sorted_list() {
        let tmp = TempDir::new().unwrap();
        for name in ["e.rs", "b.rs", "d.rs", "a.rs", "c.rs"] {
            write(tmp.path(), name, b"fn f() {}\n");
        }

        let model = index(tmp.path(), &IndexOptions::default().with_max_files(2));
        let paths: Vec<_> = model.files.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["a.rs", "b.rs"]);
        assert_eq!(model.stats.files_truncated, 3);
    }

    #[test]
    fn test_binary_and_oversize_skipped() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "ok.js", b"let a = 1;\n");
        write(tmp.path(), "blob.js", b"let\0a");
        write(tmp.path(), "big.js", &vec![b'/'; 64]);

        let options = IndexOptions {
            max_file_size: 32,
            ..IndexOptions::default()
        };
        let model = index(tmp.path(), &options);
        assert_eq!(model.files.keys().collect::<Vec<_>>(), vec!["ok.js"]);
        assert_eq!(model.stats.files_skipped, 2);
        assert!(model.errors.is_empty());
    }

    #[test]
    fn test_lossy_file_is_partial() {
        let tmp = TempDir::new().unwrap();
        let mut content = b"def f():\n    return 'caf".to_vec();
        content.push(0xE9);
        content.extend_from_slice(b"'\n");
        write(tmp.path(), "latin.py", &content);

        let model = index(tmp.path(), &IndexOptions::default());
        assert!(model.file("latin.py").is_some());
        assert_eq!(model.errors.len(), 1);
        assert!(model.errors[0].recoverable);
        assert!(model.errors[0].message.contains("invalid UTF-8"));
    }

    // =========================================================================
    // Failure Tests
    // =========================================================================

    #[test]
    fn test_root_errors_are_fatal() {
        let tmp = TempDir::new().unwrap();
        let registry = AdapterRegistry::new();
        let indexer = ProjectIndexer::new(&registry, &FsLoader);

        let missing = indexer.index(&tmp.path().join("nope"), &IndexOptions::default());
        assert!(matches!(missing, Err(FatalError::RootNotFound { .. })));

        write(tmp.path(), "file.rs", b"");
        let not_dir = indexer.index(&tmp.path().join("file.rs"), &IndexOptions::default());
        assert!(matches!(not_dir, Err(FatalError::RootNotDirectory { .. })));

        let options = IndexOptions::default().with_include(vec!["[".to_string()]);
        assert!(matches!(
            indexer.index(tmp.path(), &options),
            Err(FatalError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_read_failure_does_not_stop_the_run() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "bad.rs", b"fn bad() {}\n");
        write(tmp.path(), "good.rs", b"fn good() {}\n");

        let mut loader = MockSourceLoader::new();
        loader.expect_read().returning(|path| {
            if path.ends_with("bad.rs") {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            } else {
                fs::read(path)
            }
        });

        let registry = AdapterRegistry::new();
        let model = ProjectIndexer::new(&registry, &loader)
            .index(tmp.path(), &IndexOptions::default())
            .unwrap();

        assert_eq!(model.files.keys().collect::<Vec<_>>(), vec!["good.rs"]);
        assert_eq!(model.errors.len(), 1);
        assert_eq!(model.errors[0].path, "bad.rs");
        assert!(!model.errors[0].recoverable);
        assert!(model.errors[0].message.contains("denied"));
        assert_eq!(model.stats.files_failed, 1);
    }

    #[test]
    fn test_shebang_script_is_read_once() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "bin/tool", b"#!/usr/bin/env node\nfunction tool() {}\n");

        let mut loader = MockSourceLoader::new();
        loader.expect_read().times(1).returning(|path| fs::read(path));

        let registry = AdapterRegistry::new();
        let model = ProjectIndexer::new(&registry, &loader)
            .index(tmp.path(), &IndexOptions::default())
            .unwrap();
        assert_eq!(model.file("bin/tool").unwrap().declarations[0].name, "tool");
    }

    #[test]
    fn test_cancelled_before_start() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.rs", b"fn a() {}\n");
        write(tmp.path(), "b.rs", b"fn b() {}\n");

        let token = CancellationToken::new();
        token.cancel();
        let model = index(tmp.path(), &IndexOptions::default().with_cancellation(token));

        assert!(model.files.is_empty());
        assert!(model.stats.cancelled);
        assert_eq!(model.stats.files_cancelled, 2);
    }

    #[test]
    fn test_language_filter() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/lib.rs", b"pub fn lib() {}\n");
        write(tmp.path(), "tools/gen.py", b"def gen():\n    pass\n");
        write(tmp.path(), "cmd/main.go", b"package main\n");

        let options = IndexOptions::default().with_languages(vec![LanguageId::Python]);
        let model = index(tmp.path(), &options);
        assert_eq!(model.files.keys().collect::<Vec<_>>(), vec!["tools/gen.py"]);
        assert_eq!(model.stats.files_skipped, 2);
        assert!(model.errors.is_empty());
    }

    #[test]
    fn test_nested_toggle() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "shape.ts",
            b"export class Shape {\n  area() { return 0; }\n  scale(k: number) {}\n}\n",
        );

        let full = index(tmp.path(), &IndexOptions::default());
        assert_eq!(full.stats.declarations_found, 3);

        let options = IndexOptions {
            extract_nested: false,
            ..IndexOptions::default()
        };
        let flat = index(tmp.path(), &options);
        assert_eq!(flat.stats.declarations_found, 1);
        assert!(flat.file("shape.ts").unwrap().declarations[0].children.is_empty());
        assert!(flat.errors.is_empty());
    }

    #[test]
    fn test_comments_toggle() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.ts", b"// greeting\nexport function hi() {}\n");

        let with = index(tmp.path(), &IndexOptions::default());
        assert_eq!(with.stats.comments_found, 1);

        let options = IndexOptions {
            extract_comments: false,
            ..IndexOptions::default()
        };
        let without = index(tmp.path(), &options);
        assert_eq!(without.stats.comments_found, 0);
        assert!(without.file("a.ts").unwrap().declarations[0].doc_comment.is_none());
    }
}

//! Project traversal
//!
//! Enumerates candidate files under a project root: hidden entries and the
//! default ignore list are pruned, exclude patterns prune whole directories,
//! include patterns filter files. Candidates come back sorted by their
//! `/`-separated relative path.
//!
//! Glob semantics: `*` and `?` never cross `/`, `**` crosses any number of
//! directories, and a pattern without `/` is also tried against every single
//! path component (`*.rs` matches `src/a.rs`, `vendor` matches `a/vendor/b.rs`).

use crate::error::{FatalError, IndexError};
use crate::provider::IndexOptions;
use crate::source::relative_path;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Names never worth indexing
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    "target",
    ".DS_Store",
    "*.pyc",
];

/// Compiled include or exclude patterns
#[derive(Debug, Clone)]
pub struct PathMatcher {
    /// Patterns containing `/`, matched against the whole relative path
    paths: GlobSet,
    /// Patterns without `/`, matched against the path and each component
    components: GlobSet,
    empty: bool,
}

impl PathMatcher {
    /// Compile patterns; the first invalid one is a fatal error
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, FatalError> {
        let mut paths = GlobSetBuilder::new();
        let mut components = GlobSetBuilder::new();
        let mut empty = true;

        for raw in patterns {
            let raw = raw.as_ref();
            let pattern = normalize_pattern(raw);
            if pattern.is_empty() {
                continue;
            }
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| invalid_pattern(raw, e))?;
            if pattern.contains('/') {
                paths.add(glob);
            } else {
                components.add(glob);
            }
            empty = false;
        }

        Ok(Self {
            paths: paths.build().map_err(|e| invalid_pattern("<set>", e))?,
            components: components.build().map_err(|e| invalid_pattern("<set>", e))?,
            empty,
        })
    }

    /// No patterns were given
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Check a `/`-separated relative path
    pub fn is_match(&self, relative: &str) -> bool {
        if self.empty {
            return false;
        }
        self.paths.is_match(relative)
            || self.components.is_match(relative)
            || relative.split('/').any(|c| self.components.is_match(c))
    }
}

fn normalize_pattern(pattern: &str) -> &str {
    let pattern = pattern.trim();
    let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
    pattern.trim_end_matches('/')
}

fn invalid_pattern(pattern: &str, err: globset::Error) -> FatalError {
    FatalError::InvalidPattern {
        pattern: pattern.to_string(),
        message: err.kind().to_string(),
    }
}

/// A file selected for indexing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute (or root-joined) path for reading
    pub path: PathBuf,
    /// Project-relative path with `/` separators
    pub relative: String,
}

/// Check that `root` is an existing, readable directory
pub fn check_root(root: &Path) -> Result<(), FatalError> {
    let path = root.to_string_lossy().to_string();
    if !root.exists() {
        return Err(FatalError::RootNotFound { path });
    }
    if !root.is_dir() {
        return Err(FatalError::RootNotDirectory { path });
    }
    std::fs::read_dir(root).map_err(|e| FatalError::RootUnreadable {
        path,
        message: e.to_string(),
    })?;
    Ok(())
}

/// Walker over one project root
pub struct ProjectWalker {
    root: PathBuf,
    include: PathMatcher,
    exclude: PathMatcher,
    defaults: PathMatcher,
    follow_symlinks: bool,
}

impl ProjectWalker {
    /// Create a walker for `root` with the patterns and symlink policy of `options`
    pub fn new(root: &Path, options: &IndexOptions) -> Result<Self, FatalError> {
        Ok(Self {
            root: root.to_path_buf(),
            include: PathMatcher::new(&options.include_patterns)?,
            exclude: PathMatcher::new(&options.exclude_patterns)?,
            defaults: PathMatcher::new(DEFAULT_EXCLUDES)?,
            follow_symlinks: options.follow_symlinks,
        })
    }

    /// Enumerate candidate files, sorted by relative path
    ///
    /// Errors below the root (permission denied, symlink loops) are returned
    /// alongside the candidates rather than aborting the walk.
    pub fn walk(&self) -> (Vec<Candidate>, Vec<IndexError>) {
        let mut candidates = Vec::new();
        let mut errors = Vec::new();

        let entries = WalkDir::new(&self.root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_pruned(entry));

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| relative_path(&self.root, p))
                        .unwrap_or_default();
                    tracing::warn!(path = %path, error = %err, "walk error");
                    errors.push(IndexError::fatal(path, err.to_string()));
                    continue;
                }
            };

            // Symlinks that are not followed show up as symlink entries
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = relative_path(&self.root, entry.path());
            if !self.include.is_empty() && !self.include.is_match(&relative) {
                continue;
            }

            candidates.push(Candidate {
                path: entry.path().to_path_buf(),
                relative,
            });
        }

        candidates.sort_by(|a, b| a.relative.cmp(&b.relative));
        (candidates, errors)
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return true;
        }
        let relative = relative_path(&self.root, entry.path());
        self.defaults.is_match(&relative) || self.exclude.is_match(&relative)
    }
}

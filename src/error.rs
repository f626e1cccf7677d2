//! Error types for orrery
//!
//! Most failures are recoverable: a file with broken syntax still yields a
//! partial `File`, and per-file trouble during a project index is reported
//! through [`IndexError`] instead of aborting the run. Only conditions about
//! the project root itself are fatal.

use crate::ir::{File, LanguageId};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Errors from single-target operations (`zoom_into`, `parse_file`)
#[derive(Error, Debug, Clone)]
pub enum AstError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Symbol not found in file
    #[error("Symbol '{symbol}' not found in file '{file}'")]
    SymbolNotFound { file: String, symbol: String },

    /// Language not supported by any adapter
    #[error("Unsupported language: {0:?}")]
    UnsupportedLanguage(LanguageId),

    /// Parse went badly enough to question the result; partial output attached
    #[error("Parse error: {message}")]
    ParseError {
        message: String,
        partial: Option<Box<File>>,
    },

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(String),

    /// Invalid configuration or options
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Grammar could not be loaded into the parser
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),

    /// The caller's cancellation token was set
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AstError {
    /// Check if this error has partial results available
    pub fn has_partial(&self) -> bool {
        matches!(self, AstError::ParseError { partial: Some(_), .. })
    }

    /// Extract partial results if available
    pub fn take_partial(self) -> Option<File> {
        match self {
            AstError::ParseError {
                partial: Some(file),
                ..
            } => Some(*file),
            _ => None,
        }
    }

    /// Create a parse error with partial results
    pub fn parse_error_with_partial(message: impl Into<String>, file: File) -> Self {
        AstError::ParseError {
            message: message.into(),
            partial: Some(Box::new(file)),
        }
    }

    /// Create a simple parse error without partial results
    pub fn parse_error(message: impl Into<String>) -> Self {
        AstError::ParseError {
            message: message.into(),
            partial: None,
        }
    }

    /// Map an I/O error on `path` to the matching variant
    pub fn from_io(path: &str, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => AstError::FileNotFound(path.to_string()),
            _ => AstError::IoError(format!("{}: {}", path, err)),
        }
    }
}

impl From<io::Error> for AstError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => AstError::FileNotFound(err.to_string()),
            _ => AstError::IoError(err.to_string()),
        }
    }
}

/// Result type alias for AstError
pub type Result<T> = std::result::Result<T, AstError>;

/// Root-level conditions that abort `index_project`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    #[error("Project root not found: {path}")]
    RootNotFound { path: String },

    #[error("Project root is not a directory: {path}")]
    RootNotDirectory { path: String },

    #[error("Project root is not readable: {path}: {message}")]
    RootUnreadable { path: String, message: String },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// A per-file problem recorded inside a project index
///
/// `recoverable = true` means a partial `File` is still present in the model;
/// `false` means the file is absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexError {
    pub path: String,
    pub message: String,
    pub recoverable: bool,
}

impl IndexError {
    pub fn recoverable(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            recoverable: true,
        }
    }

    pub fn fatal(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            recoverable: false,
        }
    }
}

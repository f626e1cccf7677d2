//! Project configuration
//!
//! An optional `.orrery.json` at the project root:
//!
//! ```json
//! {
//!   "include": ["src/**"],
//!   "exclude": ["vendor", "*.min.js"],
//!   "max_files": 5000,
//!   "max_file_size": 1048576,
//!   "extract_comments": true,
//!   "follow_symlinks": false,
//!   "languages": ["rust", "typescript"]
//! }
//! ```
//!
//! Every key is optional. The file is never read implicitly; callers apply it
//! with `IndexOptions::with_project_config`.

use crate::ir::LanguageId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up by [`ProjectConfig::discover`]
pub const CONFIG_FILE_NAME: &str = ".orrery.json";

/// Errors loading a project config
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration loaded from `.orrery.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Patterns to include (globs); replaces the caller's list when present
    pub include: Option<Vec<String>>,
    /// Patterns to exclude (globs); added to the caller's list
    #[serde(alias = "ignore")]
    pub exclude: Vec<String>,
    pub max_files: Option<usize>,
    pub max_file_size: Option<u64>,
    pub extract_comments: Option<bool>,
    pub follow_symlinks: Option<bool>,
    /// Replaces the caller's language filter when present
    pub languages: Option<Vec<LanguageId>>,
}

impl ProjectConfig {
    /// Parse a config from JSON text
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Path of the config file for a project root
    pub fn default_path(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE_NAME)
    }

    /// Load the project's config if it has one
    pub fn discover(root: &Path) -> Result<Option<Self>, ConfigError> {
        let path = Self::default_path(root);
        if !path.is_file() {
            return Ok(None);
        }
        tracing::debug!(path = %path.display(), "loading project config");
        Self::load(&path).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config() {
        let config = ProjectConfig::from_json("{}").unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = ProjectConfig::from_json(
            r#"{
                "include": ["src/**"],
                "exclude": ["vendor"],
                "max_files": 10,
                "max_file_size": 2048,
                "extract_comments": false,
                "follow_symlinks": true,
                "languages": ["python", "javascript"]
            }"#,
        )
        .unwrap();
        assert_eq!(config.include, Some(vec!["src/**".to_string()]));
        assert_eq!(config.exclude, vec!["vendor"]);
        assert_eq!(config.max_files, Some(10));
        assert_eq!(config.max_file_size, Some(2048));
        assert_eq!(config.extract_comments, Some(false));
        assert_eq!(config.follow_symlinks, Some(true));
        assert_eq!(config.languages, Some(vec![LanguageId::Python, LanguageId::JavaScript]));
    }

    #[test]
    fn test_ignore_alias() {
        let config = ProjectConfig::from_json(r#"{"ignore": ["dist"]}"#).unwrap();
        assert_eq!(config.exclude, vec!["dist"]);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ProjectConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_discover() {
        let tmp = TempDir::new().unwrap();
        assert!(ProjectConfig::discover(tmp.path()).unwrap().is_none());

        fs::write(tmp.path().join(CONFIG_FILE_NAME), r#"{"max_files": 3}"#).unwrap();
        let config = ProjectConfig::discover(tmp.path()).unwrap().unwrap();
        assert_eq!(config.max_files, Some(3));
    }
}

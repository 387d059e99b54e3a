//! Engine configuration, read from `.typeforge/config.toml`.
//!
//! ```toml
//! [index]
//! root = "src"            # lazily indexed when a query meets an empty cache
//! extensions = ["cs"]
//! respect_gitignore = true
//!
//! [generation]
//! indent_width = 4
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{EngineError, Result};

/// Name of the per-project configuration directory.
pub const CONFIG_DIR: &str = ".typeforge";
/// File name of the configuration inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub index: IndexConfig,
    pub generation: GenerationConfig,
}

/// Controls the opt-in directory index that feeds queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory scanned when a query runs against an empty cache.
    /// `None` keeps queries strictly limited to what is already cached.
    pub root: Option<PathBuf>,
    /// File extensions (without dot) considered source files.
    pub extensions: Vec<String>,
    pub respect_gitignore: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: None,
            extensions: vec!["cs".to_string()],
            respect_gitignore: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Spaces per indentation level in generated source.
    pub indent_width: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { indent_width: 4 }
    }
}

impl EngineConfig {
    /// Load config, falling back to defaults when the file is missing or bad.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "using default config");
                Self::default()
            }
        }
    }

    /// Load config, surfacing decode errors. A missing file yields defaults.
    pub fn try_load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        toml::from_str(&text).map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Config path for a project root.
    pub fn path_for_root(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Resolve a relative index root against the project root.
    pub fn resolve_index_root(&self, project_root: &Path) -> Option<PathBuf> {
        self.index.root.as_ref().map(|root| {
            if root.is_absolute() {
                root.clone()
            } else {
                project_root.join(root)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::try_load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.index.extensions, vec!["cs".to_string()]);
        assert_eq!(config.generation.indent_width, 4);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[index]\nroot = \"src\"\n").unwrap();

        let config = EngineConfig::try_load(&path).unwrap();
        assert_eq!(config.index.root, Some(PathBuf::from("src")));
        assert!(config.index.respect_gitignore);
        assert_eq!(config.generation.indent_width, 4);
        assert_eq!(
            config.resolve_index_root(Path::new("/proj")),
            Some(PathBuf::from("/proj/src"))
        );
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[index\nroot = ").unwrap();

        assert!(matches!(
            EngineConfig::try_load(&path),
            Err(EngineError::Config(_))
        ));
        assert_eq!(EngineConfig::load(&path), EngineConfig::default());
    }
}

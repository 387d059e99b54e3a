//! File access used by the services.
//!
//! Services never touch `std::fs` directly, so tests and embedders can swap
//! the store.

use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};

pub trait FileStore: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Full UTF-8 contents. A missing file is an `Io` error with kind `NotFound`.
    fn read_text(&self, path: &Path) -> Result<String>;

    /// Replace the whole file, creating parent directories as needed.
    fn write_text(&self, path: &Path, text: &str) -> Result<()>;

    /// Source files under `root` whose extension is in `extensions`, sorted.
    fn list_files(
        &self,
        root: &Path,
        extensions: &[String],
        respect_gitignore: bool,
    ) -> Result<Vec<PathBuf>>;
}

/// The local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStore;

impl FileStore for LocalFileStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| EngineError::io(path, e))
    }

    fn write_text(&self, path: &Path, text: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
        }
        fs::write(path, text).map_err(|e| EngineError::io(path, e))
    }

    fn list_files(
        &self,
        root: &Path,
        extensions: &[String],
        respect_gitignore: bool,
    ) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(EngineError::NotFound(format!(
                "directory {}",
                root.display()
            )));
        }

        let mut files: Vec<PathBuf> = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(respect_gitignore)
            .git_global(respect_gitignore)
            .git_exclude(respect_gitignore)
            .require_git(false)
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
            })
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parents_and_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/Widget.cs");
        let store = LocalFileStore;

        assert!(!store.exists(&path));
        store.write_text(&path, "class Widget {}").unwrap();
        assert!(store.exists(&path));
        assert_eq!(store.read_text(&path).unwrap(), "class Widget {}");
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = LocalFileStore.read_text(&dir.path().join("Missing.cs")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_files_filters_and_respects_gitignore() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join(".gitignore"), "bin/\n").unwrap();
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("bin/Generated.cs"), "class G {}").unwrap();
        fs::write(root.join("src/B.cs"), "class B {}").unwrap();
        fs::write(root.join("src/A.CS"), "class A {}").unwrap();
        fs::write(root.join("src/notes.txt"), "").unwrap();

        let store = LocalFileStore;
        let exts = vec!["cs".to_string()];
        let files = store.list_files(root, &exts, true).unwrap();
        assert_eq!(files, vec![root.join("src/A.CS"), root.join("src/B.cs")]);

        let all = store.list_files(root, &exts, false).unwrap();
        assert_eq!(all.len(), 3);

        assert!(store.list_files(&root.join("nope"), &exts, true).is_err());
    }
}

//! Shared cache of parsed type descriptions.
//!
//! Keyed by `(file, type identity)`, see [`TypeDescription::identity`], so
//! `Result` and `Result<T>` in one file are separate entries. Every write
//! path invalidates the whole file it touched, so an entry never outlives the
//! text it was parsed from.

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::model::TypeDescription;

type Key = (PathBuf, String);

#[derive(Debug, Default)]
pub struct StructureCache {
    entries: RwLock<HashMap<Key, TypeDescription>>,
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub types: usize,
    pub files: usize,
}

impl StructureCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoning is ignored: no mutation here can leave the map half-written.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Key, TypeDescription>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Key, TypeDescription>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// First declaration (by line) named `type_name` in `file`.
    pub fn get(&self, file: &Path, type_name: &str) -> Option<TypeDescription> {
        self.read()
            .iter()
            .filter(|((f, _), ty)| f == file && ty.name == type_name)
            .map(|(_, ty)| ty)
            .min_by_key(|ty| ty.start_line)
            .cloned()
    }

    /// Insert or replace the entry for `ty.owning_file` / `ty.identity()`.
    pub fn put(&self, ty: TypeDescription) {
        let key = (ty.owning_file.clone(), ty.identity());
        self.write().insert(key, ty);
    }

    /// Replace everything cached for `file` with `types`.
    pub fn replace_file(&self, file: &Path, types: Vec<TypeDescription>) {
        let mut map = self.write();
        map.retain(|(f, _), _| f != file);
        for ty in types {
            map.insert((file.to_path_buf(), ty.identity()), ty);
        }
    }

    /// Drop every entry owned by `file`. Returns how many were dropped.
    pub fn invalidate_file(&self, file: &Path) -> usize {
        let mut map = self.write();
        let before = map.len();
        map.retain(|(f, _), _| f != file);
        before - map.len()
    }

    pub fn invalidate_all(&self) {
        self.write().clear();
    }

    /// All cached descriptions, ordered by file then start line.
    pub fn entries(&self) -> Vec<TypeDescription> {
        let mut all: Vec<TypeDescription> = self.read().values().cloned().collect();
        all.sort_by(|a, b| {
            a.owning_file
                .cmp(&b.owning_file)
                .then(a.start_line.cmp(&b.start_line))
                .then_with(|| a.name.cmp(&b.name))
        });
        all
    }

    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.read().keys().map(|(f, _)| f.clone()).collect();
        files.sort();
        files.dedup();
        files
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            types: self.len(),
            files: self.files().len(),
        }
    }
}

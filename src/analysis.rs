//! Analysis service: builds structural descriptions from source files.
//!
//! Single-type lookups go through the cache. Whole-file parsing always reads
//! the file fresh and never touches the cache, so callers that go on to
//! mutate the result never hold a copy visible to queries.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::cache::StructureCache;
use crate::error::{EngineError, Result};
use crate::model::TypeDescription;
use crate::store::FileStore;
use crate::syntax::SyntaxProvider;

/// What kind of manifest a project summary was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestKind {
    Solution,
    Project,
}

/// A project listed in a solution file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    /// Path as written in the solution, with `/` separators.
    pub path: String,
}

/// Result of project discovery. No file under the project is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub manifest_path: PathBuf,
    pub kind: ManifestKind,
    pub name: String,
    pub root_dir: PathBuf,
    pub source_file_count: usize,
    /// Projects referenced by a solution; empty for a project manifest.
    pub projects: Vec<ProjectEntry>,
    pub target_framework: Option<String>,
}

pub struct AnalysisService {
    syntax: Arc<dyn SyntaxProvider>,
    store: Arc<dyn FileStore>,
    cache: Arc<StructureCache>,
}

impl AnalysisService {
    pub fn new(
        syntax: Arc<dyn SyntaxProvider>,
        store: Arc<dyn FileStore>,
        cache: Arc<StructureCache>,
    ) -> Self {
        Self {
            syntax,
            store,
            cache,
        }
    }

    /// One type by name, served from the cache when possible.
    ///
    /// On a miss the file is parsed and the first type with a matching name
    /// is cached and returned.
    pub fn parse_single_type(&self, file: &Path, type_name: &str) -> Result<TypeDescription> {
        if let Some(ty) = self.cache.get(file, type_name) {
            debug!(file = %file.display(), type_name, "cache hit");
            return Ok(ty);
        }
        debug!(file = %file.display(), type_name, "cache miss");

        let ty = self
            .parse_all_types(file)?
            .into_iter()
            .find(|t| t.name == type_name)
            .ok_or_else(|| EngineError::type_not_found(type_name, file))?;
        self.cache.put(ty.clone());
        Ok(ty)
    }

    /// Every type declared in `file`, nested ones included, parsed from disk.
    pub fn parse_all_types(&self, file: &Path) -> Result<Vec<TypeDescription>> {
        let source = self.store.read_text(file)?;
        let types = self.syntax.parse_types(&source, file)?;
        debug!(file = %file.display(), types = types.len(), "parsed file");
        Ok(types)
    }

    /// Locate a solution (preferred) or project manifest at or under `path`.
    pub fn analyze_project(&self, path: &Path) -> Result<ProjectSummary> {
        let manifest = self.find_manifest(path)?;
        let kind = match extension_of(&manifest).as_deref() {
            Some("sln") => ManifestKind::Solution,
            _ => ManifestKind::Project,
        };
        let text = self.store.read_text(&manifest)?;
        let root_dir = manifest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let name = manifest
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let extensions: Vec<String> = self
            .syntax
            .language()
            .extensions()
            .iter()
            .map(|e| e.to_string())
            .collect();
        let source_file_count = self.store.list_files(&root_dir, &extensions, true)?.len();

        let (projects, target_framework) = match kind {
            ManifestKind::Solution => (solution_projects(&text), None),
            ManifestKind::Project => (Vec::new(), target_framework(&text)),
        };

        debug!(manifest = %manifest.display(), source_file_count, "analyzed project");
        Ok(ProjectSummary {
            manifest_path: manifest,
            kind,
            name,
            root_dir,
            source_file_count,
            projects,
            target_framework,
        })
    }

    fn find_manifest(&self, path: &Path) -> Result<PathBuf> {
        if self.store.exists(path) {
            return match extension_of(path).as_deref() {
                Some("sln") | Some("csproj") => Ok(path.to_path_buf()),
                _ => Err(EngineError::InvalidInput(format!(
                    "{} is not a solution or project file",
                    path.display()
                ))),
            };
        }

        for ext in ["sln", "csproj"] {
            let found = self.store.list_files(path, &[ext.to_string()], true)?;
            // Shallowest manifest wins; ties keep sorted path order.
            if let Some(manifest) = found.into_iter().min_by_key(|p| p.components().count()) {
                return Ok(manifest);
            }
        }
        Err(EngineError::NotFound(format!(
            "no .sln or .csproj under {}",
            path.display()
        )))
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// `Project("{guid}") = "Name", "Dir\Name.csproj", "{guid}"` lines.
/// Solution folders, which have no project file, are skipped.
fn solution_projects(text: &str) -> Vec<ProjectEntry> {
    text.lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("Project(")?;
            let (_, values) = rest.split_once('=')?;
            let mut parts = values.split(',').map(|p| p.trim().trim_matches('"'));
            let name = parts.next()?.to_string();
            let path = parts.next()?.replace('\\', "/");
            if !path.ends_with("proj") {
                return None;
            }
            Some(ProjectEntry { name, path })
        })
        .collect()
}

fn target_framework(text: &str) -> Option<String> {
    ["TargetFramework", "TargetFrameworks"].iter().find_map(|tag| {
        let open = format!("<{}>", tag);
        let close = format!("</{}>", tag);
        let start = text.find(&open)? + open.len();
        let len = text[start..].find(&close)?;
        Some(text[start..start + len].trim().to_string())
    })
}

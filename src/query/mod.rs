//! Query service: read-only search over the structure cache.
//!
//! Queries see exactly what is cached. A type that was never looked up or
//! indexed is invisible here. [`QueryService::index_directory`] fills the
//! cache explicitly; with `[index].root` configured, a query that meets an
//! empty cache indexes that root first.

pub mod pattern;
pub mod textual;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::cache::StructureCache;
use crate::config::IndexConfig;
use crate::error::Result;
use crate::model::{MethodDescription, TypeDescription};
use crate::store::FileStore;
use crate::syntax::SyntaxProvider;

pub use pattern::NamePattern;
pub use textual::{Confidence, ReferenceKind, TextualReference, TextualReferenceScan};

/// Outcome of a directory index run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub files: usize,
    pub types: usize,
    /// Files that could not be read or parsed.
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMatch {
    pub type_name: String,
    pub file: PathBuf,
    pub method: MethodDescription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUsages {
    pub file: PathBuf,
    pub references: Vec<TextualReference>,
}

/// References to a symbol grouped by file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    pub symbol: String,
    pub total: usize,
    pub files: Vec<FileUsages>,
}

/// Direct references plus one level of referrers of the referencing types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeImpact {
    pub symbol: String,
    pub direct: Vec<TextualReference>,
    pub indirect: Vec<TextualReference>,
    pub affected_types: Vec<String>,
    pub affected_files: Vec<PathBuf>,
}

pub struct QueryService {
    syntax: Arc<dyn SyntaxProvider>,
    store: Arc<dyn FileStore>,
    cache: Arc<StructureCache>,
    /// `root` is already resolved against the project root.
    index: IndexConfig,
}

impl QueryService {
    pub fn new(
        syntax: Arc<dyn SyntaxProvider>,
        store: Arc<dyn FileStore>,
        cache: Arc<StructureCache>,
        index: IndexConfig,
    ) -> Self {
        Self {
            syntax,
            store,
            cache,
            index,
        }
    }

    // ─── Index ─────────────────────────────────────────────────

    /// Parse every source file under `root` and cache all of its types.
    ///
    /// Files are parsed in parallel. Unreadable or unparsable files are
    /// skipped with a warning rather than failing the run.
    pub fn index_directory(&self, root: &Path) -> Result<IndexStats> {
        let files = self
            .store
            .list_files(root, &self.index.extensions, self.index.respect_gitignore)?;
        let parsed: Mutex<Vec<(PathBuf, Vec<TypeDescription>)>> =
            Mutex::new(Vec::with_capacity(files.len()));

        files.par_iter().for_each(|file| {
            let result = self
                .store
                .read_text(file)
                .and_then(|source| self.syntax.parse_types(&source, file));
            match result {
                Ok(types) => {
                    if let Ok(mut parsed) = parsed.lock() {
                        parsed.push((file.clone(), types));
                    }
                }
                Err(e) => warn!(file = %file.display(), error = %e, "skipping file"),
            }
        });

        let parsed = parsed.into_inner().unwrap_or_default();
        let mut stats = IndexStats {
            files: parsed.len(),
            skipped: files.len() - parsed.len(),
            types: 0,
        };
        for (file, types) in parsed {
            stats.types += types.len();
            self.cache.replace_file(&file, types);
        }

        info!(
            root = %root.display(),
            files = stats.files,
            types = stats.types,
            skipped = stats.skipped,
            "indexed directory"
        );
        Ok(stats)
    }

    /// Current cache contents, indexing the configured root first if the
    /// cache is empty.
    pub fn cached_types(&self) -> Vec<TypeDescription> {
        if self.cache.is_empty() {
            if let Some(root) = &self.index.root {
                debug!(root = %root.display(), "cache empty, indexing configured root");
                if let Err(e) = self.index_directory(root) {
                    warn!(root = %root.display(), error = %e, "lazy index failed");
                }
            }
        }
        self.cache.entries()
    }

    // ─── Search ────────────────────────────────────────────────

    pub fn find_types_by_name(&self, pattern: &str) -> Vec<TypeDescription> {
        let pattern = NamePattern::new(pattern);
        let types = self.cached_types();
        if pattern.is_wildcard() {
            return types;
        }
        types.into_iter().filter(|t| pattern.matches(&t.name)).collect()
    }

    /// Methods whose return type and name match the glob-lite patterns.
    ///
    /// An empty `param_types` accepts any parameter list; otherwise counts
    /// must agree and each position must match its pattern.
    pub fn find_methods_by_signature(
        &self,
        return_type: &str,
        name: &str,
        param_types: &[String],
    ) -> Vec<MethodMatch> {
        let return_pattern = NamePattern::new(return_type);
        let name_pattern = NamePattern::new(name);
        let param_patterns: Vec<NamePattern> =
            param_types.iter().map(|p| NamePattern::new(p)).collect();

        let mut matches = Vec::new();
        for ty in self.cached_types() {
            for method in &ty.members.methods {
                if !name_pattern.matches(&method.name)
                    || !return_pattern.matches(&method.return_type)
                {
                    continue;
                }
                if !param_patterns.is_empty()
                    && (method.parameters.len() != param_patterns.len()
                        || !method
                            .parameters
                            .iter()
                            .zip(&param_patterns)
                            .all(|(p, pat)| pat.matches(&p.type_name)))
                {
                    continue;
                }
                matches.push(MethodMatch {
                    type_name: ty.name.clone(),
                    file: ty.owning_file.clone(),
                    method: method.clone(),
                });
            }
        }
        matches
    }

    /// Types with an attribute whose text contains `attribute`.
    pub fn find_types_with_attribute(&self, attribute: &str) -> Vec<TypeDescription> {
        self.cached_types()
            .into_iter()
            .filter(|t| t.attributes.iter().any(|a| a.contains(attribute)))
            .collect()
    }

    // ─── References (heuristic) ────────────────────────────────

    /// Approximate references to a type, or to one of its members.
    ///
    /// See [`textual`] for what "reference" means here.
    pub fn find_all_references(
        &self,
        type_name: &str,
        member: Option<&str>,
    ) -> Vec<TextualReference> {
        let types = self.cached_types();
        let scan = TextualReferenceScan::new(&types);
        match member {
            Some(member) => scan.member_references(member),
            None => scan.type_references(type_name),
        }
    }

    pub fn get_usages(&self, type_name: &str, member: Option<&str>) -> UsageReport {
        let refs = self.find_all_references(type_name, member);
        let total = refs.len();

        let mut by_file: BTreeMap<PathBuf, Vec<TextualReference>> = BTreeMap::new();
        for r in refs {
            by_file.entry(r.file.clone()).or_default().push(r);
        }

        UsageReport {
            symbol: symbol_name(type_name, member),
            total,
            files: by_file
                .into_iter()
                .map(|(file, references)| FileUsages { file, references })
                .collect(),
        }
    }

    pub fn get_change_impact(&self, type_name: &str, member: Option<&str>) -> ChangeImpact {
        let types = self.cached_types();
        let scan = TextualReferenceScan::new(&types);
        let direct = match member {
            Some(member) => scan.member_references(member),
            None => scan.type_references(type_name),
        };

        let owners: BTreeSet<&str> = direct.iter().map(|r| r.owner_type.as_str()).collect();
        let mut indirect = Vec::new();
        for owner in &owners {
            for r in scan.type_references(owner) {
                if r.owner_type != type_name
                    && !owners.contains(r.owner_type.as_str())
                    && !indirect.contains(&r)
                {
                    indirect.push(r);
                }
            }
        }

        let affected_types: BTreeSet<String> = direct
            .iter()
            .chain(indirect.iter())
            .map(|r| r.owner_type.clone())
            .collect();
        let affected_files: BTreeSet<PathBuf> = direct
            .iter()
            .chain(indirect.iter())
            .map(|r| r.file.clone())
            .collect();

        ChangeImpact {
            symbol: symbol_name(type_name, member),
            direct,
            indirect,
            affected_types: affected_types.into_iter().collect(),
            affected_files: affected_files.into_iter().collect(),
        }
    }

    /// Sorted files containing at least one reference to `type_name`.
    pub fn get_dependent_files(&self, type_name: &str) -> Vec<PathBuf> {
        let files: BTreeSet<PathBuf> = self
            .find_all_references(type_name, None)
            .into_iter()
            .map(|r| r.file)
            .collect();
        files.into_iter().collect()
    }
}

fn symbol_name(type_name: &str, member: Option<&str>) -> String {
    match member {
        Some(member) => format!("{}.{}", type_name, member),
        None => type_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeKind;
    use crate::store::LocalFileStore;
    use crate::syntax::CSharpSyntax;
    use std::fs;
    use tempfile::TempDir;

    fn service(cache: Arc<StructureCache>, index: IndexConfig) -> QueryService {
        QueryService::new(
            Arc::new(CSharpSyntax::new()),
            Arc::new(LocalFileStore),
            cache,
            index,
        )
    }

    fn cached(name: &str, file: &str) -> TypeDescription {
        let mut ty = TypeDescription::new(name, TypeKind::Class);
        ty.owning_file = PathBuf::from(file);
        ty
    }

    #[test]
    fn test_find_types_by_name_sees_only_cache() {
        let cache = Arc::new(StructureCache::new());
        for name in ["TestClass", "TestService", "Other"] {
            cache.put(cached(name, &format!("{}.cs", name)));
        }
        let queries = service(cache, IndexConfig::default());

        let mut names: Vec<String> = queries
            .find_types_by_name("Test*")
            .into_iter()
            .map(|t| t.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["TestClass", "TestService"]);
        assert_eq!(queries.find_types_by_name("*").len(), 3);
    }

    #[test]
    fn test_empty_cache_without_root_stays_empty() {
        let queries = service(Arc::new(StructureCache::new()), IndexConfig::default());
        assert!(queries.find_types_by_name("*").is_empty());
    }

    #[test]
    fn test_lazy_index_of_configured_root() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("Api.cs"),
            "[ApiController]\npublic class UsersController { public Task<User> GetAsync(int id, string name) { return null; } }\n",
        )
        .unwrap();
        fs::write(dir.path().join("User.cs"), "public class User { }\n").unwrap();

        let cache = Arc::new(StructureCache::new());
        let index = IndexConfig {
            root: Some(dir.path().to_path_buf()),
            ..IndexConfig::default()
        };
        let queries = service(cache.clone(), index);

        let found = queries.find_types_with_attribute("ApiController");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "UsersController");
        assert_eq!(cache.len(), 2);

        let methods =
            queries.find_methods_by_signature("Task*", "Get*", &["int".into(), "str*".into()]);
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].type_name, "UsersController");
        assert!(queries
            .find_methods_by_signature("*", "Get*", &["int".into()])
            .is_empty());
        assert_eq!(queries.find_methods_by_signature("*", "*", &[]).len(), 1);
    }

    #[test]
    fn test_index_directory_counts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.cs"), "class A { } class B { }").unwrap();
        fs::write(dir.path().join("C.cs"), "class C { }").unwrap();
        let cache = Arc::new(StructureCache::new());
        let queries = service(cache.clone(), IndexConfig::default());

        let stats = queries.index_directory(dir.path()).unwrap();
        assert_eq!(stats, IndexStats { files: 2, types: 3, skipped: 0 });
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_usages_impact_and_dependents() {
        let cache = Arc::new(StructureCache::new());
        let mut repo_user = cached("OrderService", "Services/OrderService.cs");
        repo_user.base_type = Some("Repository".to_string());
        let mut controller = cached("OrderController", "Web/OrderController.cs");
        controller
            .members
            .fields
            .push(crate::model::FieldDescription::new("_service", "OrderService"));
        cache.put(cached("Repository", "Data/Repository.cs"));
        cache.put(repo_user);
        cache.put(controller);
        let queries = service(cache, IndexConfig::default());

        let usages = queries.get_usages("Repository", None);
        assert_eq!(usages.total, 1);
        assert_eq!(usages.files[0].file, PathBuf::from("Services/OrderService.cs"));

        let impact = queries.get_change_impact("Repository", None);
        assert_eq!(impact.direct.len(), 1);
        assert_eq!(impact.indirect.len(), 1);
        assert_eq!(impact.indirect[0].owner_type, "OrderController");
        assert_eq!(impact.affected_types, vec!["OrderController", "OrderService"]);

        assert_eq!(
            queries.get_dependent_files("OrderService"),
            vec![PathBuf::from("Web/OrderController.cs")]
        );
    }
}

//! The `CodeStructureEngine` facade: one entry point over all services.
//!
//! All services share one syntax provider, one file store and one cache.

use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::analysis::{AnalysisService, ProjectSummary};
use crate::batch::{BatchReport, BatchService};
use crate::cache::{CacheStats, StructureCache};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::model::{
    FieldDescription, MemberKind, MethodDescription, Parameter, PropertyDescription,
    TypeDescription, TypeKind, Visibility,
};
use crate::modification::{normalize_body, ModificationService, TypePatch};
use crate::query::{ChangeImpact, IndexStats, MethodMatch, QueryService, TextualReference, UsageReport};
use crate::refactoring::{RefactoringService, RenameReport};
use crate::store::{FileStore, LocalFileStore};
use crate::syntax::{CSharpSyntax, SyntaxProvider};
use crate::validation::ValidationService;

pub struct CodeStructureEngine {
    config: EngineConfig,
    syntax: Arc<dyn SyntaxProvider>,
    cache: Arc<StructureCache>,
    analysis: Arc<AnalysisService>,
    query: Arc<QueryService>,
    modification: Arc<ModificationService>,
    refactoring: RefactoringService,
    validation: ValidationService,
    batch: BatchService,
}

impl CodeStructureEngine {
    /// C# engine on the local filesystem.
    pub fn new(config: EngineConfig) -> Self {
        let syntax = Arc::new(CSharpSyntax::with_indent_width(
            config.generation.indent_width,
        ));
        Self::with_components(config, syntax, Arc::new(LocalFileStore))
    }

    /// Engine for a project directory, configured from
    /// `<root>/.typeforge/config.toml` with the index root resolved against
    /// `root`.
    pub fn open(root: &Path) -> Self {
        let mut config = EngineConfig::load(&EngineConfig::path_for_root(root));
        config.index.root = config.resolve_index_root(root);
        Self::new(config)
    }

    pub fn with_components(
        config: EngineConfig,
        syntax: Arc<dyn SyntaxProvider>,
        store: Arc<dyn FileStore>,
    ) -> Self {
        let cache = Arc::new(StructureCache::new());
        let analysis = Arc::new(AnalysisService::new(
            syntax.clone(),
            store.clone(),
            cache.clone(),
        ));
        let query = Arc::new(QueryService::new(
            syntax.clone(),
            store.clone(),
            cache.clone(),
            config.index.clone(),
        ));
        let modification = Arc::new(ModificationService::new(
            analysis.clone(),
            syntax.clone(),
            store,
            cache.clone(),
        ));
        let refactoring =
            RefactoringService::new(analysis.clone(), query.clone(), modification.clone());
        let validation = ValidationService::new(analysis.clone());
        let batch = BatchService::new(modification.clone());

        debug!(language = syntax.language().name(), "engine ready");
        Self {
            config,
            syntax,
            cache,
            analysis,
            query,
            modification,
            refactoring,
            validation,
            batch,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ─── Analysis ──────────────────────────────────────────────

    pub fn parse_type(&self, file: &Path, type_name: &str) -> Result<TypeDescription> {
        self.analysis.parse_single_type(file, type_name)
    }

    pub fn parse_all_types(&self, file: &Path) -> Result<Vec<TypeDescription>> {
        self.analysis.parse_all_types(file)
    }

    pub fn analyze_project(&self, path: &Path) -> Result<ProjectSummary> {
        self.analysis.analyze_project(path)
    }

    // ─── Queries ───────────────────────────────────────────────

    pub fn index_directory(&self, root: &Path) -> Result<IndexStats> {
        self.query.index_directory(root)
    }

    pub fn find_types_by_name(&self, pattern: &str) -> Vec<TypeDescription> {
        self.query.find_types_by_name(pattern)
    }

    pub fn find_methods_by_signature(
        &self,
        return_type: &str,
        name: &str,
        param_types: &[String],
    ) -> Vec<MethodMatch> {
        self.query.find_methods_by_signature(return_type, name, param_types)
    }

    pub fn find_types_with_attribute(&self, attribute: &str) -> Vec<TypeDescription> {
        self.query.find_types_with_attribute(attribute)
    }

    pub fn find_all_references(&self, type_name: &str, member: Option<&str>) -> Vec<TextualReference> {
        self.query.find_all_references(type_name, member)
    }

    pub fn get_usages(&self, type_name: &str, member: Option<&str>) -> UsageReport {
        self.query.get_usages(type_name, member)
    }

    pub fn get_change_impact(&self, type_name: &str, member: Option<&str>) -> ChangeImpact {
        self.query.get_change_impact(type_name, member)
    }

    pub fn get_dependent_files(&self, type_name: &str) -> Vec<std::path::PathBuf> {
        self.query.get_dependent_files(type_name)
    }

    // ─── Cache ─────────────────────────────────────────────────

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }

    // ─── Type edits ────────────────────────────────────────────

    pub fn modify_type(&self, file: &Path, type_name: &str, patch: TypePatch) -> Result<()> {
        self.modification.modify_type(file, type_name, patch)
    }

    pub fn rename_symbol(
        &self,
        old_name: &str,
        new_name: &str,
        type_name: Option<&str>,
    ) -> Result<RenameReport> {
        self.refactoring.rename_symbol(old_name, new_name, type_name)
    }

    pub fn create_type(&self, file: &Path, ty: TypeDescription) -> Result<()> {
        self.modification.create_type(file, ty)
    }

    pub fn create_type_from_source(&self, file: &Path, source: &str) -> Result<()> {
        self.modification.create_type_from_source(file, source)
    }

    /// Create a public type with no members from a kind token such as `"struct"`.
    pub fn create_empty_type(
        &self,
        file: &Path,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<()> {
        let kind: TypeKind = kind.parse()?;
        let ty = TypeDescription::new(name, kind)
            .with_namespace(namespace.unwrap_or_default())
            .with_visibility(Visibility::Public);
        self.create_type(file, ty)
    }

    pub fn remove_type(&self, file: &Path, type_name: &str) -> Result<()> {
        self.modification.remove_type(file, type_name)
    }

    pub fn add_interface(&self, file: &Path, type_name: &str, interface: &str) -> Result<()> {
        self.modification.add_interface(file, type_name, interface)
    }

    pub fn remove_interface(&self, file: &Path, type_name: &str, interface: &str) -> Result<()> {
        self.modification.remove_interface(file, type_name, interface)
    }

    pub fn change_base_class(&self, file: &Path, type_name: &str, base: Option<&str>) -> Result<()> {
        self.modification.change_base_class(file, type_name, base)
    }

    pub fn generate_code(&self, ty: &TypeDescription) -> String {
        self.syntax.generate_type(ty)
    }

    pub fn regenerate_file(&self, file: &Path, types: &[TypeDescription]) -> Result<()> {
        self.modification.regenerate_file(file, types)
    }

    // ─── Methods ───────────────────────────────────────────────

    pub fn add_method(&self, file: &Path, type_name: &str, source: &str) -> Result<()> {
        self.modification.add_method(file, type_name, source)
    }

    pub fn remove_method(&self, file: &Path, type_name: &str, name: &str) -> Result<()> {
        self.modification.remove_method(file, type_name, name)
    }

    pub fn replace_method(&self, file: &Path, type_name: &str, name: &str, source: &str) -> Result<()> {
        self.modification.replace_method(file, type_name, name, source)
    }

    pub fn get_method(&self, file: &Path, type_name: &str, name: &str) -> Result<MethodDescription> {
        self.modification.get_method(file, type_name, name)
    }

    pub fn get_method_body(&self, file: &Path, type_name: &str, name: &str) -> Result<String> {
        self.modification.get_method_body(file, type_name, name)
    }

    pub fn update_method_body(&self, file: &Path, type_name: &str, name: &str, body: &str) -> Result<()> {
        self.modification.update_method_body(file, type_name, name, body)
    }

    pub fn add_public_method(
        &self,
        file: &Path,
        type_name: &str,
        name: &str,
        return_type: &str,
        parameters: Vec<Parameter>,
        body: &str,
    ) -> Result<()> {
        let method = simple_method(Visibility::Public, name, return_type, parameters, body);
        self.modification.add_member(file, type_name, method)
    }

    pub fn add_private_method(
        &self,
        file: &Path,
        type_name: &str,
        name: &str,
        return_type: &str,
        parameters: Vec<Parameter>,
        body: &str,
    ) -> Result<()> {
        let method = simple_method(Visibility::Private, name, return_type, parameters, body);
        self.modification.add_member(file, type_name, method)
    }

    // ─── Properties and fields ─────────────────────────────────

    pub fn add_property(&self, file: &Path, type_name: &str, source: &str) -> Result<()> {
        self.modification.add_property(file, type_name, source)
    }

    pub fn remove_property(&self, file: &Path, type_name: &str, name: &str) -> Result<()> {
        self.modification.remove_property(file, type_name, name)
    }

    pub fn replace_property(&self, file: &Path, type_name: &str, name: &str, source: &str) -> Result<()> {
        self.modification.replace_property(file, type_name, name, source)
    }

    pub fn get_property(&self, file: &Path, type_name: &str, name: &str) -> Result<PropertyDescription> {
        self.modification.get_property(file, type_name, name)
    }

    /// Add `public <type> <name> { get; set; }`.
    pub fn add_public_property(&self, file: &Path, type_name: &str, name: &str, prop_type: &str) -> Result<()> {
        let mut prop = PropertyDescription::auto(name, prop_type);
        prop.visibility = Visibility::Public;
        self.modification.add_member(file, type_name, prop)
    }

    pub fn add_field(&self, file: &Path, type_name: &str, source: &str) -> Result<()> {
        self.modification.add_field(file, type_name, source)
    }

    pub fn remove_field(&self, file: &Path, type_name: &str, name: &str) -> Result<()> {
        self.modification.remove_field(file, type_name, name)
    }

    pub fn replace_field(&self, file: &Path, type_name: &str, name: &str, source: &str) -> Result<()> {
        self.modification.replace_field(file, type_name, name, source)
    }

    pub fn get_field(&self, file: &Path, type_name: &str, name: &str) -> Result<FieldDescription> {
        self.modification.get_field(file, type_name, name)
    }

    /// Add `private <type> <name>;`.
    pub fn add_private_field(&self, file: &Path, type_name: &str, name: &str, field_type: &str) -> Result<()> {
        let mut field = FieldDescription::new(name, field_type);
        field.visibility = Visibility::Private;
        self.modification.add_member(file, type_name, field)
    }

    /// Remove a member given a kind token (`method`, `property`, `field`, `event`).
    pub fn remove_member(&self, file: &Path, type_name: &str, kind: &str, name: &str) -> Result<()> {
        match kind.parse::<MemberKind>()? {
            MemberKind::Method => self.modification.remove_method(file, type_name, name),
            MemberKind::Property => self.modification.remove_property(file, type_name, name),
            MemberKind::Field => self.modification.remove_field(file, type_name, name),
            MemberKind::Event => self.modification.remove_event(file, type_name, name),
        }
    }

    // ─── Interfaces ────────────────────────────────────────────

    pub fn create_interface(&self, file: &Path, name: &str, namespace: Option<&str>) -> Result<()> {
        self.create_empty_type(file, TypeKind::Interface.keyword(), name, namespace)
    }

    fn require_interface(&self, file: &Path, interface: &str) -> Result<()> {
        let ty = self.analysis.parse_single_type(file, interface)?;
        if ty.kind != TypeKind::Interface {
            return Err(EngineError::InvalidInput(format!(
                "'{}' is a {}, not an interface",
                interface, ty.kind
            )));
        }
        Ok(())
    }

    pub fn add_method_to_interface(&self, file: &Path, interface: &str, source: &str) -> Result<()> {
        self.require_interface(file, interface)?;
        self.modification.add_method(file, interface, source)
    }

    pub fn remove_method_from_interface(&self, file: &Path, interface: &str, name: &str) -> Result<()> {
        self.require_interface(file, interface)?;
        self.modification.remove_method(file, interface, name)
    }

    pub fn add_property_to_interface(&self, file: &Path, interface: &str, source: &str) -> Result<()> {
        self.require_interface(file, interface)?;
        self.modification.add_property(file, interface, source)
    }

    // ─── Batch ─────────────────────────────────────────────────

    pub fn add_methods(&self, file: &Path, type_name: &str, sources: &[String]) -> BatchReport {
        self.batch.add_methods(file, type_name, sources)
    }

    pub fn add_properties(&self, file: &Path, type_name: &str, sources: &[String]) -> BatchReport {
        self.batch.add_properties(file, type_name, sources)
    }

    pub fn remove_methods(&self, file: &Path, type_name: &str, names: &[String]) -> BatchReport {
        self.batch.remove_methods(file, type_name, names)
    }

    // ─── Validation ────────────────────────────────────────────

    pub fn type_exists(&self, file: &Path, type_name: &str) -> bool {
        self.validation.type_exists(file, type_name)
    }

    pub fn method_exists(&self, file: &Path, type_name: &str, method: &str) -> bool {
        self.validation.method_exists(file, type_name, method)
    }

    pub fn property_exists(&self, file: &Path, type_name: &str, property: &str) -> bool {
        self.validation.property_exists(file, type_name, property)
    }

    pub fn validate_modification(&self, file: &Path, type_name: &str, operation: &str) -> Vec<String> {
        self.validation.validate_modification(file, type_name, operation)
    }
}

impl Default for CodeStructureEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn simple_method(
    visibility: Visibility,
    name: &str,
    return_type: &str,
    parameters: Vec<Parameter>,
    body: &str,
) -> MethodDescription {
    let mut method = MethodDescription::new(name, return_type);
    method.visibility = visibility;
    method.parameters = parameters;
    method.body = Some(normalize_body(body));
    method
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_convenience_constructors() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("Account.cs");
        fs::write(&file, "namespace Bank { public class Account { } }").unwrap();
        let engine = CodeStructureEngine::default();

        engine
            .add_public_method(
                &file,
                "Account",
                "Deposit",
                "void",
                vec![Parameter::new("decimal", "amount")],
                "_balance += amount;",
            )
            .unwrap();
        engine
            .add_private_method(&file, "Account", "Audit", "bool", Vec::new(), "{ return true; }")
            .unwrap();
        engine
            .add_public_property(&file, "Account", "Owner", "string")
            .unwrap();
        engine
            .add_private_field(&file, "Account", "_balance", "decimal")
            .unwrap();

        let text = fs::read_to_string(&file).unwrap();
        assert!(text.contains("public void Deposit(decimal amount)"));
        assert!(text.contains("private bool Audit()"));
        assert!(text.contains("public string Owner { get; set; }"));
        assert!(text.contains("private decimal _balance;"));

        let ty = engine.parse_type(&file, "Account").unwrap();
        assert_eq!(ty.members.len(), 4);
        assert_eq!(
            engine.get_method_body(&file, "Account", "Audit").unwrap(),
            "return true;"
        );
    }

    #[test]
    fn test_interface_operations() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("Contracts.cs");
        let engine = CodeStructureEngine::default();

        engine.create_interface(&file, "IStore", Some("App")).unwrap();
        engine
            .add_method_to_interface(&file, "IStore", "void Save(string key);")
            .unwrap();
        engine
            .add_property_to_interface(&file, "IStore", "int Count { get; }")
            .unwrap();
        assert!(engine.method_exists(&file, "IStore", "Save"));
        assert!(engine.property_exists(&file, "IStore", "Count"));

        engine
            .remove_method_from_interface(&file, "IStore", "Save")
            .unwrap();
        assert!(!engine.method_exists(&file, "IStore", "Save"));

        engine.create_empty_type(&file, "class", "Store", Some("App")).unwrap();
        let err = engine
            .add_method_to_interface(&file, "Store", "void Save();")
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_kind_tokens_are_checked() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("T.cs");
        fs::write(&file, "class T { int _x; }").unwrap();
        let engine = CodeStructureEngine::default();

        assert!(matches!(
            engine.create_empty_type(&file, "record", "R", None),
            Err(EngineError::Unsupported(_))
        ));
        assert!(matches!(
            engine.remove_member(&file, "T", "constructor", "T"),
            Err(EngineError::Unsupported(_))
        ));
        engine.remove_member(&file, "T", "field", "_x").unwrap();
        assert!(engine.parse_type(&file, "T").unwrap().members.is_empty());
    }

    #[test]
    fn test_open_reads_project_config() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".typeforge")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(
            root.join(".typeforge/config.toml"),
            "[index]\nroot = \"src\"\n\n[generation]\nindent_width = 2\n",
        )
        .unwrap();
        fs::write(root.join("src/Thing.cs"), "class Thing { }").unwrap();

        let engine = CodeStructureEngine::open(root);
        assert_eq!(engine.config().generation.indent_width, 2);
        assert_eq!(engine.find_types_by_name("Thing").len(), 1);
        assert_eq!(engine.cache_stats().types, 1);

        let ty = TypeDescription::new("Thing", TypeKind::Class);
        assert_eq!(engine.generate_code(&ty), "class Thing\n{\n}\n");

        engine.clear_cache();
        assert_eq!(engine.cache_stats().types, 0);
    }
}

//! # typeforge
//!
//! Structural code editing for AI agents.
//!
//! typeforge reads C# source files into structural descriptions (types and
//! their members), lets callers query and edit those descriptions, and
//! writes changes back by regenerating whole files.
//!
//! ## Key Features
//!
//! - **Structural**: edits address types and members by name, never by offset
//! - **Cached**: parsed types are kept in a shared cache that queries read
//! - **Approximate references**: textual scans labelled with a confidence
//! - **Best-effort batches**: per-item reports instead of rollbacks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use typeforge::CodeStructureEngine;
//! use std::path::Path;
//!
//! let engine = CodeStructureEngine::open(Path::new("."));
//! let file = Path::new("src/Widget.cs");
//!
//! engine.add_method(file, "Widget", "public void Draw() { }")?;
//! let widget = engine.parse_type(file, "Widget")?;
//! assert!(widget.members.method("Draw").is_some());
//! # Ok::<(), typeforge::EngineError>(())
//! ```
//!
//! Regeneration is canonical: comments inside bodies survive, but original
//! whitespace and member layout do not.

pub mod analysis;
pub mod batch;
pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod modification;
pub mod query;
pub mod refactoring;
pub mod store;
pub mod syntax;
mod text;
pub mod validation;

// Re-exports for convenience
pub use error::{EngineError, Result};

pub use analysis::{AnalysisService, ManifestKind, ProjectEntry, ProjectSummary};
pub use batch::{BatchItem, BatchReport, BatchService, ItemStatus};
pub use cache::{CacheStats, StructureCache};
pub use config::EngineConfig;
pub use engine::CodeStructureEngine;
pub use model::{
    EventDescription, FieldDescription, Member, MemberCollection, MemberKind, MethodDescription,
    Parameter, PropertyDescription, TypeDescription, TypeKind, TypeModifiers, Visibility,
};
pub use modification::{ModificationService, TypePatch};
pub use query::{
    ChangeImpact, Confidence, IndexStats, MethodMatch, NamePattern, QueryService, ReferenceKind,
    TextualReference, UsageReport,
};
pub use refactoring::{FileRewrite, RefactoringService, RenameReport};
pub use store::{FileStore, LocalFileStore};
pub use syntax::{CSharpSyntax, SourceLanguage, SyntaxProvider};
pub use validation::{Operation, ValidationService};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const TEST_CLASS: &str = "namespace Scenario
{
    public class TestClass
    {
        public void ExistingMethod()
        {
            Console.WriteLine(\"existing\");
        }

        public int MethodToReplace()
        {
            return LegacyComputation(42);
        }

        public void OtherMethod()
        {
            Console.WriteLine(\"other\");
        }
    }
}
";

    fn fixture() -> (TempDir, PathBuf, CodeStructureEngine) {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("TestClass.cs");
        fs::write(&file, TEST_CLASS).unwrap();
        (dir, file, CodeStructureEngine::default())
    }

    fn method_names(engine: &CodeStructureEngine, file: &Path) -> Vec<String> {
        engine.parse_all_types(file).unwrap()[0]
            .members
            .methods
            .iter()
            .map(|m| m.name.clone())
            .collect()
    }

    #[test]
    fn test_add_method_scenario() {
        let (_dir, file, engine) = fixture();
        engine
            .add_method(
                &file,
                "TestClass",
                "public string NewMethod(int x) { return x.ToString(); }",
            )
            .unwrap();

        let names = method_names(&engine, &file);
        assert!(names.contains(&"ExistingMethod".to_string()));
        assert!(names.contains(&"NewMethod".to_string()));

        let types = engine.parse_all_types(&file).unwrap();
        let added = types[0].members.method("NewMethod").unwrap();
        assert_eq!(added.parameters, vec![Parameter::new("int", "x")]);
    }

    #[test]
    fn test_cache_reflects_modification() {
        let (_dir, file, engine) = fixture();
        // Warm the cache first.
        assert!(engine.parse_type(&file, "TestClass").unwrap().members.method("Fresh").is_none());

        engine
            .add_method(&file, "TestClass", "public void Fresh() { }")
            .unwrap();
        let ty = engine.parse_type(&file, "TestClass").unwrap();
        assert!(ty.members.method("Fresh").is_some());
    }

    #[test]
    fn test_failed_preconditions_leave_file_untouched() {
        let (_dir, file, engine) = fixture();

        let err = engine
            .add_method(&file, "TestClass", "public void ExistingMethod() { }")
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyExists(_)));
        assert_eq!(fs::read_to_string(&file).unwrap(), TEST_CLASS);

        let err = engine.remove_method(&file, "TestClass", "Missing").unwrap_err();
        assert!(err.is_not_found());
        let err = engine
            .replace_method(&file, "TestClass", "Missing", "public void Missing() { }")
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(fs::read_to_string(&file).unwrap(), TEST_CLASS);
    }

    #[test]
    fn test_replace_method_scenario() {
        let (_dir, file, engine) = fixture();
        engine
            .replace_method(
                &file,
                "TestClass",
                "MethodToReplace",
                "public int MethodToReplace() { return 7; }",
            )
            .unwrap();

        let text = fs::read_to_string(&file).unwrap();
        assert!(!text.contains("LegacyComputation"));
        assert!(text.contains("Console.WriteLine(\"other\");"));

        let ty = engine.parse_type(&file, "TestClass").unwrap();
        assert_eq!(
            ty.members.method("OtherMethod").unwrap().body.as_deref(),
            Some("Console.WriteLine(\"other\");")
        );
        assert_eq!(
            ty.members.method("MethodToReplace").unwrap().body.as_deref(),
            Some("return 7;")
        );
    }

    #[test]
    fn test_rename_to_same_name_is_noop() {
        let (dir, file, engine) = fixture();
        engine.index_directory(dir.path()).unwrap();

        let report = engine.rename_symbol("TestClass", "TestClass", None).unwrap();
        assert!(report.files.is_empty());
        assert_eq!(fs::read_to_string(&file).unwrap(), TEST_CLASS);
    }

    #[test]
    fn test_wildcard_search_over_cache() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("All.cs");
        fs::write(
            &file,
            "class TestClass { }\nclass TestService { }\nclass Other { }\n",
        )
        .unwrap();
        let engine = CodeStructureEngine::default();
        engine.index_directory(dir.path()).unwrap();

        let mut names: Vec<String> = engine
            .find_types_by_name("Test*")
            .into_iter()
            .map(|t| t.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["TestClass", "TestService"]);
    }

    #[test]
    fn test_rename_base_type_updates_referencing_file() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("OldName.cs");
        let derived = dir.path().join("Derived.cs");
        fs::write(&base, "namespace App { public class OldName { } }").unwrap();
        fs::write(&derived, "namespace App { public class Derived : OldName { } }").unwrap();

        let engine = CodeStructureEngine::default();
        engine.index_directory(dir.path()).unwrap();
        let report = engine
            .rename_symbol("OldName", "NewName", None)
            .unwrap()
            .into_result()
            .unwrap();
        assert!(report.declaration_renamed);

        let text = fs::read_to_string(&derived).unwrap();
        assert!(text.contains("class Derived : NewName"));
        let derived_ty = engine.parse_type(&derived, "Derived").unwrap();
        assert_eq!(derived_ty.base_type.as_deref(), Some("NewName"));
        assert!(engine.type_exists(&base, "NewName"));
    }
}

//! Syntax providers translate between source text and structural
//! descriptions.
//!
//! The engine only talks to [`SyntaxProvider`]. `CSharpSyntax` is the
//! tree-sitter backed implementation shipped with the crate.

pub mod csharp;
pub mod language;

use std::path::Path;

use crate::error::Result;
use crate::model::{Member, TypeDescription};

pub use csharp::CSharpSyntax;
pub use language::SourceLanguage;

/// Parse and generate capability for one source language.
///
/// Generation is canonical: it never tries to reproduce the formatting of
/// the text a description was parsed from.
pub trait SyntaxProvider: Send + Sync {
    fn language(&self) -> SourceLanguage;

    /// Every type declared in `source`, nested declarations included, in
    /// document order. `file` is recorded as the owning file.
    fn parse_types(&self, source: &str, file: &Path) -> Result<Vec<TypeDescription>>;

    /// Parse a snippet declaring exactly one member.
    fn parse_member(&self, snippet: &str) -> Result<Member>;

    /// Parse a snippet declaring exactly one type.
    fn parse_type_snippet(&self, snippet: &str, file: &Path) -> Result<TypeDescription>;

    /// Complete source text for a single type.
    fn generate_type(&self, ty: &TypeDescription) -> String {
        self.generate_file(std::slice::from_ref(ty))
    }

    /// Complete source text for all types of one file.
    fn generate_file(&self, types: &[TypeDescription]) -> String;
}

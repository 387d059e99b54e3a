//! Language detection and tree-sitter grammar loading.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tree_sitter::Language;

/// Source languages with a structural syntax provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceLanguage {
    CSharp,
}

impl SourceLanguage {
    /// Detect language from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_extension(ext)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "cs" => Some(SourceLanguage::CSharp),
            _ => None,
        }
    }

    /// Source file extensions, without the dot.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            SourceLanguage::CSharp => &["cs"],
        }
    }

    /// Get the tree-sitter Language for this language.
    pub fn tree_sitter_language(&self) -> Language {
        match self {
            SourceLanguage::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
        }
    }

    /// Get the display name.
    pub fn name(&self) -> &'static str {
        match self {
            SourceLanguage::CSharp => "C#",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_from_path() {
        assert_eq!(
            SourceLanguage::from_path(Path::new("src/Models/User.cs")),
            Some(SourceLanguage::CSharp)
        );
        assert_eq!(SourceLanguage::from_path(Path::new("main.rs")), None);
        assert_eq!(SourceLanguage::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_grammar_loads() {
        let mut parser = tree_sitter::Parser::new();
        assert!(parser
            .set_language(&SourceLanguage::CSharp.tree_sitter_language())
            .is_ok());
        assert_eq!(SourceLanguage::CSharp.name(), "C#");
    }
}

//! Type-level structural descriptions.
//!
//! A [`TypeDescription`] is always derived from source (or built by a caller
//! for `create_type`). It is never persisted; the cache only memoizes it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::members::{MemberCollection, MemberKind};
use crate::error::EngineError;

/// The kind of a declared type.
///
/// Closed set: every consumer matches exhaustively, so a new kind has to be
/// handled everywhere before the crate compiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    Struct,
    Enum,
    Delegate,
}

impl TypeKind {
    /// Declaration keyword in source.
    pub fn keyword(&self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Struct => "struct",
            TypeKind::Enum => "enum",
            TypeKind::Delegate => "delegate",
        }
    }

    /// Whether a member of `kind` can be added to a type of this kind.
    ///
    /// Enums hold only their values (modelled as fields). A delegate's one
    /// `Invoke` method comes from its declaration, so nothing can be added.
    pub fn accepts_member(&self, kind: MemberKind) -> bool {
        match self {
            TypeKind::Class | TypeKind::Interface | TypeKind::Struct => true,
            TypeKind::Enum => kind == MemberKind::Field,
            TypeKind::Delegate => false,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

impl FromStr for TypeKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "class" => Ok(TypeKind::Class),
            "interface" => Ok(TypeKind::Interface),
            "struct" => Ok(TypeKind::Struct),
            "enum" => Ok(TypeKind::Enum),
            "delegate" => Ok(TypeKind::Delegate),
            other => Err(EngineError::Unsupported(format!(
                "type kind '{}' (expected class, interface, struct, enum or delegate)",
                other
            ))),
        }
    }
}

/// Accessibility of a type or member.
///
/// `Unspecified` means the source carried no accessibility keyword, so the
/// language default applies and none is emitted on regeneration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Unspecified,
    Public,
    Internal,
    Protected,
    Private,
    ProtectedInternal,
    PrivateProtected,
}

impl Visibility {
    /// Source keywords, or `None` when nothing is written.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Visibility::Unspecified => None,
            Visibility::Public => Some("public"),
            Visibility::Internal => Some("internal"),
            Visibility::Protected => Some("protected"),
            Visibility::Private => Some("private"),
            Visibility::ProtectedInternal => Some("protected internal"),
            Visibility::PrivateProtected => Some("private protected"),
        }
    }

    /// Derive accessibility from the modifier keywords of a declaration.
    pub fn from_modifiers<S: AsRef<str>>(modifiers: &[S]) -> Self {
        let has = |kw: &str| modifiers.iter().any(|m| m.as_ref() == kw);
        match (
            has("public"),
            has("internal"),
            has("protected"),
            has("private"),
        ) {
            (true, _, _, _) => Visibility::Public,
            (_, true, true, _) => Visibility::ProtectedInternal,
            (_, _, true, true) => Visibility::PrivateProtected,
            (_, true, _, _) => Visibility::Internal,
            (_, _, true, _) => Visibility::Protected,
            (_, _, _, true) => Visibility::Private,
            _ => Visibility::Unspecified,
        }
    }

    pub fn is_accessibility_keyword(word: &str) -> bool {
        matches!(word, "public" | "internal" | "protected" | "private")
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword().unwrap_or("unspecified"))
    }
}

/// Type-level modifier flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeModifiers {
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_sealed: bool,
    pub is_partial: bool,
}

/// One declared type and its direct members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescription {
    pub name: String,
    /// Dotted namespace, empty for the global namespace.
    pub namespace: String,
    pub owning_file: PathBuf,
    pub kind: TypeKind,
    pub visibility: Visibility,
    pub modifiers: TypeModifiers,
    pub base_type: Option<String>,
    /// Ordered and unique.
    pub implemented_interfaces: Vec<String>,
    pub members: MemberCollection,
    pub usings: Vec<String>,
    /// Attribute text without the surrounding brackets, e.g. `Serializable`.
    pub attributes: Vec<String>,
    /// `///` comment text with the markers stripped.
    pub documentation: Option<String>,
    /// Generic parameter list including angle brackets, e.g. `<T, U>`.
    pub type_parameters: Option<String>,
    /// `where` clauses, one entry per clause.
    pub constraints: Vec<String>,
    /// Dotted path of the enclosing types for nested declarations, e.g.
    /// `Outer.Middle` for `Outer.Middle.Inner`.
    pub declaring_type: Option<String>,
    /// 1-based, `start_line <= end_line`.
    pub start_line: usize,
    pub end_line: usize,
}

impl TypeDescription {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            start_line: 1,
            end_line: 1,
            ..Default::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Namespace-qualified name.
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Path of this type below its namespace, e.g. `Outer.Inner`.
    pub fn nested_path(&self) -> String {
        match &self.declaring_type {
            Some(parent) => format!("{}.{}", parent, self.name),
            None => self.name.clone(),
        }
    }

    /// Number of generic type parameters.
    pub fn arity(&self) -> usize {
        let Some(params) = &self.type_parameters else {
            return 0;
        };
        let mut depth = 0usize;
        let mut count = 1;
        for c in params.chars() {
            match c {
                '<' | '(' | '[' => depth += 1,
                '>' | ')' | ']' => depth = depth.saturating_sub(1),
                ',' if depth == 1 => count += 1,
                _ => {}
            }
        }
        count
    }

    /// Identity of the declaration inside its file: namespace, enclosing
    /// types, name and generic arity, e.g. `App.Outer.Result`1`.
    ///
    /// `Result` and `Result<T>` differ, and so do `A.Node` and `B.Node`.
    pub fn identity(&self) -> String {
        let path = self.nested_path();
        let mut id = if self.namespace.is_empty() {
            path
        } else {
            format!("{}.{}", self.namespace, path)
        };
        let arity = self.arity();
        if arity > 0 {
            id.push('`');
            id.push_str(&arity.to_string());
        }
        id
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.implemented_interfaces.iter().any(|i| i == interface)
    }

    /// Append an interface, keeping the list unique. Returns false on duplicate.
    pub fn add_interface(&mut self, interface: impl Into<String>) -> bool {
        let interface = interface.into();
        if self.implements(&interface) {
            return false;
        }
        self.implemented_interfaces.push(interface);
        true
    }

    /// Remove an interface. Returns false if it was not listed.
    pub fn remove_interface(&mut self, interface: &str) -> bool {
        let before = self.implemented_interfaces.len();
        self.implemented_interfaces.retain(|i| i != interface);
        before != self.implemented_interfaces.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_kind_tokens() {
        assert_eq!("Interface".parse::<TypeKind>().unwrap(), TypeKind::Interface);
        assert_eq!(" enum ".parse::<TypeKind>().unwrap(), TypeKind::Enum);
        assert!(matches!(
            "record".parse::<TypeKind>(),
            Err(EngineError::Unsupported(_))
        ));
    }

    #[test]
    fn test_visibility_from_modifiers() {
        assert_eq!(Visibility::from_modifiers(&["public", "static"]), Visibility::Public);
        assert_eq!(
            Visibility::from_modifiers(&["protected", "internal"]),
            Visibility::ProtectedInternal
        );
        assert_eq!(
            Visibility::from_modifiers(&["private", "protected"]),
            Visibility::PrivateProtected
        );
        assert_eq!(Visibility::from_modifiers(&["static"]), Visibility::Unspecified);
        assert_eq!(Visibility::Unspecified.keyword(), None);
    }

    #[test]
    fn test_interfaces_stay_unique() {
        let mut ty = TypeDescription::new("Repo", TypeKind::Class).with_namespace("App.Data");
        assert!(ty.add_interface("IRepo"));
        assert!(!ty.add_interface("IRepo"));
        assert!(ty.add_interface("IDisposable"));
        assert_eq!(ty.implemented_interfaces, vec!["IRepo", "IDisposable"]);
        assert!(ty.remove_interface("IRepo"));
        assert!(!ty.remove_interface("IRepo"));
        assert_eq!(ty.full_name(), "App.Data.Repo");
    }

    #[test]
    fn test_identity_separates_arity_and_nesting() {
        let plain = TypeDescription::new("Result", TypeKind::Class).with_namespace("App");
        let mut generic = plain.clone();
        generic.type_parameters = Some("<T>".to_string());
        let mut pair = plain.clone();
        pair.type_parameters = Some("<TKey, TValue>".to_string());
        assert_eq!(plain.identity(), "App.Result");
        assert_eq!(generic.identity(), "App.Result`1");
        assert_eq!(pair.arity(), 2);

        let mut node = TypeDescription::new("Node", TypeKind::Class);
        node.declaring_type = Some("A".to_string());
        let mut other = node.clone();
        other.declaring_type = Some("B".to_string());
        assert_eq!(node.nested_path(), "A.Node");
        assert_ne!(node.identity(), other.identity());
    }

    #[test]
    fn test_member_acceptance_by_kind() {
        assert!(TypeKind::Class.accepts_member(MemberKind::Event));
        assert!(TypeKind::Enum.accepts_member(MemberKind::Field));
        assert!(!TypeKind::Enum.accepts_member(MemberKind::Method));
        assert!(!TypeKind::Delegate.accepts_member(MemberKind::Method));
    }
}

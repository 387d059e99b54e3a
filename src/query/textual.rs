//! Approximate reference search over structural descriptions.
//!
//! Nothing here resolves symbols. A reference is a case-insensitive substring
//! hit in a type position or a method body, so results can both over-match
//! (`string` matches a type named `String`) and under-match (aliases, `var`).
//! Every hit carries a [`Confidence`] so callers can weigh it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::TypeDescription;
use crate::text::contains_ignore_case;

/// Where in the referencing type the hit was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    BaseType,
    Interface,
    ReturnType,
    ParameterType,
    PropertyType,
    FieldType,
    EventType,
    MethodBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Found in a declared type position.
    Signature,
    /// Found somewhere in body text.
    Textual,
}

impl ReferenceKind {
    pub fn confidence(&self) -> Confidence {
        match self {
            ReferenceKind::MethodBody => Confidence::Textual,
            _ => Confidence::Signature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextualReference {
    /// Type containing the hit.
    pub owner_type: String,
    pub file: PathBuf,
    pub kind: ReferenceKind,
    pub confidence: Confidence,
    /// Member containing the hit, `None` for base and interface entries.
    pub member: Option<String>,
    /// The text that matched, e.g. the parameter type or the body line.
    pub excerpt: String,
    pub line: usize,
}

/// One pass over a set of cached types.
pub struct TextualReferenceScan<'a> {
    types: &'a [TypeDescription],
}

impl<'a> TextualReferenceScan<'a> {
    pub fn new(types: &'a [TypeDescription]) -> Self {
        Self { types }
    }

    /// Hits for `type_name` in signatures and bodies of every other type.
    pub fn type_references(&self, type_name: &str) -> Vec<TextualReference> {
        let mut refs = Vec::new();
        for ty in self.types.iter().filter(|t| !t.name.eq_ignore_ascii_case(type_name)) {
            let mut hit = |kind: ReferenceKind, member: Option<&str>, excerpt: &str, line: usize| {
                if contains_ignore_case(excerpt, type_name) {
                    refs.push(reference(ty, kind, member, excerpt, line));
                }
            };

            if let Some(base) = &ty.base_type {
                hit(ReferenceKind::BaseType, None, base, ty.start_line);
            }
            for iface in &ty.implemented_interfaces {
                hit(ReferenceKind::Interface, None, iface, ty.start_line);
            }
            for method in &ty.members.methods {
                let name = Some(method.name.as_str());
                if !method.is_constructor {
                    hit(ReferenceKind::ReturnType, name, &method.return_type, method.start_line);
                }
                for param in &method.parameters {
                    hit(ReferenceKind::ParameterType, name, &param.type_name, method.start_line);
                }
            }
            for prop in &ty.members.properties {
                hit(ReferenceKind::PropertyType, Some(prop.name.as_str()), &prop.type_name, prop.start_line);
            }
            for field in &ty.members.fields {
                hit(ReferenceKind::FieldType, Some(field.name.as_str()), &field.type_name, field.start_line);
            }
            for event in &ty.members.events {
                hit(ReferenceKind::EventType, Some(event.name.as_str()), &event.type_name, event.start_line);
            }
        }
        refs.extend(self.body_references(type_name, Some(type_name)));
        refs
    }

    /// Hits for `member_name` in method bodies of every type, its own included.
    pub fn member_references(&self, member_name: &str) -> Vec<TextualReference> {
        self.body_references(member_name, None)
    }

    fn body_references(&self, needle: &str, skip_type: Option<&str>) -> Vec<TextualReference> {
        let mut refs = Vec::new();
        for ty in self
            .types
            .iter()
            .filter(|t| !skip_type.is_some_and(|s| t.name.eq_ignore_ascii_case(s)))
        {
            for method in &ty.members.methods {
                let Some(body) = &method.body else {
                    continue;
                };
                // Approximate: assumes the body starts on the line after the signature.
                let first_body_line = method.start_line + 1;
                for (offset, line) in body.lines().enumerate() {
                    if contains_ignore_case(line, needle) {
                        refs.push(reference(
                            ty,
                            ReferenceKind::MethodBody,
                            Some(method.name.as_str()),
                            line.trim(),
                            first_body_line + offset,
                        ));
                    }
                }
            }
        }
        refs
    }
}

fn reference(
    ty: &TypeDescription,
    kind: ReferenceKind,
    member: Option<&str>,
    excerpt: &str,
    line: usize,
) -> TextualReference {
    TextualReference {
        owner_type: ty.name.clone(),
        file: ty.owning_file.clone(),
        kind,
        confidence: kind.confidence(),
        member: member.map(str::to_string),
        excerpt: excerpt.to_string(),
        line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDescription, MethodDescription, Parameter, TypeKind};

    fn fixtures() -> Vec<TypeDescription> {
        let mut repo = TypeDescription::new("Repository", TypeKind::Class);
        repo.owning_file = PathBuf::from("Repository.cs");
        let mut save = MethodDescription::new("Save", "void");
        save.body = Some("Flush();".to_string());
        repo.members.methods.push(save);

        let mut user_repo = TypeDescription::new("UserRepository", TypeKind::Class);
        user_repo.owning_file = PathBuf::from("UserRepository.cs");
        user_repo.base_type = Some("Repository".to_string());
        user_repo.start_line = 3;
        let mut run = MethodDescription::new("Run", "Task");
        run.start_line = 10;
        run.parameters.push(Parameter::new("IList<Repository>", "all"));
        run.body = Some("var r = new Repository();\nr.Save();".to_string());
        user_repo.members.methods.push(run);
        user_repo
            .members
            .fields
            .push(FieldDescription::new("_name", "string"));
        vec![repo, user_repo]
    }

    #[test]
    fn test_type_references_cover_signatures_and_bodies() {
        let types = fixtures();
        let refs = TextualReferenceScan::new(&types).type_references("repository");

        let kinds: Vec<ReferenceKind> = refs.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ReferenceKind::BaseType,
                ReferenceKind::ParameterType,
                ReferenceKind::MethodBody
            ]
        );
        assert!(refs.iter().all(|r| r.owner_type == "UserRepository"));

        let body = &refs[2];
        assert_eq!(body.confidence, Confidence::Textual);
        assert_eq!(body.line, 11);
        assert_eq!(body.excerpt, "var r = new Repository();");
        assert_eq!(refs[0].confidence, Confidence::Signature);
    }

    #[test]
    fn test_declaring_type_excluded_regardless_of_case() {
        let mut types = fixtures();
        let mut clone = MethodDescription::new("Clone", "Repository");
        clone.body = Some("return new Repository();".to_string());
        types[0].members.methods.push(clone);

        for query in ["Repository", "repository", "REPOSITORY"] {
            let refs = TextualReferenceScan::new(&types).type_references(query);
            assert_eq!(refs.len(), 3, "query {}", query);
            assert!(refs.iter().all(|r| r.owner_type == "UserRepository"));
        }
    }

    #[test]
    fn test_substring_over_match_is_reported() {
        let types = fixtures();
        let refs = TextualReferenceScan::new(&types).type_references("String");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, ReferenceKind::FieldType);
        assert_eq!(refs[0].member.as_deref(), Some("_name"));
    }

    #[test]
    fn test_member_references_include_declaring_type() {
        let types = fixtures();
        let refs = TextualReferenceScan::new(&types).member_references("Save");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].owner_type, "UserRepository");

        let flush = TextualReferenceScan::new(&types).member_references("Flush");
        assert_eq!(flush[0].owner_type, "Repository");
    }
}

//! Read-only precondition checks.
//!
//! Nothing here returns an error. Existence checks answer `false` for any
//! lookup failure, and [`ValidationService::validate_modification`] reports
//! problems as `Error: ...` / `Warning: ...` strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::analysis::AnalysisService;
use crate::error::EngineError;
use crate::model::{MemberKind, TypeDescription, TypeKind};

/// Operations `validate_modification` knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    AddMethod,
    RemoveMethod,
    ReplaceMethod,
    UpdateMethodBody,
    AddProperty,
    RemoveProperty,
    AddField,
    RemoveField,
    AddEvent,
    AddInterface,
    RemoveInterface,
    ChangeBaseClass,
    RemoveType,
}

impl Operation {
    pub const ALL: [Operation; 13] = [
        Operation::AddMethod,
        Operation::RemoveMethod,
        Operation::ReplaceMethod,
        Operation::UpdateMethodBody,
        Operation::AddProperty,
        Operation::RemoveProperty,
        Operation::AddField,
        Operation::RemoveField,
        Operation::AddEvent,
        Operation::AddInterface,
        Operation::RemoveInterface,
        Operation::ChangeBaseClass,
        Operation::RemoveType,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Operation::AddMethod => "add_method",
            Operation::RemoveMethod => "remove_method",
            Operation::ReplaceMethod => "replace_method",
            Operation::UpdateMethodBody => "update_method_body",
            Operation::AddProperty => "add_property",
            Operation::RemoveProperty => "remove_property",
            Operation::AddField => "add_field",
            Operation::RemoveField => "remove_field",
            Operation::AddEvent => "add_event",
            Operation::AddInterface => "add_interface",
            Operation::RemoveInterface => "remove_interface",
            Operation::ChangeBaseClass => "change_base_class",
            Operation::RemoveType => "remove_type",
        }
    }

    /// Member kind an operation adds, removes or rewrites.
    fn member_kind(&self) -> Option<MemberKind> {
        match self {
            Operation::AddMethod
            | Operation::RemoveMethod
            | Operation::ReplaceMethod
            | Operation::UpdateMethodBody => Some(MemberKind::Method),
            Operation::AddProperty | Operation::RemoveProperty => Some(MemberKind::Property),
            Operation::AddField | Operation::RemoveField => Some(MemberKind::Field),
            Operation::AddEvent => Some(MemberKind::Event),
            Operation::AddInterface
            | Operation::RemoveInterface
            | Operation::ChangeBaseClass
            | Operation::RemoveType => None,
        }
    }

    fn is_addition(&self) -> bool {
        matches!(
            self,
            Operation::AddMethod | Operation::AddProperty | Operation::AddField | Operation::AddEvent
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Operation {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.token() == token)
            .ok_or_else(|| EngineError::Unsupported(format!("operation '{}'", s)))
    }
}

pub struct ValidationService {
    analysis: Arc<AnalysisService>,
}

impl ValidationService {
    pub fn new(analysis: Arc<AnalysisService>) -> Self {
        Self { analysis }
    }

    fn lookup(&self, file: &Path, type_name: &str) -> Option<TypeDescription> {
        match self.analysis.parse_single_type(file, type_name) {
            Ok(ty) => Some(ty),
            Err(e) => {
                debug!(file = %file.display(), type_name, error = %e, "lookup failed");
                None
            }
        }
    }

    pub fn type_exists(&self, file: &Path, type_name: &str) -> bool {
        self.lookup(file, type_name).is_some()
    }

    pub fn method_exists(&self, file: &Path, type_name: &str, method: &str) -> bool {
        self.lookup(file, type_name)
            .is_some_and(|t| t.members.method(method).is_some())
    }

    pub fn property_exists(&self, file: &Path, type_name: &str, property: &str) -> bool {
        self.lookup(file, type_name)
            .is_some_and(|t| t.members.property(property).is_some())
    }

    pub fn field_exists(&self, file: &Path, type_name: &str, field: &str) -> bool {
        self.lookup(file, type_name)
            .is_some_and(|t| t.members.field(field).is_some())
    }

    /// Problems with applying `operation` to `type_name`. Empty means valid.
    pub fn validate_modification(&self, file: &Path, type_name: &str, operation: &str) -> Vec<String> {
        let op = match operation.parse::<Operation>() {
            Ok(op) => op,
            Err(_) => {
                let known: Vec<&str> = Operation::ALL.iter().map(|o| o.token()).collect();
                return vec![format!(
                    "Error: unknown operation '{}' (expected one of: {})",
                    operation,
                    known.join(", ")
                )];
            }
        };

        let ty = match self.analysis.parse_single_type(file, type_name) {
            Ok(ty) => ty,
            Err(e) if e.is_not_found() => {
                return vec![format!(
                    "Error: type '{}' not found in {}",
                    type_name,
                    file.display()
                )]
            }
            Err(e) => return vec![format!("Error: {}", e)],
        };

        check(&ty, op)
    }
}

fn check(ty: &TypeDescription, op: Operation) -> Vec<String> {
    let mut problems = Vec::new();
    let kind = ty.kind;

    match kind {
        TypeKind::Delegate => {
            if op != Operation::RemoveType {
                problems.push(format!(
                    "Error: delegate '{}' has no members or base list to modify",
                    ty.name
                ));
            }
        }
        TypeKind::Enum => match op.member_kind() {
            Some(MemberKind::Method) | Some(MemberKind::Property) | Some(MemberKind::Event) => {
                problems.push(format!(
                    "Error: cannot add or change {}s on enum '{}'",
                    op.member_kind().map(|k| k.to_string()).unwrap_or_default(),
                    ty.name
                ));
            }
            _ => match op {
                Operation::AddInterface | Operation::RemoveInterface => problems.push(format!(
                    "Error: enum '{}' cannot implement interfaces",
                    ty.name
                )),
                Operation::ChangeBaseClass => problems.push(format!(
                    "Warning: the base of enum '{}' must be an integral type",
                    ty.name
                )),
                _ => {}
            },
        },
        TypeKind::Interface => match op {
            Operation::AddField => problems.push(format!(
                "Error: interface '{}' cannot declare fields",
                ty.name
            )),
            Operation::ChangeBaseClass => problems.push(format!(
                "Error: interface '{}' cannot have a base class",
                ty.name
            )),
            _ => {}
        },
        TypeKind::Struct => {
            if op == Operation::ChangeBaseClass {
                problems.push(format!(
                    "Error: struct '{}' cannot have a base class",
                    ty.name
                ));
            }
        }
        TypeKind::Class => {
            if ty.modifiers.is_static {
                if op.is_addition() {
                    problems.push(format!(
                        "Warning: members added to static class '{}' must be static",
                        ty.name
                    ));
                }
                if op == Operation::AddInterface {
                    problems.push(format!(
                        "Error: static class '{}' cannot implement interfaces",
                        ty.name
                    ));
                }
            }
        }
    }

    if let Some(member_kind) = op.member_kind() {
        if !op.is_addition() && ty.members.names(member_kind).is_empty() && problems.is_empty() {
            problems.push(format!(
                "Warning: type '{}' has no {}s",
                ty.name, member_kind
            ));
        }
    }
    if op == Operation::RemoveInterface && ty.implemented_interfaces.is_empty() && problems.is_empty()
    {
        problems.push(format!(
            "Warning: type '{}' implements no interfaces",
            ty.name
        ));
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StructureCache;
    use crate::store::LocalFileStore;
    use crate::syntax::CSharpSyntax;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = "public enum Color { Red }\n\
public interface IShape { double Area(); }\n\
public struct Point { public int X; }\n\
public static class Util { public static void Help() { } }\n\
public delegate void Handler(int x);\n\
public class Shape : IShape { public double Area() => 0; }\n";

    fn setup() -> (TempDir, std::path::PathBuf, ValidationService) {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("Shapes.cs");
        fs::write(&file, SOURCE).unwrap();
        let analysis = Arc::new(AnalysisService::new(
            Arc::new(CSharpSyntax::new()),
            Arc::new(LocalFileStore),
            Arc::new(StructureCache::new()),
        ));
        (dir, file, ValidationService::new(analysis))
    }

    #[test]
    fn test_existence_checks_never_fail() {
        let (dir, file, validation) = setup();
        assert!(validation.type_exists(&file, "Shape"));
        assert!(!validation.type_exists(&file, "Circle"));
        assert!(!validation.type_exists(&dir.path().join("Nope.cs"), "Shape"));
        assert!(validation.method_exists(&file, "Shape", "Area"));
        assert!(!validation.method_exists(&file, "Shape", "Perimeter"));
        assert!(validation.field_exists(&file, "Point", "X"));
        assert!(!validation.property_exists(&file, "Point", "X"));
    }

    #[test]
    fn test_kind_rules() {
        let (_dir, file, validation) = setup();
        let first = |ty: &str, op: &str| {
            validation
                .validate_modification(&file, ty, op)
                .into_iter()
                .next()
                .unwrap_or_default()
        };

        assert!(first("Color", "add_method").starts_with("Error:"));
        assert!(first("Color", "change_base_class").starts_with("Warning:"));
        assert_eq!(first("Color", "add_field"), "");
        assert!(first("IShape", "add_field").starts_with("Error:"));
        assert!(first("IShape", "change_base_class").starts_with("Error:"));
        assert!(first("Point", "change_base_class").starts_with("Error:"));
        assert!(first("Util", "add_method").starts_with("Warning:"));
        assert!(first("Handler", "add_property").starts_with("Error:"));
        assert_eq!(first("Shape", "add_method"), "");
        assert_eq!(first("Shape", "remove_interface"), "");
        assert!(first("Point", "remove_method").starts_with("Warning:"));
    }

    #[test]
    fn test_unknown_operation_and_type() {
        let (_dir, file, validation) = setup();
        let problems = validation.validate_modification(&file, "Shape", "explode");
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("Error: unknown operation 'explode'"));

        let problems = validation.validate_modification(&file, "Circle", "add_method");
        assert!(problems[0].contains("not found"));
    }

    #[test]
    fn test_operation_tokens() {
        for op in Operation::ALL {
            assert_eq!(op.token().parse::<Operation>().unwrap(), op);
        }
        assert_eq!("ADD_METHOD".parse::<Operation>().unwrap(), Operation::AddMethod);
        assert!(matches!(
            "rename".parse::<Operation>(),
            Err(EngineError::Unsupported(_))
        ));
    }
}

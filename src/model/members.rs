//! Member-level structural descriptions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::types::Visibility;
use crate::error::EngineError;

/// The kind of a member inside a type body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Method,
    Property,
    Field,
    Event,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Method => write!(f, "method"),
            MemberKind::Property => write!(f, "property"),
            MemberKind::Field => write!(f, "field"),
            MemberKind::Event => write!(f, "event"),
        }
    }
}

impl FromStr for MemberKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "method" => Ok(MemberKind::Method),
            "property" => Ok(MemberKind::Property),
            "field" => Ok(MemberKind::Field),
            "event" => Ok(MemberKind::Event),
            other => Err(EngineError::Unsupported(format!(
                "member kind '{}' (expected method, property, field or event)",
                other
            ))),
        }
    }
}

/// One formal parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub default_value: Option<String>,
    pub is_out: bool,
    pub is_ref: bool,
    pub is_in: bool,
    /// `params` array.
    pub is_variadic: bool,
    /// Receiver of an extension method.
    pub is_this: bool,
}

impl Parameter {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }
}

/// A method or constructor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescription {
    pub name: String,
    pub visibility: Visibility,
    /// Empty for constructors.
    pub return_type: String,
    pub parameters: Vec<Parameter>,
    pub type_parameters: Option<String>,
    pub constraints: Vec<String>,
    pub is_static: bool,
    pub is_async: bool,
    pub is_virtual: bool,
    pub is_override: bool,
    pub is_abstract: bool,
    pub is_constructor: bool,
    /// Modifiers without a dedicated flag (`new`, `sealed`, `extern`, ...).
    pub other_modifiers: Vec<String>,
    /// Constructor initializer such as `base(name)`.
    pub initializer: Option<String>,
    /// Statements without braces, de-indented. `=> expr` for expression
    /// bodies, `None` for declarations ending in `;`.
    pub body: Option<String>,
    pub attributes: Vec<String>,
    pub documentation: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
}

impl MethodDescription {
    pub fn new(name: impl Into<String>, return_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            return_type: return_type.into(),
            ..Default::default()
        }
    }

    /// `ReturnType Name(T a, U b)`, used for display and textual matching.
    pub fn signature(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| format!("{} {}", p.type_name, p.name))
            .collect::<Vec<_>>()
            .join(", ");
        if self.is_constructor {
            format!("{}({})", self.name, params)
        } else {
            format!("{} {}({})", self.return_type, self.name, params)
        }
    }
}

/// A property with optional accessor bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub visibility: Visibility,
    pub has_getter: bool,
    pub has_setter: bool,
    /// The setter is declared with `init`.
    pub is_init_only: bool,
    pub setter_visibility: Visibility,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_override: bool,
    pub is_abstract: bool,
    pub other_modifiers: Vec<String>,
    pub getter_body: Option<String>,
    pub setter_body: Option<String>,
    /// Initializer expression after `=`.
    pub initializer: Option<String>,
    pub attributes: Vec<String>,
    pub documentation: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
}

impl PropertyDescription {
    /// An auto-property with getter and setter.
    pub fn auto(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            has_getter: true,
            has_setter: true,
            ..Default::default()
        }
    }
}

/// A field, or an enum value when it belongs to an enum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_readonly: bool,
    pub is_const: bool,
    pub other_modifiers: Vec<String>,
    pub default_value: Option<String>,
    pub attributes: Vec<String>,
    pub documentation: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
}

impl FieldDescription {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }
}

/// An event declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub other_modifiers: Vec<String>,
    pub attributes: Vec<String>,
    pub documentation: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
}

/// The four ordered member lists of a type.
///
/// Names are expected unique per kind: adds reject duplicates, and removes
/// or replacements act on the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberCollection {
    pub methods: Vec<MethodDescription>,
    pub properties: Vec<PropertyDescription>,
    pub fields: Vec<FieldDescription>,
    pub events: Vec<EventDescription>,
}

impl MemberCollection {
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
            && self.properties.is_empty()
            && self.fields.is_empty()
            && self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.methods.len() + self.properties.len() + self.fields.len() + self.events.len()
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescription> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescription> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescription> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn event(&self, name: &str) -> Option<&EventDescription> {
        self.events.iter().find(|e| e.name == name)
    }

    /// Member names of one kind, in declaration order.
    pub fn names(&self, kind: MemberKind) -> Vec<&str> {
        match kind {
            MemberKind::Method => self.methods.iter().map(|m| m.name.as_str()).collect(),
            MemberKind::Property => self.properties.iter().map(|p| p.name.as_str()).collect(),
            MemberKind::Field => self.fields.iter().map(|f| f.name.as_str()).collect(),
            MemberKind::Event => self.events.iter().map(|e| e.name.as_str()).collect(),
        }
    }
}

/// A single parsed member, as produced from a source snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Member {
    Method(MethodDescription),
    Property(PropertyDescription),
    Field(FieldDescription),
    Event(EventDescription),
}

impl Member {
    pub fn kind(&self) -> MemberKind {
        match self {
            Member::Method(_) => MemberKind::Method,
            Member::Property(_) => MemberKind::Property,
            Member::Field(_) => MemberKind::Field,
            Member::Event(_) => MemberKind::Event,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Member::Method(m) => &m.name,
            Member::Property(p) => &p.name,
            Member::Field(f) => &f.name,
            Member::Event(e) => &e.name,
        }
    }
}

/// Uniform access to one member list, so CRUD is written once.
pub trait MemberItem: Clone + Sized {
    const KIND: MemberKind;

    fn name(&self) -> &str;
    fn set_name(&mut self, name: &str);
    fn list(members: &MemberCollection) -> &Vec<Self>;
    fn list_mut(members: &mut MemberCollection) -> &mut Vec<Self>;
    /// Narrow a parsed member to this kind.
    fn from_member(member: Member) -> Option<Self>;
}

macro_rules! member_item {
    ($ty:ty, $kind:ident, $list:ident) => {
        impl MemberItem for $ty {
            const KIND: MemberKind = MemberKind::$kind;

            fn name(&self) -> &str {
                &self.name
            }

            fn set_name(&mut self, name: &str) {
                self.name = name.to_string();
            }

            fn list(members: &MemberCollection) -> &Vec<Self> {
                &members.$list
            }

            fn list_mut(members: &mut MemberCollection) -> &mut Vec<Self> {
                &mut members.$list
            }

            fn from_member(member: Member) -> Option<Self> {
                match member {
                    Member::$kind(m) => Some(m),
                    _ => None,
                }
            }
        }
    };
}

member_item!(MethodDescription, Method, methods);
member_item!(PropertyDescription, Property, properties);
member_item!(FieldDescription, Field, fields);
member_item!(EventDescription, Event, events);

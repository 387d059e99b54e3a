//! Tree walk that turns a C# syntax tree into structural descriptions.
//!
//! Only field names that have been stable across grammar releases are used
//! (`name`, `parameters`, `body`). Everything else is located by node kind or
//! by slicing the source between known nodes, e.g. a return type is the text
//! between the last modifier and the member name.

use std::path::Path;
use tree_sitter::Node;

use crate::model::{
    EventDescription, FieldDescription, MemberCollection, MethodDescription, Parameter,
    PropertyDescription, TypeDescription, TypeKind, TypeModifiers, Visibility,
};
use crate::text::block_contents;

/// Keywords that may appear as bare modifier tokens.
const MODIFIER_KEYWORDS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "abstract", "sealed", "partial",
    "virtual", "override", "async", "readonly", "const", "new", "extern", "unsafe", "volatile",
    "required", "file", "fixed",
];

const PARAMETER_MODIFIERS: &[&str] = &["out", "ref", "in", "params", "this", "scoped", "readonly"];

/// Map a declaration node kind to the type kind it declares.
pub(crate) fn type_kind_of(node_kind: &str) -> Option<TypeKind> {
    match node_kind {
        "class_declaration" => Some(TypeKind::Class),
        "interface_declaration" => Some(TypeKind::Interface),
        "struct_declaration" => Some(TypeKind::Struct),
        "enum_declaration" => Some(TypeKind::Enum),
        "delegate_declaration" => Some(TypeKind::Delegate),
        _ => None,
    }
}

fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn find_child<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    children(node).into_iter().find(|c| kinds.contains(&c.kind()))
}

fn line_range(node: Node<'_>) -> (usize, usize) {
    (node.start_position().row + 1, node.end_position().row + 1)
}

fn strip_brackets(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(text)
        .trim()
        .to_string()
}

/// Attributes and modifiers leading a declaration.
struct Header {
    modifiers: Vec<String>,
    attributes: Vec<String>,
    /// Byte offset just past the last attribute or modifier.
    end: usize,
}

impl Header {
    fn has(&self, keyword: &str) -> bool {
        self.modifiers.iter().any(|m| m == keyword)
    }

    fn visibility(&self) -> Visibility {
        Visibility::from_modifiers(&self.modifiers)
    }

    /// Modifiers that are neither accessibility nor one of `flagged`.
    fn others(&self, flagged: &[&str]) -> Vec<String> {
        self.modifiers
            .iter()
            .filter(|m| !Visibility::is_accessibility_keyword(m) && !flagged.contains(&m.as_str()))
            .cloned()
            .collect()
    }
}

pub(crate) struct Extractor<'a> {
    source: &'a str,
    file: &'a Path,
}

impl<'a> Extractor<'a> {
    pub(crate) fn new(source: &'a str, file: &'a Path) -> Self {
        Self { source, file }
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        if start >= end {
            return "";
        }
        self.source.get(start..end).unwrap_or("")
    }

    /// All type declarations under `root`, in document order.
    pub(crate) fn extract_types(&self, root: Node<'_>) -> Vec<TypeDescription> {
        let mut usings = Vec::new();
        self.collect_usings(root, &mut usings);

        let file_namespace = children(root)
            .into_iter()
            .find(|c| c.kind() == "file_scoped_namespace_declaration")
            .and_then(|ns| ns.child_by_field_name("name"))
            .map(|n| self.text(n).trim().to_string());

        let mut out = Vec::new();
        let mut scope = Vec::new();
        if let Some(ns) = file_namespace {
            scope.push(ns);
        }
        self.walk(root, &mut scope, None, &usings, &mut out);
        out
    }

    fn collect_usings(&self, node: Node<'_>, usings: &mut Vec<String>) {
        for child in named_children(node) {
            match child.kind() {
                "using_directive" => {
                    let text = self.text(child).trim().trim_end_matches(';').trim();
                    let text = text.strip_prefix("using ").unwrap_or(text).trim().to_string();
                    if !usings.contains(&text) {
                        usings.push(text);
                    }
                }
                "namespace_declaration" => {
                    if let Some(body) = find_child(child, &["declaration_list"]) {
                        self.collect_usings(body, usings);
                    }
                }
                "file_scoped_namespace_declaration" => self.collect_usings(child, usings),
                _ => {}
            }
        }
    }

    fn walk(
        &self,
        node: Node<'_>,
        scope: &mut Vec<String>,
        parent: Option<&str>,
        usings: &[String],
        out: &mut Vec<TypeDescription>,
    ) {
        for child in named_children(node) {
            let kind = child.kind();
            if kind == "namespace_declaration" {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| self.text(n).trim().to_string())
                    .unwrap_or_default();
                scope.push(name);
                if let Some(body) = find_child(child, &["declaration_list"]) {
                    self.walk(body, scope, None, usings, out);
                }
                scope.pop();
            } else if kind == "file_scoped_namespace_declaration" || kind.starts_with("preproc") {
                self.walk(child, scope, parent, usings, out);
            } else if let Some(type_kind) = type_kind_of(kind) {
                if let Some(ty) = self.build_type(child, type_kind, &scope.join("."), parent, usings)
                {
                    let path = ty.nested_path();
                    out.push(ty);
                    if let Some(body) = find_child(child, &["declaration_list"]) {
                        self.walk(body, scope, Some(path.as_str()), usings, out);
                    }
                }
            }
        }
    }

    fn header(&self, node: Node<'_>) -> Header {
        let mut header = Header {
            modifiers: Vec::new(),
            attributes: Vec::new(),
            end: node.start_byte(),
        };
        for child in children(node) {
            match child.kind() {
                "attribute_list" => {
                    header.attributes.push(strip_brackets(self.text(child)));
                    header.end = child.end_byte();
                }
                "modifier" => {
                    header.modifiers.push(self.text(child).trim().to_string());
                    header.end = child.end_byte();
                }
                "comment" => {}
                kind if !child.is_named() && MODIFIER_KEYWORDS.contains(&kind) => {
                    header.modifiers.push(kind.to_string());
                    header.end = child.end_byte();
                }
                _ => break,
            }
        }
        header
    }

    /// `///` lines directly above a declaration, markers stripped.
    fn documentation(&self, node: Node<'_>) -> Option<String> {
        let mut lines = Vec::new();
        let mut current = node;
        let mut expected_row = node.start_position().row;

        while let Some(prev) = current.prev_sibling() {
            if prev.kind() != "comment" || prev.end_position().row + 1 < expected_row {
                break;
            }
            let text = self.text(prev).trim();
            let Some(doc) = text.strip_prefix("///") else {
                break;
            };
            lines.push(doc.strip_prefix(' ').unwrap_or(doc).trim_end().to_string());
            expected_row = prev.start_position().row;
            current = prev;
        }

        if lines.is_empty() {
            return None;
        }
        lines.reverse();
        Some(lines.join("\n"))
    }

    /// Text from `start` up to the member name (or explicit interface prefix).
    fn type_before_name(&self, node: Node<'_>, start: usize, name: Node<'_>) -> String {
        let end = find_child(node, &["explicit_interface_specifier"])
            .map(|n| n.start_byte())
            .unwrap_or_else(|| name.start_byte());
        self.slice(start, end).trim().to_string()
    }

    fn build_type(
        &self,
        node: Node<'_>,
        kind: TypeKind,
        namespace: &str,
        parent: Option<&str>,
        usings: &[String],
    ) -> Option<TypeDescription> {
        let name_node = node.child_by_field_name("name")?;
        let header = self.header(node);
        let (start_line, end_line) = line_range(node);

        let mut ty = TypeDescription::new(self.text(name_node).trim(), kind);
        ty.namespace = namespace.to_string();
        ty.owning_file = self.file.to_path_buf();
        ty.visibility = header.visibility();
        ty.modifiers = TypeModifiers {
            is_static: header.has("static"),
            is_abstract: header.has("abstract"),
            is_sealed: header.has("sealed"),
            is_partial: header.has("partial"),
        };
        ty.attributes = header.attributes.clone();
        ty.documentation = self.documentation(node);
        ty.usings = usings.to_vec();
        ty.declaring_type = parent.map(str::to_string);
        ty.start_line = start_line;
        ty.end_line = end_line;
        ty.type_parameters =
            find_child(node, &["type_parameter_list"]).map(|n| self.text(n).trim().to_string());
        ty.constraints = children(node)
            .into_iter()
            .filter(|c| c.kind() == "type_parameter_constraints_clause")
            .map(|c| self.text(c).trim().to_string())
            .collect();

        if let Some(base_list) = find_child(node, &["base_list"]) {
            let bases: Vec<String> = named_children(base_list)
                .into_iter()
                .filter(|c| c.kind() != "comment")
                .map(|c| self.text(c).trim().to_string())
                .collect();
            assign_bases(&mut ty, bases);
        }

        match kind {
            TypeKind::Class | TypeKind::Interface | TypeKind::Struct => {
                if let Some(body) = find_child(node, &["declaration_list"]) {
                    self.extract_members(body, &mut ty.members);
                }
            }
            TypeKind::Enum => {
                if let Some(body) = find_child(node, &["enum_member_declaration_list"]) {
                    ty.members.fields = self.enum_values(body, &ty.name);
                }
            }
            TypeKind::Delegate => {
                if let Some(invoke) = self.delegate_signature(node, name_node) {
                    ty.members.methods.push(invoke);
                }
            }
        }

        Some(ty)
    }

    /// Direct members of a type body. Nested types are picked up by `walk`.
    pub(crate) fn extract_members(&self, body: Node<'_>, members: &mut MemberCollection) {
        for child in named_children(body) {
            match child.kind() {
                "method_declaration" => members.methods.extend(self.method(child, false)),
                "constructor_declaration" => members.methods.extend(self.method(child, true)),
                "property_declaration" => members.properties.extend(self.property(child)),
                "field_declaration" => members.fields.extend(self.fields(child)),
                "event_field_declaration" => members.events.extend(self.event_fields(child)),
                "event_declaration" => members.events.extend(self.event(child)),
                _ => {}
            }
        }
    }

    fn method(&self, node: Node<'_>, is_constructor: bool) -> Option<MethodDescription> {
        let name = node.child_by_field_name("name")?;
        let header = self.header(node);
        let (start_line, end_line) = line_range(node);

        let mut method = MethodDescription::new(self.text(name).trim(), "");
        if !is_constructor {
            method.return_type = self.type_before_name(node, header.end, name);
        }
        method.is_constructor = is_constructor;
        method.visibility = header.visibility();
        method.is_static = header.has("static");
        method.is_async = header.has("async");
        method.is_virtual = header.has("virtual");
        method.is_override = header.has("override");
        method.is_abstract = header.has("abstract");
        method.other_modifiers =
            header.others(&["static", "async", "virtual", "override", "abstract"]);
        method.attributes = header.attributes;
        method.documentation = self.documentation(node);
        method.type_parameters =
            find_child(node, &["type_parameter_list"]).map(|n| self.text(n).trim().to_string());
        method.constraints = children(node)
            .into_iter()
            .filter(|c| c.kind() == "type_parameter_constraints_clause")
            .map(|c| self.text(c).trim().to_string())
            .collect();
        method.parameters = self.parameters(node);
        method.initializer = find_child(node, &["constructor_initializer"]).map(|n| {
            let text = self.text(n).trim();
            text.strip_prefix(':').unwrap_or(text).trim().to_string()
        });
        method.body = self.body(node);
        method.start_line = start_line;
        method.end_line = end_line;
        Some(method)
    }

    fn parameters(&self, node: Node<'_>) -> Vec<Parameter> {
        let list = node
            .child_by_field_name("parameters")
            .or_else(|| find_child(node, &["parameter_list"]));
        let Some(list) = list else {
            return Vec::new();
        };
        named_children(list)
            .into_iter()
            .filter(|c| matches!(c.kind(), "parameter" | "parameter_array"))
            .filter_map(|c| self.parameter(c))
            .collect()
    }

    fn parameter(&self, node: Node<'_>) -> Option<Parameter> {
        let name = node.child_by_field_name("name").or_else(|| {
            children(node)
                .into_iter()
                .filter(|c| c.kind() == "identifier")
                .last()
        })?;

        let mut param = Parameter {
            name: self.text(name).trim().to_string(),
            ..Default::default()
        };

        let mut type_start = None;
        for child in children(node) {
            if child.start_byte() >= name.start_byte() {
                break;
            }
            if child.kind() == "attribute_list" || type_start.is_some() {
                continue;
            }
            let words: Vec<&str> = self.text(child).split_whitespace().collect();
            if !words.is_empty() && words.iter().all(|w| PARAMETER_MODIFIERS.contains(w)) {
                for word in words {
                    match word {
                        "out" => param.is_out = true,
                        "ref" => param.is_ref = true,
                        "in" => param.is_in = true,
                        "params" => param.is_variadic = true,
                        "this" => param.is_this = true,
                        _ => {}
                    }
                }
            } else {
                type_start = Some(child.start_byte());
            }
        }

        if let Some(start) = type_start {
            param.type_name = self.slice(start, name.start_byte()).trim().to_string();
        }

        let trailing = self.slice(name.end_byte(), node.end_byte()).trim();
        if let Some(default) = trailing.strip_prefix('=') {
            param.default_value = Some(default.trim().to_string());
        }
        Some(param)
    }

    /// Block contents, `=> expr`, or `None` for a bare `;`.
    fn body(&self, node: Node<'_>) -> Option<String> {
        let body = node
            .child_by_field_name("body")
            .filter(|b| matches!(b.kind(), "block" | "arrow_expression_clause"))
            .or_else(|| find_child(node, &["block", "arrow_expression_clause"]))?;
        match body.kind() {
            "block" => Some(block_contents(self.text(body))),
            _ => Some(self.text(body).trim().to_string()),
        }
    }

    fn property(&self, node: Node<'_>) -> Option<PropertyDescription> {
        let name = node.child_by_field_name("name")?;
        let header = self.header(node);
        let (start_line, end_line) = line_range(node);

        let mut prop = PropertyDescription {
            name: self.text(name).trim().to_string(),
            type_name: self.type_before_name(node, header.end, name),
            visibility: header.visibility(),
            is_static: header.has("static"),
            is_virtual: header.has("virtual"),
            is_override: header.has("override"),
            is_abstract: header.has("abstract"),
            other_modifiers: header.others(&["static", "virtual", "override", "abstract"]),
            attributes: header.attributes.clone(),
            documentation: self.documentation(node),
            start_line,
            end_line,
            ..Default::default()
        };

        match find_child(node, &["accessor_list"]) {
            Some(accessors) => {
                for accessor in named_children(accessors)
                    .into_iter()
                    .filter(|c| c.kind() == "accessor_declaration")
                {
                    self.accessor(accessor, &mut prop);
                }
                let trailing = self.slice(accessors.end_byte(), node.end_byte()).trim();
                if let Some(init) = trailing.strip_prefix('=') {
                    prop.initializer = Some(init.trim().trim_end_matches(';').trim().to_string());
                }
            }
            None => {
                if let Some(arrow) = find_child(node, &["arrow_expression_clause"]) {
                    prop.has_getter = true;
                    prop.getter_body = Some(self.text(arrow).trim().to_string());
                }
            }
        }
        Some(prop)
    }

    fn accessor(&self, node: Node<'_>, prop: &mut PropertyDescription) {
        let header = self.header(node);
        let keyword = children(node)
            .into_iter()
            .find(|c| {
                c.start_byte() >= header.end && !matches!(c.kind(), "attribute_list" | "comment")
            })
            .map(|c| self.text(c).trim())
            .unwrap_or("");
        let body = self.body(node);

        match keyword {
            "get" => {
                prop.has_getter = true;
                prop.getter_body = body;
            }
            "set" | "init" => {
                prop.has_setter = true;
                prop.is_init_only = keyword == "init";
                prop.setter_visibility = header.visibility();
                prop.setter_body = body;
            }
            _ => {}
        }
    }

    /// Declared type and `(name, default)` pairs of a variable declaration.
    fn declarators(&self, decl: Node<'_>) -> (String, Vec<(String, Option<String>)>) {
        let declarators: Vec<Node<'_>> = named_children(decl)
            .into_iter()
            .filter(|c| c.kind() == "variable_declarator")
            .collect();
        let type_name = match declarators.first() {
            Some(first) => self.slice(decl.start_byte(), first.start_byte()).trim().to_string(),
            None => String::new(),
        };

        let vars = declarators
            .into_iter()
            .filter_map(|d| {
                let name = d
                    .child_by_field_name("name")
                    .or_else(|| find_child(d, &["identifier"]))?;
                let trailing = self.slice(name.end_byte(), d.end_byte()).trim();
                let default = trailing
                    .strip_prefix('=')
                    .map(|v| v.trim().to_string());
                Some((self.text(name).trim().to_string(), default))
            })
            .collect();
        (type_name, vars)
    }

    fn fields(&self, node: Node<'_>) -> Vec<FieldDescription> {
        let Some(decl) = find_child(node, &["variable_declaration"]) else {
            return Vec::new();
        };
        let header = self.header(node);
        let documentation = self.documentation(node);
        let (start_line, end_line) = line_range(node);
        let (type_name, vars) = self.declarators(decl);

        vars.into_iter()
            .map(|(name, default_value)| FieldDescription {
                name,
                type_name: type_name.clone(),
                visibility: header.visibility(),
                is_static: header.has("static"),
                is_readonly: header.has("readonly"),
                is_const: header.has("const"),
                other_modifiers: header.others(&["static", "readonly", "const"]),
                default_value,
                attributes: header.attributes.clone(),
                documentation: documentation.clone(),
                start_line,
                end_line,
            })
            .collect()
    }

    fn event_fields(&self, node: Node<'_>) -> Vec<EventDescription> {
        let Some(decl) = find_child(node, &["variable_declaration"]) else {
            return Vec::new();
        };
        let header = self.header(node);
        let documentation = self.documentation(node);
        let (start_line, end_line) = line_range(node);
        let (type_name, vars) = self.declarators(decl);

        vars.into_iter()
            .map(|(name, _)| EventDescription {
                name,
                type_name: type_name.clone(),
                visibility: header.visibility(),
                is_static: header.has("static"),
                other_modifiers: header.others(&["static"]),
                attributes: header.attributes.clone(),
                documentation: documentation.clone(),
                start_line,
                end_line,
            })
            .collect()
    }

    /// Event with explicit `add`/`remove` accessors. Accessor bodies are not kept.
    fn event(&self, node: Node<'_>) -> Option<EventDescription> {
        let name = node.child_by_field_name("name")?;
        let header = self.header(node);
        let type_start = find_child(node, &["event"])
            .map(|kw| kw.end_byte())
            .unwrap_or(header.end);
        let (start_line, end_line) = line_range(node);

        Some(EventDescription {
            name: self.text(name).trim().to_string(),
            type_name: self.type_before_name(node, type_start, name),
            visibility: header.visibility(),
            is_static: header.has("static"),
            other_modifiers: header.others(&["static"]),
            attributes: header.attributes,
            documentation: self.documentation(node),
            start_line,
            end_line,
        })
    }

    fn enum_values(&self, body: Node<'_>, enum_name: &str) -> Vec<FieldDescription> {
        named_children(body)
            .into_iter()
            .filter(|c| c.kind() == "enum_member_declaration")
            .filter_map(|member| {
                let name = member
                    .child_by_field_name("name")
                    .or_else(|| find_child(member, &["identifier"]))?;
                let header = self.header(member);
                let trailing = self.slice(name.end_byte(), member.end_byte()).trim();
                let (start_line, end_line) = line_range(member);
                Some(FieldDescription {
                    name: self.text(name).trim().to_string(),
                    type_name: enum_name.to_string(),
                    default_value: trailing.strip_prefix('=').map(|v| v.trim().to_string()),
                    attributes: header.attributes,
                    documentation: self.documentation(member),
                    start_line,
                    end_line,
                    ..Default::default()
                })
            })
            .collect()
    }

    /// A delegate's signature, modelled as a body-less `Invoke` method.
    fn delegate_signature(&self, node: Node<'_>, name: Node<'_>) -> Option<MethodDescription> {
        let keyword = find_child(node, &["delegate"])?;
        let (start_line, end_line) = line_range(node);
        let mut invoke = MethodDescription::new(
            "Invoke",
            self.slice(keyword.end_byte(), name.start_byte()).trim(),
        );
        invoke.parameters = self.parameters(node);
        invoke.start_line = start_line;
        invoke.end_line = end_line;
        Some(invoke)
    }
}

/// Split a base list into base type and interfaces.
///
/// Syntax alone cannot tell a base class from an interface, so a class's
/// first entry is its base type unless it follows the `IName` convention.
fn assign_bases(ty: &mut TypeDescription, bases: Vec<String>) {
    let mut bases = bases.into_iter();
    match ty.kind {
        TypeKind::Class => {
            if let Some(first) = bases.next() {
                if looks_like_interface(&first) {
                    ty.add_interface(first);
                } else {
                    ty.base_type = Some(first);
                }
            }
        }
        TypeKind::Enum => {
            ty.base_type = bases.next();
            return;
        }
        TypeKind::Interface | TypeKind::Struct => {}
        TypeKind::Delegate => return,
    }
    for base in bases {
        ty.add_interface(base);
    }
}

/// `IDisposable`, `System.IComparable<T>`: an `I` followed by an uppercase letter.
fn looks_like_interface(type_name: &str) -> bool {
    let simple = type_name.split('<').next().unwrap_or(type_name);
    let simple = simple.rsplit('.').next().unwrap_or(simple).trim();
    let mut chars = simple.chars();
    matches!((chars.next(), chars.next()), (Some('I'), Some(c)) if c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_interface() {
        assert!(looks_like_interface("IDisposable"));
        assert!(looks_like_interface("System.IComparable<T>"));
        assert!(!looks_like_interface("Item"));
        assert!(!looks_like_interface("Base"));
        assert!(!looks_like_interface("I"));
    }

    #[test]
    fn test_assign_bases_by_kind() {
        let mut class = TypeDescription::new("A", TypeKind::Class);
        assign_bases(&mut class, vec!["Base".into(), "IOne".into(), "ITwo".into()]);
        assert_eq!(class.base_type.as_deref(), Some("Base"));
        assert_eq!(class.implemented_interfaces, vec!["IOne", "ITwo"]);

        let mut only_iface = TypeDescription::new("B", TypeKind::Class);
        assign_bases(&mut only_iface, vec!["IOne".into()]);
        assert_eq!(only_iface.base_type, None);
        assert_eq!(only_iface.implemented_interfaces, vec!["IOne"]);

        let mut strukt = TypeDescription::new("C", TypeKind::Struct);
        assign_bases(&mut strukt, vec!["Equatable".into()]);
        assert_eq!(strukt.base_type, None);
        assert_eq!(strukt.implemented_interfaces, vec!["Equatable"]);

        let mut en = TypeDescription::new("D", TypeKind::Enum);
        assign_bases(&mut en, vec!["byte".into()]);
        assert_eq!(en.base_type.as_deref(), Some("byte"));
    }
}

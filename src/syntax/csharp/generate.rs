//! Canonical C# source generation from structural descriptions.
//!
//! Output style is fixed: Allman braces, block namespaces, members grouped
//! as fields, events, properties, constructors, methods, nested types.

use std::collections::HashSet;

use crate::model::{
    EventDescription, FieldDescription, MethodDescription, Parameter, PropertyDescription,
    TypeDescription, TypeKind, Visibility,
};
use crate::text::indent_lines;

pub(crate) struct Generator {
    unit: String,
}

impl Generator {
    pub(crate) fn new(indent_width: usize) -> Self {
        Self {
            unit: " ".repeat(indent_width),
        }
    }

    fn indent(&self, depth: usize) -> String {
        self.unit.repeat(depth)
    }

    /// Full file text: usings, then types grouped by namespace.
    pub(crate) fn file(&self, types: &[TypeDescription]) -> String {
        let mut out = String::new();

        let mut usings: Vec<&str> = Vec::new();
        for using in types.iter().flat_map(|t| t.usings.iter()) {
            if !usings.contains(&using.as_str()) {
                usings.push(using);
            }
        }
        for using in &usings {
            if using.starts_with("global ") {
                out.push_str(&format!("{};\n", using));
            } else {
                out.push_str(&format!("using {};\n", using));
            }
        }

        // A type is nested only if its declaring type is part of this file.
        let declared: HashSet<(&str, String)> = types
            .iter()
            .map(|t| (t.namespace.as_str(), t.nested_path()))
            .collect();
        let roots: Vec<&TypeDescription> = types
            .iter()
            .filter(|t| match &t.declaring_type {
                Some(parent) => !declared.contains(&(t.namespace.as_str(), parent.clone())),
                None => true,
            })
            .collect();

        let mut namespaces: Vec<&str> = Vec::new();
        for ty in &roots {
            if !namespaces.contains(&ty.namespace.as_str()) {
                namespaces.push(&ty.namespace);
            }
        }

        for ns in namespaces {
            if !out.is_empty() {
                out.push('\n');
            }
            let group: Vec<&TypeDescription> =
                roots.iter().copied().filter(|t| t.namespace == ns).collect();
            let depth = if ns.is_empty() { 0 } else { 1 };
            let blocks: Vec<String> = group
                .iter()
                .map(|ty| self.type_block(ty, types, depth))
                .collect();

            if ns.is_empty() {
                out.push_str(&blocks.join("\n\n"));
                out.push('\n');
            } else {
                out.push_str(&format!("namespace {}\n{{\n", ns));
                out.push_str(&blocks.join("\n\n"));
                out.push_str("\n}\n");
            }
        }
        out
    }

    fn leading_lines(
        &self,
        documentation: &Option<String>,
        attributes: &[String],
        depth: usize,
    ) -> Vec<String> {
        let pad = self.indent(depth);
        let mut lines = Vec::new();
        if let Some(doc) = documentation {
            for line in doc.lines() {
                if line.is_empty() {
                    lines.push(format!("{}///", pad));
                } else {
                    lines.push(format!("{}/// {}", pad, line));
                }
            }
        }
        for attribute in attributes {
            lines.push(format!("{}[{}]", pad, attribute));
        }
        lines
    }

    fn type_block(&self, ty: &TypeDescription, all: &[TypeDescription], depth: usize) -> String {
        let pad = self.indent(depth);
        let mut lines = self.leading_lines(&ty.documentation, &ty.attributes, depth);

        let mut words: Vec<&str> = Vec::new();
        words.extend(ty.visibility.keyword());
        if ty.modifiers.is_static {
            words.push("static");
        }
        if ty.modifiers.is_abstract {
            words.push("abstract");
        }
        if ty.modifiers.is_sealed {
            words.push("sealed");
        }
        if ty.modifiers.is_partial {
            words.push("partial");
        }
        words.push(ty.kind.keyword());

        let type_parameters = ty.type_parameters.as_deref().unwrap_or("");
        let constraints = constraint_suffix(&ty.constraints);

        if ty.kind == TypeKind::Delegate {
            let (return_type, params) = match ty.members.methods.first() {
                Some(invoke) => (invoke.return_type.as_str(), parameter_list(&invoke.parameters)),
                None => ("void", String::new()),
            };
            lines.push(format!(
                "{}{} {} {}{}({}){};",
                pad,
                words.join(" "),
                return_type,
                ty.name,
                type_parameters,
                params,
                constraints
            ));
            return lines.join("\n");
        }

        let bases: Vec<&str> = ty
            .base_type
            .iter()
            .chain(ty.implemented_interfaces.iter())
            .map(String::as_str)
            .collect();
        let base_clause = if bases.is_empty() {
            String::new()
        } else {
            format!(" : {}", bases.join(", "))
        };

        lines.push(format!(
            "{}{} {}{}{}{}",
            pad,
            words.join(" "),
            ty.name,
            type_parameters,
            base_clause,
            constraints
        ));
        lines.push(format!("{}{{", pad));

        let sections = match ty.kind {
            TypeKind::Enum => self.enum_sections(ty, depth + 1),
            TypeKind::Class | TypeKind::Interface | TypeKind::Struct => {
                self.member_sections(ty, all, depth + 1)
            }
            TypeKind::Delegate => Vec::new(),
        };
        if !sections.is_empty() {
            lines.push(sections.join("\n\n"));
        }
        lines.push(format!("{}}}", pad));
        lines.join("\n")
    }

    fn enum_sections(&self, ty: &TypeDescription, depth: usize) -> Vec<String> {
        let pad = self.indent(depth);
        let values: Vec<String> = ty
            .members
            .fields
            .iter()
            .map(|value| {
                let mut lines = self.leading_lines(&value.documentation, &value.attributes, depth);
                match &value.default_value {
                    Some(v) => lines.push(format!("{}{} = {},", pad, value.name, v)),
                    None => lines.push(format!("{}{},", pad, value.name)),
                }
                lines.join("\n")
            })
            .collect();
        if values.is_empty() {
            Vec::new()
        } else {
            vec![values.join("\n")]
        }
    }

    fn member_sections(
        &self,
        ty: &TypeDescription,
        all: &[TypeDescription],
        depth: usize,
    ) -> Vec<String> {
        let mut sections = Vec::new();
        let members = &ty.members;

        if !members.fields.is_empty() {
            let fields: Vec<String> = members.fields.iter().map(|f| self.field(f, depth)).collect();
            sections.push(fields.join("\n"));
        }
        if !members.events.is_empty() {
            let events: Vec<String> = members.events.iter().map(|e| self.event(e, depth)).collect();
            sections.push(events.join("\n"));
        }
        sections.extend(members.properties.iter().map(|p| self.property(p, depth)));

        let (constructors, methods): (Vec<&MethodDescription>, Vec<&MethodDescription>) =
            members.methods.iter().partition(|m| m.is_constructor);
        sections.extend(constructors.into_iter().map(|m| self.method(m, depth)));
        sections.extend(methods.into_iter().map(|m| self.method(m, depth)));

        let path = ty.nested_path();
        sections.extend(
            all.iter()
                .filter(|t| {
                    t.declaring_type.as_deref() == Some(path.as_str())
                        && t.namespace == ty.namespace
                })
                .map(|nested| self.type_block(nested, all, depth)),
        );
        sections
    }

    fn field(&self, field: &FieldDescription, depth: usize) -> String {
        let mut lines = self.leading_lines(&field.documentation, &field.attributes, depth);
        let mut words: Vec<&str> = Vec::new();
        words.extend(field.visibility.keyword());
        words.extend(field.other_modifiers.iter().map(String::as_str));
        if field.is_static {
            words.push("static");
        }
        if field.is_const {
            words.push("const");
        }
        if field.is_readonly {
            words.push("readonly");
        }
        words.push(&field.type_name);
        words.push(&field.name);

        let initializer = field
            .default_value
            .as_ref()
            .map(|v| format!(" = {}", v))
            .unwrap_or_default();
        lines.push(format!("{}{}{};", self.indent(depth), words.join(" "), initializer));
        lines.join("\n")
    }

    fn event(&self, event: &EventDescription, depth: usize) -> String {
        let mut lines = self.leading_lines(&event.documentation, &event.attributes, depth);
        let mut words: Vec<&str> = Vec::new();
        words.extend(event.visibility.keyword());
        words.extend(event.other_modifiers.iter().map(String::as_str));
        if event.is_static {
            words.push("static");
        }
        words.push("event");
        words.push(&event.type_name);
        words.push(&event.name);
        lines.push(format!("{}{};", self.indent(depth), words.join(" ")));
        lines.join("\n")
    }

    fn property(&self, prop: &PropertyDescription, depth: usize) -> String {
        let pad = self.indent(depth);
        let mut lines = self.leading_lines(&prop.documentation, &prop.attributes, depth);
        let mut words: Vec<&str> = Vec::new();
        words.extend(prop.visibility.keyword());
        words.extend(prop.other_modifiers.iter().map(String::as_str));
        if prop.is_static {
            words.push("static");
        }
        if prop.is_abstract {
            words.push("abstract");
        }
        if prop.is_virtual {
            words.push("virtual");
        }
        if prop.is_override {
            words.push("override");
        }
        words.push(&prop.type_name);
        words.push(&prop.name);
        let signature = format!("{}{}", pad, words.join(" "));

        let mut accessors: Vec<(String, &Option<String>)> = Vec::new();
        if prop.has_getter {
            accessors.push(("get".to_string(), &prop.getter_body));
        }
        if prop.has_setter {
            let keyword = if prop.is_init_only { "init" } else { "set" };
            let keyword = match prop.setter_visibility.keyword() {
                Some(vis) if prop.setter_visibility != Visibility::Unspecified => {
                    format!("{} {}", vis, keyword)
                }
                _ => keyword.to_string(),
            };
            accessors.push((keyword, &prop.setter_body));
        }

        let has_block = accessors
            .iter()
            .any(|(_, body)| body.as_deref().is_some_and(|b| !b.starts_with("=>")));
        let initializer = prop
            .initializer
            .as_ref()
            .map(|v| format!(" = {};", v))
            .unwrap_or_default();

        if has_block {
            lines.push(signature);
            lines.push(format!("{}{{", pad));
            for (keyword, body) in accessors {
                lines.push(self.accessor_block(&keyword, body, depth + 1));
            }
            lines.push(format!("{}}}{}", pad, initializer));
        } else {
            let inline: Vec<String> = accessors
                .iter()
                .map(|(keyword, body)| match body {
                    Some(arrow) => format!("{} {};", keyword, arrow),
                    None => format!("{};", keyword),
                })
                .collect();
            lines.push(format!("{} {{ {} }}{}", signature, inline.join(" "), initializer));
        }
        lines.join("\n")
    }

    fn accessor_block(&self, keyword: &str, body: &Option<String>, depth: usize) -> String {
        let pad = self.indent(depth);
        match body {
            None => format!("{}{};", pad, keyword),
            Some(arrow) if arrow.starts_with("=>") => format!("{}{} {};", pad, keyword, arrow),
            Some(block) => format!(
                "{}{}\n{}",
                pad,
                keyword,
                self.block(block, depth)
            ),
        }
    }

    fn block(&self, body: &str, depth: usize) -> String {
        let pad = self.indent(depth);
        if body.trim().is_empty() {
            return format!("{}{{\n{}}}", pad, pad);
        }
        format!(
            "{}{{\n{}\n{}}}",
            pad,
            indent_lines(body, &self.indent(depth + 1)),
            pad
        )
    }

    fn method(&self, method: &MethodDescription, depth: usize) -> String {
        let mut lines = self.leading_lines(&method.documentation, &method.attributes, depth);
        let mut words: Vec<&str> = Vec::new();
        words.extend(method.visibility.keyword());
        words.extend(method.other_modifiers.iter().map(String::as_str));
        if method.is_static {
            words.push("static");
        }
        if method.is_abstract {
            words.push("abstract");
        }
        if method.is_virtual {
            words.push("virtual");
        }
        if method.is_override {
            words.push("override");
        }
        if method.is_async {
            words.push("async");
        }
        if !method.is_constructor && !method.return_type.is_empty() {
            words.push(&method.return_type);
        }

        let mut signature = format!(
            "{}{}{}{}({})",
            self.indent(depth),
            if words.is_empty() {
                String::new()
            } else {
                format!("{} ", words.join(" "))
            },
            method.name,
            method.type_parameters.as_deref().unwrap_or(""),
            parameter_list(&method.parameters)
        );
        if let Some(initializer) = &method.initializer {
            signature.push_str(&format!(" : {}", initializer));
        }
        signature.push_str(&constraint_suffix(&method.constraints));

        match &method.body {
            None => lines.push(format!("{};", signature)),
            Some(arrow) if arrow.starts_with("=>") => {
                lines.push(format!("{} {};", signature, arrow))
            }
            Some(block) => {
                lines.push(signature);
                lines.push(self.block(block, depth));
            }
        }
        lines.join("\n")
    }
}

fn constraint_suffix(constraints: &[String]) -> String {
    constraints.iter().map(|c| format!(" {}", c)).collect()
}

fn parameter_list(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(parameter)
        .collect::<Vec<_>>()
        .join(", ")
}

fn parameter(p: &Parameter) -> String {
    let mut words: Vec<&str> = Vec::new();
    if p.is_this {
        words.push("this");
    }
    if p.is_variadic {
        words.push("params");
    }
    if p.is_ref {
        words.push("ref");
    }
    if p.is_out {
        words.push("out");
    }
    if p.is_in {
        words.push("in");
    }
    if !p.type_name.is_empty() {
        words.push(&p.type_name);
    }
    words.push(&p.name);
    match &p.default_value {
        Some(default) => format!("{} = {}", words.join(" "), default),
        None => words.join(" "),
    }
}

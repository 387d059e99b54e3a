//! C# syntax provider backed by tree-sitter.

mod extract;
mod generate;

use std::path::Path;
use tree_sitter::{Parser, Tree};

use super::{SourceLanguage, SyntaxProvider};
use crate::error::{EngineError, Result};
use crate::model::{Member, TypeDescription};
use crate::text::snippet_preview;

use extract::Extractor;
use generate::Generator;

/// Name of the synthetic class member snippets are wrapped in.
const SNIPPET_HOST: &str = "__TypeforgeSnippet";

pub struct CSharpSyntax {
    generator: Generator,
}

impl CSharpSyntax {
    pub fn new() -> Self {
        Self::with_indent_width(4)
    }

    /// Generate with `width` spaces per indentation level.
    pub fn with_indent_width(width: usize) -> Self {
        Self {
            generator: Generator::new(width),
        }
    }

    fn parse_tree(&self, source: &str) -> Result<Tree> {
        let mut parser = Parser::new();
        parser
            .set_language(&SourceLanguage::CSharp.tree_sitter_language())
            .map_err(|e| EngineError::Parse(format!("failed to load C# grammar: {}", e)))?;
        parser
            .parse(source, None)
            .ok_or_else(|| EngineError::Parse("parser produced no tree".to_string()))
    }
}

/// Map a line of the wrapped snippet back to the caller's snippet.
fn snippet_line(wrapped_line: usize) -> usize {
    wrapped_line.saturating_sub(2).max(1)
}

impl Default for CSharpSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxProvider for CSharpSyntax {
    fn language(&self) -> SourceLanguage {
        SourceLanguage::CSharp
    }

    fn parse_types(&self, source: &str, file: &Path) -> Result<Vec<TypeDescription>> {
        let tree = self.parse_tree(source)?;
        let root = tree.root_node();
        if root.has_error() {
            tracing::debug!(file = %file.display(), "syntax errors present, extracting what parsed");
        }
        Ok(Extractor::new(source, file).extract_types(root))
    }

    fn parse_member(&self, snippet: &str) -> Result<Member> {
        let wrapped = format!("class {}\n{{\n{}\n}}\n", SNIPPET_HOST, snippet);
        let tree = self.parse_tree(&wrapped)?;
        if tree.root_node().has_error() {
            return Err(EngineError::InvalidInput(format!(
                "member snippet does not parse: {}",
                snippet_preview(snippet)
            )));
        }

        let types = Extractor::new(&wrapped, Path::new("")).extract_types(tree.root_node());
        let host = match types.as_slice() {
            [host] if host.name == SNIPPET_HOST => host,
            _ => {
                return Err(EngineError::InvalidInput(format!(
                    "snippet must declare exactly one member: {}",
                    snippet_preview(snippet)
                )))
            }
        };

        let members = &host.members;
        if members.len() != 1 {
            return Err(EngineError::InvalidInput(format!(
                "snippet must declare exactly one member, found {}: {}",
                members.len(),
                snippet_preview(snippet)
            )));
        }

        let member = if let Some(m) = members.methods.first() {
            let mut m = m.clone();
            m.start_line = snippet_line(m.start_line);
            m.end_line = snippet_line(m.end_line);
            Member::Method(m)
        } else if let Some(p) = members.properties.first() {
            let mut p = p.clone();
            p.start_line = snippet_line(p.start_line);
            p.end_line = snippet_line(p.end_line);
            Member::Property(p)
        } else if let Some(f) = members.fields.first() {
            let mut f = f.clone();
            f.start_line = snippet_line(f.start_line);
            f.end_line = snippet_line(f.end_line);
            Member::Field(f)
        } else if let Some(e) = members.events.first() {
            let mut e = e.clone();
            e.start_line = snippet_line(e.start_line);
            e.end_line = snippet_line(e.end_line);
            Member::Event(e)
        } else {
            return Err(EngineError::InvalidInput(format!(
                "snippet declares no member: {}",
                snippet_preview(snippet)
            )));
        };
        Ok(member)
    }

    fn parse_type_snippet(&self, snippet: &str, file: &Path) -> Result<TypeDescription> {
        let tree = self.parse_tree(snippet)?;
        if tree.root_node().has_error() {
            return Err(EngineError::InvalidInput(format!(
                "type snippet does not parse: {}",
                snippet_preview(snippet)
            )));
        }
        let mut types = Extractor::new(snippet, file).extract_types(tree.root_node());
        if types.len() != 1 {
            return Err(EngineError::InvalidInput(format!(
                "snippet must declare exactly one type, found {}: {}",
                types.len(),
                snippet_preview(snippet)
            )));
        }
        Ok(types.remove(0))
    }

    fn generate_file(&self, types: &[TypeDescription]) -> String {
        self.generator.file(types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TypeKind, Visibility};
    use std::path::PathBuf;

    const SERVICE: &str = r#"using System;
using System.Collections.Generic;

namespace Shop.Orders
{
    /// Handles orders.
    [Serializable]
    public sealed class OrderService : ServiceBase, IOrderService, IDisposable
    {
        private readonly List<Order> _orders = new List<Order>();
        public event EventHandler Changed;

        public int Count { get; private set; }

        public OrderService(int capacity) : base()
        {
            Count = capacity;
        }

        public async Task<Order> FindAsync(int id, string name = "x")
        {
            var order = _orders[id];
            return order;
        }

        public void Dispose() => _orders.Clear();

        private class Line
        {
        }
    }

    public interface IOrderService
    {
        Task<Order> FindAsync(int id, string name);
    }

    public enum Status : byte
    {
        Open = 1,
        Closed,
    }
}
"#;

    fn parse(source: &str) -> Vec<TypeDescription> {
        CSharpSyntax::new()
            .parse_types(source, Path::new("Orders.cs"))
            .unwrap()
    }

    #[test]
    fn test_parse_types_in_order_with_nested() {
        let types = parse(SERVICE);
        let names: Vec<&str> = types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["OrderService", "Line", "IOrderService", "Status"]);

        let service = &types[0];
        assert_eq!(service.namespace, "Shop.Orders");
        assert_eq!(service.owning_file, PathBuf::from("Orders.cs"));
        assert_eq!(service.kind, TypeKind::Class);
        assert_eq!(service.visibility, Visibility::Public);
        assert!(service.modifiers.is_sealed);
        assert_eq!(service.base_type.as_deref(), Some("ServiceBase"));
        assert_eq!(service.implemented_interfaces, vec!["IOrderService", "IDisposable"]);
        assert_eq!(service.usings, vec!["System", "System.Collections.Generic"]);
        assert_eq!(service.attributes, vec!["Serializable"]);
        assert_eq!(service.documentation.as_deref(), Some("Handles orders."));
        assert!(service.start_line <= service.end_line);

        assert_eq!(types[1].declaring_type.as_deref(), Some("OrderService"));
        assert_eq!(types[2].kind, TypeKind::Interface);
        assert_eq!(types[3].kind, TypeKind::Enum);
        assert_eq!(types[3].base_type.as_deref(), Some("byte"));
    }

    #[test]
    fn test_same_named_nested_types_regenerate_once() {
        let source = "class A { class Node { class Leaf { } } }\nclass B { class Node { } }\n";
        let syntax = CSharpSyntax::new();
        let types = parse(source);
        let paths: Vec<String> = types.iter().map(|t| t.nested_path()).collect();
        assert_eq!(paths, vec!["A", "A.Node", "A.Node.Leaf", "B", "B.Node"]);

        let text = syntax.generate_file(&types);
        assert_eq!(text.matches("class Leaf").count(), 1);
        let again: Vec<String> = parse(&text).iter().map(|t| t.nested_path()).collect();
        assert_eq!(again, paths);
    }

    #[test]
    fn test_parse_members() {
        let types = parse(SERVICE);
        let members = &types[0].members;

        let field = members.field("_orders").unwrap();
        assert_eq!(field.type_name, "List<Order>");
        assert!(field.is_readonly);
        assert_eq!(field.default_value.as_deref(), Some("new List<Order>()"));

        assert_eq!(members.event("Changed").unwrap().type_name, "EventHandler");

        let count = members.property("Count").unwrap();
        assert!(count.has_getter && count.has_setter);
        assert_eq!(count.setter_visibility, Visibility::Private);

        let ctor = members.method("OrderService").unwrap();
        assert!(ctor.is_constructor);
        assert_eq!(ctor.initializer.as_deref(), Some("base()"));
        assert_eq!(ctor.body.as_deref(), Some("Count = capacity;"));

        let find = members.method("FindAsync").unwrap();
        assert!(find.is_async);
        assert_eq!(find.return_type, "Task<Order>");
        assert_eq!(find.parameters.len(), 2);
        assert_eq!(find.parameters[0].type_name, "int");
        assert_eq!(find.parameters[1].default_value.as_deref(), Some("\"x\""));
        assert_eq!(
            find.body.as_deref(),
            Some("var order = _orders[id];\nreturn order;")
        );

        let dispose = members.method("Dispose").unwrap();
        assert_eq!(dispose.body.as_deref(), Some("=> _orders.Clear()"));

        let iface_method = types[2].members.method("FindAsync").unwrap();
        assert_eq!(iface_method.body, None);

        let values: Vec<(&str, Option<&str>)> = types[3]
            .members
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.default_value.as_deref()))
            .collect();
        assert_eq!(values, vec![("Open", Some("1")), ("Closed", None)]);
    }

    #[test]
    fn test_file_scoped_namespace() {
        let types = parse("namespace App.Core;\n\ninternal struct Point { public int X; }\n");
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].name, "Point");
        assert_eq!(types[0].namespace, "App.Core");
        assert_eq!(types[0].visibility, Visibility::Internal);
    }

    #[test]
    fn test_generation_round_trip() {
        let syntax = CSharpSyntax::new();
        let first = parse(SERVICE);
        let text = syntax.generate_file(&first);
        let second = syntax.parse_types(&text, Path::new("Orders.cs")).unwrap();

        assert_eq!(second.len(), first.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.namespace, b.namespace);
            assert_eq!(a.base_type, b.base_type);
            assert_eq!(a.implemented_interfaces, b.implemented_interfaces);
            assert_eq!(a.declaring_type, b.declaring_type);
            assert_eq!(a.members.names(crate::model::MemberKind::Method), b.members.names(crate::model::MemberKind::Method));
            for (ma, mb) in a.members.methods.iter().zip(b.members.methods.iter()) {
                assert_eq!(ma.body, mb.body);
                assert_eq!(ma.parameters, mb.parameters);
            }
        }

        // Generation is canonical, a second pass is stable.
        assert_eq!(syntax.generate_file(&second), text);
    }

    #[test]
    fn test_parse_member_snippets() {
        let syntax = CSharpSyntax::new();

        let member = syntax
            .parse_member("public void NewMethod(int x)\n{\n    Console.WriteLine(x);\n}")
            .unwrap();
        match member {
            Member::Method(m) => {
                assert_eq!(m.name, "NewMethod");
                assert_eq!(m.start_line, 1);
                assert_eq!(m.end_line, 4);
                assert_eq!(m.body.as_deref(), Some("Console.WriteLine(x);"));
            }
            other => panic!("expected method, got {:?}", other),
        }

        let prop = syntax.parse_member("public string Name { get; set; }").unwrap();
        assert_eq!(prop.kind(), crate::model::MemberKind::Property);

        let field = syntax.parse_member("private int _count = 0;").unwrap();
        assert_eq!(field.name(), "_count");
    }

    #[test]
    fn test_parse_member_rejects_bad_snippets() {
        let syntax = CSharpSyntax::new();
        for snippet in [
            "public void Broken( {",
            "int a; int b;",
            "",
            "public class Nested { }",
        ] {
            let err = syntax.parse_member(snippet).unwrap_err();
            assert!(
                matches!(err, EngineError::InvalidInput(_)),
                "{:?} gave {:?}",
                snippet,
                err
            );
        }
    }

    #[test]
    fn test_parse_type_snippet() {
        let syntax = CSharpSyntax::new();
        let ty = syntax
            .parse_type_snippet("public interface IClock { DateTime Now { get; } }", Path::new("IClock.cs"))
            .unwrap();
        assert_eq!(ty.name, "IClock");
        assert_eq!(ty.kind, TypeKind::Interface);
        assert_eq!(ty.owning_file, PathBuf::from("IClock.cs"));

        let err = syntax
            .parse_type_snippet("class A {} class B {}", Path::new("x.cs"))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }
}

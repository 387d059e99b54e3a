//! Small text helpers shared by extraction, generation and rename.

/// Strip the common leading indentation and surrounding blank lines.
pub(crate) fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    let (first, last) = match (first, last) {
        (Some(f), Some(l)) => (f, l),
        _ => return String::new(),
    };
    let lines = &lines[first..=last];

    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| {
            if l.trim().is_empty() {
                ""
            } else {
                l.get(indent..).unwrap_or_else(|| l.trim_start()).trim_end()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Content of a `{ ... }` block, de-indented.
///
/// Text on the same line as the opening brace is kept as the first line and
/// does not take part in the indentation calculation.
pub(crate) fn block_contents(block: &str) -> String {
    let inner = block.trim();
    let inner = inner.strip_prefix('{').unwrap_or(inner);
    let inner = inner.strip_suffix('}').unwrap_or(inner);

    match inner.split_once('\n') {
        Some((head, rest)) if !head.trim().is_empty() => {
            let rest = dedent(rest);
            if rest.is_empty() {
                head.trim().to_string()
            } else {
                format!("{}\n{}", head.trim(), rest)
            }
        }
        Some((_, rest)) => dedent(rest),
        None => inner.trim().to_string(),
    }
}

/// Prefix every non-blank line with `indent`.
pub(crate) fn indent_lines(text: &str, indent: &str) -> String {
    text.lines()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                format!("{}{}", indent, l)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace whole-identifier occurrences of `old` with `new`.
///
/// `OldName` inside `List<OldName>` is replaced, inside `OldNameFactory` it
/// is not. Purely textual: string literals and comments are not skipped.
pub(crate) fn replace_identifier(text: &str, old: &str, new: &str) -> String {
    if old.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut prev: Option<char> = None;

    while let Some(pos) = rest.find(old) {
        let before = rest[..pos].chars().last().or(prev);
        let after = rest[pos + old.len()..].chars().next();
        let bounded = !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char);

        out.push_str(&rest[..pos]);
        out.push_str(if bounded { new } else { old });
        prev = old.chars().last();
        rest = &rest[pos + old.len()..];
    }
    out.push_str(rest);
    out
}

/// Case-insensitive substring test.
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// First non-blank line of a snippet, shortened for error messages.
pub(crate) fn snippet_preview(snippet: &str) -> String {
    const MAX: usize = 80;
    let line = snippet
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    if line.chars().count() > MAX {
        let cut: String = line.chars().take(MAX).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedent() {
        let text = "\n        var y = x;\n\n        if (y) {\n            return;\n        }\n    ";
        assert_eq!(dedent(text), "var y = x;\n\nif (y) {\n    return;\n}");
        assert_eq!(dedent("   \n  "), "");
    }

    #[test]
    fn test_block_contents() {
        assert_eq!(block_contents("{ return x.ToString(); }"), "return x.ToString();");
        assert_eq!(block_contents("{\n    }"), "");
        assert_eq!(
            block_contents("{\n        var a = 1;\n        return a;\n    }"),
            "var a = 1;\nreturn a;"
        );
        assert_eq!(
            block_contents("{ var a = 1;\n        return a; }"),
            "var a = 1;\nreturn a;"
        );
    }

    #[test]
    fn test_replace_identifier_respects_boundaries() {
        assert_eq!(
            replace_identifier("List<OldName> x = new OldNameFactory().Make(OldName.Default);", "OldName", "NewName"),
            "List<NewName> x = new OldNameFactory().Make(NewName.Default);"
        );
        assert_eq!(replace_identifier("OldName", "OldName", "New"), "New");
        assert_eq!(replace_identifier("OldNameOldName", "OldName", "New"), "OldNameOldName");
        assert_eq!(replace_identifier("a_OldName", "OldName", "New"), "a_OldName");
    }

    #[test]
    fn test_replace_qualified_name() {
        assert_eq!(
            replace_identifier("XCalc.Add(1); Calc.Add(2); Calc.AddAll();", "Calc.Add", "Calc.Sum"),
            "XCalc.Add(1); Calc.Sum(2); Calc.AddAll();"
        );
        assert!(contains_ignore_case("string", "String"));
    }

    #[test]
    fn test_indent_and_preview() {
        assert_eq!(indent_lines("a\n\nb", "  "), "  a\n\n  b");
        assert_eq!(snippet_preview("\n  public void Run() {\n}"), "public void Run() {");
    }
}

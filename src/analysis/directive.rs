//! Comment directives of the form `//tool:name args`.

use gofix_ast::CommentGroup;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Offset of the leading `//`.
    pub offset: u32,
    /// Empty for the `line`, `extern` and `export` directives.
    pub tool: String,
    pub name: String,
    pub args: String,
}

/// The directives among the comments of `group`.
pub fn directives(group: Option<&CommentGroup>) -> Vec<Directive> {
    let Some(group) = group else {
        return Vec::new();
    };
    group
        .list
        .iter()
        .filter_map(|comment| {
            let text = comment.text.strip_prefix("//")?;
            if text.starts_with(' ') || !is_directive(text) {
                return None;
            }
            let (tool, name_args) = match text.split_once(':') {
                Some((tool, rest)) if !tool.contains(' ') => (tool, rest),
                _ => ("", text),
            };
            let (name, args) = name_args.split_once([' ', '\t']).unwrap_or((name_args, ""));
            Some(Directive {
                offset: comment.span.start,
                tool: tool.to_string(),
                name: name.to_string(),
                args: args.trim().to_string(),
            })
        })
        .collect()
}

/// Whether `group` holds a `//go:fix inline` directive.
pub fn has_fix_inline(group: Option<&CommentGroup>) -> bool {
    directives(group)
        .iter()
        .any(|d| d.tool == "go" && d.name == "fix" && d.args == "inline")
}

/// `text` follows the `//` of a line comment.
fn is_directive(text: &str) -> bool {
    if ["line ", "extern ", "export "]
        .iter()
        .any(|prefix| text.starts_with(prefix))
    {
        return true;
    }
    let bytes = text.as_bytes();
    let Some(colon) = text.find(':') else {
        return false;
    };
    if colon == 0 || colon + 1 >= bytes.len() {
        return false;
    }
    bytes[..=colon + 1]
        .iter()
        .enumerate()
        .all(|(i, b)| i == colon || b.is_ascii_lowercase() || b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(lines: &[&str]) -> Vec<Directive> {
        let source = lines
            .iter()
            .map(|line| format!("{line}\n"))
            .collect::<String>()
            + "package p\n";
        let file = gofix_parser::parse_file(&source).expect("parses");
        directives(file.doc.as_ref())
    }

    #[test]
    fn test_go_fix_inline() {
        let found = parse(&["// Deprecated: use G.", "//go:fix inline"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tool, "go");
        assert_eq!(found[0].name, "fix");
        assert_eq!(found[0].args, "inline");
    }

    #[test]
    fn test_non_directives() {
        assert!(parse(&["// go:fix inline"]).is_empty());
        assert!(parse(&["//Go:fix inline"]).is_empty());
        assert!(parse(&["//go:"]).is_empty());
        assert!(parse(&["//:fix"]).is_empty());
    }

    #[test]
    fn test_toolless_directives() {
        let found = parse(&["//line foo.go:10", "//export F"]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].tool, "");
        assert_eq!(found[0].name, "line");
        assert_eq!(found[0].args, "foo.go:10");
        assert_eq!(found[1].name, "export");
    }
}

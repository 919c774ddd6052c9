//! Import planning for references introduced by an inlined body.

use ahash::{AHashMap, AHashSet};
use gofix_ast::{Decl, DeclKind};
use gofix_diff::TextEdit;
use gofix_typecheck::{ObjectKind, SourceFile, can_import, default_package_name};
use tracing::debug;

use crate::callee::{PkgRef, TypeText};
use crate::caller::CallSite;
use crate::error::InlineError;

/// Local names chosen for the packages an inlined body refers to, and the
/// imports that have to be added to the caller's file.
pub(crate) struct ImportPlan<'s, 'a> {
    site: &'s CallSite<'a>,
    callee: String,
    reserved: AHashSet<String>,
    chosen: AHashMap<String, Option<String>>,
    added: Vec<NewImport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NewImport {
    name: String,
    path: String,
    /// The name differs from the one the package declares.
    aliased: bool,
}

impl<'s, 'a> ImportPlan<'s, 'a> {
    pub fn new(site: &'s CallSite<'a>, callee: String, reserved: AHashSet<String>) -> Self {
        Self {
            site,
            callee,
            reserved,
            chosen: AHashMap::new(),
            added: Vec::new(),
        }
    }

    /// Names chosen so far, including those of existing imports.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.chosen.values().flatten().map(String::as_str)
    }

    /// The qualifier to use at the call site for members of package `path`,
    /// or `None` when the caller is in that package.
    pub fn name_for(&mut self, path: &str, pkg_name: &str) -> Result<Option<String>, InlineError> {
        if let Some(name) = self.chosen.get(path) {
            return Ok(name.clone());
        }
        let name = self.resolve(path, pkg_name)?;
        self.chosen.insert(path.to_string(), name.clone());
        Ok(name)
    }

    /// Prints a fully qualified type the way the caller's file spells it.
    pub fn qualify_type(&mut self, ty: &TypeText) -> Result<String, InlineError> {
        let mut pkgs: Vec<&PkgRef> = ty.pkgs.iter().collect();
        pkgs.sort_by_key(|pkg| std::cmp::Reverse(pkg.path.len()));
        let mut text = ty.text.clone();
        for pkg in pkgs {
            let qualifier = match self.name_for(&pkg.path, &pkg.name)? {
                Some(name) => format!("{name}."),
                None => String::new(),
            };
            text = replace_qualifier(&text, &format!("{}.", pkg.path), &qualifier);
        }
        Ok(text)
    }

    fn resolve(&mut self, path: &str, pkg_name: &str) -> Result<Option<String>, InlineError> {
        let site = self.site;
        if site.pkg_path() == path {
            return Ok(None);
        }
        for (_, spec) in site.source.ast.imports() {
            if spec.path.as_ref() != path {
                continue;
            }
            let name = match &spec.name {
                Some(name) if name.as_ref().name == "." => {
                    return Err(InlineError::DotImport {
                        callee: self.callee.clone(),
                        path: path.to_string(),
                    });
                }
                Some(name) if name.as_ref().is_blank() => continue,
                Some(name) => name.as_ref().name.clone(),
                None => pkg_name.to_string(),
            };
            if !self.reserved.contains(&name) && self.visible_as_import(&name, path) {
                return Ok(Some(name));
            }
        }

        if !can_import(site.pkg_path(), path) {
            return Err(InlineError::ImportForbidden {
                callee: self.callee.clone(),
                path: path.to_string(),
                from: site.pkg_path().to_string(),
            });
        }
        let base = if pkg_name.is_empty() {
            default_package_name(path)
        } else {
            pkg_name.to_string()
        };
        let name = std::iter::once(base.clone())
            .chain((0..).map(|n| format!("{base}{n}")))
            .find(|name| self.is_free(name))
            .unwrap_or(base.clone());
        debug!(%path, %name, "adding import");
        self.added.push(NewImport {
            aliased: name != base || base != default_package_name(path),
            name: name.clone(),
            path: path.to_string(),
        });
        Ok(Some(name))
    }

    fn visible_as_import(&self, name: &str, path: &str) -> bool {
        let site = self.site;
        site.program
            .lookup_at(site.file(), site.offset(), name)
            .is_some_and(|(_, id)| {
                matches!(&site.program.object(id).kind, ObjectKind::PkgName { path: p, .. } if p == path)
            })
    }

    fn is_free(&self, name: &str) -> bool {
        let site = self.site;
        !self.reserved.contains(name)
            && !self.names().any(|chosen| chosen == name)
            && site.program.lookup_at(site.file(), site.offset(), name).is_none()
            && !site
                .source
                .ast
                .imports()
                .any(|(_, spec)| spec.name.as_ref().is_some_and(|n| n.as_ref().name == name))
    }

    /// Edits adding the planned imports to the caller's file.
    pub fn edits(&self) -> Vec<TextEdit> {
        let specs: Vec<String> = self
            .added
            .iter()
            .map(|import| {
                if import.aliased {
                    format!("{} \"{}\"", import.name, import.path)
                } else {
                    format!("\"{}\"", import.path)
                }
            })
            .collect();
        import_edits(self.site.source, &specs)
    }
}

/// Edits adding import specs (`"path"` or `name "path"`) to `source`, after
/// its last import declaration.
pub fn import_edits(source: &SourceFile, specs: &[String]) -> Vec<TextEdit> {
    if specs.is_empty() {
        return Vec::new();
    }
    let text = &source.text;
    let last_import = source.ast.decls.iter().rev().find_map(|decl| match decl.as_ref() {
        Decl::Gen(gen_decl) if gen_decl.kind == DeclKind::Import => Some((decl.span(), gen_decl)),
        _ => None,
    });
    let lines: String = specs.iter().map(|spec| format!("\t{spec}\n")).collect();
    match last_import {
        None => {
            let at = source.ast.package.span().end as usize;
            let block = if let [single] = specs {
                format!("\n\nimport {single}")
            } else {
                format!("\n\nimport (\n{lines})")
            };
            vec![TextEdit::insert(at, block)]
        }
        Some((_, gen_decl)) if gen_decl.rparen.is_some() => {
            let rparen = gen_decl.rparen.map_or(0, |span| span.start as usize);
            let at = text[..rparen].rfind('\n').map_or(rparen, |idx| idx + 1);
            vec![TextEdit::insert(at, lines)]
        }
        Some((span, gen_decl)) => {
            let existing: String = gen_decl
                .specs
                .iter()
                .map(|spec| format!("\t{}\n", spec.span().slice(text)))
                .collect();
            let range = span.range();
            vec![
                TextEdit::new(range.start, range.end, format!("import (\n{existing}{lines})"))
                    .with_expected(span.slice(text)),
            ]
        }
    }
}

fn is_path_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '/' | '-' | '~')
}

/// Replaces `prefix` wherever it starts a qualified name.
fn replace_qualifier(text: &str, prefix: &str, qualifier: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut prev: Option<char> = None;
    while !rest.is_empty() {
        if rest.starts_with(prefix) && !prev.is_some_and(is_path_char) {
            out.push_str(qualifier);
            rest = &rest[prefix.len()..];
            prev = qualifier.chars().last().or(prev);
            continue;
        }
        let Some(c) = rest.chars().next() else { break };
        out.push(c);
        prev = Some(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_qualifier_respects_boundaries() {
        assert_eq!(
            replace_qualifier("map[a/b.K][]*a/b.V", "a/b.", "b."),
            "map[b.K][]*b.V"
        );
        assert_eq!(replace_qualifier("x/a/b.T", "a/b.", "b."), "x/a/b.T");
        assert_eq!(replace_qualifier("func(p.T) p.U", "p.", ""), "func(T) U");
    }
}

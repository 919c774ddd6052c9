//! Rewriting the callee's declaration text for a particular call site.
//!
//! Every edit is made to the declaration source, which is then parsed again
//! so the strategies can pick statements and operands out of the result.

use ahash::{AHashMap, AHashSet};
use gofix_ast::cursor::SyntaxIndex;
use gofix_ast::{Decl, Expr, File, FuncDecl, Ident, Node};
use gofix_diff::{TextEdit, apply_edits};
use gofix_span::Span;
use gofix_typecheck::Scopes;

use crate::binding::Binding;
use crate::callee::{Callee, RefKind};
use crate::caller::{CallSite, operand_context};
use crate::error::InlineError;
use crate::imports::ImportPlan;

/// Hands out names that do not collide with any name seen so far.
#[derive(Debug, Default)]
pub(crate) struct Namer {
    taken: AHashSet<String>,
}

impl Namer {
    pub fn new(taken: AHashSet<String>) -> Self {
        Self { taken }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    pub fn fresh(&mut self, base: &str) -> String {
        let name = if self.taken.contains(base) {
            (0..)
                .map(|n| format!("{base}{n}"))
                .find(|name| !self.taken.contains(name))
                .unwrap_or_else(|| base.to_string())
        } else {
            base.to_string()
        };
        self.taken.insert(name.clone());
        name
    }
}

/// Every name declared in a scope enclosing the call, up to the universe.
pub(crate) fn visible_names(site: &CallSite<'_>) -> AHashSet<String> {
    let scopes = &site.program.scopes;
    let mut names = AHashSet::new();
    let mut scope = Some(site.program.innermost(site.file(), site.offset()));
    while let Some(id) = scope {
        let current = scopes.get(id);
        names.extend(current.names.keys().cloned());
        scope = current.parent;
    }
    names
}

/// The callee declaration after rewriting.
pub(crate) struct Body {
    pub text: String,
    pub decl: Node<FuncDecl>,
}

impl Body {
    pub fn slice(&self, span: Span) -> &str {
        span.slice(&self.text)
    }
}

pub(crate) fn parse(callee: &Callee, text: &str) -> Result<Node<FuncDecl>, InlineError> {
    gofix_parser::parse_func_decl(text).map_err(|errors| InlineError::Parse {
        callee: callee.to_string(),
        message: errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; "),
    })
}

/// What to do with the parameters and locals of the body.
pub(crate) struct Substitution<'b> {
    pub params: Option<&'b [Binding]>,
    pub renames: &'b AHashMap<String, String>,
}

/// Rewrites the declaration for the call site: parameters are replaced per
/// their bindings, colliding locals renamed, free references qualified for
/// the caller's file and checked against shadowing.
pub(crate) fn rewrite(
    site: &CallSite<'_>,
    callee: &Callee,
    decl: &Node<FuncDecl>,
    plan: &mut ImportPlan<'_, '_>,
    subst: &Substitution<'_>,
) -> Result<Body, InlineError> {
    let file = File {
        doc: None,
        package: Node::synthetic(Ident::new("_")),
        decls: vec![decl.clone().map(Decl::Func)],
        comments: Vec::new(),
    };
    let index = SyntaxIndex::new(&file);
    let body_start = decl
        .as_ref()
        .body
        .as_ref()
        .map_or(u32::MAX, |body| body.span().start);
    let caller_pkg = site.pkg_path();
    let mut edits = Vec::new();

    for r in &callee.refs {
        let span = Span::new(r.offset as usize, r.offset as usize + r.name.len());
        let replace = |text: String| TextEdit::new(span.start as usize, span.end as usize, text);
        match &r.kind {
            RefKind::Param(i) if r.offset >= body_start => match subst.params.and_then(|p| p.get(*i)) {
                Some(Binding::Bind { name }) if *name != r.name => edits.push(replace(name.clone())),
                Some(Binding::Substitute(arg)) => {
                    let Some(id) = index.find_expr(span) else {
                        continue;
                    };
                    let parent = index.parent(id).and_then(|p| index.node(p).as_expr());
                    match parent.map(|p| (p, p.as_ref())) {
                        Some((_, Expr::Selector { x, .. })) if x.span() == span && arg.addr_of.is_some() => {
                            let inner = arg.addr_of.clone().unwrap_or_default();
                            edits.push(replace(inner));
                        }
                        Some((_, Expr::Selector { x, .. })) if x.span() == span && arg.deref_of.is_some() => {
                            let inner = arg.deref_of.clone().unwrap_or_default();
                            edits.push(replace(inner));
                        }
                        Some((star, Expr::Star(_))) if arg.addr_of.is_some() => {
                            let inner = arg.addr_of.clone().unwrap_or_default();
                            let outer = star.span();
                            edits.push(TextEdit::new(outer.start as usize, outer.end as usize, inner));
                        }
                        Some((_, shape)) => {
                            let (min, unary) = operand_context(shape, span);
                            let mut text = arg.text_at(min);
                            if unary && text.starts_with(['-', '+', '^', '!', '&', '*', '<']) {
                                text = format!("({text})");
                            }
                            edits.push(replace(text));
                        }
                        None => edits.push(replace(arg.text.clone())),
                    }
                }
                _ => {}
            },
            RefKind::Local if r.offset >= body_start => {
                if let Some(name) = subst.renames.get(&r.name) {
                    edits.push(replace(name.clone()));
                }
            }
            RefKind::PkgName { path, pkg_name } => match plan.name_for(path, pkg_name)? {
                Some(name) if name != r.name => edits.push(replace(name)),
                Some(_) => {}
                None => {
                    // Same package as the caller: drop the qualifier.
                    let Some(id) = index.find_expr(span) else {
                        continue;
                    };
                    if let Some(parent) = index.parent(id).and_then(|p| index.node(p).as_expr())
                        && let Expr::Selector { sel, .. } = parent.as_ref()
                    {
                        edits.push(TextEdit::new(
                            span.start as usize,
                            sel.span().start as usize,
                            "",
                        ));
                    }
                }
            },
            RefKind::Package {
                pkg_path,
                pkg_name,
                exported,
            } => {
                if pkg_path == caller_pkg {
                    let same = site
                        .program
                        .lookup_at(site.file(), site.offset(), &r.name)
                        .is_some_and(|(_, id)| {
                            let obj = site.program.object(id);
                            obj.is_package_level(Scopes::UNIVERSE)
                                && obj.pkg_path.as_deref() == Some(pkg_path.as_str())
                        });
                    if !same {
                        return Err(InlineError::Shadowed {
                            callee: callee.to_string(),
                            name: r.name.clone(),
                        });
                    }
                } else if !exported {
                    return Err(InlineError::Inaccessible {
                        callee: callee.to_string(),
                        name: r.name.clone(),
                    });
                } else if let Some(name) = plan.name_for(pkg_path, pkg_name)? {
                    edits.push(TextEdit::insert(span.start as usize, format!("{name}.")));
                }
            }
            RefKind::Universe => {
                let shadowed = site
                    .program
                    .lookup_at(site.file(), site.offset(), &r.name)
                    .is_some_and(|(scope, _)| scope != Scopes::UNIVERSE);
                if shadowed {
                    return Err(InlineError::Shadowed {
                        callee: callee.to_string(),
                        name: r.name.clone(),
                    });
                }
            }
            _ => {}
        }
    }

    let text = apply_edits(&callee.content, &edits).map_err(|err| InlineError::Unsupported {
        callee: callee.to_string(),
        reason: err.to_string(),
    })?;
    let decl = parse(callee, &text)?;
    Ok(Body { text, decl })
}

/// Reindents continuation lines of `text` from `from` to `to`.
pub(crate) fn reindent(text: &str, from: &str, to: &str) -> String {
    let mut lines = text.split('\n');
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        out.push('\n');
        if line.trim().is_empty() {
            continue;
        }
        out.push_str(to);
        out.push_str(line.strip_prefix(from).unwrap_or(line));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namer_suffixes_taken_names() {
        let mut namer = Namer::new(["x".to_string(), "x0".to_string()].into_iter().collect());
        assert_eq!(namer.fresh("y"), "y");
        assert_eq!(namer.fresh("x"), "x1");
        assert_eq!(namer.fresh("y"), "y0");
        assert!(namer.contains("x1"));
    }

    #[test]
    fn test_reindent_moves_continuation_lines() {
        let text = "if x {\n\t\tprintln(x)\n\t}";
        assert_eq!(reindent(text, "\t", "\t\t\t"), "if x {\n\t\t\t\tprintln(x)\n\t\t\t}");
        assert_eq!(reindent("a\n\nb", "", "\t"), "a\n\n\tb");
    }
}

//! Second pass: fixes for the uses of inlinable objects.

use std::sync::Arc;

use gofix_ast::{Expr, Node, SyntaxIndex};
use gofix_diff::{TextEdit, diff_edits};
use gofix_inline::{Callee, Caller, Options, import_edits};
use gofix_span::Span;
use gofix_typecheck::{
    ObjectId, ObjectKind, PackageId, Program, SelectionKind, SourceFile, can_import,
    default_package_name,
};
use gofix_utils::DiagnosticSeverity;
use tracing::debug;

use super::facts::{Fact, FactKey, Target};
use super::find::Inlinable;
use super::{Analyzer, Finding};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameKind {
    Const,
    Alias,
}

impl NameKind {
    fn as_str(self) -> &'static str {
        match self {
            NameKind::Const => "constant",
            NameKind::Alias => "type alias",
        }
    }

    fn title(self) -> &'static str {
        match self {
            NameKind::Const => "Constant",
            NameKind::Alias => "Type alias",
        }
    }
}

pub(super) fn inline(
    analyzer: &Analyzer<'_>,
    package: PackageId,
    inlinable: &mut Inlinable,
    findings: &mut Vec<Finding>,
) {
    let program = analyzer.program;
    let pkg_path = program.package(package).path.as_str();
    let mut pass = Pass {
        analyzer,
        program,
        pkg_path,
        inlinable,
        findings,
    };
    for &file in &program.package(package).files {
        let source = program.file(file);
        let index = SyntaxIndex::new(&source.ast);
        for (_, node) in index.preorder() {
            let Some(expr) = node.as_expr() else {
                continue;
            };
            match expr.as_ref() {
                Expr::Call { .. } => pass.call(source, expr),
                Expr::Ident(_) => pass.name(source, expr, expr.span().start),
                Expr::Selector { x, sel } if pass.is_package_name(source, x) => {
                    pass.name(source, expr, sel.span().start);
                }
                _ => {}
            }
        }
    }
}

struct Pass<'a, 'p> {
    analyzer: &'a Analyzer<'a>,
    program: &'a Program,
    pkg_path: &'a str,
    inlinable: &'p mut Inlinable,
    findings: &'p mut Vec<Finding>,
}

impl Pass<'_, '_> {
    fn is_package_name(&self, source: &SourceFile, x: &Node<Expr>) -> bool {
        matches!(x.as_ref(), Expr::Ident(_))
            && self
                .program
                .object_at(source.id, x.span().start)
                .is_some_and(|obj| {
                    matches!(self.program.object(obj).kind, ObjectKind::PkgName { .. })
                })
    }

    /// Loads the fact about `obj` from the store, once.
    fn import_fact(&mut self, obj: ObjectId) {
        let known = self.inlinable.funcs.contains_key(&obj)
            || self.inlinable.consts.contains_key(&obj)
            || self.inlinable.aliases.contains_key(&obj)
            || self.inlinable.plain.contains(&obj);
        if known {
            return;
        }
        match self
            .analyzer
            .facts
            .import(&FactKey::for_object(self.program, obj))
        {
            Some(Fact::Func { callee }) => {
                let callee = self.analyzer.cache.insert(*callee);
                self.inlinable.funcs.insert(obj, callee);
            }
            Some(Fact::Const { target }) => {
                self.inlinable.consts.insert(obj, target);
            }
            Some(Fact::Alias { target }) => {
                self.inlinable.aliases.insert(obj, target);
            }
            None => {
                self.inlinable.plain.insert(obj);
            }
        }
    }

    fn call(&mut self, source: &SourceFile, call: &Node<Expr>) {
        let Expr::Call { fun, .. } = call.as_ref() else {
            return;
        };
        let Some(func) = static_callee(self.program, source, fun) else {
            return;
        };
        self.import_fact(func);
        let Some(callee) = self.inlinable.funcs.get(&func).map(Arc::clone) else {
            return;
        };
        self.inline_call(source, call.span(), &callee);
    }

    fn inline_call(&mut self, source: &SourceFile, span: Span, callee: &Callee) {
        let caller = Caller::new(self.program, source.id, span);
        let options = Options::default();
        let result = match gofix_inline::inline(&caller, callee, &options) {
            Ok(result) => result,
            Err(err) => {
                debug!(file = %source.path, offset = span.start, "declined: {err}");
                self.findings.push(Finding::new(
                    source,
                    DiagnosticSeverity::Info,
                    span,
                    err.to_string(),
                ));
                return;
            }
        };
        if result.literalized {
            debug!(file = %source.path, offset = span.start, "suppressing literalized inlining");
            return;
        }
        let edits = diff_edits(&source.text, &result.content);
        let finding = Finding::new(
            source,
            DiagnosticSeverity::Warning,
            span,
            format!("Call of {callee} should be inlined"),
        )
        .with_fix(format!("Inline call of {callee}"), edits);
        if let Some(finding) = self.analyzer.admit(source, span.start, finding) {
            self.findings.push(finding);
        }
    }

    /// A use of a possibly inlinable constant or alias; `name_at` is the
    /// offset of its (unqualified) name.
    fn name(&mut self, source: &SourceFile, expr: &Node<Expr>, name_at: u32) {
        let Some(obj) = self.program.object_at(source.id, name_at) else {
            return;
        };
        if !matches!(
            self.program.object(obj).kind,
            ObjectKind::Const { .. } | ObjectKind::TypeName { .. }
        ) {
            return;
        }
        self.import_fact(obj);
        let (kind, target) = if let Some(target) = self.inlinable.consts.get(&obj) {
            (NameKind::Const, target.clone())
        } else if let Some(target) = self.inlinable.aliases.get(&obj) {
            (NameKind::Alias, target.clone())
        } else {
            return;
        };
        self.inline_name(source, expr, kind, &target);
    }

    fn inline_name(&mut self, source: &SourceFile, expr: &Node<Expr>, kind: NameKind, target: &Target) {
        let span = expr.span();
        let mut edits = Vec::new();
        let prefix = if target.pkg_path == self.pkg_path {
            // The right-hand name must mean the same thing here.
            let same = self
                .program
                .lookup_at(source.id, span.start, &target.name)
                .is_some_and(|(_, obj)| self.is_target(obj, target));
            if !same {
                debug!(file = %source.path, offset = span.start, name = %target.name, "right-hand side is shadowed");
                return;
            }
            String::new()
        } else if !can_import(self.pkg_path, &target.pkg_path) {
            debug!(path = %target.pkg_path, "cannot import right-hand side package");
            return;
        } else {
            let (prefix, import) = self.qualifier(source, span.start, target);
            edits.extend(import);
            prefix
        };

        let text = span.slice(&source.text);
        edits.push(
            TextEdit::new(
                span.start as usize,
                span.end as usize,
                format!("{prefix}{}", target.name),
            )
            .with_expected(text),
        );
        let finding = Finding::new(
            source,
            DiagnosticSeverity::Warning,
            span,
            format!("{} {text} should be inlined", kind.title()),
        )
        .with_fix(format!("Inline {} {text}", kind.as_str()), edits);
        if let Some(finding) = self.analyzer.admit(source, span.start, finding) {
            self.findings.push(finding);
        }
    }

    fn is_target(&self, obj: ObjectId, target: &Target) -> bool {
        let object = self.program.object(obj);
        object.name == target.name
            && object.pkg_path.as_deref() == Some(target.pkg_path.as_str())
            && object.pkg.is_some_and(|pkg| {
                self.program
                    .package(pkg)
                    .scope
                    .is_some_and(|scope| object.parent == Some(scope))
            })
    }

    /// The qualifier for members of the target's package at `offset`, and
    /// the import to add when the file does not import it yet.
    fn qualifier(&self, source: &SourceFile, offset: u32, target: &Target) -> (String, Vec<TextEdit>) {
        let path = target.pkg_path.as_str();
        for (_, spec) in source.ast.imports() {
            if spec.path.as_ref() != path {
                continue;
            }
            let name = match &spec.name {
                Some(name) if name.as_ref().name == "." => return (String::new(), Vec::new()),
                Some(name) if name.as_ref().is_blank() => continue,
                Some(name) => name.as_ref().name.clone(),
                None => target.pkg_name.clone(),
            };
            let visible = self
                .program
                .lookup_at(source.id, offset, &name)
                .is_some_and(|(_, obj)| {
                    matches!(&self.program.object(obj).kind, ObjectKind::PkgName { path: p, .. } if p == path)
                });
            if visible {
                return (format!("{name}."), Vec::new());
            }
        }

        let base = target.pkg_name.clone();
        let taken = |name: &str| {
            self.program.lookup_at(source.id, offset, name).is_some()
                || source
                    .ast
                    .imports()
                    .any(|(_, spec)| spec.name.as_ref().is_some_and(|n| n.as_ref().name == name))
        };
        let name = std::iter::once(base.clone())
            .chain((0..).map(|n| format!("{base}{n}")))
            .find(|name| !taken(name))
            .unwrap_or_else(|| base.clone());
        let spec = if name == default_package_name(path) {
            format!("\"{path}\"")
        } else {
            format!("{name} \"{path}\"")
        };
        debug!(%path, %name, "adding import");
        (format!("{name}."), import_edits(source, &[spec]))
    }
}

/// The declared function or concrete method a call statically invokes.
fn static_callee(program: &Program, source: &SourceFile, fun: &Node<Expr>) -> Option<ObjectId> {
    let fun = match fun.as_ref() {
        Expr::Paren(inner) => return static_callee(program, source, inner),
        _ => fun,
    };
    let obj = match fun.as_ref() {
        Expr::Ident(_) => program.object_at(source.id, fun.span().start)?,
        Expr::Selector { sel, .. } => match program.selection(source.id, fun.span()) {
            Some(selection) if selection.kind == SelectionKind::MethodVal => selection.obj,
            Some(_) => return None,
            None => program.object_at(source.id, sel.span().start)?,
        },
        _ => return None,
    };
    matches!(
        program.object(obj).kind,
        ObjectKind::Func { decl: Some(_), .. }
    )
    .then_some(obj)
}

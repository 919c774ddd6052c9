//! First pass: objects marked `//go:fix inline`.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use gofix_ast::{Decl, DeclKind, Expr, FuncDecl, GenDecl, Node, Spec, TypeSpec, ValueSpec};
use gofix_inline::{Callee, CalleeKey, analyze_callee};
use gofix_span::Span;
use gofix_typecheck::{ObjectId, ObjectKind, PackageId, Program, SourceFile, default_package_name};
use gofix_utils::DiagnosticSeverity;
use tracing::{debug, warn};

use super::directive::has_fix_inline;
use super::facts::{Fact, FactKey, Target};
use super::{Analyzer, Finding};

/// The inlinable objects known while analyzing one package: those it
/// declares and those imported from facts so far.
#[derive(Default)]
pub(super) struct Inlinable {
    pub funcs: AHashMap<ObjectId, Arc<Callee>>,
    pub consts: AHashMap<ObjectId, Target>,
    pub aliases: AHashMap<ObjectId, Target>,
    /// Objects known to have no fact.
    pub plain: AHashSet<ObjectId>,
}

pub(super) fn find(
    analyzer: &Analyzer<'_>,
    package: PackageId,
    findings: &mut Vec<Finding>,
) -> Inlinable {
    let program = analyzer.program;
    let mut finder = Finder {
        analyzer,
        program,
        inlinable: Inlinable::default(),
        findings,
    };
    for &file in &program.package(package).files {
        let source = program.file(file);
        for decl in &source.ast.decls {
            match decl.as_ref() {
                Decl::Func(func) => finder.func(source, func),
                Decl::Gen(gen_decl) => finder.gen_decl(source, gen_decl),
            }
        }
    }
    finder.inlinable
}

struct Finder<'a, 'f> {
    analyzer: &'a Analyzer<'a>,
    program: &'a Program,
    inlinable: Inlinable,
    findings: &'f mut Vec<Finding>,
}

impl Finder<'_, '_> {
    fn report(&mut self, source: &SourceFile, span: Span, message: String) {
        self.findings
            .push(Finding::new(source, DiagnosticSeverity::Error, span, message));
    }

    fn export(&self, obj: ObjectId, fact: &Fact) {
        let object = self.program.object(obj);
        if !object.is_exported() {
            return;
        }
        let key = FactKey::for_object(self.program, obj);
        if let Err(err) = self.analyzer.facts.export(key, fact) {
            warn!(name = %object.name, "cannot export fact: {err}");
        }
    }

    fn func(&mut self, source: &SourceFile, func: &FuncDecl) {
        if !has_fix_inline(func.doc.as_ref()) {
            return;
        }
        let Some(obj) = self.program.object_at(source.id, func.name.span().start) else {
            return;
        };
        let program = self.program;
        let key = CalleeKey::for_func(program, obj);
        match self
            .analyzer
            .cache
            .get_or_insert_with(&key, || analyze_callee(program, obj))
        {
            Ok(callee) => {
                debug!(callee = %callee, "inlinable function");
                // Methods are exported only when their receiver type is.
                let exported = match &program.object(obj).kind {
                    ObjectKind::Func {
                        recv: Some(recv), ..
                    } => recv
                        .base
                        .is_some_and(|base| program.object(base).is_exported()),
                    _ => true,
                };
                if exported {
                    self.export(
                        obj,
                        &Fact::Func {
                            callee: Box::new(Callee::clone(&callee)),
                        },
                    );
                }
                self.inlinable.funcs.insert(obj, callee);
            }
            Err(err) => {
                let span = func
                    .doc
                    .as_ref()
                    .map_or(func.name.span(), |doc| doc.span());
                self.report(source, span, format!("invalid inlining candidate: {err}"));
            }
        }
    }

    fn gen_decl(&mut self, source: &SourceFile, decl: &GenDecl) {
        if decl.kind != DeclKind::Const && decl.kind != DeclKind::Type {
            return;
        }
        // The directive may be on the whole declaration or on single specs.
        let decl_inline = has_fix_inline(decl.doc.as_ref());
        for spec in &decl.specs {
            match spec.as_ref() {
                Spec::Value(value) => self.constant(source, value, decl_inline),
                Spec::Type(type_spec) => self.alias(source, type_spec, decl_inline),
                Spec::Import(_) => {}
            }
        }
    }

    fn constant(&mut self, source: &SourceFile, spec: &ValueSpec, decl_inline: bool) {
        if !decl_inline && !has_fix_inline(spec.doc.as_ref()) {
            return;
        }
        // Names past the values repeat an implicit expression, usually iota.
        for (name, value) in spec.names.iter().zip(&spec.values) {
            let rhs = match value.as_ref() {
                Expr::Ident(_) => {
                    if self.is_iota(source, value) {
                        self.report(
                            source,
                            value.span(),
                            "invalid //go:fix inline directive: const value is iota".to_string(),
                        );
                        return;
                    }
                    value.span().start
                }
                Expr::Selector { sel, .. } => sel.span().start,
                _ => {
                    self.not_a_constant(source, value);
                    return;
                }
            };
            let target = self
                .program
                .object_at(source.id, rhs)
                .and_then(|obj| self.target(obj, |kind| matches!(kind, ObjectKind::Const { .. })));
            let (Some(lhs), Some(target)) =
                (self.program.object_at(source.id, name.span().start), target)
            else {
                self.not_a_constant(source, value);
                return;
            };
            debug!(name = %name.as_ref().name, target = %target.name, "inlinable constant");
            self.export(lhs, &Fact::Const { target: target.clone() });
            self.inlinable.consts.insert(lhs, target);
        }
    }

    fn not_a_constant(&mut self, source: &SourceFile, value: &Node<Expr>) {
        self.report(
            source,
            value.span(),
            "invalid //go:fix inline directive: const value is not the name of another constant"
                .to_string(),
        );
    }

    fn is_iota(&self, source: &SourceFile, value: &Node<Expr>) -> bool {
        self.program.object_at(source.id, value.span().start) == Some(self.program.universe.iota)
    }

    fn alias(&mut self, source: &SourceFile, spec: &TypeSpec, decl_inline: bool) {
        if !decl_inline && !has_fix_inline(spec.doc.as_ref()) {
            return;
        }
        if !spec.assign {
            self.report(
                source,
                spec.name.span(),
                "invalid //go:fix inline directive: not a type alias".to_string(),
            );
            return;
        }
        // Only aliases of another named type are inlined.
        let rhs = unparen(&spec.ty);
        let rhs = match rhs.as_ref() {
            Expr::Ident(_) => rhs.span().start,
            Expr::Selector { sel, .. } => sel.span().start,
            _ => return,
        };
        let target = self
            .program
            .object_at(source.id, rhs)
            .and_then(|obj| self.target(obj, |kind| matches!(kind, ObjectKind::TypeName { .. })));
        let (Some(lhs), Some(target)) =
            (self.program.object_at(source.id, spec.name.span().start), target)
        else {
            return;
        };
        debug!(name = %spec.name.as_ref().name, target = %target.name, "inlinable alias");
        self.export(lhs, &Fact::Alias { target: target.clone() });
        self.inlinable.aliases.insert(lhs, target);
    }

    /// Describes the object named on a right-hand side. Members of packages
    /// outside the program are taken on trust; universe objects are not
    /// inlined.
    fn target(&self, obj: ObjectId, kind_ok: impl Fn(&ObjectKind) -> bool) -> Option<Target> {
        let object = self.program.object(obj);
        match &object.kind {
            ObjectKind::External { path } => Some(Target {
                pkg_path: path.clone(),
                pkg_name: default_package_name(path),
                name: object.name.clone(),
            }),
            kind if kind_ok(kind) => {
                let package = self.program.package(object.pkg?);
                Some(Target {
                    pkg_path: package.path.clone(),
                    pkg_name: package.name.clone(),
                    name: object.name.clone(),
                })
            }
            _ => None,
        }
    }
}

fn unparen(expr: &Node<Expr>) -> &Node<Expr> {
    match expr.as_ref() {
        Expr::Paren(inner) => unparen(inner),
        _ => expr,
    }
}

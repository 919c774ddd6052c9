//! Callee summaries.
//!
//! A [`Callee`] captures everything the engine needs to know about an
//! inlinable function: its source text, how every identifier in it resolves,
//! how its parameters are used and in which order its body first touches
//! them. It is computed once per function, holds no references into the
//! program, and serializes to JSON so it can travel between packages as a
//! fact.

use core::fmt;

use ahash::AHashMap;
use gofix_ast::visitor::{self, Visitor};
use gofix_ast::{Expr, FieldList, Ident, Node, Statement};
use gofix_span::{FileId, Span};
use gofix_typecheck::{
    ObjectId, ObjectKind, Program, Scopes, Type, VarKind, full_qualifier, underlying,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::CalleeKey;
use crate::error::InlineError;
use crate::usage::BodyWalker;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    pub type_name: String,
    pub pointer: bool,
}

/// A package referenced by a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PkgRef {
    pub path: String,
    pub name: String,
}

/// A type printed with every named type qualified by its package path,
/// e.g. `[]example.com/p.T`, with the packages it mentions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeText {
    pub text: String,
    pub pkgs: Vec<PkgRef>,
}

impl TypeText {
    pub fn new(program: &Program, ty: &Type) -> Self {
        let mut pkgs = Vec::new();
        collect_pkgs(program, ty, &mut pkgs);
        Self {
            text: program.type_string(ty, &full_qualifier),
            pkgs,
        }
    }
}

fn collect_pkgs(program: &Program, ty: &Type, out: &mut Vec<PkgRef>) {
    match ty {
        Type::Named(id) => {
            let obj = program.object(*id);
            if let Some(path) = &obj.pkg_path
                && !out.iter().any(|pkg| &pkg.path == path)
            {
                let name = obj
                    .pkg
                    .map(|pkg| program.package(pkg).name.clone())
                    .unwrap_or_else(|| gofix_typecheck::default_package_name(path));
                out.push(PkgRef {
                    path: path.clone(),
                    name,
                });
            }
        }
        Type::Pointer(elem) | Type::Slice(elem) | Type::Array(_, elem) | Type::Chan(_, elem) => {
            collect_pkgs(program, elem, out);
        }
        Type::Map(key, value) => {
            collect_pkgs(program, key, out);
            collect_pkgs(program, value, out);
        }
        Type::Signature(sig) => {
            for ty in sig.params.iter().chain(&sig.results) {
                collect_pkgs(program, ty, out);
            }
        }
        Type::Struct(fields) => {
            for field in fields {
                collect_pkgs(program, &program.object(*field).ty, out);
            }
        }
        Type::Interface { methods, embeddeds } => {
            for method in methods {
                collect_pkgs(program, &program.object(*method).ty, out);
            }
            for ty in embeddeds {
                collect_pkgs(program, ty, out);
            }
        }
        Type::Tuple(types) => {
            for ty in types {
                collect_pkgs(program, ty, out);
            }
        }
        Type::Invalid | Type::Basic(_) => {}
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// `_` for blank and unnamed parameters.
    pub name: String,
    pub ty: TypeText,
    pub interface: bool,
    pub receiver: bool,
    /// Number of references in the body.
    pub refs: usize,
    /// Assigned to, or its address taken.
    pub assigned: bool,
    pub in_loop: bool,
    pub in_closure: bool,
}

impl Param {
    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultVar {
    pub name: Option<String>,
    pub ty: TypeText,
}

/// What an identifier occurrence in the declaration denotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefKind {
    /// A parameter, by index into [`Callee::params`] (receiver first).
    Param(usize),
    Result(usize),
    /// Declared inside the function.
    Local,
    /// A package-level object.
    Package {
        pkg_path: String,
        pkg_name: String,
        exported: bool,
    },
    /// The qualifier of an imported name.
    PkgName { path: String, pkg_name: String },
    Universe,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    /// Offset of the identifier within [`Callee::content`].
    pub offset: u32,
    pub name: String,
    pub kind: RefKind,
}

/// One entry of the body's effect sequence, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// First reference to a parameter.
    Param(usize),
    /// First read of memory the callee does not own.
    Read,
    /// First write, call or other effect that may be observed.
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnInfo {
    pub offset: u32,
    /// Per operand: its type differs from the declared result type.
    pub conversions: Vec<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyShape {
    pub statements: usize,
    /// The body is a single `return` with operands.
    pub return_expr: bool,
    /// The body is a single expression statement and there are no results.
    pub expr_stmt: bool,
    /// No `return` other than (possibly) the final statement.
    pub tail_return_only: bool,
    pub has_defer: bool,
    pub has_labels: bool,
    pub named_results: bool,
}

/// Summary of an inlinable function or method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callee {
    pub name: String,
    pub pkg_path: String,
    pub pkg_name: String,
    pub recv: Option<Receiver>,
    /// Fully qualified signature, e.g. `func(a int) int`.
    pub signature: String,
    /// Source text of the declaration; all offsets are relative to it.
    pub content: String,
    /// Receiver first, then the declared parameters.
    pub params: Vec<Param>,
    pub results: Vec<ResultVar>,
    pub variadic: bool,
    pub refs: Vec<Ref>,
    pub effects: Vec<Effect>,
    pub returns: Vec<ReturnInfo>,
    pub shape: BodyShape,
}

impl Callee {
    pub fn key(&self) -> CalleeKey {
        let name = match &self.recv {
            Some(recv) => format!("{}.{}", recv.type_name, self.name),
            None => self.name.clone(),
        };
        CalleeKey::new(&self.pkg_path, &name, &self.signature)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub(crate) fn is_method(&self) -> bool {
        self.recv.is_some()
    }

    /// Parameters as they appear in an argument list, without the receiver.
    pub(crate) fn declared_params(&self) -> usize {
        self.params.len() - usize::from(self.is_method())
    }
}

impl fmt::Display for Callee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.recv {
            Some(Receiver {
                type_name,
                pointer: true,
            }) => write!(f, "(*{}.{type_name}).{}", self.pkg_path, self.name),
            Some(Receiver { type_name, .. }) => {
                write!(f, "({}.{type_name}).{}", self.pkg_path, self.name)
            }
            None => write!(f, "{}.{}", self.pkg_path, self.name),
        }
    }
}

/// The display name of a function object, formatted like [`Callee`].
pub fn func_name(program: &Program, func: ObjectId) -> String {
    let obj = program.object(func);
    let pkg_path = obj.pkg_path.as_deref().unwrap_or_default();
    match &obj.kind {
        ObjectKind::Func {
            recv: Some(recv), ..
        } => {
            let base = recv
                .base
                .map(|base| program.object(base).name.clone())
                .unwrap_or_default();
            let star = if recv.pointer { "*" } else { "" };
            format!("({star}{pkg_path}.{base}).{}", obj.name)
        }
        _ => format!("{pkg_path}.{}", obj.name),
    }
}

/// Summarizes the function or method declared by `func`.
pub fn analyze_callee(program: &Program, func: ObjectId) -> Result<Callee, InlineError> {
    let display = func_name(program, func);
    let obj = program.object(func);
    let (recv_info, decl_loc) = match &obj.kind {
        ObjectKind::Func { recv, decl } => (*recv, *decl),
        _ => (None, None),
    };
    let no_body = || InlineError::NoBody {
        callee: display.clone(),
    };
    let (file_id, decl_span) = decl_loc.ok_or_else(no_body)?;
    let file = program.file(file_id);
    let decl = file
        .ast
        .funcs()
        .find(|(span, _)| *span == decl_span)
        .map(|(_, decl)| decl)
        .ok_or_else(no_body)?;
    let body = decl.body.as_ref().ok_or_else(no_body)?;

    let pkg_path = obj.pkg_path.clone().unwrap_or_default();
    let pkg_name = obj
        .pkg
        .map(|pkg| program.package(pkg).name.clone())
        .unwrap_or_default();
    let recv = recv_info.map(|info| Receiver {
        type_name: info
            .base
            .map(|base| program.object(base).name.clone())
            .unwrap_or_default(),
        pointer: info.pointer,
    });

    let mut params = Vec::new();
    let mut param_ids = AHashMap::new();
    if let Some(recv_list) = &decl.recv {
        collect_vars(program, file_id, recv_list.as_ref(), true, &mut params, &mut param_ids);
    }
    collect_vars(program, file_id, &decl.ty.as_ref().params, false, &mut params, &mut param_ids);

    let mut result_vars = Vec::new();
    let mut result_ids = AHashMap::new();
    let mut result_types = Vec::new();
    if let Some(results) = &decl.ty.as_ref().results {
        let mut vars = Vec::new();
        collect_vars(program, file_id, results, false, &mut vars, &mut result_ids);
        for (var, field_ty) in vars.into_iter().zip(field_types(program, file_id, results)) {
            result_types.push(field_ty);
            result_vars.push(ResultVar {
                name: (!var.is_blank()).then_some(var.name),
                ty: var.ty,
            });
        }
    }

    let base = decl_span.start;
    let mut collector = RefCollector {
        program,
        file: file_id,
        base,
        decl_span,
        func,
        name_offset: decl.name.span().start,
        params: &param_ids,
        results: &result_ids,
        refs: Vec::new(),
    };
    visitor::walk_func_decl(decl, &mut collector);
    let refs = collector.refs;

    let mut walker = BodyWalker::new(program, file_id, base, &param_ids, params.len(), result_types);
    walker.body(&body.as_ref().stmts);
    for (param, usage) in params.iter_mut().zip(&walker.usage) {
        param.refs = usage.refs;
        param.assigned = usage.assigned;
        param.in_loop = usage.in_loop;
        param.in_closure = usage.in_closure;
    }

    let stmts = &body.as_ref().stmts;
    let has_results = decl.ty.as_ref().result_count() > 0;
    let tail_return_only = match walker.returns.as_slice() {
        [] => true,
        [only] => stmts
            .last()
            .is_some_and(|last| matches!(last.as_ref(), Statement::Return(_)) && last.span().start - base == only.offset),
        _ => false,
    };
    let shape = BodyShape {
        statements: stmts.len(),
        return_expr: matches!(stmts.as_slice(), [stmt] if matches!(stmt.as_ref(), Statement::Return(results) if !results.is_empty())),
        expr_stmt: !has_results
            && matches!(stmts.as_slice(), [stmt] if matches!(stmt.as_ref(), Statement::Expr(_))),
        tail_return_only,
        has_defer: walker.has_defer,
        has_labels: walker.has_labels,
        named_results: decl
            .ty
            .as_ref()
            .results
            .as_ref()
            .is_some_and(FieldList::is_named),
    };

    let signature = program.type_string(&obj.ty, &full_qualifier);
    let callee = Callee {
        name: obj.name.clone(),
        pkg_path,
        pkg_name,
        recv,
        signature,
        content: decl_span.slice(&file.text).to_string(),
        variadic: decl.ty.as_ref().is_variadic(),
        params,
        results: result_vars,
        refs,
        effects: walker.effects,
        returns: walker.returns,
        shape,
    };
    debug!(
        callee = %callee,
        params = callee.params.len(),
        effects = ?callee.effects,
        "analyzed callee"
    );
    Ok(callee)
}

fn field_types(program: &Program, file: FileId, list: &FieldList) -> Vec<Type> {
    let mut types = Vec::new();
    for field in &list.fields {
        let field = field.as_ref();
        let ty = program
            .type_of(file, field.ty.span())
            .cloned()
            .unwrap_or_default();
        for _ in 0..field.names.len().max(1) {
            types.push(ty.clone());
        }
    }
    types
}

fn collect_vars(
    program: &Program,
    file: FileId,
    list: &FieldList,
    receiver: bool,
    out: &mut Vec<Param>,
    ids: &mut AHashMap<ObjectId, usize>,
) {
    for field in &list.fields {
        let field = field.as_ref();
        let ty = program
            .type_of(file, field.ty.span())
            .cloned()
            .unwrap_or_default();
        let param = |name: &str| Param {
            name: name.to_string(),
            ty: TypeText::new(program, &ty),
            interface: matches!(underlying(&program.objects, &ty), Type::Interface { .. }),
            receiver,
            refs: 0,
            assigned: false,
            in_loop: false,
            in_closure: false,
        };
        if field.names.is_empty() {
            out.push(param("_"));
            continue;
        }
        for name in &field.names {
            if let Some(id) = program.object_at(file, name.span().start) {
                ids.insert(id, out.len());
            }
            out.push(param(&name.as_ref().name));
        }
    }
}

/// Classifies every identifier of a declaration.
struct RefCollector<'a> {
    program: &'a Program,
    file: FileId,
    base: u32,
    decl_span: Span,
    func: ObjectId,
    name_offset: u32,
    params: &'a AHashMap<ObjectId, usize>,
    results: &'a AHashMap<ObjectId, usize>,
    refs: Vec<Ref>,
}

impl RefCollector<'_> {
    fn classify(&mut self, offset: u32, name: &str) {
        if name == "_" || offset == self.name_offset {
            return;
        }
        let Some(id) = self.program.object_at(self.file, offset) else {
            return;
        };
        let obj = self.program.object(id);
        let kind = if let Some(&index) = self.params.get(&id) {
            RefKind::Param(index)
        } else if let Some(&index) = self.results.get(&id) {
            RefKind::Result(index)
        } else {
            match &obj.kind {
                ObjectKind::PkgName { path, package } => RefKind::PkgName {
                    path: path.clone(),
                    pkg_name: package.map_or_else(
                        || gofix_typecheck::default_package_name(path),
                        |pkg| self.program.package(pkg).name.clone(),
                    ),
                },
                ObjectKind::Var(VarKind::Field { .. }) | ObjectKind::External { .. } => return,
                _ if obj.parent == Some(Scopes::UNIVERSE) => RefKind::Universe,
                _ if obj.pos.is_some_and(|pos| {
                    pos.file == self.file && self.decl_span.contains(pos.offset as usize)
                }) && id != self.func =>
                {
                    RefKind::Local
                }
                _ if obj.is_package_level(Scopes::UNIVERSE) => RefKind::Package {
                    pkg_path: obj.pkg_path.clone().unwrap_or_default(),
                    pkg_name: obj
                        .pkg
                        .map(|pkg| self.program.package(pkg).name.clone())
                        .unwrap_or_default(),
                    exported: obj.is_exported(),
                },
                _ => return,
            }
        };
        self.refs.push(Ref {
            offset: offset - self.base,
            name: name.to_string(),
            kind,
        });
    }
}

impl Visitor for RefCollector<'_> {
    fn visit_expression(&mut self, expr: &Node<Expr>) {
        if let Expr::Ident(ident) = expr.as_ref() {
            self.classify(expr.span().start, &ident.name);
        }
    }

    fn visit_ident(&mut self, ident: &Node<Ident>) {
        self.classify(ident.span().start, &ident.as_ref().name);
    }

    fn visit_statement(&mut self, stmt: &Node<Statement>) {
        // The `v` of `switch v := x.(type)` has one object per clause and
        // none of its own; record it so renaming treats it like the others.
        if let Statement::TypeSwitch { assign, .. } = stmt.as_ref()
            && let Statement::Assign { lhs, .. } = assign.as_ref().as_ref()
            && let Some(var) = lhs.first()
            && let Expr::Ident(ident) = var.as_ref()
            && !ident.is_blank()
            && self.program.object_at(self.file, var.span().start).is_none()
        {
            self.refs.push(Ref {
                offset: var.span().start - self.base,
                name: ident.name.clone(),
                kind: RefKind::Local,
            });
        }
    }
}

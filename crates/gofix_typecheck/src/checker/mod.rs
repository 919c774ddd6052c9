//! Resolution and typing of one package.
//!
//! Package-level objects are collected first and resolved lazily in
//! declaration order, so that references may point forward. Function bodies
//! are checked once every package-level object has a type.

mod expr;
mod stmt;
mod typexpr;

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use gofix_ast::{Decl, DeclKind, Expr, File, FuncDecl, GenDecl, Ident, ImportSpec, Node, Spec};
use gofix_span::{FileId, Pos, Span};
use tracing::trace;

use crate::error::CheckError;
use crate::objects::{Object, ObjectId, ObjectKind, PackageId, RecvInfo, ScopeId, VarKind};
use crate::program::{Mode, Program, TypeAndValue};
use crate::scope::ScopeKind;
use crate::types::Type;
use crate::{default_package_name, lookup};

struct FileCtx {
    id: FileId,
    ast: Arc<File>,
    scope: ScopeId,
}

/// A package-level declaration awaiting resolution. Indices address
/// `files[file].ast.decls[decl]` and its specs.
#[derive(Debug, Clone, Copy)]
enum DeclRef {
    Const {
        file: usize,
        decl: usize,
        spec: usize,
        /// The last spec in the group with explicit values.
        values_spec: usize,
        name: usize,
    },
    Var {
        file: usize,
        decl: usize,
        spec: usize,
    },
    Type {
        file: usize,
        decl: usize,
        spec: usize,
    },
    Func {
        file: usize,
        decl: usize,
    },
}

impl DeclRef {
    fn file(self) -> usize {
        match self {
            DeclRef::Const { file, .. }
            | DeclRef::Var { file, .. }
            | DeclRef::Type { file, .. }
            | DeclRef::Func { file, .. } => file,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Context {
    file: usize,
    scope: ScopeId,
    iota: Option<u64>,
}

pub(crate) struct Checker<'p> {
    prog: &'p mut Program,
    pkg: PackageId,
    pkg_path: String,
    pkg_scope: ScopeId,
    files: Vec<FileCtx>,
    pending: AHashMap<ObjectId, DeclRef>,
    resolving: AHashSet<ObjectId>,
    ctx: Context,
    /// Result types of the enclosing function literals and declarations.
    results: Vec<Vec<Type>>,
    labels: AHashMap<String, ObjectId>,
}

fn gen_decl(ast: &File, decl: usize) -> Option<&GenDecl> {
    match ast.decls.get(decl).map(Node::as_ref) {
        Some(Decl::Gen(gen_decl)) => Some(gen_decl),
        _ => None,
    }
}

fn value_spec(gen_decl: &GenDecl, spec: usize) -> Option<&gofix_ast::ValueSpec> {
    match gen_decl.specs.get(spec).map(Node::as_ref) {
        Some(Spec::Value(value)) => Some(value),
        _ => None,
    }
}

/// The receiver base type name and whether the receiver is a pointer.
fn receiver_base(recv: &gofix_ast::FieldList) -> Option<(&str, bool)> {
    let field = recv.fields.first()?;
    match field.as_ref().ty.as_ref().unparen() {
        Expr::Ident(ident) => Some((ident.name.as_str(), false)),
        Expr::Star(inner) => inner
            .as_ref()
            .as_ref()
            .unparen()
            .as_ident()
            .map(|ident| (ident.name.as_str(), true)),
        _ => None,
    }
}

impl<'p> Checker<'p> {
    pub(crate) fn new(prog: &'p mut Program, pkg: PackageId) -> Self {
        let pkg_path = prog.packages[pkg.index()].path.clone();
        let pkg_scope = prog
            .scopes
            .alloc(ScopeKind::Package, Some(prog.universe.scope), None, Span::default());
        prog.packages[pkg.index()].scope = Some(pkg_scope);
        Self {
            prog,
            pkg,
            pkg_path,
            pkg_scope,
            files: Vec::new(),
            pending: AHashMap::new(),
            resolving: AHashSet::new(),
            ctx: Context {
                file: 0,
                scope: pkg_scope,
                iota: None,
            },
            results: Vec::new(),
            labels: AHashMap::new(),
        }
    }

    pub(crate) fn check_package(mut self) {
        trace!(package = %self.pkg_path, "checking package");
        self.collect();

        let mut order: Vec<ObjectId> = self.pending.keys().copied().collect();
        order.sort();
        // Types first, so that field and method lookups see every declared
        // structure.
        let (types, others): (Vec<ObjectId>, Vec<ObjectId>) = order
            .into_iter()
            .partition(|id| matches!(self.pending.get(id), Some(DeclRef::Type { .. })));
        for id in types.into_iter().chain(others) {
            self.resolve(id);
        }

        self.check_bodies();
    }

    fn collect(&mut self) {
        let file_ids = self.prog.packages[self.pkg.index()].files.clone();
        for file_id in file_ids {
            let source = self.prog.file(file_id);
            let ast = Arc::clone(&source.ast);
            let extent = Span::new(0, source.text.len());
            let scope =
                self.prog
                    .scopes
                    .alloc(ScopeKind::File, Some(self.pkg_scope), Some(file_id), extent);
            self.prog.files[file_id.0 as usize].scope = Some(scope);
            self.files.push(FileCtx {
                id: file_id,
                ast,
                scope,
            });
        }

        let mut methods: Vec<(ObjectId, String)> = Vec::new();
        for file in 0..self.files.len() {
            let ast = Arc::clone(&self.files[file].ast);
            self.ctx.file = file;
            for (decl_idx, decl) in ast.decls.iter().enumerate() {
                match decl.as_ref() {
                    Decl::Gen(gen_decl) => self.collect_gen_decl(file, decl_idx, gen_decl),
                    Decl::Func(func) => {
                        if let Some(method) = self.collect_func(file, decl_idx, decl.span(), func) {
                            methods.push(method);
                        }
                    }
                }
            }
        }

        for (method, base) in methods {
            let Some(type_name) = self.prog.scopes.get(self.pkg_scope).lookup(&base) else {
                continue;
            };
            if let ObjectKind::TypeName { methods, .. } =
                &mut self.prog.objects.get_mut(type_name).kind
            {
                methods.push(method);
            }
            if let ObjectKind::Func {
                recv: Some(recv), ..
            } = &mut self.prog.objects.get_mut(method).kind
            {
                recv.base = Some(type_name);
            }
        }
    }

    fn collect_gen_decl(&mut self, file: usize, decl: usize, gen_decl: &GenDecl) {
        let mut values_spec = 0;
        for (spec_idx, spec) in gen_decl.specs.iter().enumerate() {
            match spec.as_ref() {
                Spec::Import(import) => self.collect_import(spec.span(), import),
                Spec::Value(value) if gen_decl.kind == DeclKind::Const => {
                    if !value.values.is_empty() || spec_idx == 0 {
                        values_spec = spec_idx;
                    }
                    for (name_idx, name) in value.names.iter().enumerate() {
                        let id = self.declare(
                            self.pkg_scope,
                            name,
                            ObjectKind::Const { is_iota: false },
                            Type::Invalid,
                            None,
                        );
                        self.pending.insert(
                            id,
                            DeclRef::Const {
                                file,
                                decl,
                                spec: spec_idx,
                                values_spec,
                                name: name_idx,
                            },
                        );
                    }
                }
                Spec::Value(value) => {
                    for name in &value.names {
                        let id = self.declare(
                            self.pkg_scope,
                            name,
                            ObjectKind::Var(VarKind::Package),
                            Type::Invalid,
                            None,
                        );
                        self.pending.insert(
                            id,
                            DeclRef::Var {
                                file,
                                decl,
                                spec: spec_idx,
                            },
                        );
                    }
                }
                Spec::Type(type_spec) => {
                    let id = self.declare_type_name(self.pkg_scope, &type_spec.name, type_spec.assign, None);
                    self.pending.insert(
                        id,
                        DeclRef::Type {
                            file,
                            decl,
                            spec: spec_idx,
                        },
                    );
                }
            }
        }
    }

    fn collect_func(
        &mut self,
        file: usize,
        decl: usize,
        span: Span,
        func: &FuncDecl,
    ) -> Option<(ObjectId, String)> {
        let decl_ref = DeclRef::Func { file, decl };
        let location = Some((self.files[file].id, span));
        if let Some(recv) = &func.recv {
            let base = receiver_base(recv.as_ref());
            let id = self.new_object(
                &func.name,
                ObjectKind::Func {
                    recv: Some(RecvInfo {
                        base: None,
                        pointer: base.is_some_and(|(_, pointer)| pointer),
                    }),
                    decl: location,
                },
                Type::Invalid,
                None,
                None,
            );
            self.record_def(&func.name, id);
            self.pending.insert(id, decl_ref);
            return base.map(|(name, _)| (id, name.to_string()));
        }

        let name = func.name.as_ref();
        let kind = ObjectKind::Func {
            recv: None,
            decl: location,
        };
        let id = if name.is_blank() || name.name == "init" {
            let id = self.new_object(&func.name, kind, Type::Invalid, Some(self.pkg_scope), None);
            self.record_def(&func.name, id);
            id
        } else {
            self.declare(self.pkg_scope, &func.name, kind, Type::Invalid, None)
        };
        self.pending.insert(id, decl_ref);
        None
    }

    fn collect_import(&mut self, span: Span, import: &ImportSpec) {
        let path = import.path.as_ref().clone();
        let target = self.prog.by_path.get(&path).copied();
        let explicit = import.name.as_ref().map(|name| name.as_ref().name.as_str());
        let file_scope = self.files[self.ctx.file].scope;

        match explicit {
            Some("_") => return,
            Some(".") => {
                let Some(scope) = target.and_then(|pkg| self.prog.packages[pkg.index()].scope) else {
                    return;
                };
                let exported: Vec<(String, ObjectId)> = self
                    .prog
                    .scopes
                    .get(scope)
                    .names
                    .iter()
                    .filter(|(name, _)| gofix_ast::is_exported(name))
                    .map(|(name, id)| (name.clone(), *id))
                    .collect();
                for (name, id) in exported {
                    self.prog.scopes.insert(file_scope, &name, id);
                }
                return;
            }
            _ => {}
        }

        let name = match explicit {
            Some(name) => name.to_string(),
            None => match target {
                Some(pkg) => self.prog.packages[pkg.index()].name.clone(),
                None => default_package_name(&path),
            },
        };
        let pos = import
            .name
            .as_ref()
            .map_or(span.start, |name| name.span().start);
        let object = Object {
            name: name.clone(),
            kind: ObjectKind::PkgName {
                path,
                package: target,
            },
            pkg: Some(self.pkg),
            pkg_path: Some(self.pkg_path.clone()),
            pos: Some(self.pos_at(pos)),
            parent: Some(file_scope),
            scope_pos: None,
            ty: Type::Invalid,
        };
        let id = self.prog.objects.alloc(object);
        self.prog.scopes.insert(file_scope, &name, id);
        match &import.name {
            Some(ident) => self.record_def(ident, id),
            None => {
                let file_id = self.file_id();
                self.prog.info.implicits.insert((file_id, span), id);
            }
        }
    }

    /// Gives a pending package-level object its type.
    fn resolve(&mut self, id: ObjectId) {
        let Some(decl) = self.pending.remove(&id) else {
            return;
        };
        let saved = self.ctx;
        let file = decl.file();
        self.ctx = Context {
            file,
            scope: self.files[file].scope,
            iota: None,
        };
        self.resolving.insert(id);
        let ast = Arc::clone(&self.files[file].ast);

        match decl {
            DeclRef::Const {
                decl,
                spec,
                values_spec,
                name,
                ..
            } => self.resolve_const(&ast, id, decl, spec, values_spec, name),
            DeclRef::Var { decl, spec, .. } => {
                if let Some(value) = gen_decl(&ast, decl).and_then(|g| value_spec(g, spec)) {
                    let types = self.value_spec_types(value);
                    for (name, ty) in value.names.iter().zip(types) {
                        let pos = self.pos_at(name.span().start);
                        if let Some(&sibling) = self.prog.info.defs.get(&pos) {
                            self.pending.remove(&sibling);
                            self.prog.objects.get_mut(sibling).ty = ty;
                        }
                    }
                }
            }
            DeclRef::Type { decl, spec, .. } => {
                if let Some(Spec::Type(type_spec)) =
                    gen_decl(&ast, decl).and_then(|g| g.specs.get(spec)).map(Node::as_ref)
                {
                    self.resolve_type_spec(id, type_spec);
                }
            }
            DeclRef::Func { decl, .. } => {
                if let Some(Decl::Func(func)) = ast.decls.get(decl).map(Node::as_ref) {
                    if let Some(recv) = &func.recv {
                        for field in &recv.as_ref().fields {
                            self.type_expr(&field.as_ref().ty);
                        }
                    }
                    let sig = self.signature(func.ty.as_ref(), false);
                    self.prog.objects.get_mut(id).ty = Type::Signature(Box::new(sig));
                }
            }
        }

        self.resolving.remove(&id);
        self.ctx = saved;
    }

    fn resolve_const(
        &mut self,
        ast: &File,
        id: ObjectId,
        decl: usize,
        spec: usize,
        values_spec: usize,
        name: usize,
    ) {
        let Some(gen_decl) = gen_decl(ast, decl) else {
            return;
        };
        let (Some(own), Some(values)) = (value_spec(gen_decl, spec), value_spec(gen_decl, values_spec))
        else {
            return;
        };
        self.ctx.iota = Some(spec as u64);
        let declared = if own.values.is_empty() {
            values.ty.as_ref()
        } else {
            own.ty.as_ref()
        }
        .map(|ty| self.type_expr(ty));

        let (ty, is_iota) = match values.values.get(name) {
            Some(value) => {
                let tv = self.expr(value);
                let is_iota = value.as_ref().is_ident("iota")
                    && self.prog.info.uses.get(&self.pos_at(value.span().start))
                        == Some(&self.prog.universe.iota);
                (declared.unwrap_or(tv.ty), is_iota)
            }
            None => (declared.unwrap_or_default(), false),
        };
        let object = self.prog.objects.get_mut(id);
        object.ty = ty;
        object.kind = ObjectKind::Const { is_iota };
    }

    fn resolve_type_spec(&mut self, id: ObjectId, spec: &gofix_ast::TypeSpec) {
        let ty = self.type_expr(&spec.ty);
        if spec.assign {
            self.prog.objects.get_mut(id).ty = ty;
            return;
        }
        let underlying = self.underlying_of(&ty);
        if let ObjectKind::TypeName {
            underlying: slot, ..
        } = &mut self.prog.objects.get_mut(id).kind
        {
            *slot = Some(underlying);
        }
    }

    fn check_bodies(&mut self) {
        for file in 0..self.files.len() {
            let ast = Arc::clone(&self.files[file].ast);
            for decl in &ast.decls {
                let Decl::Func(func) = decl.as_ref() else {
                    continue;
                };
                let Some(body) = &func.body else {
                    continue;
                };
                self.ctx = Context {
                    file,
                    scope: self.files[file].scope,
                    iota: None,
                };
                self.func_body(func.recv.as_ref(), func.ty.as_ref(), body, decl.span());
            }
        }
    }

    // Helpers shared by the expression and statement checkers.

    fn file_id(&self) -> FileId {
        self.files[self.ctx.file].id
    }

    fn pos_at(&self, offset: u32) -> Pos {
        Pos::new(self.file_id(), offset)
    }

    fn error(&mut self, error: CheckError) {
        self.prog.errors.push(error);
    }

    fn record_def(&mut self, ident: &Node<Ident>, id: ObjectId) {
        let pos = self.pos_at(ident.span().start);
        self.prog.info.defs.insert(pos, id);
    }

    fn record_use(&mut self, ident: &Node<Ident>, id: ObjectId) {
        let pos = self.pos_at(ident.span().start);
        self.prog.info.uses.insert(pos, id);
    }

    fn record(&mut self, span: Span, tv: &TypeAndValue) {
        let key = (self.file_id(), span);
        self.prog.info.types.insert(key, tv.clone());
    }

    fn new_object(
        &mut self,
        ident: &Node<Ident>,
        kind: ObjectKind,
        ty: Type,
        parent: Option<ScopeId>,
        scope_pos: Option<u32>,
    ) -> ObjectId {
        let object = Object {
            name: ident.as_ref().name.clone(),
            kind,
            pkg: Some(self.pkg),
            pkg_path: Some(self.pkg_path.clone()),
            pos: Some(self.pos_at(ident.span().start)),
            parent,
            scope_pos,
            ty,
        };
        self.prog.objects.alloc(object)
    }

    /// Creates an object for `ident` and inserts it in `scope`.
    ///
    /// The blank identifier gets an object and a definition but is never
    /// inserted.
    fn declare(
        &mut self,
        scope: ScopeId,
        ident: &Node<Ident>,
        kind: ObjectKind,
        ty: Type,
        scope_pos: Option<u32>,
    ) -> ObjectId {
        let id = self.new_object(ident, kind, ty, Some(scope), scope_pos);
        self.record_def(ident, id);
        let name = ident.as_ref();
        if !name.is_blank() && self.prog.scopes.insert(scope, &name.name, id).is_some() {
            let pos = self.pos_at(ident.span().start);
            self.error(CheckError::Redeclared {
                name: name.name.clone(),
                pos,
            });
        }
        id
    }

    fn declare_type_name(
        &mut self,
        scope: ScopeId,
        ident: &Node<Ident>,
        alias: bool,
        scope_pos: Option<u32>,
    ) -> ObjectId {
        let id = self.declare(
            scope,
            ident,
            ObjectKind::TypeName {
                alias,
                underlying: None,
                methods: Vec::new(),
            },
            Type::Invalid,
            scope_pos,
        );
        if !alias {
            self.prog.objects.get_mut(id).ty = Type::Named(id);
        }
        id
    }

    /// Resolves `ident` in the current scope, recording the use.
    fn lookup_ident(&mut self, ident: &Node<Ident>) -> Option<ObjectId> {
        let name = &ident.as_ref().name;
        let found = self.prog.scopes.lookup_parent(
            &self.prog.objects,
            self.ctx.scope,
            name,
            ident.span().start,
        );
        let Some((_, id)) = found else {
            let pos = self.pos_at(ident.span().start);
            self.error(CheckError::Undefined {
                name: name.clone(),
                pos,
            });
            return None;
        };
        self.record_use(ident, id);
        self.ensure_resolved(id, ident.span());
        Some(id)
    }

    fn ensure_resolved(&mut self, id: ObjectId, at: Span) {
        if self.pending.contains_key(&id) {
            self.resolve(id);
        } else if self.resolving.contains(&id) {
            let object = self.prog.objects.get(id);
            if object.is_var() || object.is_const() {
                let name = object.name.clone();
                let pos = self.pos_at(at.start);
                self.error(CheckError::Cycle { name, pos });
            }
        }
    }

    fn underlying_of(&mut self, ty: &Type) -> Type {
        if let Type::Named(id) = ty {
            self.ensure_resolved(*id, Span::default());
        }
        lookup::underlying(&self.prog.objects, ty).clone()
    }

    fn object_tv(&self, id: ObjectId) -> TypeAndValue {
        let object = self.prog.objects.get(id);
        let mode = match &object.kind {
            ObjectKind::Const { .. } => Mode::Constant,
            ObjectKind::TypeName { .. } => Mode::TypeExpr,
            ObjectKind::Var(_) => Mode::Variable,
            ObjectKind::Func { .. } | ObjectKind::External { .. } => Mode::Value,
            ObjectKind::Builtin(builtin) => Mode::Builtin(*builtin),
            ObjectKind::Nil => Mode::Value,
            ObjectKind::PkgName { .. } | ObjectKind::Label => Mode::Invalid,
        };
        TypeAndValue {
            mode,
            ty: object.ty.clone(),
        }
    }

    fn external(&mut self, path: &str, name: &str) -> ObjectId {
        let key = (path.to_string(), name.to_string());
        if let Some(id) = self.prog.externals.get(&key) {
            return *id;
        }
        let id = self.prog.objects.alloc(Object {
            name: name.to_string(),
            kind: ObjectKind::External {
                path: path.to_string(),
            },
            pkg: None,
            pkg_path: Some(path.to_string()),
            pos: None,
            parent: None,
            scope_pos: None,
            ty: Type::Invalid,
        });
        self.prog.externals.insert(key, id);
        id
    }

    /// Opens a child scope of the current one and returns the previous scope.
    fn open_scope(&mut self, kind: ScopeKind, extent: Span) -> ScopeId {
        let file = self.file_id();
        let saved = self.ctx.scope;
        self.ctx.scope = self
            .prog
            .scopes
            .alloc(kind, Some(saved), Some(file), extent);
        saved
    }

    fn close_scope(&mut self, saved: ScopeId) {
        self.ctx.scope = saved;
    }
}

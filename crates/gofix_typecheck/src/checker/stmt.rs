use gofix_ast::{
    AssignOp, CaseClause, DeclKind, Expr, GenDecl, Ident, Node, Spec, Statement, ValueSpec,
};

use super::Checker;
use crate::error::CheckError;
use crate::objects::{ObjectId, ObjectKind, VarKind};
use crate::program::{Mode, TypeAndValue};
use crate::scope::ScopeKind;
use crate::types::{BasicKind, Type};

/// Splits the type of a single multi-valued expression over `count` names.
fn spread(tv: &TypeAndValue, count: usize) -> Vec<Type> {
    match (&tv.ty, tv.mode) {
        (Type::Tuple(types), _) if types.len() == count => types.clone(),
        (ty, Mode::CommaOk | Mode::MapIndex) if count == 2 => {
            vec![ty.clone(), Type::Basic(BasicKind::Bool)]
        }
        _ => vec![Type::Invalid; count],
    }
}

impl Checker<'_> {
    pub(super) fn stmts(&mut self, stmts: &[Node<Statement>]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Node<Statement>) {
        match stmt.as_ref() {
            Statement::Decl(decl) => self.local_decl(decl.as_ref()),
            Statement::Labeled { label, stmt: inner } => {
                if let Some(&id) = self.labels.get(&label.as_ref().name) {
                    self.record_def(label, id);
                }
                self.stmt(inner);
            }
            Statement::Expr(expr) => {
                self.expr(expr);
            }
            Statement::Send { chan, value } => {
                let chan_ty = self.expr(chan).ty;
                let elem = match self.underlying_of(&chan_ty) {
                    Type::Chan(_, elem) => Some(*elem),
                    _ => None,
                };
                self.expr_with_hint(value, elem.as_ref());
            }
            Statement::IncDec { x, .. } => {
                self.expr(x);
            }
            Statement::Assign { lhs, op, rhs } => self.assign(stmt, lhs, *op, rhs),
            Statement::Go(call) | Statement::Defer(call) => {
                self.expr(call);
            }
            Statement::Return(values) => {
                let results = self.results.last().cloned().unwrap_or_default();
                for (idx, value) in values.iter().enumerate() {
                    self.expr_with_hint(value, results.get(idx));
                }
            }
            Statement::Branch { label, .. } => {
                if let Some(label) = label {
                    match self.labels.get(&label.as_ref().name).copied() {
                        Some(id) => self.record_use(label, id),
                        None => {
                            let pos = self.pos_at(label.span().start);
                            self.error(CheckError::invalid(
                                pos,
                                format!("label {} not defined", label.as_ref().name),
                            ));
                        }
                    }
                }
            }
            Statement::Block(block) => {
                let saved = self.open_scope(ScopeKind::Block, block.span());
                self.stmts(&block.as_ref().stmts);
                self.close_scope(saved);
            }
            Statement::If {
                init,
                cond,
                then,
                els,
            } => {
                let saved = self.open_scope(ScopeKind::Block, stmt.span());
                if let Some(init) = init {
                    self.stmt(init);
                }
                self.expr(cond);
                let inner = self.open_scope(ScopeKind::Block, then.span());
                self.stmts(&then.as_ref().stmts);
                self.close_scope(inner);
                if let Some(els) = els {
                    self.stmt(els);
                }
                self.close_scope(saved);
            }
            Statement::Switch { init, tag, body } => {
                let saved = self.open_scope(ScopeKind::Block, stmt.span());
                if let Some(init) = init {
                    self.stmt(init);
                }
                let tag_ty = tag.as_ref().map(|tag| self.expr(tag).ty);
                for clause in body {
                    let inner = self.open_scope(ScopeKind::Block, clause.span());
                    for expr in &clause.as_ref().list {
                        self.expr_with_hint(expr, tag_ty.as_ref());
                    }
                    self.stmts(&clause.as_ref().body);
                    self.close_scope(inner);
                }
                self.close_scope(saved);
            }
            Statement::TypeSwitch { init, assign, body } => {
                let saved = self.open_scope(ScopeKind::Block, stmt.span());
                if let Some(init) = init {
                    self.stmt(init);
                }
                self.type_switch(assign, body);
                self.close_scope(saved);
            }
            Statement::For {
                init,
                cond,
                post,
                body,
            } => {
                let saved = self.open_scope(ScopeKind::Block, stmt.span());
                if let Some(init) = init {
                    self.stmt(init);
                }
                if let Some(cond) = cond {
                    self.expr(cond);
                }
                if let Some(post) = post {
                    self.stmt(post);
                }
                let inner = self.open_scope(ScopeKind::Block, body.span());
                self.stmts(&body.as_ref().stmts);
                self.close_scope(inner);
                self.close_scope(saved);
            }
            Statement::Range {
                key,
                value,
                define,
                x,
                body,
            } => {
                let saved = self.open_scope(ScopeKind::Block, stmt.span());
                let operand = self.expr(x);
                let (key_ty, value_ty) = self.range_types(&operand.ty);
                if *define {
                    let scope_pos = body.span().start;
                    for (expr, ty) in [(key, key_ty), (value, value_ty)] {
                        if let Some(expr) = expr
                            && let Expr::Ident(ident) = expr.as_ref()
                        {
                            let ident = Node::new(ident.clone(), expr.span());
                            let scope = self.ctx.scope;
                            self.declare(
                                scope,
                                &ident,
                                ObjectKind::Var(VarKind::Local),
                                ty,
                                Some(scope_pos),
                            );
                        }
                    }
                } else {
                    for expr in [key, value].into_iter().flatten() {
                        self.expr(expr);
                    }
                }
                let inner = self.open_scope(ScopeKind::Block, body.span());
                self.stmts(&body.as_ref().stmts);
                self.close_scope(inner);
                self.close_scope(saved);
            }
            Statement::Empty => {}
        }
    }

    fn range_types(&mut self, ty: &Type) -> (Type, Type) {
        let int = Type::Basic(BasicKind::Int);
        match self.underlying_of(ty) {
            Type::Slice(elem) | Type::Array(_, elem) => (int, *elem),
            Type::Pointer(inner) => match self.underlying_of(&inner) {
                Type::Array(_, elem) => (int, *elem),
                _ => (Type::Invalid, Type::Invalid),
            },
            Type::Basic(kind) if kind.is_string() => (int, Type::Basic(BasicKind::Int32)),
            Type::Basic(_) => (ty.default_type(), Type::Invalid),
            Type::Map(key, value) => (*key, *value),
            Type::Chan(_, elem) => (*elem, Type::Invalid),
            Type::Signature(sig) => {
                // Range over a function: the yield callback's parameters.
                let yield_params = sig
                    .params
                    .first()
                    .and_then(|param| param.as_signature().map(|s| s.params.clone()))
                    .unwrap_or_default();
                let mut params = yield_params.into_iter();
                (
                    params.next().unwrap_or_default(),
                    params.next().unwrap_or_default(),
                )
            }
            _ => (Type::Invalid, Type::Invalid),
        }
    }

    fn assign(
        &mut self,
        stmt: &Node<Statement>,
        lhs: &[Node<Expr>],
        op: AssignOp,
        rhs: &[Node<Expr>],
    ) {
        if op != AssignOp::Define {
            let mut targets = Vec::with_capacity(lhs.len());
            for target in lhs {
                if target.as_ref().is_ident("_") {
                    targets.push(None);
                } else {
                    targets.push(Some(self.expr(target).ty));
                }
            }
            for (idx, value) in rhs.iter().enumerate() {
                let hint = targets.get(idx).cloned().flatten();
                self.expr_with_hint(value, hint.as_ref());
            }
            return;
        }

        let types = if rhs.len() == lhs.len() {
            rhs.iter()
                .map(|value| self.expr(value).ty.default_type())
                .collect()
        } else if rhs.len() == 1 {
            let tv = self.expr(&rhs[0]);
            spread(&tv, lhs.len())
        } else {
            for value in rhs {
                self.expr(value);
            }
            vec![Type::Invalid; lhs.len()]
        };

        let scope = self.ctx.scope;
        let scope_pos = stmt.span().end;
        let mut fresh = false;
        for (target, ty) in lhs.iter().zip(types) {
            let Expr::Ident(ident) = target.as_ref() else {
                self.expr(target);
                continue;
            };
            let ident = Node::new(ident.clone(), target.span());
            if !ident.as_ref().is_blank()
                && let Some(existing) = self.prog.scopes.get(scope).lookup(&ident.as_ref().name)
            {
                self.record_use(&ident, existing);
                continue;
            }
            fresh |= !ident.as_ref().is_blank();
            let ty = if matches!(ty, Type::Basic(BasicKind::UntypedNil)) {
                Type::Invalid
            } else {
                ty
            };
            self.declare(
                scope,
                &ident,
                ObjectKind::Var(VarKind::Local),
                ty,
                Some(scope_pos),
            );
        }
        if !fresh {
            let pos = self.pos_at(stmt.span().start);
            self.error(CheckError::invalid(pos, "no new variables on left side of :="));
        }
    }

    fn type_switch(&mut self, assign: &Node<Statement>, body: &[Node<CaseClause>]) {
        let (binding, guard) = match assign.as_ref() {
            Statement::Expr(guard) => (None, guard),
            Statement::Assign { lhs, rhs, .. } if lhs.len() == 1 && rhs.len() == 1 => {
                let binding = lhs[0]
                    .as_ref()
                    .as_ident()
                    .map(|ident| Node::new(ident.clone(), lhs[0].span()));
                (binding, &rhs[0])
            }
            _ => return,
        };
        let Expr::TypeAssert { x, ty: None } = guard.as_ref().unparen() else {
            self.expr(guard);
            return;
        };
        let operand = self.expr(x);
        self.record(
            guard.span(),
            &TypeAndValue {
                mode: Mode::Value,
                ty: operand.ty.clone(),
            },
        );

        for clause in body {
            let inner = self.open_scope(ScopeKind::Block, clause.span());
            let mut case_types = Vec::new();
            for expr in &clause.as_ref().list {
                if expr.as_ref().is_ident("nil") {
                    self.expr(expr);
                    case_types.push(None);
                } else {
                    case_types.push(Some(self.type_expr(expr)));
                }
            }
            if let Some(binding) = &binding
                && !binding.as_ref().is_blank()
            {
                let ty = match case_types.as_slice() {
                    [Some(single)] => single.clone(),
                    _ => operand.ty.clone(),
                };
                let scope_pos = clause
                    .as_ref()
                    .list
                    .last()
                    .map_or(clause.span().start, |expr| expr.span().end);
                let id = self.clause_var(binding, ty, scope_pos);
                let key = (self.file_id(), clause.span());
                self.prog.info.implicits.insert(key, id);
            }
            self.stmts(&clause.as_ref().body);
            self.close_scope(inner);
        }
    }

    /// The implicitly declared variable of one type switch clause.
    fn clause_var(&mut self, binding: &Node<Ident>, ty: Type, scope_pos: u32) -> ObjectId {
        let scope = self.ctx.scope;
        let id = self.new_object(
            binding,
            ObjectKind::Var(VarKind::Local),
            ty,
            Some(scope),
            Some(scope_pos),
        );
        self.prog.scopes.insert(scope, &binding.as_ref().name, id);
        id
    }

    fn local_decl(&mut self, decl: &GenDecl) {
        let scope = self.ctx.scope;
        let mut values_spec: Option<&ValueSpec> = None;
        for (spec_idx, spec) in decl.specs.iter().enumerate() {
            let scope_pos = spec.span().end;
            match (decl.kind, spec.as_ref()) {
                (DeclKind::Const, Spec::Value(value)) => {
                    if !value.values.is_empty() || values_spec.is_none() {
                        values_spec = Some(value);
                    }
                    let Some(source) = values_spec else {
                        continue;
                    };
                    let saved_iota = self.ctx.iota.replace(spec_idx as u64);
                    let declared = if value.values.is_empty() {
                        source.ty.as_ref()
                    } else {
                        value.ty.as_ref()
                    }
                    .map(|ty| self.type_expr(ty));
                    for (idx, name) in value.names.iter().enumerate() {
                        let ty = match source.values.get(idx) {
                            Some(expr) => {
                                let tv = self.expr(expr);
                                declared.clone().unwrap_or(tv.ty)
                            }
                            None => declared.clone().unwrap_or_default(),
                        };
                        let is_iota = source
                            .values
                            .get(idx)
                            .is_some_and(|expr| expr.as_ref().is_ident("iota"));
                        self.declare(scope, name, ObjectKind::Const { is_iota }, ty, Some(scope_pos));
                    }
                    self.ctx.iota = saved_iota;
                }
                (_, Spec::Value(value)) => {
                    let types = self.value_spec_types(value);
                    for (name, ty) in value.names.iter().zip(types) {
                        self.declare(
                            scope,
                            name,
                            ObjectKind::Var(VarKind::Local),
                            ty,
                            Some(scope_pos),
                        );
                    }
                }
                (_, Spec::Type(type_spec)) => {
                    let id = self.declare_type_name(
                        scope,
                        &type_spec.name,
                        type_spec.assign,
                        Some(type_spec.name.span().start),
                    );
                    self.resolve_type_spec(id, type_spec);
                }
                (_, Spec::Import(_)) => {}
            }
        }
    }

    /// Types of the names declared by a `var` spec.
    pub(super) fn value_spec_types(&mut self, spec: &ValueSpec) -> Vec<Type> {
        let declared = spec.ty.as_ref().map(|ty| self.type_expr(ty));
        let count = spec.names.len();
        let inferred = if spec.values.len() == count {
            spec.values
                .iter()
                .map(|value| self.expr_with_hint(value, declared.as_ref()).ty.default_type())
                .collect()
        } else if spec.values.len() == 1 {
            let tv = self.expr(&spec.values[0]);
            spread(&tv, count)
        } else {
            for value in &spec.values {
                self.expr(value);
            }
            vec![Type::Invalid; count]
        };
        match declared {
            Some(declared) => vec![declared; count],
            None => inferred,
        }
    }

    /// Declares every label of a function body up front so that forward
    /// `goto` targets resolve.
    pub(super) fn collect_labels(&mut self, stmts: &[Node<Statement>]) {
        for stmt in stmts {
            self.collect_label(stmt);
        }
    }

    fn collect_label(&mut self, stmt: &Node<Statement>) {
        match stmt.as_ref() {
            Statement::Labeled { label, stmt: inner } => {
                let id = self.new_object(label, ObjectKind::Label, Type::Invalid, None, None);
                self.labels.insert(label.as_ref().name.clone(), id);
                self.collect_label(inner);
            }
            Statement::Block(block) => self.collect_labels(&block.as_ref().stmts),
            Statement::If { then, els, .. } => {
                self.collect_labels(&then.as_ref().stmts);
                if let Some(els) = els {
                    self.collect_label(els);
                }
            }
            Statement::For { body, .. } | Statement::Range { body, .. } => {
                self.collect_labels(&body.as_ref().stmts);
            }
            Statement::Switch { body, .. } | Statement::TypeSwitch { body, .. } => {
                for clause in body {
                    self.collect_labels(&clause.as_ref().body);
                }
            }
            _ => {}
        }
    }
}

//! Parameter usage and effect ordering of a callee body.
//!
//! The walk follows Go evaluation order. The effect sequence only records the
//! straight-line prefix of the body: once control flow begins, a final
//! `Write` stands for everything that follows.

use ahash::AHashMap;
use gofix_ast::{AssignOp, BranchKind, CaseClause, Expr, Node, Statement, UnaryOp};
use gofix_span::FileId;
use gofix_typecheck::{
    Mode, ObjectId, ObjectKind, Program, SelectionKind, Type, VarKind, has_pointer_receiver,
    identical,
};

use crate::callee::{Effect, ReturnInfo};

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ParamUsage {
    pub refs: usize,
    pub assigned: bool,
    pub in_loop: bool,
    pub in_closure: bool,
}

pub(crate) struct BodyWalker<'a> {
    program: &'a Program,
    file: FileId,
    base: u32,
    params: &'a AHashMap<ObjectId, usize>,
    result_types: Vec<Type>,
    pub usage: Vec<ParamUsage>,
    pub effects: Vec<Effect>,
    pub returns: Vec<ReturnInfo>,
    pub has_defer: bool,
    pub has_labels: bool,
    loop_depth: usize,
    closure_depth: usize,
    seen: Vec<bool>,
    read_seen: bool,
    write_seen: bool,
    stopped: bool,
}

impl<'a> BodyWalker<'a> {
    pub fn new(
        program: &'a Program,
        file: FileId,
        base: u32,
        params: &'a AHashMap<ObjectId, usize>,
        count: usize,
        result_types: Vec<Type>,
    ) -> Self {
        Self {
            program,
            file,
            base,
            params,
            result_types,
            usage: vec![ParamUsage::default(); count],
            effects: Vec::new(),
            returns: Vec::new(),
            has_defer: false,
            has_labels: false,
            loop_depth: 0,
            closure_depth: 0,
            seen: vec![false; count],
            read_seen: false,
            write_seen: false,
            stopped: false,
        }
    }

    fn recording(&self) -> bool {
        self.closure_depth == 0 && !self.stopped
    }

    fn param_of(&self, expr: &Node<Expr>) -> Option<usize> {
        let Expr::Ident(_) = expr.as_ref() else {
            return None;
        };
        let id = self.program.object_at(self.file, expr.span().start)?;
        self.params.get(&id).copied()
    }

    fn use_param(&mut self, index: usize) {
        let usage = &mut self.usage[index];
        usage.refs += 1;
        usage.in_loop |= self.loop_depth > 0;
        usage.in_closure |= self.closure_depth > 0;
        if self.recording() && !self.seen[index] {
            self.seen[index] = true;
            self.effects.push(Effect::Param(index));
        }
    }

    fn read(&mut self) {
        if self.recording() && !self.read_seen {
            self.read_seen = true;
            self.effects.push(Effect::Read);
        }
    }

    fn write(&mut self) {
        if self.recording() && !self.write_seen {
            self.write_seen = true;
            self.effects.push(Effect::Write);
        }
    }

    /// Control flow: nothing after this point has a known order.
    fn stop(&mut self) {
        self.write();
        self.stopped = true;
    }

    fn mode(&self, expr: &Node<Expr>) -> Mode {
        self.program
            .type_and_value(self.file, expr.span())
            .map_or(Mode::Invalid, |tv| tv.mode)
    }

    /// Marks the parameter at the root of an addressable operand as assigned.
    fn address_taken(&mut self, expr: &Node<Expr>) {
        match expr.as_ref() {
            Expr::Paren(x) => self.address_taken(x),
            Expr::Selector { x, .. } => {
                let indirect = self
                    .program
                    .selection(self.file, expr.span())
                    .is_some_and(|sel| sel.indirect);
                if !indirect {
                    self.address_taken(x);
                }
            }
            Expr::Index { x, .. } => {
                let is_array = self
                    .program
                    .type_of(self.file, x.span())
                    .is_some_and(|ty| matches!(ty, Type::Array(..)));
                if is_array {
                    self.address_taken(x);
                }
            }
            Expr::Ident(_) => {
                if let Some(index) = self.param_of(expr) {
                    self.usage[index].assigned = true;
                }
            }
            _ => {}
        }
    }

    pub fn body(&mut self, stmts: &[Node<Statement>]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn clauses(&mut self, clauses: &[Node<CaseClause>]) {
        for clause in clauses {
            for expr in &clause.as_ref().list {
                self.expr(expr);
            }
            self.body(&clause.as_ref().body);
        }
    }

    fn opt_stmt(&mut self, stmt: Option<&Node<Statement>>) {
        if let Some(stmt) = stmt {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Node<Statement>) {
        match stmt.as_ref() {
            Statement::Decl(decl) => {
                for spec in &decl.as_ref().specs {
                    if let gofix_ast::Spec::Value(value) = spec.as_ref() {
                        for expr in &value.values {
                            self.expr(expr);
                        }
                    }
                }
            }
            Statement::Labeled { stmt, .. } => {
                self.has_labels = true;
                self.stmt(stmt);
            }
            Statement::Expr(expr) => self.expr(expr),
            Statement::Send { chan, value } => {
                self.expr(chan);
                self.expr(value);
                self.write();
            }
            Statement::IncDec { x, .. } => {
                self.expr(x);
                self.lhs(x);
            }
            Statement::Assign { lhs, op, rhs } => {
                for expr in rhs {
                    self.expr(expr);
                }
                for target in lhs {
                    match op {
                        AssignOp::Define => {
                            // `:=` at the top level may redeclare a parameter.
                            if let Some(index) = self.param_of(target) {
                                self.usage[index].assigned = true;
                                self.usage[index].refs += 1;
                            }
                        }
                        AssignOp::Assign => self.lhs(target),
                        AssignOp::Op(_) => {
                            self.expr(target);
                            self.lhs(target);
                        }
                    }
                }
            }
            Statement::Go(call) | Statement::Defer(call) => {
                self.has_defer |= matches!(stmt.as_ref(), Statement::Defer(_));
                self.expr(call);
                self.stop();
            }
            Statement::Return(results) => {
                for expr in results {
                    self.expr(expr);
                }
                if self.closure_depth == 0 {
                    self.record_return(stmt, results);
                }
            }
            Statement::Branch { kind, .. } => {
                if *kind == BranchKind::Goto {
                    self.has_labels = true;
                }
                self.stop();
            }
            Statement::Block(block) => self.body(&block.as_ref().stmts),
            Statement::If {
                init,
                cond,
                then,
                els,
            } => {
                self.opt_stmt(init.as_deref());
                self.expr(cond);
                self.stop();
                self.body(&then.as_ref().stmts);
                self.opt_stmt(els.as_deref());
            }
            Statement::Switch { init, tag, body } => {
                self.opt_stmt(init.as_deref());
                if let Some(tag) = tag {
                    self.expr(tag);
                }
                self.stop();
                self.clauses(body);
            }
            Statement::TypeSwitch { init, assign, body } => {
                self.opt_stmt(init.as_deref());
                self.stmt(assign);
                self.stop();
                self.clauses(body);
            }
            Statement::For {
                init,
                cond,
                post,
                body,
            } => {
                self.opt_stmt(init.as_deref());
                self.stop();
                self.loop_depth += 1;
                if let Some(cond) = cond {
                    self.expr(cond);
                }
                self.opt_stmt(post.as_deref());
                self.body(&body.as_ref().stmts);
                self.loop_depth -= 1;
            }
            Statement::Range {
                key,
                value,
                define,
                x,
                body,
            } => {
                self.expr(x);
                self.stop();
                self.loop_depth += 1;
                if !define {
                    for target in key.iter().chain(value) {
                        self.lhs(target);
                    }
                }
                self.body(&body.as_ref().stmts);
                self.loop_depth -= 1;
            }
            Statement::Empty => {}
        }
    }

    /// An assignment target.
    fn lhs(&mut self, target: &Node<Expr>) {
        match target.as_ref() {
            Expr::Paren(inner) => self.lhs(inner),
            Expr::Ident(ident) => {
                if ident.is_blank() {
                    return;
                }
                if let Some(index) = self.param_of(target) {
                    self.usage[index].assigned = true;
                    self.usage[index].refs += 1;
                    return;
                }
                let package_var = self
                    .program
                    .object_at(self.file, target.span().start)
                    .is_some_and(|id| {
                        matches!(
                            self.program.object(id).kind,
                            ObjectKind::Var(VarKind::Package)
                        )
                    });
                if package_var {
                    self.write();
                }
            }
            Expr::Index { x, index } => {
                self.expr(x);
                self.expr(index);
                self.address_taken(x);
                self.write();
            }
            Expr::Selector { x, .. } => {
                self.expr(x);
                self.address_taken(target);
                self.write();
            }
            Expr::Star(x) => {
                self.expr(x);
                self.write();
            }
            _ => self.expr(target),
        }
    }

    fn expr(&mut self, expr: &Node<Expr>) {
        match expr.as_ref() {
            Expr::Ident(_) => {
                if let Some(index) = self.param_of(expr) {
                    self.use_param(index);
                } else if self.mode(expr) == Mode::Variable
                    && self
                        .program
                        .object_at(self.file, expr.span().start)
                        .is_some_and(|id| {
                            matches!(
                                self.program.object(id).kind,
                                ObjectKind::Var(VarKind::Package)
                            )
                        })
                {
                    self.read();
                }
            }
            Expr::BasicLit { .. } => {}
            Expr::CompositeLit { elts, .. } => {
                for elt in elts {
                    self.expr(elt);
                }
            }
            Expr::FuncLit { body, .. } => {
                self.closure_depth += 1;
                self.body(&body.as_ref().stmts);
                self.closure_depth -= 1;
            }
            Expr::Paren(x) | Expr::TypeAssert { x, .. } => self.expr(x),
            Expr::Selector { x, .. } => match self.program.selection(self.file, expr.span()) {
                Some(sel) => {
                    let (kind, indirect, method) = (sel.kind, sel.indirect, sel.obj);
                    self.expr(x);
                    if indirect {
                        self.read();
                    }
                    let value_recv = self
                        .program
                        .type_of(self.file, x.span())
                        .is_some_and(|ty| !ty.is_pointer());
                    if kind == SelectionKind::MethodVal
                        && value_recv
                        && has_pointer_receiver(&self.program.objects, method)
                    {
                        self.address_taken(x);
                    }
                }
                // A qualified identifier.
                None => {
                    if self.mode(expr) == Mode::Variable {
                        self.read();
                    }
                }
            },
            Expr::Index { x, index } => {
                self.expr(x);
                self.expr(index);
                self.read();
            }
            Expr::Slice { x, low, high, max } => {
                self.expr(x);
                for bound in [low, high, max].into_iter().flatten() {
                    self.expr(bound);
                }
                self.read();
            }
            Expr::Call { fun, args, .. } => match self.mode(fun) {
                Mode::TypeExpr => {
                    for arg in args {
                        self.expr(arg);
                    }
                }
                Mode::Builtin(builtin) => {
                    for arg in args {
                        self.expr(arg);
                    }
                    if !builtin.is_pure() {
                        self.write();
                    }
                }
                _ => {
                    self.expr(fun);
                    for arg in args {
                        self.expr(arg);
                    }
                    self.write();
                }
            },
            Expr::Star(x) => {
                self.expr(x);
                self.read();
            }
            Expr::Unary { op, x } => {
                if *op == UnaryOp::Addr {
                    self.address_taken(x);
                }
                self.expr(x);
                if *op == UnaryOp::Recv {
                    self.write();
                }
            }
            Expr::Binary { x, y, .. } => {
                self.expr(x);
                self.expr(y);
            }
            Expr::KeyValue { key, value } => {
                self.expr(key);
                self.expr(value);
            }
            Expr::ArrayType { .. }
            | Expr::MapType { .. }
            | Expr::ChanType { .. }
            | Expr::FuncType(_)
            | Expr::StructType(_)
            | Expr::InterfaceType(_)
            | Expr::Ellipsis(_) => {}
        }
    }

    fn record_return(&mut self, stmt: &Node<Statement>, results: &[Node<Expr>]) {
        let spread = results.len() == 1 && self.result_types.len() > 1;
        let conversions = results
            .iter()
            .zip(&self.result_types)
            .map(|(operand, want)| {
                if spread {
                    return false;
                }
                self.program
                    .type_of(self.file, operand.span())
                    .is_some_and(|have| needs_conversion(self.program, have, want))
            })
            .collect();
        self.returns.push(ReturnInfo {
            offset: stmt.span().start - self.base,
            conversions,
        });
    }
}

/// Reports whether a value of type `have` must be converted to keep type
/// `want` once it no longer flows through an assignment.
pub(crate) fn needs_conversion(program: &Program, have: &Type, want: &Type) -> bool {
    if have.is_invalid() || want.is_invalid() {
        return false;
    }
    if have.is_untyped() {
        return !identical(&program.objects, &have.default_type(), want);
    }
    !identical(&program.objects, have, want)
}

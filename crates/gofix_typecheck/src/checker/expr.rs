use gofix_ast::{BinaryOp, Expr, FuncType, Ident, LitKind, Node, UnaryOp};

use super::Checker;
use crate::error::CheckError;
use crate::lookup::lookup_field_or_method;
use crate::objects::{Builtin, ObjectKind};
use crate::program::{Mode, Selection, SelectionKind, TypeAndValue};
use crate::scope::ScopeKind;
use crate::types::{BasicKind, Signature, Type, full_qualifier};

fn tv(mode: Mode, ty: Type) -> TypeAndValue {
    TypeAndValue { mode, ty }
}

fn invalid() -> TypeAndValue {
    tv(Mode::Invalid, Type::Invalid)
}

fn no_value() -> TypeAndValue {
    tv(Mode::NoValue, Type::Tuple(Vec::new()))
}

impl Checker<'_> {
    /// Checks an expression and records its type.
    pub(super) fn expr(&mut self, expr: &Node<Expr>) -> TypeAndValue {
        self.expr_with_hint(expr, None)
    }

    /// Like [`Checker::expr`]; `hint` is the type implied for an elided
    /// composite literal.
    pub(super) fn expr_with_hint(&mut self, expr: &Node<Expr>, hint: Option<&Type>) -> TypeAndValue {
        let result = self.expr_inner(expr, hint);
        if result.mode != Mode::Invalid || !result.ty.is_invalid() {
            self.record(expr.span(), &result);
        }
        result
    }

    fn expr_inner(&mut self, expr: &Node<Expr>, hint: Option<&Type>) -> TypeAndValue {
        match expr.as_ref() {
            Expr::Ident(ident) => self.ident(&Node::new(ident.clone(), expr.span())),
            Expr::BasicLit { kind, .. } => {
                let basic = match kind {
                    LitKind::Int => BasicKind::UntypedInt,
                    LitKind::Float => BasicKind::UntypedFloat,
                    LitKind::Imag => BasicKind::UntypedComplex,
                    LitKind::Char => BasicKind::UntypedRune,
                    LitKind::String => BasicKind::UntypedString,
                };
                tv(Mode::Constant, Type::Basic(basic))
            }
            Expr::CompositeLit { ty, elts } => self.composite(ty.as_deref(), elts, hint),
            Expr::FuncLit { ty, body } => {
                let sig = self.func_body(None, ty.as_ref(), body, expr.span());
                tv(Mode::Value, Type::Signature(Box::new(sig)))
            }
            Expr::Paren(inner) => self.expr_with_hint(inner, hint),
            Expr::Selector { x, sel } => self.selector(expr, x, sel),
            Expr::Index { x, index } => self.index(x, index),
            Expr::Slice { x, low, high, max } => {
                let operand = self.expr(x);
                for bound in [low, high, max].into_iter().flatten() {
                    self.expr(bound);
                }
                let ty = match self.underlying_of(&operand.ty) {
                    Type::Basic(kind) if kind.is_string() => operand.ty.default_type(),
                    Type::Slice(_) => operand.ty.clone(),
                    Type::Array(_, elem) => Type::Slice(elem),
                    Type::Pointer(inner) => match self.underlying_of(&inner) {
                        Type::Array(_, elem) => Type::Slice(elem),
                        _ => Type::Invalid,
                    },
                    _ => Type::Invalid,
                };
                tv(Mode::Value, ty)
            }
            Expr::TypeAssert { x, ty } => {
                let operand = self.expr(x);
                match ty {
                    Some(ty) => tv(Mode::CommaOk, self.type_expr(ty)),
                    None => {
                        let pos = self.pos_at(expr.span().start);
                        self.error(CheckError::invalid(
                            pos,
                            "use of .(type) outside type switch",
                        ));
                        tv(Mode::Value, operand.ty)
                    }
                }
            }
            Expr::Call {
                fun,
                args,
                ellipsis,
            } => self.call(fun, args, *ellipsis),
            Expr::Star(inner) => {
                let operand = self.expr(inner);
                match operand.mode {
                    Mode::TypeExpr => tv(Mode::TypeExpr, operand.ty.pointer_to()),
                    Mode::Invalid => invalid(),
                    _ => match self.underlying_of(&operand.ty) {
                        Type::Pointer(elem) => tv(Mode::Variable, *elem),
                        _ => tv(Mode::Variable, Type::Invalid),
                    },
                }
            }
            Expr::Unary { op, x } => {
                let hint = match (op, hint) {
                    (UnaryOp::Addr, Some(Type::Pointer(elem))) => Some(elem.as_ref()),
                    _ => None,
                };
                let operand = self.expr_with_hint(x, hint);
                match op {
                    UnaryOp::Addr => tv(Mode::Value, operand.ty.pointer_to()),
                    UnaryOp::Recv => match self.underlying_of(&operand.ty) {
                        Type::Chan(_, elem) => tv(Mode::CommaOk, *elem),
                        _ => tv(Mode::CommaOk, Type::Invalid),
                    },
                    UnaryOp::Not | UnaryOp::Plus | UnaryOp::Neg | UnaryOp::Xor => {
                        let mode = if operand.mode == Mode::Constant {
                            Mode::Constant
                        } else {
                            Mode::Value
                        };
                        tv(mode, operand.ty)
                    }
                }
            }
            Expr::Binary { op, x, y } => self.binary(*op, x, y),
            Expr::KeyValue { key, value } => {
                self.expr(key);
                self.expr(value);
                let pos = self.pos_at(expr.span().start);
                self.error(CheckError::invalid(pos, "unexpected key:value expression"));
                invalid()
            }
            Expr::ArrayType { .. }
            | Expr::MapType { .. }
            | Expr::ChanType { .. }
            | Expr::FuncType(_)
            | Expr::StructType(_)
            | Expr::InterfaceType(_)
            | Expr::Ellipsis(_) => self.type_literal(expr),
        }
    }

    fn ident(&mut self, ident: &Node<Ident>) -> TypeAndValue {
        let name = ident.as_ref();
        if name.is_blank() {
            let pos = self.pos_at(ident.span().start);
            self.error(CheckError::invalid(pos, "cannot use _ as value"));
            return invalid();
        }
        let Some(id) = self.lookup_ident(ident) else {
            return invalid();
        };
        if id == self.prog.universe.iota && self.ctx.iota.is_none() {
            let pos = self.pos_at(ident.span().start);
            self.error(CheckError::invalid(
                pos,
                "cannot use iota outside constant declaration",
            ));
            return invalid();
        }
        if let ObjectKind::PkgName { path, .. } = &self.prog.objects.get(id).kind {
            let message = format!("use of package {path} without selector");
            let pos = self.pos_at(ident.span().start);
            self.error(CheckError::invalid(pos, message));
            return invalid();
        }
        self.object_tv(id)
    }

    fn selector(
        &mut self,
        expr: &Node<Expr>,
        x: &Node<Expr>,
        sel: &Node<Ident>,
    ) -> TypeAndValue {
        // Qualified identifier: pkg.Name.
        if let Expr::Ident(pkg_ident) = x.as_ref() {
            let ident = Node::new(pkg_ident.clone(), x.span());
            let found = self.prog.scopes.lookup_parent(
                &self.prog.objects,
                self.ctx.scope,
                &pkg_ident.name,
                x.span().start,
            );
            if let Some((_, pkg_name)) = found
                && let ObjectKind::PkgName { path, package } =
                    self.prog.objects.get(pkg_name).kind.clone()
            {
                self.record_use(&ident, pkg_name);
                return self.qualified(path, package, sel);
            }
        }

        let operand = self.expr(x);
        if operand.mode == Mode::Invalid || operand.ty.is_invalid() {
            return tv(Mode::Value, Type::Invalid);
        }
        let name = &sel.as_ref().name;
        let Some(found) = lookup_field_or_method(&self.prog.objects, &operand.ty, name) else {
            let pos = self.pos_at(sel.span().start);
            let ty = self.prog.type_string(&operand.ty, &full_qualifier);
            let selector = gofix_ast::printer::expr_to_string(expr);
            self.error(CheckError::invalid(
                pos,
                format!("{selector} undefined (type {ty} has no field or method {name})"),
            ));
            return invalid();
        };

        self.record_use(sel, found.obj);
        self.ensure_resolved(found.obj, sel.span());
        let member = self.prog.objects.get(found.obj);
        let is_method = member.is_func();
        let member_ty = member.ty.clone();

        let (kind, result) = if operand.mode == Mode::TypeExpr {
            if !is_method {
                return invalid();
            }
            // Method expression: the receiver becomes the first parameter.
            let mut sig = member_ty.as_signature().cloned().unwrap_or_default();
            sig.params.insert(0, operand.ty.clone());
            (
                SelectionKind::MethodExpr,
                tv(Mode::Value, Type::Signature(Box::new(sig))),
            )
        } else if is_method {
            (SelectionKind::MethodVal, tv(Mode::Value, member_ty))
        } else {
            let mode = if operand.mode == Mode::Variable || found.indirect {
                Mode::Variable
            } else {
                Mode::Value
            };
            (SelectionKind::FieldVal, tv(mode, member_ty))
        };

        let key = (self.file_id(), expr.span());
        self.prog.info.selections.insert(
            key,
            Selection {
                kind,
                recv: operand.ty,
                obj: found.obj,
                index: found.index,
                indirect: found.indirect,
            },
        );
        result
    }

    fn qualified(
        &mut self,
        path: String,
        package: Option<crate::objects::PackageId>,
        sel: &Node<Ident>,
    ) -> TypeAndValue {
        let name = &sel.as_ref().name;
        let scope = package.and_then(|pkg| self.prog.packages[pkg.index()].scope);
        let Some(scope) = scope else {
            let id = self.external(&path, name);
            self.record_use(sel, id);
            return tv(Mode::Value, Type::Invalid);
        };
        let member = self
            .prog
            .scopes
            .get(scope)
            .lookup(name)
            .filter(|id| self.prog.objects.get(*id).is_exported());
        match member {
            Some(id) => {
                self.record_use(sel, id);
                self.object_tv(id)
            }
            None => {
                let pos = self.pos_at(sel.span().start);
                self.error(CheckError::Undefined {
                    name: format!("{path}.{name}"),
                    pos,
                });
                invalid()
            }
        }
    }

    fn index(&mut self, x: &Node<Expr>, index: &Node<Expr>) -> TypeAndValue {
        let operand = self.expr(x);
        let base = self.underlying_of(&operand.ty);
        let base = match base {
            Type::Pointer(inner) => match self.underlying_of(&inner) {
                array @ Type::Array(..) => array,
                _ => Type::Invalid,
            },
            other => other,
        };
        match base {
            Type::Map(key, value) => {
                self.expr_with_hint(index, Some(&key));
                tv(Mode::MapIndex, *value)
            }
            Type::Slice(elem) | Type::Array(_, elem) => {
                self.expr(index);
                tv(Mode::Variable, *elem)
            }
            Type::Basic(kind) if kind.is_string() => {
                self.expr(index);
                tv(Mode::Value, Type::Basic(BasicKind::Uint8))
            }
            _ => {
                self.expr(index);
                tv(Mode::Value, Type::Invalid)
            }
        }
    }

    fn composite(
        &mut self,
        ty: Option<&Node<Expr>>,
        elts: &[Node<Expr>],
        hint: Option<&Type>,
    ) -> TypeAndValue {
        let mut literal_ty = match ty {
            Some(ty) => self.type_expr(ty),
            None => match hint {
                // An elided `&T{...}` element.
                Some(Type::Pointer(elem)) => elem.as_ref().clone(),
                Some(hint) => hint.clone(),
                None => Type::Invalid,
            },
        };

        match self.underlying_of(&literal_ty) {
            Type::Struct(fields) => {
                for (idx, elt) in elts.iter().enumerate() {
                    match elt.as_ref() {
                        Expr::KeyValue { key, value } => {
                            let field = key.as_ref().as_ref().as_ident().and_then(|name| {
                                fields
                                    .iter()
                                    .copied()
                                    .find(|f| self.prog.objects.get(*f).name == name.name)
                            });
                            let field_ty = field.map(|f| self.prog.objects.get(f).ty.clone());
                            if let (Some(field), Some(name)) = (field, key.as_ref().as_ref().as_ident()) {
                                self.record_use(&Node::new(name.clone(), key.span()), field);
                            }
                            self.expr_with_hint(value, field_ty.as_ref());
                        }
                        _ => {
                            let field_ty = fields
                                .get(idx)
                                .map(|f| self.prog.objects.get(*f).ty.clone());
                            self.expr_with_hint(elt, field_ty.as_ref());
                        }
                    }
                }
            }
            Type::Slice(elem) | Type::Array(_, elem) => {
                for elt in elts {
                    match elt.as_ref() {
                        Expr::KeyValue { key, value } => {
                            self.expr(key);
                            self.expr_with_hint(value, Some(&elem));
                        }
                        _ => {
                            self.expr_with_hint(elt, Some(&elem));
                        }
                    }
                }
                if let Type::Array(None, elem) = &literal_ty
                    && ty.is_some_and(|ty| {
                        matches!(ty.as_ref(), Expr::ArrayType { len: Some(len), .. } if matches!(len.as_ref().as_ref(), Expr::Ellipsis(None)))
                    })
                {
                    literal_ty = Type::Array(Some(elts.len() as u64), elem.clone());
                }
            }
            Type::Map(key_ty, value_ty) => {
                for elt in elts {
                    match elt.as_ref() {
                        Expr::KeyValue { key, value } => {
                            self.expr_with_hint(key, Some(&key_ty));
                            self.expr_with_hint(value, Some(&value_ty));
                        }
                        _ => {
                            self.expr(elt);
                        }
                    }
                }
            }
            _ => {
                for elt in elts {
                    match elt.as_ref() {
                        Expr::KeyValue { key, value } => {
                            self.expr(key);
                            self.expr(value);
                        }
                        _ => {
                            self.expr(elt);
                        }
                    }
                }
            }
        }
        tv(Mode::Value, literal_ty)
    }

    fn call(&mut self, fun: &Node<Expr>, args: &[Node<Expr>], ellipsis: bool) -> TypeAndValue {
        let callee = self.expr(fun);
        match callee.mode {
            Mode::TypeExpr => {
                let mut mode = Mode::Value;
                for arg in args {
                    let operand = self.expr_with_hint(arg, Some(&callee.ty));
                    if operand.mode == Mode::Constant
                        && matches!(self.underlying_of(&callee.ty), Type::Basic(_))
                    {
                        mode = Mode::Constant;
                    }
                }
                tv(mode, callee.ty)
            }
            Mode::Builtin(builtin) => self.builtin_call(builtin, args),
            Mode::Invalid => {
                for arg in args {
                    self.expr(arg);
                }
                invalid()
            }
            _ => {
                let sig = match self.underlying_of(&callee.ty) {
                    Type::Signature(sig) => *sig,
                    _ => {
                        for arg in args {
                            self.expr(arg);
                        }
                        return tv(Mode::Value, Type::Invalid);
                    }
                };
                for (idx, arg) in args.iter().enumerate() {
                    let param = param_type(&sig, idx, ellipsis);
                    self.expr_with_hint(arg, param.as_ref());
                }
                match sig.results.len() {
                    0 => no_value(),
                    _ => tv(Mode::Value, sig.result_type()),
                }
            }
        }
    }

    fn builtin_call(&mut self, builtin: Builtin, args: &[Node<Expr>]) -> TypeAndValue {
        let operands: Vec<TypeAndValue> = args.iter().map(|arg| self.expr(arg)).collect();
        let first = operands.first().map(|op| op.ty.clone()).unwrap_or_default();
        let all_constant = !operands.is_empty() && operands.iter().all(|op| op.mode == Mode::Constant);
        let constant_or_value = if all_constant {
            Mode::Constant
        } else {
            Mode::Value
        };
        match builtin {
            Builtin::Append => tv(Mode::Value, first),
            Builtin::Len | Builtin::Cap => tv(constant_or_value, Type::Basic(BasicKind::Int)),
            Builtin::Copy => tv(Mode::Value, Type::Basic(BasicKind::Int)),
            Builtin::Complex => tv(constant_or_value, Type::Basic(BasicKind::Complex128)),
            Builtin::Real | Builtin::Imag => tv(constant_or_value, Type::Basic(BasicKind::Float64)),
            Builtin::Make => tv(Mode::Value, first),
            Builtin::New => tv(Mode::Value, first.pointer_to()),
            Builtin::Min | Builtin::Max => {
                let ty = operands
                    .iter()
                    .map(|op| op.ty.clone())
                    .find(|ty| !ty.is_untyped())
                    .unwrap_or(first);
                tv(constant_or_value, ty)
            }
            Builtin::Recover => tv(
                Mode::Value,
                Type::Interface {
                    methods: Vec::new(),
                    embeddeds: Vec::new(),
                },
            ),
            Builtin::Clear
            | Builtin::Close
            | Builtin::Delete
            | Builtin::Panic
            | Builtin::Print
            | Builtin::Println => no_value(),
        }
    }

    fn binary(&mut self, op: BinaryOp, x: &Node<Expr>, y: &Node<Expr>) -> TypeAndValue {
        let left = self.expr(x);
        let right = self.expr(y);
        let mode = if left.mode == Mode::Constant && right.mode == Mode::Constant {
            Mode::Constant
        } else {
            Mode::Value
        };
        if op.is_comparison() {
            return tv(mode, Type::Basic(BasicKind::UntypedBool));
        }
        if op.is_shift() {
            return tv(mode, left.ty);
        }
        let ty = match (&left.ty, &right.ty) {
            (Type::Basic(a), Type::Basic(b)) if a.is_untyped() && b.is_untyped() => {
                Type::Basic(a.larger_untyped(*b))
            }
            (l, r) if l.is_untyped() => r.clone(),
            (l, _) => l.clone(),
        };
        tv(mode, ty)
    }

    /// Checks a function body in a new function scope and returns the
    /// signature. The scope spans `extent`.
    pub(super) fn func_body(
        &mut self,
        recv: Option<&Node<gofix_ast::FieldList>>,
        func: &FuncType,
        body: &Node<gofix_ast::Block>,
        extent: gofix_span::Span,
    ) -> Signature {
        let saved = self.open_scope(ScopeKind::Func, extent);
        if let Some(recv) = recv {
            self.param_types(recv.as_ref(), Some(crate::objects::VarKind::Receiver));
        }
        let sig = self.signature(func, true);
        self.results.push(sig.results.clone());
        let outer_labels = std::mem::take(&mut self.labels);
        self.collect_labels(&body.as_ref().stmts);
        self.stmts(&body.as_ref().stmts);
        self.labels = outer_labels;
        self.results.pop();
        self.close_scope(saved);
        sig
    }
}

/// The type expected for argument `idx` of a call.
fn param_type(sig: &Signature, idx: usize, ellipsis: bool) -> Option<Type> {
    let last = sig.params.len().checked_sub(1)?;
    if sig.variadic && idx >= last {
        let slice = sig.params.get(last)?;
        if ellipsis {
            return Some(slice.clone());
        }
        return match slice {
            Type::Slice(elem) => Some(elem.as_ref().clone()),
            _ => None,
        };
    }
    sig.params.get(idx).cloned()
}

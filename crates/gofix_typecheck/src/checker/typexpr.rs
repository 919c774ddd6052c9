use gofix_ast::{Expr, FieldList, FuncType, Ident, LitKind, Node};

use super::Checker;
use crate::error::CheckError;
use crate::objects::{ObjectKind, RecvInfo, VarKind};
use crate::program::{Mode, TypeAndValue};
use crate::types::{Signature, Type};

/// The identifier an embedded field takes its name from.
fn embedded_ident(ty: &Node<Expr>) -> Option<Node<Ident>> {
    match ty.as_ref() {
        Expr::Ident(ident) => Some(Node::new(ident.clone(), ty.span())),
        Expr::Star(inner) | Expr::Paren(inner) => embedded_ident(inner),
        Expr::Selector { sel, .. } => Some(sel.clone()),
        _ => None,
    }
}

impl Checker<'_> {
    /// Checks an expression that must denote a type.
    pub(super) fn type_expr(&mut self, expr: &Node<Expr>) -> Type {
        let tv = self.expr(expr);
        match tv.mode {
            Mode::TypeExpr => tv.ty,
            Mode::Invalid => Type::Invalid,
            // Members of packages outside the program are opaque.
            Mode::Value if tv.ty.is_invalid() => Type::Invalid,
            _ => {
                let pos = self.pos_at(expr.span().start);
                let name = gofix_ast::printer::expr_to_string(expr);
                self.error(CheckError::NotAType { name, pos });
                Type::Invalid
            }
        }
    }

    /// Builds the type denoted by a type literal.
    pub(super) fn type_literal(&mut self, expr: &Node<Expr>) -> TypeAndValue {
        let ty = match expr.as_ref() {
            Expr::ArrayType { len: None, elem } => Type::Slice(Box::new(self.type_expr(elem))),
            Expr::ArrayType {
                len: Some(len),
                elem,
            } => {
                let length = match len.as_ref().as_ref() {
                    Expr::Ellipsis(None) => None,
                    Expr::BasicLit {
                        kind: LitKind::Int,
                        value,
                    } => {
                        self.expr(len);
                        parse_int(value)
                    }
                    _ => {
                        self.expr(len);
                        None
                    }
                };
                Type::Array(length, Box::new(self.type_expr(elem)))
            }
            Expr::MapType { key, value } => Type::Map(
                Box::new(self.type_expr(key)),
                Box::new(self.type_expr(value)),
            ),
            Expr::ChanType { dir, elem } => Type::Chan(*dir, Box::new(self.type_expr(elem))),
            Expr::FuncType(func) => Type::Signature(Box::new(self.signature(func, false))),
            Expr::StructType(fields) => self.struct_type(fields),
            Expr::InterfaceType(elems) => self.interface_type(elems),
            Expr::Ellipsis(Some(elem)) => Type::Slice(Box::new(self.type_expr(elem))),
            _ => Type::Invalid,
        };
        TypeAndValue {
            mode: Mode::TypeExpr,
            ty,
        }
    }

    fn struct_type(&mut self, list: &FieldList) -> Type {
        let mut fields = Vec::new();
        for field in &list.fields {
            let field = field.as_ref();
            let ty = self.type_expr(&field.ty);
            if field.names.is_empty() {
                let ident = embedded_ident(&field.ty);
                if let Some(ident) = ident {
                    let id = self.new_object(
                        &ident,
                        ObjectKind::Var(VarKind::Field { embedded: true }),
                        ty,
                        None,
                        None,
                    );
                    self.record_def(&ident, id);
                    fields.push(id);
                }
                continue;
            }
            for name in &field.names {
                let id = self.new_object(
                    name,
                    ObjectKind::Var(VarKind::Field { embedded: false }),
                    ty.clone(),
                    None,
                    None,
                );
                self.record_def(name, id);
                fields.push(id);
            }
        }
        Type::Struct(fields)
    }

    fn interface_type(&mut self, list: &FieldList) -> Type {
        let mut methods = Vec::new();
        let mut embeddeds = Vec::new();
        for field in &list.fields {
            let field = field.as_ref();
            match (field.names.first(), field.ty.as_ref()) {
                (Some(name), Expr::FuncType(func)) => {
                    let sig = self.signature(func, false);
                    let id = self.new_object(
                        name,
                        ObjectKind::Func {
                            recv: Some(RecvInfo {
                                base: None,
                                pointer: false,
                            }),
                            decl: None,
                        },
                        Type::Signature(Box::new(sig)),
                        None,
                        None,
                    );
                    self.record_def(name, id);
                    methods.push(id);
                }
                _ => embeddeds.push(self.type_expr(&field.ty)),
            }
        }
        Type::Interface { methods, embeddeds }
    }

    /// Computes the signature of a function type. With `declare`, the named
    /// parameters and results become variables of the current scope.
    pub(super) fn signature(&mut self, func: &FuncType, declare: bool) -> Signature {
        let variadic = func.is_variadic();
        let params = self.param_types(&func.params, declare.then_some(VarKind::Param));
        let results = match &func.results {
            Some(results) => self.param_types(results, declare.then_some(VarKind::Result)),
            None => Vec::new(),
        };
        Signature {
            params,
            results,
            variadic,
        }
    }

    pub(super) fn param_types(&mut self, list: &FieldList, declare: Option<VarKind>) -> Vec<Type> {
        let mut types = Vec::new();
        for field in &list.fields {
            let field = field.as_ref();
            let ty = match field.ty.as_ref() {
                Expr::Ellipsis(Some(_)) => {
                    let tv = self.type_literal(&field.ty);
                    self.record(field.ty.span(), &tv);
                    tv.ty
                }
                _ => self.type_expr(&field.ty),
            };
            if field.names.is_empty() {
                types.push(ty);
                continue;
            }
            for name in &field.names {
                if let Some(kind) = declare {
                    let scope = self.ctx.scope;
                    self.declare(scope, name, ObjectKind::Var(kind), ty.clone(), None);
                }
                types.push(ty.clone());
            }
        }
        types
    }
}

fn parse_int(text: &str) -> Option<u64> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u64::from_str_radix(bin, 2).ok()
    } else if let Some(oct) = lower.strip_prefix("0o") {
        u64::from_str_radix(oct, 8).ok()
    } else if lower.len() > 1 && lower.starts_with('0') {
        u64::from_str_radix(&lower[1..], 8).ok()
    } else {
        lower.parse().ok()
    }
}

//! Matching call arguments to callee parameters and deciding, per
//! parameter, whether the argument can replace its references or has to be
//! evaluated into a variable first.

use gofix_ast::NodeRef;
use gofix_ast::printer::{PRIMARY_PREC, UNARY_PREC, precedence};
use gofix_ast::{Expr, LitKind, Node, Statement, UnaryOp};
use gofix_typecheck::{
    Mode, ObjectId, ObjectKind, SelectionKind, Type, VarKind, full_qualifier,
    has_pointer_receiver, underlying,
};
use tracing::debug;

use crate::callee::{Callee, Effect};
use crate::caller::CallSite;
use crate::error::InlineError;
use crate::imports::ImportPlan;
use crate::rewrite::Namer;

/// Type of an argument as far as parameter matching is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ArgType {
    /// Built for the parameter; always matches.
    Exact,
    Typed(String),
    Untyped { default: String, nil: bool },
    Unknown,
}

#[derive(Debug, Clone)]
pub(crate) struct Arg {
    pub text: String,
    pub prec: u8,
    pub ty: ArgType,
    pub effects: bool,
    pub reads: bool,
    pub duplicable: bool,
    /// The value cannot change after the call: a constant, or a local
    /// variable that is never reassigned and whose address is not taken.
    pub stable: bool,
    /// The argument is `&x`; holds `x`.
    pub addr_of: Option<String>,
    /// The argument is `*p`; holds `p`.
    pub deref_of: Option<String>,
}

impl Arg {
    fn new(text: String, prec: u8, ty: ArgType) -> Self {
        Self {
            text,
            prec,
            ty,
            effects: false,
            reads: false,
            duplicable: false,
            stable: false,
            addr_of: None,
            deref_of: None,
        }
    }

    pub fn is_pure(&self) -> bool {
        !self.effects && !self.reads
    }

    /// Parenthesized when weaker than `min_prec`.
    pub fn text_at(&self, min_prec: u8) -> String {
        if self.prec < min_prec {
            format!("({})", self.text)
        } else {
            self.text.clone()
        }
    }
}

/// The actual arguments of a call, one per callee parameter.
pub(crate) struct Args {
    pub params: Vec<Arg>,
    /// Argument texts for a function-literal call, receiver first.
    pub literal: Vec<String>,
    /// `f(g())` where `g` yields several values.
    pub spread: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum Binding {
    Substitute(Arg),
    Bind { name: String },
}

pub(crate) struct Bindings {
    pub params: Vec<Binding>,
    /// Declarations evaluating the bound arguments, in argument order.
    pub decls: Vec<String>,
}

impl Bindings {
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

fn wrap(text: &str, prec: u8, min: u8) -> String {
    if prec < min {
        format!("({text})")
    } else {
        text.to_string()
    }
}

/// Collects the arguments of the call, turning the receiver of a method
/// call into the first argument.
pub(crate) fn collect_args(
    site: &CallSite<'_>,
    callee: &Callee,
    plan: &mut ImportPlan<'_, '_>,
) -> Result<Args, InlineError> {
    let mut params = Vec::new();
    let mut literal = Vec::new();

    if let Some(sel) = site.selection
        && sel.kind == SelectionKind::MethodVal
        && let Expr::Selector { x, .. } = site.fun.as_ref()
    {
        let recv = receiver_arg(site, x, &sel.index, callee);
        literal.push(recv.text.clone());
        params.push(recv);
    } else if callee.is_method() && site.selection.is_none() {
        return Err(InlineError::WrongCallee {
            callee: callee.to_string(),
        });
    }

    for arg in site.args {
        literal.push(site.text(arg.span()).to_string());
    }
    if site.ellipsis
        && let Some(last) = literal.last_mut()
    {
        last.push_str("...");
    }

    let spread = site.args.len() == 1
        && site
            .program
            .type_of(site.file(), site.args[0].span())
            .is_some_and(|ty| matches!(ty, Type::Tuple(types) if types.len() > 1));
    if spread {
        return Ok(Args {
            params,
            literal,
            spread,
        });
    }

    let fixed = if callee.variadic && !site.ellipsis {
        callee.params.len() - 1
    } else {
        callee.params.len()
    };
    let mut rest = site.args.iter();
    while params.len() < fixed {
        let Some(arg) = rest.next() else { break };
        params.push(classify(site, arg));
    }
    if callee.variadic && !site.ellipsis {
        let extra: Vec<Arg> = rest.by_ref().map(|arg| classify(site, arg)).collect();
        let Some(param) = callee.params.last() else {
            return Err(InlineError::Arity {
                callee: callee.to_string(),
                args: site.args.len(),
                params: 0,
            });
        };
        let packed = if extra.is_empty() {
            let mut arg = Arg::new("nil".to_string(), PRIMARY_PREC, ArgType::Exact);
            arg.duplicable = true;
            arg.stable = true;
            arg
        } else {
            let ty = plan.qualify_type(&param.ty)?;
            let elems: Vec<&str> = extra.iter().map(|arg| arg.text.as_str()).collect();
            let mut arg = Arg::new(
                format!("{ty}{{{}}}", elems.join(", ")),
                PRIMARY_PREC,
                ArgType::Exact,
            );
            arg.effects = extra.iter().any(|arg| arg.effects);
            arg.reads = extra.iter().any(|arg| arg.reads);
            arg
        };
        params.push(packed);
    }
    let leftover = rest.count();
    if params.len() != callee.params.len() || leftover > 0 {
        return Err(InlineError::Arity {
            callee: callee.to_string(),
            args: params.len() + leftover,
            params: callee.params.len(),
        });
    }
    Ok(Args {
        params,
        literal,
        spread,
    })
}

/// The receiver operand of `x.m(...)`, following embedded fields and
/// taking the address or dereferencing to match the method's receiver.
fn receiver_arg(site: &CallSite<'_>, x: &Node<Expr>, path: &[usize], callee: &Callee) -> Arg {
    let program = site.program;
    let mut arg = classify(site, x);
    let mut ty = program
        .type_of(site.file(), x.span())
        .cloned()
        .unwrap_or_default();
    for &index in path {
        let (base, through_pointer) = match &ty {
            Type::Pointer(elem) => (elem.as_ref().clone(), true),
            other => (other.clone(), false),
        };
        let Type::Struct(fields) = underlying(&program.objects, &base).clone() else {
            break;
        };
        let Some(&field) = fields.get(index) else {
            break;
        };
        let field = program.object(field);
        arg.text = format!("{}.{}", wrap(&arg.text, arg.prec, PRIMARY_PREC), field.name);
        arg.prec = PRIMARY_PREC;
        arg.reads |= through_pointer;
        ty = field.ty.clone();
    }
    let pointer_recv = callee.recv.as_ref().is_some_and(|recv| recv.pointer);
    let operand = wrap(&arg.text, arg.prec, UNARY_PREC);
    if pointer_recv && !ty.is_pointer() && !ty.is_invalid() {
        arg.addr_of = Some(arg.text.clone());
        arg.text = format!("&{operand}");
        arg.prec = UNARY_PREC;
    } else if !pointer_recv && ty.is_pointer() {
        arg.deref_of = Some(arg.text.clone());
        arg.text = format!("*{operand}");
        arg.prec = UNARY_PREC;
        arg.reads = true;
    }
    arg.ty = ArgType::Exact;
    arg
}

/// Classifies a caller expression.
fn classify(site: &CallSite<'_>, expr: &Node<Expr>) -> Arg {
    let ty = match site.program.type_of(site.file(), expr.span()) {
        Some(ty) if ty.is_untyped() => ArgType::Untyped {
            default: site.program.type_string(&ty.default_type(), &full_qualifier),
            nil: matches!(ty, Type::Basic(kind) if kind.name() == "untyped nil"),
        },
        Some(ty) if !ty.is_invalid() => ArgType::Typed(site.program.type_string(ty, &full_qualifier)),
        _ => ArgType::Unknown,
    };
    let mut arg = Arg::new(
        site.text(expr.span()).to_string(),
        precedence(expr.as_ref()),
        ty,
    );
    let mut scan = Scan::default();
    scan.expr(site, expr);
    arg.effects = scan.effects;
    arg.reads = scan.reads;
    arg.duplicable = duplicable(expr);
    arg.stable = match site.program.type_and_value(site.file(), expr.span()) {
        Some(tv) if tv.mode == Mode::Constant => true,
        _ => matches!(unparen_expr(expr), Expr::Ident(_))
            && local_var(site, unparen_node(expr)).is_some_and(|obj| !local_use(site, obj).mutable()),
    };
    if let Expr::Unary {
        op: UnaryOp::Addr,
        x,
    } = expr.as_ref()
    {
        arg.addr_of = Some(site.text(x.span()).to_string());
    }
    if let Expr::Star(x) = expr.as_ref() {
        arg.deref_of = Some(site.text(x.span()).to_string());
    }
    arg
}

fn duplicable(expr: &Node<Expr>) -> bool {
    match expr.as_ref() {
        Expr::Ident(_) => true,
        Expr::BasicLit { kind, value } => *kind != LitKind::String || value.len() <= 16,
        Expr::Paren(x) => duplicable(x),
        Expr::Selector { x, .. } => duplicable(x),
        Expr::Unary { op, x } => {
            matches!(
                op,
                UnaryOp::Addr | UnaryOp::Neg | UnaryOp::Plus | UnaryOp::Not | UnaryOp::Xor
            ) && matches!(x.as_ref().as_ref(), Expr::Ident(_) | Expr::BasicLit { .. })
        }
        _ => false,
    }
}

#[derive(Default)]
struct Scan {
    effects: bool,
    reads: bool,
}

impl Scan {
    fn expr(&mut self, site: &CallSite<'_>, expr: &Node<Expr>) {
        let program = site.program;
        let file = site.file();
        let mode = program
            .type_and_value(file, expr.span())
            .map_or(Mode::Invalid, |tv| tv.mode);
        match expr.as_ref() {
            Expr::Ident(_) => {
                let package_var = program.object_at(file, expr.span().start).is_some_and(|id| {
                    matches!(program.object(id).kind, ObjectKind::Var(VarKind::Package))
                });
                // A local the caller writes or lets escape is memory like any other.
                let shared_local =
                    local_var(site, expr).is_some_and(|obj| local_use(site, obj).mutable());
                self.reads |= package_var || shared_local;
            }
            Expr::BasicLit { .. } | Expr::FuncLit { .. } => {}
            Expr::CompositeLit { elts, .. } => {
                for elt in elts {
                    self.expr(site, elt);
                }
            }
            Expr::Paren(x) => self.expr(site, x),
            Expr::Selector { x, .. } => match program.selection(file, expr.span()) {
                Some(sel) => {
                    self.reads |= sel.indirect;
                    self.expr(site, x);
                }
                None => self.reads |= mode == Mode::Variable,
            },
            Expr::Index { x, index } => {
                self.reads = true;
                self.expr(site, x);
                self.expr(site, index);
            }
            Expr::Slice { x, low, high, max } => {
                self.reads = true;
                self.expr(site, x);
                for bound in [low, high, max].into_iter().flatten() {
                    self.expr(site, bound);
                }
            }
            Expr::TypeAssert { x, .. } => {
                self.reads = true;
                self.expr(site, x);
            }
            Expr::Call { fun, args, .. } => {
                let fun_mode = program
                    .type_and_value(file, fun.span())
                    .map_or(Mode::Invalid, |tv| tv.mode);
                match fun_mode {
                    Mode::TypeExpr => {}
                    Mode::Builtin(builtin) if builtin.is_pure() => self.reads = true,
                    _ => self.effects = true,
                }
                for arg in args {
                    self.expr(site, arg);
                }
            }
            Expr::Star(x) => {
                self.reads = true;
                self.expr(site, x);
            }
            Expr::Unary { op, x } => {
                self.effects |= *op == UnaryOp::Recv;
                self.expr(site, x);
            }
            Expr::Binary { x, y, .. } => {
                self.expr(site, x);
                self.expr(site, y);
            }
            Expr::KeyValue { key, value } => {
                self.expr(site, key);
                self.expr(site, value);
            }
            _ => {}
        }
    }
}

fn unparen_node(expr: &Node<Expr>) -> &Node<Expr> {
    match expr.as_ref() {
        Expr::Paren(inner) => unparen_node(inner),
        _ => expr,
    }
}

fn unparen_expr(expr: &Node<Expr>) -> &Expr {
    unparen_node(expr).as_ref()
}

/// The function-local variable (including parameters) `expr` names.
fn local_var(site: &CallSite<'_>, expr: &Node<Expr>) -> Option<ObjectId> {
    let Expr::Ident(_) = expr.as_ref() else {
        return None;
    };
    let obj = site.program.object_at(site.file(), expr.span().start)?;
    matches!(
        site.program.object(obj).kind,
        ObjectKind::Var(VarKind::Local | VarKind::Param | VarKind::Result | VarKind::Receiver)
    )
    .then_some(obj)
}

/// How the caller's file treats a local variable besides reading it.
#[derive(Debug, Clone, Copy, Default)]
struct LocalUse {
    address_taken: bool,
    reassigned: bool,
}

impl LocalUse {
    fn mutable(self) -> bool {
        self.address_taken || self.reassigned
    }
}

fn local_use(site: &CallSite<'_>, obj: ObjectId) -> LocalUse {
    let program = site.program;
    let file = site.file();
    let declared_at = program.object(obj).pos.map(|pos| pos.offset);
    let names = |expr: &Node<Expr>| {
        let expr = unparen_node(expr);
        matches!(expr.as_ref(), Expr::Ident(_))
            && program.object_at(file, expr.span().start) == Some(obj)
    };
    // Whether `expr` is the variable or a part of it stored in place.
    let rooted = |expr: &Node<Expr>| {
        let mut expr = unparen_node(expr);
        loop {
            match expr.as_ref() {
                Expr::Selector { x, .. }
                    if program
                        .selection(file, expr.span())
                        .is_some_and(|sel| sel.kind == SelectionKind::FieldVal && !sel.indirect) =>
                {
                    expr = unparen_node(x);
                }
                Expr::Index { x, .. }
                    if program
                        .type_of(file, x.span())
                        .is_some_and(|ty| matches!(underlying(&program.objects, ty), Type::Array(..))) =>
                {
                    expr = unparen_node(x);
                }
                _ => return names(expr),
            }
        }
    };
    let assigned = |expr: &Node<Expr>| {
        rooted(expr) && Some(unparen_node(expr).span().start) != declared_at
    };

    let mut usage = LocalUse::default();
    for (_, node) in site.index.preorder() {
        match node {
            NodeRef::Expr(expr) => match expr.as_ref() {
                Expr::Unary {
                    op: UnaryOp::Addr,
                    x,
                } if rooted(x) => usage.address_taken = true,
                Expr::Selector { x, .. } => {
                    let implicit_addr = program.selection(file, expr.span()).is_some_and(|sel| {
                        sel.kind == SelectionKind::MethodVal
                            && has_pointer_receiver(&program.objects, sel.obj)
                    }) && program.type_of(file, x.span()).is_some_and(|ty| !ty.is_pointer());
                    usage.address_taken |= implicit_addr && rooted(x);
                }
                _ => {}
            },
            NodeRef::Statement(stmt) => match stmt.as_ref() {
                Statement::Assign { lhs, .. } => usage.reassigned |= lhs.iter().any(assigned),
                Statement::IncDec { x, .. } => usage.reassigned |= rooted(x),
                Statement::Range {
                    key,
                    value,
                    define: false,
                    ..
                } => {
                    usage.reassigned |= key.iter().chain(value.iter()).any(|expr| rooted(expr));
                }
                _ => {}
            },
            _ => {}
        }
        if usage.address_taken && usage.reassigned {
            break;
        }
    }
    usage
}

/// Decides how each parameter receives its argument.
pub(crate) fn bind(
    callee: &Callee,
    args: Vec<Arg>,
    plan: &mut ImportPlan<'_, '_>,
    namer: &mut Namer,
) -> Result<Bindings, InlineError> {
    let n = args.len();
    let position = |i: usize| {
        callee
            .effects
            .iter()
            .position(|effect| *effect == Effect::Param(i))
    };
    let mut args = args;
    let mut subst = vec![true; n];

    for (i, (param, arg)) in callee.params.iter().zip(args.iter_mut()).enumerate() {
        let reason = match &arg.ty {
            ArgType::Exact | ArgType::Unknown => None,
            ArgType::Typed(ty) if *ty == param.ty.text => None,
            ArgType::Untyped { default, nil: false } if *default == param.ty.text => None,
            _ if param.interface => Some("converted to an interface"),
            _ => {
                let ty = plan.qualify_type(&param.ty)?;
                let ty = if ty.starts_with(['*', '<']) || ty.starts_with("func") || ty.starts_with("chan") {
                    format!("({ty})")
                } else {
                    ty
                };
                arg.text = format!("{ty}({})", arg.text);
                arg.prec = PRIMARY_PREC;
                arg.addr_of = None;
                arg.deref_of = None;
                None
            }
        };
        let reason = reason.or_else(|| {
            if param.assigned {
                Some("parameter is assigned")
            } else if param.refs == 0 {
                arg.effects.then_some("unused argument has effects")
            } else if param.in_closure && !arg.stable {
                Some("argument is captured by a closure")
            } else if param.refs > 1 || param.in_loop || param.in_closure {
                if arg.effects || !arg.duplicable {
                    Some("argument is not duplicable")
                } else if arg.reads && callee.effects.contains(&Effect::Write) {
                    Some("argument reads memory the body may write")
                } else {
                    None
                }
            } else if arg.is_pure() {
                None
            } else {
                match position(i) {
                    None => Some("parameter is used after control flow"),
                    Some(pos) => {
                        let before = &callee.effects[..pos];
                        if arg.effects
                            && before
                                .iter()
                                .any(|effect| matches!(effect, Effect::Read | Effect::Write))
                        {
                            Some("body has effects before using the argument")
                        } else if before.contains(&Effect::Write) {
                            Some("body writes memory before reading the argument")
                        } else {
                            None
                        }
                    }
                }
            }
        });
        if let Some(reason) = reason {
            debug!(param = %param.name, arg = %arg.text, reason, "binding argument");
            subst[i] = false;
        }
    }

    // Substituted impure arguments must keep their relative order, and no
    // bound argument with effects may move ahead of an earlier one.
    loop {
        let mut changed = false;
        for i in 0..n {
            if !subst[i] || args[i].is_pure() {
                continue;
            }
            let pos_i = position(i);
            let conflict = (0..n).any(|j| {
                if j == i || args[j].is_pure() || (!args[i].effects && !args[j].effects) {
                    return false;
                }
                if j > i {
                    !subst[j] || position(j) < pos_i
                } else {
                    subst[j] && position(j) > pos_i
                }
            });
            if conflict {
                debug!(arg = %args[i].text, "binding argument to keep evaluation order");
                subst[i] = false;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut params = Vec::with_capacity(n);
    let mut decls = Vec::new();
    for ((param, arg), subst) in callee.params.iter().zip(args).zip(subst) {
        if subst {
            params.push(Binding::Substitute(arg));
            continue;
        }
        let name = if param.is_blank() || param.refs == 0 {
            "_".to_string()
        } else {
            namer.fresh(&param.name)
        };
        let ty = plan.qualify_type(&param.ty)?;
        decls.push(format!("var {name} {ty} = {}", arg.text));
        params.push(Binding::Bind { name });
    }
    Ok(Bindings { params, decls })
}

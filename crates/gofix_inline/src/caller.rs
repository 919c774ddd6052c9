//! Locating a call site and the syntactic context it sits in.

use gofix_ast::cursor::{NodeId, NodeRef, SyntaxIndex};
use gofix_ast::printer::{PRIMARY_PREC, UNARY_PREC};
use gofix_ast::{AssignOp, BinaryOp, Expr, Node, Statement};
use gofix_span::{FileId, Span};
use gofix_typecheck::{ObjectId, Program, Selection, SourceFile};

use crate::error::InlineError;

/// A call expression to rewrite.
#[derive(Debug, Clone, Copy)]
pub struct Caller<'a> {
    pub program: &'a Program,
    pub file: FileId,
    /// Span of the whole call expression.
    pub call: Span,
}

impl<'a> Caller<'a> {
    pub fn new(program: &'a Program, file: FileId, call: Span) -> Self {
        Self {
            program,
            file,
            call,
        }
    }

    /// The caller for the innermost call expression containing `offset`.
    pub fn at_offset(program: &'a Program, file: FileId, offset: usize) -> Option<Self> {
        let source = program.file(file);
        let index = SyntaxIndex::new(&source.ast);
        let id = index.call_at(offset)?;
        Some(Self::new(program, file, index.node(id).span()))
    }

    /// The function or method the call refers to.
    pub fn callee(&self) -> Result<ObjectId, InlineError> {
        locate(self).map(|site| site.func)
    }
}

/// How the value of the call is used.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CallContext<'a> {
    /// `f(...)` as a statement.
    ExprStmt,
    /// `go f(...)` or `defer f(...)`.
    GoDefer,
    /// The sole right-hand side of an assignment or definition.
    Assign {
        lhs: &'a [Node<Expr>],
        op: AssignOp,
    },
    /// The sole operand of a `return`.
    Return,
    /// Any other expression position.
    Expr,
}

pub(crate) struct CallSite<'a> {
    pub program: &'a Program,
    pub source: &'a SourceFile,
    pub index: SyntaxIndex<'a>,
    pub id: NodeId,
    pub call: &'a Node<Expr>,
    /// The called expression without parentheses.
    pub fun: &'a Node<Expr>,
    pub args: &'a [Node<Expr>],
    pub ellipsis: bool,
    pub func: ObjectId,
    pub selection: Option<&'a Selection>,
    pub context: CallContext<'a>,
    /// The statement holding the call, when it is an element of a
    /// statement list and the call is reached through expressions only.
    pub stmt: Option<&'a Node<Statement>>,
    /// Minimum precedence a replacement expression needs to stand in the
    /// call's position without parentheses.
    pub min_prec: u8,
    /// The call is the operand of a unary operator.
    pub unary_operand: bool,
    /// Leading whitespace of the line holding the statement.
    pub indent: String,
}

impl<'a> CallSite<'a> {
    pub fn offset(&self) -> u32 {
        self.call.span().start
    }

    pub fn file(&self) -> FileId {
        self.source.id
    }

    pub fn text(&self, span: Span) -> &'a str {
        span.slice(&self.source.text)
    }

    pub fn pkg_path(&self) -> &'a str {
        &self.program.package(self.source.package).path
    }
}

pub(crate) fn unparen(expr: &Node<Expr>) -> &Node<Expr> {
    match expr.as_ref() {
        Expr::Paren(inner) => unparen(inner),
        _ => expr,
    }
}

/// Finds the call described by `caller` and classifies its context.
pub(crate) fn locate<'a>(caller: &Caller<'a>) -> Result<CallSite<'a>, InlineError> {
    let program = caller.program;
    let source = program.file(caller.file);
    let index = SyntaxIndex::new(&source.ast);
    let not_found = InlineError::CallNotFound {
        offset: caller.call.start,
    };
    let id = index.find_call(caller.call).ok_or(not_found.clone())?;
    let call = index.node(id).as_expr().ok_or(not_found.clone())?;
    let Expr::Call {
        fun,
        args,
        ellipsis,
    } = call.as_ref()
    else {
        return Err(not_found);
    };
    let fun = unparen(fun);
    let (func, selection) = match fun.as_ref() {
        Expr::Ident(_) => (program.object_at(caller.file, fun.span().start), None),
        Expr::Selector { sel, .. } => (
            program.object_at(caller.file, sel.span().start),
            program.selection(caller.file, fun.span()),
        ),
        _ => (None, None),
    };
    let func = func.ok_or(not_found)?;

    let context = classify_context(&index, id, call);
    let stmt = hoist_point(&index, id);
    let (min_prec, unary_operand) = operand_precedence(&index, id, call);
    let indent = stmt
        .or_else(|| index.enclosing_statement(id).and_then(|s| index.node(s).as_statement()))
        .map(|stmt| line_indent(&source.text, stmt.span().start as usize))
        .unwrap_or_default();

    Ok(CallSite {
        program,
        source,
        index,
        id,
        call,
        fun,
        args,
        ellipsis: *ellipsis,
        func,
        selection,
        context,
        stmt,
        min_prec,
        unary_operand,
        indent,
    })
}

fn classify_context<'a>(index: &SyntaxIndex<'a>, id: NodeId, call: &Node<Expr>) -> CallContext<'a> {
    let Some(parent) = index.parent(id) else {
        return CallContext::Expr;
    };
    let NodeRef::Statement(stmt) = index.node(parent) else {
        return CallContext::Expr;
    };
    let is_call = |expr: &Node<Expr>| expr.span() == call.span();
    match stmt.as_ref() {
        Statement::Expr(expr) if is_call(expr) => CallContext::ExprStmt,
        Statement::Go(expr) | Statement::Defer(expr) if is_call(expr) => CallContext::GoDefer,
        Statement::Assign { lhs, op, rhs } if rhs.len() == 1 && is_call(&rhs[0]) => {
            CallContext::Assign { lhs, op: *op }
        }
        Statement::Return(results) if results.len() == 1 && is_call(&results[0]) => {
            CallContext::Return
        }
        _ => CallContext::Expr,
    }
}

/// The statement before which declarations may be inserted so that they run
/// exactly once, right before the call's statement.
fn hoist_point<'a>(index: &SyntaxIndex<'a>, id: NodeId) -> Option<&'a Node<Statement>> {
    let mut current = id;
    for ancestor in index.ancestors(id) {
        match index.node(ancestor) {
            NodeRef::Expr(expr) => match expr.as_ref() {
                Expr::FuncLit { .. } => return None,
                // The right operand of `&&` and `||` runs conditionally.
                Expr::Binary {
                    op: BinaryOp::LAnd | BinaryOp::LOr,
                    y,
                    ..
                } if index.node(current).span() == y.span() => return None,
                _ => {}
            },
            NodeRef::Statement(stmt) => {
                let in_list = index
                    .parent(ancestor)
                    .is_some_and(|parent| index.node(parent).is_statement_list());
                let once = match stmt.as_ref() {
                    Statement::Expr(_)
                    | Statement::Assign { .. }
                    | Statement::Return(_)
                    | Statement::IncDec { .. }
                    | Statement::Send { .. } => true,
                    Statement::If { init: None, cond, .. } => {
                        index.node(current).span() == cond.span()
                    }
                    Statement::Switch {
                        init: None,
                        tag: Some(tag),
                        ..
                    } => index.node(current).span() == tag.span(),
                    Statement::Range { x, .. } => index.node(current).span() == x.span(),
                    _ => false,
                };
                return (in_list && once).then_some(stmt);
            }
            _ => return None,
        }
        current = ancestor;
    }
    None
}

fn operand_precedence(index: &SyntaxIndex<'_>, id: NodeId, call: &Node<Expr>) -> (u8, bool) {
    index
        .parent(id)
        .and_then(|parent| index.node(parent).as_expr())
        .map_or((0, false), |parent| operand_context(parent.as_ref(), call.span()))
}

/// Minimum precedence an operand at `span` needs inside `parent`, and
/// whether `parent` is a unary expression.
pub(crate) fn operand_context(parent: &Expr, span: Span) -> (u8, bool) {
    match parent {
        Expr::Unary { .. } | Expr::Star(_) => (UNARY_PREC, true),
        Expr::Binary { op, x, .. } if x.span() == span => (op.precedence(), false),
        Expr::Binary { op, .. } => (op.precedence() + 1, false),
        Expr::Selector { x, .. }
        | Expr::Index { x, .. }
        | Expr::Slice { x, .. }
        | Expr::TypeAssert { x, .. }
            if x.span() == span =>
        {
            (PRIMARY_PREC, false)
        }
        Expr::Call { fun, .. } if fun.span() == span => (PRIMARY_PREC, false),
        _ => (0, false),
    }
}

pub(crate) fn line_indent(text: &str, offset: usize) -> String {
    let start = text[..offset].rfind('\n').map_or(0, |idx| idx + 1);
    text[start..offset]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

/// The object declared by the function declaration enclosing the call.
pub(crate) fn enclosing_func_object(site: &CallSite<'_>) -> Option<ObjectId> {
    let decl = site.index.enclosing_func_decl(site.id)?;
    site.program.object_at(site.file(), decl.name.span().start)
}

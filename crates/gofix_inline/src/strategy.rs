//! The strategies, tried in order: substitute an expression, splice
//! statements, wrap the body in a function literal.

use gofix_ast::printer::{PRIMARY_PREC, precedence};
use gofix_ast::visitor::{self, Visitor};
use gofix_ast::{Expr, Node, Statement, UnaryOp};
use gofix_diff::TextEdit;
use gofix_span::Span;

use crate::binding::Bindings;
use crate::callee::Callee;
use crate::caller::{CallContext, CallSite, line_indent};
use crate::error::InlineError;
use crate::imports::ImportPlan;
use crate::rewrite::{Body, reindent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    Substitute,
    Splice,
    Literalize,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Substitute => "substitute",
            Strategy::Splice => "splice",
            Strategy::Literalize => "literalize",
        }
    }
}

pub(crate) struct Replacement {
    pub edit: TextEdit,
    pub strategy: Strategy,
}

/// Return statements of the body outside function literals, in source order.
fn returns(stmts: &[Node<Statement>]) -> Vec<&Node<Statement>> {
    fn walk<'a>(stmts: &'a [Node<Statement>], out: &mut Vec<&'a Node<Statement>>) {
        for stmt in stmts {
            walk_stmt(stmt, out);
        }
    }
    fn walk_stmt<'a>(stmt: &'a Node<Statement>, out: &mut Vec<&'a Node<Statement>>) {
        match stmt.as_ref() {
            Statement::Return(_) => out.push(stmt),
            Statement::Labeled { stmt, .. } => walk_stmt(stmt, out),
            Statement::Block(block) => walk(&block.as_ref().stmts, out),
            Statement::If { then, els, .. } => {
                walk(&then.as_ref().stmts, out);
                if let Some(els) = els {
                    walk_stmt(els, out);
                }
            }
            Statement::Switch { body, .. } | Statement::TypeSwitch { body, .. } => {
                for clause in body {
                    walk(&clause.as_ref().body, out);
                }
            }
            Statement::For { body, .. } | Statement::Range { body, .. } => {
                walk(&body.as_ref().stmts, out);
            }
            _ => {}
        }
    }
    let mut out = Vec::new();
    walk(stmts, &mut out);
    out
}

/// Operands of the `index`th return statement, converted to the declared
/// result types where needed.
fn return_operands(
    callee: &Callee,
    body: &Body,
    index: usize,
    results: &[Node<Expr>],
    plan: &mut ImportPlan<'_, '_>,
) -> Result<Vec<(String, u8)>, InlineError> {
    let conversions = callee
        .returns
        .get(index)
        .map(|info| info.conversions.as_slice())
        .unwrap_or_default();
    let mut out = Vec::with_capacity(results.len());
    for (j, operand) in results.iter().enumerate() {
        let text = body.slice(operand.span()).to_string();
        let convert = conversions.get(j).copied().unwrap_or(false);
        match callee.results.get(j) {
            Some(result) if convert => {
                let ty = plan.qualify_type(&result.ty)?;
                let ty = if ty.starts_with(['*', '<']) || ty.starts_with("func") || ty.starts_with("chan") {
                    format!("({ty})")
                } else {
                    ty
                };
                out.push((format!("{ty}({text})"), PRIMARY_PREC));
            }
            _ => out.push((text, precedence(operand.as_ref()))),
        }
    }
    Ok(out)
}

fn join(operands: &[(String, u8)]) -> String {
    operands
        .iter()
        .map(|(text, _)| text.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Counts calls and receives of a statement outside the inlined call.
struct OtherEffects {
    call: Span,
    count: usize,
}

impl Visitor for OtherEffects {
    fn visit_expression(&mut self, expr: &Node<Expr>) {
        let effect = matches!(
            expr.as_ref(),
            Expr::Call { .. }
                | Expr::Unary {
                    op: UnaryOp::Recv,
                    ..
                }
        );
        if effect && !self.call.encloses(expr.span()) {
            self.count += 1;
        }
    }
}

fn only_effect(site: &CallSite<'_>, stmt: &Node<Statement>) -> bool {
    let mut other = OtherEffects {
        call: site.call.span(),
        count: 0,
    };
    visitor::walk_statement(stmt, &mut other);
    other.count == 0
}

/// Replaces the call with an expression, evaluating bound arguments in
/// declarations hoisted before the enclosing statement.
pub(crate) fn substitute(
    site: &CallSite<'_>,
    callee: &Callee,
    body: &Body,
    bindings: &Bindings,
    plan: &mut ImportPlan<'_, '_>,
) -> Result<Option<Replacement>, InlineError> {
    let Some(block) = body.decl.as_ref().body.as_ref() else {
        return Ok(None);
    };
    let stmts = &block.as_ref().stmts;
    let text = match (stmts.as_slice(), site.context) {
        (_, CallContext::GoDefer) => return Ok(None),
        ([stmt], context) if callee.shape.return_expr => {
            let Statement::Return(results) = stmt.as_ref() else {
                return Ok(None);
            };
            let operands = return_operands(callee, body, 0, results, plan)?;
            match (operands.as_slice(), context) {
                // Only calls and receives may stand as statements.
                ([(text, _)], CallContext::ExprStmt) => {
                    let is_effect = matches!(
                        results[0].as_ref().unparen(),
                        Expr::Call { .. } | Expr::Unary { op: UnaryOp::Recv, .. }
                    );
                    if !is_effect {
                        return Ok(None);
                    }
                    text.clone()
                }
                ([(text, prec)], _) => {
                    let mut text = if *prec < site.min_prec {
                        format!("({text})")
                    } else {
                        text.clone()
                    };
                    if site.unary_operand && text.starts_with(['-', '+', '^', '!', '&', '*', '<']) {
                        text = format!("({text})");
                    }
                    text
                }
                (many, CallContext::Assign { lhs, .. }) if many.len() == lhs.len() => join(many),
                (many, CallContext::Return) if many.len() > 1 => join(many),
                _ => return Ok(None),
            }
        }
        ([stmt], CallContext::ExprStmt) if callee.shape.expr_stmt => {
            let Statement::Expr(expr) = stmt.as_ref() else {
                return Ok(None);
            };
            body.slice(expr.span()).to_string()
        }
        _ => return Ok(None),
    };

    let call = site.call.span();
    if bindings.is_empty() {
        return Ok(Some(Replacement {
            edit: TextEdit::new(call.start as usize, call.end as usize, text)
                .with_expected(site.text(call)),
            strategy: Strategy::Substitute,
        }));
    }
    let Some(stmt) = site.stmt else {
        return Ok(None);
    };
    if !only_effect(site, stmt) {
        return Ok(None);
    }
    let start = stmt.span().start;
    let prefix = site.text(Span {
        start,
        end: call.start,
    });
    let sep = format!("\n{}", site.indent);
    let new_text = format!("{}{sep}{prefix}{text}", bindings.decls.join(&sep));
    let range = Span {
        start,
        end: call.end,
    };
    Ok(Some(Replacement {
        edit: TextEdit::new(range.start as usize, range.end as usize, new_text)
            .with_expected(site.text(range)),
        strategy: Strategy::Substitute,
    }))
}

/// Replaces the statement holding the call with the body's statements.
pub(crate) fn splice(
    site: &CallSite<'_>,
    callee: &Callee,
    body: &Body,
    bindings: &Bindings,
    plan: &mut ImportPlan<'_, '_>,
) -> Result<Option<Replacement>, InlineError> {
    let shape = &callee.shape;
    if shape.has_defer || shape.has_labels || shape.named_results {
        return Ok(None);
    }
    let Some(stmt) = site.stmt else {
        return Ok(None);
    };
    let Some(block) = body.decl.as_ref().body.as_ref() else {
        return Ok(None);
    };
    let stmts = &block.as_ref().stmts;
    let from = stmts
        .first()
        .map(|first| line_indent(&body.text, first.span().start as usize))
        .unwrap_or_default();
    let mut lines: Vec<String> = bindings.decls.clone();
    let text_of = |stmt: &Node<Statement>| reindent(body.slice(stmt.span()), &from, &site.indent);

    match site.context {
        CallContext::ExprStmt if shape.tail_return_only => {
            for (idx, stmt) in stmts.iter().enumerate() {
                let last = idx + 1 == stmts.len();
                match stmt.as_ref() {
                    Statement::Return(results) if last => {
                        let trivial = results.iter().all(|expr| {
                            matches!(expr.as_ref().unparen(), Expr::Ident(_) | Expr::BasicLit { .. })
                        });
                        if !trivial {
                            let operands = return_operands(callee, body, 0, results, plan)?;
                            let count = if results.len() == 1 {
                                callee.results.len().max(1)
                            } else {
                                results.len()
                            };
                            let blanks = vec!["_"; count].join(", ");
                            lines.push(format!("{blanks} = {}", join(&operands)));
                        }
                    }
                    _ => lines.push(text_of(stmt)),
                }
            }
        }
        CallContext::Assign { lhs, op } if shape.tail_return_only && !stmts.is_empty() => {
            let (Some(first), Some(last_lhs)) = (lhs.first(), lhs.last()) else {
                return Ok(None);
            };
            let targets = site.text(first.span().cover(last_lhs.span()));
            let ret = returns(stmts).len().saturating_sub(1);
            for (idx, stmt) in stmts.iter().enumerate() {
                let last = idx + 1 == stmts.len();
                match stmt.as_ref() {
                    Statement::Return(results) if last => {
                        let arity_ok = results.len() == lhs.len()
                            || (results.len() == 1 && callee.results.len() == lhs.len());
                        if !arity_ok {
                            return Ok(None);
                        }
                        let operands = return_operands(callee, body, ret, results, plan)?;
                        lines.push(format!("{targets} {} {}", op.as_str(), join(&operands)));
                    }
                    _ if last => return Ok(None),
                    _ => lines.push(text_of(stmt)),
                }
            }
        }
        CallContext::Return if same_results(site, callee) => {
            for stmt in stmts {
                lines.push(text_of(stmt));
            }
        }
        _ => return Ok(None),
    }

    let span = stmt.span();
    let sep = format!("\n{}", site.indent);
    let edit = if lines.is_empty() {
        // Remove the whole line.
        let text = &site.source.text;
        let start = span.start as usize - site.indent.len();
        let end = if text[span.end as usize..].starts_with('\n') {
            span.end as usize + 1
        } else {
            span.end as usize
        };
        TextEdit::new(start, end, "").with_expected(&text[start..end])
    } else {
        TextEdit::new(span.start as usize, span.end as usize, lines.join(&sep))
            .with_expected(site.text(span))
    };
    Ok(Some(Replacement {
        edit,
        strategy: Strategy::Splice,
    }))
}

/// The function enclosing the call declares exactly the callee's result types.
fn same_results(site: &CallSite<'_>, callee: &Callee) -> bool {
    let Some(func) = site.index.enclosing_func(site.id) else {
        return false;
    };
    let node = site.index.node(func);
    let ty = match (node.as_func_decl(), node.as_expr().map(Node::as_ref)) {
        (Some(decl), _) => decl.ty.as_ref(),
        (None, Some(Expr::FuncLit { ty, .. })) => ty.as_ref(),
        _ => return false,
    };
    let mut types = Vec::new();
    if let Some(results) = &ty.results {
        for field in &results.fields {
            let field = field.as_ref();
            let Some(ty) = site.program.type_of(site.file(), field.ty.span()) else {
                return false;
            };
            let text = site
                .program
                .type_string(ty, &gofix_typecheck::full_qualifier);
            types.extend(std::iter::repeat_n(text, field.names.len().max(1)));
        }
    }
    types.len() == callee.results.len()
        && types
            .iter()
            .zip(&callee.results)
            .all(|(have, want)| *have == want.ty.text)
}

/// Replaces the call with an immediately invoked function literal.
pub(crate) fn literalize(site: &CallSite<'_>, body: &Body, args: &[String]) -> Replacement {
    let decl = body.decl.as_ref();
    let fields = decl
        .recv
        .iter()
        .flat_map(|recv| recv.as_ref().fields.iter())
        .chain(decl.ty.as_ref().params.fields.iter())
        .map(|field| body.slice(field.span()))
        .collect::<Vec<_>>()
        .join(", ");
    let results = match &decl.ty.as_ref().results {
        Some(list) if list.fields.len() == 1 && list.fields[0].as_ref().names.is_empty() => {
            format!(" {}", body.slice(list.fields[0].span()))
        }
        Some(list) => {
            let inner = list
                .fields
                .iter()
                .map(|field| body.slice(field.span()))
                .collect::<Vec<_>>()
                .join(", ");
            format!(" ({inner})")
        }
        None => String::new(),
    };
    let block = decl
        .body
        .as_ref()
        .map(|block| reindent(body.slice(block.span()), "", &site.indent))
        .unwrap_or_else(|| "{}".to_string());
    let text = format!("func({fields}){results} {block}({})", args.join(", "));
    let call = site.call.span();
    Replacement {
        edit: TextEdit::new(call.start as usize, call.end as usize, text)
            .with_expected(site.text(call)),
        strategy: Strategy::Literalize,
    }
}

use std::ops::Range;

use chumsky::BoxedParser;
use chumsky::prelude::*;
use chumsky::recursive::Recursive;
use gofix_ast::{
    AssignOp, BinaryOp, Block, BranchKind, CaseClause, ChanDir, Decl, DeclKind, Expr, Field,
    FieldList, File, FuncDecl, FuncType, GenDecl, Ident, ImportSpec, LitKind, Node, Spec,
    Statement, TypeSpec, UnaryOp, ValueSpec,
};
use gofix_lexer::TokenKind as Tk;
use gofix_span::Span;

type Error = Simple<Tk>;
pub(crate) type Boxed<'src, O> = BoxedParser<'src, Tk, O, Error>;
type Rec<'src, O> = Recursive<'src, Tk, O, Error>;

fn sp(range: Range<usize>) -> Span {
    Span::from(range)
}

fn boxed(node: Node<Expr>) -> Box<Node<Expr>> {
    Box::new(node)
}

/// The Go grammar, parameterized by the source text so that identifier and
/// literal spellings can be sliced out of token spans.
///
/// Expressions come in two flavours. The full form accepts a composite
/// literal after any primary expression; the header form, used for the
/// expressions of `if`, `for` and `switch` clauses, only accepts one after an
/// explicit type literal so that `if x == y {` does not read `y {` as a
/// literal. Parenthesized, bracketed and argument sub-expressions always use
/// the full form.
#[derive(Clone)]
pub(crate) struct Grammar<'src> {
    src: &'src str,
    expr: Rec<'src, Node<Expr>>,
    ty: Rec<'src, Node<Expr>>,
    block: Rec<'src, Node<Block>>,
}

impl<'src> Grammar<'src> {
    pub(crate) fn new(src: &'src str) -> Self {
        let mut expr = Recursive::declare();
        let mut ty = Recursive::declare();
        let mut block = Recursive::declare();
        let grammar = Self {
            src,
            expr: expr.clone(),
            ty: ty.clone(),
            block: block.clone(),
        };
        ty.define(grammar.type_expr());
        expr.define(grammar.expression(true));
        let stmt = grammar.statement();
        block.define(
            stmt_list(stmt, just(Tk::RBrace).ignored().boxed())
                .delimited_by(just(Tk::LBrace), just(Tk::RBrace))
                .map_with_span(|stmts, range| Node::new(Block { stmts }, sp(range))),
        );
        grammar
    }

    pub(crate) fn file(&self) -> Boxed<'src, File> {
        let package = just(Tk::Package)
            .ignore_then(self.ident())
            .then_ignore(just(Tk::Semicolon));
        let decl = choice((
            self.func_decl().map(|func| func.map(Decl::Func)),
            self.gen_decl().map(|decl| decl.map(Decl::Gen)),
        ));
        let decls = choice((
            just(Tk::Semicolon).to(None),
            decl.then_ignore(just(Tk::Semicolon).ignored().or(end()))
                .map(Some),
        ))
        .repeated()
        .map(|decls| decls.into_iter().flatten().collect());

        package
            .then(decls)
            .then_ignore(end())
            .map(|(package, decls)| File {
                doc: None,
                package,
                decls,
                comments: Vec::new(),
            })
            .boxed()
    }

    /// A standalone function declaration, as stored in callee summaries.
    pub(crate) fn standalone_func(&self) -> Boxed<'src, Node<FuncDecl>> {
        self.func_decl()
            .then_ignore(just(Tk::Semicolon).or_not())
            .then_ignore(end())
            .boxed()
    }

    pub(crate) fn standalone_expr(&self) -> Boxed<'src, Node<Expr>> {
        self.expr
            .clone()
            .then_ignore(just(Tk::Semicolon).or_not())
            .then_ignore(end())
            .boxed()
    }

    fn ident(&self) -> Boxed<'src, Node<Ident>> {
        let src = self.src;
        just(Tk::Ident)
            .map_with_span(move |_, range: Range<usize>| {
                Node::new(Ident::new(&src[range.clone()]), sp(range))
            })
            .boxed()
    }

    fn string_lit(&self) -> Boxed<'src, Node<String>> {
        let src = self.src;
        just(Tk::String)
            .or(just(Tk::RawString))
            .map_with_span(move |_, range: Range<usize>| {
                Node::new(src[range.clone()].to_string(), sp(range))
            })
            .boxed()
    }

    fn basic_lit(&self) -> Boxed<'src, Node<Expr>> {
        let src = self.src;
        choice((
            just(Tk::Int).to(LitKind::Int),
            just(Tk::Float).to(LitKind::Float),
            just(Tk::Imag).to(LitKind::Imag),
            just(Tk::Char).to(LitKind::Char),
            just(Tk::String).to(LitKind::String),
            just(Tk::RawString).to(LitKind::String),
        ))
        .map_with_span(move |kind, range: Range<usize>| {
            let value = src[range.clone()].to_string();
            Node::new(Expr::BasicLit { kind, value }, sp(range))
        })
        .boxed()
    }

    fn type_name(&self) -> Boxed<'src, Node<Expr>> {
        self.ident()
            .then(just(Tk::Period).ignore_then(self.ident()).or_not())
            .map_with_span(|(first, sel), range| match sel {
                Some(sel) => Node::new(
                    Expr::Selector {
                        x: boxed(first.map(Expr::Ident)),
                        sel,
                    },
                    sp(range),
                ),
                None => first.map(Expr::Ident),
            })
            .boxed()
    }

    fn type_expr(&self) -> Boxed<'src, Node<Expr>> {
        let pointer = just(Tk::Mul)
            .ignore_then(self.ty.clone())
            .map_with_span(|elem, range| Node::new(Expr::Star(boxed(elem)), sp(range)));
        let paren = self
            .ty
            .clone()
            .delimited_by(just(Tk::LParen), just(Tk::RParen))
            .map_with_span(|ty, range| Node::new(Expr::Paren(boxed(ty)), sp(range)));
        choice((self.type_name(), pointer, self.type_literal(), paren)).boxed()
    }

    /// Type literals that may also start an operand.
    fn type_literal(&self) -> Boxed<'src, Node<Expr>> {
        let ty = self.ty.clone();
        let array = just(Tk::LBrack)
            .ignore_then(
                choice((
                    just(Tk::Ellipsis)
                        .map_with_span(|_, range| Node::new(Expr::Ellipsis(None), sp(range))),
                    self.expr.clone(),
                ))
                .or_not(),
            )
            .then_ignore(just(Tk::RBrack))
            .then(ty.clone())
            .map_with_span(|(len, elem), range| {
                Node::new(
                    Expr::ArrayType {
                        len: len.map(boxed),
                        elem: boxed(elem),
                    },
                    sp(range),
                )
            });
        let map = just(Tk::Map)
            .ignore_then(ty.clone().delimited_by(just(Tk::LBrack), just(Tk::RBrack)))
            .then(ty.clone())
            .map_with_span(|(key, value), range| {
                Node::new(
                    Expr::MapType {
                        key: boxed(key),
                        value: boxed(value),
                    },
                    sp(range),
                )
            });
        let chan = choice((
            just(Tk::Arrow)
                .ignore_then(just(Tk::Chan))
                .ignore_then(ty.clone())
                .map(|elem| (ChanDir::Recv, elem)),
            just(Tk::Chan)
                .ignore_then(just(Tk::Arrow))
                .ignore_then(ty.clone())
                .map(|elem| (ChanDir::Send, elem)),
            just(Tk::Chan)
                .ignore_then(ty)
                .map(|elem| (ChanDir::Both, elem)),
        ))
        .map_with_span(|(dir, elem), range| {
            Node::new(
                Expr::ChanType {
                    dir,
                    elem: boxed(elem),
                },
                sp(range),
            )
        });
        let func = just(Tk::Func)
            .ignore_then(self.signature())
            .map_with_span(|sig, range| Node::new(Expr::FuncType(sig.into_inner()), sp(range)));
        let strukt = just(Tk::Struct)
            .ignore_then(self.struct_fields())
            .map_with_span(|fields, range| Node::new(Expr::StructType(fields), sp(range)));
        let iface = just(Tk::Interface)
            .ignore_then(self.interface_elems())
            .map_with_span(|elems, range| Node::new(Expr::InterfaceType(elems), sp(range)));
        choice((array, map, chan, func, strukt, iface)).boxed()
    }

    fn signature(&self) -> Boxed<'src, Node<FuncType>> {
        let single = self.ty.clone().map(|ty| {
            let span = ty.span();
            FieldList {
                fields: vec![Node::new(
                    Field {
                        names: Vec::new(),
                        ty,
                        tag: None,
                    },
                    span,
                )],
            }
        });
        let results = choice((self.params(), single.boxed()));
        self.params()
            .then(results.or_not())
            .map_with_span(|(params, results), range| {
                Node::new(FuncType { params, results }, sp(range))
            })
            .boxed()
    }

    fn params(&self) -> Boxed<'src, FieldList> {
        let param_ty = choice((
            just(Tk::Ellipsis)
                .ignore_then(self.ty.clone())
                .map_with_span(|elem, range| {
                    Node::new(Expr::Ellipsis(Some(boxed(elem))), sp(range))
                }),
            self.ty.clone(),
        ));
        let entry = choice((
            self.ident()
                .then(param_ty.clone())
                .map(|(name, ty)| ParamEntry::Named(name, ty)),
            param_ty.map(ParamEntry::Type),
        ));
        entry
            .separated_by(just(Tk::Comma))
            .allow_trailing()
            .delimited_by(just(Tk::LParen), just(Tk::RParen))
            .try_map(|entries, range| {
                group_params(entries).map_err(|message| Simple::custom(range, message))
            })
            .boxed()
    }

    fn struct_fields(&self) -> Boxed<'src, FieldList> {
        let tag = self.string_lit().map(Node::into_inner).or_not();
        let named = self
            .ident()
            .separated_by(just(Tk::Comma))
            .at_least(1)
            .then(self.ty.clone())
            .then(tag.clone())
            .map(|((names, ty), tag)| Field { names, ty, tag });
        let embedded = just(Tk::Mul)
            .map_with_span(|_, range| sp(range))
            .or_not()
            .then(self.type_name())
            .then(tag)
            .map(|((star, ty), tag)| {
                let ty = match star {
                    Some(star) => {
                        let span = star.cover(ty.span());
                        Node::new(Expr::Star(boxed(ty)), span)
                    }
                    None => ty,
                };
                Field {
                    names: Vec::new(),
                    ty,
                    tag,
                }
            });
        choice((named, embedded))
            .map_with_span(|field, range| Node::new(field, sp(range)))
            .then_ignore(just(Tk::Semicolon).or_not())
            .repeated()
            .delimited_by(just(Tk::LBrace), just(Tk::RBrace))
            .map(|fields| FieldList { fields })
            .boxed()
    }

    fn interface_elems(&self) -> Boxed<'src, FieldList> {
        let method = self.ident().then(self.signature()).map(|(name, sig)| {
            let span = sig.span();
            Field {
                names: vec![name],
                ty: Node::new(Expr::FuncType(sig.into_inner()), span),
                tag: None,
            }
        });
        let embedded = self.type_name().map(|ty| Field {
            names: Vec::new(),
            ty,
            tag: None,
        });
        choice((method, embedded))
            .map_with_span(|field, range| Node::new(field, sp(range)))
            .then_ignore(just(Tk::Semicolon).or_not())
            .repeated()
            .delimited_by(just(Tk::LBrace), just(Tk::RBrace))
            .map(|fields| FieldList { fields })
            .boxed()
    }

    fn composite_body(&self) -> Boxed<'src, Vec<Node<Expr>>> {
        let expr = self.expr.clone();
        recursive(|body: Rec<'src, Vec<Node<Expr>>>| {
            let elided = body.map_with_span(|elts, range| {
                Node::new(Expr::CompositeLit { ty: None, elts }, sp(range))
            });
            let value = choice((elided, expr));
            let element = value
                .clone()
                .then(just(Tk::Colon).ignore_then(value).or_not())
                .map_with_span(|(key, value), range| match value {
                    Some(value) => Node::new(
                        Expr::KeyValue {
                            key: boxed(key),
                            value: boxed(value),
                        },
                        sp(range),
                    ),
                    None => key,
                });
            element
                .separated_by(just(Tk::Comma))
                .allow_trailing()
                .delimited_by(just(Tk::LBrace), just(Tk::RBrace))
        })
        .boxed()
    }

    fn operand(&self, composite_ok: bool) -> Boxed<'src, Node<Expr>> {
        let func_lit = just(Tk::Func)
            .ignore_then(self.signature())
            .then(self.block.clone())
            .map_with_span(|(ty, body), range| Node::new(Expr::FuncLit { ty, body }, sp(range)));
        let paren = self
            .expr
            .clone()
            .delimited_by(just(Tk::LParen), just(Tk::RParen))
            .map_with_span(|x, range| Node::new(Expr::Paren(boxed(x)), sp(range)));
        let name = self.ident().map(|ident| ident.map(Expr::Ident));
        let type_lit = if composite_ok {
            self.type_literal()
        } else {
            self.type_literal()
                .then(self.composite_body().or_not())
                .map_with_span(|(ty, elts), range| match elts {
                    Some(elts) => Node::new(
                        Expr::CompositeLit {
                            ty: Some(boxed(ty)),
                            elts,
                        },
                        sp(range),
                    ),
                    None => ty,
                })
                .boxed()
        };
        choice((self.basic_lit(), name, func_lit, type_lit, paren)).boxed()
    }

    fn postfix(&self, composite_ok: bool) -> Boxed<'src, (Postfix, Span)> {
        let selector = just(Tk::Period)
            .ignore_then(self.ident())
            .map(Postfix::Selector);
        let assert = just(Tk::Period)
            .ignore_then(
                choice((just(Tk::Type).to(None), self.ty.clone().map(Some)))
                    .delimited_by(just(Tk::LParen), just(Tk::RParen)),
            )
            .map(Postfix::Assert);
        let index = just(Tk::LBrack)
            .ignore_then(self.expr.clone().or_not())
            .then(
                just(Tk::Colon)
                    .ignore_then(self.expr.clone().or_not())
                    .then(just(Tk::Colon).ignore_then(self.expr.clone()).or_not())
                    .or_not(),
            )
            .then_ignore(just(Tk::RBrack))
            .try_map(|(low, rest), range| match (low, rest) {
                (Some(index), None) => Ok(Postfix::Index(index)),
                (None, None) => Err(Simple::custom(range, "expected operand")),
                (low, Some((high, max))) => Ok(Postfix::Slice(low, high, max)),
            });
        let call = self
            .expr
            .clone()
            .separated_by(just(Tk::Comma))
            .allow_trailing()
            .then(just(Tk::Ellipsis).or_not())
            .then_ignore(just(Tk::Comma).or_not())
            .delimited_by(just(Tk::LParen), just(Tk::RParen))
            .map(|(args, ellipsis)| Postfix::Call(args, ellipsis.is_some()));
        let base = choice((selector, assert, index, call));
        let parser = if composite_ok {
            base.or(self.composite_body().map(Postfix::Composite)).boxed()
        } else {
            base.boxed()
        };
        parser
            .map_with_span(|postfix, range| (postfix, sp(range)))
            .boxed()
    }

    fn primary(&self, composite_ok: bool) -> Boxed<'src, Node<Expr>> {
        self.operand(composite_ok)
            .then(self.postfix(composite_ok).repeated())
            .foldl(|x, (postfix, span)| postfix.apply(x, span))
            .boxed()
    }

    fn unary(&self, composite_ok: bool) -> Boxed<'src, Node<Expr>> {
        let op = choice((
            just(Tk::Add).to(Some(UnaryOp::Plus)),
            just(Tk::Sub).to(Some(UnaryOp::Neg)),
            just(Tk::Not).to(Some(UnaryOp::Not)),
            just(Tk::Xor).to(Some(UnaryOp::Xor)),
            just(Tk::And).to(Some(UnaryOp::Addr)),
            just(Tk::Arrow).to(Some(UnaryOp::Recv)),
            just(Tk::Mul).to(None),
        ))
        .map_with_span(|op, range: Range<usize>| (op, range.start));
        op.repeated()
            .then(self.primary(composite_ok))
            .foldr(|(op, start), x| {
                let span = Span::new(start, x.span().end as usize);
                let expr = match op {
                    Some(op) => Expr::Unary { op, x: boxed(x) },
                    None => Expr::Star(boxed(x)),
                };
                Node::new(expr, span)
            })
            .boxed()
    }

    fn expression(&self, composite_ok: bool) -> Boxed<'src, Node<Expr>> {
        let mul = binary_level(
            self.unary(composite_ok),
            choice((
                just(Tk::Mul).to(BinaryOp::Mul),
                just(Tk::Quo).to(BinaryOp::Quo),
                just(Tk::Rem).to(BinaryOp::Rem),
                just(Tk::Shl).to(BinaryOp::Shl),
                just(Tk::Shr).to(BinaryOp::Shr),
                just(Tk::And).to(BinaryOp::And),
                just(Tk::AndNot).to(BinaryOp::AndNot),
            ))
            .boxed(),
        );
        let add = binary_level(
            mul,
            choice((
                just(Tk::Add).to(BinaryOp::Add),
                just(Tk::Sub).to(BinaryOp::Sub),
                just(Tk::Or).to(BinaryOp::Or),
                just(Tk::Xor).to(BinaryOp::Xor),
            ))
            .boxed(),
        );
        let cmp = binary_level(
            add,
            choice((
                just(Tk::Eql).to(BinaryOp::Eql),
                just(Tk::Neq).to(BinaryOp::Neq),
                just(Tk::Lss).to(BinaryOp::Lss),
                just(Tk::Leq).to(BinaryOp::Leq),
                just(Tk::Gtr).to(BinaryOp::Gtr),
                just(Tk::Geq).to(BinaryOp::Geq),
            ))
            .boxed(),
        );
        let and = binary_level(cmp, just(Tk::LAnd).to(BinaryOp::LAnd).boxed());
        binary_level(and, just(Tk::LOr).to(BinaryOp::LOr).boxed())
    }

    fn simple_stmt(&self, composite_ok: bool) -> Boxed<'src, Node<Statement>> {
        let expr = if composite_ok {
            self.expr.clone().boxed()
        } else {
            self.expression(false)
        };
        let list = expr.clone().separated_by(just(Tk::Comma)).at_least(1);
        let assign_op = choice((
            just(Tk::Assign).to(AssignOp::Assign),
            just(Tk::Define).to(AssignOp::Define),
            just(Tk::AddAssign).to(AssignOp::Op(BinaryOp::Add)),
            just(Tk::SubAssign).to(AssignOp::Op(BinaryOp::Sub)),
            just(Tk::MulAssign).to(AssignOp::Op(BinaryOp::Mul)),
            just(Tk::QuoAssign).to(AssignOp::Op(BinaryOp::Quo)),
            just(Tk::RemAssign).to(AssignOp::Op(BinaryOp::Rem)),
            just(Tk::AndAssign).to(AssignOp::Op(BinaryOp::And)),
            just(Tk::OrAssign).to(AssignOp::Op(BinaryOp::Or)),
            just(Tk::XorAssign).to(AssignOp::Op(BinaryOp::Xor)),
            just(Tk::ShlAssign).to(AssignOp::Op(BinaryOp::Shl)),
            just(Tk::ShrAssign).to(AssignOp::Op(BinaryOp::Shr)),
            just(Tk::AndNotAssign).to(AssignOp::Op(BinaryOp::AndNot)),
        ));
        let tail = choice((
            assign_op
                .then(list.clone())
                .map(|(op, rhs)| SimpleTail::Assign(op, rhs)),
            just(Tk::Inc).to(SimpleTail::IncDec(true)),
            just(Tk::Dec).to(SimpleTail::IncDec(false)),
            just(Tk::Arrow).ignore_then(expr).map(SimpleTail::Send),
        ))
        .or_not();
        list.then(tail)
            .try_map(|(mut lhs, tail), range: Range<usize>| {
                let stmt = match tail {
                    Some(SimpleTail::Assign(op, rhs)) => Statement::Assign { lhs, op, rhs },
                    tail => {
                        let x = match lhs.pop() {
                            Some(x) if lhs.is_empty() => x,
                            _ => return Err(Simple::custom(range, "expected assignment")),
                        };
                        match tail {
                            Some(SimpleTail::IncDec(inc)) => Statement::IncDec { x, inc },
                            Some(SimpleTail::Send(value)) => Statement::Send { chan: x, value },
                            _ => Statement::Expr(x),
                        }
                    }
                };
                Ok(Node::new(stmt, sp(range)))
            })
            .boxed()
    }

    fn statement(&self) -> Boxed<'src, Node<Statement>> {
        let this = self.clone();
        recursive(move |stmt: Rec<'src, Node<Statement>>| {
            let local_decl = this.gen_decl().try_map(|decl, range| {
                if decl.as_ref().kind == DeclKind::Import {
                    Err(Simple::custom(range, "imports must appear before other declarations"))
                } else {
                    Ok(Statement::Decl(decl))
                }
            });
            let go = just(Tk::Go)
                .ignore_then(this.expr.clone())
                .map(Statement::Go);
            let defer = just(Tk::Defer)
                .ignore_then(this.expr.clone())
                .map(Statement::Defer);
            let ret = just(Tk::Return)
                .ignore_then(this.expr.clone().separated_by(just(Tk::Comma)))
                .map(Statement::Return);
            let branch = choice((
                just(Tk::Break).to(BranchKind::Break),
                just(Tk::Continue).to(BranchKind::Continue),
                just(Tk::Goto).to(BranchKind::Goto),
            ))
            .then(this.ident().or_not())
            .map(|(kind, label)| Statement::Branch { kind, label });
            let fallthrough = just(Tk::Fallthrough).to(Statement::Branch {
                kind: BranchKind::Fallthrough,
                label: None,
            });
            let block = this.block.clone().map(Statement::Block);
            let keyword = choice((local_decl, go, defer, ret, branch, fallthrough, block))
                .map_with_span(|stmt, range| Node::new(stmt, sp(range)));

            let labeled = this
                .ident()
                .then_ignore(just(Tk::Colon))
                .then(stmt.clone().or_not())
                .map_with_span(|(label, stmt), range| {
                    let stmt = stmt.unwrap_or_else(|| {
                        Node::new(Statement::Empty, Span::point(range.end))
                    });
                    Node::new(
                        Statement::Labeled {
                            label,
                            stmt: Box::new(stmt),
                        },
                        sp(range),
                    )
                });

            choice((
                keyword,
                this.if_stmt(),
                this.switch_stmt(stmt),
                this.for_stmt(),
                labeled,
                this.simple_stmt(true),
            ))
        })
        .boxed()
    }

    fn if_stmt(&self) -> Boxed<'src, Node<Statement>> {
        let init = self
            .simple_stmt(false)
            .then_ignore(just(Tk::Semicolon));
        let cond = self.expression(false);
        let block = self.block.clone();
        recursive(move |if_stmt: Rec<'src, Node<Statement>>| {
            let else_block = block
                .clone()
                .map_with_span(|block, range| Node::new(Statement::Block(block), sp(range)));
            let els = just(Tk::Else).ignore_then(choice((if_stmt, else_block.boxed())));
            just(Tk::If)
                .ignore_then(init.or_not())
                .then(cond)
                .then(block)
                .then(els.or_not())
                .map_with_span(|(((init, cond), then), els), range| {
                    Node::new(
                        Statement::If {
                            init: init.map(Box::new),
                            cond,
                            then,
                            els: els.map(Box::new),
                        },
                        sp(range),
                    )
                })
        })
        .boxed()
    }

    fn switch_stmt(&self, stmt: Rec<'src, Node<Statement>>) -> Boxed<'src, Node<Statement>> {
        let init = self
            .simple_stmt(false)
            .then_ignore(just(Tk::Semicolon));
        let case_head = choice((
            just(Tk::Case)
                .ignore_then(self.expr.clone().separated_by(just(Tk::Comma)).at_least(1))
                .map(|list| (list, false)),
            just(Tk::Default).to((Vec::new(), true)),
        ))
        .then_ignore(just(Tk::Colon));
        let clause_end = choice((just(Tk::Case), just(Tk::Default), just(Tk::RBrace)))
            .ignored()
            .boxed();
        let clause = case_head
            .then(stmt_list(stmt.boxed(), clause_end))
            .map_with_span(|((list, is_default), body), range| {
                Node::new(
                    CaseClause {
                        list,
                        is_default,
                        body,
                    },
                    sp(range),
                )
            });
        just(Tk::Switch)
            .ignore_then(init.or_not())
            .then(self.simple_stmt(false).or_not())
            .then(
                clause
                    .repeated()
                    .delimited_by(just(Tk::LBrace), just(Tk::RBrace)),
            )
            .try_map(|((init, tag), body), range: Range<usize>| {
                let init = init.map(Box::new);
                let stmt = match tag {
                    Some(tag) if is_type_switch_guard(tag.as_ref()) => Statement::TypeSwitch {
                        init,
                        assign: Box::new(tag),
                        body,
                    },
                    Some(tag) => match tag.into_inner() {
                        Statement::Expr(tag) => Statement::Switch {
                            init,
                            tag: Some(tag),
                            body,
                        },
                        _ => {
                            return Err(Simple::custom(
                                range,
                                "switch tag must be an expression",
                            ));
                        }
                    },
                    None => Statement::Switch {
                        init,
                        tag: None,
                        body,
                    },
                };
                Ok(Node::new(stmt, sp(range)))
            })
            .boxed()
    }

    fn for_stmt(&self) -> Boxed<'src, Node<Statement>> {
        let range_clause = self
            .expr
            .clone()
            .separated_by(just(Tk::Comma))
            .at_least(1)
            .then(choice((
                just(Tk::Define).to(true),
                just(Tk::Assign).to(false),
            )))
            .or_not()
            .then_ignore(just(Tk::Range))
            .then(self.expression(false))
            .map(|(lhs, x)| ForHeader::Range(lhs, x));
        let simple = self.simple_stmt(false);
        let clauses = simple
            .clone()
            .or_not()
            .then_ignore(just(Tk::Semicolon))
            .then(self.expression(false).or_not())
            .then_ignore(just(Tk::Semicolon))
            .then(simple.or_not())
            .map(|((init, cond), post)| ForHeader::Clauses(init, cond, post));
        let cond = self.expression(false).map(ForHeader::Cond);

        just(Tk::For)
            .ignore_then(choice((range_clause, clauses, cond)).or_not())
            .then(self.block.clone())
            .try_map(|(header, body), range: Range<usize>| {
                let stmt = match header {
                    None => Statement::For {
                        init: None,
                        cond: None,
                        post: None,
                        body,
                    },
                    Some(ForHeader::Cond(cond)) => Statement::For {
                        init: None,
                        cond: Some(cond),
                        post: None,
                        body,
                    },
                    Some(ForHeader::Clauses(init, cond, post)) => Statement::For {
                        init: init.map(Box::new),
                        cond,
                        post: post.map(Box::new),
                        body,
                    },
                    Some(ForHeader::Range(lhs, x)) => {
                        let (lhs, define) = lhs.unwrap_or_default();
                        if lhs.len() > 2 {
                            return Err(Simple::custom(range, "range clause permits at most two iteration variables"));
                        }
                        let mut vars = lhs.into_iter();
                        Statement::Range {
                            key: vars.next(),
                            value: vars.next(),
                            define,
                            x,
                            body,
                        }
                    }
                };
                Ok(Node::new(stmt, sp(range)))
            })
            .boxed()
    }

    fn gen_decl(&self) -> Boxed<'src, Node<GenDecl>> {
        let import_spec = choice((
            just(Tk::Period).map_with_span(|_, range| Node::new(Ident::new("."), sp(range))),
            self.ident(),
        ))
        .or_not()
        .then(self.string_lit())
        .map(|(name, path)| {
            Spec::Import(ImportSpec {
                doc: None,
                name,
                path: path.map(|path| unquote(&path)),
            })
        });
        let value_spec = self
            .ident()
            .separated_by(just(Tk::Comma))
            .at_least(1)
            .then(self.ty.clone().or_not())
            .then(
                just(Tk::Assign)
                    .ignore_then(self.expr.clone().separated_by(just(Tk::Comma)).at_least(1))
                    .or_not(),
            )
            .map(|((names, ty), values)| {
                Spec::Value(ValueSpec {
                    doc: None,
                    names,
                    ty,
                    values: values.unwrap_or_default(),
                })
            })
            .boxed();
        let type_spec = self
            .ident()
            .then(just(Tk::Assign).or_not())
            .then(self.ty.clone())
            .map(|((name, assign), ty)| {
                Spec::Type(TypeSpec {
                    doc: None,
                    name,
                    assign: assign.is_some(),
                    ty,
                })
            });
        choice((
            decl_of(Tk::Import, DeclKind::Import, import_spec.boxed()),
            decl_of(Tk::Const, DeclKind::Const, value_spec.clone()),
            decl_of(Tk::Var, DeclKind::Var, value_spec),
            decl_of(Tk::Type, DeclKind::Type, type_spec.boxed()),
        ))
        .map_with_span(|decl, range| Node::new(decl, sp(range)))
        .boxed()
    }

    fn func_decl(&self) -> Boxed<'src, Node<FuncDecl>> {
        just(Tk::Func)
            .ignore_then(
                self.params()
                    .map_with_span(|recv, range| Node::new(recv, sp(range)))
                    .or_not(),
            )
            .then(self.ident())
            .then(self.signature())
            .then(self.block.clone().or_not())
            .map_with_span(|(((recv, name), ty), body), range| {
                Node::new(
                    FuncDecl {
                        doc: None,
                        recv,
                        name,
                        ty,
                        body,
                    },
                    sp(range),
                )
            })
            .boxed()
    }
}

fn binary_level<'src>(
    lower: Boxed<'src, Node<Expr>>,
    ops: Boxed<'src, BinaryOp>,
) -> Boxed<'src, Node<Expr>> {
    lower
        .clone()
        .then(ops.then(lower).repeated())
        .foldl(|x, (op, y)| {
            let span = x.span().cover(y.span());
            Node::new(
                Expr::Binary {
                    op,
                    x: boxed(x),
                    y: boxed(y),
                },
                span,
            )
        })
        .boxed()
}

/// Statements separated by semicolons; the last one may instead be followed
/// by `terminator`, which is left unconsumed.
fn stmt_list<'src>(
    stmt: Boxed<'src, Node<Statement>>,
    terminator: Boxed<'src, ()>,
) -> Boxed<'src, Vec<Node<Statement>>> {
    choice((
        just(Tk::Semicolon).to(None),
        stmt.then_ignore(just(Tk::Semicolon).ignored().or(terminator.rewind()))
            .map(Some),
    ))
    .repeated()
    .map(|stmts| stmts.into_iter().flatten().collect())
    .boxed()
}

fn decl_of<'src>(keyword: Tk, kind: DeclKind, spec: Boxed<'src, Spec>) -> Boxed<'src, GenDecl> {
    let spec = spec.map_with_span(|spec, range| Node::new(spec, sp(range)));
    let group = just(Tk::LParen)
        .map_with_span(|_, range| sp(range))
        .then(
            choice((
                just(Tk::Semicolon).to(None),
                spec.clone()
                    .then_ignore(
                        just(Tk::Semicolon)
                            .ignored()
                            .or(just(Tk::RParen).ignored().rewind()),
                    )
                    .map(Some),
            ))
            .repeated(),
        )
        .then(just(Tk::RParen).map_with_span(|_, range| sp(range)))
        .map(|((lparen, specs), rparen)| {
            (Some(lparen), specs.into_iter().flatten().collect(), Some(rparen))
        });
    let single = spec.map(|spec| (None, vec![spec], None));
    just(keyword)
        .ignore_then(choice((group, single)))
        .map(move |(lparen, specs, rparen)| GenDecl {
            doc: None,
            kind,
            lparen,
            rparen,
            specs,
        })
        .boxed()
}

#[derive(Clone)]
enum ParamEntry {
    Named(Node<Ident>, Node<Expr>),
    Type(Node<Expr>),
}

/// Groups `a, b int, c string` style parameter entries into fields.
///
/// If any entry carries a name, every bare entry must be an identifier that
/// names a parameter of the next typed entry.
fn group_params(entries: Vec<ParamEntry>) -> Result<FieldList, String> {
    let named = entries
        .iter()
        .any(|entry| matches!(entry, ParamEntry::Named(..)));
    let mut fields = Vec::new();
    if !named {
        for entry in entries {
            if let ParamEntry::Type(ty) = entry {
                let span = ty.span();
                fields.push(Node::new(
                    Field {
                        names: Vec::new(),
                        ty,
                        tag: None,
                    },
                    span,
                ));
            }
        }
        return Ok(FieldList { fields });
    }

    let mut pending: Vec<Node<Ident>> = Vec::new();
    for entry in entries {
        match entry {
            ParamEntry::Type(ty) => match ty.as_ref() {
                Expr::Ident(ident) => pending.push(Node::new(ident.clone(), ty.span())),
                _ => return Err("mixed named and unnamed parameters".to_string()),
            },
            ParamEntry::Named(name, ty) => {
                pending.push(name);
                let span = pending
                    .first()
                    .map_or(ty.span(), |first| first.span().cover(ty.span()));
                fields.push(Node::new(
                    Field {
                        names: std::mem::take(&mut pending),
                        ty,
                        tag: None,
                    },
                    span,
                ));
            }
        }
    }
    if pending.is_empty() {
        Ok(FieldList { fields })
    } else {
        Err("mixed named and unnamed parameters".to_string())
    }
}

#[derive(Clone)]
enum Postfix {
    Selector(Node<Ident>),
    Assert(Option<Node<Expr>>),
    Index(Node<Expr>),
    Slice(Option<Node<Expr>>, Option<Node<Expr>>, Option<Node<Expr>>),
    Call(Vec<Node<Expr>>, bool),
    Composite(Vec<Node<Expr>>),
}

impl Postfix {
    fn apply(self, x: Node<Expr>, span: Span) -> Node<Expr> {
        let span = x.span().cover(span);
        let expr = match self {
            Postfix::Selector(sel) => Expr::Selector { x: boxed(x), sel },
            Postfix::Assert(ty) => Expr::TypeAssert {
                x: boxed(x),
                ty: ty.map(boxed),
            },
            Postfix::Index(index) => Expr::Index {
                x: boxed(x),
                index: boxed(index),
            },
            Postfix::Slice(low, high, max) => Expr::Slice {
                x: boxed(x),
                low: low.map(boxed),
                high: high.map(boxed),
                max: max.map(boxed),
            },
            Postfix::Call(args, ellipsis) => Expr::Call {
                fun: boxed(x),
                args,
                ellipsis,
            },
            Postfix::Composite(elts) => Expr::CompositeLit {
                ty: Some(boxed(x)),
                elts,
            },
        };
        Node::new(expr, span)
    }
}

#[derive(Clone)]
enum SimpleTail {
    Assign(AssignOp, Vec<Node<Expr>>),
    IncDec(bool),
    Send(Node<Expr>),
}

enum ForHeader {
    Range(Option<(Vec<Node<Expr>>, bool)>, Node<Expr>),
    Clauses(
        Option<Node<Statement>>,
        Option<Node<Expr>>,
        Option<Node<Statement>>,
    ),
    Cond(Node<Expr>),
}

fn is_type_switch_guard(stmt: &Statement) -> bool {
    let is_guard = |expr: &Node<Expr>| {
        matches!(expr.as_ref().unparen(), Expr::TypeAssert { ty: None, .. })
    };
    match stmt {
        Statement::Expr(expr) => is_guard(expr),
        Statement::Assign {
            op: AssignOp::Define,
            lhs,
            rhs,
        } => lhs.len() == 1 && rhs.len() == 1 && rhs.first().is_some_and(is_guard),
        _ => false,
    }
}

/// Strips the quotes of an interpreted or raw string literal.
pub(crate) fn unquote(literal: &str) -> String {
    literal
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| {
            literal
                .strip_prefix('`')
                .and_then(|rest| rest.strip_suffix('`'))
        })
        .unwrap_or(literal)
        .to_string()
}

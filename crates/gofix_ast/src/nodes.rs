use core::fmt;

use gofix_lexer::Comment;
use gofix_span::Span;

/// A syntax tree item together with the source span it was parsed from.
///
/// Nodes synthesized by rewriting carry [`Span::default`].
#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    item: T,
    span: Span,
}

impl<T> Node<T> {
    pub fn new(item: T, span: Span) -> Self {
        Self { item, span }
    }

    /// Wraps an item that has no position in any source text.
    pub fn synthetic(item: T) -> Self {
        Self {
            item,
            span: Span::default(),
        }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    pub fn as_ref(&self) -> &T {
        &self.item
    }

    pub fn as_mut(&mut self) -> &mut T {
        &mut self.item
    }

    pub fn into_inner(self) -> T {
        self.item
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Node<U> {
        Node {
            item: f(self.item),
            span: self.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub name: String,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }

    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Reports whether a Go identifier is exported (starts with an upper-case letter).
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    Xor,
    Addr,
    Recv,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Xor => "^",
            UnaryOp::Addr => "&",
            UnaryOp::Recv => "<-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    LOr,
    LAnd,
    Eql,
    Neq,
    Lss,
    Leq,
    Gtr,
    Geq,
    Add,
    Sub,
    Or,
    Xor,
    Mul,
    Quo,
    Rem,
    Shl,
    Shr,
    And,
    AndNot,
}

impl BinaryOp {
    /// Go operator precedence, 1 (`||`) through 5 (multiplicative).
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::LOr => 1,
            BinaryOp::LAnd => 2,
            BinaryOp::Eql
            | BinaryOp::Neq
            | BinaryOp::Lss
            | BinaryOp::Leq
            | BinaryOp::Gtr
            | BinaryOp::Geq => 3,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Or | BinaryOp::Xor => 4,
            BinaryOp::Mul
            | BinaryOp::Quo
            | BinaryOp::Rem
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::And
            | BinaryOp::AndNot => 5,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 3
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::LOr => "||",
            BinaryOp::LAnd => "&&",
            BinaryOp::Eql => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Lss => "<",
            BinaryOp::Leq => "<=",
            BinaryOp::Gtr => ">",
            BinaryOp::Geq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Mul => "*",
            BinaryOp::Quo => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::And => "&",
            BinaryOp::AndNot => "&^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    Define,
    Op(BinaryOp),
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Define => ":=",
            AssignOp::Op(BinaryOp::Add) => "+=",
            AssignOp::Op(BinaryOp::Sub) => "-=",
            AssignOp::Op(BinaryOp::Mul) => "*=",
            AssignOp::Op(BinaryOp::Quo) => "/=",
            AssignOp::Op(BinaryOp::Rem) => "%=",
            AssignOp::Op(BinaryOp::And) => "&=",
            AssignOp::Op(BinaryOp::Or) => "|=",
            AssignOp::Op(BinaryOp::Xor) => "^=",
            AssignOp::Op(BinaryOp::Shl) => "<<=",
            AssignOp::Op(BinaryOp::Shr) => ">>=",
            AssignOp::Op(BinaryOp::AndNot) => "&^=",
            AssignOp::Op(_) => "?=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

impl BranchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchKind::Break => "break",
            BranchKind::Continue => "continue",
            BranchKind::Goto => "goto",
            BranchKind::Fallthrough => "fallthrough",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(Ident),
    BasicLit {
        kind: LitKind,
        value: String,
    },
    /// `T{elts}`; the type is absent for elided inner literals.
    CompositeLit {
        ty: Option<Box<Node<Expr>>>,
        elts: Vec<Node<Expr>>,
    },
    FuncLit {
        ty: Node<FuncType>,
        body: Node<Block>,
    },
    Paren(Box<Node<Expr>>),
    Selector {
        x: Box<Node<Expr>>,
        sel: Node<Ident>,
    },
    Index {
        x: Box<Node<Expr>>,
        index: Box<Node<Expr>>,
    },
    Slice {
        x: Box<Node<Expr>>,
        low: Option<Box<Node<Expr>>>,
        high: Option<Box<Node<Expr>>>,
        max: Option<Box<Node<Expr>>>,
    },
    /// `x.(T)`; `ty` is `None` for the `x.(type)` guard of a type switch.
    TypeAssert {
        x: Box<Node<Expr>>,
        ty: Option<Box<Node<Expr>>>,
    },
    Call {
        fun: Box<Node<Expr>>,
        args: Vec<Node<Expr>>,
        ellipsis: bool,
    },
    /// `*x`: a pointer indirection or a pointer type.
    Star(Box<Node<Expr>>),
    Unary {
        op: UnaryOp,
        x: Box<Node<Expr>>,
    },
    Binary {
        op: BinaryOp,
        x: Box<Node<Expr>>,
        y: Box<Node<Expr>>,
    },
    KeyValue {
        key: Box<Node<Expr>>,
        value: Box<Node<Expr>>,
    },
    /// `[N]T`, `[...]T` (length is `Ellipsis(None)`) or `[]T` (no length).
    ArrayType {
        len: Option<Box<Node<Expr>>>,
        elem: Box<Node<Expr>>,
    },
    MapType {
        key: Box<Node<Expr>>,
        value: Box<Node<Expr>>,
    },
    ChanType {
        dir: ChanDir,
        elem: Box<Node<Expr>>,
    },
    FuncType(FuncType),
    StructType(FieldList),
    /// Methods are fields whose type is a `FuncType`; embedded interfaces are unnamed fields.
    InterfaceType(FieldList),
    /// `...T` in a parameter list, or the `...` array length.
    Ellipsis(Option<Box<Node<Expr>>>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Node<Expr> {
        Node::synthetic(Expr::Ident(Ident::new(name)))
    }

    pub fn selector(x: Node<Expr>, sel: impl Into<String>) -> Node<Expr> {
        Node::synthetic(Expr::Selector {
            x: Box::new(x),
            sel: Node::synthetic(Ident::new(sel)),
        })
    }

    pub fn call(fun: Node<Expr>, args: Vec<Node<Expr>>) -> Node<Expr> {
        Node::synthetic(Expr::Call {
            fun: Box::new(fun),
            args,
            ellipsis: false,
        })
    }

    pub fn unary(op: UnaryOp, x: Node<Expr>) -> Node<Expr> {
        Node::synthetic(Expr::Unary {
            op,
            x: Box::new(x),
        })
    }

    pub fn paren(x: Node<Expr>) -> Node<Expr> {
        Node::synthetic(Expr::Paren(Box::new(x)))
    }

    pub fn as_ident(&self) -> Option<&Ident> {
        match self {
            Expr::Ident(ident) => Some(ident),
            _ => None,
        }
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.as_ident().is_some_and(|ident| ident.name == name)
    }

    /// Strips any number of enclosing parentheses.
    pub fn unparen(&self) -> &Expr {
        match self {
            Expr::Paren(inner) => inner.as_ref().as_ref().unparen(),
            other => other,
        }
    }

    /// Reports whether the expression is syntactically a type (not a value).
    pub fn is_type_literal(&self) -> bool {
        matches!(
            self,
            Expr::ArrayType { .. }
                | Expr::MapType { .. }
                | Expr::ChanType { .. }
                | Expr::FuncType(_)
                | Expr::StructType(_)
                | Expr::InterfaceType(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub names: Vec<Node<Ident>>,
    pub ty: Node<Expr>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldList {
    pub fields: Vec<Node<Field>>,
}

impl FieldList {
    /// Number of declared entities: each name counts, as does each unnamed field.
    pub fn arity(&self) -> usize {
        self.fields
            .iter()
            .map(|field| field.as_ref().names.len().max(1))
            .sum()
    }

    pub fn is_named(&self) -> bool {
        self.fields
            .iter()
            .any(|field| !field.as_ref().names.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FuncType {
    pub params: FieldList,
    pub results: Option<FieldList>,
}

impl FuncType {
    pub fn is_variadic(&self) -> bool {
        self.params
            .fields
            .last()
            .is_some_and(|field| matches!(field.as_ref().ty.as_ref(), Expr::Ellipsis(_)))
    }

    pub fn result_count(&self) -> usize {
        self.results.as_ref().map_or(0, FieldList::arity)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Node<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseClause {
    /// Empty for `default`.
    pub list: Vec<Node<Expr>>,
    pub is_default: bool,
    pub body: Vec<Node<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Decl(Node<GenDecl>),
    Labeled {
        label: Node<Ident>,
        stmt: Box<Node<Statement>>,
    },
    Expr(Node<Expr>),
    Send {
        chan: Node<Expr>,
        value: Node<Expr>,
    },
    IncDec {
        x: Node<Expr>,
        inc: bool,
    },
    Assign {
        lhs: Vec<Node<Expr>>,
        op: AssignOp,
        rhs: Vec<Node<Expr>>,
    },
    Go(Node<Expr>),
    Defer(Node<Expr>),
    Return(Vec<Node<Expr>>),
    Branch {
        kind: BranchKind,
        label: Option<Node<Ident>>,
    },
    Block(Node<Block>),
    If {
        init: Option<Box<Node<Statement>>>,
        cond: Node<Expr>,
        then: Node<Block>,
        /// Either another `If` or a `Block`.
        els: Option<Box<Node<Statement>>>,
    },
    Switch {
        init: Option<Box<Node<Statement>>>,
        tag: Option<Node<Expr>>,
        body: Vec<Node<CaseClause>>,
    },
    /// `switch [init;] [x :=] y.(type) { ... }`; `assign` is an `Expr` or `Assign` statement.
    TypeSwitch {
        init: Option<Box<Node<Statement>>>,
        assign: Box<Node<Statement>>,
        body: Vec<Node<CaseClause>>,
    },
    For {
        init: Option<Box<Node<Statement>>>,
        cond: Option<Node<Expr>>,
        post: Option<Box<Node<Statement>>>,
        body: Node<Block>,
    },
    Range {
        key: Option<Node<Expr>>,
        value: Option<Node<Expr>>,
        define: bool,
        x: Node<Expr>,
        body: Node<Block>,
    },
    Empty,
}

impl Statement {
    pub fn expr(expr: Node<Expr>) -> Node<Statement> {
        Node::synthetic(Statement::Expr(expr))
    }

    pub fn assign(lhs: Vec<Node<Expr>>, op: AssignOp, rhs: Vec<Node<Expr>>) -> Node<Statement> {
        Node::synthetic(Statement::Assign { lhs, op, rhs })
    }

    pub fn block(stmts: Vec<Node<Statement>>) -> Node<Statement> {
        Node::synthetic(Statement::Block(Node::synthetic(Block { stmts })))
    }

    /// Reports whether the statement introduces names into the enclosing block.
    pub fn declares_names(&self) -> bool {
        match self {
            Statement::Decl(_) => true,
            Statement::Assign { op, .. } => *op == AssignOp::Define,
            Statement::Labeled { .. } => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommentGroup {
    pub list: Vec<Comment>,
}

impl CommentGroup {
    pub fn span(&self) -> Span {
        match (self.list.first(), self.list.last()) {
            (Some(first), Some(last)) => first.span.cover(last.span),
            _ => Span::default(),
        }
    }

    /// The comment lines with their markers removed.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for comment in &self.list {
            let text = comment.text.as_str();
            let body = text
                .strip_prefix("//")
                .or_else(|| text.strip_prefix("/*").and_then(|t| t.strip_suffix("*/")))
                .unwrap_or(text);
            out.push_str(body.strip_prefix(' ').unwrap_or(body));
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Import,
    Const,
    Var,
    Type,
}

impl DeclKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Import => "import",
            DeclKind::Const => "const",
            DeclKind::Var => "var",
            DeclKind::Type => "type",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpec {
    pub doc: Option<CommentGroup>,
    pub name: Option<Node<Ident>>,
    /// The unquoted import path; the node span includes the quotes.
    pub path: Node<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueSpec {
    pub doc: Option<CommentGroup>,
    pub names: Vec<Node<Ident>>,
    pub ty: Option<Node<Expr>>,
    pub values: Vec<Node<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub doc: Option<CommentGroup>,
    pub name: Node<Ident>,
    /// `type A = B`
    pub assign: bool,
    pub ty: Node<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Spec {
    Import(ImportSpec),
    Value(ValueSpec),
    Type(TypeSpec),
}

impl Spec {
    pub fn doc(&self) -> Option<&CommentGroup> {
        match self {
            Spec::Import(spec) => spec.doc.as_ref(),
            Spec::Value(spec) => spec.doc.as_ref(),
            Spec::Type(spec) => spec.doc.as_ref(),
        }
    }

    pub fn doc_mut(&mut self) -> &mut Option<CommentGroup> {
        match self {
            Spec::Import(spec) => &mut spec.doc,
            Spec::Value(spec) => &mut spec.doc,
            Spec::Type(spec) => &mut spec.doc,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenDecl {
    pub doc: Option<CommentGroup>,
    pub kind: DeclKind,
    /// Present for the parenthesized form `kind ( specs )`.
    pub lparen: Option<Span>,
    pub rparen: Option<Span>,
    pub specs: Vec<Node<Spec>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub doc: Option<CommentGroup>,
    pub recv: Option<Node<FieldList>>,
    pub name: Node<Ident>,
    pub ty: Node<FuncType>,
    pub body: Option<Node<Block>>,
}

impl FuncDecl {
    pub fn is_method(&self) -> bool {
        self.recv.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Gen(GenDecl),
    Func(FuncDecl),
}

impl Decl {
    pub fn doc(&self) -> Option<&CommentGroup> {
        match self {
            Decl::Gen(decl) => decl.doc.as_ref(),
            Decl::Func(decl) => decl.doc.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub doc: Option<CommentGroup>,
    pub package: Node<Ident>,
    pub decls: Vec<Node<Decl>>,
    pub comments: Vec<CommentGroup>,
}

impl File {
    /// All import specs of the file, paired with their spans.
    pub fn imports(&self) -> impl Iterator<Item = (Span, &ImportSpec)> {
        self.decls
            .iter()
            .filter_map(|decl| match decl.as_ref() {
                Decl::Gen(gen_decl) if gen_decl.kind == DeclKind::Import => Some(gen_decl),
                _ => None,
            })
            .flat_map(|gen_decl| gen_decl.specs.iter())
            .filter_map(|spec| match spec.as_ref() {
                Spec::Import(import) => Some((spec.span(), import)),
                _ => None,
            })
    }

    pub fn funcs(&self) -> impl Iterator<Item = (Span, &FuncDecl)> {
        self.decls.iter().filter_map(|decl| match decl.as_ref() {
            Decl::Func(func) => Some((decl.span(), func)),
            Decl::Gen(_) => None,
        })
    }
}

//! Parent-linked index over a parsed file.
//!
//! The tree itself stays immutable and owns no back references; the index
//! is an arena of borrowed node references in pre-order, each carrying the
//! arena index of its parent.

use gofix_span::Span;

use crate::nodes::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Decl(&'a Node<Decl>),
    Spec(&'a Node<Spec>),
    Field(&'a Node<Field>),
    Block(&'a Node<Block>),
    Clause(&'a Node<CaseClause>),
    Statement(&'a Node<Statement>),
    Expr(&'a Node<Expr>),
}

impl<'a> NodeRef<'a> {
    pub fn span(&self) -> Span {
        match self {
            NodeRef::Decl(node) => node.span(),
            NodeRef::Spec(node) => node.span(),
            NodeRef::Field(node) => node.span(),
            NodeRef::Block(node) => node.span(),
            NodeRef::Clause(node) => node.span(),
            NodeRef::Statement(node) => node.span(),
            NodeRef::Expr(node) => node.span(),
        }
    }

    pub fn as_expr(&self) -> Option<&'a Node<Expr>> {
        match *self {
            NodeRef::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn as_statement(&self) -> Option<&'a Node<Statement>> {
        match *self {
            NodeRef::Statement(stmt) => Some(stmt),
            _ => None,
        }
    }

    pub fn as_func_decl(&self) -> Option<&'a FuncDecl> {
        match *self {
            NodeRef::Decl(decl) => match decl.as_ref() {
                Decl::Func(func) => Some(func),
                Decl::Gen(_) => None,
            },
            _ => None,
        }
    }

    /// Reports whether this node is a function declaration or literal.
    pub fn is_func(&self) -> bool {
        self.as_func_decl().is_some()
            || self
                .as_expr()
                .is_some_and(|expr| matches!(expr.as_ref(), Expr::FuncLit { .. }))
    }

    /// Reports whether this node holds a statement list.
    pub fn is_statement_list(&self) -> bool {
        matches!(self, NodeRef::Block(_) | NodeRef::Clause(_))
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry<'a> {
    node: NodeRef<'a>,
    parent: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct SyntaxIndex<'a> {
    entries: Vec<Entry<'a>>,
}

impl<'a> SyntaxIndex<'a> {
    pub fn new(file: &'a File) -> Self {
        let mut index = Self {
            entries: Vec::new(),
        };
        for decl in &file.decls {
            index.add_decl(decl, None);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'a> {
        self.entries[id.index()].node
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entries[id.index()].parent
    }

    /// Proper ancestors of `id`, innermost first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut cursor = self.parent(id);
        std::iter::from_fn(move || {
            let current = cursor?;
            cursor = self.parent(current);
            Some(current)
        })
    }

    /// All nodes in pre-order.
    pub fn preorder(&self) -> impl Iterator<Item = (NodeId, NodeRef<'a>)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (NodeId(idx as u32), entry.node))
    }

    /// Every call expression, in pre-order.
    pub fn calls(&self) -> impl Iterator<Item = (NodeId, &'a Node<Expr>)> + '_ {
        self.preorder().filter_map(|(id, node)| {
            let expr = node.as_expr()?;
            matches!(expr.as_ref(), Expr::Call { .. }).then_some((id, expr))
        })
    }

    /// The expression node whose span is exactly `span`, preferring the outermost.
    pub fn find_expr(&self, span: Span) -> Option<NodeId> {
        self.preorder()
            .find(|(_, node)| matches!(node, NodeRef::Expr(_)) && node.span() == span)
            .map(|(id, _)| id)
    }

    /// The call expression whose span is exactly `span`.
    pub fn find_call(&self, span: Span) -> Option<NodeId> {
        self.calls()
            .find(|(_, expr)| expr.span() == span)
            .map(|(id, _)| id)
    }

    /// The innermost call expression whose span contains `offset`.
    pub fn call_at(&self, offset: usize) -> Option<NodeId> {
        self.calls()
            .filter(|(_, expr)| expr.span().contains(offset))
            .last()
            .map(|(id, _)| id)
    }

    /// The innermost statement enclosing `id` (which may be `id` itself).
    pub fn enclosing_statement(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&candidate| matches!(self.node(candidate), NodeRef::Statement(_)))
    }

    /// The innermost function declaration or literal strictly enclosing `id`.
    pub fn enclosing_func(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&candidate| self.node(candidate).is_func())
    }

    /// The function declaration enclosing `id`, skipping literals.
    pub fn enclosing_func_decl(&self, id: NodeId) -> Option<&'a FuncDecl> {
        self.ancestors(id)
            .find_map(|candidate| self.node(candidate).as_func_decl())
    }

    fn push(&mut self, node: NodeRef<'a>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.entries.len() as u32);
        self.entries.push(Entry { node, parent });
        id
    }

    fn add_decl(&mut self, decl: &'a Node<Decl>, parent: Option<NodeId>) {
        let id = self.push(NodeRef::Decl(decl), parent);
        match decl.as_ref() {
            Decl::Gen(gen_decl) => self.add_specs(gen_decl, id),
            Decl::Func(func) => {
                if let Some(recv) = &func.recv {
                    self.add_fields(recv.as_ref(), id);
                }
                self.add_func_type(func.ty.as_ref(), id);
                if let Some(body) = &func.body {
                    self.add_block(body, id);
                }
            }
        }
    }

    fn add_specs(&mut self, decl: &'a GenDecl, parent: NodeId) {
        for spec in &decl.specs {
            let id = self.push(NodeRef::Spec(spec), Some(parent));
            match spec.as_ref() {
                Spec::Import(_) => {}
                Spec::Value(value) => {
                    if let Some(ty) = &value.ty {
                        self.add_expr(ty, id);
                    }
                    for expr in &value.values {
                        self.add_expr(expr, id);
                    }
                }
                Spec::Type(type_spec) => self.add_expr(&type_spec.ty, id),
            }
        }
    }

    fn add_func_type(&mut self, ty: &'a FuncType, parent: NodeId) {
        self.add_fields(&ty.params, parent);
        if let Some(results) = &ty.results {
            self.add_fields(results, parent);
        }
    }

    fn add_fields(&mut self, list: &'a FieldList, parent: NodeId) {
        for field in &list.fields {
            let id = self.push(NodeRef::Field(field), Some(parent));
            self.add_expr(&field.as_ref().ty, id);
        }
    }

    fn add_block(&mut self, block: &'a Node<Block>, parent: NodeId) {
        let id = self.push(NodeRef::Block(block), Some(parent));
        for stmt in &block.as_ref().stmts {
            self.add_stmt(stmt, id);
        }
    }

    fn add_clauses(&mut self, clauses: &'a [Node<CaseClause>], parent: NodeId) {
        for clause in clauses {
            let id = self.push(NodeRef::Clause(clause), Some(parent));
            for expr in &clause.as_ref().list {
                self.add_expr(expr, id);
            }
            for stmt in &clause.as_ref().body {
                self.add_stmt(stmt, id);
            }
        }
    }

    fn add_opt_stmt(&mut self, stmt: Option<&'a Node<Statement>>, parent: NodeId) {
        if let Some(stmt) = stmt {
            self.add_stmt(stmt, parent);
        }
    }

    fn add_stmt(&mut self, stmt: &'a Node<Statement>, parent: NodeId) {
        let id = self.push(NodeRef::Statement(stmt), Some(parent));
        match stmt.as_ref() {
            Statement::Decl(decl) => self.add_specs(decl.as_ref(), id),
            Statement::Labeled { stmt, .. } => self.add_stmt(stmt, id),
            Statement::Expr(expr) | Statement::Go(expr) | Statement::Defer(expr) => {
                self.add_expr(expr, id);
            }
            Statement::Send { chan, value } => {
                self.add_expr(chan, id);
                self.add_expr(value, id);
            }
            Statement::IncDec { x, .. } => self.add_expr(x, id),
            Statement::Assign { lhs, rhs, .. } => {
                for expr in lhs.iter().chain(rhs) {
                    self.add_expr(expr, id);
                }
            }
            Statement::Return(results) => {
                for expr in results {
                    self.add_expr(expr, id);
                }
            }
            Statement::Branch { .. } | Statement::Empty => {}
            Statement::Block(block) => self.add_block(block, id),
            Statement::If {
                init,
                cond,
                then,
                els,
            } => {
                self.add_opt_stmt(init.as_deref(), id);
                self.add_expr(cond, id);
                self.add_block(then, id);
                self.add_opt_stmt(els.as_deref(), id);
            }
            Statement::Switch { init, tag, body } => {
                self.add_opt_stmt(init.as_deref(), id);
                if let Some(tag) = tag {
                    self.add_expr(tag, id);
                }
                self.add_clauses(body, id);
            }
            Statement::TypeSwitch { init, assign, body } => {
                self.add_opt_stmt(init.as_deref(), id);
                self.add_stmt(assign, id);
                self.add_clauses(body, id);
            }
            Statement::For {
                init,
                cond,
                post,
                body,
            } => {
                self.add_opt_stmt(init.as_deref(), id);
                if let Some(cond) = cond {
                    self.add_expr(cond, id);
                }
                self.add_opt_stmt(post.as_deref(), id);
                self.add_block(body, id);
            }
            Statement::Range {
                key,
                value,
                x,
                body,
                ..
            } => {
                for expr in key.iter().chain(value) {
                    self.add_expr(expr, id);
                }
                self.add_expr(x, id);
                self.add_block(body, id);
            }
        }
    }

    fn add_opt_expr(&mut self, expr: Option<&'a Node<Expr>>, parent: NodeId) {
        if let Some(expr) = expr {
            self.add_expr(expr, parent);
        }
    }

    fn add_expr(&mut self, expr: &'a Node<Expr>, parent: NodeId) {
        let id = self.push(NodeRef::Expr(expr), Some(parent));
        match expr.as_ref() {
            Expr::Ident(_) | Expr::BasicLit { .. } => {}
            Expr::CompositeLit { ty, elts } => {
                self.add_opt_expr(ty.as_deref(), id);
                for elt in elts {
                    self.add_expr(elt, id);
                }
            }
            Expr::FuncLit { ty, body } => {
                self.add_func_type(ty.as_ref(), id);
                self.add_block(body, id);
            }
            Expr::Paren(x) | Expr::Star(x) | Expr::Unary { x, .. } | Expr::Selector { x, .. } => {
                self.add_expr(x, id);
            }
            Expr::Index { x, index } => {
                self.add_expr(x, id);
                self.add_expr(index, id);
            }
            Expr::Slice { x, low, high, max } => {
                self.add_expr(x, id);
                self.add_opt_expr(low.as_deref(), id);
                self.add_opt_expr(high.as_deref(), id);
                self.add_opt_expr(max.as_deref(), id);
            }
            Expr::TypeAssert { x, ty } => {
                self.add_expr(x, id);
                self.add_opt_expr(ty.as_deref(), id);
            }
            Expr::Call { fun, args, .. } => {
                self.add_expr(fun, id);
                for arg in args {
                    self.add_expr(arg, id);
                }
            }
            Expr::Binary { x, y, .. } => {
                self.add_expr(x, id);
                self.add_expr(y, id);
            }
            Expr::KeyValue { key, value } => {
                self.add_expr(key, id);
                self.add_expr(value, id);
            }
            Expr::ArrayType { len, elem } => {
                self.add_opt_expr(len.as_deref(), id);
                self.add_expr(elem, id);
            }
            Expr::MapType { key, value } => {
                self.add_expr(key, id);
                self.add_expr(value, id);
            }
            Expr::ChanType { elem, .. } => self.add_expr(elem, id),
            Expr::FuncType(ty) => self.add_func_type(ty, id),
            Expr::StructType(fields) | Expr::InterfaceType(fields) => self.add_fields(fields, id),
            Expr::Ellipsis(elem) => self.add_opt_expr(elem.as_deref(), id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // package p; func f() { g(x) }
    fn sample() -> File {
        let call = Node::new(
            Expr::Call {
                fun: Box::new(Node::new(Expr::Ident(Ident::new("g")), Span::new(24, 25))),
                args: vec![Node::new(Expr::Ident(Ident::new("x")), Span::new(26, 27))],
                ellipsis: false,
            },
            Span::new(24, 28),
        );
        let body = Node::new(
            Block {
                stmts: vec![Node::new(Statement::Expr(call), Span::new(24, 28))],
            },
            Span::new(22, 30),
        );
        let func = FuncDecl {
            doc: None,
            recv: None,
            name: Node::new(Ident::new("f"), Span::new(16, 17)),
            ty: Node::new(FuncType::default(), Span::new(11, 19)),
            body: Some(body),
        };
        File {
            doc: None,
            package: Node::new(Ident::new("p"), Span::new(8, 9)),
            decls: vec![Node::new(Decl::Func(func), Span::new(11, 30))],
            comments: Vec::new(),
        }
    }

    #[test]
    fn test_find_call_and_parents() {
        let file = sample();
        let index = SyntaxIndex::new(&file);
        let call = index.find_call(Span::new(24, 28)).unwrap();
        let stmt = index.enclosing_statement(call).unwrap();
        assert!(matches!(
            index.node(stmt).as_statement().unwrap().as_ref(),
            Statement::Expr(_)
        ));
        let block = index.parent(stmt).unwrap();
        assert!(index.node(block).is_statement_list());
        let func = index.enclosing_func_decl(call).unwrap();
        assert_eq!(func.name.as_ref().name, "f");
        assert_eq!(index.ancestors(call).count(), 3);
    }

    #[test]
    fn test_call_at_offset() {
        let file = sample();
        let index = SyntaxIndex::new(&file);
        assert!(index.call_at(26).is_some());
        assert!(index.call_at(12).is_none());
        assert_eq!(index.calls().count(), 1);
    }
}

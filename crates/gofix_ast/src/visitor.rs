use crate::nodes::*;

/// A read-only AST visitor.
///
/// Hooks are invoked in pre-order; the walk always descends into children.
/// `visit_ident` sees identifiers in binding positions (declared names,
/// field names, labels), never `Expr::Ident` uses or selector names.
pub trait Visitor {
    fn visit_statement(&mut self, _stmt: &Node<Statement>) {}
    fn visit_expression(&mut self, _expr: &Node<Expr>) {}
    fn visit_block(&mut self, _block: &Node<Block>) {}
    fn visit_func_decl(&mut self, _func: &FuncDecl) {}
    fn visit_ident(&mut self, _ident: &Node<Ident>) {}
}

/// Traverse a whole file using a read-only visitor.
pub fn visit(file: &File, visitor: &mut impl Visitor) {
    for decl in &file.decls {
        walk_decl(decl, visitor);
    }
}

pub fn walk_decl(decl: &Node<Decl>, visitor: &mut impl Visitor) {
    match decl.as_ref() {
        Decl::Gen(gen_decl) => walk_gen_decl(gen_decl, visitor),
        Decl::Func(func) => walk_func_decl(func, visitor),
    }
}

pub fn walk_func_decl(func: &FuncDecl, visitor: &mut impl Visitor) {
    visitor.visit_func_decl(func);
    if let Some(recv) = &func.recv {
        walk_field_list(recv.as_ref(), visitor);
    }
    visitor.visit_ident(&func.name);
    walk_func_type(func.ty.as_ref(), visitor);
    if let Some(body) = &func.body {
        walk_block(body, visitor);
    }
}

pub fn walk_gen_decl(decl: &GenDecl, visitor: &mut impl Visitor) {
    for spec in &decl.specs {
        match spec.as_ref() {
            Spec::Import(import) => {
                if let Some(name) = &import.name {
                    visitor.visit_ident(name);
                }
            }
            Spec::Value(value) => {
                for name in &value.names {
                    visitor.visit_ident(name);
                }
                if let Some(ty) = &value.ty {
                    walk_expression(ty, visitor);
                }
                for expr in &value.values {
                    walk_expression(expr, visitor);
                }
            }
            Spec::Type(type_spec) => {
                visitor.visit_ident(&type_spec.name);
                walk_expression(&type_spec.ty, visitor);
            }
        }
    }
}

pub fn walk_func_type(ty: &FuncType, visitor: &mut impl Visitor) {
    walk_field_list(&ty.params, visitor);
    if let Some(results) = &ty.results {
        walk_field_list(results, visitor);
    }
}

pub fn walk_field_list(list: &FieldList, visitor: &mut impl Visitor) {
    for field in &list.fields {
        for name in &field.as_ref().names {
            visitor.visit_ident(name);
        }
        walk_expression(&field.as_ref().ty, visitor);
    }
}

pub fn walk_block(block: &Node<Block>, visitor: &mut impl Visitor) {
    visitor.visit_block(block);
    for stmt in &block.as_ref().stmts {
        walk_statement(stmt, visitor);
    }
}

fn walk_opt_statement(stmt: Option<&Node<Statement>>, visitor: &mut impl Visitor) {
    if let Some(stmt) = stmt {
        walk_statement(stmt, visitor);
    }
}

fn walk_clauses(clauses: &[Node<CaseClause>], visitor: &mut impl Visitor) {
    for clause in clauses {
        for expr in &clause.as_ref().list {
            walk_expression(expr, visitor);
        }
        for stmt in &clause.as_ref().body {
            walk_statement(stmt, visitor);
        }
    }
}

pub fn walk_statement(stmt: &Node<Statement>, visitor: &mut impl Visitor) {
    visitor.visit_statement(stmt);
    match stmt.as_ref() {
        Statement::Decl(decl) => walk_gen_decl(decl.as_ref(), visitor),
        Statement::Labeled { label, stmt } => {
            visitor.visit_ident(label);
            walk_statement(stmt, visitor);
        }
        Statement::Expr(expr) | Statement::Go(expr) | Statement::Defer(expr) => {
            walk_expression(expr, visitor);
        }
        Statement::Send { chan, value } => {
            walk_expression(chan, visitor);
            walk_expression(value, visitor);
        }
        Statement::IncDec { x, .. } => walk_expression(x, visitor),
        Statement::Assign { lhs, rhs, .. } => {
            for expr in lhs.iter().chain(rhs) {
                walk_expression(expr, visitor);
            }
        }
        Statement::Return(results) => {
            for expr in results {
                walk_expression(expr, visitor);
            }
        }
        Statement::Branch { label, .. } => {
            if let Some(label) = label {
                visitor.visit_ident(label);
            }
        }
        Statement::Block(block) => walk_block(block, visitor),
        Statement::If {
            init,
            cond,
            then,
            els,
        } => {
            walk_opt_statement(init.as_deref(), visitor);
            walk_expression(cond, visitor);
            walk_block(then, visitor);
            walk_opt_statement(els.as_deref(), visitor);
        }
        Statement::Switch { init, tag, body } => {
            walk_opt_statement(init.as_deref(), visitor);
            if let Some(tag) = tag {
                walk_expression(tag, visitor);
            }
            walk_clauses(body, visitor);
        }
        Statement::TypeSwitch { init, assign, body } => {
            walk_opt_statement(init.as_deref(), visitor);
            walk_statement(assign, visitor);
            walk_clauses(body, visitor);
        }
        Statement::For {
            init,
            cond,
            post,
            body,
        } => {
            walk_opt_statement(init.as_deref(), visitor);
            if let Some(cond) = cond {
                walk_expression(cond, visitor);
            }
            walk_opt_statement(post.as_deref(), visitor);
            walk_block(body, visitor);
        }
        Statement::Range {
            key,
            value,
            x,
            body,
            ..
        } => {
            for expr in key.iter().chain(value) {
                walk_expression(expr, visitor);
            }
            walk_expression(x, visitor);
            walk_block(body, visitor);
        }
        Statement::Empty => {}
    }
}

fn walk_opt_expression(expr: Option<&Node<Expr>>, visitor: &mut impl Visitor) {
    if let Some(expr) = expr {
        walk_expression(expr, visitor);
    }
}

pub fn walk_expression(expr: &Node<Expr>, visitor: &mut impl Visitor) {
    visitor.visit_expression(expr);
    match expr.as_ref() {
        Expr::Ident(_) | Expr::BasicLit { .. } => {}
        Expr::CompositeLit { ty, elts } => {
            walk_opt_expression(ty.as_deref(), visitor);
            for elt in elts {
                walk_expression(elt, visitor);
            }
        }
        Expr::FuncLit { ty, body } => {
            walk_func_type(ty.as_ref(), visitor);
            walk_block(body, visitor);
        }
        Expr::Paren(x) | Expr::Star(x) | Expr::Unary { x, .. } => walk_expression(x, visitor),
        Expr::Selector { x, .. } => walk_expression(x, visitor),
        Expr::Index { x, index } => {
            walk_expression(x, visitor);
            walk_expression(index, visitor);
        }
        Expr::Slice { x, low, high, max } => {
            walk_expression(x, visitor);
            walk_opt_expression(low.as_deref(), visitor);
            walk_opt_expression(high.as_deref(), visitor);
            walk_opt_expression(max.as_deref(), visitor);
        }
        Expr::TypeAssert { x, ty } => {
            walk_expression(x, visitor);
            walk_opt_expression(ty.as_deref(), visitor);
        }
        Expr::Call { fun, args, .. } => {
            walk_expression(fun, visitor);
            for arg in args {
                walk_expression(arg, visitor);
            }
        }
        Expr::Binary { x, y, .. } => {
            walk_expression(x, visitor);
            walk_expression(y, visitor);
        }
        Expr::KeyValue { key, value } => {
            walk_expression(key, visitor);
            walk_expression(value, visitor);
        }
        Expr::ArrayType { len, elem } => {
            walk_opt_expression(len.as_deref(), visitor);
            walk_expression(elem, visitor);
        }
        Expr::MapType { key, value } => {
            walk_expression(key, visitor);
            walk_expression(value, visitor);
        }
        Expr::ChanType { elem, .. } => walk_expression(elem, visitor),
        Expr::FuncType(ty) => walk_func_type(ty, visitor),
        Expr::StructType(fields) | Expr::InterfaceType(fields) => {
            walk_field_list(fields, visitor);
        }
        Expr::Ellipsis(elem) => walk_opt_expression(elem.as_deref(), visitor),
    }
}

/// A rewriting visitor. Overriding a method replaces the default descent;
/// call the matching `walk_*_mut` function to keep descending.
pub trait VisitorMut {
    fn visit_expression_mut(&mut self, expr: &mut Node<Expr>) {
        walk_expression_mut(self, expr);
    }

    fn visit_statement_mut(&mut self, stmt: &mut Node<Statement>) {
        walk_statement_mut(self, stmt);
    }

    fn visit_ident_mut(&mut self, _ident: &mut Node<Ident>) {}
}

pub fn walk_func_decl_mut<V: VisitorMut + ?Sized>(visitor: &mut V, func: &mut FuncDecl) {
    if let Some(recv) = &mut func.recv {
        walk_field_list_mut(visitor, recv.as_mut());
    }
    walk_func_type_mut(visitor, func.ty.as_mut());
    if let Some(body) = &mut func.body {
        walk_block_mut(visitor, body.as_mut());
    }
}

pub fn walk_func_type_mut<V: VisitorMut + ?Sized>(visitor: &mut V, ty: &mut FuncType) {
    walk_field_list_mut(visitor, &mut ty.params);
    if let Some(results) = &mut ty.results {
        walk_field_list_mut(visitor, results);
    }
}

pub fn walk_field_list_mut<V: VisitorMut + ?Sized>(visitor: &mut V, list: &mut FieldList) {
    for field in &mut list.fields {
        let field = field.as_mut();
        for name in &mut field.names {
            visitor.visit_ident_mut(name);
        }
        visitor.visit_expression_mut(&mut field.ty);
    }
}

pub fn walk_block_mut<V: VisitorMut + ?Sized>(visitor: &mut V, block: &mut Block) {
    for stmt in &mut block.stmts {
        visitor.visit_statement_mut(stmt);
    }
}

pub fn walk_gen_decl_mut<V: VisitorMut + ?Sized>(visitor: &mut V, decl: &mut GenDecl) {
    for spec in &mut decl.specs {
        match spec.as_mut() {
            Spec::Import(import) => {
                if let Some(name) = &mut import.name {
                    visitor.visit_ident_mut(name);
                }
            }
            Spec::Value(value) => {
                for name in &mut value.names {
                    visitor.visit_ident_mut(name);
                }
                if let Some(ty) = &mut value.ty {
                    visitor.visit_expression_mut(ty);
                }
                for expr in &mut value.values {
                    visitor.visit_expression_mut(expr);
                }
            }
            Spec::Type(type_spec) => {
                visitor.visit_ident_mut(&mut type_spec.name);
                visitor.visit_expression_mut(&mut type_spec.ty);
            }
        }
    }
}

fn walk_opt_statement_mut<V: VisitorMut + ?Sized>(
    visitor: &mut V,
    stmt: Option<&mut Box<Node<Statement>>>,
) {
    if let Some(stmt) = stmt {
        visitor.visit_statement_mut(stmt);
    }
}

fn walk_clauses_mut<V: VisitorMut + ?Sized>(visitor: &mut V, clauses: &mut [Node<CaseClause>]) {
    for clause in clauses {
        let clause = clause.as_mut();
        for expr in &mut clause.list {
            visitor.visit_expression_mut(expr);
        }
        for stmt in &mut clause.body {
            visitor.visit_statement_mut(stmt);
        }
    }
}

pub fn walk_statement_mut<V: VisitorMut + ?Sized>(visitor: &mut V, stmt: &mut Node<Statement>) {
    match stmt.as_mut() {
        Statement::Decl(decl) => walk_gen_decl_mut(visitor, decl.as_mut()),
        Statement::Labeled { label, stmt } => {
            visitor.visit_ident_mut(label);
            visitor.visit_statement_mut(stmt);
        }
        Statement::Expr(expr) | Statement::Go(expr) | Statement::Defer(expr) => {
            visitor.visit_expression_mut(expr);
        }
        Statement::Send { chan, value } => {
            visitor.visit_expression_mut(chan);
            visitor.visit_expression_mut(value);
        }
        Statement::IncDec { x, .. } => visitor.visit_expression_mut(x),
        Statement::Assign { lhs, rhs, .. } => {
            for expr in lhs.iter_mut().chain(rhs.iter_mut()) {
                visitor.visit_expression_mut(expr);
            }
        }
        Statement::Return(results) => {
            for expr in results {
                visitor.visit_expression_mut(expr);
            }
        }
        Statement::Branch { label, .. } => {
            if let Some(label) = label {
                visitor.visit_ident_mut(label);
            }
        }
        Statement::Block(block) => walk_block_mut(visitor, block.as_mut()),
        Statement::If {
            init,
            cond,
            then,
            els,
        } => {
            walk_opt_statement_mut(visitor, init.as_mut());
            visitor.visit_expression_mut(cond);
            walk_block_mut(visitor, then.as_mut());
            walk_opt_statement_mut(visitor, els.as_mut());
        }
        Statement::Switch { init, tag, body } => {
            walk_opt_statement_mut(visitor, init.as_mut());
            if let Some(tag) = tag {
                visitor.visit_expression_mut(tag);
            }
            walk_clauses_mut(visitor, body);
        }
        Statement::TypeSwitch { init, assign, body } => {
            walk_opt_statement_mut(visitor, init.as_mut());
            visitor.visit_statement_mut(assign);
            walk_clauses_mut(visitor, body);
        }
        Statement::For {
            init,
            cond,
            post,
            body,
        } => {
            walk_opt_statement_mut(visitor, init.as_mut());
            if let Some(cond) = cond {
                visitor.visit_expression_mut(cond);
            }
            walk_opt_statement_mut(visitor, post.as_mut());
            walk_block_mut(visitor, body.as_mut());
        }
        Statement::Range {
            key,
            value,
            x,
            body,
            ..
        } => {
            for expr in key.iter_mut().chain(value.iter_mut()) {
                visitor.visit_expression_mut(expr);
            }
            visitor.visit_expression_mut(x);
            walk_block_mut(visitor, body.as_mut());
        }
        Statement::Empty => {}
    }
}

fn walk_opt_expression_mut<V: VisitorMut + ?Sized>(
    visitor: &mut V,
    expr: Option<&mut Box<Node<Expr>>>,
) {
    if let Some(expr) = expr {
        visitor.visit_expression_mut(expr);
    }
}

pub fn walk_expression_mut<V: VisitorMut + ?Sized>(visitor: &mut V, expr: &mut Node<Expr>) {
    match expr.as_mut() {
        Expr::Ident(_) | Expr::BasicLit { .. } => {}
        Expr::CompositeLit { ty, elts } => {
            walk_opt_expression_mut(visitor, ty.as_mut());
            for elt in elts {
                visitor.visit_expression_mut(elt);
            }
        }
        Expr::FuncLit { ty, body } => {
            walk_func_type_mut(visitor, ty.as_mut());
            walk_block_mut(visitor, body.as_mut());
        }
        Expr::Paren(x) | Expr::Star(x) | Expr::Unary { x, .. } => visitor.visit_expression_mut(x),
        Expr::Selector { x, .. } => visitor.visit_expression_mut(x),
        Expr::Index { x, index } => {
            visitor.visit_expression_mut(x);
            visitor.visit_expression_mut(index);
        }
        Expr::Slice { x, low, high, max } => {
            visitor.visit_expression_mut(x);
            walk_opt_expression_mut(visitor, low.as_mut());
            walk_opt_expression_mut(visitor, high.as_mut());
            walk_opt_expression_mut(visitor, max.as_mut());
        }
        Expr::TypeAssert { x, ty } => {
            visitor.visit_expression_mut(x);
            walk_opt_expression_mut(visitor, ty.as_mut());
        }
        Expr::Call { fun, args, .. } => {
            visitor.visit_expression_mut(fun);
            for arg in args {
                visitor.visit_expression_mut(arg);
            }
        }
        Expr::Binary { x, y, .. } => {
            visitor.visit_expression_mut(x);
            visitor.visit_expression_mut(y);
        }
        Expr::KeyValue { key, value } => {
            visitor.visit_expression_mut(key);
            visitor.visit_expression_mut(value);
        }
        Expr::ArrayType { len, elem } => {
            walk_opt_expression_mut(visitor, len.as_mut());
            visitor.visit_expression_mut(elem);
        }
        Expr::MapType { key, value } => {
            visitor.visit_expression_mut(key);
            visitor.visit_expression_mut(value);
        }
        Expr::ChanType { elem, .. } => visitor.visit_expression_mut(elem),
        Expr::FuncType(ty) => walk_func_type_mut(visitor, ty),
        Expr::StructType(fields) | Expr::InterfaceType(fields) => {
            walk_field_list_mut(visitor, fields);
        }
        Expr::Ellipsis(elem) => walk_opt_expression_mut(visitor, elem.as_mut()),
    }
}

#[cfg(test)]
mod tests {
    use gofix_span::Span;

    use super::*;

    struct Counter {
        exprs: usize,
        idents: Vec<String>,
    }

    impl Visitor for Counter {
        fn visit_expression(&mut self, _expr: &Node<Expr>) {
            self.exprs += 1;
        }

        fn visit_ident(&mut self, ident: &Node<Ident>) {
            self.idents.push(ident.as_ref().name.clone());
        }
    }

    struct Renamer;

    impl VisitorMut for Renamer {
        fn visit_expression_mut(&mut self, expr: &mut Node<Expr>) {
            if let Expr::Ident(ident) = expr.as_mut() {
                ident.name.make_ascii_uppercase();
                return;
            }
            walk_expression_mut(self, expr);
        }
    }

    fn sample() -> Node<Statement> {
        Node::new(
            Statement::Assign {
                lhs: vec![Expr::ident("x")],
                op: AssignOp::Define,
                rhs: vec![Expr::call(
                    Expr::selector(Expr::ident("fmt"), "Sprint"),
                    vec![Expr::ident("y")],
                )],
            },
            Span::new(0, 20),
        )
    }

    #[test]
    fn test_visitor_counts_expressions() {
        let mut counter = Counter {
            exprs: 0,
            idents: Vec::new(),
        };
        walk_statement(&sample(), &mut counter);
        // x, call, selector, fmt, y
        assert_eq!(counter.exprs, 5);
        assert!(counter.idents.is_empty());
    }

    #[test]
    fn test_visitor_mut_skips_selector_names() {
        let mut stmt = sample();
        Renamer.visit_statement_mut(&mut stmt);
        let Statement::Assign { lhs, rhs, .. } = stmt.as_ref() else {
            panic!("expected assignment");
        };
        assert!(lhs[0].as_ref().is_ident("X"));
        let Expr::Call { fun, args, .. } = rhs[0].as_ref() else {
            panic!("expected call");
        };
        let Expr::Selector { x, sel } = fun.as_ref().as_ref() else {
            panic!("expected selector");
        };
        assert!(x.as_ref().as_ref().is_ident("FMT"));
        assert_eq!(sel.as_ref().name, "Sprint");
        assert!(args[0].as_ref().is_ident("Y"));
    }
}

//! gofmt-style printing of syntax fragments.
//!
//! Only rewritten fragments are printed; whole files are never reformatted.
//! Parentheses are inserted wherever operator precedence demands them, so a
//! tree built by substitution prints as valid, equivalent source.

use core::fmt::Write as _;

use crate::nodes::*;

/// Precedence of unary expressions; binary operators use 1..=5.
pub const UNARY_PREC: u8 = 6;
/// Precedence of primary expressions (operands, selectors, calls, ...).
pub const PRIMARY_PREC: u8 = 7;

/// The binding strength of an expression when it appears as an operand.
pub fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Unary { .. } | Expr::Star(_) => UNARY_PREC,
        // `func(...)(x)` and `chan T(x)` need parentheses when used as operands.
        Expr::FuncType(_) | Expr::ChanType { .. } => UNARY_PREC,
        Expr::KeyValue { .. } => 0,
        _ => PRIMARY_PREC,
    }
}

pub fn expr_to_string(expr: &Node<Expr>) -> String {
    let mut printer = Printer::new("");
    printer.expr(expr, 0);
    printer.finish()
}

/// Prints a statement; continuation lines start with `base` followed by
/// one tab per nesting level.
pub fn stmt_to_string(stmt: &Node<Statement>, base: &str) -> String {
    let mut printer = Printer::new(base);
    printer.stmt(stmt);
    printer.finish()
}

/// Prints a statement list, one statement per line, every line after the
/// first prefixed with `base`.
pub fn stmts_to_string(stmts: &[Node<Statement>], base: &str) -> String {
    let mut printer = Printer::new(base);
    for (idx, stmt) in stmts.iter().enumerate() {
        if idx > 0 {
            printer.newline();
        }
        printer.stmt(stmt);
    }
    printer.finish()
}

pub fn func_decl_to_string(func: &FuncDecl) -> String {
    let mut printer = Printer::new("");
    printer.func_decl(func);
    printer.finish()
}

pub fn gen_decl_to_string(decl: &GenDecl, base: &str) -> String {
    let mut printer = Printer::new(base);
    printer.gen_decl(decl);
    printer.finish()
}

pub fn field_list_to_string(list: &FieldList) -> String {
    let mut printer = Printer::new("");
    printer.fields(list, ", ");
    printer.finish()
}

struct Printer {
    out: String,
    base: String,
    indent: usize,
}

impl Printer {
    fn new(base: &str) -> Self {
        Self {
            out: String::new(),
            base: base.to_string(),
            indent: 0,
        }
    }

    fn finish(self) -> String {
        self.out
    }

    fn word(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        self.out.push_str(&self.base);
        for _ in 0..self.indent {
            self.out.push('\t');
        }
    }

    fn expr(&mut self, expr: &Node<Expr>, min_prec: u8) {
        let needs_parens = precedence(expr.as_ref()) < min_prec;
        if needs_parens {
            self.word("(");
        }
        self.expr_inner(expr);
        if needs_parens {
            self.word(")");
        }
    }

    fn exprs(&mut self, exprs: &[Node<Expr>]) {
        for (idx, expr) in exprs.iter().enumerate() {
            if idx > 0 {
                self.word(", ");
            }
            self.expr(expr, 0);
        }
    }

    fn expr_inner(&mut self, expr: &Node<Expr>) {
        match expr.as_ref() {
            Expr::Ident(ident) => self.word(&ident.name),
            Expr::BasicLit { value, .. } => self.word(value),
            Expr::CompositeLit { ty, elts } => {
                if let Some(ty) = ty {
                    self.expr(ty, PRIMARY_PREC);
                }
                self.word("{");
                self.exprs(elts);
                self.word("}");
            }
            Expr::FuncLit { ty, body } => {
                self.word("func");
                self.signature(ty.as_ref());
                self.word(" ");
                self.block(body.as_ref());
            }
            Expr::Paren(x) => {
                self.word("(");
                self.expr(x, 0);
                self.word(")");
            }
            Expr::Selector { x, sel } => {
                self.expr(x, PRIMARY_PREC);
                self.word(".");
                self.word(&sel.as_ref().name);
            }
            Expr::Index { x, index } => {
                self.expr(x, PRIMARY_PREC);
                self.word("[");
                self.expr(index, 0);
                self.word("]");
            }
            Expr::Slice { x, low, high, max } => {
                self.expr(x, PRIMARY_PREC);
                self.word("[");
                if let Some(low) = low {
                    self.expr(low, 0);
                }
                self.word(":");
                if let Some(high) = high {
                    self.expr(high, 0);
                }
                if let Some(max) = max {
                    self.word(":");
                    self.expr(max, 0);
                }
                self.word("]");
            }
            Expr::TypeAssert { x, ty } => {
                self.expr(x, PRIMARY_PREC);
                self.word(".(");
                match ty {
                    Some(ty) => self.expr(ty, 0),
                    None => self.word("type"),
                }
                self.word(")");
            }
            Expr::Call {
                fun,
                args,
                ellipsis,
            } => {
                self.expr(fun, PRIMARY_PREC);
                self.word("(");
                self.exprs(args);
                if *ellipsis {
                    self.word("...");
                }
                self.word(")");
            }
            Expr::Star(x) => {
                self.word("*");
                self.expr(x, UNARY_PREC);
            }
            Expr::Unary { op, x } => {
                let op = op.as_str();
                self.word(op);
                // `- -x` must not print as `--x`, nor `& &x` as `&&x`.
                let operand = expr_to_string(x);
                let clashes = matches!(op, "-" | "+" | "&") && operand.starts_with(op);
                if clashes || precedence(x.as_ref().as_ref()) < UNARY_PREC {
                    self.word("(");
                    self.expr(x, 0);
                    self.word(")");
                } else {
                    self.expr(x, UNARY_PREC);
                }
            }
            Expr::Binary { op, x, y } => {
                let prec = op.precedence();
                self.expr(x, prec);
                let _ = write!(self.out, " {} ", op.as_str());
                self.expr(y, prec + 1);
            }
            Expr::KeyValue { key, value } => {
                self.expr(key, 0);
                self.word(": ");
                self.expr(value, 0);
            }
            Expr::ArrayType { len, elem } => {
                self.word("[");
                if let Some(len) = len {
                    self.expr(len, 0);
                }
                self.word("]");
                self.expr(elem, 0);
            }
            Expr::MapType { key, value } => {
                self.word("map[");
                self.expr(key, 0);
                self.word("]");
                self.expr(value, 0);
            }
            Expr::ChanType { dir, elem } => {
                self.word(match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                });
                self.expr(elem, 0);
            }
            Expr::FuncType(ty) => {
                self.word("func");
                self.signature(ty);
            }
            Expr::StructType(fields) => {
                if fields.fields.is_empty() {
                    self.word("struct{}");
                } else {
                    self.word("struct{ ");
                    self.fields(fields, "; ");
                    self.word(" }");
                }
            }
            Expr::InterfaceType(methods) => {
                if methods.fields.is_empty() {
                    self.word("interface{}");
                } else {
                    self.word("interface{ ");
                    self.interface_methods(methods);
                    self.word(" }");
                }
            }
            Expr::Ellipsis(elem) => {
                self.word("...");
                if let Some(elem) = elem {
                    self.expr(elem, 0);
                }
            }
        }
    }

    fn interface_methods(&mut self, methods: &FieldList) {
        for (idx, field) in methods.fields.iter().enumerate() {
            if idx > 0 {
                self.word("; ");
            }
            let field = field.as_ref();
            match (field.names.first(), field.ty.as_ref()) {
                (Some(name), Expr::FuncType(sig)) => {
                    self.word(&name.as_ref().name);
                    self.signature(sig);
                }
                _ => self.expr(&field.ty, 0),
            }
        }
    }

    fn fields(&mut self, list: &FieldList, separator: &str) {
        for (idx, field) in list.fields.iter().enumerate() {
            if idx > 0 {
                self.word(separator);
            }
            let field = field.as_ref();
            for (n, name) in field.names.iter().enumerate() {
                if n > 0 {
                    self.word(", ");
                }
                self.word(&name.as_ref().name);
            }
            if !field.names.is_empty() {
                self.word(" ");
            }
            self.expr(&field.ty, 0);
            if let Some(tag) = &field.tag {
                self.word(" ");
                self.word(tag);
            }
        }
    }

    fn signature(&mut self, ty: &FuncType) {
        self.word("(");
        self.fields(&ty.params, ", ");
        self.word(")");
        if let Some(results) = &ty.results {
            match results.fields.as_slice() {
                [] => {}
                [single] if single.as_ref().names.is_empty() => {
                    self.word(" ");
                    self.expr(&single.as_ref().ty, 0);
                }
                _ => {
                    self.word(" (");
                    self.fields(results, ", ");
                    self.word(")");
                }
            }
        }
    }

    fn block(&mut self, block: &Block) {
        if block.stmts.is_empty() {
            self.word("{}");
            return;
        }
        self.word("{");
        self.indent += 1;
        self.stmt_list(&block.stmts);
        self.indent -= 1;
        self.newline();
        self.word("}");
    }

    fn stmt_list(&mut self, stmts: &[Node<Statement>]) {
        for stmt in stmts {
            if matches!(stmt.as_ref(), Statement::Empty) {
                continue;
            }
            self.newline();
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Node<Statement>) {
        match stmt.as_ref() {
            Statement::Decl(decl) => self.gen_decl(decl.as_ref()),
            Statement::Labeled { label, stmt } => {
                self.word(&label.as_ref().name);
                self.word(":");
                self.newline();
                self.stmt(stmt);
            }
            Statement::Expr(expr) => self.expr(expr, 0),
            Statement::Send { chan, value } => {
                self.expr(chan, 0);
                self.word(" <- ");
                self.expr(value, 0);
            }
            Statement::IncDec { x, inc } => {
                self.expr(x, 0);
                self.word(if *inc { "++" } else { "--" });
            }
            Statement::Assign { lhs, op, rhs } => {
                self.exprs(lhs);
                self.word(" ");
                self.word(op.as_str());
                self.word(" ");
                self.exprs(rhs);
            }
            Statement::Go(call) => {
                self.word("go ");
                self.expr(call, 0);
            }
            Statement::Defer(call) => {
                self.word("defer ");
                self.expr(call, 0);
            }
            Statement::Return(results) => {
                self.word("return");
                if !results.is_empty() {
                    self.word(" ");
                    self.exprs(results);
                }
            }
            Statement::Branch { kind, label } => {
                self.word(kind.as_str());
                if let Some(label) = label {
                    self.word(" ");
                    self.word(&label.as_ref().name);
                }
            }
            Statement::Block(block) => self.block(block.as_ref()),
            Statement::If {
                init,
                cond,
                then,
                els,
            } => {
                self.word("if ");
                if let Some(init) = init {
                    self.stmt(init);
                    self.word("; ");
                }
                self.expr(cond, 0);
                self.word(" ");
                self.block(then.as_ref());
                if let Some(els) = els {
                    self.word(" else ");
                    self.stmt(els);
                }
            }
            Statement::Switch { init, tag, body } => {
                self.word("switch ");
                if let Some(init) = init {
                    self.stmt(init);
                    self.word("; ");
                }
                if let Some(tag) = tag {
                    self.expr(tag, 0);
                    self.word(" ");
                }
                self.clauses(body);
            }
            Statement::TypeSwitch { init, assign, body } => {
                self.word("switch ");
                if let Some(init) = init {
                    self.stmt(init);
                    self.word("; ");
                }
                self.stmt(assign);
                self.word(" ");
                self.clauses(body);
            }
            Statement::For {
                init,
                cond,
                post,
                body,
            } => {
                self.word("for ");
                if init.is_some() || post.is_some() {
                    if let Some(init) = init {
                        self.stmt(init);
                    }
                    self.word("; ");
                    if let Some(cond) = cond {
                        self.expr(cond, 0);
                    }
                    self.word("; ");
                    if let Some(post) = post {
                        self.stmt(post);
                    }
                    self.word(" ");
                } else if let Some(cond) = cond {
                    self.expr(cond, 0);
                    self.word(" ");
                }
                self.block(body.as_ref());
            }
            Statement::Range {
                key,
                value,
                define,
                x,
                body,
            } => {
                self.word("for ");
                if let Some(key) = key {
                    self.expr(key, 0);
                    if let Some(value) = value {
                        self.word(", ");
                        self.expr(value, 0);
                    }
                    self.word(if *define { " := " } else { " = " });
                }
                self.word("range ");
                self.expr(x, 0);
                self.word(" ");
                self.block(body.as_ref());
            }
            Statement::Empty => {}
        }
    }

    fn clauses(&mut self, clauses: &[Node<CaseClause>]) {
        self.word("{");
        for clause in clauses {
            let clause = clause.as_ref();
            self.newline();
            if clause.is_default {
                self.word("default:");
            } else {
                self.word("case ");
                self.exprs(&clause.list);
                self.word(":");
            }
            self.indent += 1;
            self.stmt_list(&clause.body);
            self.indent -= 1;
        }
        self.newline();
        self.word("}");
    }

    fn gen_decl(&mut self, decl: &GenDecl) {
        self.word(decl.kind.as_str());
        self.word(" ");
        let grouped = decl.lparen.is_some() || decl.specs.len() != 1;
        if !grouped {
            if let Some(spec) = decl.specs.first() {
                self.spec(spec.as_ref());
            }
            return;
        }
        self.word("(");
        self.indent += 1;
        for spec in &decl.specs {
            self.newline();
            self.spec(spec.as_ref());
        }
        self.indent -= 1;
        self.newline();
        self.word(")");
    }

    fn spec(&mut self, spec: &Spec) {
        match spec {
            Spec::Import(import) => {
                if let Some(name) = &import.name {
                    self.word(&name.as_ref().name);
                    self.word(" ");
                }
                let _ = write!(self.out, "{:?}", import.path.as_ref());
            }
            Spec::Value(value) => {
                for (idx, name) in value.names.iter().enumerate() {
                    if idx > 0 {
                        self.word(", ");
                    }
                    self.word(&name.as_ref().name);
                }
                if let Some(ty) = &value.ty {
                    self.word(" ");
                    self.expr(ty, 0);
                }
                if !value.values.is_empty() {
                    self.word(" = ");
                    self.exprs(&value.values);
                }
            }
            Spec::Type(type_spec) => {
                self.word(&type_spec.name.as_ref().name);
                self.word(if type_spec.assign { " = " } else { " " });
                self.expr(&type_spec.ty, 0);
            }
        }
    }

    fn func_decl(&mut self, func: &FuncDecl) {
        self.word("func ");
        if let Some(recv) = &func.recv {
            self.word("(");
            self.fields(recv.as_ref(), ", ");
            self.word(") ");
        }
        self.word(&func.name.as_ref().name);
        self.signature(func.ty.as_ref());
        if let Some(body) = &func.body {
            self.word(" ");
            self.block(body.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(value: &str) -> Node<Expr> {
        Node::synthetic(Expr::BasicLit {
            kind: LitKind::Int,
            value: value.to_string(),
        })
    }

    fn binary(op: BinaryOp, x: Node<Expr>, y: Node<Expr>) -> Node<Expr> {
        Node::synthetic(Expr::Binary {
            op,
            x: Box::new(x),
            y: Box::new(y),
        })
    }

    #[test]
    fn test_binary_precedence_parens() {
        let sum = binary(BinaryOp::Add, lit("1"), lit("2"));
        let product = binary(BinaryOp::Mul, sum.clone(), lit("3"));
        assert_eq!(expr_to_string(&product), "(1 + 2) * 3");
        let right = binary(BinaryOp::Sub, lit("1"), sum);
        assert_eq!(expr_to_string(&right), "1 - (1 + 2)");
    }

    #[test]
    fn test_unary_operand_parens() {
        let sum = binary(BinaryOp::Add, lit("2"), lit("2"));
        assert_eq!(
            expr_to_string(&Expr::unary(UnaryOp::Neg, sum)),
            "-(2 + 2)"
        );
        let neg = Expr::unary(UnaryOp::Neg, lit("1"));
        assert_eq!(
            expr_to_string(&Expr::unary(UnaryOp::Neg, neg)),
            "-(-1)"
        );
    }

    #[test]
    fn test_selector_of_deref() {
        let deref = Node::synthetic(Expr::Star(Box::new(Expr::ident("p"))));
        assert_eq!(expr_to_string(&Expr::selector(deref, "f")), "(*p).f");
    }

    #[test]
    fn test_block_indentation() {
        let inner = Statement::expr(Expr::call(Expr::ident("println"), vec![Expr::ident("x")]));
        let block = Statement::block(vec![inner]);
        assert_eq!(stmt_to_string(&block, "\t"), "{\n\t\tprintln(x)\n\t}");
    }
}

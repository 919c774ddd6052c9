//! Parser for the Go subset handled by gofix.
//!
//! Source text is tokenized by `gofix_lexer` (with automatic semicolon
//! insertion) and parsed with a chumsky grammar into the `gofix_ast` tree.
//! Generic declarations and `select` statements are rejected.

mod doc;
pub mod error;
mod grammar;

use chumsky::Parser as _;
use chumsky::Stream;
use gofix_ast::{Expr, File, FuncDecl, Node};
use gofix_lexer::{Lexed, tokenize};

pub use error::ParserError;
use grammar::{Boxed, Grammar};

pub type ParseResult<T> = Result<T, Vec<ParserError>>;

/// Parses a complete Go source file, attaching doc comments.
pub fn parse_file(source: &str) -> ParseResult<File> {
    let lexed = lex(source)?;
    let grammar = Grammar::new(source);
    let mut file = run(grammar.file(), source, &lexed)?;
    doc::attach(&mut file, source, &lexed.comments);
    Ok(file)
}

/// Parses the text of a single function declaration (`func ... { ... }`).
///
/// Spans are relative to `source`.
pub fn parse_func_decl(source: &str) -> ParseResult<Node<FuncDecl>> {
    let lexed = lex(source)?;
    let grammar = Grammar::new(source);
    run(grammar.standalone_func(), source, &lexed)
}

/// Parses a single expression.
pub fn parse_expr(source: &str) -> ParseResult<Node<Expr>> {
    let lexed = lex(source)?;
    let grammar = Grammar::new(source);
    run(grammar.standalone_expr(), source, &lexed)
}

fn lex(source: &str) -> ParseResult<Lexed> {
    tokenize(source).map_err(|err| vec![ParserError::from(err)])
}

fn run<O>(parser: Boxed<'_, O>, source: &str, lexed: &Lexed) -> ParseResult<O> {
    let eoi = source.len()..source.len();
    parser
        .parse(Stream::from_iter(eoi, lexed.stream().into_iter()))
        .map_err(|errors| errors.into_iter().map(ParserError::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gofix_ast::printer::{expr_to_string, stmt_to_string};
    use gofix_ast::{AssignOp, BinaryOp, Decl, DeclKind, Expr, Spec, Statement};

    fn func_body(file: &File, name: &str) -> Vec<Node<Statement>> {
        file.funcs()
            .find(|(_, func)| func.name.as_ref().name == name)
            .and_then(|(_, func)| func.body.clone())
            .map(|body| body.into_inner().stmts)
            .unwrap_or_default()
    }

    #[test]
    fn test_parse_package_with_declarations() {
        let source = r#"package demo

import (
	"fmt"
	str "strings"
)

const Pi = 3.14

var (
	x, y int
	z    = "z"
)

type Point struct {
	X, Y int
	name string `json:"name"`
	*Base
}

type Alias = Point

func (p *Point) Move(dx int) {
	p.X += dx
}

func main() {
	fmt.Println(str.ToUpper("hi"), Pi)
}
"#;
        let file = parse_file(source).expect("parse");
        assert_eq!(file.package.as_ref().name, "demo");
        assert_eq!(file.decls.len(), 7);

        let imports: Vec<_> = file
            .imports()
            .map(|(_, spec)| spec.path.as_ref().clone())
            .collect();
        assert_eq!(imports, vec!["fmt".to_string(), "strings".to_string()]);

        let method = file
            .funcs()
            .find(|(_, func)| func.name.as_ref().name == "Move")
            .map(|(_, func)| func.is_method());
        assert_eq!(method, Some(true));

        let alias = file.decls.iter().find_map(|decl| match decl.as_ref() {
            Decl::Gen(gen_decl) if gen_decl.kind == DeclKind::Type => {
                gen_decl.specs.iter().find_map(|spec| match spec.as_ref() {
                    Spec::Type(ty) if ty.assign => Some(ty.name.as_ref().name.clone()),
                    _ => None,
                })
            }
            _ => None,
        });
        assert_eq!(alias.as_deref(), Some("Alias"));
    }

    #[test]
    fn test_parameter_grouping() {
        let func = parse_func_decl("func f(a, b int, c ...string) (n int, err error) {}")
            .expect("parse")
            .into_inner();
        let ty = func.ty.as_ref();
        assert_eq!(ty.params.fields.len(), 2);
        assert_eq!(ty.params.arity(), 3);
        assert!(ty.is_variadic());
        assert_eq!(ty.result_count(), 2);

        let unnamed = parse_func_decl("func g(int, string) error { return nil }")
            .expect("parse")
            .into_inner();
        assert!(!unnamed.ty.as_ref().params.is_named());
        assert_eq!(unnamed.ty.as_ref().result_count(), 1);
    }

    #[test]
    fn test_header_expressions_do_not_take_composite_literals() {
        let source = "package p\n\nfunc f(x, y T) {\n\tif x == y {\n\t\treturn\n\t}\n\tfor _, v := range []int{1, 2} {\n\t\t_ = v\n\t}\n}\n";
        let file = parse_file(source).expect("parse");
        let body = func_body(&file, "f");
        assert_eq!(body.len(), 2);
        match body[0].as_ref() {
            Statement::If { cond, .. } => assert_eq!(expr_to_string(cond), "x == y"),
            other => panic!("expected if, got {other:?}"),
        }
        match body[1].as_ref() {
            Statement::Range { x, define, .. } => {
                assert!(define);
                assert_eq!(expr_to_string(x), "[]int{1, 2}");
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn test_statement_forms() {
        let source = r#"package p

func f(ch chan int, m map[string]int) (r int) {
	v, ok := m["k"]
	ch <- v
	r++
	defer g()
	go func() { r = 1 }()
	switch t := x.(type) {
	case int, string:
		return 1
	default:
	}
	switch {
	case ok:
		fallthrough
	case !ok:
	}
loop:
	for i := 0; i < 10; i++ {
		if i > 5 {
			break loop
		} else if i == 2 {
			continue
		} else {
			r += i
		}
	}
	return r
}
"#;
        let file = parse_file(source).expect("parse");
        let body = func_body(&file, "f");
        assert_eq!(body.len(), 9);
        assert!(matches!(
            body[0].as_ref(),
            Statement::Assign {
                op: AssignOp::Define,
                ..
            }
        ));
        assert!(matches!(body[1].as_ref(), Statement::Send { .. }));
        assert!(matches!(body[2].as_ref(), Statement::IncDec { inc: true, .. }));
        assert!(matches!(body[3].as_ref(), Statement::Defer(_)));
        assert!(matches!(body[4].as_ref(), Statement::Go(_)));
        assert!(matches!(body[5].as_ref(), Statement::TypeSwitch { .. }));
        assert!(matches!(body[6].as_ref(), Statement::Switch { tag: None, .. }));
        assert!(matches!(body[7].as_ref(), Statement::Labeled { .. }));
        assert!(matches!(body[8].as_ref(), Statement::Return(values) if values.len() == 1));
    }

    #[test]
    fn test_binary_precedence() {
        let expr = parse_expr("a + b*c == d || !e").expect("parse");
        match expr.as_ref() {
            Expr::Binary { op, x, .. } => {
                assert_eq!(*op, BinaryOp::LOr);
                assert_eq!(expr_to_string(x), "a + b * c == d");
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn test_composite_and_func_literals() {
        let expr = parse_expr("T{A: 1, B: []int{2}, C: {3}}").expect("parse");
        assert!(matches!(expr.as_ref(), Expr::CompositeLit { elts, .. } if elts.len() == 3));

        let expr = parse_expr("func(x int) int { return x * 2 }(21)").expect("parse");
        assert!(matches!(expr.as_ref(), Expr::Call { .. }));
    }

    #[test]
    fn test_doc_comments_attach_to_declarations() {
        let source = r#"// Package p does things.
package p

// Old is deprecated.
//
//go:fix inline
func Old() { New() }

var x = 1 // trailing
func New() {}

const (
	// A is a constant.
	//go:fix inline
	A = B
	B = 1
)
"#;
        let file = parse_file(source).expect("parse");
        assert!(file.doc.is_some());
        let old = file
            .funcs()
            .find(|(_, func)| func.name.as_ref().name == "Old")
            .and_then(|(_, func)| func.doc.clone())
            .expect("doc");
        assert_eq!(old.list.len(), 3);
        assert!(old.text().contains("go:fix inline"));

        let new_doc = file
            .funcs()
            .find(|(_, func)| func.name.as_ref().name == "New")
            .and_then(|(_, func)| func.doc.clone());
        assert!(new_doc.is_none());

        let spec_docs: Vec<bool> = file
            .decls
            .iter()
            .filter_map(|decl| match decl.as_ref() {
                Decl::Gen(gen_decl) if gen_decl.kind == DeclKind::Const => Some(gen_decl),
                _ => None,
            })
            .flat_map(|decl| decl.specs.iter().map(|spec| spec.as_ref().doc().is_some()))
            .collect();
        assert_eq!(spec_docs, vec![true, false]);
    }

    #[test]
    fn test_blank_line_splits_comment_groups() {
        let source = "package p\n\n// unrelated\n\n// F does things.\n// More.\nfunc F() {}\n";
        let file = parse_file(source).expect("parse");
        assert_eq!(file.comments.len(), 2);
        let doc = file
            .funcs()
            .find_map(|(_, func)| func.doc.clone())
            .expect("doc");
        assert_eq!(doc.list.len(), 2);
        assert!(!doc.text().contains("unrelated"));
    }

    #[test]
    fn test_statement_printer_round_trip() {
        let func = parse_func_decl("func f() {\n\tif v := g(); v > 0 {\n\t\th(v)\n\t}\n}")
            .expect("parse")
            .into_inner();
        let body = func.body.expect("body").into_inner();
        let printed = stmt_to_string(&body.stmts[0], "");
        assert_eq!(printed, "if v := g(); v > 0 {\n\th(v)\n}");
    }

    #[test]
    fn test_rejects_unsupported_syntax() {
        let errors = parse_file("package p\n\nfunc f() {\n\tselect {}\n}\n").unwrap_err();
        assert!(!errors.is_empty());
        let errors = parse_file("package p\n\nfunc f(x int {\n}\n").unwrap_err();
        assert!(errors[0].to_diagnostic("a.go").message.contains("unexpected"));
    }
}

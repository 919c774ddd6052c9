//! Name resolution and type checking for Go packages.
//!
//! A [`Program`] owns the parsed files of every loaded package together with
//! the object, scope and type tables produced by checking them. Packages are
//! checked in import order; imports of packages outside the program resolve
//! to opaque external objects.

mod checker;
pub mod diagnostics;
pub mod error;
pub mod lookup;
pub mod objects;
pub mod program;
pub mod scope;
pub mod types;
mod universe;

pub use diagnostics::from_check_errors as diagnostics_from_check_errors;
pub use error::CheckError;
pub use lookup::{FieldOrMethod, has_pointer_receiver, lookup_field_or_method, underlying};
pub use objects::{
    Builtin, Object, ObjectId, ObjectKind, Objects, PackageId, RecvInfo, ScopeId, VarKind,
};
pub use program::{
    Mode, Package, Program, Selection, SelectionKind, SourceFile, TypeAndValue, TypeInfo,
    can_import, default_package_name,
};
pub use scope::{Scope, ScopeKind, Scopes};
pub use types::{BasicKind, Qualifier, Signature, Type, full_qualifier, identical, type_string};
pub use universe::Universe;

#[cfg(test)]
mod tests {
    use super::*;

    fn load(packages: &[(&str, &[(&str, &str)])]) -> Program {
        let mut program = Program::new();
        for (path, files) in packages {
            let sources = files
                .iter()
                .map(|(name, text)| (name.to_string(), text.to_string()))
                .collect();
            program.add_package(*path, *path, sources);
        }
        program.check();
        program
    }

    fn offset(text: &str, needle: &str) -> u32 {
        text.find(needle).expect("needle present") as u32
    }

    const LIB: &str = r#"package lib

type Base struct {
	N int
}

func (b *Base) Get() int { return b.N }

type T struct {
	*Base
	X int
}

const (
	A = iota
	B
)

const C = A

func F(x int) int { return x + 1 }
"#;

    const MAIN: &str = r#"package main

import "example.com/lib"

func main() {
	v := &lib.T{Base: &lib.Base{}}
	_ = lib.F(1) + v.Get() + v.N
}
"#;

    #[test]
    fn test_check_two_packages() {
        let program = load(&[
            ("example.com/main", &[("main.go", MAIN)]),
            ("example.com/lib", &[("lib.go", LIB)]),
        ]);
        assert!(program.errors().is_empty(), "{:?}", program.errors());

        let main = program.file_by_path("main.go").expect("main.go");
        let f = program
            .object_at(main.id, offset(MAIN, "F(1)"))
            .expect("use of F");
        let f = program.object(f);
        assert_eq!(f.name, "F");
        assert_eq!(f.pkg_path.as_deref(), Some("example.com/lib"));
        assert_eq!(
            program.type_string(&f.ty, &full_qualifier),
            "func(int) int"
        );

        let field = program
            .info
            .selections
            .values()
            .find(|sel| program.object(sel.obj).name == "N" && sel.index.len() == 2)
            .expect("promoted field selection");
        assert_eq!(field.kind, SelectionKind::FieldVal);
        assert_eq!(field.index, vec![0, 0]);
        assert!(field.indirect);

        let method = program
            .info
            .selections
            .values()
            .find(|sel| program.object(sel.obj).name == "Get")
            .expect("method selection");
        assert_eq!(method.kind, SelectionKind::MethodVal);
        assert!(has_pointer_receiver(&program.objects, method.obj));
    }

    #[test]
    fn test_iota_constants() {
        let program = load(&[("example.com/lib", &[("lib.go", LIB)])]);
        let lib = program.file_by_path("lib.go").expect("lib.go");
        let is_iota = |needle: &str| {
            let id = program
                .object_at(lib.id, offset(LIB, needle))
                .expect("const declaration");
            matches!(
                program.object(id).kind,
                ObjectKind::Const { is_iota: true }
            )
        };
        assert!(is_iota("A = iota"));
        assert!(is_iota("B\n"));
        assert!(!is_iota("C = A"));
    }

    #[test]
    fn test_local_visibility() {
        let source = r#"package p

func f() {
	x := 1
	{
		y := x
		_ = y
	}
	x = 2
}
"#;
        let program = load(&[("example.com/p", &[("p.go", source)])]);
        assert!(program.errors().is_empty(), "{:?}", program.errors());
        let file = program.file_by_path("p.go").expect("p.go");

        // Not yet in scope within its own declaration.
        assert!(program.lookup_at(file.id, offset(source, "1\n"), "x").is_none());

        let (scope, x) = program
            .lookup_at(file.id, offset(source, "x\n\t\t_"), "x")
            .expect("x visible in nested block");
        assert_eq!(program.scope_kind(scope), ScopeKind::Func);
        assert_eq!(program.object(x).kind, ObjectKind::Var(VarKind::Local));
        assert!(program.lookup_at(file.id, offset(source, "x = 2"), "y").is_none());
    }

    #[test]
    fn test_composite_literal_keys_resolve_to_fields() {
        let source = "package p\n\ntype T struct {\n\tX int\n\tY string\n}\n\nvar v = T{Y: \"s\", X: 1}\n";
        let program = load(&[("example.com/p", &[("p.go", source)])]);
        assert!(program.errors().is_empty(), "{:?}", program.errors());
        let file = program.file_by_path("p.go").expect("p.go");

        let x = program
            .object_at(file.id, offset(source, "X: 1"))
            .expect("key X resolves");
        assert_eq!(program.object(x).name, "X");
        assert!(matches!(
            program.object(x).kind,
            ObjectKind::Var(VarKind::Field { .. })
        ));
        let y = program
            .object_at(file.id, offset(source, "Y: "))
            .expect("key Y resolves");
        assert_eq!(program.type_string(&program.object(y).ty, &full_qualifier), "string");
    }

    #[test]
    fn test_undefined_names_are_reported() {
        let source = "package p\n\nfunc f() int { return g() }\n";
        let program = load(&[("example.com/p", &[("p.go", source)])]);
        assert!(
            program
                .errors()
                .iter()
                .any(|err| matches!(err, CheckError::Undefined { name, .. } if name == "g"))
        );
        let diagnostics = diagnostics_from_check_errors(&program, program.errors());
        assert_eq!(diagnostics[0].source_id, "p.go");
    }

    #[test]
    fn test_import_cycle_and_levels() {
        let a = "package a\n\nimport \"example.com/b\"\n\nvar X = b.Y\n";
        let b = "package b\n\nimport \"example.com/a\"\n\nvar Y = a.X\n";
        let c = "package c\n\nfunc Z() {}\n";
        let mut program = Program::new();
        for (path, text) in [("example.com/a", a), ("example.com/b", b), ("example.com/c", c)] {
            program.add_package(path, path, vec![(format!("{path}.go"), text.to_string())]);
        }
        let levels = program.dependency_levels();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].len(), 1);
        assert_eq!(levels[1].len(), 2);
        assert!(
            program
                .errors()
                .iter()
                .any(|err| matches!(err, CheckError::ImportCycle { .. }))
        );
    }

    #[test]
    fn test_external_packages_are_opaque() {
        let source = "package p\n\nimport \"fmt\"\n\nfunc f() { fmt.Println(1) }\n";
        let program = load(&[("example.com/p", &[("p.go", source)])]);
        assert!(program.errors().is_empty(), "{:?}", program.errors());
        let file = program.file_by_path("p.go").expect("p.go");
        let println = program
            .object_at(file.id, offset(source, "Println"))
            .expect("external use");
        assert!(matches!(
            &program.object(println).kind,
            ObjectKind::External { path } if path == "fmt"
        ));
    }

    #[test]
    fn test_can_import_internal() {
        assert!(can_import("example.com/a/b", "example.com/a/internal/x"));
        assert!(!can_import("example.com/c", "example.com/a/internal/x"));
        assert!(can_import("example.com/a", "example.com/a/internal"));
        assert!(!can_import("example.com/a", "internal/abi"));
        assert!(can_import("runtime", "internal/abi"));
        assert!(can_import("example.com/a", "fmt"));
    }

    #[test]
    fn test_default_package_name() {
        assert_eq!(default_package_name("fmt"), "fmt");
        assert_eq!(default_package_name("github.com/x/go-yaml/v2"), "yaml");
        assert_eq!(default_package_name("example.com/a/b"), "b");
    }
}

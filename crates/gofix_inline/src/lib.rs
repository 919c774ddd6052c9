//! Safe call-site inlining for Go.
//!
//! [`analyze_callee`] summarizes a function once; [`inline`] uses the summary
//! to rewrite one call to it. The rewrite keeps the meaning of the program:
//! arguments are evaluated once and in their original order, references keep
//! resolving to the same objects and needed imports are added. When no
//! simpler form is possible the body is wrapped in a function literal and the
//! result is flagged as literalized.

mod binding;
pub mod cache;
pub mod callee;
pub mod caller;
pub mod error;
mod imports;
mod rewrite;
mod strategy;
mod usage;

use ahash::{AHashMap, AHashSet};
use gofix_diff::apply_edits;
use tracing::debug;

pub use cache::{CalleeCache, CalleeKey};
pub use callee::{
    BodyShape, Callee, Effect, Param, PkgRef, Receiver, Ref, RefKind, ResultVar, ReturnInfo,
    TypeText, analyze_callee, func_name,
};
pub use caller::Caller;
pub use error::InlineError;
pub use imports::import_edits;

use crate::binding::{Args, bind, collect_args};
use crate::caller::{CallContext, enclosing_func_object, locate};
use crate::imports::ImportPlan;
use crate::rewrite::{Namer, Substitution, rewrite, visible_names};
use crate::strategy::{Replacement, Strategy};

pub struct Options<'a> {
    /// Receives a line for every decision taken.
    pub log: Option<&'a dyn Fn(&str)>,
    /// Callees with more top-level statements are declined; 0 means no limit.
    pub max_statements: usize,
    /// Return literalized results instead of declining.
    pub allow_literalize: bool,
}

impl Default for Options<'_> {
    fn default() -> Self {
        Self {
            log: None,
            max_statements: 0,
            allow_literalize: true,
        }
    }
}

impl Options<'_> {
    fn log(&self, message: &str) {
        debug!("{message}");
        if let Some(log) = self.log {
            log(message);
        }
    }
}

/// Outcome of a successful inlining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineResult {
    /// The caller's file after the rewrite.
    pub content: String,
    /// The body was wrapped in a function literal.
    pub literalized: bool,
}

/// Inlines the call described by `caller` to the function summarized by
/// `callee`.
pub fn inline(
    caller: &Caller<'_>,
    callee: &Callee,
    options: &Options<'_>,
) -> Result<InlineResult, InlineError> {
    let name = callee.to_string();
    let site = locate(caller)?;
    if func_name(site.program, site.func) != name {
        return Err(InlineError::WrongCallee { callee: name });
    }
    if enclosing_func_object(&site) == Some(site.func) {
        return Err(InlineError::Recursive { callee: name });
    }
    if options.max_statements > 0 && callee.shape.statements > options.max_statements {
        return Err(InlineError::TooLarge {
            callee: name,
            statements: callee.shape.statements,
            limit: options.max_statements,
        });
    }
    let decl = rewrite::parse(callee, &callee.content)?;

    let mut own_names = AHashSet::new();
    let mut local_names = AHashSet::new();
    let mut free_names = AHashSet::new();
    for r in &callee.refs {
        match r.kind {
            RefKind::Local => {
                own_names.insert(r.name.clone());
                local_names.insert(r.name.clone());
            }
            RefKind::Param(_) | RefKind::Result(_) => {
                own_names.insert(r.name.clone());
            }
            _ => {
                free_names.insert(r.name.clone());
            }
        }
    }
    own_names.extend(callee.params.iter().map(|param| param.name.clone()));

    let mut plan = ImportPlan::new(&site, name.clone(), own_names.clone());
    let Args {
        params,
        literal,
        spread,
    } = collect_args(&site, callee, &mut plan)?;

    let literal_only = if spread {
        Some("multi-valued argument")
    } else if matches!(site.context, CallContext::GoDefer) {
        Some("go or defer statement")
    } else if callee.shape.named_results {
        Some("named results")
    } else {
        None
    };

    let mut replacement = None;
    if let Some(reason) = literal_only {
        options.log(&format!("{name}: only literalization applies ({reason})"));
    } else {
        // Resolve qualifiers first so that renaming avoids them.
        for r in &callee.refs {
            match &r.kind {
                RefKind::PkgName { path, pkg_name } => {
                    plan.name_for(path, pkg_name)?;
                }
                RefKind::Package {
                    pkg_path,
                    pkg_name,
                    exported: true,
                } if pkg_path != site.pkg_path() => {
                    plan.name_for(pkg_path, pkg_name)?;
                }
                _ => {}
            }
        }
        let visible = visible_names(&site);
        let mut taken: AHashSet<String> = visible.clone();
        taken.extend(free_names.iter().cloned());
        // Parameters are replaced by their bindings, so temporaries may reuse
        // their names.
        taken.extend(local_names.iter().cloned());
        taken.extend(plan.names().map(str::to_string));
        let mut namer = Namer::new(taken);
        let bindings = bind(callee, params, &mut plan, &mut namer)?;

        let mut renames = AHashMap::new();
        let bound: AHashSet<&str> = bindings
            .params
            .iter()
            .filter_map(|binding| match binding {
                binding::Binding::Bind { name } => Some(name.as_str()),
                binding::Binding::Substitute(_) => None,
            })
            .collect();
        for r in &callee.refs {
            if r.kind != RefKind::Local || renames.contains_key(&r.name) {
                continue;
            }
            let collides = visible.contains(&r.name)
                || bound.contains(r.name.as_str())
                || plan.names().any(|import| import == r.name);
            if collides {
                let fresh = namer.fresh(&r.name);
                options.log(&format!("{name}: renaming local {} to {fresh}", r.name));
                renames.insert(r.name.clone(), fresh);
            }
        }

        let body = rewrite(
            &site,
            callee,
            &decl,
            &mut plan,
            &Substitution {
                params: Some(&bindings.params),
                renames: &renames,
            },
        )?;
        replacement = match strategy::substitute(&site, callee, &body, &bindings, &mut plan)? {
            Some(found) => Some(found),
            None => strategy::splice(&site, callee, &body, &bindings, &mut plan)?,
        };
    }

    let (replacement, plan) = match replacement {
        Some(found) => (found, plan),
        None => {
            if !options.allow_literalize {
                return Err(InlineError::LiteralizationRequired { callee: name });
            }
            let mut plan = ImportPlan::new(&site, name.clone(), own_names);
            let renames = AHashMap::new();
            let body = rewrite(
                &site,
                callee,
                &decl,
                &mut plan,
                &Substitution {
                    params: None,
                    renames: &renames,
                },
            )?;
            (strategy::literalize(&site, &body, &literal), plan)
        }
    };

    let Replacement { edit, strategy } = replacement;
    options.log(&format!("{name}: inlined by {}", strategy.as_str()));
    let mut edits = vec![edit];
    edits.extend(plan.edits());
    let content = apply_edits(&site.source.text, &edits).map_err(|err| InlineError::Unsupported {
        callee: name,
        reason: err.to_string(),
    })?;
    Ok(InlineResult {
        content,
        literalized: strategy == Strategy::Literalize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gofix_typecheck::{ObjectId, ObjectKind, Program};

    fn load(packages: &[(&str, &str)]) -> Program {
        let mut program = Program::new();
        for (path, text) in packages {
            let file = format!("{}.go", path.rsplit('/').next().unwrap_or(path));
            program.add_package(*path, *path, vec![(file, text.to_string())]);
        }
        program.check();
        program
    }

    fn find_func(program: &Program, pkg_path: &str, name: &str) -> ObjectId {
        program
            .objects
            .iter()
            .find(|(_, obj)| {
                obj.name == name
                    && obj.pkg_path.as_deref() == Some(pkg_path)
                    && matches!(obj.kind, ObjectKind::Func { decl: Some(_), .. })
            })
            .map(|(id, _)| id)
            .expect("function declared")
    }

    fn inline_at(
        program: &Program,
        file: &str,
        needle: &str,
        callee: &Callee,
        options: &Options<'_>,
    ) -> Result<InlineResult, InlineError> {
        let source = program.file_by_path(file).expect("caller file");
        let offset = source.text.find(needle).expect("needle present");
        let caller = Caller::at_offset(program, source.id, offset).expect("call at needle");
        inline(&caller, callee, options)
    }

    fn inline_in_main(main: &str, callee: &str, needle: &str) -> Result<InlineResult, InlineError> {
        let program = load(&[("example.com/main", main)]);
        let callee = analyze_callee(&program, find_func(&program, "example.com/main", callee))
            .expect("analyzable callee");
        inline_at(&program, "main.go", needle, &callee, &Options::default())
    }

    #[test]
    fn test_substitutes_single_return_expression() {
        let main = "package main\n\nfunc Add(a, b int) int { return a+b }\n\nfunc main() {\n\t_ = Add(1, 2)\n}\n";
        let result = inline_in_main(main, "Add", "Add(1, 2)").expect("inlined");
        assert!(result.content.contains("\t_ = 1+2\n"), "{}", result.content);
        assert!(!result.literalized);
    }

    #[test]
    fn test_value_receiver_is_substituted() {
        let main = "package main\n\ntype T struct{}\n\nfunc (r T) f0() { println(r) }\n\nfunc main() {\n\tvar x T\n\tx.f0()\n}\n";
        let result = inline_in_main(main, "f0", "x.f0()").expect("inlined");
        assert!(result.content.contains("\tprintln(x)\n"), "{}", result.content);
    }

    #[test]
    fn test_pointer_receiver_takes_address() {
        let main = "package main\n\ntype T struct{}\n\nfunc (r *T) g0() { println(r) }\n\nfunc main() {\n\tvar x T\n\tx.g0()\n}\n";
        let result = inline_in_main(main, "g0", "x.g0()").expect("inlined");
        assert!(result.content.contains("\tprintln(&x)\n"), "{}", result.content);
    }

    #[test]
    fn test_parenthesizes_for_unary_operand() {
        let main = "package main\n\nfunc f4() int { return 2+2 }\n\nfunc main() {\n\tprintln(-f4())\n}\n";
        let result = inline_in_main(main, "f4", "f4())").expect("inlined");
        assert!(result.content.contains("println(-(2+2))"), "{}", result.content);
    }

    #[test]
    fn test_effectful_arguments_keep_their_order() {
        let main = "package main\n\nfunc g() int { return 1 }\n\nfunc h() int { return 2 }\n\nfunc f(a, b int) int { return b + a }\n\nfunc main() {\n\tx := f(g(), h())\n\tprintln(x)\n}\n";
        let result = inline_in_main(main, "f", "f(g(), h())").expect("inlined");
        assert!(
            result
                .content
                .contains("\tvar a int = g()\n\tx := h() + a\n"),
            "{}",
            result.content
        );
    }

    const TWICE: &str = "package main\n\nfunc g() int { return 1 }\n\nfunc f(a int) int { return a + a }\n\n";

    #[test]
    fn test_conditional_operand_is_not_hoisted() {
        let main = format!("{TWICE}func main() {{\n\tx := 1\n\tok := x > 0 && f(g()) > 0\n\tprintln(ok)\n}}\n");
        let result = inline_in_main(&main, "f", "f(g())").expect("inlined");
        assert!(result.literalized);
        assert!(!result.content.contains("var a"), "{}", result.content);
        assert!(
            result
                .content
                .contains("\tok := x > 0 && func(a int) int { return a + a }(g()) > 0\n"),
            "{}",
            result.content
        );

        let main = format!(
            "{TWICE}func main() {{\n\tx := 1\n\tif x > 0 || f(g()) > 0 {{\n\t\tprintln(x)\n\t}}\n}}\n"
        );
        let result = inline_in_main(&main, "f", "f(g())").expect("inlined");
        assert!(result.literalized);
        assert!(!result.content.contains("var a"), "{}", result.content);
    }

    #[test]
    fn test_switch_tag_is_hoisted() {
        let main = format!(
            "{TWICE}func main() {{\n\tx := 0\n\tswitch f(g()) {{\n\tcase 2:\n\t\tx = 1\n\t}}\n\tprintln(x)\n}}\n"
        );
        let result = inline_in_main(&main, "f", "f(g())").expect("inlined");
        assert!(!result.literalized);
        assert!(
            result.content.contains("\tvar a int = g()\n\tswitch a + a {\n"),
            "{}",
            result.content
        );
    }

    #[test]
    fn test_local_with_taken_address_is_bound() {
        let main = "package main\n\nfunc f(a int, p *int) int {\n\t*p = 2\n\treturn a\n}\n\nfunc main() {\n\ty := 1\n\tx := f(y, &y)\n\tprintln(x, y)\n}\n";
        let result = inline_in_main(main, "f", "f(y, &y)").expect("inlined");
        assert!(result.content.contains("\tvar a int = y\n"), "{}", result.content);
        assert!(result.content.contains("\tx := a\n"), "{}", result.content);
    }

    #[test]
    fn test_closure_captures_reassigned_local_by_value() {
        let mk = "package main\n\nfunc mk(a int) func() int {\n\treturn func() int { return a }\n}\n\n";
        let main = format!("{mk}func main() {{\n\ty := 1\n\tg := mk(y)\n\ty = 5\n\tprintln(g(), y)\n}}\n");
        let result = inline_in_main(&main, "mk", "mk(y)").expect("inlined");
        assert!(
            result
                .content
                .contains("\tvar a int = y\n\tg := func() int { return a }\n"),
            "{}",
            result.content
        );
        assert!(!result.content.contains("return y }"), "{}", result.content);

        let main = format!("{mk}func main() {{\n\tg := mk(1)\n\tprintln(g())\n}}\n");
        let result = inline_in_main(&main, "mk", "mk(1)").expect("inlined");
        assert!(
            result.content.contains("\tg := func() int { return 1 }\n"),
            "{}",
            result.content
        );
    }

    const SUM: &str = "package main\n\nfunc sum(xs ...int) int { return len(xs) }\n\n";

    #[test]
    fn test_variadic_arguments_are_packed() {
        let main = format!("{SUM}func main() {{\n\tprintln(sum(1, 2))\n}}\n");
        let result = inline_in_main(&main, "sum", "sum(1, 2)").expect("inlined");
        assert!(
            result.content.contains("\tprintln(len([]int{1, 2}))\n"),
            "{}",
            result.content
        );

        let main = format!("{SUM}func main() {{\n\tprintln(sum())\n}}\n");
        let result = inline_in_main(&main, "sum", "sum()").expect("inlined");
        assert!(result.content.contains("\tprintln(len(nil))\n"), "{}", result.content);

        let main = format!("{SUM}func main() {{\n\tv := []int{{1}}\n\tprintln(sum(v...))\n}}\n");
        let result = inline_in_main(&main, "sum", "sum(v...)").expect("inlined");
        assert!(result.content.contains("\tprintln(len(v))\n"), "{}", result.content);
    }

    #[test]
    fn test_splice_assigns_every_result() {
        let main = "package main\n\nfunc two(n int) (int, int) {\n\tm := n * 2\n\treturn m, m + 1\n}\n\nfunc main() {\n\tp, q := two(3)\n\tprintln(p, q)\n}\n";
        let result = inline_in_main(main, "two", "two(3)").expect("inlined");
        assert!(!result.literalized);
        assert!(
            result.content.contains("\tm := 3 * 2\n\tp, q := m, m + 1\n"),
            "{}",
            result.content
        );
    }

    #[test]
    fn test_splice_into_return() {
        let main = "package main\n\nfunc clamp(n int) int {\n\tif n < 0 {\n\t\treturn 0\n\t}\n\treturn n\n}\n\nfunc wrap(x int) int {\n\treturn clamp(x)\n}\n\nfunc main() {}\n";
        let result = inline_in_main(main, "clamp", "clamp(x)").expect("inlined");
        assert!(
            result
                .content
                .contains("func wrap(x int) int {\n\tif x < 0 {\n\t\treturn 0\n\t}\n\treturn x\n}\n"),
            "{}",
            result.content
        );
    }

    #[test]
    fn test_go_statement_is_literalized() {
        let main = "package main\n\nfunc h(a int) { println(a) }\n\nfunc main() {\n\tgo h(1)\n}\n";
        let result = inline_in_main(main, "h", "h(1)").expect("inlined");
        assert!(result.literalized);
        assert!(
            result.content.contains("\tgo func(a int) { println(a) }(1)\n"),
            "{}",
            result.content
        );
    }

    #[test]
    fn test_value_receiver_through_pointer_is_dereferenced() {
        let main = "package main\n\ntype T struct{}\n\nfunc (r T) f0() { println(r) }\n\nfunc main() {\n\tp := &T{}\n\tp.f0()\n}\n";
        let result = inline_in_main(main, "f0", "p.f0()").expect("inlined");
        assert!(result.content.contains("\tprintln(*p)\n"), "{}", result.content);
    }

    #[test]
    fn test_promoted_method_selects_embedded_field() {
        let main = "package main\n\ntype Inner struct{ n int }\n\nfunc (i Inner) get() int { return i.n }\n\ntype Outer struct{ Inner }\n\nfunc main() {\n\tvar o Outer\n\tprintln(o.get())\n}\n";
        let result = inline_in_main(main, "get", "o.get()").expect("inlined");
        assert!(result.content.contains("\tprintln(o.Inner.n)\n"), "{}", result.content);
    }

    #[test]
    fn test_splice_renames_colliding_locals() {
        let main = "package main\n\nfunc sq(a int) int {\n\ty := a * a\n\treturn y\n}\n\nfunc main() {\n\ty := 2\n\tx := sq(y)\n\tprintln(x)\n}\n";
        let result = inline_in_main(main, "sq", "sq(y)").expect("inlined");
        assert!(
            result.content.contains("\ty := 2\n\ty0 := y * y\n\tx := y0\n"),
            "{}",
            result.content
        );
    }

    #[test]
    fn test_defer_forces_literalization() {
        let main = "package main\n\nfunc d() {\n\tdefer println(1)\n\tprintln(2)\n}\n\nfunc main() {\n\td()\n}\n";
        let result = inline_in_main(main, "d", "d()\n}").expect("inlined");
        assert!(result.literalized);
        assert!(
            result
                .content
                .contains("\tfunc() {\n\t\tdefer println(1)\n\t\tprintln(2)\n\t}()\n"),
            "{}",
            result.content
        );

        let program = load(&[("example.com/main", main)]);
        let callee = analyze_callee(&program, find_func(&program, "example.com/main", "d"))
            .expect("analyzable callee");
        let options = Options {
            allow_literalize: false,
            ..Options::default()
        };
        let err = inline_at(&program, "main.go", "d()\n}", &callee, &options).unwrap_err();
        assert!(matches!(err, InlineError::LiteralizationRequired { .. }));
    }

    #[test]
    fn test_recursive_call_is_declined() {
        let main = "package main\n\nfunc r(n int) int { return r(n) }\n\nfunc main() {}\n";
        let err = inline_in_main(main, "r", "r(n)").unwrap_err();
        assert!(matches!(err, InlineError::Recursive { .. }));
        assert_eq!(
            err.to_string(),
            "cannot inline call to example.com/main.r within its own body"
        );
    }

    #[test]
    fn test_shadowed_reference_is_declined() {
        let main = "package main\n\nvar v = 1\n\nfunc F() int { return v }\n\nfunc main() {\n\tv := 2\n\t_ = F()\n\t_ = v\n}\n";
        let err = inline_in_main(main, "F", "F()\n").unwrap_err();
        assert!(matches!(err, InlineError::Shadowed { ref name, .. } if name == "v"));
    }

    const LIB: &str = "package lib\n\nimport \"example.com/other/q\"\n\nfunc F() int { return q.V() }\n\nfunc G() int { return helper() }\n\nfunc helper() int { return 0 }\n";
    const Q: &str = "package q\n\nfunc V() int { return 1 }\n";
    const ZZ: &str = "package zz\n\nfunc Z() int { return 2 }\n";
    const MAIN: &str = "package main\n\nimport (\n\t\"example.com/lib\"\n\tq \"example.com/zz\"\n)\n\nfunc main() {\n\t_ = lib.F()\n\t_ = lib.G()\n\t_ = q.Z()\n}\n";

    fn cross_package() -> Program {
        load(&[
            ("example.com/main", MAIN),
            ("example.com/lib", LIB),
            ("example.com/other/q", Q),
            ("example.com/zz", ZZ),
        ])
    }

    #[test]
    fn test_import_collision_gets_alias() {
        let program = cross_package();
        let callee = analyze_callee(&program, find_func(&program, "example.com/lib", "F"))
            .expect("analyzable callee");
        let result = inline_at(&program, "main.go", "lib.F()", &callee, &Options::default())
            .expect("inlined");
        assert!(result.content.contains("\t_ = q0.V()\n"), "{}", result.content);
        assert!(
            result.content.contains(
                "import (\n\t\"example.com/lib\"\n\tq \"example.com/zz\"\n\tq0 \"example.com/other/q\"\n)"
            ),
            "{}",
            result.content
        );
    }

    #[test]
    fn test_unexported_reference_is_inaccessible() {
        let program = cross_package();
        let callee = analyze_callee(&program, find_func(&program, "example.com/lib", "G"))
            .expect("analyzable callee");
        let err = inline_at(&program, "main.go", "lib.G()", &callee, &Options::default())
            .unwrap_err();
        assert!(matches!(err, InlineError::Inaccessible { ref name, .. } if name == "helper"));
    }

    #[test]
    fn test_wrong_callee_is_rejected() {
        let program = cross_package();
        let callee = analyze_callee(&program, find_func(&program, "example.com/lib", "F"))
            .expect("analyzable callee");
        let err = inline_at(&program, "main.go", "lib.G()", &callee, &Options::default())
            .unwrap_err();
        assert!(matches!(err, InlineError::WrongCallee { .. }));
    }

    #[test]
    fn test_callee_analysis_is_stable_and_serializable() {
        let program = cross_package();
        let id = find_func(&program, "example.com/lib", "F");
        let first = analyze_callee(&program, id).expect("analyzable callee");
        let second = analyze_callee(&program, id).expect("analyzable callee");
        assert_eq!(first, second);
        assert_eq!(first.key(), CalleeKey::for_func(&program, id));
        assert_eq!(first.to_string(), "example.com/lib.F");
        let json = first.to_json().expect("serializes");
        assert_eq!(Callee::from_json(&json).expect("deserializes"), first);
        assert!(first.refs.iter().any(|r| matches!(
            &r.kind,
            RefKind::PkgName { path, .. } if path == "example.com/other/q"
        )));
    }

    #[test]
    fn test_effects_follow_evaluation_order() {
        let main = "package main\n\nvar g int\n\nfunc f(a, b int) int {\n\tg = b\n\treturn a\n}\n\nfunc main() {}\n";
        let program = load(&[("example.com/main", main)]);
        let callee = analyze_callee(&program, find_func(&program, "example.com/main", "f"))
            .expect("analyzable callee");
        assert_eq!(callee.effects, vec![Effect::Param(1), Effect::Write, Effect::Param(0)]);
        assert_eq!(callee.params[0].refs, 1);
        assert!(!callee.shape.return_expr);
        assert!(callee.shape.tail_return_only);
    }

    #[test]
    fn test_cache_computes_once() {
        let program = cross_package();
        let id = find_func(&program, "example.com/lib", "F");
        let cache = CalleeCache::new();
        let callee = analyze_callee(&program, id).expect("analyzable callee");
        let key = callee.key();
        let mut calls = 0;
        for _ in 0..2 {
            cache
                .get_or_insert_with(&key, || {
                    calls += 1;
                    analyze_callee(&program, id)
                })
                .expect("cached");
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key).as_deref(), Some(&callee));
    }
}

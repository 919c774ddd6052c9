//! The `//go:fix inline` analysis.
//!
//! A package is analyzed in two passes. The first finds the functions,
//! constants and type aliases marked `//go:fix inline`, checks that they
//! can be inlined and exports facts about them. The second visits every call
//! and name in the package and proposes a fix for each use of an inlinable
//! object, whether declared in the package or imported.

pub mod directive;
pub mod facts;
mod find;
mod inline;

use std::hash::Hasher;

use gofix_bisect::{Fnv64, Matcher, marker};
use gofix_config::AnalyzerConfig;
use gofix_diff::TextEdit;
use gofix_inline::CalleeCache;
use gofix_span::{FileId, Span};
use gofix_typecheck::{PackageId, Program, SourceFile};
use gofix_utils::{Diagnostic, DiagnosticSeverity};
use tracing::{debug, info};

pub use directive::{Directive, directives, has_fix_inline};
pub use facts::{Fact, FactKey, FactStore, Target};

/// A suggested change; its edits are applied together or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fix {
    pub message: String,
    pub edits: Vec<TextEdit>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub file: FileId,
    pub diagnostic: Diagnostic,
    pub fix: Option<Fix>,
    /// Bisect change id, when the change is to be reported with a marker.
    pub bisect: Option<u64>,
}

impl Finding {
    fn new(source: &SourceFile, severity: DiagnosticSeverity, span: Span, message: String) -> Self {
        Self {
            file: source.id,
            diagnostic: Diagnostic::new(severity, source.path.clone(), span, message),
            fix: None,
            bisect: None,
        }
    }

    #[must_use]
    fn with_fix(mut self, message: String, edits: Vec<TextEdit>) -> Self {
        self.diagnostic = self.diagnostic.with_suggestion(message.clone());
        self.fix = Some(Fix { message, edits });
        self
    }

    /// The line printed for a reported bisect change.
    pub fn marker_line(&self, source: &SourceFile) -> Option<String> {
        let id = self.bisect?;
        Some(format!("{} {}", self.diagnostic.short(&source.lines), marker(id)))
    }
}

/// Shared state for analyzing the packages of one program.
pub struct Analyzer<'a> {
    pub program: &'a Program,
    pub cache: &'a CalleeCache,
    pub facts: &'a FactStore,
    pub config: &'a AnalyzerConfig,
    pub bisect: Option<&'a Matcher>,
}

impl Analyzer<'_> {
    /// Runs both passes over `package`. Facts about its exported inlinable
    /// objects are added to the store.
    pub fn analyze_package(&self, package: PackageId) -> Vec<Finding> {
        let path = &self.program.package(package).path;
        let mut findings = Vec::new();
        let mut inlinable = find::find(self, package, &mut findings);
        debug!(
            package = %path,
            funcs = inlinable.funcs.len(),
            consts = inlinable.consts.len(),
            aliases = inlinable.aliases.len(),
            "found inlinable objects"
        );
        inline::inline(self, package, &mut inlinable, &mut findings);
        info!(package = %path, findings = findings.len(), "analyzed package");
        findings
    }

    /// Applies the bisect pattern to a proposed fix at `offset`. Returns
    /// `None` when the change is disabled.
    fn admit(&self, source: &SourceFile, offset: u32, mut finding: Finding) -> Option<Finding> {
        let Some(matcher) = self.bisect else {
            return Some(finding);
        };
        let id = Fnv64::new()
            .with_str(&source.path)
            .with_u64(u64::from(offset))
            .finish();
        if !matcher.should_enable(id) {
            debug!(file = %source.path, offset, "change disabled by bisect pattern");
            return None;
        }
        if matcher.should_report(id) {
            finding.bisect = Some(id);
        }
        Some(finding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gofix_diff::apply_edits;

    fn load(packages: &[(&str, &str)]) -> Program {
        let mut program = Program::new();
        for (path, text) in packages {
            let file = format!("{}.go", path.rsplit('/').next().unwrap_or(path));
            program.add_package(*path, *path, vec![(file, text.to_string())]);
        }
        program.check();
        program
    }

    fn analyze(program: &mut Program, config: &AnalyzerConfig) -> Vec<Finding> {
        let levels = program.dependency_levels();
        let cache = CalleeCache::new();
        let facts = FactStore::new();
        let matcher = config
            .bisect
            .as_deref()
            .and_then(|pattern| Matcher::new(pattern).expect("valid pattern"));
        let analyzer = Analyzer {
            program,
            cache: &cache,
            facts: &facts,
            config,
            bisect: matcher.as_ref(),
        };
        levels
            .into_iter()
            .flatten()
            .flat_map(|package| analyzer.analyze_package(package))
            .collect()
    }

    fn messages(findings: &[Finding]) -> Vec<&str> {
        findings
            .iter()
            .map(|finding| finding.diagnostic.message.as_str())
            .collect()
    }

    fn fixed(program: &Program, finding: &Finding) -> String {
        let fix = finding.fix.as_ref().expect("finding has a fix");
        apply_edits(&program.file(finding.file).text, &fix.edits).expect("edits apply")
    }

    const LIB: &str = r#"package lib

import "example.com/other/q"

// Deprecated: use q.V.
//
//go:fix inline
func F() int { return q.V() }

//go:fix inline
const Old = New

const New = 1

//go:fix inline
type T = q.U

//go:fix inline
func D() {
	defer println(1)
}
"#;

    const Q: &str = "package q\n\nfunc V() int { return 1 }\n\ntype U struct{}\n";

    const MAIN: &str = r#"package main

import "example.com/lib"

func main() {
	_ = lib.F()
	_ = lib.Old
	var t lib.T
	_ = t
	lib.D()
}
"#;

    fn module() -> Program {
        load(&[
            ("example.com/main", MAIN),
            ("example.com/lib", LIB),
            ("example.com/other/q", Q),
        ])
    }

    #[test]
    fn test_inlines_across_packages() {
        let mut program = module();
        let findings = analyze(&mut program, &AnalyzerConfig::default());
        assert_eq!(
            messages(&findings),
            [
                "Call of example.com/lib.F should be inlined",
                "Constant lib.Old should be inlined",
                "Type alias lib.T should be inlined",
            ]
        );

        let call = fixed(&program, &findings[0]);
        assert!(call.contains("\t_ = q.V()\n"), "{call}");
        assert!(call.contains("\t\"example.com/other/q\"\n"), "{call}");

        let constant = fixed(&program, &findings[1]);
        assert!(constant.contains("\t_ = lib.New\n"), "{constant}");
        assert_eq!(
            findings[1].fix.as_ref().map(|fix| fix.message.as_str()),
            Some("Inline constant lib.Old")
        );

        let alias = fixed(&program, &findings[2]);
        assert!(alias.contains("\tvar t q.U\n"), "{alias}");
    }

    #[test]
    fn test_literalized_calls_are_suppressed() {
        let mut program = module();
        let findings = analyze(&mut program, &AnalyzerConfig::default());
        assert!(!messages(&findings).iter().any(|m| m.contains("lib.D")));
        for finding in findings.iter().filter(|finding| finding.fix.is_some()) {
            let content = fixed(&program, finding);
            assert!(!content.contains("func() {"), "{content}");
        }
    }

    #[test]
    fn test_invalid_directives() {
        let source = r#"package p

//go:fix inline
const (
	A = iota
	B
)

//go:fix inline
const C = 1 + 2

//go:fix inline
type S struct{}

//go:fix inline
func Ext()
"#;
        let mut program = load(&[("example.com/p", source)]);
        let findings = analyze(&mut program, &AnalyzerConfig::default());
        assert_eq!(
            messages(&findings),
            [
                "invalid //go:fix inline directive: const value is iota",
                "invalid //go:fix inline directive: const value is not the name of another constant",
                "invalid //go:fix inline directive: not a type alias",
                "invalid inlining candidate: cannot inline example.com/p.Ext: function has no body",
            ]
        );
        assert!(findings.iter().all(|finding| finding.fix.is_none()));
    }

    #[test]
    fn test_shadowed_constant_is_skipped() {
        let source = r#"package p

//go:fix inline
const A = B

const B = 1

func f() {
	_ = A
	B := 2
	_ = A
	_ = B
}
"#;
        let mut program = load(&[("example.com/p", source)]);
        let findings = analyze(&mut program, &AnalyzerConfig::default());
        assert_eq!(messages(&findings), ["Constant A should be inlined"]);
        let fixed = fixed(&program, &findings[0]);
        assert!(fixed.contains("\t_ = B\n\tB := 2\n\t_ = A\n"), "{fixed}");
    }

    #[test]
    fn test_bisect_pattern_gates_changes() {
        let mut program = module();
        let none = AnalyzerConfig {
            bisect: Some("n".to_string()),
            ..AnalyzerConfig::default()
        };
        assert!(analyze(&mut program, &none).is_empty());

        let all = AnalyzerConfig {
            bisect: Some("y".to_string()),
            ..AnalyzerConfig::default()
        };
        let findings = analyze(&mut program, &all);
        assert_eq!(findings.len(), 3);
        let source = program.file(findings[0].file);
        let line = findings[0].marker_line(source).expect("reported");
        assert!(line.starts_with("main.go:6:6: Call of"), "{line}");
        assert!(line.contains("[bisect-match 0x"), "{line}");
    }
}

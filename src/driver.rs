//! Running the analysis over a whole program and applying its fixes.

use std::fs;

use ahash::AHashMap;
use anyhow::{Context, Result};
use gofix_bisect::Matcher;
use gofix_config::AnalyzerConfig;
use gofix_diff::{TextEdit, apply_edits};
use gofix_inline::CalleeCache;
use gofix_span::FileId;
use gofix_typecheck::Program;
use gofix_utils::Stopwatch;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::analysis::{Analyzer, FactStore, Finding, Fix};
use crate::loader::Workspace;

/// Analyzes every package of `program`, dependencies first. Packages of one
/// dependency level are analyzed in parallel; findings are sorted by file
/// and offset.
pub fn analyze(program: &mut Program, config: &AnalyzerConfig) -> Result<Vec<Finding>> {
    let matcher = match config.bisect.as_deref() {
        Some(pattern) => Matcher::new(pattern).context("invalid bisect pattern")?,
        None => None,
    };
    let levels = program.dependency_levels();
    let program: &Program = program;
    let cache = CalleeCache::new();
    let facts = FactStore::new();
    let analyzer = Analyzer {
        program,
        cache: &cache,
        facts: &facts,
        config,
        bisect: matcher.as_ref(),
    };
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build()
        .context("cannot start worker threads")?;

    let mut findings = Vec::new();
    for (depth, level) in levels.iter().enumerate() {
        let timer = Stopwatch::start_new();
        let results: Vec<Vec<Finding>> = pool.install(|| {
            level
                .par_iter()
                .map(|&package| analyzer.analyze_package(package))
                .collect()
        });
        debug!(
            depth,
            packages = level.len(),
            elapsed_ms = timer.elapsed_ms(),
            "analyzed dependency level"
        );
        findings.extend(results.into_iter().flatten());
    }
    info!(
        findings = findings.len(),
        callees = cache.len(),
        facts = facts.len(),
        "analysis complete"
    );
    findings.sort_by_key(|finding| (finding.file, finding.diagnostic.span.start));
    Ok(findings)
}

/// What applying the fixes of one file did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFixes {
    pub file: FileId,
    pub content: String,
    pub applied: usize,
    pub skipped: usize,
}

/// Applies the fixes of `findings` to the contents of their files, in
/// offset order. A fix conflicting with one already accepted is skipped as a
/// whole; a later run picks it up.
pub fn fix_contents(program: &Program, findings: &[Finding]) -> Vec<FileFixes> {
    let mut by_file: AHashMap<FileId, Vec<&Fix>> = AHashMap::new();
    for finding in findings {
        if let Some(fix) = &finding.fix {
            by_file.entry(finding.file).or_default().push(fix);
        }
    }
    let mut files: Vec<_> = by_file.into_iter().collect();
    files.sort_by_key(|(file, _)| *file);

    let mut out = Vec::with_capacity(files.len());
    for (file, mut fixes) in files {
        let source = program.file(file);
        fixes.sort_by_key(|fix| fix.edits.iter().map(|edit| edit.start).min());
        let mut accepted: Vec<TextEdit> = Vec::new();
        let mut applied = 0;
        let mut skipped = 0;
        for fix in fixes {
            // Identical edits, such as the same import added twice, merge.
            let conflict = fix.edits.iter().any(|edit| {
                accepted
                    .iter()
                    .any(|other| other != edit && other.overlaps(edit))
            });
            if conflict {
                debug!(file = %source.path, fix = %fix.message, "skipping conflicting fix");
                skipped += 1;
                continue;
            }
            let mut candidate = accepted.clone();
            candidate.extend(fix.edits.iter().cloned());
            candidate.sort_by_key(|edit| (edit.start, edit.end));
            if let Err(err) = apply_edits(&source.text, &candidate) {
                warn!(file = %source.path, fix = %fix.message, "skipping fix: {err}");
                skipped += 1;
                continue;
            }
            accepted = candidate;
            applied += 1;
        }
        match apply_edits(&source.text, &accepted) {
            Ok(content) => out.push(FileFixes {
                file,
                content,
                applied,
                skipped,
            }),
            Err(err) => warn!(file = %source.path, "abandoning fixes: {err}"),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixSummary {
    pub files: usize,
    pub applied: usize,
    pub skipped: usize,
}

/// Applies the fixes of `findings` and writes the changed files.
pub fn apply(workspace: &Workspace, findings: &[Finding]) -> Result<FixSummary> {
    let mut summary = FixSummary::default();
    for fixed in fix_contents(&workspace.program, findings) {
        summary.applied += fixed.applied;
        summary.skipped += fixed.skipped;
        if fixed.applied == 0 {
            continue;
        }
        let source = workspace.program.file(fixed.file);
        let path = workspace.file_path(&source.path);
        fs::write(&path, &fixed.content)
            .with_context(|| format!("cannot write {}", path.display()))?;
        info!(file = %source.path, fixes = fixed.applied, "rewrote file");
        summary.files += 1;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dir");
        }
        fs::write(path, text).expect("write file");
    }

    const LIB: &str = r#"package lib

//go:fix inline
func Twice(x int) int { return x + x }

//go:fix inline
const Old = New

const New = 1
"#;

    const MAIN: &str = r#"package main

import "example.com/m/lib"

func main() {
	println(lib.Twice(3), lib.Old)
}
"#;

    #[test]
    fn test_fix_module() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write(root, "go.mod", "module example.com/m\n");
        write(root, "main.go", MAIN);
        write(root, "lib/lib.go", LIB);

        let mut workspace = crate::loader::load(&[root.to_path_buf()]).expect("load");
        let config = AnalyzerConfig {
            jobs: 2,
            ..AnalyzerConfig::default()
        };
        let findings = analyze(&mut workspace.program, &config).expect("analyze");
        assert_eq!(findings.len(), 2);

        let summary = apply(&workspace, &findings).expect("apply");
        assert_eq!(
            summary,
            FixSummary {
                files: 1,
                applied: 2,
                skipped: 0,
            }
        );
        let main = fs::read_to_string(root.join("main.go")).expect("read");
        assert!(main.contains("\tprintln(3 + 3, lib.New)\n"), "{main}");

        let mut workspace = crate::loader::load(&[root.to_path_buf()]).expect("reload");
        let findings = analyze(&mut workspace.program, &config).expect("analyze");
        assert!(findings.is_empty());
    }

    fn finding(file: FileId, edits: Vec<TextEdit>) -> Finding {
        Finding {
            file,
            diagnostic: gofix_utils::Diagnostic::new(
                gofix_utils::DiagnosticSeverity::Warning,
                "p.go",
                gofix_span::Span::default(),
                "change",
            ),
            fix: Some(Fix {
                message: "change".to_string(),
                edits,
            }),
            bisect: None,
        }
    }

    #[test]
    fn test_conflicting_fixes_are_skipped() {
        let text = "package p\n\nvar x = 1\nvar y = 2\n";
        let mut program = Program::new();
        program.add_package("example.com/p", "p", vec![("p.go".to_string(), text.to_string())]);
        program.check();
        let file = program.file_by_path("p.go").expect("p.go").id;

        let decl = text.find("var x").expect("var x");
        let x = text.find("x =").expect("x");
        let y = text.find("y =").expect("y");
        let import = TextEdit::insert(decl, "import \"q\"\n\n");
        let findings = [
            finding(file, vec![import.clone(), TextEdit::new(x, x + 1, "a")]),
            finding(file, vec![import, TextEdit::new(y, y + 1, "b")]),
            finding(file, vec![TextEdit::new(x, x + 5, "z = 3")]),
        ];

        let fixed = fix_contents(&program, &findings);
        assert_eq!(fixed.len(), 1);
        assert_eq!(fixed[0].applied, 2);
        assert_eq!(fixed[0].skipped, 1);
        assert_eq!(
            fixed[0].content,
            "package p\n\nimport \"q\"\n\nvar a = 1\nvar b = 2\n"
        );
    }

    #[test]
    fn test_invalid_bisect_pattern() {
        let mut program = Program::new();
        let config = AnalyzerConfig {
            bisect: Some("01+x".to_string()),
            ..AnalyzerConfig::default()
        };
        assert!(analyze(&mut program, &config).is_err());
    }
}

//! Command-line front end.

mod args;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use gofix::analysis::Finding;
use gofix::driver;
use gofix::loader::{self, Module};
use gofix_bisect::{cut_marker, marker};
use gofix_config::GofixConfig;
use gofix_diff::{apply_edits, diff_edits};
use gofix_inline::{Caller, InlineError, Options, analyze_callee, inline};
use gofix_utils::{DiagnosticSeverity, Profiler, init_logging_with};
use tracing::debug;

pub use args::{AnalysisArgs, BisectCommand, Cli, Commands};

pub fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = GofixConfig::load(cli.config.as_deref())?;
    init_logging_with(cli.log.as_deref().or(config.log.as_deref()));
    let mut profiler = Profiler::new();

    let code = match cli.command {
        Commands::Check { analysis, verbose } => {
            apply_analysis_args(&mut config, &analysis);
            check(&config, &analysis.dirs, verbose, &mut profiler)?
        }
        Commands::Fix { analysis } => {
            apply_analysis_args(&mut config, &analysis);
            fix(&config, &analysis.dirs, &mut profiler)?
        }
        Commands::Inline {
            file,
            position,
            write,
            no_literalize,
            verbose,
        } => {
            if no_literalize {
                config.inline.allow_literalize = false;
            }
            inline_one(&config, &file, &position, write, verbose, &mut profiler)?
        }
        Commands::Bisect { command } => bisect(command)?,
    };

    if cli.timings {
        eprintln!("{profiler}");
    }
    Ok(code)
}

fn apply_analysis_args(config: &mut GofixConfig, args: &AnalysisArgs) {
    if let Some(pattern) = &args.bisect {
        config.analyzer.bisect = Some(pattern.clone()).filter(|pattern| !pattern.is_empty());
    }
    if let Some(jobs) = args.jobs {
        config.analyzer.jobs = jobs;
    }
}

fn analyze(
    config: &GofixConfig,
    dirs: &[PathBuf],
    profiler: &mut Profiler,
) -> Result<(loader::Workspace, Vec<Finding>)> {
    let mut workspace = profiler.record_phase("load", || loader::load(dirs))?;
    let findings = profiler.record_phase("analyze", || {
        driver::analyze(&mut workspace.program, &config.analyzer)
    })?;
    Ok((workspace, findings))
}

fn print_marker_lines(workspace: &loader::Workspace, findings: &[Finding]) {
    for finding in findings {
        if let Some(line) = finding.marker_line(workspace.program.file(finding.file)) {
            eprintln!("{line}");
        }
    }
}

fn check(
    config: &GofixConfig,
    dirs: &[PathBuf],
    verbose: bool,
    profiler: &mut Profiler,
) -> Result<ExitCode> {
    let (workspace, findings) = analyze(config, dirs, profiler)?;
    for finding in &findings {
        let source = workspace.program.file(finding.file);
        if verbose {
            print!("{}", finding.diagnostic.render(&source.text, true));
            continue;
        }
        let line = finding.diagnostic.short(&source.lines);
        let line = match finding.diagnostic.severity {
            DiagnosticSeverity::Error => line.red(),
            DiagnosticSeverity::Warning => line.yellow(),
            DiagnosticSeverity::Info => line.normal(),
        };
        println!("{line}");
    }
    print_marker_lines(&workspace, &findings);
    Ok(if findings.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn fix(config: &GofixConfig, dirs: &[PathBuf], profiler: &mut Profiler) -> Result<ExitCode> {
    let (workspace, findings) = analyze(config, dirs, profiler)?;
    print_marker_lines(&workspace, &findings);
    let summary = profiler.record_phase("apply", || driver::apply(&workspace, &findings))?;
    println!(
        "{} {} fixes in {} files",
        "applied".green().bold(),
        summary.applied,
        summary.files
    );
    if summary.skipped > 0 {
        println!(
            "{} {} conflicting fixes; run again to apply them",
            "skipped".yellow().bold(),
            summary.skipped
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Resolves `line:col` (1-based) or a byte offset.
fn parse_position(text: &str, lines: &gofix_span::LineIndex) -> Result<usize> {
    if let Some((line, col)) = text.split_once(':') {
        let line: usize = line.parse().with_context(|| format!("invalid line in {text}"))?;
        let col: usize = col.parse().with_context(|| format!("invalid column in {text}"))?;
        return lines
            .offset(line, col)
            .with_context(|| format!("{text} is outside the file"));
    }
    text.parse()
        .with_context(|| format!("invalid position {text}: expected line:col or an offset"))
}

fn inline_one(
    config: &GofixConfig,
    file: &Path,
    position: &str,
    write: bool,
    verbose: bool,
    profiler: &mut Profiler,
) -> Result<ExitCode> {
    let file = file
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", file.display()))?;
    let dir = file.parent().context("file has no parent directory")?;
    let module = Module::find(dir)?;
    let workspace = profiler.record_phase("load", || loader::load(&[module.root.clone()]))?;
    let display = workspace.module.display_path(&file);
    let program = &workspace.program;
    let source = program
        .file_by_path(&display)
        .with_context(|| format!("{display} is not part of a package"))?;
    let offset = parse_position(position, &source.lines)?;
    let caller = Caller::at_offset(program, source.id, offset)
        .with_context(|| format!("no call at {display}:{position}"))?;

    let log = |line: &str| eprintln!("{} {line}", "note:".cyan());
    let options = Options {
        log: verbose.then_some(&log as &dyn Fn(&str)),
        max_statements: config.inline.max_callee_statements,
        allow_literalize: config.inline.allow_literalize,
    };
    let result = profiler.record_phase("inline", || -> Result<_, InlineError> {
        let callee = analyze_callee(program, caller.callee()?)?;
        debug!(callee = %callee, "inlining");
        inline(&caller, &callee, &options)
    });
    let result = match result {
        Ok(result) => result,
        Err(err) => bail!("{display}:{position}: {err}"),
    };
    if result.literalized {
        eprintln!(
            "{} the body was wrapped in a function literal",
            "warning:".yellow().bold()
        );
    }
    if write {
        write_unchanged(&file, &source.text, &result.content)?;
    } else {
        print!("{}", result.content);
    }
    Ok(ExitCode::SUCCESS)
}

/// Writes `content` to `path` as edits against `original`, refusing when the
/// file no longer holds `original` where the edits apply.
fn write_unchanged(path: &Path, original: &str, content: &str) -> Result<()> {
    let edits = diff_edits(original, content);
    let current = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let updated = apply_edits(&current, &edits)
        .with_context(|| format!("{} changed on disk; not writing", path.display()))?;
    fs::write(path, updated).with_context(|| format!("cannot write {}", path.display()))
}

fn parse_id(text: &str) -> Result<u64> {
    let id = match text.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    id.with_context(|| format!("invalid change id {text}"))
}

fn bisect(command: BisectCommand) -> Result<ExitCode> {
    match command {
        BisectCommand::Marker { id } => println!("{}", marker(parse_id(&id)?)),
        BisectCommand::Cut { line } => {
            let Some((rest, id)) = cut_marker(&line) else {
                bail!("no bisect marker in line");
            };
            println!("{rest}");
            println!("{id:#018x}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_position() {
        let lines = gofix_span::LineIndex::new("package p\n\nfunc f() {}\n");
        assert_eq!(parse_position("3:6", &lines).expect("line:col"), 16);
        assert_eq!(parse_position("16", &lines).expect("offset"), 16);
        assert!(parse_position("9:1", &lines).is_err());
        assert!(parse_position("x", &lines).is_err());
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("0x10").expect("hex"), 16);
        assert_eq!(parse_id("42").expect("decimal"), 42);
        assert!(parse_id("0xzz").is_err());
    }

    #[test]
    fn test_inline_command_writes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        fs::write(root.join("go.mod"), "module example.com/m\n").expect("go.mod");
        let main = root.join("main.go");
        fs::write(
            &main,
            "package main\n\nfunc add(a, b int) int { return a + b }\n\nfunc main() {\n\tprintln(add(1, 2))\n}\n",
        )
        .expect("main.go");

        let config = GofixConfig::default();
        let mut profiler = Profiler::new();
        inline_one(&config, &main, "6:10", true, false, &mut profiler).expect("inlined");
        let text = fs::read_to_string(&main).expect("read");
        assert!(text.contains("\tprintln(1 + 2)\n"), "{text}");
        assert_eq!(profiler.phases().len(), 2);
    }

    #[test]
    fn test_write_refuses_changed_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("main.go");
        let original = "package main\n\nfunc main() {\n\tprintln(add(1, 2))\n}\n";
        let content = "package main\n\nfunc main() {\n\tprintln(1 + 2)\n}\n";

        fs::write(&path, original).expect("write");
        write_unchanged(&path, original, content).expect("unchanged file is written");
        assert_eq!(fs::read_to_string(&path).expect("read"), content);

        let edited = "package main\n\nfunc main() {\n\tprintln(sub(1, 2))\n}\n";
        fs::write(&path, edited).expect("write");
        let err = write_unchanged(&path, original, content).unwrap_err();
        assert!(err.to_string().contains("changed on disk"), "{err:#}");
        assert_eq!(fs::read_to_string(&path).expect("read"), edited);
    }
}

//! Discovery and loading of the Go packages of a module.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use gofix_typecheck::Program;
use tracing::{debug, info, warn};

/// A Go module: the directory holding its `go.mod` and its module path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub root: PathBuf,
    pub path: String,
}

impl Module {
    /// Finds the module containing `dir` by searching upwards for `go.mod`.
    pub fn find(dir: &Path) -> Result<Self> {
        let start = dir
            .canonicalize()
            .with_context(|| format!("cannot resolve {}", dir.display()))?;
        for candidate in start.ancestors() {
            let go_mod = candidate.join("go.mod");
            if !go_mod.is_file() {
                continue;
            }
            let text = fs::read_to_string(&go_mod)
                .with_context(|| format!("cannot read {}", go_mod.display()))?;
            let path = parse_module_path(&text)
                .with_context(|| format!("{}: missing module directive", go_mod.display()))?;
            debug!(root = %candidate.display(), %path, "found module");
            return Ok(Self {
                root: candidate.to_path_buf(),
                path,
            });
        }
        bail!("no go.mod found in {} or any parent directory", dir.display())
    }

    /// Import path of the package in `dir`.
    pub fn package_path(&self, dir: &Path) -> String {
        match dir.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => self.path.clone(),
            Ok(rel) => format!("{}/{}", self.path, slash_path(rel)),
            Err(_) => self.path.clone(),
        }
    }

    /// Path of `file` relative to the module root, as shown in diagnostics.
    pub fn display_path(&self, file: &Path) -> String {
        file.strip_prefix(&self.root)
            .map_or_else(|_| file.display().to_string(), slash_path)
    }
}

/// The module path declared by the `module` directive of a `go.mod` file.
pub fn parse_module_path(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let line = line.split("//").next()?.trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with([' ', '\t']) {
            return None;
        }
        let path = rest.trim().trim_matches('"');
        (!path.is_empty()).then(|| path.to_string())
    })
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// The type-checked packages of a module.
#[derive(Debug)]
pub struct Workspace {
    pub module: Module,
    pub program: Program,
}

impl Workspace {
    /// Absolute path of a file loaded under its display path.
    pub fn file_path(&self, display: &str) -> PathBuf {
        self.module.root.join(display)
    }
}

/// Loads every package found below `dirs`, which must belong to one module.
pub fn load(dirs: &[PathBuf]) -> Result<Workspace> {
    let first = dirs.first().context("no package directories given")?;
    let module = Module::find(first)?;

    let mut packages: BTreeMap<PathBuf, BTreeSet<PathBuf>> = BTreeMap::new();
    for dir in dirs {
        let dir = dir
            .canonicalize()
            .with_context(|| format!("cannot resolve {}", dir.display()))?;
        if !dir.starts_with(&module.root) {
            bail!(
                "{} is outside module {} ({})",
                dir.display(),
                module.path,
                module.root.display()
            );
        }
        for file in go_files(&module, &dir)? {
            if let Some(parent) = file.parent() {
                packages.entry(parent.to_path_buf()).or_default().insert(file);
            }
        }
    }

    let mut program = Program::new();
    for (dir, files) in packages {
        let mut sources = Vec::with_capacity(files.len());
        for file in files {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            sources.push((module.display_path(&file), text));
        }
        let path = module.package_path(&dir);
        debug!(package = %path, files = sources.len(), "loading package");
        program.add_package(path, dir, sources);
    }

    let errors = program.check().len();
    if errors > 0 {
        warn!(errors, "type checking reported errors; affected code is skipped");
    }
    info!(packages = program.packages().len(), "loaded module {}", module.path);
    Ok(Workspace { module, program })
}

/// The Go source files of the packages below `dir`, as the go tool would
/// build them: test files, `testdata`, `vendor`, hidden directories and
/// nested modules are skipped.
fn go_files(module: &Module, dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/**/*.go", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut files = Vec::new();
    for entry in glob::glob(&pattern).context("invalid source pattern")? {
        let path = entry?;
        if is_package_file(module, &path) {
            files.push(path);
        }
    }
    Ok(files)
}

fn is_package_file(module: &Module, path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    if name.ends_with("_test.go") || name.starts_with(['.', '_']) {
        return false;
    }
    let Ok(rel) = path.strip_prefix(&module.root) else {
        return false;
    };
    let Some(rel_dir) = rel.parent() else {
        return false;
    };
    let ignored = rel_dir.components().any(|component| {
        let component = component.as_os_str().to_string_lossy();
        component == "testdata" || component == "vendor" || component.starts_with(['.', '_'])
    });
    if ignored {
        return false;
    }
    // Directories with their own go.mod belong to another module.
    rel_dir
        .ancestors()
        .filter(|ancestor| !ancestor.as_os_str().is_empty())
        .all(|ancestor| !module.root.join(ancestor).join("go.mod").is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dir");
        }
        fs::write(path, text).expect("write file");
    }

    #[test]
    fn test_parse_module_path() {
        assert_eq!(
            parse_module_path("// comment\nmodule example.com/m // trailing\n\ngo 1.22\n"),
            Some("example.com/m".to_string())
        );
        assert_eq!(parse_module_path("module \"example.com/q\"\n").as_deref(), Some("example.com/q"));
        assert_eq!(parse_module_path("modulex y\n"), None);
        assert_eq!(parse_module_path("go 1.22\n"), None);
    }

    #[test]
    fn test_load_module_packages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write(root, "go.mod", "module example.com/m\n\ngo 1.22\n");
        write(root, "main.go", "package main\n\nimport \"example.com/m/lib\"\n\nfunc main() { lib.F() }\n");
        write(root, "main_test.go", "package main\n");
        write(root, "lib/lib.go", "package lib\n\nfunc F() {}\n");
        write(root, "lib/testdata/bad.go", "not go\n");
        write(root, "nested/go.mod", "module example.com/other\n");
        write(root, "nested/n.go", "package n\n");

        let workspace = load(&[root.to_path_buf()]).expect("load");
        let mut paths: Vec<_> = workspace
            .program
            .packages()
            .iter()
            .map(|package| package.path.clone())
            .collect();
        paths.sort();
        assert_eq!(paths, ["example.com/m", "example.com/m/lib"]);
        assert!(workspace.program.errors().is_empty(), "{:?}", workspace.program.errors());

        let files: Vec<_> = workspace
            .program
            .files()
            .iter()
            .map(|file| file.path.clone())
            .collect();
        assert!(files.contains(&"lib/lib.go".to_string()));
        assert!(!files.iter().any(|file| file.ends_with("_test.go")));
        assert_eq!(
            workspace.file_path("lib/lib.go"),
            workspace.module.root.join("lib/lib.go")
        );
    }

    #[test]
    fn test_load_without_module_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "a.go", "package a\n");
        let err = load(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(err.to_string().contains("no go.mod"), "{err}");
    }
}

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use ahash::AHashMap;
use gofix_ast::File;
use gofix_span::{FileId, LineIndex, Pos, Span};
use tracing::debug;

use crate::checker::Checker;
use crate::error::CheckError;
use crate::objects::{Builtin, Object, ObjectId, Objects, PackageId, ScopeId};
use crate::scope::{ScopeKind, Scopes};
use crate::types::{Qualifier, Type, type_string};
use crate::universe::{self, Universe};

/// A parsed source file of the program.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    pub path: String,
    pub text: Arc<str>,
    pub ast: Arc<File>,
    pub lines: LineIndex,
    pub package: PackageId,
    /// The file scope; assigned when the package is checked.
    pub scope: Option<ScopeId>,
}

#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    pub path: String,
    pub name: String,
    pub dir: PathBuf,
    pub files: Vec<FileId>,
    /// The package scope; assigned when the package is checked.
    pub scope: Option<ScopeId>,
    pub imports: Vec<String>,
    pub checked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Invalid,
    NoValue,
    Builtin(Builtin),
    TypeExpr,
    Constant,
    Variable,
    MapIndex,
    Value,
    CommaOk,
}

impl Mode {
    pub fn is_value(self) -> bool {
        matches!(
            self,
            Mode::Constant | Mode::Variable | Mode::MapIndex | Mode::Value | Mode::CommaOk
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAndValue {
    pub mode: Mode,
    pub ty: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    FieldVal,
    MethodVal,
    MethodExpr,
}

/// A resolved `x.f` where `x` is a value or a type (not a package).
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub kind: SelectionKind,
    pub recv: Type,
    pub obj: ObjectId,
    pub index: Vec<usize>,
    pub indirect: bool,
}

/// Facts recorded by the checker, keyed by source position.
#[derive(Debug, Default)]
pub struct TypeInfo {
    /// Identifier start position to the object it declares.
    pub defs: AHashMap<Pos, ObjectId>,
    /// Identifier start position to the object it denotes.
    pub uses: AHashMap<Pos, ObjectId>,
    pub types: AHashMap<(FileId, Span), TypeAndValue>,
    /// Keyed by the span of the whole selector expression.
    pub selections: AHashMap<(FileId, Span), Selection>,
    /// Objects without an identifier of their own: unnamed imports and the
    /// per-clause variables of type switches.
    pub implicits: AHashMap<(FileId, Span), ObjectId>,
}

impl TypeInfo {
    pub fn object_at(&self, pos: Pos) -> Option<ObjectId> {
        self.defs.get(&pos).or_else(|| self.uses.get(&pos)).copied()
    }
}

/// A set of packages with their syntax and type information.
#[derive(Debug)]
pub struct Program {
    pub objects: Objects,
    pub scopes: Scopes,
    pub info: TypeInfo,
    pub universe: Universe,
    pub(crate) files: Vec<SourceFile>,
    pub(crate) packages: Vec<Package>,
    pub(crate) by_path: AHashMap<String, PackageId>,
    /// Members of packages outside the program, by (path, name).
    pub(crate) externals: AHashMap<(String, String), ObjectId>,
    pub(crate) errors: Vec<CheckError>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    pub fn new() -> Self {
        let mut objects = Objects::default();
        let mut scopes = Scopes::default();
        let universe = universe::populate(&mut objects, &mut scopes);
        Self {
            objects,
            scopes,
            info: TypeInfo::default(),
            universe,
            files: Vec::new(),
            packages: Vec::new(),
            by_path: AHashMap::new(),
            externals: AHashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Parses `sources` (display path and text) as the package `path`.
    ///
    /// Files that fail to parse are recorded as errors and left out.
    pub fn add_package(
        &mut self,
        path: impl Into<String>,
        dir: impl Into<PathBuf>,
        sources: Vec<(String, String)>,
    ) -> PackageId {
        let path = path.into();
        let id = PackageId(self.packages.len() as u32);
        let mut files = Vec::new();
        let mut imports: Vec<String> = Vec::new();
        let mut name = None;

        for (file_path, text) in sources {
            let file_id = FileId(self.files.len() as u32);
            match gofix_parser::parse_file(&text) {
                Ok(ast) => {
                    name.get_or_insert_with(|| ast.package.as_ref().name.clone());
                    for (_, spec) in ast.imports() {
                        let import = spec.path.as_ref();
                        if !imports.contains(import) {
                            imports.push(import.clone());
                        }
                    }
                    self.files.push(SourceFile {
                        id: file_id,
                        path: file_path,
                        lines: LineIndex::new(&text),
                        text: Arc::from(text),
                        ast: Arc::new(ast),
                        package: id,
                        scope: None,
                    });
                    files.push(file_id);
                }
                Err(errors) => {
                    for error in errors {
                        self.errors.push(CheckError::Parse {
                            path: file_path.clone(),
                            file: None,
                            error,
                        });
                    }
                }
            }
        }

        debug!(package = %path, files = files.len(), "added package");
        self.packages.push(Package {
            id,
            name: name.unwrap_or_else(|| default_package_name(&path)),
            path: path.clone(),
            dir: dir.into(),
            files,
            scope: None,
            imports,
            checked: false,
        });
        self.by_path.insert(path, id);
        id
    }

    /// Type-checks every package not yet checked, dependencies first.
    pub fn check(&mut self) -> &[CheckError] {
        for level in self.dependency_levels() {
            for id in level {
                if self.packages[id.index()].checked {
                    continue;
                }
                Checker::new(self, id).check_package();
                self.packages[id.index()].checked = true;
            }
        }
        &self.errors
    }

    /// Groups packages so that each package's in-program imports appear in
    /// earlier groups. Packages on an import cycle form a final group.
    pub fn dependency_levels(&mut self) -> Vec<Vec<PackageId>> {
        let count = self.packages.len();
        let mut pending: Vec<usize> = vec![0; count];
        let mut importers: Vec<Vec<PackageId>> = vec![Vec::new(); count];
        for package in &self.packages {
            for import in &package.imports {
                if let Some(&dep) = self.by_path.get(import)
                    && dep != package.id
                {
                    pending[package.id.index()] += 1;
                    importers[dep.index()].push(package.id);
                }
            }
        }

        let mut levels = Vec::new();
        let mut ready: VecDeque<PackageId> = self
            .packages
            .iter()
            .filter(|package| pending[package.id.index()] == 0)
            .map(|package| package.id)
            .collect();
        let mut placed = 0usize;
        while !ready.is_empty() {
            let level: Vec<PackageId> = ready.drain(..).collect();
            placed += level.len();
            for &id in &level {
                for &importer in &importers[id.index()] {
                    pending[importer.index()] -= 1;
                    if pending[importer.index()] == 0 {
                        ready.push_back(importer);
                    }
                }
            }
            levels.push(level);
        }

        if placed < count {
            let cyclic: Vec<PackageId> = self
                .packages
                .iter()
                .filter(|package| pending[package.id.index()] > 0)
                .map(|package| package.id)
                .collect();
            for &id in &cyclic {
                let path = self.packages[id.index()].path.clone();
                if !self
                    .errors
                    .iter()
                    .any(|err| matches!(err, CheckError::ImportCycle { path: p } if *p == path))
                {
                    self.errors.push(CheckError::ImportCycle { path });
                }
            }
            levels.push(cyclic);
        }
        levels
    }

    pub fn errors(&self) -> &[CheckError] {
        &self.errors
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    pub fn file_by_path(&self, path: &str) -> Option<&SourceFile> {
        self.files.iter().find(|file| file.path == path)
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.index()]
    }

    pub fn package_by_path(&self, path: &str) -> Option<&Package> {
        self.by_path.get(path).map(|id| self.package(*id))
    }

    pub fn object(&self, id: ObjectId) -> &Object {
        self.objects.get(id)
    }

    /// The object declared or denoted by the identifier starting at `offset`.
    pub fn object_at(&self, file: FileId, offset: u32) -> Option<ObjectId> {
        self.info.object_at(Pos::new(file, offset))
    }

    pub fn type_and_value(&self, file: FileId, span: Span) -> Option<&TypeAndValue> {
        self.info.types.get(&(file, span))
    }

    pub fn type_of(&self, file: FileId, span: Span) -> Option<&Type> {
        self.type_and_value(file, span).map(|tv| &tv.ty)
    }

    pub fn selection(&self, file: FileId, span: Span) -> Option<&Selection> {
        self.info.selections.get(&(file, span))
    }

    /// The innermost scope of `file` containing `offset`.
    pub fn innermost(&self, file: FileId, offset: u32) -> ScopeId {
        match self.file(file).scope {
            Some(scope) => self.scopes.innermost(scope, file, offset),
            None => Scopes::UNIVERSE,
        }
    }

    /// Resolves `name` as written at `offset` in `file`.
    pub fn lookup_at(&self, file: FileId, offset: u32, name: &str) -> Option<(ScopeId, ObjectId)> {
        let scope = self.innermost(file, offset);
        self.scopes
            .lookup_parent(&self.objects, scope, name, offset)
    }

    pub fn type_string(&self, ty: &Type, qualifier: Qualifier<'_>) -> String {
        type_string(&self.objects, ty, qualifier)
    }

    pub fn scope_kind(&self, scope: ScopeId) -> ScopeKind {
        self.scopes.get(scope).kind
    }
}

/// The name a package is assumed to declare when its source is unavailable:
/// the last path element, skipping a major version suffix.
pub fn default_package_name(path: &str) -> String {
    let mut segments = path.rsplit('/');
    let last = segments.next().unwrap_or(path);
    let is_version = last.len() > 1
        && last.starts_with('v')
        && last[1..].bytes().all(|b| b.is_ascii_digit());
    let name = if is_version {
        segments.next().unwrap_or(last)
    } else {
        last
    };
    name.trim_start_matches("go-").replace(['-', '.'], "_")
}

/// Reports whether a package at import path `from` may import `to`,
/// following the visibility rule for `internal` directories.
pub fn can_import(from: &str, to: &str) -> bool {
    if to == "internal" || to.starts_with("internal/") {
        // Standard library internals are only importable from the standard
        // library, whose paths have no dot in the first element.
        let first = from.split('/').next().unwrap_or(from);
        if first.contains('.') || first == "testdata" {
            return false;
        }
    }
    if let Some(prefix) = to.strip_suffix("/internal") {
        return from.starts_with(prefix);
    }
    if let Some(idx) = to.rfind("/internal/") {
        return from.starts_with(&to[..idx]);
    }
    true
}

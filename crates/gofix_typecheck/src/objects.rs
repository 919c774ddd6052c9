use gofix_span::{FileId, Pos, Span};

use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub(crate) u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(pub(crate) u32);

impl PackageId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Append,
    Cap,
    Clear,
    Close,
    Complex,
    Copy,
    Delete,
    Imag,
    Len,
    Make,
    Max,
    Min,
    New,
    Panic,
    Print,
    Println,
    Real,
    Recover,
}

impl Builtin {
    pub const ALL: [(&'static str, Builtin); 18] = [
        ("append", Builtin::Append),
        ("cap", Builtin::Cap),
        ("clear", Builtin::Clear),
        ("close", Builtin::Close),
        ("complex", Builtin::Complex),
        ("copy", Builtin::Copy),
        ("delete", Builtin::Delete),
        ("imag", Builtin::Imag),
        ("len", Builtin::Len),
        ("make", Builtin::Make),
        ("max", Builtin::Max),
        ("min", Builtin::Min),
        ("new", Builtin::New),
        ("panic", Builtin::Panic),
        ("print", Builtin::Print),
        ("println", Builtin::Println),
        ("real", Builtin::Real),
        ("recover", Builtin::Recover),
    ];

    /// Builtins whose calls neither read nor write memory beyond their operands.
    pub fn is_pure(self) -> bool {
        matches!(
            self,
            Builtin::Len
                | Builtin::Cap
                | Builtin::Complex
                | Builtin::Imag
                | Builtin::Real
                | Builtin::Min
                | Builtin::Max
                | Builtin::Make
                | Builtin::New
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Local,
    Param,
    Result,
    Receiver,
    Field { embedded: bool },
    Package,
}

/// The receiver of a method: the base type name and whether it is a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecvInfo {
    pub base: Option<ObjectId>,
    pub pointer: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    /// An imported package name; `package` is `None` for packages outside the program.
    PkgName {
        path: String,
        package: Option<PackageId>,
    },
    Const {
        /// The declared value is the `iota` identifier itself.
        is_iota: bool,
    },
    TypeName {
        alias: bool,
        /// For defined types; resolved lazily while checking.
        underlying: Option<Type>,
        methods: Vec<ObjectId>,
    },
    Var(VarKind),
    Func {
        recv: Option<RecvInfo>,
        /// Location of the declaring `FuncDecl` (file and declaration span).
        decl: Option<(FileId, Span)>,
    },
    Builtin(Builtin),
    Nil,
    Label,
    /// A member of a package that is not part of the program.
    External { path: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub name: String,
    pub kind: ObjectKind,
    /// Declaring package; `None` for universe objects.
    pub pkg: Option<PackageId>,
    /// Import path of the declaring package, kept alongside for type strings.
    pub pkg_path: Option<String>,
    pub pos: Option<Pos>,
    pub parent: Option<ScopeId>,
    /// The object is only visible in its scope at offsets >= `scope_pos`.
    pub scope_pos: Option<u32>,
    pub ty: Type,
}

impl Object {
    pub fn is_exported(&self) -> bool {
        gofix_ast::is_exported(&self.name)
    }

    pub fn is_package_level(&self, universe: ScopeId) -> bool {
        self.pkg.is_some()
            && self.parent.is_some_and(|parent| parent != universe)
            && matches!(
                self.kind,
                ObjectKind::Const { .. }
                    | ObjectKind::TypeName { .. }
                    | ObjectKind::Var(VarKind::Package)
                    | ObjectKind::Func { recv: None, .. }
            )
    }

    pub fn is_var(&self) -> bool {
        matches!(self.kind, ObjectKind::Var(_))
    }

    pub fn is_func(&self) -> bool {
        matches!(self.kind, ObjectKind::Func { .. })
    }

    pub fn is_method(&self) -> bool {
        matches!(self.kind, ObjectKind::Func { recv: Some(_), .. })
    }

    pub fn is_type_name(&self) -> bool {
        matches!(self.kind, ObjectKind::TypeName { .. })
    }

    pub fn is_const(&self) -> bool {
        matches!(self.kind, ObjectKind::Const { .. })
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ObjectKind::PkgName { .. } => "package",
            ObjectKind::Const { .. } => "const",
            ObjectKind::TypeName { .. } => "type",
            ObjectKind::Var(VarKind::Field { .. }) => "field",
            ObjectKind::Var(_) => "var",
            ObjectKind::Func { .. } => "func",
            ObjectKind::Builtin(_) => "builtin",
            ObjectKind::Nil => "nil",
            ObjectKind::Label => "label",
            ObjectKind::External { .. } => "external",
        }
    }
}

/// Arena of all objects of a program; ids are stable indices.
#[derive(Debug, Default)]
pub struct Objects {
    list: Vec<Object>,
}

impl Objects {
    pub(crate) fn alloc(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.list.len() as u32);
        self.list.push(object);
        id
    }

    pub fn get(&self, id: ObjectId) -> &Object {
        &self.list[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> &mut Object {
        &mut self.list[id.index()]
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.list
            .iter()
            .enumerate()
            .map(|(idx, object)| (ObjectId(idx as u32), object))
    }
}

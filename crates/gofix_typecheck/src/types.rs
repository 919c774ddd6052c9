use gofix_ast::ChanDir;

use crate::objects::{ObjectId, ObjectKind, Objects};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedComplex,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub const PREDECLARED: [(&'static str, BasicKind); 17] = [
        ("bool", BasicKind::Bool),
        ("int", BasicKind::Int),
        ("int8", BasicKind::Int8),
        ("int16", BasicKind::Int16),
        ("int32", BasicKind::Int32),
        ("int64", BasicKind::Int64),
        ("uint", BasicKind::Uint),
        ("uint8", BasicKind::Uint8),
        ("uint16", BasicKind::Uint16),
        ("uint32", BasicKind::Uint32),
        ("uint64", BasicKind::Uint64),
        ("uintptr", BasicKind::Uintptr),
        ("float32", BasicKind::Float32),
        ("float64", BasicKind::Float64),
        ("complex64", BasicKind::Complex64),
        ("complex128", BasicKind::Complex128),
        ("string", BasicKind::String),
    ];

    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::String => "string",
            BasicKind::UnsafePointer => "unsafe.Pointer",
            BasicKind::UntypedBool => "untyped bool",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedRune => "untyped rune",
            BasicKind::UntypedFloat => "untyped float",
            BasicKind::UntypedComplex => "untyped complex",
            BasicKind::UntypedString => "untyped string",
            BasicKind::UntypedNil => "untyped nil",
        }
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicKind::UntypedBool
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
                | BasicKind::UntypedFloat
                | BasicKind::UntypedComplex
                | BasicKind::UntypedString
                | BasicKind::UntypedNil
        )
    }

    /// The type an untyped constant assumes when no other type is implied.
    pub fn default_kind(self) -> BasicKind {
        match self {
            BasicKind::UntypedBool => BasicKind::Bool,
            BasicKind::UntypedInt => BasicKind::Int,
            BasicKind::UntypedRune => BasicKind::Int32,
            BasicKind::UntypedFloat => BasicKind::Float64,
            BasicKind::UntypedComplex => BasicKind::Complex128,
            BasicKind::UntypedString => BasicKind::String,
            other => other,
        }
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, BasicKind::Bool | BasicKind::UntypedBool)
    }

    /// Ordering of untyped numeric kinds: mixing two yields the larger one.
    fn untyped_rank(self) -> u8 {
        match self {
            BasicKind::UntypedInt => 1,
            BasicKind::UntypedRune => 2,
            BasicKind::UntypedFloat => 3,
            BasicKind::UntypedComplex => 4,
            _ => 0,
        }
    }

    pub fn larger_untyped(self, other: BasicKind) -> BasicKind {
        if other.untyped_rank() > self.untyped_rank() {
            other
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
    /// The last parameter is `...T`; its entry in `params` is `[]T`.
    pub variadic: bool,
}

impl Signature {
    pub fn result_type(&self) -> Type {
        match self.results.as_slice() {
            [] => Type::Tuple(Vec::new()),
            [single] => single.clone(),
            many => Type::Tuple(many.to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Type {
    #[default]
    Invalid,
    Basic(BasicKind),
    /// A defined type; the id names its `TypeName` object.
    Named(ObjectId),
    Pointer(Box<Type>),
    Slice(Box<Type>),
    /// Length is `None` when it is not an integer literal.
    Array(Option<u64>, Box<Type>),
    Map(Box<Type>, Box<Type>),
    Chan(ChanDir, Box<Type>),
    Signature(Box<Signature>),
    /// Field `Var` objects in declaration order.
    Struct(Vec<ObjectId>),
    Interface {
        methods: Vec<ObjectId>,
        embeddeds: Vec<Type>,
    },
    Tuple(Vec<Type>),
}

impl Type {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Type::Invalid)
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self, Type::Basic(kind) if kind.is_untyped())
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn pointer_elem(&self) -> Option<&Type> {
        match self {
            Type::Pointer(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn as_signature(&self) -> Option<&Signature> {
        match self {
            Type::Signature(sig) => Some(sig),
            _ => None,
        }
    }

    /// For untyped constants, their default type; other types unchanged.
    pub fn default_type(&self) -> Type {
        match self {
            Type::Basic(kind) => Type::Basic(kind.default_kind()),
            other => other.clone(),
        }
    }

    pub fn pointer_to(self) -> Type {
        Type::Pointer(Box::new(self))
    }
}

/// Produces the import path prefix to print before a package member, or
/// `None` to leave it unqualified.
pub type Qualifier<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Qualifies every member of a program package by its full import path.
pub fn full_qualifier(path: &str) -> Option<String> {
    Some(path.to_string())
}

/// Formats a type in Go syntax, qualifying named types with `qualifier`.
pub fn type_string(objects: &Objects, ty: &Type, qualifier: Qualifier<'_>) -> String {
    let mut out = String::new();
    write_type(&mut out, objects, ty, qualifier);
    out
}

fn write_type(out: &mut String, objects: &Objects, ty: &Type, qualifier: Qualifier<'_>) {
    match ty {
        Type::Invalid => out.push_str("invalid type"),
        Type::Basic(kind) => out.push_str(kind.name()),
        Type::Named(id) => {
            let object = objects.get(*id);
            if let Some(prefix) = object.pkg_path.as_deref().and_then(|path| qualifier(path)) {
                out.push_str(&prefix);
                out.push('.');
            }
            out.push_str(&object.name);
        }
        Type::Pointer(elem) => {
            out.push('*');
            write_type(out, objects, elem, qualifier);
        }
        Type::Slice(elem) => {
            out.push_str("[]");
            write_type(out, objects, elem, qualifier);
        }
        Type::Array(len, elem) => {
            match len {
                Some(len) => out.push_str(&format!("[{len}]")),
                None => out.push_str("[?]"),
            }
            write_type(out, objects, elem, qualifier);
        }
        Type::Map(key, value) => {
            out.push_str("map[");
            write_type(out, objects, key, qualifier);
            out.push(']');
            write_type(out, objects, value, qualifier);
        }
        Type::Chan(dir, elem) => {
            out.push_str(match dir {
                ChanDir::Both => "chan ",
                ChanDir::Send => "chan<- ",
                ChanDir::Recv => "<-chan ",
            });
            write_type(out, objects, elem, qualifier);
        }
        Type::Signature(sig) => {
            out.push_str("func");
            write_signature(out, objects, sig, qualifier);
        }
        Type::Struct(fields) => {
            out.push_str("struct{");
            for (idx, field) in fields.iter().enumerate() {
                if idx > 0 {
                    out.push_str("; ");
                }
                let field = objects.get(*field);
                let embedded = matches!(
                    field.kind,
                    ObjectKind::Var(crate::objects::VarKind::Field { embedded: true })
                );
                if !embedded {
                    out.push_str(&field.name);
                    out.push(' ');
                }
                write_type(out, objects, &field.ty, qualifier);
            }
            out.push('}');
        }
        Type::Interface { methods, embeddeds } => {
            out.push_str("interface{");
            let mut first = true;
            for embedded in embeddeds {
                if !first {
                    out.push_str("; ");
                }
                first = false;
                write_type(out, objects, embedded, qualifier);
            }
            for method in methods {
                if !first {
                    out.push_str("; ");
                }
                first = false;
                let method = objects.get(*method);
                out.push_str(&method.name);
                if let Type::Signature(sig) = &method.ty {
                    write_signature(out, objects, sig, qualifier);
                }
            }
            out.push('}');
        }
        Type::Tuple(types) => {
            out.push('(');
            write_list(out, objects, types, false, qualifier);
            out.push(')');
        }
    }
}

fn write_signature(out: &mut String, objects: &Objects, sig: &Signature, qualifier: Qualifier<'_>) {
    out.push('(');
    write_list(out, objects, &sig.params, sig.variadic, qualifier);
    out.push(')');
    match sig.results.as_slice() {
        [] => {}
        [single] => {
            out.push(' ');
            write_type(out, objects, single, qualifier);
        }
        many => {
            out.push_str(" (");
            write_list(out, objects, many, false, qualifier);
            out.push(')');
        }
    }
}

fn write_list(
    out: &mut String,
    objects: &Objects,
    types: &[Type],
    variadic: bool,
    qualifier: Qualifier<'_>,
) {
    for (idx, ty) in types.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        match ty {
            Type::Slice(elem) if variadic && idx + 1 == types.len() => {
                out.push_str("...");
                write_type(out, objects, elem, qualifier);
            }
            ty => write_type(out, objects, ty, qualifier),
        }
    }
}

/// Reports whether two types are identical.
///
/// Defined types are identical only to themselves; composite types are
/// compared structurally.
pub fn identical(objects: &Objects, a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Basic(x), Type::Basic(y)) => x == y,
        (Type::Named(x), Type::Named(y)) => x == y,
        (Type::Pointer(x), Type::Pointer(y)) | (Type::Slice(x), Type::Slice(y)) => {
            identical(objects, x, y)
        }
        (Type::Array(n, x), Type::Array(m, y)) => n == m && identical(objects, x, y),
        (Type::Map(k1, v1), Type::Map(k2, v2)) => {
            identical(objects, k1, k2) && identical(objects, v1, v2)
        }
        (Type::Chan(d1, x), Type::Chan(d2, y)) => d1 == d2 && identical(objects, x, y),
        (Type::Signature(x), Type::Signature(y)) => {
            x.variadic == y.variadic
                && lists_identical(objects, &x.params, &y.params)
                && lists_identical(objects, &x.results, &y.results)
        }
        (Type::Tuple(x), Type::Tuple(y)) => lists_identical(objects, x, y),
        (Type::Struct(_), Type::Struct(_)) | (Type::Interface { .. }, Type::Interface { .. }) => {
            type_string(objects, a, &full_qualifier) == type_string(objects, b, &full_qualifier)
        }
        _ => false,
    }
}

fn lists_identical(objects: &Objects, a: &[Type], b: &[Type]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| identical(objects, x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_string_composites() {
        let objects = Objects::default();
        let sig = Type::Signature(Box::new(Signature {
            params: vec![
                Type::Basic(BasicKind::Int),
                Type::Slice(Box::new(Type::Basic(BasicKind::String))),
            ],
            results: vec![Type::Basic(BasicKind::Bool), Type::Basic(BasicKind::Int)],
            variadic: true,
        }));
        assert_eq!(
            type_string(&objects, &sig, &full_qualifier),
            "func(int, ...string) (bool, int)"
        );
        let map = Type::Map(
            Box::new(Type::Basic(BasicKind::String)),
            Box::new(Type::Chan(ChanDir::Recv, Box::new(Type::Basic(BasicKind::Int)))),
        );
        assert_eq!(
            type_string(&objects, &map, &full_qualifier),
            "map[string]<-chan int"
        );
    }

    #[test]
    fn test_untyped_defaults_and_ranks() {
        assert_eq!(BasicKind::UntypedRune.default_kind(), BasicKind::Int32);
        assert_eq!(
            BasicKind::UntypedInt.larger_untyped(BasicKind::UntypedFloat),
            BasicKind::UntypedFloat
        );
        assert!(identical(
            &Objects::default(),
            &Type::Slice(Box::new(Type::Basic(BasicKind::Int))),
            &Type::Slice(Box::new(Type::Basic(BasicKind::Int)))
        ));
    }
}

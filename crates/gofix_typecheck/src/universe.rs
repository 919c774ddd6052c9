use once_cell::sync::Lazy;

use crate::objects::{Builtin, Object, ObjectId, ObjectKind, Objects, ScopeId};
use crate::scope::{ScopeKind, Scopes};
use crate::types::{BasicKind, Signature, Type};
use gofix_span::Span;

#[derive(Debug, Clone, Copy)]
enum Predeclared {
    Basic(BasicKind),
    Alias(BasicKind),
    Any,
    Error,
    Bool,
    Iota,
    Nil,
    Builtin(Builtin),
}

static PREDECLARED: Lazy<Vec<(&'static str, Predeclared)>> = Lazy::new(|| {
    let mut table: Vec<(&'static str, Predeclared)> = BasicKind::PREDECLARED
        .iter()
        .map(|&(name, kind)| (name, Predeclared::Basic(kind)))
        .collect();
    table.extend([
        ("byte", Predeclared::Alias(BasicKind::Uint8)),
        ("rune", Predeclared::Alias(BasicKind::Int32)),
        ("any", Predeclared::Any),
        ("error", Predeclared::Error),
        ("true", Predeclared::Bool),
        ("false", Predeclared::Bool),
        ("iota", Predeclared::Iota),
        ("nil", Predeclared::Nil),
    ]);
    table.extend(
        Builtin::ALL
            .iter()
            .map(|&(name, builtin)| (name, Predeclared::Builtin(builtin))),
    );
    table
});

/// Handles to the universe objects the checker refers to directly.
#[derive(Debug, Clone, Copy)]
pub struct Universe {
    pub scope: ScopeId,
    pub error: ObjectId,
    pub iota: ObjectId,
    pub nil: ObjectId,
}

fn universe_object(name: &str, kind: ObjectKind, ty: Type) -> Object {
    Object {
        name: name.to_string(),
        kind,
        pkg: None,
        pkg_path: None,
        pos: None,
        parent: Some(Scopes::UNIVERSE),
        scope_pos: None,
        ty,
    }
}

/// Allocates the universe scope and its predeclared objects.
pub(crate) fn populate(objects: &mut Objects, scopes: &mut Scopes) -> Universe {
    let scope = scopes.alloc(ScopeKind::Universe, None, None, Span::default());
    let mut error = None;
    let mut iota = None;
    let mut nil = None;

    for &(name, predeclared) in PREDECLARED.iter() {
        let id = match predeclared {
            Predeclared::Basic(kind) => objects.alloc(universe_object(
                name,
                ObjectKind::TypeName {
                    alias: false,
                    underlying: Some(Type::Basic(kind)),
                    methods: Vec::new(),
                },
                Type::Basic(kind),
            )),
            Predeclared::Alias(kind) => objects.alloc(universe_object(
                name,
                ObjectKind::TypeName {
                    alias: true,
                    underlying: None,
                    methods: Vec::new(),
                },
                Type::Basic(kind),
            )),
            Predeclared::Any => objects.alloc(universe_object(
                name,
                ObjectKind::TypeName {
                    alias: true,
                    underlying: None,
                    methods: Vec::new(),
                },
                Type::Interface {
                    methods: Vec::new(),
                    embeddeds: Vec::new(),
                },
            )),
            Predeclared::Error => {
                let method = objects.alloc(universe_object(
                    "Error",
                    ObjectKind::Func {
                        recv: None,
                        decl: None,
                    },
                    Type::Signature(Box::new(Signature {
                        params: Vec::new(),
                        results: vec![Type::Basic(BasicKind::String)],
                        variadic: false,
                    })),
                ));
                let id = objects.alloc(universe_object(
                    name,
                    ObjectKind::TypeName {
                        alias: false,
                        underlying: Some(Type::Interface {
                            methods: vec![method],
                            embeddeds: Vec::new(),
                        }),
                        methods: Vec::new(),
                    },
                    Type::Invalid,
                ));
                objects.get_mut(id).ty = Type::Named(id);
                error = Some(id);
                id
            }
            Predeclared::Bool => objects.alloc(universe_object(
                name,
                ObjectKind::Const { is_iota: false },
                Type::Basic(BasicKind::UntypedBool),
            )),
            Predeclared::Iota => {
                let id = objects.alloc(universe_object(
                    name,
                    ObjectKind::Const { is_iota: true },
                    Type::Basic(BasicKind::UntypedInt),
                ));
                iota = Some(id);
                id
            }
            Predeclared::Nil => {
                let id = objects.alloc(universe_object(
                    name,
                    ObjectKind::Nil,
                    Type::Basic(BasicKind::UntypedNil),
                ));
                nil = Some(id);
                id
            }
            Predeclared::Builtin(builtin) => objects.alloc(universe_object(
                name,
                ObjectKind::Builtin(builtin),
                Type::Invalid,
            )),
        };
        scopes.insert(scope, name, id);
    }

    // The table always contains these entries.
    let fallback = ObjectId(0);
    Universe {
        scope,
        error: error.unwrap_or(fallback),
        iota: iota.unwrap_or(fallback),
        nil: nil.unwrap_or(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universe_contains_predeclared_names() {
        let mut objects = Objects::default();
        let mut scopes = Scopes::default();
        let universe = populate(&mut objects, &mut scopes);
        let scope = scopes.get(universe.scope);
        for name in ["int", "byte", "error", "nil", "iota", "len", "println", "any"] {
            assert!(scope.lookup(name).is_some(), "missing {name}");
        }
        assert_eq!(objects.get(universe.error).ty, Type::Named(universe.error));
        assert!(matches!(objects.get(universe.nil).kind, ObjectKind::Nil));
    }
}

use ahash::AHashSet;

use crate::objects::{ObjectId, ObjectKind, Objects, VarKind};
use crate::types::Type;

static INVALID: Type = Type::Invalid;

/// The underlying type of `ty`: the declared structure of a defined type,
/// or `ty` itself.
pub fn underlying<'a>(objects: &'a Objects, ty: &'a Type) -> &'a Type {
    match ty {
        Type::Named(id) => match &objects.get(*id).kind {
            ObjectKind::TypeName {
                underlying: Some(underlying),
                ..
            } => underlying,
            _ => &INVALID,
        },
        other => other,
    }
}

/// Result of resolving `x.name` against the type of `x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOrMethod {
    pub obj: ObjectId,
    /// Struct field indices walked from the operand: for a field this ends
    /// with the field itself; for a method it is the path to the embedded
    /// value that declares it.
    pub index: Vec<usize>,
    /// A pointer was dereferenced on the way.
    pub indirect: bool,
}

impl FieldOrMethod {
    /// The selection reaches through at least one embedded field.
    pub fn is_promoted(&self, is_method: bool) -> bool {
        if is_method {
            !self.index.is_empty()
        } else {
            self.index.len() > 1
        }
    }
}

struct Candidate<'a> {
    ty: &'a Type,
    index: Vec<usize>,
    indirect: bool,
}

/// Finds the field or method `name` of `ty`, searching embedded fields
/// breadth first. Returns `None` when absent or ambiguous at the shallowest
/// depth that declares it.
pub fn lookup_field_or_method(objects: &Objects, ty: &Type, name: &str) -> Option<FieldOrMethod> {
    let (start, indirect) = match ty {
        Type::Pointer(elem) => (elem.as_ref(), true),
        other => (other, false),
    };
    let mut current = vec![Candidate {
        ty: start,
        index: Vec::new(),
        indirect,
    }];
    let mut seen: AHashSet<ObjectId> = AHashSet::new();

    while !current.is_empty() {
        let mut next = Vec::new();
        let mut found = None;
        let mut count = 0usize;

        for candidate in current {
            let mut ty = candidate.ty;
            if let Type::Named(id) = ty {
                if !seen.insert(*id) {
                    continue;
                }
                if let ObjectKind::TypeName { methods, .. } = &objects.get(*id).kind
                    && let Some(&method) = methods.iter().find(|&&m| objects.get(m).name == name)
                {
                    count += 1;
                    found = Some(FieldOrMethod {
                        obj: method,
                        index: candidate.index.clone(),
                        indirect: candidate.indirect,
                    });
                    continue;
                }
                ty = underlying(objects, ty);
            }

            match ty {
                Type::Struct(fields) => {
                    for (idx, &field_id) in fields.iter().enumerate() {
                        let field = objects.get(field_id);
                        let mut index = candidate.index.clone();
                        index.push(idx);
                        if field.name == name {
                            count += 1;
                            found = Some(FieldOrMethod {
                                obj: field_id,
                                index,
                                indirect: candidate.indirect,
                            });
                            continue;
                        }
                        if matches!(field.kind, ObjectKind::Var(VarKind::Field { embedded: true })) {
                            let (embedded, through_pointer) = match &field.ty {
                                Type::Pointer(elem) => (elem.as_ref(), true),
                                other => (other, false),
                            };
                            next.push(Candidate {
                                ty: embedded,
                                index,
                                indirect: candidate.indirect || through_pointer,
                            });
                        }
                    }
                }
                Type::Interface { .. } => {
                    if let Some(method) = interface_method(objects, ty, name, 0) {
                        count += 1;
                        found = Some(FieldOrMethod {
                            obj: method,
                            index: candidate.index.clone(),
                            indirect: candidate.indirect,
                        });
                    }
                }
                _ => {}
            }
        }

        match count {
            0 => current = next,
            1 => return found,
            _ => return None,
        }
    }
    None
}

/// Finds a method in an interface type, including embedded interfaces.
fn interface_method(objects: &Objects, ty: &Type, name: &str, depth: usize) -> Option<ObjectId> {
    if depth > 16 {
        return None;
    }
    match underlying(objects, ty) {
        Type::Interface { methods, embeddeds } => methods
            .iter()
            .copied()
            .find(|&m| objects.get(m).name == name)
            .or_else(|| {
                embeddeds
                    .iter()
                    .find_map(|embedded| interface_method(objects, embedded, name, depth + 1))
            }),
        _ => None,
    }
}

/// Reports whether `method` is declared with a pointer receiver.
pub fn has_pointer_receiver(objects: &Objects, method: ObjectId) -> bool {
    matches!(
        objects.get(method).kind,
        ObjectKind::Func {
            recv: Some(recv),
            ..
        } if recv.pointer
    )
}
